use shared_types::{ErrorRecord, Question, QuestionId};

use super::patch::{QuestionPatch, TouchedFields};

/// Session-scoped question collection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuestionCollectionState {
    pub questions: Vec<Question>,
    pub resume_text: String,
    pub loading: bool,
    pub error: Option<ErrorRecord>,
    pub revision: u64,
}

impl QuestionCollectionState {
    pub fn get(&self, id: &QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| &q.id == id)
    }

    pub fn position_of(&self, id: &QuestionId) -> Option<usize> {
        self.questions.iter().position(|q| &q.id == id)
    }

    fn get_mut(&mut self, id: &QuestionId) -> Option<&mut Question> {
        self.questions.iter_mut().find(|q| &q.id == id)
    }
}

pub fn replace_all(state: &mut QuestionCollectionState, questions: Vec<Question>) {
    state.questions = questions;
    state.error = None;
    state.loading = false;
}

pub fn set_loading(state: &mut QuestionCollectionState, loading: bool) {
    state.loading = loading;
    if loading {
        state.error = None;
    }
}

pub fn set_error(state: &mut QuestionCollectionState, error: ErrorRecord) {
    state.error = Some(error);
    state.loading = false;
}

/// Returns false when the id is unknown.
pub fn upsert_local(
    state: &mut QuestionCollectionState,
    id: &QuestionId,
    patch: &QuestionPatch,
) -> bool {
    match state.get_mut(id) {
        Some(question) => {
            patch.apply_to(question);
            true
        }
        None => false,
    }
}

/// Swap in an authoritative copy at the same position.
pub fn replace_entry(state: &mut QuestionCollectionState, id: &QuestionId, question: Question) -> bool {
    match state.get_mut(id) {
        Some(slot) => {
            *slot = question;
            true
        }
        None => false,
    }
}

/// Swap in the service's copy of `id`, carrying over fields that changed
/// locally since `sent` was captured.
pub fn confirm_entry(
    state: &mut QuestionCollectionState,
    id: &QuestionId,
    sent: &Question,
    mut confirmed: Question,
) -> Option<Question> {
    let current = state.get(id)?;
    TouchedFields::changed_between(sent, current).restore(&mut confirmed, current);
    replace_entry(state, id, confirmed.clone()).then_some(confirmed)
}

pub fn remove_by_id(state: &mut QuestionCollectionState, id: &QuestionId) -> Option<Question> {
    let position = state.position_of(id)?;
    Some(state.questions.remove(position))
}

/// Rejects a question whose id is already present.
pub fn append(state: &mut QuestionCollectionState, question: Question) -> Result<(), Question> {
    if state.get(&question.id).is_some() {
        return Err(question);
    }
    state.questions.push(question);
    Ok(())
}

pub fn restore_fields(
    state: &mut QuestionCollectionState,
    id: &QuestionId,
    fields: TouchedFields,
    before: &Question,
) -> bool {
    match state.get_mut(id) {
        Some(question) => {
            fields.restore(question, before);
            true
        }
        None => false,
    }
}
