//! Operations on the question collection
//!
//! Local edits land in the store immediately. Edits that need the service's
//! confirmation are tracked per question id: each confirmation carries a
//! token, and only the response holding the latest token for its id may
//! apply or roll back. Rollback restores only the fields the pending edits
//! touched, from the pre-image captured before the first of them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use shared_types::{
    Breadth, Controls, Depth, ErrorRecord, FollowUp, GenerationDefaults, Persona, Question,
    QuestionId, SaveScriptRequest, UpdateQuestionRequest, STATUS_SUCCESS,
};

use crate::api::{QuestionService, ResumeFile};
use crate::browser::QuestionBrowser;
use crate::error::{SchemaError, ScriptError};
use crate::normalize::{normalize_batch, normalize_question};
use crate::store::{QuestionPatch, QuestionStore, TouchedFields};

const MSG_GENERATE_FAILED: &str = "Failed to generate questions.";
const MSG_UPDATE_FAILED: &str = "Failed to update question.";
const MSG_SAVE_FAILED: &str = "Failed to save the script.";
const MSG_EDIT_FAILED: &str = "Failed to edit question.";
const MSG_ADD_FAILED: &str = "Failed to add question.";
const MSG_DELETE_FAILED: &str = "Failed to delete question.";

/// Outcome of ingesting a generated question set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestReport {
    pub accepted: usize,
    pub rejected: Vec<SchemaError>,
}

/// Locally authored question, before it gets an id
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionDraft {
    pub main_question: String,
    pub claim: Option<String>,
    pub controls: Controls,
    pub follow_ups: Vec<FollowUp>,
}

impl Default for QuestionDraft {
    fn default() -> Self {
        Self {
            main_question: String::new(),
            claim: None,
            controls: Controls {
                breadth: Breadth::Low,
                persona: Persona::WhyHow,
                depth: Depth::NONE,
            },
            follow_ups: Vec::new(),
        }
    }
}

impl QuestionDraft {
    pub fn new(main_question: impl Into<String>) -> Self {
        Self {
            main_question: main_question.into(),
            ..Default::default()
        }
    }

    fn into_question(self) -> Result<Question, ScriptError> {
        if self.main_question.trim().is_empty() {
            return Err(ScriptError::InvalidDraft(
                "Please enter a main question.".to_string(),
            ));
        }
        Ok(Question {
            id: QuestionId::new(),
            claim: self.claim.filter(|c| !c.trim().is_empty()),
            main_question: self.main_question.trim().to_string(),
            controls: self.controls,
            follow_ups: self.follow_ups,
        })
    }
}

/// Confirmation in flight for one question
#[derive(Debug, Clone)]
struct PendingEdit {
    token: u64,
    before: Question,
    touched: TouchedFields,
}

pub struct ScriptActions<S> {
    store: QuestionStore,
    service: Arc<S>,
    generation: GenerationDefaults,
    pending: Arc<Mutex<HashMap<QuestionId, PendingEdit>>>,
    next_token: Arc<AtomicU64>,
}

impl<S> Clone for ScriptActions<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            service: Arc::clone(&self.service),
            generation: self.generation,
            pending: Arc::clone(&self.pending),
            next_token: Arc::clone(&self.next_token),
        }
    }
}

impl<S: QuestionService> ScriptActions<S> {
    pub fn new(service: S, generation: GenerationDefaults) -> Self {
        Self::with_store(QuestionStore::new(), service, generation)
    }

    pub fn with_store(store: QuestionStore, service: S, generation: GenerationDefaults) -> Self {
        Self {
            store,
            service: Arc::new(service),
            generation,
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_token: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn store(&self) -> &QuestionStore {
        &self.store
    }

    pub fn browser(&self) -> QuestionBrowser {
        QuestionBrowser::new(self.store.clone())
    }

    /// Ids with a confirmation still in flight.
    pub fn pending_ids(&self) -> Vec<QuestionId> {
        let mut ids: Vec<QuestionId> = self.pending().keys().cloned().collect();
        ids.sort();
        ids
    }

    fn pending(&self) -> std::sync::MutexGuard<'_, HashMap<QuestionId, PendingEdit>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a failed edit. A generation or save in flight keeps its
    /// loading state.
    fn fail(&self, err: ScriptError, message: &str, id: Option<&QuestionId>) -> ScriptError {
        self.store.record_error(error_record(&err, message, id));
        err
    }

    /// Record a failed generation or save and leave the loading state.
    fn fail_operation(&self, err: ScriptError, message: &str) -> ScriptError {
        self.store.set_error(error_record(&err, message, None));
        err
    }

    /// Upload a resume, generate a fresh question set and replace the
    /// collection with it.
    pub async fn generate(&self, resume: &ResumeFile) -> Result<IngestReport, ScriptError> {
        let Some(_operation) = self.store.try_begin_operation() else {
            return Err(ScriptError::Busy);
        };

        let upload = match self.service.upload_resume(resume).await {
            Ok(upload) => upload,
            Err(e) => {
                tracing::error!(file_name = %resume.file_name, "Resume upload failed: {e}");
                return Err(self.fail_operation(e, MSG_GENERATE_FAILED));
            }
        };
        if let Err(e) = check_status(upload.status.as_deref()) {
            return Err(self.fail_operation(e, MSG_GENERATE_FAILED));
        }
        self.store.set_resume_text(upload.resume_text);

        let response = match self
            .service
            .generate_questions(resume, &self.generation)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(file_name = %resume.file_name, "Question generation failed: {e}");
                return Err(self.fail_operation(e, MSG_GENERATE_FAILED));
            }
        };
        if let Err(e) = check_status(response.status.as_deref()) {
            return Err(self.fail_operation(e, MSG_GENERATE_FAILED));
        }

        let batch = normalize_batch(&response.data.questions);
        for rejected in &batch.rejected {
            tracing::warn!("Dropping generated question: {rejected}");
        }
        let report = IngestReport {
            accepted: batch.questions.len(),
            rejected: batch.rejected,
        };

        {
            // Ids from the new batch may collide with ids of in-flight edits.
            let mut pending = self.pending();
            pending.clear();
            self.store.replace_all(batch.questions);
        }

        tracing::info!(
            accepted = report.accepted,
            rejected = report.rejected.len(),
            "Generated question set"
        );
        Ok(report)
    }

    /// Apply `patch` locally, then confirm it with the service.
    pub async fn update_question(
        &self,
        id: &QuestionId,
        patch: QuestionPatch,
    ) -> Result<Question, ScriptError> {
        self.confirm(id, patch, false).await
    }

    /// Ask the service for a fresh set of follow-ups for one question.
    pub async fn regenerate_follow_ups(&self, id: &QuestionId) -> Result<Question, ScriptError> {
        self.confirm(id, QuestionPatch::new(), true).await
    }

    async fn confirm(
        &self,
        id: &QuestionId,
        patch: QuestionPatch,
        regenerate_followups: bool,
    ) -> Result<Question, ScriptError> {
        if let Err(e) = patch.validate() {
            return Err(self.fail(e, MSG_UPDATE_FAILED, Some(id)));
        }
        self.store.clear_error();

        let (token, current) = {
            let mut pending = self.pending();
            let Some((before, after)) = self.store.apply_patch(id, &patch) else {
                drop(pending);
                return Err(self.fail(
                    ScriptError::NotFound(id.clone()),
                    MSG_UPDATE_FAILED,
                    Some(id),
                ));
            };

            let token = self.next_token.fetch_add(1, Ordering::Relaxed);
            let touched = patch.touched();
            match pending.get_mut(id) {
                Some(edit) => {
                    // Keep the older pre-image; only newly touched fields
                    // need their pre-edit value recorded.
                    touched.minus(edit.touched).restore(&mut edit.before, &before);
                    edit.touched = edit.touched.union(touched);
                    edit.token = token;
                }
                None => {
                    pending.insert(
                        id.clone(),
                        PendingEdit {
                            token,
                            before,
                            touched,
                        },
                    );
                }
            }
            (token, after)
        };
        let mut in_flight = InFlightConfirmation {
            store: self.store.clone(),
            pending: Arc::clone(&self.pending),
            id: id.clone(),
            token,
            armed: true,
        };

        let request = UpdateQuestionRequest {
            resume_text: self.store.resume_text(),
            question: current,
            breadth: patch.breadth,
            depth: patch.depth,
            persona: patch.persona,
            regenerate_followups: regenerate_followups.then_some(true),
        };
        tracing::debug!(question_id = %id, token, "Sending question confirmation");

        let result = self
            .service
            .update_question(&request)
            .await
            .and_then(|response| {
                check_status(response.status.as_deref())?;
                confirmed_question(id, &response.data)
            });
        in_flight.disarm();

        let mut pending = self.pending();
        let is_latest = pending.get(id).is_some_and(|edit| edit.token == token);
        let edit = if is_latest { pending.remove(id) } else { None };
        let Some(edit) = edit else {
            tracing::warn!(question_id = %id, token, "Ignoring superseded confirmation");
            return Err(ScriptError::Superseded(id.clone()));
        };

        match result {
            Ok(confirmed) => {
                // Fields edited locally after sending win over the service copy.
                let question = self
                    .store
                    .confirm_entry(id, &request.question, confirmed)
                    .ok_or_else(|| ScriptError::NotFound(id.clone()))?;
                drop(pending);
                tracing::debug!(question_id = %id, token, "Question confirmed");
                Ok(question)
            }
            Err(e) => {
                self.store.restore_fields(id, edit.touched, &edit.before);
                drop(pending);
                tracing::warn!(question_id = %id, token, "Rolling back question edit: {e}");
                Err(self.fail(e, MSG_UPDATE_FAILED, Some(id)))
            }
        }
    }

    /// In-memory edit with no service round trip (text, sliders).
    pub fn edit_local(&self, id: &QuestionId, patch: QuestionPatch) -> Result<(), ScriptError> {
        if let Err(e) = patch.validate() {
            return Err(self.fail(e, MSG_EDIT_FAILED, Some(id)));
        }
        if !self.store.upsert_local(id, &patch) {
            return Err(self.fail(ScriptError::NotFound(id.clone()), MSG_EDIT_FAILED, Some(id)));
        }
        Ok(())
    }

    pub fn add_question(&self, draft: QuestionDraft) -> Result<QuestionId, ScriptError> {
        let question = match draft.into_question() {
            Ok(question) => question,
            Err(e) => return Err(self.fail(e, MSG_ADD_FAILED, None)),
        };
        let id = question.id.clone();
        if self.store.append(question).is_err() {
            return Err(self.fail(
                ScriptError::Validation(format!("Duplicate question id: {id}")),
                MSG_ADD_FAILED,
                Some(&id),
            ));
        }
        tracing::info!(question_id = %id, "Added question");
        Ok(id)
    }

    /// Remove a question and forget any confirmation still in flight for it.
    pub fn delete_question(&self, id: &QuestionId) -> Result<Question, ScriptError> {
        let removed = {
            let mut pending = self.pending();
            pending.remove(id);
            self.store.remove_by_id(id)
        };
        match removed {
            Some(question) => {
                tracing::info!(question_id = %id, "Deleted question");
                Ok(question)
            }
            None => Err(self.fail(
                ScriptError::NotFound(id.clone()),
                MSG_DELETE_FAILED,
                Some(id),
            )),
        }
    }

    /// Persist the whole collection.
    pub async fn save_script(&self) -> Result<(), ScriptError> {
        let Some(_operation) = self.store.try_begin_operation() else {
            return Err(ScriptError::Busy);
        };

        let request = SaveScriptRequest {
            questions: self.store.questions(),
        };
        match self.service.save_script(&request).await {
            Ok(()) => {
                self.store.set_loading(false);
                tracing::info!(questions = request.questions.len(), "Saved script");
                Ok(())
            }
            Err(e) => {
                tracing::error!("Saving script failed: {e}");
                Err(self.fail_operation(e, MSG_SAVE_FAILED))
            }
        }
    }
}

/// Undoes an unanswered confirmation when its future is dropped.
struct InFlightConfirmation {
    store: QuestionStore,
    pending: Arc<Mutex<HashMap<QuestionId, PendingEdit>>>,
    id: QuestionId,
    token: u64,
    armed: bool,
}

impl InFlightConfirmation {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for InFlightConfirmation {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if !pending.get(&self.id).is_some_and(|edit| edit.token == self.token) {
            return;
        }
        if let Some(edit) = pending.remove(&self.id) {
            self.store.restore_fields(&self.id, edit.touched, &edit.before);
            tracing::warn!(
                question_id = %self.id,
                token = self.token,
                "Confirmation dropped before a response, rolled back"
            );
        }
    }
}

fn error_record(err: &ScriptError, message: &str, id: Option<&QuestionId>) -> ErrorRecord {
    ErrorRecord::new(err.kind(), message)
        .with_detail(err.to_string())
        .for_question(id)
}

fn check_status(status: Option<&str>) -> Result<(), ScriptError> {
    match status {
        None | Some(STATUS_SUCCESS) => Ok(()),
        Some(other) => Err(ScriptError::Validation(format!(
            "Service reported status '{other}'"
        ))),
    }
}

/// The service's copy of the edited question. Anything else is a failed
/// confirmation.
fn confirmed_question(id: &QuestionId, data: &serde_json::Value) -> Result<Question, ScriptError> {
    if !data.is_object() {
        return Err(ScriptError::Validation(
            "Invalid response format from server".to_string(),
        ));
    }
    let question = normalize_question(data)
        .map_err(|e| ScriptError::Validation(format!("Invalid question in response: {e}")))?;
    if &question.id != id {
        return Err(ScriptError::Validation(format!(
            "Response is for question {} instead of {id}",
            question.id
        )));
    }
    Ok(question)
}
