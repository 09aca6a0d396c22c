//! Question collection store
//!
//! One [`QuestionStore`] per session. Handles are cheap clones of the same
//! state. Reads are public; writes are crate-private so the collection only
//! changes through [`crate::actions::ScriptActions`] or wholesale
//! replacement.
//!
//! Every write bumps `revision` and publishes it on a watch channel, so
//! views can tell when to re-derive.

mod patch;
mod state;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use shared_types::{ErrorRecord, Question, QuestionId};
use tokio::sync::watch;

pub use patch::{QuestionPatch, TouchedFields};
pub use state::QuestionCollectionState;

#[derive(Debug, Clone)]
pub struct QuestionStore {
    inner: Arc<RwLock<QuestionCollectionState>>,
    revision_tx: Arc<watch::Sender<u64>>,
    /// Held by the one generation or save in flight. Separate from
    /// `loading`, which error reporting may clear.
    busy: Arc<AtomicBool>,
}

/// Exclusive claim on the generation/save slot
///
/// Dropping it frees the slot. If the operation was cancelled before it
/// settled, `loading` is cleared too.
#[derive(Debug)]
pub(crate) struct OperationGuard {
    store: QuestionStore,
}

impl Drop for OperationGuard {
    fn drop(&mut self) {
        if self.store.is_loading() {
            tracing::warn!("Generation or save dropped before completing");
            self.store.set_loading(false);
        }
        self.store.busy.store(false, Ordering::Release);
    }
}

impl Default for QuestionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl QuestionStore {
    pub fn new() -> Self {
        let (revision_tx, _) = watch::channel(0);
        Self {
            inner: Arc::new(RwLock::new(QuestionCollectionState::default())),
            revision_tx: Arc::new(revision_tx),
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Run `f` against the current state without cloning it.
    pub fn read<R>(&self, f: impl FnOnce(&QuestionCollectionState) -> R) -> R {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    pub fn snapshot(&self) -> QuestionCollectionState {
        self.read(Clone::clone)
    }

    pub fn questions(&self) -> Vec<Question> {
        self.read(|s| s.questions.clone())
    }

    pub fn get(&self, id: &QuestionId) -> Option<Question> {
        self.read(|s| s.get(id).cloned())
    }

    pub fn position_of(&self, id: &QuestionId) -> Option<usize> {
        self.read(|s| s.position_of(id))
    }

    pub fn len(&self) -> usize {
        self.read(|s| s.questions.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn resume_text(&self) -> String {
        self.read(|s| s.resume_text.clone())
    }

    pub fn is_loading(&self) -> bool {
        self.read(|s| s.loading)
    }

    pub fn error(&self) -> Option<ErrorRecord> {
        self.read(|s| s.error.clone())
    }

    pub fn revision(&self) -> u64 {
        self.read(|s| s.revision)
    }

    /// Receiver that observes every revision bump.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision_tx.subscribe()
    }

    fn mutate<R>(&self, f: impl FnOnce(&mut QuestionCollectionState) -> R) -> R {
        let (result, revision) = {
            let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
            let result = f(&mut guard);
            guard.revision += 1;
            (result, guard.revision)
        };
        self.revision_tx.send_replace(revision);
        result
    }

    pub(crate) fn replace_all(&self, questions: Vec<Question>) {
        self.mutate(|s| state::replace_all(s, questions));
    }

    pub(crate) fn set_loading(&self, loading: bool) {
        self.mutate(|s| state::set_loading(s, loading));
    }

    /// Enter the loading state unless a generation or save already holds it.
    pub(crate) fn try_begin_operation(&self) -> Option<OperationGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        self.set_loading(true);
        Some(OperationGuard {
            store: self.clone(),
        })
    }

    pub(crate) fn set_error(&self, error: ErrorRecord) {
        self.mutate(|s| state::set_error(s, error));
    }

    /// Record an error without touching `loading`.
    pub(crate) fn record_error(&self, error: ErrorRecord) {
        self.mutate(|s| s.error = Some(error));
    }

    pub(crate) fn clear_error(&self) {
        self.mutate(|s| s.error = None);
    }

    pub(crate) fn set_resume_text(&self, text: String) {
        self.mutate(|s| s.resume_text = text);
    }

    pub(crate) fn upsert_local(&self, id: &QuestionId, patch: &QuestionPatch) -> bool {
        self.mutate(|s| state::upsert_local(s, id, patch))
    }

    /// Install the service's copy of a confirmed question, keeping local
    /// edits made to the entry after `sent` went out.
    pub(crate) fn confirm_entry(
        &self,
        id: &QuestionId,
        sent: &Question,
        confirmed: Question,
    ) -> Option<Question> {
        self.mutate(|s| state::confirm_entry(s, id, sent, confirmed))
    }

    pub(crate) fn remove_by_id(&self, id: &QuestionId) -> Option<Question> {
        self.mutate(|s| state::remove_by_id(s, id))
    }

    pub(crate) fn append(&self, question: Question) -> Result<(), Question> {
        self.mutate(|s| state::append(s, question))
    }

    pub(crate) fn restore_fields(
        &self,
        id: &QuestionId,
        fields: TouchedFields,
        before: &Question,
    ) -> bool {
        self.mutate(|s| state::restore_fields(s, id, fields, before))
    }

    /// Apply `patch` and return the pre-image and post-image of the entry.
    pub(crate) fn apply_patch(
        &self,
        id: &QuestionId,
        patch: &QuestionPatch,
    ) -> Option<(Question, Question)> {
        self.mutate(|s| {
            let before = s.get(id).cloned()?;
            state::upsert_local(s, id, patch);
            let after = s.get(id).cloned()?;
            Some((before, after))
        })
    }
}
