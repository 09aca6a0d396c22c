use shared_types::Question;
use tokio::sync::watch;

use crate::cursor::NavigationCursor;
use crate::filter::{filter_questions, FilterCriteria, FilterField};
use crate::store::QuestionStore;

/// Filtered, navigable view over a [`QuestionStore`]
///
/// The view is re-derived lazily: whenever the store revision or the
/// criteria differ from the last reconciliation, the filter is re-run and
/// the cursor reconciled against the result.
#[derive(Debug)]
pub struct QuestionBrowser {
    store: QuestionStore,
    criteria: FilterCriteria,
    cursor: NavigationCursor,
    view: Vec<Question>,
    reconciled: Option<(u64, FilterCriteria)>,
    changes: watch::Receiver<u64>,
}

impl QuestionBrowser {
    pub fn new(store: QuestionStore) -> Self {
        let changes = store.subscribe();
        Self {
            store,
            criteria: FilterCriteria::default(),
            cursor: NavigationCursor::default(),
            view: Vec::new(),
            reconciled: None,
            changes,
        }
    }

    fn refresh(&mut self) {
        let key = (self.store.revision(), self.criteria);
        if self.reconciled == Some(key) {
            return;
        }
        let criteria = self.criteria;
        let (revision, view) = self
            .store
            .read(|s| (s.revision, filter_questions(&s.questions, &criteria)));
        self.cursor.reconcile(&view);
        self.view = view;
        self.reconciled = Some((revision, criteria));
    }

    pub fn view(&mut self) -> &[Question] {
        self.refresh();
        &self.view
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn set_criteria(&mut self, criteria: FilterCriteria) {
        self.criteria = criteria;
        self.refresh();
    }

    pub fn set_filter(&mut self, field: FilterField) {
        self.criteria.set(field);
        self.refresh();
    }

    pub fn clear_filters(&mut self) {
        self.criteria.clear();
        self.refresh();
    }

    pub fn cursor(&mut self) -> &NavigationCursor {
        self.refresh();
        &self.cursor
    }

    pub fn current(&mut self) -> Option<Question> {
        self.refresh();
        let id = self.cursor.current_id()?;
        self.view.iter().find(|q| &q.id == id).cloned()
    }

    pub fn first(&mut self) {
        self.refresh();
        self.cursor.first();
    }

    pub fn last(&mut self) {
        self.refresh();
        self.cursor.last();
    }

    pub fn next(&mut self) {
        self.refresh();
        self.cursor.next();
    }

    pub fn previous(&mut self) {
        self.refresh();
        self.cursor.previous();
    }

    pub fn select_by_number(&mut self, number: usize) {
        self.refresh();
        self.cursor.select_by_number(number);
    }

    pub fn position(&mut self) -> Option<(usize, usize)> {
        self.refresh();
        self.cursor.position()
    }

    pub fn progress_pct(&mut self) -> u8 {
        self.refresh();
        self.cursor.progress_pct()
    }

    /// Wait until the store changes again. Returns false once no store
    /// handle is left to change it.
    pub async fn wait_for_change(&mut self) -> bool {
        self.changes.changed().await.is_ok()
    }
}
