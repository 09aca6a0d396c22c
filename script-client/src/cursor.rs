use shared_types::{Question, QuestionId};

/// Bounded position within the filtered view
///
/// Tracks the ids of the view it was last reconciled with so that a view
/// change can keep pointing at the same question when it survives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationCursor {
    index: usize,
    ids: Vec<QuestionId>,
}

impl NavigationCursor {
    pub fn new(view: &[Question]) -> Self {
        Self {
            index: 0,
            ids: view.iter().map(|q| q.id.clone()).collect(),
        }
    }

    /// Re-point at the previously current id if it is still in `view`,
    /// otherwise reset to the first entry.
    pub fn reconcile(&mut self, view: &[Question]) {
        let previous = self.current_id().cloned();
        self.ids = view.iter().map(|q| q.id.clone()).collect();
        self.index = previous
            .and_then(|id| self.ids.iter().position(|candidate| *candidate == id))
            .unwrap_or(0);
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Zero-based index, `None` for an empty view.
    pub fn index(&self) -> Option<usize> {
        (!self.is_empty()).then_some(self.index)
    }

    pub fn current_id(&self) -> Option<&QuestionId> {
        self.ids.get(self.index)
    }

    pub fn first(&mut self) {
        self.index = 0;
    }

    pub fn last(&mut self) {
        self.index = self.len().saturating_sub(1);
    }

    pub fn next(&mut self) {
        if self.index + 1 < self.len() {
            self.index += 1;
        }
    }

    pub fn previous(&mut self) {
        self.index = self.index.saturating_sub(1);
    }

    /// 1-based selection, clamped into the view.
    pub fn select_by_number(&mut self, number: usize) {
        if self.is_empty() {
            self.index = 0;
            return;
        }
        self.index = number.clamp(1, self.len()) - 1;
    }

    /// `(n, N)` for "n of N", `None` for an empty view.
    pub fn position(&self) -> Option<(usize, usize)> {
        self.index().map(|index| (index + 1, self.len()))
    }

    pub fn progress_pct(&self) -> u8 {
        match self.position() {
            Some((current, total)) => ((current * 100 + total / 2) / total) as u8,
            None => 0,
        }
    }
}
