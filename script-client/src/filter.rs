use shared_types::{Breadth, Depth, Persona, Question};

/// Active filter predicates. `None` matches everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub breadth: Option<Breadth>,
    pub persona: Option<Persona>,
    pub depth: Option<Depth>,
}

/// One filter control, as set from a dropdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    Breadth(Option<Breadth>),
    Persona(Option<Persona>),
    Depth(Option<Depth>),
}

impl FilterCriteria {
    pub fn is_active(&self) -> bool {
        self.breadth.is_some() || self.persona.is_some() || self.depth.is_some()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn set(&mut self, field: FilterField) {
        match field {
            FilterField::Breadth(value) => self.breadth = value,
            FilterField::Persona(value) => self.persona = value,
            FilterField::Depth(value) => self.depth = value,
        }
    }

    pub fn matches(&self, question: &Question) -> bool {
        let controls = &question.controls;
        self.breadth.map_or(true, |b| controls.breadth == b)
            && self.persona.map_or(true, |p| controls.persona == p)
            && self.depth.map_or(true, |d| controls.depth == d)
    }

    /// True when every predicate of `other` is also set, identically, here.
    /// The result of `self` is then a subset of the result of `other`.
    pub fn narrows(&self, other: &FilterCriteria) -> bool {
        fn covers<T: PartialEq>(narrow: Option<T>, wide: Option<T>) -> bool {
            match wide {
                None => true,
                Some(_) => narrow == wide,
            }
        }
        covers(self.breadth, other.breadth)
            && covers(self.persona, other.persona)
            && covers(self.depth, other.depth)
    }

    /// Chip labels for the active predicates, e.g. `Depth: Medium`.
    pub fn active_labels(&self) -> Vec<String> {
        let mut labels = Vec::new();
        if let Some(breadth) = self.breadth {
            labels.push(format!("Breadth: {breadth}"));
        }
        if let Some(persona) = self.persona {
            labels.push(format!("Persona: {persona}"));
        }
        if let Some(depth) = self.depth {
            labels.push(format!("Depth: {}", depth.label()));
        }
        labels
    }
}

/// Questions matching every active predicate, in collection order.
pub fn filter_questions(questions: &[Question], criteria: &FilterCriteria) -> Vec<Question> {
    questions
        .iter()
        .filter(|q| criteria.matches(q))
        .cloned()
        .collect()
}
