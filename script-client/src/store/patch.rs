use shared_types::{Breadth, Depth, FollowUp, Persona, Question};

use crate::error::ScriptError;

/// Partial change to a single question
///
/// `None` leaves a field alone. `claim: Some(None)` clears the claim.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuestionPatch {
    pub main_question: Option<String>,
    pub claim: Option<Option<String>>,
    pub breadth: Option<Breadth>,
    pub persona: Option<Persona>,
    pub depth: Option<Depth>,
    pub follow_ups: Option<Vec<FollowUp>>,
}

impl QuestionPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn main_question(mut self, text: impl Into<String>) -> Self {
        self.main_question = Some(text.into());
        self
    }

    pub fn claim(mut self, claim: Option<String>) -> Self {
        self.claim = Some(claim);
        self
    }

    pub fn breadth(mut self, breadth: Breadth) -> Self {
        self.breadth = Some(breadth);
        self
    }

    pub fn persona(mut self, persona: Persona) -> Self {
        self.persona = Some(persona);
        self
    }

    pub fn depth(mut self, depth: Depth) -> Self {
        self.depth = Some(depth);
        self
    }

    pub fn follow_ups(mut self, follow_ups: Vec<FollowUp>) -> Self {
        self.follow_ups = Some(follow_ups);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.touched().is_empty()
    }

    /// Reject patches that would break the canonical shape.
    pub fn validate(&self) -> Result<(), ScriptError> {
        if let Some(text) = &self.main_question {
            if text.trim().is_empty() {
                return Err(ScriptError::InvalidDraft(
                    "main_question must not be blank".to_string(),
                ));
            }
        }
        if let Some(follow_ups) = &self.follow_ups {
            if follow_ups.iter().any(|f| f.question.trim().is_empty()) {
                return Err(ScriptError::InvalidDraft(
                    "follow-up question must not be blank".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn apply_to(&self, question: &mut Question) {
        if let Some(text) = &self.main_question {
            question.main_question = text.clone();
        }
        if let Some(claim) = &self.claim {
            question.claim = claim.clone().filter(|c| !c.trim().is_empty());
        }
        if let Some(breadth) = self.breadth {
            question.controls.breadth = breadth;
        }
        if let Some(persona) = self.persona {
            question.controls.persona = persona;
        }
        if let Some(depth) = self.depth {
            question.controls.depth = depth;
        }
        if let Some(follow_ups) = &self.follow_ups {
            question.follow_ups = follow_ups.clone();
        }
    }

    pub fn touched(&self) -> TouchedFields {
        TouchedFields {
            main_question: self.main_question.is_some(),
            claim: self.claim.is_some(),
            breadth: self.breadth.is_some(),
            persona: self.persona.is_some(),
            depth: self.depth.is_some(),
            follow_ups: self.follow_ups.is_some(),
        }
    }
}

/// Fields written by one or more in-flight edits of a question
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TouchedFields {
    pub main_question: bool,
    pub claim: bool,
    pub breadth: bool,
    pub persona: bool,
    pub depth: bool,
    pub follow_ups: bool,
}

impl TouchedFields {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn union(self, other: TouchedFields) -> TouchedFields {
        TouchedFields {
            main_question: self.main_question || other.main_question,
            claim: self.claim || other.claim,
            breadth: self.breadth || other.breadth,
            persona: self.persona || other.persona,
            depth: self.depth || other.depth,
            follow_ups: self.follow_ups || other.follow_ups,
        }
    }

    /// Fields whose values differ between `a` and `b`.
    pub fn changed_between(a: &Question, b: &Question) -> TouchedFields {
        TouchedFields {
            main_question: a.main_question != b.main_question,
            claim: a.claim != b.claim,
            breadth: a.controls.breadth != b.controls.breadth,
            persona: a.controls.persona != b.controls.persona,
            depth: a.controls.depth != b.controls.depth,
            follow_ups: a.follow_ups != b.follow_ups,
        }
    }

    /// Fields set here but not in `other`.
    pub fn minus(self, other: TouchedFields) -> TouchedFields {
        TouchedFields {
            main_question: self.main_question && !other.main_question,
            claim: self.claim && !other.claim,
            breadth: self.breadth && !other.breadth,
            persona: self.persona && !other.persona,
            depth: self.depth && !other.depth,
            follow_ups: self.follow_ups && !other.follow_ups,
        }
    }

    /// Copy the touched fields of `before` back onto `target`.
    pub fn restore(&self, target: &mut Question, before: &Question) {
        if self.main_question {
            target.main_question = before.main_question.clone();
        }
        if self.claim {
            target.claim = before.claim.clone();
        }
        if self.breadth {
            target.controls.breadth = before.controls.breadth;
        }
        if self.persona {
            target.controls.persona = before.controls.persona;
        }
        if self.depth {
            target.controls.depth = before.controls.depth;
        }
        if self.follow_ups {
            target.follow_ups = before.follow_ups.clone();
        }
    }
}
