//! Script Designer client - question collection state
//!
//! Holds the canonical list of interview questions for a session, keeps it
//! consistent under optimistic edits confirmed by the question service, and
//! derives filtered, navigable views over it.

pub mod actions;
pub mod api;
pub mod browser;
pub mod config;
pub mod cursor;
pub mod error;
pub mod filter;
pub mod normalize;
pub mod store;

pub use actions::{IngestReport, QuestionDraft, ScriptActions};
pub use api::{HttpQuestionService, QuestionService, ResumeFile};
pub use browser::QuestionBrowser;
pub use config::ClientConfig;
pub use cursor::NavigationCursor;
pub use error::{SchemaError, ScriptError};
pub use filter::{filter_questions, FilterCriteria, FilterField};
pub use normalize::{normalize_batch, normalize_question, NormalizedBatch};
pub use store::{QuestionCollectionState, QuestionPatch, QuestionStore, TouchedFields};
