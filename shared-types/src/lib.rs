//! Shared types for the interview script designer
//!
//! These types are used by:
//! - the question-state client (native Rust)
//! - the web front end (via the exported TypeScript bindings)
//!
//! Serializable with serde for JSON over HTTP. Canonical questions always
//! serialize in the nested `controls` shape.

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

// ============================================================================
// Core Types
// ============================================================================

/// Unique identifier for a question
///
/// The service hands out numeric ids, locally authored questions get UUIDs.
/// Both are carried as a string so equality never depends on the wire type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, TS)]
#[ts(export, export_to = "script-types.ts")]
pub struct QuestionId(pub String);

impl QuestionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for QuestionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for QuestionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for QuestionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<u64> for QuestionId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

/// Rejected value for one of the enumerated question controls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownControl {
    pub field: &'static str,
    pub value: String,
}

impl UnknownControl {
    fn new(field: &'static str, value: &str) -> Self {
        Self {
            field,
            value: value.to_string(),
        }
    }
}

impl fmt::Display for UnknownControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} '{}'", self.field, self.value)
    }
}

impl std::error::Error for UnknownControl {}

/// Lowercase, with `_` and spaces folded into `-`, so "Metrics_driven" and
/// "metrics-Driven" land on the same token.
fn control_token(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| match c {
            '_' | ' ' => '-',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default, TS)]
#[ts(export, export_to = "script-types.ts")]
pub enum Breadth {
    Low,
    #[default]
    Medium,
    High,
}

impl Breadth {
    pub const ALL: [Breadth; 3] = [Breadth::Low, Breadth::Medium, Breadth::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl fmt::Display for Breadth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Breadth {
    type Err = UnknownControl;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match control_token(s).as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(UnknownControl::new("breadth", s)),
        }
    }
}

/// Interviewer persona used to phrase follow-ups
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default, TS)]
#[ts(export, export_to = "script-types.ts")]
pub enum Persona {
    #[serde(rename = "Evidence-first")]
    EvidenceFirst,
    #[default]
    #[serde(rename = "Why-How")]
    WhyHow,
    #[serde(rename = "Metrics-Driven")]
    MetricsDriven,
    Storytelling,
}

impl Persona {
    pub const ALL: [Persona; 4] = [
        Persona::EvidenceFirst,
        Persona::WhyHow,
        Persona::MetricsDriven,
        Persona::Storytelling,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EvidenceFirst => "Evidence-first",
            Self::WhyHow => "Why-How",
            Self::MetricsDriven => "Metrics-Driven",
            Self::Storytelling => "Storytelling",
        }
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Persona {
    type Err = UnknownControl;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match control_token(s).as_str() {
            "evidence-first" => Ok(Self::EvidenceFirst),
            "why-how" => Ok(Self::WhyHow),
            "metrics-driven" => Ok(Self::MetricsDriven),
            "storytelling" => Ok(Self::Storytelling),
            _ => Err(UnknownControl::new("persona", s)),
        }
    }
}

/// Follow-up depth, always within `0..=Depth::MAX`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, TS)]
#[ts(export, export_to = "script-types.ts")]
pub struct Depth(u8);

impl Depth {
    pub const MAX: u8 = 3;
    pub const NONE: Depth = Depth(0);

    const LABELS: [&'static str; 4] = ["None", "Low", "Medium", "High"];

    pub fn new(value: u8) -> Option<Self> {
        (value <= Self::MAX).then_some(Self(value))
    }

    pub fn all() -> impl Iterator<Item = Depth> {
        (0..=Self::MAX).map(Depth)
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    pub fn label(&self) -> &'static str {
        Self::LABELS[usize::from(self.0)]
    }
}

impl Default for Depth {
    fn default() -> Self {
        Self(1)
    }
}

impl fmt::Display for Depth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Depth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.0)
    }
}

impl<'de> Deserialize<'de> for Depth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = u8::deserialize(deserializer)?;
        Depth::new(value).ok_or_else(|| {
            de::Error::custom(format!("depth {value} outside 0..={}", Depth::MAX))
        })
    }
}

/// Per-question generation controls
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, TS)]
#[ts(export, export_to = "script-types.ts")]
pub struct Controls {
    pub breadth: Breadth,
    pub persona: Persona,
    pub depth: Depth,
}

/// One follow-up probe with its ordered sub-probes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, TS)]
#[ts(export, export_to = "script-types.ts")]
pub struct FollowUp {
    pub question: String,
    #[serde(default)]
    pub nested: Vec<String>,
}

impl FollowUp {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            nested: Vec::new(),
        }
    }

    pub fn with_nested(mut self, nested: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.nested = nested.into_iter().map(Into::into).collect();
        self
    }
}

/// Canonical interview question
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, TS)]
#[ts(export, export_to = "script-types.ts")]
pub struct Question {
    pub id: QuestionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub claim: Option<String>,
    pub main_question: String,
    pub controls: Controls,
    #[serde(default)]
    pub follow_ups: Vec<FollowUp>,
}

// ============================================================================
// Errors surfaced to the UI
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "script-types.ts")]
pub enum ErrorKind {
    Schema,
    Network,
    Validation,
}

/// The single error slot of the question collection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[ts(export, export_to = "script-types.ts")]
pub struct ErrorRecord {
    pub kind: ErrorKind,
    /// Generic, user-facing message
    pub message: String,
    /// Underlying cause, for logs and debug views
    pub detail: Option<String>,
    pub question_id: Option<QuestionId>,
    pub occurred_at: DateTime<Utc>,
}

impl ErrorRecord {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: None,
            question_id: None,
            occurred_at: Utc::now(),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn for_question(mut self, id: Option<&QuestionId>) -> Self {
        self.question_id = id.cloned();
        self
    }
}

// ============================================================================
// API Types
// ============================================================================

/// Parameters the service uses for a fresh generation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS)]
#[ts(export, export_to = "script-types.ts")]
pub struct GenerationDefaults {
    pub num_questions: u32,
    pub depth: Depth,
    pub breadth: Breadth,
    pub persona: Persona,
}

impl Default for GenerationDefaults {
    fn default() -> Self {
        Self {
            num_questions: 10,
            depth: Depth::NONE,
            breadth: Breadth::Low,
            persona: Persona::WhyHow,
        }
    }
}

/// Response of `POST /upload-resume/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResumeResponse {
    #[serde(default)]
    pub status: Option<String>,
    pub resume_text: String,
}

/// Response of `POST /generate-questions/`
///
/// Questions stay raw here; either historical shape may appear.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub status: Option<String>,
    pub data: QuestionSetPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct QuestionSetPayload {
    #[serde(default)]
    pub questions: Vec<serde_json::Value>,
}

/// Request body of `POST /update-question/`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[ts(export, export_to = "script-types.ts")]
pub struct UpdateQuestionRequest {
    pub resume_text: String,
    pub question: Question,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub breadth: Option<Breadth>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub depth: Option<Depth>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub persona: Option<Persona>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub regenerate_followups: Option<bool>,
}

/// Response of `POST /update-question/`
///
/// `data` is kept raw: it may be in either shape, or missing entirely when
/// the service misbehaves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateQuestionResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Request body of `POST /save-script/`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[ts(export, export_to = "script-types.ts")]
pub struct SaveScriptRequest {
    pub questions: Vec<Question>,
}

// ============================================================================
// Constants
// ============================================================================

/// Service endpoints, relative to the API base
pub const ENDPOINT_UPLOAD_RESUME: &str = "/upload-resume/";
pub const ENDPOINT_GENERATE_QUESTIONS: &str = "/generate-questions/";
pub const ENDPOINT_UPDATE_QUESTION: &str = "/update-question/";
pub const ENDPOINT_SAVE_SCRIPT: &str = "/save-script/";

pub const DEFAULT_API_BASE: &str = "http://localhost:8000/api/v1";

/// `status` value the service reports on success
pub const STATUS_SUCCESS: &str = "success";

// ============================================================================
// Tests
// ============================================================================
