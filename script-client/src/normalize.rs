//! Single ingestion boundary for question payloads.
//!
//! The question service has emitted two shapes over time:
//! - flat: `breadth`, `persona`, `depth` and `follow_ups` at the top level
//! - nested: `controls.{breadth,persona,depth}`, with `follow_ups` or the
//!   older `followup_bank`
//!
//! Everything past this module sees only the canonical [`Question`]. No other
//! module reads raw question JSON.

use std::collections::HashSet;

use serde_json::{Map, Value};
use shared_types::{Breadth, Controls, Depth, FollowUp, Persona, Question, QuestionId};

use crate::error::SchemaError;

/// Result of normalizing one batch from the service
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedBatch {
    pub questions: Vec<Question>,
    pub rejected: Vec<SchemaError>,
}

/// Normalize a raw question in either historical shape.
///
/// `controls.<field>` wins over the flat field, and `follow_ups` wins over
/// `followup_bank`. Absent controls take the service's fill-in defaults.
pub fn normalize_question(raw: &Value) -> Result<Question, SchemaError> {
    let obj = raw.as_object().ok_or(SchemaError::NotAnObject)?;
    let id = parse_id(obj)?;

    let main_question = obj
        .get("main_question")
        .and_then(Value::as_str)
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| SchemaError::MissingMainQuestion(id.clone()))?
        .to_string();

    let claim = obj
        .get("claim")
        .and_then(Value::as_str)
        .filter(|text| !text.trim().is_empty())
        .map(ToString::to_string);

    let controls = parse_controls(&id, obj)?;
    let follow_ups = parse_follow_ups(&id, obj);

    Ok(Question {
        id,
        claim,
        main_question,
        controls,
        follow_ups,
    })
}

/// Normalize every entry of a batch.
///
/// Failing entries are dropped and reported without aborting the rest, and
/// a repeated id keeps only its first occurrence.
pub fn normalize_batch(raw: &[Value]) -> NormalizedBatch {
    let mut batch = NormalizedBatch::default();
    let mut seen = HashSet::new();

    for entry in raw {
        match normalize_question(entry) {
            Ok(question) => {
                if seen.insert(question.id.clone()) {
                    batch.questions.push(question);
                } else {
                    batch.rejected.push(SchemaError::DuplicateId(question.id));
                }
            }
            Err(err) => batch.rejected.push(err),
        }
    }

    batch
}

fn parse_id(obj: &Map<String, Value>) -> Result<QuestionId, SchemaError> {
    match obj.get("id") {
        None | Some(Value::Null) => Err(SchemaError::MissingId),
        Some(Value::String(raw)) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                Err(SchemaError::MissingId)
            } else {
                Ok(QuestionId::from(trimmed))
            }
        }
        Some(Value::Number(n)) => {
            if let Some(id) = n.as_u64() {
                Ok(QuestionId::from(id))
            } else if let Some(id) = n.as_i64() {
                Ok(QuestionId::from(id.to_string()))
            } else {
                Err(SchemaError::InvalidId(n.to_string()))
            }
        }
        Some(other) => Err(SchemaError::InvalidId(other.to_string())),
    }
}

/// `controls.<field>` first, then the flat field. JSON `null` counts as absent.
fn control_value<'a>(obj: &'a Map<String, Value>, field: &str) -> Option<&'a Value> {
    obj.get("controls")
        .and_then(Value::as_object)
        .and_then(|controls| controls.get(field))
        .filter(|value| !value.is_null())
        .or_else(|| obj.get(field).filter(|value| !value.is_null()))
}

fn parse_controls(id: &QuestionId, obj: &Map<String, Value>) -> Result<Controls, SchemaError> {
    let defaults = Controls::default();
    let invalid = |field: &'static str, value: &Value| SchemaError::InvalidControl {
        id: id.clone(),
        field,
        value: value.to_string(),
    };

    let breadth = match control_value(obj, "breadth") {
        Some(value) => value
            .as_str()
            .and_then(|raw| raw.parse::<Breadth>().ok())
            .ok_or_else(|| invalid("breadth", value))?,
        None => defaults.breadth,
    };

    let persona = match control_value(obj, "persona") {
        Some(value) => value
            .as_str()
            .and_then(|raw| raw.parse::<Persona>().ok())
            .ok_or_else(|| invalid("persona", value))?,
        None => defaults.persona,
    };

    let depth = match control_value(obj, "depth") {
        Some(value) => parse_depth(value).ok_or_else(|| invalid("depth", value))?,
        None => defaults.depth,
    };

    Ok(Controls {
        breadth,
        persona,
        depth,
    })
}

/// Integers, whole floats, and numeric strings ("2") all occur on the wire.
fn parse_depth(value: &Value) -> Option<Depth> {
    let raw = value
        .as_u64()
        .or_else(|| {
            value
                .as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0)
                .map(|f| f as u64)
        })
        .or_else(|| value.as_str().and_then(|s| s.trim().parse::<u64>().ok()))?;
    u8::try_from(raw).ok().and_then(Depth::new)
}

fn parse_follow_ups(id: &QuestionId, obj: &Map<String, Value>) -> Vec<FollowUp> {
    let Some(entries) = obj
        .get("follow_ups")
        .and_then(Value::as_array)
        .or_else(|| obj.get("followup_bank").and_then(Value::as_array))
    else {
        return Vec::new();
    };

    let mut follow_ups = Vec::with_capacity(entries.len());
    for (position, entry) in entries.iter().enumerate() {
        match parse_follow_up(entry) {
            Some(follow_up) => follow_ups.push(follow_up),
            None => tracing::warn!(
                question_id = %id,
                position,
                "Skipping follow-up without question text"
            ),
        }
    }
    follow_ups
}

fn parse_follow_up(entry: &Value) -> Option<FollowUp> {
    match entry {
        Value::String(text) if !text.trim().is_empty() => Some(FollowUp::new(text.as_str())),
        Value::Object(map) => {
            let question = map
                .get("question")
                .or_else(|| map.get("text"))
                .and_then(Value::as_str)
                .filter(|text| !text.trim().is_empty())?;
            let nested = map
                .get("nested")
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .filter(|text| !text.trim().is_empty())
                        .map(ToString::to_string)
                        .collect()
                })
                .unwrap_or_default();
            Some(FollowUp {
                question: question.to_string(),
                nested,
            })
        }
        _ => None,
    }
}
