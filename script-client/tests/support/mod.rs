//! Scripted in-memory question service for integration tests
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use script_client::{QuestionService, ResumeFile, ScriptActions, ScriptError};
use serde_json::{json, Value};
use shared_types::{
    GenerateResponse, GenerationDefaults, QuestionId, QuestionSetPayload, SaveScriptRequest,
    UpdateQuestionRequest, UpdateQuestionResponse, UploadResumeResponse,
};
use tokio::sync::oneshot;

pub const RESUME_TEXT: &str = "Jane Doe. Led the billing migration at Acme.";

/// Canned reply to one update-question call
pub struct ScriptedUpdate {
    gate: Option<oneshot::Receiver<()>>,
    result: Option<Result<UpdateQuestionResponse, ScriptError>>,
}

impl ScriptedUpdate {
    /// Reply with `result` immediately.
    pub fn reply(result: Result<UpdateQuestionResponse, ScriptError>) -> Self {
        Self {
            gate: None,
            result: Some(result),
        }
    }

    /// Echo the request back immediately.
    pub fn echo() -> Self {
        Self {
            gate: None,
            result: None,
        }
    }

    /// Hold the reply until `gate` fires (or its sender is dropped).
    pub fn gated(mut self, gate: oneshot::Receiver<()>) -> Self {
        self.gate = Some(gate);
        self
    }
}

#[derive(Default)]
pub struct ScriptedService {
    uploads: Mutex<VecDeque<Result<UploadResumeResponse, ScriptError>>>,
    generations: Mutex<VecDeque<Result<GenerateResponse, ScriptError>>>,
    updates: Mutex<HashMap<QuestionId, VecDeque<ScriptedUpdate>>>,
    saves: Mutex<VecDeque<Result<(), ScriptError>>>,
    save_gate: Mutex<Option<oneshot::Receiver<()>>>,
    pub update_requests: Mutex<Vec<UpdateQuestionRequest>>,
    pub save_requests: Mutex<Vec<SaveScriptRequest>>,
    pub generation_requests: Mutex<Vec<GenerationDefaults>>,
}

impl ScriptedService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_upload(&self, result: Result<UploadResumeResponse, ScriptError>) {
        self.uploads.lock().unwrap().push_back(result);
    }

    pub fn push_generation(&self, result: Result<GenerateResponse, ScriptError>) {
        self.generations.lock().unwrap().push_back(result);
    }

    pub fn push_questions(&self, questions: Vec<Value>) {
        self.push_generation(Ok(GenerateResponse {
            status: Some("success".to_string()),
            data: QuestionSetPayload { questions },
        }));
    }

    pub fn push_update(&self, id: &str, update: ScriptedUpdate) {
        self.updates
            .lock()
            .unwrap()
            .entry(QuestionId::from(id))
            .or_default()
            .push_back(update);
    }

    pub fn push_save(&self, result: Result<(), ScriptError>) {
        self.saves.lock().unwrap().push_back(result);
    }

    pub fn gate_save(&self, gate: oneshot::Receiver<()>) {
        *self.save_gate.lock().unwrap() = Some(gate);
    }

    pub fn update_requests(&self) -> Vec<UpdateQuestionRequest> {
        self.update_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl QuestionService for ScriptedService {
    async fn upload_resume(&self, _resume: &ResumeFile) -> Result<UploadResumeResponse, ScriptError> {
        let scripted = self.uploads.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| {
            Ok(UploadResumeResponse {
                status: Some("success".to_string()),
                resume_text: RESUME_TEXT.to_string(),
            })
        })
    }

    async fn generate_questions(
        &self,
        _resume: &ResumeFile,
        defaults: &GenerationDefaults,
    ) -> Result<GenerateResponse, ScriptError> {
        self.generation_requests.lock().unwrap().push(*defaults);
        let scripted = self.generations.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| {
            Ok(GenerateResponse {
                status: Some("success".to_string()),
                data: QuestionSetPayload::default(),
            })
        })
    }

    async fn update_question(
        &self,
        request: &UpdateQuestionRequest,
    ) -> Result<UpdateQuestionResponse, ScriptError> {
        self.update_requests.lock().unwrap().push(request.clone());
        let scripted = self
            .updates
            .lock()
            .unwrap()
            .get_mut(&request.question.id)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(ScriptedUpdate::echo);

        if let Some(gate) = scripted.gate {
            let _ = gate.await;
        }
        scripted.result.unwrap_or_else(|| Ok(success(json!(request.question))))
    }

    async fn save_script(&self, request: &SaveScriptRequest) -> Result<(), ScriptError> {
        self.save_requests.lock().unwrap().push(request.clone());
        let gate = self.save_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        let scripted = self.saves.lock().unwrap().pop_front();
        scripted.unwrap_or(Ok(()))
    }
}

pub fn success(data: Value) -> UpdateQuestionResponse {
    UpdateQuestionResponse {
        status: Some("success".to_string()),
        data,
    }
}

pub fn network_down() -> ScriptError {
    ScriptError::Network("Request failed: connection refused".to_string())
}

pub fn resume() -> ResumeFile {
    ResumeFile::new("jane_doe.pdf", b"%PDF-1.7".to_vec())
}

/// Raw question in the flat shape
pub fn flat_question(id: u64, breadth: &str, persona: &str, depth: u8) -> Value {
    json!({
        "id": id,
        "claim": format!("Claim {id}"),
        "main_question": format!("Question {id}?"),
        "breadth": breadth,
        "persona": persona,
        "depth": depth,
        "follow_ups": [{"question": format!("Follow-up {id}?"), "nested": []}]
    })
}

/// Raw question in the nested shape, with the older follow-up bank
pub fn nested_question(id: u64, breadth: &str, persona: &str, depth: u8) -> Value {
    json!({
        "id": id,
        "claim": format!("Claim {id}"),
        "main_question": format!("Question {id}?"),
        "controls": {"breadth": breadth, "persona": persona, "depth": depth},
        "followup_bank": [format!("Follow-up {id}?")]
    })
}

pub type Actions = ScriptActions<Arc<ScriptedService>>;

/// Actions over a collection generated from `questions`.
pub async fn seeded(questions: Vec<Value>) -> (Actions, Arc<ScriptedService>) {
    let service = ScriptedService::new();
    service.push_questions(questions);
    let actions = ScriptActions::new(Arc::clone(&service), GenerationDefaults::default());
    actions
        .generate(&resume())
        .await
        .expect("seed generation succeeds");
    (actions, service)
}

pub fn id(raw: &str) -> QuestionId {
    QuestionId::from(raw)
}
