use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use shared_types::{
    GenerateResponse, GenerationDefaults, SaveScriptRequest, UpdateQuestionRequest,
    UpdateQuestionResponse, UploadResumeResponse, ENDPOINT_GENERATE_QUESTIONS,
    ENDPOINT_SAVE_SCRIPT, ENDPOINT_UPDATE_QUESTION, ENDPOINT_UPLOAD_RESUME,
};

use crate::config::ClientConfig;
use crate::error::ScriptError;

/// Resume document as uploaded to the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ResumeFile {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    pub async fn read(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "resume".to_string());
        Ok(Self { file_name, bytes })
    }

    pub fn mime(&self) -> &'static str {
        let extension = Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("pdf") => "application/pdf",
            Some("docx") => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Some("doc") => "application/msword",
            Some("txt") => "text/plain",
            _ => "application/octet-stream",
        }
    }

    fn form(&self) -> Result<Form, ScriptError> {
        let part = Part::bytes(self.bytes.clone())
            .file_name(self.file_name.clone())
            .mime_str(self.mime())?;
        Ok(Form::new().part("file", part))
    }
}

/// Remote question service
///
/// Responses are returned as received. Interpreting their payloads is the
/// caller's job.
#[async_trait]
pub trait QuestionService: Send + Sync {
    async fn upload_resume(&self, resume: &ResumeFile) -> Result<UploadResumeResponse, ScriptError>;

    async fn generate_questions(
        &self,
        resume: &ResumeFile,
        defaults: &GenerationDefaults,
    ) -> Result<GenerateResponse, ScriptError>;

    async fn update_question(
        &self,
        request: &UpdateQuestionRequest,
    ) -> Result<UpdateQuestionResponse, ScriptError>;

    async fn save_script(&self, request: &SaveScriptRequest) -> Result<(), ScriptError>;
}

#[async_trait]
impl<S: QuestionService + ?Sized> QuestionService for Arc<S> {
    async fn upload_resume(&self, resume: &ResumeFile) -> Result<UploadResumeResponse, ScriptError> {
        (**self).upload_resume(resume).await
    }

    async fn generate_questions(
        &self,
        resume: &ResumeFile,
        defaults: &GenerationDefaults,
    ) -> Result<GenerateResponse, ScriptError> {
        (**self).generate_questions(resume, defaults).await
    }

    async fn update_question(
        &self,
        request: &UpdateQuestionRequest,
    ) -> Result<UpdateQuestionResponse, ScriptError> {
        (**self).update_question(request).await
    }

    async fn save_script(&self, request: &SaveScriptRequest) -> Result<(), ScriptError> {
        (**self).save_script(request).await
    }
}

/// [`QuestionService`] over HTTP
#[derive(Debug, Clone)]
pub struct HttpQuestionService {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpQuestionService {
    pub fn new(config: ClientConfig) -> Result<Self, ScriptError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

#[async_trait]
impl QuestionService for HttpQuestionService {
    async fn upload_resume(&self, resume: &ResumeFile) -> Result<UploadResumeResponse, ScriptError> {
        let url = self.config.endpoint(ENDPOINT_UPLOAD_RESUME);
        tracing::debug!(%url, file_name = %resume.file_name, "Uploading resume");

        let response = self
            .client
            .post(&url)
            .multipart(resume.form()?)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ScriptError::Network(describe_http_error(response).await));
        }
        Ok(response.json().await?)
    }

    async fn generate_questions(
        &self,
        resume: &ResumeFile,
        defaults: &GenerationDefaults,
    ) -> Result<GenerateResponse, ScriptError> {
        let url = self.config.endpoint(ENDPOINT_GENERATE_QUESTIONS);
        tracing::debug!(
            %url,
            num_questions = defaults.num_questions,
            depth = defaults.depth.value(),
            breadth = %defaults.breadth,
            persona = %defaults.persona,
            "Requesting question generation"
        );

        // The service reads generation parameters from headers, not the form.
        let response = self
            .client
            .post(&url)
            .header("num_questions", defaults.num_questions.to_string())
            .header("depth", defaults.depth.to_string())
            .header("breadth", defaults.breadth.as_str())
            .header("persona", defaults.persona.as_str())
            .multipart(resume.form()?)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ScriptError::Network(describe_http_error(response).await));
        }
        Ok(response.json().await?)
    }

    async fn update_question(
        &self,
        request: &UpdateQuestionRequest,
    ) -> Result<UpdateQuestionResponse, ScriptError> {
        let url = self.config.endpoint(ENDPOINT_UPDATE_QUESTION);
        tracing::debug!(%url, question_id = %request.question.id, "Confirming question update");

        let response = self.client.post(&url).json(request).send().await?;
        if !response.status().is_success() {
            return Err(ScriptError::Network(describe_http_error(response).await));
        }
        Ok(response.json().await?)
    }

    async fn save_script(&self, request: &SaveScriptRequest) -> Result<(), ScriptError> {
        let url = self.config.endpoint(ENDPOINT_SAVE_SCRIPT);
        tracing::debug!(%url, questions = request.questions.len(), "Saving script");

        let response = self.client.post(&url).json(request).send().await?;
        if !response.status().is_success() {
            return Err(ScriptError::Network(describe_http_error(response).await));
        }
        Ok(())
    }
}

async fn describe_http_error(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    describe_error_body(status.as_u16(), &body)
}

fn describe_error_body(status: u16, body: &str) -> String {
    if body.trim().is_empty() {
        return format!("HTTP error: {status}");
    }

    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        for field in ["detail", "error", "message"] {
            if let Some(reason) = json.get(field).and_then(|v| v.as_str()) {
                return format!("HTTP error: {status} ({reason})");
            }
        }
    }

    format!("HTTP error: {status} ({body})")
}
