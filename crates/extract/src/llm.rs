use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::schema::{AnalysisTask, GroundingChunk};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_CREDENTIAL_VARS: [&str; 2] = ["API_KEY", "GEMINI_API_KEY"];
pub const JSON_MIME_TYPE: &str = "application/json";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// Missing or rejected API key
    #[error(
        "The Gemini API key is missing or invalid in the application's environment configuration. Please ensure it is set correctly. Details: {details}"
    )]
    Credential { details: String },

    #[error("Gemini model name is not provided.")]
    MissingModel,

    #[error(
        "Google Search tool does not support JSON response type. This is an internal configuration issue. Original error: {details}"
    )]
    ConflictingOptions { details: String },

    #[error(
        "The selected model \"{model}\" is not supported or is invalid. Please choose a different model in Settings. Details: {details}"
    )]
    UnsupportedModel { model: String, details: String },

    #[error("Gemini API request failed: {details}")]
    RequestFailed { details: String },
}

impl ModelError {
    /// Rewrite a raw request failure into a user-actionable error by message signature.
    pub fn classify(self, task: AnalysisTask, model: &str) -> Self {
        let Self::RequestFailed { details } = self else {
            return self;
        };
        let lower = details.to_lowercase();

        if lower.contains("api key not valid")
            || lower.contains("api_key_invalid")
            || lower.contains("api key for gemini is not configured")
        {
            return Self::Credential { details };
        }
        if task.uses_search()
            && details.contains("400 Bad Request")
            && details.contains("application/json is not supported")
        {
            return Self::ConflictingOptions { details };
        }
        if lower.contains("model is not supported") || lower.contains("is not found for api version") {
            return Self::UnsupportedModel {
                model: model.to_string(),
                details,
            };
        }
        Self::RequestFailed { details }
    }

    /// Missing credential, missing model and option conflicts are configuration problems.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Credential { .. } | Self::MissingModel | Self::ConflictingOptions { .. } | Self::UnsupportedModel { .. }
        )
    }
}

/// Sampling options sent with every request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
}

impl GenerationConfig {
    pub fn for_task(task: AnalysisTask) -> Self {
        if task.expects_json() {
            Self {
                temperature: 0.2,
                top_k: 40,
                top_p: 0.9,
                response_mime_type: Some(JSON_MIME_TYPE.to_string()),
            }
        } else {
            Self {
                temperature: 0.5,
                top_k: 64,
                top_p: 0.9,
                response_mime_type: None,
            }
        }
    }

    pub fn is_json_mode(&self) -> bool {
        self.response_mime_type.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub config: GenerationConfig,
    pub search_grounding: bool,
}

impl GenerateRequest {
    pub fn for_task(model: &str, prompt: String, task: AnalysisTask) -> Self {
        Self {
            model: model.to_string(),
            prompt,
            config: GenerationConfig::for_task(task),
            search_grounding: task.uses_search(),
        }
    }

    /// The API rejects JSON mode combined with the search tool.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.search_grounding && self.config.is_json_mode() {
            return Err(ModelError::ConflictingOptions {
                details: "request asked for application/json together with the googleSearch tool".to_string(),
            });
        }
        Ok(())
    }
}

/// Raw reply before any shape interpretation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelReply {
    pub text: String,
    pub grounding: Vec<GroundingChunk>,
}

/// A text-generation backend. One attempt per call.
#[allow(async_fn_in_trait)]
pub trait ModelClient {
    async fn generate(&self, request: &GenerateRequest) -> Result<ModelReply, ModelError>;
}

#[derive(Debug, Clone)]
enum Credential {
    /// Looked up at call time, first non-empty variable wins
    Env(Vec<String>),
    Static(String),
}

impl Credential {
    fn resolve(&self) -> Result<String, ModelError> {
        match self {
            Self::Static(key) if !key.trim().is_empty() => Ok(key.clone()),
            Self::Static(_) => Err(ModelError::Credential {
                details: "API key for Gemini is not configured.".to_string(),
            }),
            Self::Env(vars) => vars
                .iter()
                .find_map(|var| std::env::var(var).ok().filter(|v| !v.trim().is_empty()))
                .ok_or_else(|| ModelError::Credential {
                    details: format!(
                        "API key for Gemini is not configured in the environment ({}).",
                        vars.join(" or ")
                    ),
                }),
        }
    }
}

#[derive(Clone)]
pub struct GeminiClient {
    base_url: String,
    credential: Credential,
    client: reqwest::Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: &'a GenerationConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Tool {
    google_search: GoogleSearch,
}

#[derive(Serialize)]
struct GoogleSearch {}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<WireGroundingChunk>,
}

#[derive(Deserialize)]
struct WireGroundingChunk {
    web: Option<WebSource>,
}

#[derive(Deserialize)]
struct WebSource {
    uri: Option<String>,
    title: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    details: Vec<ApiErrorReason>,
}

#[derive(Deserialize)]
struct ApiErrorReason {
    reason: Option<String>,
}

impl Default for GeminiClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL.to_string(), Duration::from_secs(120))
    }
}

impl GeminiClient {
    pub fn new(base_url: String, timeout: Duration) -> Self {
        let client = reqwest::Client::builder().timeout(timeout).build().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Falling back to default HTTP client");
            reqwest::Client::new()
        });

        Self {
            base_url,
            credential: Credential::Env(DEFAULT_CREDENTIAL_VARS.iter().map(|v| v.to_string()).collect()),
            client,
        }
    }

    /// Read the key from these environment variables instead of the defaults
    pub fn with_credential_vars(mut self, vars: Vec<String>) -> Self {
        self.credential = Credential::Env(vars);
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.credential = Credential::Static(key.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn body<'a>(request: &'a GenerateRequest) -> GeminiRequest<'a> {
        GeminiRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: &request.prompt }],
            }],
            generation_config: &request.config,
            tools: if request.search_grounding {
                vec![Tool { google_search: GoogleSearch {} }]
            } else {
                Vec::new()
            },
        }
    }

    fn failure_details(status: reqwest::StatusCode, body: &str) -> String {
        let status_line = format!(
            "{} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown Status")
        );

        match serde_json::from_str::<ApiErrorBody>(body) {
            Ok(parsed) => {
                let reasons: Vec<String> = parsed.error.details.into_iter().filter_map(|d| d.reason).collect();
                if reasons.is_empty() {
                    format!("{}: {}", status_line, parsed.error.message)
                } else {
                    format!("{}: {} [{}]", status_line, parsed.error.message, reasons.join(", "))
                }
            }
            Err(_) if body.trim().is_empty() => status_line,
            Err(_) => format!("{}: {}", status_line, body.trim()),
        }
    }

    fn reply_from(response: GeminiResponse) -> ModelReply {
        let Some(candidate) = response.candidates.into_iter().next() else {
            return ModelReply::default();
        };

        let text = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter(|part| !part.thought)
                    .filter_map(|part| part.text)
                    .collect::<String>()
            })
            .unwrap_or_default();

        let grounding = candidate
            .grounding_metadata
            .map(|meta| {
                meta.grounding_chunks
                    .into_iter()
                    .filter_map(|chunk| chunk.web)
                    .filter_map(|web| {
                        let uri = web.uri?;
                        Some(GroundingChunk {
                            title: web.title.unwrap_or_default(),
                            uri,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        ModelReply { text, grounding }
    }
}

impl ModelClient for GeminiClient {
    async fn generate(&self, request: &GenerateRequest) -> Result<ModelReply, ModelError> {
        let api_key = self.credential.resolve()?;
        if request.model.trim().is_empty() {
            return Err(ModelError::MissingModel);
        }
        request.validate()?;

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            request.model.trim()
        );

        tracing::debug!(
            model = %request.model,
            json_mode = request.config.is_json_mode(),
            search = request.search_grounding,
            prompt_chars = request.prompt.len(),
            "Sending generateContent request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&Self::body(request))
            .send()
            .await
            .map_err(|e| ModelError::RequestFailed { details: e.to_string() })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ModelError::RequestFailed { details: e.to_string() })?;

        if !status.is_success() {
            return Err(ModelError::RequestFailed {
                details: Self::failure_details(status, &body),
            });
        }

        let parsed: GeminiResponse = serde_json::from_str(&body).map_err(|e| ModelError::RequestFailed {
            details: format!("could not decode response: {}", e),
        })?;

        let reply = Self::reply_from(parsed);
        tracing::debug!(
            reply_chars = reply.text.len(),
            citations = reply.grounding.len(),
            "Received generateContent reply"
        );
        Ok(reply)
    }
}
