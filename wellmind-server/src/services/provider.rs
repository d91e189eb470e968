//! Completion provider client.
//!
//! Talks to a Cohere-style `/v1/chat` endpoint.  A turn walks a fixed,
//! ordered list of model identifiers and stops at the first one that answers
//! with HTTP 200 and non-empty text.  Every other outcome (transport error,
//! timeout, non-200 status, undecodable body, empty text) moves on to the
//! next model; nothing is retried and nothing is surfaced as an error.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::entities::Role;

/// Model identifiers in priority order (most capable / most recent first).
pub const COHERE_MODELS: &[&str] = &[
    "command-r-08-2024",
    "command-r-plus-08-2024",
    "command-r",
    "command-r-plus",
    "aya-23-8B",
    "aya-23-35B",
    "c4ai-command-r-v01",
    "c4ai-command-r-plus",
];

/// Fixed system instruction sent as the `preamble` of every chat call.
pub const SYSTEM_PREAMBLE: &str = "You are 'Elmed Wellmind Solutions', a compassionate mental health assistant specifically designed for Kenyan users. Your role is to provide supportive, empathetic responses with general mental health information and evidence-based coping strategies.

CRITICAL RULES:
1. NEVER provide medical diagnoses, prescriptions, or specific treatment plans
2. ALWAYS encourage seeking professional help for serious or persistent issues
3. If someone expresses suicidal thoughts, immediately direct them to emergency services: Call +254759226354 or 999
4. Be culturally sensitive to Kenyan context - consider economic, social, and family factors
5. Use simple, clear language accessible to most Kenyans
6. Focus on psychoeducation, emotional validation, and practical coping skills
7. When appropriate, mention culturally relevant resources (community support, faith-based resources if mentioned)
8. Validate feelings and normalize mental health challenges

RESPONSE STYLE:
- Start with empathy: \"I hear you...\" or \"Thank you for sharing...\"
- Provide 1-2 practical, culturally appropriate suggestions
- End with encouragement to seek professional help if needed
- Mention our contact: Elmed Wellmind Solutions at +254759226354
- If unsure, say: \"I recommend speaking with a mental health professional about this\"

Remember: You are not a substitute for professional mental healthcare. Your role is to provide supportive information and guide users toward appropriate resources.";

const PROBE_MESSAGE: &str = "Hello, how are you?";

/// Settings for [`CohereClient`].
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_key: String,
    /// Scheme + host, without a trailing slash.
    pub base_url: String,
    /// Models to try, in order.
    pub models: Vec<String>,
    /// Per-attempt timeout.
    pub timeout: Duration,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.cohere.com".to_owned(),
            models: COHERE_MODELS.iter().map(|m| (*m).to_owned()).collect(),
            timeout: Duration::from_secs(15),
            temperature: 0.7,
            max_tokens: 800,
        }
    }
}

/// One prior turn handed to the provider as conversation context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextTurn {
    pub speaker: Role,
    pub text: String,
}

/// Outcome of a single model attempt.
#[derive(Debug)]
pub enum Attempt {
    /// HTTP 200 with non-empty text.
    Text(String),
    /// HTTP 200 but the `text` field was missing or blank.
    Empty,
    /// The provider answered with a non-success status.
    Status(StatusCode),
    /// Connection failure, timeout, or undecodable body.
    Transport(reqwest::Error),
}

/// Anything that can turn a message plus context into a reply.
///
/// `None` means "no usable reply"; callers fall back locally.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, message: &str, context: &[ContextTurn]) -> Option<String>;
}

// ── Wire types ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    message: &'a str,
    chat_history: Vec<HistoryEntry<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    preamble: Option<&'a str>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    prompt_truncation: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct HistoryEntry<'a> {
    role: &'static str,
    message: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    models: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    name: String,
}

fn provider_role(role: Role) -> &'static str {
    match role {
        Role::User => "USER",
        Role::Assistant => "CHATBOT",
    }
}

// ── Client ────────────────────────────────────────────────────────────────────

/// HTTP client for the Cohere chat API.
#[derive(Debug, Clone)]
pub struct CohereClient {
    http: reqwest::Client,
    config: ProviderConfig,
}

impl CohereClient {
    pub fn new(config: ProviderConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    pub fn models(&self) -> &[String] {
        &self.config.models
    }

    /// Issue one chat call against `model`.
    pub async fn attempt(&self, model: &str, message: &str, context: &[ContextTurn]) -> Attempt {
        let body = ChatRequest {
            model,
            message,
            chat_history: context
                .iter()
                .map(|turn| HistoryEntry {
                    role: provider_role(turn.speaker),
                    message: &turn.text,
                })
                .collect(),
            preamble: Some(SYSTEM_PREAMBLE),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            prompt_truncation: Some("AUTO"),
        };
        self.send_chat(&body).await
    }

    /// Send a short greeting to `model` with no context; used to check
    /// which models the credential can reach.
    pub async fn probe(&self, model: &str) -> Attempt {
        let body = ChatRequest {
            model,
            message: PROBE_MESSAGE,
            chat_history: Vec::new(),
            preamble: None,
            temperature: 0.1,
            max_tokens: 50,
            prompt_truncation: None,
        };
        self.send_chat(&body).await
    }

    /// List the model names visible to the configured credential.
    pub async fn list_models(&self) -> Result<Vec<String>, reqwest::Error> {
        let list: ModelList = self
            .http
            .get(format!("{}/v1/models", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(list.models.into_iter().map(|m| m.name).collect())
    }

    async fn send_chat(&self, body: &ChatRequest<'_>) -> Attempt {
        let response = match self
            .http
            .post(format!("{}/v1/chat", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(body)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => return Attempt::Transport(e),
        };

        let status = response.status();
        if status != StatusCode::OK {
            return Attempt::Status(status);
        }

        match response.json::<ChatResponse>().await {
            Ok(ChatResponse { text: Some(text) }) if !text.trim().is_empty() => {
                Attempt::Text(text.trim().to_owned())
            }
            Ok(_) => Attempt::Empty,
            Err(e) => Attempt::Transport(e),
        }
    }
}

#[async_trait]
impl CompletionProvider for CohereClient {
    async fn complete(&self, message: &str, context: &[ContextTurn]) -> Option<String> {
        for model in &self.config.models {
            match self.attempt(model, message, context).await {
                Attempt::Text(text) => {
                    info!(%model, reply_len = text.len(), "provider reply received");
                    return Some(text);
                }
                Attempt::Empty => debug!(%model, "provider returned empty text"),
                Attempt::Status(status) => debug!(%model, %status, "provider rejected request"),
                Attempt::Transport(e) => debug!(%model, error = %e, "provider call failed"),
            }
        }
        warn!(tried = self.config.models.len(), "all provider models exhausted");
        None
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
