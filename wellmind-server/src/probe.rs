//! `wellmind-server probe-provider`: check the configured provider credential.
//!
//! Lists the models the credential can see, then sends a short greeting to
//! every model in the priority list and prints which ones answered.

use anyhow::{bail, Context};
use tracing::info;

use crate::config::Config;
use crate::services::provider::{Attempt, CohereClient};

/// Model-name fragments that indicate a chat-capable model.
const CHAT_MODEL_HINTS: &[&str] = &["command-r", "aya", "c4ai"];

/// Outcome of probing one model.
#[derive(Debug)]
pub struct ProbeResult {
    pub model: String,
    pub attempt: Attempt,
}

impl ProbeResult {
    pub fn succeeded(&self) -> bool {
        matches!(self.attempt, Attempt::Text(_))
    }

    fn describe(&self) -> String {
        match &self.attempt {
            Attempt::Text(text) => {
                let preview: String = text.chars().take(80).collect();
                format!("OK        {}  ->  {preview}", self.model)
            }
            Attempt::Empty => format!("EMPTY     {}", self.model),
            Attempt::Status(s) if s.as_u16() == 404 => format!("NOT FOUND {}", self.model),
            Attempt::Status(s) if s.as_u16() == 400 => format!("NOT CHAT  {}", self.model),
            Attempt::Status(s) => format!("FAILED    {} ({s})", self.model),
            Attempt::Transport(e) => format!("ERROR     {} ({e})", self.model),
        }
    }
}

pub async fn run(config: &Config) -> anyhow::Result<()> {
    let Some(provider) = config.provider_config() else {
        bail!("COHERE_API_KEY is not set; add it to the environment or .env");
    };
    let client = CohereClient::new(provider).context("failed to build HTTP client")?;

    match client.list_models().await {
        Ok(models) => {
            println!("Credential is valid; {} models available:", models.len());
            for m in &models {
                println!("  - {m}");
            }
            let chat: Vec<&String> = models.iter().filter(|m| is_chat_model(m)).collect();
            if !chat.is_empty() {
                println!("Chat-capable: {}", chat.iter().take(10).map(|m| m.as_str()).collect::<Vec<_>>().join(", "));
            }
        }
        Err(e) => println!("Model listing failed: {e}"),
    }

    println!();
    let results = probe_all(&client).await;
    for r in &results {
        println!("{}", r.describe());
    }

    let working: Vec<&str> = results.iter().filter(|r| r.succeeded()).map(|r| r.model.as_str()).collect();
    info!(working = working.len(), tried = results.len(), "provider probe finished");
    println!();
    match working.first() {
        Some(first) => {
            println!("Working models: {}", working.join(", "));
            println!("First in priority order: {first}");
            Ok(())
        }
        None => bail!("no model answered; check the key's permissions and billing limits"),
    }
}

/// Probe every model of the client's priority list in order.
pub async fn probe_all(client: &CohereClient) -> Vec<ProbeResult> {
    let mut results = Vec::with_capacity(client.models().len());
    for model in client.models() {
        let attempt = client.probe(model).await;
        results.push(ProbeResult { model: model.clone(), attempt });
    }
    results
}

fn is_chat_model(name: &str) -> bool {
    let lower = name.to_lowercase();
    CHAT_MODEL_HINTS.iter().any(|h| lower.contains(h))
}
