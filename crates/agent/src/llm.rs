use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, warn};
use waiter_core::config::LlmConfig;

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Runs one chat completion in JSON mode and returns the raw message content.
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}

#[async_trait]
impl<T> LlmClient for std::sync::Arc<T>
where
    T: LlmClient + ?Sized,
{
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        (**self).complete(system_prompt, user_prompt).await
    }
}

/// Chat-completions client for any OpenAI-compatible endpoint
/// (OpenAI, Groq, a local Ollama).
#[derive(Clone)]
pub struct OpenAiCompatibleClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
    model: String,
    max_retries: u32,
}

impl OpenAiCompatibleClient {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        api_key: Option<SecretString>,
        model: impl Into<String>,
        max_retries: u32,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
            max_retries,
        }
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build llm http client")?;

        Ok(Self::new(
            http,
            config.effective_base_url(),
            config.api_key.clone(),
            config.model.clone(),
            config.max_retries,
        ))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    async fn call_once(&self, system_prompt: &str, user_prompt: &str) -> Result<String, CallError> {
        let body = serde_json::json!({
            "model": &self.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt}
            ],
            "temperature": 0.1,
            "response_format": {"type": "json_object"}
        });

        let mut request = self.http.post(self.endpoint()).json(&body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }

        let response = request.send().await.map_err(|error| CallError::Retryable(error.into()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = anyhow!("llm api error {status}: {body}");
            return if status.is_server_error() || status.as_u16() == 429 {
                Err(CallError::Retryable(error))
            } else {
                Err(CallError::Fatal(error))
            };
        }

        #[derive(Deserialize)]
        struct Message {
            #[serde(default)]
            content: Option<String>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: Message,
        }
        #[derive(Deserialize)]
        struct ApiResponse {
            choices: Vec<Choice>,
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|error| CallError::Fatal(anyhow!("failed to parse llm response: {error}")))?;

        api_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| CallError::Fatal(anyhow!("llm returned no message content")))
    }
}

enum CallError {
    Retryable(anyhow::Error),
    Fatal(anyhow::Error),
}

#[async_trait]
impl LlmClient for OpenAiCompatibleClient {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let mut attempt = 0_u32;
        loop {
            match self.call_once(system_prompt, user_prompt).await {
                Ok(content) => {
                    debug!(
                        event_name = "llm.completion.received",
                        model = %self.model,
                        attempt,
                        content_len = content.len(),
                        "llm completion received"
                    );
                    return Ok(content);
                }
                Err(CallError::Retryable(error)) if attempt < self.max_retries => {
                    attempt += 1;
                    let delay = Duration::from_millis(250 * u64::from(attempt));
                    warn!(
                        event_name = "llm.completion.retry",
                        model = %self.model,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "llm call failed; retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(CallError::Retryable(error)) | Err(CallError::Fatal(error)) => {
                    return Err(error);
                }
            }
        }
    }
}
