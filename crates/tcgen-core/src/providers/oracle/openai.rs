use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use super::{http, Backend, Oracle, Prompt, ResponseFormat};
use crate::errors::{ConfigError, OracleError};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Chat-completions backend.
pub struct OpenAiOracle {
    model: String,
    api_key: String,
    base_url: String,
    temperature: f32,
    timeout: Duration,
    client: reqwest::Client,
}

impl OpenAiOracle {
    pub fn new(
        api_key: String,
        model: String,
        base_url: Option<String>,
        temperature: f32,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            model,
            api_key,
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            temperature,
            timeout,
            client: http::build_client(timeout)?,
        })
    }

    fn request_body(&self, prompt: &Prompt) -> serde_json::Value {
        let mut messages = Vec::new();
        if let Some(system) = &prompt.system {
            messages.push(json!({ "role": "system", "content": system }));
        }
        messages.push(json!({ "role": "user", "content": prompt.user }));

        let mut body = json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature,
        });
        if prompt.format == ResponseFormat::Json {
            body["response_format"] = json!({ "type": "json_object" });
        }
        body
    }
}

#[async_trait]
impl Oracle for OpenAiOracle {
    async fn ask(&self, prompt: &Prompt) -> Result<String, OracleError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = self.request_body(prompt);
        debug!(model = %self.model, url = %url, "openai chat completion");

        let request = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body);
        let json = http::send_json(request, self.timeout).await?;

        json.pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .map(String::from)
            .ok_or_else(|| {
                match json
                    .pointer("/choices/0/finish_reason")
                    .and_then(|v| v.as_str())
                {
                    Some("content_filter") => OracleError::Blocked {
                        reason: "content_filter".to_string(),
                    },
                    _ => OracleError::InvalidResponse {
                        message: "OpenAI API response missing content".to_string(),
                    },
                }
            })
    }

    fn backend(&self) -> Backend {
        Backend::OpenAi
    }

    fn model(&self) -> &str {
        &self.model
    }
}
