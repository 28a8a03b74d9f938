use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use super::{http, Backend, Oracle, Prompt, ResponseFormat};
use crate::errors::{ConfigError, OracleError};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Gemini `generateContent` backend.
pub struct GeminiOracle {
    model: String,
    api_key: String,
    base_url: String,
    temperature: f32,
    timeout: Duration,
    client: reqwest::Client,
}

impl GeminiOracle {
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
        let mut generation_config = json!({ "temperature": self.temperature });
        if prompt.format == ResponseFormat::Json {
            generation_config["responseMimeType"] = json!("application/json");
        }

        let mut body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt.user }] }],
            "generationConfig": generation_config,
        });
        if let Some(system) = &prompt.system {
            body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
        }
        body
    }
}

/// Concatenated text of the first candidate, or the reason there is none.
fn candidate_text(json: &serde_json::Value) -> Result<String, OracleError> {
    if let Some(reason) = json
        .pointer("/promptFeedback/blockReason")
        .and_then(|v| v.as_str())
    {
        return Err(OracleError::Blocked {
            reason: reason.to_string(),
        });
    }

    let parts = json
        .pointer("/candidates/0/content/parts")
        .and_then(|v| v.as_array());
    match parts {
        Some(parts) => {
            let text: String = parts
                .iter()
                .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
                .collect();
            Ok(text)
        }
        None => {
            let finish = json
                .pointer("/candidates/0/finishReason")
                .and_then(|v| v.as_str());
            match finish {
                Some(reason) if reason != "STOP" => Err(OracleError::Blocked {
                    reason: reason.to_string(),
                }),
                _ => Err(OracleError::InvalidResponse {
                    message: "Gemini API response missing candidate text".to_string(),
                }),
            }
        }
    }
}

#[async_trait]
impl Oracle for GeminiOracle {
    async fn ask(&self, prompt: &Prompt) -> Result<String, OracleError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let body = self.request_body(prompt);
        debug!(model = %self.model, "gemini generateContent");

        let request = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body);
        let json = http::send_json(request, self.timeout).await?;
        candidate_text(&json)
    }

    fn backend(&self) -> Backend {
        Backend::Gemini
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oracle() -> GeminiOracle {
        GeminiOracle::new(
            "key".into(),
            "gemini-1.5-flash".into(),
            None,
            0.2,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn system_instruction_and_json_mime() {
        let body = oracle().request_body(&Prompt::json("structure?").with_system("analyst"));
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "analyst");
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(body["contents"][0]["parts"][0]["text"], "structure?");
    }

    #[test]
    fn candidate_parts_are_joined() {
        let json = json!({
            "candidates": [{ "content": { "parts": [{ "text": "{\"a\":" }, { "text": "1}" }] } }]
        });
        assert_eq!(candidate_text(&json).unwrap(), "{\"a\":1}");
    }

    #[test]
    fn safety_block_is_reported() {
        let json = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        assert!(matches!(
            candidate_text(&json),
            Err(OracleError::Blocked { reason }) if reason == "SAFETY"
        ));

        let json = json!({ "candidates": [{ "finishReason": "RECITATION" }] });
        assert!(matches!(
            candidate_text(&json),
            Err(OracleError::Blocked { .. })
        ));
    }
}
