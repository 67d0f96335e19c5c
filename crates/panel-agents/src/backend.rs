//! HTTP generation backend: one persona talking to an OpenAI-compatible
//! chat completions endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use consensus::{Bundle, GenerationBackend, GenerationRequest};

use crate::config::Endpoint;
use crate::personas::{self, Persona};

/// Errors from one generation call.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Endpoint returned no choices")]
    EmptyResponse,

    #[error("Response was not a parseable bundle: {0}")]
    Parse(String),
}

/// A persona bound to a chat completions endpoint.
pub struct HttpGenerationBackend {
    http: reqwest::Client,
    endpoint: Endpoint,
    persona: Persona,
    temperature: f32,
    max_tokens: u32,
}

impl HttpGenerationBackend {
    pub fn new(
        endpoint: Endpoint,
        persona: Persona,
        temperature: f32,
        max_tokens: u32,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
            persona,
            temperature,
            max_tokens,
        }
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String, BackendError> {
        #[derive(Serialize)]
        struct ChatMessage<'a> {
            role: &'a str,
            content: &'a str,
        }

        #[derive(Serialize)]
        struct ChatRequest<'a> {
            model: &'a str,
            messages: Vec<ChatMessage<'a>>,
            max_tokens: u32,
            temperature: f32,
        }

        #[derive(Deserialize)]
        struct ChatResponse {
            choices: Vec<Choice>,
        }

        #[derive(Deserialize)]
        struct Choice {
            message: ResponseMessage,
        }

        #[derive(Deserialize)]
        struct ResponseMessage {
            content: Option<String>,
        }

        let request = ChatRequest {
            model: &self.endpoint.model,
            messages: vec![
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: user },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let mut builder = self.http.post(&self.endpoint.url).json(&request);
        if let Some(key) = &self.endpoint.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| BackendError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status { status, body });
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Parse(e.to_string()))?;

        chat.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|content| !content.is_empty())
            .ok_or(BackendError::EmptyResponse)
    }
}

#[async_trait]
impl GenerationBackend for HttpGenerationBackend {
    async fn generate(&self, request: &GenerationRequest) -> anyhow::Result<Bundle> {
        let system = personas::system_prompt(self.persona);
        let user = personas::user_prompt(request);

        debug!(
            expert_id = %request.expert_id,
            repair = request.prior.is_some(),
            model = %self.endpoint.model,
            "Generation call"
        );

        let content = self.complete(&system, &user).await?;
        let bundle = parse_bundle(&content)?;
        Ok(bundle)
    }
}

/// Parse a bundle out of model output, tolerating markdown code fences
/// and prose around the JSON object.
pub fn parse_bundle(content: &str) -> Result<Bundle, BackendError> {
    let stripped = strip_code_fences(content);
    let candidate = extract_json_object(stripped).unwrap_or(stripped);
    serde_json::from_str(candidate).map_err(|e| BackendError::Parse(e.to_string()))
}

fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the language tag line, then the closing fence.
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or(rest);
    rest.rsplit_once("```").map(|(body, _)| body).unwrap_or(rest).trim()
}

fn extract_json_object(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    (end > start).then(|| &content[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle_json() -> String {
        serde_json::to_string(&Bundle::fallback("quant", "game-1")).unwrap()
    }

    #[test]
    fn test_parse_plain_json() {
        let bundle = parse_bundle(&bundle_json()).unwrap();
        assert_eq!(bundle.expert_id, "quant");
        assert_eq!(bundle.assertions.len(), 12);
    }

    #[test]
    fn test_parse_fenced_json() {
        let fenced = format!("```json\n{}\n```", bundle_json());
        let bundle = parse_bundle(&fenced).unwrap();
        assert_eq!(bundle.event_id, "game-1");
    }

    #[test]
    fn test_parse_json_with_surrounding_prose() {
        let noisy = format!("Here is my forecast:\n{}\nGood luck!", bundle_json());
        let bundle = parse_bundle(&noisy).unwrap();
        assert_eq!(bundle.expert_id, "quant");
    }

    #[test]
    fn test_parse_garbage_fails() {
        let err = parse_bundle("the home side should win comfortably").unwrap_err();
        assert!(matches!(err, BackendError::Parse(_)));
    }
}
