//! Environment-driven configuration for the panel CLI.

use std::time::Duration;

use consensus::EngineConfig;

/// One OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub url: String,
    pub model: String,
    /// Bearer token; local llama.cpp-style servers usually need none.
    pub api_key: Option<String>,
}

/// Top-level panel configuration.
#[derive(Debug, Clone)]
pub struct PanelConfig {
    /// Primary generation endpoint shared by all personas.
    pub endpoint: Endpoint,
    /// Candidate endpoint for the shadow path, if configured.
    pub shadow_endpoint: Option<Endpoint>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub engine: EngineConfig,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint {
                url: std::env::var("PANEL_URL")
                    .unwrap_or_else(|_| "http://localhost:8080/v1/chat/completions".into()),
                model: std::env::var("PANEL_MODEL")
                    .unwrap_or_else(|_| "qwen2.5-72b-instruct".into()),
                api_key: std::env::var("PANEL_API_KEY").ok(),
            },
            shadow_endpoint: Self::shadow_from_env(),
            temperature: 0.4,
            max_tokens: 2048,
            engine: EngineConfig::default(),
        }
    }
}

impl PanelConfig {
    fn shadow_from_env() -> Option<Endpoint> {
        let url = std::env::var("PANEL_SHADOW_URL").ok()?;
        let model = std::env::var("PANEL_SHADOW_MODEL")
            .unwrap_or_else(|_| "qwen2.5-32b-instruct".into());
        Some(Endpoint {
            url,
            model,
            api_key: std::env::var("PANEL_SHADOW_API_KEY").ok(),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.engine.expert_timeout = timeout;
        self
    }
}
