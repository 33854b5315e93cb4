// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Content Generation Service Adapter
//
// Anti-Corruption Layer for the external text-generation API. Speaks the
// messages wire format: one user message in, the first text block out.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::content::ContentGenerator;
use crate::domain::errors::LayerError;
use crate::domain::node_config::{resolve_secret, ContentServiceConfig};

const SERVICE: &str = "content";
const DEFAULT_MAX_TOKENS: u32 = 4096;

pub struct ContentServiceClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

impl ContentServiceClient {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
        }
    }

    /// Build from node config, resolving `env:VAR` keys now.
    pub fn from_config(config: &ContentServiceConfig) -> Self {
        let api_key = config.api_key.as_deref().and_then(resolve_secret);
        Self::new(&config.endpoint, api_key, &config.model)
    }
}

#[async_trait]
impl ContentGenerator for ContentServiceClient {
    async fn generate(&self, prompt: &str) -> Result<String, LayerError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            LayerError::Configuration("content service API key is not configured".to_string())
        })?;

        let request = MessagesRequest {
            model: &self.model,
            max_tokens: DEFAULT_MAX_TOKENS,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        debug!(model = %self.model, prompt_len = prompt.len(), "Requesting content generation");

        let response = self
            .client
            .post(format!("{}/v1/messages", self.endpoint))
            .header("x-api-key", api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&request)
            .send()
            .await
            .map_err(|e| LayerError::external(SERVICE, e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "Content service returned an error");
            return Err(LayerError::external(SERVICE, format!("HTTP {}: {}", status, body)));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| LayerError::external(SERVICE, format!("Failed to parse response: {}", e)))?;

        parsed
            .content
            .into_iter()
            .find_map(|block| block.text)
            .ok_or_else(|| LayerError::external(SERVICE, "response contained no text"))
    }
}
