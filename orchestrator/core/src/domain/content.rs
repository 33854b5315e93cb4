// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Content-generation service interface.
//!
//! The service takes a prompt and returns freeform text; callers parse any
//! structured contract themselves. Implementations live in
//! `crate::infrastructure::content_client`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::errors::LayerError;

/// Kinds of generation request, each owned by exactly one layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GenerationRequestType {
    PageContent,
    ArticleContent,
    OutreachMessage,
}

impl GenerationRequestType {
    pub const ALL: [GenerationRequestType; 3] = [
        GenerationRequestType::PageContent,
        GenerationRequestType::ArticleContent,
        GenerationRequestType::OutreachMessage,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            GenerationRequestType::PageContent => "page-content",
            GenerationRequestType::ArticleContent => "article-content",
            GenerationRequestType::OutreachMessage => "outreach-message",
        }
    }
}

impl fmt::Display for GenerationRequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GenerationRequestType {
    type Err = LayerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| LayerError::Configuration(format!("unknown generation request type '{}'", s)))
    }
}

#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Missing credentials yield `LayerError::Configuration`; transport and
    /// non-success responses yield `LayerError::ExternalService`.
    async fn generate(&self, prompt: &str) -> Result<String, LayerError>;
}
