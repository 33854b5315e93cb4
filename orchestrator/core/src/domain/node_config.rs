// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Node Configuration Types
//
// Defines the configuration schema for a Trellis deployment node:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - Installed layer selection
// - Backing store location
// - External content-generation and relationship service endpoints
// - Scheduler and logging settings

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::domain::catalog::{ALL_LAYERS, CORE};

pub const API_VERSION: &str = "trellis.dev/v1";
pub const KIND: &str = "NodeConfig";

/// Top-level Kubernetes-style node configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfigManifest {
    /// API version (must be "trellis.dev/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "NodeConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    pub spec: NodeConfigSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Human-readable deployment name
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfigSpec {
    /// Layer ids installed on this deployment
    #[serde(default = "default_installed_layers")]
    pub installed_layers: Vec<String>,

    #[serde(default)]
    pub store: StoreConfig,

    /// Content-generation service
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_service: Option<ContentServiceConfig>,

    /// Relationship-management (CRM) service
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship_service: Option<RelationshipServiceConfig>,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path of the JSON table store file
    #[serde(default = "default_store_path")]
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentServiceConfig {
    pub endpoint: String,

    /// API key (supports "env:VAR_NAME")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_content_model")]
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipServiceConfig {
    pub endpoint: String,

    /// API key (supports "env:VAR_NAME")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Account/location identifier (supports "env:VAR_NAME")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Per-agent interval overrides in seconds, keyed by agent id
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub interval_overrides: HashMap<String, u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_overrides: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "info", "debug", "trace")
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_true() -> bool {
    true
}

fn default_installed_layers() -> Vec<String> {
    vec![CORE.to_string()]
}

fn default_store_path() -> String {
    "./trellis-store.json".to_string()
}

fn default_content_model() -> String {
    "claude-sonnet-4-5".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Resolve a config value, expanding the `env:VAR_NAME` form.
pub fn resolve_secret(value: &str) -> Option<String> {
    match value.strip_prefix("env:") {
        Some(var) => std::env::var(var).ok().filter(|v| !v.is_empty()),
        None => Some(value.to_string()),
    }
}

impl Default for NodeConfigSpec {
    fn default() -> Self {
        Self {
            installed_layers: default_installed_layers(),
            store: StoreConfig::default(),
            content_service: None,
            relationship_service: None,
            scheduler: SchedulerConfig::default(),
            logging: None,
        }
    }
}

impl Default for NodeConfigManifest {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: "trellis-node".to_string(),
                version: Some("1.0.0".to_string()),
                labels: None,
            },
            spec: NodeConfigSpec::default(),
        }
    }
}

impl NodeConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. TRELLIS_CONFIG_PATH environment variable
    /// 2. ./trellis-config.yaml (working directory)
    /// 3. ~/.trellis/config.yaml (user home)
    /// 4. /etc/trellis/config.yaml (system)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("TRELLIS_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./trellis-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".trellis").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        let system_config = PathBuf::from("/etc/trellis/config.yaml");
        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit CLI path fails if missing/invalid
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("TRELLIS_STORE_PATH") {
            tracing::info!("Environment override: TRELLIS_STORE_PATH={}", path);
            self.spec.store.path = path;
        }

        if let Ok(layers) = std::env::var("TRELLIS_INSTALLED_LAYERS") {
            let parsed: Vec<String> = layers
                .split(',')
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .collect();
            if parsed.is_empty() {
                tracing::warn!("TRELLIS_INSTALLED_LAYERS is empty. Ignoring.");
            } else {
                tracing::info!("Environment override: TRELLIS_INSTALLED_LAYERS={}", layers);
                self.spec.installed_layers = parsed;
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        if self.spec.installed_layers.is_empty() {
            anyhow::bail!("spec.installed_layers must name at least one layer");
        }

        for layer in &self.spec.installed_layers {
            if !ALL_LAYERS.iter().any(|l| l.id.as_str() == layer) {
                anyhow::bail!("Unknown layer in spec.installed_layers: '{}'", layer);
            }
        }

        if self.spec.store.path.is_empty() {
            anyhow::bail!("spec.store.path cannot be empty");
        }

        if let Some(content) = &self.spec.content_service {
            if content.endpoint.is_empty() {
                anyhow::bail!("spec.content_service.endpoint cannot be empty");
            }
        }

        if let Some(crm) = &self.spec.relationship_service {
            if crm.endpoint.is_empty() {
                anyhow::bail!("spec.relationship_service.endpoint cannot be empty");
            }
        }

        Ok(())
    }
}
