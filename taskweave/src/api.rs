//! External API registry.
//!
//! Tasks name the APIs they need (`llm_api`, `reddit_search`, ...). The
//! registry answers two questions about each name: is it usable right now,
//! and what configuration/credentials does it carry. This crate never calls
//! the APIs itself.

use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

/// Name of an external API as referenced by task configuration.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiName(String);

impl ApiName {
    /// Creates a new ApiName from a string.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the underlying name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApiName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ApiName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ApiName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Availability level, ordered from best to worst.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiStatus {
    Ok,
    Warning,
    Error,
}

impl fmt::Display for ApiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiStatus::Ok => write!(f, "ok"),
            ApiStatus::Warning => write!(f, "warning"),
            ApiStatus::Error => write!(f, "error"),
        }
    }
}

/// Health answer for a single API.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiHealth {
    pub status: ApiStatus,
    pub message: String,
}

impl ApiHealth {
    pub fn ok(message: impl Into<String>) -> Self {
        Self { status: ApiStatus::Ok, message: message.into() }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { status: ApiStatus::Warning, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { status: ApiStatus::Error, message: message.into() }
    }
}

/// Resolved configuration for an API (endpoint, credentials, extras).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Provider-specific fields (client ids, model names, ...)
    #[serde(default)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Read-only view of configured external APIs.
pub trait ApiRegistry: Send + Sync {
    /// Reports whether an API is usable.
    fn health(&self, api: &ApiName) -> ApiHealth;

    /// Returns the configuration for an API.
    fn resolve(&self, api: &ApiName) -> Result<ApiConfig, ApiError>;
}

/// Registry entry for [`InMemoryApiRegistry`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApiEntry {
    pub config: ApiConfig,
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Set when the API works but something about it is off
    #[serde(default)]
    pub degraded: Option<String>,
}

fn default_active() -> bool {
    true
}

impl ApiEntry {
    /// Creates an active, healthy entry.
    pub fn new(config: ApiConfig) -> Self {
        Self {
            config,
            is_active: true,
            degraded: None,
        }
    }

    /// Marks the entry as degraded with a reason.
    pub fn degraded(mut self, reason: impl Into<String>) -> Self {
        self.degraded = Some(reason.into());
        self
    }

    /// Marks the entry inactive.
    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}

/// Thread-safe in-memory API registry.
#[derive(Debug, Default)]
pub struct InMemoryApiRegistry {
    entries: RwLock<HashMap<ApiName, ApiEntry>>,
}

impl InMemoryApiRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces an API entry.
    pub fn register(&self, api: impl Into<ApiName>, entry: ApiEntry) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(api.into(), entry);
    }

    /// Builder-style registration.
    pub fn with(self, api: impl Into<ApiName>, entry: ApiEntry) -> Self {
        self.register(api, entry);
        self
    }

    /// Removes an API; returns the previous entry if any.
    pub fn remove(&self, api: &ApiName) -> Option<ApiEntry> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(api)
    }
}

impl ApiRegistry for InMemoryApiRegistry {
    fn health(&self, api: &ApiName) -> ApiHealth {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        match entries.get(api) {
            None => ApiHealth::error(format!("API '{}' is not configured", api)),
            Some(entry) if !entry.is_active => {
                ApiHealth::error(format!("API '{}' is configured but inactive", api))
            }
            Some(ApiEntry { degraded: Some(reason), .. }) => {
                ApiHealth::warning(format!("API '{}' is degraded: {}", api, reason))
            }
            Some(_) => ApiHealth::ok(format!("API '{}' is available", api)),
        }
    }

    fn resolve(&self, api: &ApiName) -> Result<ApiConfig, ApiError> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let entry = entries
            .get(api)
            .ok_or_else(|| ApiError::NotConfigured(api.to_string()))?;
        if !entry.is_active {
            return Err(ApiError::Inactive(api.to_string()));
        }
        Ok(entry.config.clone())
    }
}
