//! Upstream dashboard settings
//!
//! Resolves the control-plane base URL and the dashboard API key from the
//! environment (several fallback names) or from durable storage.

use crate::error::Result;
use crate::storage::{keys, load_json, store_json, CredentialStorage};
use serde::{Deserialize, Serialize};

/// Environment variables consulted for the base URL, in order
pub const API_URL_ENV: &[&str] = &["RAGLINE_API_URL", "RAG_ENGINE_URL"];

/// Environment variables consulted for the API key, in order
pub const API_KEY_ENV: &[&str] = &["RAGLINE_API_KEY", "RAG_ENGINE_API_KEY"];

pub const DEFAULT_API_URL: &str = "https://api.ragline.dev";

/// Persisted dashboard API credentials (base URL + key pair)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardCredentials {
    pub base_url: String,
    pub api_key: Option<String>,
}

impl Default for DashboardCredentials {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            api_key: None,
        }
    }
}

fn env_first(names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|name| std::env::var(name).ok().filter(|v| !v.is_empty()))
}

/// Base URL: environment wins, then stored credentials, then the default
pub fn resolve_base_url(storage: &dyn CredentialStorage) -> Result<String> {
    if let Some(url) = env_first(API_URL_ENV) {
        return Ok(url.trim_end_matches('/').to_string());
    }
    let stored: Option<DashboardCredentials> = load_json(storage, keys::DASHBOARD_CREDENTIALS)?;
    Ok(stored
        .map(|c| c.base_url.trim_end_matches('/').to_string())
        .unwrap_or_else(|| DEFAULT_API_URL.to_string()))
}

/// API key: environment wins, then stored credentials
pub fn resolve_api_key(storage: &dyn CredentialStorage) -> Result<Option<String>> {
    if let Some(key) = env_first(API_KEY_ENV) {
        return Ok(Some(key));
    }
    let stored: Option<DashboardCredentials> = load_json(storage, keys::DASHBOARD_CREDENTIALS)?;
    Ok(stored.and_then(|c| c.api_key))
}

/// Persist the base URL / API key pair
pub fn save_dashboard_credentials(
    storage: &dyn CredentialStorage,
    credentials: &DashboardCredentials,
) -> Result<()> {
    store_json(storage, keys::DASHBOARD_CREDENTIALS, credentials)
}
