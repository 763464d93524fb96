//! CLI commands

pub mod auth;
pub mod keys;
pub mod partner;

use anyhow::{Context, Result};
use ragline_client::{HttpTransport, Transport};
use ragline_core::{resolve_base_url, CredentialStorage, FileCredentialStore};
use std::sync::Arc;

/// Shared wiring for every command: durable storage plus a transport against
/// the resolved base URL
pub struct AppContext {
    pub storage: Arc<dyn CredentialStorage>,
    pub transport: Arc<dyn Transport>,
}

impl AppContext {
    pub fn init() -> Result<Self> {
        let storage: Arc<dyn CredentialStorage> = Arc::new(
            FileCredentialStore::open_default().context("Failed to open credential store")?,
        );
        let base_url =
            resolve_base_url(storage.as_ref()).context("Failed to resolve base URL")?;
        tracing::debug!(%base_url, "using control plane");
        let transport: Arc<dyn Transport> =
            Arc::new(HttpTransport::new(base_url.clone()).context("Failed to build HTTP client")?);
        Ok(Self { storage, transport })
    }
}
