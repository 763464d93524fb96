//! Application state stores
//!
//! Thin state containers over the clients, exposing loading/error/throttled
//! snapshots. Instances are constructed explicitly and shared via `Arc`; there
//! are no module-level singletons, so tests get isolated state.

use crate::api_keys::ApiKeyClient;
use crate::partner::PartnerTokenManager;
use ragline_core::{keys, load_json, store_json, AppError, CredentialStorage, ErrorCode, Result};
use ragline_types::{
    ApiKeyCreate, ApiKeyEvent, ApiKeyEventFilters, ApiKeyFilters, ApiKeyRecord,
    ApiKeyRevokeRequest, ApiKeyRotateRequest, ApiKeyWithSecret, PartnerAuthConfig,
    StoredPartnerToken,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Snapshot of the API-keys screen state
#[derive(Debug, Clone, Default)]
pub struct ApiKeysState {
    pub keys: Vec<ApiKeyRecord>,
    pub count: u64,
    pub events: Vec<ApiKeyEvent>,
    pub loading: bool,
    pub error: Option<String>,
    pub error_code: Option<ErrorCode>,
    pub throttled: bool,
}

pub struct ApiKeysStore {
    client: ApiKeyClient,
    state: RwLock<ApiKeysState>,
    /// Fencing: a completed fetch only writes its result when no newer fetch
    /// has started, so two rapid fetches cannot finish out of order
    fetch_seq: AtomicU64,
}

impl ApiKeysStore {
    pub fn new(client: ApiKeyClient) -> Self {
        Self {
            client,
            state: RwLock::new(ApiKeysState::default()),
            fetch_seq: AtomicU64::new(0),
        }
    }

    pub async fn snapshot(&self) -> ApiKeysState {
        self.state.read().await.clone()
    }

    pub async fn fetch_keys(&self, filters: &ApiKeyFilters) {
        let seq = self.begin_fetch().await;
        let result = self.client.list_api_keys(filters).await;
        if !self.is_current(seq) {
            return;
        }
        let mut state = self.state.write().await;
        state.loading = false;
        match result {
            Ok(page) => {
                state.keys = page.results;
                state.count = page.count;
            }
            Err(e) => state.record_error(&e),
        }
    }

    pub async fn fetch_events(&self, filters: &ApiKeyEventFilters) {
        let seq = self.begin_fetch().await;
        let result = self.client.list_api_key_events(filters).await;
        if !self.is_current(seq) {
            return;
        }
        let mut state = self.state.write().await;
        state.loading = false;
        match result {
            Ok(page) => state.events = page.results,
            Err(e) => state.record_error(&e),
        }
    }

    /// Create a key; the one-time secret is returned to the caller and never
    /// kept in the store
    pub async fn create_key(&self, payload: &ApiKeyCreate) -> Result<ApiKeyWithSecret> {
        self.write_through(self.client.create_api_key(payload).await)
            .await
    }

    pub async fn rotate_key(
        &self,
        id: &str,
        payload: Option<&ApiKeyRotateRequest>,
    ) -> Result<ApiKeyWithSecret> {
        self.write_through(self.client.rotate_api_key(id, payload).await)
            .await
    }

    pub async fn revoke_key(
        &self,
        id: &str,
        payload: Option<&ApiKeyRevokeRequest>,
    ) -> Result<ApiKeyRecord> {
        let result = self.client.revoke_api_key(id, payload).await;
        let result = self.write_through(result).await;
        if let Ok(record) = &result {
            // Mirror the terminal transition into the cached list
            let mut state = self.state.write().await;
            if let Some(existing) = state.keys.iter_mut().find(|k| k.id == record.id) {
                *existing = record.clone();
            }
        }
        result
    }

    async fn begin_fetch(&self) -> u64 {
        let seq = self.fetch_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let mut state = self.state.write().await;
        state.loading = true;
        state.error = None;
        state.error_code = None;
        state.throttled = false;
        seq
    }

    fn is_current(&self, seq: u64) -> bool {
        self.fetch_seq.load(Ordering::SeqCst) == seq
    }

    /// Record a write outcome in the state and pass the result through
    async fn write_through<T>(&self, result: Result<T>) -> Result<T> {
        let mut state = self.state.write().await;
        match &result {
            Ok(_) => {
                state.error = None;
                state.error_code = None;
                state.throttled = false;
            }
            Err(e) => state.record_error(e),
        }
        result
    }
}

impl ApiKeysState {
    fn record_error(&mut self, e: &AppError) {
        self.error = Some(e.message.clone());
        self.error_code = Some(e.code);
        self.throttled = e.throttled;
    }
}

/// Snapshot of the partner-auth screen state
#[derive(Debug, Clone, Default)]
pub struct PartnerAuthState {
    pub config: Option<PartnerAuthConfig>,
    pub token: Option<StoredPartnerToken>,
    pub loading: bool,
    pub error: Option<String>,
    pub error_code: Option<ErrorCode>,
    pub throttled: bool,
}

impl PartnerAuthState {
    fn record_error(&mut self, e: &AppError) {
        self.error = Some(e.message.clone());
        self.error_code = Some(e.code);
        self.throttled = e.throttled;
    }
}

/// Summary for status displays
#[derive(Debug, Clone)]
pub struct PartnerAuthStatus {
    pub configured: bool,
    pub has_token: bool,
    pub expires_at: Option<i64>,
    pub expired: bool,
}

pub struct PartnerAuthStore {
    manager: Arc<PartnerTokenManager>,
    storage: Arc<dyn CredentialStorage>,
    state: RwLock<PartnerAuthState>,
}

impl PartnerAuthStore {
    pub fn new(manager: Arc<PartnerTokenManager>, storage: Arc<dyn CredentialStorage>) -> Self {
        Self {
            manager,
            storage,
            state: RwLock::new(PartnerAuthState::default()),
        }
    }

    pub async fn snapshot(&self) -> PartnerAuthState {
        self.state.read().await.clone()
    }

    /// Hydrate config and token from durable storage
    pub async fn load(&self) -> Result<()> {
        let config: Option<PartnerAuthConfig> =
            load_json(self.storage.as_ref(), keys::PARTNER_CONFIG)?;
        let token: Option<StoredPartnerToken> =
            load_json(self.storage.as_ref(), keys::PARTNER_TOKEN)?;
        let mut state = self.state.write().await;
        state.config = config;
        state.token = token;
        Ok(())
    }

    /// Persist operator-supplied credentials
    pub async fn save_config(&self, config: PartnerAuthConfig) -> Result<()> {
        store_json(self.storage.as_ref(), keys::PARTNER_CONFIG, &config)?;
        self.state.write().await.config = Some(config);
        Ok(())
    }

    /// Obtain a token: cached when still fresh, or via refresh/issuance.
    /// `force` skips the cache and always exchanges credentials.
    pub async fn fetch_token(&self, force: bool) -> Result<StoredPartnerToken> {
        {
            let mut state = self.state.write().await;
            state.loading = true;
            state.error = None;
            state.error_code = None;
            state.throttled = false;
        }
        let config = self.state.read().await.config.clone();
        let result = if force {
            match &config {
                Some(config) => self.manager.request_partner_token(config).await,
                None => Err(AppError::new(
                    ErrorCode::BadRequest,
                    "partner credentials are not configured",
                )),
            }
        } else {
            self.manager.ensure_fresh_token(config.as_ref()).await
        };

        let mut state = self.state.write().await;
        state.loading = false;
        match &result {
            Ok(token) => state.token = Some(token.clone()),
            Err(e) => state.record_error(e),
        }
        result
    }

    /// Forget config and token, both cached and persisted
    pub async fn clear(&self) -> Result<()> {
        self.storage.remove(keys::PARTNER_CONFIG)?;
        self.manager.clear().await?;
        let mut state = self.state.write().await;
        *state = PartnerAuthState::default();
        Ok(())
    }

    pub async fn status(&self) -> PartnerAuthStatus {
        let state = self.state.read().await;
        PartnerAuthStatus {
            configured: state
                .config
                .as_ref()
                .map(|c| c.has_credentials())
                .unwrap_or(false),
            has_token: state.token.is_some(),
            expires_at: state.token.as_ref().and_then(|t| t.expires_at),
            expired: state.token.as_ref().map(|t| t.is_expired()).unwrap_or(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTransport;
    use ragline_core::MemoryCredentialStore;
    use ragline_types::Scopes;
    use std::time::Duration;

    fn page_json(count: u64) -> serde_json::Value {
        let results: Vec<_> = (0..count)
            .map(|i| {
                serde_json::json!({
                    "id": format!("k{i}-{count}"),
                    "owner": "ops",
                    "scope": "read",
                    "is_active": true,
                })
            })
            .collect();
        serde_json::json!({"results": results, "count": count})
    }

    #[tokio::test]
    async fn fetch_keys_populates_state() {
        let transport = Arc::new(MockTransport::new(|_| Ok(Some(page_json(2)))));
        let store = ApiKeysStore::new(ApiKeyClient::new(transport));

        store.fetch_keys(&ApiKeyFilters::default()).await;
        let state = store.snapshot().await;
        assert_eq!(state.count, 2);
        assert_eq!(state.keys.len(), 2);
        assert!(!state.loading);
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn fetch_error_records_code_and_throttle() {
        let transport = Arc::new(MockTransport::new(|_| {
            Err(AppError::from_status(429, "rate limited"))
        }));
        let store = ApiKeysStore::new(ApiKeyClient::new(transport));

        store.fetch_keys(&ApiKeyFilters::default()).await;
        let state = store.snapshot().await;
        assert!(state.throttled);
        assert_eq!(state.error.as_deref(), Some("rate limited"));
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn stale_fetch_never_overwrites_a_newer_one() {
        // First fetch resolves slowly with 1 result, second fast with 2
        let transport = Arc::new(
            MockTransport::new(|req| {
                let n = if req.query.iter().any(|(k, v)| k == "limit" && v == "1") {
                    1
                } else {
                    2
                };
                Ok(Some(page_json(n)))
            })
            .with_delays(vec![Duration::from_millis(50), Duration::from_millis(1)]),
        );
        let store = Arc::new(ApiKeysStore::new(ApiKeyClient::new(transport)));

        let slow = {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .fetch_keys(&ApiKeyFilters {
                        limit: Some(1),
                        ..Default::default()
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        store.fetch_keys(&ApiKeyFilters::default()).await;
        slow.await.unwrap();

        // The slow, older fetch completed last but its result was discarded
        assert_eq!(store.snapshot().await.count, 2);
    }

    #[tokio::test]
    async fn revoke_updates_the_cached_record() {
        let transport = Arc::new(MockTransport::new(|req| {
            if req.path.ends_with("/revoke") {
                Ok(Some(serde_json::json!({
                    "id": "k0-1",
                    "owner": "ops",
                    "scope": "read",
                    "is_active": false,
                    "status": "revoked",
                })))
            } else {
                Ok(Some(page_json(1)))
            }
        }));
        let store = ApiKeysStore::new(ApiKeyClient::new(transport));

        store.fetch_keys(&ApiKeyFilters::default()).await;
        store.revoke_key("k0-1", None).await.unwrap();

        let state = store.snapshot().await;
        assert_eq!(
            state.keys[0].effective_status(),
            ragline_types::ApiKeyStatus::Revoked
        );
    }

    fn partner_fixture() -> (Arc<MockTransport>, PartnerAuthStore) {
        let storage = Arc::new(MemoryCredentialStore::new());
        let transport = Arc::new(MockTransport::new(|_| {
            Ok(Some(serde_json::json!({
                "access_token": "tok",
                "expires_in": 600,
            })))
        }));
        let manager = Arc::new(PartnerTokenManager::new(transport.clone(), storage.clone()));
        (transport, PartnerAuthStore::new(manager, storage))
    }

    #[tokio::test]
    async fn partner_store_round_trips_config_and_token() {
        let (_, store) = partner_fixture();
        store
            .save_config(PartnerAuthConfig {
                partner_id: "p".to_string(),
                partner_secret: "s".to_string(),
                scopes: Scopes::from("read"),
                audience: None,
            })
            .await
            .unwrap();

        let token = store.fetch_token(false).await.unwrap();
        assert_eq!(token.access_token, "tok");

        let status = store.status().await;
        assert!(status.configured);
        assert!(status.has_token);
        assert!(!status.expired);
    }

    #[tokio::test]
    async fn force_fetch_without_config_is_a_bad_request() {
        let (transport, store) = partner_fixture();
        let err = store.fetch_token(true).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::BadRequest);
        assert_eq!(transport.call_count(), 0);
        assert_eq!(store.snapshot().await.error_code, Some(ErrorCode::BadRequest));
    }

    #[tokio::test]
    async fn clear_resets_everything() {
        let (_, store) = partner_fixture();
        store
            .save_config(PartnerAuthConfig {
                partner_id: "p".to_string(),
                partner_secret: "s".to_string(),
                scopes: Scopes::default(),
                audience: None,
            })
            .await
            .unwrap();
        store.fetch_token(false).await.unwrap();

        store.clear().await.unwrap();
        let status = store.status().await;
        assert!(!status.configured);
        assert!(!status.has_token);
    }
}
