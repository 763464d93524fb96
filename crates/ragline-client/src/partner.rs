//! Partner token manager
//!
//! Issues, caches and refreshes partner tokens. The in-memory cache mirrors
//! durable storage, and refresh is single-flight: concurrent callers that find
//! no valid token share one network request instead of each issuing their own.

use crate::transport::{ApiRequest, Transport};
use ragline_core::{keys, load_json, store_json, AppError, CredentialStorage, ErrorCode, Result};
use ragline_types::{
    PartnerAuthConfig, PartnerTokenRefreshRequest, PartnerTokenRequest, PartnerTokenResponse,
    StoredPartnerToken,
};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

pub const TOKEN_PATH: &str = "/v1/partner/token";
pub const REFRESH_PATH: &str = "/v1/partner/token/refresh";

#[derive(Default)]
struct CacheSlot {
    /// Whether durable storage has been consulted yet
    primed: bool,
    token: Option<StoredPartnerToken>,
}

pub struct PartnerTokenManager {
    transport: Arc<dyn Transport>,
    storage: Arc<dyn CredentialStorage>,
    cache: RwLock<CacheSlot>,
    /// Serializes refresh/issuance so concurrent demand produces one request.
    /// An async mutex rather than a shared in-flight handle: under real
    /// parallelism the lock plus the re-check below gives the same guarantee.
    refresh_gate: Mutex<()>,
}

impl PartnerTokenManager {
    pub fn new(transport: Arc<dyn Transport>, storage: Arc<dyn CredentialStorage>) -> Self {
        Self {
            transport,
            storage,
            cache: RwLock::new(CacheSlot::default()),
            refresh_gate: Mutex::new(()),
        }
    }

    /// Return a token that is not within the expiry skew, refreshing or
    /// issuing one if needed.
    ///
    /// Concurrent callers during a refresh wait on the gate and then observe
    /// the freshly cached token; exactly one network request is made.
    pub async fn ensure_fresh_token(
        &self,
        config: Option<&PartnerAuthConfig>,
    ) -> Result<StoredPartnerToken> {
        if let Some(token) = self.cached().await? {
            if !token.is_expired() {
                return Ok(token);
            }
        }

        let _gate = self.refresh_gate.lock().await;

        // Re-check under the gate: another caller may have refreshed while we
        // waited
        let current = self.cached().await?;
        if let Some(token) = &current {
            if !token.is_expired() {
                return Ok(token.clone());
            }
        }

        match current.and_then(|t| t.refresh_token) {
            Some(refresh_token) => {
                debug!("cached partner token expired, refreshing");
                self.refresh_partner_token(&refresh_token, config.map(|c| c.partner_id.clone()))
                    .await
            }
            None => match config {
                Some(config) => {
                    debug!("no partner token cached, requesting a fresh one");
                    self.request_partner_token(config).await
                }
                None => Err(AppError::new(
                    ErrorCode::Unauthorized,
                    "no refresh token cached and no partner credentials supplied",
                )),
            },
        }
    }

    /// Exchange partner credentials for a fresh token via the issuance
    /// endpoint; the result is persisted before being returned.
    pub async fn request_partner_token(
        &self,
        config: &PartnerAuthConfig,
    ) -> Result<StoredPartnerToken> {
        if !config.has_credentials() {
            return Err(AppError::new(
                ErrorCode::BadRequest,
                "partner_id and partner_secret are required",
            ));
        }

        let scope = config.scope_string();
        let body = PartnerTokenRequest {
            partner_id: config.partner_id.clone(),
            partner_secret: config.partner_secret.clone(),
            scope: (!scope.is_empty()).then_some(scope),
            audience: config.audience.clone(),
        };
        let payload = self
            .transport
            .execute(ApiRequest::post(
                TOKEN_PATH,
                serde_json::to_value(&body).map_err(AppError::classify)?,
            ))
            .await?;
        self.accept_token(payload).await
    }

    /// Trade a refresh token for a new one; persisted before being returned.
    pub async fn refresh_partner_token(
        &self,
        refresh_token: &str,
        partner_id: Option<String>,
    ) -> Result<StoredPartnerToken> {
        let body = PartnerTokenRefreshRequest {
            refresh_token: refresh_token.to_string(),
            partner_id,
        };
        let payload = self
            .transport
            .execute(ApiRequest::post(
                REFRESH_PATH,
                serde_json::to_value(&body).map_err(AppError::classify)?,
            ))
            .await?;
        self.accept_token(payload).await
    }

    /// Drop the cached token and its persisted copy
    pub async fn clear(&self) -> Result<()> {
        let mut slot = self.cache.write().await;
        slot.primed = true;
        slot.token = None;
        self.storage.remove(keys::PARTNER_TOKEN)
    }

    /// Cached token, consulting durable storage on first use
    async fn cached(&self) -> Result<Option<StoredPartnerToken>> {
        {
            let slot = self.cache.read().await;
            if slot.primed {
                return Ok(slot.token.clone());
            }
        }
        let mut slot = self.cache.write().await;
        if !slot.primed {
            slot.token = load_json(self.storage.as_ref(), keys::PARTNER_TOKEN)?;
            slot.primed = true;
        }
        Ok(slot.token.clone())
    }

    /// Validate a token endpoint payload, persist the token, update the cache
    async fn accept_token(
        &self,
        payload: Option<serde_json::Value>,
    ) -> Result<StoredPartnerToken> {
        let payload = payload.ok_or_else(|| {
            AppError::malformed(
                "token endpoint returned no JSON payload",
                serde_json::Value::Null,
            )
        })?;
        let response: PartnerTokenResponse = serde_json::from_value(payload.clone())
            .map_err(|_| AppError::malformed("unrecognized token response shape", payload.clone()))?;
        let now_ms = chrono::Utc::now().timestamp_millis();
        let token = response
            .into_stored(now_ms)
            .ok_or_else(|| AppError::malformed("token response missing access_token", payload))?;

        // Persist before returning so a crash never loses an issued token
        store_json(self.storage.as_ref(), keys::PARTNER_TOKEN, &token)?;
        let mut slot = self.cache.write().await;
        slot.primed = true;
        slot.token = Some(token.clone());
        Ok(token)
    }
}
