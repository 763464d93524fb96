//! Partner credential and token types
//!
//! Partner tokens are short-lived bearer credentials obtained via a
//! client-credentials exchange (partner ID + secret) and used to call the RAG
//! engine on behalf of an integration partner.

use serde::{Deserialize, Serialize};

/// Safety margin subtracted from a token's nominal expiry so refresh happens
/// slightly before the server starts rejecting it.
pub const EXPIRY_SKEW_MS: i64 = 30_000;

/// Scopes as supplied by an operator: either a single space-separated string
/// or an explicit list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scopes {
    One(String),
    Many(Vec<String>),
}

impl Default for Scopes {
    fn default() -> Self {
        Scopes::One(String::new())
    }
}

impl From<&str> for Scopes {
    fn from(s: &str) -> Self {
        Scopes::One(s.to_string())
    }
}

impl From<Vec<String>> for Scopes {
    fn from(v: Vec<String>) -> Self {
        Scopes::Many(v)
    }
}

/// Normalize scopes to a single space-separated string.
///
/// Idempotent: feeding the output back in yields the same string.
pub fn normalize_scopes(scopes: &Scopes) -> String {
    match scopes {
        Scopes::One(s) => s.split_whitespace().collect::<Vec<_>>().join(" "),
        Scopes::Many(list) => list
            .iter()
            .flat_map(|s| s.split_whitespace())
            .collect::<Vec<_>>()
            .join(" "),
    }
}

/// Operator-supplied partner credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartnerAuthConfig {
    pub partner_id: String,
    pub partner_secret: String,
    #[serde(default)]
    pub scopes: Scopes,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
}

impl PartnerAuthConfig {
    /// Both the partner ID and secret must be present before any token
    /// request is attempted.
    pub fn has_credentials(&self) -> bool {
        !self.partner_id.is_empty() && !self.partner_secret.is_empty()
    }

    /// Scopes normalized to the wire form
    pub fn scope_string(&self) -> String {
        normalize_scopes(&self.scopes)
    }
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// A partner token as cached in memory and persisted to durable storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredPartnerToken {
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Absolute expiry in epoch milliseconds; `None` means the token never
    /// expires.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

impl StoredPartnerToken {
    /// Expired when less than [`EXPIRY_SKEW_MS`] of lifetime remains at
    /// `now_ms`. A token without `expires_at` never expires.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        match self.expires_at {
            None => false,
            Some(expires_at) => expires_at - now_ms <= EXPIRY_SKEW_MS,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(chrono::Utc::now().timestamp_millis())
    }
}

/// Token issuance request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartnerTokenRequest {
    pub partner_id: String,
    pub partner_secret: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
}

/// Token refresh request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartnerTokenRefreshRequest {
    pub refresh_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partner_id: Option<String>,
}

/// Raw token endpoint response; `expires_in` is in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartnerTokenResponse {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub token_type: Option<String>,
    pub expires_in: Option<i64>,
    pub scope: Option<String>,
}

impl PartnerTokenResponse {
    /// Convert to the stored form, normalizing `expires_in` seconds into an
    /// absolute `expires_at` at receipt time.
    ///
    /// Returns `None` when the response carries no usable `access_token`.
    pub fn into_stored(self, now_ms: i64) -> Option<StoredPartnerToken> {
        let access_token = self.access_token.filter(|t| !t.is_empty())?;
        Some(StoredPartnerToken {
            access_token,
            refresh_token: self.refresh_token,
            token_type: self.token_type.unwrap_or_else(default_token_type),
            scope: self.scope,
            expires_at: self.expires_in.map(|secs| now_ms + secs * 1000),
        })
    }
}
