//! API key administration types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of an API key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiKeyStatus {
    Active,
    Inactive,
    Revoked,
}

impl std::fmt::Display for ApiKeyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiKeyStatus::Active => write!(f, "active"),
            ApiKeyStatus::Inactive => write!(f, "inactive"),
            ApiKeyStatus::Revoked => write!(f, "revoked"),
        }
    }
}

/// An API key as returned by the admin endpoints
///
/// Keys are never deleted; revoke is a terminal transition and a revoked key
/// is never reactivated through rotation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyRecord {
    pub id: String,
    pub owner: String,
    pub scope: String,
    pub rate_limit: Option<i64>,
    pub is_active: bool,
    /// Explicit status from the server; derived from `is_active` when absent
    pub status: Option<ApiKeyStatus>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub last_rotated_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

impl ApiKeyRecord {
    /// Server-provided status, falling back to a derivation from `is_active`
    pub fn effective_status(&self) -> ApiKeyStatus {
        self.status.unwrap_or(if self.is_active {
            ApiKeyStatus::Active
        } else {
            ApiKeyStatus::Inactive
        })
    }
}

/// Create-key request; the plaintext secret comes back exactly once
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyCreate {
    pub owner: String,
    pub scope: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl ApiKeyCreate {
    /// The server contract takes a single comma-joined scope string
    pub fn wire_scope(&self) -> String {
        self.scope.join(",")
    }
}

/// Optional rotate-key parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiKeyRotateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Optional revoke-key parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiKeyRevokeRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Key record plus the one-time plaintext secret
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyWithSecret {
    #[serde(flatten)]
    pub record: ApiKeyRecord,
    pub api_key: String,
}

/// Filters for listing API keys; unset or empty values are omitted from the
/// query string
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiKeyFilters {
    pub search: Option<String>,
    pub owner: Option<String>,
    pub scope: Option<String>,
    pub is_active: Option<bool>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl ApiKeyFilters {
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        push_str(&mut pairs, "search", &self.search);
        push_str(&mut pairs, "owner", &self.owner);
        push_str(&mut pairs, "scope", &self.scope);
        if let Some(active) = self.is_active {
            pairs.push(("is_active".to_string(), active.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(offset) = self.offset {
            pairs.push(("offset".to_string(), offset.to_string()));
        }
        pairs
    }
}

/// Audit event attached to an API key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyEvent {
    pub id: String,
    pub api_key_id: String,
    pub event_type: String,
    pub ip_address: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Filters for the key event log
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiKeyEventFilters {
    pub api_key_id: Option<String>,
    pub event_type: Option<String>,
    pub ip_address: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl ApiKeyEventFilters {
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        push_str(&mut pairs, "api_key_id", &self.api_key_id);
        push_str(&mut pairs, "event_type", &self.event_type);
        push_str(&mut pairs, "ip_address", &self.ip_address);
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(offset) = self.offset {
            pairs.push(("offset".to_string(), offset.to_string()));
        }
        pairs
    }
}

fn push_str(pairs: &mut Vec<(String, String)>, key: &str, value: &Option<String>) {
    if let Some(v) = value {
        if !v.is_empty() {
            pairs.push((key.to_string(), v.clone()));
        }
    }
}
