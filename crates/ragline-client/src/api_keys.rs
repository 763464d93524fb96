//! API-key administrative client
//!
//! Thin CRUD wrapper over the keys endpoints with one deliberate resilience
//! policy: a 404 on the read endpoints means "feature not deployed yet" and
//! degrades to an empty page, while a 404 on a write is a hard error with a
//! clarified message — the backend's raw HTML 404 page is never surfaced.

use crate::transport::{ApiRequest, Transport};
use ragline_core::{AppError, ErrorCode, Result};
use ragline_types::{
    ApiKeyCreate, ApiKeyEvent, ApiKeyEventFilters, ApiKeyFilters, ApiKeyRecord,
    ApiKeyRevokeRequest, ApiKeyRotateRequest, ApiKeyWithSecret, Page,
};
use std::sync::Arc;
use tracing::debug;

pub const KEYS_PATH: &str = "/v1/keys";
pub const KEY_EVENTS_PATH: &str = "/v1/keys/events";

pub struct ApiKeyClient {
    transport: Arc<dyn Transport>,
}

impl ApiKeyClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// List keys. A 404 means the endpoint is not deployed yet and yields an
    /// empty page; every other error propagates.
    pub async fn list_api_keys(&self, filters: &ApiKeyFilters) -> Result<Page<ApiKeyRecord>> {
        let request = ApiRequest::get(KEYS_PATH).with_query(filters.query_pairs());
        match self.transport.execute(request).await {
            Ok(payload) => parse_payload(payload),
            Err(e) if e.code == ErrorCode::NotFound => {
                debug!("keys endpoint not deployed, returning empty list");
                Ok(Page::empty())
            }
            Err(e) => Err(e),
        }
    }

    /// Create a key; the response carries the one-time plaintext secret
    pub async fn create_api_key(&self, payload: &ApiKeyCreate) -> Result<ApiKeyWithSecret> {
        let mut body = serde_json::to_value(payload).map_err(AppError::classify)?;
        // The server contract takes scope as one comma-joined string
        body["scope"] = serde_json::Value::String(payload.wire_scope());
        let result = self
            .transport
            .execute(ApiRequest::post(KEYS_PATH, body))
            .await
            .map_err(|e| clarify_write_not_found(e, "create"))?;
        parse_payload(result)
    }

    /// Rotate the secret of a key; identity is preserved
    pub async fn rotate_api_key(
        &self,
        id: &str,
        payload: Option<&ApiKeyRotateRequest>,
    ) -> Result<ApiKeyWithSecret> {
        let body = match payload {
            Some(p) => serde_json::to_value(p).map_err(AppError::classify)?,
            None => serde_json::json!({}),
        };
        let result = self
            .transport
            .execute(ApiRequest::post(format!("{KEYS_PATH}/{id}/rotate"), body))
            .await
            .map_err(|e| clarify_write_not_found(e, "rotate"))?;
        parse_payload(result)
    }

    /// Revoke a key; terminal, the record is never deleted
    pub async fn revoke_api_key(
        &self,
        id: &str,
        payload: Option<&ApiKeyRevokeRequest>,
    ) -> Result<ApiKeyRecord> {
        let body = match payload {
            Some(p) => serde_json::to_value(p).map_err(AppError::classify)?,
            None => serde_json::json!({}),
        };
        let result = self
            .transport
            .execute(ApiRequest::post(format!("{KEYS_PATH}/{id}/revoke"), body))
            .await
            .map_err(|e| clarify_write_not_found(e, "revoke"))?;
        parse_payload(result)
    }

    /// List key audit events; same read-degrades-on-404 policy as listing keys
    pub async fn list_api_key_events(
        &self,
        filters: &ApiKeyEventFilters,
    ) -> Result<Page<ApiKeyEvent>> {
        let request = ApiRequest::get(KEY_EVENTS_PATH).with_query(filters.query_pairs());
        match self.transport.execute(request).await {
            Ok(payload) => parse_payload(payload),
            Err(e) if e.code == ErrorCode::NotFound => {
                debug!("key events endpoint not deployed, returning empty list");
                Ok(Page::empty())
            }
            Err(e) => Err(e),
        }
    }
}

fn parse_payload<T: serde::de::DeserializeOwned>(payload: Option<serde_json::Value>) -> Result<T> {
    let payload = payload.ok_or_else(|| {
        AppError::malformed("keys endpoint returned no JSON payload", serde_json::Value::Null)
    })?;
    serde_json::from_value(payload.clone())
        .map_err(|_| AppError::malformed("unrecognized keys response shape", payload))
}

/// Writes against a missing endpoint fail loudly, but with a clarified
/// message instead of the backend's HTML error page.
fn clarify_write_not_found(err: AppError, operation: &str) -> AppError {
    if err.code == ErrorCode::NotFound {
        AppError::new(
            ErrorCode::NotFound,
            format!("API key {operation} failed: the keys endpoint was not found; it may not be deployed yet"),
        )
        .with_throttled(err.throttled)
    } else {
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTransport;
    use crate::transport::Method;

    const HTML_404: &str = "<!DOCTYPE html><html><body>Not Found</body></html>";

    fn record_json(id: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "owner": "ops",
            "scope": "read,write",
            "rate_limit": 100,
            "is_active": true,
        })
    }

    #[tokio::test]
    async fn list_degrades_to_empty_on_404() {
        let transport = Arc::new(MockTransport::new(|_| {
            Err(AppError::from_status(404, HTML_404))
        }));
        let client = ApiKeyClient::new(transport);

        let page = client
            .list_api_keys(&ApiKeyFilters::default())
            .await
            .unwrap();
        assert!(page.results.is_empty());
        assert_eq!(page.count, 0);
    }

    #[tokio::test]
    async fn list_propagates_other_errors() {
        let transport = Arc::new(MockTransport::new(|_| {
            Err(AppError::from_status(403, "forbidden"))
        }));
        let client = ApiKeyClient::new(transport);

        let err = client
            .list_api_keys(&ApiKeyFilters::default())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn list_sends_only_populated_filters() {
        let transport = Arc::new(MockTransport::new(|_| {
            Ok(Some(serde_json::json!({"results": [], "count": 0})))
        }));
        let client = ApiKeyClient::new(transport.clone());

        let filters = ApiKeyFilters {
            owner: Some("ops".to_string()),
            search: Some(String::new()),
            limit: Some(10),
            ..Default::default()
        };
        client.list_api_keys(&filters).await.unwrap();

        let calls = transport.calls();
        assert_eq!(calls[0].method, Method::Get);
        assert_eq!(
            calls[0].query,
            vec![
                ("owner".to_string(), "ops".to_string()),
                ("limit".to_string(), "10".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn create_404_is_a_hard_error_without_html() {
        let transport = Arc::new(MockTransport::new(|_| {
            Err(AppError::from_status(404, HTML_404))
        }));
        let client = ApiKeyClient::new(transport);

        let err = client
            .create_api_key(&ApiKeyCreate {
                owner: "ops".to_string(),
                scope: vec!["read".to_string()],
                rate_limit: None,
                expires_at: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
        assert!(!err.message.contains("<!DOCTYPE"));
        assert!(!err.message.contains("<html"));
    }

    #[tokio::test]
    async fn create_joins_scope_with_commas() {
        let transport = Arc::new(MockTransport::new(|_| {
            let mut record = record_json("k1");
            record["api_key"] = serde_json::json!("rg_live_secret");
            Ok(Some(record))
        }));
        let client = ApiKeyClient::new(transport.clone());

        let created = client
            .create_api_key(&ApiKeyCreate {
                owner: "ops".to_string(),
                scope: vec!["read".to_string(), "write".to_string()],
                rate_limit: None,
                expires_at: None,
            })
            .await
            .unwrap();
        assert_eq!(created.api_key, "rg_live_secret");
        assert_eq!(created.record.id, "k1");

        let body = transport.calls()[0].body.clone().unwrap();
        assert_eq!(body["scope"], "read,write");
    }

    #[tokio::test]
    async fn rotate_hits_the_key_scoped_path() {
        let transport = Arc::new(MockTransport::new(|_| {
            let mut record = record_json("k9");
            record["api_key"] = serde_json::json!("rotated-secret");
            Ok(Some(record))
        }));
        let client = ApiKeyClient::new(transport.clone());

        let rotated = client.rotate_api_key("k9", None).await.unwrap();
        assert_eq!(rotated.api_key, "rotated-secret");
        assert_eq!(transport.calls()[0].path, "/v1/keys/k9/rotate");
    }

    #[tokio::test]
    async fn revoke_returns_the_terminal_record() {
        let transport = Arc::new(MockTransport::new(|_| {
            let mut record = record_json("k2");
            record["is_active"] = serde_json::json!(false);
            record["status"] = serde_json::json!("revoked");
            Ok(Some(record))
        }));
        let client = ApiKeyClient::new(transport.clone());

        let record = client
            .revoke_api_key("k2", Some(&ApiKeyRevokeRequest { reason: Some("leaked".to_string()) }))
            .await
            .unwrap();
        assert_eq!(record.effective_status(), ragline_types::ApiKeyStatus::Revoked);
        assert_eq!(transport.calls()[0].path, "/v1/keys/k2/revoke");
        assert_eq!(transport.calls()[0].body.as_ref().unwrap()["reason"], "leaked");
    }

    #[tokio::test]
    async fn events_degrade_to_empty_on_404() {
        let transport = Arc::new(MockTransport::new(|_| {
            Err(AppError::from_status(404, HTML_404))
        }));
        let client = ApiKeyClient::new(transport);

        let page = client
            .list_api_key_events(&ApiKeyEventFilters {
                api_key_id: Some("k1".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(page.results.is_empty());
    }

    #[tokio::test]
    async fn throttled_flag_survives_clarification() {
        let transport = Arc::new(MockTransport::new(|_| {
            Err(AppError::from_status(429, "slow down"))
        }));
        let client = ApiKeyClient::new(transport);

        let err = client
            .list_api_keys(&ApiKeyFilters::default())
            .await
            .unwrap_err();
        assert!(err.throttled);
    }
}
