//! HTTP transport with session-expiry detection
//!
//! Issues credentialed requests against the dashboard backend: cookies carry
//! the session, a CSRF token read from the cookie jar is echoed as a header on
//! mutating calls, and redirects are never followed — the backend redirects to
//! its login page to signal an expired session, so a 3xx surfaces as a
//! synthetic 401.

use async_trait::async_trait;
use ragline_core::{AppError, Result};
use std::sync::Arc;
use tracing::{debug, warn};

/// Cookie the backend issues its CSRF token under
const CSRF_COOKIE: &str = "csrftoken";
/// Header the token is echoed back as
const CSRF_HEADER: &str = "X-CSRFToken";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

/// One request through the transport seam
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    /// POST with no body (logout, parameterless mutations)
    pub fn post_empty(path: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }
}

/// Transport seam; the reqwest implementation below is the production one,
/// tests substitute mocks.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform the request and classify the outcome.
    ///
    /// `Ok(None)` means success with no usable payload (204 or a non-JSON
    /// content type); callers must not assume JSON came back.
    async fn execute(&self, request: ApiRequest) -> Result<Option<serde_json::Value>>;
}

/// Classify a successful (2xx) response body.
///
/// 204 and non-JSON content types yield no payload; an unparseable JSON body
/// is a malformed-response error, not a silent null.
fn success_payload(
    status: u16,
    content_type: Option<&str>,
    body: &str,
) -> Result<Option<serde_json::Value>> {
    if status == 204 || body.is_empty() {
        return Ok(None);
    }
    match content_type {
        Some(ct) if ct.starts_with("application/json") => serde_json::from_str(body)
            .map(Some)
            .map_err(|_| {
                AppError::malformed(
                    "response claimed JSON but did not parse",
                    serde_json::Value::String(body.to_string()),
                )
            }),
        _ => Ok(None),
    }
}

/// Classify a completed response by status: a redirect means the backend
/// bounced us to its login page instead of answering 401, so it surfaces as
/// session expiry; 2xx defers to [`success_payload`]; anything else is an
/// HTTP error.
fn classify_response(
    status: u16,
    location: Option<String>,
    content_type: Option<&str>,
    body: &str,
) -> Result<Option<serde_json::Value>> {
    match status {
        300..=399 => Err(AppError::session_redirect(location)),
        200..=299 => success_payload(status, content_type, body),
        _ => Err(AppError::from_status(status, body)),
    }
}

/// reqwest-backed transport with a shared cookie jar
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
    jar: Arc<reqwest::cookie::Jar>,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let jar = Arc::new(reqwest::cookie::Jar::default());
        let http = reqwest::Client::builder()
            .cookie_provider(jar.clone())
            // Redirects signal session expiry and must surface, not be followed
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(AppError::network)?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            jar,
        })
    }

    fn url_for(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        format!("{}/{}", self.base_url, path)
    }

    /// CSRF token from the cookie jar, if the backend has set one
    fn csrf_token(&self) -> Option<String> {
        use reqwest::cookie::CookieStore;

        let url = reqwest::Url::parse(&self.base_url).ok()?;
        let header = self.jar.cookies(&url)?;
        let raw = header.to_str().ok()?;
        raw.split(';')
            .map(str::trim)
            .find_map(|cookie| cookie.strip_prefix(CSRF_COOKIE))
            .and_then(|rest| rest.strip_prefix('='))
            .map(str::to_string)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: ApiRequest) -> Result<Option<serde_json::Value>> {
        let url = self.url_for(&request.path);
        debug!(method = request.method.as_str(), %url, "dashboard request");

        let mut builder = match request.method {
            Method::Get => self.http.get(&url),
            Method::Post => self.http.post(&url),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if request.method == Method::Post {
            if let Some(token) = self.csrf_token() {
                builder = builder.header(CSRF_HEADER, token);
            }
        }

        let response = builder.send().await.map_err(|e| {
            warn!(%url, error = %e, "transport failure");
            AppError::network(e)
        })?;

        let status = response.status();
        if status.is_redirection() {
            warn!(%url, status = status.as_u16(), "redirect treated as session expiry");
        }
        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await.unwrap_or_default();

        classify_response(status.as_u16(), location, content_type.as_deref(), &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragline_core::{ErrorCode, ErrorDetails};

    #[test]
    fn no_content_yields_no_payload() {
        assert_eq!(success_payload(204, Some("application/json"), "").unwrap(), None);
    }

    #[test]
    fn json_content_type_is_parsed() {
        let payload = success_payload(200, Some("application/json; charset=utf-8"), r#"{"ok":true}"#)
            .unwrap()
            .unwrap();
        assert_eq!(payload["ok"], true);
    }

    #[test]
    fn non_json_content_type_yields_no_payload() {
        let payload = success_payload(200, Some("text/html"), "<html>hi</html>").unwrap();
        assert_eq!(payload, None);
    }

    #[test]
    fn missing_content_type_yields_no_payload() {
        assert_eq!(success_payload(200, None, "anything").unwrap(), None);
    }

    #[test]
    fn unparseable_json_is_malformed_not_null() {
        let err = success_payload(200, Some("application/json"), "{nope").unwrap_err();
        assert_eq!(err.code, ErrorCode::Internal);
    }

    #[test]
    fn redirect_surfaces_as_a_session_expiry_401() {
        let err = classify_response(
            302,
            Some("/accounts/login/".to_string()),
            Some("text/html"),
            "",
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::Unauthorized);
        assert!(err.is_session_redirect());
        assert!(matches!(
            err.details,
            ErrorDetails::Redirect { location: Some(ref l) } if l == "/accounts/login/"
        ));
    }

    #[test]
    fn redirect_without_a_location_is_still_session_expiry() {
        let err = classify_response(307, None, None, "").unwrap_err();
        assert_eq!(err.code, ErrorCode::Unauthorized);
        assert!(err.is_session_redirect());
    }

    #[test]
    fn error_statuses_carry_the_body_as_the_message() {
        let err = classify_response(503, None, Some("text/plain"), "upstream down").unwrap_err();
        assert_eq!(err.code, ErrorCode::Unavailable);
        assert_eq!(err.message, "upstream down");
    }

    #[test]
    fn url_join_normalizes_slashes() {
        let transport = HttpTransport::new("https://api.example.com/").unwrap();
        assert_eq!(
            transport.url_for("/v1/keys"),
            "https://api.example.com/v1/keys"
        );
        assert_eq!(
            transport.url_for("v1/keys"),
            "https://api.example.com/v1/keys"
        );
    }
}
