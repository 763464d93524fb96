//! Session store
//!
//! State machine over the authenticated user: `idle → loading →
//! {authenticated, unauthenticated}`. Consumed by route guards and the CLI;
//! failures are recorded on the state (message, code, throttled flag) so the
//! caller decides how to render them.

use crate::transport::{ApiRequest, Transport};
use ragline_core::{AppError, ErrorCode, Result};
use ragline_types::{LoginRequest, SessionUser, SessionUserUpdate};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

pub const LOGIN_PATH: &str = "/v1/session/login";
pub const PROFILE_PATH: &str = "/v1/session/profile";
pub const LOGOUT_PATH: &str = "/v1/session/logout";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Loading,
    Authenticated,
    Unauthenticated,
}

/// Snapshot of the session state
#[derive(Debug, Clone)]
pub struct SessionState {
    pub status: SessionStatus,
    pub user: Option<SessionUser>,
    pub error: Option<String>,
    pub error_code: Option<ErrorCode>,
    pub throttled: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            status: SessionStatus::Idle,
            user: None,
            error: None,
            error_code: None,
            throttled: false,
        }
    }
}

pub struct SessionStore {
    transport: Arc<dyn Transport>,
    state: RwLock<SessionState>,
}

impl SessionStore {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            state: RwLock::new(SessionState::default()),
        }
    }

    pub async fn snapshot(&self) -> SessionState {
        self.state.read().await.clone()
    }

    /// Load the profile of the already-authenticated session, if any.
    ///
    /// No profile (empty payload) lands in `unauthenticated` with a 401 code
    /// but is not an error for the caller; transport failures are both
    /// recorded and returned.
    pub async fn load_profile(&self) -> Result<Option<SessionUser>> {
        self.begin_loading().await;
        match self.transport.execute(ApiRequest::get(PROFILE_PATH)).await {
            Ok(Some(payload)) => match parse_user(payload) {
                Ok(user) => {
                    self.set_authenticated(user.clone()).await;
                    Ok(Some(user))
                }
                Err(e) => {
                    self.set_unauthenticated(&e).await;
                    Err(e)
                }
            },
            Ok(None) => {
                debug!("no active session profile");
                let e = AppError::new(ErrorCode::Unauthorized, "no active session");
                self.set_unauthenticated(&e).await;
                Ok(None)
            }
            Err(e) => {
                self.set_unauthenticated(&e).await;
                Err(e)
            }
        }
    }

    pub async fn login(&self, credentials: &LoginRequest) -> Result<SessionUser> {
        self.begin_loading().await;
        let body = serde_json::to_value(credentials).map_err(AppError::classify)?;
        match self.transport.execute(ApiRequest::post(LOGIN_PATH, body)).await {
            Ok(payload) => match parse_user(payload.unwrap_or(serde_json::Value::Null)) {
                Ok(user) => {
                    self.set_authenticated(user.clone()).await;
                    Ok(user)
                }
                Err(e) => {
                    self.set_unauthenticated(&e).await;
                    Err(e)
                }
            },
            Err(e) => {
                self.set_unauthenticated(&e).await;
                Err(e)
            }
        }
    }

    /// Log out. The network call is fire-and-forget; the local session is
    /// always reset even when the server is unreachable.
    pub async fn logout(&self) {
        let _ = self
            .transport
            .execute(ApiRequest::post_empty(LOGOUT_PATH))
            .await;
        let mut state = self.state.write().await;
        *state = SessionState {
            status: SessionStatus::Unauthenticated,
            ..SessionState::default()
        };
    }

    /// Merge a partial update into the loaded user; no-op when nobody is
    /// logged in
    pub async fn update_user(&self, update: SessionUserUpdate) {
        let mut state = self.state.write().await;
        if let Some(user) = state.user.as_mut() {
            user.apply(update);
        }
    }

    async fn begin_loading(&self) {
        let mut state = self.state.write().await;
        state.status = SessionStatus::Loading;
        state.error = None;
        state.error_code = None;
        state.throttled = false;
    }

    async fn set_authenticated(&self, user: SessionUser) {
        let mut state = self.state.write().await;
        *state = SessionState {
            status: SessionStatus::Authenticated,
            user: Some(user),
            ..SessionState::default()
        };
    }

    async fn set_unauthenticated(&self, err: &AppError) {
        let mut state = self.state.write().await;
        *state = SessionState {
            status: SessionStatus::Unauthenticated,
            user: None,
            error: Some(err.message.clone()),
            error_code: Some(err.code),
            throttled: err.throttled,
        };
    }
}

/// Accept either a bare user object or a `{"user": {...}}` envelope
fn parse_user(payload: serde_json::Value) -> Result<SessionUser> {
    let value = match payload.get("user") {
        Some(inner) if inner.is_object() => inner.clone(),
        _ => payload,
    };
    serde_json::from_value(value.clone())
        .map_err(|_| AppError::malformed("unrecognized session user shape", value))
}
