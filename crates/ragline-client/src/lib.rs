//! Ragline Client
//!
//! The credential/session layer of the Ragline control plane: a transport
//! seam with session-expiry detection, a single-flight partner token manager,
//! the API-key admin client and the state stores consumed by front ends.

pub mod api_keys;
pub mod partner;
pub mod session;
pub mod store;
pub mod transport;

pub use api_keys::ApiKeyClient;
pub use partner::PartnerTokenManager;
pub use session::{SessionState, SessionStatus, SessionStore};
pub use store::{ApiKeysStore, PartnerAuthStatus, PartnerAuthStore};
pub use transport::{ApiRequest, HttpTransport, Method, Transport};

#[cfg(test)]
pub(crate) mod testing;
