//! Ragline Types - Pure type definitions
//!
//! This crate contains only plain data types with no async runtime or HTTP
//! dependencies, shared between the client library and the CLI.

pub mod api_key;
pub mod partner;
pub mod user;

pub use api_key::*;
pub use partner::*;
pub use user::*;

use serde::{Deserialize, Serialize};

/// Paginated list envelope used by the admin endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
    #[serde(default)]
    pub count: u64,
}

impl<T> Page<T> {
    /// Empty page, used when an endpoint degrades to "not deployed yet"
    pub fn empty() -> Self {
        Self {
            results: Vec::new(),
            count: 0,
        }
    }
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self::empty()
    }
}
