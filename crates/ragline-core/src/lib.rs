//! Ragline Core
//!
//! Error taxonomy, durable credential storage and upstream settings shared by
//! the client library and CLI.

pub mod error;
pub mod settings;
pub mod storage;

pub use error::*;
pub use settings::*;
pub use storage::*;
