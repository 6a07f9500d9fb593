pub mod ai;
pub mod artifact;
pub mod config;
pub mod error;
pub mod fs;
pub mod project;
pub mod provider;
pub mod router;
pub mod session;

// Re-export common error type
pub use error::{CodeobitError, ErrorKind, Result};
