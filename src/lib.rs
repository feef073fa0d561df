//! Virtual try-on relay: a browser page, a two-image submission pipeline and a
//! CORS-friendly pass-through to the external transformation API.

pub mod config;
pub mod error;
pub mod models;
pub mod server;
pub mod session;
pub mod status;
pub mod transform;
pub mod upload;

#[cfg(test)]
mod test_support;

pub use config::Config;
pub use error::{ConfigError, TryOnError};
