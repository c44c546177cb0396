//! reqwest-backed implementations for `websift`.
//!
//! [`OpenRouterClient`] is the only [`websift_core::SearchGateway`] today; it is built from a
//! [`Config`] that the binary reads once at startup.

pub mod config;
pub mod openrouter;
pub mod prompt;

pub use config::Config;
pub use openrouter::OpenRouterClient;
