//! `websift` crate (library surface).
//!
//! The primary entrypoint is the `websift` binary (MCP stdio server + CLI). This library
//! re-exports the core types and the OpenRouter gateway so they can be embedded without the
//! MCP layer.

pub use websift_core as core;
pub use websift_local as local;
