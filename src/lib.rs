//! Scratchbox - a single workspace directory exposed over HTTP: shell
//! command execution, ad-hoc script running, and file access, all gated by
//! a shared-secret header.

pub mod config;
pub mod error;
pub mod exec;
pub mod files;
pub mod http_server;
pub mod state;
