//! Databricks REST API client.
//!
//! This crate is intentionally scoped to the handful of endpoints the MCP
//! server proxies: current user, clusters, jobs, and workspace listing.
//! It is a thin typed wrapper over the REST API; anything resembling retry,
//! caching, or pagination policy belongs to callers.

mod client;
mod config;
pub mod types;

pub use client::{DatabricksClientError, WorkspaceClient};
pub use config::{
    ConfigError, ConnectionConfig, ENV_DATABRICKS_HOST, ENV_DATABRICKS_TOKEN,
    ENV_DATABRICKS_WORKSPACE_ID,
};
