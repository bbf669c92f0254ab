//! Model Context Protocol (MCP) primitives used by this repo.
//!
//! This crate is intentionally scoped to the server side of the stdio
//! transport: JSON-RPC framing plus the `initialize`, `tools/list`, and
//! `tools/call` methods. There is no client, no HTTP transport, and no
//! protocol negotiation; the server echoes a single fixed protocol version.

mod jsonrpc;
mod server;
mod types;

pub use jsonrpc::{JsonRpcError, JsonRpcId, JsonRpcRequest, JsonRpcResponse};
pub use server::{McpConnection, McpHandler, McpServerConfig};
pub use types::{
    CallToolParams, CallToolResult, ContentBlock, InitializeResult, ListToolsResult, McpServerInfo,
    Tool,
};

/// Protocol version echoed by `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";
