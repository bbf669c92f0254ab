use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::PROTOCOL_VERSION;
use crate::jsonrpc::{JsonRpcError, JsonRpcId, JsonRpcRequest, JsonRpcResponse};
use crate::types::{CallToolParams, CallToolResult, InitializeResult, ListToolsResult, McpServerInfo};

#[async_trait]
pub trait McpHandler: Send + Sync {
    async fn list_tools(&self) -> anyhow::Result<ListToolsResult>;
    async fn call_tool(&self, params: CallToolParams) -> anyhow::Result<CallToolResult>;
}

#[derive(Debug, Clone)]
pub struct McpServerConfig {
    pub server_info: McpServerInfo,
    pub capabilities: Value,
}

impl McpServerConfig {
    pub fn default_for_binary(name: &str, version: &str) -> Self {
        Self {
            server_info: McpServerInfo {
                name: name.to_string(),
                version: version.to_string(),
            },
            capabilities: serde_json::json!({ "tools": {} }),
        }
    }
}

// Fallback ids substituted when a request carries no id. A JSON-RPC server
// would normally echo null here; these fixed per-method values are kept for
// parity with existing clients of this server (see DESIGN.md).
const FALLBACK_ID_INITIALIZE: i64 = 0;
const FALLBACK_ID_LIST_TOOLS: i64 = 1;
const FALLBACK_ID_CALL_OK: i64 = 2;
const FALLBACK_ID_CALL_ERR: i64 = 3;
const FALLBACK_ID_UNKNOWN_METHOD: i64 = 0;

/// Stateless method router: every request gets exactly one response.
pub struct McpConnection {
    cfg: McpServerConfig,
    handler: Arc<dyn McpHandler>,
}

impl McpConnection {
    pub fn new(cfg: McpServerConfig, handler: Arc<dyn McpHandler>) -> Self {
        Self { cfg, handler }
    }

    pub async fn handle_request(&self, req: JsonRpcRequest) -> JsonRpcResponse {
        match req.method.as_str() {
            "initialize" => self.handle_initialize(req.id),
            "tools/list" => self.handle_list_tools(req.id).await,
            "tools/call" => self.handle_call_tool(req.id, req.params).await,
            other => JsonRpcResponse::err(
                fallback(req.id, FALLBACK_ID_UNKNOWN_METHOD),
                JsonRpcError {
                    code: -32601,
                    message: format!("Method not found: {other}"),
                    data: None,
                },
            ),
        }
    }

    fn handle_initialize(&self, id: Option<JsonRpcId>) -> JsonRpcResponse {
        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: self.cfg.capabilities.clone(),
            server_info: self.cfg.server_info.clone(),
        };
        JsonRpcResponse::ok(
            fallback(id, FALLBACK_ID_INITIALIZE),
            serde_json::to_value(result).unwrap_or(Value::Null),
        )
    }

    async fn handle_list_tools(&self, id: Option<JsonRpcId>) -> JsonRpcResponse {
        let id = fallback(id, FALLBACK_ID_LIST_TOOLS);
        match self.handler.list_tools().await {
            Ok(res) => {
                JsonRpcResponse::ok(id, serde_json::to_value(res).unwrap_or(Value::Null))
            }
            Err(e) => internal_error(id, e.to_string()),
        }
    }

    async fn handle_call_tool(
        &self,
        id: Option<JsonRpcId>,
        params: Option<Value>,
    ) -> JsonRpcResponse {
        let params = match params {
            Some(v) => match serde_json::from_value::<CallToolParams>(v) {
                Ok(p) => p,
                Err(e) => {
                    return internal_error(fallback(id, FALLBACK_ID_CALL_ERR), e.to_string());
                }
            },
            None => CallToolParams::default(),
        };

        match self.handler.call_tool(params).await {
            Ok(res) => JsonRpcResponse::ok(
                fallback(id, FALLBACK_ID_CALL_OK),
                serde_json::to_value(res).unwrap_or(Value::Null),
            ),
            Err(e) => internal_error(fallback(id, FALLBACK_ID_CALL_ERR), e.to_string()),
        }
    }
}

fn fallback(id: Option<JsonRpcId>, default: i64) -> JsonRpcId {
    id.unwrap_or(JsonRpcId::Number(default))
}

fn internal_error(id: JsonRpcId, message: String) -> JsonRpcResponse {
    JsonRpcResponse::err(
        id,
        JsonRpcError {
            code: -32603,
            message,
            data: None,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Tool;

    struct DummyHandler;

    #[async_trait]
    impl McpHandler for DummyHandler {
        async fn list_tools(&self) -> anyhow::Result<ListToolsResult> {
            Ok(ListToolsResult {
                tools: vec![Tool {
                    name: "echo".to_string(),
                    description: "demo".to_string(),
                    input_schema: serde_json::json!({"type": "object"}),
                }],
            })
        }

        async fn call_tool(&self, params: CallToolParams) -> anyhow::Result<CallToolResult> {
            if params.name == "boom" {
                anyhow::bail!("Unknown tool: boom");
            }
            Ok(CallToolResult::text(format!("called {}", params.name)))
        }
    }

    fn mk_conn() -> McpConnection {
        let cfg = McpServerConfig::default_for_binary("test", "0.0.0");
        McpConnection::new(cfg, Arc::new(DummyHandler))
    }

    #[tokio::test]
    async fn initialize_echoes_fixed_protocol_version() {
        let conn = mk_conn();
        let req = JsonRpcRequest::new(Some(JsonRpcId::Number(9)), "initialize", None);
        let resp = conn.handle_request(req).await;
        assert_eq!(resp.id, JsonRpcId::Number(9));
        let result = resp.result.expect("result");
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], "test");
    }

    #[tokio::test]
    async fn fallback_ids_are_per_method() {
        let conn = mk_conn();

        let resp = conn
            .handle_request(JsonRpcRequest::new(None, "initialize", None))
            .await;
        assert_eq!(resp.id, JsonRpcId::Number(0));

        let resp = conn
            .handle_request(JsonRpcRequest::new(None, "tools/list", None))
            .await;
        assert_eq!(resp.id, JsonRpcId::Number(1));

        let resp = conn
            .handle_request(JsonRpcRequest::new(
                None,
                "tools/call",
                Some(serde_json::json!({"name": "echo"})),
            ))
            .await;
        assert_eq!(resp.id, JsonRpcId::Number(2));
        assert!(resp.error.is_none());

        let resp = conn
            .handle_request(JsonRpcRequest::new(
                None,
                "tools/call",
                Some(serde_json::json!({"name": "boom"})),
            ))
            .await;
        assert_eq!(resp.id, JsonRpcId::Number(3));
        assert_eq!(resp.error.as_ref().map(|e| e.code), Some(-32603));
    }

    #[tokio::test]
    async fn request_id_is_echoed_when_present() {
        let conn = mk_conn();
        let req = JsonRpcRequest::new(
            Some(JsonRpcId::String("abc".to_string())),
            "tools/call",
            Some(serde_json::json!({"name": "echo"})),
        );
        let resp = conn.handle_request(req).await;
        assert_eq!(resp.id, JsonRpcId::String("abc".to_string()));
    }

    #[tokio::test]
    async fn unknown_method_is_32601() {
        let conn = mk_conn();
        let req = JsonRpcRequest::new(Some(JsonRpcId::Number(1)), "resources/list", None);
        let resp = conn.handle_request(req).await;
        let err = resp.error.expect("error");
        assert_eq!(err.code, -32601);
        assert!(err.message.contains("resources/list"));
    }

    #[tokio::test]
    async fn tool_error_message_is_surfaced_verbatim() {
        let conn = mk_conn();
        let req = JsonRpcRequest::new(
            Some(JsonRpcId::Number(4)),
            "tools/call",
            Some(serde_json::json!({"name": "boom"})),
        );
        let resp = conn.handle_request(req).await;
        let err = resp.error.expect("error");
        assert_eq!(err.code, -32603);
        assert_eq!(err.message, "Unknown tool: boom");
    }
}
