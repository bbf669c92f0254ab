use std::sync::Arc;

use clap::Parser;
use dbx_api::{ENV_DATABRICKS_HOST, ENV_DATABRICKS_TOKEN, ENV_DATABRICKS_WORKSPACE_ID};
use dbx_mcp::{JsonRpcRequest, McpConnection, McpHandler, McpServerConfig};
use tokio::io::{AsyncBufReadExt as _, AsyncWriteExt as _, BufReader};
use tracing::{error, info};

mod tools;

use tools::DatabricksHandler;

#[derive(Debug, Parser)]
#[command(
    name = "dbx-mcp-server",
    version,
    about = "MCP stdio server for Databricks workspace operations"
)]
struct Args {
    /// Databricks workspace URL, e.g. `https://adb-123.4.azuredatabricks.net`.
    #[arg(long, env = ENV_DATABRICKS_HOST)]
    host: Option<String>,

    /// Personal access token for the workspace.
    #[arg(long, env = ENV_DATABRICKS_TOKEN, hide_env_values = true)]
    token: Option<String>,

    /// Workspace id (informational; no current tool uses it).
    #[arg(long, env = ENV_DATABRICKS_WORKSPACE_ID)]
    workspace_id: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,hyper=warn,reqwest=warn".into()),
        )
        .json()
        // stdout carries the JSON-RPC stream; logs go to stderr.
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    // Credentials are resolved here but only validated on the first tool
    // call; a server started without them still serves initialize and
    // tools/list.
    let handler: Arc<dyn McpHandler> =
        Arc::new(DatabricksHandler::new(args.host, args.token, args.workspace_id));
    let cfg = McpServerConfig::default_for_binary("databricks-mcp", env!("CARGO_PKG_VERSION"));
    let conn = McpConnection::new(cfg, handler);

    info!("starting Databricks MCP server (stdio)");
    run_stdio(&conn).await
}

async fn run_stdio(conn: &McpConnection) -> anyhow::Result<()> {
    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        if let Some(out) = process_line(conn, &line).await {
            stdout.write_all(out.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }
    }

    info!("stdin closed, shutting down");
    Ok(())
}

/// Handle one input line. Returns the serialized response, or `None` for
/// blank and unparseable lines, which are dropped without a reply.
async fn process_line(conn: &McpConnection, line: &str) -> Option<String> {
    if line.trim().is_empty() {
        return None;
    }

    let req: JsonRpcRequest = match serde_json::from_str(line) {
        Ok(r) => r,
        Err(e) => {
            error!(error = %e, "invalid JSON received");
            return None;
        }
    };

    let resp = conn.handle_request(req).await;
    match serde_json::to_string(&resp) {
        Ok(s) => Some(s),
        Err(e) => {
            error!(error = %e, "failed to serialize response");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mk_conn() -> McpConnection {
        let handler: Arc<dyn McpHandler> = Arc::new(DatabricksHandler::new(None, None, None));
        let cfg = McpServerConfig::default_for_binary("databricks-mcp", env!("CARGO_PKG_VERSION"));
        McpConnection::new(cfg, handler)
    }

    #[tokio::test]
    async fn tools_list_line_exchange() {
        let conn = mk_conn();
        let out = process_line(
            &conn,
            r#"{"jsonrpc":"2.0","id":5,"method":"tools/list","params":{}}"#,
        )
        .await
        .expect("one response line");

        let v: serde_json::Value = serde_json::from_str(&out).expect("valid json");
        assert_eq!(v["id"], 5);
        assert_eq!(v["result"]["tools"].as_array().expect("tools").len(), 7);
        assert_eq!(
            v["result"]["tools"][0]["name"],
            "databricks_test_connection"
        );
    }

    #[tokio::test]
    async fn malformed_line_produces_no_output() {
        let conn = mk_conn();
        assert!(process_line(&conn, "{not json").await.is_none());
        assert!(process_line(&conn, "   ").await.is_none());

        // The loop keeps serving after bad input.
        let out = process_line(
            &conn,
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
        )
        .await
        .expect("response");
        let v: serde_json::Value = serde_json::from_str(&out).expect("valid json");
        assert_eq!(v["result"]["protocolVersion"], "2024-11-05");
        assert_eq!(v["result"]["serverInfo"]["name"], "databricks-mcp");
    }

    #[tokio::test]
    async fn non_object_json_line_is_dropped() {
        let conn = mk_conn();
        assert!(process_line(&conn, "[1,2,3]").await.is_none());
        assert!(process_line(&conn, "42").await.is_none());
    }

    #[tokio::test]
    async fn unknown_method_gets_error_line() {
        let conn = mk_conn();
        let out = process_line(
            &conn,
            r#"{"jsonrpc":"2.0","id":7,"method":"resources/read","params":{}}"#,
        )
        .await
        .expect("response");
        let v: serde_json::Value = serde_json::from_str(&out).expect("valid json");
        assert_eq!(v["error"]["code"], -32601);
        assert_eq!(v["id"], 7);
    }

    #[tokio::test]
    async fn unknown_tool_call_surfaces_32603() {
        // Credentials present so the failure is the tool lookup, not config.
        let handler: Arc<dyn McpHandler> = Arc::new(DatabricksHandler::new(
            Some("https://example.cloud.databricks.com".to_string()),
            Some("dapi123".to_string()),
            None,
        ));
        let cfg = McpServerConfig::default_for_binary("databricks-mcp", env!("CARGO_PKG_VERSION"));
        let conn = McpConnection::new(cfg, handler);
        let out = process_line(
            &conn,
            r#"{"jsonrpc":"2.0","method":"tools/call","params":{"name":"databricks_drop_tables"}}"#,
        )
        .await
        .expect("response");
        let v: serde_json::Value = serde_json::from_str(&out).expect("valid json");
        assert_eq!(v["id"], 3);
        assert_eq!(v["error"]["code"], -32603);
        assert!(
            v["error"]["message"]
                .as_str()
                .expect("message")
                .contains("databricks_drop_tables")
        );
    }
}
