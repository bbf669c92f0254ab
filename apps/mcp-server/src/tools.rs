//! The Databricks tool catalog and its handler.
//!
//! Each tool is a one-to-one proxy for a single workspace REST call: run the
//! call, project the response onto a flat summary, serialize it with
//! two-space indentation (or a short human-readable string for
//! `test_connection` and `run_job`), and wrap it in a text content block.

use std::sync::Arc;

use async_trait::async_trait;
use dbx_api::{ConnectionConfig, WorkspaceClient};
use dbx_mcp::{CallToolParams, CallToolResult, ListToolsResult, McpHandler, Tool};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{Instrument as _, info};

pub const TOOL_TEST_CONNECTION: &str = "databricks_test_connection";
pub const TOOL_LIST_CLUSTERS: &str = "databricks_list_clusters";
pub const TOOL_GET_CLUSTER: &str = "databricks_get_cluster";
pub const TOOL_LIST_JOBS: &str = "databricks_list_jobs";
pub const TOOL_RUN_JOB: &str = "databricks_run_job";
pub const TOOL_GET_JOB_RUN: &str = "databricks_get_job_run";
pub const TOOL_LIST_WORKSPACE: &str = "databricks_list_workspace";

pub struct DatabricksHandler {
    host: Option<String>,
    token: Option<String>,
    workspace_id: Option<String>,
    // Created on first tool call, then reused for the process lifetime.
    client: Mutex<Option<Arc<WorkspaceClient>>>,
}

impl DatabricksHandler {
    pub fn new(host: Option<String>, token: Option<String>, workspace_id: Option<String>) -> Self {
        Self {
            host,
            token,
            workspace_id,
            client: Mutex::new(None),
        }
    }

    async fn ensure_client(&self) -> anyhow::Result<Arc<WorkspaceClient>> {
        let mut guard = self.client.lock().await;
        if let Some(client) = guard.as_ref() {
            return Ok(client.clone());
        }

        let config = ConnectionConfig::new(
            self.host.clone(),
            self.token.clone(),
            self.workspace_id.clone(),
        )?;
        let client = Arc::new(WorkspaceClient::new(&config)?);
        info!(host = %client.host(), "databricks client initialized");
        *guard = Some(client.clone());
        Ok(client)
    }

    async fn execute(&self, name: &str, args: &Value) -> anyhow::Result<String> {
        let client = self.ensure_client().await?;
        match name {
            TOOL_TEST_CONNECTION => test_connection(&client).await,
            TOOL_LIST_CLUSTERS => list_clusters(&client).await,
            TOOL_GET_CLUSTER => get_cluster(&client, args).await,
            TOOL_LIST_JOBS => list_jobs(&client).await,
            TOOL_RUN_JOB => run_job(&client, args).await,
            TOOL_GET_JOB_RUN => get_job_run(&client, args).await,
            TOOL_LIST_WORKSPACE => list_workspace(&client, args).await,
            other => anyhow::bail!("Unknown tool: {other}"),
        }
    }
}

#[async_trait]
impl McpHandler for DatabricksHandler {
    async fn list_tools(&self) -> anyhow::Result<ListToolsResult> {
        Ok(ListToolsResult { tools: catalog() })
    }

    async fn call_tool(&self, params: CallToolParams) -> anyhow::Result<CallToolResult> {
        let name = params.name.clone();
        let args = params.arguments.unwrap_or_else(|| serde_json::json!({}));
        let span = tracing::info_span!("tool_call", tool = %name);
        async move {
            let text = self.execute(&name, &args).await?;
            Ok(CallToolResult::text(text))
        }
        .instrument(span)
        .await
    }
}

async fn test_connection(client: &WorkspaceClient) -> anyhow::Result<String> {
    let user = client
        .current_user()
        .await
        .map_err(|e| anyhow::anyhow!("Connection failed: {e}"))?;
    Ok(format!(
        "Successfully connected to Databricks workspace!\nHost: {}\nUser: {}",
        client.host(),
        user.user_name
    ))
}

#[derive(Debug, Serialize)]
struct ClusterSummary {
    cluster_id: Option<String>,
    cluster_name: Option<String>,
    state: String,
    driver_node_type: Option<String>,
    worker_node_type: Option<String>,
    num_workers: Option<i64>,
    autotermination_minutes: Option<i64>,
}

impl ClusterSummary {
    fn from_info(c: &dbx_api::types::ClusterInfo) -> Self {
        Self {
            cluster_id: c.cluster_id.clone(),
            cluster_name: c.cluster_name.clone(),
            state: c.state.clone().unwrap_or_else(|| "Unknown".to_string()),
            driver_node_type: c.driver_node_type_id.clone(),
            worker_node_type: c.node_type_id.clone(),
            num_workers: c.num_workers,
            autotermination_minutes: c.autotermination_minutes,
        }
    }
}

async fn list_clusters(client: &WorkspaceClient) -> anyhow::Result<String> {
    let clusters = client
        .list_clusters()
        .await
        .map_err(|e| anyhow::anyhow!("Error listing clusters: {e}"))?;
    let summaries = clusters
        .iter()
        .map(ClusterSummary::from_info)
        .collect::<Vec<_>>();
    Ok(pretty(&summaries)?)
}

#[derive(Debug, Serialize)]
struct ClusterDetail {
    #[serde(flatten)]
    summary: ClusterSummary,
    spark_version: Option<String>,
    created_time: Option<i64>,
    creator_user_name: Option<String>,
}

async fn get_cluster(client: &WorkspaceClient, args: &Value) -> anyhow::Result<String> {
    let cluster_id = arg_str(args, "cluster_id")
        .ok_or_else(|| anyhow::anyhow!("Error getting cluster: missing cluster_id"))?;
    let c = client
        .get_cluster(cluster_id)
        .await
        .map_err(|e| anyhow::anyhow!("Error getting cluster: {e}"))?;
    let detail = ClusterDetail {
        summary: ClusterSummary::from_info(&c),
        spark_version: c.spark_version.clone(),
        created_time: c.start_time,
        creator_user_name: c.creator_user_name.clone(),
    };
    Ok(pretty(&detail)?)
}

#[derive(Debug, Serialize)]
struct JobSummary {
    job_id: Option<i64>,
    name: Option<String>,
    created_time: Option<i64>,
    creator_user_name: Option<String>,
    run_as_user_name: Option<String>,
    timeout_seconds: Option<i64>,
}

async fn list_jobs(client: &WorkspaceClient) -> anyhow::Result<String> {
    let jobs = client
        .list_jobs()
        .await
        .map_err(|e| anyhow::anyhow!("Error listing jobs: {e}"))?;
    let summaries = jobs
        .iter()
        .map(|j| JobSummary {
            job_id: j.job_id,
            name: j.settings.name.clone(),
            created_time: j.created_time,
            creator_user_name: j.creator_user_name.clone(),
            run_as_user_name: j.run_as_user_name.clone(),
            timeout_seconds: j.settings.timeout_seconds,
        })
        .collect::<Vec<_>>();
    Ok(pretty(&summaries)?)
}

async fn run_job(client: &WorkspaceClient, args: &Value) -> anyhow::Result<String> {
    let job_id = arg_i64(args, "job_id")
        .ok_or_else(|| anyhow::anyhow!("Error running job: missing or invalid job_id"))?;
    let parameters = args.get("parameters").cloned();
    let run = client
        .run_now(job_id, parameters)
        .await
        .map_err(|e| anyhow::anyhow!("Error running job: {e}"))?;
    Ok(format!(
        "Job run started successfully!\nRun ID: {}\nJob ID: {job_id}",
        run.run_id
    ))
}

#[derive(Debug, Serialize)]
struct RunSummary {
    run_id: Option<i64>,
    job_id: Option<i64>,
    run_name: Option<String>,
    life_cycle_state: Option<String>,
    result_state: Option<String>,
    start_time: Option<i64>,
    setup_duration: Option<i64>,
    execution_duration: Option<i64>,
    cleanup_duration: Option<i64>,
    run_duration: Option<i64>,
    creator_user_name: Option<String>,
}

async fn get_job_run(client: &WorkspaceClient, args: &Value) -> anyhow::Result<String> {
    let run_id = arg_i64(args, "run_id")
        .ok_or_else(|| anyhow::anyhow!("Error getting job run: missing or invalid run_id"))?;
    let run = client
        .get_run(run_id)
        .await
        .map_err(|e| anyhow::anyhow!("Error getting job run: {e}"))?;
    let summary = RunSummary {
        run_id: run.run_id,
        job_id: run.job_id,
        run_name: run.run_name.clone(),
        life_cycle_state: run.state.life_cycle_state.clone(),
        result_state: run.state.result_state.clone(),
        start_time: run.start_time,
        setup_duration: run.setup_duration,
        execution_duration: run.execution_duration,
        cleanup_duration: run.cleanup_duration,
        run_duration: run.run_duration,
        creator_user_name: run.creator_user_name.clone(),
    };
    Ok(pretty(&summary)?)
}

#[derive(Debug, Serialize)]
struct ObjectSummary {
    path: Option<String>,
    object_type: Option<String>,
    language: Option<String>,
    created_at: Option<i64>,
}

async fn list_workspace(client: &WorkspaceClient, args: &Value) -> anyhow::Result<String> {
    let path = arg_str(args, "path").unwrap_or("/");
    let objects = client
        .list_workspace(path)
        .await
        .map_err(|e| anyhow::anyhow!("Error listing workspace: {e}"))?;
    let summaries = objects
        .iter()
        .map(|o| ObjectSummary {
            path: o.path.clone(),
            object_type: o.object_type.clone(),
            language: o.language.clone(),
            created_at: o.created_at,
        })
        .collect::<Vec<_>>();
    Ok(pretty(&summaries)?)
}

fn pretty<T: Serialize>(value: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn arg_str<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key).and_then(|v| v.as_str())
}

// Job and run ids arrive as strings in the input schemas but the REST API
// wants integers; accept either representation.
fn arg_i64(args: &Value, key: &str) -> Option<i64> {
    let v = args.get(key)?;
    v.as_i64().or_else(|| v.as_str()?.trim().parse().ok())
}

pub fn catalog() -> Vec<Tool> {
    vec![
        Tool {
            name: TOOL_TEST_CONNECTION.to_string(),
            description: "Test connection to Databricks workspace".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        },
        Tool {
            name: TOOL_LIST_CLUSTERS.to_string(),
            description: "List all Databricks clusters".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        },
        Tool {
            name: TOOL_GET_CLUSTER.to_string(),
            description: "Get details of a specific cluster".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "cluster_id": {
                        "type": "string",
                        "description": "The cluster ID to get details for"
                    }
                },
                "required": ["cluster_id"]
            }),
        },
        Tool {
            name: TOOL_LIST_JOBS.to_string(),
            description: "List all Databricks jobs".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        },
        Tool {
            name: TOOL_RUN_JOB.to_string(),
            description: "Run a Databricks job".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "job_id": {
                        "type": "string",
                        "description": "The job ID to run"
                    },
                    "parameters": {
                        "type": "object",
                        "description": "Job parameters (optional)"
                    }
                },
                "required": ["job_id"]
            }),
        },
        Tool {
            name: TOOL_GET_JOB_RUN.to_string(),
            description: "Get details of a job run".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "run_id": {
                        "type": "string",
                        "description": "The run ID to get details for"
                    }
                },
                "required": ["run_id"]
            }),
        },
        Tool {
            name: TOOL_LIST_WORKSPACE.to_string(),
            description: "List workspace contents".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Workspace path to list (default: /)",
                        "default": "/"
                    }
                },
                "required": []
            }),
        },
    ]
}
