use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::config::ConnectionConfig;
use crate::types::{
    ApiErrorBody, ClusterInfo, ClusterList, CurrentUser, Job, JobList, ObjectInfo, Run,
    RunNowResponse, WorkspaceObjectList,
};

const PATH_SCIM_ME: &str = "/api/2.0/preview/scim/v2/Me";
const PATH_CLUSTERS_LIST: &str = "/api/2.0/clusters/list";
const PATH_CLUSTERS_GET: &str = "/api/2.0/clusters/get";
const PATH_JOBS_LIST: &str = "/api/2.1/jobs/list";
const PATH_JOBS_RUN_NOW: &str = "/api/2.1/jobs/run-now";
const PATH_RUNS_GET: &str = "/api/2.1/jobs/runs/get";
const PATH_WORKSPACE_LIST: &str = "/api/2.0/workspace/list";

#[derive(Debug, Error)]
pub enum DatabricksClientError {
    #[error("invalid host url: {0}")]
    Url(#[from] url::ParseError),
    #[error("http error: {0}")]
    Http(String),
    #[error("databricks api error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("decode error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Synchronous-in-spirit client for the Databricks workspace REST API.
///
/// One instance per process; callers share it behind an `Arc`. All calls are
/// single-shot, no retries.
#[derive(Debug, Clone)]
pub struct WorkspaceClient {
    http: reqwest::Client,
    base: Url,
    token: String,
}

impl WorkspaceClient {
    pub fn new(config: &ConnectionConfig) -> Result<Self, DatabricksClientError> {
        let base = Url::parse(config.host.trim_end_matches('/'))?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| DatabricksClientError::Http(e.to_string()))?;
        Ok(Self {
            http,
            base,
            token: config.token.clone(),
        })
    }

    pub fn host(&self) -> &str {
        self.base.as_str().trim_end_matches('/')
    }

    pub async fn current_user(&self) -> Result<CurrentUser, DatabricksClientError> {
        self.get_json(PATH_SCIM_ME, &[]).await
    }

    pub async fn list_clusters(&self) -> Result<Vec<ClusterInfo>, DatabricksClientError> {
        let list: ClusterList = self.get_json(PATH_CLUSTERS_LIST, &[]).await?;
        Ok(list.clusters)
    }

    pub async fn get_cluster(
        &self,
        cluster_id: &str,
    ) -> Result<ClusterInfo, DatabricksClientError> {
        self.get_json(PATH_CLUSTERS_GET, &[("cluster_id", cluster_id)])
            .await
    }

    pub async fn list_jobs(&self) -> Result<Vec<Job>, DatabricksClientError> {
        let list: JobList = self.get_json(PATH_JOBS_LIST, &[]).await?;
        Ok(list.jobs)
    }

    pub async fn run_now(
        &self,
        job_id: i64,
        notebook_params: Option<Value>,
    ) -> Result<RunNowResponse, DatabricksClientError> {
        let body = serde_json::json!({
            "job_id": job_id,
            "notebook_params": notebook_params.unwrap_or_else(|| serde_json::json!({})),
        });
        self.post_json(PATH_JOBS_RUN_NOW, &body).await
    }

    pub async fn get_run(&self, run_id: i64) -> Result<Run, DatabricksClientError> {
        self.get_json(PATH_RUNS_GET, &[("run_id", &run_id.to_string())])
            .await
    }

    pub async fn list_workspace(
        &self,
        path: &str,
    ) -> Result<Vec<ObjectInfo>, DatabricksClientError> {
        let list: WorkspaceObjectList =
            self.get_json(PATH_WORKSPACE_LIST, &[("path", path)]).await?;
        Ok(list.objects)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, DatabricksClientError> {
        let url = self.endpoint(path)?;
        let resp = self
            .http
            .get(url)
            .query(query)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| DatabricksClientError::Http(e.to_string()))?;
        Self::decode(path, resp).await
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &Value,
    ) -> Result<T, DatabricksClientError> {
        let url = self.endpoint(path)?;
        let resp = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await
            .map_err(|e| DatabricksClientError::Http(e.to_string()))?;
        Self::decode(path, resp).await
    }

    fn endpoint(&self, path: &str) -> Result<Url, DatabricksClientError> {
        Ok(self.base.join(path)?)
    }

    async fn decode<T: DeserializeOwned>(
        path: &str,
        resp: reqwest::Response,
    ) -> Result<T, DatabricksClientError> {
        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| DatabricksClientError::Http(e.to_string()))?;
        debug!(path, status = status.as_u16(), "databricks api response");

        if !status.is_success() {
            if let Ok(err) = serde_json::from_slice::<ApiErrorBody>(&bytes) {
                let message = match (err.error_code, err.message) {
                    (Some(code), Some(msg)) => format!("{code}: {msg}"),
                    (_, Some(msg)) => msg,
                    (Some(code), None) => code,
                    _ => String::from_utf8_lossy(&bytes).to_string(),
                };
                return Err(DatabricksClientError::Api {
                    status: status.as_u16(),
                    message,
                });
            }
            return Err(DatabricksClientError::Api {
                status: status.as_u16(),
                message: String::from_utf8_lossy(&bytes).to_string(),
            });
        }

        Ok(serde_json::from_slice(&bytes)?)
    }
}
