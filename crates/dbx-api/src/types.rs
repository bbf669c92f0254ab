//! Response models for the Databricks REST endpoints this workspace uses.
//!
//! Only the fields the MCP tools project are modeled; everything else in the
//! REST payloads is ignored on deserialize.

use serde::Deserialize;

/// `GET /api/2.0/preview/scim/v2/Me` (SCIM, hence camelCase).
#[derive(Debug, Clone, Deserialize)]
pub struct CurrentUser {
    #[serde(rename = "userName")]
    pub user_name: String,
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClusterInfo {
    pub cluster_id: Option<String>,
    pub cluster_name: Option<String>,
    pub state: Option<String>,
    pub driver_node_type_id: Option<String>,
    pub node_type_id: Option<String>,
    pub num_workers: Option<i64>,
    pub autotermination_minutes: Option<i64>,
    pub spark_version: Option<String>,
    pub start_time: Option<i64>,
    pub creator_user_name: Option<String>,
}

/// `GET /api/2.0/clusters/list`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ClusterList {
    #[serde(default)]
    pub clusters: Vec<ClusterInfo>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct JobSettings {
    pub name: Option<String>,
    pub timeout_seconds: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Job {
    pub job_id: Option<i64>,
    pub created_time: Option<i64>,
    pub creator_user_name: Option<String>,
    pub run_as_user_name: Option<String>,
    #[serde(default)]
    pub settings: JobSettings,
}

/// `GET /api/2.1/jobs/list`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct JobList {
    #[serde(default)]
    pub jobs: Vec<Job>,
}

/// `POST /api/2.1/jobs/run-now`.
#[derive(Debug, Clone, Deserialize)]
pub struct RunNowResponse {
    pub run_id: i64,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RunState {
    pub life_cycle_state: Option<String>,
    pub result_state: Option<String>,
}

/// `GET /api/2.1/jobs/runs/get`.
#[derive(Debug, Clone, Deserialize)]
pub struct Run {
    pub run_id: Option<i64>,
    pub job_id: Option<i64>,
    pub run_name: Option<String>,
    #[serde(default)]
    pub state: RunState,
    pub start_time: Option<i64>,
    pub setup_duration: Option<i64>,
    pub execution_duration: Option<i64>,
    pub cleanup_duration: Option<i64>,
    pub run_duration: Option<i64>,
    pub creator_user_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObjectInfo {
    pub path: Option<String>,
    pub object_type: Option<String>,
    pub language: Option<String>,
    pub created_at: Option<i64>,
}

/// `GET /api/2.0/workspace/list`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct WorkspaceObjectList {
    #[serde(default)]
    pub objects: Vec<ObjectInfo>,
}

/// Error body Databricks returns on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub error_code: Option<String>,
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cluster_list_decodes_captured_payload() {
        let body = r#"{
            "clusters": [
                {
                    "cluster_id": "0923-164208-meows279",
                    "cluster_name": "analytics",
                    "state": "RUNNING",
                    "driver_node_type_id": "i3.xlarge",
                    "node_type_id": "i3.xlarge",
                    "num_workers": 4,
                    "autotermination_minutes": 60,
                    "spark_version": "13.3.x-scala2.12",
                    "start_time": 1695487328000,
                    "creator_user_name": "someone@example.com",
                    "default_tags": {"Vendor": "Databricks"}
                }
            ]
        }"#;
        let list: ClusterList = serde_json::from_str(body).expect("decode");
        assert_eq!(list.clusters.len(), 1);
        let c = &list.clusters[0];
        assert_eq!(c.cluster_id.as_deref(), Some("0923-164208-meows279"));
        assert_eq!(c.state.as_deref(), Some("RUNNING"));
        assert_eq!(c.num_workers, Some(4));
    }

    #[test]
    fn empty_cluster_list_decodes() {
        let list: ClusterList = serde_json::from_str("{}").expect("decode");
        assert!(list.clusters.is_empty());
    }

    #[test]
    fn job_list_tolerates_missing_settings() {
        let body = r#"{"jobs": [{"job_id": 42, "created_time": 1700000000000}], "has_more": false}"#;
        let list: JobList = serde_json::from_str(body).expect("decode");
        assert_eq!(list.jobs[0].job_id, Some(42));
        assert!(list.jobs[0].settings.name.is_none());
    }

    #[test]
    fn run_decodes_without_result_state() {
        let body = r#"{
            "run_id": 7,
            "job_id": 42,
            "run_name": "nightly",
            "state": {"life_cycle_state": "RUNNING"},
            "start_time": 1700000000000,
            "creator_user_name": "someone@example.com"
        }"#;
        let run: Run = serde_json::from_str(body).expect("decode");
        assert_eq!(run.state.life_cycle_state.as_deref(), Some("RUNNING"));
        assert!(run.state.result_state.is_none());
    }

    #[test]
    fn scim_me_uses_camel_case() {
        let me: CurrentUser =
            serde_json::from_str(r#"{"userName": "someone@example.com", "active": true}"#)
                .expect("decode");
        assert_eq!(me.user_name, "someone@example.com");
    }
}
