use thiserror::Error;

pub const ENV_DATABRICKS_HOST: &str = "DATABRICKS_HOST";
pub const ENV_DATABRICKS_TOKEN: &str = "DATABRICKS_TOKEN";
pub const ENV_DATABRICKS_WORKSPACE_ID: &str = "DATABRICKS_WORKSPACE_ID";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("DATABRICKS_HOST and DATABRICKS_TOKEN environment variables are required")]
    MissingCredentials,
}

/// Connection settings for one Databricks workspace.
///
/// Resolved once per process; never re-read afterwards. The workspace id is
/// accepted for completeness but no current endpoint needs it.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub host: String,
    pub token: String,
    pub workspace_id: Option<String>,
}

impl ConnectionConfig {
    pub fn new(
        host: Option<String>,
        token: Option<String>,
        workspace_id: Option<String>,
    ) -> Result<Self, ConfigError> {
        let host = host.filter(|s| !s.trim().is_empty());
        let token = token.filter(|s| !s.trim().is_empty());
        match (host, token) {
            (Some(host), Some(token)) => Ok(Self {
                host,
                token,
                workspace_id,
            }),
            _ => Err(ConfigError::MissingCredentials),
        }
    }

    /// Load from the `DATABRICKS_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(
            std::env::var(ENV_DATABRICKS_HOST).ok(),
            std::env::var(ENV_DATABRICKS_TOKEN).ok(),
            std::env::var(ENV_DATABRICKS_WORKSPACE_ID).ok(),
        )
    }
}
