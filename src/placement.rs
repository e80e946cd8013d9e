//! Ambient Nomad task placement.
//!
//! When running as a Nomad task, the client agent exposes the task's identity
//! and a workload token through environment variables. [`PlacementContext`]
//! captures those values once so the store and path resolver can be driven
//! from an explicit value instead of process-wide state.

use std::path::PathBuf;

use secrecy::SecretString;

pub const ENV_NOMAD_TOKEN: &str = "NOMAD_TOKEN";
pub const ENV_NOMAD_SECRETS_DIR: &str = "NOMAD_SECRETS_DIR";
pub const ENV_NOMAD_JOB: &str = "NOMAD_JOB_NAME";
pub const ENV_NOMAD_GROUP: &str = "NOMAD_GROUP";
pub const ENV_NOMAD_TASK: &str = "NOMAD_TASK_NAME";

/// Identity of the Nomad task this process runs as.
///
/// Empty environment values are treated the same as unset ones.
#[derive(Debug, Clone, Default)]
pub struct PlacementContext {
    /// Workload token for the Nomad API.
    pub token: Option<SecretString>,
    /// The task's secrets directory.
    pub secrets_dir: Option<PathBuf>,
    pub job: String,
    pub group: String,
    pub task: String,
}

impl PlacementContext {
    /// Read the placement from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a placement from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());
        Self {
            token: non_empty(ENV_NOMAD_TOKEN).map(SecretString::from),
            secrets_dir: non_empty(ENV_NOMAD_SECRETS_DIR).map(PathBuf::from),
            job: lookup(ENV_NOMAD_JOB).unwrap_or_default(),
            group: lookup(ENV_NOMAD_GROUP).unwrap_or_default(),
            task: lookup(ENV_NOMAD_TASK).unwrap_or_default(),
        }
    }

    /// Placement of a task named `job/group/task`, with no token or secrets.
    pub fn task(
        job: impl Into<String>,
        group: impl Into<String>,
        task: impl Into<String>,
    ) -> Self {
        Self {
            job: job.into(),
            group: group.into(),
            task: task.into(),
            ..Self::default()
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.token = (!token.is_empty()).then(|| SecretString::from(token));
        self
    }

    pub fn with_secrets_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        self.secrets_dir = (!dir.as_os_str().is_empty()).then_some(dir);
        self
    }

    /// Whether this process looks like a Nomad task that can reach the
    /// Variables API: both a token and a secrets directory are present.
    pub fn is_nomad_task(&self) -> bool {
        self.token.is_some() && self.secrets_dir.is_some()
    }
}
