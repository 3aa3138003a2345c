use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("config not found: run 'agent-eval init'")]
    NotInitialized,

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("invalid name '{0}': must be lowercase alphanumeric with hyphens or underscores")]
    InvalidName(String),

    #[error("invalid scenario '{name}': {reason}")]
    InvalidScenario { name: String, reason: String },

    #[error("no evaluation domains configured")]
    NoDomains,

    #[error("content '{name}' not found in: {searched}")]
    ContentNotFound { name: String, searched: String },

    #[error("failed to write {}: {source}", .path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{phase} run failed: {source}")]
    Llm {
        phase: &'static str,
        #[source]
        source: llm_adapter::AdapterError,
    },

    #[error("{0}")]
    UnexpectedVerdict(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl EvalError {
    pub(crate) fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EvalError::Persistence {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, EvalError>;
