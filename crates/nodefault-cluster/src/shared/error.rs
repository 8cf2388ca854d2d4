use thiserror::Error;

/// Errors raised while talking to the cluster API
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("Kubernetes API error: {0}")]
    Kube(String),
    #[error("Storage error: {0}")]
    StorageError(String),
}

impl From<kube::Error> for ClusterError {
    fn from(err: kube::Error) -> Self {
        ClusterError::Kube(err.to_string())
    }
}

impl From<ClusterError> for nodefault_core::CoreError {
    fn from(err: ClusterError) -> Self {
        nodefault_core::CoreError::Transport(err.to_string())
    }
}

pub type ClusterResult<T> = std::result::Result<T, ClusterError>;
