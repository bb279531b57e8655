use kube::Error as KubeError;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum ReconcileError {
    #[error("Resource has no namespace.")]
    Namespace,
    #[error("Failed to list functions: {0}")]
    ListFunctions(#[source] KubeError),
    #[error("Failed to sync function {name}: {error}")]
    SyncFunction {
        name: String,
        #[source]
        error: KubeError,
    },
}
