use crate::release::ReleaseError;

/// Process exit code for an invalid harness definition.
pub const EXIT_INVALID: u8 = 2;
/// Process exit code when a chart cannot be resolved or loaded.
pub const EXIT_RESOLUTION: u8 = 3;
/// Process exit code when the cluster or package manager rejects a change.
pub const EXIT_TRANSACTION: u8 = 4;

/// Errors produced by the provisioning workflows.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Installing a chart release failed.
    #[error("Release error: {source}")]
    Release {
        /// Underlying release failure.
        #[from]
        source: ReleaseError,
    },
    /// The cluster rejected the creation of an object.
    #[error("failed to create {kind} {namespace}/{name}: {source}")]
    Create {
        /// Kind of the rejected object.
        kind: String,
        /// Namespace the object was created in.
        namespace: String,
        /// Name of the rejected object.
        name: String,
        /// Error returned by the API server.
        source: kube::Error,
    },
    /// Any other Kubernetes client failure, e.g. while loading the kubeconfig.
    #[error("Kube error: {source}")]
    Kube {
        /// Underlying client error.
        #[from]
        source: kube::Error,
    },
    /// The kubeconfig could not be read for the requested context.
    #[error("Kubeconfig error: {source}")]
    Kubeconfig {
        /// Underlying kubeconfig failure.
        #[from]
        source: kube::config::KubeconfigError,
    },
    /// The harness objects do not describe a consistent deployment.
    #[error("invalid harness: {0}")]
    InvalidHarness(String),
}

impl Error {
    /// Map the error kind onto the process exit code.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::InvalidHarness(_) => EXIT_INVALID,
            Error::Release { source } if source.is_resolution() => EXIT_RESOLUTION,
            Error::Release { .. }
            | Error::Create { .. }
            | Error::Kube { .. }
            | Error::Kubeconfig { .. } => EXIT_TRANSACTION,
        }
    }
}
