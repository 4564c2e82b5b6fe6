use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to commit namespace {namespace:?}")]
    NamespaceCommit {
        namespace: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("navigation to {target} did not settle")]
    Navigation {
        target: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to load permission paths")]
    Permissions(#[source] anyhow::Error),
    #[error("no MFA challenge is pending")]
    MfaNotPending,
    #[error("invalid auth response")]
    InvalidResponse(#[from] serde_json::Error),
}
