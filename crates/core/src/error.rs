use thiserror::Error;

/// Failure taxonomy shared by the ingestion pipeline and the registration
/// workflow. The api crate maps each variant to an HTTP status.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Malformed input: bad post URL, channel name not extractable.
    #[error("{0}")]
    Validation(String),
    /// Unknown channel or subscription.
    #[error("{0}")]
    NotFound(String),
    /// Duplicate active subscription or duplicate channel.
    #[error("{0}")]
    Conflict(String),
    /// The automation collaborator failed while provisioning or strictly
    /// deprovisioning agents. Compensating cleanup already ran.
    #[error("provisioning failed: {0}")]
    Provisioning(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type RelayResult<T> = Result<T, RelayError>;
