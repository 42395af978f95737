//! Error types for co-signer operations.
//!
//! One enum per failure class of the decision pipeline, all derived with
//! `thiserror`. `CosignerError` folds them together so the decision engine can
//! use `?` internally and convert the whole chain into a `Failed` outcome at its
//! public boundary.

use thiserror::Error;

/// The reasoning oracle could not produce a verdict.
#[derive(Debug, Error)]
pub enum AdjudicationError {
    #[error("reasoning oracle timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("reasoning oracle call failed: {0}")]
    Oracle(String),
    #[error("reasoning oracle returned an empty response")]
    EmptyResponse,
}

/// The signature provider rejected its inputs.
#[derive(Debug, Error, PartialEq)]
pub enum SigningError {
    #[error("malformed credential: {0}")]
    MalformedCredential(String),
    #[error("payload is missing required field `{0}`")]
    MissingField(&'static str),
    #[error("payload field `{field}` is invalid: {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("signing failed: {0}")]
    Signer(String),
}

/// Raw failure of a coordination-service call.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransportError {
    /// The service has no resource at the requested path.
    #[error("resource not found")]
    NotFound,
    /// The signer's confirmation is already on record for this proposal.
    #[error("confirmation already recorded for {0}")]
    AlreadyConfirmed(String),
    #[error("service responded with status {code}: {body}")]
    Status { code: u16, body: String },
    #[error("http error: {0}")]
    Http(String),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            TransportError::Decode(err.to_string())
        } else {
            TransportError::Http(err.to_string())
        }
    }
}

/// The coordination service could not be read from or refused a confirmation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfirmationError {
    #[error("failed to list pending transactions for {wallet}: {source}")]
    Lookup { wallet: String, source: TransportError },
    #[error("failed to read threshold for {wallet}: {source}")]
    Threshold { wallet: String, source: TransportError },
    #[error("confirmation of {tx_hash} rejected: {source}")]
    Rejected { tx_hash: String, source: TransportError },
}

/// On-chain submission or finalization failed.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExecutionError {
    #[error("transaction {tx_hash} cannot be executed: {reason}")]
    NotExecutable { tx_hash: String, reason: String },
    #[error("submission failed: {0}")]
    Submission(String),
    #[error("transaction {0} was dropped before finalization")]
    Dropped(String),
    #[error("transaction {0} reverted on-chain")]
    Reverted(String),
}

/// Invalid process configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    Missing(&'static str),
    #[error("environment variable {name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Top-level error for the co-signer.
#[derive(Debug, Error)]
pub enum CosignerError {
    #[error(transparent)]
    Adjudication(#[from] AdjudicationError),
    #[error(transparent)]
    Signing(#[from] SigningError),
    #[error(transparent)]
    Confirmation(#[from] ConfirmationError),
    #[error(transparent)]
    Execution(#[from] ExecutionError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Result type alias for co-signer operations.
pub type Result<T> = core::result::Result<T, CosignerError>;
