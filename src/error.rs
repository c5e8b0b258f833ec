//! Error taxonomy for the crate.
//!
//! [`MaquetteError`] is a `thiserror` enum with a small set of constructor
//! helpers so call sites can build validation, upstream, decode, not-found and
//! serde errors without naming variants. Anything that does not fit one of the
//! explicit categories is carried through the [`MaquetteError::Other`] variant
//! as an [`anyhow::Error`]. [`MaquetteResult`] is the crate-wide result alias.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type MaquetteResult<T> = Result<T, MaquetteError>;

/// The error type returned by fallible crate operations.
#[derive(Debug, Error)]
pub enum MaquetteError {
    /// Caller-supplied input failed validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// A third-party/upstream service call failed.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Raw bytes could not be decoded into the expected form.
    #[error("decode error: {0}")]
    Decode(String),

    /// A requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Serialization or deserialization failed.
    #[error("serde error: {0}")]
    Serde(String),

    /// Any other error, carried opaquely.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MaquetteError {
    /// Construct a [`MaquetteError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        MaquetteError::Validation(msg.into())
    }

    /// Construct a [`MaquetteError::Upstream`].
    pub fn upstream(msg: impl Into<String>) -> Self {
        MaquetteError::Upstream(msg.into())
    }

    /// Construct a [`MaquetteError::Decode`].
    pub fn decode(msg: impl Into<String>) -> Self {
        MaquetteError::Decode(msg.into())
    }

    /// Construct a [`MaquetteError::NotFound`].
    pub fn not_found(msg: impl Into<String>) -> Self {
        MaquetteError::NotFound(msg.into())
    }

    /// Construct a [`MaquetteError::Serde`].
    pub fn serde(msg: impl Into<String>) -> Self {
        MaquetteError::Serde(msg.into())
    }

    /// Boundary marker: is this a not-found error?
    pub fn is_not_found(&self) -> bool {
        matches!(self, MaquetteError::NotFound(_))
    }
}
