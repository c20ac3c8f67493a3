//! Error taxonomy shared by every core component.

use thiserror::Error;

/// Errors produced by the simulation core.
///
/// `NotFound` deliberately does not appear here: lookups against stored
/// entities belong to the persistence collaborator, not this crate.
#[derive(Debug, Error)]
pub enum SimError {
    /// Malformed or missing required input (empty identifiers, non-positive
    /// quantities or amounts, inverted date ranges).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation not permitted in the entity's current state (e.g. modifying
    /// a filled order).
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Order type the execution simulator does not resolve.
    #[error("unsupported order type: {0}")]
    UnsupportedOrderType(String),
}

pub type SimResult<T> = Result<T, SimError>;
