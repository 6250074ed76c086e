//! Error type shared by every engine component.
//!
//! All variants are recoverable: an operation that returns an error leaves the
//! network exactly as it was before the call.

use crate::network::intersection::IntersectionId;

pub type Result<T> = std::result::Result<T, NetworkError>;

#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    /// A road or route refers to an intersection that is not in the store.
    #[error("intersection {0} is not part of the network")]
    UnknownEndpoint(IntersectionId),

    /// An operation targeted an intersection that does not exist.
    #[error("intersection {0} not found")]
    IntersectionNotFound(IntersectionId),

    /// An intersection id, intersection name or vehicle id is already taken.
    #[error("{0} already exists")]
    DuplicateEntity(String),

    #[error("road {from} -> {to} already exists")]
    DuplicateEdge {
        from: IntersectionId,
        to: IntersectionId,
    },

    #[error("road {from} -> {to} not found")]
    RoadNotFound {
        from: IntersectionId,
        to: IntersectionId,
    },

    #[error("vehicle {0} not found")]
    VehicleNotFound(u32),

    /// Only produced by callers that ask for a hard failure; plain queries
    /// report an unreachable destination as `None`.
    #[error("no open route from {from} to {to}")]
    NoPath {
        from: IntersectionId,
        to: IntersectionId,
    },

    #[error("malformed record on line {line}: {reason}")]
    MalformedRecord { line: u64, reason: String },

    #[error("internal inconsistency: {0}")]
    InternalInconsistency(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl NetworkError {
    /// `true` for the "destination unreachable" outcome, as opposed to a
    /// lookup failure.
    pub fn is_no_path(&self) -> bool {
        matches!(self, NetworkError::NoPath { .. })
    }
}

impl From<csv::Error> for NetworkError {
    fn from(err: csv::Error) -> Self {
        let line = err.position().map(|pos| pos.line()).unwrap_or(0);
        match err.into_kind() {
            csv::ErrorKind::Io(io) => NetworkError::Io(io),
            other => NetworkError::MalformedRecord {
                line,
                reason: format!("{:?}", other),
            },
        }
    }
}

impl From<serde_json::Error> for NetworkError {
    fn from(err: serde_json::Error) -> Self {
        NetworkError::InvalidConfig(err.to_string())
    }
}
