// Error types for persistence and replica sync.
//
// Formation failures are not errors in this sense: they are ordinary values
// (`formation::FormationFailure`) retried every tick. The enums here cover
// the two places where outside data enters the sim: persisted JSON and
// received deltas.

use multiblock_protocol::DecodeError;
use thiserror::Error;

/// Errors loading or saving persisted state.
#[derive(Debug, Error)]
pub enum PersistError {
    /// The JSON itself, or a field inside it, failed to (de)serialize.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A known field is present with the wrong JSON type.
    #[error("field {field} has the wrong type")]
    InvalidField { field: &'static str },

    /// An identity key field is empty or too long.
    #[error("field {0} is not a valid identity key")]
    InvalidIdentity(&'static str),

    /// The structure kind's snapshot did not serialize to a JSON object, so
    /// it cannot be flattened into cell storage.
    #[error("snapshot does not serialize to a JSON object")]
    SnapshotNotObject,

    /// The saved voxel grid's storage does not match its declared size.
    #[error("voxel grid storage does not match its declared size")]
    MalformedWorld,
}

/// Errors applying a sync delta on the replica side.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SyncError {
    #[error("malformed delta: {0}")]
    Wire(#[from] DecodeError),

    /// The delta announced an identity key but sent an empty string.
    #[error("delta carries an empty identity key")]
    EmptyIdentity,
}
