// Reconciliation error taxonomy shared by the model and the reconciler.

use thiserror::Error;

use crate::model::{EntityKind, NaturalKey};

/// Failures that abort a reconciliation batch.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Insert was classified but inserting is disallowed by the caller.
    #[error("inserting {key} is not allowed")]
    AlreadyExists { key: NaturalKey },

    /// Update was classified but updating is disallowed, or the candidate's
    /// surrogate id disagrees with the matched row.
    #[error("{key} matched row {existing_id} but the update was rejected (candidate id {candidate_id})")]
    IdentityMismatch {
        key: NaturalKey,
        existing_id: i64,
        candidate_id: i64,
    },

    #[error("{kind} not found: {detail}")]
    NotFound { kind: EntityKind, detail: String },

    #[error("{kind} field `{field}` is required")]
    MissingRequiredField {
        kind: EntityKind,
        field: &'static str,
    },

    #[error("'{value}' is not a valid {kind} {field}")]
    InvalidEnumValue {
        kind: EntityKind,
        field: &'static str,
        value: String,
    },

    #[error("{value} is out of range for {kind} field `{field}`")]
    OutOfRange {
        kind: EntityKind,
        field: &'static str,
        value: i64,
    },

    /// A field derived from others was supplied with a different value.
    #[error("{kind} field `{field}` is '{found}' but must be '{expected}'")]
    InconsistentField {
        kind: EntityKind,
        field: &'static str,
        expected: String,
        found: String,
    },

    #[error("reconciliation cancelled")]
    Cancelled,

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// A reconciliation failure at a specific position in a batch.
#[derive(Debug, Error)]
#[error("batch item {index}: {source}")]
pub struct BatchError {
    /// Zero-based index of the failing candidate, or the batch length when
    /// the failure happened at commit.
    pub index: usize,
    #[source]
    pub source: ReconcileError,
}
