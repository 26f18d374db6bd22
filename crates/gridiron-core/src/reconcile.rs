// Upsert reconciliation: decide insert vs update per natural key, merge
// incoming fields without erasing stored data, and stage the result in a unit
// of work. One generic routine serves every entity type through the
// `Candidate` and `Record` descriptors.

use std::fmt;
use std::ops::AddAssign;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cancel::CancelFlag;
use crate::error::{BatchError, ReconcileError};
use crate::model::merge::Changes;
use crate::model::{EntityKind, NaturalKey, UpsertAction};
use crate::store::{Database, Record, UnitOfWork};

/// Incoming data for one entity.
pub trait Candidate: fmt::Debug {
    type Record: Record;

    /// Surrogate id carried by the caller; 0 when unknown.
    fn surrogate_id(&self) -> i64;

    /// Required-field and enumerated-value checks. Runs before any lookup.
    fn validate(&self) -> Result<(), ReconcileError>;

    fn natural_key(&self) -> Result<NaturalKey, ReconcileError>;

    /// Ids this candidate points at, which must already exist.
    fn references(&self) -> Vec<(EntityKind, i64)> {
        Vec::new()
    }

    /// Build a complete record for insertion.
    fn to_record(&self) -> Result<Self::Record, ReconcileError>;

    /// Merge provided fields into `existing`, returning what changed.
    fn merge_into(&self, existing: &mut Self::Record) -> Changes;
}

/// Which outcomes the caller permits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertPolicy {
    pub allow_insert: bool,
    pub allow_update: bool,
}

impl Default for UpsertPolicy {
    fn default() -> Self {
        Self {
            allow_insert: true,
            allow_update: true,
        }
    }
}

/// A reconciled entity as staged in the unit of work.
#[derive(Debug, Clone, Serialize)]
pub struct Staged<R> {
    pub record: R,
    pub action: UpsertAction,
    /// Fields an update changed; empty for inserts.
    pub changed: Changes,
}

/// Outcome counts for one upload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// Rows dropped before reconciliation (parse or translation errors).
    pub skipped: usize,
}

impl BatchSummary {
    pub fn from_staged<R>(staged: &[Staged<R>]) -> Self {
        let mut summary = Self::default();
        for item in staged {
            summary.record(item.action);
        }
        summary
    }

    pub fn record(&mut self, action: UpsertAction) {
        match action {
            UpsertAction::Insert => self.inserted += 1,
            UpsertAction::Update => self.updated += 1,
            UpsertAction::Unchanged => self.unchanged += 1,
        }
    }
}

impl AddAssign for BatchSummary {
    fn add_assign(&mut self, other: Self) {
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.unchanged += other.unchanged;
        self.skipped += other.skipped;
    }
}

/// Reconcile one candidate into the open unit of work. Nothing is committed.
pub fn upsert<C: Candidate>(
    uow: &mut UnitOfWork<'_>,
    candidate: &C,
    policy: UpsertPolicy,
) -> Result<Staged<C::Record>, ReconcileError> {
    candidate.validate()?;
    let key = candidate.natural_key()?;
    let candidate_id = candidate.surrogate_id();

    let (mut record, action, changed) = match uow.find_by_natural_key::<C::Record>(&key)? {
        None => {
            if !policy.allow_insert {
                return Err(ReconcileError::AlreadyExists { key });
            }
            if candidate_id != 0 {
                return Err(ReconcileError::NotFound {
                    kind: key.kind,
                    detail: format!("no row matches {key} for id {candidate_id}"),
                });
            }
            check_references(uow, candidate, &key)?;
            (candidate.to_record()?, UpsertAction::Insert, Changes::new())
        }
        Some(mut existing) => {
            let existing_id = existing.id();
            if !policy.allow_update || (candidate_id != 0 && candidate_id != existing_id) {
                return Err(ReconcileError::IdentityMismatch {
                    key,
                    existing_id,
                    candidate_id,
                });
            }
            check_references(uow, candidate, &key)?;
            let changed = candidate.merge_into(&mut existing);
            let action = if changed.is_empty() {
                UpsertAction::Unchanged
            } else {
                UpsertAction::Update
            };
            (existing, action, changed)
        }
    };

    uow.stage(&mut record, action)?;
    debug!("{key} -> {action:?} {changed:?}");
    Ok(Staged {
        record,
        action,
        changed,
    })
}

fn check_references<C: Candidate>(
    uow: &UnitOfWork<'_>,
    candidate: &C,
    key: &NaturalKey,
) -> Result<(), ReconcileError> {
    for (kind, id) in candidate.references() {
        if !uow.exists(kind, id)? {
            return Err(ReconcileError::NotFound {
                kind,
                detail: format!("id {id} referenced by {key}"),
            });
        }
    }
    Ok(())
}

/// Reconcile candidates in order inside an already-open unit of work,
/// stopping at the first failure. The caller owns commit and rollback.
pub fn stage_batch<C: Candidate>(
    uow: &mut UnitOfWork<'_>,
    candidates: &[C],
    policy: UpsertPolicy,
    cancel: &CancelFlag,
) -> Result<Vec<Staged<C::Record>>, BatchError> {
    let mut staged = Vec::with_capacity(candidates.len());
    for (index, candidate) in candidates.iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(BatchError {
                index,
                source: ReconcileError::Cancelled,
            });
        }
        let item = upsert(uow, candidate, policy).map_err(|source| BatchError { index, source })?;
        staged.push(item);
    }
    Ok(staged)
}

/// Reconcile a whole batch atomically: one unit of work, one commit. Any
/// failure or a cancellation observed before commit rolls everything back.
pub fn upsert_batch<C: Candidate>(
    db: &Database,
    candidates: &[C],
    policy: UpsertPolicy,
    cancel: &CancelFlag,
) -> Result<Vec<Staged<C::Record>>, BatchError> {
    let kind = <C::Record as Record>::KIND;
    let mut uow = db.begin().map_err(|e| BatchError {
        index: 0,
        source: e.into(),
    })?;

    let staged = match stage_batch(&mut uow, candidates, policy, cancel) {
        Ok(staged) => staged,
        Err(e) => {
            warn!("{kind} batch failed, rolling back: {e}");
            if let Err(rollback) = uow.rollback() {
                warn!("{rollback:#}");
            }
            return Err(e);
        }
    };

    if cancel.is_cancelled() {
        info!("{kind} batch cancelled before commit, rolling back");
        if let Err(rollback) = uow.rollback() {
            warn!("{rollback:#}");
        }
        return Err(BatchError {
            index: candidates.len(),
            source: ReconcileError::Cancelled,
        });
    }

    uow.commit().map_err(|e| BatchError {
        index: candidates.len(),
        source: e.into(),
    })?;

    let summary = BatchSummary::from_staged(&staged);
    info!(
        inserted = summary.inserted,
        updated = summary.updated,
        unchanged = summary.unchanged,
        "{kind} batch committed"
    );
    Ok(staged)
}
