// Explicit write transaction: begin, stage any number of records, then commit
// or roll back. Dropping an open unit of work rolls it back.

use std::sync::MutexGuard;

use anyhow::{ensure, Context, Result};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use tracing::{debug, warn};

use crate::model::{EntityKind, NaturalKey, UpsertAction};

use super::record::{select_list, Record};

pub struct UnitOfWork<'db> {
    conn: MutexGuard<'db, Connection>,
    staged: usize,
    open: bool,
}

impl<'db> UnitOfWork<'db> {
    /// `BEGIN IMMEDIATE` takes the write lock up front, so two uploads never
    /// interleave their natural-key lookups and inserts.
    pub(crate) fn begin(conn: MutexGuard<'db, Connection>) -> Result<Self> {
        conn.execute_batch("BEGIN IMMEDIATE")
            .context("failed to begin unit of work")?;
        debug!("unit of work opened");
        Ok(Self {
            conn,
            staged: 0,
            open: true,
        })
    }

    /// Find the stored row whose natural-key columns equal `key`. Rows staged
    /// earlier in this unit of work are visible.
    pub fn find_by_natural_key<R: Record>(&self, key: &NaturalKey) -> Result<Option<R>> {
        ensure!(
            key.kind == R::KIND && key.parts.len() == R::KEY_COLUMNS.len(),
            "natural key {key} does not fit {}",
            R::KIND
        );
        let predicate = R::KEY_COLUMNS
            .iter()
            .enumerate()
            .map(|(i, col)| format!("{col} = ?{}", i + 1))
            .collect::<Vec<_>>()
            .join(" AND ");
        let sql = format!(
            "SELECT {} FROM {} WHERE {predicate} ORDER BY id LIMIT 1",
            select_list::<R>(None),
            R::KIND.table()
        );
        let mut stmt = self
            .conn
            .prepare_cached(&sql)
            .with_context(|| format!("failed to prepare {} lookup", R::KIND))?;
        stmt.query_row(params_from_iter(key.parts.iter().map(Value::from)), R::from_row)
            .optional()
            .with_context(|| format!("failed to look up {key}"))
    }

    /// Whether a row with surrogate id `id` exists.
    pub fn exists(&self, kind: EntityKind, id: i64) -> Result<bool> {
        let sql = format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1)", kind.table());
        let mut stmt = self
            .conn
            .prepare_cached(&sql)
            .with_context(|| format!("failed to prepare {kind} existence check"))?;
        stmt.query_row([id], |row| row.get(0))
            .with_context(|| format!("failed to check {kind} {id}"))
    }

    /// Write `record` according to `action`. Inserts receive their surrogate
    /// id here; `Unchanged` issues no statement.
    pub fn stage<R: Record>(&mut self, record: &mut R, action: UpsertAction) -> Result<()> {
        match action {
            UpsertAction::Insert => {
                let placeholders = (1..=R::COLUMNS.len())
                    .map(|i| format!("?{i}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                let sql = format!(
                    "INSERT INTO {} ({}) VALUES ({placeholders})",
                    R::KIND.table(),
                    R::COLUMNS.join(", ")
                );
                self.conn
                    .prepare_cached(&sql)
                    .and_then(|mut stmt| stmt.execute(params_from_iter(record.values())))
                    .with_context(|| format!("failed to insert {}", R::KIND))?;
                record.set_id(self.conn.last_insert_rowid());
            }
            UpsertAction::Update => {
                let assignments = R::COLUMNS
                    .iter()
                    .enumerate()
                    .map(|(i, col)| format!("{col} = ?{}", i + 1))
                    .collect::<Vec<_>>()
                    .join(", ");
                let sql = format!(
                    "UPDATE {} SET {assignments} WHERE id = ?{}",
                    R::KIND.table(),
                    R::COLUMNS.len() + 1
                );
                let mut values = record.values();
                values.push(Value::Integer(record.id()));
                let updated = self
                    .conn
                    .prepare_cached(&sql)
                    .and_then(|mut stmt| stmt.execute(params_from_iter(values)))
                    .with_context(|| format!("failed to update {} {}", R::KIND, record.id()))?;
                ensure!(updated == 1, "{} {} vanished before update", R::KIND, record.id());
            }
            UpsertAction::Unchanged => return Ok(()),
        }
        self.staged += 1;
        let kind = R::KIND;
        debug!(%kind, id = record.id(), ?action, "staged");
        Ok(())
    }

    /// Number of writes staged so far.
    pub fn staged(&self) -> usize {
        self.staged
    }

    pub fn commit(mut self) -> Result<()> {
        self.conn
            .execute_batch("COMMIT")
            .context("failed to commit unit of work")?;
        self.open = false;
        debug!(staged = self.staged, "unit of work committed");
        Ok(())
    }

    pub fn rollback(mut self) -> Result<()> {
        self.open = false;
        self.conn
            .execute_batch("ROLLBACK")
            .context("failed to roll back unit of work")?;
        debug!(staged = self.staged, "unit of work rolled back");
        Ok(())
    }
}

impl Drop for UnitOfWork<'_> {
    fn drop(&mut self) {
        if self.open {
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                warn!("failed to roll back abandoned unit of work: {e}");
            } else {
                debug!(staged = self.staged, "abandoned unit of work rolled back");
            }
        }
    }
}
