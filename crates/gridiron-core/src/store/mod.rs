// SQLite persistence layer for season data.

mod record;
mod unit_of_work;

pub use record::Record;
pub use unit_of_work::UnitOfWork;

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Params};

use crate::model::{Conference, Division, EntityKind, Game, Season, Team, User, UserType};
use record::select_list;

/// SQLite-backed store for seasons, conferences, divisions, teams, games and
/// users.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral in-memory database (useful
    /// for tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS seasons (
                id                   INTEGER PRIMARY KEY AUTOINCREMENT,
                name                 TEXT NOT NULL,
                year                 INTEGER NOT NULL,
                regular_season_weeks INTEGER NOT NULL,
                playoff_teams        INTEGER NOT NULL DEFAULT 0,
                UNIQUE(year, name)
            );

            CREATE TABLE IF NOT EXISTS conferences (
                id   INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS divisions (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                name          TEXT NOT NULL,
                conference_id INTEGER NOT NULL REFERENCES conferences(id),
                season_id     INTEGER NOT NULL REFERENCES seasons(id),
                UNIQUE(season_id, conference_id, name)
            );

            CREATE TABLE IF NOT EXISTS teams (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                location    TEXT NOT NULL,
                name        TEXT NOT NULL,
                full_name   TEXT NOT NULL,
                division_id INTEGER NOT NULL REFERENCES divisions(id),
                UNIQUE(division_id, full_name)
            );

            CREATE TABLE IF NOT EXISTS users (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                first_name TEXT,
                last_name  TEXT,
                name       TEXT NOT NULL,
                user_type  TEXT NOT NULL
                           CHECK (user_type IN ('actual', 'season-long', 'playoff-pool', 'bet')),
                money      REAL,
                UNIQUE(name, user_type)
            );

            CREATE TABLE IF NOT EXISTS games (
                id               INTEGER PRIMARY KEY AUTOINCREMENT,
                season_id        INTEGER NOT NULL REFERENCES seasons(id),
                week             INTEGER NOT NULL,
                user_id          INTEGER NOT NULL REFERENCES users(id),
                start_time       TEXT NOT NULL,
                spread           REAL,
                away_spread_odds INTEGER,
                home_spread_odds INTEGER,
                away_money_line  INTEGER,
                home_money_line  INTEGER,
                over_under       REAL,
                over_odds        INTEGER,
                under_odds       INTEGER,
                is_playoffs      INTEGER NOT NULL DEFAULT 0,
                was_overtime     INTEGER NOT NULL DEFAULT 0,
                bet              INTEGER,
                away_team_id     INTEGER NOT NULL REFERENCES teams(id),
                away_team_score  INTEGER NOT NULL DEFAULT 0,
                home_team_id     INTEGER NOT NULL REFERENCES teams(id),
                home_team_score  INTEGER NOT NULL DEFAULT 0,
                UNIQUE(season_id, week, user_id, away_team_id)
            );

            CREATE INDEX IF NOT EXISTS idx_divisions_season_id ON divisions(season_id);
            CREATE INDEX IF NOT EXISTS idx_games_season_id ON games(season_id);
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Override the busy timeout set by [`Database::open`].
    pub fn with_busy_timeout(self, millis: u64) -> Result<Self> {
        self.conn()
            .busy_timeout(Duration::from_millis(millis))
            .context("failed to set busy timeout")?;
        Ok(self)
    }

    /// Acquire the connection lock.
    ///
    /// # Panics
    ///
    /// Panics if the mutex is poisoned (a thread panicked while holding it).
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    /// Open a write transaction.
    ///
    /// The unit of work holds the connection until it is committed, rolled
    /// back or dropped; context queries on `self` must happen before this
    /// call or after the unit of work is finished.
    pub fn begin(&self) -> Result<UnitOfWork<'_>> {
        UnitOfWork::begin(self.conn())
    }

    // -----------------------------------------------------------------------
    // Context queries
    // -----------------------------------------------------------------------

    fn select<R: Record, P: Params>(&self, alias: &str, tail: &str, params: P) -> Result<Vec<R>> {
        let sql = format!(
            "SELECT {} FROM {} {alias} {tail}",
            select_list::<R>(Some(alias)),
            R::KIND.table()
        );
        let conn = self.conn();
        let mut stmt = conn
            .prepare(&sql)
            .with_context(|| format!("failed to prepare {} query", R::KIND))?;
        let rows = stmt
            .query_map(params, R::from_row)
            .with_context(|| format!("failed to query {}", R::KIND.table()))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .with_context(|| format!("failed to read {} rows", R::KIND))?;
        Ok(rows)
    }

    fn select_one<R: Record, P: Params>(&self, alias: &str, tail: &str, params: P) -> Result<Option<R>> {
        let sql = format!(
            "SELECT {} FROM {} {alias} {tail} LIMIT 1",
            select_list::<R>(Some(alias)),
            R::KIND.table()
        );
        self.conn()
            .query_row(&sql, params, R::from_row)
            .optional()
            .with_context(|| format!("failed to query {}", R::KIND))
    }

    /// The first season registered for `year`.
    pub fn season_by_year(&self, year: i32) -> Result<Option<Season>> {
        self.select_one("s", "WHERE s.year = ?1 ORDER BY s.id", params![year])
    }

    pub fn conferences(&self) -> Result<Vec<Conference>> {
        self.select("c", "ORDER BY c.id", [])
    }

    pub fn divisions_for_season(&self, season_id: i64) -> Result<Vec<Division>> {
        self.select("d", "WHERE d.season_id = ?1 ORDER BY d.id", params![season_id])
    }

    /// Every team in a division of the given season.
    pub fn teams_for_season(&self, season_id: i64) -> Result<Vec<Team>> {
        self.select(
            "t",
            "JOIN divisions d ON d.id = t.division_id WHERE d.season_id = ?1 ORDER BY t.id",
            params![season_id],
        )
    }

    pub fn team_by_full_name(&self, season_id: i64, full_name: &str) -> Result<Option<Team>> {
        self.select_one(
            "t",
            "JOIN divisions d ON d.id = t.division_id
             WHERE d.season_id = ?1 AND t.full_name = ?2 ORDER BY t.id",
            params![season_id, full_name],
        )
    }

    pub fn user_by_name(&self, name: &str, user_type: UserType) -> Result<Option<User>> {
        self.select_one(
            "u",
            "WHERE u.name = ?1 AND u.user_type = ?2",
            params![name, user_type.as_str()],
        )
    }

    pub fn games_for_season(&self, season_id: i64) -> Result<Vec<Game>> {
        self.select(
            "g",
            "WHERE g.season_id = ?1 ORDER BY g.week, g.start_time, g.id",
            params![season_id],
        )
    }

    /// Number of stored rows of one kind.
    pub fn count(&self, kind: EntityKind) -> Result<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", kind.table());
        let n: i64 = self
            .conn()
            .query_row(&sql, [], |row| row.get(0))
            .with_context(|| format!("failed to count {}", kind.table()))?;
        Ok(n as usize)
    }
}
