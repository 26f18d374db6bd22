// Administrator import operations: CSV uploads of games and teams, single
// season and user upserts, and seeding reference data from configuration.
//
// Each operation runs in one unit of work. Row-level problems are reported
// on the rows and never fail the upload; any reconciliation error rolls the
// whole upload back.

use std::io::Read;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::cancel::CancelFlag;
use crate::config::{ImportConfig, SeedConfig};
use crate::error::{BatchError, ReconcileError};
use crate::model::{
    ConferenceCandidate, Division, Season, SeasonCandidate, User, UserCandidate, UserType,
};
use crate::parser::{GameRow, RowParser, RowResult, TeamRow};
use crate::reconcile::{stage_batch, upsert_batch, BatchSummary, Staged, UpsertPolicy};
use crate::store::{Database, UnitOfWork};
use crate::translate::{self, GameContext, TeamNaming, TeamResolver, TranslationError};

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("no season for year {0}")]
    SeasonNotFound(i32),

    #[error("no '{0}' user of type actual")]
    UserNotFound(String),

    #[error(transparent)]
    Translation(#[from] TranslationError),

    #[error("line {line_number} rejected: {source}")]
    Rejected {
        line_number: usize,
        #[source]
        source: ReconcileError,
    },

    #[error(transparent)]
    Reconcile(BatchError),

    #[error("import cancelled; nothing was saved")]
    Cancelled,

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl From<BatchError> for ImportError {
    fn from(err: BatchError) -> Self {
        match err.source {
            ReconcileError::Cancelled => ImportError::Cancelled,
            _ => ImportError::Reconcile(err),
        }
    }
}

/// Per-row results of an upload plus outcome counts.
#[derive(Debug, Clone, Serialize)]
pub struct UploadReport<T> {
    pub rows: Vec<RowResult<T>>,
    pub summary: BatchSummary,
}

/// Options for one games upload.
#[derive(Debug, Clone)]
pub struct GameImport {
    pub year: i32,
    /// Week for files without a `Week` column.
    pub week: Option<u32>,
    pub user: String,
    pub team_naming: TeamNaming,
    pub date_time_format: String,
    pub venue_marker: String,
    pub policy: UpsertPolicy,
}

impl GameImport {
    pub fn new(year: i32, settings: &ImportConfig) -> Self {
        Self {
            year,
            week: None,
            user: settings.user.clone(),
            team_naming: settings.team_names,
            date_time_format: settings.date_time_format.clone(),
            venue_marker: settings.venue_marker.clone(),
            policy: settings.policy(),
        }
    }
}

/// Options for one teams upload.
#[derive(Debug, Clone, Copy)]
pub struct TeamImport {
    pub year: i32,
    /// Applies to teams. Divisions are always upserted.
    pub policy: UpsertPolicy,
}

// ---------------------------------------------------------------------------
// Uploads
// ---------------------------------------------------------------------------

/// Import a games CSV for one season.
pub fn import_games<R: Read>(
    db: &Database,
    rdr: R,
    options: &GameImport,
    cancel: &CancelFlag,
) -> Result<UploadReport<GameRow>, ImportError> {
    let mut rows: Vec<RowResult<GameRow>> = collect_rows(RowParser::new(rdr), cancel)?;

    let season = db
        .season_by_year(options.year)?
        .ok_or(ImportError::SeasonNotFound(options.year))?;
    let user = db
        .user_by_name(&options.user, UserType::Actual)?
        .ok_or_else(|| ImportError::UserNotFound(options.user.clone()))?;
    let teams = db.teams_for_season(season.id)?;

    let names = rows
        .iter()
        .filter_map(|row| row.record.as_ref())
        .flat_map(|game| [game.winner.as_str(), game.loser.as_str()]);
    let resolver = TeamResolver::for_naming(&teams, options.team_naming, names)?;

    let ctx = GameContext {
        season: &season,
        user: &user,
        teams: &resolver,
        date_time_format: &options.date_time_format,
        venue_marker: &options.venue_marker,
        default_week: options.week,
    };

    let mut pending = Vec::new();
    let mut candidates = Vec::new();
    for (i, row) in rows.iter_mut().enumerate() {
        check_cancel(cancel)?;
        let Some(game) = row.record.as_ref().filter(|_| row.log.is_empty()) else {
            continue;
        };
        match translate::translate_game(game, &ctx) {
            Ok(candidate) => {
                pending.push(i);
                candidates.push(candidate);
            }
            Err(e) => row.reject(e.to_string()),
        }
    }

    let mut uow = db.begin()?;
    let staged = stage_batch(&mut uow, &candidates, options.policy, cancel)
        .map_err(|e| rejected(e, &pending, &rows))?;
    commit(uow, cancel)?;

    let summary = apply_actions(&mut rows, &pending, &staged);
    info!(
        year = options.year,
        inserted = summary.inserted,
        updated = summary.updated,
        unchanged = summary.unchanged,
        skipped = summary.skipped,
        "games imported"
    );
    Ok(UploadReport { rows, summary })
}

/// Import a teams CSV for one season. Divisions named by the file are
/// created in the same unit of work as the teams.
pub fn import_teams<R: Read>(
    db: &Database,
    rdr: R,
    options: &TeamImport,
    cancel: &CancelFlag,
) -> Result<UploadReport<TeamRow>, ImportError> {
    let mut rows: Vec<RowResult<TeamRow>> = collect_rows(RowParser::new(rdr), cancel)?;

    let season = db
        .season_by_year(options.year)?
        .ok_or(ImportError::SeasonNotFound(options.year))?;
    let conferences = db.conferences()?;

    let mut division_candidates = Vec::new();
    for row in rows.iter_mut() {
        check_cancel(cancel)?;
        let Some(team) = row.record.as_ref().filter(|_| row.log.is_empty()) else {
            continue;
        };
        if let Err(e) =
            translate::materialize_division(team, &season, &conferences, &mut division_candidates)
        {
            row.reject(e.to_string());
        }
    }

    let mut uow = db.begin()?;
    let divisions: Vec<Division> = stage_batch(
        &mut uow,
        &division_candidates,
        UpsertPolicy::default(),
        cancel,
    )?
    .into_iter()
    .map(|staged| staged.record)
    .collect();

    let mut pending = Vec::new();
    let mut candidates = Vec::new();
    for (i, row) in rows.iter_mut().enumerate() {
        check_cancel(cancel)?;
        let Some(team) = row.record.as_ref().filter(|_| row.log.is_empty()) else {
            continue;
        };
        match translate::translate_team(team, &divisions) {
            Ok(candidate) => {
                pending.push(i);
                candidates.push(candidate);
            }
            Err(e) => row.reject(e.to_string()),
        }
    }

    let staged = stage_batch(&mut uow, &candidates, options.policy, cancel)
        .map_err(|e| rejected(e, &pending, &rows))?;
    commit(uow, cancel)?;

    let summary = apply_actions(&mut rows, &pending, &staged);
    info!(
        year = options.year,
        divisions = divisions.len(),
        inserted = summary.inserted,
        updated = summary.updated,
        unchanged = summary.unchanged,
        skipped = summary.skipped,
        "teams imported"
    );
    Ok(UploadReport { rows, summary })
}

// ---------------------------------------------------------------------------
// Single-entity operations
// ---------------------------------------------------------------------------

pub fn upsert_season(
    db: &Database,
    candidate: SeasonCandidate,
    policy: UpsertPolicy,
) -> Result<Staged<Season>, ImportError> {
    let mut staged = upsert_batch(db, &[candidate], policy, &CancelFlag::new())?;
    staged
        .pop()
        .ok_or_else(|| anyhow::anyhow!("season batch returned no result").into())
}

pub fn upsert_users(
    db: &Database,
    candidates: &[UserCandidate],
    policy: UpsertPolicy,
) -> Result<Vec<Staged<User>>, ImportError> {
    Ok(upsert_batch(db, candidates, policy, &CancelFlag::new())?)
}

/// Create the configured conferences, seasons and users. Safe to rerun.
pub fn seed(db: &Database, config: &SeedConfig) -> Result<BatchSummary, ImportError> {
    let conferences: Vec<ConferenceCandidate> = config
        .conferences
        .iter()
        .map(ConferenceCandidate::named)
        .collect();
    let seasons: Vec<SeasonCandidate> = config
        .seasons
        .iter()
        .map(|s| SeasonCandidate {
            id: 0,
            name: Some(s.name.clone()),
            year: Some(s.year),
            regular_season_weeks: Some(s.regular_season_weeks),
            playoff_teams: Some(s.playoff_teams),
        })
        .collect();
    let users: Vec<UserCandidate> = config
        .users
        .iter()
        .map(|u| UserCandidate {
            id: 0,
            first_name: u.first_name.clone(),
            last_name: u.last_name.clone(),
            name: Some(u.name.clone()),
            user_type: Some(u.user_type.clone()),
            money: None,
        })
        .collect();

    let cancel = CancelFlag::new();
    let policy = UpsertPolicy::default();
    let mut uow = db.begin()?;
    let mut summary = BatchSummary::from_staged(&stage_batch(&mut uow, &conferences, policy, &cancel)?);
    summary += BatchSummary::from_staged(&stage_batch(&mut uow, &seasons, policy, &cancel)?);
    summary += BatchSummary::from_staged(&stage_batch(&mut uow, &users, policy, &cancel)?);
    uow.commit()?;

    info!(
        inserted = summary.inserted,
        updated = summary.updated,
        unchanged = summary.unchanged,
        "seed data applied"
    );
    Ok(summary)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn check_cancel(cancel: &CancelFlag) -> Result<(), ImportError> {
    if cancel.is_cancelled() {
        Err(ImportError::Cancelled)
    } else {
        Ok(())
    }
}

fn collect_rows<T>(
    parser: impl Iterator<Item = RowResult<T>>,
    cancel: &CancelFlag,
) -> Result<Vec<RowResult<T>>, ImportError> {
    let mut rows = Vec::new();
    for row in parser {
        check_cancel(cancel)?;
        rows.push(row);
    }
    Ok(rows)
}

/// Map a batch failure back to the line of the row that produced it.
fn rejected<T>(err: BatchError, pending: &[usize], rows: &[RowResult<T>]) -> ImportError {
    let row = match err.source {
        ReconcileError::Cancelled => None,
        _ => pending.get(err.index).copied(),
    };
    match row {
        Some(row) => ImportError::Rejected {
            line_number: rows[row].line_number,
            source: err.source,
        },
        None => err.into(),
    }
}

/// The last cancellation point. Once `COMMIT` is issued the upload either
/// fully happened or fully did not.
fn commit(uow: UnitOfWork<'_>, cancel: &CancelFlag) -> Result<(), ImportError> {
    if cancel.is_cancelled() {
        warn!("import cancelled before commit, rolling back");
        uow.rollback()?;
        return Err(ImportError::Cancelled);
    }
    uow.commit()?;
    Ok(())
}

fn apply_actions<T, R>(
    rows: &mut [RowResult<T>],
    pending: &[usize],
    staged: &[Staged<R>],
) -> BatchSummary {
    for (&row, item) in pending.iter().zip(staged) {
        rows[row].action = Some(item.action);
    }
    let mut summary = BatchSummary::from_staged(staged);
    summary.skipped = rows.iter().filter(|row| !row.is_accepted()).count();
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SeedSeason, SeedUser};
    use crate::model::EntityKind;

    fn seed_config() -> SeedConfig {
        SeedConfig {
            conferences: vec!["AFC".into(), "NFC".into()],
            seasons: vec![SeedSeason {
                name: "2022-2023".into(),
                year: 2022,
                regular_season_weeks: 18,
                playoff_teams: 7,
            }],
            users: vec![SeedUser {
                name: "actual".into(),
                user_type: "actual".into(),
                first_name: None,
                last_name: None,
            }],
        }
    }

    fn seeded_db() -> Database {
        let db = Database::open(":memory:").unwrap();
        seed(&db, &seed_config()).unwrap();
        db
    }

    fn game_import() -> GameImport {
        GameImport {
            year: 2022,
            week: None,
            user: "actual".into(),
            team_naming: TeamNaming::Detect,
            date_time_format: "%m/%d/%Y %I:%M%p".into(),
            venue_marker: "@".into(),
            policy: UpsertPolicy::default(),
        }
    }

    fn team_import() -> TeamImport {
        TeamImport {
            year: 2022,
            policy: UpsertPolicy::default(),
        }
    }

    const TEAMS: &str = "\
Name,Division
Buffalo Bills,AFC East
Miami Dolphins,AFC East
Los Angeles Rams,NFC West
";

    #[test]
    fn seed_is_idempotent() {
        let db = seeded_db();
        let summary = seed(&db, &seed_config()).unwrap();
        assert_eq!(summary.inserted, 0);
        assert_eq!(summary.unchanged, 4);
        assert_eq!(db.count(EntityKind::Conference).unwrap(), 2);
    }

    #[test]
    fn teams_upload_creates_divisions_and_teams() {
        let db = seeded_db();
        let report = import_teams(&db, TEAMS.as_bytes(), &team_import(), &CancelFlag::new())
            .unwrap();
        assert_eq!(report.summary.inserted, 3);
        assert_eq!(db.count(EntityKind::Division).unwrap(), 2);
        assert!(report
            .rows
            .iter()
            .all(|r| r.action == Some(crate::model::UpsertAction::Insert)));
    }

    #[test]
    fn unknown_conference_skips_only_that_row() {
        let db = seeded_db();
        let csv_data = format!("{TEAMS}Nowhere Ghosts,XFL North\n");
        let report = import_teams(&db, csv_data.as_bytes(), &team_import(), &CancelFlag::new())
            .unwrap();
        assert_eq!(report.summary.inserted, 3);
        assert_eq!(report.summary.skipped, 1);
        assert_eq!(report.rows[3].log, vec!["unknown conference 'xfl'"]);
        assert_eq!(report.rows[3].action, None);
    }

    #[test]
    fn games_upload_without_season_fails() {
        let db = Database::open(":memory:").unwrap();
        let err = import_games(&db, "".as_bytes(), &game_import(), &CancelFlag::new())
            .unwrap_err();
        assert!(matches!(err, ImportError::SeasonNotFound(2022)));
    }

    #[test]
    fn policy_failure_names_the_line() {
        let db = seeded_db();
        let no_insert = TeamImport {
            year: 2022,
            policy: UpsertPolicy {
                allow_insert: false,
                allow_update: true,
            },
        };
        let err = import_teams(&db, TEAMS.as_bytes(), &no_insert, &CancelFlag::new()).unwrap_err();
        assert!(matches!(
            err,
            ImportError::Rejected {
                line_number: 1,
                source: ReconcileError::AlreadyExists { .. }
            }
        ));
        assert_eq!(db.count(EntityKind::Team).unwrap(), 0);
        assert_eq!(db.count(EntityKind::Division).unwrap(), 0);
    }

    #[test]
    fn cancelled_upload_saves_nothing() {
        let db = seeded_db();
        let cancel = CancelFlag::new();
        cancel.cancel();
        let err = import_teams(&db, TEAMS.as_bytes(), &team_import(), &cancel).unwrap_err();
        assert!(matches!(err, ImportError::Cancelled));
        assert_eq!(db.count(EntityKind::Division).unwrap(), 0);
    }

    #[test]
    fn upsert_season_updates_playoff_teams() {
        let db = seeded_db();
        let staged = upsert_season(
            &db,
            SeasonCandidate {
                name: Some("2022-2023".into()),
                year: Some(2022),
                playoff_teams: Some(6),
                ..Default::default()
            },
            UpsertPolicy::default(),
        )
        .unwrap();
        assert_eq!(staged.changed, vec!["playoff_teams"]);
        assert_eq!(db.season_by_year(2022).unwrap().unwrap().playoff_teams, 6);
    }

    #[test]
    fn upsert_season_rejects_zero_weeks() {
        let db = seeded_db();
        let err = upsert_season(
            &db,
            SeasonCandidate {
                name: Some("2022-2023".into()),
                year: Some(2022),
                regular_season_weeks: Some(0),
                ..Default::default()
            },
            UpsertPolicy::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ImportError::Reconcile(BatchError {
                index: 0,
                source: ReconcileError::OutOfRange { .. }
            })
        ));
        assert_eq!(db.season_by_year(2022).unwrap().unwrap().regular_season_weeks, 18);
    }

    #[test]
    fn upsert_users_inserts_new_user() {
        let db = seeded_db();
        let staged = upsert_users(
            &db,
            &[UserCandidate {
                name: Some("dave".into()),
                user_type: Some("season-long".into()),
                ..Default::default()
            }],
            UpsertPolicy::default(),
        )
        .unwrap();
        assert_eq!(staged[0].action, crate::model::UpsertAction::Insert);
        assert!(db
            .user_by_name("dave", UserType::SeasonLong)
            .unwrap()
            .is_some());
    }
}
