// Row-to-entity translation: turn parsed CSV rows into reconciler candidates,
// resolving team, conference and division references by name.

pub mod games;
pub mod resolver;
pub mod teams;

use thiserror::Error;

pub use games::{parse_week, translate_game, GameContext};
pub use resolver::{TeamNameStrategy, TeamNaming, TeamResolver};
pub use teams::{conference_for, materialize_division, split_team_name, translate_team};

/// Why a row could not be translated. All of these are recorded on the row
/// except `MixedTeamNaming`, which fails the whole upload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslationError {
    #[error("unknown team '{0}'")]
    UnknownTeam(String),

    #[error("team name '{0}' matches more than one team")]
    AmbiguousTeam(String),

    #[error("unknown conference '{0}'")]
    UnknownConference(String),

    #[error("unknown division '{0}'")]
    UnknownDivision(String),

    #[error("team name '{0}' has no location; use the full name or add a Location column")]
    IncompleteTeamName(String),

    #[error("cannot read '{value}' as a date and time (expected format '{format}')")]
    InvalidTimestamp { value: String, format: String },

    #[error("'{value}' in {field} is not a whole number")]
    InvalidNumber { field: &'static str, value: String },

    #[error("'{0}' is neither a week number nor a playoff round")]
    InvalidWeek(String),

    #[error("no week in the row and no default week was given")]
    MissingWeek,

    #[error("row is for season {found}, but the upload is for {expected}")]
    SeasonMismatch { expected: i32, found: String },

    #[error("file mixes full team names (e.g. '{full}') with short names (e.g. '{short}')")]
    MixedTeamNaming { full: String, short: String },
}
