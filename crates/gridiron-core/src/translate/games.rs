// Games file rows into game candidates.

use chrono::NaiveDateTime;

use crate::model::{GameCandidate, Season, User};
use crate::parser::GameRow;

use super::{TeamResolver, TranslationError};

/// Everything a game row is translated against.
#[derive(Debug, Clone, Copy)]
pub struct GameContext<'a> {
    pub season: &'a Season,
    /// Owner of the imported games (normally the "actual" user).
    pub user: &'a User,
    pub teams: &'a TeamResolver,
    pub date_time_format: &'a str,
    /// Text in the `At` column meaning the winner played away.
    pub venue_marker: &'a str,
    /// Week for rows without a `Week` column.
    pub default_week: Option<u32>,
}

/// Playoff rounds in order; round `n` is week `regular_season_weeks + n`.
const PLAYOFF_ROUNDS: [&str; 4] = ["WildCard", "Division", "ConfChamp", "SuperBowl"];

/// Read a week label: a positive number or a playoff round name.
pub fn parse_week(
    label: Option<&str>,
    default_week: Option<u32>,
    regular_season_weeks: u32,
) -> Result<u32, TranslationError> {
    let Some(label) = label.map(str::trim).filter(|l| !l.is_empty()) else {
        return default_week.ok_or(TranslationError::MissingWeek);
    };
    if let Ok(week) = label.parse::<u32>() {
        if week > 0 {
            return Ok(week);
        }
    }
    PLAYOFF_ROUNDS
        .iter()
        .position(|round| round.eq_ignore_ascii_case(label))
        .and_then(|i| regular_season_weeks.checked_add(i as u32 + 1))
        .ok_or_else(|| TranslationError::InvalidWeek(label.to_string()))
}

/// An empty or absent score means "not provided", never zero.
fn parse_score(value: Option<&str>, field: &'static str) -> Result<Option<i32>, TranslationError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => v
            .parse::<i32>()
            .map(Some)
            .map_err(|_| TranslationError::InvalidNumber {
                field,
                value: v.to_string(),
            }),
    }
}

pub fn translate_game(row: &GameRow, ctx: &GameContext<'_>) -> Result<GameCandidate, TranslationError> {
    let week = parse_week(
        row.week.as_deref(),
        ctx.default_week,
        ctx.season.regular_season_weeks,
    )?;

    let stamp = format!("{} {}", row.date.trim(), row.time.trim());
    let start_time = NaiveDateTime::parse_from_str(&stamp, ctx.date_time_format).map_err(|_| {
        TranslationError::InvalidTimestamp {
            value: stamp.clone(),
            format: ctx.date_time_format.to_string(),
        }
    })?;

    let winner_points = parse_score(row.points_winner.as_deref(), "PtsW")?;
    let loser_points = parse_score(row.points_loser.as_deref(), "PtsL")?;

    // The marker says where the winner played, not who won.
    let winner_away = row
        .at
        .as_deref()
        .is_some_and(|at| at.contains(ctx.venue_marker));
    let (away_name, away_score, home_name, home_score) = if winner_away {
        (&row.winner, winner_points, &row.loser, loser_points)
    } else {
        (&row.loser, loser_points, &row.winner, winner_points)
    };

    let away = ctx.teams.resolve(away_name)?;
    let home = ctx.teams.resolve(home_name)?;

    Ok(GameCandidate {
        season_id: Some(ctx.season.id),
        week: Some(week),
        user_id: Some(ctx.user.id),
        start_time: Some(start_time),
        is_playoffs: Some(ctx.season.is_playoff_week(week)),
        away_team_id: Some(away.id),
        away_team_score: away_score,
        home_team_id: Some(home.id),
        home_team_score: home_score,
        ..Default::default()
    })
}
