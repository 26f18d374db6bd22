// Teams file rows into division and team candidates.

use crate::model::{Conference, Division, DivisionCandidate, Season, TeamCandidate};
use crate::parser::TeamRow;

use super::TranslationError;

/// The conference a division label belongs to, from the label's leading
/// word ("AFC East" -> "AFC"), compared case-insensitively.
pub fn conference_for<'c>(
    division: &str,
    conferences: &'c [Conference],
) -> Result<&'c Conference, TranslationError> {
    let prefix = division.split_whitespace().next().unwrap_or_default();
    conferences
        .iter()
        .find(|c| c.name.trim().eq_ignore_ascii_case(prefix))
        .ok_or_else(|| TranslationError::UnknownConference(prefix.to_lowercase()))
}

/// A row's optional season column must match the upload's season.
fn check_season(row: &TeamRow, season: &Season) -> Result<(), TranslationError> {
    match row.season.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(found) if found.parse::<i32>().ok() != Some(season.year) => {
            Err(TranslationError::SeasonMismatch {
                expected: season.year,
                found: found.to_string(),
            })
        }
        _ => Ok(()),
    }
}

/// Add the row's division to `divisions` unless an earlier row already did.
pub fn materialize_division(
    row: &TeamRow,
    season: &Season,
    conferences: &[Conference],
    divisions: &mut Vec<DivisionCandidate>,
) -> Result<(), TranslationError> {
    check_season(row, season)?;
    let name = row.division.trim();
    let conference = conference_for(name, conferences)?;
    if !divisions.iter().any(|d| d.name.as_deref() == Some(name)) {
        divisions.push(DivisionCandidate {
            id: 0,
            name: Some(name.to_string()),
            conference_id: Some(conference.id),
            season_id: Some(season.id),
        });
    }
    Ok(())
}

/// Location and short name for a row. Without a `Location` column the name
/// is the full display name, split at its last space.
pub fn split_team_name(row: &TeamRow) -> Result<(String, String), TranslationError> {
    let name = row.name.trim();
    if let Some(location) = row.location.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
        return Ok((location.to_string(), name.to_string()));
    }
    match name.rsplit_once(' ') {
        Some((location, short)) if !location.trim().is_empty() && !short.is_empty() => {
            Ok((location.trim().to_string(), short.to_string()))
        }
        _ => Err(TranslationError::IncompleteTeamName(name.to_string())),
    }
}

/// Build a team candidate against the divisions staged for this upload.
pub fn translate_team(row: &TeamRow, divisions: &[Division]) -> Result<TeamCandidate, TranslationError> {
    let division_name = row.division.trim();
    let division = divisions
        .iter()
        .find(|d| d.name == division_name)
        .ok_or_else(|| TranslationError::UnknownDivision(division_name.to_string()))?;
    let (location, name) = split_team_name(row)?;
    Ok(TeamCandidate::new(&location, &name, division.id))
}
