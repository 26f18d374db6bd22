// Seasons: the top-level scope for divisions, teams and games.

use serde::{Deserialize, Serialize};

use crate::error::ReconcileError;
use crate::reconcile::Candidate;

use super::merge::{merge_field, require, require_text, Changes};
use super::{EntityKind, KeyPart, NaturalKey};

/// A stored season.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Season {
    pub id: i64,
    /// Display name, e.g. "2022-2023".
    pub name: String,
    pub year: i32,
    /// Weeks in the regular season. Any later week is a playoff week.
    pub regular_season_weeks: u32,
    pub playoff_teams: u32,
}

impl Season {
    /// Whether `week` falls after the regular season.
    pub fn is_playoff_week(&self, week: u32) -> bool {
        week > self.regular_season_weeks
    }
}

/// Incoming season data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeasonCandidate {
    #[serde(default)]
    pub id: i64,
    pub name: Option<String>,
    pub year: Option<i32>,
    pub regular_season_weeks: Option<u32>,
    pub playoff_teams: Option<u32>,
}

impl Candidate for SeasonCandidate {
    type Record = Season;

    fn surrogate_id(&self) -> i64 {
        self.id
    }

    fn validate(&self) -> Result<(), ReconcileError> {
        require_text(&self.name, EntityKind::Season, "name")?;
        require(&self.year, EntityKind::Season, "year")?;
        if self.regular_season_weeks == Some(0) {
            return Err(ReconcileError::OutOfRange {
                kind: EntityKind::Season,
                field: "regular_season_weeks",
                value: 0,
            });
        }
        Ok(())
    }

    fn natural_key(&self) -> Result<NaturalKey, ReconcileError> {
        let year = *require(&self.year, EntityKind::Season, "year")?;
        let name = require_text(&self.name, EntityKind::Season, "name")?;
        Ok(NaturalKey::new(
            EntityKind::Season,
            vec![KeyPart::from(year), KeyPart::from(name)],
        ))
    }

    fn to_record(&self) -> Result<Season, ReconcileError> {
        Ok(Season {
            id: 0,
            name: require_text(&self.name, EntityKind::Season, "name")?.to_string(),
            year: *require(&self.year, EntityKind::Season, "year")?,
            regular_season_weeks: *require(
                &self.regular_season_weeks,
                EntityKind::Season,
                "regular_season_weeks",
            )?,
            playoff_teams: self.playoff_teams.unwrap_or(0),
        })
    }

    fn merge_into(&self, existing: &mut Season) -> Changes {
        let mut changes = Changes::new();
        merge_field(
            &mut existing.regular_season_weeks,
            &self.regular_season_weeks,
            "regular_season_weeks",
            &mut changes,
        );
        merge_field(
            &mut existing.playoff_teams,
            &self.playoff_teams,
            "playoff_teams",
            &mut changes,
        );
        changes
    }
}
