// Games: one row per (season, week, user, away team).
//
// The "actual" user owns real results; other users own their own picks for
// the same matchups, which is why the user is part of the natural key.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::ReconcileError;
use crate::reconcile::Candidate;

use super::merge::{merge_field, merge_nullable, require, require_id, Changes};
use super::{EntityKind, KeyPart, NaturalKey};

/// A stored game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub id: i64,
    pub season_id: i64,
    pub week: u32,
    pub user_id: i64,
    pub start_time: NaiveDateTime,
    /// Point spread relative to the home team.
    pub spread: Option<f64>,
    pub away_spread_odds: Option<i32>,
    pub home_spread_odds: Option<i32>,
    pub away_money_line: Option<i32>,
    pub home_money_line: Option<i32>,
    pub over_under: Option<f64>,
    pub over_odds: Option<i32>,
    pub under_odds: Option<i32>,
    pub is_playoffs: bool,
    pub was_overtime: bool,
    pub bet: Option<i32>,
    pub away_team_id: i64,
    pub away_team_score: i32,
    pub home_team_id: i64,
    pub home_team_score: i32,
}

/// Incoming game data. Only provided fields are merged into a stored game.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameCandidate {
    #[serde(default)]
    pub id: i64,
    pub season_id: Option<i64>,
    pub week: Option<u32>,
    pub user_id: Option<i64>,
    pub start_time: Option<NaiveDateTime>,
    pub spread: Option<f64>,
    pub away_spread_odds: Option<i32>,
    pub home_spread_odds: Option<i32>,
    pub away_money_line: Option<i32>,
    pub home_money_line: Option<i32>,
    pub over_under: Option<f64>,
    pub over_odds: Option<i32>,
    pub under_odds: Option<i32>,
    pub is_playoffs: Option<bool>,
    pub was_overtime: Option<bool>,
    pub bet: Option<i32>,
    pub away_team_id: Option<i64>,
    pub away_team_score: Option<i32>,
    pub home_team_id: Option<i64>,
    pub home_team_score: Option<i32>,
}

impl Candidate for GameCandidate {
    type Record = Game;

    fn surrogate_id(&self) -> i64 {
        self.id
    }

    fn validate(&self) -> Result<(), ReconcileError> {
        self.natural_key().map(|_| ())
    }

    fn natural_key(&self) -> Result<NaturalKey, ReconcileError> {
        let week = *require(&self.week, EntityKind::Game, "week")?;
        Ok(NaturalKey::new(
            EntityKind::Game,
            vec![
                KeyPart::from(require_id(self.season_id, EntityKind::Game, "season_id")?),
                KeyPart::from(i64::from(week)),
                KeyPart::from(require_id(self.user_id, EntityKind::Game, "user_id")?),
                KeyPart::from(require_id(self.away_team_id, EntityKind::Game, "away_team_id")?),
            ],
        ))
    }

    fn references(&self) -> Vec<(EntityKind, i64)> {
        [
            (EntityKind::Season, self.season_id),
            (EntityKind::User, self.user_id),
            (EntityKind::Team, self.away_team_id),
            (EntityKind::Team, self.home_team_id),
        ]
        .into_iter()
        .filter_map(|(kind, id)| id.map(|id| (kind, id)))
        .collect()
    }

    fn to_record(&self) -> Result<Game, ReconcileError> {
        Ok(Game {
            id: 0,
            season_id: require_id(self.season_id, EntityKind::Game, "season_id")?,
            week: *require(&self.week, EntityKind::Game, "week")?,
            user_id: require_id(self.user_id, EntityKind::Game, "user_id")?,
            start_time: *require(&self.start_time, EntityKind::Game, "start_time")?,
            spread: self.spread,
            away_spread_odds: self.away_spread_odds,
            home_spread_odds: self.home_spread_odds,
            away_money_line: self.away_money_line,
            home_money_line: self.home_money_line,
            over_under: self.over_under,
            over_odds: self.over_odds,
            under_odds: self.under_odds,
            is_playoffs: self.is_playoffs.unwrap_or(false),
            was_overtime: self.was_overtime.unwrap_or(false),
            bet: self.bet,
            away_team_id: require_id(self.away_team_id, EntityKind::Game, "away_team_id")?,
            away_team_score: self.away_team_score.unwrap_or(0),
            home_team_id: require_id(self.home_team_id, EntityKind::Game, "home_team_id")?,
            home_team_score: self.home_team_score.unwrap_or(0),
        })
    }

    fn merge_into(&self, existing: &mut Game) -> Changes {
        let mut changes = Changes::new();
        merge_field(&mut existing.start_time, &self.start_time, "start_time", &mut changes);
        merge_nullable(&mut existing.spread, &self.spread, "spread", &mut changes);
        merge_nullable(
            &mut existing.away_spread_odds,
            &self.away_spread_odds,
            "away_spread_odds",
            &mut changes,
        );
        merge_nullable(
            &mut existing.home_spread_odds,
            &self.home_spread_odds,
            "home_spread_odds",
            &mut changes,
        );
        merge_nullable(
            &mut existing.away_money_line,
            &self.away_money_line,
            "away_money_line",
            &mut changes,
        );
        merge_nullable(
            &mut existing.home_money_line,
            &self.home_money_line,
            "home_money_line",
            &mut changes,
        );
        merge_nullable(&mut existing.over_under, &self.over_under, "over_under", &mut changes);
        merge_nullable(&mut existing.over_odds, &self.over_odds, "over_odds", &mut changes);
        merge_nullable(&mut existing.under_odds, &self.under_odds, "under_odds", &mut changes);
        merge_field(&mut existing.is_playoffs, &self.is_playoffs, "is_playoffs", &mut changes);
        merge_field(&mut existing.was_overtime, &self.was_overtime, "was_overtime", &mut changes);
        merge_nullable(&mut existing.bet, &self.bet, "bet", &mut changes);
        merge_field(&mut existing.home_team_id, &self.home_team_id, "home_team_id", &mut changes);
        merge_field(
            &mut existing.away_team_score,
            &self.away_team_score,
            "away_team_score",
            &mut changes,
        );
        merge_field(
            &mut existing.home_team_score,
            &self.home_team_score,
            "home_team_score",
            &mut changes,
        );
        changes
    }
}
