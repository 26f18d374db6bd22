// Declarative row mapping for every stored entity.
//
// Each record type names its table (through its kind), its natural-key
// columns and its data columns. The unit of work builds all lookup, insert
// and update statements from these descriptors, so no entity needs bespoke
// SQL.

use std::fmt;

use chrono::NaiveDateTime;
use rusqlite::types::{Type, Value};
use rusqlite::Row;

use crate::model::{
    Conference, Division, EntityKind, Game, KeyPart, Season, Team, User, UserType,
};

/// A type persisted as one row of `KIND.table()`.
///
/// Rows are always read as `id` followed by [`Record::COLUMNS`], in order.
pub trait Record: Clone + fmt::Debug + Sized {
    const KIND: EntityKind;
    /// Natural-key columns, in the order of `NaturalKey::parts`.
    const KEY_COLUMNS: &'static [&'static str];
    /// Every column except `id`, in the order of [`Record::values`].
    const COLUMNS: &'static [&'static str];

    fn id(&self) -> i64;
    fn set_id(&mut self, id: i64);
    fn values(&self) -> Vec<Value>;
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

/// `id, col1, col2, ...`, optionally qualified with a table alias.
pub(crate) fn select_list<R: Record>(alias: Option<&str>) -> String {
    let prefix = alias.map(|a| format!("{a}.")).unwrap_or_default();
    std::iter::once("id")
        .chain(R::COLUMNS.iter().copied())
        .map(|c| format!("{prefix}{c}"))
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<&KeyPart> for Value {
    fn from(part: &KeyPart) -> Self {
        match part {
            KeyPart::Int(v) => Value::Integer(*v),
            KeyPart::Text(v) => Value::Text(v.clone()),
        }
    }
}

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn timestamp(value: &NaiveDateTime) -> Value {
    Value::Text(value.format(TIMESTAMP_FORMAT).to_string())
}

// ---------------------------------------------------------------------------
// Impls
// ---------------------------------------------------------------------------

impl Record for Season {
    const KIND: EntityKind = EntityKind::Season;
    const KEY_COLUMNS: &'static [&'static str] = &["year", "name"];
    const COLUMNS: &'static [&'static str] =
        &["name", "year", "regular_season_weeks", "playoff_teams"];

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::from(self.name.clone()),
            Value::from(self.year),
            Value::from(self.regular_season_weeks),
            Value::from(self.playoff_teams),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Season {
            id: row.get(0)?,
            name: row.get(1)?,
            year: row.get(2)?,
            regular_season_weeks: row.get(3)?,
            playoff_teams: row.get(4)?,
        })
    }
}

impl Record for Conference {
    const KIND: EntityKind = EntityKind::Conference;
    const KEY_COLUMNS: &'static [&'static str] = &["name"];
    const COLUMNS: &'static [&'static str] = &["name"];

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn values(&self) -> Vec<Value> {
        vec![Value::from(self.name.clone())]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Conference {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    }
}

impl Record for Division {
    const KIND: EntityKind = EntityKind::Division;
    const KEY_COLUMNS: &'static [&'static str] = &["season_id", "conference_id", "name"];
    const COLUMNS: &'static [&'static str] = &["name", "conference_id", "season_id"];

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::from(self.name.clone()),
            Value::from(self.conference_id),
            Value::from(self.season_id),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Division {
            id: row.get(0)?,
            name: row.get(1)?,
            conference_id: row.get(2)?,
            season_id: row.get(3)?,
        })
    }
}

impl Record for Team {
    const KIND: EntityKind = EntityKind::Team;
    const KEY_COLUMNS: &'static [&'static str] = &["division_id", "full_name"];
    const COLUMNS: &'static [&'static str] = &["location", "name", "full_name", "division_id"];

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::from(self.location.clone()),
            Value::from(self.name.clone()),
            Value::from(self.full_name.clone()),
            Value::from(self.division_id),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Team {
            id: row.get(0)?,
            location: row.get(1)?,
            name: row.get(2)?,
            full_name: row.get(3)?,
            division_id: row.get(4)?,
        })
    }
}

impl Record for Game {
    const KIND: EntityKind = EntityKind::Game;
    const KEY_COLUMNS: &'static [&'static str] = &["season_id", "week", "user_id", "away_team_id"];
    const COLUMNS: &'static [&'static str] = &[
        "season_id",
        "week",
        "user_id",
        "start_time",
        "spread",
        "away_spread_odds",
        "home_spread_odds",
        "away_money_line",
        "home_money_line",
        "over_under",
        "over_odds",
        "under_odds",
        "is_playoffs",
        "was_overtime",
        "bet",
        "away_team_id",
        "away_team_score",
        "home_team_id",
        "home_team_score",
    ];

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::from(self.season_id),
            Value::from(self.week),
            Value::from(self.user_id),
            timestamp(&self.start_time),
            Value::from(self.spread),
            Value::from(self.away_spread_odds),
            Value::from(self.home_spread_odds),
            Value::from(self.away_money_line),
            Value::from(self.home_money_line),
            Value::from(self.over_under),
            Value::from(self.over_odds),
            Value::from(self.under_odds),
            Value::from(self.is_playoffs),
            Value::from(self.was_overtime),
            Value::from(self.bet),
            Value::from(self.away_team_id),
            Value::from(self.away_team_score),
            Value::from(self.home_team_id),
            Value::from(self.home_team_score),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Game {
            id: row.get(0)?,
            season_id: row.get(1)?,
            week: row.get(2)?,
            user_id: row.get(3)?,
            start_time: row.get(4)?,
            spread: row.get(5)?,
            away_spread_odds: row.get(6)?,
            home_spread_odds: row.get(7)?,
            away_money_line: row.get(8)?,
            home_money_line: row.get(9)?,
            over_under: row.get(10)?,
            over_odds: row.get(11)?,
            under_odds: row.get(12)?,
            is_playoffs: row.get(13)?,
            was_overtime: row.get(14)?,
            bet: row.get(15)?,
            away_team_id: row.get(16)?,
            away_team_score: row.get(17)?,
            home_team_id: row.get(18)?,
            home_team_score: row.get(19)?,
        })
    }
}

impl Record for User {
    const KIND: EntityKind = EntityKind::User;
    const KEY_COLUMNS: &'static [&'static str] = &["name", "user_type"];
    const COLUMNS: &'static [&'static str] =
        &["first_name", "last_name", "name", "user_type", "money"];

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::from(self.first_name.clone()),
            Value::from(self.last_name.clone()),
            Value::from(self.name.clone()),
            Value::from(self.user_type.as_str().to_string()),
            Value::from(self.money),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let raw_type: String = row.get(4)?;
        let user_type = UserType::parse(&raw_type).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                4,
                Type::Text,
                format!("unknown user type '{raw_type}'").into(),
            )
        })?;
        Ok(User {
            id: row.get(0)?,
            first_name: row.get(1)?,
            last_name: row.get(2)?,
            name: row.get(3)?,
            user_type,
            money: row.get(5)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_descriptor<R: Record>(sample: &R) {
        assert_eq!(
            sample.values().len(),
            R::COLUMNS.len(),
            "{} values do not line up with its columns",
            R::KIND
        );
        for key in R::KEY_COLUMNS {
            assert!(
                R::COLUMNS.contains(key),
                "{} key column `{key}` is not a column",
                R::KIND
            );
        }
    }

    #[test]
    fn descriptors_are_consistent() {
        assert_descriptor(&Season {
            id: 0,
            name: "2022-2023".into(),
            year: 2022,
            regular_season_weeks: 18,
            playoff_teams: 7,
        });
        assert_descriptor(&Conference {
            id: 0,
            name: "AFC".into(),
        });
        assert_descriptor(&Division {
            id: 0,
            name: "AFC East".into(),
            conference_id: 1,
            season_id: 1,
        });
        assert_descriptor(&Team {
            id: 0,
            location: "Buffalo".into(),
            name: "Bills".into(),
            full_name: "Buffalo Bills".into(),
            division_id: 1,
        });
        assert_descriptor(&User {
            id: 0,
            first_name: None,
            last_name: None,
            name: "actual".into(),
            user_type: UserType::Actual,
            money: None,
        });
    }

    #[test]
    fn select_list_qualifies_columns() {
        assert_eq!(select_list::<Conference>(None), "id, name");
        assert_eq!(select_list::<Conference>(Some("c")), "c.id, c.name");
    }
}
