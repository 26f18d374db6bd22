// Users own games: the "actual" user holds real results, the others hold
// picks for pools and bets.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ReconcileError;
use crate::reconcile::Candidate;

use super::merge::{merge_nullable, require_text, Changes};
use super::{EntityKind, KeyPart, NaturalKey};

/// The closed set of user types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UserType {
    Actual,
    SeasonLong,
    PlayoffPool,
    Bet,
}

impl UserType {
    pub const ALL: [UserType; 4] = [
        UserType::Actual,
        UserType::SeasonLong,
        UserType::PlayoffPool,
        UserType::Bet,
    ];

    /// Parse the stored spelling. Matching is exact.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "actual" => Some(UserType::Actual),
            "season-long" => Some(UserType::SeasonLong),
            "playoff-pool" => Some(UserType::PlayoffPool),
            "bet" => Some(UserType::Bet),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Actual => "actual",
            UserType::SeasonLong => "season-long",
            UserType::PlayoffPool => "playoff-pool",
            UserType::Bet => "bet",
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub name: String,
    pub user_type: UserType,
    pub money: Option<f64>,
}

/// Incoming user data. The type stays raw text until validation so an
/// unrecognized value can be reported as such.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserCandidate {
    #[serde(default)]
    pub id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub user_type: Option<String>,
    pub money: Option<f64>,
}

impl UserCandidate {
    fn parsed_type(&self) -> Result<UserType, ReconcileError> {
        let raw = require_text(&self.user_type, EntityKind::User, "type")?;
        UserType::parse(raw).ok_or_else(|| ReconcileError::InvalidEnumValue {
            kind: EntityKind::User,
            field: "type",
            value: raw.to_string(),
        })
    }
}

impl Candidate for UserCandidate {
    type Record = User;

    fn surrogate_id(&self) -> i64 {
        self.id
    }

    fn validate(&self) -> Result<(), ReconcileError> {
        require_text(&self.name, EntityKind::User, "name")?;
        self.parsed_type()?;
        Ok(())
    }

    fn natural_key(&self) -> Result<NaturalKey, ReconcileError> {
        let name = require_text(&self.name, EntityKind::User, "name")?;
        let user_type = self.parsed_type()?;
        Ok(NaturalKey::new(
            EntityKind::User,
            vec![KeyPart::from(name), KeyPart::from(user_type.as_str())],
        ))
    }

    fn to_record(&self) -> Result<User, ReconcileError> {
        Ok(User {
            id: 0,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            name: require_text(&self.name, EntityKind::User, "name")?.to_string(),
            user_type: self.parsed_type()?,
            money: self.money,
        })
    }

    fn merge_into(&self, existing: &mut User) -> Changes {
        let mut changes = Changes::new();
        merge_nullable(&mut existing.first_name, &self.first_name, "first_name", &mut changes);
        merge_nullable(&mut existing.last_name, &self.last_name, "last_name", &mut changes);
        merge_nullable(&mut existing.money, &self.money, "money", &mut changes);
        changes
    }
}
