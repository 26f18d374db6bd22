// Domain entities: stored records and the candidates that reconcile into them.
//
// A record mirrors a row in the store. A candidate is incoming data in which
// every updatable field is optional: `None` means the field was not provided
// and must never overwrite a stored value.

pub mod game;
pub mod league;
pub mod merge;
pub mod season;
pub mod user;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use game::{Game, GameCandidate};
pub use league::{Conference, ConferenceCandidate, Division, DivisionCandidate, Team, TeamCandidate};
pub use season::{Season, SeasonCandidate};
pub use user::{User, UserCandidate, UserType};

// ---------------------------------------------------------------------------
// Entity kinds
// ---------------------------------------------------------------------------

/// Every entity type the store persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Season,
    Conference,
    Division,
    Team,
    Game,
    User,
}

impl EntityKind {
    /// Table backing this entity type.
    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::Season => "seasons",
            EntityKind::Conference => "conferences",
            EntityKind::Division => "divisions",
            EntityKind::Team => "teams",
            EntityKind::Game => "games",
            EntityKind::User => "users",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Season => "Season",
            EntityKind::Conference => "Conference",
            EntityKind::Division => "Division",
            EntityKind::Team => "Team",
            EntityKind::Game => "Game",
            EntityKind::User => "User",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Natural keys
// ---------------------------------------------------------------------------

/// One component of a natural key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyPart {
    Int(i64),
    Text(String),
}

impl From<i64> for KeyPart {
    fn from(v: i64) -> Self {
        KeyPart::Int(v)
    }
}

impl From<i32> for KeyPart {
    fn from(v: i32) -> Self {
        KeyPart::Int(i64::from(v))
    }
}

impl From<&str> for KeyPart {
    fn from(v: &str) -> Self {
        KeyPart::Text(v.to_string())
    }
}

impl From<String> for KeyPart {
    fn from(v: String) -> Self {
        KeyPart::Text(v)
    }
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPart::Int(v) => write!(f, "{v}"),
            KeyPart::Text(v) => write!(f, "'{v}'"),
        }
    }
}

/// The business identity of an entity, independent of its surrogate id.
///
/// Parts are ordered to match the key columns declared by the entity's
/// record type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NaturalKey {
    pub kind: EntityKind,
    pub parts: Vec<KeyPart>,
}

impl NaturalKey {
    pub fn new(kind: EntityKind, parts: Vec<KeyPart>) -> Self {
        Self { kind, parts }
    }
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.kind)?;
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{part}")?;
        }
        f.write_str(")")
    }
}

// ---------------------------------------------------------------------------
// Upsert actions
// ---------------------------------------------------------------------------

/// What the reconciler decided to do with a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertAction {
    Insert,
    Update,
    /// Matched an existing row and nothing differed; no write was issued.
    Unchanged,
}
