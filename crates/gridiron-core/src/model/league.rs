// League structure: conferences, divisions and teams.

use serde::{Deserialize, Serialize};

use crate::error::ReconcileError;
use crate::reconcile::Candidate;

use super::merge::{merge_field, require_id, require_text, Changes};
use super::{EntityKind, KeyPart, NaturalKey};

// ---------------------------------------------------------------------------
// Conference
// ---------------------------------------------------------------------------

/// A stored conference (seed data such as "AFC" or "NFC").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conference {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConferenceCandidate {
    #[serde(default)]
    pub id: i64,
    pub name: Option<String>,
}

impl ConferenceCandidate {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: Some(name.into()),
        }
    }
}

impl Candidate for ConferenceCandidate {
    type Record = Conference;

    fn surrogate_id(&self) -> i64 {
        self.id
    }

    fn validate(&self) -> Result<(), ReconcileError> {
        require_text(&self.name, EntityKind::Conference, "name").map(|_| ())
    }

    fn natural_key(&self) -> Result<NaturalKey, ReconcileError> {
        let name = require_text(&self.name, EntityKind::Conference, "name")?;
        Ok(NaturalKey::new(EntityKind::Conference, vec![KeyPart::from(name)]))
    }

    fn to_record(&self) -> Result<Conference, ReconcileError> {
        Ok(Conference {
            id: 0,
            name: require_text(&self.name, EntityKind::Conference, "name")?.to_string(),
        })
    }

    fn merge_into(&self, _existing: &mut Conference) -> Changes {
        // The name is the whole natural key; nothing else to merge.
        Changes::new()
    }
}

// ---------------------------------------------------------------------------
// Division
// ---------------------------------------------------------------------------

/// A stored division, scoped to one season and one conference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Division {
    pub id: i64,
    pub name: String,
    pub conference_id: i64,
    pub season_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DivisionCandidate {
    #[serde(default)]
    pub id: i64,
    pub name: Option<String>,
    pub conference_id: Option<i64>,
    pub season_id: Option<i64>,
}

impl Candidate for DivisionCandidate {
    type Record = Division;

    fn surrogate_id(&self) -> i64 {
        self.id
    }

    fn validate(&self) -> Result<(), ReconcileError> {
        require_text(&self.name, EntityKind::Division, "name")?;
        require_id(self.conference_id, EntityKind::Division, "conference_id")?;
        require_id(self.season_id, EntityKind::Division, "season_id")?;
        Ok(())
    }

    fn natural_key(&self) -> Result<NaturalKey, ReconcileError> {
        Ok(NaturalKey::new(
            EntityKind::Division,
            vec![
                KeyPart::from(require_id(self.season_id, EntityKind::Division, "season_id")?),
                KeyPart::from(require_id(
                    self.conference_id,
                    EntityKind::Division,
                    "conference_id",
                )?),
                KeyPart::from(require_text(&self.name, EntityKind::Division, "name")?),
            ],
        ))
    }

    fn references(&self) -> Vec<(EntityKind, i64)> {
        let mut refs = Vec::new();
        if let Some(id) = self.season_id {
            refs.push((EntityKind::Season, id));
        }
        if let Some(id) = self.conference_id {
            refs.push((EntityKind::Conference, id));
        }
        refs
    }

    fn to_record(&self) -> Result<Division, ReconcileError> {
        Ok(Division {
            id: 0,
            name: require_text(&self.name, EntityKind::Division, "name")?.to_string(),
            conference_id: require_id(self.conference_id, EntityKind::Division, "conference_id")?,
            season_id: require_id(self.season_id, EntityKind::Division, "season_id")?,
        })
    }

    fn merge_into(&self, _existing: &mut Division) -> Changes {
        Changes::new()
    }
}

// ---------------------------------------------------------------------------
// Team
// ---------------------------------------------------------------------------

/// A stored team. `full_name` is always `location + " " + name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: i64,
    /// City or region, e.g. "New York".
    pub location: String,
    /// Short name, e.g. "Jets".
    pub name: String,
    pub full_name: String,
    pub division_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamCandidate {
    #[serde(default)]
    pub id: i64,
    pub location: Option<String>,
    pub name: Option<String>,
    pub full_name: Option<String>,
    pub division_id: Option<i64>,
}

impl TeamCandidate {
    /// Build a candidate whose full name is derived from location and name.
    pub fn new(location: &str, name: &str, division_id: i64) -> Self {
        let location = location.trim();
        let name = name.trim();
        Self {
            id: 0,
            location: Some(location.to_string()),
            name: Some(name.to_string()),
            full_name: Some(format!("{location} {name}")),
            division_id: Some(division_id),
        }
    }

    /// `location + " " + name`. A supplied `full_name` must agree with it.
    fn derived_full_name(&self) -> Result<String, ReconcileError> {
        let location = require_text(&self.location, EntityKind::Team, "location")?;
        let name = require_text(&self.name, EntityKind::Team, "name")?;
        let derived = format!("{location} {name}");
        match self.full_name.as_deref().map(str::trim) {
            Some(found) if found != derived => Err(ReconcileError::InconsistentField {
                kind: EntityKind::Team,
                field: "full_name",
                expected: derived,
                found: found.to_string(),
            }),
            _ => Ok(derived),
        }
    }
}

impl Candidate for TeamCandidate {
    type Record = Team;

    fn surrogate_id(&self) -> i64 {
        self.id
    }

    fn validate(&self) -> Result<(), ReconcileError> {
        self.derived_full_name()?;
        require_id(self.division_id, EntityKind::Team, "division_id")?;
        Ok(())
    }

    fn natural_key(&self) -> Result<NaturalKey, ReconcileError> {
        Ok(NaturalKey::new(
            EntityKind::Team,
            vec![
                KeyPart::from(require_id(self.division_id, EntityKind::Team, "division_id")?),
                KeyPart::from(self.derived_full_name()?),
            ],
        ))
    }

    fn references(&self) -> Vec<(EntityKind, i64)> {
        self.division_id
            .map(|id| vec![(EntityKind::Division, id)])
            .unwrap_or_default()
    }

    fn to_record(&self) -> Result<Team, ReconcileError> {
        Ok(Team {
            id: 0,
            location: require_text(&self.location, EntityKind::Team, "location")?.to_string(),
            name: require_text(&self.name, EntityKind::Team, "name")?.to_string(),
            full_name: self.derived_full_name()?,
            division_id: require_id(self.division_id, EntityKind::Team, "division_id")?,
        })
    }

    fn merge_into(&self, existing: &mut Team) -> Changes {
        let mut changes = Changes::new();
        let location = self.location.as_ref().map(|s| s.trim().to_string());
        let name = self.name.as_ref().map(|s| s.trim().to_string());
        merge_field(&mut existing.location, &location, "location", &mut changes);
        merge_field(&mut existing.name, &name, "name", &mut changes);
        let full_name = Some(format!("{} {}", existing.location, existing.name));
        merge_field(&mut existing.full_name, &full_name, "full_name", &mut changes);
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_name_is_location_and_name() {
        let candidate = TeamCandidate::new(" New York ", "Jets", 2);
        assert_eq!(candidate.full_name.as_deref(), Some("New York Jets"));
        assert_eq!(candidate.location.as_deref(), Some("New York"));
    }

    #[test]
    fn team_requires_division() {
        let candidate = TeamCandidate {
            division_id: None,
            ..TeamCandidate::new("Buffalo", "Bills", 1)
        };
        let err = candidate.validate().unwrap_err();
        assert!(matches!(
            err,
            ReconcileError::MissingRequiredField {
                kind: EntityKind::Team,
                field: "division_id"
            }
        ));
    }

    #[test]
    fn team_key_is_division_then_full_name() {
        let key = TeamCandidate::new("Buffalo", "Bills", 7).natural_key().unwrap();
        assert_eq!(
            key.parts,
            vec![KeyPart::Int(7), KeyPart::Text("Buffalo Bills".into())]
        );
    }

    #[test]
    fn team_merge_is_noop_for_identical_data() {
        let mut stored = Team {
            id: 5,
            location: "Buffalo".into(),
            name: "Bills".into(),
            full_name: "Buffalo Bills".into(),
            division_id: 1,
        };
        let before = stored.clone();
        let changes = TeamCandidate::new("Buffalo", "Bills", 1).merge_into(&mut stored);
        assert!(changes.is_empty());
        assert_eq!(stored, before);
    }

    #[test]
    fn supplied_full_name_must_match_parts() {
        let candidate = TeamCandidate {
            full_name: Some("Zzz".into()),
            ..TeamCandidate::new("Miami", "Dolphins", 1)
        };
        match candidate.validate().unwrap_err() {
            ReconcileError::InconsistentField {
                field,
                expected,
                found,
                ..
            } => {
                assert_eq!(field, "full_name");
                assert_eq!(expected, "Miami Dolphins");
                assert_eq!(found, "Zzz");
            }
            other => panic!("expected InconsistentField, got: {other}"),
        }
        assert!(candidate.to_record().is_err());
    }

    #[test]
    fn full_name_is_derived_when_absent() {
        let candidate = TeamCandidate {
            full_name: None,
            ..TeamCandidate::new("Miami", "Dolphins", 1)
        };
        candidate.validate().unwrap();
        assert_eq!(candidate.to_record().unwrap().full_name, "Miami Dolphins");
        assert_eq!(
            candidate.natural_key().unwrap().parts[1],
            KeyPart::Text("Miami Dolphins".into())
        );
    }

    #[test]
    fn merge_keeps_full_name_in_step_with_parts() {
        let mut stored = Team {
            id: 5,
            location: "Buffalo".into(),
            name: "Bills".into(),
            full_name: "Buffalo Bills".into(),
            division_id: 1,
        };
        let candidate = TeamCandidate {
            full_name: None,
            ..TeamCandidate::new("Orchard Park", "Bills", 1)
        };
        let changes = candidate.merge_into(&mut stored);
        assert_eq!(changes, vec!["location", "full_name"]);
        assert_eq!(stored.full_name, "Orchard Park Bills");
    }

    #[test]
    fn division_references_season_and_conference() {
        let candidate = DivisionCandidate {
            id: 0,
            name: Some("AFC East".into()),
            conference_id: Some(1),
            season_id: Some(3),
        };
        assert_eq!(
            candidate.references(),
            vec![(EntityKind::Season, 3), (EntityKind::Conference, 1)]
        );
    }
}
