// Team-name resolution for game files.
//
// A games file names teams either by full name ("Buffalo Bills") or by short
// name ("Bills"). One strategy is chosen per upload, either from
// configuration or by checking every name in the file.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::Team;

use super::TranslationError;

/// How team names in a file map to stored teams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TeamNameStrategy {
    FullName,
    ShortName,
}

impl TeamNameStrategy {
    fn key<'t>(&self, team: &'t Team) -> &'t str {
        match self {
            TeamNameStrategy::FullName => &team.full_name,
            TeamNameStrategy::ShortName => &team.name,
        }
    }
}

/// The configured choice: a fixed strategy or detection from the file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamNaming {
    #[default]
    Detect,
    Full,
    Short,
}

impl FromStr for TeamNaming {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "detect" => Ok(TeamNaming::Detect),
            "full" => Ok(TeamNaming::Full),
            "short" => Ok(TeamNaming::Short),
            other => Err(format!("unknown team naming '{other}' (expected detect, full or short)")),
        }
    }
}

impl fmt::Display for TeamNaming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TeamNaming::Detect => "detect",
            TeamNaming::Full => "full",
            TeamNaming::Short => "short",
        })
    }
}

#[derive(Debug, Clone)]
enum Slot {
    One(Team),
    Ambiguous,
}

/// Name-to-team lookup built once per upload.
#[derive(Debug, Clone)]
pub struct TeamResolver {
    strategy: TeamNameStrategy,
    index: HashMap<String, Slot>,
}

impl TeamResolver {
    pub fn new(teams: &[Team], strategy: TeamNameStrategy) -> Self {
        let mut index: HashMap<String, Slot> = HashMap::with_capacity(teams.len());
        for team in teams {
            match index.entry(strategy.key(team).to_string()) {
                Entry::Vacant(slot) => {
                    slot.insert(Slot::One(team.clone()));
                }
                Entry::Occupied(mut slot) => {
                    if matches!(slot.get(), Slot::One(existing) if existing.id != team.id) {
                        slot.insert(Slot::Ambiguous);
                    }
                }
            }
        }
        Self { strategy, index }
    }

    /// Build a resolver for the configured naming. `names` is every team
    /// name appearing in the file; it is only consulted for detection.
    pub fn for_naming<'n>(
        teams: &[Team],
        naming: TeamNaming,
        names: impl IntoIterator<Item = &'n str>,
    ) -> Result<Self, TranslationError> {
        let strategy = match naming {
            TeamNaming::Full => TeamNameStrategy::FullName,
            TeamNaming::Short => TeamNameStrategy::ShortName,
            TeamNaming::Detect => detect_strategy(teams, names)?,
        };
        Ok(Self::new(teams, strategy))
    }

    pub fn strategy(&self) -> TeamNameStrategy {
        self.strategy
    }

    pub fn resolve(&self, name: &str) -> Result<&Team, TranslationError> {
        let name = name.trim();
        match self.index.get(name) {
            Some(Slot::One(team)) => Ok(team),
            Some(Slot::Ambiguous) => Err(TranslationError::AmbiguousTeam(name.to_string())),
            None => Err(TranslationError::UnknownTeam(name.to_string())),
        }
    }
}

/// Pick the strategy every resolvable name agrees on. Names matching only a
/// full name and names matching only a short name in the same file are an
/// error. Unknown names do not vote; they fail later on their own rows.
fn detect_strategy<'n>(
    teams: &[Team],
    names: impl IntoIterator<Item = &'n str>,
) -> Result<TeamNameStrategy, TranslationError> {
    let mut full_only: Option<&str> = None;
    let mut short_only: Option<&str> = None;

    for name in names {
        let name = name.trim();
        let is_full = teams.iter().any(|t| t.full_name == name);
        let is_short = teams.iter().any(|t| t.name == name);
        match (is_full, is_short) {
            (true, false) => {
                full_only.get_or_insert(name);
            }
            (false, true) => {
                short_only.get_or_insert(name);
            }
            _ => {}
        }
    }

    let strategy = match (full_only, short_only) {
        (Some(full), Some(short)) => {
            return Err(TranslationError::MixedTeamNaming {
                full: full.to_string(),
                short: short.to_string(),
            })
        }
        (None, Some(_)) => TeamNameStrategy::ShortName,
        _ => TeamNameStrategy::FullName,
    };
    debug!(?strategy, "detected team naming");
    Ok(strategy)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team(id: i64, location: &str, name: &str) -> Team {
        Team {
            id,
            location: location.into(),
            name: name.into(),
            full_name: format!("{location} {name}"),
            division_id: 1,
        }
    }

    fn league() -> Vec<Team> {
        vec![
            team(1, "Buffalo", "Bills"),
            team(2, "Los Angeles", "Rams"),
            team(3, "New York", "Jets"),
            team(4, "New York", "Giants"),
        ]
    }

    #[test]
    fn detects_full_names_from_every_row() {
        let teams = league();
        let resolver = TeamResolver::for_naming(
            &teams,
            TeamNaming::Detect,
            ["Buffalo Bills", "Los Angeles Rams", "New York Jets"],
        )
        .unwrap();
        assert_eq!(resolver.strategy(), TeamNameStrategy::FullName);
        assert_eq!(resolver.resolve("New York Jets").unwrap().id, 3);
    }

    #[test]
    fn detects_short_names_even_when_first_name_is_unknown() {
        let teams = league();
        let resolver =
            TeamResolver::for_naming(&teams, TeamNaming::Detect, ["Raiders", "Bills", "Rams"])
                .unwrap();
        assert_eq!(resolver.strategy(), TeamNameStrategy::ShortName);
        assert_eq!(resolver.resolve("Rams").unwrap().id, 2);
        assert_eq!(
            resolver.resolve("Raiders").unwrap_err(),
            TranslationError::UnknownTeam("Raiders".into())
        );
    }

    #[test]
    fn mixed_naming_fails_loudly() {
        let teams = league();
        let err = TeamResolver::for_naming(
            &teams,
            TeamNaming::Detect,
            ["Buffalo Bills", "Rams", "New York Jets"],
        )
        .unwrap_err();
        assert_eq!(
            err,
            TranslationError::MixedTeamNaming {
                full: "Buffalo Bills".into(),
                short: "Rams".into(),
            }
        );
    }

    #[test]
    fn fixed_strategy_ignores_names() {
        let teams = league();
        let resolver =
            TeamResolver::for_naming(&teams, TeamNaming::Short, ["Buffalo Bills"]).unwrap();
        assert_eq!(resolver.strategy(), TeamNameStrategy::ShortName);
        assert!(resolver.resolve("Buffalo Bills").is_err());
    }

    #[test]
    fn duplicate_short_names_are_ambiguous() {
        let mut teams = league();
        teams.push(team(5, "Carolina", "Jets"));
        let resolver = TeamResolver::new(&teams, TeamNameStrategy::ShortName);
        assert_eq!(
            resolver.resolve("Jets").unwrap_err(),
            TranslationError::AmbiguousTeam("Jets".into())
        );
        assert_eq!(resolver.resolve(" Giants ").unwrap().id, 4);
    }

    #[test]
    fn team_naming_parses_case_insensitively() {
        assert_eq!("Detect".parse::<TeamNaming>().unwrap(), TeamNaming::Detect);
        assert_eq!("short".parse::<TeamNaming>().unwrap(), TeamNaming::Short);
        assert!("nickname".parse::<TeamNaming>().is_err());
    }
}
