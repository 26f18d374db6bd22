// Field-level merge and validation helpers used by every candidate type.

use crate::error::ReconcileError;

use super::EntityKind;

/// Names of the fields an update actually changed.
pub type Changes = Vec<&'static str>;

/// Overwrite `current` with the incoming value when one was provided and it
/// differs from what is stored. An absent value never touches `current`.
pub fn merge_field<T>(current: &mut T, incoming: &Option<T>, name: &'static str, changes: &mut Changes)
where
    T: PartialEq + Clone,
{
    if let Some(value) = incoming {
        if *current != *value {
            *current = value.clone();
            changes.push(name);
        }
    }
}

/// Same as [`merge_field`] for a nullable column. A provided value fills or
/// replaces the stored one; there is no way to clear a stored value.
pub fn merge_nullable<T>(
    current: &mut Option<T>,
    incoming: &Option<T>,
    name: &'static str,
    changes: &mut Changes,
) where
    T: PartialEq + Clone,
{
    if let Some(value) = incoming {
        if current.as_ref() != Some(value) {
            *current = Some(value.clone());
            changes.push(name);
        }
    }
}

/// Borrow a required field or fail with `MissingRequiredField`.
pub fn require<'a, T>(
    value: &'a Option<T>,
    kind: EntityKind,
    field: &'static str,
) -> Result<&'a T, ReconcileError> {
    value
        .as_ref()
        .ok_or(ReconcileError::MissingRequiredField { kind, field })
}

/// Like [`require`] for text, treating blank strings as missing.
pub fn require_text<'a>(
    value: &'a Option<String>,
    kind: EntityKind,
    field: &'static str,
) -> Result<&'a str, ReconcileError> {
    match value.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text),
        _ => Err(ReconcileError::MissingRequiredField { kind, field }),
    }
}

/// Like [`require`] for a foreign or natural-key id; zero means unset.
pub fn require_id(
    value: Option<i64>,
    kind: EntityKind,
    field: &'static str,
) -> Result<i64, ReconcileError> {
    match value {
        Some(id) if id > 0 => Ok(id),
        _ => Err(ReconcileError::MissingRequiredField { kind, field }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_value_leaves_field_untouched() {
        let mut stored = 17;
        let mut changes = Changes::new();
        merge_field(&mut stored, &None, "score", &mut changes);
        assert_eq!(stored, 17);
        assert!(changes.is_empty());
    }

    #[test]
    fn provided_value_overwrites_when_different() {
        let mut stored = 17;
        let mut changes = Changes::new();
        merge_field(&mut stored, &Some(21), "score", &mut changes);
        assert_eq!(stored, 21);
        assert_eq!(changes, vec!["score"]);
    }

    #[test]
    fn equal_value_is_not_a_change() {
        let mut stored = String::from("Bills");
        let mut changes = Changes::new();
        merge_field(&mut stored, &Some("Bills".to_string()), "name", &mut changes);
        assert!(changes.is_empty());
    }

    #[test]
    fn explicit_zero_is_applied() {
        let mut stored = 3;
        let mut changes = Changes::new();
        merge_field(&mut stored, &Some(0), "score", &mut changes);
        assert_eq!(stored, 0);
        assert_eq!(changes, vec!["score"]);
    }

    #[test]
    fn nullable_is_filled_but_never_cleared() {
        let mut stored: Option<f64> = None;
        let mut changes = Changes::new();
        merge_nullable(&mut stored, &Some(-3.5), "spread", &mut changes);
        assert_eq!(stored, Some(-3.5));

        merge_nullable(&mut stored, &None, "spread", &mut changes);
        assert_eq!(stored, Some(-3.5));
        assert_eq!(changes, vec!["spread"]);
    }

    #[test]
    fn blank_text_counts_as_missing() {
        let err = require_text(&Some("   ".into()), EntityKind::Team, "name").unwrap_err();
        assert!(matches!(
            err,
            ReconcileError::MissingRequiredField { field: "name", .. }
        ));
    }

    #[test]
    fn zero_id_counts_as_missing() {
        assert!(require_id(Some(0), EntityKind::Game, "season_id").is_err());
        assert_eq!(require_id(Some(4), EntityKind::Game, "season_id").unwrap(), 4);
    }
}
