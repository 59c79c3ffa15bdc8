// MIT License - Copyright (c) 2026 Peter Wright

use super::{LabelPredicate, entity_id, map_label};

/// Lock state of a door. Wire codes: 0 normal/locked, 1 unlocked, 4 alarm,
/// -1 unknown (never published).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorState {
    Normal,
    Unlocked,
    Alarm,
    Unknown,
}

// "déverrouillé" contains "verrouillé", so the unlocked rules come first.
const STATE_RULES: &[(LabelPredicate, DoorState)] = &[
    (|s| s.contains("déverrouill"), DoorState::Unlocked),
    (|s| s.contains("accès libre") || s.contains("acces libre"), DoorState::Unlocked),
    (|s| s.contains("verrouill") || s.contains("normal"), DoorState::Normal),
    (|s| s.contains("alarme"), DoorState::Alarm),
];

impl DoorState {
    pub fn from_label(label: &str) -> Self {
        map_label(STATE_RULES, DoorState::Unknown, label)
    }

    pub fn code(&self) -> i32 {
        match self {
            DoorState::Normal => 0,
            DoorState::Unlocked => 1,
            DoorState::Alarm => 4,
            DoorState::Unknown => -1,
        }
    }
}

/// An access-controlled opening with lock (`drs`) and contact (`dps`)
/// sensors.
#[derive(Debug, Clone)]
pub struct Door {
    pub id: String,
    pub name: String,
    pub zone: String,
    pub sector: String,
    pub state: DoorState,
    /// Lock relay state column, 0 or 1 when the page shows a code.
    pub drs: Option<i32>,
    /// Door position contact column, 0..4 when the page shows a code.
    pub dps: Option<i32>,
}

impl Door {
    pub fn new(
        name: &str,
        zone: &str,
        sector: &str,
        state_label: &str,
        drs_text: &str,
        dps_text: &str,
    ) -> Self {
        Self {
            id: entity_id(name),
            name: name.to_string(),
            zone: zone.to_string(),
            sector: sector.to_string(),
            state: DoorState::from_label(state_label),
            drs: parse_code(drs_text, 0..=1),
            dps: parse_code(dps_text, 0..=4),
        }
    }
}

/// Extract the first integer from a cell and keep it only when in range.
fn parse_code(text: &str, range: std::ops::RangeInclusive<i32>) -> Option<i32> {
    let digits: String = text
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    let value: i32 = digits.parse().ok()?;
    range.contains(&value).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_mapping() {
        assert_eq!(DoorState::from_label("Verrouillée").code(), 0);
        assert_eq!(DoorState::from_label("Normal").code(), 0);
        assert_eq!(DoorState::from_label("Déverrouillée").code(), 1);
        assert_eq!(DoorState::from_label("Accès libre").code(), 1);
        assert_eq!(DoorState::from_label("Alarme").code(), 4);
        assert_eq!(DoorState::from_label("").code(), -1);
    }

    #[test]
    fn test_unlocked_not_swallowed_by_locked_rule() {
        assert_eq!(DoorState::from_label("déverrouillée"), DoorState::Unlocked);
        assert_eq!(DoorState::from_label("verrouillée"), DoorState::Normal);
    }

    #[test]
    fn test_sensor_columns() {
        let d = Door::new("5 Entrée principale", "05", "1", "Verrouillée", "1", "2");
        assert_eq!(d.id, "5");
        assert_eq!(d.drs, Some(1));
        assert_eq!(d.dps, Some(2));
    }

    #[test]
    fn test_sensor_columns_out_of_range_or_textual() {
        let d = Door::new("Porte", "1", "1", "Normal", "7", "fermée");
        assert_eq!(d.id, "porte");
        assert_eq!(d.drs, None);
        assert_eq!(d.dps, None);
    }
}
