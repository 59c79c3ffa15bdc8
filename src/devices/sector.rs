// MIT License - Copyright (c) 2026 Peter Wright

use std::sync::OnceLock;

use regex::Regex;

use super::{LabelPredicate, map_label};

/// Id of the synthetic "Tous Secteurs" global row.
pub const GLOBAL_SECTOR_ID: &str = "0";

/// Arming state of a sector.
///
/// Wire codes: 0 disarmed (MHS), 1 armed total (MES), 2 armed partial A,
/// 3 armed partial B, 4 in alarm, -1 unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectorState {
    Disarmed,
    ArmedTotal,
    ArmedPartialA,
    ArmedPartialB,
    Alarm,
    Unknown,
}

// "mes partielle b" must be tested before the plain partial rule it contains.
const STATE_RULES: &[(LabelPredicate, SectorState)] = &[
    (|s| s.contains("mes totale"), SectorState::ArmedTotal),
    (
        |s| s.contains("mes partiel") && s.contains('b'),
        SectorState::ArmedPartialB,
    ),
    (|s| s.contains("mes partiel"), SectorState::ArmedPartialA),
    (
        |s| s.contains("mhs") || s.contains("désarm"),
        SectorState::Disarmed,
    ),
    (|s| s.contains("alarme"), SectorState::Alarm),
];

impl SectorState {
    pub fn from_label(label: &str) -> Self {
        map_label(STATE_RULES, SectorState::Unknown, label)
    }

    pub fn code(&self) -> i32 {
        match self {
            SectorState::Disarmed => 0,
            SectorState::ArmedTotal => 1,
            SectorState::ArmedPartialA => 2,
            SectorState::ArmedPartialB => 3,
            SectorState::Alarm => 4,
            SectorState::Unknown => -1,
        }
    }
}

/// An armable grouping of zones, as read from the home page.
#[derive(Debug, Clone)]
pub struct Sector {
    pub id: String,
    pub name: String,
    pub state: SectorState,
}

impl Sector {
    /// Parse a "Secteur <n> : <name>" cell into (id, name).
    pub fn parse_label(label: &str) -> Option<(String, String)> {
        static RE: OnceLock<Regex> = OnceLock::new();
        let re = RE
            .get_or_init(|| Regex::new(r"(?i)^Secteur\s+(\d+)\s*:\s*(.+)$").unwrap());
        let caps = re.captures(label.trim())?;
        Some((caps[1].to_string(), caps[2].trim().to_string()))
    }

    /// The synthetic global row covering every sector at once.
    pub fn global(state_label: &str) -> Self {
        Self {
            id: GLOBAL_SECTOR_ID.to_string(),
            name: "Tous Secteurs".to_string(),
            state: SectorState::from_label(state_label),
        }
    }
}
