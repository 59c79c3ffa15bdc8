// MIT License - Copyright (c) 2026 Peter Wright

use super::{LabelPredicate, entity_id, map_label};

/// Entry-contact state of a zone. Wire code: 1 closed, 0 open, -1 unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Closed,
    Open,
    Unknown,
}

const ENTRY_RULES: &[(LabelPredicate, EntryState)] = &[
    (|s| s.contains("ferm"), EntryState::Closed),
    (|s| s.contains("ouvert"), EntryState::Open),
];

impl EntryState {
    pub fn from_label(label: &str) -> Self {
        map_label(ENTRY_RULES, EntryState::Unknown, label)
    }

    pub fn code(&self) -> i32 {
        match self {
            EntryState::Closed => 1,
            EntryState::Open => 0,
            EntryState::Unknown => -1,
        }
    }
}

/// Detection state of a zone. Wire code: 0 normal, 1 active, -1 unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneState {
    Normal,
    Active,
    Unknown,
}

const STATE_RULES: &[(LabelPredicate, ZoneState)] = &[
    (|s| s.contains("normal"), ZoneState::Normal),
    (|s| s.contains("activ"), ZoneState::Active),
];

impl ZoneState {
    pub fn from_label(label: &str) -> Self {
        map_label(STATE_RULES, ZoneState::Unknown, label)
    }

    pub fn code(&self) -> i32 {
        match self {
            ZoneState::Normal => 0,
            ZoneState::Active => 1,
            ZoneState::Unknown => -1,
        }
    }
}

/// An intrusion detection input, as read from the zone status table.
#[derive(Debug, Clone)]
pub struct Zone {
    pub id: String,
    pub name: String,
    pub sector: String,
    pub entry: EntryState,
    pub state: ZoneState,
}

impl Zone {
    pub fn new(name: &str, sector: &str, entry_label: &str, state_label: &str) -> Self {
        Self {
            id: entity_id(name),
            name: name.to_string(),
            sector: sector.to_string(),
            entry: EntryState::from_label(entry_label),
            state: ZoneState::from_label(state_label),
        }
    }
}
