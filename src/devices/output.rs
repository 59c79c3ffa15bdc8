// MIT License - Copyright (c) 2026 Peter Wright

/// Switch state of a panel output. Wire codes: 1 on, 0 off, -1 unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputState {
    On,
    Off,
    Unknown,
}

impl OutputState {
    /// Outputs use exact labels, not substrings: "on" would otherwise match
    /// half the French vocabulary ("fonctionnement", "maison", ...).
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "on" => OutputState::On,
            "off" => OutputState::Off,
            _ => OutputState::Unknown,
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            OutputState::On => 1,
            OutputState::Off => 0,
            OutputState::Unknown => -1,
        }
    }
}

/// A switchable panel output (siren, relay, ...).
#[derive(Debug, Clone)]
pub struct OutputDevice {
    pub id: String,
    pub name: String,
    pub state: OutputState,
    /// Raw state label as shown by the page, published verbatim.
    pub state_txt: String,
    /// Whether the row carried action buttons (user-switchable output).
    pub controllable: bool,
}

impl OutputDevice {
    pub fn new(name: &str, state_label: &str, controllable: bool) -> Self {
        Self {
            id: super::entity_id(name),
            name: name.to_string(),
            state: OutputState::from_label(state_label),
            state_txt: state_label.trim().to_string(),
            controllable,
        }
    }
}
