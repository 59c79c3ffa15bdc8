// MIT License - Copyright (c) 2026 Peter Wright

//! Scan results → publications.
//!
//! The engine compares each fresh record set against the last-published
//! snapshot and emits only the topics that changed, metadata before state.
//! Unparseable states (code -1) are never published at all: the sentinel is
//! suppressed here so no consumer ever sees a -1 payload.

use std::collections::HashMap;

use crate::config::{Category, FeatureFlags};
use crate::devices::{ControllerEntry, Door, OutputDevice, Sector, Zone};
use crate::snapshot::SnapshotStore;
use crate::topics::{entity_topic, etat_topic};

/// One MQTT publication, topic relative to the base topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
    pub topic: String,
    pub payload: String,
}

/// Diff engine for the fast state scan. Owned by that loop alone.
pub struct ScanEngine {
    information: FeatureFlags,
    stores: HashMap<Category, SnapshotStore>,
}

impl ScanEngine {
    pub fn new(information: FeatureFlags) -> Self {
        Self {
            information,
            stores: Category::ALL
                .into_iter()
                .map(|c| (c, SnapshotStore::new()))
                .collect(),
        }
    }

    fn push(
        &mut self,
        out: &mut Vec<Publication>,
        category: Category,
        id: &str,
        field: &str,
        payload: String,
    ) {
        let store = self.stores.entry(category).or_default();
        if store.update(id, field, &payload) {
            out.push(Publication {
                topic: entity_topic(category, id, field),
                payload,
            });
        }
    }

    pub fn diff_zones(&mut self, zones: &[Zone]) -> Vec<Publication> {
        let mut out = Vec::new();
        if !self.information.get(Category::Zones) {
            return out;
        }
        for z in zones {
            let id = z.id.clone();
            self.push(&mut out, Category::Zones, &id, "name", z.name.clone());
            self.push(&mut out, Category::Zones, &id, "sector", z.sector.clone());
            if z.state.code() >= 0 {
                self.push(&mut out, Category::Zones, &id, "state", z.state.code().to_string());
            }
            if z.entry.code() >= 0 {
                self.push(&mut out, Category::Zones, &id, "entree", z.entry.code().to_string());
            }
        }
        out
    }

    pub fn diff_sectors(&mut self, sectors: &[Sector]) -> Vec<Publication> {
        let mut out = Vec::new();
        if !self.information.get(Category::Secteurs) {
            return out;
        }
        for s in sectors {
            let id = s.id.clone();
            self.push(&mut out, Category::Secteurs, &id, "name", s.name.clone());
            if s.state.code() >= 0 {
                self.push(&mut out, Category::Secteurs, &id, "state", s.state.code().to_string());
            }
        }
        out
    }

    pub fn diff_doors(&mut self, doors: &[Door]) -> Vec<Publication> {
        let mut out = Vec::new();
        if !self.information.get(Category::Doors) {
            return out;
        }
        for d in doors {
            let id = d.id.clone();
            self.push(&mut out, Category::Doors, &id, "name", d.name.clone());
            self.push(&mut out, Category::Doors, &id, "zone", d.zone.clone());
            self.push(&mut out, Category::Doors, &id, "sector", d.sector.clone());
            if d.state.code() >= 0 {
                self.push(&mut out, Category::Doors, &id, "state", d.state.code().to_string());
            }
            if let Some(drs) = d.drs {
                self.push(&mut out, Category::Doors, &id, "drs", drs.to_string());
            }
            if let Some(dps) = d.dps {
                self.push(&mut out, Category::Doors, &id, "dps", dps.to_string());
            }
        }
        out
    }

    pub fn diff_outputs(&mut self, outputs: &[OutputDevice]) -> Vec<Publication> {
        let mut out = Vec::new();
        if !self.information.get(Category::Outputs) {
            return out;
        }
        for o in outputs {
            let id = o.id.clone();
            self.push(&mut out, Category::Outputs, &id, "name", o.name.clone());
            if o.state.code() >= 0 {
                self.push(&mut out, Category::Outputs, &id, "state", o.state.code().to_string());
            }
            if !o.state_txt.is_empty() {
                self.push(&mut out, Category::Outputs, &id, "state_txt", o.state_txt.clone());
            }
        }
        out
    }
}

/// Diff engine for the slow controller scan; its snapshot is private to
/// that loop.
#[derive(Default)]
pub struct ControllerScanEngine {
    store: SnapshotStore,
}

impl ControllerScanEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diff_entries(&mut self, entries: &[ControllerEntry]) -> Vec<Publication> {
        let mut out = Vec::new();
        for e in entries {
            if self.store.update(&e.section, &e.label, &e.value) {
                out.push(Publication {
                    topic: etat_topic(&e.section, &e.label),
                    payload: e.value.clone(),
                });
            }
        }
        out
    }
}
