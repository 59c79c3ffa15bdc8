// MIT License - Copyright (c) 2026 Peter Wright

pub mod controller;
pub mod door;
pub mod output;
pub mod sector;
pub mod zone;

pub use controller::ControllerEntry;
pub use door::{Door, DoorState};
pub use output::{OutputDevice, OutputState};
pub use sector::{Sector, SectorState};
pub use zone::{EntryState, Zone, ZoneState};

/// Predicate over a trimmed, lowercased status label.
pub(crate) type LabelPredicate = fn(&str) -> bool;

/// Walk an ordered rule list and return the first matching code.
///
/// Rule order is significant: more specific labels ("mes partielle b",
/// "déverrouillé") must be listed before the broader ones they contain.
pub(crate) fn map_label<T: Copy>(rules: &[(LabelPredicate, T)], unknown: T, label: &str) -> T {
    let s = label.trim().to_lowercase();
    rules
        .iter()
        .find(|(matches, _)| matches(&s))
        .map(|(_, code)| *code)
        .unwrap_or(unknown)
}

/// Derive a stable entity id from a display name.
///
/// The leading digit run wins ("12 Entrée Hall" → "12"); otherwise the name
/// is slugged ("Porte Garage" → "porte_garage"); an empty name maps to
/// "unknown".
pub fn entity_id(name: &str) -> String {
    let trimmed = name.trim();
    let digits: String = trimmed.chars().take_while(char::is_ascii_digit).collect();
    if !digits.is_empty() {
        return digits;
    }

    let mut slug = String::with_capacity(trimmed.len());
    let mut last_was_sep = true;
    for c in trimmed.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_was_sep = false;
        } else if !last_was_sep {
            slug.push('_');
            last_was_sep = true;
        }
    }
    let slug = slug.trim_matches('_').to_string();
    if slug.is_empty() { "unknown".to_string() } else { slug }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_numeric_prefix() {
        assert_eq!(entity_id("12 Entrée Hall"), "12");
        assert_eq!(entity_id("01 Hall"), "01");
        assert_eq!(entity_id("  7 Cave"), "7");
    }

    #[test]
    fn test_entity_id_slug() {
        assert_eq!(entity_id("Porte Garage"), "porte_garage");
        assert_eq!(entity_id("Sortie (secours)"), "sortie_secours");
    }

    #[test]
    fn test_entity_id_empty() {
        assert_eq!(entity_id(""), "unknown");
        assert_eq!(entity_id("   "), "unknown");
        assert_eq!(entity_id("---"), "unknown");
    }

    #[test]
    fn test_entity_id_accents_collapse() {
        // Accented characters are outside the slug alphabet, like the
        // original id scheme.
        assert_eq!(entity_id("Entrée"), "entr_e");
    }
}
