// MIT License - Copyright (c) 2026 Peter Wright

//! HTML scraping of the panel's status pages.
//!
//! Every parser is a pure function from raw HTML to typed records. The SPC
//! firmware emits table soup, so extraction runs on regular expressions over
//! `gridtable` rows rather than a DOM: rows that do not match the expected
//! shape are dropped, never fatal. Labels are locale-French and decorated;
//! mapping them to codes lives in `devices`.

use std::sync::OnceLock;

use regex::Regex;

use crate::devices::{ControllerEntry, Door, OutputDevice, Sector, Zone};

fn table_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)<table[^>]*class\s*=\s*"[^"]*gridtable[^"]*"[^>]*>(.*?)</table>"#)
            .unwrap()
    })
}

fn row_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<tr[^>]*>(.*?)</tr>").unwrap())
}

fn cell_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<td[^>]*>(.*?)</td>").unwrap())
}

fn header_cell_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<th[^>]*>(.*?)</th>").unwrap())
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<[^>]*>").unwrap())
}

fn entity_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"&(#x?[0-9a-fA-F]+|[a-zA-Z]+);").unwrap())
}

fn button_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)<(?:input|button)[^>]*type\s*=\s*["']?(?:submit|button)"#).unwrap()
    })
}

/// First `gridtable` on the page, or `None`.
fn gridtable(html: &str) -> Option<&str> {
    table_re()
        .captures(html)
        .map(|c| c.get(1).unwrap().as_str())
}

fn rows(fragment: &str) -> Vec<&str> {
    row_re()
        .captures_iter(fragment)
        .map(|c| c.get(1).unwrap().as_str())
        .collect()
}

fn cells(row: &str) -> Vec<String> {
    cell_re()
        .captures_iter(row)
        .map(|c| text(c.get(1).unwrap().as_str()))
        .collect()
}

fn header_cells(row: &str) -> Vec<String> {
    header_cell_re()
        .captures_iter(row)
        .map(|c| text(c.get(1).unwrap().as_str()))
        .collect()
}

/// Visible text of an HTML fragment: tags stripped, entities decoded,
/// whitespace collapsed.
pub fn text(fragment: &str) -> String {
    let stripped = tag_re().replace_all(fragment, " ");
    let decoded = entity_re().replace_all(&stripped, |caps: &regex::Captures<'_>| {
        decode_entity(&caps[1]).unwrap_or_else(|| caps[0].to_string())
    });
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entity(name: &str) -> Option<String> {
    if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
        let code = u32::from_str_radix(hex, 16).ok()?;
        return char::from_u32(code).map(String::from);
    }
    if let Some(dec) = name.strip_prefix('#') {
        let code: u32 = dec.parse().ok()?;
        return char::from_u32(code).map(String::from);
    }
    let ch = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => ' ',
        "eacute" => 'é',
        "egrave" => 'è',
        "ecirc" => 'ê',
        "agrave" => 'à',
        "acirc" => 'â',
        "ccedil" => 'ç',
        "ocirc" => 'ô',
        "ucirc" => 'û',
        "ugrave" => 'ù',
        "icirc" => 'î',
        "iuml" => 'ï',
        _ => return None,
    };
    Some(ch.to_string())
}

/// Zones from `page=status_zones`: first `gridtable`, one row per zone.
///
/// Columns: name, sector, (type), (area), entry contact, state. Rows with
/// fewer than 6 cells or an empty name are skipped.
pub fn parse_zones(html: &str) -> Vec<Zone> {
    let Some(table) = gridtable(html) else {
        return Vec::new();
    };
    rows(table)
        .iter()
        .filter_map(|row| {
            let c = cells(row);
            if c.len() < 6 || c[0].is_empty() {
                return None;
            }
            Some(Zone::new(&c[0], &c[1], &c[4], &c[5]))
        })
        .collect()
}

/// Sectors from `page=spc_home`: any row whose second cell reads
/// "Secteur <n> : <name>", plus the implicit "Tous Secteurs" global row
/// emitted under id 0.
pub fn parse_sectors(html: &str) -> Vec<Sector> {
    let mut sectors = Vec::new();
    for row in rows(html) {
        let c = cells(row);
        if c.len() < 3 {
            continue;
        }
        let label = &c[1];
        let state_label = &c[2];
        if label.to_lowercase().starts_with("tous secteurs") {
            sectors.push(Sector::global(state_label));
        } else if let Some((id, name)) = Sector::parse_label(label) {
            sectors.push(Sector {
                id,
                name,
                state: crate::devices::SectorState::from_label(state_label),
            });
        }
    }
    sectors
}

/// Doors from `page=status_doors`: first `gridtable`.
///
/// Columns: name, zone, sector, state, drs (lock relay), dps (contact).
pub fn parse_doors(html: &str) -> Vec<Door> {
    let Some(table) = gridtable(html) else {
        return Vec::new();
    };
    rows(table)
        .iter()
        .filter_map(|row| {
            let c = cells(row);
            if c.len() < 6 || c[0].is_empty() {
                return None;
            }
            Some(Door::new(&c[0], &c[1], &c[2], &c[3], &c[4], &c[5]))
        })
        .collect()
}

/// Outputs from `page=status_outputs`: first `gridtable`.
///
/// Columns: name, raw state label; a submit/button input in the row marks
/// the output as user-switchable.
pub fn parse_outputs(html: &str) -> Vec<OutputDevice> {
    let Some(table) = gridtable(html) else {
        return Vec::new();
    };
    rows(table)
        .iter()
        .filter_map(|row| {
            let c = cells(row);
            if c.len() < 2 || c[0].is_empty() {
                return None;
            }
            Some(OutputDevice::new(&c[0], &c[1], button_re().is_match(row)))
        })
        .collect()
}

/// Controller status from `page=controller_status`.
///
/// Section headers are header rows (`th`) or single-cell rows; each
/// following two-cell row is a (label, value) pair in that section.
pub fn parse_controller(html: &str) -> Vec<ControllerEntry> {
    let mut entries = Vec::new();
    let mut section = "general".to_string();
    for row in rows(html) {
        let c = cells(row);
        if c.len() >= 2 {
            if !c[0].is_empty() {
                entries.push(ControllerEntry::new(&section, &c[0], &c[1]));
            }
            continue;
        }
        let header = if c.len() == 1 {
            c[0].clone()
        } else {
            header_cells(row).join(" ").trim().to_string()
        };
        if !header.is_empty() {
            section = header;
        }
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::{DoorState, OutputState, SectorState, ZoneState};

    const ZONES_PAGE: &str = r#"
<html><body>
<table class="gridtable">
 <tr><th>Zone</th><th>Secteur</th><th>Type</th><th>Zone EV</th><th>Entr&eacute;e</th><th>&Eacute;tat</th></tr>
 <tr><td>01 Hall</td><td>1</td><td>Alarme</td><td>-</td><td>Ferm&eacute;e</td><td>Normal</td></tr>
 <tr><td>02 Salon</td><td>1</td><td>Alarme</td><td>-</td><td>Ouverte</td><td>Activ&eacute;e</td></tr>
 <tr><td></td><td>1</td><td>-</td><td>-</td><td>-</td><td>Normal</td></tr>
 <tr><td>incomplete</td></tr>
</table>
</body></html>"#;

    #[test]
    fn test_parse_zones() {
        let zones = parse_zones(ZONES_PAGE);
        assert_eq!(zones.len(), 2);
        assert_eq!(zones[0].id, "01");
        assert_eq!(zones[0].name, "01 Hall");
        assert_eq!(zones[0].sector, "1");
        assert_eq!(zones[0].entry.code(), 1);
        assert_eq!(zones[0].state, ZoneState::Normal);
        assert_eq!(zones[1].state, ZoneState::Active);
        assert_eq!(zones[1].entry.code(), 0);
    }

    #[test]
    fn test_parse_zones_without_table() {
        assert!(parse_zones("<html><body>rien</body></html>").is_empty());
        assert!(parse_zones("").is_empty());
    }

    const HOME_PAGE: &str = r#"
<html><body>
<table>
 <tr><td><img src="x.gif"></td><td>Tous Secteurs</td><td>MHS</td><td>b</td></tr>
 <tr><td><img src="x.gif"></td><td>Secteur 1 : Maison</td><td>MES Totale</td><td>b</td></tr>
 <tr><td><img src="x.gif"></td><td>Secteur 2 : Garage</td><td>MES Partielle B</td><td>b</td></tr>
 <tr><td>a</td><td>Autre ligne</td><td>x</td></tr>
</table>
<p>spc42</p>
</body></html>"#;

    #[test]
    fn test_parse_sectors() {
        let sectors = parse_sectors(HOME_PAGE);
        assert_eq!(sectors.len(), 3);
        assert_eq!(sectors[0].id, "0");
        assert_eq!(sectors[0].state, SectorState::Disarmed);
        assert_eq!(sectors[1].id, "1");
        assert_eq!(sectors[1].name, "Maison");
        assert_eq!(sectors[1].state, SectorState::ArmedTotal);
        assert_eq!(sectors[2].state, SectorState::ArmedPartialB);
    }

    const DOORS_PAGE: &str = r#"
<table class="gridtable">
 <tr><th>Porte</th><th>Zone</th><th>Secteur</th><th>&Eacute;tat</th><th>DRS</th><th>DPS</th></tr>
 <tr><td>5 Entr&eacute;e principale</td><td>05</td><td>1</td><td>Verrouill&eacute;e</td><td>0</td><td>1</td></tr>
 <tr><td>6 Local technique</td><td>06</td><td>2</td><td>D&eacute;verrouill&eacute;e</td><td>1</td><td>3</td></tr>
</table>"#;

    #[test]
    fn test_parse_doors() {
        let doors = parse_doors(DOORS_PAGE);
        assert_eq!(doors.len(), 2);
        assert_eq!(doors[0].id, "5");
        assert_eq!(doors[0].state, DoorState::Normal);
        assert_eq!(doors[0].drs, Some(0));
        assert_eq!(doors[0].dps, Some(1));
        assert_eq!(doors[1].state, DoorState::Unlocked);
    }

    const OUTPUTS_PAGE: &str = r#"
<table class="gridtable">
 <tr><th>Sortie</th><th>&Eacute;tat</th><th></th></tr>
 <tr><td>2 Sir&egrave;ne ext</td><td>Off</td>
     <td><form action="secure.htm?session=0x1&page=status_outputs">
       <input type="hidden" name="id" value="2">
       <input type="submit" name="on" value="On">
       <input type="submit" name="off" value="Off">
     </form></td></tr>
 <tr><td>3 Voyant</td><td>Inconnu</td><td></td></tr>
</table>"#;

    #[test]
    fn test_parse_outputs() {
        let outputs = parse_outputs(OUTPUTS_PAGE);
        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[0].id, "2");
        assert_eq!(outputs[0].state, OutputState::Off);
        assert_eq!(outputs[0].state_txt, "Off");
        assert!(outputs[0].controllable);
        assert_eq!(outputs[1].state, OutputState::Unknown);
        assert!(!outputs[1].controllable);
    }

    const CONTROLLER_PAGE: &str = r#"
<table class="gridtable">
 <tr><th colspan="2">Alimentation</th></tr>
 <tr><td>Tension batterie</td><td>13.7 V</td></tr>
 <tr><td>Secteur 230V</td><td>Pr&eacute;sent</td></tr>
 <tr><th colspan="2">Liaisons</th></tr>
 <tr><td>Ethernet</td><td>Connect&eacute;</td></tr>
 <tr><td></td><td>ignored</td></tr>
</table>"#;

    #[test]
    fn test_parse_controller() {
        let entries = parse_controller(CONTROLLER_PAGE);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].section, "Alimentation");
        assert_eq!(entries[0].label, "Tension batterie");
        assert_eq!(entries[0].value, "13.7 V");
        assert_eq!(entries[2].section, "Liaisons");
        assert_eq!(entries[2].value, "Connecté");
    }

    #[test]
    fn test_text_strips_and_decodes() {
        assert_eq!(text("<b>Ferm&eacute;e</b>"), "Fermée");
        assert_eq!(text("  a \n <i>b</i>  "), "a b");
        assert_eq!(text("&#233;t&#xE9;"), "été");
        assert_eq!(text("x &unknown; y"), "x &unknown; y");
    }
}
