// MIT License - Copyright (c) 2026 Peter Wright

//! MQTT command payloads and their translation into panel form submissions.
//!
//! A command names an entity and an action; the panel only understands the
//! form posts its own web UI makes. The router therefore fetches the page
//! carrying the action buttons, finds the form that belongs to the entity,
//! and replays it with the wanted button — the target URL and hidden fields
//! are always taken from the live page, never hardcoded.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::config::Category;
use crate::constants::{PAGE_DOORS, PAGE_HOME, PAGE_OUTPUTS, PAGE_ZONES};

/// Acknowledgement payloads published on `<category>/<id>/command_result`.
pub mod ack {
    use crate::error::SpcError;

    pub const BAD_PAYLOAD: &str = "error:bad-payload";
    pub const CONTROL_DISABLED: &str = "error:control-disabled";
    pub const NO_SESSION: &str = "error:no-session";
    pub const NETWORK: &str = "error:network";
    pub const OVERLOADED: &str = "error:overloaded";
    pub const NOT_FOUND: &str = "error:not-found";

    pub fn http(code: u16) -> String {
        format!("error:http-{code}")
    }

    /// Classify an execution failure into its acknowledgement payload.
    pub fn for_error(e: &SpcError) -> String {
        match e {
            SpcError::NoSession => NO_SESSION.to_string(),
            SpcError::Status { code } => http(*code),
            SpcError::ActionNotFound { .. } => NOT_FOUND.to_string(),
            _ => NETWORK.to_string(),
        }
    }
}

/// Sector arming actions (MHS = disarm, MES = arm).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectorCommand {
    Mhs,
    Mes,
    PartA,
    PartB,
}

impl SectorCommand {
    /// The sector state code this action leads to.
    pub fn state_code(&self) -> i32 {
        match self {
            SectorCommand::Mhs => 0,
            SectorCommand::Mes => 1,
            SectorCommand::PartA => 2,
            SectorCommand::PartB => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorCommand {
    Normal,
    Lock,
    Unlock,
    Pulse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputCommand {
    On,
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneCommand {
    Inhibit,
    Uninhibit,
    Isolate,
    Unisolate,
    TestJdb,
    Restore,
}

/// A validated command for one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandAction {
    Sector(SectorCommand),
    Door(DoorCommand),
    Output(OutputCommand),
    Zone(ZoneCommand),
}

impl CommandAction {
    /// Validate a `set` payload for a category. Matching is case-insensitive
    /// with surrounding whitespace trimmed; anything else is a bad payload.
    pub fn parse(category: Category, payload: &str) -> Option<Self> {
        let p = payload.trim().to_lowercase();
        match category {
            Category::Secteurs => {
                let cmd = match p.as_str() {
                    "0" | "mhs" => SectorCommand::Mhs,
                    "1" | "mes" => SectorCommand::Mes,
                    "2" | "part" => SectorCommand::PartA,
                    "3" | "partb" => SectorCommand::PartB,
                    _ => return None,
                };
                Some(CommandAction::Sector(cmd))
            }
            Category::Doors => {
                let cmd = match p.as_str() {
                    "normal" => DoorCommand::Normal,
                    "lock" => DoorCommand::Lock,
                    "unlock" => DoorCommand::Unlock,
                    "pulse" => DoorCommand::Pulse,
                    _ => return None,
                };
                Some(CommandAction::Door(cmd))
            }
            Category::Outputs => {
                let cmd = match p.as_str() {
                    "1" | "on" => OutputCommand::On,
                    "0" | "off" => OutputCommand::Off,
                    _ => return None,
                };
                Some(CommandAction::Output(cmd))
            }
            Category::Zones => {
                let cmd = match p.as_str() {
                    "inhibit" => ZoneCommand::Inhibit,
                    "uninhibit" => ZoneCommand::Uninhibit,
                    "isolate" => ZoneCommand::Isolate,
                    "unisolate" => ZoneCommand::Unisolate,
                    "testjdb" => ZoneCommand::TestJdb,
                    "restore" => ZoneCommand::Restore,
                    _ => return None,
                };
                Some(CommandAction::Zone(cmd))
            }
        }
    }

    pub fn category(&self) -> Category {
        match self {
            CommandAction::Sector(_) => Category::Secteurs,
            CommandAction::Door(_) => Category::Doors,
            CommandAction::Output(_) => Category::Outputs,
            CommandAction::Zone(_) => Category::Zones,
        }
    }

    /// The protected page carrying this category's action buttons.
    pub fn control_page(&self) -> &'static str {
        match self.category() {
            Category::Secteurs => PAGE_HOME,
            Category::Zones => PAGE_ZONES,
            Category::Doors => PAGE_DOORS,
            Category::Outputs => PAGE_OUTPUTS,
        }
    }

    /// Name of the submit button the web UI uses for this action.
    pub fn button(&self) -> &'static str {
        match self {
            CommandAction::Sector(SectorCommand::Mhs) => "mhs",
            CommandAction::Sector(SectorCommand::Mes) => "mes",
            CommandAction::Sector(SectorCommand::PartA) => "parta",
            CommandAction::Sector(SectorCommand::PartB) => "partb",
            CommandAction::Door(DoorCommand::Normal) => "normal",
            CommandAction::Door(DoorCommand::Lock) => "lock",
            CommandAction::Door(DoorCommand::Unlock) => "unlock",
            CommandAction::Door(DoorCommand::Pulse) => "pulse",
            CommandAction::Output(OutputCommand::On) => "on",
            CommandAction::Output(OutputCommand::Off) => "off",
            CommandAction::Zone(ZoneCommand::Inhibit) => "inhibit",
            CommandAction::Zone(ZoneCommand::Uninhibit) => "uninhibit",
            CommandAction::Zone(ZoneCommand::Isolate) => "isolate",
            CommandAction::Zone(ZoneCommand::Unisolate) => "unisolate",
            CommandAction::Zone(ZoneCommand::TestJdb) => "testjdb",
            CommandAction::Zone(ZoneCommand::Restore) => "restore",
        }
    }

    /// Success acknowledgement: the resulting state code for sectors, the
    /// textual action for everything else.
    pub fn ok_ack(&self) -> String {
        match self {
            CommandAction::Sector(cmd) => format!("ok:{}", cmd.state_code()),
            _ => format!("ok:{}", self.button()),
        }
    }
}

/// A form replayed against the panel: target URL plus the encoded fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelForm {
    pub action: String,
    pub fields: Vec<(String, String)>,
}

fn form_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<form\b([^>]*)>(.*?)</form>").unwrap())
}

fn input_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<input\b[^>]*>").unwrap())
}

fn attr_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"([a-zA-Z-]+)\s*=\s*["']([^"']*)["']"#).unwrap())
}

fn attrs(tag: &str) -> HashMap<String, String> {
    attr_re()
        .captures_iter(tag)
        .map(|c| (c[1].to_lowercase(), c[2].to_string()))
        .collect()
}

/// Find the form on `html` that belongs to `entity_id` and carries a submit
/// button named `button`; return its action URL, hidden fields and the
/// button itself, ready to POST.
///
/// A form belongs to an entity when one of its hidden inputs has the entity
/// id as value — that is how the SPC pages tell their per-row forms apart.
pub fn discover_action_form(html: &str, entity_id: &str, button: &str) -> Option<PanelForm> {
    for form in form_re().captures_iter(html) {
        let form_attrs = attrs(form.get(1).unwrap().as_str());
        let body = form.get(2).unwrap().as_str();

        let mut fields = Vec::new();
        let mut belongs = false;
        let mut pressed: Option<(String, String)> = None;

        for input in input_re().find_iter(body) {
            let a = attrs(input.as_str());
            let kind = a.get("type").map(String::as_str).unwrap_or("text");
            let name = a.get("name").cloned().unwrap_or_default();
            let value = a.get("value").cloned().unwrap_or_default();
            match kind.to_lowercase().as_str() {
                "hidden" => {
                    if value == entity_id {
                        belongs = true;
                    }
                    if !name.is_empty() {
                        fields.push((name, value));
                    }
                }
                "submit" | "button" => {
                    if name.eq_ignore_ascii_case(button) {
                        let value = if value.is_empty() { "1".to_string() } else { value };
                        pressed = Some((name, value));
                    }
                }
                _ => {}
            }
        }

        if let (true, Some(pressed)) = (belongs, pressed) {
            let action = form_attrs.get("action").cloned().unwrap_or_default();
            if action.is_empty() {
                continue;
            }
            fields.push(pressed);
            return Some(PanelForm { action, fields });
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sector_payloads() {
        for (payload, expected) in [
            ("0", SectorCommand::Mhs),
            ("mhs", SectorCommand::Mhs),
            ("MES", SectorCommand::Mes),
            ("1", SectorCommand::Mes),
            (" part ", SectorCommand::PartA),
            ("partb", SectorCommand::PartB),
            ("3", SectorCommand::PartB),
        ] {
            assert_eq!(
                CommandAction::parse(Category::Secteurs, payload),
                Some(CommandAction::Sector(expected)),
                "payload {payload:?}"
            );
        }
        assert!(CommandAction::parse(Category::Secteurs, "4").is_none());
        assert!(CommandAction::parse(Category::Secteurs, "arm").is_none());
    }

    #[test]
    fn test_door_zone_output_payloads() {
        assert_eq!(
            CommandAction::parse(Category::Doors, "Unlock"),
            Some(CommandAction::Door(DoorCommand::Unlock))
        );
        assert_eq!(
            CommandAction::parse(Category::Outputs, "1"),
            Some(CommandAction::Output(OutputCommand::On))
        );
        assert_eq!(
            CommandAction::parse(Category::Zones, "testjdb"),
            Some(CommandAction::Zone(ZoneCommand::TestJdb))
        );
        assert!(CommandAction::parse(Category::Zones, "wiggle").is_none());
        assert!(CommandAction::parse(Category::Outputs, "toggle").is_none());
        assert!(CommandAction::parse(Category::Doors, "").is_none());
    }

    #[test]
    fn test_ok_acks() {
        assert_eq!(
            CommandAction::Sector(SectorCommand::Mes).ok_ack(),
            "ok:1"
        );
        assert_eq!(
            CommandAction::Sector(SectorCommand::PartB).ok_ack(),
            "ok:3"
        );
        assert_eq!(CommandAction::Door(DoorCommand::Unlock).ok_ack(), "ok:unlock");
        assert_eq!(CommandAction::Output(OutputCommand::On).ok_ack(), "ok:on");
        assert_eq!(CommandAction::Zone(ZoneCommand::Inhibit).ok_ack(), "ok:inhibit");
    }

    #[test]
    fn test_error_ack_classification() {
        use crate::error::SpcError;
        assert_eq!(ack::for_error(&SpcError::NoSession), "error:no-session");
        assert_eq!(ack::for_error(&SpcError::Status { code: 503 }), "error:http-503");
        assert_eq!(
            ack::for_error(&SpcError::Io(std::io::Error::from(
                std::io::ErrorKind::TimedOut
            ))),
            "error:network"
        );
    }

    const HOME_WITH_FORMS: &str = r#"
<tr><td>Secteur 2 : Maison</td><td>MHS</td><td>
<form action="secure.htm?session=0x1&page=spc_home" method="post">
  <input type="hidden" name="area" value="2">
  <input type="hidden" name="csrf" value="abc">
  <input type="submit" name="mes" value="MES Totale">
  <input type="submit" name="mhs" value="MHS">
</form>
</td></tr>
<tr><td>Secteur 3 : Garage</td><td>MHS</td><td>
<form action="secure.htm?session=0x1&page=spc_home" method="post">
  <input type="hidden" name="area" value="3">
  <input type="submit" name="mes" value="MES Totale">
</form>
</td></tr>"#;

    #[test]
    fn test_discover_action_form() {
        let form = discover_action_form(HOME_WITH_FORMS, "2", "mes").unwrap();
        assert_eq!(form.action, "secure.htm?session=0x1&page=spc_home");
        assert!(form.fields.contains(&("area".to_string(), "2".to_string())));
        assert!(form.fields.contains(&("csrf".to_string(), "abc".to_string())));
        assert!(form.fields.contains(&("mes".to_string(), "MES Totale".to_string())));
        // The other sector's form must not leak in.
        assert!(!form.fields.contains(&("area".to_string(), "3".to_string())));
    }

    #[test]
    fn test_discover_form_wrong_entity_or_button() {
        assert!(discover_action_form(HOME_WITH_FORMS, "9", "mes").is_none());
        assert!(discover_action_form(HOME_WITH_FORMS, "3", "partb").is_none());
        assert!(discover_action_form("", "2", "mes").is_none());
    }

    #[test]
    fn test_control_pages() {
        assert_eq!(CommandAction::Sector(SectorCommand::Mes).control_page(), "spc_home");
        assert_eq!(CommandAction::Zone(ZoneCommand::Inhibit).control_page(), "status_zones");
        assert_eq!(CommandAction::Door(DoorCommand::Pulse).control_page(), "status_doors");
        assert_eq!(CommandAction::Output(OutputCommand::Off).control_page(), "status_outputs");
    }
}
