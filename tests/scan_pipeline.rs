// Pipeline tests: raw panel HTML → parsed records → diff engine → topics.
//
// These run the same code path the watchdog loops drive, minus HTTP and the
// broker, and pin down the literal end-to-end expectations: what a cold
// start publishes, what a single zone toggle publishes, and how the
// feature-flag matrices gate publication and control independently.

use spc_web_bridge::commands::{CommandAction, ack, discover_action_form};
use spc_web_bridge::config::{Category, FeatureFlags};
use spc_web_bridge::pages;
use spc_web_bridge::scan::{ControllerScanEngine, ScanEngine};
use spc_web_bridge::topics;

const ZONES_NORMAL: &str = r#"
<html><body><h1>SPC42</h1>
<table class="gridtable">
 <tr><th>Zone</th><th>Secteur</th><th>Type</th><th>EV</th><th>Entr&eacute;e</th><th>&Eacute;tat</th></tr>
 <tr><td>01 Hall</td><td>1</td><td>Alarme</td><td>-</td><td>Ferm&eacute;e</td><td>Normal</td></tr>
</table>
</body></html>"#;

const ZONES_ACTIVE: &str = r#"
<html><body><h1>SPC42</h1>
<table class="gridtable">
 <tr><th>Zone</th><th>Secteur</th><th>Type</th><th>EV</th><th>Entr&eacute;e</th><th>&Eacute;tat</th></tr>
 <tr><td>01 Hall</td><td>1</td><td>Alarme</td><td>-</td><td>Ferm&eacute;e</td><td>Activ&eacute;e</td></tr>
</table>
</body></html>"#;

const HOME: &str = r#"
<html><body>
<table>
 <tr><td><img></td><td>Tous Secteurs</td><td>MHS</td></tr>
 <tr><td><img></td><td>Secteur 2 : Maison</td><td>MHS</td><td>
   <form action="secure.htm?session=0x2F&page=spc_home" method="post">
     <input type="hidden" name="area" value="2">
     <input type="submit" name="mes" value="MES Totale">
     <input type="submit" name="mhs" value="MHS">
     <input type="submit" name="parta" value="MES Partielle A">
     <input type="submit" name="partb" value="MES Partielle B">
   </form>
 </td></tr>
</table>
<p>spc42</p>
</body></html>"#;

// =========================================================================
// Cold start
// =========================================================================

#[test]
fn cold_start_publishes_name_and_state() {
    let mut engine = ScanEngine::new(FeatureFlags::all(true));
    let zones = pages::parse_zones(ZONES_NORMAL);
    let pubs = engine.diff_zones(&zones);

    let find = |topic: &str| {
        pubs.iter()
            .find(|p| p.topic == topic)
            .unwrap_or_else(|| panic!("missing {topic}"))
            .payload
            .clone()
    };
    assert_eq!(find("zones/01/name"), "01 Hall");
    assert_eq!(find("zones/01/sector"), "1");
    assert_eq!(find("zones/01/state"), "0");
    assert_eq!(find("zones/01/entree"), "1");
}

#[test]
fn cold_start_metadata_precedes_state() {
    let mut engine = ScanEngine::new(FeatureFlags::all(true));
    let pubs = engine.diff_zones(&pages::parse_zones(ZONES_NORMAL));
    let name_pos = pubs.iter().position(|p| p.topic.ends_with("/name")).unwrap();
    let state_pos = pubs.iter().position(|p| p.topic.ends_with("/state")).unwrap();
    assert!(name_pos < state_pos);
}

// =========================================================================
// Change detection
// =========================================================================

#[test]
fn zone_toggle_publishes_exactly_one_topic() {
    let mut engine = ScanEngine::new(FeatureFlags::all(true));
    engine.diff_zones(&pages::parse_zones(ZONES_NORMAL));

    let pubs = engine.diff_zones(&pages::parse_zones(ZONES_ACTIVE));
    assert_eq!(pubs.len(), 1);
    assert_eq!(pubs[0].topic, "zones/01/state");
    assert_eq!(pubs[0].payload, "1");
}

#[test]
fn identical_scans_publish_nothing() {
    let mut engine = ScanEngine::new(FeatureFlags::all(true));
    let zones = pages::parse_zones(ZONES_NORMAL);
    let sectors = pages::parse_sectors(HOME);

    engine.diff_zones(&zones);
    engine.diff_sectors(&sectors);
    assert!(engine.diff_zones(&zones).is_empty());
    assert!(engine.diff_sectors(&sectors).is_empty());
}

#[test]
fn no_payload_is_ever_minus_one() {
    let broken = r#"
<table class="gridtable">
 <tr><td>09 Grenier</td><td>2</td><td>x</td><td>-</td><td>???</td><td>???</td></tr>
</table>"#;
    let mut engine = ScanEngine::new(FeatureFlags::all(true));
    let pubs = engine.diff_zones(&pages::parse_zones(broken));
    assert!(pubs.iter().all(|p| p.payload != "-1"));
    // Metadata still goes out, states are withheld.
    assert!(pubs.iter().any(|p| p.topic == "zones/09/name"));
    assert!(!pubs.iter().any(|p| p.topic == "zones/09/state"));
}

// =========================================================================
// Sectors and the global row
// =========================================================================

#[test]
fn sectors_include_global_row_under_id_zero() {
    let mut engine = ScanEngine::new(FeatureFlags::all(true));
    let pubs = engine.diff_sectors(&pages::parse_sectors(HOME));

    assert!(pubs.iter().any(|p| p.topic == "secteurs/0/name" && p.payload == "Tous Secteurs"));
    assert!(pubs.iter().any(|p| p.topic == "secteurs/0/state" && p.payload == "0"));
    assert!(pubs.iter().any(|p| p.topic == "secteurs/2/name" && p.payload == "Maison"));
}

// =========================================================================
// Feature-flag gate
// =========================================================================

#[test]
fn information_gate_and_control_gate_are_independent() {
    // information.doors = false: no doors state topics.
    let mut flags = FeatureFlags::all(true);
    flags.doors = false;
    let mut engine = ScanEngine::new(flags);

    let doors_page = r#"
<table class="gridtable">
 <tr><td>5 Entr&eacute;e</td><td>05</td><td>1</td><td>Verrouill&eacute;e</td><td>0</td><td>1</td></tr>
</table>"#;
    assert!(engine.diff_doors(&pages::parse_doors(doors_page)).is_empty());

    // controle.doors = true: the unlock command still validates and still
    // finds its button on the doors page.
    let action = CommandAction::parse(Category::Doors, "unlock").unwrap();
    assert_eq!(action.ok_ack(), "ok:unlock");

    let doors_control_page = r#"
<form action="secure.htm?session=0x2F&page=status_doors" method="post">
  <input type="hidden" name="door" value="5">
  <input type="submit" name="unlock" value="D&eacute;verrouiller">
</form>"#;
    let form = discover_action_form(doors_control_page, "5", action.button()).unwrap();
    assert_eq!(form.action, "secure.htm?session=0x2F&page=status_doors");
    assert!(form.fields.contains(&("door".to_string(), "5".to_string())));
}

// =========================================================================
// Command validation and acks
// =========================================================================

#[test]
fn sector_arm_command_round_trip() {
    // Broker sends "mes" on spc/secteurs/2/set.
    let command = topics::parse_command_topic("spc", "spc/secteurs/2/set").unwrap();
    assert_eq!(command.category, Category::Secteurs);

    let action = CommandAction::parse(command.category, "mes").unwrap();
    assert_eq!(action.ok_ack(), "ok:1");

    // The form the web UI would post for that button exists on the page.
    let form = discover_action_form(HOME, &command.id, action.button()).unwrap();
    assert!(form.fields.contains(&("area".to_string(), "2".to_string())));
    assert!(form.fields.iter().any(|(name, _)| name == "mes"));

    // And the ack lands on the sibling command_result topic.
    assert_eq!(
        topics::command_result_topic(command.category, &command.id),
        "secteurs/2/command_result"
    );
}

#[test]
fn bad_payload_is_rejected_before_any_panel_traffic() {
    let command = topics::parse_command_topic("spc", "spc/zones/01/set").unwrap();
    assert!(CommandAction::parse(command.category, "wiggle").is_none());
    assert_eq!(ack::BAD_PAYLOAD, "error:bad-payload");
}

// =========================================================================
// Controller status
// =========================================================================

#[test]
fn controller_scan_publishes_under_etat() {
    let page = r#"
<table class="gridtable">
 <tr><th colspan="2">Alimentation</th></tr>
 <tr><td>Tension batterie</td><td>13.7 V</td></tr>
</table>"#;
    let mut engine = ControllerScanEngine::new();
    let pubs = engine.diff_entries(&pages::parse_controller(page));
    assert_eq!(pubs.len(), 1);
    assert_eq!(pubs[0].topic, "etat/Alimentation/Tension_batterie");
    assert_eq!(pubs[0].payload, "13.7 V");
    assert!(engine.diff_entries(&pages::parse_controller(page)).is_empty());
}
