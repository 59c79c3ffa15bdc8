// MIT License - Copyright (c) 2026 Peter Wright

//! MQTT topic layout, rooted at the configured base topic.
//!
//! State topics: `<base>/<category>/<id>/<field>` and
//! `<base>/etat/<section>/<label>`; commands arrive on
//! `<base>/<category>/<id>/set` and are acknowledged on
//! `<base>/<category>/<id>/command_result`.

use crate::config::Category;

/// Controller-status topics live under this segment.
pub const ETAT_SEGMENT: &str = "etat";

/// Bridge availability topic (`online`/`offline`, retained, used as LWT).
pub const STATUS_SEGMENT: &str = "status";

const SET_SUFFIX: &str = "set";
const RESULT_SUFFIX: &str = "command_result";

/// Make a string safe as a single topic segment: MQTT wildcards, separators
/// and whitespace collapse to `_`.
pub fn sanitize_segment(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_was_sep = true;
    for c in s.trim().chars() {
        if matches!(c, '/' | '+' | '#') || c.is_whitespace() {
            if !last_was_sep {
                out.push('_');
                last_was_sep = true;
            }
        } else {
            out.push(c);
            last_was_sep = false;
        }
    }
    let out = out.trim_matches('_').to_string();
    if out.is_empty() { "unknown".to_string() } else { out }
}

/// Relative state topic for an entity field, e.g. `zones/01/state`.
pub fn entity_topic(category: Category, id: &str, field: &str) -> String {
    format!("{}/{}/{field}", category.as_str(), sanitize_segment(id))
}

/// Relative controller-status topic, e.g. `etat/Alimentation/Tension_batterie`.
pub fn etat_topic(section: &str, label: &str) -> String {
    format!(
        "{ETAT_SEGMENT}/{}/{}",
        sanitize_segment(section),
        sanitize_segment(label)
    )
}

/// Relative acknowledgement topic for a command.
pub fn command_result_topic(category: Category, id: &str) -> String {
    format!("{}/{}/{RESULT_SUFFIX}", category.as_str(), sanitize_segment(id))
}

/// Subscription filter for one category's command topics.
pub fn command_filter(base: &str, category: Category) -> String {
    format!("{base}/{}/+/{SET_SUFFIX}", category.as_str())
}

/// A parsed `<base>/<category>/<id>/set` topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTopic {
    pub category: Category,
    pub id: String,
}

/// Parse an incoming command topic; `None` for anything malformed.
pub fn parse_command_topic(base: &str, topic: &str) -> Option<CommandTopic> {
    let rest = topic.strip_prefix(base)?.strip_prefix('/')?;
    let mut parts = rest.split('/');
    let category = Category::from_topic_segment(parts.next()?)?;
    let id = parts.next()?;
    if id.is_empty() || parts.next()? != SET_SUFFIX || parts.next().is_some() {
        return None;
    }
    Some(CommandTopic {
        category,
        id: id.to_string(),
    })
}
