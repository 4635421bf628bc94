//! Static translations embedded in a configuration record.

use serde_yaml::Value;

use crate::resource::{ChangeKind, ConfigRecord};
use crate::translation::{Event, Translation};

/// Derives one event per `from: to` pair of every entry in the record.
///
/// Entries that do not hold a flat map are logged and skipped.
pub fn record_events(record: &ConfigRecord, change: ChangeKind) -> Vec<Event> {
    let kind = change.event_kind();
    let mut events = Vec::new();

    for (key, text) in &record.data {
        match parse_address_map(text) {
            Ok(pairs) => events.extend(
                pairs
                    .into_iter()
                    .map(|(from, to)| Event::new(Translation::new(from, to), kind)),
            ),
            Err(reason) => {
                log::warn!(
                    "Skipping malformed entry '{}' of config record '{}': {}",
                    key,
                    record.name,
                    reason
                );
            }
        }
    }

    events
}

/// Parses a flat YAML map, keeping document order.
pub fn parse_address_map(text: &str) -> Result<Vec<(String, String)>, String> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let value: Value = serde_yaml::from_str(text).map_err(|e| e.to_string())?;
    let mapping = match value {
        Value::Null => return Ok(Vec::new()),
        Value::Mapping(mapping) => mapping,
        other => return Err(format!("expected a map, found {}", kind_name(&other))),
    };

    mapping
        .iter()
        .map(|(k, v)| -> Result<(String, String), String> {
            Ok((scalar_text(k)?, scalar_text(v)?))
        })
        .collect()
}

fn scalar_text(value: &Value) -> Result<String, String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(format!("expected a scalar, found {}", kind_name(other))),
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a bool",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a map",
        Value::Tagged(_) => "a tagged value",
    }
}
