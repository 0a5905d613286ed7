//! Set slot command

use crate::tracker::{Event, Tracker};
use serde_json::Value;

pub(super) fn run(name: &str, value: &Value, tracker: &Tracker) -> Vec<Event> {
    if tracker.get_slot(name).unwrap_or(&Value::Null) == value {
        tracing::debug!(slot = %name, "Skipping set slot: value unchanged");
        return vec![];
    }
    vec![Event::slot_set(name, value.clone())]
}
