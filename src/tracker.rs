//! Conversation tracker
//!
//! The ordered event history of one conversation. Slot values and the
//! persisted dialogue stack are derived by replaying `slot` events.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Slot under which the serialized dialogue stack is persisted.
///
/// Part of the persisted format: producers and consumers must agree on it.
pub const DIALOGUE_STACK_SLOT: &str = "dialogue_stack";

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Failed to read tracker events: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid tracker events: {0}")]
    Parse(#[from] serde_json::Error),
}

/// What upstream extracted from a user message
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParseData {
    /// Raw command payloads, each tagged with a `command` field
    #[serde(default)]
    pub commands: Vec<Value>,
}

/// Events recorded in a conversation's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    /// The user said something
    User {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        #[serde(default)]
        parse_data: ParseData,
    },
    /// A slot was set
    Slot {
        #[serde(rename = "name")]
        key: String,
        value: Value,
    },
    /// The bot ran an action
    Action { name: String },
}

impl Event {
    pub fn slot_set(key: impl Into<String>, value: Value) -> Self {
        Event::Slot {
            key: key.into(),
            value,
        }
    }

    pub fn user_with_commands(text: impl Into<String>, commands: Vec<Value>) -> Self {
        Event::User {
            text: Some(text.into()),
            parse_data: ParseData { commands },
        }
    }

    /// Slot key if this is a slot event
    pub fn slot_key(&self) -> Option<&str> {
        match self {
            Event::Slot { key, .. } => Some(key),
            _ => None,
        }
    }
}

/// Event history of a single conversation
#[derive(Debug, Clone, PartialEq)]
pub struct Tracker {
    sender_id: String,
    events: Vec<Event>,
    slots: BTreeMap<String, Value>,
}

impl Tracker {
    pub fn new(sender_id: impl Into<String>) -> Self {
        Self {
            sender_id: sender_id.into(),
            events: Vec::new(),
            slots: BTreeMap::new(),
        }
    }

    pub fn from_events(sender_id: impl Into<String>, events: Vec<Event>) -> Self {
        let mut tracker = Self::new(sender_id);
        tracker.update_with_events(events);
        tracker
    }

    /// Parse a JSON array of events.
    ///
    /// # Errors
    ///
    /// Fails when the payload is not an array of known events.
    pub fn from_json_str(sender_id: impl Into<String>, raw: &str) -> Result<Self, TrackerError> {
        let events: Vec<Event> = serde_json::from_str(raw)?;
        Ok(Self::from_events(sender_id, events))
    }

    /// Load a JSON array of events from disk.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or does not hold valid events.
    pub fn load(path: &Path, sender_id: impl Into<String>) -> Result<Self, TrackerError> {
        let raw = std::fs::read_to_string(path)?;
        let tracker = Self::from_json_str(sender_id, &raw)?;
        tracing::debug!(
            path = %path.display(),
            sender_id = %tracker.sender_id,
            events = tracker.events.len(),
            "Loaded tracker"
        );
        Ok(tracker)
    }

    pub fn sender_id(&self) -> &str {
        &self.sender_id
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Current value of a slot. Slots set to `null` count as unset.
    pub fn get_slot(&self, key: &str) -> Option<&Value> {
        self.slots.get(key).filter(|value| !value.is_null())
    }

    /// Parse data of the most recent user message
    pub fn latest_message(&self) -> Option<&ParseData> {
        self.events.iter().rev().find_map(|event| match event {
            Event::User { parse_data, .. } => Some(parse_data),
            _ => None,
        })
    }

    pub fn update(&mut self, event: Event) {
        if let Event::Slot { key, value } = &event {
            self.slots.insert(key.clone(), value.clone());
        }
        self.events.push(event);
    }

    pub fn update_with_events(&mut self, events: impl IntoIterator<Item = Event>) {
        for event in events {
            self.update(event);
        }
    }
}
