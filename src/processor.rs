//! Command processor
//!
//! Runs one user turn: extract the commands upstream attached to the latest
//! message, check they make sense together, apply them in order to the
//! dialogue stack, and return the events that persist the result. The
//! processor never touches the caller's tracker; it works on a copy and the
//! caller decides whether to append the returned events.

mod cleanup;
mod validation;

#[cfg(test)]
mod proptests;

pub use cleanup::clean_up_commands;
pub use validation::{validate_state_of_commands, ValidationError};

use crate::commands::{Command, CommandError, CommandKind};
use crate::flows::FlowsList;
use crate::stack::{DialogueStack, StackError, StackFrame};
use crate::tracker::{Event, Tracker, DIALOGUE_STACK_SLOT};
use serde_json::Value;
use std::collections::{BTreeSet, HashSet};
use thiserror::Error;

/// Anything that aborts a turn. All variants are contract violations.
#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("Invalid combination of commands: {0}")]
    InvalidCommands(#[from] ValidationError),
    #[error("Command failed: {0}")]
    Command(#[from] CommandError),
    #[error(transparent)]
    Stack(#[from] StackError),
}

/// Commands attached to the most recent user message.
///
/// Payloads that cannot be parsed are skipped with a warning.
pub fn get_commands_from_tracker(tracker: &Tracker) -> Vec<Command> {
    let Some(parse_data) = tracker.latest_message() else {
        return vec![];
    };

    parse_data
        .commands
        .iter()
        .filter_map(|raw| match Command::from_json(raw) {
            Ok(command) => Some(command),
            Err(e) => {
                tracing::warn!(
                    sender_id = %tracker.sender_id(),
                    error = %e,
                    "Ignoring command"
                );
                None
            }
        })
        .collect()
}

pub fn contains_command(commands: &[Command], kind: CommandKind) -> bool {
    commands.iter().any(|command| command.kind() == kind)
}

/// Flows whose execution state this turn's commands change.
///
/// Runs the turn on a scratch copy and compares the stacks, see
/// [`flows_updated_by`].
///
/// # Errors
///
/// Propagates the contract violations of [`execute_commands`].
pub fn find_updated_flows(
    tracker: &Tracker,
    all_flows: &FlowsList,
) -> Result<BTreeSet<String>, ProcessorError> {
    let events = execute_commands(tracker, all_flows)?;
    Ok(flows_updated_by(tracker, &events)?)
}

/// Flows whose execution state changes when `events` are appended to
/// `tracker`.
///
/// A flow counts as updated when one of its frames is pushed, changed or
/// removed, when a new cancel pattern lists one of its frames, or when a new
/// correction pattern rewinds it.
///
/// # Errors
///
/// Returns [`StackError::Corrupt`] when either stack cannot be decoded.
pub fn flows_updated_by(
    tracker: &Tracker,
    events: &[Event],
) -> Result<BTreeSet<String>, StackError> {
    let before = DialogueStack::from_tracker(tracker)?;

    let mut scratch = tracker.clone();
    scratch.update_with_events(events.iter().cloned());
    let after = DialogueStack::from_tracker(&scratch)?;

    let mut updated = BTreeSet::new();

    for frame in after.frames() {
        if before.frames().contains(frame) {
            continue;
        }
        if let Some(flow_id) = frame.flow_id() {
            updated.insert(flow_id.to_string());
        }
        match frame {
            StackFrame::CancelFlow(cancel) => {
                updated.extend(
                    cancel
                        .canceled_frames
                        .iter()
                        .filter_map(|id| before.frame(id).or_else(|| after.frame(id)))
                        .filter_map(StackFrame::flow_id)
                        .map(str::to_string),
                );
            }
            StackFrame::Correction(correction) => {
                updated.extend(correction.reset_flow_id.clone());
            }
            _ => {}
        }
    }

    let remaining: HashSet<&str> = after.frames().iter().map(StackFrame::frame_id).collect();
    updated.extend(
        before
            .frames()
            .iter()
            .filter(|frame| !remaining.contains(frame.frame_id()))
            .filter_map(StackFrame::flow_id)
            .map(str::to_string),
    );

    Ok(updated)
}

/// Apply this turn's commands and return the events that persist them.
///
/// Commands run in the order upstream produced them. Each one sees the
/// effects of those before it and also receives the tracker as it was when
/// the turn started. The result holds at most one event per slot and only
/// slots whose value actually changes.
///
/// A turn is applied once. When the stack was already persisted after the
/// latest user message, the turn's events are in the history and nothing is
/// returned.
///
/// # Errors
///
/// Fails without returning any events when the commands are an invalid
/// combination, when a command hits a contract violation, or when the
/// persisted stack cannot be decoded.
pub fn execute_commands(
    tracker: &Tracker,
    all_flows: &FlowsList,
) -> Result<Vec<Event>, ProcessorError> {
    let commands = get_commands_from_tracker(tracker);
    if commands.is_empty() {
        tracing::debug!(sender_id = %tracker.sender_id(), "No commands to execute");
        return Ok(vec![]);
    }

    validate_state_of_commands(&commands).map_err(|e| {
        tracing::error!(sender_id = %tracker.sender_id(), error = %e, "Rejected commands");
        e
    })?;

    if turn_already_applied(tracker) {
        tracing::debug!(sender_id = %tracker.sender_id(), "Turn already applied");
        return Ok(vec![]);
    }

    let original_stack = DialogueStack::from_tracker(tracker)?;
    let commands = clean_up_commands(commands, tracker, all_flows)?;

    let mut working = tracker.clone();
    let mut events = Vec::new();
    for command in &commands {
        let new_events = command
            .run_command_on_tracker(&working, all_flows, tracker)
            .map_err(|e| {
                tracing::error!(
                    sender_id = %tracker.sender_id(),
                    command = command.command(),
                    error = %e,
                    "Command failed"
                );
                e
            })?;
        working.update_with_events(new_events.iter().cloned());
        events.extend(new_events);
    }

    let mut events = remove_duplicated_set_slots(events);

    let final_stack = DialogueStack::from_tracker(&working)?;
    let stack_changed = final_stack != original_stack;
    events.retain(|event| match event {
        Event::Slot { key, .. } if key == DIALOGUE_STACK_SLOT => stack_changed,
        Event::Slot { key, value } => tracker.get_slot(key).unwrap_or(&Value::Null) != value,
        _ => true,
    });

    tracing::info!(
        sender_id = %tracker.sender_id(),
        commands = commands.len(),
        events = events.len(),
        stack_changed,
        stack_depth = final_stack.len(),
        "Executed commands"
    );

    Ok(events)
}

/// Whether the stack was persisted after the latest user message. The
/// processor emits every stack change of a turn at once, right after the
/// message, so a stack event there means the turn has run.
fn turn_already_applied(tracker: &Tracker) -> bool {
    tracker
        .events()
        .iter()
        .rev()
        .take_while(|event| !matches!(event, Event::User { .. }))
        .any(|event| event.slot_key() == Some(DIALOGUE_STACK_SLOT))
}

/// Keep only the last slot event per key, at the position it was emitted.
fn remove_duplicated_set_slots(events: Vec<Event>) -> Vec<Event> {
    let mut seen = HashSet::new();
    let mut kept: Vec<Event> = events
        .into_iter()
        .rev()
        .filter(|event| match event.slot_key() {
            Some(key) => seen.insert(key.to_string()),
            None => true,
        })
        .collect();
    kept.reverse();
    kept
}
