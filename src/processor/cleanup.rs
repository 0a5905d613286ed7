//! Rewrites the validated commands into what should actually run.

use crate::commands::{Command, CorrectedSlot};
use crate::flows::FlowsList;
use crate::stack::{DialogueStack, StackError};
use crate::tracker::{Tracker, DIALOGUE_STACK_SLOT};
use serde_json::Value;

/// Drop commands that would do nothing or harm, and turn updates of slots
/// the active flow already collected into a single correction.
///
/// # Errors
///
/// Returns [`StackError::Corrupt`] when the persisted stack cannot be read.
pub fn clean_up_commands(
    commands: Vec<Command>,
    tracker: &Tracker,
    all_flows: &FlowsList,
) -> Result<Vec<Command>, StackError> {
    let stack = DialogueStack::from_tracker(tracker)?;
    let filled_slots = stack.filled_slots_for_active_flow(all_flows);
    let active_flow = stack.top_user_flow_frame().map(|frame| frame.flow_id.as_str());

    let mut clean: Vec<Command> = Vec::with_capacity(commands.len());

    for command in commands {
        match command {
            Command::SetSlot { name, .. } if name == DIALOGUE_STACK_SLOT => {
                tracing::warn!(slot = %name, "Dropping attempt to set the dialogue stack slot");
            }
            Command::SetSlot { name, value } if filled_slots.contains(&name) => {
                if tracker.get_slot(&name).unwrap_or(&Value::Null) == &value {
                    tracing::debug!(slot = %name, "Dropping set slot: value unchanged");
                    continue;
                }
                tracing::debug!(slot = %name, "Turning set slot into a correction");
                fold_into_correction(&mut clean, CorrectedSlot { name, value });
            }
            Command::CorrectSlots { corrected_slots } => {
                for slot in corrected_slots {
                    fold_into_correction(&mut clean, slot);
                }
            }
            Command::StartFlow { flow } if active_flow == Some(flow.as_str()) => {
                tracing::debug!(flow_id = %flow, "Dropping start flow: flow is already active");
            }
            other => clean.push(other),
        }
    }

    Ok(clean)
}

/// Add `slot` to the turn's correction, creating it on first use. A later
/// value for the same slot replaces the earlier one.
fn fold_into_correction(clean: &mut Vec<Command>, slot: CorrectedSlot) {
    for command in clean.iter_mut() {
        if let Command::CorrectSlots { corrected_slots } = command {
            match corrected_slots.iter_mut().find(|s| s.name == slot.name) {
                Some(existing) => existing.value = slot.value,
                None => corrected_slots.push(slot),
            }
            return;
        }
    }
    clean.push(Command::CorrectSlots {
        corrected_slots: vec![slot],
    });
}
