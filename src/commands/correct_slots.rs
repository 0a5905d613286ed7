//! Correct slots command
//!
//! The user changed an answer the active flow already collected. A
//! correction pattern carries the new values and tells the executor which
//! step to rewind the flow to.

use super::{push_frame, CommandError};
use crate::flows::{Flow, FlowsList};
use crate::stack::{CorrectionPatternFrame, DialogueStack, UserFlowFrame};
use crate::tracker::{Event, Tracker};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A slot and the value the user corrected it to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectedSlot {
    pub name: String,
    #[serde(default)]
    pub value: Value,
}

pub(super) fn run(
    corrected_slots: &[CorrectedSlot],
    tracker: &Tracker,
    all_flows: &FlowsList,
    original_tracker: &Tracker,
) -> Result<Vec<Event>, CommandError> {
    let stack = DialogueStack::from_tracker(tracker)?;
    let original_stack = DialogueStack::from_tracker(original_tracker)?;

    let Some(user_frame) = original_stack.top_user_flow_frame() else {
        // Nothing to rewind, the values can be set right away
        tracing::debug!("No active flow to correct, setting slots directly");
        return Ok(corrected_slots
            .iter()
            .filter(|slot| tracker.get_slot(&slot.name).unwrap_or(&Value::Null) != &slot.value)
            .map(|slot| Event::slot_set(slot.name.clone(), slot.value.clone()))
            .collect());
    };

    let proposed: BTreeMap<String, Value> = corrected_slots
        .iter()
        .map(|slot| (slot.name.clone(), slot.value.clone()))
        .collect();
    let reset_step_id = all_flows
        .flow_by_id(&user_frame.flow_id)
        .and_then(|flow| earliest_corrected_step(flow, user_frame, &proposed));

    tracing::debug!(
        flow_id = %user_frame.flow_id,
        slots = ?proposed.keys().collect::<Vec<_>>(),
        reset_step_id = ?reset_step_id,
        "Correcting slots"
    );

    let frame =
        CorrectionPatternFrame::new(proposed, Some(user_frame.flow_id.clone()), reset_step_id);
    Ok(push_frame(stack, frame.into()))
}

/// First step the flow already passed that asked for one of the corrected slots
fn earliest_corrected_step(
    flow: &Flow,
    user_frame: &UserFlowFrame,
    proposed: &BTreeMap<String, Value>,
) -> Option<String> {
    flow.previous_collect_steps(&user_frame.step_id)
        .into_iter()
        .find(|step| {
            step.collect
                .as_ref()
                .is_some_and(|slot| proposed.contains_key(slot))
        })
        .map(|step| step.id.clone())
}
