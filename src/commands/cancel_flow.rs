//! Cancel flow command
//!
//! Cancellation is recorded, not applied: the canceled frames stay on the
//! stack and a cancel pattern on top lists them for the flow executor.

use super::CommandError;
use crate::flows::{Flow, FlowsList};
use crate::stack::{CancelPatternFrame, DialogueStack, StackFrame};
use crate::tracker::{Event, Tracker};

/// Ids of the frames that go away when `current_flow` is canceled.
///
/// Everything from the top of the stack down to and including the most
/// recent user frame of `current_flow`, innermost first. Pattern frames
/// stacked on a flow belong to it and are canceled with it; frames of flows
/// further down are left alone.
///
/// # Errors
///
/// Both failures mean the caller asked to cancel something that is not
/// running: [`CommandError::EmptyStack`] for an empty stack and
/// [`CommandError::FlowNotOnStack`] when no user frame runs the flow.
pub fn select_canceled_frames(
    stack: &DialogueStack,
    current_flow: &Flow,
) -> Result<Vec<String>, CommandError> {
    if stack.is_empty() {
        return Err(CommandError::EmptyStack {
            flow_id: current_flow.id.clone(),
        });
    }

    let mut canceled_frames = Vec::new();
    for frame in stack.iter_top_down() {
        canceled_frames.push(frame.frame_id().to_string());
        if let StackFrame::UserFlow(user_frame) = frame {
            if user_frame.flow_id == current_flow.id {
                return Ok(canceled_frames);
            }
        }
    }

    Err(CommandError::FlowNotOnStack {
        flow_id: current_flow.id.clone(),
    })
}

pub(super) fn run(
    tracker: &Tracker,
    all_flows: &FlowsList,
    original_tracker: &Tracker,
) -> Result<Vec<Event>, CommandError> {
    let mut stack = DialogueStack::from_tracker(tracker)?;
    // Frames pushed earlier in this turn must survive the cancellation, so
    // the target is chosen from the stack as it was before the turn.
    let original_stack = DialogueStack::from_tracker(original_tracker)?;

    let Some(user_frame) = original_stack.top_user_flow_frame() else {
        tracing::debug!("Skipping cancel flow: no active flow");
        return Ok(vec![]);
    };
    let Some(current_flow) = all_flows.flow_by_id(&user_frame.flow_id) else {
        tracing::debug!(flow_id = %user_frame.flow_id, "Skipping cancel flow: unknown flow");
        return Ok(vec![]);
    };
    if stack.is_canceled(&user_frame.frame_id) {
        tracing::debug!(
            flow_id = %user_frame.flow_id,
            frame_id = %user_frame.frame_id,
            "Skipping cancel flow: already canceled"
        );
        return Ok(vec![]);
    }

    let canceled_frames = select_canceled_frames(&original_stack, current_flow)?;
    tracing::debug!(
        flow_id = %current_flow.id,
        canceled = canceled_frames.len(),
        "Canceling flow"
    );

    stack.push_new(CancelPatternFrame::new(current_flow.readable_name(), canceled_frames).into());
    Ok(vec![stack.to_event()])
}
