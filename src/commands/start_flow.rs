//! Start flow command

use super::{push_frame, CommandError};
use crate::flows::{FlowsList, START_STEP};
use crate::stack::{DialogueStack, FlowFrameType, UserFlowFrame};
use crate::tracker::{Event, Tracker};

pub(super) fn run(
    flow: &str,
    tracker: &Tracker,
    all_flows: &FlowsList,
) -> Result<Vec<Event>, CommandError> {
    let stack = DialogueStack::from_tracker(tracker)?;

    if stack.user_flows_on_the_stack().contains(flow) {
        tracing::debug!(flow_id = %flow, "Skipping start flow: already on the stack");
        return Ok(vec![]);
    }
    if all_flows.flow_by_id(flow).is_none() {
        tracing::debug!(flow_id = %flow, "Skipping start flow: unknown flow");
        return Ok(vec![]);
    }

    // Starting a flow while another one runs interrupts it; the executor
    // resumes the interrupted flow once this one is done.
    let frame_type = if stack.top_user_flow_frame().is_some() {
        FlowFrameType::Interrupt
    } else {
        FlowFrameType::Regular
    };

    Ok(push_frame(
        stack,
        UserFlowFrame::new(flow, START_STEP, frame_type).into(),
    ))
}
