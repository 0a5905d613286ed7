//! Clarify command
//!
//! Upstream could not tell which flow the user meant and offers candidates.

use super::{push_frame, start_flow, CommandError};
use crate::flows::{Flow, FlowsList};
use crate::stack::{ClarifyPatternFrame, DialogueStack};
use crate::tracker::{Event, Tracker};

pub(super) fn run(
    options: &[String],
    tracker: &Tracker,
    all_flows: &FlowsList,
) -> Result<Vec<Event>, CommandError> {
    let mut candidates: Vec<&Flow> = Vec::new();
    for option in options {
        match all_flows.flow_by_id(option) {
            Some(flow) if !candidates.iter().any(|c| c.id == flow.id) => candidates.push(flow),
            Some(_) => {}
            None => tracing::debug!(flow_id = %option, "Dropping unknown clarification option"),
        }
    }

    match candidates.as_slice() {
        [] => {
            tracing::debug!("Skipping clarify: no valid options");
            Ok(vec![])
        }
        // a single candidate is no longer ambiguous
        [flow] => start_flow::run(&flow.id, tracker, all_flows),
        flows => {
            let names = flows
                .iter()
                .map(|flow| flow.readable_name().to_string())
                .collect();
            let stack = DialogueStack::from_tracker(tracker)?;
            Ok(push_frame(stack, ClarifyPatternFrame::new(names).into()))
        }
    }
}
