//! Fixtures shared by the unit and property tests

use crate::flows::{Flow, FlowStep, FlowsList};
use crate::stack::{DialogueStack, FlowFrameType, StackFrame, UserFlowFrame};
use crate::tracker::{Event, Tracker};
use serde_json::Value;

// ============================================================================
// Flows
// ============================================================================

fn step(id: &str, action: Option<&str>, collect: Option<&str>) -> FlowStep {
    FlowStep {
        id: id.to_string(),
        action: action.map(str::to_string),
        collect: collect.map(str::to_string),
    }
}

/// Two one-step flows, `foo` ("foo flow") and `bar` ("bar flow")
pub fn foo_bar_flows() -> FlowsList {
    FlowsList::new(vec![
        Flow::new(
            "foo",
            "foo flow",
            vec![step("first_step", Some("action_listen"), None)],
        ),
        Flow::new(
            "bar",
            "bar flow",
            vec![step("first_step", Some("action_listen"), None)],
        ),
    ])
}

/// `transfer_money` asks for a recipient, then an amount, then executes
pub fn transfer_flows() -> FlowsList {
    FlowsList::new(vec![Flow::new(
        "transfer_money",
        "transfer money",
        vec![
            step("ask_recipient", None, Some("recipient")),
            step("ask_amount", None, Some("amount")),
            step("execute", Some("action_transfer"), None),
        ],
    )])
}

// ============================================================================
// Stacks and trackers
// ============================================================================

/// A regular user flow frame with a fixed id
pub fn user_flow(flow_id: &str, step_id: &str, frame_id: &str) -> StackFrame {
    StackFrame::from(UserFlowFrame::new(flow_id, step_id, FlowFrameType::Regular))
        .with_frame_id(frame_id)
}

/// A tracker whose persisted dialogue stack holds `frames`, bottom first
pub fn tracker_with_stack(frames: Vec<StackFrame>) -> Tracker {
    Tracker::from_events("test", vec![DialogueStack::new(frames).to_event()])
}

/// Like [`tracker_with_stack`], followed by a user message carrying `commands`
pub fn tracker_with_commands(frames: Vec<StackFrame>, commands: Vec<Value>) -> Tracker {
    let mut tracker = tracker_with_stack(frames);
    tracker.update(Event::user_with_commands("hi", commands));
    tracker
}
