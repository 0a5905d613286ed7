//! Property-based tests for the command processor
//!
//! A turn either applies cleanly or fails as a whole, and replaying a turn
//! that was already applied changes nothing.

use super::*;
use crate::commands::{CorrectedSlot, FreeFormAnswer};
use crate::stack::{ChitChatFrame, CollectInformationPatternFrame, FlowFrameType, UserFlowFrame};
use crate::testing::{foo_bar_flows, tracker_with_commands, transfer_flows};
use proptest::prelude::*;
use serde_json::Value;

// ============================================================================
// Test Helpers
// ============================================================================

fn all_flows() -> FlowsList {
    let mut flows: Vec<_> = foo_bar_flows().iter().cloned().collect();
    flows.extend(transfer_flows().iter().cloned());
    FlowsList::new(flows)
}

fn is_stack_event(event: &Event) -> bool {
    event.slot_key() == Some(DIALOGUE_STACK_SLOT)
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_flow_id() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("foo".to_string()),
        Just("bar".to_string()),
        Just("transfer_money".to_string()),
        Just("unknown".to_string()),
    ]
}

fn arb_step_id() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("__start__".to_string()),
        Just("first_step".to_string()),
        Just("ask_amount".to_string()),
        Just("execute".to_string()),
    ]
}

fn arb_slot_name() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("recipient".to_string()),
        Just("amount".to_string()),
        Just("city".to_string()),
    ]
}

fn arb_slot_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        (0i64..1000).prop_map(Value::from),
        "[a-zA-Z]{1,8}".prop_map(Value::from),
    ]
}

fn arb_command() -> impl Strategy<Value = Command> {
    prop_oneof![
        arb_flow_id().prop_map(|flow| Command::StartFlow { flow }),
        (arb_slot_name(), arb_slot_value()).prop_map(|(name, value)| Command::SetSlot { name, value }),
        Just(Command::CancelFlow),
        proptest::collection::vec((arb_slot_name(), arb_slot_value()), 0..3).prop_map(|slots| {
            Command::CorrectSlots {
                corrected_slots: slots
                    .into_iter()
                    .map(|(name, value)| CorrectedSlot { name, value })
                    .collect(),
            }
        }),
        Just(Command::FreeFormAnswer(FreeFormAnswer::ChitChat)),
        Just(Command::FreeFormAnswer(FreeFormAnswer::Knowledge)),
        proptest::collection::vec(arb_flow_id(), 0..4).prop_map(|options| Command::Clarify { options }),
        Just(Command::Error),
        Just(Command::HumanHandoff),
    ]
}

fn arb_frame_type() -> impl Strategy<Value = FlowFrameType> {
    prop_oneof![
        Just(FlowFrameType::Regular),
        Just(FlowFrameType::Interrupt),
        Just(FlowFrameType::Link),
    ]
}

fn arb_frame() -> impl Strategy<Value = StackFrame> {
    prop_oneof![
        4 => (arb_flow_id(), arb_step_id(), arb_frame_type()).prop_map(
            |(flow_id, step_id, frame_type)| StackFrame::from(UserFlowFrame::new(flow_id, step_id, frame_type))
        ),
        1 => arb_slot_name().prop_map(|slot| StackFrame::from(CollectInformationPatternFrame::new(slot))),
        1 => Just(StackFrame::ChitChat(ChitChatFrame::default())),
    ]
}

/// Persisted stacks with distinct frame ids
fn arb_frames() -> impl Strategy<Value = Vec<StackFrame>> {
    proptest::collection::vec(arb_frame(), 0..5).prop_map(|frames| {
        frames
            .into_iter()
            .enumerate()
            .map(|(i, frame)| frame.with_frame_id(format!("frame-{i}")))
            .collect()
    })
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Invariant 1: The validator accepts exactly the well-formed combinations
    #[test]
    fn prop_validator_rules(commands in proptest::collection::vec(arb_command(), 0..6)) {
        let cancels = commands.iter().filter(|c| c.kind() == CommandKind::CancelFlow).count();
        let corrections = commands.iter().filter(|c| c.kind() == CommandKind::CorrectSlots).count();
        let first_other = commands.iter().position(|c| !c.is_free_form_answer());
        let last_free_form = commands.iter().rposition(Command::is_free_form_answer);
        let free_form_leading = match (first_other, last_free_form) {
            (Some(other), Some(free_form)) => free_form < other,
            _ => true,
        };

        let expected_ok = cancels <= 1 && corrections <= 1 && free_form_leading;
        let result = validate_state_of_commands(&commands);
        prop_assert_eq!(result.is_ok(), expected_ok, "{:?} -> {:?}", commands, result);
    }

    // Invariant 2: Replaying an applied turn emits nothing
    #[test]
    fn prop_replay_is_a_no_op(
        frames in arb_frames(),
        commands in proptest::collection::vec(arb_command(), 0..5),
    ) {
        prop_assume!(validate_state_of_commands(&commands).is_ok());
        let flows = all_flows();
        let raw = commands.iter().map(Command::to_json).collect();
        let mut tracker = tracker_with_commands(frames, raw);

        let events = execute_commands(&tracker, &flows);
        prop_assert!(events.is_ok(), "{:?} failed: {:?}", commands, events);
        tracker.update_with_events(events.unwrap_or_default());
        let applied = DialogueStack::from_tracker(&tracker);

        let replay = execute_commands(&tracker, &flows);
        prop_assert!(replay.is_ok(), "{:?} failed on replay: {:?}", commands, replay);
        let replay = replay.unwrap_or_default();
        prop_assert!(replay.is_empty(), "{:?} emitted on replay: {:?}", commands, replay);

        tracker.update_with_events(replay);
        prop_assert_eq!(DialogueStack::from_tracker(&tracker).ok(), applied.ok());
    }

    // Invariant 3: At most one event per slot, at most one stack event
    #[test]
    fn prop_one_event_per_slot(
        frames in arb_frames(),
        commands in proptest::collection::vec(arb_command(), 0..5),
    ) {
        prop_assume!(validate_state_of_commands(&commands).is_ok());
        let raw = commands.iter().map(Command::to_json).collect();
        let tracker = tracker_with_commands(frames, raw);

        let events = execute_commands(&tracker, &all_flows());
        prop_assert!(events.is_ok(), "{:?} failed: {:?}", commands, events);
        let events = events.unwrap_or_default();

        let keys: Vec<_> = events.iter().filter_map(Event::slot_key).collect();
        let unique: HashSet<_> = keys.iter().collect();
        prop_assert_eq!(keys.len(), unique.len());
        prop_assert!(events.iter().filter(|e| is_stack_event(e)).count() <= 1);
    }

    // Invariant 4: The emitted stack keeps every frame that was persisted
    #[test]
    fn prop_frames_are_never_removed(frames in arb_frames(), command in arb_command()) {
        let tracker = tracker_with_commands(frames.clone(), vec![command.to_json()]);
        let events = execute_commands(&tracker, &all_flows()).unwrap_or_default();

        if let Some(Event::Slot { value, .. }) = events.iter().find(|e| is_stack_event(e)) {
            let stack = DialogueStack::from_list(value);
            prop_assert!(stack.is_ok());
            let stack = stack.unwrap_or_default();
            prop_assert!(stack.len() > frames.len());
            prop_assert_eq!(&stack.frames()[..frames.len()], frames.as_slice());
        }
    }
}
