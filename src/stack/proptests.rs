//! Property-based tests for the dialogue stack
//!
//! Persistence must be lossless and frame ids must stay unique no matter
//! which frames end up on the stack.

use super::*;
use proptest::prelude::*;
use std::collections::{BTreeMap, HashSet};

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_id() -> impl Strategy<Value = String> {
    "[a-z0-9-]{1,12}"
}

fn arb_name() -> impl Strategy<Value = String> {
    "[a-z_ ]{1,20}"
}

fn arb_frame_type() -> impl Strategy<Value = FlowFrameType> {
    prop_oneof![
        Just(FlowFrameType::Regular),
        Just(FlowFrameType::Interrupt),
        Just(FlowFrameType::Link),
        Just(FlowFrameType::Correction),
    ]
}

fn arb_slot_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        "[a-zA-Z ]{0,16}".prop_map(Value::from),
    ]
}

fn arb_frame() -> impl Strategy<Value = StackFrame> {
    prop_oneof![
        (arb_name(), arb_id(), arb_frame_type()).prop_map(|(flow_id, step_id, frame_type)| {
            StackFrame::from(UserFlowFrame::new(flow_id, step_id, frame_type))
        }),
        arb_name().prop_map(|slot| StackFrame::from(CollectInformationPatternFrame::new(slot))),
        (arb_name(), proptest::collection::vec(arb_id(), 0..4))
            .prop_map(|(name, ids)| StackFrame::from(CancelPatternFrame::new(name, ids))),
        (
            proptest::collection::btree_map(arb_name(), arb_slot_value(), 0..3),
            proptest::option::of(arb_name()),
            proptest::option::of(arb_id()),
        )
            .prop_map(|(slots, flow, step): (BTreeMap<String, Value>, _, _)| {
                StackFrame::from(CorrectionPatternFrame::new(slots, flow, step))
            }),
        proptest::collection::vec(arb_name(), 1..4)
            .prop_map(|names| StackFrame::from(ClarifyPatternFrame::new(names))),
        Just(StackFrame::from(InternalErrorPatternFrame::new())),
        arb_name().prop_map(|name| StackFrame::Completed(CompletedPatternFrame {
            frame_id: String::new(),
            flow_id: FLOW_PATTERN_COMPLETED.to_string(),
            step_id: crate::flows::START_STEP.to_string(),
            previous_flow_name: name,
        })),
        arb_name().prop_map(|name| StackFrame::ContinueInterrupted(
            ContinueInterruptedPatternFrame {
                frame_id: String::new(),
                flow_id: FLOW_PATTERN_CONTINUE_INTERRUPTED.to_string(),
                step_id: crate::flows::START_STEP.to_string(),
                previous_flow_name: name,
            }
        )),
        Just(StackFrame::ChitChat(ChitChatFrame::default())),
        Just(StackFrame::Search(SearchFrame::default())),
    ]
}

/// A stack built the way the engine builds one: every frame pushed fresh
fn arb_stack() -> impl Strategy<Value = DialogueStack> {
    proptest::collection::vec(arb_frame(), 0..8).prop_map(|frames| {
        let mut stack = DialogueStack::default();
        for frame in frames {
            stack.push_new(frame);
        }
        stack
    })
}

fn ids_are_unique(stack: &DialogueStack) -> bool {
    let mut seen = HashSet::new();
    stack.frames().iter().all(|frame| seen.insert(frame.frame_id()))
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Invariant 1: Serialization round-trips for every frame combination
    #[test]
    fn prop_as_list_round_trips(stack in arb_stack()) {
        let restored = DialogueStack::from_list(&stack.as_list());
        prop_assert!(restored.is_ok(), "Failed to restore: {:?}", restored);
        prop_assert_eq!(restored.unwrap(), stack);
    }

    // Invariant 2: Round-trip through the tracker slot is lossless too
    #[test]
    fn prop_tracker_round_trips(stack in arb_stack()) {
        let tracker = Tracker::from_events("prop", vec![stack.to_event()]);
        let restored = DialogueStack::from_tracker(&tracker);
        prop_assert!(restored.is_ok(), "Failed to restore: {:?}", restored);
        prop_assert_eq!(restored.unwrap(), stack);
    }

    // Invariant 3: Fresh pushes never duplicate a frame id
    #[test]
    fn prop_push_new_keeps_ids_unique(stack in arb_stack(), extra in proptest::collection::vec(arb_frame(), 1..5)) {
        let mut stack = stack;
        for frame in extra {
            stack.push_new(frame);
        }
        prop_assert!(ids_are_unique(&stack), "Duplicate frame ids: {:?}", stack);
    }

    // Invariant 4: Pop undoes push
    #[test]
    fn prop_pop_returns_pushed_frame(stack in arb_stack(), frame in arb_frame()) {
        let mut modified = stack.clone();
        let frame_id = modified.push_new(frame);
        let popped = modified.pop();
        prop_assert!(popped.is_ok());
        let popped = popped.unwrap();
        prop_assert_eq!(popped.frame_id(), frame_id.as_str());
        prop_assert_eq!(modified, stack);
    }

    // Invariant 5: A popped frame's id is never handed out again
    #[test]
    fn prop_ids_are_not_reused_after_pop(stack in arb_stack(), frame in arb_frame()) {
        let mut modified = stack;
        let first = modified.push_new(frame.clone());
        prop_assert!(modified.pop().is_ok());
        let second = modified.push_new(frame);
        prop_assert_ne!(first, second);
        prop_assert!(ids_are_unique(&modified), "Duplicate frame ids: {:?}", modified);
    }
}
