//! Dialogue stack
//!
//! Ordered frames of nested conversation contexts, bottom to top. The top
//! frame determines the active flow and step. The stack is rebuilt from the
//! tracker on every turn and persisted back as a single slot event.

mod frames;

#[cfg(test)]
mod proptests;

pub use frames::{
    CancelPatternFrame, ChitChatFrame, ClarifyPatternFrame, CollectInformationPatternFrame,
    CompletedPatternFrame, ContinueInterruptedPatternFrame, CorrectionPatternFrame,
    FlowFrameType, InternalErrorPatternFrame, SearchFrame, StackFrame, UserFlowFrame,
    FLOW_PATTERN_CANCEL, FLOW_PATTERN_CLARIFICATION, FLOW_PATTERN_COLLECT_INFORMATION,
    FLOW_PATTERN_COMPLETED, FLOW_PATTERN_CONTINUE_INTERRUPTED, FLOW_PATTERN_CORRECTION,
    FLOW_PATTERN_INTERNAL_ERROR,
};

use crate::flows::FlowsList;
use crate::tracker::{Event, Tracker, DIALOGUE_STACK_SLOT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StackError {
    #[error("Cannot pop from an empty dialogue stack")]
    Empty,
    #[error("Persisted dialogue stack is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Ordered frames, last element is the top
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DialogueStack {
    frames: Vec<StackFrame>,
}

impl DialogueStack {
    pub fn new(frames: Vec<StackFrame>) -> Self {
        Self { frames }
    }

    pub fn frames(&self) -> &[StackFrame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Push a frame as-is, keeping whatever id it carries
    pub fn push(&mut self, frame: StackFrame) {
        self.frames.push(frame);
    }

    /// Push a frame under a fresh id and return that id.
    ///
    /// Ids are never reused, even for a frame of the same type pushed where
    /// a popped one used to be, so cancel patterns in older snapshots keep
    /// pointing at the frames they named.
    pub fn push_new(&mut self, frame: StackFrame) -> String {
        let frame_id = Uuid::new_v4().to_string();
        self.frames.push(frame.with_frame_id(frame_id.clone()));
        frame_id
    }

    /// Remove and return the top frame.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::Empty`] when there is nothing to pop.
    pub fn pop(&mut self) -> Result<StackFrame, StackError> {
        self.frames.pop().ok_or(StackError::Empty)
    }

    pub fn top(&self) -> Option<&StackFrame> {
        self.frames.last()
    }

    /// Frames from the top down
    pub fn iter_top_down(&self) -> impl Iterator<Item = &StackFrame> {
        self.frames.iter().rev()
    }

    pub fn frame(&self, frame_id: &str) -> Option<&StackFrame> {
        self.frames.iter().find(|frame| frame.frame_id() == frame_id)
    }

    pub fn contains_frame(&self, frame_id: &str) -> bool {
        self.frame(frame_id).is_some()
    }

    /// Whether the top frame equals `frame` apart from its id
    pub fn top_is_equivalent(&self, frame: &StackFrame) -> bool {
        self.top().is_some_and(|top| top.same_content(frame))
    }

    /// Top-most frame of a flow the user started
    pub fn top_user_flow_frame(&self) -> Option<&UserFlowFrame> {
        self.iter_top_down().find_map(StackFrame::as_user_flow)
    }

    pub fn user_flows_on_the_stack(&self) -> BTreeSet<&str> {
        self.frames
            .iter()
            .filter_map(StackFrame::as_user_flow)
            .map(|frame| frame.flow_id.as_str())
            .collect()
    }

    /// Whether a cancel pattern on the stack already lists `frame_id`
    pub fn is_canceled(&self, frame_id: &str) -> bool {
        self.frames.iter().any(|frame| match frame {
            StackFrame::CancelFlow(cancel) => cancel.canceled_frames.iter().any(|id| id == frame_id),
            _ => false,
        })
    }

    /// Slots the active flow has already asked for.
    ///
    /// Walks user flow frames from the top; a `link` frame continues the
    /// flow below it, so its predecessor's slots count as filled too.
    pub fn filled_slots_for_active_flow(&self, all_flows: &FlowsList) -> BTreeSet<String> {
        let mut filled = BTreeSet::new();

        for frame in self.iter_top_down().filter_map(StackFrame::as_user_flow) {
            if let Some(flow) = all_flows.flow_by_id(&frame.flow_id) {
                filled.extend(
                    flow.previous_collect_steps(&frame.step_id)
                        .into_iter()
                        .filter_map(|step| step.collect.clone()),
                );
            }
            if frame.frame_type != FlowFrameType::Link {
                break;
            }
        }
        filled
    }

    /// Serialized frames, bottom to top
    pub fn as_list(&self) -> Value {
        serde_json::to_value(&self.frames).unwrap_or_else(|_| Value::Array(Vec::new()))
    }

    /// Rebuild a stack from its serialized form. `null` is the empty stack.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::Corrupt`] when a record is not a known frame.
    pub fn from_list(value: &Value) -> Result<Self, StackError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        let frames: Vec<StackFrame> = serde_json::from_value(value.clone())?;
        Ok(Self { frames })
    }

    /// Read the stack persisted in the tracker's dialogue stack slot.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::Corrupt`] when the persisted value is not a
    /// list of known frames.
    pub fn from_tracker(tracker: &Tracker) -> Result<Self, StackError> {
        tracker
            .get_slot(DIALOGUE_STACK_SLOT)
            .map_or_else(|| Ok(Self::default()), Self::from_list)
    }

    /// Slot event persisting this snapshot
    pub fn to_event(&self) -> Event {
        Event::slot_set(DIALOGUE_STACK_SLOT, self.as_list())
    }
}
