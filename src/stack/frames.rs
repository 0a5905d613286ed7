//! Stack frame variants
//!
//! Every frame is persisted as a JSON record tagged by `type`. Pattern frames
//! are pushed by the engine itself; their `flow_id` is the pattern's own id.

use crate::flows::START_STEP;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const FLOW_PATTERN_COLLECT_INFORMATION: &str = "pattern_collect_information";
pub const FLOW_PATTERN_CANCEL: &str = "pattern_cancel_flow";
pub const FLOW_PATTERN_CORRECTION: &str = "pattern_correction";
pub const FLOW_PATTERN_CLARIFICATION: &str = "pattern_clarification";
pub const FLOW_PATTERN_INTERNAL_ERROR: &str = "pattern_internal_error";
pub const FLOW_PATTERN_COMPLETED: &str = "pattern_completed";
pub const FLOW_PATTERN_CONTINUE_INTERRUPTED: &str = "pattern_continue_interrupted";

fn start_step() -> String {
    START_STEP.to_string()
}

/// How a user flow frame relates to the frame below it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowFrameType {
    /// Started on its own
    #[default]
    Regular,
    /// Started while another user flow was active
    Interrupt,
    /// Continues the flow below it
    Link,
    /// Re-entered to fix earlier answers
    Correction,
}

/// A flow the user started
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserFlowFrame {
    pub frame_id: String,
    pub flow_id: String,
    #[serde(default = "start_step")]
    pub step_id: String,
    #[serde(default)]
    pub frame_type: FlowFrameType,
}

impl UserFlowFrame {
    pub fn new(
        flow_id: impl Into<String>,
        step_id: impl Into<String>,
        frame_type: FlowFrameType,
    ) -> Self {
        Self {
            frame_id: String::new(),
            flow_id: flow_id.into(),
            step_id: step_id.into(),
            frame_type,
        }
    }
}

/// Asks the user for a slot on behalf of the flow below
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectInformationPatternFrame {
    pub frame_id: String,
    #[serde(default = "collect_information_flow")]
    pub flow_id: String,
    #[serde(default = "start_step")]
    pub step_id: String,
    pub collect_information: String,
}

fn collect_information_flow() -> String {
    FLOW_PATTERN_COLLECT_INFORMATION.to_string()
}

impl CollectInformationPatternFrame {
    pub fn new(collect_information: impl Into<String>) -> Self {
        Self {
            frame_id: String::new(),
            flow_id: collect_information_flow(),
            step_id: start_step(),
            collect_information: collect_information.into(),
        }
    }
}

/// Records that a user flow and everything stacked on it was abandoned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelPatternFrame {
    pub frame_id: String,
    #[serde(default = "cancel_flow")]
    pub flow_id: String,
    #[serde(default = "start_step")]
    pub step_id: String,
    pub canceled_name: String,
    /// Ids of the canceled frames, innermost first
    #[serde(default)]
    pub canceled_frames: Vec<String>,
}

fn cancel_flow() -> String {
    FLOW_PATTERN_CANCEL.to_string()
}

impl CancelPatternFrame {
    pub fn new(canceled_name: impl Into<String>, canceled_frames: Vec<String>) -> Self {
        Self {
            frame_id: String::new(),
            flow_id: cancel_flow(),
            step_id: start_step(),
            canceled_name: canceled_name.into(),
            canceled_frames,
        }
    }
}

/// Applies corrected slot values and rewinds the affected flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionPatternFrame {
    pub frame_id: String,
    #[serde(default = "correction_flow")]
    pub flow_id: String,
    #[serde(default = "start_step")]
    pub step_id: String,
    #[serde(default)]
    pub corrected_slots: BTreeMap<String, Value>,
    #[serde(default)]
    pub reset_flow_id: Option<String>,
    #[serde(default)]
    pub reset_step_id: Option<String>,
}

fn correction_flow() -> String {
    FLOW_PATTERN_CORRECTION.to_string()
}

impl CorrectionPatternFrame {
    pub fn new(
        corrected_slots: BTreeMap<String, Value>,
        reset_flow_id: Option<String>,
        reset_step_id: Option<String>,
    ) -> Self {
        Self {
            frame_id: String::new(),
            flow_id: correction_flow(),
            step_id: start_step(),
            corrected_slots,
            reset_flow_id,
            reset_step_id,
        }
    }
}

/// Asks the user which of several flows they meant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClarifyPatternFrame {
    pub frame_id: String,
    #[serde(default = "clarification_flow")]
    pub flow_id: String,
    #[serde(default = "start_step")]
    pub step_id: String,
    pub names: Vec<String>,
    #[serde(default)]
    pub clarification_options: String,
}

fn clarification_flow() -> String {
    FLOW_PATTERN_CLARIFICATION.to_string()
}

impl ClarifyPatternFrame {
    pub fn new(names: Vec<String>) -> Self {
        Self {
            frame_id: String::new(),
            flow_id: clarification_flow(),
            step_id: start_step(),
            names,
            clarification_options: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalErrorPatternFrame {
    pub frame_id: String,
    #[serde(default = "internal_error_flow")]
    pub flow_id: String,
    #[serde(default = "start_step")]
    pub step_id: String,
}

fn internal_error_flow() -> String {
    FLOW_PATTERN_INTERNAL_ERROR.to_string()
}

impl InternalErrorPatternFrame {
    pub fn new() -> Self {
        Self {
            frame_id: String::new(),
            flow_id: internal_error_flow(),
            step_id: start_step(),
        }
    }
}

impl Default for InternalErrorPatternFrame {
    fn default() -> Self {
        Self::new()
    }
}

/// Pushed by the flow executor once a user flow finished
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedPatternFrame {
    pub frame_id: String,
    #[serde(default = "completed_flow")]
    pub flow_id: String,
    #[serde(default = "start_step")]
    pub step_id: String,
    pub previous_flow_name: String,
}

fn completed_flow() -> String {
    FLOW_PATTERN_COMPLETED.to_string()
}

/// Pushed by the flow executor to resume an interrupted user flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinueInterruptedPatternFrame {
    pub frame_id: String,
    #[serde(default = "continue_interrupted_flow")]
    pub flow_id: String,
    #[serde(default = "start_step")]
    pub step_id: String,
    pub previous_flow_name: String,
}

fn continue_interrupted_flow() -> String {
    FLOW_PATTERN_CONTINUE_INTERRUPTED.to_string()
}

/// Free-form small talk outside of any flow
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChitChatFrame {
    pub frame_id: String,
}

/// Knowledge-base answer outside of any flow
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFrame {
    pub frame_id: String,
}

/// A frame on the dialogue stack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StackFrame {
    #[serde(rename = "flow")]
    UserFlow(UserFlowFrame),
    #[serde(rename = "pattern_collect_information")]
    CollectInformation(CollectInformationPatternFrame),
    #[serde(rename = "pattern_cancel_flow")]
    CancelFlow(CancelPatternFrame),
    #[serde(rename = "pattern_correction")]
    Correction(CorrectionPatternFrame),
    #[serde(rename = "pattern_clarification")]
    Clarify(ClarifyPatternFrame),
    #[serde(rename = "pattern_internal_error")]
    InternalError(InternalErrorPatternFrame),
    #[serde(rename = "pattern_completed")]
    Completed(CompletedPatternFrame),
    #[serde(rename = "pattern_continue_interrupted")]
    ContinueInterrupted(ContinueInterruptedPatternFrame),
    #[serde(rename = "chitchat")]
    ChitChat(ChitChatFrame),
    #[serde(rename = "search")]
    Search(SearchFrame),
}

impl StackFrame {
    /// The persisted `type` tag
    pub fn type_name(&self) -> &'static str {
        match self {
            StackFrame::UserFlow(_) => "flow",
            StackFrame::CollectInformation(_) => FLOW_PATTERN_COLLECT_INFORMATION,
            StackFrame::CancelFlow(_) => FLOW_PATTERN_CANCEL,
            StackFrame::Correction(_) => FLOW_PATTERN_CORRECTION,
            StackFrame::Clarify(_) => FLOW_PATTERN_CLARIFICATION,
            StackFrame::InternalError(_) => FLOW_PATTERN_INTERNAL_ERROR,
            StackFrame::Completed(_) => FLOW_PATTERN_COMPLETED,
            StackFrame::ContinueInterrupted(_) => FLOW_PATTERN_CONTINUE_INTERRUPTED,
            StackFrame::ChitChat(_) => "chitchat",
            StackFrame::Search(_) => "search",
        }
    }

    pub fn frame_id(&self) -> &str {
        match self {
            StackFrame::UserFlow(f) => &f.frame_id,
            StackFrame::CollectInformation(f) => &f.frame_id,
            StackFrame::CancelFlow(f) => &f.frame_id,
            StackFrame::Correction(f) => &f.frame_id,
            StackFrame::Clarify(f) => &f.frame_id,
            StackFrame::InternalError(f) => &f.frame_id,
            StackFrame::Completed(f) => &f.frame_id,
            StackFrame::ContinueInterrupted(f) => &f.frame_id,
            StackFrame::ChitChat(f) => &f.frame_id,
            StackFrame::Search(f) => &f.frame_id,
        }
    }

    fn frame_id_mut(&mut self) -> &mut String {
        match self {
            StackFrame::UserFlow(f) => &mut f.frame_id,
            StackFrame::CollectInformation(f) => &mut f.frame_id,
            StackFrame::CancelFlow(f) => &mut f.frame_id,
            StackFrame::Correction(f) => &mut f.frame_id,
            StackFrame::Clarify(f) => &mut f.frame_id,
            StackFrame::InternalError(f) => &mut f.frame_id,
            StackFrame::Completed(f) => &mut f.frame_id,
            StackFrame::ContinueInterrupted(f) => &mut f.frame_id,
            StackFrame::ChitChat(f) => &mut f.frame_id,
            StackFrame::Search(f) => &mut f.frame_id,
        }
    }

    #[must_use]
    pub fn with_frame_id(mut self, frame_id: impl Into<String>) -> Self {
        *self.frame_id_mut() = frame_id.into();
        self
    }

    /// Flow this frame executes. Chitchat and search frames run outside flows.
    pub fn flow_id(&self) -> Option<&str> {
        match self {
            StackFrame::UserFlow(f) => Some(&f.flow_id),
            StackFrame::CollectInformation(f) => Some(&f.flow_id),
            StackFrame::CancelFlow(f) => Some(&f.flow_id),
            StackFrame::Correction(f) => Some(&f.flow_id),
            StackFrame::Clarify(f) => Some(&f.flow_id),
            StackFrame::InternalError(f) => Some(&f.flow_id),
            StackFrame::Completed(f) => Some(&f.flow_id),
            StackFrame::ContinueInterrupted(f) => Some(&f.flow_id),
            StackFrame::ChitChat(_) | StackFrame::Search(_) => None,
        }
    }

    pub fn step_id(&self) -> Option<&str> {
        match self {
            StackFrame::UserFlow(f) => Some(&f.step_id),
            StackFrame::CollectInformation(f) => Some(&f.step_id),
            StackFrame::CancelFlow(f) => Some(&f.step_id),
            StackFrame::Correction(f) => Some(&f.step_id),
            StackFrame::Clarify(f) => Some(&f.step_id),
            StackFrame::InternalError(f) => Some(&f.step_id),
            StackFrame::Completed(f) => Some(&f.step_id),
            StackFrame::ContinueInterrupted(f) => Some(&f.step_id),
            StackFrame::ChitChat(_) | StackFrame::Search(_) => None,
        }
    }

    pub fn as_user_flow(&self) -> Option<&UserFlowFrame> {
        match self {
            StackFrame::UserFlow(frame) => Some(frame),
            _ => None,
        }
    }

    /// Whether two frames are equal apart from their ids
    pub fn same_content(&self, other: &StackFrame) -> bool {
        self.clone().with_frame_id("") == other.clone().with_frame_id("")
    }
}

impl From<UserFlowFrame> for StackFrame {
    fn from(frame: UserFlowFrame) -> Self {
        StackFrame::UserFlow(frame)
    }
}

impl From<CollectInformationPatternFrame> for StackFrame {
    fn from(frame: CollectInformationPatternFrame) -> Self {
        StackFrame::CollectInformation(frame)
    }
}

impl From<CancelPatternFrame> for StackFrame {
    fn from(frame: CancelPatternFrame) -> Self {
        StackFrame::CancelFlow(frame)
    }
}

impl From<CorrectionPatternFrame> for StackFrame {
    fn from(frame: CorrectionPatternFrame) -> Self {
        StackFrame::Correction(frame)
    }
}

impl From<ClarifyPatternFrame> for StackFrame {
    fn from(frame: ClarifyPatternFrame) -> Self {
        StackFrame::Clarify(frame)
    }
}

impl From<InternalErrorPatternFrame> for StackFrame {
    fn from(frame: InternalErrorPatternFrame) -> Self {
        StackFrame::InternalError(frame)
    }
}
