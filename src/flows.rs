//! Flow catalog
//!
//! Read-only access to the flow definitions a conversation can run. Frames on
//! the dialogue stack reference flows by id; the catalog resolves them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use thiserror::Error;

/// Step id of a flow that has been pushed but not yet started
pub const START_STEP: &str = "__start__";

/// Step id of a flow that ran through all of its steps
pub const END_STEP: &str = "__end__";

#[derive(Debug, Error)]
pub enum FlowsError {
    #[error("Failed to read flow definitions: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid flow definitions: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Flow '{flow_id}' declares step '{step_id}' more than once")]
    DuplicateStep { flow_id: String, step_id: String },
    #[error("Flow '{flow_id}' uses reserved step id '{step_id}'")]
    ReservedStep { flow_id: String, step_id: String },
}

/// A single step of a flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowStep {
    pub id: String,
    /// Action the bot runs when the flow reaches this step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    /// Slot this step asks the user for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collect: Option<String>,
}

/// An immutable flow definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Flow {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub steps: Vec<FlowStep>,
}

impl Flow {
    pub fn new(id: impl Into<String>, name: impl Into<String>, steps: Vec<FlowStep>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
            description: None,
            steps,
        }
    }

    /// Name shown to users, falling back to the flow id
    pub fn readable_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    /// Collect steps the flow has already passed when it sits at `step_id`.
    ///
    /// A flow at [`START_STEP`] has asked nothing yet, a flow at [`END_STEP`]
    /// has asked everything. Unknown step ids are treated like the start.
    pub fn previous_collect_steps(&self, step_id: &str) -> Vec<&FlowStep> {
        let passed = if step_id == END_STEP {
            self.steps.len()
        } else {
            self.steps
                .iter()
                .position(|step| step.id == step_id)
                .unwrap_or(0)
        };

        self.steps
            .iter()
            .take(passed)
            .filter(|step| step.collect.is_some())
            .collect()
    }

    /// Every slot any step of this flow collects
    pub fn collected_slots(&self) -> BTreeSet<&str> {
        self.steps
            .iter()
            .filter_map(|step| step.collect.as_deref())
            .collect()
    }

    fn validate(&self) -> Result<(), FlowsError> {
        let mut seen = BTreeSet::new();
        for step in &self.steps {
            if step.id == START_STEP || step.id == END_STEP {
                return Err(FlowsError::ReservedStep {
                    flow_id: self.id.clone(),
                    step_id: step.id.clone(),
                });
            }
            if !seen.insert(step.id.as_str()) {
                return Err(FlowsError::DuplicateStep {
                    flow_id: self.id.clone(),
                    step_id: step.id.clone(),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct FlowDefinition {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    steps: Vec<FlowStep>,
}

#[derive(Debug, Deserialize)]
struct FlowsDocument {
    #[serde(default)]
    flows: BTreeMap<String, FlowDefinition>,
}

/// All flows known to the assistant, ordered by id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowsList {
    flows: Vec<Flow>,
}

impl FlowsList {
    pub fn new(mut flows: Vec<Flow>) -> Self {
        flows.sort_by(|a, b| a.id.cmp(&b.id));
        Self { flows }
    }

    /// Build the catalog from a `{"flows": {"<id>": {...}}}` document.
    ///
    /// # Errors
    ///
    /// Fails when the document does not match the flow schema or a flow
    /// declares duplicate or reserved step ids.
    pub fn from_json(value: Value) -> Result<Self, FlowsError> {
        let document: FlowsDocument = serde_json::from_value(value)?;
        let flows = document
            .flows
            .into_iter()
            .map(|(id, definition)| Flow {
                id,
                name: definition.name,
                description: definition.description,
                steps: definition.steps,
            })
            .collect::<Vec<_>>();

        for flow in &flows {
            flow.validate()?;
        }
        Ok(Self::new(flows))
    }

    /// # Errors
    ///
    /// See [`FlowsList::from_json`].
    pub fn from_json_str(raw: &str) -> Result<Self, FlowsError> {
        Self::from_json(serde_json::from_str(raw)?)
    }

    /// Load flow definitions from a JSON file.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or its content is invalid.
    pub fn load(path: &Path) -> Result<Self, FlowsError> {
        let raw = std::fs::read_to_string(path)?;
        let flows = Self::from_json_str(&raw)?;
        tracing::debug!(path = %path.display(), count = flows.len(), "Loaded flows");
        Ok(flows)
    }

    pub fn flow_by_id(&self, id: &str) -> Option<&Flow> {
        self.flows.iter().find(|flow| flow.id == id)
    }

    pub fn flow_ids(&self) -> impl Iterator<Item = &str> {
        self.flows.iter().map(|flow| flow.id.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Flow> {
        self.flows.iter()
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }
}
