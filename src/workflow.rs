use std::collections::HashMap;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum WorkflowError {
    #[error("Step index {index} out of range for {len} steps")]
    IndexOutOfRange { index: usize, len: usize },
}

/// A named, ordered collection of steps plus a free-text narrative
/// describing how the assigned agents should cooperate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub workflow_description: String,
    #[serde(default)]
    pub steps: Vec<Step>,
    pub created_at: DateTime<Local>,
    pub updated_at: DateTime<Local>,
}

/// One unit of work within a workflow.
///
/// `id` is the stable identity (unique within the workflow, unchanged by
/// edits); `order` is the human-facing position other steps use to declare
/// dependencies. Editing operations keep orders dense at `1..=N` and rewrite
/// dependency values whenever orders shift, so a dependency never silently
/// follows the wrong step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub id: String,
    pub order: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<Uuid>,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub dependencies: Vec<u32>,
}

/// A field assignment for [`Workflow::set_step_field`].
#[derive(Clone, Debug)]
pub enum StepField {
    Agent(Option<Uuid>),
    Action(String),
    /// Free text as typed into a dependency input, e.g. `"1, 2"`.
    Dependencies(String),
}

impl Workflow {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Local::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            workflow_description: String::new(),
            steps: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Appends an empty step numbered after the current last one: no agent,
    /// no action, no dependencies.
    pub fn add_step(&mut self) {
        self.steps.push(Step {
            id: Uuid::new_v4().to_string(),
            order: self.steps.len() as u32 + 1,
            agent_id: None,
            action: String::new(),
            dependencies: Vec::new(),
        });
    }

    /// Removes the step at `index`, renumbers the survivors to a dense
    /// `1..=N` and rewrites their dependency values to follow the shift.
    ///
    /// Dependencies on the removed step's order are dropped (the target no
    /// longer exists). Dependencies that never resolved to any step are kept
    /// as-is so the graph builder can still report them. The remap is
    /// computed from a snapshot of the pre-removal order assignment, never
    /// from orders mutated mid-pass.
    pub fn remove_step(&mut self, index: usize) -> Result<(), WorkflowError> {
        if index >= self.steps.len() {
            return Err(WorkflowError::IndexOutOfRange {
                index,
                len: self.steps.len(),
            });
        }

        let removed_order = self.steps[index].order;

        // Snapshot: each surviving step's old order -> its new dense order.
        let remap: HashMap<u32, u32> = self
            .steps
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .zip(1u32..)
            .map(|((_, step), new_order)| (step.order, new_order))
            .collect();

        self.steps.remove(index);
        for (i, step) in self.steps.iter_mut().enumerate() {
            step.order = i as u32 + 1;
            step.dependencies.retain(|dep| *dep != removed_order);
            for dep in &mut step.dependencies {
                if let Some(new_order) = remap.get(dep) {
                    *dep = *new_order;
                }
            }
        }
        Ok(())
    }

    /// Replaces one field of the step at `index`. Dependency text is parsed
    /// with [`parse_dependencies`].
    pub fn set_step_field(
        &mut self,
        index: usize,
        field: StepField,
    ) -> Result<(), WorkflowError> {
        let len = self.steps.len();
        let step = self
            .steps
            .get_mut(index)
            .ok_or(WorkflowError::IndexOutOfRange { index, len })?;

        match field {
            StepField::Agent(agent_id) => step.agent_id = agent_id,
            StepField::Action(action) => step.action = action,
            StepField::Dependencies(text) => step.dependencies = parse_dependencies(&text),
        }
        Ok(())
    }
}

/// Parses free-form comma-separated text into dependency order numbers.
///
/// Total over any input: tokens are trimmed, and empty or non-numeric tokens
/// are silently discarded rather than rejected. This is the same policy the
/// entry form applies while the user is still typing.
pub fn parse_dependencies(text: &str) -> Vec<u32> {
    text.split(',')
        .map(str::trim)
        .filter_map(|token| token.parse::<u32>().ok())
        .collect()
}
