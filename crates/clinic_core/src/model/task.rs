//! Professional to-do items.

use crate::model::patch::{apply_required, Patch};
use crate::model::{
    require_text, ModelValidationError, OrganizationId, PatientId, ProfessionalId, ProgramId,
    TaskId,
};
use serde::{Deserialize, Serialize};

/// Task state. There is no transition table; any value may follow any other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub organization_id: OrganizationId,
    pub professional_id: ProfessionalId,
    pub patient_id: Option<PatientId>,
    pub program_id: Option<ProgramId>,
    pub title: String,
    pub description: Option<String>,
    /// Unix epoch milliseconds.
    pub due_date: Option<i64>,
    pub status: TaskStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    pub organization_id: OrganizationId,
    pub professional_id: ProfessionalId,
    pub patient_id: Option<PatientId>,
    pub program_id: Option<ProgramId>,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<i64>,
    /// Defaults to `Pending`.
    pub status: Option<TaskStatus>,
}

impl NewTask {
    pub fn new(
        organization_id: OrganizationId,
        professional_id: ProfessionalId,
        title: impl Into<String>,
    ) -> Self {
        Self {
            organization_id,
            professional_id,
            patient_id: None,
            program_id: None,
            title: title.into(),
            description: None,
            due_date: None,
            status: None,
        }
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        require_text("title", &self.title)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Patch<String>,
    pub patient_id: Patch<PatientId>,
    pub program_id: Patch<ProgramId>,
    pub due_date: Patch<i64>,
    pub status: Option<TaskStatus>,
}

impl TaskPatch {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

impl Task {
    pub fn apply_patch(&mut self, patch: &TaskPatch) -> Result<(), ModelValidationError> {
        apply_required(&patch.title, &mut self.title);
        patch.description.apply_to(&mut self.description);
        patch.patient_id.apply_to(&mut self.patient_id);
        patch.program_id.apply_to(&mut self.program_id);
        patch.due_date.apply_to(&mut self.due_date);
        apply_required(&patch.status, &mut self.status);
        require_text("title", &self.title)
    }
}
