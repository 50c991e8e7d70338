//! Group programs, their participants, meetings and attendance records.
//!
//! # Invariants
//! - At most one participation exists per `(program_id, patient_id)`.
//! - A participation is active while `leave_date` is unset.
//! - Attendance is keyed by `(program_meeting_id, patient_id)`; a second
//!   write for the same pair overwrites the first.

use crate::model::patch::{apply_required, Patch};
use crate::model::{
    require_ordered, require_text, MeetingId, ModelValidationError, OrganizationId, PatientId,
    ProgramId,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Program lifecycle state. Any state may follow any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProgramStatus {
    Planned,
    Active,
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub id: ProgramId,
    pub organization_id: OrganizationId,
    pub name: String,
    pub description: Option<String>,
    pub start_date: Option<i64>,
    pub end_date: Option<i64>,
    pub status: ProgramStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProgram {
    pub organization_id: OrganizationId,
    pub name: String,
    pub description: Option<String>,
    pub start_date: Option<i64>,
    pub end_date: Option<i64>,
    pub status: ProgramStatus,
}

impl NewProgram {
    /// Creates a planned program with no dates.
    pub fn planned(organization_id: OrganizationId, name: impl Into<String>) -> Self {
        Self {
            organization_id,
            name: name.into(),
            description: None,
            start_date: None,
            end_date: None,
            status: ProgramStatus::Planned,
        }
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        require_text("name", &self.name)?;
        require_ordered("program", self.start_date, self.end_date)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgramPatch {
    pub name: Option<String>,
    pub description: Patch<String>,
    pub start_date: Patch<i64>,
    pub end_date: Patch<i64>,
    pub status: Option<ProgramStatus>,
}

impl Program {
    pub fn apply_patch(&mut self, patch: &ProgramPatch) -> Result<(), ModelValidationError> {
        apply_required(&patch.name, &mut self.name);
        patch.description.apply_to(&mut self.description);
        patch.start_date.apply_to(&mut self.start_date);
        patch.end_date.apply_to(&mut self.end_date);
        apply_required(&patch.status, &mut self.status);
        require_text("name", &self.name)?;
        require_ordered("program", self.start_date, self.end_date)
    }
}

/// Enrollment of one patient in one program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramParticipant {
    pub id: Uuid,
    pub program_id: ProgramId,
    pub patient_id: PatientId,
    /// Unix epoch milliseconds, set by storage on insert.
    pub join_date: i64,
    /// Never written by this core; participations are removed by delete.
    pub leave_date: Option<i64>,
    pub notes: Option<String>,
}

impl ProgramParticipant {
    pub fn is_active(&self) -> bool {
        self.leave_date.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewParticipant {
    pub program_id: ProgramId,
    pub patient_id: PatientId,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramMeeting {
    pub id: MeetingId,
    pub program_id: ProgramId,
    /// Unix epoch milliseconds.
    pub date: i64,
    pub topic: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMeeting {
    pub program_id: ProgramId,
    pub date: i64,
    pub topic: String,
    pub notes: Option<String>,
}

impl NewMeeting {
    pub fn validate(&self) -> Result<(), ModelValidationError> {
        require_text("topic", &self.topic)
    }
}

/// Attendance and vitals captured for one patient at one meeting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramMeetingRecord {
    pub id: Uuid,
    pub program_meeting_id: MeetingId,
    pub patient_id: PatientId,
    pub present: bool,
    pub weight_kg: Option<f64>,
    pub blood_pressure: Option<String>,
    pub notes: Option<String>,
    /// Time of the latest write for this pair.
    pub recorded_at: i64,
}

/// Values written by an attendance upsert. Every field overwrites.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attendance {
    pub present: bool,
    pub weight_kg: Option<f64>,
    pub blood_pressure: Option<String>,
    pub notes: Option<String>,
}
