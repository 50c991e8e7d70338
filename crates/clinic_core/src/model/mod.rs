//! Clinic domain model.
//!
//! # Responsibility
//! - Define the records shared by repositories and services.
//! - Hold write-side validation that must pass before persistence.
//!
//! # Invariants
//! - Every tenant-owned record carries an `organization_id`.
//! - Timestamps are Unix epoch milliseconds.
//! - Required text fields are non-blank; date ranges are never inverted.

pub mod analytics;
pub mod consultation;
pub mod nutrition_plan;
pub mod organization;
pub mod patch;
pub mod patient;
pub mod program;
pub mod task;

use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Tenant identifier. All reads and writes are scoped by it.
pub type OrganizationId = Uuid;
pub type ProfessionalId = Uuid;
pub type PatientId = Uuid;
pub type ProgramId = Uuid;
pub type MeetingId = Uuid;
pub type NutritionPlanId = Uuid;
pub type TaskId = Uuid;
pub type ConsultationId = Uuid;

/// Write-side validation failure for model inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelValidationError {
    /// A required text field is empty after trim.
    BlankField(&'static str),
    /// An end date precedes its start date.
    InvertedDateRange(&'static str),
}

impl Display for ModelValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankField(field) => write!(f, "`{field}` must not be blank"),
            Self::InvertedDateRange(field) => {
                write!(f, "`{field}` end date must not be earlier than start date")
            }
        }
    }
}

impl Error for ModelValidationError {}

pub(crate) fn require_text(field: &'static str, value: &str) -> Result<(), ModelValidationError> {
    if value.trim().is_empty() {
        return Err(ModelValidationError::BlankField(field));
    }
    Ok(())
}

pub(crate) fn require_ordered(
    field: &'static str,
    start: Option<i64>,
    end: Option<i64>,
) -> Result<(), ModelValidationError> {
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            return Err(ModelValidationError::InvertedDateRange(field));
        }
    }
    Ok(())
}
