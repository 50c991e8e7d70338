//! Derived, request-computed organization metrics. Nothing here is persisted.

use crate::model::{require_ordered, ModelValidationError};
use serde::{Deserialize, Serialize};

/// Inclusive time window in Unix epoch milliseconds.
///
/// Both bounds are required; a half-open request is rejected by the caller
/// before it reaches the core. An inverted window (`start > end`) is
/// rejected by `validate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: i64,
    pub end: i64,
}

impl DateRange {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        require_ordered("date_range", Some(self.start), Some(self.end))
    }

    /// Returns whether `instant` lies within `[start, end]`.
    pub fn contains(&self, instant: i64) -> bool {
        self.start <= instant && instant <= self.end
    }
}

/// Organization-wide counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationAnalytics {
    /// Number of patients registered in the organization.
    pub active_patients_count: usize,
    /// Consultations inside the requested window, or all when unbounded.
    pub consultations_count: usize,
    pub active_programs_count: usize,
    pub finished_programs_count: usize,
}
