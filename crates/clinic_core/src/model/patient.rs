//! Patient record.
//!
//! # Invariants
//! - Tags are trimmed, lowercase, deduplicated and sorted.
//! - Deleting a patient never cascades into historical records.

use crate::model::patch::{apply_required, Patch};
use crate::model::{require_text, ModelValidationError, OrganizationId, PatientId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: PatientId,
    pub organization_id: OrganizationId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Unix epoch milliseconds.
    pub birth_date: Option<i64>,
    pub gender: Option<String>,
    /// Free-form labels, normalized.
    pub tags: Vec<String>,
    pub notes: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Intake input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPatient {
    pub organization_id: OrganizationId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub birth_date: Option<i64>,
    pub gender: Option<String>,
    pub tags: Vec<String>,
    pub notes: Option<String>,
}

impl NewPatient {
    pub fn validate(&self) -> Result<(), ModelValidationError> {
        require_text("name", &self.name)
    }
}

/// Partial update. `tags`, when present, replaces the whole set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatientPatch {
    pub name: Option<String>,
    pub email: Patch<String>,
    pub phone: Patch<String>,
    pub birth_date: Patch<i64>,
    pub gender: Patch<String>,
    pub tags: Option<Vec<String>>,
    pub notes: Patch<String>,
}

impl Patient {
    /// Applies `patch` in place and re-validates the result.
    pub fn apply_patch(&mut self, patch: &PatientPatch) -> Result<(), ModelValidationError> {
        apply_required(&patch.name, &mut self.name);
        patch.email.apply_to(&mut self.email);
        patch.phone.apply_to(&mut self.phone);
        patch.birth_date.apply_to(&mut self.birth_date);
        patch.gender.apply_to(&mut self.gender);
        if let Some(tags) = &patch.tags {
            self.tags = normalize_tags(tags);
        }
        patch.notes.apply_to(&mut self.notes);
        require_text("name", &self.name)
    }
}

/// Normalizes one tag value; blank input yields `None`.
pub fn normalize_tag(tag: &str) -> Option<String> {
    let trimmed = tag.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Normalizes, deduplicates and sorts tag values.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut unique = BTreeSet::new();
    for tag in tags {
        if let Some(value) = normalize_tag(tag) {
            unique.insert(value);
        }
    }
    unique.into_iter().collect()
}
