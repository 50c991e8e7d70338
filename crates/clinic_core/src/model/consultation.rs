//! Consultation records, counted by organization analytics.

use crate::model::{ConsultationId, OrganizationId, PatientId, ProfessionalId};
use serde::{Deserialize, Serialize};

/// One clinical encounter between a professional and a patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consultation {
    pub id: ConsultationId,
    pub organization_id: OrganizationId,
    pub patient_id: PatientId,
    pub professional_id: ProfessionalId,
    /// Unix epoch milliseconds.
    pub date: i64,
    pub notes: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewConsultation {
    pub organization_id: OrganizationId,
    pub patient_id: PatientId,
    pub professional_id: ProfessionalId,
    pub date: i64,
    pub notes: Option<String>,
}
