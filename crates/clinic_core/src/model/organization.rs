//! Tenants and the professionals they employ.

use crate::model::{require_text, ModelValidationError, OrganizationId, ProfessionalId};
use serde::{Deserialize, Serialize};

/// Tenant root. Every other record is owned by exactly one organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

/// Staff member of one organization. Owns tasks and authors clinical records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Professional {
    pub id: ProfessionalId,
    pub organization_id: OrganizationId,
    pub name: String,
    /// Login identity; unique across the whole store.
    pub email: String,
    pub specialty: Option<String>,
    pub created_at: i64,
}

/// Registration input for a professional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProfessional {
    pub organization_id: OrganizationId,
    pub name: String,
    pub email: String,
    pub specialty: Option<String>,
}

impl NewProfessional {
    pub fn validate(&self) -> Result<(), ModelValidationError> {
        require_text("name", &self.name)?;
        require_text("email", &self.email)
    }

    /// Emails are compared case-insensitively, so they are stored lowercase.
    pub fn normalized_email(&self) -> String {
        self.email.trim().to_lowercase()
    }
}
