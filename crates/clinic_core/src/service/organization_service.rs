//! Tenant and staff registration.

use crate::model::organization::{NewProfessional, Organization, Professional};
use crate::model::{OrganizationId, ProfessionalId};
use crate::repo::organization_repo::OrganizationRepository;
use crate::repo::RepoError;
use crate::service::error::{ConflictRule, EntityKind, ServiceError, ServiceResult};
use log::info;

pub struct OrganizationService<O: OrganizationRepository> {
    organizations: O,
}

impl<O: OrganizationRepository> OrganizationService<O> {
    pub fn new(organizations: O) -> Self {
        Self { organizations }
    }

    pub fn create_organization(&self, name: &str) -> ServiceResult<Organization> {
        let organization = self.organizations.create_organization(name)?;
        info!(
            "event=organization_create module=service status=ok org={}",
            organization.id
        );
        Ok(organization)
    }

    pub fn get_organization(&self, id: OrganizationId) -> ServiceResult<Option<Organization>> {
        Ok(self.organizations.find_organization(id)?)
    }

    /// Registers a professional in an existing organization.
    ///
    /// # Errors
    /// - `NotFound(Organization)` when the organization does not exist.
    /// - `Conflict(EmailInUse)` when the email is already registered,
    ///   case-insensitively and in any organization.
    pub fn register_professional(&self, input: &NewProfessional) -> ServiceResult<Professional> {
        if self
            .organizations
            .find_organization(input.organization_id)?
            .is_none()
        {
            return Err(ServiceError::not_found(
                EntityKind::Organization,
                input.organization_id,
            ));
        }

        let professional = self
            .organizations
            .create_professional(input)
            .map_err(|err| match err {
                RepoError::UniqueViolation(_) => ServiceError::Conflict(ConflictRule::EmailInUse),
                other => other.into(),
            })?;
        info!(
            "event=professional_register module=service status=ok org={} professional={}",
            professional.organization_id, professional.id
        );
        Ok(professional)
    }

    pub fn get_professional(
        &self,
        organization_id: OrganizationId,
        id: ProfessionalId,
    ) -> ServiceResult<Option<Professional>> {
        Ok(self.organizations.find_professional(id, organization_id)?)
    }

    pub fn list_professionals(
        &self,
        organization_id: OrganizationId,
    ) -> ServiceResult<Vec<Professional>> {
        Ok(self.organizations.list_professionals(organization_id)?)
    }
}
