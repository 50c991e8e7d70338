//! Nutrition plan use-case service.
//!
//! # Responsibility
//! - Create and edit plans while keeping a single active plan per patient.
//!
//! # Invariants
//! - Activation (on create or update) deactivates the patient's other active
//!   plan inside the same serialized write, so concurrent activations for
//!   one patient cannot leave two active plans.
//! - Deactivation never touches plans of other patients or organizations.
//! - A linked professional must belong to the plan's organization.

use crate::model::nutrition_plan::{NewNutritionPlan, NutritionPlan, NutritionPlanPatch};
use crate::model::{NutritionPlanId, OrganizationId, PatientId, ProfessionalId};
use crate::repo::nutrition_plan_repo::NutritionPlanRepository;
use crate::repo::organization_repo::OrganizationRepository;
use crate::repo::patient_repo::PatientRepository;
use crate::service::error::{missing_as, EntityKind, ServiceError, ServiceResult};
use log::info;

pub struct NutritionPlanService<N, Pa, O>
where
    N: NutritionPlanRepository,
    Pa: PatientRepository,
    O: OrganizationRepository,
{
    plans: N,
    patients: Pa,
    organizations: O,
}

impl<N, Pa, O> NutritionPlanService<N, Pa, O>
where
    N: NutritionPlanRepository,
    Pa: PatientRepository,
    O: OrganizationRepository,
{
    pub fn new(plans: N, patients: Pa, organizations: O) -> Self {
        Self {
            plans,
            patients,
            organizations,
        }
    }

    /// Creates a plan with its meals. Unless `is_active` is explicitly
    /// `false`, the new plan becomes the patient's only active plan.
    pub fn create_plan(&self, input: &NewNutritionPlan) -> ServiceResult<NutritionPlan> {
        input.validate()?;
        if self
            .patients
            .find_by_id(input.patient_id, input.organization_id)?
            .is_none()
        {
            return Err(ServiceError::not_found(
                EntityKind::Patient,
                input.patient_id,
            ));
        }
        if let Some(professional_id) = input.professional_id {
            self.require_professional(input.organization_id, professional_id)?;
        }

        let (plan, deactivated) = self.plans.serialized(|writer| -> ServiceResult<_> {
            let deactivated = if input.effective_is_active() {
                writer.deactivate_active_for_patient(
                    input.organization_id,
                    input.patient_id,
                    None,
                )?
            } else {
                0
            };
            Ok((writer.insert(input)?, deactivated))
        })?;

        info!(
            "event=nutrition_plan_create module=service status=ok org={} patient={} plan={} active={} deactivated={}",
            plan.organization_id, plan.patient_id, plan.id, plan.is_active, deactivated
        );
        Ok(plan)
    }

    /// Applies `patch`. Turning an inactive plan active deactivates whichever
    /// plan was active for the same patient.
    pub fn update_plan(
        &self,
        organization_id: OrganizationId,
        id: NutritionPlanId,
        patch: &NutritionPlanPatch,
    ) -> ServiceResult<NutritionPlan> {
        if let Some(professional_id) = patch.professional_id.as_set() {
            self.require_professional(organization_id, *professional_id)?;
        }
        let (plan, deactivated) = self.plans.serialized(|writer| -> ServiceResult<_> {
            let current = writer
                .find_by_id(id, organization_id)?
                .ok_or(ServiceError::not_found(EntityKind::NutritionPlan, id))?;
            let deactivated = if patch.activates(&current) {
                writer.deactivate_active_for_patient(
                    organization_id,
                    current.patient_id,
                    Some(id),
                )?
            } else {
                0
            };
            let updated = writer
                .apply_patch(id, organization_id, patch)
                .map_err(missing_as(EntityKind::NutritionPlan))?;
            Ok((updated, deactivated))
        })?;

        info!(
            "event=nutrition_plan_update module=service status=ok org={organization_id} plan={id} active={} deactivated={deactivated}",
            plan.is_active
        );
        Ok(plan)
    }

    pub fn get_plan(
        &self,
        organization_id: OrganizationId,
        id: NutritionPlanId,
    ) -> ServiceResult<Option<NutritionPlan>> {
        Ok(self.plans.find_by_id(id, organization_id)?)
    }

    /// All plans of one patient, newest first.
    pub fn list_plans(
        &self,
        organization_id: OrganizationId,
        patient_id: PatientId,
    ) -> ServiceResult<Vec<NutritionPlan>> {
        Ok(self.plans.list_by_patient(organization_id, patient_id)?)
    }

    pub fn active_plan(
        &self,
        organization_id: OrganizationId,
        patient_id: PatientId,
    ) -> ServiceResult<Option<NutritionPlan>> {
        Ok(self
            .plans
            .find_active_for_patient(organization_id, patient_id)?)
    }

    pub fn delete_plan(
        &self,
        organization_id: OrganizationId,
        id: NutritionPlanId,
    ) -> ServiceResult<()> {
        self.plans
            .delete(id, organization_id)
            .map_err(missing_as(EntityKind::NutritionPlan))?;
        info!("event=nutrition_plan_delete module=service status=ok org={organization_id} plan={id}");
        Ok(())
    }

    fn require_professional(
        &self,
        organization_id: OrganizationId,
        professional_id: ProfessionalId,
    ) -> ServiceResult<()> {
        match self
            .organizations
            .find_professional(professional_id, organization_id)?
        {
            Some(_) => Ok(()),
            None => Err(ServiceError::not_found(
                EntityKind::Professional,
                professional_id,
            )),
        }
    }
}
