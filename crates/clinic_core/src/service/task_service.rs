//! Task use-case service.
//!
//! Task status has no transition table: any status may be written at any
//! time, including moving back from `Done`.
//!
//! Linked professional, patient and program must belong to the task's
//! organization; a foreign or unknown reference is reported as `NotFound`.

use crate::model::task::{NewTask, Task, TaskPatch, TaskStatus};
use crate::model::{OrganizationId, PatientId, ProfessionalId, ProgramId, TaskId};
use crate::repo::organization_repo::OrganizationRepository;
use crate::repo::patient_repo::PatientRepository;
use crate::repo::program_repo::ProgramRepository;
use crate::repo::task_repo::{TaskListQuery, TaskRepository};
use crate::service::error::{missing_as, EntityKind, ServiceError, ServiceResult};
use log::info;

pub struct TaskService<T, Pa, P, O>
where
    T: TaskRepository,
    Pa: PatientRepository,
    P: ProgramRepository,
    O: OrganizationRepository,
{
    tasks: T,
    patients: Pa,
    programs: P,
    organizations: O,
}

impl<T, Pa, P, O> TaskService<T, Pa, P, O>
where
    T: TaskRepository,
    Pa: PatientRepository,
    P: ProgramRepository,
    O: OrganizationRepository,
{
    pub fn new(tasks: T, patients: Pa, programs: P, organizations: O) -> Self {
        Self {
            tasks,
            patients,
            programs,
            organizations,
        }
    }

    /// Creates a task; status defaults to `Pending`.
    pub fn create_task(&self, input: &NewTask) -> ServiceResult<Task> {
        input.validate()?;
        self.require_professional(input.organization_id, input.professional_id)?;
        if let Some(patient_id) = input.patient_id {
            self.require_patient(input.organization_id, patient_id)?;
        }
        if let Some(program_id) = input.program_id {
            self.require_program(input.organization_id, program_id)?;
        }

        let task = self.tasks.create(input)?;
        info!(
            "event=task_create module=service status=ok org={} task={}",
            task.organization_id, task.id
        );
        Ok(task)
    }

    pub fn update_status(
        &self,
        organization_id: OrganizationId,
        id: TaskId,
        status: TaskStatus,
    ) -> ServiceResult<Task> {
        self.update_task(organization_id, id, &TaskPatch::status(status))
    }

    pub fn update_task(
        &self,
        organization_id: OrganizationId,
        id: TaskId,
        patch: &TaskPatch,
    ) -> ServiceResult<Task> {
        if self.tasks.find_by_id(id, organization_id)?.is_none() {
            return Err(ServiceError::not_found(EntityKind::Task, id));
        }
        if let Some(patient_id) = patch.patient_id.as_set() {
            self.require_patient(organization_id, *patient_id)?;
        }
        if let Some(program_id) = patch.program_id.as_set() {
            self.require_program(organization_id, *program_id)?;
        }

        let task = self
            .tasks
            .update(id, organization_id, patch)
            .map_err(missing_as(EntityKind::Task))?;
        info!(
            "event=task_update module=service status=ok org={organization_id} task={id} task_status={:?}",
            task.status
        );
        Ok(task)
    }

    pub fn get_task(
        &self,
        organization_id: OrganizationId,
        id: TaskId,
    ) -> ServiceResult<Option<Task>> {
        Ok(self.tasks.find_by_id(id, organization_id)?)
    }

    pub fn list_tasks(
        &self,
        organization_id: OrganizationId,
        query: &TaskListQuery,
    ) -> ServiceResult<Vec<Task>> {
        Ok(self.tasks.list(organization_id, query)?)
    }

    pub fn delete_task(&self, organization_id: OrganizationId, id: TaskId) -> ServiceResult<()> {
        self.tasks
            .delete(id, organization_id)
            .map_err(missing_as(EntityKind::Task))
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

    fn require_patient(
        &self,
        organization_id: OrganizationId,
        patient_id: PatientId,
    ) -> ServiceResult<()> {
        match self.patients.find_by_id(patient_id, organization_id)? {
            Some(_) => Ok(()),
            None => Err(ServiceError::not_found(EntityKind::Patient, patient_id)),
        }
    }

    fn require_program(
        &self,
        organization_id: OrganizationId,
        program_id: ProgramId,
    ) -> ServiceResult<()> {
        match self.programs.find_program(program_id, organization_id)? {
            Some(_) => Ok(()),
            None => Err(ServiceError::not_found(EntityKind::Program, program_id)),
        }
    }
}
