//! Program lifecycle use-case service.
//!
//! # Responsibility
//! - Manage program enrollment, meetings and attendance.
//!
//! # Invariants
//! - A program, meeting or patient from another organization behaves as
//!   absent.
//! - At most one participation per `(program, patient)`; removal deletes it
//!   so the pair can enroll again immediately.
//! - Attendance writes are upserts keyed by `(meeting, patient)`.

use crate::model::program::{
    Attendance, NewMeeting, NewParticipant, NewProgram, Program, ProgramMeeting,
    ProgramMeetingRecord, ProgramParticipant, ProgramPatch,
};
use crate::model::{MeetingId, OrganizationId, PatientId, ProgramId};
use crate::repo::patient_repo::PatientRepository;
use crate::repo::program_repo::{ProgramListQuery, ProgramRepository};
use crate::repo::RepoError;
use crate::service::error::{missing_as, ConflictRule, EntityKind, ServiceError, ServiceResult};
use log::info;

pub struct ProgramLifecycleService<P: ProgramRepository, Pa: PatientRepository> {
    programs: P,
    patients: Pa,
}

impl<P: ProgramRepository, Pa: PatientRepository> ProgramLifecycleService<P, Pa> {
    pub fn new(programs: P, patients: Pa) -> Self {
        Self { programs, patients }
    }

    pub fn create_program(&self, program: &NewProgram) -> ServiceResult<Program> {
        let created = self.programs.create_program(program)?;
        info!(
            "event=program_create module=service status=ok org={} program={}",
            created.organization_id, created.id
        );
        Ok(created)
    }

    pub fn get_program(
        &self,
        organization_id: OrganizationId,
        id: ProgramId,
    ) -> ServiceResult<Option<Program>> {
        Ok(self.programs.find_program(id, organization_id)?)
    }

    pub fn list_programs(
        &self,
        organization_id: OrganizationId,
        query: &ProgramListQuery,
    ) -> ServiceResult<Vec<Program>> {
        Ok(self.programs.list_programs(organization_id, query)?)
    }

    /// Applies `patch`; status may move between any two states.
    pub fn update_program(
        &self,
        organization_id: OrganizationId,
        id: ProgramId,
        patch: &ProgramPatch,
    ) -> ServiceResult<Program> {
        self.programs
            .update_program(id, organization_id, patch)
            .map_err(missing_as(EntityKind::Program))
    }

    /// Deletes the program together with its enrollment and meeting history.
    pub fn delete_program(
        &self,
        organization_id: OrganizationId,
        id: ProgramId,
    ) -> ServiceResult<()> {
        self.programs
            .delete_program(id, organization_id)
            .map_err(missing_as(EntityKind::Program))?;
        info!("event=program_delete module=service status=ok org={organization_id} program={id}");
        Ok(())
    }

    /// Enrolls a patient of the same organization into a program.
    ///
    /// # Errors
    /// - `NotFound(Program)` / `NotFound(Patient)` when either is absent in
    ///   `organization_id`.
    /// - `Conflict(AlreadyParticipant)` when the pair is already enrolled,
    ///   including when a concurrent enrollment wins the race.
    pub fn add_participant(
        &self,
        organization_id: OrganizationId,
        program_id: ProgramId,
        patient_id: PatientId,
        notes: Option<String>,
    ) -> ServiceResult<ProgramParticipant> {
        self.require_program(organization_id, program_id)?;
        if self
            .patients
            .find_by_id(patient_id, organization_id)?
            .is_none()
        {
            return Err(ServiceError::not_found(EntityKind::Patient, patient_id));
        }
        if self
            .programs
            .find_participant(program_id, patient_id)?
            .is_some()
        {
            return Err(ServiceError::Conflict(ConflictRule::AlreadyParticipant));
        }

        let participant = self
            .programs
            .insert_participant(&NewParticipant {
                program_id,
                patient_id,
                notes,
            })
            .map_err(|err| match err {
                RepoError::UniqueViolation(_) => {
                    ServiceError::Conflict(ConflictRule::AlreadyParticipant)
                }
                other => other.into(),
            })?;
        info!(
            "event=participant_add module=service status=ok org={organization_id} program={program_id} patient={patient_id}"
        );
        Ok(participant)
    }

    /// Removes an enrollment. The pair may be enrolled again afterwards.
    ///
    /// # Errors
    /// - `NotFound(Program)` when the program is absent in `organization_id`.
    /// - `Conflict(NotParticipant)` when the patient is not enrolled.
    pub fn remove_participant(
        &self,
        organization_id: OrganizationId,
        program_id: ProgramId,
        patient_id: PatientId,
    ) -> ServiceResult<()> {
        self.require_program(organization_id, program_id)?;
        self.programs
            .delete_participant(program_id, patient_id)
            .map_err(|err| match err {
                RepoError::NotFound(_) => ServiceError::Conflict(ConflictRule::NotParticipant),
                other => other.into(),
            })?;
        info!(
            "event=participant_remove module=service status=ok org={organization_id} program={program_id} patient={patient_id}"
        );
        Ok(())
    }

    pub fn list_participants(
        &self,
        organization_id: OrganizationId,
        program_id: ProgramId,
    ) -> ServiceResult<Vec<ProgramParticipant>> {
        self.require_program(organization_id, program_id)?;
        Ok(self.programs.list_participants(program_id)?)
    }

    pub fn schedule_meeting(
        &self,
        organization_id: OrganizationId,
        meeting: &NewMeeting,
    ) -> ServiceResult<ProgramMeeting> {
        self.require_program(organization_id, meeting.program_id)?;
        let created = self.programs.create_meeting(meeting)?;
        info!(
            "event=meeting_schedule module=service status=ok org={organization_id} program={} meeting={}",
            created.program_id, created.id
        );
        Ok(created)
    }

    pub fn list_meetings(
        &self,
        organization_id: OrganizationId,
        program_id: ProgramId,
    ) -> ServiceResult<Vec<ProgramMeeting>> {
        self.require_program(organization_id, program_id)?;
        Ok(self.programs.list_meetings(program_id)?)
    }

    /// Records attendance for one patient at one meeting.
    ///
    /// The first call for a pair creates the record; later calls overwrite
    /// every field. Enrollment in the program is not required.
    pub fn record_attendance(
        &self,
        organization_id: OrganizationId,
        meeting_id: MeetingId,
        patient_id: PatientId,
        attendance: &Attendance,
    ) -> ServiceResult<ProgramMeetingRecord> {
        if self
            .programs
            .find_meeting(meeting_id, organization_id)?
            .is_none()
        {
            return Err(ServiceError::not_found(EntityKind::Meeting, meeting_id));
        }
        if self
            .patients
            .find_by_id(patient_id, organization_id)?
            .is_none()
        {
            return Err(ServiceError::not_found(EntityKind::Patient, patient_id));
        }

        let record = self
            .programs
            .upsert_meeting_record(meeting_id, patient_id, attendance)?;
        info!(
            "event=attendance_record module=service status=ok org={organization_id} meeting={meeting_id} patient={patient_id} present={}",
            record.present
        );
        Ok(record)
    }

    pub fn list_attendance(
        &self,
        organization_id: OrganizationId,
        meeting_id: MeetingId,
    ) -> ServiceResult<Vec<ProgramMeetingRecord>> {
        if self
            .programs
            .find_meeting(meeting_id, organization_id)?
            .is_none()
        {
            return Err(ServiceError::not_found(EntityKind::Meeting, meeting_id));
        }
        Ok(self.programs.list_meeting_records(meeting_id)?)
    }

    fn require_program(
        &self,
        organization_id: OrganizationId,
        program_id: ProgramId,
    ) -> ServiceResult<Program> {
        self.programs
            .find_program(program_id, organization_id)?
            .ok_or(ServiceError::not_found(EntityKind::Program, program_id))
    }
}
