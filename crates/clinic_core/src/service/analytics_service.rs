//! Organization analytics aggregation.
//!
//! # Invariants
//! - The three underlying reads run concurrently and all must succeed; one
//!   failure fails the whole request with that error.
//! - Consultation counting honours the inclusive `[start, end]` window when
//!   a range is supplied and counts everything otherwise.

use crate::model::analytics::{DateRange, OrganizationAnalytics};
use crate::model::program::ProgramStatus;
use crate::model::OrganizationId;
use crate::repo::consultation_repo::ConsultationRepository;
use crate::repo::patient_repo::{PatientListQuery, PatientRepository};
use crate::repo::program_repo::{ProgramListQuery, ProgramRepository};
use crate::service::error::{ServiceError, ServiceResult};
use log::info;
use std::thread;
use std::time::Instant;

pub struct AnalyticsService<P, C, G>
where
    P: PatientRepository + Sync,
    C: ConsultationRepository + Sync,
    G: ProgramRepository + Sync,
{
    patients: P,
    consultations: C,
    programs: G,
}

impl<P, C, G> AnalyticsService<P, C, G>
where
    P: PatientRepository + Sync,
    C: ConsultationRepository + Sync,
    G: ProgramRepository + Sync,
{
    pub fn new(patients: P, consultations: C, programs: G) -> Self {
        Self {
            patients,
            consultations,
            programs,
        }
    }

    /// Computes organization-wide counts.
    ///
    /// Fails with `Invalid` before any read when `range` is inverted.
    ///
    /// `active_patients_count` is the number of patients registered in the
    /// organization; there is no patient activity flag.
    pub fn organization_analytics(
        &self,
        organization_id: OrganizationId,
        range: Option<DateRange>,
    ) -> ServiceResult<OrganizationAnalytics> {
        if let Some(range) = &range {
            range.validate()?;
        }
        let started_at = Instant::now();
        let (patients, consultations, programs) = thread::scope(|scope| {
            let patients = scope.spawn(|| {
                self.patients
                    .list_by_organization(organization_id, &PatientListQuery::default())
            });
            let consultations = scope.spawn(|| {
                self.consultations
                    .list_by_organization(organization_id, range)
            });
            let programs = scope.spawn(|| {
                self.programs
                    .list_programs(organization_id, &ProgramListQuery::default())
            });
            (patients.join(), consultations.join(), programs.join())
        });

        let patients = patients.map_err(|_| worker_panicked())??;
        let consultations = consultations.map_err(|_| worker_panicked())??;
        let programs = programs.map_err(|_| worker_panicked())??;

        let count_status = |status: ProgramStatus| {
            programs
                .iter()
                .filter(|program| program.status == status)
                .count()
        };
        let analytics = OrganizationAnalytics {
            active_patients_count: patients.len(),
            consultations_count: consultations.len(),
            active_programs_count: count_status(ProgramStatus::Active),
            finished_programs_count: count_status(ProgramStatus::Finished),
        };

        info!(
            "event=analytics_compute module=service status=ok org={organization_id} ranged={} duration_ms={}",
            range.is_some(),
            started_at.elapsed().as_millis()
        );
        Ok(analytics)
    }
}

fn worker_panicked() -> ServiceError {
    ServiceError::Internal("analytics read worker panicked")
}
