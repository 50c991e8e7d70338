#![allow(dead_code)]

use clinic_core::db::Database;
use clinic_core::model::consultation::{Consultation, NewConsultation};
use clinic_core::model::organization::{NewProfessional, Organization, Professional};
use clinic_core::model::patient::{NewPatient, Patient};
use clinic_core::model::{OrganizationId, PatientId, ProfessionalId};
use clinic_core::repo::consultation_repo::{ConsultationRepository, SqliteConsultationRepository};
use clinic_core::repo::organization_repo::{OrganizationRepository, SqliteOrganizationRepository};
use clinic_core::repo::nutrition_plan_repo::SqliteNutritionPlanRepository;
use clinic_core::repo::patient_repo::{PatientRepository, SqlitePatientRepository};
use clinic_core::repo::program_repo::SqliteProgramRepository;
use clinic_core::repo::task_repo::SqliteTaskRepository;
use clinic_core::{DatabaseConfig, NutritionPlanService, TaskService};
use tempfile::TempDir;

/// File-backed database living as long as the value.
pub struct TestStore {
    _dir: TempDir,
    pub db: Database,
}

pub type Tasks = TaskService<
    SqliteTaskRepository,
    SqlitePatientRepository,
    SqliteProgramRepository,
    SqliteOrganizationRepository,
>;

pub type Plans = NutritionPlanService<
    SqliteNutritionPlanRepository,
    SqlitePatientRepository,
    SqliteOrganizationRepository,
>;

pub fn open_store() -> TestStore {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(&DatabaseConfig::at(dir.path().join("clinic.sqlite3"))).unwrap();
    TestStore { _dir: dir, db }
}

pub fn task_service(db: &Database) -> Tasks {
    TaskService::new(
        SqliteTaskRepository::new(db.clone()),
        SqlitePatientRepository::new(db.clone()),
        SqliteProgramRepository::new(db.clone()),
        SqliteOrganizationRepository::new(db.clone()),
    )
}

pub fn plan_service(db: &Database) -> Plans {
    NutritionPlanService::new(
        SqliteNutritionPlanRepository::new(db.clone()),
        SqlitePatientRepository::new(db.clone()),
        SqliteOrganizationRepository::new(db.clone()),
    )
}

pub fn create_org(db: &Database, name: &str) -> Organization {
    SqliteOrganizationRepository::new(db.clone())
        .create_organization(name)
        .unwrap()
}

pub fn create_professional(db: &Database, org: OrganizationId, email: &str) -> Professional {
    SqliteOrganizationRepository::new(db.clone())
        .create_professional(&NewProfessional {
            organization_id: org,
            name: "Dr. Silva".to_string(),
            email: email.to_string(),
            specialty: Some("nutrition".to_string()),
        })
        .unwrap()
}

pub fn create_patient(db: &Database, org: OrganizationId, name: &str) -> Patient {
    SqlitePatientRepository::new(db.clone())
        .create(&NewPatient {
            organization_id: org,
            name: name.to_string(),
            ..NewPatient::default()
        })
        .unwrap()
}

pub fn create_consultation(
    db: &Database,
    org: OrganizationId,
    patient: PatientId,
    professional: ProfessionalId,
    date: i64,
) -> Consultation {
    SqliteConsultationRepository::new(db.clone())
        .create(&NewConsultation {
            organization_id: org,
            patient_id: patient,
            professional_id: professional,
            date,
            notes: None,
        })
        .unwrap()
}
