mod common;

use clinic_core::model::consultation::NewConsultation;
use clinic_core::model::nutrition_plan::{NewNutritionPlan, NutritionPlanPatch};
use clinic_core::model::patient::PatientPatch;
use clinic_core::model::program::{NewProgram, ProgramPatch};
use clinic_core::model::task::{NewTask, TaskPatch, TaskStatus};
use clinic_core::repo::consultation_repo::{ConsultationRepository, SqliteConsultationRepository};
use clinic_core::repo::patient_repo::{PatientListQuery, PatientRepository, SqlitePatientRepository};
use clinic_core::repo::program_repo::{ProgramRepository, SqliteProgramRepository};
use clinic_core::repo::task_repo::{SqliteTaskRepository, TaskRepository};
use clinic_core::{EntityKind, Patch, ProgramLifecycleService, RepoError, ServiceError};
use common::{
    create_org, create_patient, create_professional, open_store, plan_service, task_service,
};

#[test]
fn patients_are_invisible_across_organizations() {
    let store = open_store();
    let org_a = create_org(&store.db, "A");
    let org_b = create_org(&store.db, "B");
    let patient = create_patient(&store.db, org_a.id, "Ana");
    let repo = SqlitePatientRepository::new(store.db.clone());

    assert!(repo.find_by_id(patient.id, org_b.id).unwrap().is_none());
    assert!(repo
        .list_by_organization(org_b.id, &PatientListQuery::default())
        .unwrap()
        .is_empty());
    assert!(matches!(
        repo.update(patient.id, org_b.id, &PatientPatch::default()),
        Err(RepoError::NotFound(id)) if id == patient.id
    ));
    assert!(matches!(
        repo.delete(patient.id, org_b.id),
        Err(RepoError::NotFound(_))
    ));
    assert!(repo.find_by_id(patient.id, org_a.id).unwrap().is_some());
}

#[test]
fn programs_of_another_organization_behave_as_absent() {
    let store = open_store();
    let org_a = create_org(&store.db, "A");
    let org_b = create_org(&store.db, "B");
    let patient_b = create_patient(&store.db, org_b.id, "Bruno");
    let service = ProgramLifecycleService::new(
        SqliteProgramRepository::new(store.db.clone()),
        SqlitePatientRepository::new(store.db.clone()),
    );
    let program_a = service
        .create_program(&NewProgram::planned(org_a.id, "A group"))
        .unwrap();

    assert!(service.get_program(org_b.id, program_a.id).unwrap().is_none());
    assert!(matches!(
        service.update_program(org_b.id, program_a.id, &ProgramPatch::default()),
        Err(ServiceError::NotFound {
            kind: EntityKind::Program,
            ..
        })
    ));
    assert!(matches!(
        service.add_participant(org_b.id, program_a.id, patient_b.id, None),
        Err(ServiceError::NotFound {
            kind: EntityKind::Program,
            ..
        })
    ));
}

#[test]
fn patient_of_another_organization_cannot_join_a_program() {
    let store = open_store();
    let org_a = create_org(&store.db, "A");
    let org_b = create_org(&store.db, "B");
    let patient_b = create_patient(&store.db, org_b.id, "Bruno");
    let service = ProgramLifecycleService::new(
        SqliteProgramRepository::new(store.db.clone()),
        SqlitePatientRepository::new(store.db.clone()),
    );
    let program_a = service
        .create_program(&NewProgram::planned(org_a.id, "A group"))
        .unwrap();

    let err = service
        .add_participant(org_a.id, program_a.id, patient_b.id, None)
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::NotFound { kind: EntityKind::Patient, id } if id == patient_b.id
    ));
}

#[test]
fn plans_of_another_organization_cannot_be_read_or_changed() {
    let store = open_store();
    let org_a = create_org(&store.db, "A");
    let org_b = create_org(&store.db, "B");
    let patient = create_patient(&store.db, org_a.id, "Ana");
    let service = plan_service(&store.db);
    let plan = service
        .create_plan(&NewNutritionPlan::new(org_a.id, patient.id, "Plan"))
        .unwrap();

    assert!(service.get_plan(org_b.id, plan.id).unwrap().is_none());
    assert!(service.active_plan(org_b.id, patient.id).unwrap().is_none());
    assert!(matches!(
        service.update_plan(org_b.id, plan.id, &NutritionPlanPatch::default()),
        Err(ServiceError::NotFound {
            kind: EntityKind::NutritionPlan,
            ..
        })
    ));
    assert!(matches!(
        service.create_plan(&NewNutritionPlan::new(org_b.id, patient.id, "Foreign")),
        Err(ServiceError::NotFound {
            kind: EntityKind::Patient,
            ..
        })
    ));
}

#[test]
fn tasks_of_another_organization_are_not_found() {
    let store = open_store();
    let org_a = create_org(&store.db, "A");
    let org_b = create_org(&store.db, "B");
    let professional = create_professional(&store.db, org_a.id, "a@clinic.test");
    let service = task_service(&store.db);
    let task = service
        .create_task(&NewTask::new(org_a.id, professional.id, "Call"))
        .unwrap();

    assert!(service.get_task(org_b.id, task.id).unwrap().is_none());
    assert!(matches!(
        service.update_status(org_b.id, task.id, TaskStatus::Done),
        Err(ServiceError::NotFound {
            kind: EntityKind::Task,
            ..
        })
    ));
}

#[test]
fn storage_rejects_cross_tenant_links() {
    let store = open_store();
    let org_a = create_org(&store.db, "A");
    let org_b = create_org(&store.db, "B");
    let professional_a = create_professional(&store.db, org_a.id, "a@clinic.test");
    let patient_b = create_patient(&store.db, org_b.id, "Bruno");

    let err = SqliteConsultationRepository::new(store.db.clone())
        .create(&NewConsultation {
            organization_id: org_a.id,
            patient_id: patient_b.id,
            professional_id: professional_a.id,
            date: 1,
            notes: None,
        })
        .unwrap_err();
    assert!(matches!(err, RepoError::ForeignKeyViolation(_)));

    let mut task = NewTask::new(org_b.id, professional_a.id, "Foreign owner");
    task.patient_id = Some(patient_b.id);
    let err = SqliteTaskRepository::new(store.db.clone())
        .create(&task)
        .unwrap_err();
    assert!(matches!(err, RepoError::ForeignKeyViolation(_)));
}

#[test]
fn task_links_to_another_organization_are_not_found() {
    let store = open_store();
    let org_a = create_org(&store.db, "A");
    let org_b = create_org(&store.db, "B");
    let professional_a = create_professional(&store.db, org_a.id, "a@clinic.test");
    let professional_b = create_professional(&store.db, org_b.id, "b@clinic.test");
    let patient_b = create_patient(&store.db, org_b.id, "Bruno");
    let program_b = SqliteProgramRepository::new(store.db.clone())
        .create_program(&NewProgram::planned(org_b.id, "B group"))
        .unwrap();
    let service = task_service(&store.db);

    let err = service
        .create_task(&NewTask::new(org_a.id, professional_b.id, "Foreign owner"))
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::NotFound { kind: EntityKind::Professional, id } if id == professional_b.id
    ));

    let mut input = NewTask::new(org_a.id, professional_a.id, "Foreign patient");
    input.patient_id = Some(patient_b.id);
    let err = service.create_task(&input).unwrap_err();
    assert!(matches!(
        err,
        ServiceError::NotFound { kind: EntityKind::Patient, id } if id == patient_b.id
    ));

    let mut input = NewTask::new(org_a.id, professional_a.id, "Foreign program");
    input.program_id = Some(program_b.id);
    let err = service.create_task(&input).unwrap_err();
    assert!(matches!(
        err,
        ServiceError::NotFound { kind: EntityKind::Program, id } if id == program_b.id
    ));

    let task = service
        .create_task(&NewTask::new(org_a.id, professional_a.id, "Local"))
        .unwrap();
    let err = service
        .update_task(
            org_a.id,
            task.id,
            &TaskPatch {
                patient_id: Patch::Set(patient_b.id),
                ..TaskPatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::NotFound { kind: EntityKind::Patient, id } if id == patient_b.id
    ));
    let err = service
        .update_task(
            org_a.id,
            task.id,
            &TaskPatch {
                program_id: Patch::Set(program_b.id),
                ..TaskPatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::NotFound { kind: EntityKind::Program, id } if id == program_b.id
    ));
    let unchanged = service.get_task(org_a.id, task.id).unwrap().unwrap();
    assert_eq!(unchanged.patient_id, None);
    assert_eq!(unchanged.program_id, None);
}

#[test]
fn plan_professional_from_another_organization_is_not_found() {
    let store = open_store();
    let org_a = create_org(&store.db, "A");
    let org_b = create_org(&store.db, "B");
    let patient_a = create_patient(&store.db, org_a.id, "Ana");
    let professional_b = create_professional(&store.db, org_b.id, "b@clinic.test");
    let service = plan_service(&store.db);

    let mut input = NewNutritionPlan::new(org_a.id, patient_a.id, "Plan");
    input.professional_id = Some(professional_b.id);
    let err = service.create_plan(&input).unwrap_err();
    assert!(matches!(
        err,
        ServiceError::NotFound { kind: EntityKind::Professional, id } if id == professional_b.id
    ));
    assert!(service.list_plans(org_a.id, patient_a.id).unwrap().is_empty());

    let plan = service
        .create_plan(&NewNutritionPlan::new(org_a.id, patient_a.id, "Plan"))
        .unwrap();
    let err = service
        .update_plan(
            org_a.id,
            plan.id,
            &NutritionPlanPatch {
                professional_id: Patch::Set(professional_b.id),
                ..NutritionPlanPatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::NotFound { kind: EntityKind::Professional, id } if id == professional_b.id
    ));
    assert_eq!(
        service.get_plan(org_a.id, plan.id).unwrap().unwrap().professional_id,
        None
    );
}
