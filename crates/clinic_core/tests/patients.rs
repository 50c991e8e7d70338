mod common;

use clinic_core::model::organization::NewProfessional;
use clinic_core::model::patient::{NewPatient, PatientPatch};
use clinic_core::repo::organization_repo::SqliteOrganizationRepository;
use clinic_core::repo::patient_repo::{PatientListQuery, PatientRepository, SqlitePatientRepository};
use clinic_core::{ConflictRule, EntityKind, OrganizationService, Patch, RepoError, ServiceError};
use common::{create_consultation, create_org, create_patient, create_professional, open_store};
use uuid::Uuid;

#[test]
fn tags_are_normalized_and_filterable() {
    let store = open_store();
    let org = create_org(&store.db, "Clinic");
    let repo = SqlitePatientRepository::new(store.db.clone());

    let ana = repo
        .create(&NewPatient {
            organization_id: org.id,
            name: "Ana".to_string(),
            tags: vec![
                " Diabetes ".to_string(),
                "diabetes".to_string(),
                "Hypertension".to_string(),
            ],
            ..NewPatient::default()
        })
        .unwrap();
    assert_eq!(ana.tags, ["diabetes", "hypertension"]);
    create_patient(&store.db, org.id, "Bruno");

    let tagged = repo
        .list_by_organization(
            org.id,
            &PatientListQuery {
                tag: Some("DIABETES".to_string()),
            },
        )
        .unwrap();
    assert_eq!(tagged.len(), 1);
    assert_eq!(tagged[0].id, ana.id);
    assert_eq!(
        repo.list_by_organization(org.id, &PatientListQuery::default())
            .unwrap()
            .len(),
        2
    );
}

#[test]
fn blank_tag_filter_matches_nothing() {
    let store = open_store();
    let org = create_org(&store.db, "Clinic");
    create_patient(&store.db, org.id, "Ana");
    let repo = SqlitePatientRepository::new(store.db.clone());

    let listed = repo
        .list_by_organization(
            org.id,
            &PatientListQuery {
                tag: Some("   ".to_string()),
            },
        )
        .unwrap();
    assert!(listed.is_empty());
}

#[test]
fn update_applies_the_tri_state_patch() {
    let store = open_store();
    let org = create_org(&store.db, "Clinic");
    let repo = SqlitePatientRepository::new(store.db.clone());
    let patient = repo
        .create(&NewPatient {
            organization_id: org.id,
            name: "Ana".to_string(),
            email: Some("ana@mail.test".to_string()),
            phone: Some("555".to_string()),
            tags: vec!["vegan".to_string()],
            ..NewPatient::default()
        })
        .unwrap();

    let updated = repo
        .update(
            patient.id,
            org.id,
            &PatientPatch {
                phone: Patch::Clear,
                notes: Patch::Set("allergic to nuts".to_string()),
                ..PatientPatch::default()
            },
        )
        .unwrap();
    assert_eq!(updated.name, "Ana");
    assert_eq!(updated.email.as_deref(), Some("ana@mail.test"));
    assert_eq!(updated.phone, None);
    assert_eq!(updated.notes.as_deref(), Some("allergic to nuts"));
    assert_eq!(updated.tags, ["vegan"]);

    let retagged = repo
        .update(
            patient.id,
            org.id,
            &PatientPatch {
                tags: Some(vec![]),
                ..PatientPatch::default()
            },
        )
        .unwrap();
    assert!(retagged.tags.is_empty());
}

#[test]
fn patients_with_history_cannot_be_deleted() {
    let store = open_store();
    let org = create_org(&store.db, "Clinic");
    let professional = create_professional(&store.db, org.id, "a@clinic.test");
    let patient = create_patient(&store.db, org.id, "Ana");
    let lonely = create_patient(&store.db, org.id, "Bruno");
    create_consultation(&store.db, org.id, patient.id, professional.id, 1);
    let repo = SqlitePatientRepository::new(store.db.clone());

    assert!(matches!(
        repo.delete(patient.id, org.id),
        Err(RepoError::ForeignKeyViolation(_))
    ));
    repo.delete(lonely.id, org.id).unwrap();
    assert!(repo.find_by_id(lonely.id, org.id).unwrap().is_none());
}

#[test]
fn blank_names_are_rejected_before_storage() {
    let store = open_store();
    let org = create_org(&store.db, "Clinic");
    let err = SqlitePatientRepository::new(store.db.clone())
        .create(&NewPatient {
            organization_id: org.id,
            name: "  ".to_string(),
            ..NewPatient::default()
        })
        .unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
}

#[test]
fn professional_emails_are_unique_case_insensitively() {
    let store = open_store();
    let service = OrganizationService::new(SqliteOrganizationRepository::new(store.db.clone()));
    let org_a = service.create_organization("A").unwrap();
    let org_b = service.create_organization("B").unwrap();

    let registered = service
        .register_professional(&NewProfessional {
            organization_id: org_a.id,
            name: "Dr. Lima".to_string(),
            email: " Lima@Clinic.test ".to_string(),
            specialty: None,
        })
        .unwrap();
    assert_eq!(registered.email, "lima@clinic.test");

    let err = service
        .register_professional(&NewProfessional {
            organization_id: org_b.id,
            name: "Someone else".to_string(),
            email: "LIMA@clinic.test".to_string(),
            specialty: None,
        })
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(ConflictRule::EmailInUse)));
    assert_eq!(service.list_professionals(org_a.id).unwrap().len(), 1);
    assert!(service.list_professionals(org_b.id).unwrap().is_empty());
}

#[test]
fn registering_into_unknown_organization_is_not_found() {
    let store = open_store();
    let service = OrganizationService::new(SqliteOrganizationRepository::new(store.db.clone()));
    let missing = Uuid::new_v4();

    let err = service
        .register_professional(&NewProfessional {
            organization_id: missing,
            name: "Dr. Lima".to_string(),
            email: "lima@clinic.test".to_string(),
            specialty: None,
        })
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::NotFound { kind: EntityKind::Organization, id } if id == missing
    ));
}
