mod common;

use clinic_core::model::program::{Attendance, NewMeeting, NewProgram, ProgramPatch, ProgramStatus};
use clinic_core::repo::patient_repo::SqlitePatientRepository;
use clinic_core::repo::program_repo::{ProgramListQuery, SqliteProgramRepository};
use clinic_core::{
    ConflictRule, Database, EntityKind, Patch, ProgramLifecycleService, ServiceError,
};
use common::{create_org, create_patient, open_store};
use std::sync::{Arc, Barrier};
use std::thread;
use uuid::Uuid;

type Service = ProgramLifecycleService<SqliteProgramRepository, SqlitePatientRepository>;

fn service(db: &Database) -> Service {
    ProgramLifecycleService::new(
        SqliteProgramRepository::new(db.clone()),
        SqlitePatientRepository::new(db.clone()),
    )
}

#[test]
fn participant_is_added_once_and_can_rejoin_after_removal() {
    let store = open_store();
    let org = create_org(&store.db, "Clinic");
    let patient = create_patient(&store.db, org.id, "Ana");
    let service = service(&store.db);
    let program = service
        .create_program(&NewProgram::planned(org.id, "Weight loss group"))
        .unwrap();

    let first = service
        .add_participant(org.id, program.id, patient.id, Some("referred".to_string()))
        .unwrap();
    assert_eq!(first.program_id, program.id);
    assert_eq!(first.patient_id, patient.id);
    assert!(first.is_active());
    assert!(first.join_date > 0);

    let err = service
        .add_participant(org.id, program.id, patient.id, None)
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Conflict(ConflictRule::AlreadyParticipant)
    ));
    assert_eq!(service.list_participants(org.id, program.id).unwrap().len(), 1);

    service
        .remove_participant(org.id, program.id, patient.id)
        .unwrap();
    assert!(service
        .list_participants(org.id, program.id)
        .unwrap()
        .is_empty());

    let again = service
        .add_participant(org.id, program.id, patient.id, None)
        .unwrap();
    assert_ne!(again.id, first.id);
    assert_eq!(service.list_participants(org.id, program.id).unwrap().len(), 1);
}

#[test]
fn removing_a_non_participant_is_a_conflict() {
    let store = open_store();
    let org = create_org(&store.db, "Clinic");
    let patient = create_patient(&store.db, org.id, "Ana");
    let service = service(&store.db);
    let program = service
        .create_program(&NewProgram::planned(org.id, "Group"))
        .unwrap();

    let err = service
        .remove_participant(org.id, program.id, patient.id)
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Conflict(ConflictRule::NotParticipant)
    ));
}

#[test]
fn unknown_program_or_patient_is_not_found() {
    let store = open_store();
    let org = create_org(&store.db, "Clinic");
    let patient = create_patient(&store.db, org.id, "Ana");
    let service = service(&store.db);
    let program = service
        .create_program(&NewProgram::planned(org.id, "Group"))
        .unwrap();

    let missing_program = Uuid::new_v4();
    let err = service
        .add_participant(org.id, missing_program, patient.id, None)
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::NotFound { kind: EntityKind::Program, id } if id == missing_program
    ));

    let missing_patient = Uuid::new_v4();
    let err = service
        .add_participant(org.id, program.id, missing_patient, None)
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::NotFound { kind: EntityKind::Patient, id } if id == missing_patient
    ));

    let err = service
        .remove_participant(org.id, missing_program, patient.id)
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::NotFound {
            kind: EntityKind::Program,
            ..
        }
    ));
}

#[test]
fn concurrent_enrollment_of_the_same_pair_yields_one_participation() {
    let store = open_store();
    let org = create_org(&store.db, "Clinic");
    let patient = create_patient(&store.db, org.id, "Ana");
    let program = service(&store.db)
        .create_program(&NewProgram::planned(org.id, "Group"))
        .unwrap();

    let workers = 4;
    let barrier = Arc::new(Barrier::new(workers));
    let handles: Vec<_> = (0..workers)
        .map(|_| {
            let db = store.db.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let service = service(&db);
                barrier.wait();
                service.add_participant(org.id, program.id, patient.id, None)
            })
        })
        .collect();

    let results: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();
    assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 1);
    for result in results.iter().filter(|result| result.is_err()) {
        assert!(matches!(
            result,
            Err(ServiceError::Conflict(ConflictRule::AlreadyParticipant))
        ));
    }
    assert_eq!(
        service(&store.db)
            .list_participants(org.id, program.id)
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn attendance_is_created_then_overwritten() {
    let store = open_store();
    let org = create_org(&store.db, "Clinic");
    let patient = create_patient(&store.db, org.id, "Ana");
    let service = service(&store.db);
    let program = service
        .create_program(&NewProgram::planned(org.id, "Group"))
        .unwrap();
    let meeting = service
        .schedule_meeting(
            org.id,
            &NewMeeting {
                program_id: program.id,
                date: 1_700_000_000_000,
                topic: "Label reading".to_string(),
                notes: None,
            },
        )
        .unwrap();

    let first = service
        .record_attendance(
            org.id,
            meeting.id,
            patient.id,
            &Attendance {
                present: true,
                weight_kg: Some(80.0),
                blood_pressure: Some("12/8".to_string()),
                notes: Some("first weigh-in".to_string()),
            },
        )
        .unwrap();
    assert!(first.present);
    assert_eq!(first.weight_kg, Some(80.0));

    let second = service
        .record_attendance(
            org.id,
            meeting.id,
            patient.id,
            &Attendance {
                present: false,
                weight_kg: None,
                blood_pressure: None,
                notes: None,
            },
        )
        .unwrap();
    assert_eq!(second.id, first.id);
    assert!(!second.present);
    assert_eq!(second.weight_kg, None);
    assert_eq!(second.blood_pressure, None);
    assert_eq!(second.notes, None);

    let records = service.list_attendance(org.id, meeting.id).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0], second);
}

#[test]
fn attendance_does_not_require_enrollment() {
    let store = open_store();
    let org = create_org(&store.db, "Clinic");
    let patient = create_patient(&store.db, org.id, "Walk-in");
    let service = service(&store.db);
    let program = service
        .create_program(&NewProgram::planned(org.id, "Group"))
        .unwrap();
    let meeting = service
        .schedule_meeting(
            org.id,
            &NewMeeting {
                program_id: program.id,
                date: 1,
                topic: "Intro".to_string(),
                notes: None,
            },
        )
        .unwrap();

    let record = service
        .record_attendance(org.id, meeting.id, patient.id, &Attendance::default())
        .unwrap();
    assert_eq!(record.program_meeting_id, meeting.id);
}

#[test]
fn attendance_for_unknown_meeting_is_not_found() {
    let store = open_store();
    let org = create_org(&store.db, "Clinic");
    let patient = create_patient(&store.db, org.id, "Ana");

    let err = service(&store.db)
        .record_attendance(org.id, Uuid::new_v4(), patient.id, &Attendance::default())
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::NotFound {
            kind: EntityKind::Meeting,
            ..
        }
    ));
}

#[test]
fn meetings_are_listed_by_date() {
    let store = open_store();
    let org = create_org(&store.db, "Clinic");
    let service = service(&store.db);
    let program = service
        .create_program(&NewProgram::planned(org.id, "Group"))
        .unwrap();
    for (date, topic) in [(300, "third"), (100, "first"), (200, "second")] {
        service
            .schedule_meeting(
                org.id,
                &NewMeeting {
                    program_id: program.id,
                    date,
                    topic: topic.to_string(),
                    notes: None,
                },
            )
            .unwrap();
    }

    let topics: Vec<_> = service
        .list_meetings(org.id, program.id)
        .unwrap()
        .into_iter()
        .map(|meeting| meeting.topic)
        .collect();
    assert_eq!(topics, ["first", "second", "third"]);
}

#[test]
fn program_status_moves_freely_and_filters_listing() {
    let store = open_store();
    let org = create_org(&store.db, "Clinic");
    let service = service(&store.db);
    let program = service
        .create_program(&NewProgram::planned(org.id, "Group"))
        .unwrap();
    service
        .create_program(&NewProgram::planned(org.id, "Other"))
        .unwrap();

    let finished = service
        .update_program(
            org.id,
            program.id,
            &ProgramPatch {
                status: Some(ProgramStatus::Finished),
                description: Patch::Set("closed early".to_string()),
                ..ProgramPatch::default()
            },
        )
        .unwrap();
    assert_eq!(finished.status, ProgramStatus::Finished);
    assert_eq!(finished.description.as_deref(), Some("closed early"));

    let reopened = service
        .update_program(
            org.id,
            program.id,
            &ProgramPatch {
                status: Some(ProgramStatus::Active),
                description: Patch::Clear,
                ..ProgramPatch::default()
            },
        )
        .unwrap();
    assert_eq!(reopened.status, ProgramStatus::Active);
    assert_eq!(reopened.description, None);
    assert_eq!(reopened.name, "Group");

    let active = service
        .list_programs(
            org.id,
            &ProgramListQuery {
                status: Some(ProgramStatus::Active),
            },
        )
        .unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, program.id);
}

#[test]
fn deleting_a_program_removes_its_history() {
    let store = open_store();
    let org = create_org(&store.db, "Clinic");
    let patient = create_patient(&store.db, org.id, "Ana");
    let service = service(&store.db);
    let program = service
        .create_program(&NewProgram::planned(org.id, "Group"))
        .unwrap();
    service
        .add_participant(org.id, program.id, patient.id, None)
        .unwrap();
    let meeting = service
        .schedule_meeting(
            org.id,
            &NewMeeting {
                program_id: program.id,
                date: 1,
                topic: "Intro".to_string(),
                notes: None,
            },
        )
        .unwrap();
    service
        .record_attendance(org.id, meeting.id, patient.id, &Attendance::default())
        .unwrap();

    service.delete_program(org.id, program.id).unwrap();
    assert!(service.get_program(org.id, program.id).unwrap().is_none());
    assert!(matches!(
        service.list_attendance(org.id, meeting.id),
        Err(ServiceError::NotFound {
            kind: EntityKind::Meeting,
            ..
        })
    ));
    assert!(matches!(
        service.delete_program(org.id, program.id),
        Err(ServiceError::NotFound {
            kind: EntityKind::Program,
            ..
        })
    ));
}
