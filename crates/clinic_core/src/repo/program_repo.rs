//! Program family persistence: programs, participants, meetings and
//! attendance records.
//!
//! # Invariants
//! - Programs are always filtered by `organization_id`.
//! - Participants, meetings and records are addressed through their parent
//!   program or meeting, which the caller has already scoped.
//! - `(program_id, patient_id)` and `(program_meeting_id, patient_id)` are
//!   unique in storage; the attendance write is a single upsert statement.

use crate::db::Database;
use crate::model::program::{
    Attendance, NewMeeting, NewParticipant, NewProgram, Program, ProgramMeeting,
    ProgramMeetingRecord, ProgramParticipant, ProgramPatch, ProgramStatus,
};
use crate::model::{MeetingId, OrganizationId, PatientId, ProgramId};
use crate::repo::{
    begin_write, bool_to_int, int_to_bool, parse_uuid, RepoError, RepoResult, NOW_MS_SQL,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use uuid::Uuid;

const PROGRAM_SELECT_SQL: &str = "SELECT
    id,
    organization_id,
    name,
    description,
    start_date,
    end_date,
    status,
    created_at,
    updated_at
FROM programs";

const PARTICIPANT_SELECT_SQL: &str = "SELECT
    id,
    program_id,
    patient_id,
    join_date,
    leave_date,
    notes
FROM program_participants";

const MEETING_SELECT_SQL: &str = "SELECT
    m.id AS id,
    m.program_id AS program_id,
    m.date AS date,
    m.topic AS topic,
    m.notes AS notes
FROM program_meetings m";

const RECORD_SELECT_SQL: &str = "SELECT
    id,
    program_meeting_id,
    patient_id,
    present,
    weight_kg,
    blood_pressure,
    notes,
    recorded_at
FROM program_meeting_records";

/// Filters for program listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgramListQuery {
    pub status: Option<ProgramStatus>,
}

pub trait ProgramRepository {
    fn create_program(&self, program: &NewProgram) -> RepoResult<Program>;
    fn find_program(
        &self,
        id: ProgramId,
        organization_id: OrganizationId,
    ) -> RepoResult<Option<Program>>;
    fn list_programs(
        &self,
        organization_id: OrganizationId,
        query: &ProgramListQuery,
    ) -> RepoResult<Vec<Program>>;
    fn update_program(
        &self,
        id: ProgramId,
        organization_id: OrganizationId,
        patch: &ProgramPatch,
    ) -> RepoResult<Program>;
    /// Removes the program with its participants, meetings and records.
    fn delete_program(&self, id: ProgramId, organization_id: OrganizationId) -> RepoResult<()>;

    fn find_participant(
        &self,
        program_id: ProgramId,
        patient_id: PatientId,
    ) -> RepoResult<Option<ProgramParticipant>>;
    fn list_participants(&self, program_id: ProgramId) -> RepoResult<Vec<ProgramParticipant>>;
    /// Fails with `UniqueViolation` when the pair is already enrolled.
    fn insert_participant(&self, participant: &NewParticipant) -> RepoResult<ProgramParticipant>;
    /// Fails with `NotFound(patient_id)` when the pair is not enrolled.
    fn delete_participant(&self, program_id: ProgramId, patient_id: PatientId) -> RepoResult<()>;

    fn create_meeting(&self, meeting: &NewMeeting) -> RepoResult<ProgramMeeting>;
    /// Looks a meeting up through its program's organization.
    fn find_meeting(
        &self,
        id: MeetingId,
        organization_id: OrganizationId,
    ) -> RepoResult<Option<ProgramMeeting>>;
    fn list_meetings(&self, program_id: ProgramId) -> RepoResult<Vec<ProgramMeeting>>;

    /// Creates the record for the pair or overwrites every field of it.
    fn upsert_meeting_record(
        &self,
        meeting_id: MeetingId,
        patient_id: PatientId,
        attendance: &Attendance,
    ) -> RepoResult<ProgramMeetingRecord>;
    fn list_meeting_records(&self, meeting_id: MeetingId)
        -> RepoResult<Vec<ProgramMeetingRecord>>;
}

#[derive(Debug, Clone)]
pub struct SqliteProgramRepository {
    db: Database,
}

impl SqliteProgramRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl ProgramRepository for SqliteProgramRepository {
    fn create_program(&self, program: &NewProgram) -> RepoResult<Program> {
        program.validate()?;

        let conn = self.db.connect()?;
        let id = Uuid::new_v4();
        conn.execute(
            "INSERT INTO programs (
                id,
                organization_id,
                name,
                description,
                start_date,
                end_date,
                status
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                id.to_string(),
                program.organization_id.to_string(),
                program.name.trim(),
                program.description.as_deref(),
                program.start_date,
                program.end_date,
                program_status_to_db(program.status),
            ],
        )?;
        load_program(&conn, id, program.organization_id)?.ok_or(RepoError::NotFound(id))
    }

    fn find_program(
        &self,
        id: ProgramId,
        organization_id: OrganizationId,
    ) -> RepoResult<Option<Program>> {
        let conn = self.db.connect()?;
        load_program(&conn, id, organization_id)
    }

    fn list_programs(
        &self,
        organization_id: OrganizationId,
        query: &ProgramListQuery,
    ) -> RepoResult<Vec<Program>> {
        let conn = self.db.connect()?;
        let mut sql = format!("{PROGRAM_SELECT_SQL} WHERE organization_id = ?");
        let mut bind_values = vec![Value::Text(organization_id.to_string())];
        if let Some(status) = query.status {
            sql.push_str(" AND status = ?");
            bind_values.push(Value::Text(program_status_to_db(status).to_string()));
        }
        sql.push_str(" ORDER BY created_at DESC, id ASC");

        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut programs = Vec::new();
        while let Some(row) = rows.next()? {
            programs.push(parse_program_row(row)?);
        }
        Ok(programs)
    }

    fn update_program(
        &self,
        id: ProgramId,
        organization_id: OrganizationId,
        patch: &ProgramPatch,
    ) -> RepoResult<Program> {
        let mut conn = self.db.connect()?;
        let tx = begin_write(&mut conn)?;
        let mut program = load_program(&tx, id, organization_id)?.ok_or(RepoError::NotFound(id))?;
        program.apply_patch(patch)?;

        tx.execute(
            &format!(
                "UPDATE programs
                 SET
                    name = ?3,
                    description = ?4,
                    start_date = ?5,
                    end_date = ?6,
                    status = ?7,
                    updated_at = {NOW_MS_SQL}
                 WHERE id = ?1
                   AND organization_id = ?2;"
            ),
            params![
                id.to_string(),
                organization_id.to_string(),
                program.name.trim(),
                program.description.as_deref(),
                program.start_date,
                program.end_date,
                program_status_to_db(program.status),
            ],
        )?;

        let updated = load_program(&tx, id, organization_id)?.ok_or(RepoError::NotFound(id))?;
        tx.commit()?;
        Ok(updated)
    }

    fn delete_program(&self, id: ProgramId, organization_id: OrganizationId) -> RepoResult<()> {
        let conn = self.db.connect()?;
        let changed = conn.execute(
            "DELETE FROM programs WHERE id = ?1 AND organization_id = ?2;",
            params![id.to_string(), organization_id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn find_participant(
        &self,
        program_id: ProgramId,
        patient_id: PatientId,
    ) -> RepoResult<Option<ProgramParticipant>> {
        let conn = self.db.connect()?;
        load_participant(&conn, program_id, patient_id)
    }

    fn list_participants(&self, program_id: ProgramId) -> RepoResult<Vec<ProgramParticipant>> {
        let conn = self.db.connect()?;
        let mut stmt = conn.prepare(&format!(
            "{PARTICIPANT_SELECT_SQL}
             WHERE program_id = ?1
             ORDER BY join_date ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([program_id.to_string()])?;
        let mut participants = Vec::new();
        while let Some(row) = rows.next()? {
            participants.push(parse_participant_row(row)?);
        }
        Ok(participants)
    }

    fn insert_participant(&self, participant: &NewParticipant) -> RepoResult<ProgramParticipant> {
        let conn = self.db.connect()?;
        conn.execute(
            "INSERT INTO program_participants (
                id,
                program_id,
                patient_id,
                notes
            ) VALUES (?1, ?2, ?3, ?4);",
            params![
                Uuid::new_v4().to_string(),
                participant.program_id.to_string(),
                participant.patient_id.to_string(),
                participant.notes.as_deref(),
            ],
        )?;
        load_participant(&conn, participant.program_id, participant.patient_id)?
            .ok_or(RepoError::NotFound(participant.patient_id))
    }

    fn delete_participant(&self, program_id: ProgramId, patient_id: PatientId) -> RepoResult<()> {
        let conn = self.db.connect()?;
        let changed = conn.execute(
            "DELETE FROM program_participants WHERE program_id = ?1 AND patient_id = ?2;",
            params![program_id.to_string(), patient_id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(patient_id));
        }
        Ok(())
    }

    fn create_meeting(&self, meeting: &NewMeeting) -> RepoResult<ProgramMeeting> {
        meeting.validate()?;

        let conn = self.db.connect()?;
        let id = Uuid::new_v4();
        conn.execute(
            "INSERT INTO program_meetings (
                id,
                program_id,
                date,
                topic,
                notes
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                id.to_string(),
                meeting.program_id.to_string(),
                meeting.date,
                meeting.topic.trim(),
                meeting.notes.as_deref(),
            ],
        )?;
        query_meetings(&conn, "WHERE m.id = ?", vec![Value::Text(id.to_string())])?
            .pop()
            .ok_or(RepoError::NotFound(id))
    }

    fn find_meeting(
        &self,
        id: MeetingId,
        organization_id: OrganizationId,
    ) -> RepoResult<Option<ProgramMeeting>> {
        let conn = self.db.connect()?;
        let mut found = query_meetings(
            &conn,
            "INNER JOIN programs p ON p.id = m.program_id
             WHERE m.id = ?
               AND p.organization_id = ?",
            vec![
                Value::Text(id.to_string()),
                Value::Text(organization_id.to_string()),
            ],
        )?;
        Ok(found.pop())
    }

    fn list_meetings(&self, program_id: ProgramId) -> RepoResult<Vec<ProgramMeeting>> {
        let conn = self.db.connect()?;
        query_meetings(
            &conn,
            "WHERE m.program_id = ? ORDER BY m.date ASC, m.id ASC",
            vec![Value::Text(program_id.to_string())],
        )
    }

    fn upsert_meeting_record(
        &self,
        meeting_id: MeetingId,
        patient_id: PatientId,
        attendance: &Attendance,
    ) -> RepoResult<ProgramMeetingRecord> {
        let conn = self.db.connect()?;
        conn.execute(
            &format!(
                "INSERT INTO program_meeting_records (
                    id,
                    program_meeting_id,
                    patient_id,
                    present,
                    weight_kg,
                    blood_pressure,
                    notes
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT (program_meeting_id, patient_id) DO UPDATE SET
                    present = excluded.present,
                    weight_kg = excluded.weight_kg,
                    blood_pressure = excluded.blood_pressure,
                    notes = excluded.notes,
                    recorded_at = {NOW_MS_SQL};"
            ),
            params![
                Uuid::new_v4().to_string(),
                meeting_id.to_string(),
                patient_id.to_string(),
                bool_to_int(attendance.present),
                attendance.weight_kg,
                attendance.blood_pressure.as_deref(),
                attendance.notes.as_deref(),
            ],
        )?;

        let mut stmt = conn.prepare(&format!(
            "{RECORD_SELECT_SQL}
             WHERE program_meeting_id = ?1
               AND patient_id = ?2;"
        ))?;
        let mut rows = stmt.query(params![meeting_id.to_string(), patient_id.to_string()])?;
        match rows.next()? {
            Some(row) => parse_record_row(row),
            None => Err(RepoError::NotFound(meeting_id)),
        }
    }

    fn list_meeting_records(
        &self,
        meeting_id: MeetingId,
    ) -> RepoResult<Vec<ProgramMeetingRecord>> {
        let conn = self.db.connect()?;
        let mut stmt = conn.prepare(&format!(
            "{RECORD_SELECT_SQL}
             WHERE program_meeting_id = ?1
             ORDER BY recorded_at ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([meeting_id.to_string()])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_record_row(row)?);
        }
        Ok(records)
    }
}

fn load_program(
    conn: &Connection,
    id: ProgramId,
    organization_id: OrganizationId,
) -> RepoResult<Option<Program>> {
    let mut stmt = conn.prepare(&format!(
        "{PROGRAM_SELECT_SQL}
         WHERE id = ?1
           AND organization_id = ?2;"
    ))?;
    let mut rows = stmt.query(params![id.to_string(), organization_id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_program_row(row)?));
    }
    Ok(None)
}

fn load_participant(
    conn: &Connection,
    program_id: ProgramId,
    patient_id: PatientId,
) -> RepoResult<Option<ProgramParticipant>> {
    let mut stmt = conn.prepare(&format!(
        "{PARTICIPANT_SELECT_SQL}
         WHERE program_id = ?1
           AND patient_id = ?2;"
    ))?;
    let mut rows = stmt.query(params![program_id.to_string(), patient_id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_participant_row(row)?));
    }
    Ok(None)
}

fn query_meetings(
    conn: &Connection,
    filter: &str,
    bind_values: Vec<Value>,
) -> RepoResult<Vec<ProgramMeeting>> {
    let mut stmt = conn.prepare(&format!("{MEETING_SELECT_SQL} {filter};"))?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    let mut meetings = Vec::new();
    while let Some(row) = rows.next()? {
        let id_text: String = row.get("id")?;
        let program_text: String = row.get("program_id")?;
        meetings.push(ProgramMeeting {
            id: parse_uuid(&id_text, "program_meetings.id")?,
            program_id: parse_uuid(&program_text, "program_meetings.program_id")?,
            date: row.get("date")?,
            topic: row.get("topic")?,
            notes: row.get("notes")?,
        });
    }
    Ok(meetings)
}

fn parse_program_row(row: &Row<'_>) -> RepoResult<Program> {
    let id_text: String = row.get("id")?;
    let organization_text: String = row.get("organization_id")?;
    let status_text: String = row.get("status")?;
    let status = parse_program_status(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid program status `{status_text}` in programs.status"
        ))
    })?;

    Ok(Program {
        id: parse_uuid(&id_text, "programs.id")?,
        organization_id: parse_uuid(&organization_text, "programs.organization_id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        start_date: row.get("start_date")?,
        end_date: row.get("end_date")?,
        status,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_participant_row(row: &Row<'_>) -> RepoResult<ProgramParticipant> {
    let id_text: String = row.get("id")?;
    let program_text: String = row.get("program_id")?;
    let patient_text: String = row.get("patient_id")?;
    Ok(ProgramParticipant {
        id: parse_uuid(&id_text, "program_participants.id")?,
        program_id: parse_uuid(&program_text, "program_participants.program_id")?,
        patient_id: parse_uuid(&patient_text, "program_participants.patient_id")?,
        join_date: row.get("join_date")?,
        leave_date: row.get("leave_date")?,
        notes: row.get("notes")?,
    })
}

fn parse_record_row(row: &Row<'_>) -> RepoResult<ProgramMeetingRecord> {
    let id_text: String = row.get("id")?;
    let meeting_text: String = row.get("program_meeting_id")?;
    let patient_text: String = row.get("patient_id")?;
    Ok(ProgramMeetingRecord {
        id: parse_uuid(&id_text, "program_meeting_records.id")?,
        program_meeting_id: parse_uuid(&meeting_text, "program_meeting_records.program_meeting_id")?,
        patient_id: parse_uuid(&patient_text, "program_meeting_records.patient_id")?,
        present: int_to_bool(row.get("present")?, "program_meeting_records.present")?,
        weight_kg: row.get("weight_kg")?,
        blood_pressure: row.get("blood_pressure")?,
        notes: row.get("notes")?,
        recorded_at: row.get("recorded_at")?,
    })
}

fn program_status_to_db(status: ProgramStatus) -> &'static str {
    match status {
        ProgramStatus::Planned => "planned",
        ProgramStatus::Active => "active",
        ProgramStatus::Finished => "finished",
    }
}

fn parse_program_status(value: &str) -> Option<ProgramStatus> {
    match value {
        "planned" => Some(ProgramStatus::Planned),
        "active" => Some(ProgramStatus::Active),
        "finished" => Some(ProgramStatus::Finished),
        _ => None,
    }
}
