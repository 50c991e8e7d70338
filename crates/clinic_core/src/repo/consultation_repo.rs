//! Consultation persistence. Read by the analytics aggregator.

use crate::db::Database;
use crate::model::analytics::DateRange;
use crate::model::consultation::{Consultation, NewConsultation};
use crate::model::{ConsultationId, OrganizationId, PatientId};
use crate::repo::{parse_uuid, RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use uuid::Uuid;

const CONSULTATION_SELECT_SQL: &str = "SELECT
    id,
    organization_id,
    patient_id,
    professional_id,
    date,
    notes,
    created_at
FROM consultations";

pub trait ConsultationRepository {
    /// Patient and professional must belong to the consultation's organization.
    fn create(&self, consultation: &NewConsultation) -> RepoResult<Consultation>;
    fn find_by_id(
        &self,
        id: ConsultationId,
        organization_id: OrganizationId,
    ) -> RepoResult<Option<Consultation>>;
    /// Lists consultations, restricted to `[start, end]` when `range` is set.
    fn list_by_organization(
        &self,
        organization_id: OrganizationId,
        range: Option<DateRange>,
    ) -> RepoResult<Vec<Consultation>>;
    fn list_by_patient(
        &self,
        organization_id: OrganizationId,
        patient_id: PatientId,
    ) -> RepoResult<Vec<Consultation>>;
}

#[derive(Debug, Clone)]
pub struct SqliteConsultationRepository {
    db: Database,
}

impl SqliteConsultationRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl ConsultationRepository for SqliteConsultationRepository {
    fn create(&self, consultation: &NewConsultation) -> RepoResult<Consultation> {
        let conn = self.db.connect()?;
        let id = Uuid::new_v4();
        conn.execute(
            "INSERT INTO consultations (
                id,
                organization_id,
                patient_id,
                professional_id,
                date,
                notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                id.to_string(),
                consultation.organization_id.to_string(),
                consultation.patient_id.to_string(),
                consultation.professional_id.to_string(),
                consultation.date,
                consultation.notes.as_deref(),
            ],
        )?;
        query_consultations(
            &conn,
            "WHERE id = ?",
            vec![Value::Text(id.to_string())],
        )?
        .pop()
        .ok_or(RepoError::NotFound(id))
    }

    fn find_by_id(
        &self,
        id: ConsultationId,
        organization_id: OrganizationId,
    ) -> RepoResult<Option<Consultation>> {
        let conn = self.db.connect()?;
        let mut found = query_consultations(
            &conn,
            "WHERE id = ? AND organization_id = ?",
            vec![
                Value::Text(id.to_string()),
                Value::Text(organization_id.to_string()),
            ],
        )?;
        Ok(found.pop())
    }

    fn list_by_organization(
        &self,
        organization_id: OrganizationId,
        range: Option<DateRange>,
    ) -> RepoResult<Vec<Consultation>> {
        let conn = self.db.connect()?;
        let mut filter = String::from("WHERE organization_id = ?");
        let mut bind_values = vec![Value::Text(organization_id.to_string())];
        if let Some(range) = range {
            filter.push_str(" AND date >= ? AND date <= ?");
            bind_values.push(Value::Integer(range.start));
            bind_values.push(Value::Integer(range.end));
        }
        filter.push_str(" ORDER BY date ASC, id ASC");
        query_consultations(&conn, &filter, bind_values)
    }

    fn list_by_patient(
        &self,
        organization_id: OrganizationId,
        patient_id: PatientId,
    ) -> RepoResult<Vec<Consultation>> {
        let conn = self.db.connect()?;
        query_consultations(
            &conn,
            "WHERE organization_id = ? AND patient_id = ? ORDER BY date ASC, id ASC",
            vec![
                Value::Text(organization_id.to_string()),
                Value::Text(patient_id.to_string()),
            ],
        )
    }
}

fn query_consultations(
    conn: &Connection,
    filter: &str,
    bind_values: Vec<Value>,
) -> RepoResult<Vec<Consultation>> {
    let mut stmt = conn.prepare(&format!("{CONSULTATION_SELECT_SQL} {filter};"))?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    let mut consultations = Vec::new();
    while let Some(row) = rows.next()? {
        consultations.push(parse_consultation_row(row)?);
    }
    Ok(consultations)
}

fn parse_consultation_row(row: &Row<'_>) -> RepoResult<Consultation> {
    let id_text: String = row.get("id")?;
    let organization_text: String = row.get("organization_id")?;
    let patient_text: String = row.get("patient_id")?;
    let professional_text: String = row.get("professional_id")?;
    Ok(Consultation {
        id: parse_uuid(&id_text, "consultations.id")?,
        organization_id: parse_uuid(&organization_text, "consultations.organization_id")?,
        patient_id: parse_uuid(&patient_text, "consultations.patient_id")?,
        professional_id: parse_uuid(&professional_text, "consultations.professional_id")?,
        date: row.get("date")?,
        notes: row.get("notes")?,
        created_at: row.get("created_at")?,
    })
}
