//! Patient repository contract and SQLite implementation.
//!
//! # Invariants
//! - Tags live in `patient_tags` and are replaced as a whole set inside the
//!   same transaction as the owning row.
//! - Listing is deterministic: `name COLLATE NOCASE ASC, id ASC`.

use crate::db::Database;
use crate::model::patient::{normalize_tag, normalize_tags, NewPatient, Patient, PatientPatch};
use crate::model::{OrganizationId, PatientId};
use crate::repo::{begin_write, parse_uuid, RepoError, RepoResult, NOW_MS_SQL};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use uuid::Uuid;

const PATIENT_SELECT_SQL: &str = "SELECT
    id,
    organization_id,
    name,
    email,
    phone,
    birth_date,
    gender,
    notes,
    created_at,
    updated_at
FROM patients";

/// Filters for patient listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatientListQuery {
    /// Optional single-tag exact match, normalized before use. A tag that is
    /// blank after normalization matches no patient.
    pub tag: Option<String>,
}

pub trait PatientRepository {
    fn create(&self, patient: &NewPatient) -> RepoResult<Patient>;
    fn find_by_id(
        &self,
        id: PatientId,
        organization_id: OrganizationId,
    ) -> RepoResult<Option<Patient>>;
    fn list_by_organization(
        &self,
        organization_id: OrganizationId,
        query: &PatientListQuery,
    ) -> RepoResult<Vec<Patient>>;
    fn update(
        &self,
        id: PatientId,
        organization_id: OrganizationId,
        patch: &PatientPatch,
    ) -> RepoResult<Patient>;
    /// Fails with `ForeignKeyViolation` while historical records reference
    /// the patient.
    fn delete(&self, id: PatientId, organization_id: OrganizationId) -> RepoResult<()>;
}

/// SQLite-backed patient repository.
#[derive(Debug, Clone)]
pub struct SqlitePatientRepository {
    db: Database,
}

impl SqlitePatientRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl PatientRepository for SqlitePatientRepository {
    fn create(&self, patient: &NewPatient) -> RepoResult<Patient> {
        patient.validate()?;

        let mut conn = self.db.connect()?;
        let tx = begin_write(&mut conn)?;
        let id = Uuid::new_v4();
        tx.execute(
            "INSERT INTO patients (
                id,
                organization_id,
                name,
                email,
                phone,
                birth_date,
                gender,
                notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                id.to_string(),
                patient.organization_id.to_string(),
                patient.name.trim(),
                patient.email.as_deref(),
                patient.phone.as_deref(),
                patient.birth_date,
                patient.gender.as_deref(),
                patient.notes.as_deref(),
            ],
        )?;
        replace_tags(&tx, id, &normalize_tags(&patient.tags))?;

        let created = load_patient(&tx, id, patient.organization_id)?
            .ok_or(RepoError::NotFound(id))?;
        tx.commit()?;
        Ok(created)
    }

    fn find_by_id(
        &self,
        id: PatientId,
        organization_id: OrganizationId,
    ) -> RepoResult<Option<Patient>> {
        let conn = self.db.connect()?;
        load_patient(&conn, id, organization_id)
    }

    fn list_by_organization(
        &self,
        organization_id: OrganizationId,
        query: &PatientListQuery,
    ) -> RepoResult<Vec<Patient>> {
        let tag = match query.tag.as_deref() {
            Some(raw) => match normalize_tag(raw) {
                Some(tag) => Some(tag),
                None => return Ok(Vec::new()),
            },
            None => None,
        };
        let conn = self.db.connect()?;
        let mut sql = format!("{PATIENT_SELECT_SQL} WHERE organization_id = ?");
        let mut bind_values = vec![Value::Text(organization_id.to_string())];

        if let Some(tag) = tag {
            sql.push_str(
                " AND EXISTS (
                    SELECT 1
                    FROM patient_tags pt
                    WHERE pt.patient_id = patients.id
                      AND pt.tag = ?
                )",
            );
            bind_values.push(Value::Text(tag));
        }
        sql.push_str(" ORDER BY name COLLATE NOCASE ASC, id ASC");

        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut patients = Vec::new();
        while let Some(row) = rows.next()? {
            let mut patient = parse_patient_row(row)?;
            patient.tags = load_tags(&conn, patient.id)?;
            patients.push(patient);
        }
        Ok(patients)
    }

    fn update(
        &self,
        id: PatientId,
        organization_id: OrganizationId,
        patch: &PatientPatch,
    ) -> RepoResult<Patient> {
        let mut conn = self.db.connect()?;
        let tx = begin_write(&mut conn)?;
        let mut patient = load_patient(&tx, id, organization_id)?.ok_or(RepoError::NotFound(id))?;
        patient.apply_patch(patch)?;

        tx.execute(
            &format!(
                "UPDATE patients
                 SET
                    name = ?3,
                    email = ?4,
                    phone = ?5,
                    birth_date = ?6,
                    gender = ?7,
                    notes = ?8,
                    updated_at = {NOW_MS_SQL}
                 WHERE id = ?1
                   AND organization_id = ?2;"
            ),
            params![
                id.to_string(),
                organization_id.to_string(),
                patient.name.trim(),
                patient.email.as_deref(),
                patient.phone.as_deref(),
                patient.birth_date,
                patient.gender.as_deref(),
                patient.notes.as_deref(),
            ],
        )?;
        if patch.tags.is_some() {
            replace_tags(&tx, id, &patient.tags)?;
        }

        let updated = load_patient(&tx, id, organization_id)?.ok_or(RepoError::NotFound(id))?;
        tx.commit()?;
        Ok(updated)
    }

    fn delete(&self, id: PatientId, organization_id: OrganizationId) -> RepoResult<()> {
        let conn = self.db.connect()?;
        let changed = conn.execute(
            "DELETE FROM patients WHERE id = ?1 AND organization_id = ?2;",
            params![id.to_string(), organization_id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }
}

fn load_patient(
    conn: &Connection,
    id: PatientId,
    organization_id: OrganizationId,
) -> RepoResult<Option<Patient>> {
    let mut stmt = conn.prepare(&format!(
        "{PATIENT_SELECT_SQL}
         WHERE id = ?1
           AND organization_id = ?2;"
    ))?;
    let mut rows = stmt.query(params![id.to_string(), organization_id.to_string()])?;
    if let Some(row) = rows.next()? {
        let mut patient = parse_patient_row(row)?;
        patient.tags = load_tags(conn, patient.id)?;
        return Ok(Some(patient));
    }
    Ok(None)
}

fn parse_patient_row(row: &Row<'_>) -> RepoResult<Patient> {
    let id_text: String = row.get("id")?;
    let organization_text: String = row.get("organization_id")?;
    Ok(Patient {
        id: parse_uuid(&id_text, "patients.id")?,
        organization_id: parse_uuid(&organization_text, "patients.organization_id")?,
        name: row.get("name")?,
        email: row.get("email")?,
        phone: row.get("phone")?,
        birth_date: row.get("birth_date")?,
        gender: row.get("gender")?,
        tags: Vec::new(),
        notes: row.get("notes")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn load_tags(conn: &Connection, patient_id: PatientId) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT tag
         FROM patient_tags
         WHERE patient_id = ?1
         ORDER BY tag ASC;",
    )?;
    let mut rows = stmt.query([patient_id.to_string()])?;
    let mut tags = Vec::new();
    while let Some(row) = rows.next()? {
        tags.push(row.get(0)?);
    }
    Ok(tags)
}

fn replace_tags(conn: &Connection, patient_id: PatientId, tags: &[String]) -> RepoResult<()> {
    let patient_id = patient_id.to_string();
    conn.execute(
        "DELETE FROM patient_tags WHERE patient_id = ?1;",
        [patient_id.as_str()],
    )?;
    for tag in tags {
        conn.execute(
            "INSERT INTO patient_tags (patient_id, tag) VALUES (?1, ?2);",
            params![patient_id.as_str(), tag.as_str()],
        )?;
    }
    Ok(())
}
