//! Organization and professional persistence.

use crate::db::Database;
use crate::model::organization::{NewProfessional, Organization, Professional};
use crate::model::{require_text, OrganizationId, ProfessionalId};
use crate::repo::{parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

const PROFESSIONAL_SELECT_SQL: &str = "SELECT
    id,
    organization_id,
    name,
    email,
    specialty,
    created_at
FROM professionals";

pub trait OrganizationRepository {
    fn create_organization(&self, name: &str) -> RepoResult<Organization>;
    fn find_organization(&self, id: OrganizationId) -> RepoResult<Option<Organization>>;
    /// Fails with `UniqueViolation` when the email is already registered.
    fn create_professional(&self, professional: &NewProfessional) -> RepoResult<Professional>;
    fn find_professional(
        &self,
        id: ProfessionalId,
        organization_id: OrganizationId,
    ) -> RepoResult<Option<Professional>>;
    fn list_professionals(&self, organization_id: OrganizationId)
        -> RepoResult<Vec<Professional>>;
}

#[derive(Debug, Clone)]
pub struct SqliteOrganizationRepository {
    db: Database,
}

impl SqliteOrganizationRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl OrganizationRepository for SqliteOrganizationRepository {
    fn create_organization(&self, name: &str) -> RepoResult<Organization> {
        require_text("name", name)?;
        let conn = self.db.connect()?;
        let id = Uuid::new_v4();
        let created_at = conn.query_row(
            "INSERT INTO organizations (id, name) VALUES (?1, ?2) RETURNING created_at;",
            params![id.to_string(), name.trim()],
            |row| row.get(0),
        )?;
        Ok(Organization {
            id,
            name: name.trim().to_string(),
            created_at,
        })
    }

    fn find_organization(&self, id: OrganizationId) -> RepoResult<Option<Organization>> {
        let conn = self.db.connect()?;
        let found = conn
            .query_row(
                "SELECT name, created_at FROM organizations WHERE id = ?1;",
                [id.to_string()],
                |row| {
                    Ok(Organization {
                        id,
                        name: row.get("name")?,
                        created_at: row.get("created_at")?,
                    })
                },
            )
            .optional()?;
        Ok(found)
    }

    fn create_professional(&self, professional: &NewProfessional) -> RepoResult<Professional> {
        professional.validate()?;
        let conn = self.db.connect()?;
        let id = Uuid::new_v4();
        conn.execute(
            "INSERT INTO professionals (
                id,
                organization_id,
                name,
                email,
                specialty
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                id.to_string(),
                professional.organization_id.to_string(),
                professional.name.trim(),
                professional.normalized_email(),
                professional.specialty.as_deref(),
            ],
        )?;
        load_professional(&conn, id, professional.organization_id)?
            .ok_or(RepoError::NotFound(id))
    }

    fn find_professional(
        &self,
        id: ProfessionalId,
        organization_id: OrganizationId,
    ) -> RepoResult<Option<Professional>> {
        let conn = self.db.connect()?;
        load_professional(&conn, id, organization_id)
    }

    fn list_professionals(
        &self,
        organization_id: OrganizationId,
    ) -> RepoResult<Vec<Professional>> {
        let conn = self.db.connect()?;
        let mut stmt = conn.prepare(&format!(
            "{PROFESSIONAL_SELECT_SQL}
             WHERE organization_id = ?1
             ORDER BY name COLLATE NOCASE ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([organization_id.to_string()])?;
        let mut professionals = Vec::new();
        while let Some(row) = rows.next()? {
            professionals.push(parse_professional_row(row)?);
        }
        Ok(professionals)
    }
}

fn load_professional(
    conn: &Connection,
    id: ProfessionalId,
    organization_id: OrganizationId,
) -> RepoResult<Option<Professional>> {
    let mut stmt = conn.prepare(&format!(
        "{PROFESSIONAL_SELECT_SQL}
         WHERE id = ?1
           AND organization_id = ?2;"
    ))?;
    let mut rows = stmt.query(params![id.to_string(), organization_id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_professional_row(row)?));
    }
    Ok(None)
}

fn parse_professional_row(row: &Row<'_>) -> RepoResult<Professional> {
    let id_text: String = row.get("id")?;
    let organization_text: String = row.get("organization_id")?;
    Ok(Professional {
        id: parse_uuid(&id_text, "professionals.id")?,
        organization_id: parse_uuid(&organization_text, "professionals.organization_id")?,
        name: row.get("name")?,
        email: row.get("email")?,
        specialty: row.get("specialty")?,
        created_at: row.get("created_at")?,
    })
}
