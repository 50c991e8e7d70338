//! Task repository contract and SQLite implementation.

use crate::db::Database;
use crate::model::task::{NewTask, Task, TaskPatch, TaskStatus};
use crate::model::{OrganizationId, PatientId, ProfessionalId, ProgramId, TaskId};
use crate::repo::{
    begin_write, parse_optional_uuid, parse_uuid, RepoError, RepoResult, NOW_MS_SQL,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use uuid::Uuid;

const TASK_SELECT_SQL: &str = "SELECT
    id,
    organization_id,
    professional_id,
    patient_id,
    program_id,
    title,
    description,
    due_date,
    status,
    created_at,
    updated_at
FROM tasks";

/// Filters for task listing. All set filters must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskListQuery {
    pub professional_id: Option<ProfessionalId>,
    pub patient_id: Option<PatientId>,
    pub program_id: Option<ProgramId>,
    pub status: Option<TaskStatus>,
}

pub trait TaskRepository {
    fn create(&self, task: &NewTask) -> RepoResult<Task>;
    fn find_by_id(&self, id: TaskId, organization_id: OrganizationId) -> RepoResult<Option<Task>>;
    /// Ordered by due date (undated last), then creation time.
    fn list(&self, organization_id: OrganizationId, query: &TaskListQuery)
        -> RepoResult<Vec<Task>>;
    fn update(
        &self,
        id: TaskId,
        organization_id: OrganizationId,
        patch: &TaskPatch,
    ) -> RepoResult<Task>;
    fn delete(&self, id: TaskId, organization_id: OrganizationId) -> RepoResult<()>;
}

#[derive(Debug, Clone)]
pub struct SqliteTaskRepository {
    db: Database,
}

impl SqliteTaskRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl TaskRepository for SqliteTaskRepository {
    fn create(&self, task: &NewTask) -> RepoResult<Task> {
        task.validate()?;

        let conn = self.db.connect()?;
        let id = Uuid::new_v4();
        conn.execute(
            "INSERT INTO tasks (
                id,
                organization_id,
                professional_id,
                patient_id,
                program_id,
                title,
                description,
                due_date,
                status
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                id.to_string(),
                task.organization_id.to_string(),
                task.professional_id.to_string(),
                task.patient_id.map(|value| value.to_string()),
                task.program_id.map(|value| value.to_string()),
                task.title.trim(),
                task.description.as_deref(),
                task.due_date,
                task_status_to_db(task.status.unwrap_or_default()),
            ],
        )?;
        load_task(&conn, id, task.organization_id)?.ok_or(RepoError::NotFound(id))
    }

    fn find_by_id(&self, id: TaskId, organization_id: OrganizationId) -> RepoResult<Option<Task>> {
        let conn = self.db.connect()?;
        load_task(&conn, id, organization_id)
    }

    fn list(
        &self,
        organization_id: OrganizationId,
        query: &TaskListQuery,
    ) -> RepoResult<Vec<Task>> {
        let conn = self.db.connect()?;
        let mut filter = String::from("WHERE organization_id = ?");
        let mut bind_values = vec![Value::Text(organization_id.to_string())];

        if let Some(professional_id) = query.professional_id {
            filter.push_str(" AND professional_id = ?");
            bind_values.push(Value::Text(professional_id.to_string()));
        }
        if let Some(patient_id) = query.patient_id {
            filter.push_str(" AND patient_id = ?");
            bind_values.push(Value::Text(patient_id.to_string()));
        }
        if let Some(program_id) = query.program_id {
            filter.push_str(" AND program_id = ?");
            bind_values.push(Value::Text(program_id.to_string()));
        }
        if let Some(status) = query.status {
            filter.push_str(" AND status = ?");
            bind_values.push(Value::Text(task_status_to_db(status).to_string()));
        }
        filter.push_str(" ORDER BY due_date IS NULL ASC, due_date ASC, created_at ASC, id ASC");

        query_tasks(&conn, &filter, bind_values)
    }

    fn update(
        &self,
        id: TaskId,
        organization_id: OrganizationId,
        patch: &TaskPatch,
    ) -> RepoResult<Task> {
        let mut conn = self.db.connect()?;
        let tx = begin_write(&mut conn)?;
        let mut task = load_task(&tx, id, organization_id)?.ok_or(RepoError::NotFound(id))?;
        task.apply_patch(patch)?;

        tx.execute(
            &format!(
                "UPDATE tasks
                 SET
                    patient_id = ?3,
                    program_id = ?4,
                    title = ?5,
                    description = ?6,
                    due_date = ?7,
                    status = ?8,
                    updated_at = {NOW_MS_SQL}
                 WHERE id = ?1
                   AND organization_id = ?2;"
            ),
            params![
                id.to_string(),
                organization_id.to_string(),
                task.patient_id.map(|value| value.to_string()),
                task.program_id.map(|value| value.to_string()),
                task.title.trim(),
                task.description.as_deref(),
                task.due_date,
                task_status_to_db(task.status),
            ],
        )?;

        let updated = load_task(&tx, id, organization_id)?.ok_or(RepoError::NotFound(id))?;
        tx.commit()?;
        Ok(updated)
    }

    fn delete(&self, id: TaskId, organization_id: OrganizationId) -> RepoResult<()> {
        let conn = self.db.connect()?;
        let changed = conn.execute(
            "DELETE FROM tasks WHERE id = ?1 AND organization_id = ?2;",
            params![id.to_string(), organization_id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }
}

fn load_task(
    conn: &Connection,
    id: TaskId,
    organization_id: OrganizationId,
) -> RepoResult<Option<Task>> {
    let mut found = query_tasks(
        conn,
        "WHERE id = ? AND organization_id = ?",
        vec![
            Value::Text(id.to_string()),
            Value::Text(organization_id.to_string()),
        ],
    )?;
    Ok(found.pop())
}

fn query_tasks(conn: &Connection, filter: &str, bind_values: Vec<Value>) -> RepoResult<Vec<Task>> {
    let mut stmt = conn.prepare(&format!("{TASK_SELECT_SQL} {filter};"))?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    let mut tasks = Vec::new();
    while let Some(row) = rows.next()? {
        tasks.push(parse_task_row(row)?);
    }
    Ok(tasks)
}

fn parse_task_row(row: &Row<'_>) -> RepoResult<Task> {
    let id_text: String = row.get("id")?;
    let organization_text: String = row.get("organization_id")?;
    let professional_text: String = row.get("professional_id")?;
    let status_text: String = row.get("status")?;
    let status = parse_task_status(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid task status `{status_text}` in tasks.status"))
    })?;

    Ok(Task {
        id: parse_uuid(&id_text, "tasks.id")?,
        organization_id: parse_uuid(&organization_text, "tasks.organization_id")?,
        professional_id: parse_uuid(&professional_text, "tasks.professional_id")?,
        patient_id: parse_optional_uuid(row.get("patient_id")?, "tasks.patient_id")?,
        program_id: parse_optional_uuid(row.get("program_id")?, "tasks.program_id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        due_date: row.get("due_date")?,
        status,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn task_status_to_db(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Pending => "pending",
        TaskStatus::InProgress => "in_progress",
        TaskStatus::Done => "done",
    }
}

fn parse_task_status(value: &str) -> Option<TaskStatus> {
    match value {
        "pending" => Some(TaskStatus::Pending),
        "in_progress" => Some(TaskStatus::InProgress),
        "done" => Some(TaskStatus::Done),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_task_status, task_status_to_db};
    use crate::model::task::TaskStatus;

    #[test]
    fn status_storage_names_are_stable() {
        for status in [TaskStatus::Pending, TaskStatus::InProgress, TaskStatus::Done] {
            assert_eq!(parse_task_status(task_status_to_db(status)), Some(status));
        }
        assert_eq!(parse_task_status("PENDING"), None);
    }
}
