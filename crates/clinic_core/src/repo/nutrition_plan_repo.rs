//! Nutrition plan repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist plans with their ordered meals.
//! - Offer a serialized write scope in which activation changes happen.
//!
//! # Invariants
//! - Storage holds at most one `is_active = 1` row per
//!   `(patient_id, organization_id)` (partial unique index).
//! - `serialized` runs its work inside one `BEGIN IMMEDIATE` transaction:
//!   the deactivate-then-write sequence of one caller never interleaves with
//!   another caller's.
//! - Meals are replaced as a whole list; positions are contiguous from 0.

use crate::db::Database;
use crate::model::nutrition_plan::{
    number_meals, MealType, NewNutritionPlan, NutritionPlan, NutritionPlanMeal,
    NutritionPlanPatch,
};
use crate::model::{NutritionPlanId, OrganizationId, PatientId};
use crate::repo::{
    begin_write, bool_to_int, int_to_bool, parse_optional_uuid, parse_uuid, RepoError,
    RepoResult, NOW_MS_SQL,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use uuid::Uuid;

const PLAN_SELECT_SQL: &str = "SELECT
    id,
    organization_id,
    patient_id,
    professional_id,
    title,
    description,
    start_date,
    end_date,
    is_active,
    created_at,
    updated_at
FROM nutrition_plans";

/// Write operations available inside a serialized plan scope.
pub trait NutritionPlanWriter {
    fn find_by_id(
        &self,
        id: NutritionPlanId,
        organization_id: OrganizationId,
    ) -> RepoResult<Option<NutritionPlan>>;
    /// Sets `is_active = false` on the patient's active plans other than
    /// `except`. Returns how many plans changed.
    fn deactivate_active_for_patient(
        &self,
        organization_id: OrganizationId,
        patient_id: PatientId,
        except: Option<NutritionPlanId>,
    ) -> RepoResult<usize>;
    fn insert(&self, plan: &NewNutritionPlan) -> RepoResult<NutritionPlan>;
    fn apply_patch(
        &self,
        id: NutritionPlanId,
        organization_id: OrganizationId,
        patch: &NutritionPlanPatch,
    ) -> RepoResult<NutritionPlan>;
}

pub trait NutritionPlanRepository {
    fn find_by_id(
        &self,
        id: NutritionPlanId,
        organization_id: OrganizationId,
    ) -> RepoResult<Option<NutritionPlan>>;
    /// Newest first.
    fn list_by_patient(
        &self,
        organization_id: OrganizationId,
        patient_id: PatientId,
    ) -> RepoResult<Vec<NutritionPlan>>;
    fn find_active_for_patient(
        &self,
        organization_id: OrganizationId,
        patient_id: PatientId,
    ) -> RepoResult<Option<NutritionPlan>>;
    fn delete(&self, id: NutritionPlanId, organization_id: OrganizationId) -> RepoResult<()>;
    /// Runs `work` in an exclusive write scope. Commits when it returns `Ok`,
    /// rolls back otherwise.
    fn serialized<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&dyn NutritionPlanWriter) -> Result<T, E>,
        E: From<RepoError>;
}

#[derive(Debug, Clone)]
pub struct SqliteNutritionPlanRepository {
    db: Database,
}

impl SqliteNutritionPlanRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl NutritionPlanRepository for SqliteNutritionPlanRepository {
    fn find_by_id(
        &self,
        id: NutritionPlanId,
        organization_id: OrganizationId,
    ) -> RepoResult<Option<NutritionPlan>> {
        let conn = self.db.connect()?;
        load_plan(&conn, id, organization_id)
    }

    fn list_by_patient(
        &self,
        organization_id: OrganizationId,
        patient_id: PatientId,
    ) -> RepoResult<Vec<NutritionPlan>> {
        let conn = self.db.connect()?;
        query_plans(
            &conn,
            "WHERE organization_id = ? AND patient_id = ? ORDER BY created_at DESC, id ASC",
            vec![
                Value::Text(organization_id.to_string()),
                Value::Text(patient_id.to_string()),
            ],
        )
    }

    fn find_active_for_patient(
        &self,
        organization_id: OrganizationId,
        patient_id: PatientId,
    ) -> RepoResult<Option<NutritionPlan>> {
        let conn = self.db.connect()?;
        load_active_plan(&conn, organization_id, patient_id)
    }

    fn delete(&self, id: NutritionPlanId, organization_id: OrganizationId) -> RepoResult<()> {
        let conn = self.db.connect()?;
        let changed = conn.execute(
            "DELETE FROM nutrition_plans WHERE id = ?1 AND organization_id = ?2;",
            params![id.to_string(), organization_id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn serialized<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&dyn NutritionPlanWriter) -> Result<T, E>,
        E: From<RepoError>,
    {
        let mut conn = self.db.connect().map_err(RepoError::from)?;
        let tx = begin_write(&mut conn)?;
        let output = work(&SqliteNutritionPlanWriter { conn: &tx })?;
        tx.commit().map_err(RepoError::from)?;
        Ok(output)
    }
}

/// Writer bound to an open immediate transaction.
struct SqliteNutritionPlanWriter<'conn> {
    conn: &'conn Connection,
}

impl NutritionPlanWriter for SqliteNutritionPlanWriter<'_> {
    fn find_by_id(
        &self,
        id: NutritionPlanId,
        organization_id: OrganizationId,
    ) -> RepoResult<Option<NutritionPlan>> {
        load_plan(self.conn, id, organization_id)
    }

    fn deactivate_active_for_patient(
        &self,
        organization_id: OrganizationId,
        patient_id: PatientId,
        except: Option<NutritionPlanId>,
    ) -> RepoResult<usize> {
        let changed = self.conn.execute(
            &format!(
                "UPDATE nutrition_plans
                 SET
                    is_active = 0,
                    updated_at = {NOW_MS_SQL}
                 WHERE organization_id = ?1
                   AND patient_id = ?2
                   AND is_active = 1
                   AND (?3 IS NULL OR id <> ?3);"
            ),
            params![
                organization_id.to_string(),
                patient_id.to_string(),
                except.map(|id| id.to_string()),
            ],
        )?;
        Ok(changed)
    }

    fn insert(&self, plan: &NewNutritionPlan) -> RepoResult<NutritionPlan> {
        plan.validate()?;

        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO nutrition_plans (
                id,
                organization_id,
                patient_id,
                professional_id,
                title,
                description,
                start_date,
                end_date,
                is_active
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                id.to_string(),
                plan.organization_id.to_string(),
                plan.patient_id.to_string(),
                plan.professional_id.map(|value| value.to_string()),
                plan.title.trim(),
                plan.description.as_deref(),
                plan.start_date,
                plan.end_date,
                bool_to_int(plan.effective_is_active()),
            ],
        )?;
        replace_meals(self.conn, id, &number_meals(&plan.meals))?;

        load_plan(self.conn, id, plan.organization_id)?.ok_or(RepoError::NotFound(id))
    }

    fn apply_patch(
        &self,
        id: NutritionPlanId,
        organization_id: OrganizationId,
        patch: &NutritionPlanPatch,
    ) -> RepoResult<NutritionPlan> {
        let mut plan = load_plan(self.conn, id, organization_id)?.ok_or(RepoError::NotFound(id))?;
        plan.apply_patch(patch)?;

        self.conn.execute(
            &format!(
                "UPDATE nutrition_plans
                 SET
                    professional_id = ?3,
                    title = ?4,
                    description = ?5,
                    start_date = ?6,
                    end_date = ?7,
                    is_active = ?8,
                    updated_at = {NOW_MS_SQL}
                 WHERE id = ?1
                   AND organization_id = ?2;"
            ),
            params![
                id.to_string(),
                organization_id.to_string(),
                plan.professional_id.map(|value| value.to_string()),
                plan.title.trim(),
                plan.description.as_deref(),
                plan.start_date,
                plan.end_date,
                bool_to_int(plan.is_active),
            ],
        )?;
        if patch.meals.is_some() {
            replace_meals(self.conn, id, &plan.meals)?;
        }

        load_plan(self.conn, id, organization_id)?.ok_or(RepoError::NotFound(id))
    }
}

fn load_plan(
    conn: &Connection,
    id: NutritionPlanId,
    organization_id: OrganizationId,
) -> RepoResult<Option<NutritionPlan>> {
    let mut found = query_plans(
        conn,
        "WHERE id = ? AND organization_id = ?",
        vec![
            Value::Text(id.to_string()),
            Value::Text(organization_id.to_string()),
        ],
    )?;
    Ok(found.pop())
}

fn load_active_plan(
    conn: &Connection,
    organization_id: OrganizationId,
    patient_id: PatientId,
) -> RepoResult<Option<NutritionPlan>> {
    let mut found = query_plans(
        conn,
        "WHERE organization_id = ? AND patient_id = ? AND is_active = 1",
        vec![
            Value::Text(organization_id.to_string()),
            Value::Text(patient_id.to_string()),
        ],
    )?;
    if found.len() > 1 {
        return Err(RepoError::InvalidData(format!(
            "patient {patient_id} has {} active nutrition plans",
            found.len()
        )));
    }
    Ok(found.pop())
}

fn query_plans(
    conn: &Connection,
    filter: &str,
    bind_values: Vec<Value>,
) -> RepoResult<Vec<NutritionPlan>> {
    let mut stmt = conn.prepare(&format!("{PLAN_SELECT_SQL} {filter};"))?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    let mut plans = Vec::new();
    while let Some(row) = rows.next()? {
        let mut plan = parse_plan_row(row)?;
        plan.meals = load_meals(conn, plan.id)?;
        plans.push(plan);
    }
    Ok(plans)
}

fn parse_plan_row(row: &Row<'_>) -> RepoResult<NutritionPlan> {
    let id_text: String = row.get("id")?;
    let organization_text: String = row.get("organization_id")?;
    let patient_text: String = row.get("patient_id")?;
    Ok(NutritionPlan {
        id: parse_uuid(&id_text, "nutrition_plans.id")?,
        organization_id: parse_uuid(&organization_text, "nutrition_plans.organization_id")?,
        patient_id: parse_uuid(&patient_text, "nutrition_plans.patient_id")?,
        professional_id: parse_optional_uuid(
            row.get("professional_id")?,
            "nutrition_plans.professional_id",
        )?,
        title: row.get("title")?,
        description: row.get("description")?,
        start_date: row.get("start_date")?,
        end_date: row.get("end_date")?,
        is_active: int_to_bool(row.get("is_active")?, "nutrition_plans.is_active")?,
        meals: Vec::new(),
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn load_meals(conn: &Connection, plan_id: NutritionPlanId) -> RepoResult<Vec<NutritionPlanMeal>> {
    let mut stmt = conn.prepare(
        "SELECT position, meal_type, description, observation
         FROM nutrition_plan_meals
         WHERE plan_id = ?1
         ORDER BY position ASC;",
    )?;
    let mut rows = stmt.query([plan_id.to_string()])?;
    let mut meals = Vec::new();
    while let Some(row) = rows.next()? {
        let meal_text: String = row.get("meal_type")?;
        let meal_type = parse_meal_type(&meal_text).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid meal type `{meal_text}` in nutrition_plan_meals.meal_type"
            ))
        })?;
        meals.push(NutritionPlanMeal {
            position: row.get("position")?,
            meal_type,
            description: row.get("description")?,
            observation: row.get("observation")?,
        });
    }
    Ok(meals)
}

fn replace_meals(
    conn: &Connection,
    plan_id: NutritionPlanId,
    meals: &[NutritionPlanMeal],
) -> RepoResult<()> {
    let plan_id = plan_id.to_string();
    conn.execute(
        "DELETE FROM nutrition_plan_meals WHERE plan_id = ?1;",
        [plan_id.as_str()],
    )?;
    for meal in meals {
        conn.execute(
            "INSERT INTO nutrition_plan_meals (
                plan_id,
                position,
                meal_type,
                description,
                observation
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                plan_id.as_str(),
                meal.position,
                meal_type_to_db(meal.meal_type),
                meal.description.trim(),
                meal.observation.as_deref(),
            ],
        )?;
    }
    Ok(())
}

fn meal_type_to_db(meal_type: MealType) -> &'static str {
    match meal_type {
        MealType::Breakfast => "breakfast",
        MealType::MorningSnack => "morning_snack",
        MealType::Lunch => "lunch",
        MealType::AfternoonSnack => "afternoon_snack",
        MealType::Dinner => "dinner",
        MealType::Supper => "supper",
    }
}

fn parse_meal_type(value: &str) -> Option<MealType> {
    match value {
        "breakfast" => Some(MealType::Breakfast),
        "morning_snack" => Some(MealType::MorningSnack),
        "lunch" => Some(MealType::Lunch),
        "afternoon_snack" => Some(MealType::AfternoonSnack),
        "dinner" => Some(MealType::Dinner),
        "supper" => Some(MealType::Supper),
        _ => None,
    }
}
