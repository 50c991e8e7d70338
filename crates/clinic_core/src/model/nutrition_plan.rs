//! Nutrition plans and their ordered meals.
//!
//! # Invariants
//! - For one `(patient_id, organization_id)` at most one plan has
//!   `is_active = true`.
//! - Meals keep the order they were supplied in (`position` 0..n).

use crate::model::patch::{apply_required, Patch};
use crate::model::{
    require_ordered, require_text, ModelValidationError, NutritionPlanId, OrganizationId,
    PatientId, ProfessionalId,
};
use serde::{Deserialize, Serialize};

/// Meal slot within a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MealType {
    Breakfast,
    MorningSnack,
    Lunch,
    AfternoonSnack,
    Dinner,
    Supper,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NutritionPlanMeal {
    /// Zero-based order within the plan.
    pub position: u32,
    pub meal_type: MealType,
    pub description: String,
    pub observation: Option<String>,
}

/// Meal input; position is assigned from list order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMeal {
    pub meal_type: MealType,
    pub description: String,
    pub observation: Option<String>,
}

impl NewMeal {
    pub fn new(meal_type: MealType, description: impl Into<String>) -> Self {
        Self {
            meal_type,
            description: description.into(),
            observation: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NutritionPlan {
    pub id: NutritionPlanId,
    pub organization_id: OrganizationId,
    pub patient_id: PatientId,
    pub professional_id: Option<ProfessionalId>,
    pub title: String,
    pub description: Option<String>,
    pub start_date: Option<i64>,
    pub end_date: Option<i64>,
    pub is_active: bool,
    pub meals: Vec<NutritionPlanMeal>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNutritionPlan {
    pub organization_id: OrganizationId,
    pub patient_id: PatientId,
    pub professional_id: Option<ProfessionalId>,
    pub title: String,
    pub description: Option<String>,
    pub start_date: Option<i64>,
    pub end_date: Option<i64>,
    /// `None` means active; only an explicit `false` creates an inactive plan.
    pub is_active: Option<bool>,
    pub meals: Vec<NewMeal>,
}

impl NewNutritionPlan {
    pub fn new(
        organization_id: OrganizationId,
        patient_id: PatientId,
        title: impl Into<String>,
    ) -> Self {
        Self {
            organization_id,
            patient_id,
            professional_id: None,
            title: title.into(),
            description: None,
            start_date: None,
            end_date: None,
            is_active: None,
            meals: Vec::new(),
        }
    }

    /// Effective activation flag after applying the default.
    pub fn effective_is_active(&self) -> bool {
        self.is_active != Some(false)
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        require_text("title", &self.title)?;
        require_ordered("nutrition_plan", self.start_date, self.end_date)?;
        validate_meals(&self.meals)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NutritionPlanPatch {
    pub title: Option<String>,
    pub description: Patch<String>,
    pub professional_id: Patch<ProfessionalId>,
    pub start_date: Patch<i64>,
    pub end_date: Patch<i64>,
    pub is_active: Option<bool>,
    /// Replaces the whole meal list when present.
    pub meals: Option<Vec<NewMeal>>,
}

impl NutritionPlanPatch {
    /// Returns whether applying this patch turns `plan` from inactive to active.
    pub fn activates(&self, plan: &NutritionPlan) -> bool {
        self.is_active == Some(true) && !plan.is_active
    }
}

impl NutritionPlan {
    pub fn apply_patch(&mut self, patch: &NutritionPlanPatch) -> Result<(), ModelValidationError> {
        apply_required(&patch.title, &mut self.title);
        patch.description.apply_to(&mut self.description);
        patch.professional_id.apply_to(&mut self.professional_id);
        patch.start_date.apply_to(&mut self.start_date);
        patch.end_date.apply_to(&mut self.end_date);
        apply_required(&patch.is_active, &mut self.is_active);
        if let Some(meals) = &patch.meals {
            validate_meals(meals)?;
            self.meals = number_meals(meals);
        }
        require_text("title", &self.title)?;
        require_ordered("nutrition_plan", self.start_date, self.end_date)
    }
}

/// Assigns positions to meals in supplied order.
pub fn number_meals(meals: &[NewMeal]) -> Vec<NutritionPlanMeal> {
    meals
        .iter()
        .zip(0u32..)
        .map(|(meal, position)| NutritionPlanMeal {
            position,
            meal_type: meal.meal_type,
            description: meal.description.clone(),
            observation: meal.observation.clone(),
        })
        .collect()
}

fn validate_meals(meals: &[NewMeal]) -> Result<(), ModelValidationError> {
    for meal in meals {
        require_text("meal.description", &meal.description)?;
    }
    Ok(())
}
