use std::fmt;
use std::str::FromStr;

use anyhow::{Result, bail};
use chrono::{NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Prefix for recipes created on this device rather than fetched from `TheMealDB`.
pub const LOCAL_ID_PREFIX: &str = "local-";

/// Storage format for planned dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: String,
    pub name: String,
    pub instructions: String,
    pub image_url: Option<String>,
    pub category: String,
    pub area: String,
    pub is_bookmarked: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: i64,
    pub recipe_id: String,
    pub name: String,
    pub measure: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewIngredient {
    pub recipe_id: String,
    pub name: String,
    pub measure: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingList {
    pub id: i64,
    pub name: String,
    pub created_at: String,
    pub is_completed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingListItem {
    pub id: i64,
    pub list_id: i64,
    pub ingredient_name: String,
    pub quantity: String,
    pub unit: String,
    pub is_purchased: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewShoppingListItem {
    pub list_id: i64,
    pub ingredient_name: String,
    pub quantity: String,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealPlan {
    pub id: i64,
    pub recipe_id: String,
    pub planned_date: NaiveDate,
    pub meal_type: MealType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMealPlan {
    pub recipe_id: String,
    pub planned_date: NaiveDate,
    pub meal_type: MealType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeModification {
    pub id: i64,
    pub recipe_id: String,
    pub original_ingredient: String,
    pub substitute_ingredient: String,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRecipeModification {
    pub recipe_id: String,
    pub original_ingredient: String,
    pub substitute_ingredient: String,
    pub notes: String,
}

/// A recipe category as listed by the remote API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub image_url: Option<String>,
    pub description: String,
}

/// Recipe together with its ingredients and modifications, for display.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeDetail {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub ingredients: Vec<Ingredient>,
    pub modifications: Vec<RecipeModification>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

pub const MEAL_TYPES: &[&str] = &["breakfast", "lunch", "dinner", "snack"];

impl MealType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
            MealType::Snack => "snack",
        }
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MealType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "breakfast" => Ok(MealType::Breakfast),
            "lunch" => Ok(MealType::Lunch),
            "dinner" => Ok(MealType::Dinner),
            "snack" => Ok(MealType::Snack),
            _ => bail!(
                "Invalid meal type '{s}'. Must be one of: {}",
                MEAL_TYPES.join(", ")
            ),
        }
    }
}

/// Current time as a fixed-width RFC 3339 UTC string.
///
/// Microsecond precision with a `Z` suffix keeps every timestamp the same
/// length, so `ORDER BY created_at` sorts chronologically.
#[must_use]
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[must_use]
pub fn new_local_recipe_id() -> String {
    format!("{LOCAL_ID_PREFIX}{}", uuid::Uuid::new_v4())
}

pub fn validate_recipe(recipe: &Recipe) -> Result<()> {
    if recipe.id.trim().is_empty() {
        bail!("Recipe id must not be empty");
    }
    if recipe.name.trim().is_empty() {
        bail!("Recipe name must not be empty");
    }
    Ok(())
}

pub fn validate_list_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        bail!("Shopping list name must not be empty");
    }
    Ok(trimmed.to_string())
}
