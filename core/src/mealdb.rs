use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{Category, NewIngredient, Recipe, now_timestamp};

/// TheMealDB lays ingredients out as `strIngredient1..20` / `strMeasure1..20`.
pub const INGREDIENT_SLOTS: usize = 20;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MealResponse {
    pub meals: Option<Vec<MealDto>>,
}

/// One meal record as TheMealDB sends it. Filter endpoints only fill in the
/// id, name and thumbnail.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MealDto {
    pub id_meal: String,
    pub str_meal: String,
    pub str_instructions: Option<String>,
    pub str_meal_thumb: Option<String>,
    pub str_category: Option<String>,
    pub str_area: Option<String>,
    /// Remaining wire fields, including the ingredient/measure slots.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl MealDto {
    /// The 20 ingredient/measure slots in order, `None` where a slot is absent
    /// or null.
    #[must_use]
    pub fn ingredient_pairs(&self) -> Vec<(Option<&str>, Option<&str>)> {
        (1..=INGREDIENT_SLOTS)
            .map(|n| {
                (
                    self.wire_str(&format!("strIngredient{n}")),
                    self.wire_str(&format!("strMeasure{n}")),
                )
            })
            .collect()
    }

    fn wire_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CategoryResponse {
    pub categories: Option<Vec<CategoryDto>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDto {
    pub id_category: String,
    pub str_category: String,
    pub str_category_thumb: Option<String>,
    pub str_category_description: Option<String>,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[must_use]
pub fn to_recipe(dto: &MealDto) -> Recipe {
    Recipe {
        id: dto.id_meal.clone(),
        name: dto.str_meal.clone(),
        instructions: dto.str_instructions.clone().unwrap_or_default(),
        image_url: dto.str_meal_thumb.clone(),
        category: dto.str_category.clone().unwrap_or_default(),
        area: dto.str_area.clone().unwrap_or_default(),
        is_bookmarked: false,
        created_at: now_timestamp(),
    }
}

/// Ingredients in slot order. A slot only counts when both the name and the
/// measure are non-blank.
#[must_use]
pub fn to_ingredients(dto: &MealDto) -> Vec<NewIngredient> {
    dto.ingredient_pairs()
        .into_iter()
        .filter_map(|(name, measure)| {
            let name = non_blank(name)?;
            let measure = non_blank(measure)?;
            Some(NewIngredient {
                recipe_id: dto.id_meal.clone(),
                name: name.to_string(),
                measure: measure.to_string(),
            })
        })
        .collect()
}

#[must_use]
pub fn to_category(dto: &CategoryDto) -> Category {
    Category {
        id: dto.id_category.clone(),
        name: dto.str_category.clone(),
        image_url: dto.str_category_thumb.clone(),
        description: dto.str_category_description.clone().unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn teriyaki() -> MealDto {
        serde_json::from_value(json!({
            "idMeal": "52772",
            "strMeal": "Teriyaki Chicken Casserole",
            "strInstructions": "Preheat oven to 350F.",
            "strMealThumb": "https://www.themealdb.com/images/media/meals/wvpsxx1468256321.jpg",
            "strCategory": "Chicken",
            "strArea": "Japanese",
            "strTags": "Meat,Casserole",
            "strIngredient1": "soy sauce",
            "strMeasure1": "3/4 cup",
            "strIngredient2": " water ",
            "strMeasure2": " 1/2 cup ",
            "strIngredient3": "Salt",
            "strMeasure3": "",
            "strIngredient4": "Pepper",
            "strMeasure4": "1 tsp",
            "strIngredient5": "",
            "strMeasure5": "2 tbsp",
            "strIngredient6": null,
            "strMeasure6": null
        }))
        .unwrap()
    }

    #[test]
    fn test_decode_full_record() {
        let dto = teriyaki();
        assert_eq!(dto.id_meal, "52772");
        assert_eq!(dto.str_area.as_deref(), Some("Japanese"));
        assert_eq!(dto.extra.get("strTags"), Some(&json!("Meat,Casserole")));
    }

    #[test]
    fn test_ingredient_pairs_cover_all_slots() {
        let dto = teriyaki();
        let pairs = dto.ingredient_pairs();
        assert_eq!(pairs.len(), INGREDIENT_SLOTS);
        assert_eq!(pairs[0], (Some("soy sauce"), Some("3/4 cup")));
        assert_eq!(pairs[5], (None, None));
        assert_eq!(pairs[19], (None, None));
    }

    #[test]
    fn test_to_ingredients_skips_incomplete_pairs() {
        let ingredients = to_ingredients(&teriyaki());
        let pairs: Vec<(&str, &str)> = ingredients
            .iter()
            .map(|i| (i.name.as_str(), i.measure.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("soy sauce", "3/4 cup"),
                ("water", "1/2 cup"),
                ("Pepper", "1 tsp"),
            ]
        );
        assert!(ingredients.iter().all(|i| i.recipe_id == "52772"));
    }

    #[test]
    fn test_to_recipe_fields() {
        let recipe = to_recipe(&teriyaki());
        assert_eq!(recipe.id, "52772");
        assert_eq!(recipe.name, "Teriyaki Chicken Casserole");
        assert_eq!(recipe.category, "Chicken");
        assert_eq!(recipe.area, "Japanese");
        assert!(recipe.image_url.is_some());
        assert!(!recipe.is_bookmarked);
    }

    #[test]
    fn test_partial_record_from_filter_endpoint() {
        let response: MealResponse = serde_json::from_str(
            r#"{"meals":[{"strMeal":"Chicken Handi","strMealThumb":"","idMeal":"52795"}]}"#,
        )
        .unwrap();
        let dto = &response.meals.unwrap()[0];
        let recipe = to_recipe(dto);
        assert_eq!(recipe.instructions, "");
        assert_eq!(recipe.category, "");
        assert_eq!(recipe.image_url.as_deref(), Some(""));
        assert!(to_ingredients(dto).is_empty());
    }

    #[test]
    fn test_missing_thumb_stays_absent() {
        let dto: MealDto = serde_json::from_value(json!({
            "idMeal": "52978",
            "strMeal": "Kumpir",
            "strMealThumb": null
        }))
        .unwrap();
        assert!(to_recipe(&dto).image_url.is_none());
    }

    #[test]
    fn test_null_meals() {
        let response: MealResponse = serde_json::from_str(r#"{"meals":null}"#).unwrap();
        assert!(response.meals.is_none());
    }

    #[test]
    fn test_to_category() {
        let response: CategoryResponse = serde_json::from_value(json!({
            "categories": [{
                "idCategory": "1",
                "strCategory": "Beef",
                "strCategoryThumb": "https://www.themealdb.com/images/category/beef.png",
                "strCategoryDescription": "Beef is the culinary name for meat from cattle."
            }]
        }))
        .unwrap();
        let category = to_category(&response.categories.unwrap()[0]);
        assert_eq!(category.id, "1");
        assert_eq!(category.name, "Beef");
        assert!(category.description.starts_with("Beef is"));
    }
}
