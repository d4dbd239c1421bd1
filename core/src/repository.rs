use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use thiserror::Error;
use tracing::debug;

use crate::db::Database;
use crate::live::LiveQuery;
use crate::mealdb::{self, CategoryResponse, MealDto, MealResponse};
use crate::models::{
    Category, Ingredient, MealPlan, NewIngredient, NewMealPlan, NewRecipeModification,
    NewShoppingListItem, Recipe, RecipeDetail, RecipeModification, ShoppingList, ShoppingListItem,
    validate_recipe,
};
use crate::resource::Resource;

/// Why a remote call produced no usable body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The server answered with a non-success status; holds the status text.
    #[error("{0}")]
    Status(String),
    /// The request never completed or the body could not be decoded.
    #[error("{0}")]
    Network(String),
}

/// Read-only access to TheMealDB.
///
/// The CLI implements this with reqwest; tests use in-memory mocks.
pub trait RecipeSource: Send + Sync {
    fn search_by_name(
        &self,
        query: &str,
    ) -> impl Future<Output = Result<MealResponse, FetchError>> + Send;

    fn filter_by_ingredient(
        &self,
        ingredient: &str,
    ) -> impl Future<Output = Result<MealResponse, FetchError>> + Send;

    fn random(&self) -> impl Future<Output = Result<MealResponse, FetchError>> + Send;

    fn lookup(&self, id: &str) -> impl Future<Output = Result<MealResponse, FetchError>> + Send;

    fn categories(&self) -> impl Future<Output = Result<CategoryResponse, FetchError>> + Send;

    fn filter_by_category(
        &self,
        category: &str,
    ) -> impl Future<Output = Result<MealResponse, FetchError>> + Send;
}

const NO_RECIPES: &str = "No recipes found";
const NO_INGREDIENT_MATCHES: &str = "No recipes found with this ingredient";
const NO_RANDOM_RECIPE: &str = "No random recipe available";
const RECIPE_NOT_FOUND: &str = "Recipe not found";
const NO_CATEGORIES: &str = "No categories found";
const NO_CATEGORY_MATCHES: &str = "No recipes found in this category";

/// True when a remote call's error message means the request worked but
/// nothing matched. Transport, status and storage failures return false.
#[must_use]
pub fn is_not_found(message: &str) -> bool {
    [
        NO_RECIPES,
        NO_INGREDIENT_MATCHES,
        NO_RANDOM_RECIPE,
        RECIPE_NOT_FOUND,
        NO_CATEGORIES,
        NO_CATEGORY_MATCHES,
    ]
    .contains(&message)
}

fn failure<T>(action: &str, err: FetchError) -> Resource<T> {
    debug!(action, error = %err, "remote fetch failed");
    match err {
        FetchError::Status(status) => Resource::Error(format!("Failed to {action}: {status}")),
        FetchError::Network(message) => Resource::Error(format!("Network error: {message}")),
    }
}

fn non_empty<T>(list: Option<Vec<T>>) -> Option<Vec<T>> {
    list.filter(|items| !items.is_empty())
}

pub struct RecipeRepository<S> {
    db: Arc<Database>,
    source: S,
}

impl<S: RecipeSource> RecipeRepository<S> {
    pub fn new(db: Arc<Database>, source: S) -> Self {
        Self { db, source }
    }

    #[must_use]
    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    // --- Remote operations ---

    /// Search TheMealDB by name and cache every hit with its ingredients.
    pub async fn search_by_name(&self, query: &str) -> Resource<Vec<Recipe>> {
        let meals = match self.source.search_by_name(query).await {
            Ok(response) => response.meals,
            Err(e) => return failure("search recipes", e),
        };
        let Some(meals) = non_empty(meals) else {
            return Resource::Error(NO_RECIPES.to_string());
        };
        self.cache_all(&meals)
    }

    /// Search by main ingredient. Results are partial records and are not cached.
    pub async fn search_by_ingredient(&self, ingredient: &str) -> Resource<Vec<Recipe>> {
        let meals = match self.source.filter_by_ingredient(ingredient).await {
            Ok(response) => response.meals,
            Err(e) => return failure("search by ingredient", e),
        };
        match non_empty(meals) {
            Some(meals) => Resource::Success(meals.iter().map(mealdb::to_recipe).collect()),
            None => Resource::Error(NO_INGREDIENT_MATCHES.to_string()),
        }
    }

    pub async fn random_recipe(&self) -> Resource<Recipe> {
        let meals = match self.source.random().await {
            Ok(response) => response.meals,
            Err(e) => return failure("get random recipe", e),
        };
        match meals.and_then(|m| m.into_iter().next()) {
            Some(meal) => self.cache_one(&meal),
            None => Resource::Error(NO_RANDOM_RECIPE.to_string()),
        }
    }

    pub async fn recipe_by_id(&self, id: &str) -> Resource<Recipe> {
        let meals = match self.source.lookup(id).await {
            Ok(response) => response.meals,
            Err(e) => return failure("get recipe details", e),
        };
        match meals.and_then(|m| m.into_iter().next()) {
            Some(meal) => self.cache_one(&meal),
            None => Resource::Error(RECIPE_NOT_FOUND.to_string()),
        }
    }

    pub async fn categories(&self) -> Resource<Vec<Category>> {
        let categories = match self.source.categories().await {
            Ok(response) => response.categories,
            Err(e) => return failure("load categories", e),
        };
        match non_empty(categories) {
            Some(list) => Resource::Success(list.iter().map(mealdb::to_category).collect()),
            None => Resource::Error(NO_CATEGORIES.to_string()),
        }
    }

    /// Recipes in a remote category. Partial records, not cached.
    pub async fn recipes_in_category(&self, category: &str) -> Resource<Vec<Recipe>> {
        let meals = match self.source.filter_by_category(category).await {
            Ok(response) => response.meals,
            Err(e) => return failure("load category", e),
        };
        match non_empty(meals) {
            Some(meals) => Resource::Success(meals.iter().map(mealdb::to_recipe).collect()),
            None => Resource::Error(NO_CATEGORY_MATCHES.to_string()),
        }
    }

    /// Local row first; on a miss, fetch by id (which caches it).
    pub async fn load_recipe(&self, id: &str) -> Resource<Recipe> {
        match self.db.get_recipe(id) {
            Ok(Some(recipe)) => Resource::Success(recipe),
            Ok(None) => {
                debug!(recipe_id = id, "recipe not cached, fetching");
                self.recipe_by_id(id).await
            }
            Err(e) => Resource::Error(format!("{e:#}")),
        }
    }

    fn cache_one(&self, meal: &MealDto) -> Resource<Recipe> {
        let recipe = mealdb::to_recipe(meal);
        match self.db.cache_recipe(&recipe, &mealdb::to_ingredients(meal)) {
            Ok(recipe) => Resource::Success(recipe),
            Err(e) => Resource::Error(format!("Failed to cache recipe: {e:#}")),
        }
    }

    /// Hits without an id cannot be keyed and are skipped; the rest are
    /// stored together or not at all.
    fn cache_all(&self, meals: &[MealDto]) -> Resource<Vec<Recipe>> {
        let batch: Vec<_> = meals
            .iter()
            .filter(|meal| {
                let keyed = !meal.id_meal.trim().is_empty();
                if !keyed {
                    debug!(name = %meal.str_meal, "skipping search hit without an id");
                }
                keyed
            })
            .map(|meal| (mealdb::to_recipe(meal), mealdb::to_ingredients(meal)))
            .collect();
        if batch.is_empty() {
            return Resource::Error(NO_RECIPES.to_string());
        }
        match self.db.cache_recipes(&batch) {
            Ok(recipes) => Resource::Success(recipes),
            Err(e) => Resource::Error(format!("Failed to cache recipes: {e:#}")),
        }
    }

    // --- Recipes ---

    pub fn get_recipe(&self, id: &str) -> Result<Option<Recipe>> {
        self.db.get_recipe(id)
    }

    /// Recipe with its ingredients and modifications, from the local store.
    pub fn recipe_detail(&self, id: &str) -> Result<Option<RecipeDetail>> {
        let Some(recipe) = self.db.get_recipe(id)? else {
            return Ok(None);
        };
        Ok(Some(RecipeDetail {
            ingredients: self.db.ingredients_for_recipe(id)?,
            modifications: self.db.modifications_for_recipe(id)?,
            recipe,
        }))
    }

    pub fn upsert_recipe(&self, recipe: &Recipe) -> Result<()> {
        self.db.upsert_recipe(recipe)
    }

    pub fn upsert_recipes(&self, recipes: &[Recipe]) -> Result<()> {
        self.db.upsert_recipes(recipes)
    }

    /// Store a recipe built on this device together with its ingredients.
    pub fn save_local_recipe(
        &self,
        recipe: &Recipe,
        ingredients: &[NewIngredient],
    ) -> Result<Recipe> {
        validate_recipe(recipe)?;
        self.db.cache_recipe(recipe, ingredients)
    }

    pub fn set_bookmarked(&self, id: &str, bookmarked: bool) -> Result<bool> {
        self.db.set_bookmarked(id, bookmarked)
    }

    pub fn toggle_bookmark(&self, id: &str) -> Result<Option<bool>> {
        self.db.toggle_bookmark(id)
    }

    pub fn delete_recipe(&self, id: &str) -> Result<bool> {
        self.db.delete_recipe(id)
    }

    pub fn recipe_count(&self) -> Result<i64> {
        self.db.recipe_count()
    }

    pub fn list_recipes(&self) -> Result<Vec<Recipe>> {
        self.db.list_recipes()
    }

    pub fn list_bookmarked(&self) -> Result<Vec<Recipe>> {
        self.db.list_bookmarked()
    }

    pub fn search_local(&self, query: &str) -> Result<Vec<Recipe>> {
        self.db.search_recipes(query)
    }

    pub fn cached_in_category(&self, category: &str) -> Result<Vec<Recipe>> {
        self.db.recipes_in_category(category)
    }

    pub fn live_recipes(&self) -> LiveQuery<Recipe> {
        self.db.live_recipes()
    }

    pub fn live_bookmarked(&self) -> LiveQuery<Recipe> {
        self.db.live_bookmarked()
    }

    pub fn live_search(&self, query: &str) -> LiveQuery<Recipe> {
        self.db.live_search(query)
    }

    pub fn live_category(&self, category: &str) -> LiveQuery<Recipe> {
        self.db.live_category(category)
    }

    // --- Ingredients ---

    pub fn insert_ingredients(&self, ingredients: &[NewIngredient]) -> Result<Vec<Ingredient>> {
        self.db.insert_ingredients(ingredients)
    }

    pub fn upsert_ingredient(&self, ingredient: &Ingredient) -> Result<()> {
        self.db.upsert_ingredient(ingredient)
    }

    pub fn ingredients_for_recipe(&self, recipe_id: &str) -> Result<Vec<Ingredient>> {
        self.db.ingredients_for_recipe(recipe_id)
    }

    pub fn delete_ingredient(&self, id: i64) -> Result<bool> {
        self.db.delete_ingredient(id)
    }

    pub fn delete_ingredients_for_recipe(&self, recipe_id: &str) -> Result<usize> {
        self.db.delete_ingredients_for_recipe(recipe_id)
    }

    pub fn live_ingredients(&self, recipe_id: &str) -> LiveQuery<Ingredient> {
        self.db.live_ingredients(recipe_id)
    }

    // --- Shopping lists ---

    pub fn create_shopping_list(&self, name: &str) -> Result<ShoppingList> {
        self.db.insert_shopping_list(name)
    }

    pub fn upsert_shopping_list(&self, list: &ShoppingList) -> Result<()> {
        self.db.upsert_shopping_list(list)
    }

    pub fn get_shopping_list(&self, id: i64) -> Result<Option<ShoppingList>> {
        self.db.get_shopping_list(id)
    }

    pub fn set_list_completed(&self, id: i64, completed: bool) -> Result<bool> {
        self.db.set_list_completed(id, completed)
    }

    pub fn delete_shopping_list(&self, id: i64) -> Result<bool> {
        self.db.delete_shopping_list(id)
    }

    pub fn list_shopping_lists(&self) -> Result<Vec<ShoppingList>> {
        self.db.list_shopping_lists()
    }

    pub fn add_shopping_list_item(&self, item: &NewShoppingListItem) -> Result<ShoppingListItem> {
        self.db.insert_shopping_list_item(item)
    }

    pub fn upsert_shopping_list_item(&self, item: &ShoppingListItem) -> Result<()> {
        self.db.upsert_shopping_list_item(item)
    }

    pub fn set_item_purchased(&self, id: i64, purchased: bool) -> Result<bool> {
        self.db.set_item_purchased(id, purchased)
    }

    pub fn toggle_item_purchased(&self, id: i64) -> Result<Option<bool>> {
        self.db.toggle_item_purchased(id)
    }

    pub fn delete_shopping_list_item(&self, id: i64) -> Result<bool> {
        self.db.delete_shopping_list_item(id)
    }

    pub fn clear_shopping_list_items(&self, list_id: i64) -> Result<usize> {
        self.db.clear_shopping_list_items(list_id)
    }

    pub fn shopping_list_items(&self, list_id: i64) -> Result<Vec<ShoppingListItem>> {
        self.db.shopping_list_items(list_id)
    }

    /// Copy a cached recipe's ingredients onto a list. Each item's quantity is
    /// the ingredient's measure and its unit is left empty.
    pub fn add_recipe_to_shopping_list(
        &self,
        list_id: i64,
        recipe_id: &str,
    ) -> Result<Vec<ShoppingListItem>> {
        self.db.add_recipe_to_shopping_list(list_id, recipe_id)
    }

    pub fn live_shopping_lists(&self) -> LiveQuery<ShoppingList> {
        self.db.live_shopping_lists()
    }

    pub fn live_shopping_list_items(&self, list_id: i64) -> LiveQuery<ShoppingListItem> {
        self.db.live_shopping_list_items(list_id)
    }

    // --- Meal plans ---

    pub fn plan_meal(&self, plan: &NewMealPlan) -> Result<MealPlan> {
        self.db.insert_meal_plan(plan)
    }

    pub fn upsert_meal_plan(&self, plan: &MealPlan) -> Result<()> {
        self.db.upsert_meal_plan(plan)
    }

    pub fn delete_meal_plan(&self, id: i64) -> Result<bool> {
        self.db.delete_meal_plan(id)
    }

    pub fn delete_meal_plans_for_recipe(&self, recipe_id: &str) -> Result<usize> {
        self.db.delete_meal_plans_for_recipe(recipe_id)
    }

    pub fn meal_plans(&self) -> Result<Vec<MealPlan>> {
        self.db.meal_plans()
    }

    pub fn meal_plans_in_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<MealPlan>> {
        self.db.meal_plans_in_range(start, end)
    }

    pub fn meal_plans_on(&self, date: NaiveDate) -> Result<Vec<MealPlan>> {
        self.db.meal_plans_on(date)
    }

    pub fn meal_plans_for_recipe(&self, recipe_id: &str) -> Result<Vec<MealPlan>> {
        self.db.meal_plans_for_recipe(recipe_id)
    }

    pub fn live_meal_plans(&self) -> LiveQuery<MealPlan> {
        self.db.live_meal_plans()
    }

    pub fn live_meal_plans_in_range(&self, start: NaiveDate, end: NaiveDate) -> LiveQuery<MealPlan> {
        self.db.live_meal_plans_in_range(start, end)
    }

    pub fn live_meal_plans_on(&self, date: NaiveDate) -> LiveQuery<MealPlan> {
        self.db.live_meal_plans_on(date)
    }

    pub fn live_meal_plans_for_recipe(&self, recipe_id: &str) -> LiveQuery<MealPlan> {
        self.db.live_meal_plans_for_recipe(recipe_id)
    }

    // --- Modifications ---

    pub fn add_modification(&self, m: &NewRecipeModification) -> Result<RecipeModification> {
        self.db.insert_modification(m)
    }

    pub fn upsert_modification(&self, m: &RecipeModification) -> Result<()> {
        self.db.upsert_modification(m)
    }

    pub fn delete_modification(&self, id: i64) -> Result<bool> {
        self.db.delete_modification(id)
    }

    pub fn delete_modifications_for_recipe(&self, recipe_id: &str) -> Result<usize> {
        self.db.delete_modifications_for_recipe(recipe_id)
    }

    pub fn modifications_for_recipe(&self, recipe_id: &str) -> Result<Vec<RecipeModification>> {
        self.db.modifications_for_recipe(recipe_id)
    }

    pub fn live_modifications(&self, recipe_id: &str) -> LiveQuery<RecipeModification> {
        self.db.live_modifications(recipe_id)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;
    use crate::models::MealType;
    use crate::resource::launch;

    /// Serves canned responses and counts calls.
    #[derive(Default)]
    struct MockSource {
        meals: Option<Result<MealResponse, FetchError>>,
        categories: Option<Result<CategoryResponse, FetchError>>,
        calls: Mutex<Vec<String>>,
    }

    impl MockSource {
        fn with_meals(meals: serde_json::Value) -> Self {
            Self {
                meals: Some(Ok(serde_json::from_value(meals).unwrap())),
                ..Self::default()
            }
        }

        fn failing(err: FetchError) -> Self {
            Self {
                meals: Some(Err(err.clone())),
                categories: Some(Err(err)),
                ..Self::default()
            }
        }

        fn respond(&self, call: String) -> Result<MealResponse, FetchError> {
            self.calls.lock().unwrap().push(call);
            self.meals.clone().unwrap_or_else(|| Ok(MealResponse::default()))
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl RecipeSource for MockSource {
        async fn search_by_name(&self, query: &str) -> Result<MealResponse, FetchError> {
            self.respond(format!("search:{query}"))
        }

        async fn filter_by_ingredient(&self, ingredient: &str) -> Result<MealResponse, FetchError> {
            self.respond(format!("ingredient:{ingredient}"))
        }

        async fn random(&self) -> Result<MealResponse, FetchError> {
            self.respond("random".to_string())
        }

        async fn lookup(&self, id: &str) -> Result<MealResponse, FetchError> {
            self.respond(format!("lookup:{id}"))
        }

        async fn categories(&self) -> Result<CategoryResponse, FetchError> {
            self.calls.lock().unwrap().push("categories".to_string());
            self.categories
                .clone()
                .unwrap_or_else(|| Ok(CategoryResponse::default()))
        }

        async fn filter_by_category(&self, category: &str) -> Result<MealResponse, FetchError> {
            self.respond(format!("category:{category}"))
        }
    }

    fn arrabiata() -> serde_json::Value {
        json!({
            "idMeal": "52771",
            "strMeal": "Spicy Arrabiata Penne",
            "strInstructions": "Bring a large pot of water to a boil.",
            "strMealThumb": "https://www.themealdb.com/images/media/meals/ustsqw1468250014.jpg",
            "strCategory": "Vegetarian",
            "strArea": "Italian",
            "strIngredient1": "penne rigate",
            "strMeasure1": "1 pound",
            "strIngredient2": "olive oil",
            "strMeasure2": "1/4 cup",
            "strIngredient3": "Salt",
            "strMeasure3": "",
            "strIngredient4": "Pepper",
            "strMeasure4": "1 tsp"
        })
    }

    fn kumpir() -> serde_json::Value {
        json!({
            "idMeal": "52978",
            "strMeal": "Kumpir",
            "strInstructions": "Bake the potatoes.",
            "strMealThumb": null,
            "strCategory": "Side",
            "strArea": "Turkish",
            "strIngredient1": "Potatoes",
            "strMeasure1": "2 large"
        })
    }

    fn repo(source: MockSource) -> RecipeRepository<MockSource> {
        RecipeRepository::new(Arc::new(Database::open_in_memory().unwrap()), source)
    }

    #[tokio::test]
    async fn test_search_by_name_caches_every_hit() {
        let repo = repo(MockSource::with_meals(json!({"meals": [arrabiata(), kumpir()]})));

        let Resource::Success(recipes) = repo.search_by_name("a").await else {
            panic!("expected success");
        };
        assert_eq!(recipes.len(), 2);
        for recipe in &recipes {
            let cached = repo.get_recipe(&recipe.id).unwrap().unwrap();
            assert_eq!(&cached, recipe);
        }
        assert!(recipes[1].image_url.is_none());
        assert_eq!(repo.ingredients_for_recipe("52978").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_by_id_twice_does_not_duplicate() {
        let repo = repo(MockSource::with_meals(json!({"meals": [arrabiata()]})));

        assert!(matches!(repo.recipe_by_id("52771").await, Resource::Success(_)));
        assert!(matches!(repo.recipe_by_id("52771").await, Resource::Success(_)));

        assert_eq!(repo.recipe_count().unwrap(), 1);
        assert_eq!(repo.ingredients_for_recipe("52771").unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_blank_measure_skips_pair() {
        let repo = repo(MockSource::with_meals(json!({"meals": [arrabiata()]})));
        repo.random_recipe().await.into_result().unwrap();

        let names: Vec<(String, String)> = repo
            .ingredients_for_recipe("52771")
            .unwrap()
            .into_iter()
            .map(|i| (i.name, i.measure))
            .collect();
        assert!(!names.iter().any(|(n, _)| n == "Salt"));
        assert_eq!(names[2], ("Pepper".to_string(), "1 tsp".to_string()));
    }

    #[tokio::test]
    async fn test_refetch_keeps_bookmark() {
        let repo = repo(MockSource::with_meals(json!({"meals": [arrabiata()]})));
        let first = repo.recipe_by_id("52771").await.into_result().unwrap();
        repo.set_bookmarked("52771", true).unwrap();

        let again = repo.recipe_by_id("52771").await.into_result().unwrap();
        assert!(again.is_bookmarked);
        assert_eq!(again.created_at, first.created_at);
    }

    #[tokio::test]
    async fn test_null_meals_is_error() {
        let repo = repo(MockSource::with_meals(json!({"meals": null})));

        assert_eq!(
            repo.search_by_name("zzz").await,
            Resource::Error("No recipes found".to_string())
        );
        assert_eq!(
            repo.search_by_ingredient("zzz").await,
            Resource::Error("No recipes found with this ingredient".to_string())
        );
        assert_eq!(
            repo.random_recipe().await,
            Resource::Error("No random recipe available".to_string())
        );
        assert_eq!(
            repo.recipe_by_id("0").await,
            Resource::Error("Recipe not found".to_string())
        );
        assert_eq!(
            repo.recipes_in_category("zzz").await,
            Resource::Error("No recipes found in this category".to_string())
        );
        assert_eq!(repo.recipe_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_empty_meals_is_error() {
        let repo = repo(MockSource::with_meals(json!({"meals": []})));
        assert_eq!(
            repo.search_by_name("zzz").await,
            Resource::Error("No recipes found".to_string())
        );
    }

    #[tokio::test]
    async fn test_search_by_ingredient_does_not_cache() {
        let repo = repo(MockSource::with_meals(json!({
            "meals": [{"strMeal": "Kumpir", "strMealThumb": "", "idMeal": "52978"}]
        })));

        let recipes = repo.search_by_ingredient("potatoes").await.into_result().unwrap();
        assert_eq!(recipes.len(), 1);
        assert_eq!(recipes[0].name, "Kumpir");
        assert_eq!(repo.recipe_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_status_failure_message() {
        let repo = repo(MockSource::failing(FetchError::Status(
            "503 Service Unavailable".to_string(),
        )));

        assert_eq!(
            repo.search_by_name("pie").await,
            Resource::Error("Failed to search recipes: 503 Service Unavailable".to_string())
        );
        assert_eq!(
            repo.recipe_by_id("1").await,
            Resource::Error("Failed to get recipe details: 503 Service Unavailable".to_string())
        );
        assert_eq!(
            repo.categories().await,
            Resource::Error("Failed to load categories: 503 Service Unavailable".to_string())
        );
    }

    #[tokio::test]
    async fn test_network_failure_message() {
        let repo = repo(MockSource::failing(FetchError::Network(
            "connection refused".to_string(),
        )));

        assert_eq!(
            repo.random_recipe().await,
            Resource::Error("Network error: connection refused".to_string())
        );
        assert_eq!(
            repo.search_by_ingredient("egg").await,
            Resource::Error("Network error: connection refused".to_string())
        );
    }

    #[tokio::test]
    async fn test_categories() {
        let source = MockSource {
            categories: Some(Ok(serde_json::from_value(json!({
                "categories": [
                    {"idCategory": "1", "strCategory": "Beef",
                     "strCategoryThumb": "https://www.themealdb.com/images/category/beef.png",
                     "strCategoryDescription": "Beef."},
                    {"idCategory": "2", "strCategory": "Chicken",
                     "strCategoryThumb": null, "strCategoryDescription": null}
                ]
            }))
            .unwrap())),
            ..MockSource::default()
        };
        let empty = repo(MockSource::default());
        let repo = repo(source);

        let categories = repo.categories().await.into_result().unwrap();
        assert_eq!(categories.len(), 2);
        assert_eq!(categories[1].name, "Chicken");
        assert_eq!(categories[1].description, "");

        assert_eq!(
            empty.categories().await,
            Resource::Error("No categories found".to_string())
        );
    }

    #[tokio::test]
    async fn test_load_recipe_prefers_local() {
        let repo = repo(MockSource::with_meals(json!({"meals": [arrabiata()]})));

        let fetched = repo.load_recipe("52771").await.into_result().unwrap();
        assert_eq!(repo.source.call_count(), 1);

        let local = repo.load_recipe("52771").await.into_result().unwrap();
        assert_eq!(repo.source.call_count(), 1);
        assert_eq!(local, fetched);
    }

    #[tokio::test]
    async fn test_add_recipe_to_shopping_list() {
        let repo = repo(MockSource::with_meals(json!({"meals": [arrabiata()]})));
        repo.recipe_by_id("52771").await.into_result().unwrap();
        let list = repo.create_shopping_list("Dinner party").unwrap();

        let items = repo.add_recipe_to_shopping_list(list.id, "52771").unwrap();
        let summary: Vec<(&str, &str, &str)> = items
            .iter()
            .map(|i| (i.ingredient_name.as_str(), i.quantity.as_str(), i.unit.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("penne rigate", "1 pound", ""),
                ("olive oil", "1/4 cup", ""),
                ("Pepper", "1 tsp", ""),
            ]
        );
    }

    #[tokio::test]
    async fn test_recipe_detail() {
        let repo = repo(MockSource::with_meals(json!({"meals": [arrabiata()]})));
        repo.recipe_by_id("52771").await.into_result().unwrap();
        repo.add_modification(&NewRecipeModification {
            recipe_id: "52771".to_string(),
            original_ingredient: "penne rigate".to_string(),
            substitute_ingredient: "rigatoni".to_string(),
            notes: String::new(),
        })
        .unwrap();

        let detail = repo.recipe_detail("52771").unwrap().unwrap();
        assert_eq!(detail.ingredients.len(), 3);
        assert_eq!(detail.modifications.len(), 1);
        assert!(repo.recipe_detail("missing").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_empties_live_children() {
        let repo = repo(MockSource::with_meals(json!({"meals": [arrabiata()]})));
        repo.recipe_by_id("52771").await.into_result().unwrap();
        repo.plan_meal(&NewMealPlan {
            recipe_id: "52771".to_string(),
            planned_date: NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
            meal_type: MealType::Dinner,
        })
        .unwrap();

        let mut ingredients = repo.live_ingredients("52771");
        let mut plans = repo.live_meal_plans_for_recipe("52771");
        assert_eq!(ingredients.next().await.unwrap().unwrap().len(), 3);
        assert_eq!(plans.next().await.unwrap().unwrap().len(), 1);

        repo.delete_recipe("52771").unwrap();
        assert!(ingredients.next().await.unwrap().unwrap().is_empty());
        assert!(plans.next().await.unwrap().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remote_records_are_cached_as_sent() {
        let blank_random = repo(MockSource::with_meals(json!({
            "meals": [{"idMeal": "3", "strMeal": ""}]
        })));
        let repo = repo(MockSource::with_meals(json!({
            "meals": [arrabiata(), {"idMeal": "2", "strMeal": "  "}]
        })));

        let recipes = repo.search_by_name("a").await.into_result().unwrap();
        assert_eq!(recipes.len(), 2);
        assert_eq!(recipes[1].name, "  ");
        assert_eq!(repo.recipe_count().unwrap(), 2);

        let recipe = blank_random.random_recipe().await.into_result().unwrap();
        assert_eq!(recipe.id, "3");
    }

    #[tokio::test]
    async fn test_search_skips_hits_without_id() {
        let repo = repo(MockSource::with_meals(json!({
            "meals": [{"idMeal": " ", "strMeal": "Ghost Pie"}, kumpir()]
        })));

        let recipes = repo.search_by_name("pie").await.into_result().unwrap();
        assert_eq!(recipes.len(), 1);
        assert_eq!(recipes[0].id, "52978");
        assert_eq!(repo.recipe_count().unwrap(), 1);
    }

    #[test]
    fn test_save_local_recipe_requires_name() {
        let repo = repo(MockSource::default());
        let recipe = Recipe {
            id: "local-1".to_string(),
            name: "   ".to_string(),
            instructions: String::new(),
            image_url: None,
            category: String::new(),
            area: String::new(),
            is_bookmarked: false,
            created_at: crate::models::now_timestamp(),
        };
        assert!(repo.save_local_recipe(&recipe, &[]).is_err());
        assert_eq!(repo.recipe_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_is_not_found_separates_empty_results_from_failures() {
        let empty = repo(MockSource::with_meals(json!({"meals": null})));
        for resource in [
            empty.search_by_name("zzz").await.map(|_| ()),
            empty.search_by_ingredient("zzz").await.map(|_| ()),
            empty.random_recipe().await.map(|_| ()),
            empty.recipe_by_id("0").await.map(|_| ()),
            empty.recipes_in_category("zzz").await.map(|_| ()),
            empty.categories().await.map(|_| ()),
        ] {
            let message = resource.into_result().unwrap_err();
            assert!(is_not_found(&message), "{message}");
        }

        let offline = repo(MockSource::failing(FetchError::Network(
            "connection refused".to_string(),
        )));
        let message = offline.recipe_by_id("1").await.into_result().unwrap_err();
        assert!(!is_not_found(&message));

        let broken = repo(MockSource::failing(FetchError::Status(
            "500 Internal Server Error".to_string(),
        )));
        let message = broken.search_by_name("pie").await.into_result().unwrap_err();
        assert!(!is_not_found(&message));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_launch_drives_remote_call() {
        let repo = Arc::new(repo(MockSource::with_meals(json!({"meals": [kumpir()]}))));

        let worker = Arc::clone(&repo);
        let mut rx = launch(async move { worker.random_recipe().await });
        rx.wait_for(Resource::is_terminal).await.unwrap();

        let recipe = rx.borrow().clone().into_result().unwrap();
        assert_eq!(recipe.name, "Kumpir");
        assert!(repo.get_recipe("52978").unwrap().is_some());
    }
}
