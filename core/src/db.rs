use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result, anyhow, bail};
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tokio::sync::broadcast;
use tracing::debug;

use crate::live::{LIST_CASCADE, RECIPE_CASCADE, Table};
use crate::models::{
    DATE_FORMAT, Ingredient, MealPlan, MealType, NewIngredient, NewMealPlan,
    NewRecipeModification, NewShoppingListItem, Recipe, RecipeModification, ShoppingList,
    ShoppingListItem, now_timestamp, validate_list_name, validate_recipe,
};

const CHANGE_BUS_CAPACITY: usize = 64;

const RECIPE_COLUMNS: &str =
    "id, name, instructions, image_url, category, area, is_bookmarked, created_at";
const INGREDIENT_COLUMNS: &str = "id, recipe_id, name, measure";
const LIST_COLUMNS: &str = "id, name, created_at, is_completed";
const ITEM_COLUMNS: &str = "id, list_id, ingredient_name, quantity, unit, is_purchased";
const PLAN_COLUMNS: &str = "id, recipe_id, planned_date, meal_type";
const MODIFICATION_COLUMNS: &str =
    "id, recipe_id, original_ingredient, substitute_ingredient, notes";

/// The local store. All reads and writes go through this handle; writes are
/// published on an in-process change bus that drives [`crate::live::LiveQuery`].
pub struct Database {
    conn: Mutex<Connection>,
    changes: broadcast::Sender<Table>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let (changes, _) = broadcast::channel(CHANGE_BUS_CAPACITY);
        let db = Database {
            conn: Mutex::new(conn),
            changes,
        };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.conn()?;
        let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS recipes (
                    id TEXT PRIMARY KEY NOT NULL,
                    name TEXT NOT NULL,
                    instructions TEXT NOT NULL,
                    image_url TEXT,
                    category TEXT NOT NULL,
                    area TEXT NOT NULL,
                    is_bookmarked INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS ingredients (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    recipe_id TEXT NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                    name TEXT NOT NULL,
                    measure TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS shopping_lists (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    is_completed INTEGER NOT NULL DEFAULT 0
                );

                CREATE TABLE IF NOT EXISTS shopping_list_items (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    list_id INTEGER NOT NULL REFERENCES shopping_lists(id) ON DELETE CASCADE,
                    ingredient_name TEXT NOT NULL,
                    quantity TEXT NOT NULL,
                    unit TEXT NOT NULL,
                    is_purchased INTEGER NOT NULL DEFAULT 0
                );

                CREATE TABLE IF NOT EXISTS meal_plans (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    recipe_id TEXT NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                    planned_date TEXT NOT NULL,
                    meal_type TEXT NOT NULL
                        CHECK (meal_type IN ('breakfast', 'lunch', 'dinner', 'snack'))
                );

                CREATE TABLE IF NOT EXISTS recipe_modifications (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    recipe_id TEXT NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                    original_ingredient TEXT NOT NULL,
                    substitute_ingredient TEXT NOT NULL,
                    notes TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_recipes_created_at ON recipes(created_at);
                CREATE INDEX IF NOT EXISTS idx_ingredients_recipe ON ingredients(recipe_id);
                CREATE INDEX IF NOT EXISTS idx_items_list ON shopping_list_items(list_id);
                CREATE INDEX IF NOT EXISTS idx_meal_plans_recipe ON meal_plans(recipe_id);
                CREATE INDEX IF NOT EXISTS idx_meal_plans_date ON meal_plans(planned_date);
                CREATE INDEX IF NOT EXISTS idx_modifications_recipe ON recipe_modifications(recipe_id);

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Database connection lock poisoned"))
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<Table> {
        self.changes.subscribe()
    }

    fn notify(&self, tables: &[Table]) {
        for table in tables {
            // No subscribers is fine.
            let _ = self.changes.send(*table);
        }
    }

    fn query_all<T, P>(
        &self,
        sql: &str,
        params: P,
        map: fn(&Row) -> rusqlite::Result<T>,
    ) -> Result<Vec<T>>
    where
        P: rusqlite::Params,
    {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(sql)?;
        let rows = stmt
            .query_map(params, map)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // --- Row mapping helpers ---

    fn recipe_from_row(row: &Row) -> rusqlite::Result<Recipe> {
        Ok(Recipe {
            id: row.get(0)?,
            name: row.get(1)?,
            instructions: row.get(2)?,
            image_url: row.get(3)?,
            category: row.get(4)?,
            area: row.get(5)?,
            is_bookmarked: row.get(6)?,
            created_at: row.get(7)?,
        })
    }

    fn ingredient_from_row(row: &Row) -> rusqlite::Result<Ingredient> {
        Ok(Ingredient {
            id: row.get(0)?,
            recipe_id: row.get(1)?,
            name: row.get(2)?,
            measure: row.get(3)?,
        })
    }

    fn list_from_row(row: &Row) -> rusqlite::Result<ShoppingList> {
        Ok(ShoppingList {
            id: row.get(0)?,
            name: row.get(1)?,
            created_at: row.get(2)?,
            is_completed: row.get(3)?,
        })
    }

    fn item_from_row(row: &Row) -> rusqlite::Result<ShoppingListItem> {
        Ok(ShoppingListItem {
            id: row.get(0)?,
            list_id: row.get(1)?,
            ingredient_name: row.get(2)?,
            quantity: row.get(3)?,
            unit: row.get(4)?,
            is_purchased: row.get(5)?,
        })
    }

    fn plan_from_row(row: &Row) -> rusqlite::Result<MealPlan> {
        let date: String = row.get(2)?;
        let meal: String = row.get(3)?;
        Ok(MealPlan {
            id: row.get(0)?,
            recipe_id: row.get(1)?,
            planned_date: NaiveDate::parse_from_str(&date, DATE_FORMAT)
                .map_err(|e| conversion_error(2, e))?,
            meal_type: meal
                .parse::<MealType>()
                .map_err(|e| conversion_error(3, e))?,
        })
    }

    fn modification_from_row(row: &Row) -> rusqlite::Result<RecipeModification> {
        Ok(RecipeModification {
            id: row.get(0)?,
            recipe_id: row.get(1)?,
            original_ingredient: row.get(2)?,
            substitute_ingredient: row.get(3)?,
            notes: row.get(4)?,
        })
    }

    // --- Recipes ---

    fn write_recipe(conn: &Connection, recipe: &Recipe) -> rusqlite::Result<usize> {
        conn.execute(
            "INSERT INTO recipes (id, name, instructions, image_url, category, area, is_bookmarked, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                instructions = excluded.instructions,
                image_url = excluded.image_url,
                category = excluded.category,
                area = excluded.area,
                is_bookmarked = excluded.is_bookmarked,
                created_at = excluded.created_at",
            params![
                recipe.id,
                recipe.name,
                recipe.instructions,
                recipe.image_url,
                recipe.category,
                recipe.area,
                recipe.is_bookmarked,
                recipe.created_at,
            ],
        )
    }

    fn read_recipe(conn: &Connection, id: &str) -> rusqlite::Result<Option<Recipe>> {
        conn.query_row(
            &format!("SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = ?1"),
            params![id],
            Self::recipe_from_row,
        )
        .optional()
    }

    fn write_ingredient(conn: &Connection, ingredient: &NewIngredient) -> rusqlite::Result<Ingredient> {
        conn.execute(
            "INSERT INTO ingredients (recipe_id, name, measure) VALUES (?1, ?2, ?3)",
            params![ingredient.recipe_id, ingredient.name, ingredient.measure],
        )?;
        Ok(Ingredient {
            id: conn.last_insert_rowid(),
            recipe_id: ingredient.recipe_id.clone(),
            name: ingredient.name.clone(),
            measure: ingredient.measure.clone(),
        })
    }

    /// Insert or replace a recipe keyed by its id. Children are untouched.
    pub fn upsert_recipe(&self, recipe: &Recipe) -> Result<()> {
        validate_recipe(recipe)?;
        Self::write_recipe(&*self.conn()?, recipe)?;
        self.notify(&[Table::Recipes]);
        Ok(())
    }

    pub fn upsert_recipes(&self, recipes: &[Recipe]) -> Result<()> {
        for recipe in recipes {
            validate_recipe(recipe)?;
        }
        {
            let mut conn = self.conn()?;
            let tx = conn.transaction()?;
            for recipe in recipes {
                Self::write_recipe(&tx, recipe)?;
            }
            tx.commit()?;
        }
        self.notify(&[Table::Recipes]);
        Ok(())
    }

    /// Store a remotely fetched recipe together with its ingredients.
    ///
    /// Remote fields are overwritten; the bookmark flag and creation time of
    /// an already-cached row are kept. The recipe's ingredient set is replaced
    /// in the same transaction, so re-caching never duplicates ingredients.
    /// Returns the stored row.
    pub fn cache_recipe(&self, recipe: &Recipe, ingredients: &[NewIngredient]) -> Result<Recipe> {
        let mut stored = self.cache_recipes(&[(recipe.clone(), ingredients.to_vec())])?;
        stored
            .pop()
            .with_context(|| format!("Recipe {} was not stored", recipe.id))
    }

    /// Cache a batch of fetched recipes in one transaction; all or nothing.
    ///
    /// Remote records are stored as sent, so only the primary key is checked.
    pub fn cache_recipes(&self, batch: &[(Recipe, Vec<NewIngredient>)]) -> Result<Vec<Recipe>> {
        for (recipe, ingredients) in batch {
            if recipe.id.trim().is_empty() {
                bail!("Recipe id must not be empty");
            }
            if let Some(stray) = ingredients.iter().find(|i| i.recipe_id != recipe.id) {
                bail!(
                    "Ingredient '{}' belongs to recipe {}, not {}",
                    stray.name,
                    stray.recipe_id,
                    recipe.id
                );
            }
        }

        let stored = {
            let mut conn = self.conn()?;
            let tx = conn.transaction()?;
            let mut stored = Vec::with_capacity(batch.len());
            for (recipe, ingredients) in batch {
                tx.execute(
                    "INSERT INTO recipes (id, name, instructions, image_url, category, area, is_bookmarked, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                     ON CONFLICT(id) DO UPDATE SET
                        name = excluded.name,
                        instructions = excluded.instructions,
                        image_url = excluded.image_url,
                        category = excluded.category,
                        area = excluded.area",
                    params![
                        recipe.id,
                        recipe.name,
                        recipe.instructions,
                        recipe.image_url,
                        recipe.category,
                        recipe.area,
                        recipe.is_bookmarked,
                        recipe.created_at,
                    ],
                )?;
                tx.execute(
                    "DELETE FROM ingredients WHERE recipe_id = ?1",
                    params![recipe.id],
                )?;
                for ingredient in ingredients {
                    Self::write_ingredient(&tx, ingredient)?;
                }
                stored.push(
                    Self::read_recipe(&tx, &recipe.id)?
                        .with_context(|| format!("Recipe {} vanished while caching", recipe.id))?,
                );
            }
            tx.commit()?;
            stored
        };

        debug!(recipes = stored.len(), "cached recipes");
        self.notify(&[Table::Recipes, Table::Ingredients]);
        Ok(stored)
    }

    pub fn get_recipe(&self, id: &str) -> Result<Option<Recipe>> {
        Ok(Self::read_recipe(&*self.conn()?, id)?)
    }

    /// Returns `false` when no recipe has this id.
    pub fn set_bookmarked(&self, id: &str, bookmarked: bool) -> Result<bool> {
        let changed = self.conn()?.execute(
            "UPDATE recipes SET is_bookmarked = ?1 WHERE id = ?2",
            params![bookmarked, id],
        )?;
        if changed > 0 {
            self.notify(&[Table::Recipes]);
        }
        Ok(changed > 0)
    }

    /// Flip the bookmark flag, returning the new value (`None` if not found).
    pub fn toggle_bookmark(&self, id: &str) -> Result<Option<bool>> {
        let flipped: Option<bool> = self
            .conn()?
            .query_row(
                "UPDATE recipes SET is_bookmarked = NOT is_bookmarked WHERE id = ?1
                 RETURNING is_bookmarked",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        if flipped.is_some() {
            self.notify(&[Table::Recipes]);
        }
        Ok(flipped)
    }

    /// Delete a recipe and, by cascade, its ingredients, meal plans and
    /// modifications. Returns `false` when no recipe has this id.
    pub fn delete_recipe(&self, id: &str) -> Result<bool> {
        let deleted = self
            .conn()?
            .execute("DELETE FROM recipes WHERE id = ?1", params![id])?;
        if deleted > 0 {
            self.notify(RECIPE_CASCADE);
        }
        Ok(deleted > 0)
    }

    pub fn recipe_count(&self) -> Result<i64> {
        Ok(self
            .conn()?
            .query_row("SELECT COUNT(*) FROM recipes", [], |row| row.get(0))?)
    }

    pub fn list_recipes(&self) -> Result<Vec<Recipe>> {
        self.query_all(
            &format!(
                "SELECT {RECIPE_COLUMNS} FROM recipes ORDER BY created_at DESC, rowid DESC"
            ),
            [],
            Self::recipe_from_row,
        )
    }

    pub fn list_bookmarked(&self) -> Result<Vec<Recipe>> {
        self.query_all(
            &format!(
                "SELECT {RECIPE_COLUMNS} FROM recipes WHERE is_bookmarked = 1
                 ORDER BY created_at DESC, rowid DESC"
            ),
            [],
            Self::recipe_from_row,
        )
    }

    pub fn search_recipes(&self, query: &str) -> Result<Vec<Recipe>> {
        let escaped = query
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        let pattern = format!("%{escaped}%");
        self.query_all(
            &format!(
                "SELECT {RECIPE_COLUMNS} FROM recipes WHERE name LIKE ?1 ESCAPE '\\'
                 ORDER BY created_at DESC, rowid DESC"
            ),
            params![pattern],
            Self::recipe_from_row,
        )
    }

    pub fn recipes_in_category(&self, category: &str) -> Result<Vec<Recipe>> {
        self.query_all(
            &format!(
                "SELECT {RECIPE_COLUMNS} FROM recipes WHERE category = ?1 COLLATE NOCASE
                 ORDER BY created_at DESC, rowid DESC"
            ),
            params![category],
            Self::recipe_from_row,
        )
    }

    // --- Ingredients ---

    pub fn insert_ingredients(&self, ingredients: &[NewIngredient]) -> Result<Vec<Ingredient>> {
        let inserted = {
            let mut conn = self.conn()?;
            let tx = conn.transaction()?;
            let inserted = ingredients
                .iter()
                .map(|i| Self::write_ingredient(&tx, i))
                .collect::<rusqlite::Result<Vec<_>>>()?;
            tx.commit()?;
            inserted
        };
        self.notify(&[Table::Ingredients]);
        Ok(inserted)
    }

    pub fn upsert_ingredient(&self, ingredient: &Ingredient) -> Result<()> {
        self.conn()?.execute(
            "INSERT INTO ingredients (id, recipe_id, name, measure) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                recipe_id = excluded.recipe_id,
                name = excluded.name,
                measure = excluded.measure",
            params![
                ingredient.id,
                ingredient.recipe_id,
                ingredient.name,
                ingredient.measure
            ],
        )?;
        self.notify(&[Table::Ingredients]);
        Ok(())
    }

    pub fn ingredients_for_recipe(&self, recipe_id: &str) -> Result<Vec<Ingredient>> {
        self.query_all(
            &format!(
                "SELECT {INGREDIENT_COLUMNS} FROM ingredients WHERE recipe_id = ?1 ORDER BY id"
            ),
            params![recipe_id],
            Self::ingredient_from_row,
        )
    }

    pub fn delete_ingredient(&self, id: i64) -> Result<bool> {
        let deleted = self
            .conn()?
            .execute("DELETE FROM ingredients WHERE id = ?1", params![id])?;
        if deleted > 0 {
            self.notify(&[Table::Ingredients]);
        }
        Ok(deleted > 0)
    }

    pub fn delete_ingredients_for_recipe(&self, recipe_id: &str) -> Result<usize> {
        let deleted = self.conn()?.execute(
            "DELETE FROM ingredients WHERE recipe_id = ?1",
            params![recipe_id],
        )?;
        if deleted > 0 {
            self.notify(&[Table::Ingredients]);
        }
        Ok(deleted)
    }

    // --- Shopping lists ---

    pub fn insert_shopping_list(&self, name: &str) -> Result<ShoppingList> {
        let name = validate_list_name(name)?;
        let now = now_timestamp();
        let id = {
            let conn = self.conn()?;
            conn.execute(
                "INSERT INTO shopping_lists (name, created_at, is_completed) VALUES (?1, ?2, 0)",
                params![name, now],
            )?;
            conn.last_insert_rowid()
        };
        self.notify(&[Table::ShoppingLists]);
        Ok(ShoppingList {
            id,
            name,
            created_at: now,
            is_completed: false,
        })
    }

    pub fn upsert_shopping_list(&self, list: &ShoppingList) -> Result<()> {
        validate_list_name(&list.name)?;
        self.conn()?.execute(
            "INSERT INTO shopping_lists (id, name, created_at, is_completed) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                created_at = excluded.created_at,
                is_completed = excluded.is_completed",
            params![list.id, list.name, list.created_at, list.is_completed],
        )?;
        self.notify(&[Table::ShoppingLists]);
        Ok(())
    }

    pub fn get_shopping_list(&self, id: i64) -> Result<Option<ShoppingList>> {
        Ok(self
            .conn()?
            .query_row(
                &format!("SELECT {LIST_COLUMNS} FROM shopping_lists WHERE id = ?1"),
                params![id],
                Self::list_from_row,
            )
            .optional()?)
    }

    pub fn set_list_completed(&self, id: i64, completed: bool) -> Result<bool> {
        let changed = self.conn()?.execute(
            "UPDATE shopping_lists SET is_completed = ?1 WHERE id = ?2",
            params![completed, id],
        )?;
        if changed > 0 {
            self.notify(&[Table::ShoppingLists]);
        }
        Ok(changed > 0)
    }

    /// Delete a list and, by cascade, its items.
    pub fn delete_shopping_list(&self, id: i64) -> Result<bool> {
        let deleted = self
            .conn()?
            .execute("DELETE FROM shopping_lists WHERE id = ?1", params![id])?;
        if deleted > 0 {
            self.notify(LIST_CASCADE);
        }
        Ok(deleted > 0)
    }

    pub fn list_shopping_lists(&self) -> Result<Vec<ShoppingList>> {
        self.query_all(
            &format!("SELECT {LIST_COLUMNS} FROM shopping_lists ORDER BY created_at DESC, id DESC"),
            [],
            Self::list_from_row,
        )
    }

    // --- Shopping list items ---

    fn write_item(conn: &Connection, item: &NewShoppingListItem) -> rusqlite::Result<ShoppingListItem> {
        conn.execute(
            "INSERT INTO shopping_list_items (list_id, ingredient_name, quantity, unit, is_purchased)
             VALUES (?1, ?2, ?3, ?4, 0)",
            params![item.list_id, item.ingredient_name, item.quantity, item.unit],
        )?;
        Ok(ShoppingListItem {
            id: conn.last_insert_rowid(),
            list_id: item.list_id,
            ingredient_name: item.ingredient_name.clone(),
            quantity: item.quantity.clone(),
            unit: item.unit.clone(),
            is_purchased: false,
        })
    }

    pub fn insert_shopping_list_item(&self, item: &NewShoppingListItem) -> Result<ShoppingListItem> {
        if item.ingredient_name.trim().is_empty() {
            bail!("Shopping list item name must not be empty");
        }
        let stored = Self::write_item(&*self.conn()?, item)?;
        self.notify(&[Table::ShoppingListItems]);
        Ok(stored)
    }

    pub fn upsert_shopping_list_item(&self, item: &ShoppingListItem) -> Result<()> {
        self.conn()?.execute(
            "INSERT INTO shopping_list_items (id, list_id, ingredient_name, quantity, unit, is_purchased)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                list_id = excluded.list_id,
                ingredient_name = excluded.ingredient_name,
                quantity = excluded.quantity,
                unit = excluded.unit,
                is_purchased = excluded.is_purchased",
            params![
                item.id,
                item.list_id,
                item.ingredient_name,
                item.quantity,
                item.unit,
                item.is_purchased
            ],
        )?;
        self.notify(&[Table::ShoppingListItems]);
        Ok(())
    }

    pub fn set_item_purchased(&self, id: i64, purchased: bool) -> Result<bool> {
        let changed = self.conn()?.execute(
            "UPDATE shopping_list_items SET is_purchased = ?1 WHERE id = ?2",
            params![purchased, id],
        )?;
        if changed > 0 {
            self.notify(&[Table::ShoppingListItems]);
        }
        Ok(changed > 0)
    }

    /// Flip the purchased flag, returning the new value (`None` if not found).
    pub fn toggle_item_purchased(&self, id: i64) -> Result<Option<bool>> {
        let flipped: Option<bool> = self
            .conn()?
            .query_row(
                "UPDATE shopping_list_items SET is_purchased = NOT is_purchased WHERE id = ?1
                 RETURNING is_purchased",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        if flipped.is_some() {
            self.notify(&[Table::ShoppingListItems]);
        }
        Ok(flipped)
    }

    pub fn delete_shopping_list_item(&self, id: i64) -> Result<bool> {
        let deleted = self
            .conn()?
            .execute("DELETE FROM shopping_list_items WHERE id = ?1", params![id])?;
        if deleted > 0 {
            self.notify(&[Table::ShoppingListItems]);
        }
        Ok(deleted > 0)
    }

    pub fn clear_shopping_list_items(&self, list_id: i64) -> Result<usize> {
        let deleted = self.conn()?.execute(
            "DELETE FROM shopping_list_items WHERE list_id = ?1",
            params![list_id],
        )?;
        if deleted > 0 {
            self.notify(&[Table::ShoppingListItems]);
        }
        Ok(deleted)
    }

    pub fn shopping_list_items(&self, list_id: i64) -> Result<Vec<ShoppingListItem>> {
        self.query_all(
            &format!(
                "SELECT {ITEM_COLUMNS} FROM shopping_list_items WHERE list_id = ?1 ORDER BY id"
            ),
            params![list_id],
            Self::item_from_row,
        )
    }

    /// Copy every ingredient of a recipe onto a shopping list, using the
    /// ingredient's measure as the quantity.
    pub fn add_recipe_to_shopping_list(
        &self,
        list_id: i64,
        recipe_id: &str,
    ) -> Result<Vec<ShoppingListItem>> {
        let added = {
            let mut conn = self.conn()?;
            let tx = conn.transaction()?;
            let ingredients = {
                let mut stmt = tx.prepare_cached(&format!(
                    "SELECT {INGREDIENT_COLUMNS} FROM ingredients WHERE recipe_id = ?1 ORDER BY id"
                ))?;
                stmt.query_map(params![recipe_id], Self::ingredient_from_row)?
                    .collect::<Result<Vec<_>, _>>()?
            };
            let added = ingredients
                .iter()
                .map(|i| {
                    Self::write_item(
                        &tx,
                        &NewShoppingListItem {
                            list_id,
                            ingredient_name: i.name.clone(),
                            quantity: i.measure.clone(),
                            unit: String::new(),
                        },
                    )
                })
                .collect::<rusqlite::Result<Vec<_>>>()?;
            tx.commit()?;
            added
        };
        if !added.is_empty() {
            self.notify(&[Table::ShoppingListItems]);
        }
        Ok(added)
    }

    // --- Meal plans ---

    pub fn insert_meal_plan(&self, plan: &NewMealPlan) -> Result<MealPlan> {
        let id = {
            let conn = self.conn()?;
            conn.execute(
                "INSERT INTO meal_plans (recipe_id, planned_date, meal_type) VALUES (?1, ?2, ?3)",
                params![
                    plan.recipe_id,
                    plan.planned_date.format(DATE_FORMAT).to_string(),
                    plan.meal_type.as_str()
                ],
            )?;
            conn.last_insert_rowid()
        };
        self.notify(&[Table::MealPlans]);
        Ok(MealPlan {
            id,
            recipe_id: plan.recipe_id.clone(),
            planned_date: plan.planned_date,
            meal_type: plan.meal_type,
        })
    }

    pub fn upsert_meal_plan(&self, plan: &MealPlan) -> Result<()> {
        self.conn()?.execute(
            "INSERT INTO meal_plans (id, recipe_id, planned_date, meal_type) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                recipe_id = excluded.recipe_id,
                planned_date = excluded.planned_date,
                meal_type = excluded.meal_type",
            params![
                plan.id,
                plan.recipe_id,
                plan.planned_date.format(DATE_FORMAT).to_string(),
                plan.meal_type.as_str()
            ],
        )?;
        self.notify(&[Table::MealPlans]);
        Ok(())
    }

    pub fn delete_meal_plan(&self, id: i64) -> Result<bool> {
        let deleted = self
            .conn()?
            .execute("DELETE FROM meal_plans WHERE id = ?1", params![id])?;
        if deleted > 0 {
            self.notify(&[Table::MealPlans]);
        }
        Ok(deleted > 0)
    }

    pub fn delete_meal_plans_for_recipe(&self, recipe_id: &str) -> Result<usize> {
        let deleted = self.conn()?.execute(
            "DELETE FROM meal_plans WHERE recipe_id = ?1",
            params![recipe_id],
        )?;
        if deleted > 0 {
            self.notify(&[Table::MealPlans]);
        }
        Ok(deleted)
    }

    pub fn meal_plans(&self) -> Result<Vec<MealPlan>> {
        self.query_all(
            &format!("SELECT {PLAN_COLUMNS} FROM meal_plans ORDER BY planned_date ASC, id ASC"),
            [],
            Self::plan_from_row,
        )
    }

    /// Plans between `start` and `end`, both inclusive.
    pub fn meal_plans_in_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<MealPlan>> {
        self.query_all(
            &format!(
                "SELECT {PLAN_COLUMNS} FROM meal_plans WHERE planned_date BETWEEN ?1 AND ?2
                 ORDER BY planned_date ASC, id ASC"
            ),
            params![
                start.format(DATE_FORMAT).to_string(),
                end.format(DATE_FORMAT).to_string()
            ],
            Self::plan_from_row,
        )
    }

    pub fn meal_plans_on(&self, date: NaiveDate) -> Result<Vec<MealPlan>> {
        self.query_all(
            &format!(
                "SELECT {PLAN_COLUMNS} FROM meal_plans WHERE planned_date = ?1
                 ORDER BY meal_type ASC, id ASC"
            ),
            params![date.format(DATE_FORMAT).to_string()],
            Self::plan_from_row,
        )
    }

    pub fn meal_plans_for_recipe(&self, recipe_id: &str) -> Result<Vec<MealPlan>> {
        self.query_all(
            &format!(
                "SELECT {PLAN_COLUMNS} FROM meal_plans WHERE recipe_id = ?1
                 ORDER BY planned_date ASC, id ASC"
            ),
            params![recipe_id],
            Self::plan_from_row,
        )
    }

    // --- Recipe modifications ---

    pub fn insert_modification(&self, m: &NewRecipeModification) -> Result<RecipeModification> {
        let id = {
            let conn = self.conn()?;
            conn.execute(
                "INSERT INTO recipe_modifications (recipe_id, original_ingredient, substitute_ingredient, notes)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    m.recipe_id,
                    m.original_ingredient,
                    m.substitute_ingredient,
                    m.notes
                ],
            )?;
            conn.last_insert_rowid()
        };
        self.notify(&[Table::RecipeModifications]);
        Ok(RecipeModification {
            id,
            recipe_id: m.recipe_id.clone(),
            original_ingredient: m.original_ingredient.clone(),
            substitute_ingredient: m.substitute_ingredient.clone(),
            notes: m.notes.clone(),
        })
    }

    pub fn upsert_modification(&self, m: &RecipeModification) -> Result<()> {
        self.conn()?.execute(
            "INSERT INTO recipe_modifications (id, recipe_id, original_ingredient, substitute_ingredient, notes)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                recipe_id = excluded.recipe_id,
                original_ingredient = excluded.original_ingredient,
                substitute_ingredient = excluded.substitute_ingredient,
                notes = excluded.notes",
            params![
                m.id,
                m.recipe_id,
                m.original_ingredient,
                m.substitute_ingredient,
                m.notes
            ],
        )?;
        self.notify(&[Table::RecipeModifications]);
        Ok(())
    }

    pub fn delete_modification(&self, id: i64) -> Result<bool> {
        let deleted = self
            .conn()?
            .execute("DELETE FROM recipe_modifications WHERE id = ?1", params![id])?;
        if deleted > 0 {
            self.notify(&[Table::RecipeModifications]);
        }
        Ok(deleted > 0)
    }

    pub fn delete_modifications_for_recipe(&self, recipe_id: &str) -> Result<usize> {
        let deleted = self.conn()?.execute(
            "DELETE FROM recipe_modifications WHERE recipe_id = ?1",
            params![recipe_id],
        )?;
        if deleted > 0 {
            self.notify(&[Table::RecipeModifications]);
        }
        Ok(deleted)
    }

    pub fn modifications_for_recipe(&self, recipe_id: &str) -> Result<Vec<RecipeModification>> {
        self.query_all(
            &format!(
                "SELECT {MODIFICATION_COLUMNS} FROM recipe_modifications WHERE recipe_id = ?1 ORDER BY id"
            ),
            params![recipe_id],
            Self::modification_from_row,
        )
    }
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
{
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, err.into())
}
