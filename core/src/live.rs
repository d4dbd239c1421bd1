use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use futures::Stream;
use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};
use tracing::{debug, warn};

use crate::db::Database;
use crate::models::{
    Ingredient, MealPlan, Recipe, RecipeModification, ShoppingList, ShoppingListItem,
};

/// Tables whose changes are published on the database change bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Recipes,
    Ingredients,
    ShoppingLists,
    ShoppingListItems,
    MealPlans,
    RecipeModifications,
}

/// Every table that cascades from a recipe delete.
pub(crate) const RECIPE_CASCADE: &[Table] = &[
    Table::Recipes,
    Table::Ingredients,
    Table::MealPlans,
    Table::RecipeModifications,
];

/// Every table that cascades from a shopping list delete.
pub(crate) const LIST_CASCADE: &[Table] = &[Table::ShoppingLists, Table::ShoppingListItems];

type Snapshot<T> = Box<dyn Fn(&Database) -> Result<Vec<T>> + Send + Sync>;

/// A read that yields its current result, then a fresh result after every
/// committed write to one of the tables it depends on.
///
/// The subscription to the change bus is taken before the first snapshot, so
/// a write that commits between construction and the first `next()` is never
/// missed. Dropping the `LiveQuery` cancels it.
pub struct LiveQuery<T> {
    db: Arc<Database>,
    tables: &'static [Table],
    snapshot: Snapshot<T>,
    changes: broadcast::Receiver<Table>,
    primed: bool,
}

impl<T> LiveQuery<T> {
    pub(crate) fn new<F>(db: Arc<Database>, tables: &'static [Table], snapshot: F) -> Self
    where
        F: Fn(&Database) -> Result<Vec<T>> + Send + Sync + 'static,
    {
        let changes = db.subscribe();
        Self {
            db,
            tables,
            snapshot: Box::new(snapshot),
            changes,
            primed: false,
        }
    }

    /// Wait for the next snapshot. The first call returns immediately.
    ///
    /// Returns `None` once the change bus has shut down.
    pub async fn next(&mut self) -> Option<Result<Vec<T>>> {
        if self.primed && !self.wait_for_change().await {
            return None;
        }
        self.primed = true;
        Some((self.snapshot)(&self.db))
    }

    /// Point-in-time read of the same query, without consuming a change.
    pub fn current(&self) -> Result<Vec<T>> {
        (self.snapshot)(&self.db)
    }

    pub fn into_stream(self) -> impl Stream<Item = Result<Vec<T>>> {
        futures::stream::unfold(self, |mut live| async move {
            let item = live.next().await?;
            Some((item, live))
        })
    }

    async fn wait_for_change(&mut self) -> bool {
        loop {
            match self.changes.recv().await {
                Ok(table) if self.tables.contains(&table) => break,
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "live query lagged behind change bus, re-querying");
                    break;
                }
                Err(RecvError::Closed) => return false,
            }
        }
        // Coalesce a burst of writes into one snapshot.
        loop {
            match self.changes.try_recv() {
                Ok(_) | Err(TryRecvError::Lagged(_)) => {}
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
        debug!(tables = ?self.tables, "live query re-running");
        true
    }
}

impl Database {
    pub fn live_recipes(self: &Arc<Self>) -> LiveQuery<Recipe> {
        LiveQuery::new(Arc::clone(self), &[Table::Recipes], Database::list_recipes)
    }

    pub fn live_bookmarked(self: &Arc<Self>) -> LiveQuery<Recipe> {
        LiveQuery::new(Arc::clone(self), &[Table::Recipes], Database::list_bookmarked)
    }

    pub fn live_search(self: &Arc<Self>, query: &str) -> LiveQuery<Recipe> {
        let query = query.to_string();
        LiveQuery::new(Arc::clone(self), &[Table::Recipes], move |db| {
            db.search_recipes(&query)
        })
    }

    pub fn live_category(self: &Arc<Self>, category: &str) -> LiveQuery<Recipe> {
        let category = category.to_string();
        LiveQuery::new(Arc::clone(self), &[Table::Recipes], move |db| {
            db.recipes_in_category(&category)
        })
    }

    pub fn live_ingredients(self: &Arc<Self>, recipe_id: &str) -> LiveQuery<Ingredient> {
        let recipe_id = recipe_id.to_string();
        LiveQuery::new(Arc::clone(self), &[Table::Ingredients], move |db| {
            db.ingredients_for_recipe(&recipe_id)
        })
    }

    pub fn live_shopping_lists(self: &Arc<Self>) -> LiveQuery<ShoppingList> {
        LiveQuery::new(
            Arc::clone(self),
            &[Table::ShoppingLists],
            Database::list_shopping_lists,
        )
    }

    pub fn live_shopping_list_items(self: &Arc<Self>, list_id: i64) -> LiveQuery<ShoppingListItem> {
        LiveQuery::new(Arc::clone(self), &[Table::ShoppingListItems], move |db| {
            db.shopping_list_items(list_id)
        })
    }

    pub fn live_meal_plans(self: &Arc<Self>) -> LiveQuery<MealPlan> {
        LiveQuery::new(Arc::clone(self), &[Table::MealPlans], Database::meal_plans)
    }

    pub fn live_meal_plans_in_range(
        self: &Arc<Self>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> LiveQuery<MealPlan> {
        LiveQuery::new(Arc::clone(self), &[Table::MealPlans], move |db| {
            db.meal_plans_in_range(start, end)
        })
    }

    pub fn live_meal_plans_on(self: &Arc<Self>, date: NaiveDate) -> LiveQuery<MealPlan> {
        LiveQuery::new(Arc::clone(self), &[Table::MealPlans], move |db| {
            db.meal_plans_on(date)
        })
    }

    pub fn live_meal_plans_for_recipe(self: &Arc<Self>, recipe_id: &str) -> LiveQuery<MealPlan> {
        let recipe_id = recipe_id.to_string();
        LiveQuery::new(Arc::clone(self), &[Table::MealPlans], move |db| {
            db.meal_plans_for_recipe(&recipe_id)
        })
    }

    pub fn live_modifications(self: &Arc<Self>, recipe_id: &str) -> LiveQuery<RecipeModification> {
        let recipe_id = recipe_id.to_string();
        LiveQuery::new(Arc::clone(self), &[Table::RecipeModifications], move |db| {
            db.modifications_for_recipe(&recipe_id)
        })
    }
}
