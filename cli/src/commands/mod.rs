mod helpers;
mod import;
mod modify;
mod plan;
mod recipe;
mod search;
mod shopping;

use recipebox_core::repository::RecipeRepository;

use crate::mealdb::MealDbClient;

pub(crate) type Repo = RecipeRepository<MealDbClient>;

pub(crate) use import::{ImportOptions, cmd_import};
pub(crate) use modify::{cmd_modify_add, cmd_modify_list, cmd_modify_remove};
pub(crate) use plan::{cmd_plan_add, cmd_plan_day, cmd_plan_range, cmd_plan_recipe, cmd_plan_remove};
pub(crate) use recipe::{cmd_bookmark, cmd_delete, cmd_list, cmd_show};
pub(crate) use search::{cmd_categories, cmd_category, cmd_random, cmd_search};
pub(crate) use shopping::{
    cmd_shop_add, cmd_shop_add_recipe, cmd_shop_clear, cmd_shop_complete, cmd_shop_create,
    cmd_shop_delete, cmd_shop_list, cmd_shop_remove_item, cmd_shop_show, cmd_shop_toggle,
};
