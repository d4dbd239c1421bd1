pub mod db;
pub mod live;
pub mod mealdb;
pub mod models;
pub mod repository;
pub mod resource;

pub use db::Database;
pub use live::{LiveQuery, Table};
pub use repository::{FetchError, RecipeRepository, RecipeSource};
pub use resource::Resource;
