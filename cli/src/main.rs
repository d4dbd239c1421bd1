mod commands;
mod config;
mod mealdb;

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::commands::{
    ImportOptions, Repo, cmd_bookmark, cmd_categories, cmd_category, cmd_delete, cmd_import,
    cmd_list, cmd_modify_add, cmd_modify_list, cmd_modify_remove, cmd_plan_add, cmd_plan_day,
    cmd_plan_range, cmd_plan_recipe, cmd_plan_remove, cmd_random, cmd_search, cmd_shop_add,
    cmd_shop_add_recipe, cmd_shop_clear, cmd_shop_complete, cmd_shop_create, cmd_shop_delete,
    cmd_shop_list, cmd_shop_remove_item, cmd_shop_show, cmd_shop_toggle, cmd_show,
};
use crate::config::Config;
use crate::mealdb::MealDbClient;
use recipebox_core::db::Database;

#[derive(Parser)]
#[command(
    name = "recipebox",
    version,
    about = "A local-first recipe organizer backed by TheMealDB",
    long_about = "Search TheMealDB, bookmark favorites, plan meals by date and build shopping lists.\n\
                  Every recipe you look at is cached locally."
)]
struct Cli {
    /// Database file (default: platform data directory)
    #[arg(long, global = true, env = "RECIPEBOX_DB")]
    db: Option<PathBuf>,
    /// TheMealDB API base URL
    #[arg(long, global = true, env = "RECIPEBOX_API_BASE")]
    api_base: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search TheMealDB by recipe name (results are saved locally)
    Search {
        /// Name or part of a name
        query: String,
        /// Search by main ingredient instead (results are not saved)
        #[arg(short, long)]
        ingredient: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Fetch and save a random recipe
    Random {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a recipe, fetching it if it is not saved yet
    Show {
        /// Recipe ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List saved recipes, newest first
    List {
        /// Only bookmarked recipes
        #[arg(short, long)]
        bookmarked: bool,
        /// Filter by name
        #[arg(short, long)]
        search: Option<String>,
        /// Filter by category
        #[arg(short, long)]
        category: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Toggle (or set) the bookmark on a saved recipe
    Bookmark {
        /// Recipe ID
        id: String,
        /// Bookmark regardless of the current state
        #[arg(long, conflicts_with = "off")]
        on: bool,
        /// Remove the bookmark regardless of the current state
        #[arg(long)]
        off: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a saved recipe with its ingredients, meal plans and modifications
    Delete {
        /// Recipe ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List TheMealDB categories
    Categories {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List TheMealDB recipes in a category
    Category {
        /// Category name (e.g. Seafood)
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Import a Cooklang (.cook) file as a local recipe
    Import {
        /// Path to the .cook file
        file: PathBuf,
        /// Recipe name (default: title metadata, then file name)
        #[arg(long)]
        name: Option<String>,
        /// Category to file the recipe under
        #[arg(long, default_value = "Miscellaneous")]
        category: String,
        /// Cuisine / area
        #[arg(long, default_value = "Unknown")]
        area: String,
        /// Parse and preview without saving
        #[arg(long)]
        dry_run: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage shopping lists
    Shop {
        #[command(subcommand)]
        command: ShopCommands,
    },
    /// Plan meals by date
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
    /// Record ingredient substitutions for a recipe
    Modify {
        #[command(subcommand)]
        command: ModifyCommands,
    },
}

#[derive(Subcommand)]
enum ShopCommands {
    /// Create a shopping list
    Create {
        /// List name
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show all shopping lists, newest first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the items on a list
    Show {
        /// List ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add an item to a list
    Add {
        /// List ID
        list_id: i64,
        /// Item name
        name: String,
        /// Quantity (e.g. "2")
        #[arg(short, long, default_value = "1")]
        quantity: String,
        /// Unit (e.g. "kg")
        #[arg(short, long, default_value = "")]
        unit: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add every ingredient of a recipe to a list
    AddRecipe {
        /// List ID
        list_id: i64,
        /// Recipe ID
        recipe_id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Toggle an item's purchased flag
    Toggle {
        /// Item ID
        item_id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Mark a list as completed
    Complete {
        /// List ID
        id: i64,
        /// Reopen the list instead
        #[arg(long)]
        undo: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove one item
    RemoveItem {
        /// Item ID
        item_id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove every item from a list
    Clear {
        /// List ID
        list_id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a list and its items
    Delete {
        /// List ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum PlanCommands {
    /// Schedule a recipe (fetched if not saved yet)
    Add {
        /// Recipe ID
        recipe_id: String,
        /// Meal type: breakfast, lunch, dinner, snack
        #[arg(short, long, default_value = "dinner")]
        meal: String,
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the plan for one day
    Day {
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show plans between two dates, inclusive
    Range {
        /// Start date (default: today)
        #[arg(long)]
        from: Option<String>,
        /// End date (default: six days after the start)
        #[arg(long)]
        to: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show every plan for a recipe
    Recipe {
        /// Recipe ID
        recipe_id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a meal plan
    Remove {
        /// Meal plan ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ModifyCommands {
    /// Record a substitution
    Add {
        /// Recipe ID
        recipe_id: String,
        /// Ingredient to replace
        original: String,
        /// Replacement ingredient
        substitute: String,
        /// Free-text note
        #[arg(short, long)]
        notes: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List substitutions for a recipe
    List {
        /// Recipe ID
        recipe_id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a substitution
    Remove {
        /// Modification ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing() {
    // Logs go to stderr so --json output on stdout stays parseable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("recipebox=warn,recipebox_core=warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

#[allow(clippy::too_many_lines)]
async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.db, cli.api_base)?;
    let db = Arc::new(Database::open(&config.db_path)?);
    tracing::debug!(db = %config.db_path.display(), api = %config.api_base, "starting");
    let repo: Repo = Repo::new(db, MealDbClient::new(&config.api_base)?);

    match cli.command {
        Commands::Search {
            query,
            ingredient,
            json,
        } => cmd_search(&repo, &query, ingredient, json).await,
        Commands::Random { json } => cmd_random(&repo, json).await,
        Commands::Show { id, json } => cmd_show(&repo, &id, json).await,
        Commands::List {
            bookmarked,
            search,
            category,
            json,
        } => cmd_list(
            &repo,
            bookmarked,
            search.as_deref(),
            category.as_deref(),
            json,
        ),
        Commands::Bookmark { id, on, off, json } => {
            let state = match (on, off) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            cmd_bookmark(&repo, &id, state, json)
        }
        Commands::Delete { id, json } => cmd_delete(&repo, &id, json),
        Commands::Categories { json } => cmd_categories(&repo, json).await,
        Commands::Category { name, json } => cmd_category(&repo, &name, json).await,
        Commands::Import {
            file,
            name,
            category,
            area,
            dry_run,
            json,
        } => cmd_import(
            &repo,
            &file,
            ImportOptions {
                name,
                category,
                area,
                dry_run,
            },
            json,
        ),
        Commands::Shop { command } => match command {
            ShopCommands::Create { name, json } => cmd_shop_create(&repo, &name, json),
            ShopCommands::List { json } => cmd_shop_list(&repo, json),
            ShopCommands::Show { id, json } => cmd_shop_show(&repo, id, json),
            ShopCommands::Add {
                list_id,
                name,
                quantity,
                unit,
                json,
            } => cmd_shop_add(&repo, list_id, &name, &quantity, &unit, json),
            ShopCommands::AddRecipe {
                list_id,
                recipe_id,
                json,
            } => cmd_shop_add_recipe(&repo, list_id, &recipe_id, json).await,
            ShopCommands::Toggle { item_id, json } => cmd_shop_toggle(&repo, item_id, json),
            ShopCommands::Complete { id, undo, json } => cmd_shop_complete(&repo, id, undo, json),
            ShopCommands::RemoveItem { item_id, json } => {
                cmd_shop_remove_item(&repo, item_id, json)
            }
            ShopCommands::Clear { list_id, json } => cmd_shop_clear(&repo, list_id, json),
            ShopCommands::Delete { id, json } => cmd_shop_delete(&repo, id, json),
        },
        Commands::Plan { command } => match command {
            PlanCommands::Add {
                recipe_id,
                meal,
                date,
                json,
            } => cmd_plan_add(&repo, &recipe_id, date, &meal, json).await,
            PlanCommands::Day { date, json } => cmd_plan_day(&repo, date, json),
            PlanCommands::Range { from, to, json } => cmd_plan_range(&repo, from, to, json),
            PlanCommands::Recipe { recipe_id, json } => cmd_plan_recipe(&repo, &recipe_id, json),
            PlanCommands::Remove { id, json } => cmd_plan_remove(&repo, id, json),
        },
        Commands::Modify { command } => match command {
            ModifyCommands::Add {
                recipe_id,
                original,
                substitute,
                notes,
                json,
            } => cmd_modify_add(
                &repo,
                &recipe_id,
                &original,
                &substitute,
                notes.as_deref(),
                json,
            ),
            ModifyCommands::List { recipe_id, json } => cmd_modify_list(&repo, &recipe_id, json),
            ModifyCommands::Remove { id, json } => cmd_modify_remove(&repo, id, json),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_nested_subcommand() {
        let cli = Cli::try_parse_from([
            "recipebox", "plan", "add", "52772", "--meal", "lunch", "--date", "2024-06-15",
        ])
        .unwrap();
        let Commands::Plan {
            command:
                PlanCommands::Add {
                    recipe_id, meal, ..
                },
        } = cli.command
        else {
            panic!("expected plan add");
        };
        assert_eq!(recipe_id, "52772");
        assert_eq!(meal, "lunch");
    }

    #[test]
    fn test_bookmark_on_and_off_conflict() {
        assert!(Cli::try_parse_from(["recipebox", "bookmark", "1", "--on", "--off"]).is_err());
    }
}
