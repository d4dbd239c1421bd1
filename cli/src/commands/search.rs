use anyhow::Result;
use tabled::{Table, Tabled, settings::Style};

use super::Repo;
use super::helpers::{print_json, print_recipe_table, resolve, truncate};

/// Search TheMealDB. Name searches are cached locally; ingredient searches
/// only return summaries.
pub(crate) async fn cmd_search(
    repo: &Repo,
    query: &str,
    by_ingredient: bool,
    json: bool,
) -> Result<()> {
    let recipes = if by_ingredient {
        resolve(repo.search_by_ingredient(query).await, json)?
    } else {
        resolve(repo.search_by_name(query).await, json)?
    };

    if json {
        return print_json(&recipes);
    }
    print_recipe_table(&recipes);
    if by_ingredient {
        eprintln!("\nUse `recipebox show <id>` to fetch and save a recipe.");
    }
    Ok(())
}

pub(crate) async fn cmd_random(repo: &Repo, json: bool) -> Result<()> {
    let recipe = resolve(repo.random_recipe().await, json)?;
    if json {
        return print_json(&recipe);
    }
    println!(
        "{} ({} | {}) id: {}",
        recipe.name, recipe.category, recipe.area, recipe.id
    );
    Ok(())
}

pub(crate) async fn cmd_categories(repo: &Repo, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct CategoryRow {
        #[tabled(rename = "Category")]
        name: String,
        #[tabled(rename = "Description")]
        description: String,
    }

    let categories = resolve(repo.categories().await, json)?;
    if json {
        return print_json(&categories);
    }

    let rows: Vec<CategoryRow> = categories
        .iter()
        .map(|c| CategoryRow {
            name: c.name.clone(),
            description: truncate(c.description.lines().next().unwrap_or_default(), 60),
        })
        .collect();
    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{table}");
    Ok(())
}

pub(crate) async fn cmd_category(repo: &Repo, category: &str, json: bool) -> Result<()> {
    let recipes = resolve(repo.recipes_in_category(category).await, json)?;
    if json {
        return print_json(&recipes);
    }
    print_recipe_table(&recipes);
    Ok(())
}
