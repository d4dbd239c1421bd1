use anyhow::Result;

use recipebox_core::models::Recipe;

use super::Repo;
use super::helpers::{not_found, print_json, print_recipe_table, resolve, truncate};

pub(crate) async fn cmd_show(repo: &Repo, id: &str, json: bool) -> Result<()> {
    // Pulls the recipe from TheMealDB if it is not cached yet.
    resolve(repo.load_recipe(id).await, json)?;
    let Some(detail) = repo.recipe_detail(id)? else {
        not_found(&format!("Recipe '{id}' not found"), json);
    };

    if json {
        return print_json(&detail);
    }

    let recipe = &detail.recipe;
    let star = if recipe.is_bookmarked { " ★" } else { "" };
    println!("=== {}{star} ===", recipe.name);
    println!("  {} | {} | id: {}", recipe.category, recipe.area, recipe.id);
    if let Some(url) = &recipe.image_url {
        println!("  {url}");
    }

    println!("\n  INGREDIENTS:");
    for ing in &detail.ingredients {
        println!("    {} - {}", ing.name, ing.measure);
    }

    if !detail.modifications.is_empty() {
        println!("\n  MODIFICATIONS:");
        for m in &detail.modifications {
            let notes = if m.notes.is_empty() {
                String::new()
            } else {
                format!(" ({})", m.notes)
            };
            println!(
                "    [{}] {} -> {}{notes}",
                m.id, m.original_ingredient, m.substitute_ingredient
            );
        }
    }

    if !recipe.instructions.is_empty() {
        println!("\n  INSTRUCTIONS:");
        for line in recipe.instructions.lines().filter(|l| !l.trim().is_empty()) {
            println!("    {}", line.trim());
        }
    }

    Ok(())
}

pub(crate) fn cmd_list(
    repo: &Repo,
    bookmarked: bool,
    search: Option<&str>,
    category: Option<&str>,
    json: bool,
) -> Result<()> {
    let recipes: Vec<Recipe> = match (search, category) {
        (Some(q), _) => repo.search_local(q)?,
        (None, Some(c)) => repo.cached_in_category(c)?,
        (None, None) if bookmarked => repo.list_bookmarked()?,
        (None, None) => repo.list_recipes()?,
    };
    let recipes: Vec<Recipe> = if bookmarked {
        recipes.into_iter().filter(|r| r.is_bookmarked).collect()
    } else {
        recipes
    };

    if recipes.is_empty() {
        if json {
            println!("[]");
        } else {
            eprintln!("No recipes found");
        }
        std::process::exit(2);
    }

    if json {
        return print_json(&recipes);
    }
    print_recipe_table(&recipes);
    Ok(())
}

pub(crate) fn cmd_bookmark(repo: &Repo, id: &str, on: Option<bool>, json: bool) -> Result<()> {
    let state = match on {
        Some(flag) => repo.set_bookmarked(id, flag)?.then_some(flag),
        None => repo.toggle_bookmark(id)?,
    };
    let Some(state) = state else {
        not_found(&format!("Recipe '{id}' not found"), json);
    };

    if json {
        println!("{}", serde_json::json!({ "id": id, "is_bookmarked": state }));
    } else if state {
        println!("Bookmarked {id}");
    } else {
        println!("Removed bookmark from {id}");
    }
    Ok(())
}

pub(crate) fn cmd_delete(repo: &Repo, id: &str, json: bool) -> Result<()> {
    let name = repo.get_recipe(id)?.map(|r| r.name);
    if !repo.delete_recipe(id)? {
        not_found(&format!("Recipe '{id}' not found"), json);
    }
    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        let name = truncate(name.as_deref().unwrap_or(id), 40);
        println!("Deleted {name} with its ingredients, meal plans and modifications");
    }
    Ok(())
}
