use anyhow::{Result, bail};

use recipebox_core::models::NewRecipeModification;

use super::Repo;
use super::helpers::{not_found, print_json};

pub(crate) fn cmd_modify_add(
    repo: &Repo,
    recipe_id: &str,
    original: &str,
    substitute: &str,
    notes: Option<&str>,
    json: bool,
) -> Result<()> {
    if original.trim().is_empty() || substitute.trim().is_empty() {
        bail!("Both the original and the substitute ingredient are required");
    }
    if repo.get_recipe(recipe_id)?.is_none() {
        not_found(&format!("Recipe '{recipe_id}' not found"), json);
    }

    let m = repo.add_modification(&NewRecipeModification {
        recipe_id: recipe_id.to_string(),
        original_ingredient: original.trim().to_string(),
        substitute_ingredient: substitute.trim().to_string(),
        notes: notes.map(str::trim).unwrap_or_default().to_string(),
    })?;
    if json {
        return print_json(&m);
    }
    println!(
        "Noted: {} -> {} (modification {})",
        m.original_ingredient, m.substitute_ingredient, m.id
    );
    Ok(())
}

pub(crate) fn cmd_modify_list(repo: &Repo, recipe_id: &str, json: bool) -> Result<()> {
    let Some(recipe) = repo.get_recipe(recipe_id)? else {
        not_found(&format!("Recipe '{recipe_id}' not found"), json);
    };
    let mods = repo.modifications_for_recipe(recipe_id)?;
    if json {
        return print_json(&mods);
    }
    if mods.is_empty() {
        eprintln!("No modifications for {}", recipe.name);
        return Ok(());
    }
    println!("=== {} ===", recipe.name);
    for m in &mods {
        let notes = if m.notes.is_empty() {
            String::new()
        } else {
            format!(" ({})", m.notes)
        };
        println!(
            "  [{}] {} -> {}{notes}",
            m.id, m.original_ingredient, m.substitute_ingredient
        );
    }
    Ok(())
}

pub(crate) fn cmd_modify_remove(repo: &Repo, id: i64, json: bool) -> Result<()> {
    if !repo.delete_modification(id)? {
        not_found(&format!("Modification {id} not found"), json);
    }
    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Removed modification {id}");
    }
    Ok(())
}
