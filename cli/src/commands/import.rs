use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};

use recipebox_core::models::{NewIngredient, Recipe, new_local_recipe_id, now_timestamp};

use super::Repo;
use super::helpers::print_json;

pub(crate) struct ImportOptions {
    pub name: Option<String>,
    pub category: String,
    pub area: String,
    pub dry_run: bool,
}

/// Import a Cooklang file as a local recipe with a `local-` id.
pub(crate) fn cmd_import(repo: &Repo, file: &Path, opts: ImportOptions, json: bool) -> Result<()> {
    let input = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read file: {}", file.display()))?;
    let stem = file.file_stem().and_then(|s| s.to_str());
    let (recipe, ingredients) = cooklang_to_recipe(&input, stem, &opts)?;

    if opts.dry_run {
        if json {
            return print_json(&serde_json::json!({
                "dry_run": true,
                "recipe": recipe,
                "ingredients": ingredients,
            }));
        }
        println!("Dry run, no changes made.\n");
        println!("  Name:        {}", recipe.name);
        println!("  Category:    {} | {}", recipe.category, recipe.area);
        for ing in &ingredients {
            println!("    {} - {}", ing.name, ing.measure);
        }
        return Ok(());
    }

    let stored = repo.save_local_recipe(&recipe, &ingredients)?;
    if json {
        return print_json(&repo.recipe_detail(&stored.id)?);
    }
    println!(
        "Imported recipe: {} ({} ingredients, id: {})",
        stored.name,
        ingredients.len(),
        stored.id
    );
    Ok(())
}

fn cooklang_to_recipe(
    input: &str,
    file_stem: Option<&str>,
    opts: &ImportOptions,
) -> Result<(Recipe, Vec<NewIngredient>)> {
    let (parsed, _report) = cooklang::parse(input)
        .into_result()
        .map_err(|e| anyhow!("Failed to parse Cooklang file: {e}"))?;

    let name = opts
        .name
        .clone()
        .or_else(|| parsed.metadata.title().map(String::from))
        .or_else(|| file_stem.map(String::from))
        .filter(|n| !n.trim().is_empty())
        .context("Could not determine recipe name. Use --name to specify one")?;

    let id = new_local_recipe_id();
    let converter = cooklang::Converter::default();
    let ingredients: Vec<NewIngredient> = parsed
        .group_ingredients(&converter)
        .iter()
        .map(|gi| NewIngredient {
            recipe_id: id.clone(),
            name: gi.ingredient.display_name().trim().to_string(),
            measure: gi
                .quantity
                .iter()
                .next()
                .map(format_quantity)
                .unwrap_or_default(),
        })
        .collect();

    if ingredients.is_empty() {
        bail!("No ingredients found in recipe");
    }

    let recipe = Recipe {
        id,
        name: name.trim().to_string(),
        instructions: strip_frontmatter(input).trim().to_string(),
        image_url: None,
        category: opts.category.clone(),
        area: opts.area.clone(),
        is_bookmarked: false,
        created_at: now_timestamp(),
    };
    Ok((recipe, ingredients))
}

fn format_quantity(qty: &cooklang::Quantity) -> String {
    let value = match qty.value() {
        cooklang::Value::Number(n) => format_number(n.value()),
        cooklang::Value::Range { start, end } => {
            format!("{}-{}", format_number(start.value()), format_number(end.value()))
        }
        cooklang::Value::Text(t) => t.clone(),
    };
    match qty.unit() {
        Some(unit) => format!("{value} {unit}"),
        None => value,
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 {
        format!("{n:.0}")
    } else {
        let s = format!("{n:.2}");
        s.trim_end_matches('0').to_string()
    }
}

/// Drop a leading `---` YAML block; the rest is the recipe body.
fn strip_frontmatter(input: &str) -> &str {
    let Some(rest) = input.trim_start().strip_prefix("---") else {
        return input;
    };
    match rest.find("\n---") {
        Some(end) => rest[end + 4..].trim_start_matches(['\r', '\n']),
        None => input,
    }
}
