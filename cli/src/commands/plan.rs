use anyhow::{Result, bail};

use recipebox_core::models::{DATE_FORMAT, MealPlan, MealType, NewMealPlan};

use super::Repo;
use super::helpers::{not_found, parse_date, print_json, print_plan_table, resolve};

fn with_names(repo: &Repo, plans: Vec<MealPlan>) -> Result<Vec<(MealPlan, String)>> {
    plans
        .into_iter()
        .map(|p| {
            let name = repo
                .get_recipe(&p.recipe_id)?
                .map_or_else(|| p.recipe_id.clone(), |r| r.name);
            Ok((p, name))
        })
        .collect()
}

fn show_plans(repo: &Repo, plans: Vec<MealPlan>, empty: &str, json: bool) -> Result<()> {
    if json {
        return print_json(&plans);
    }
    if plans.is_empty() {
        eprintln!("{empty}");
        return Ok(());
    }
    print_plan_table(&with_names(repo, plans)?);
    Ok(())
}

pub(crate) async fn cmd_plan_add(
    repo: &Repo,
    recipe_id: &str,
    date: Option<String>,
    meal: &str,
    json: bool,
) -> Result<()> {
    let meal_type: MealType = meal.parse()?;
    let planned_date = parse_date(date)?;
    let recipe = resolve(repo.load_recipe(recipe_id).await, json)?;

    let plan = repo.plan_meal(&NewMealPlan {
        recipe_id: recipe.id,
        planned_date,
        meal_type,
    })?;
    if json {
        return print_json(&plan);
    }
    println!(
        "Planned {} for {meal_type} on {} (plan {})",
        recipe.name,
        planned_date.format(DATE_FORMAT),
        plan.id
    );
    Ok(())
}

pub(crate) fn cmd_plan_day(repo: &Repo, date: Option<String>, json: bool) -> Result<()> {
    let date = parse_date(date)?;
    let plans = repo.meal_plans_on(date)?;
    let empty = format!("Nothing planned for {}", date.format(DATE_FORMAT));
    show_plans(repo, plans, &empty, json)
}

pub(crate) fn cmd_plan_range(
    repo: &Repo,
    from: Option<String>,
    to: Option<String>,
    json: bool,
) -> Result<()> {
    let start = parse_date(from)?;
    let end = match to {
        Some(s) => parse_date(Some(s))?,
        None => start + chrono::Duration::days(6),
    };
    if end < start {
        bail!("End date must not be before start date");
    }
    let plans = repo.meal_plans_in_range(start, end)?;
    let empty = format!(
        "Nothing planned between {} and {}",
        start.format(DATE_FORMAT),
        end.format(DATE_FORMAT)
    );
    show_plans(repo, plans, &empty, json)
}

pub(crate) fn cmd_plan_recipe(repo: &Repo, recipe_id: &str, json: bool) -> Result<()> {
    if repo.get_recipe(recipe_id)?.is_none() {
        not_found(&format!("Recipe '{recipe_id}' not found"), json);
    }
    let plans = repo.meal_plans_for_recipe(recipe_id)?;
    show_plans(repo, plans, "Recipe is not planned", json)
}

pub(crate) fn cmd_plan_remove(repo: &Repo, id: i64, json: bool) -> Result<()> {
    if !repo.delete_meal_plan(id)? {
        not_found(&format!("Meal plan {id} not found"), json);
    }
    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Removed meal plan {id}");
    }
    Ok(())
}
