use anyhow::{Context, Result, anyhow};
use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use recipebox_core::models::{DATE_FORMAT, MealPlan, Recipe, ShoppingList, ShoppingListItem};
use recipebox_core::repository::is_not_found;
use recipebox_core::resource::Resource;

pub(crate) fn parse_date(date_str: Option<String>) -> Result<NaiveDate> {
    match date_str {
        None => Ok(Local::now().date_naive()),
        Some(s) => match s.as_str() {
            "today" => Ok(Local::now().date_naive()),
            "yesterday" => Ok(Local::now().date_naive() - chrono::Duration::days(1)),
            "tomorrow" => Ok(Local::now().date_naive() + chrono::Duration::days(1)),
            _ => NaiveDate::parse_from_str(&s, DATE_FORMAT).with_context(|| {
                format!("Invalid date '{s}'. Use YYYY-MM-DD or today/yesterday/tomorrow")
            }),
        },
    }
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

/// Report a missing record and exit with status 2.
pub(crate) fn not_found(message: &str, json: bool) -> ! {
    if json {
        println!("{}", json_error(message));
    } else {
        eprintln!("{message}");
    }
    process::exit(2);
}

/// Unwrap a finished remote call. An empty result exits with status 2;
/// request and storage failures are returned to the caller.
pub(crate) fn resolve<T>(resource: Resource<T>, json: bool) -> Result<T> {
    match resource.into_result() {
        Ok(data) => Ok(data),
        Err(message) if is_not_found(&message) => not_found(&message, json),
        Err(message) => Err(anyhow!(message)),
    }
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}

fn check(flag: bool) -> &'static str {
    if flag { "x" } else { "" }
}

pub(crate) fn print_recipe_table(recipes: &[Recipe]) {
    #[derive(Tabled)]
    struct RecipeRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Category")]
        category: String,
        #[tabled(rename = "Area")]
        area: String,
        #[tabled(rename = "★")]
        bookmarked: &'static str,
    }

    let rows: Vec<RecipeRow> = recipes
        .iter()
        .map(|r| RecipeRow {
            id: truncate(&r.id, 16),
            name: truncate(&r.name, 35),
            category: truncate(&r.category, 15),
            area: truncate(&r.area, 15),
            bookmarked: if r.is_bookmarked { "★" } else { "" },
        })
        .collect();

    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{table}");
}

pub(crate) fn print_list_table(lists: &[ShoppingList]) {
    #[derive(Tabled)]
    struct ListRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Created")]
        created: String,
        #[tabled(rename = "Done")]
        done: &'static str,
    }

    let rows: Vec<ListRow> = lists
        .iter()
        .map(|l| ListRow {
            id: l.id,
            name: truncate(&l.name, 30),
            created: l.created_at.chars().take(10).collect(),
            done: check(l.is_completed),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::single(0)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn print_item_table(items: &[ShoppingListItem]) {
    #[derive(Tabled)]
    struct ItemRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Item")]
        name: String,
        #[tabled(rename = "Qty")]
        quantity: String,
        #[tabled(rename = "Bought")]
        purchased: &'static str,
    }

    let rows: Vec<ItemRow> = items
        .iter()
        .map(|i| ItemRow {
            id: i.id,
            name: truncate(&i.ingredient_name, 30),
            quantity: format!("{} {}", i.quantity, i.unit).trim().to_string(),
            purchased: check(i.is_purchased),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::single(0)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

/// Meal plans alongside the name of the recipe each one points at.
pub(crate) fn print_plan_table(plans: &[(MealPlan, String)]) {
    #[derive(Tabled)]
    struct PlanRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Meal")]
        meal: String,
        #[tabled(rename = "Recipe")]
        recipe: String,
    }

    let rows: Vec<PlanRow> = plans
        .iter()
        .map(|(p, name)| PlanRow {
            id: p.id,
            date: p.planned_date.format(DATE_FORMAT).to_string(),
            meal: p.meal_type.to_string(),
            recipe: truncate(name, 35),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::single(0)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_none() {
        let today = Local::now().date_naive();
        assert_eq!(parse_date(None).unwrap(), today);
    }

    #[test]
    fn test_parse_date_keywords() {
        let today = Local::now().date_naive();
        assert_eq!(parse_date(Some("today".to_string())).unwrap(), today);
        assert_eq!(
            parse_date(Some("yesterday".to_string())).unwrap(),
            today - chrono::Duration::days(1)
        );
        assert_eq!(
            parse_date(Some("tomorrow".to_string())).unwrap(),
            today + chrono::Duration::days(1)
        );
    }

    #[test]
    fn test_parse_date_iso() {
        let date = parse_date(Some("2024-01-15".to_string())).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
    }

    #[test]
    fn test_parse_date_invalid() {
        assert!(parse_date(Some("nope".to_string())).is_err());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Lasagne", 10), "Lasagne");
        assert_eq!(truncate("Teriyaki Chicken Casserole", 10), "Teriyak...");
    }

    #[test]
    fn test_truncate_utf8() {
        assert_eq!(truncate("Crème brûlée au café", 10), "Crème b...");
        assert_eq!(truncate("Smørrebrød", 10), "Smørrebrød");
    }

    #[test]
    fn test_resolve_success() {
        let recipes = resolve(Resource::Success(vec!["Kumpir"]), false).unwrap();
        assert_eq!(recipes, ["Kumpir"]);
    }

    #[test]
    fn test_resolve_returns_request_failures() {
        let err = resolve(
            Resource::<()>::Error("Network error: connection refused".to_string()),
            true,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Network error: connection refused");

        let err = resolve(
            Resource::<()>::Error("Failed to search recipes: 503 Service Unavailable".to_string()),
            false,
        )
        .unwrap_err();
        assert!(err.to_string().starts_with("Failed to search recipes"));
    }

    #[test]
    fn test_empty_results_take_the_not_found_exit() {
        assert!(is_not_found("No recipes found"));
        assert!(is_not_found("Recipe not found"));
        assert!(!is_not_found("Network error: connection refused"));
    }

    #[test]
    fn test_json_error_escapes() {
        assert_eq!(
            json_error("No recipe \"x\""),
            r#"{"error":"No recipe \"x\""}"#
        );
    }
}
