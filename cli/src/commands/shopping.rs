use anyhow::Result;

use recipebox_core::models::{NewShoppingListItem, ShoppingList};

use super::Repo;
use super::helpers::{not_found, print_item_table, print_json, print_list_table, resolve};

fn require_list(repo: &Repo, id: i64, json: bool) -> Result<ShoppingList> {
    match repo.get_shopping_list(id)? {
        Some(list) => Ok(list),
        None => not_found(&format!("Shopping list {id} not found"), json),
    }
}

pub(crate) fn cmd_shop_create(repo: &Repo, name: &str, json: bool) -> Result<()> {
    let list = repo.create_shopping_list(name)?;
    if json {
        return print_json(&list);
    }
    println!("Created shopping list: {} (id: {})", list.name, list.id);
    Ok(())
}

pub(crate) fn cmd_shop_list(repo: &Repo, json: bool) -> Result<()> {
    let lists = repo.list_shopping_lists()?;
    if json {
        return print_json(&lists);
    }
    if lists.is_empty() {
        eprintln!("No shopping lists yet. Create one with: recipebox shop create <name>");
        return Ok(());
    }
    print_list_table(&lists);
    Ok(())
}

pub(crate) fn cmd_shop_show(repo: &Repo, id: i64, json: bool) -> Result<()> {
    let list = require_list(repo, id, json)?;
    let items = repo.shopping_list_items(id)?;

    if json {
        return print_json(&serde_json::json!({ "list": list, "items": items }));
    }

    let done = if list.is_completed { " (completed)" } else { "" };
    println!("=== {}{done} ===", list.name);
    if items.is_empty() {
        println!("  (empty)");
    } else {
        let bought = items.iter().filter(|i| i.is_purchased).count();
        print_item_table(&items);
        println!("  {bought}/{} purchased", items.len());
    }
    Ok(())
}

pub(crate) fn cmd_shop_add(
    repo: &Repo,
    list_id: i64,
    name: &str,
    quantity: &str,
    unit: &str,
    json: bool,
) -> Result<()> {
    require_list(repo, list_id, json)?;
    let item = repo.add_shopping_list_item(&NewShoppingListItem {
        list_id,
        ingredient_name: name.trim().to_string(),
        quantity: quantity.trim().to_string(),
        unit: unit.trim().to_string(),
    })?;
    if json {
        return print_json(&item);
    }
    println!("Added {} to list {list_id} (item {})", item.ingredient_name, item.id);
    Ok(())
}

pub(crate) async fn cmd_shop_add_recipe(
    repo: &Repo,
    list_id: i64,
    recipe_id: &str,
    json: bool,
) -> Result<()> {
    require_list(repo, list_id, json)?;
    // The recipe has to be cached for its ingredients to exist locally.
    resolve(repo.load_recipe(recipe_id).await, json)?;
    let items = repo.add_recipe_to_shopping_list(list_id, recipe_id)?;
    if json {
        return print_json(&items);
    }
    println!("Added {} ingredients to list {list_id}", items.len());
    Ok(())
}

pub(crate) fn cmd_shop_toggle(repo: &Repo, item_id: i64, json: bool) -> Result<()> {
    let Some(purchased) = repo.toggle_item_purchased(item_id)? else {
        not_found(&format!("Shopping list item {item_id} not found"), json);
    };
    if json {
        println!(
            "{}",
            serde_json::json!({ "id": item_id, "is_purchased": purchased })
        );
    } else if purchased {
        println!("Marked item {item_id} as purchased");
    } else {
        println!("Marked item {item_id} as not purchased");
    }
    Ok(())
}

pub(crate) fn cmd_shop_complete(repo: &Repo, id: i64, undo: bool, json: bool) -> Result<()> {
    if !repo.set_list_completed(id, !undo)? {
        not_found(&format!("Shopping list {id} not found"), json);
    }
    if json {
        println!("{}", serde_json::json!({ "id": id, "is_completed": !undo }));
    } else if undo {
        println!("Reopened shopping list {id}");
    } else {
        println!("Completed shopping list {id}");
    }
    Ok(())
}

pub(crate) fn cmd_shop_remove_item(repo: &Repo, item_id: i64, json: bool) -> Result<()> {
    if !repo.delete_shopping_list_item(item_id)? {
        not_found(&format!("Shopping list item {item_id} not found"), json);
    }
    if json {
        println!("{}", serde_json::json!({ "deleted": item_id }));
    } else {
        println!("Removed item {item_id}");
    }
    Ok(())
}

pub(crate) fn cmd_shop_clear(repo: &Repo, list_id: i64, json: bool) -> Result<()> {
    require_list(repo, list_id, json)?;
    let removed = repo.clear_shopping_list_items(list_id)?;
    if json {
        println!("{}", serde_json::json!({ "list_id": list_id, "removed": removed }));
    } else {
        println!("Removed {removed} items from list {list_id}");
    }
    Ok(())
}

pub(crate) fn cmd_shop_delete(repo: &Repo, id: i64, json: bool) -> Result<()> {
    if !repo.delete_shopping_list(id)? {
        not_found(&format!("Shopping list {id} not found"), json);
    }
    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Deleted shopping list {id}");
    }
    Ok(())
}
