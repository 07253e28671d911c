use rusqlite::OptionalExtension;
use tracing::{debug, info};

use super::tables::query_table;
use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::models::{CreateMenuItem, MenuItem, Table, TableStatus};
use crate::pricing::{MAX_PRICE, MAX_QUANTITY};

pub fn get_menu(db: &Database) -> AppResult<Vec<MenuItem>> {
    let conn = db.lock()?;

    let mut stmt =
        conn.prepare("SELECT id, name, price, category FROM menu_items ORDER BY category, id")?;

    let menu = stmt
        .query_map([], |row| {
            Ok(MenuItem {
                id: row.get(0)?,
                name: row.get(1)?,
                price: row.get(2)?,
                category: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(menu)
}

pub fn create_menu_item(db: &Database, item: CreateMenuItem) -> AppResult<MenuItem> {
    let name = item.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Menu item name is required".to_string()));
    }
    if !item.price.is_finite() || item.price < 0.0 {
        return Err(AppError::Validation(format!("Invalid price: {}", item.price)));
    }
    if item.price > MAX_PRICE {
        return Err(AppError::Validation(format!(
            "Price exceeds maximum allowed ({}), got {}",
            MAX_PRICE, item.price
        )));
    }

    let conn = db.lock()?;

    conn.execute(
        "INSERT INTO menu_items (name, price, category) VALUES (?1, ?2, ?3)",
        rusqlite::params![name, item.price, item.category],
    )?;

    let id = conn.last_insert_rowid();
    info!(menu_item_id = id, name, price = item.price, "Menu item created");

    Ok(MenuItem {
        id,
        name: name.to_string(),
        price: item.price,
        category: item.category,
    })
}

/// Adds `quantity` of a menu item to an occupied table. An existing line for
/// the same item grows; otherwise a new line is added at the current menu price.
pub fn add_order_item(
    db: &Database,
    table_id: i64,
    menu_item_id: i64,
    quantity: i32,
) -> AppResult<Table> {
    if !(1..=MAX_QUANTITY).contains(&quantity) {
        return Err(AppError::Validation(format!(
            "Quantity must be between 1 and {}, got {}",
            MAX_QUANTITY, quantity
        )));
    }

    let conn = db.lock()?;

    let table = query_table(&conn, table_id)?;
    if table.status != TableStatus::Occupied {
        return Err(AppError::InvalidState(format!(
            "Cannot order for {}: no session is running",
            table.name
        )));
    }

    let (name, price): (String, f64) = conn
        .query_row(
            "SELECT name, price FROM menu_items WHERE id = ?1",
            [menu_item_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?
        .ok_or_else(|| AppError::NotFound(format!("Menu item {}", menu_item_id)))?;

    conn.execute(
        "INSERT INTO order_items (table_id, menu_item_id, name, price, quantity)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(table_id, menu_item_id) DO UPDATE SET quantity = quantity + excluded.quantity",
        rusqlite::params![table_id, menu_item_id, name, price, quantity],
    )?;

    debug!(table_id, menu_item_id, quantity, "Order item added");
    query_table(&conn, table_id)
}

/// Removes one unit of a menu item from a table; the line goes away at zero.
pub fn remove_order_item(db: &Database, table_id: i64, menu_item_id: i64) -> AppResult<Table> {
    let conn = db.lock()?;

    let table = query_table(&conn, table_id)?;
    if table.status != TableStatus::Occupied {
        return Err(AppError::InvalidState(format!(
            "Cannot change orders for {}: no session is running",
            table.name
        )));
    }

    let quantity: i32 = conn
        .query_row(
            "SELECT quantity FROM order_items WHERE table_id = ?1 AND menu_item_id = ?2",
            [table_id, menu_item_id],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| {
            AppError::NotFound(format!("Order item {} on {}", menu_item_id, table.name))
        })?;

    if quantity <= 1 {
        conn.execute(
            "DELETE FROM order_items WHERE table_id = ?1 AND menu_item_id = ?2",
            [table_id, menu_item_id],
        )?;
    } else {
        conn.execute(
            "UPDATE order_items SET quantity = quantity - 1
             WHERE table_id = ?1 AND menu_item_id = ?2",
            [table_id, menu_item_id],
        )?;
    }

    debug!(table_id, menu_item_id, "Order item removed");
    query_table(&conn, table_id)
}
