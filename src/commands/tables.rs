use chrono::{DateTime, TimeZone};
use rusqlite::{Connection, OptionalExtension, Row};
use tracing::{info, warn};

use super::settings::load_pricing_config;
use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::models::{Bill, CheckoutSummary, CreateTable, OrderItem, Table, TableStatus, UpdateTable};
use crate::pricing::{clamp_discount, summarize_checkout};

const TABLE_COLUMNS: &str =
    "id, name, game_type, status, start_time, camera_url, camera_status, password";

fn table_from_row(row: &Row) -> rusqlite::Result<Table> {
    Ok(Table {
        id: row.get(0)?,
        name: row.get(1)?,
        game_type: row.get(2)?,
        status: row.get(3)?,
        start_time: row.get(4)?,
        camera_url: row.get(5)?,
        camera_status: row.get(6)?,
        password: row.get(7)?,
        orders: Vec::new(),
    })
}

pub(crate) fn query_orders(conn: &Connection, table_id: i64) -> AppResult<Vec<OrderItem>> {
    let mut stmt = conn.prepare(
        "SELECT menu_item_id, name, price, quantity
         FROM order_items
         WHERE table_id = ?1
         ORDER BY id",
    )?;

    let items = stmt
        .query_map([table_id], |row| {
            Ok(OrderItem {
                menu_item_id: row.get(0)?,
                name: row.get(1)?,
                price: row.get(2)?,
                quantity: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(items)
}

pub(crate) fn query_table(conn: &Connection, id: i64) -> AppResult<Table> {
    let mut table = conn
        .query_row(
            &format!("SELECT {} FROM billiard_tables WHERE id = ?1", TABLE_COLUMNS),
            [id],
            table_from_row,
        )
        .optional()?
        .ok_or_else(|| AppError::NotFound(format!("Table {}", id)))?;

    table.orders = query_orders(conn, id)?;
    Ok(table)
}

fn require_status(table: &Table, expected: TableStatus, action: &str) -> AppResult<()> {
    if table.status != expected {
        return Err(AppError::InvalidState(format!(
            "Cannot {} {}: table is {}",
            action,
            table.name,
            table.status.as_str()
        )));
    }
    Ok(())
}

fn set_status(
    conn: &Connection,
    id: i64,
    status: TableStatus,
    start_time: Option<i64>,
) -> AppResult<()> {
    conn.execute(
        "UPDATE billiard_tables SET status = ?1, start_time = ?2 WHERE id = ?3",
        rusqlite::params![status, start_time, id],
    )?;
    Ok(())
}

fn clean_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn get_tables(db: &Database) -> AppResult<Vec<Table>> {
    let conn = db.lock()?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM billiard_tables ORDER BY id",
        TABLE_COLUMNS
    ))?;

    let mut tables = stmt
        .query_map([], table_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    for table in &mut tables {
        table.orders = query_orders(&conn, table.id)?;
    }

    Ok(tables)
}

pub fn get_table(db: &Database, id: i64) -> AppResult<Table> {
    let conn = db.lock()?;
    query_table(&conn, id)
}

pub fn create_table(db: &Database, table: CreateTable) -> AppResult<Table> {
    let name = table.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Table name is required".to_string()));
    }

    let conn = db.lock()?;

    let camera_url = clean_text(table.camera_url);
    let camera_status = camera_url.as_ref().map(|_| "online".to_string());

    conn.execute(
        "INSERT INTO billiard_tables (name, game_type, status, camera_url, camera_status, password)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            name,
            table.game_type,
            TableStatus::Available,
            camera_url,
            camera_status,
            clean_text(table.password)
        ],
    )?;

    let id = conn.last_insert_rowid();
    info!(table_id = id, name, game_type = table.game_type.as_str(), "Table created");

    query_table(&conn, id)
}

pub fn update_table(db: &Database, table: UpdateTable) -> AppResult<Table> {
    let name = table.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Table name is required".to_string()));
    }

    let conn = db.lock()?;

    let camera_url = clean_text(table.camera_url);
    let camera_status = camera_url.as_ref().map(|_| "online".to_string());

    conn.execute(
        "UPDATE billiard_tables
         SET name = ?1, game_type = ?2, camera_url = ?3, camera_status = ?4, password = ?5
         WHERE id = ?6",
        rusqlite::params![
            name,
            table.game_type,
            camera_url,
            camera_status,
            clean_text(table.password),
            table.id
        ],
    )?;

    if conn.changes() == 0 {
        return Err(AppError::NotFound(format!("Table {}", table.id)));
    }

    query_table(&conn, table.id)
}

/// Occupies an available table from `now_ms` with an empty order list.
pub fn start_session(db: &Database, table_id: i64, now_ms: i64) -> AppResult<Table> {
    let conn = db.lock()?;

    let table = query_table(&conn, table_id)?;
    require_status(&table, TableStatus::Available, "start a session on")?;

    conn.execute("DELETE FROM order_items WHERE table_id = ?1", [table_id])?;
    set_status(&conn, table_id, TableStatus::Occupied, Some(now_ms))?;

    info!(table_id, start_time = now_ms, "Session started");
    query_table(&conn, table_id)
}

/// Moves a running session (start time and orders) to an available table.
/// The source table becomes available again.
pub fn move_session(db: &Database, from_table_id: i64, to_table_id: i64) -> AppResult<Table> {
    if from_table_id == to_table_id {
        return Err(AppError::Validation("Source and target table are the same".to_string()));
    }

    let mut conn = db.lock()?;

    let source = query_table(&conn, from_table_id)?;
    require_status(&source, TableStatus::Occupied, "move the session from")?;
    let start_time = source
        .start_time
        .ok_or_else(|| AppError::InvalidState(format!("{} has no running session", source.name)))?;

    let target = query_table(&conn, to_table_id)?;
    require_status(&target, TableStatus::Available, "move a session to")?;

    let tx = conn.transaction()?;
    tx.execute("DELETE FROM order_items WHERE table_id = ?1", [to_table_id])?;
    tx.execute(
        "UPDATE order_items SET table_id = ?1 WHERE table_id = ?2",
        [to_table_id, from_table_id],
    )?;
    set_status(&tx, to_table_id, TableStatus::Occupied, Some(start_time))?;
    set_status(&tx, from_table_id, TableStatus::Available, None)?;
    tx.commit()?;

    info!(from_table_id, to_table_id, "Session moved");
    query_table(&conn, to_table_id)
}

/// Takes an available table out of service, or returns it to service.
pub fn set_maintenance(db: &Database, table_id: i64, under_maintenance: bool) -> AppResult<Table> {
    let conn = db.lock()?;

    let table = query_table(&conn, table_id)?;
    if under_maintenance {
        require_status(&table, TableStatus::Available, "start maintenance on")?;
        set_status(&conn, table_id, TableStatus::Maintenance, None)?;
    } else {
        require_status(&table, TableStatus::Maintenance, "end maintenance on")?;
        set_status(&conn, table_id, TableStatus::Available, None)?;
    }

    info!(table_id, under_maintenance, "Maintenance status changed");
    query_table(&conn, table_id)
}

/// Releases a table locked after checkout.
pub fn unlock_table(db: &Database, table_id: i64) -> AppResult<Table> {
    let conn = db.lock()?;

    let table = query_table(&conn, table_id)?;
    require_status(&table, TableStatus::Locked, "unlock")?;
    set_status(&conn, table_id, TableStatus::Available, None)?;

    info!(table_id, "Table unlocked");
    query_table(&conn, table_id)
}

pub fn verify_table_password(db: &Database, table_id: i64, password: &str) -> AppResult<bool> {
    let conn = db.lock()?;

    let stored: Option<String> = conn
        .query_row(
            "SELECT password FROM billiard_tables WHERE id = ?1",
            [table_id],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| AppError::NotFound(format!("Table {}", table_id)))?;

    match stored {
        Some(p) => Ok(p == password),
        None => Ok(true), // No password set
    }
}

fn checked_discount(table_id: i64, discount_percent: f64) -> f64 {
    let clamped = clamp_discount(discount_percent);
    if clamped != discount_percent {
        warn!(table_id, requested = discount_percent, applied = clamped, "Discount clamped");
    }
    clamped
}

/// Current bill for an occupied table. The scoreboard and the management
/// view both read this, so they always agree.
pub fn preview_checkout<Tz: TimeZone>(
    db: &Database,
    table_id: i64,
    discount_percent: f64,
    now: &DateTime<Tz>,
) -> AppResult<CheckoutSummary> {
    let conn = db.lock()?;

    let pricing = load_pricing_config(&conn)?;
    let table = query_table(&conn, table_id)?;
    require_status(&table, TableStatus::Occupied, "bill")?;

    let discount_percent = checked_discount(table_id, discount_percent);
    let summary = summarize_checkout(
        &pricing,
        table.game_type,
        table.start_time,
        &table.orders,
        discount_percent,
        now,
    )?;

    Ok(summary)
}

/// Closes the session: records the bill, clears the orders and locks the table.
pub fn checkout<Tz: TimeZone>(
    db: &Database,
    table_id: i64,
    discount_percent: f64,
    now: &DateTime<Tz>,
) -> AppResult<Bill> {
    let mut conn = db.lock()?;

    let pricing = load_pricing_config(&conn)?;
    let table = query_table(&conn, table_id)?;
    require_status(&table, TableStatus::Occupied, "check out")?;

    let discount_percent = checked_discount(table_id, discount_percent);
    let summary = summarize_checkout(
        &pricing,
        table.game_type,
        table.start_time,
        &table.orders,
        discount_percent,
        now,
    )?;

    let end_time = now.timestamp_millis();
    let start_time = table.start_time.unwrap_or(end_time);

    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO bills (table_id, table_name, game_type, start_time, end_time,
                            duration_minutes, hourly_rate, session_cost, service_total,
                            discount_percent, total_amount)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        rusqlite::params![
            table.id,
            table.name,
            table.game_type,
            start_time,
            end_time,
            summary.duration_minutes,
            summary.hourly_rate,
            summary.session_cost,
            summary.service_total,
            summary.discount_percent,
            summary.total_amount
        ],
    )?;
    let bill_id = tx.last_insert_rowid();

    tx.execute("DELETE FROM order_items WHERE table_id = ?1", [table_id])?;
    set_status(&tx, table_id, TableStatus::Locked, None)?;

    let created_at: String =
        tx.query_row("SELECT created_at FROM bills WHERE id = ?1", [bill_id], |row| row.get(0))?;
    tx.commit()?;

    info!(
        table_id,
        bill_id,
        duration_minutes = summary.duration_minutes,
        session_cost = summary.session_cost,
        service_total = summary.service_total,
        discount_percent = summary.discount_percent,
        total_amount = summary.total_amount,
        "Checkout completed"
    );

    Ok(Bill {
        id: bill_id,
        table_id: table.id,
        table_name: table.name,
        game_type: table.game_type,
        start_time,
        end_time,
        duration_minutes: summary.duration_minutes,
        hourly_rate: summary.hourly_rate,
        session_cost: summary.session_cost,
        service_total: summary.service_total,
        discount_percent: summary.discount_percent,
        total_amount: summary.total_amount,
        created_at,
    })
}
