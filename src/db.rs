use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::error::{AppError, AppResult};
use crate::models::{GameType, MenuCategory, PricingConfig, TableStatus};

pub const DATABASE_FILE: &str = "billiard_club.db";
pub const PRICING_CONFIG_KEY: &str = "pricing_config";

pub struct Database {
    pub conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> AppResult<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> AppResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let db = Database {
            conn: Mutex::new(conn),
        };
        db.initialize()?;
        Ok(db)
    }

    pub fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| AppError::LockPoisoned)
    }

    pub fn initialize(&self) -> AppResult<()> {
        let conn = self.lock()?;

        conn.execute_batch(
            "
            -- Key/value settings (pricing configuration lives here as JSON)
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            -- Billiard tables and their current session
            CREATE TABLE IF NOT EXISTS billiard_tables (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                game_type TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'AVAILABLE',
                start_time INTEGER,
                camera_url TEXT,
                camera_status TEXT,
                password TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            -- Menu
            CREATE TABLE IF NOT EXISTS menu_items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                price REAL NOT NULL,
                category TEXT NOT NULL DEFAULT 'other'
            );

            -- Lines ordered by the current session of a table
            CREATE TABLE IF NOT EXISTS order_items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                table_id INTEGER NOT NULL,
                menu_item_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                price REAL NOT NULL,
                quantity INTEGER NOT NULL CHECK (quantity > 0),
                UNIQUE (table_id, menu_item_id),
                FOREIGN KEY (table_id) REFERENCES billiard_tables(id),
                FOREIGN KEY (menu_item_id) REFERENCES menu_items(id)
            );

            -- Closed sessions
            CREATE TABLE IF NOT EXISTS bills (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                table_id INTEGER NOT NULL,
                table_name TEXT NOT NULL,
                game_type TEXT NOT NULL,
                start_time INTEGER NOT NULL,
                end_time INTEGER NOT NULL,
                duration_minutes INTEGER NOT NULL,
                hourly_rate REAL NOT NULL,
                session_cost REAL NOT NULL,
                service_total REAL NOT NULL,
                discount_percent REAL NOT NULL DEFAULT 0,
                total_amount REAL NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (table_id) REFERENCES billiard_tables(id)
            );

            -- Finished matches
            CREATE TABLE IF NOT EXISTS match_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                played_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                game_type TEXT NOT NULL,
                sub_type TEXT,
                player1_name TEXT NOT NULL,
                player2_name TEXT NOT NULL,
                score1 INTEGER NOT NULL,
                score2 INTEGER NOT NULL,
                winner_name TEXT
            );
            ",
        )?;

        Self::seed_defaults(&conn)?;

        Ok(())
    }

    fn seed_defaults(conn: &Connection) -> AppResult<()> {
        let pricing: Option<String> = conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                [PRICING_CONFIG_KEY],
                |row| row.get(0),
            )
            .optional()?;
        if pricing.is_none() {
            let json = serde_json::to_string(&PricingConfig::default())?;
            conn.execute(
                "INSERT INTO settings (key, value) VALUES (?1, ?2)",
                rusqlite::params![PRICING_CONFIG_KEY, json],
            )?;
        }

        let menu_count: i64 =
            conn.query_row("SELECT COUNT(*) FROM menu_items", [], |row| row.get(0))?;
        if menu_count == 0 {
            let menu = [
                ("Black coffee", 20000.0, MenuCategory::Drink),
                ("Milk coffee", 25000.0, MenuCategory::Drink),
                ("Mineral water", 10000.0, MenuCategory::Drink),
                ("Strawberry Sting", 15000.0, MenuCategory::Drink),
                ("Red Bull", 20000.0, MenuCategory::Drink),
                ("Iced tea", 5000.0, MenuCategory::Drink),
                ("Egg noodles", 30000.0, MenuCategory::Food),
                ("Beef noodles", 40000.0, MenuCategory::Food),
                ("Fried rice", 45000.0, MenuCategory::Food),
                ("Cigarettes (pack)", 35000.0, MenuCategory::Other),
            ];
            for (name, price, category) in menu {
                conn.execute(
                    "INSERT INTO menu_items (name, price, category) VALUES (?1, ?2, ?3)",
                    rusqlite::params![name, price, category],
                )?;
            }
        }

        let table_count: i64 =
            conn.query_row("SELECT COUNT(*) FROM billiard_tables", [], |row| row.get(0))?;
        if table_count == 0 {
            let tables = [
                ("Table 01", GameType::Carom),
                ("Table 02", GameType::Carom),
                ("Table 03", GameType::Pool),
                ("Table 04", GameType::Pool),
                ("Table 05", GameType::Libre),
                ("VIP Table", GameType::Carom),
            ];
            for (name, game_type) in tables {
                conn.execute(
                    "INSERT INTO billiard_tables (name, game_type, status) VALUES (?1, ?2, ?3)",
                    rusqlite::params![name, game_type, TableStatus::Available],
                )?;
            }
        }

        Ok(())
    }
}

impl ToSql for GameType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for GameType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        GameType::parse(text)
            .ok_or_else(|| FromSqlError::Other(format!("unknown game type '{}'", text).into()))
    }
}

impl ToSql for TableStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TableStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        TableStatus::parse(text)
            .ok_or_else(|| FromSqlError::Other(format!("unknown table status '{}'", text).into()))
    }
}

impl ToSql for MenuCategory {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for MenuCategory {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        MenuCategory::parse(text)
            .ok_or_else(|| FromSqlError::Other(format!("unknown menu category '{}'", text).into()))
    }
}
