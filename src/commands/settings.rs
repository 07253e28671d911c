use rusqlite::{Connection, OptionalExtension};
use tracing::info;

use crate::db::{Database, PRICING_CONFIG_KEY};
use crate::error::{AppError, AppResult};
use crate::models::{PriceConfig, PricingConfig, TimeSlot};

/// Reads and validates the stored pricing configuration.
pub(crate) fn load_pricing_config(conn: &Connection) -> AppResult<PricingConfig> {
    let json: String = conn
        .query_row(
            "SELECT value FROM settings WHERE key = ?1",
            [PRICING_CONFIG_KEY],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| AppError::InvalidPricing("no pricing configuration stored".to_string()))?;

    let config: PricingConfig = serde_json::from_str(&json).map_err(|e| {
        AppError::InvalidPricing(format!("stored configuration is unreadable: {}", e))
    })?;
    config.validate()?;

    Ok(config)
}

fn save_pricing_config(conn: &Connection, config: &PricingConfig) -> AppResult<()> {
    config.validate()?;
    let json = serde_json::to_string(config)?;

    conn.execute(
        "INSERT INTO settings (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP",
        rusqlite::params![PRICING_CONFIG_KEY, json],
    )?;

    Ok(())
}

pub fn get_pricing_config(db: &Database) -> AppResult<PricingConfig> {
    let conn = db.lock()?;
    load_pricing_config(&conn)
}

pub fn update_base_rates(db: &Database, base_rates: PriceConfig) -> AppResult<PricingConfig> {
    let conn = db.lock()?;

    let mut config = load_pricing_config(&conn)?;
    config.base_rates = base_rates;
    save_pricing_config(&conn, &config)?;

    info!(
        carom = base_rates.carom,
        pool = base_rates.pool,
        libre = base_rates.libre,
        "Base rates updated"
    );
    Ok(config)
}

/// Replaces the slot list. Order matters: the first matching slot wins.
pub fn update_time_slots(db: &Database, time_slots: Vec<TimeSlot>) -> AppResult<PricingConfig> {
    let conn = db.lock()?;

    let mut config = load_pricing_config(&conn)?;
    config.time_slots = time_slots;
    save_pricing_config(&conn, &config)?;

    info!(slots = config.time_slots.len(), "Time slots updated");
    Ok(config)
}

pub fn reset_pricing_config(db: &Database) -> AppResult<PricingConfig> {
    let conn = db.lock()?;

    let config = PricingConfig::default();
    save_pricing_config(&conn, &config)?;

    info!("Pricing configuration reset to defaults");
    Ok(config)
}
