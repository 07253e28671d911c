use chrono::{NaiveDate, TimeZone};

use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::models::{Bill, DaySummary};

const BILL_COLUMNS: &str =
    "id, table_id, table_name, game_type, start_time, end_time, duration_minutes,
     hourly_rate, session_cost, service_total, discount_percent, total_amount, created_at";

fn bill_from_row(row: &rusqlite::Row) -> rusqlite::Result<Bill> {
    Ok(Bill {
        id: row.get(0)?,
        table_id: row.get(1)?,
        table_name: row.get(2)?,
        game_type: row.get(3)?,
        start_time: row.get(4)?,
        end_time: row.get(5)?,
        duration_minutes: row.get(6)?,
        hourly_rate: row.get(7)?,
        session_cost: row.get(8)?,
        service_total: row.get(9)?,
        discount_percent: row.get(10)?,
        total_amount: row.get(11)?,
        created_at: row.get(12)?,
    })
}

/// Most recent bills first.
pub fn get_bills(db: &Database, limit: Option<i32>) -> AppResult<Vec<Bill>> {
    let conn = db.lock()?;

    let limit = limit.unwrap_or(50).max(0);

    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM bills ORDER BY end_time DESC, id DESC LIMIT ?1",
        BILL_COLUMNS
    ))?;

    let bills = stmt
        .query_map([limit], bill_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(bills)
}

fn start_of_day_ms<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> AppResult<i64> {
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| AppError::Validation(format!("Invalid date {}", date)))?;

    tz.from_local_datetime(&midnight)
        .earliest()
        .map(|dt| dt.timestamp_millis())
        .ok_or_else(|| {
            AppError::Validation(format!("Date {} has no midnight in this time zone", date))
        })
}

/// Bills closed on `date` (a calendar day in `tz`), with their revenue.
pub fn get_day_summary<Tz: TimeZone>(
    db: &Database,
    date: NaiveDate,
    tz: &Tz,
) -> AppResult<DaySummary> {
    let next_day = date
        .succ_opt()
        .ok_or_else(|| AppError::Validation(format!("Invalid date {}", date)))?;
    let from_ms = start_of_day_ms(date, tz)?;
    let to_ms = start_of_day_ms(next_day, tz)?;

    let conn = db.lock()?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM bills
         WHERE end_time >= ?1 AND end_time < ?2
         ORDER BY end_time DESC, id DESC",
        BILL_COLUMNS
    ))?;

    let bills = stmt
        .query_map([from_ms, to_ms], bill_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    let total_revenue = bills.iter().map(|b| b.total_amount).sum();

    Ok(DaySummary {
        date: date.format("%Y-%m-%d").to_string(),
        total_revenue,
        total_bills: bills.len() as i32,
        bills,
    })
}
