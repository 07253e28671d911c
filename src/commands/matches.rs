use std::cmp::Ordering;
use tracing::info;

use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::models::{CreateMatchRecord, MatchRecord};

const MATCH_COLUMNS: &str =
    "id, played_at, game_type, sub_type, player1_name, player2_name, score1, score2, winner_name";

fn match_from_row(row: &rusqlite::Row) -> rusqlite::Result<MatchRecord> {
    Ok(MatchRecord {
        id: row.get(0)?,
        played_at: row.get(1)?,
        game_type: row.get(2)?,
        sub_type: row.get(3)?,
        player1_name: row.get(4)?,
        player2_name: row.get(5)?,
        score1: row.get(6)?,
        score2: row.get(7)?,
        winner_name: row.get(8)?,
    })
}

/// Stores a finished match. The higher score wins; a level score has no winner.
pub fn record_match(db: &Database, record: CreateMatchRecord) -> AppResult<MatchRecord> {
    let player1 = record.player1_name.trim();
    let player2 = record.player2_name.trim();
    if player1.is_empty() || player2.is_empty() {
        return Err(AppError::Validation("Both player names are required".to_string()));
    }
    if record.score1 < 0 || record.score2 < 0 {
        return Err(AppError::Validation("Scores cannot be negative".to_string()));
    }

    let winner_name = match record.score1.cmp(&record.score2) {
        Ordering::Greater => Some(player1),
        Ordering::Less => Some(player2),
        Ordering::Equal => None,
    };

    let conn = db.lock()?;

    conn.execute(
        "INSERT INTO match_history
             (game_type, sub_type, player1_name, player2_name, score1, score2, winner_name)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            record.game_type,
            record.sub_type,
            player1,
            player2,
            record.score1,
            record.score2,
            winner_name
        ],
    )?;

    let id = conn.last_insert_rowid();
    info!(match_id = id, winner = winner_name.unwrap_or("-"), "Match recorded");

    let recorded = conn.query_row(
        &format!("SELECT {} FROM match_history WHERE id = ?1", MATCH_COLUMNS),
        [id],
        match_from_row,
    )?;

    Ok(recorded)
}

pub fn get_match_history(db: &Database, limit: Option<i32>) -> AppResult<Vec<MatchRecord>> {
    let conn = db.lock()?;

    let limit = limit.unwrap_or(30).max(0);

    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM match_history ORDER BY id DESC LIMIT ?1",
        MATCH_COLUMNS
    ))?;

    let history = stmt
        .query_map([limit], match_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(history)
}
