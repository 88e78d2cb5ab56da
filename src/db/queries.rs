// Database queries: CRUD operations for all tables.
//
// Every database interaction goes through this module. This keeps SQL
// contained in one place and gives the rest of the app clean Rust interfaces.

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};

use super::models::{AnalysisRecord, NewAnalysis, NotificationRecord, ReviewStatus, UserRecord};

// --- Users ---

/// Insert or update a user's contact details.
pub fn upsert_user(conn: &Connection, user: &UserRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO users (id, email, phone, display_name)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(id) DO UPDATE SET
            email = ?2,
            phone = ?3,
            display_name = ?4",
        params![user.id, user.email, user.phone, user.display_name],
    )?;
    Ok(())
}

/// Load one user by id.
pub fn get_user(conn: &Connection, user_id: &str) -> Result<Option<UserRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, email, phone, display_name, created_at FROM users WHERE id = ?1",
    )?;
    let user = stmt
        .query_row(params![user_id], |row| {
            Ok(UserRecord {
                id: row.get(0)?,
                email: row.get(1)?,
                phone: row.get(2)?,
                display_name: row.get(3)?,
                created_at: row.get(4)?,
            })
        })
        .optional()?;
    Ok(user)
}

/// Count registered users.
pub fn user_count(conn: &Connection) -> Result<i64> {
    let count = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
    Ok(count)
}

// --- Analyses ---

/// Hex sha256 of a stored result record.
pub fn content_hash(result_json: &str) -> String {
    hex::encode(Sha256::digest(result_json.as_bytes()))
}

/// Store a detector result and return its row id. New rows start `pending`.
pub fn insert_analysis(conn: &Connection, analysis: &NewAnalysis) -> Result<i64> {
    conn.execute(
        "INSERT INTO analyses (user_id, kind, subject, flagged, confidence, result_json, content_hash)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            analysis.user_id,
            analysis.kind.as_str(),
            analysis.subject,
            analysis.flagged as i32,
            analysis.confidence,
            analysis.result_json,
            content_hash(&analysis.result_json),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Most recent analyses first.
pub fn get_recent_analyses(conn: &Connection, limit: u32) -> Result<Vec<AnalysisRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, kind, subject, flagged, confidence, result_json,
                status, content_hash, created_at
         FROM analyses
         ORDER BY created_at DESC, id DESC
         LIMIT ?1",
    )?;

    let rows = stmt.query_map(params![limit], |row| {
        let result_json: String = row.get(6)?;
        Ok(AnalysisRecord {
            id: row.get(0)?,
            user_id: row.get(1)?,
            kind: row.get(2)?,
            subject: row.get(3)?,
            flagged: row.get::<_, i32>(4)? != 0,
            confidence: row.get(5)?,
            // Stored by us, so it parses; fall back to the raw string just in case
            result: serde_json::from_str(&result_json)
                .unwrap_or(serde_json::Value::String(result_json)),
            status: row.get(7)?,
            content_hash: row.get(8)?,
            created_at: row.get(9)?,
        })
    })?;

    let mut analyses = Vec::new();
    for row in rows {
        analyses.push(row?);
    }
    Ok(analyses)
}

/// (total, flagged) analysis counts.
pub fn analysis_counts(conn: &Connection) -> Result<(i64, i64)> {
    let counts = conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(flagged), 0) FROM analyses",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok(counts)
}

/// Move an analysis to a new review status. False when no such row exists.
pub fn update_analysis_status(conn: &Connection, id: i64, status: ReviewStatus) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE analyses SET status = ?2 WHERE id = ?1",
        params![id, status.as_str()],
    )?;
    Ok(changed > 0)
}

/// Flagged analyses still waiting for review.
pub fn pending_flag_count(conn: &Connection) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM analyses WHERE flagged = 1 AND status = 'pending'",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

// --- Notifications ---

/// Record a dispatch outcome and return its row id.
pub fn insert_notification(
    conn: &Connection,
    user_id: &str,
    kind: &str,
    channels_json: &str,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO notifications (user_id, kind, channels_json) VALUES (?1, ?2, ?3)",
        params![user_id, kind, channels_json],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Most recent dispatch outcomes first.
pub fn get_recent_notifications(conn: &Connection, limit: u32) -> Result<Vec<NotificationRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, kind, channels_json, created_at
         FROM notifications
         ORDER BY created_at DESC, id DESC
         LIMIT ?1",
    )?;

    let rows = stmt.query_map(params![limit], |row| {
        let channels_json: String = row.get(3)?;
        Ok(NotificationRecord {
            id: row.get(0)?,
            user_id: row.get(1)?,
            kind: row.get(2)?,
            channels: serde_json::from_str(&channels_json)
                .unwrap_or(serde_json::Value::String(channels_json)),
            created_at: row.get(4)?,
        })
    })?;

    let mut records = Vec::new();
    for row in rows {
        records.push(row?);
    }
    Ok(records)
}
