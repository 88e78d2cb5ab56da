// SqliteDatabase: rusqlite backend implementing the Database trait.
//
// The Connection is wrapped in tokio::sync::Mutex because Connection is !Sync.
// Trait methods lock the mutex, do synchronous rusqlite work, and return.
// Queries are short single-row or small-page statements, so the lock is
// held only briefly.

use anyhow::Result;
use async_trait::async_trait;
use rusqlite::Connection;
use tokio::sync::Mutex;

use super::models::{AnalysisRecord, NewAnalysis, NotificationRecord, ReviewStatus, UserRecord};
use super::traits::Database;

pub struct SqliteDatabase {
    conn: Mutex<Connection>,
}

impl SqliteDatabase {
    /// Wrap an already-opened rusqlite Connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    async fn table_count(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::schema::table_count(&conn)
    }

    async fn upsert_user(&self, user: &UserRecord) -> Result<()> {
        let conn = self.conn.lock().await;
        super::queries::upsert_user(&conn, user)
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<UserRecord>> {
        let conn = self.conn.lock().await;
        super::queries::get_user(&conn, user_id)
    }

    async fn user_count(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::queries::user_count(&conn)
    }

    async fn insert_analysis(&self, analysis: &NewAnalysis) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::queries::insert_analysis(&conn, analysis)
    }

    async fn get_recent_analyses(&self, limit: u32) -> Result<Vec<AnalysisRecord>> {
        let conn = self.conn.lock().await;
        super::queries::get_recent_analyses(&conn, limit)
    }

    async fn analysis_counts(&self) -> Result<(i64, i64)> {
        let conn = self.conn.lock().await;
        super::queries::analysis_counts(&conn)
    }

    async fn update_analysis_status(&self, id: i64, status: ReviewStatus) -> Result<bool> {
        let conn = self.conn.lock().await;
        super::queries::update_analysis_status(&conn, id, status)
    }

    async fn pending_flag_count(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::queries::pending_flag_count(&conn)
    }

    async fn record_notification(
        &self,
        user_id: &str,
        kind: &str,
        channels_json: &str,
    ) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::queries::insert_notification(&conn, user_id, kind, channels_json)
    }

    async fn get_recent_notifications(&self, limit: u32) -> Result<Vec<NotificationRecord>> {
        let conn = self.conn.lock().await;
        super::queries::get_recent_notifications(&conn, limit)
    }
}
