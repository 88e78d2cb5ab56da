// Database trait: backend-agnostic async interface for all DB operations.
//
// The only implementor is SqliteDatabase (rusqlite behind a tokio Mutex).
// Methods are async so handlers and the user directory can hold an
// `Arc<dyn Database>` without caring how the backend schedules its work.

use anyhow::Result;
use async_trait::async_trait;

use super::models::{AnalysisRecord, NewAnalysis, NotificationRecord, ReviewStatus, UserRecord};

#[async_trait]
pub trait Database: Send + Sync {
    // --- Lifecycle ---

    /// Count the number of user-created tables in the database.
    async fn table_count(&self) -> Result<i64>;

    // --- Users ---

    /// Insert or update a user's contact details.
    async fn upsert_user(&self, user: &UserRecord) -> Result<()>;

    /// Load a user by id.
    async fn get_user(&self, user_id: &str) -> Result<Option<UserRecord>>;

    /// Number of registered users.
    async fn user_count(&self) -> Result<i64>;

    // --- Analyses ---

    /// Store a detector result and return its ID.
    async fn insert_analysis(&self, analysis: &NewAnalysis) -> Result<i64>;

    /// Get recent analyses, newest first.
    async fn get_recent_analyses(&self, limit: u32) -> Result<Vec<AnalysisRecord>>;

    /// (total, flagged) analysis counts.
    async fn analysis_counts(&self) -> Result<(i64, i64)>;

    /// Set an analysis's review status. Returns false if the id is unknown.
    async fn update_analysis_status(&self, id: i64, status: ReviewStatus) -> Result<bool>;

    /// Flagged analyses whose status is still `pending`.
    async fn pending_flag_count(&self) -> Result<i64>;

    // --- Notifications ---

    /// Record the per-channel outcome of one dispatch.
    async fn record_notification(
        &self,
        user_id: &str,
        kind: &str,
        channels_json: &str,
    ) -> Result<i64>;

    /// Get recent dispatch outcomes, newest first.
    async fn get_recent_notifications(&self, limit: u32) -> Result<Vec<NotificationRecord>>;
}
