// Data models: Rust structs that map to database rows.
//
// These are separate from the queries so other modules (directory, web
// handlers, status) can use them without depending on rusqlite directly.

use serde::{Deserialize, Serialize};

/// A user in the directory, with the contact points notifications go to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub display_name: Option<String>,
    #[serde(default)]
    pub created_at: String,
}

/// What kind of analysis produced a stored result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    Text,
    Image,
    DeepfakeImage,
    DeepfakeVideo,
    FaceVerification,
    FaceExtraction,
}

impl AnalysisKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisKind::Text => "text",
            AnalysisKind::Image => "image",
            AnalysisKind::DeepfakeImage => "deepfake_image",
            AnalysisKind::DeepfakeVideo => "deepfake_video",
            AnalysisKind::FaceVerification => "face_verification",
            AnalysisKind::FaceExtraction => "face_extraction",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "text" => Some(AnalysisKind::Text),
            "image" => Some(AnalysisKind::Image),
            "deepfake_image" => Some(AnalysisKind::DeepfakeImage),
            "deepfake_video" => Some(AnalysisKind::DeepfakeVideo),
            "face_verification" => Some(AnalysisKind::FaceVerification),
            "face_extraction" => Some(AnalysisKind::FaceExtraction),
            _ => None,
        }
    }
}

impl std::fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where a stored analysis is in the moderator review workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    Reviewing,
    Resolved,
    Dismissed,
}

impl ReviewStatus {
    pub const ALL: [ReviewStatus; 4] = [
        ReviewStatus::Pending,
        ReviewStatus::Reviewing,
        ReviewStatus::Resolved,
        ReviewStatus::Dismissed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Reviewing => "reviewing",
            ReviewStatus::Resolved => "resolved",
            ReviewStatus::Dismissed => "dismissed",
        }
    }

    /// Exact, lowercase match only.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }
}

impl std::fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A detector result about to be stored.
#[derive(Debug, Clone)]
pub struct NewAnalysis {
    pub user_id: Option<String>,
    pub kind: AnalysisKind,
    /// File path or a text preview
    pub subject: String,
    pub flagged: bool,
    pub confidence: f64,
    /// The full result record, JSON-encoded
    pub result_json: String,
}

/// A stored detector result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: i64,
    pub user_id: Option<String>,
    pub kind: String,
    pub subject: String,
    pub flagged: bool,
    pub confidence: f64,
    pub result: serde_json::Value,
    /// Review workflow state, `pending` until a moderator moves it
    pub status: String,
    /// Hex sha256 of the stored result record
    pub content_hash: Option<String>,
    pub created_at: String,
}

/// A stored dispatch outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: i64,
    pub user_id: String,
    pub kind: String,
    pub channels: serde_json::Value,
    pub created_at: String,
}
