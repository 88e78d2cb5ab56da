// System status display: database stats, detector readiness, recent analyses.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

use crate::config::{Config, DetectorMode};
use crate::db::Database;

/// Display system status to the terminal.
pub async fn show(db: &Arc<dyn Database>, config: &Config) -> Result<()> {
    let db_path = config.db_path.as_str();
    if !Path::new(db_path).exists() {
        println!("Database: not initialized");
        println!("\nRun `deepshield init` to set up the database.");
        return Ok(());
    }

    let file_size = std::fs::metadata(db_path)
        .map(|m| format_bytes(m.len()))
        .unwrap_or_else(|_| "unknown".to_string());
    println!("Database: {} ({})", db_path, file_size);

    println!("Detector mode: {}", config.detector_mode.as_str());
    if config.detector_mode == DetectorMode::Real {
        match &config.inference_url {
            Some(url) => println!("Model server: {}", url),
            None => println!("Model server: not configured (INFERENCE_URL)"),
        }
        if crate::moderation::download::model_files_present(&config.model_dir) {
            println!("Text classifier: {}", config.model_dir.display());
        } else {
            println!("Text classifier: not downloaded");
            println!("  Run `deepshield download-model` to fetch it");
        }
    }

    let configured = |set: bool| if set { "configured" } else { "not configured" };
    println!("Mail: {}", configured(config.require_mail().is_ok()));
    println!("SMS: {}", configured(config.require_sms().is_ok()));

    println!("Users: {}", db.user_count().await?);

    let (total, flagged) = db.analysis_counts().await?;
    println!("Analyses: {} total, {} flagged", total, flagged);

    let recent = db.get_recent_analyses(5).await?;
    crate::output::terminal::display_recent_analyses(&recent);

    let notifications = db.get_recent_notifications(5).await?;
    if !notifications.is_empty() {
        println!("Recent notifications ({}):", notifications.len());
        for n in &notifications {
            println!("  {} → {} {} ({})", n.kind, n.user_id, n.channels, n.created_at);
        }
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
