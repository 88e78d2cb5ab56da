use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde_json::{Map, Value};
use tracing::info;

use deepshield::config::Config;
use deepshield::db::models::UserRecord;
use deepshield::detectors::DetectorSuite;
use deepshield::notify::channel::{NotificationEvent, NotificationKind};
use deepshield::notify::directory::DatabaseDirectory;
use deepshield::notify::registry::ConnectionRegistry;
use deepshield::output::terminal;

/// DeepShield: deepfake, moderation and identity checks with
/// multi-channel notifications.
#[derive(Parser)]
#[command(name = "deepshield", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Run the HTTP API and notification stream
    #[cfg(feature = "web")]
    Serve {
        #[arg(long, default_value = "8000")]
        port: u16,

        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
    },

    /// Register or update a user's contact details
    AddUser {
        id: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        name: Option<String>,
    },

    /// Moderate a piece of text
    Moderate {
        text: String,
        /// ISO 639-1 language code; detected when omitted
        #[arg(long)]
        language: Option<String>,
    },

    /// Check an image for explicit content
    ModerateImage { path: PathBuf },

    /// Check an image or video for deepfake manipulation
    Deepfake {
        path: PathBuf,
        /// Treat the file as a video
        #[arg(long)]
        video: bool,
    },

    /// Check whether two images show the same person
    VerifyFaces { image1: PathBuf, image2: PathBuf },

    /// Locate the face in an image
    ExtractFace { path: PathBuf },

    /// Send a notification to a user over every channel
    Notify {
        user_id: String,
        /// flagged_content, media_misuse, or any other kind
        #[arg(long, default_value = "flagged_content")]
        kind: String,
        /// JSON object payload
        #[arg(long, default_value = "{}")]
        payload: String,
    },

    /// Download the ONNX text classifier (~126 MB)
    DownloadModel,

    /// Show system status (DB stats, detector readiness, recent analyses)
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("deepshield=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            info!("Initializing DeepShield database...");
            let config = Config::load()?;
            let db = deepshield::db::initialize_sqlite(&config.db_path)?;
            let table_count = db.table_count().await?;
            println!("Database initialized at: {}", config.db_path);
            println!("Tables created: {table_count}");
            println!("\nDeepShield is ready. Next step: set up your .env file");
            println!("  (see .env.example for the available variables)");
        }

        #[cfg(feature = "web")]
        Commands::Serve { port, bind } => {
            let config = Config::load()?;
            if let Err(e) = config.require_detectors() {
                tracing::warn!("{e}");
            }
            let db = deepshield::db::initialize_sqlite(&config.db_path)?;
            let state = deepshield::web::AppState::build(config, db).await?;
            deepshield::web::run_server(state, port, &bind).await?;
        }

        Commands::AddUser {
            id,
            email,
            phone,
            name,
        } => {
            let config = Config::load()?;
            let db = deepshield::db::open_sqlite(&config.db_path)?;
            db.upsert_user(&UserRecord {
                id: id.clone(),
                email,
                phone,
                display_name: name,
                created_at: String::new(),
            })
            .await?;
            println!("User {} saved.", id.bold());
        }

        Commands::Moderate { text, language } => {
            let detectors = load_detectors().await?;
            let result = detectors.analyze_text(&text, language.as_deref()).await;
            terminal::display_text_moderation(&text, &result);
        }

        Commands::ModerateImage { path } => {
            let detectors = load_detectors().await?;
            let result = detectors.moderate_image(&path).await;
            terminal::display_image_moderation(&path.to_string_lossy(), &result);
        }

        Commands::Deepfake { path, video } => {
            let detectors = load_detectors().await?;
            let display = path.to_string_lossy();
            if video {
                let result = detectors.analyze_video(&path).await;
                terminal::display_video(&display, &result);
            } else {
                let result = detectors.analyze_image(&path).await;
                terminal::display_deepfake(&display, &result);
            }
        }

        Commands::VerifyFaces { image1, image2 } => {
            let detectors = load_detectors().await?;
            let result = detectors.verify_faces(&image1, &image2).await;
            terminal::display_face_match(&result);
        }

        Commands::ExtractFace { path } => {
            let detectors = load_detectors().await?;
            let result = detectors.extract_face(&path).await;
            terminal::display_face_extraction(&path.to_string_lossy(), &result);
        }

        Commands::Notify {
            user_id,
            kind,
            payload,
        } => {
            let config = Config::load()?;
            let db = deepshield::db::open_sqlite(&config.db_path)?;
            let payload: Map<String, Value> = serde_json::from_str(&payload)
                .map_err(|e| anyhow::anyhow!("--payload must be a JSON object: {e}"))?;

            // No stream clients exist outside `serve`, so that channel reports false.
            let registry = Arc::new(ConnectionRegistry::new());
            let directory = Arc::new(DatabaseDirectory::new(Arc::clone(&db)));
            let dispatcher = deepshield::notify::build_dispatcher(&config, directory, registry)?;

            let event = NotificationEvent::new(&user_id, NotificationKind::from(kind), payload);
            let result = dispatcher.dispatch(&event).await;
            let channels = serde_json::to_string(&result.channels)?;
            db.record_notification(&user_id, event.kind().as_str(), &channels)
                .await?;
            terminal::display_dispatch(&user_id, &result);
        }

        Commands::DownloadModel => {
            let config = Config::load()?;
            let model_dir = &config.model_dir;

            println!("Downloading ONNX text classifier...");
            println!("  Destination: {}", model_dir.display());

            deepshield::moderation::download::download_model(model_dir).await?;

            println!("\n{}", "Model downloaded successfully.".bold());
        }

        Commands::Status => {
            let config = Config::load()?;
            if !std::path::Path::new(&config.db_path).exists() {
                println!("Database: not initialized");
                println!("\nRun `deepshield init` to set up the database.");
                return Ok(());
            }
            let db = deepshield::db::open_sqlite(&config.db_path)?;
            deepshield::status::show(&db, &config).await?;
        }
    }

    Ok(())
}

/// Build the detector suite for one-off CLI commands.
async fn load_detectors() -> Result<DetectorSuite> {
    let config = Config::load()?;
    Ok(DetectorSuite::from_config(&config).await)
}
