use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use salon_knjige::api::auth;
use salon_knjige::domain::UpsertUser;
use salon_knjige::import::source::{self, SourceFormat};
use salon_knjige::infrastructure::AppState;
use salon_knjige::{config, db, server};

/// Catalog backend for the Salon knjige bookshop.
#[derive(Parser)]
#[command(name = "salon-knjige", version, about = "Catalog backend for the Salon knjige bookshop")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server (default).
    Serve,

    /// Import a spreadsheet export into the catalog.
    Import {
        /// JSON array or CSV file with a header row.
        file: PathBuf,

        /// Source format; guessed from the file extension when omitted.
        #[arg(long, value_enum)]
        format: Option<Format>,
    },

    /// Record a sign-in for a login identity and print its session token.
    Login {
        /// Identifier issued by the login provider.
        open_id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        email: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Csv,
}

impl From<Format> for SourceFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Json => SourceFormat::Json,
            Format::Csv => SourceFormat::Csv,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load configuration before tracing so RUST_LOG may come from .env
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "salon_knjige=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = match config::Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Initialize database
    let db = match db::init_db(&config.database_url).await {
        Ok(db) => db,
        Err(e) => {
            tracing::error!("Failed to initialize database: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let state = AppState::new(db, config);

    let outcome = match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => server::serve(state).await,
        Commands::Import { file, format } => run_import(state, file, format).await,
        Commands::Login {
            open_id,
            name,
            email,
        } => run_login(state, open_id, name, email).await,
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_import(
    state: AppState,
    file: PathBuf,
    format: Option<Format>,
) -> Result<(), String> {
    let records = source::load_records(&file, format.map(SourceFormat::from))
        .map_err(|e| e.to_string())?;
    tracing::info!("Loaded {} records from {}", records.len(), file.display());

    let summary = state
        .importer
        .import_records(&records)
        .await
        .map_err(|e| e.to_string())?;

    for error in &summary.errors {
        tracing::warn!("{}", error);
    }
    for warning in &summary.warnings {
        tracing::warn!("{}", warning);
    }
    let report = serde_json::to_string_pretty(&summary).map_err(|e| e.to_string())?;
    println!("{}", report);

    state
        .shutdown()
        .await
        .map_err(|e| format!("Failed to close database: {}", e))
}

async fn run_login(
    state: AppState,
    open_id: String,
    name: Option<String>,
    email: Option<String>,
) -> Result<(), String> {
    let input = UpsertUser {
        open_id,
        name,
        email,
        login_method: Some("cli".to_string()),
        ..Default::default()
    };
    let (user, token) = auth::sign_in(&state, input)
        .await
        .map_err(|e| e.to_string())?;
    tracing::info!("Signed in {} as {:?}", user.open_id, user.role);
    println!("{}", token);

    state
        .shutdown()
        .await
        .map_err(|e| format!("Failed to close database: {}", e))
}
