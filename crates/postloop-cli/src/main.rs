//! postloop CLI — autonomous social-media publishing pipeline.
//!
//! Entry point for the `postloop` binary. Parses CLI arguments,
//! initializes logging, and dispatches to subcommand handlers.
mod commands;
mod deps;

use clap::Parser;
use postloop_core::config::Config;
use tracing_subscriber::EnvFilter;

/// Autonomous social-media publishing pipeline
#[derive(Parser)]
#[command(name = "postloop")]
#[command(version)]
#[command(about = "Autonomous social-media publishing pipeline")]
struct Cli {
    /// Path to config.toml
    #[arg(short = 'c', long, global = true, default_value = "config/config.toml")]
    config: String,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Produce today's original posts
    Generate(commands::GenerateArgs),
    /// Publish eligible scheduled posts
    Post(commands::PostArgs),
    /// Generate quote-RT comments for approved candidates
    Curate(commands::CurateArgs),
    /// Publish generated quote-RTs under today's posting cap
    CuratePost(commands::CuratePostArgs),
    /// Pull new candidates from the candidate-feed backend
    Collect(commands::CollectArgs),
    /// Add a single candidate by source URL
    AddTweet(commands::AddTweetArgs),
    /// Ingest URLs from the operator spreadsheet's `URLs` tab
    ImportUrls(commands::ImportUrlsArgs),
    /// Send a canned payload to the configured notifier webhook
    NotifyTest(commands::NotifyTestArgs),
    /// Interactive first-run setup of the Sheets Mirror
    SetupSheets(commands::SetupSheetsArgs),
    /// Two-way sync of the Queue Store against the operator spreadsheet
    SyncQueue(commands::SyncQueueArgs),
    /// Mirror Preferences' human-editable fields to/from the Settings tab
    SyncSettings(commands::SyncSettingsArgs),
    /// Push a dashboard snapshot to the remote control plane
    ExportDashboard(commands::ExportDashboardArgs),
    /// Show or sync the Preferences document
    Preferences(commands::PreferencesArgs),
    /// Run a PDCA preference-adjustment cycle
    SelectionPdca(commands::SelectionPdcaArgs),
    /// Pull decisions and preferences down from the remote control plane
    SyncFromFirebase(commands::SyncFromFirebaseArgs),
    /// Drain and run pending remote operation requests
    ProcessOperations(commands::ProcessOperationsArgs),
    /// Rebuild a target account's persona profile
    AnalyzePersona(commands::AnalyzePersonaArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > --verbose/--quiet flags > per-command
    // default drawn from config.logging once it is loaded.
    let default_level = Config::load(std::path::Path::new(&cli.config))
        .map(|c| c.logging.default_level)
        .unwrap_or_else(|_| "info".to_string());
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("postloop=debug,postloop_core=debug,info")
    } else if cli.quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::new(format!("postloop=info,postloop_core=info,{default_level}"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(cli.verbose)
        .compact()
        .init();

    let config = Config::load_and_validate(std::path::Path::new(&cli.config)).map_err(|e| {
        anyhow::anyhow!(
            "Failed to load configuration: {e}\n\
             Hint: create {} or point --config at one.",
            cli.config
        )
    })?;

    match cli.command {
        Commands::Generate(args) => commands::generate::execute(&config, args).await,
        Commands::Post(args) => commands::post::execute(&config, args).await,
        Commands::Curate(args) => commands::curate::execute(&config, args).await,
        Commands::CuratePost(args) => commands::curate_post::execute(&config, args).await,
        Commands::Collect(args) => commands::collect::execute(&config, args).await,
        Commands::AddTweet(args) => commands::add_tweet::execute(&config, args).await,
        Commands::ImportUrls(args) => commands::import_urls::execute(&config, args).await,
        Commands::NotifyTest(args) => commands::notify_test::execute(&config, args).await,
        Commands::SetupSheets(args) => commands::setup_sheets::execute(&config, args).await,
        Commands::SyncQueue(args) => commands::sync_queue::execute(&config, args).await,
        Commands::SyncSettings(args) => commands::sync_settings::execute(&config, args).await,
        Commands::ExportDashboard(args) => commands::export_dashboard::execute(&config, args).await,
        Commands::Preferences(args) => commands::preferences::execute(&config, args).await,
        Commands::SelectionPdca(args) => commands::selection_pdca::execute(&config, args).await,
        Commands::SyncFromFirebase(args) => {
            commands::sync_from_firebase::execute(&config, args).await
        }
        Commands::ProcessOperations(args) => {
            commands::process_operations::execute(&config, args).await
        }
        Commands::AnalyzePersona(args) => commands::analyze_persona::execute(&config, args).await,
    }
}
