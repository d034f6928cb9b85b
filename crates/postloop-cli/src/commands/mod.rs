//! CLI subcommand argument definitions and implementations for postloop.
//!
//! Each subcommand struct defines its flags and arguments matching the
//! dispatcher CLI's external interface contract; each submodule's
//! `execute` composes `postloop-core` components to do the work.
pub mod add_tweet;
pub mod analyze_persona;
pub mod collect;
pub mod curate;
pub mod curate_post;
pub mod export_dashboard;
pub mod generate;
pub mod import_urls;
pub mod post;
pub mod preferences;
pub mod process_operations;
pub mod selection_pdca;
pub mod setup_sheets;
pub mod sync_from_firebase;
pub mod sync_queue;
pub mod sync_settings;

use clap::Args;

/// Arguments for the `generate` subcommand.
#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Target account id
    #[arg(long)]
    pub account: u32,

    /// Compute and print what would be generated without writing it
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `post` subcommand.
#[derive(Debug, Args)]
pub struct PostArgs {
    /// Target account id
    #[arg(long)]
    pub account: u32,
}

/// Arguments for the `curate` subcommand.
#[derive(Debug, Args)]
pub struct CurateArgs {
    /// Target account id
    #[arg(long)]
    pub account: u32,

    /// Compute and print what would be generated without writing it
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `curate-post` subcommand.
#[derive(Debug, Args)]
pub struct CuratePostArgs {
    /// Target account id
    #[arg(long)]
    pub account: u32,
}

/// Arguments for the `collect` subcommand.
#[derive(Debug, Args)]
pub struct CollectArgs {
    /// Fetch and print candidates without adding them to the queue
    #[arg(long)]
    pub dry_run: bool,

    /// Auto-approve every newly added candidate
    #[arg(long)]
    pub auto_approve: bool,

    /// Minimum like count for a candidate to be kept
    #[arg(long)]
    pub min_likes: Option<u64>,

    /// Maximum candidates to pull
    #[arg(long)]
    pub max_tweets: Option<u32>,
}

/// Arguments for the `add-tweet` subcommand.
#[derive(Debug, Args)]
pub struct AddTweetArgs {
    /// Source tweet URL
    #[arg(long)]
    pub url: String,

    /// Optional free-text memo recorded as the candidate's feedback note
    #[arg(long)]
    pub memo: Option<String>,
}

/// Arguments for the `import-urls` subcommand.
#[derive(Debug, Args)]
pub struct ImportUrlsArgs {
    /// Target account id
    #[arg(long)]
    pub account: u32,

    /// Immediately approve newly imported candidates
    #[arg(long)]
    pub auto_approve: bool,
}

/// Arguments for the `notify-test` subcommand.
#[derive(Debug, Args)]
pub struct NotifyTestArgs;

/// Arguments for the `setup-sheets` subcommand.
#[derive(Debug, Args)]
pub struct SetupSheetsArgs;

/// Arguments for the `sync-queue` subcommand.
#[derive(Debug, Args)]
pub struct SyncQueueArgs {
    /// Sync direction
    #[arg(long, value_parser = ["to_sheet", "from_sheet", "full"], default_value = "full")]
    pub direction: String,
}

/// Arguments for the `sync-settings` subcommand.
#[derive(Debug, Args)]
pub struct SyncSettingsArgs;

/// Arguments for the `export-dashboard` subcommand.
#[derive(Debug, Args)]
pub struct ExportDashboardArgs;

/// Arguments for the `preferences` subcommand.
#[derive(Debug, Args)]
pub struct PreferencesArgs {
    /// Pull remote decisions and preferences before printing
    #[arg(long)]
    pub sync: bool,
}

/// Arguments for the `selection-pdca` subcommand.
#[derive(Debug, Args)]
pub struct SelectionPdcaArgs {
    /// Write the computed adjustments to the Preferences document
    #[arg(long)]
    pub auto_adjust: bool,

    /// Compute and report adjustments without writing them
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `sync-from-firebase` subcommand.
#[derive(Debug, Args)]
pub struct SyncFromFirebaseArgs {
    /// Override the configured remote-store uid
    #[arg(long)]
    pub uid: Option<String>,

    /// Only pull queue decisions
    #[arg(long, conflicts_with = "prefs_only")]
    pub queue_only: bool,

    /// Only pull preferences
    #[arg(long, conflicts_with = "queue_only")]
    pub prefs_only: bool,

    /// Suppress the per-step progress trail
    #[arg(long)]
    pub quiet: bool,
}

/// Arguments for the `process-operations` subcommand.
#[derive(Debug, Args)]
pub struct ProcessOperationsArgs;

/// Arguments for the `analyze-persona` subcommand.
#[derive(Debug, Args)]
pub struct AnalyzePersonaArgs {
    /// Target account's handle, recorded on the resulting profile
    #[arg(long)]
    pub username: Option<String>,

    /// Path to a newline-delimited file of sample posts
    #[arg(long)]
    pub file: Option<String>,

    /// How many of the most recent samples to analyze
    #[arg(long, default_value = "200")]
    pub count: usize,
}
