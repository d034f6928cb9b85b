//! Shared runtime dependencies composed from [`Config`] by every command.
//!
//! Encapsulates Queue Store, Preferences Store, and Notifier construction
//! (needed by nearly every command) plus lazy builders for the
//! network-backed collaborators (LLM, posting, search, remote store,
//! sheets) that only some commands touch.

use std::sync::Arc;

use postloop_core::config::Config;
use postloop_core::control_plane::ControlPlaneSync;
use postloop_core::llm::anthropic::AnthropicProvider;
use postloop_core::llm::LlmProvider;
use postloop_core::notify::Notifier;
use postloop_core::orchestrator::GenerationOrchestrator;
use postloop_core::posting::PostingClient;
use postloop_core::preferences::PreferencesStore;
use postloop_core::queue::QueueStore;
use postloop_core::remote_store::RemoteStoreClient;
use postloop_core::search::SearchClient;
use postloop_core::sheets::SheetsClient;

/// All shared dependencies a dispatcher command might need, built once from
/// [`Config`] at the top of `execute`.
pub struct RuntimeDeps {
    pub queue: QueueStore,
    pub preferences: PreferencesStore,
    pub notifier: Notifier,
}

impl RuntimeDeps {
    /// Initialize the local-storage dependencies every command shares.
    pub fn init(config: &Config) -> anyhow::Result<Self> {
        let storage = &config.storage;
        let queue = QueueStore::new(
            storage.pending_queue_path(),
            storage.processed_queue_path(),
            storage.feedback_path(),
        );
        let preferences = PreferencesStore::new(storage.preferences_path());
        let notifier = Notifier::new(&config.notifier);
        Ok(Self {
            queue,
            preferences,
            notifier,
        })
    }

    /// Build the configured LLM provider.
    pub fn llm_provider(config: &Config) -> anyhow::Result<Arc<dyn LlmProvider>> {
        match config.llm.provider.as_str() {
            "anthropic" => {
                let api_key = config
                    .llm
                    .api_key
                    .clone()
                    .ok_or_else(|| anyhow::anyhow!("llm.api_key is not configured"))?;
                Ok(Arc::new(AnthropicProvider::new(
                    api_key,
                    config.llm.model.clone(),
                )))
            }
            other => Err(anyhow::anyhow!("unknown LLM provider: {other}")),
        }
    }

    /// Build a Generation Orchestrator rooted at `templates.dir`, with
    /// per-day bookkeeping state kept alongside the daily output directory.
    pub fn orchestrator(config: &Config) -> anyhow::Result<GenerationOrchestrator> {
        let llm = Self::llm_provider(config)?;
        let state_dir = config.storage.data_dir.join("output").join("daily");
        std::fs::create_dir_all(&state_dir)
            .map_err(|e| anyhow::anyhow!("failed to create orchestrator state dir: {e}"))?;
        Ok(GenerationOrchestrator::new(
            llm,
            config.templates.clone(),
            state_dir,
        ))
    }

    /// Build a posting client for `account_id`.
    pub fn posting_client(config: &Config, account_id: u32) -> anyhow::Result<PostingClient> {
        let account = config
            .account(account_id)
            .map_err(|e| anyhow::anyhow!("{e}"))?;
        Ok(PostingClient::new(account.clone()))
    }

    /// Build a search client from `account_id`'s bearer token.
    pub fn search_client(config: &Config, account_id: u32) -> anyhow::Result<SearchClient> {
        let account = config
            .account(account_id)
            .map_err(|e| anyhow::anyhow!("{e}"))?;
        let bearer_token = account
            .bearer_token
            .clone()
            .ok_or_else(|| anyhow::anyhow!("account {account_id} has no bearer_token configured"))?;
        Ok(SearchClient::new(bearer_token))
    }

    /// Build a remote control-plane store client.
    pub fn remote_store_client(config: &Config) -> anyhow::Result<RemoteStoreClient> {
        RemoteStoreClient::new(&config.remote_store).map_err(|e| anyhow::anyhow!("{e}"))
    }

    /// Build a Control-Plane Sync wrapper over the remote store client.
    pub fn control_plane_sync(config: &Config) -> anyhow::Result<ControlPlaneSync> {
        Ok(ControlPlaneSync::new(Self::remote_store_client(config)?))
    }

    /// Build a Sheets Mirror client.
    pub fn sheets_client(config: &Config) -> anyhow::Result<SheetsClient> {
        SheetsClient::new(&config.sheets).map_err(|e| anyhow::anyhow!("{e}"))
    }
}
