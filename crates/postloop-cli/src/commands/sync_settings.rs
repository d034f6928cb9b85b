//! `postloop sync-settings` — two-way mirror of the Preferences document
//! against the Sheets `Settings` tab: pull operator edits first, then push
//! the merged document back so the sheet always reflects the live policy.

use crate::commands::SyncSettingsArgs;
use crate::deps::RuntimeDeps;

pub async fn execute(config: &postloop_core::config::Config, _args: SyncSettingsArgs) -> anyhow::Result<()> {
    let deps = RuntimeDeps::init(config)?;
    let sheets = RuntimeDeps::sheets_client(config)?;

    let mut preferences = deps.preferences.load()?;
    sheets.sync_settings_from_sheet(&mut preferences).await?;
    deps.preferences.save(&preferences)?;
    sheets.sync_settings_to_sheet(&preferences).await?;

    tracing::info!("sync-settings complete");
    println!("sync-settings: settings synced");
    Ok(())
}
