//! `postloop export-dashboard` — push a fresh dashboard snapshot upstream.

use crate::commands::ExportDashboardArgs;
use crate::deps::RuntimeDeps;

pub async fn execute(
    config: &postloop_core::config::Config,
    _args: ExportDashboardArgs,
) -> anyhow::Result<()> {
    let deps = RuntimeDeps::init(config)?;
    let sync = RuntimeDeps::control_plane_sync(config)?;
    let preferences = deps.preferences.load()?;
    sync.push_snapshot(&deps.queue, &preferences, &config.storage, None)
        .await?;
    tracing::info!("export-dashboard complete");
    println!("export-dashboard: snapshot pushed");
    Ok(())
}
