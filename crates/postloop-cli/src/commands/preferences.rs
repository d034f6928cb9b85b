//! `postloop preferences` — print the current Preferences document.

use crate::commands::PreferencesArgs;
use crate::deps::RuntimeDeps;

pub async fn execute(config: &postloop_core::config::Config, args: PreferencesArgs) -> anyhow::Result<()> {
    let deps = RuntimeDeps::init(config)?;

    if args.sync {
        let sync = RuntimeDeps::control_plane_sync(config)?;
        let changed = sync.pull_preferences(&deps.preferences).await?;
        tracing::info!(changed, "preferences: pulled from remote store");
    }

    let preferences = deps.preferences.load()?;
    println!("{}", serde_json::to_string_pretty(&preferences)?);
    Ok(())
}
