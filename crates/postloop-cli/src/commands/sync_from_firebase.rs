//! `postloop sync-from-firebase` — pull operator decisions and preference
//! edits down from the remote control plane.

use postloop_core::control_plane::ControlPlaneSync;
use postloop_core::remote_store::RemoteStoreClient;

use crate::commands::SyncFromFirebaseArgs;
use crate::deps::RuntimeDeps;

pub async fn execute(
    config: &postloop_core::config::Config,
    args: SyncFromFirebaseArgs,
) -> anyhow::Result<()> {
    let deps = RuntimeDeps::init(config)?;

    let sync = if let Some(uid) = args.uid.clone() {
        let mut remote_store = config.remote_store.clone();
        remote_store.uid = Some(uid);
        let remote = RemoteStoreClient::new(&remote_store).map_err(|e| anyhow::anyhow!("{e}"))?;
        ControlPlaneSync::new(remote)
    } else {
        RuntimeDeps::control_plane_sync(config)?
    };

    if !args.prefs_only {
        let applied = sync.pull_decisions(&deps.queue).await?;
        if !args.quiet {
            println!("sync-from-firebase: applied {applied} decision(s)");
        }
    }
    if !args.queue_only {
        let changed = sync.pull_preferences(&deps.preferences).await?;
        if !args.quiet {
            println!("sync-from-firebase: preferences changed = {changed}");
        }
    }

    Ok(())
}
