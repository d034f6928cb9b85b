//! `postloop sync-queue` — mirror the Queue Store against the Sheets tab.

use postloop_core::sheets::SyncDirection;

use crate::commands::SyncQueueArgs;
use crate::deps::RuntimeDeps;

pub async fn execute(config: &postloop_core::config::Config, args: SyncQueueArgs) -> anyhow::Result<()> {
    let deps = RuntimeDeps::init(config)?;
    let sheets = RuntimeDeps::sheets_client(config)?;
    let direction = match args.direction.as_str() {
        "to_sheet" => SyncDirection::ToSheet,
        "from_sheet" => SyncDirection::FromSheet,
        _ => SyncDirection::Full,
    };
    let applied = sheets.sync_queue(&deps.queue, direction).await?;
    tracing::info!(applied, direction = args.direction, "sync-queue complete");
    println!("sync-queue: applied {applied} edit(s) from sheet");
    Ok(())
}
