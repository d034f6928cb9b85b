//! `postloop import-urls` — pull manually pasted URLs from the Sheets Queue
//! tab's import column and enqueue each as a candidate.

use crate::commands::ImportUrlsArgs;
use crate::deps::RuntimeDeps;

pub async fn execute(config: &postloop_core::config::Config, args: ImportUrlsArgs) -> anyhow::Result<()> {
    let deps = RuntimeDeps::init(config)?;
    let sheets = RuntimeDeps::sheets_client(config)?;
    let imported = sheets.import_urls(&deps.queue, args.auto_approve).await?;
    tracing::info!(imported, "import-urls complete");
    println!("imported {imported} url(s)");
    Ok(())
}
