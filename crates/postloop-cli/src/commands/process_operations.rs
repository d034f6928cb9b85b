//! `postloop process-operations` — drain and run pending remote operation
//! requests, each as a subprocess of this same executable.

use std::collections::HashMap;

use crate::commands::ProcessOperationsArgs;
use crate::deps::RuntimeDeps;

pub async fn execute(
    config: &postloop_core::config::Config,
    _args: ProcessOperationsArgs,
) -> anyhow::Result<()> {
    let sync = RuntimeDeps::control_plane_sync(config)?;
    let results = sync.process_operations(&HashMap::new()).await?;

    for result in &results {
        if result.success {
            tracing::info!(command = %result.command, "process-operations: completed");
        } else {
            tracing::warn!(command = %result.command, stderr = %result.stderr, "process-operations: failed");
        }
    }
    println!("process-operations: ran {} request(s)", results.len());
    Ok(())
}
