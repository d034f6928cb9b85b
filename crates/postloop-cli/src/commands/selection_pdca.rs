//! `postloop selection-pdca` — run one PDCA cycle over aggregated curation
//! feedback, printing the report and optionally applying it to Preferences.

use postloop_core::pdca;

use crate::commands::SelectionPdcaArgs;
use crate::deps::RuntimeDeps;

pub async fn execute(
    config: &postloop_core::config::Config,
    args: SelectionPdcaArgs,
) -> anyhow::Result<()> {
    let deps = RuntimeDeps::init(config)?;
    let counters = deps.queue.feedback_log().aggregates()?;
    let mut preferences = deps.preferences.load()?;

    let dry_run = args.dry_run || !args.auto_adjust;
    let outcome = pdca::run(&config.pdca, &counters, &mut preferences, dry_run);

    println!("{}", outcome.report);
    if outcome.applied {
        deps.preferences.save(&preferences)?;
        tracing::info!(version = preferences.version, "selection-pdca: preferences updated");
    } else {
        tracing::info!("selection-pdca: no preferences change applied");
    }

    Ok(())
}
