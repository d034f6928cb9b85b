//! `postloop setup-sheets` — first-run wizard that connects a spreadsheet as
//! an alternate curation front end: prompts for the spreadsheet id and
//! service-account credential, verifies access by writing tab headers, then
//! persists the connection onto the Preferences document's `sheets` section.

use dialoguer::Input;
use postloop_core::config::{GoogleCredentialConfig, SheetsConfig};
use postloop_core::preferences::SheetsSettings;
use postloop_core::sheets::SheetsClient;

use crate::commands::SetupSheetsArgs;
use crate::deps::RuntimeDeps;

const QUEUE_HEADER: &[&str] = &[
    "tweet_id", "author", "text", "status", "score", "matched_topics", "link", "edited",
];
const SETTINGS_HEADER: &[&str] = &["field", "value"];

pub async fn execute(
    config: &postloop_core::config::Config,
    _args: SetupSheetsArgs,
) -> anyhow::Result<()> {
    let deps = RuntimeDeps::init(config)?;

    let spreadsheet_id: String = Input::new()
        .with_prompt("Spreadsheet id")
        .interact_text()?;
    let credential_path: String = Input::new()
        .with_prompt("Path to service-account credential JSON")
        .interact_text()?;

    let sheets_config = SheetsConfig {
        spreadsheet_id: Some(spreadsheet_id.clone()),
        credential: GoogleCredentialConfig {
            credential_path: Some(credential_path.clone()),
            credential_blob: None,
        },
    };
    let client = SheetsClient::new(&sheets_config).map_err(|e| anyhow::anyhow!("{e}"))?;
    client.ensure_header("Queue", QUEUE_HEADER).await?;
    client.ensure_header("Settings", SETTINGS_HEADER).await?;

    let mut preferences = deps.preferences.load()?;
    preferences.sheets = SheetsSettings {
        spreadsheet_id: Some(spreadsheet_id),
        credential_path: Some(credential_path),
    };
    deps.preferences.save(&preferences)?;

    println!("setup-sheets: spreadsheet connected and headers written");
    Ok(())
}
