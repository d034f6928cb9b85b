//! `postloop analyze-persona` — rebuild an account's style profile from a
//! corpus of its own past posts, one per line of `--file` (or collected live
//! via `--username` when no file is given).

use std::path::Path;

use postloop_core::persona;

use crate::commands::AnalyzePersonaArgs;
use crate::deps::RuntimeDeps;

pub async fn execute(
    config: &postloop_core::config::Config,
    args: AnalyzePersonaArgs,
) -> anyhow::Result<()> {
    let account = config
        .accounts
        .first()
        .ok_or_else(|| anyhow::anyhow!("no accounts configured"))?;

    let tweets = if let Some(path) = &args.file {
        read_lines(path)?
    } else if let Some(username) = &args.username {
        collect_from_search(config, account.id, username, args.count).await?
    } else {
        anyhow::bail!("analyze-persona requires either --file or --username");
    };

    let mut profile = persona::analyze_account(&tweets, &account.username, &account.username, "");

    if let Ok(llm) = RuntimeDeps::llm_provider(config) {
        if let Err(err) = persona::enrich_with_llm(&mut profile, llm.as_ref(), &tweets).await {
            tracing::warn!(%err, "analyze-persona: LLM enrichment failed, keeping statistical profile");
        }
    }

    let persona_path = config.storage.persona_path(account.id);
    if let Some(parent) = persona_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&persona_path, serde_json::to_string_pretty(&profile)?)?;
    std::fs::write(
        config.storage.persona_prompt_path(account.id),
        profile.to_prompt_injection(),
    )?;

    tracing::info!(account = account.id, analyzed = profile.tweet_count_analyzed, "analyze-persona complete");
    println!("analyze-persona: wrote profile for account {}", account.id);
    Ok(())
}

fn read_lines(path: &str) -> anyhow::Result<Vec<String>> {
    let contents = std::fs::read_to_string(Path::new(path))?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

async fn collect_from_search(
    config: &postloop_core::config::Config,
    account_id: u32,
    username: &str,
    count: usize,
) -> anyhow::Result<Vec<String>> {
    use postloop_core::search::SearchQuery;

    let search = RuntimeDeps::search_client(config, account_id)?;
    let query = SearchQuery {
        query: format!("from:{username}"),
        max_tweets: count as u32,
        min_likes: 0,
    };
    let payloads = search.collect(&query).await?;
    Ok(payloads
        .iter()
        .filter_map(|p| p.get("text").and_then(serde_json::Value::as_str))
        .map(str::to_string)
        .collect())
}
