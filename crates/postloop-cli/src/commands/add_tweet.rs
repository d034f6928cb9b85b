//! `postloop add-tweet` — manually enqueue one candidate from a pasted URL.

use postloop_core::normalize::{self, CandidateSource};

use crate::commands::AddTweetArgs;
use crate::deps::RuntimeDeps;

pub async fn execute(config: &postloop_core::config::Config, args: AddTweetArgs) -> anyhow::Result<()> {
    let deps = RuntimeDeps::init(config)?;
    let record = normalize::normalize(CandidateSource::Url {
        url: args.url.clone(),
        memo: args.memo,
    })?;
    let tweet_id = record.tweet_id.clone();
    if deps.queue.add(record)? {
        tracing::info!(tweet_id, "add-tweet: added");
        println!("added {tweet_id}");
    } else {
        tracing::info!(tweet_id, "add-tweet: already in queue");
        println!("{tweet_id} is already in the queue");
    }
    Ok(())
}
