use serenity::all::{CacheHttp, Message};

use super::{info_embed, respond};
use crate::{database::Database, error::Result, model::thread::Thread};

const MAX_LISTED: usize = 25;

/// Lists the most recent threads of the member, oldest first.
pub async fn run(
    http: &impl CacheHttp,
    db: &Database,
    thread: &Thread,
    msg: &Message,
) -> Result {
    let threads = db.fetch_threads(thread.member_id).await?;
    let lines = threads
        .iter()
        .skip(threads.len().saturating_sub(MAX_LISTED))
        .map(|t| {
            format!(
                "<#{}> | opened <t:{}:d> | {}",
                t.channel_id,
                t.created_at.timestamp(),
                t.status()
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    respond(
        http,
        msg,
        info_embed(lines)
            .title(format!("Threads of member {}", thread.member_id)),
    )
    .await
}
