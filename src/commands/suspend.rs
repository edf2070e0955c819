use serenity::all::{CacheHttp, Message};

use super::{ensure_open, error_embed, info_embed, respond};
use crate::{database::Database, error::Result, model::thread::Thread};

/// Suspends (`suspend = true`) or resumes a thread. Member messages to a
/// suspended thread are not relayed.
pub async fn run(
    http: &impl CacheHttp,
    db: &Database,
    thread: &Thread,
    msg: &Message,
    suspend: bool,
) -> Result {
    if !ensure_open(http, thread, msg).await? {
        return Ok(());
    }
    if thread.active != suspend {
        let state = if suspend { "suspended" } else { "active" };
        return respond(
            http,
            msg,
            error_embed("Error", &format!("This thread is already {state}.")),
        )
        .await;
    }

    if suspend {
        db.suspend_thread(&thread.id).await?;
        respond(http, msg, info_embed("Thread suspended.")).await
    } else {
        db.unsuspend_thread(&thread.id).await?;
        respond(http, msg, info_embed("Thread resumed.")).await
    }
}
