use serenity::all::{CacheHttp, Message};

use super::{info_embed, respond};
use crate::{database::Database, error::Result, model::thread::Thread};

/// Toggles whether the invoking moderator is mentioned on new member
/// messages.
pub async fn run(
    http: &impl CacheHttp,
    db: &Database,
    thread: &Thread,
    msg: &Message,
) -> Result {
    let (alerts, enabled) = thread.toggled_alerts(msg.author.id.get());
    db.set_thread_alerts(&thread.id, &alerts).await?;

    let description = if enabled {
        "You will be mentioned on new messages in this thread."
    } else {
        "You will no longer be mentioned in this thread."
    };
    respond(http, msg, info_embed(description)).await
}
