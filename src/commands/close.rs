use serenity::all::{CacheHttp, ChannelId, CreateMessage, Message};
use tracing::{info, warn};

use super::{ensure_open, info_embed, respond};
use crate::{database::Database, error::Result, model::thread::Thread};

pub async fn run(
    http: &impl CacheHttp,
    db: &Database,
    thread: &Thread,
    msg: &Message,
) -> Result {
    if !ensure_open(http, thread, msg).await? {
        return Ok(());
    }
    db.close_thread(&thread.id).await?;
    info!(thread = %thread.id, moderator = %msg.author.id, "thread closed");

    if let Some(member) = db.fetch_user(thread.member_id).await? {
        let notice = CreateMessage::new().embed(
            info_embed(
                "Your thread has been closed. Send another message to open a new one.",
            )
            .title("Thread closed"),
        );
        if let Err(why) =
            ChannelId::new(member.dm_id as u64).send_message(http, notice).await
        {
            warn!(thread = %thread.id, "could not notify member: {why}");
        }
    }

    respond(
        http,
        msg,
        info_embed(format!("Thread closed by <@{}>.", msg.author.id)),
    )
    .await
}
