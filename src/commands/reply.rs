use serenity::all::{CacheHttp, ChannelId, CreateMessage, Message};

use super::{ensure_open, error_embed, respond};
use crate::{
    database::Database,
    error::Result,
    model::thread::Thread,
    relay::{attachment_links, moderator_embed},
};

pub async fn run(
    http: &impl CacheHttp,
    db: &Database,
    thread: &Thread,
    msg: &Message,
    text: &str,
    anonymous: bool,
) -> Result {
    if !ensure_open(http, thread, msg).await? {
        return Ok(());
    }
    let Some(member) = db.fetch_user(thread.member_id).await? else {
        respond(http, msg, error_embed("Error", "Unknown thread member."))
            .await?;
        return Ok(());
    };

    let content = attachment_links(text, &msg.attachments);
    let moderator = (!anonymous).then_some(&msg.author);

    let dm = ChannelId::new(member.dm_id as u64)
        .send_message(
            http,
            CreateMessage::new().embed(moderator_embed(moderator, &content)),
        )
        .await?;

    let echo_embed = moderator_embed(Some(&msg.author), &content);
    let echo_embed = if anonymous {
        echo_embed.title("Anonymous reply")
    } else {
        echo_embed
    };
    let echo = msg
        .channel_id
        .send_message(http, CreateMessage::new().embed(echo_embed))
        .await?;

    db.create_message(
        &thread.id,
        echo.id.get() as i64,
        &content,
        Some(dm.id.get() as i64),
    )
    .await?;
    Ok(())
}
