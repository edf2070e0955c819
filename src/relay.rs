//! Moves member DMs into thread channels and keeps them in sync when the
//! member edits or deletes what they sent.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use chrono::Utc;
use serenity::all::{
    Attachment, CacheHttp, ChannelId, ChannelType, CreateChannel,
    CreateEmbed, CreateEmbedAuthor, CreateEmbedFooter, CreateMessage,
    EditMessage, GuildId, Message, MessageId, MessageUpdateEvent, Timestamp,
    User,
};
use tracing::{debug, info};

use crate::{
    commands::info_embed,
    config::Config,
    database::Database,
    error::Result,
    model::thread::Thread,
};

const MEMBER_COLOUR: u32 = 0x57F287;
const MODERATOR_COLOUR: u32 = 0x5865F2;
const MAX_CHANNEL_NAME: usize = 90;

/// Per-member locks so concurrent DMs from one member open a single thread.
#[derive(Default)]
pub struct MemberLocks {
    locks: Mutex<HashMap<i64, Arc<tokio::sync::Mutex<()>>>>,
}

impl MemberLocks {
    pub async fn lock(
        &self,
        member_id: i64,
    ) -> tokio::sync::OwnedMutexGuard<()> {
        let lock = {
            let mut locks =
                self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            // drop entries nobody holds or waits on
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(member_id).or_default().clone()
        };
        lock.lock_owned().await
    }
}

fn is_link_line(line: &str) -> bool {
    line.starts_with('[') && line.ends_with(')') && line.contains("](")
}

/// Content for an edited DM. Edits without attachment data keep the links
/// that were appended when the message was first relayed.
pub fn edited_content(
    text: &str,
    stored: &str,
    attachments: Option<&[Attachment]>,
) -> String {
    if let Some(attachments) = attachments {
        return attachment_links(text, attachments);
    }
    let lines: Vec<&str> = stored.lines().collect();
    let kept = lines.iter().rev().take_while(|line| is_link_line(line)).count();
    let mut content = text.to_owned();
    for line in &lines[lines.len() - kept..] {
        if !content.is_empty() {
            content.push('\n');
        }
        content.push_str(line);
    }
    content
}

/// Appends `[filename](url)` links below the text.
pub fn append_links<'a>(
    text: &str,
    links: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> String {
    let mut content = text.to_owned();
    for (name, url) in links {
        if !content.is_empty() {
            content.push('\n');
        }
        content.push_str(&format!("[{name}]({url})"));
    }
    content
}

pub fn attachment_links(
    text: &str,
    attachments: &[Attachment],
) -> String {
    append_links(
        text,
        attachments.iter().map(|a| (a.filename.as_str(), a.url.as_str())),
    )
}

/// Discord text channel name derived from a username.
pub fn channel_name(username: &str) -> String {
    let mut name = String::with_capacity(username.len());
    for c in username.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() || c == '_' {
            name.push(c);
        } else if !name.is_empty() && !name.ends_with('-') {
            name.push('-');
        }
    }
    let mut name: String = name.chars().take(MAX_CHANNEL_NAME).collect();
    while name.ends_with('-') {
        name.pop();
    }
    if name.is_empty() {
        return "modmail".to_owned();
    }
    name
}

fn non_empty(content: &str) -> &str {
    if content.trim().is_empty() {
        "*(no text)*"
    } else {
        content
    }
}

pub fn member_embed(
    name: &str,
    avatar: Option<String>,
    content: &str,
) -> CreateEmbed {
    let mut author = CreateEmbedAuthor::new(name);
    if let Some(avatar) = avatar {
        author = author.icon_url(avatar);
    }
    CreateEmbed::new()
        .author(author)
        .description(non_empty(content))
        .color(MEMBER_COLOUR)
        .timestamp(Timestamp::now())
}

/// `None` hides the moderator's identity.
pub fn moderator_embed(
    moderator: Option<&User>,
    content: &str,
) -> CreateEmbed {
    let author = match moderator {
        Some(user) => CreateEmbedAuthor::new(&user.name).icon_url(user.face()),
        None => CreateEmbedAuthor::new("Moderator"),
    };
    CreateEmbed::new()
        .author(author)
        .description(non_empty(content))
        .color(MODERATOR_COLOUR)
        .timestamp(Timestamp::now())
}

/// Handles a direct message from a member.
pub async fn handle_dm(
    http: &impl CacheHttp,
    db: &Database,
    config: &Config,
    locks: &MemberLocks,
    msg: &Message,
) -> Result {
    let member_id = msg.author.id.get() as i64;
    let dm_id = msg.channel_id.get() as i64;
    let username = &msg.author.name;

    let user = db.create_user(member_id, dm_id, username).await?;

    if user.is_blocked(Utc::now()) {
        debug!(member = member_id, "ignoring message from blocked member");
        msg.channel_id
            .send_message(
                http,
                CreateMessage::new().embed(info_embed(
                    "You are currently blocked from contacting the moderators.",
                )),
            )
            .await?;
        return Ok(());
    }

    let thread = {
        let _guard = locks.lock(member_id).await;
        match db.fetch_open_thread(member_id).await? {
            Some(thread) => thread,
            None => open_thread(http, db, config, &msg.author).await?,
        }
    };

    if !thread.active {
        msg.channel_id
            .send_message(
                http,
                CreateMessage::new().embed(info_embed(
                    "Your thread is suspended. The moderators will get back to you.",
                )),
            )
            .await?;
        return Ok(());
    }

    let content = attachment_links(&msg.content, &msg.attachments);
    let mut builder = CreateMessage::new().embed(member_embed(
        username,
        Some(msg.author.face()),
        &content,
    ));
    let mentions = thread.mentions();
    if !mentions.is_empty() {
        builder = builder.content(mentions);
    }
    let posted = ChannelId::new(thread.channel_id as u64)
        .send_message(http, builder)
        .await?;

    db.create_message(
        &thread.id,
        posted.id.get() as i64,
        &content,
        Some(msg.id.get() as i64),
    )
    .await?;
    msg.react(http, '✅').await?;
    Ok(())
}

/// Creates the channel for a new thread and tells both sides about it.
async fn open_thread(
    http: &impl CacheHttp,
    db: &Database,
    config: &Config,
    member: &User,
) -> Result<Thread> {
    let member_id = member.id.get() as i64;
    let channel = GuildId::new(config.guild_id.get())
        .create_channel(
            http,
            CreateChannel::new(channel_name(&member.name))
                .kind(ChannelType::Text)
                .category(ChannelId::new(config.category_id.get()))
                .topic(format!("Modmail thread for {} ({})", member.name, member.id))
                .audit_log_reason("New modmail thread"),
        )
        .await?;
    let thread = db.create_thread(channel.id.get() as i64, member_id).await?;
    info!(thread = %thread.id, member = member_id, "opened thread");

    let previous = db.fetch_threads(member_id).await?.len().saturating_sub(1);
    channel
        .id
        .send_message(
            http,
            CreateMessage::new().embed(
                info_embed(format!(
                    "New thread from <@{}>. Previous threads: {previous}.\nReply with `{}reply <message>`.",
                    member.id, config.prefix
                ))
                .title(format!("{} ({})", member.name, member.id)),
            ),
        )
        .await?;

    member
        .direct_message(
            http,
            CreateMessage::new().embed(
                info_embed(
                    "Thank you for your message! The moderators will reply here as soon as possible.",
                )
                .title("Thread opened"),
            ),
        )
        .await?;
    Ok(thread)
}

/// Mirrors an edited DM into the thread channel.
pub async fn handle_dm_edit(
    http: &impl CacheHttp,
    db: &Database,
    event: &MessageUpdateEvent,
) -> Result {
    let Some(text) = event.content.as_deref() else {
        return Ok(());
    };
    let Some(stored) = db.fetch_message_by_dm(event.id.get() as i64).await?
    else {
        return Ok(());
    };
    let Some(thread) = db.fetch_thread(&stored.thread_id).await? else {
        return Ok(());
    };
    let content =
        edited_content(text, &stored.content, event.attachments.as_deref());
    if db
        .update_message(&thread.id, stored.message_id, &content)
        .await?
        .is_none()
    {
        return Ok(());
    }

    let name = match db.fetch_user(thread.member_id).await? {
        Some(user) => user.username,
        None => thread.member_id.to_string(),
    };
    let embed = member_embed(&name, event.author.as_ref().map(User::face), &content)
        .footer(CreateEmbedFooter::new("edited"));
    ChannelId::new(thread.channel_id as u64)
        .edit_message(
            http,
            MessageId::new(stored.message_id as u64),
            EditMessage::new().embed(embed),
        )
        .await?;
    Ok(())
}

/// Flags a DM the member deleted and points at it in the thread channel.
pub async fn handle_dm_delete(
    http: &impl CacheHttp,
    db: &Database,
    dm_message_id: MessageId,
) -> Result {
    let Some(stored) = db.fetch_message_by_dm(dm_message_id.get() as i64).await?
    else {
        return Ok(());
    };
    if !db.delete_message(&stored.thread_id, stored.message_id).await? {
        return Ok(());
    }
    let Some(thread) = db.fetch_thread(&stored.thread_id).await? else {
        return Ok(());
    };

    let channel = ChannelId::new(thread.channel_id as u64);
    channel
        .send_message(
            http,
            CreateMessage::new()
                .content("The member deleted this message.")
                .reference_message((
                    channel,
                    MessageId::new(stored.message_id as u64),
                )),
        )
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn links_follow_text() {
        assert_eq!(append_links("hi", [] as [(&str, &str); 0]), "hi");
        assert_eq!(
            append_links("hi", [("a.png", "https://cdn/a.png")]),
            "hi\n[a.png](https://cdn/a.png)"
        );
        assert_eq!(
            append_links("", [("a.png", "u1"), ("b.png", "u2")]),
            "[a.png](u1)\n[b.png](u2)"
        );
    }

    #[test]
    fn edits_keep_relayed_links() {
        let stored = "old text\n[a.png](u1)\n[b.png](u2)";
        assert_eq!(
            edited_content("new text", stored, None),
            "new text\n[a.png](u1)\n[b.png](u2)"
        );
        assert_eq!(edited_content("new", "old", None), "new");
        assert_eq!(edited_content("new", "old", Some(&[])), "new");
        assert_eq!(edited_content("", "[a.png](u1)", None), "[a.png](u1)");
    }

    #[tokio::test]
    async fn member_locks_serialise_one_member() {
        let locks = Arc::new(MemberLocks::default());
        let inside = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let mut tasks = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let inside = inside.clone();
            tasks.push(tokio::spawn(async move {
                let _guard = locks.lock(5).await;
                let now =
                    inside.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                assert_eq!(now, 0, "two holders for one member");
                tokio::task::yield_now().await;
                inside.fetch_sub(1, std::sync::atomic::Ordering::SeqCst);
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let _other = locks.lock(6).await;
        let _same_again = locks.lock(5).await;
    }

    #[test]
    fn channel_names() {
        assert_eq!(channel_name("SomeOne"), "someone");
        assert_eq!(channel_name("two  words!!"), "two-words");
        assert_eq!(channel_name("--__x__--"), "__x__");
        assert_eq!(channel_name("!!!"), "modmail");
        assert_eq!(channel_name(&"a".repeat(200)).len(), MAX_CHANNEL_NAME);
    }

    #[test]
    fn empty_content_placeholder() {
        assert_eq!(non_empty("  "), "*(no text)*");
        assert_eq!(non_empty("text"), "text");
    }
}
