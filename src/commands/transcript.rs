use serenity::all::{CacheHttp, CreateAttachment, CreateMessage, Message};

use crate::{
    database::{Database, timestamp},
    error::Result,
    model::{message::ThreadMessage, thread::Thread},
};

/// One `[time] content` line per message, deleted ones marked;
/// continuation lines are indented.
pub fn render(messages: &[ThreadMessage]) -> String {
    let mut out = String::new();
    for message in messages {
        out.push('[');
        out.push_str(&timestamp(message.created_at));
        out.push(']');
        if message.deleted {
            out.push_str(" (deleted)");
        }
        let mut lines = message.content.lines();
        out.push(' ');
        out.push_str(lines.next().unwrap_or_default());
        for line in lines {
            out.push_str("\n    ");
            out.push_str(line);
        }
        out.push('\n');
    }
    out
}

/// Uploads every stored message of the thread as a text file.
pub async fn run(
    http: &impl CacheHttp,
    db: &Database,
    thread: &Thread,
    msg: &Message,
) -> Result {
    let messages = db.fetch_messages(&thread.id).await?;
    let file = CreateAttachment::bytes(
        render(&messages).into_bytes(),
        format!("transcript-{}.txt", thread.id),
    );

    msg.channel_id
        .send_message(
            http,
            CreateMessage::new()
                .content(format!("{} messages.", messages.len()))
                .add_file(file),
        )
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::render;
    use crate::model::message::ThreadMessage;

    fn message(
        id: i64,
        content: &str,
        deleted: bool,
    ) -> ThreadMessage {
        ThreadMessage {
            id,
            thread_id: "t".to_owned(),
            message_id: 100 + id,
            created_at: Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap(),
            deleted,
            content: content.to_owned(),
            dm_message_id: None,
        }
    }

    #[test]
    fn readable_lines() {
        let text = render(&[
            message(1, "hello\nsecond line", false),
            message(2, "oops", true),
        ]);
        assert_eq!(
            text,
            "[2026-01-02T03:04:05.000000Z] hello\n    second line\n\
             [2026-01-02T03:04:05.000000Z] (deleted) oops\n"
        );
    }

    #[test]
    fn empty_thread() {
        assert_eq!(render(&[]), "");
    }
}
