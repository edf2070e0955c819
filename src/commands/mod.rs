use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use serenity::all::{CacheHttp, CreateEmbed, CreateMessage, Message};
use tracing::{error, info};

use crate::{
    config::Config, database::Database, error::Result, model::thread::Thread,
};

pub mod alert;
pub mod block;
pub mod close;
pub mod logs;
pub mod reply;
pub mod suspend;
pub mod transcript;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    Reply { text: &'a str, anonymous: bool },
    Close,
    Suspend,
    Unsuspend,
    Block { duration: Option<TimeDelta> },
    Unblock,
    Alert,
    Logs,
    Transcript,
    /// Known command with unusable arguments; holds the usage line.
    Usage(&'static str),
    Unknown(&'a str),
}

/// Parses a prefixed command. Returns `None` for messages that are not
/// commands at all.
pub fn parse<'a>(
    prefix: &str,
    content: &'a str,
) -> Option<Command<'a>> {
    let rest = content.trim_start().strip_prefix(prefix)?;
    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };
    if name.is_empty() {
        return None;
    }

    let command = match name.to_ascii_lowercase().as_str() {
        "reply" | "r" | "areply" | "ar" => {
            if args.is_empty() {
                Command::Usage("reply <message>")
            } else {
                Command::Reply {
                    text: args,
                    anonymous: name.starts_with(['a', 'A']),
                }
            }
        },
        "close" => Command::Close,
        "suspend" => Command::Suspend,
        "unsuspend" => Command::Unsuspend,
        "block" if args.is_empty() => Command::Block { duration: None },
        "block" => match parse_duration(args) {
            Some(duration) => Command::Block {
                duration: Some(duration),
            },
            None => Command::Usage("block [30m|12h|7d|2w]"),
        },
        "unblock" => Command::Unblock,
        "alert" => Command::Alert,
        "logs" => Command::Logs,
        "transcript" => Command::Transcript,
        _ => Command::Unknown(name),
    };
    Some(command)
}

/// Parses durations such as `30m`, `12h`, `7d` or `2w`.
pub fn parse_duration(input: &str) -> Option<TimeDelta> {
    let input = input.trim();
    let unit = input.chars().last()?;
    let amount: i64 = input[..input.len() - unit.len_utf8()].parse().ok()?;
    if amount <= 0 {
        return None;
    }
    match unit.to_ascii_lowercase() {
        'm' => TimeDelta::try_minutes(amount),
        'h' => TimeDelta::try_hours(amount),
        'd' => TimeDelta::try_days(amount),
        'w' => TimeDelta::try_weeks(amount),
        _ => None,
    }
}

/// Stand-in expiry for blocks without a duration.
pub fn permanent_block() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(9999, 12, 31, 23, 59, 59)
        .single()
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

pub fn error_embed(
    title: &str,
    description: &str,
) -> CreateEmbed {
    CreateEmbed::new().title(title).description(description).color(0xFF0000)
}

pub fn info_embed(description: impl Into<String>) -> CreateEmbed {
    CreateEmbed::new().description(description).color(0x5865F2)
}

/// Runs a command sent inside a thread channel. Failures are reported back
/// into the channel.
pub async fn dispatch(
    http: &impl CacheHttp,
    db: &Database,
    config: &Config,
    thread: &Thread,
    msg: &Message,
) {
    let Some(command) = parse(&config.prefix, &msg.content) else {
        return;
    };
    info!(
        thread = %thread.id,
        moderator = %msg.author.id,
        "running {command:?}"
    );

    let rv = match command {
        Command::Reply { text, anonymous } => {
            reply::run(http, db, thread, msg, text, anonymous).await
        },
        Command::Close => close::run(http, db, thread, msg).await,
        Command::Suspend => suspend::run(http, db, thread, msg, true).await,
        Command::Unsuspend => suspend::run(http, db, thread, msg, false).await,
        Command::Block { duration } => {
            block::block(http, db, thread, msg, duration).await
        },
        Command::Unblock => block::unblock(http, db, thread, msg).await,
        Command::Alert => alert::run(http, db, thread, msg).await,
        Command::Logs => logs::run(http, db, thread, msg).await,
        Command::Transcript => transcript::run(http, db, thread, msg).await,
        Command::Usage(usage) => {
            respond(
                http,
                msg,
                error_embed(
                    "Usage",
                    &format!("`{}{usage}`", config.prefix),
                ),
            )
            .await
        },
        Command::Unknown(name) => {
            respond(
                http,
                msg,
                error_embed("Error", &format!("Unknown command `{name}`.")),
            )
            .await
        },
    };

    if let Err(why) = rv {
        error!(thread = %thread.id, "command failed: {why}");
        let _ = respond(http, msg, error_embed("Error", &why.to_string())).await;
    }
}

pub(crate) async fn respond(
    http: &impl CacheHttp,
    msg: &Message,
    embed: CreateEmbed,
) -> Result {
    msg.channel_id
        .send_message(http, CreateMessage::new().embed(embed))
        .await?;
    Ok(())
}

/// Rejects commands that change a closed thread.
pub(crate) async fn ensure_open(
    http: &impl CacheHttp,
    thread: &Thread,
    msg: &Message,
) -> Result<bool> {
    if thread.closed {
        respond(http, msg, error_embed("Error", "This thread is closed."))
            .await?;
        return Ok(false);
    }
    Ok(true)
}
