use chrono::{DateTime, TimeDelta, Utc};
use serenity::all::{CacheHttp, Message};
use tracing::info;

use super::{info_embed, permanent_block, respond};
use crate::{database::Database, error::Result, model::thread::Thread};

/// Block expiry, and whether it is the permanent stand-in. Durations that
/// would reach past it count as permanent.
pub fn block_until(
    now: DateTime<Utc>,
    duration: Option<TimeDelta>,
) -> (DateTime<Utc>, bool) {
    let permanent = permanent_block();
    match duration.and_then(|duration| now.checked_add_signed(duration)) {
        Some(until) if until < permanent => (until, false),
        _ => (permanent, true),
    }
}

pub async fn block(
    http: &impl CacheHttp,
    db: &Database,
    thread: &Thread,
    msg: &Message,
    duration: Option<TimeDelta>,
) -> Result {
    let (until, permanent) = block_until(Utc::now(), duration);
    db.block_user(thread.member_id, until).await?;
    info!(member = thread.member_id, %until, "member blocked");

    let description = if permanent {
        format!("<@{}> is blocked permanently.", thread.member_id)
    } else {
        format!(
            "<@{}> is blocked until <t:{}:f>.",
            thread.member_id,
            until.timestamp()
        )
    };
    respond(http, msg, info_embed(description)).await
}

pub async fn unblock(
    http: &impl CacheHttp,
    db: &Database,
    thread: &Thread,
    msg: &Message,
) -> Result {
    db.unblock_user(thread.member_id).await?;
    info!(member = thread.member_id, "member unblocked");
    respond(
        http,
        msg,
        info_embed(format!("<@{}> is no longer blocked.", thread.member_id)),
    )
    .await
}

#[cfg(test)]
mod tests {
    use chrono::{TimeDelta, TimeZone, Utc};

    use super::block_until;
    use crate::commands::permanent_block;

    #[test]
    fn timed_block() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(
            block_until(now, Some(TimeDelta::days(7))),
            (now + TimeDelta::days(7), false)
        );
    }

    #[test]
    fn long_blocks_become_permanent() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(block_until(now, None), (permanent_block(), true));
        assert_eq!(
            block_until(now, Some(TimeDelta::weeks(1_000_000))),
            (permanent_block(), true)
        );
        assert_eq!(
            block_until(now, Some(TimeDelta::MAX)),
            (permanent_block(), true)
        );
    }
}
