use std::sync::Arc;

use serenity::{
    all::{
        ChannelId, GuildId, Message, MessageId, MessageUpdateEvent, Ready,
        ResumedEvent,
    },
    async_trait,
    prelude::{Context, EventHandler},
};
use tracing::{error, info, warn};

use crate::{
    commands,
    config::Config,
    database::Database,
    relay::{self, MemberLocks},
};

pub struct BotEvents {
    pub db: Database,
    pub config: Arc<Config>,
    pub locks: MemberLocks,
}

#[async_trait]
impl EventHandler for BotEvents {
    async fn ready(
        &self,
        _ctx: Context,
        ready: Ready,
    ) {
        info!(
            user = %ready.user.name,
            guilds = ready.guilds.len(),
            "Bot is ready."
        );
    }

    async fn resume(
        &self,
        _ctx: Context,
        _event: ResumedEvent,
    ) {
        warn!("Bot has resumed.");
    }

    async fn message(
        &self,
        ctx: Context,
        msg: Message,
    ) {
        if msg.author.bot {
            return;
        }

        match msg.guild_id {
            None => {
                if let Err(why) = relay::handle_dm(
                    &ctx,
                    &self.db,
                    &self.config,
                    &self.locks,
                    &msg,
                )
                .await
                {
                    error!(member = %msg.author.id, "Error relaying DM: {why}");
                }
            },
            Some(guild_id) if guild_id.get() == self.config.guild_id.get() => {
                let thread = match self
                    .db
                    .fetch_thread_by_channel(msg.channel_id.get() as i64)
                    .await
                {
                    Ok(Some(thread)) => thread,
                    Ok(None) => return,
                    Err(why) => {
                        error!("Error looking up thread channel: {why}");
                        return;
                    },
                };
                commands::dispatch(&ctx, &self.db, &self.config, &thread, &msg)
                    .await;
            },
            Some(_) => {},
        }
    }

    async fn message_update(
        &self,
        ctx: Context,
        _old_if_available: Option<Message>,
        _new: Option<Message>,
        event: MessageUpdateEvent,
    ) {
        if event.guild_id.is_some()
            || event.author.as_ref().is_some_and(|author| author.bot)
        {
            return;
        }
        if let Err(why) = relay::handle_dm_edit(&ctx, &self.db, &event).await {
            error!(message = %event.id, "Error mirroring DM edit: {why}");
        }
    }

    async fn message_delete(
        &self,
        ctx: Context,
        _channel_id: ChannelId,
        deleted_message_id: MessageId,
        guild_id: Option<GuildId>,
    ) {
        if guild_id.is_some() {
            return;
        }
        if let Err(why) =
            relay::handle_dm_delete(&ctx, &self.db, deleted_message_id).await
        {
            error!(
                message = %deleted_message_id,
                "Error mirroring DM deletion: {why}"
            );
        }
    }
}
