use poise::serenity_prelude::{self as serenity, ChannelId, GuildId, UserId, VoiceState};
use tracing::{debug, info};

use crate::models::Data;
use crate::music::is_alone;

/// Bot's voice channel in a guild and every other voice state as `(channel, is_bot)`
fn voice_snapshot(
    cache: &serenity::Cache,
    guild_id: GuildId,
    bot_id: UserId,
) -> Option<(ChannelId, Vec<(Option<ChannelId>, bool)>)> {
    let guild = cache.guild(guild_id)?;
    let bot_channel = guild.voice_states.get(&bot_id)?.channel_id?;

    let listeners = guild
        .voice_states
        .values()
        .filter(|state| state.user_id != bot_id)
        .map(|state| {
            let is_bot = guild
                .members
                .get(&state.user_id)
                .map(|member| member.user.bot)
                .unwrap_or(false);
            (state.channel_id, is_bot)
        })
        .collect();

    Some((bot_channel, listeners))
}

/// Leave voice a while after the last listener goes, stay when someone comes back
pub async fn handle_voice_state_update(
    ctx: &serenity::Context,
    new_state: &VoiceState,
    data: &Data,
) {
    let Some(guild_id) = new_state.guild_id else {
        return;
    };
    let Some(gm) = data.music.get(guild_id) else {
        return;
    };
    let bot_id = ctx.cache.current_user().id;

    if new_state.user_id == bot_id && new_state.channel_id.is_none() {
        info!("Disconnected from voice in guild {}", guild_id);
        data.music.reset(guild_id).await;
        return;
    }

    let Some((bot_channel, listeners)) = voice_snapshot(&ctx.cache, guild_id, bot_id) else {
        return;
    };

    if is_alone(bot_channel, &listeners) {
        if let Some(songbird) = songbird::get(ctx).await {
            debug!("Alone in {} of guild {}", bot_channel, guild_id);
            data.music.schedule_leave(songbird, guild_id).await;
        }
    } else if gm.cancel_leave().await {
        debug!("Listener came back in guild {}, staying", guild_id);
    }
}
