use poise::CreateReply;
use poise::serenity_prelude::{ChannelId, CreateEmbed, GuildId, UserId};
use tracing::{info, warn};

use crate::models::{Context, Error};
use crate::music::{MusicError, QueuedTrack, RepeatMode};
use crate::utils::messages::{format_error, format_info, format_success};
use crate::utils::string_utils::limit;
use crate::utils::validation::{require_guild, require_voice};

const QUEUE_PREVIEW: usize = 10;

/// Queue listing shown by `queue`
pub fn render_queue(
    current: Option<&QueuedTrack>,
    upcoming: &[QueuedTrack],
    repeat: RepeatMode,
) -> String {
    let mut out = match current {
        Some(track) => format!("**Now playing:** {} (<@{}>)\n", track.title, track.requester),
        None => "**Nothing playing right now**\n".to_string(),
    };
    out.push_str(&format!("**Repeat:** {}\n", repeat));

    if upcoming.is_empty() {
        out.push_str("\nThe queue is empty.");
        return out;
    }

    out.push('\n');
    for (i, track) in upcoming.iter().take(QUEUE_PREVIEW).enumerate() {
        out.push_str(&format!("`{}.` {}\n", i + 1, limit(&track.title, 60)));
    }
    if upcoming.len() > QUEUE_PREVIEW {
        out.push_str(&format!("...and **{}** more", upcoming.len() - QUEUE_PREVIEW));
    }
    out
}

fn author_voice_channel(ctx: Context<'_>, guild_id: GuildId, user_id: UserId) -> Option<ChannelId> {
    ctx.guild()
        .filter(|guild| guild.id == guild_id)
        .and_then(|guild| guild.voice_states.get(&user_id).and_then(|state| state.channel_id))
}

/// Plays a song from a URL, or searches for it.
#[poise::command(prefix_command, slash_command, guild_only)]
pub async fn play(
    ctx: Context<'_>,
    #[description = "URL or search terms"]
    #[rest]
    query: String,
) -> Result<(), Error> {
    let guild_id = require_guild(ctx.guild_id())?;
    let channel_id = match require_voice(author_voice_channel(ctx, guild_id, ctx.author().id)) {
        Ok(channel_id) => channel_id,
        Err(e) => {
            ctx.say(format_error(&e.to_string())).await?;
            return Ok(());
        }
    };

    if query.trim().is_empty() {
        ctx.say(format_error("Tell me what to play")).await?;
        return Ok(());
    }

    ctx.defer().await?;

    let songbird = songbird::get(ctx.serenity_context())
        .await
        .ok_or(MusicError::NoVoiceManager)?;

    match ctx
        .data()
        .music
        .load_and_play(songbird, guild_id, channel_id, &query, ctx.author().id)
        .await
    {
        Ok((track, true)) => {
            info!("Playing '{}' in guild {}", track.title, guild_id);
            ctx.say(format!("🎶 Now playing **{}**", track.title)).await?;
        }
        Ok((track, false)) => {
            ctx.say(format_success(&format!("Queued **{}**", track.title)))
                .await?;
        }
        Err(e) => {
            warn!("Failed to play '{}' in guild {}: {}", query, guild_id, e);
            ctx.say(format_error(&e.to_string())).await?;
        }
    }
    Ok(())
}

/// Skips the current song.
#[poise::command(prefix_command, slash_command, guild_only)]
pub async fn skip(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = require_guild(ctx.guild_id())?;

    let skipped = match ctx.data().music.get(guild_id) {
        Some(gm) => gm.skip().await,
        None => false,
    };

    if skipped {
        ctx.say(format_success("Skipped the current song")).await?;
    } else {
        ctx.say(format_error("Nothing is playing")).await?;
    }
    Ok(())
}

/// Stops the music, clears the queue and leaves the voice channel.
#[poise::command(prefix_command, slash_command, guild_only)]
pub async fn stop(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = require_guild(ctx.guild_id())?;
    let data = ctx.data();

    if data.music.get(guild_id).is_none() {
        ctx.say(format_error("Nothing is playing")).await?;
        return Ok(());
    }

    data.music.reset(guild_id).await;
    info!(
        "Stopped music in guild {}, {} track(s) still queued elsewhere",
        guild_id,
        data.music.total_queue_size().await
    );
    if let Some(songbird) = songbird::get(ctx.serenity_context()).await {
        if let Err(e) = songbird.remove(guild_id).await {
            warn!("Failed to leave voice in guild {}: {}", guild_id, e);
        }
    }

    ctx.say(format_success("Stopped the music and cleared the queue"))
        .await?;
    Ok(())
}

/// Shows the song queue.
#[poise::command(prefix_command, slash_command, guild_only, aliases("q"))]
pub async fn queue(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = require_guild(ctx.guild_id())?;

    let Some(gm) = ctx.data().music.get(guild_id) else {
        ctx.say(format_info("Nothing is playing right now")).await?;
        return Ok(());
    };

    let description = {
        let scheduler = gm.scheduler().await;
        let upcoming: Vec<QueuedTrack> = scheduler.queue().cloned().collect();
        render_queue(scheduler.current(), &upcoming, scheduler.repeat())
    };

    ctx.send(
        CreateReply::default().embed(
            CreateEmbed::new()
                .title("🎶 Queue")
                .description(description),
        ),
    )
    .await?;
    Ok(())
}

/// Sets the repeat mode: off, song or queue. Cycles through them without an argument.
#[poise::command(prefix_command, slash_command, guild_only)]
pub async fn repeat(
    ctx: Context<'_>,
    #[description = "off, song or queue"] mode: Option<String>,
) -> Result<(), Error> {
    let guild_id = require_guild(ctx.guild_id())?;

    let Some(gm) = ctx.data().music.get(guild_id) else {
        ctx.say(format_error("Nothing is playing")).await?;
        return Ok(());
    };

    let requested = match mode.as_deref() {
        None => None,
        Some(value) => match RepeatMode::parse(value) {
            Some(mode) => Some(mode),
            None => {
                ctx.say(format_error("Repeat mode must be off, song or queue"))
                    .await?;
                return Ok(());
            }
        },
    };

    let mode = {
        let mut scheduler = gm.scheduler().await;
        let mode = requested.unwrap_or_else(|| scheduler.repeat().cycle());
        scheduler.set_repeat(mode);
        mode
    };

    ctx.say(format_success(&format!("Repeat mode set to **{}**", mode)))
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(title: &str) -> QueuedTrack {
        QueuedTrack {
            title: title.to_string(),
            source: title.to_string(),
            is_search: true,
            requester: UserId::new(3),
        }
    }

    #[test]
    fn test_render_empty_queue() {
        let out = render_queue(None, &[], RepeatMode::Off);
        assert!(out.contains("Nothing playing"));
        assert!(out.contains("**Repeat:** off"));
        assert!(out.ends_with("The queue is empty."));
    }

    #[test]
    fn test_render_queue_preview() {
        let upcoming: Vec<QueuedTrack> = (0..12).map(|i| track(&format!("song {}", i))).collect();
        let current = track("current");
        let out = render_queue(Some(&current), &upcoming, RepeatMode::Queue);

        assert!(out.starts_with("**Now playing:** current (<@3>)"));
        assert!(out.contains("`1.` song 0"));
        assert!(out.contains("`10.` song 9"));
        assert!(!out.contains("song 10"));
        assert!(out.ends_with("...and **2** more"));
    }
}
