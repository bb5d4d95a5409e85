use poise::serenity_prelude::{self as serenity, Message};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, warn};

use crate::commands::game::finish_game;
use crate::games::LobbyStep;
use crate::metrics::MESSAGES_RECEIVED;
use crate::models::Data;

/// Count every received message, returns whether it can reach a game lobby
fn record_message(from_bot: bool) -> bool {
    MESSAGES_RECEIVED.inc();
    !from_bot
}

/// Count messages and feed answers to the channel's game lobby
pub async fn handle_message(ctx: &serenity::Context, message: &Message, data: &Data) {
    if !record_message(message.author.bot) {
        return;
    }

    let Some(lobby) = data
        .lobbies
        .get(&message.channel_id)
        .map(|lobby| Arc::clone(lobby.value()))
    else {
        return;
    };

    let prefixes = data.prefixes_for(message.guild_id);
    let step = lobby.lock().await.handle_message(
        message.author.id,
        &message.content,
        &prefixes,
        Instant::now(),
    );

    match step {
        LobbyStep::Ignored => {}
        LobbyStep::Reply(text) => {
            if let Err(e) = message.channel_id.say(&ctx.http, text).await {
                warn!("Failed to answer player in {}: {}", message.channel_id, e);
            }
        }
        LobbyStep::GameOver { message: text, winner } => {
            debug!("Game over in {}", message.channel_id);
            if let Err(e) = finish_game(
                &ctx.http,
                data,
                &lobby,
                message.channel_id,
                text,
                winner,
            )
            .await
            {
                error!("Failed to finish game in {}: {}", message.channel_id, e);
            }
        }
    }
}
