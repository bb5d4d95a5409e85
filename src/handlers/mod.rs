/// Gateway event handlers
mod message;
mod voice;

use poise::serenity_prelude::{self as serenity, FullEvent};

use crate::models::{Data, Error};

pub use message::handle_message;
pub use voice::handle_voice_state_update;

/// Route the gateway events the bot cares about
pub async fn event_handler(
    ctx: &serenity::Context,
    event: &FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        FullEvent::Message { new_message } => handle_message(ctx, new_message, data).await,
        FullEvent::VoiceStateUpdate { new, .. } => handle_voice_state_update(ctx, new, data).await,
        _ => {}
    }
    Ok(())
}
