use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use poise::serenity_prelude::{ChannelId, Http, UserId};
use rand::Rng;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::constants::{GAME_TIMEOUT, INCUBATOR_EGG};
use crate::games::{Game, GameLobby, game_from_name};
use crate::models::{Context, Data, Error};
use crate::utils::messages::format_error;
use crate::utils::validation::parse_user_mentions;

const MAX_QUEUED_GAMES: usize = 10;
const EGG_DROP_CHANCE: f64 = 1.0 / 3.0;
const WATCHDOG_PERIOD: Duration = Duration::from_secs(5);

pub type Lobbies = DashMap<ChannelId, Arc<Mutex<GameLobby>>>;

/// Store `lobby` unless the channel already has one, in a single map operation
pub fn claim_channel(lobbies: &Lobbies, channel_id: ChannelId, lobby: GameLobby) -> bool {
    match lobbies.entry(channel_id) {
        Entry::Occupied(_) => false,
        Entry::Vacant(slot) => {
            slot.insert(Arc::new(Mutex::new(lobby)));
            true
        }
    }
}

/// Games and extra players named in `multiple` arguments, in order
pub fn parse_game_queue(args: &str) -> Result<(Vec<String>, Vec<UserId>), String> {
    let mut games = Vec::new();
    for word in args.split_whitespace().filter(|w| !w.starts_with("<@")) {
        if game_from_name(word).is_none() {
            return Err(format!("`{}` isn't a game I know", word));
        }
        games.push(word.to_lowercase());
    }

    if games.is_empty() {
        return Err("You need to name at least one game".to_string());
    }
    if games.len() > MAX_QUEUED_GAMES {
        return Err(format!("You can queue at most {} games", MAX_QUEUED_GAMES));
    }

    Ok((games, parse_user_mentions(args)))
}

/// Plays a minigame. Mention users to play with them.
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    subcommands("number", "math", "multiple"),
    subcommand_required
)]
pub async fn game(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Guess the number! Between 0 and 150, with five attempts.
#[poise::command(prefix_command, slash_command, guild_only, aliases("guess"))]
pub async fn number(
    ctx: Context<'_>,
    #[description = "Users to play with"]
    #[rest]
    users: Option<String>,
) -> Result<(), Error> {
    let players = parse_user_mentions(users.as_deref().unwrap_or_default());
    start_lobby(ctx, &["number".to_string()], players).await
}

/// Solve a quick arithmetic question.
#[poise::command(prefix_command, slash_command, guild_only)]
pub async fn math(
    ctx: Context<'_>,
    #[description = "Users to play with"]
    #[rest]
    users: Option<String>,
) -> Result<(), Error> {
    let players = parse_user_mentions(users.as_deref().unwrap_or_default());
    start_lobby(ctx, &["math".to_string()], players).await
}

/// Queue several games, e.g. `game multiple number math number @friend`.
#[poise::command(prefix_command, slash_command, guild_only)]
pub async fn multiple(
    ctx: Context<'_>,
    #[description = "Games to play in order, and users to play with"]
    #[rest]
    games: String,
) -> Result<(), Error> {
    match parse_game_queue(&games) {
        Ok((games, players)) => start_lobby(ctx, &games, players).await,
        Err(message) => {
            ctx.say(format_error(&message)).await?;
            Ok(())
        }
    }
}

async fn start_lobby(
    ctx: Context<'_>,
    game_names: &[String],
    mut players: Vec<UserId>,
) -> Result<(), Error> {
    let channel_id = ctx.channel_id();
    let data = ctx.data();

    if !players.contains(&ctx.author().id) {
        players.insert(0, ctx.author().id);
    }

    let games: Vec<Box<dyn Game>> = game_names
        .iter()
        .filter_map(|name| game_from_name(name))
        .collect();
    let mut lobby = GameLobby::new(channel_id, players, games);

    let prompt = lobby.start_next(&mut rand::rng(), Instant::now());
    let Some(prompt) = prompt else {
        ctx.say(format_error("There are no games to play")).await?;
        return Ok(());
    };

    if !claim_channel(&data.lobbies, channel_id, lobby) {
        ctx.say(format_error("There's already a game running in this channel"))
            .await?;
        return Ok(());
    }
    info!(
        "Started game lobby in {} with {} game(s)",
        channel_id,
        game_names.len()
    );

    ctx.say(prompt).await?;
    spawn_watchdog(Arc::clone(&ctx.serenity_context().http), data.clone(), channel_id);
    Ok(())
}

/// Close lobbies whose running game saw no answer for `GAME_TIMEOUT`
fn spawn_watchdog(http: Arc<Http>, data: Data, channel_id: ChannelId) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(WATCHDOG_PERIOD);
        loop {
            interval.tick().await;

            let Some(lobby) = data.lobbies.get(&channel_id).map(|l| Arc::clone(l.value())) else {
                break;
            };

            let message = {
                let mut lobby = lobby.lock().await;
                if !lobby.is_expired(Instant::now(), GAME_TIMEOUT) {
                    continue;
                }
                info!(
                    "{} game in {} timed out",
                    lobby.current_game().unwrap_or("unknown"),
                    channel_id
                );
                lobby.time_out()
            };

            data.lobbies.remove(&channel_id);
            if let Err(e) = channel_id.say(&http, message).await {
                warn!("Failed to announce game timeout in {}: {}", channel_id, e);
            }
            break;
        }
    });
}

/// Announce the end of a game, pay the winner and start the next queued game
pub async fn finish_game(
    http: &Http,
    data: &Data,
    lobby: &Mutex<GameLobby>,
    channel_id: ChannelId,
    message: String,
    winner: Option<(UserId, i64)>,
) -> Result<(), Error> {
    channel_id.say(http, message).await?;

    if let Some((user_id, credits)) = winner {
        reward_winner(http, data, channel_id, user_id, credits).await;
    }

    let next = {
        let mut lobby = lobby.lock().await;
        debug!("{} game(s) left in {}", lobby.queued(), channel_id);
        lobby.start_next(&mut rand::rng(), Instant::now())
    };
    match next {
        Some(prompt) => {
            channel_id.say(http, prompt).await?;
        }
        None => {
            data.lobbies.remove(&channel_id);
            info!("Game lobby in {} finished", channel_id);
        }
    }
    Ok(())
}

async fn reward_winner(
    http: &Http,
    data: &Data,
    channel_id: ChannelId,
    user_id: UserId,
    credits: i64,
) {
    if let Err(e) = data.db.record_game_win(user_id, credits).await {
        error!("Failed to record game win for {}: {}", user_id, e);
        return;
    }

    let dropped = rand::rng().random_bool(EGG_DROP_CHANCE);
    if !dropped {
        return;
    }

    match data.db.add_item(user_id, INCUBATOR_EGG, 1).await {
        Ok(()) => {
            let note = format!("🥚 <@{}> found an incubator egg on the ground!", user_id);
            if let Err(e) = channel_id.say(http, note).await {
                warn!("Failed to announce egg drop in {}: {}", channel_id, e);
            }
        }
        Err(e) => error!("Failed to give incubator egg to {}: {}", user_id, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_game_queue() {
        let (games, players) = parse_game_queue("number Math <@5> number").unwrap();
        assert_eq!(games, vec!["number", "math", "number"]);
        assert_eq!(players, vec![UserId::new(5)]);
    }

    #[test]
    fn test_claim_channel_keeps_running_lobby() {
        let lobbies = Lobbies::new();
        let channel = ChannelId::new(9);
        let lobby = |game: &str| {
            GameLobby::new(channel, vec![UserId::new(1)], game_from_name(game).into_iter().collect())
        };

        assert!(claim_channel(&lobbies, channel, lobby("number")));
        assert!(!claim_channel(&lobbies, channel, lobby("math")));
        assert_eq!(lobbies.len(), 1);

        let running = Arc::clone(lobbies.get(&channel).unwrap().value());
        assert_eq!(running.try_lock().unwrap().queued(), 1);

        assert!(claim_channel(&lobbies, ChannelId::new(10), lobby("math")));
    }

    #[test]
    fn test_parse_game_queue_errors() {
        assert!(parse_game_queue("").is_err());
        assert!(parse_game_queue("<@5>").is_err());
        assert!(parse_game_queue("number chess").unwrap_err().contains("chess"));

        let too_many = vec!["math"; MAX_QUEUED_GAMES + 1].join(" ");
        assert!(parse_game_queue(&too_many).is_err());
    }
}
