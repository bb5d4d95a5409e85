/// Per-guild queues played through songbird
pub mod scheduler;

use async_trait::async_trait;
use dashmap::DashMap;
use poise::serenity_prelude::{ChannelId, GuildId, UserId};
use songbird::error::JoinError;
use songbird::events::{Event, EventContext, EventHandler as VoiceEventHandler, TrackEvent};
use songbird::input::{Compose, YoutubeDl};
use songbird::tracks::TrackHandle;
use songbird::{Call, Songbird};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::constants::MUSIC_LEAVE_DELAY;
use crate::metrics::TRACK_EVENTS;

pub use scheduler::{QueuedTrack, RepeatMode, TrackScheduler};

/// Errors raised while joining voice or resolving a track
#[derive(Debug)]
pub enum MusicError {
    NoVoiceManager,
    Join(JoinError),
    Resolve(String),
}

impl std::fmt::Display for MusicError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MusicError::NoVoiceManager => write!(f, "Voice support isn't available"),
            MusicError::Join(e) => write!(f, "Couldn't join the voice channel: {}", e),
            MusicError::Resolve(query) => write!(f, "Couldn't load anything for '{}'", query),
        }
    }
}

impl std::error::Error for MusicError {}

/// Whether a play query should be searched instead of loaded as a URL
pub fn is_search_query(query: &str) -> bool {
    let query = query.trim();
    !(query.starts_with("http://") || query.starts_with("https://"))
}

/// Whether no human listener is left in the bot's channel
pub fn is_alone(bot_channel: ChannelId, listeners: &[(Option<ChannelId>, bool)]) -> bool {
    !listeners
        .iter()
        .any(|(channel, is_bot)| *channel == Some(bot_channel) && !is_bot)
}

/// Audio state of one guild
pub struct GuildMusicManager {
    pub guild_id: GuildId,
    scheduler: Mutex<TrackScheduler>,
    current: Mutex<Option<TrackHandle>>,
    awaiting_death: Mutex<Option<JoinHandle<()>>>,
}

impl GuildMusicManager {
    fn new(guild_id: GuildId) -> Self {
        Self {
            guild_id,
            scheduler: Mutex::new(TrackScheduler::new()),
            current: Mutex::new(None),
            awaiting_death: Mutex::new(None),
        }
    }

    pub async fn scheduler(&self) -> MutexGuard<'_, TrackScheduler> {
        self.scheduler.lock().await
    }

    /// Stop the running track, the end event starts the next one
    pub async fn skip(&self) -> bool {
        self.scheduler.lock().await.request_skip();
        match self.current.lock().await.as_ref() {
            Some(handle) => handle.stop().is_ok(),
            None => false,
        }
    }

    /// Clear the queue and stop playback
    pub async fn stop(&self) {
        self.scheduler.lock().await.clear();
        if let Some(handle) = self.current.lock().await.take() {
            let _ = handle.stop();
        }
    }

    /// Cancel a pending leave, true if one was scheduled
    pub async fn cancel_leave(&self) -> bool {
        match self.awaiting_death.lock().await.take() {
            Some(task) => {
                task.abort();
                true
            }
            None => false,
        }
    }
}

/// Every guild's audio state
pub struct MusicManager {
    guilds: DashMap<GuildId, Arc<GuildMusicManager>>,
    http: reqwest::Client,
}

impl Default for MusicManager {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

impl MusicManager {
    /// `http` resolves and streams inputs through yt-dlp
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            guilds: DashMap::new(),
            http,
        }
    }

    pub fn get(&self, guild_id: GuildId) -> Option<Arc<GuildMusicManager>> {
        self.guilds.get(&guild_id).map(|gm| Arc::clone(gm.value()))
    }

    pub fn get_or_create(&self, guild_id: GuildId) -> Arc<GuildMusicManager> {
        Arc::clone(
            self.guilds
                .entry(guild_id)
                .or_insert_with(|| Arc::new(GuildMusicManager::new(guild_id)))
                .value(),
        )
    }

    /// Stop everything in a guild and forget its state
    pub async fn reset(&self, guild_id: GuildId) {
        let Some((_, gm)) = self.guilds.remove(&guild_id) else {
            return;
        };
        gm.cancel_leave().await;
        gm.stop().await;
        info!(
            "Reset music manager for guild {}, {} guild(s) still active",
            guild_id,
            self.len()
        );
    }

    /// Tracks waiting in every guild's queue
    pub async fn total_queue_size(&self) -> usize {
        let managers: Vec<Arc<GuildMusicManager>> =
            self.guilds.iter().map(|gm| Arc::clone(gm.value())).collect();

        let mut total = 0;
        for gm in managers {
            total += gm.scheduler().await.len();
        }
        total
    }

    pub fn len(&self) -> usize {
        self.guilds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guilds.is_empty()
    }

    /// Join `channel_id`, resolve `query` and queue it.
    ///
    /// Returns the track and whether it started playing right away.
    pub async fn load_and_play(
        self: &Arc<Self>,
        songbird: Arc<Songbird>,
        guild_id: GuildId,
        channel_id: ChannelId,
        query: &str,
        requester: UserId,
    ) -> Result<(QueuedTrack, bool), MusicError> {
        let call = songbird
            .join(guild_id, channel_id)
            .await
            .map_err(MusicError::Join)?;

        let track = self.resolve(query, requester).await?;
        let gm = self.get_or_create(guild_id);
        gm.cancel_leave().await;

        let start = gm.scheduler().await.enqueue(track.clone());
        let started = start.is_some();
        if let Some(track) = start {
            self.play(&gm, call, &track).await;
        }

        Ok((track, started))
    }

    async fn resolve(&self, query: &str, requester: UserId) -> Result<QueuedTrack, MusicError> {
        let query = query.trim();
        let is_search = is_search_query(query);

        let mut source = if is_search {
            TRACK_EVENTS.with_label_values(&["searched"]).inc();
            YoutubeDl::new_search(self.http.clone(), query.to_string())
        } else {
            YoutubeDl::new(self.http.clone(), query.to_string())
        };

        match source.aux_metadata().await {
            Ok(metadata) => {
                TRACK_EVENTS.with_label_values(&["loaded"]).inc();
                let url = metadata.source_url.clone();
                Ok(QueuedTrack {
                    title: metadata.title.unwrap_or_else(|| query.to_string()),
                    is_search: url.is_none() && is_search,
                    source: url.unwrap_or_else(|| query.to_string()),
                    requester,
                })
            }
            Err(e) => {
                TRACK_EVENTS.with_label_values(&["failed"]).inc();
                warn!("Failed to load track '{}': {}", query, e);
                Err(MusicError::Resolve(query.to_string()))
            }
        }
    }

    async fn play(self: &Arc<Self>, gm: &GuildMusicManager, call: Arc<Mutex<Call>>, track: &QueuedTrack) {
        let source = if track.is_search {
            YoutubeDl::new_search(self.http.clone(), track.source.clone())
        } else {
            YoutubeDl::new(self.http.clone(), track.source.clone())
        };

        let handle = call.lock().await.play_only_input(source.into());
        let notifier = TrackEndNotifier {
            manager: Arc::clone(self),
            guild_id: gm.guild_id,
            call,
        };
        for event in [TrackEvent::End, TrackEvent::Error] {
            if let Err(e) = handle.add_event(Event::Track(event), notifier.clone()) {
                warn!("Failed to watch track in guild {}: {}", gm.guild_id, e);
            }
        }

        debug!("Playing '{}' in guild {}", track.title, gm.guild_id);
        *gm.current.lock().await = Some(handle);
    }

    /// Leave the guild's voice channel after `MUSIC_LEAVE_DELAY` unless cancelled
    pub async fn schedule_leave(self: &Arc<Self>, songbird: Arc<Songbird>, guild_id: GuildId) {
        let Some(gm) = self.get(guild_id) else {
            return;
        };

        let mut awaiting = gm.awaiting_death.lock().await;
        if awaiting.is_some() {
            return;
        }

        let manager = Arc::clone(self);
        let gm_task = Arc::clone(&gm);
        *awaiting = Some(tokio::spawn(async move {
            tokio::time::sleep(MUSIC_LEAVE_DELAY).await;
            // drop our own handle so reset doesn't abort this task
            gm_task.awaiting_death.lock().await.take();

            if let Err(e) = songbird.remove(guild_id).await {
                warn!("Failed to leave voice in guild {}: {}", guild_id, e);
            }
            manager.reset(guild_id).await;
            info!("Left voice in guild {} after being alone", guild_id);
        }));
        debug!("Scheduled voice leave for guild {}", guild_id);
    }
}

#[derive(Clone)]
struct TrackEndNotifier {
    manager: Arc<MusicManager>,
    guild_id: GuildId,
    call: Arc<Mutex<Call>>,
}

#[async_trait]
impl VoiceEventHandler for TrackEndNotifier {
    async fn act(&self, _ctx: &EventContext<'_>) -> Option<Event> {
        let gm = self.manager.get(self.guild_id)?;
        let next = gm.scheduler().await.next_track();

        match next {
            Some(track) => {
                self.manager
                    .play(&gm, Arc::clone(&self.call), &track)
                    .await;
            }
            None => {
                gm.current.lock().await.take();
                debug!("Queue finished in guild {}", self.guild_id);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_search_query() {
        assert!(is_search_query("never gonna give you up"));
        assert!(!is_search_query("https://youtu.be/dQw4w9WgXcQ"));
        assert!(!is_search_query("  http://example.com/song.mp3"));
    }

    #[test]
    fn test_is_alone() {
        let bot_channel = ChannelId::new(10);
        let other = ChannelId::new(11);

        assert!(is_alone(bot_channel, &[]));
        assert!(is_alone(bot_channel, &[(Some(other), false), (Some(bot_channel), true)]));
        assert!(!is_alone(bot_channel, &[(Some(bot_channel), false)]));
        assert!(is_alone(bot_channel, &[(None, false)]));
    }

    #[tokio::test]
    async fn test_manager_lifecycle() {
        let manager = MusicManager::default();
        let guild = GuildId::new(1);

        let gm = manager.get_or_create(guild);
        gm.scheduler().await.enqueue(QueuedTrack {
            title: "a".to_string(),
            source: "a".to_string(),
            is_search: true,
            requester: UserId::new(2),
        });
        gm.scheduler().await.enqueue(QueuedTrack {
            title: "b".to_string(),
            source: "b".to_string(),
            is_search: true,
            requester: UserId::new(2),
        });

        assert_eq!(manager.len(), 1);
        assert_eq!(manager.total_queue_size().await, 1);
        assert!(Arc::ptr_eq(&gm, &manager.get_or_create(guild)));

        manager.reset(guild).await;
        assert!(manager.is_empty());
        assert!(manager.get(guild).is_none());
        assert!(gm.scheduler().await.is_empty());
        assert_eq!(manager.total_queue_size().await, 0);
    }
}
