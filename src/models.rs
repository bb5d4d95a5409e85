use dashmap::DashMap;
use poise::serenity_prelude::{ChannelId, GuildId};
use std::sync::Arc;
use tokio::sync::{Mutex, watch};

use crate::config::Config;
use crate::database::Database;
use crate::games::GameLobby;
use crate::music::MusicManager;
use crate::options::OptionRegistry;
use crate::services::birthday_cacher::BirthdayCacher;
use crate::services::guild_birthdays::GuildBirthdayCache;
use crate::services::weeb::WeebClient;

/// Bot state shared across all handlers
#[derive(Clone)]
pub struct Data {
    /// Database connection
    pub db: Database,
    /// Configuration loaded at startup
    pub config: Arc<Config>,
    /// Process-wide birthday cache
    pub birthdays: Arc<BirthdayCacher>,
    /// Per-guild birthday views derived from `birthdays`
    pub guild_birthdays: Arc<GuildBirthdayCache>,
    /// Server configuration options for the `opts` command
    pub options: Arc<OptionRegistry>,
    /// Custom prefixes keyed by guild
    pub prefixes: Arc<DashMap<GuildId, String>>,
    /// Running game lobbies keyed by channel
    pub lobbies: Arc<DashMap<ChannelId, Arc<Mutex<GameLobby>>>>,
    /// Per-guild audio sessions
    pub music: Arc<MusicManager>,
    /// weeb.sh image client
    pub weeb: WeebClient,
    /// Wakes the schedule manager after a configuration change
    pub schedule_reload_tx: Arc<watch::Sender<u64>>,
}

impl Data {
    /// Create a new Data instance with the given database connection
    pub fn new(db: Database, config: Config, options: OptionRegistry) -> Self {
        let guild_birthdays = Arc::new(GuildBirthdayCache::default());
        let birthdays = Arc::new(BirthdayCacher::new(Arc::clone(&guild_birthdays)));
        let weeb = WeebClient::new(config.weeb_api_key.clone());
        let (schedule_reload_tx, _) = watch::channel(0u64);

        Self {
            db,
            config: Arc::new(config),
            birthdays,
            guild_birthdays,
            options: Arc::new(options),
            prefixes: Arc::new(DashMap::new()),
            lobbies: Arc::new(DashMap::new()),
            music: Arc::new(MusicManager::new(weeb.http().clone())),
            weeb,
            schedule_reload_tx: Arc::new(schedule_reload_tx),
        }
    }

    /// Load existing data from the database into memory
    pub async fn load_from_database(&self) -> Result<(), Error> {
        match self.db.get_all_guild_prefixes().await {
            Ok(prefixes) => {
                for (guild_id, prefix) in prefixes {
                    self.prefixes.insert(guild_id, prefix);
                }
                tracing::info!("Loaded {} custom prefixes from database", self.prefixes.len());
            }
            Err(e) => {
                tracing::warn!("Failed to load custom prefixes from database: {}", e);
            }
        }

        Ok(())
    }

    /// Wake the schedule manager so it picks up new schedules
    pub fn reload_schedules(&self) {
        self.schedule_reload_tx.send_modify(|val| *val += 1);
    }

    /// Every prefix a message can start with in this guild
    pub fn prefixes_for(&self, guild_id: Option<GuildId>) -> Vec<String> {
        let mut prefixes = vec![self.config.prefix.clone()];
        if let Some(custom) = guild_id.and_then(|id| self.prefixes.get(&id)) {
            prefixes.push(custom.clone());
        }
        prefixes
    }
}

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
