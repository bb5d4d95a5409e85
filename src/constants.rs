use std::time::Duration;

/// Prefix used when neither the environment nor the guild sets one
pub const DEFAULT_PREFIX: &str = "~>";

/// Log directive for the application
pub const LOG_DIRECTIVE: &str = "kitebot=info";

/// Maximum number of guild birthday views kept in memory
pub const GUILD_BIRTHDAY_CACHE_SIZE: usize = 2500;

/// Default hours between two birthday cache refreshes
pub const DEFAULT_BIRTHDAY_REFRESH_HOURS: u64 = 23;

/// Maximum number of entries shown by the birthday list commands
pub const MAX_BIRTHDAY_LIST_ENTRIES: usize = 100;

/// Page size (in characters) of paginated list replies
pub const LIST_PAGE_SIZE: usize = 1000;

/// Time a game waits for an answer before timing out
pub const GAME_TIMEOUT: Duration = Duration::from_secs(60);

/// Time the bot stays alone in a voice channel before leaving
pub const MUSIC_LEAVE_DELAY: Duration = Duration::from_secs(120);

/// Interval between two guild/user gauge updates
pub const METRICS_UPDATE_PERIOD: Duration = Duration::from_secs(15);

/// Cost of renaming a pet
pub const PET_RENAME_COST: i64 = 500;

/// Pet slots a new player starts with
pub const DEFAULT_PET_SLOTS: i32 = 4;

/// Item needed to incubate a pet
pub const INCUBATOR_EGG: &str = "incubator_egg";
