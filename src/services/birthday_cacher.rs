/// Process-wide birthday cache, refreshed from the database in the background
use poise::serenity_prelude::UserId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::database::{BirthdayRow, Database};
use crate::metrics::BIRTHDAY_CACHE_SIZE;
use crate::services::guild_birthdays::GuildBirthdayCache;
use crate::utils::datetime::is_valid_date;

/// Day, month and optional year of a user's birthday
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BirthdayData {
    pub day: u32,
    pub month: u32,
    pub year: Option<i32>,
}

impl BirthdayData {
    /// Stable ordering key for day/month listings
    pub fn sort_key(&self) -> u32 {
        self.day + (self.month << 5)
    }

    pub fn is_on(&self, month: u32, day: u32) -> bool {
        self.month == month && self.day == day
    }
}

pub struct BirthdayCacher {
    birthdays: RwLock<Arc<HashMap<UserId, BirthdayData>>>,
    done: AtomicBool,
    guild_cache: Arc<GuildBirthdayCache>,
}

impl BirthdayCacher {
    pub fn new(guild_cache: Arc<GuildBirthdayCache>) -> Self {
        Self {
            birthdays: RwLock::new(Arc::new(HashMap::new())),
            done: AtomicBool::new(false),
            guild_cache,
        }
    }

    /// Rebuild the cache from raw rows, returns the new size
    pub fn refresh_from_rows(&self, rows: Vec<BirthdayRow>) -> usize {
        let mut birthdays = HashMap::with_capacity(rows.len());

        for (user_id, month, day, year) in rows {
            if user_id <= 0 || !is_valid_date(month, day) {
                warn!(
                    "Skipping invalid birthday row for user {}: {}-{}",
                    user_id, day, month
                );
                continue;
            }

            let user_id = UserId::new(user_id as u64);
            if birthdays.contains_key(&user_id) {
                continue;
            }

            birthdays.insert(
                user_id,
                BirthdayData {
                    day: day as u32,
                    month: month as u32,
                    year,
                },
            );
        }

        let size = birthdays.len();
        match self.birthdays.write() {
            Ok(mut guard) => *guard = Arc::new(birthdays),
            Err(poisoned) => *poisoned.into_inner() = Arc::new(birthdays),
        }

        // Empty on first startup, nothing to clear then
        if !self.guild_cache.is_empty() {
            info!("Clearing previous guild birthday cache");
            self.guild_cache.invalidate_all();
        }

        self.done.store(true, Ordering::Release);
        BIRTHDAY_CACHE_SIZE.set(size as i64);
        size
    }

    /// Reload every birthday from the database
    pub async fn refresh(&self, db: &Database) -> Result<usize, sqlx::Error> {
        let rows = db.get_all_birthdays().await?;
        debug!("Loaded {} birthday rows", rows.len());
        let size = self.refresh_from_rows(rows);
        info!("Cached all birthdays. Current size is {}", size);
        Ok(size)
    }

    /// Refresh now, then once every `period`
    pub fn spawn_refresh_task(self: &Arc<Self>, db: Database, period: Duration) {
        let cacher = Arc::clone(self);
        tokio::spawn(async move {
            info!("Caching birthdays...");
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                if let Err(e) = cacher.refresh(&db).await {
                    error!("Failed to refresh birthday cache: {}", e);
                }
            }
        });
    }

    /// Current map, shared without copying
    pub fn snapshot(&self) -> Arc<HashMap<UserId, BirthdayData>> {
        match self.birthdays.read() {
            Ok(guard) => Arc::clone(&*guard),
            Err(poisoned) => Arc::clone(&*poisoned.into_inner()),
        }
    }

    pub fn get(&self, user_id: UserId) -> Option<BirthdayData> {
        self.snapshot().get(&user_id).copied()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// Whether the first refresh has completed
    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashmap::DashMap;
    use poise::serenity_prelude::GuildId;

    fn cacher() -> (Arc<GuildBirthdayCache>, BirthdayCacher) {
        let guild_cache = Arc::new(GuildBirthdayCache::default());
        let cacher = BirthdayCacher::new(Arc::clone(&guild_cache));
        (guild_cache, cacher)
    }

    #[test]
    fn test_refresh_builds_map() {
        let (_, cacher) = cacher();
        assert!(!cacher.is_done());

        let size = cacher.refresh_from_rows(vec![(1, 2, 13, None), (2, 12, 31, Some(1990))]);

        assert_eq!(size, 2);
        assert!(cacher.is_done());
        assert_eq!(
            cacher.get(UserId::new(1)),
            Some(BirthdayData {
                day: 13,
                month: 2,
                year: None
            })
        );
        assert_eq!(cacher.get(UserId::new(2)).and_then(|b| b.year), Some(1990));
    }

    #[test]
    fn test_refresh_skips_invalid_rows() {
        let (_, cacher) = cacher();
        let size = cacher.refresh_from_rows(vec![(1, 13, 1, None), (2, 2, 30, None), (3, 4, 1, None)]);
        assert_eq!(size, 1);
        assert!(cacher.get(UserId::new(3)).is_some());
    }

    #[test]
    fn test_refresh_keeps_first_duplicate() {
        let (_, cacher) = cacher();
        cacher.refresh_from_rows(vec![(1, 3, 3, None), (1, 4, 4, None)]);
        assert_eq!(cacher.get(UserId::new(1)).map(|b| b.month), Some(3));
    }

    #[test]
    fn test_refresh_replaces_whole_map() {
        let (_, cacher) = cacher();
        cacher.refresh_from_rows(vec![(1, 3, 3, None)]);
        cacher.refresh_from_rows(vec![(2, 4, 4, None)]);
        assert!(cacher.get(UserId::new(1)).is_none());
        assert_eq!(cacher.len(), 1);
    }

    #[test]
    fn test_refresh_invalidates_guild_views() {
        let (guild_cache, cacher) = cacher();
        cacher.refresh_from_rows(vec![(1, 3, 3, None)]);

        let view = Arc::new(DashMap::new());
        view.insert(UserId::new(1), cacher.get(UserId::new(1)).unwrap());
        guild_cache.insert(GuildId::new(10), view);
        assert_eq!(guild_cache.len(), 1);

        cacher.refresh_from_rows(vec![(1, 3, 3, None)]);
        assert!(guild_cache.is_empty());
    }

    #[test]
    fn test_sort_key_orders_by_month_then_day() {
        let jan_31 = BirthdayData {
            day: 31,
            month: 1,
            year: None,
        };
        let feb_1 = BirthdayData {
            day: 1,
            month: 2,
            year: None,
        };
        assert!(jan_31.sort_key() < feb_1.sort_key());
    }
}
