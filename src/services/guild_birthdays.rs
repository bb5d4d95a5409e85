/// Per-guild birthday views derived from the global cache
use dashmap::DashMap;
use poise::serenity_prelude::{GuildId, UserId};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::constants::{GUILD_BIRTHDAY_CACHE_SIZE, LIST_PAGE_SIZE, MAX_BIRTHDAY_LIST_ENTRIES};
use crate::services::birthday_cacher::{BirthdayCacher, BirthdayData};
use crate::utils::messages::code_block;
use crate::utils::string_utils::{divide_string, limit};

pub type GuildBirthdays = Arc<DashMap<UserId, BirthdayData>>;

struct LruState {
    entries: HashMap<GuildId, (GuildBirthdays, u64)>,
    order: BTreeMap<u64, GuildId>,
    tick: u64,
}

impl LruState {
    fn touch(&mut self, guild_id: GuildId) {
        self.tick += 1;
        let tick = self.tick;
        if let Some((_, last_used)) = self.entries.get_mut(&guild_id) {
            self.order.remove(last_used);
            *last_used = tick;
            self.order.insert(tick, guild_id);
        }
    }
}

/// Bounded cache of guild views, evicting the least recently used guild at capacity.
///
/// Entries never expire on their own: the whole cache is dropped whenever
/// the global birthday cache refreshes.
pub struct GuildBirthdayCache {
    capacity: usize,
    state: Mutex<LruState>,
}

impl Default for GuildBirthdayCache {
    fn default() -> Self {
        Self::with_capacity(GUILD_BIRTHDAY_CACHE_SIZE)
    }
}

impl GuildBirthdayCache {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(LruState {
                entries: HashMap::new(),
                order: BTreeMap::new(),
                tick: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, guild_id: GuildId) -> Option<GuildBirthdays> {
        let mut state = self.lock();
        let view = state.entries.get(&guild_id).map(|(view, _)| Arc::clone(view))?;
        state.touch(guild_id);
        Some(view)
    }

    pub fn insert(&self, guild_id: GuildId, view: GuildBirthdays) {
        let mut state = self.lock();

        if let Some((_, last_used)) = state.entries.remove(&guild_id) {
            state.order.remove(&last_used);
        } else if state.entries.len() >= self.capacity {
            if let Some((_, evicted)) = state.order.pop_first() {
                state.entries.remove(&evicted);
            }
        }

        state.tick += 1;
        let tick = state.tick;
        state.entries.insert(guild_id, (view, tick));
        state.order.insert(tick, guild_id);
    }

    pub fn invalidate_all(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.order.clear();
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Birthdays of the allowed users of a guild.
///
/// A cached non-empty view is returned as is. Otherwise the view is built from
/// the global cache and kept only when it holds at least one birthday.
pub fn guild_birthday_map(
    cache: &GuildBirthdayCache,
    cacher: &BirthdayCacher,
    guild_id: GuildId,
    allowed: &[UserId],
) -> GuildBirthdays {
    if let Some(cached) = cache.get(guild_id).filter(|view| !view.is_empty()) {
        return cached;
    }

    let global = cacher.snapshot();
    let view: DashMap<UserId, BirthdayData> = allowed
        .iter()
        .filter_map(|user_id| global.get(user_id).map(|data| (*user_id, *data)))
        .collect();
    let view = Arc::new(view);

    if !view.is_empty() {
        cache.insert(guild_id, Arc::clone(&view));
    }

    view
}

/// Why a guild's birthday list can't be shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewUnavailable {
    CacheNotReady,
    NoGlobalBirthdays,
    NoGuildBirthdays,
}

impl ViewUnavailable {
    pub fn message(self) -> &'static str {
        match self {
            ViewUnavailable::CacheNotReady => {
                "The birthday cache isn't running yet, try again in a few minutes"
            }
            ViewUnavailable::NoGlobalBirthdays => "No one has set a birthday yet",
            ViewUnavailable::NoGuildBirthdays => "There are no birthdays to show in this server",
        }
    }
}

/// Checks that don't need the guild's allowed list, run before querying it
pub fn check_cacher(cacher: &BirthdayCacher) -> Result<(), ViewUnavailable> {
    if !cacher.is_done() {
        return Err(ViewUnavailable::CacheNotReady);
    }
    if cacher.is_empty() {
        return Err(ViewUnavailable::NoGlobalBirthdays);
    }
    Ok(())
}

/// The guild view to list, once `allowed` has been loaded
pub fn listable_view(
    cache: &GuildBirthdayCache,
    cacher: &BirthdayCacher,
    guild_id: GuildId,
    allowed: &[UserId],
) -> Result<GuildBirthdays, ViewUnavailable> {
    check_cacher(cacher)?;
    if allowed.is_empty() {
        return Err(ViewUnavailable::NoGuildBirthdays);
    }

    let view = guild_birthday_map(cache, cacher, guild_id, allowed);
    if view.is_empty() {
        return Err(ViewUnavailable::NoGuildBirthdays);
    }
    Ok(view)
}

/// Add a newly allowed user to the guild's cached view, if the guild has one.
///
/// Returns whether a view was patched.
pub fn allow_in_view(
    cache: &GuildBirthdayCache,
    cacher: &BirthdayCacher,
    guild_id: GuildId,
    user_id: UserId,
) -> bool {
    match (cache.get(guild_id), cacher.get(user_id)) {
        (Some(view), Some(birthday)) => {
            view.insert(user_id, birthday);
            true
        }
        _ => false,
    }
}

/// Drop a user from the guild's cached view. Returns whether they were in it.
pub fn deny_in_view(cache: &GuildBirthdayCache, guild_id: GuildId, user_id: UserId) -> bool {
    cache
        .get(guild_id)
        .is_some_and(|view| view.remove(&user_id).is_some())
}

/// Entries to list, ordered by month then day, optionally for a single month
pub fn select_birthdays(view: &GuildBirthdays, month: Option<u32>) -> Vec<(UserId, BirthdayData)> {
    let mut entries: Vec<(UserId, BirthdayData)> = view
        .iter()
        .filter(|entry| month.is_none_or(|month| entry.value().month == month))
        .map(|entry| (*entry.key(), *entry.value()))
        .collect();

    entries.sort_by_key(|(user_id, data)| (data.sort_key(), *user_id));
    entries.truncate(MAX_BIRTHDAY_LIST_ENTRIES);
    entries
}

/// Render `(display name, birthday)` pairs as diff code blocks split into pages
pub fn render_birthday_pages(entries: &[(String, BirthdayData)]) -> Vec<String> {
    let body: String = entries
        .iter()
        .map(|(name, data)| format!("+ {:<20} : {}-{} \n", limit(name, 20), data.day, data.month))
        .collect();

    divide_string(LIST_PAGE_SIZE, '\n', &body)
        .into_iter()
        .map(|part| code_block("diff", &part))
        .collect()
}
