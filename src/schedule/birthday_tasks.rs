use poise::serenity_prelude::{self as serenity, CreateMessage, GuildId, UserId};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::metrics::BIRTHDAYS_LOGGED;
use crate::models::{Data, Error};
use crate::services::birthday_cacher::BirthdayData;
use crate::services::guild_birthdays::{GuildBirthdays, guild_birthday_map};
use crate::utils::datetime::{format_date_display, is_leap_year, today_in};
use crate::utils::message_formatter::{Celebrant, age_this_year, build_announcement};
use crate::utils::role_logic::{RoleAction, determine_role_action};
use crate::utils::timezone::parse_timezone_or_utc;

/// Users of a guild view celebrating on the given date.
///
/// 29-02 birthdays are celebrated on 28-02 in non-leap years.
pub fn todays_celebrants(
    view: &GuildBirthdays,
    month: u32,
    day: u32,
    year: i32,
) -> Vec<(UserId, BirthdayData)> {
    let leap_shift = month == 2 && day == 28 && !is_leap_year(year);

    let mut celebrants: Vec<(UserId, BirthdayData)> = view
        .iter()
        .filter(|entry| {
            let data = entry.value();
            data.is_on(month, day) || (leap_shift && data.is_on(2, 29))
        })
        .map(|entry| (*entry.key(), *entry.value()))
        .collect();

    celebrants.sort_by_key(|(user_id, _)| *user_id);
    celebrants
}

/// Today's birthdays of a guild, in the guild's timezone
async fn guild_celebrants(
    data: &Data,
    guild_id: GuildId,
) -> Result<(Vec<(UserId, BirthdayData)>, u32, u32, i32), Error> {
    let timezone = parse_timezone_or_utc(&data.db.get_guild_timezone(guild_id).await?);
    let (month, day, year) = today_in(&timezone);

    if !data.birthdays.is_done() {
        warn!(
            "Birthday cache isn't ready, skipping birthdays of guild {}",
            guild_id
        );
        return Ok((Vec::new(), month, day, year));
    }

    let allowed = data.db.get_allowed_birthdays(guild_id).await?;
    let view = guild_birthday_map(&data.guild_birthdays, &data.birthdays, guild_id, &allowed);

    Ok((todays_celebrants(&view, month, day, year), month, day, year))
}

/// Announce today's birthdays in the guild's birthday channel
pub async fn run_birthday_check(
    http: &Arc<serenity::Http>,
    data: &Data,
    guild_id: GuildId,
) -> Result<(), Error> {
    let Some(config) = data.db.get_birthday_channel(guild_id).await? else {
        info!("No birthday channel configured for guild {}", guild_id);
        return Ok(());
    };

    let (celebrants, month, day, year) = guild_celebrants(data, guild_id).await?;
    info!(
        "Checking birthdays for {}/{} in guild {}: {} found",
        day,
        month,
        guild_id,
        celebrants.len()
    );
    if celebrants.is_empty() {
        return Ok(());
    }

    let mut entries = Vec::with_capacity(celebrants.len());
    for (user_id, birthday) in &celebrants {
        // users who left the guild aren't announced
        let Ok(member) = guild_id.member(http, *user_id).await else {
            continue;
        };
        entries.push(Celebrant {
            name: member.display_name().to_string(),
            mention: format!("<@{}>", user_id),
            age: age_this_year(birthday.year, year),
        });
    }

    if entries.is_empty() {
        info!("No birthday users are in guild {}", guild_id);
        return Ok(());
    }

    let date = format_date_display(month as i32, day as i32);
    let content = build_announcement(&entries, &config.templates, &date);

    config
        .channel_id
        .send_message(http, CreateMessage::new().content(content))
        .await?;

    BIRTHDAYS_LOGGED.inc_by(entries.len() as u64);
    info!(
        "Sent birthday announcement for {} user(s) in guild {}",
        entries.len(),
        guild_id
    );
    Ok(())
}

/// Update birthday roles for every guild in the cache
pub async fn run_birthday_role_update_all_guilds(
    http: &Arc<serenity::Http>,
    cache: &Arc<serenity::Cache>,
    data: &Data,
) -> Result<(), Error> {
    for guild_id in cache.guilds() {
        if let Err(e) = run_birthday_role_update(http, data, guild_id).await {
            error!("Failed to update birthday roles for guild {}: {}", guild_id, e);
        }
    }
    Ok(())
}

/// Give the birthday role to today's celebrants and take it from everyone else
pub async fn run_birthday_role_update(
    http: &Arc<serenity::Http>,
    data: &Data,
    guild_id: GuildId,
) -> Result<(), Error> {
    let Some(role_id) = data
        .db
        .get_birthday_channel(guild_id)
        .await?
        .and_then(|config| config.role_id)
    else {
        info!("No birthday role configured for guild {}", guild_id);
        return Ok(());
    };

    let (celebrants, month, day, _) = guild_celebrants(data, guild_id).await?;
    let celebrating: HashSet<UserId> = celebrants.into_iter().map(|(id, _)| id).collect();
    info!(
        "Updating birthday roles for {}/{} in guild {}",
        day, month, guild_id
    );

    let members = guild_id.members(http, None, None).await?;

    for member in members {
        let action = determine_role_action(
            celebrating.contains(&member.user.id),
            member.roles.contains(&role_id),
        );

        let result = match action {
            RoleAction::Grant => member.add_role(http, role_id).await,
            RoleAction::Revoke => member.remove_role(http, role_id).await,
            RoleAction::Keep => continue,
        };

        match result {
            Ok(()) => info!(
                "{} the birthday role of user {} in guild {}",
                action.verb(),
                member.user.id,
                guild_id
            ),
            Err(e) => error!(
                "Failed to update birthday role of user {} in guild {}: {}",
                member.user.id, guild_id, e
            ),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashmap::DashMap;

    fn view(entries: &[(u64, u32, u32)]) -> GuildBirthdays {
        let map: DashMap<UserId, BirthdayData> = entries
            .iter()
            .map(|(id, day, month)| {
                (
                    UserId::new(*id),
                    BirthdayData {
                        day: *day,
                        month: *month,
                        year: None,
                    },
                )
            })
            .collect();
        Arc::new(map)
    }

    fn ids(celebrants: &[(UserId, BirthdayData)]) -> Vec<u64> {
        celebrants.iter().map(|(id, _)| id.get()).collect()
    }

    #[test]
    fn test_todays_celebrants() {
        let view = view(&[(3, 15, 3), (1, 15, 3), (2, 16, 3)]);
        assert_eq!(ids(&todays_celebrants(&view, 3, 15, 2025)), vec![1, 3]);
        assert!(todays_celebrants(&view, 4, 15, 2025).is_empty());
    }

    #[test]
    fn test_leap_day_birthdays() {
        let view = view(&[(1, 29, 2), (2, 28, 2)]);
        assert_eq!(ids(&todays_celebrants(&view, 2, 28, 2025)), vec![1, 2]);
        assert_eq!(ids(&todays_celebrants(&view, 2, 28, 2024)), vec![2]);
        assert_eq!(ids(&todays_celebrants(&view, 2, 29, 2024)), vec![1]);
    }
}
