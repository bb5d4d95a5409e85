use chrono::Datelike;
use poise::serenity_prelude::UserId;
use tracing::{debug, error, info};

use crate::models::{Context, Error};
use crate::services::birthday_cacher::BirthdayData;
use crate::services::guild_birthdays::{
    GuildBirthdays, allow_in_view, check_cacher, deny_in_view, listable_view,
    render_birthday_pages, select_birthdays,
};
use crate::utils::datetime::{get_month_name, parse_birthday};
use crate::utils::messages::{build_database_error, format_error, format_success};
use crate::utils::validation::require_guild;

/// Sets your birthday date. Use `dd-mm`, e.g. `13-02`.
///
/// Slash users go through `/birthday set`, Discord can't run a group root.
#[poise::command(
    prefix_command,
    slash_command,
    subcommands("set", "allowserver", "denyserver", "remove", "list", "month"),
    subcommand_required = false
)]
pub async fn birthday(
    ctx: Context<'_>,
    #[description = "Your birthday, dd-mm"] date: Option<String>,
) -> Result<(), Error> {
    save_birthday(ctx, date.as_deref().unwrap_or_default()).await
}

/// Sets your birthday date. Use `dd-mm`, e.g. `13-02`.
#[poise::command(prefix_command, slash_command)]
pub async fn set(
    ctx: Context<'_>,
    #[description = "Your birthday, dd-mm"] date: String,
) -> Result<(), Error> {
    save_birthday(ctx, &date).await
}

async fn save_birthday(ctx: Context<'_>, date: &str) -> Result<(), Error> {
    let parsed = match parse_birthday(date) {
        Ok(parsed) => parsed,
        Err(e) => {
            ctx.say(format_error(&e.to_string())).await?;
            return Ok(());
        }
    };

    let user_id = ctx.author().id;
    if let Err(e) = ctx
        .data()
        .db
        .upsert_birthday(user_id, parsed.month as i32, parsed.day as i32, None)
        .await
    {
        error!("Failed to save birthday for {}: {}", user_id, e);
        ctx.say(build_database_error()).await?;
        return Ok(());
    }

    let mut reply = format!(
        "Saved your birthday as **{}**. It will show up in lists after the next cache refresh.",
        parsed.display()
    );
    if parsed.leap {
        reply.push_str("\nOn non-leap years it will be celebrated on the 28th of February.");
    }
    reply.push_str("\nUse `birthday allowserver` to let this server announce it.");

    ctx.say(format_success(&reply)).await?;
    Ok(())
}

/// Allows the server where you send this command to announce your birthday.
#[poise::command(prefix_command, slash_command, guild_only)]
pub async fn allowserver(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = require_guild(ctx.guild_id())?;
    let user_id = ctx.author().id;
    let data = ctx.data();

    match data.db.add_allowed_birthday(guild_id, user_id).await {
        Ok(true) => {}
        Ok(false) => {
            ctx.say(format_error("This server can already announce your birthday"))
                .await?;
            return Ok(());
        }
        Err(e) => {
            error!("Failed to allow birthday of {} in {}: {}", user_id, guild_id, e);
            ctx.say(build_database_error()).await?;
            return Ok(());
        }
    }

    if allow_in_view(&data.guild_birthdays, &data.birthdays, guild_id, user_id) {
        debug!("Added {} to the cached birthdays of {}", user_id, guild_id);
    }

    info!("User {} allowed birthday announcements in {}", user_id, guild_id);
    ctx.say(format_success(
        "Allowed this server to announce your birthday!",
    ))
    .await?;
    Ok(())
}

/// Denies the server where you send this command from announcing your birthday.
#[poise::command(prefix_command, slash_command, guild_only)]
pub async fn denyserver(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = require_guild(ctx.guild_id())?;
    let user_id = ctx.author().id;
    let data = ctx.data();

    match data.db.remove_allowed_birthday(guild_id, user_id).await {
        Ok(true) => {}
        Ok(false) => {
            ctx.say(format_error("This server wasn't allowed to announce your birthday"))
                .await?;
            return Ok(());
        }
        Err(e) => {
            error!("Failed to deny birthday of {} in {}: {}", user_id, guild_id, e);
            ctx.say(build_database_error()).await?;
            return Ok(());
        }
    }

    if deny_in_view(&data.guild_birthdays, guild_id, user_id) {
        debug!("Removed {} from the cached birthdays of {}", user_id, guild_id);
    }

    info!("User {} denied birthday announcements in {}", user_id, guild_id);
    ctx.say(format_success(
        "This server won't announce your birthday anymore.",
    ))
    .await?;
    Ok(())
}

/// Removes your set birthday date.
#[poise::command(prefix_command, slash_command)]
pub async fn remove(ctx: Context<'_>) -> Result<(), Error> {
    match ctx.data().db.remove_birthday(ctx.author().id).await {
        Ok(true) => {
            ctx.say(format_success("Removed your birthday date.")).await?;
        }
        Ok(false) => {
            ctx.say(format_error("You don't have a birthday set")).await?;
        }
        Err(e) => {
            error!("Failed to remove birthday of {}: {}", ctx.author().id, e);
            ctx.say(build_database_error()).await?;
        }
    }
    Ok(())
}

/// Shows the birthdays of everyone in this server who allowed it.
#[poise::command(prefix_command, slash_command, guild_only)]
pub async fn list(ctx: Context<'_>) -> Result<(), Error> {
    let Some(view) = load_guild_view(ctx).await? else {
        return Ok(());
    };

    send_birthday_list(ctx, &view, None, "Birthdays in this server").await
}

/// Shows the birthdays of a month in this server. Defaults to the current month.
#[poise::command(prefix_command, slash_command, guild_only)]
pub async fn month(
    ctx: Context<'_>,
    #[description = "Month number, 1 to 12"] month: Option<String>,
) -> Result<(), Error> {
    let month = match month.as_deref().map(str::trim) {
        None | Some("") => chrono::Utc::now().month(),
        Some(value) => match value.parse::<u32>() {
            Ok(month) if (1..=12).contains(&month) => month,
            _ => {
                ctx.say(format_error("Invalid month, use a number from 1 to 12"))
                    .await?;
                return Ok(());
            }
        },
    };

    let Some(view) = load_guild_view(ctx).await? else {
        return Ok(());
    };

    let title = format!("Birthdays in {}", get_month_name(month as i32));
    send_birthday_list(ctx, &view, Some(month), &title).await
}

/// The guild's birthday view, or `None` after replying why it can't be shown
async fn load_guild_view(ctx: Context<'_>) -> Result<Option<GuildBirthdays>, Error> {
    let guild_id = require_guild(ctx.guild_id())?;
    let data = ctx.data();

    if let Err(reason) = check_cacher(&data.birthdays) {
        ctx.say(format_error(reason.message())).await?;
        return Ok(None);
    }

    let allowed = match data.db.get_allowed_birthdays(guild_id).await {
        Ok(allowed) => allowed,
        Err(e) => {
            error!("Failed to load allowed birthdays for {}: {}", guild_id, e);
            ctx.say(build_database_error()).await?;
            return Ok(None);
        }
    };

    match listable_view(&data.guild_birthdays, &data.birthdays, guild_id, &allowed) {
        Ok(view) => Ok(Some(view)),
        Err(reason) => {
            ctx.say(format_error(reason.message())).await?;
            Ok(None)
        }
    }
}

async fn send_birthday_list(
    ctx: Context<'_>,
    view: &GuildBirthdays,
    month: Option<u32>,
    title: &str,
) -> Result<(), Error> {
    let selected = select_birthdays(view, month);
    if selected.is_empty() {
        ctx.say(format_error("No birthdays to show for that month"))
            .await?;
        return Ok(());
    }

    let entries = with_member_names(ctx, selected);
    let pages: Vec<String> = render_birthday_pages(&entries)
        .into_iter()
        .map(|page| format!("**{}**\n{}", title, page))
        .collect();
    let pages: Vec<&str> = pages.iter().map(String::as_str).collect();

    poise::builtins::paginate(ctx, &pages).await?;
    Ok(())
}

/// Resolve display names from the guild cache, falling back to the user id
fn with_member_names(
    ctx: Context<'_>,
    entries: Vec<(UserId, BirthdayData)>,
) -> Vec<(String, BirthdayData)> {
    let guild = ctx.guild();
    entries
        .into_iter()
        .map(|(user_id, birthday)| {
            let name = guild
                .as_ref()
                .and_then(|guild| guild.members.get(&user_id))
                .map(|member| member.display_name().to_string())
                .unwrap_or_else(|| format!("Unknown ({})", user_id));
            (name, birthday)
        })
        .collect()
}
