use poise::serenity_prelude::{ChannelId, GuildId, RoleId};
use tracing::{error, info};

use super::{GuildOption, OptionFuture, OptionKind, OptionRegistry};
use crate::database::BirthdayChannelConfig;
use crate::models::{Context, Data, Error};
use crate::schedule::ScheduleType;
use crate::utils::message_formatter::AnnouncementTemplates;
use crate::utils::messages::{build_database_error, code_block, format_error, format_success};
use crate::utils::timezone::{
    DEFAULT_ANNOUNCE_TIME, local_time_to_cron, midnight_cron, parse_time_string, parse_timezone,
};
use crate::utils::validation::{ValidationError, parse_snowflake, require_guild};

const MAX_PREFIX_LENGTH: usize = 50;

/// Every option the `opts` command knows about
pub fn build_option_registry() -> OptionRegistry {
    let mut registry = OptionRegistry::new();

    registry.add_option(
        "check:data",
        GuildOption::new(
            "Data check.",
            "Checks the data values you have set on this server.",
            OptionKind::General,
            check_data,
        )
        .short_description("Checks the data values you have set on this server."),
    );
    registry.add_option(
        "reset:all",
        GuildOption::new(
            "Options reset.",
            "Resets all options set on this server. Users who allowed birthday announcements stay allowed.",
            OptionKind::General,
            reset_all,
        )
        .short_description("Resets all options set on this server."),
    );
    registry.add_option(
        "prefix:set",
        GuildOption::new(
            "Prefix set.",
            "Sets the server prefix. The global prefix keeps working.\n**Example:** `~>opts prefix set .`",
            OptionKind::General,
            prefix_set,
        )
        .short_description("Sets the server prefix."),
    );
    registry.add_option(
        "prefix:clear",
        GuildOption::new(
            "Prefix clear.",
            "Clears the server prefix.",
            OptionKind::General,
            prefix_clear,
        )
        .short_description("Clears the server prefix."),
    );
    registry.add_option(
        "timezone:set",
        GuildOption::new(
            "Timezone set.",
            "Sets the server timezone, used for birthday announcements.\n**Example:** `~>opts timezone set Europe/Paris`",
            OptionKind::General,
            timezone_set,
        )
        .short_description("Sets the server timezone."),
    );
    registry.add_option(
        "birthday:enable",
        GuildOption::new(
            "Birthday announcements.",
            "Announces the birthdays of allowed users in a channel, optionally giving them a role.\n\
             **Example:** `~>opts birthday enable #general @Birthday 09:00`",
            OptionKind::Channel,
            birthday_enable,
        )
        .short_description("Enables birthday announcements."),
    );
    registry.add_option(
        "birthday:disable",
        GuildOption::new(
            "Birthday disable.",
            "Stops birthday announcements and role updates.",
            OptionKind::General,
            birthday_disable,
        )
        .short_description("Disables birthday announcements."),
    );
    registry.add_option(
        "birthday:template",
        GuildOption::new(
            "Birthday template.",
            "Customizes announcements. Parts: `message`, `noage`, `header`, `footer`. \
             Placeholders: {user}, {mention}, {date}, {age}. Use `reset` as the text to restore the default.\n\
             **Example:** `~>opts birthday template message Happy {age}th {mention}!`",
            OptionKind::General,
            birthday_template,
        )
        .short_description("Customizes birthday announcements."),
    );

    registry.add_alias("birthday:enable", "birthday:channel");
    registry.add_alias("timezone:set", "tz:set");

    registry
}

/// Arguments of `birthday:enable`
#[derive(Debug, PartialEq, Eq)]
pub struct BirthdayEnableArgs {
    pub channel_id: ChannelId,
    pub role_id: Option<RoleId>,
    pub announce_time: String,
}

/// Parse `<#channel> [@role] [HH:MM]`, role and time in any order
pub fn parse_birthday_enable_args(args: &[String]) -> Result<BirthdayEnableArgs, ValidationError> {
    let (channel, rest) = args
        .split_first()
        .ok_or(ValidationError::MissingArgument("channel"))?;

    let channel_id = parse_snowflake(channel, "#")
        .map(ChannelId::new)
        .ok_or_else(|| ValidationError::InvalidChannel(channel.clone()))?;

    let mut role_id = None;
    let mut announce_time = DEFAULT_ANNOUNCE_TIME.to_string();

    for arg in rest {
        if let Ok(time) = parse_time_string(arg) {
            announce_time = time.format("%H:%M").to_string();
        } else if let Some(id) = parse_snowflake(arg, "@&") {
            role_id = Some(RoleId::new(id));
        } else {
            return Err(ValidationError::InvalidRole(arg.clone()));
        }
    }

    Ok(BirthdayEnableArgs {
        channel_id,
        role_id,
        announce_time,
    })
}

/// Prefix accepted for `prefix:set`
pub fn validate_prefix(args: &[String]) -> Result<String, &'static str> {
    let prefix = args.first().map(|p| p.trim()).unwrap_or_default();
    if prefix.is_empty() {
        return Err("You need to specify the prefix");
    }
    if prefix.chars().count() > MAX_PREFIX_LENGTH {
        return Err("That prefix is too long");
    }
    Ok(prefix.to_string())
}

/// Change one part of the announcement templates, `reset` restores the default
pub fn apply_template_change(
    templates: &mut AnnouncementTemplates,
    args: &[String],
) -> Result<(), &'static str> {
    let (part, text) = args
        .split_first()
        .ok_or("You need to specify which part to change")?;
    let text = text.join(" ");
    if text.trim().is_empty() {
        return Err("You need to specify the text");
    }
    let value = (!text.trim().eq_ignore_ascii_case("reset")).then_some(text);

    let slot = match part.to_lowercase().as_str() {
        "message" => &mut templates.message,
        "noage" => &mut templates.message_without_age,
        "header" => &mut templates.header,
        "footer" => &mut templates.footer,
        _ => return Err("Unknown part, use message, noage, header or footer"),
    };
    *slot = value;
    Ok(())
}

/// Store the announcement and role schedules for the current configuration
async fn apply_birthday_schedules(
    data: &Data,
    guild_id: GuildId,
    timezone: &str,
    config: &BirthdayChannelConfig,
) -> Result<(), Error> {
    let (cron_expr, utc_time) = local_time_to_cron(&config.announce_time, timezone)?;
    info!(
        "Birthday announcements for guild {} at {} {} ({} UTC)",
        guild_id, config.announce_time, timezone, utc_time
    );

    data.db
        .upsert_schedule(guild_id, ScheduleType::Birthday, cron_expr, true)
        .await?;

    if config.role_id.is_some() {
        data.db
            .upsert_schedule(
                guild_id,
                ScheduleType::BirthdayRole,
                midnight_cron(timezone),
                true,
            )
            .await?;
    } else {
        data.db
            .delete_schedule(guild_id, ScheduleType::BirthdayRole)
            .await?;
    }

    data.reload_schedules();
    Ok(())
}

fn check_data(ctx: Context<'_>, _args: Vec<String>) -> OptionFuture<'_> {
    Box::pin(async move {
        let guild_id = require_guild(ctx.guild_id())?;
        let data = ctx.data();

        let settings = data.db.get_guild_settings(guild_id).await?;
        let channel = data.db.get_birthday_channel(guild_id).await?;
        let allowed = data.db.get_allowed_birthdays(guild_id).await?;

        let mut lines = vec![
            format!("* timezone: {}", settings.timezone),
            format!(
                "* prefix: {}",
                settings.prefix.as_deref().unwrap_or("(global only)")
            ),
            format!("* allowed_birthdays: {}", allowed.len()),
        ];

        match channel {
            Some(config) => {
                lines.push(format!("* birthday_channel: {}", config.channel_id));
                lines.push(format!(
                    "* birthday_role: {}",
                    config
                        .role_id
                        .map(|id| id.to_string())
                        .unwrap_or_else(|| "none".to_string())
                ));
                lines.push(format!("* birthday_time: {}", config.announce_time));
                for (name, value) in [
                    ("birthday_message", &config.templates.message),
                    ("birthday_message_noage", &config.templates.message_without_age),
                    ("birthday_header", &config.templates.header),
                    ("birthday_footer", &config.templates.footer),
                ] {
                    if let Some(value) = value {
                        lines.push(format!("* {}: {}", name, value));
                    }
                }
            }
            None => lines.push("* birthday_channel: none".to_string()),
        }

        ctx.say(code_block("prolog", &lines.join("\n"))).await?;
        Ok(())
    })
}

fn reset_all(ctx: Context<'_>, _args: Vec<String>) -> OptionFuture<'_> {
    Box::pin(async move {
        let guild_id = require_guild(ctx.guild_id())?;
        let data = ctx.data();

        if let Err(e) = data.db.reset_guild_settings(guild_id).await {
            error!("Failed to reset settings of guild {}: {}", guild_id, e);
            ctx.say(build_database_error()).await?;
            return Ok(());
        }

        data.prefixes.remove(&guild_id);
        data.reload_schedules();

        ctx.say(format_success("Correctly reset your options!")).await?;
        Ok(())
    })
}

fn prefix_set(ctx: Context<'_>, args: Vec<String>) -> OptionFuture<'_> {
    Box::pin(async move {
        let guild_id = require_guild(ctx.guild_id())?;
        let prefix = match validate_prefix(&args) {
            Ok(prefix) => prefix,
            Err(message) => {
                ctx.say(format_error(message)).await?;
                return Ok(());
            }
        };

        let data = ctx.data();
        data.db.set_guild_prefix(guild_id, Some(&prefix)).await?;
        data.prefixes.insert(guild_id, prefix.clone());

        ctx.say(format_success(&format!(
            "Your server prefix is now `{}`",
            prefix
        )))
        .await?;
        Ok(())
    })
}

fn prefix_clear(ctx: Context<'_>, _args: Vec<String>) -> OptionFuture<'_> {
    Box::pin(async move {
        let guild_id = require_guild(ctx.guild_id())?;
        let data = ctx.data();

        data.db.set_guild_prefix(guild_id, None).await?;
        data.prefixes.remove(&guild_id);

        ctx.say(format_success("Your server prefix has been cleared"))
            .await?;
        Ok(())
    })
}

fn timezone_set(ctx: Context<'_>, args: Vec<String>) -> OptionFuture<'_> {
    Box::pin(async move {
        let guild_id = require_guild(ctx.guild_id())?;
        let Some(timezone) = args.first() else {
            ctx.say(format_error("You need to specify the timezone, e.g. Europe/Paris"))
                .await?;
            return Ok(());
        };

        let tz = match parse_timezone(timezone) {
            Ok(tz) => tz,
            Err(e) => {
                ctx.say(format_error(&e.to_string())).await?;
                return Ok(());
            }
        };

        let data = ctx.data();
        data.db
            .set_guild_timezone(guild_id, tz.name().to_string())
            .await?;

        // Existing announcements move with the timezone
        if let Some(config) = data.db.get_birthday_channel(guild_id).await? {
            apply_birthday_schedules(data, guild_id, tz.name(), &config).await?;
        }

        ctx.say(format_success(&format!(
            "Server timezone set to **{}**",
            tz.name()
        )))
        .await?;
        Ok(())
    })
}

fn birthday_enable(ctx: Context<'_>, args: Vec<String>) -> OptionFuture<'_> {
    Box::pin(async move {
        let guild_id = require_guild(ctx.guild_id())?;
        let parsed = match parse_birthday_enable_args(&args) {
            Ok(parsed) => parsed,
            Err(e) => {
                ctx.say(format_error(&e.to_string())).await?;
                return Ok(());
            }
        };

        let data = ctx.data();
        let timezone = data.db.get_guild_timezone(guild_id).await?;

        // Validate the schedule before touching the database
        if let Err(e) = local_time_to_cron(&parsed.announce_time, &timezone) {
            ctx.say(format_error(&e.to_string())).await?;
            return Ok(());
        }

        data.db
            .set_birthday_channel(
                guild_id,
                parsed.channel_id,
                parsed.role_id,
                &parsed.announce_time,
            )
            .await?;

        let config = BirthdayChannelConfig {
            channel_id: parsed.channel_id,
            role_id: parsed.role_id,
            announce_time: parsed.announce_time.clone(),
            templates: AnnouncementTemplates::default(),
        };
        apply_birthday_schedules(data, guild_id, &timezone, &config).await?;

        let role = parsed
            .role_id
            .map(|id| format!(" and give <@&{}>", id))
            .unwrap_or_default();
        ctx.say(format_success(&format!(
            "Birthdays will be announced in <#{}> at {} ({}){}",
            parsed.channel_id, parsed.announce_time, timezone, role
        )))
        .await?;
        Ok(())
    })
}

fn birthday_disable(ctx: Context<'_>, _args: Vec<String>) -> OptionFuture<'_> {
    Box::pin(async move {
        let guild_id = require_guild(ctx.guild_id())?;
        let data = ctx.data();

        let removed = data.db.remove_birthday_channel(guild_id).await?;
        data.db
            .delete_schedule(guild_id, ScheduleType::Birthday)
            .await?;
        data.db
            .delete_schedule(guild_id, ScheduleType::BirthdayRole)
            .await?;
        data.reload_schedules();

        if removed {
            ctx.say(format_success("Birthday announcements disabled"))
                .await?;
        } else {
            ctx.say(format_error("Birthday announcements weren't enabled"))
                .await?;
        }
        Ok(())
    })
}

fn birthday_template(ctx: Context<'_>, args: Vec<String>) -> OptionFuture<'_> {
    Box::pin(async move {
        let guild_id = require_guild(ctx.guild_id())?;
        let data = ctx.data();

        let Some(config) = data.db.get_birthday_channel(guild_id).await? else {
            ctx.say(format_error(
                "Enable birthday announcements first with `opts birthday enable`",
            ))
            .await?;
            return Ok(());
        };

        let mut templates = config.templates;
        if let Err(message) = apply_template_change(&mut templates, &args) {
            ctx.say(format_error(message)).await?;
            return Ok(());
        }

        data.db.set_birthday_templates(guild_id, &templates).await?;
        ctx.say(format_success("Birthday announcement updated")).await?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_registry_paths() {
        let registry = build_option_registry();
        for path in [
            "check:data",
            "reset:all",
            "prefix:set",
            "prefix:clear",
            "timezone:set",
            "birthday:enable",
            "birthday:disable",
            "birthday:template",
            "birthday:channel",
            "tz:set",
        ] {
            assert!(registry.get(path).is_some(), "missing {}", path);
        }
        assert_eq!(registry.available_options().len(), 10);
    }

    #[test]
    fn test_parse_enable_channel_only() {
        let parsed = parse_birthday_enable_args(&args(&["<#123>"])).unwrap();
        assert_eq!(parsed.channel_id, ChannelId::new(123));
        assert_eq!(parsed.role_id, None);
        assert_eq!(parsed.announce_time, "08:00");
    }

    #[test]
    fn test_parse_enable_role_and_time() {
        let parsed = parse_birthday_enable_args(&args(&["123", "09:30", "<@&456>"])).unwrap();
        assert_eq!(parsed.role_id, Some(RoleId::new(456)));
        assert_eq!(parsed.announce_time, "09:30");
    }

    #[test]
    fn test_parse_enable_errors() {
        assert_eq!(
            parse_birthday_enable_args(&[]),
            Err(ValidationError::MissingArgument("channel"))
        );
        assert!(matches!(
            parse_birthday_enable_args(&args(&["general"])),
            Err(ValidationError::InvalidChannel(_))
        ));
        assert!(matches!(
            parse_birthday_enable_args(&args(&["<#1>", "soon"])),
            Err(ValidationError::InvalidRole(_))
        ));
    }

    #[test]
    fn test_validate_prefix() {
        assert_eq!(validate_prefix(&args(&["!"])), Ok("!".to_string()));
        assert!(validate_prefix(&[]).is_err());
        let long = "x".repeat(51);
        assert!(validate_prefix(&args(&[long.as_str()])).is_err());
    }

    #[test]
    fn test_template_change_and_reset() {
        let mut templates = AnnouncementTemplates::default();
        apply_template_change(&mut templates, &args(&["message", "Happy", "{age}th!"])).unwrap();
        assert_eq!(templates.message.as_deref(), Some("Happy {age}th!"));

        apply_template_change(&mut templates, &args(&["MESSAGE", "reset"])).unwrap();
        assert_eq!(templates.message, None);

        assert!(apply_template_change(&mut templates, &args(&["title", "x"])).is_err());
        assert!(apply_template_change(&mut templates, &args(&["footer"])).is_err());
    }
}
