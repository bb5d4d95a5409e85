use poise::CreateReply;
use poise::serenity_prelude::CreateEmbed;
use tracing::info;

use crate::metrics::GUILD_ACTIONS;
use crate::models::{Context, Error};
use crate::utils::messages::{code_block, format_error};
use crate::utils::string_utils::divide_string;

/// Splits `opts` arguments into words, dropping empty ones
pub fn split_option_args(args: &str) -> Vec<String> {
    args.split_whitespace().map(str::to_string).collect()
}

/// Available option lines as prolog code blocks of at most `max_len` characters
pub fn option_list_pages(lines: &[String], max_len: usize) -> Vec<String> {
    let body = lines.join("\n");
    divide_string(max_len, '\n', &body)
        .into_iter()
        .map(|page| code_block("prolog", page.trim_end()))
        .collect()
}

/// Changes server settings. `opts list` shows every option, `opts help <option>` explains one.
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    aliases("options")
)]
pub async fn opts(
    ctx: Context<'_>,
    #[description = "Option path and its arguments, e.g. `prefix set !`"]
    #[rest]
    args: Option<String>,
) -> Result<(), Error> {
    let args = split_option_args(args.as_deref().unwrap_or_default());
    let registry = &ctx.data().options;

    match args.first().map(String::as_str) {
        None => {
            ctx.say(format_error(
                "You need to specify an option. Use `opts list` to see all of them",
            ))
            .await?;
        }
        Some("list") | Some("ls") => {
            let pages = option_list_pages(registry.available_options(), 1500);
            let pages: Vec<&str> = pages.iter().map(String::as_str).collect();
            poise::builtins::paginate(ctx, &pages).await?;
        }
        Some("help") => {
            let Some(option) = registry.help(&args[1..]) else {
                ctx.say(format_error(
                    "That option doesn't exist. Use `opts list` to see all of them",
                ))
                .await?;
                return Ok(());
            };

            ctx.send(
                CreateReply::default().embed(
                    CreateEmbed::new()
                        .title(&option.name)
                        .description(&option.description)
                        .field("Type", option.kind.to_string(), true),
                ),
            )
            .await?;
        }
        Some(_) => {
            let Some((option, rest)) = registry.resolve(&args) else {
                ctx.say(format_error(
                    "Invalid option or arguments. Use `opts list` to see all options",
                ))
                .await?;
                return Ok(());
            };

            info!(
                "Running option {} in guild {:?} for {}",
                option.name,
                ctx.guild_id(),
                ctx.author().id
            );
            (option.handler)(ctx, rest).await?;
            GUILD_ACTIONS.with_label_values(&[&option.name]).inc();
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_option_args() {
        assert_eq!(
            split_option_args(" prefix  set\n! "),
            vec!["prefix".to_string(), "set".to_string(), "!".to_string()]
        );
        assert!(split_option_args("   ").is_empty());
    }

    #[test]
    fn test_option_list_pages() {
        let lines: Vec<String> = (0..60)
            .map(|i| format!("{:<34} | Option number {}", format!("option {}", i), i))
            .collect();

        let pages = option_list_pages(&lines, 1000);
        assert!(pages.len() > 1);
        for page in &pages {
            assert!(page.starts_with("```prolog\n"));
            assert!(page.ends_with("```"));
        }
        assert!(pages[0].contains("option 0 "));
        assert!(pages.last().unwrap().contains("Option number 59"));
    }
}
