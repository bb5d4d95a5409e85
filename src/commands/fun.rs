use poise::CreateReply;
use poise::serenity_prelude::{CreateEmbed, UserId};
use rand::Rng;
use std::sync::LazyLock;
use std::time::Duration;

use crate::models::{Context, Error};
use crate::utils::messages::format_error;
use crate::utils::ratelimit::{IncreasingRateLimiter, ratelimit};
use crate::utils::string_utils::{normalize_whitespace, parse_arguments};
use crate::utils::validation::parse_user_mentions;

const MAX_COINFLIPS: u32 = 1000;
const MAX_ROLLS: u32 = 100;
const DEFAULT_DICE_SIZE: u32 = 6;

static ROLL_LIMITER: LazyLock<IncreasingRateLimiter> = LazyLock::new(|| {
    IncreasingRateLimiter::builder()
        .limit(1)
        .spam_tolerance(2)
        .cooldown(Duration::from_secs(5))
        .max_cooldown(Duration::from_secs(60))
        .random_increment(true)
        .prefix("roll")
        .build()
});

/// Waifu rating from 0 to 100, stable for the same input
pub fn rate_waifu(content: &str) -> u32 {
    let normalized = normalize_whitespace(content).replace("<@!", "<@");
    normalized.chars().map(|c| c as u32).sum::<u32>() % 101
}

/// Dice size and roll count for `roll`
pub fn parse_roll(content: &str) -> (u32, u32) {
    let content = content.trim();

    let (size, amount) = match parse_dice_notation(content) {
        Some(dice) => dice,
        None => {
            let words: Vec<&str> = content.split_whitespace().collect();
            let options = parse_arguments(&words);
            let number = |key: &str| options.get(key).and_then(|v| v.trim().parse::<u32>().ok());

            let size = number("size").unwrap_or(DEFAULT_DICE_SIZE);
            let amount = number("amount").or_else(|| number("")).unwrap_or(1);
            (size, amount)
        }
    };

    (size.max(1), amount.clamp(1, MAX_ROLLS))
}

/// `NdM` (or `dM`) dice notation
fn parse_dice_notation(content: &str) -> Option<(u32, u32)> {
    let (rolls, faces) = content.to_lowercase().split_once('d').map(|(r, f)| (r.to_string(), f.to_string()))?;
    let faces = faces.trim().parse::<u32>().ok()?;
    let rolls = if rolls.trim().is_empty() {
        1
    } else {
        rolls.trim().parse::<u32>().ok()?
    };
    Some((faces, rolls))
}

pub fn roll_dice<R: Rng + ?Sized>(rng: &mut R, size: u32, amount: u32) -> u64 {
    (0..amount)
        .map(|_| rng.random_range(1..=size as u64))
        .sum()
}

/// Verdict shown for a love percentage
pub fn love_verdict(percentage: u32) -> &'static str {
    match percentage {
        0..45 => "Try again next time...",
        45..75 => "Decent! Could be better.",
        75..100 => "Nice! Cute couple.",
        100 => "Perfect match! Get married already.",
        _ => "You should love yourself, that's true. But this is a bit too much.",
    }
}

/// Text bar of `width` cells filled to `percentage`
pub fn love_bar(percentage: u32, width: u32) -> String {
    let filled = (percentage.min(100) * width / 100) as usize;
    let width = width as usize;
    format!("{}{}", "▮".repeat(filled), "▯".repeat(width - filled))
}

/// Flips a coin with a defined number of repetitions.
#[poise::command(prefix_command, slash_command)]
pub async fn coinflip(
    ctx: Context<'_>,
    #[description = "Amount of times to flip the coin"] times: Option<String>,
) -> Result<(), Error> {
    let times = match times.as_deref().map(str::trim) {
        None | Some("") => 1,
        Some(value) => match value.parse::<u32>() {
            Ok(times) if times > MAX_COINFLIPS => {
                ctx.say(format_error("You can flip a coin at most 1000 times"))
                    .await?;
                return Ok(());
            }
            Ok(times) => times.max(1),
            Err(_) => {
                ctx.say(format_error("That's not a valid number of repetitions"))
                    .await?;
                return Ok(());
            }
        },
    };

    let heads = {
        let mut rng = rand::rng();
        (0..times).filter(|_| rng.random_bool(0.5)).count()
    };
    let tails = times as usize - heads;

    ctx.say(format!(
        "🪙 Your result from **{}** repetitions: **{}** heads and **{}** tails",
        times, heads, tails
    ))
    .await?;
    Ok(())
}

/// Just rates your waifu from zero to 100. Results may vary.
#[poise::command(prefix_command, slash_command)]
pub async fn ratewaifu(
    ctx: Context<'_>,
    #[description = "The waifu to rate"]
    #[rest]
    waifu: Option<String>,
) -> Result<(), Error> {
    let Some(waifu) = waifu.filter(|w| !w.trim().is_empty()) else {
        ctx.say(format_error("Give me a waifu to rate!")).await?;
        return Ok(());
    };

    ctx.say(format!(
        "🤔 I rate your waifu with a **{}/100**",
        rate_waifu(&waifu)
    ))
    .await?;
    Ok(())
}

/// Roll a any-sided dice 1 or more times. `1d20`, `-size 20 -amount 3` or a plain amount.
#[poise::command(prefix_command, slash_command)]
pub async fn roll(
    ctx: Context<'_>,
    #[description = "NdM, an amount, or -size/-amount flags"]
    #[rest]
    dice: Option<String>,
) -> Result<(), Error> {
    if !ratelimit(ctx, &ROLL_LIMITER, &ctx.author().id.to_string()).await? {
        return Ok(());
    }

    let (size, amount) = parse_roll(dice.as_deref().unwrap_or_default());
    let result = roll_dice(&mut rand::rng(), size, amount);

    let extra = if amount == 1 {
        "!".to_string()
    } else {
        format!("\nDoing **{}** rolls.", amount)
    };
    ctx.say(format!("🎲 You got **{}**{}", result, extra)).await?;
    Ok(())
}

/// Calculates the love between you and someone, or between two users.
#[poise::command(prefix_command, slash_command)]
pub async fn love(
    ctx: Context<'_>,
    #[description = "One or two users"]
    #[rest]
    users: Option<String>,
) -> Result<(), Error> {
    let mentioned = parse_user_mentions(users.as_deref().unwrap_or_default());
    let (first, second): (UserId, UserId) = match mentioned.as_slice() {
        [] => {
            ctx.say(format_error("You need to mention at least one user"))
                .await?;
            return Ok(());
        }
        [only] => (ctx.author().id, *only),
        [a, b, ..] => (*a, *b),
    };

    let percentage = if first == second {
        101
    } else {
        rand::rng().random_range(0..=100)
    };

    let description = format!(
        "\n**💗 <@{}>\n💗 <@{}>**\n\n{}% **\\|\\|** {} **\\|\\|**\n\n**Result:** {}",
        first,
        second,
        percentage,
        love_bar(percentage, 30),
        love_verdict(percentage)
    );

    ctx.send(
        CreateReply::default().embed(
            CreateEmbed::new()
                .title("❤ Love Meter ❤")
                .thumbnail(ctx.author().face())
                .description(description),
        ),
    )
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_rate_waifu_is_stable_and_normalized() {
        let a = rate_waifu("<@!123>");
        let b = rate_waifu("<@123>");
        assert_eq!(a, b);
        assert_eq!(rate_waifu("best   girl"), rate_waifu("best girl"));
        assert!(rate_waifu("anything at all") <= 100);
        // 'a' is 97
        assert_eq!(rate_waifu("a"), 97);
    }

    #[test]
    fn test_parse_roll_formats() {
        assert_eq!(parse_roll(""), (6, 1));
        assert_eq!(parse_roll("2d20"), (20, 2));
        assert_eq!(parse_roll("d8"), (8, 1));
        assert_eq!(parse_roll("-size 12 -amount 3"), (12, 3));
        assert_eq!(parse_roll("4"), (6, 4));
        assert_eq!(parse_roll("500d6"), (6, 100));
        assert_eq!(parse_roll("-amount nope"), (6, 1));
    }

    #[test]
    fn test_roll_dice_bounds() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..100 {
            let total = roll_dice(&mut rng, 6, 3);
            assert!((3..=18).contains(&total));
        }
    }

    #[test]
    fn test_love_verdicts() {
        assert_eq!(love_verdict(10), "Try again next time...");
        assert_eq!(love_verdict(45), "Decent! Could be better.");
        assert_eq!(love_verdict(99), "Nice! Cute couple.");
        assert_eq!(love_verdict(100), "Perfect match! Get married already.");
        assert!(love_verdict(101).contains("yourself"));
    }

    #[test]
    fn test_love_bar() {
        assert_eq!(love_bar(0, 10), "▯".repeat(10));
        assert_eq!(love_bar(50, 10), format!("{}{}", "▮".repeat(5), "▯".repeat(5)));
        assert_eq!(love_bar(101, 10), "▮".repeat(10));
    }
}
