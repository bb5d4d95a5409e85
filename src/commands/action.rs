use poise::CreateReply;
use poise::serenity_prelude::{CreateEmbed, UserId};
use rand::seq::IndexedRandom;
use tracing::warn;

use super::registry::{CommandRegistry, category};
use crate::metrics::ACTIONS;
use crate::models::{Context, Error};
use crate::services::weeb::WeebError;
use crate::utils::messages::{format_error, format_sad};
use crate::utils::validation::parse_user_mentions;

/// An image action aimed at other users
pub struct ActionSpec {
    pub name: &'static str,
    pub description: &'static str,
    /// weeb.sh image type
    pub image_type: &'static str,
    /// `{author}` does it to `{targets}`
    pub target: &'static str,
    /// Nobody mentioned
    pub lonely: &'static str,
    /// Only the author mentioned
    pub own: &'static str,
}

/// An image command with a fixed text
pub struct ImageSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub image_type: &'static str,
    pub text: &'static str,
}

pub const ACTIONS_TABLE: &[ActionSpec] = &[
    ActionSpec {
        name: "pat",
        description: "Pats the specified user.",
        image_type: "pat",
        target: "💬 {author} pats {targets}",
        lonely: "💬 *pats {author}* There, there.",
        own: "💬 {author} pats themselves. Someone give them a pat!",
    },
    ActionSpec {
        name: "hug",
        description: "Hugs the specified user.",
        image_type: "hug",
        target: "💬 {author} hugs {targets}",
        lonely: "💬 *hugs {author}* Here, have a hug.",
        own: "💬 {author} hugs themselves... that's a bit sad.",
    },
    ActionSpec {
        name: "kiss",
        description: "Kisses the specified user.",
        image_type: "kiss",
        target: "💬 {author} kisses {targets}",
        lonely: "💬 {author} blows a kiss into the void.",
        own: "💬 {author} kisses their own reflection.",
    },
    ActionSpec {
        name: "poke",
        description: "Pokes the specified user.",
        image_type: "poke",
        target: "💬 {author} pokes {targets}",
        lonely: "💬 *pokes {author}* Hey!",
        own: "💬 {author} pokes themselves. Ouch.",
    },
    ActionSpec {
        name: "slap",
        description: "Slaps the specified user ;).",
        image_type: "slap",
        target: "💬 {author} slaps {targets}",
        lonely: "💬 {author} slaps the air. It had it coming.",
        own: "💬 {author} slaps themselves. Why?",
    },
    ActionSpec {
        name: "bite",
        description: "Bites the specified user.",
        image_type: "bite",
        target: "💬 {author} bites {targets}",
        lonely: "💬 {author} bites nothing in particular.",
        own: "💬 {author} bites their own arm.",
    },
    ActionSpec {
        name: "tickle",
        description: "Tickles the specified user.",
        image_type: "tickle",
        target: "😂 {author} tickles {targets}",
        lonely: "😂 *tickles {author}*",
        own: "😂 {author} tries to tickle themselves. It doesn't work.",
    },
    ActionSpec {
        name: "highfive",
        description: "Highfives with the specified user.",
        image_type: "highfive",
        target: "💬 {author} highfives {targets}",
        lonely: "💬 *highfives {author}* Up top!",
        own: "💬 {author} highfives themselves. Nice clap.",
    },
    ActionSpec {
        name: "pout",
        description: "Pouts at the specified user.",
        image_type: "pout",
        target: "💬 {author} pouts at {targets}",
        lonely: "💬 {author} pouts.",
        own: "💬 {author} pouts at themselves.",
    },
    ActionSpec {
        name: "lick",
        description: "Licks the specified user.",
        image_type: "lick",
        target: "💬 {author} licks {targets}",
        lonely: "💬 {author} licks the air.",
        own: "💬 {author} licks themselves. Like a cat.",
    },
    ActionSpec {
        name: "teehee",
        description: "Teehee~",
        image_type: "teehee",
        target: "👀 {author} teehees at {targets}",
        lonely: "👀 {author}: teehee~",
        own: "👀 {author} teehees at themselves.",
    },
    ActionSpec {
        name: "smile",
        description: "Smiles at someone.",
        image_type: "smile",
        target: "💬 {author} smiles at {targets}",
        lonely: "💬 {author} smiles.",
        own: "💬 {author} smiles at themselves in the mirror.",
    },
    ActionSpec {
        name: "stare",
        description: "Stares at someone.",
        image_type: "stare",
        target: "👀 {author} stares at {targets}",
        lonely: "👀 {author} stares into the distance.",
        own: "👀 {author} stares at themselves.",
    },
    ActionSpec {
        name: "holdhands",
        description: "Holds someone's hands.",
        image_type: "handholding",
        target: "❤️ {author} holds hands with {targets}",
        lonely: "❤️ *holds {author}'s hand*",
        own: "❤️ {author} holds their own hands.",
    },
    ActionSpec {
        name: "cuddle",
        description: "Cuddles someone.",
        image_type: "cuddle",
        target: "❤️ {author} cuddles {targets}",
        lonely: "❤️ *cuddles {author}*",
        own: "❤️ {author} cuddles a pillow instead.",
    },
    ActionSpec {
        name: "blush",
        description: "Blushes at someone.",
        image_type: "blush",
        target: "❤️ {author} blushes at {targets}",
        lonely: "❤️ {author} blushes.",
        own: "❤️ {author} blushes at themselves.",
    },
    ActionSpec {
        name: "nuzzle",
        description: "Nuzzles the specified user.",
        image_type: "nuzzle",
        target: "💬 {author} nuzzles {targets}",
        lonely: "💬 *nuzzles {author}*",
        own: "💬 {author} nuzzles themselves.",
    },
    ActionSpec {
        name: "bloodsuck",
        description: "Sucks the blood of a user.",
        image_type: "bite",
        target: "💬 {author} sucks the blood of {targets}",
        lonely: "💬 {author} looks around for someone to bite.",
        own: "💬 {author} sucks their own blood. Gross.",
    },
];

pub const IMAGES_TABLE: &[ImageSpec] = &[
    ImageSpec {
        name: "lewd",
        description: "T-Too lewd!",
        image_type: "lewd",
        text: "Y-You lewdie!",
    },
    ImageSpec {
        name: "meow",
        description: "Meows at the specified user.",
        image_type: "meow",
        text: "*meow*",
    },
    ImageSpec {
        name: "nom",
        description: "*nom nom*",
        image_type: "nom",
        text: "*nom nom*",
    },
    ImageSpec {
        name: "facedesk",
        description: "When it's just too much to handle.",
        image_type: "banghead",
        text: "*facedesks*",
    },
];

const TSUNDERE_LINES: &[&str] = &[
    "Y-You baka!",
    "I-It's not like I like you or anything...",
    "Don't get the wrong idea!",
    "Hmph! I just happened to be here.",
    "I didn't do it for you, baka!",
    "W-Whatever, it's not like I care.",
];

pub fn find_action(name: &str) -> Option<&'static ActionSpec> {
    ACTIONS_TABLE.iter().find(|spec| spec.name == name)
}

pub fn find_image(name: &str) -> Option<&'static ImageSpec> {
    IMAGES_TABLE.iter().find(|spec| spec.name == name)
}

/// Sentence for an action by `author` aimed at `targets`
pub fn action_sentence(spec: &ActionSpec, author: UserId, targets: &[UserId]) -> String {
    let author_mention = format!("<@{}>", author);
    let others: Vec<String> = targets
        .iter()
        .filter(|id| **id != author)
        .map(|id| format!("<@{}>", id))
        .collect();

    if targets.is_empty() {
        spec.lonely.replace("{author}", &author_mention)
    } else if others.is_empty() {
        spec.own.replace("{author}", &author_mention)
    } else {
        spec.target
            .replace("{author}", &author_mention)
            .replace("{targets}", &others.join(", "))
    }
}

/// Register every image action and image command from their templates
pub fn register_actions(registry: &mut CommandRegistry) {
    for spec in ACTIONS_TABLE {
        registry.register_template(image_action, spec.name, spec.description, category::ACTION);
    }
    for spec in IMAGES_TABLE {
        registry.register_template(image_command, spec.name, spec.description, category::ACTION);
    }
    registry.register_alias("meow", "mew");
    registry.register(tsundere(), category::ACTION);
}

async fn send_image(ctx: Context<'_>, image_type: &str, text: String) -> Result<(), Error> {
    match ctx.data().weeb.random_image(image_type).await {
        Ok(image) => {
            ctx.send(
                CreateReply::default()
                    .content(text)
                    .embed(CreateEmbed::new().image(image.url)),
            )
            .await?;
        }
        Err(WeebError::MissingKey) => {
            ctx.say(format_error("Image actions aren't configured on this bot"))
                .await?;
        }
        Err(e) => {
            warn!("Failed to fetch {} image: {}", image_type, e);
            ctx.say(format_sad("Couldn't fetch an image, try again later"))
                .await?;
        }
    }
    Ok(())
}

/// Template for the image actions, registered under each action's name
#[poise::command(prefix_command, slash_command)]
pub async fn image_action(
    ctx: Context<'_>,
    #[description = "Users to do it to"]
    #[rest]
    users: Option<String>,
) -> Result<(), Error> {
    let Some(spec) = find_action(&ctx.command().name) else {
        return Ok(());
    };

    let targets = parse_user_mentions(users.as_deref().unwrap_or_default());
    let text = action_sentence(spec, ctx.author().id, &targets);

    ACTIONS.with_label_values(&[spec.name]).inc();
    send_image(ctx, spec.image_type, text).await
}

/// Template for the image commands without a target
#[poise::command(prefix_command, slash_command)]
pub async fn image_command(ctx: Context<'_>) -> Result<(), Error> {
    let Some(spec) = find_image(&ctx.command().name) else {
        return Ok(());
    };

    ACTIONS.with_label_values(&[spec.name]).inc();
    send_image(ctx, spec.image_type, spec.text.to_string()).await
}

/// Y-You baka!
#[poise::command(prefix_command, slash_command)]
pub async fn tsundere(ctx: Context<'_>) -> Result<(), Error> {
    let line = TSUNDERE_LINES
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or("Baka!");

    ACTIONS.with_label_values(&["tsundere"]).inc();
    ctx.say(format!("📣 {}", line)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_sentence_forms() {
        let spec = find_action("hug").unwrap();
        let author = UserId::new(1);

        assert_eq!(
            action_sentence(spec, author, &[UserId::new(2), UserId::new(3)]),
            "💬 <@1> hugs <@2>, <@3>"
        );
        assert_eq!(
            action_sentence(spec, author, &[]),
            "💬 *hugs <@1>* Here, have a hug."
        );
        assert!(action_sentence(spec, author, &[author]).contains("hugs themselves"));
    }

    #[test]
    fn test_author_is_dropped_from_targets() {
        let spec = find_action("pat").unwrap();
        let sentence = action_sentence(spec, UserId::new(1), &[UserId::new(1), UserId::new(2)]);
        assert_eq!(sentence, "💬 <@1> pats <@2>");
    }

    #[test]
    fn test_tables() {
        assert_eq!(ACTIONS_TABLE.len(), 18);
        assert_eq!(find_action("holdhands").unwrap().image_type, "handholding");
        assert_eq!(find_image("facedesk").unwrap().image_type, "banghead");
        assert!(find_action("lewd").is_none());
    }

    #[test]
    fn test_registration() {
        let mut registry = CommandRegistry::new();
        register_actions(&mut registry);

        assert_eq!(registry.len(), ACTIONS_TABLE.len() + IMAGES_TABLE.len() + 1);
        assert_eq!(registry.find("mew").unwrap().name, "meow");
        assert_eq!(
            registry.find("stare").unwrap().category.as_deref(),
            Some("Action")
        );
    }
}
