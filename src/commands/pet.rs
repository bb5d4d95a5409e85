use chrono::Utc;
use poise::CreateReply;
use poise::serenity_prelude::{CreateEmbed, CreateEmbedFooter, UserId};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{error, info};

use crate::constants::{INCUBATOR_EGG, LIST_PAGE_SIZE, PET_RENAME_COST};
use crate::models::{Context, Error};
use crate::pets::{
    AFFECTION_DISPLAY_MAX, Pet, affection_gain, generate_pet, incubation_cost, is_valid_pet_name,
    parse_pet_target, progress_bar,
};
use crate::utils::messages::{build_database_error, format_error, format_success};
use crate::utils::ratelimit::{IncreasingRateLimiter, ratelimit};
use crate::utils::string_utils::divide_string;

const RENAME_CONFIRM_TIMEOUT: Duration = Duration::from_secs(30);

static PET_ACTION_LIMITER: LazyLock<IncreasingRateLimiter> = LazyLock::new(|| {
    IncreasingRateLimiter::builder()
        .limit(1)
        .spam_tolerance(2)
        .cooldown(Duration::from_secs(20))
        .max_cooldown(Duration::from_secs(5 * 60))
        .random_increment(true)
        .prefix("petaction")
        .build()
});

static PET_PET_LIMITER: LazyLock<IncreasingRateLimiter> = LazyLock::new(|| {
    IncreasingRateLimiter::builder()
        .limit(1)
        .spam_tolerance(1)
        .cooldown(Duration::from_secs(30 * 60))
        .max_cooldown(Duration::from_secs(60 * 60))
        .prefix("petpet")
        .build()
});

fn pet_tree_key(user_id: UserId) -> String {
    user_id.to_string()
}

/// Every `pet` subcommand shares one per-user limit
async fn pet_tree_gate(ctx: Context<'_>) -> Result<bool, Error> {
    ratelimit(ctx, &PET_ACTION_LIMITER, &pet_tree_key(ctx.author().id)).await
}

/// Pet list lines split into pages
pub fn pet_list_pages(pets: &[Pet]) -> Vec<String> {
    let body: String = pets
        .iter()
        .map(|pet| {
            format!(
                "• **{}** ({}, tier {}) `{}`\n",
                pet.name,
                pet.element.readable(),
                pet.tier(),
                pet.id
            )
        })
        .collect();
    divide_string(LIST_PAGE_SIZE, '\n', &body)
}

/// Why a new pet can't be incubated, checked before anything is paid
pub fn incubation_blocker(
    name: &str,
    eggs: i32,
    owned: i64,
    slots: i32,
    name_taken: bool,
    money: i64,
    cost: i64,
) -> Option<String> {
    if !is_valid_pet_name(name) {
        return Some("Pet names can only contain letters".to_string());
    }
    if eggs < 1 {
        return Some("You need an incubator egg to incubate a pet. Win some games to find one!".to_string());
    }
    if owned >= slots as i64 {
        return Some(format!("You don't have free pet slots, you can only have {} pets", slots));
    }
    if name_taken {
        return Some("You already have a pet with that name".to_string());
    }
    if money < cost {
        return Some(format!(
            "You don't have enough money to incubate this pet, it costs **{}** credits",
            cost
        ));
    }
    None
}

fn overview_embed(pet: &Pet) -> CreateEmbed {
    let now = Utc::now();
    CreateEmbed::new()
        .title(format!("Pet overview: {}", pet.name))
        .description(format!(
            "**Tier {}** {} pet, owned by <@{}>",
            pet.tier(),
            pet.element,
            pet.owner_id
        ))
        .field(
            "Created",
            format!("{} ({} days ago)", pet.created_at.format("%Y-%m-%d"), pet.age_days(now)),
            true,
        )
        .field(
            "Affection",
            format!(
                "{} ({}/{})",
                progress_bar(pet.affection, AFFECTION_DISPLAY_MAX),
                pet.affection.min(AFFECTION_DISPLAY_MAX),
                AFFECTION_DISPLAY_MAX
            ),
            true,
        )
        .field(
            "HP",
            format!(
                "{} ({}/{})",
                progress_bar(pet.current_hp as i64, pet.hp as i64),
                pet.current_hp,
                pet.hp
            ),
            true,
        )
        .field(
            "Stamina",
            format!(
                "{} ({}/{})",
                progress_bar(pet.current_stamina as i64, pet.stamina as i64),
                pet.current_stamina,
                pet.stamina
            ),
            true,
        )
        .field("Fly", if pet.fly { "Yes" } else { "No" }, true)
        .field("Venom", if pet.venom { "Yes" } else { "No" }, true)
        .footer(CreateEmbedFooter::new(format!("Pet ID: {}", pet.id)))
}

/// Shows a pet. `pet <name>` for yours, `pet @user <name>` for someone else's.
#[poise::command(
    prefix_command,
    slash_command,
    subcommands("incubate", "rename", "ls", "pet_pet"),
    subcommand_required = false
)]
pub async fn pet(
    ctx: Context<'_>,
    #[description = "Pet name, optionally after a user mention"]
    #[rest]
    target: Option<String>,
) -> Result<(), Error> {
    if !pet_tree_gate(ctx).await? {
        return Ok(());
    }

    let (owner, name) = parse_pet_target(target.as_deref().unwrap_or_default());
    if name.is_empty() {
        ctx.say(format_error(
            "Tell me which pet to show. Use `pet ls` to see your pets",
        ))
        .await?;
        return Ok(());
    }
    let owner = owner.unwrap_or(ctx.author().id);

    match ctx.data().db.get_pet(owner, &name).await {
        Ok(Some(pet)) => {
            ctx.send(CreateReply::default().embed(overview_embed(&pet)))
                .await?;
        }
        Ok(None) => {
            ctx.say(format_error("There's no pet with that name")).await?;
        }
        Err(e) => {
            error!("Failed to load pet {} of {}: {}", name, owner, e);
            ctx.say(build_database_error()).await?;
        }
    }
    Ok(())
}

/// Incubates a new pet. Needs an incubator egg and some credits.
#[poise::command(prefix_command, slash_command)]
pub async fn incubate(
    ctx: Context<'_>,
    #[description = "Name of the new pet, letters only"] name: String,
) -> Result<(), Error> {
    if !pet_tree_gate(ctx).await? {
        return Ok(());
    }

    let user_id = ctx.author().id;
    let db = &ctx.data().db;
    let name = name.trim().to_string();

    let (player, eggs, owned, existing) = match tokio::try_join!(
        db.get_player(user_id),
        db.item_count(user_id, INCUBATOR_EGG),
        db.count_pets(user_id),
        db.get_pet(user_id, &name),
    ) {
        Ok(loaded) => loaded,
        Err(e) => {
            error!("Failed to load pet data for {}: {}", user_id, e);
            ctx.say(build_database_error()).await?;
            return Ok(());
        }
    };

    let (cost, pet) = {
        let mut rng = rand::rng();
        let cost = incubation_cost(&mut rng);
        (cost, generate_pet(&mut rng, user_id, &name))
    };

    if let Some(reason) = incubation_blocker(
        &name,
        eggs,
        owned,
        player.pet_slots,
        existing.is_some(),
        player.money,
        cost,
    ) {
        ctx.say(format_error(&reason)).await?;
        return Ok(());
    }

    match db.incubate_pet(&pet, cost).await {
        Ok(true) => {
            info!("User {} incubated pet {} ({})", user_id, pet.name, pet.id);
            ctx.send(
                CreateReply::default()
                    .content(format_success(&format!(
                        "Your egg hatched! Say hi to **{}**. It cost you **{}** credits.",
                        pet.name, cost
                    )))
                    .embed(overview_embed(&pet)),
            )
            .await?;
        }
        Ok(false) => {
            ctx.say(format_error(
                "You no longer have an egg or enough credits to incubate this pet",
            ))
            .await?;
        }
        Err(e) => {
            error!("Failed to incubate pet for {}: {}", user_id, e);
            ctx.say(build_database_error()).await?;
        }
    }
    Ok(())
}

/// Renames one of your pets for 500 credits.
#[poise::command(prefix_command, slash_command)]
pub async fn rename(
    ctx: Context<'_>,
    #[description = "Current pet name"] old_name: String,
    #[description = "New pet name, letters only"] new_name: String,
) -> Result<(), Error> {
    if !pet_tree_gate(ctx).await? {
        return Ok(());
    }

    let user_id = ctx.author().id;
    let data = ctx.data();

    if !is_valid_pet_name(&new_name) {
        ctx.say(format_error("Pet names can only contain letters"))
            .await?;
        return Ok(());
    }

    if let Some(reason) = rename_blocker(ctx, user_id, &old_name, &new_name).await? {
        ctx.say(format_error(&reason)).await?;
        return Ok(());
    }

    ctx.say(format!(
        "⚠️ Renaming **{}** to **{}** costs **{}** credits. Type `yes` within 30 seconds to confirm.",
        old_name, new_name, PET_RENAME_COST
    ))
    .await?;

    let reply = ctx
        .author()
        .await_reply(ctx.serenity_context())
        .channel_id(ctx.channel_id())
        .timeout(RENAME_CONFIRM_TIMEOUT)
        .await;

    let Some(reply) = reply else {
        ctx.say(format_error("Timed out, the pet wasn't renamed")).await?;
        return Ok(());
    };

    let prefixes = data.prefixes_for(ctx.guild_id());
    if !is_confirmation(&reply.content, &prefixes) {
        ctx.say(format_error("Cancelled the rename")).await?;
        return Ok(());
    }

    // the pets or the money may have changed while waiting
    if let Some(reason) = rename_blocker(ctx, user_id, &old_name, &new_name).await? {
        ctx.say(format_error(&reason)).await?;
        return Ok(());
    }

    match data
        .db
        .rename_pet(user_id, &old_name, &new_name, PET_RENAME_COST)
        .await
    {
        Ok(true) => {
            info!("User {} renamed pet {} to {}", user_id, old_name, new_name);
            ctx.say(format_success(&format!(
                "Renamed **{}** to **{}**!",
                old_name, new_name
            )))
            .await?;
        }
        Ok(false) => {
            ctx.say(format_error("Couldn't rename the pet, check your pets and credits"))
                .await?;
        }
        Err(e) => {
            error!("Failed to rename pet for {}: {}", user_id, e);
            ctx.say(build_database_error()).await?;
        }
    }
    Ok(())
}

/// `yes`, with or without a leading bot prefix
pub fn is_confirmation(content: &str, prefixes: &[String]) -> bool {
    let mut answer = content.trim();
    for prefix in prefixes {
        if let Some(rest) = answer.strip_prefix(prefix.as_str()) {
            answer = rest.trim();
            break;
        }
    }
    answer.eq_ignore_ascii_case("yes")
}

async fn rename_blocker(
    ctx: Context<'_>,
    user_id: UserId,
    old_name: &str,
    new_name: &str,
) -> Result<Option<String>, Error> {
    let db = &ctx.data().db;

    let (player, old, new) = tokio::try_join!(
        db.get_player(user_id),
        db.get_pet(user_id, old_name),
        db.get_pet(user_id, new_name),
    )?;

    if old.is_none() {
        return Ok(Some("You don't have a pet with that name".to_string()));
    }
    if new.is_some() {
        return Ok(Some("You already have a pet with the new name".to_string()));
    }
    if player.money < PET_RENAME_COST {
        return Ok(Some(format!(
            "You need **{}** credits to rename a pet",
            PET_RENAME_COST
        )));
    }
    Ok(None)
}

/// Lists your pets.
#[poise::command(prefix_command, slash_command, aliases("list"))]
pub async fn ls(ctx: Context<'_>) -> Result<(), Error> {
    if !pet_tree_gate(ctx).await? {
        return Ok(());
    }

    let pets = match ctx.data().db.list_pets(ctx.author().id).await {
        Ok(pets) => pets,
        Err(e) => {
            error!("Failed to list pets of {}: {}", ctx.author().id, e);
            ctx.say(build_database_error()).await?;
            return Ok(());
        }
    };

    if pets.is_empty() {
        ctx.say(format_error(
            "You don't have any pets. Use `pet incubate <name>` to get one",
        ))
        .await?;
        return Ok(());
    }

    let pages: Vec<String> = pet_list_pages(&pets)
        .into_iter()
        .map(|page| format!("**Your pets**\n{}", page))
        .collect();
    let pages: Vec<&str> = pages.iter().map(String::as_str).collect();
    poise::builtins::paginate(ctx, &pages).await?;
    Ok(())
}

/// Pets one of your pets. Raises its affection.
#[poise::command(prefix_command, slash_command, rename = "pet")]
pub async fn pet_pet(
    ctx: Context<'_>,
    #[description = "Name of the pet"] name: String,
) -> Result<(), Error> {
    if !pet_tree_gate(ctx).await? {
        return Ok(());
    }

    let user_id = ctx.author().id;
    let db = &ctx.data().db;

    let pet = match db.get_pet(user_id, name.trim()).await {
        Ok(Some(pet)) => pet,
        Ok(None) => {
            ctx.say(format_error("You don't have a pet with that name"))
                .await?;
            return Ok(());
        }
        Err(e) => {
            error!("Failed to load pet {} of {}: {}", name, user_id, e);
            ctx.say(build_database_error()).await?;
            return Ok(());
        }
    };

    if !ratelimit(ctx, &PET_PET_LIMITER, &pet.id).await? {
        return Ok(());
    }

    let times_petted = pet.times_petted + 1;
    let gain = affection_gain(&mut rand::rng(), times_petted);
    let affection = pet.affection + gain;

    if let Err(e) = db.update_pet_affection(&pet.id, times_petted, affection).await {
        error!("Failed to update affection of pet {}: {}", pet.id, e);
        ctx.say(build_database_error()).await?;
        return Ok(());
    }

    ctx.say(format!(
        "💗 You pet **{}**. It has been pet **{}** times and gained **{}** affection.",
        pet.name, times_petted, gain
    ))
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pets::Element;

    fn pet(name: &str) -> Pet {
        Pet {
            id: format!("id-{}", name),
            owner_id: UserId::new(1),
            name: name.to_string(),
            element: Element::Fire,
            hp: 100,
            current_hp: 100,
            stamina: 80,
            current_stamina: 40,
            affection: 20,
            times_petted: 0,
            fly: true,
            venom: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_incubation_blocker_order() {
        assert!(incubation_blocker("M0chi", 1, 0, 4, false, 1000, 100).unwrap().contains("letters"));
        assert!(incubation_blocker("Mochi", 0, 0, 4, false, 1000, 100).unwrap().contains("egg"));
        assert!(incubation_blocker("Mochi", 1, 4, 4, false, 1000, 100).unwrap().contains("slots"));
        assert!(incubation_blocker("Mochi", 1, 0, 4, true, 1000, 100).unwrap().contains("already"));
        assert!(incubation_blocker("Mochi", 1, 0, 4, false, 99, 100).unwrap().contains("**100**"));
        assert!(incubation_blocker("Mochi", 1, 3, 4, false, 100, 100).is_none());
    }

    #[test]
    fn test_is_confirmation() {
        let prefixes = vec!["~>".to_string(), "!".to_string()];
        assert!(is_confirmation("yes", &prefixes));
        assert!(is_confirmation(" YES ", &prefixes));
        assert!(is_confirmation("~>yes", &prefixes));
        assert!(is_confirmation("! yes", &prefixes));
        assert!(!is_confirmation("no", &prefixes));
        assert!(!is_confirmation("yes please", &prefixes));
    }

    #[test]
    fn test_pet_list_pages() {
        let pets = vec![pet("Mochi"), pet("Tofu")];
        let pages = pet_list_pages(&pets);
        assert_eq!(pages.len(), 1);
        assert!(pages[0].contains("**Mochi** (Fire, tier 4) `id-Mochi`"));
        assert!(pages[0].contains("**Tofu**"));
    }

    #[test]
    fn test_pet_tree_shares_one_limit_per_user() {
        // an incubate followed by a pet pet from the same user hits the same bucket
        let user = UserId::new(987_654_321);
        assert!(PET_ACTION_LIMITER.try_acquire(&pet_tree_key(user)).allowed);
        assert!(!PET_ACTION_LIMITER.try_acquire(&pet_tree_key(user)).allowed);

        let other = UserId::new(987_654_322);
        assert!(PET_ACTION_LIMITER.try_acquire(&pet_tree_key(other)).allowed);
    }
}
