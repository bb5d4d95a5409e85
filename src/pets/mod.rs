use chrono::{DateTime, Utc};
use poise::serenity_prelude::UserId;
use rand::Rng;
use std::fmt;
use std::str::FromStr;

use crate::utils::string_utils::is_letters_only;

const BLOCK_ACTIVE: &str = "\u{25A0}";
const BLOCK_INACTIVE: &str = "\u{25A1}";
const TOTAL_BLOCKS: i64 = 5;

/// Affection is displayed against this ceiling
pub const AFFECTION_DISPLAY_MAX: i64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Element {
    Fire,
    Water,
    Earth,
    Air,
    Electric,
    Ice,
}

impl Element {
    pub const ALL: [Element; 6] = [
        Element::Fire,
        Element::Water,
        Element::Earth,
        Element::Air,
        Element::Electric,
        Element::Ice,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Element::Fire => "fire",
            Element::Water => "water",
            Element::Earth => "earth",
            Element::Air => "air",
            Element::Electric => "electric",
            Element::Ice => "ice",
        }
    }

    pub fn readable(&self) -> &'static str {
        match self {
            Element::Fire => "Fire",
            Element::Water => "Water",
            Element::Earth => "Earth",
            Element::Air => "Air",
            Element::Electric => "Electric",
            Element::Ice => "Ice",
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.readable())
    }
}

impl FromStr for Element {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Element::ALL
            .into_iter()
            .find(|element| element.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown pet element '{}'", s))
    }
}

/// A pet owned by a player
#[derive(Debug, Clone, PartialEq)]
pub struct Pet {
    pub id: String,
    pub owner_id: UserId,
    pub name: String,
    pub element: Element,
    pub hp: i32,
    pub current_hp: i32,
    pub stamina: i32,
    pub current_stamina: i32,
    pub affection: i64,
    pub times_petted: i64,
    pub fly: bool,
    pub venom: bool,
    pub created_at: DateTime<Utc>,
}

impl Pet {
    /// Tier from 1 to 5, grows with the base stats
    pub fn tier(&self) -> i32 {
        (1 + (self.hp + self.stamina) / 60).clamp(1, 5)
    }

    pub fn age_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_days().max(0)
    }
}

/// Roll a freshly hatched pet
pub fn generate_pet<R: Rng + ?Sized>(rng: &mut R, owner_id: UserId, name: &str) -> Pet {
    let element = Element::ALL[rng.random_range(0..Element::ALL.len())];
    let hp = rng.random_range(0..150).max(20);
    let stamina = rng.random_range(0..140).max(20);
    let affection = rng.random_range(0..100i64).max(15);

    // Venom and fly never come together
    let venom = rng.random_bool(0.5);
    let fly = !venom && rng.random_bool(0.5);

    Pet {
        id: uuid::Uuid::new_v4().to_string(),
        owner_id,
        name: name.to_string(),
        element,
        hp,
        current_hp: hp,
        stamina,
        current_stamina: stamina,
        affection,
        times_petted: 0,
        fly,
        venom,
        created_at: Utc::now(),
    }
}

/// Credits needed to incubate a new pet
pub fn incubation_cost<R: Rng + ?Sized>(rng: &mut R) -> i64 {
    rng.random_range(0..1000i64).max(70)
}

/// Affection gained by one more pat
pub fn affection_gain<R: Rng + ?Sized>(rng: &mut R, times_petted: i64) -> i64 {
    times_petted / rng.random_range(0..50i64).max(10)
}

/// Five block bar showing `now` out of `total`
pub fn progress_bar(now: i64, total: i64) -> String {
    let active = if total <= 0 {
        0
    } else {
        (now.clamp(0, total) * TOTAL_BLOCKS) / total
    };

    (0..TOTAL_BLOCKS)
        .map(|i| if i < active { BLOCK_ACTIVE } else { BLOCK_INACTIVE })
        .collect()
}

pub fn is_valid_pet_name(name: &str) -> bool {
    is_letters_only(name.trim())
}

/// Split `pet` arguments into an optional owner mention and the pet name
pub fn parse_pet_target(args: &str) -> (Option<UserId>, String) {
    let trimmed = args.trim();
    let mut parts = trimmed.splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or_default();
    let rest = parts.next().map(str::trim).unwrap_or_default();

    match crate::utils::validation::parse_snowflake(first, "@") {
        Some(id) if first.starts_with("<@") && !rest.is_empty() => {
            (Some(UserId::new(id)), rest.to_string())
        }
        _ => (None, trimmed.to_string()),
    }
}
