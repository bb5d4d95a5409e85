/// Command modules and the registry that assembles them
pub mod action;
pub mod birthday;
pub mod fun;
pub mod game;
pub mod music;
pub mod opts;
pub mod pet;
pub mod registry;

use registry::{CommandRegistry, category};

/// Every command the bot serves, categorized
pub fn build_registry() -> CommandRegistry {
    let mut registry = CommandRegistry::new();

    action::register_actions(&mut registry);

    registry.register(fun::coinflip(), category::FUN);
    registry.register(fun::ratewaifu(), category::FUN);
    registry.register(fun::roll(), category::FUN);
    registry.register(fun::love(), category::FUN);
    registry.register_alias("ratewaifu", "rw");
    registry.register_alias("ratewaifu", "rate");

    registry.register(birthday::birthday(), category::UTILS);
    registry.register(opts::opts(), category::MODERATION);
    registry.register(game::game(), category::GAMES);
    registry.register(pet::pet(), category::PETS);

    registry.register(music::play(), category::MUSIC);
    registry.register(music::skip(), category::MUSIC);
    registry.register(music::stop(), category::MUSIC);
    registry.register(music::queue(), category::MUSIC);
    registry.register(music::repeat(), category::MUSIC);

    registry
}
