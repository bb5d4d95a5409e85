use std::collections::HashMap;
use tracing::warn;

use crate::models::{Data, Error};

pub type Command = poise::Command<Data, Error>;

/// Command categories, also used as the `categories` metric label
pub mod category {
    pub const ACTION: &str = "Action";
    pub const FUN: &str = "Fun";
    pub const GAMES: &str = "Games";
    pub const MODERATION: &str = "Moderation";
    pub const MUSIC: &str = "Music";
    pub const PETS: &str = "Pets";
    pub const UTILS: &str = "Utils";
}

/// Collects commands by name before handing them to the framework
#[derive(Default)]
pub struct CommandRegistry {
    commands: Vec<Command>,
    index: HashMap<String, usize>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a command under `category`, replacing any command with the same name
    pub fn register(&mut self, mut command: Command, category: &str) {
        command.category = Some(category.to_string());
        let name = command.name.to_lowercase();

        match self.index.get(&name) {
            Some(&position) => {
                warn!("Command {} registered twice, replacing it", name);
                self.commands[position] = command;
            }
            None => {
                self.index.insert(name, self.commands.len());
                self.commands.push(command);
            }
        }
    }

    /// Make `alias` invoke `name` as a prefix command
    pub fn register_alias(&mut self, name: &str, alias: &str) -> bool {
        let Some(&position) = self.index.get(&name.to_lowercase()) else {
            return false;
        };

        let command = &mut self.commands[position];
        if !command.aliases.iter().any(|a| a.eq_ignore_ascii_case(alias)) {
            command.aliases.push(alias.to_string());
        }
        true
    }

    /// Register a copy of `template` under another name.
    ///
    /// The handler sees the new name through `ctx.command().name`.
    pub fn register_template(
        &mut self,
        template: fn() -> Command,
        name: &str,
        description: &str,
        category: &str,
    ) {
        let mut command = template();
        command.name = name.to_string();
        command.qualified_name = name.to_string();
        command.identifying_name = name.to_string();
        command.description = Some(description.to_string());
        command.aliases.clear();
        self.register(command, category);
    }

    /// Find a command by name or alias, ignoring case
    pub fn find(&self, name: &str) -> Option<&Command> {
        if let Some(&position) = self.index.get(&name.to_lowercase()) {
            return self.commands.get(position);
        }

        self.commands
            .iter()
            .find(|command| command.aliases.iter().any(|a| a.eq_ignore_ascii_case(name)))
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn into_commands(self) -> Vec<Command> {
        self.commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(name: &str) -> Command {
        poise::Command {
            name: name.to_string(),
            qualified_name: name.to_string(),
            identifying_name: name.to_string(),
            ..Default::default()
        }
    }

    fn template() -> Command {
        command("template")
    }

    #[test]
    fn test_register_sets_category() {
        let mut registry = CommandRegistry::new();
        registry.register(command("roll"), category::FUN);

        let found = registry.find("ROLL").unwrap();
        assert_eq!(found.category.as_deref(), Some("Fun"));
    }

    #[test]
    fn test_duplicate_replaces() {
        let mut registry = CommandRegistry::new();
        registry.register(command("roll"), category::FUN);
        registry.register(command("roll"), category::GAMES);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.find("roll").unwrap().category.as_deref(), Some("Games"));
    }

    #[test]
    fn test_aliases() {
        let mut registry = CommandRegistry::new();
        registry.register(command("ratewaifu"), category::FUN);

        assert!(registry.register_alias("ratewaifu", "rw"));
        assert!(registry.register_alias("ratewaifu", "rw"));
        assert!(!registry.register_alias("missing", "nope"));

        let found = registry.find("RW").unwrap();
        assert_eq!(found.name, "ratewaifu");
        assert_eq!(found.aliases, vec!["rw".to_string()]);
        assert!(registry.find("nope").is_none());
    }

    #[test]
    fn test_templates() {
        let mut registry = CommandRegistry::new();
        registry.register_template(template, "hug", "Hugs someone.", category::ACTION);
        registry.register_template(template, "pat", "Pats someone.", category::ACTION);

        let commands = registry.into_commands();
        let names: Vec<&str> = commands.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["hug", "pat"]);
        assert_eq!(commands[1].description.as_deref(), Some("Pats someone."));
        assert_eq!(commands[1].qualified_name, "pat");
    }
}
