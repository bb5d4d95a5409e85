/// Server configuration options addressed by colon-delimited paths
pub mod guild;

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

use crate::models::{Context, Error};

pub use guild::build_option_registry;

pub type OptionFuture<'a> = Pin<Box<dyn Future<Output = Result<(), Error>> + Send + 'a>>;

/// Runs an option with the arguments left after its path
pub type OptionHandler = for<'a> fn(Context<'a>, Vec<String>) -> OptionFuture<'a>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    General,
    Channel,
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionKind::General => write!(f, "GENERAL"),
            OptionKind::Channel => write!(f, "CHANNEL"),
        }
    }
}

#[derive(Clone)]
pub struct GuildOption {
    pub name: String,
    pub description: String,
    pub short_description: String,
    pub kind: OptionKind,
    pub handler: OptionHandler,
}

impl GuildOption {
    pub fn new(name: &str, description: &str, kind: OptionKind, handler: OptionHandler) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            short_description: "Not set.".to_string(),
            kind,
            handler,
        }
    }

    pub fn short_description(mut self, short_description: &str) -> Self {
        self.short_description = short_description.to_string();
        self
    }
}

#[derive(Default)]
pub struct OptionRegistry {
    options: HashMap<String, GuildOption>,
    available: Vec<String>,
}

impl OptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_option(&mut self, path: &str, option: GuildOption) {
        self.available.push(format!(
            "{:<34} | {}",
            path.replace(':', " "),
            option.short_description
        ));
        self.options.insert(path.to_string(), option);
    }

    /// Register `alias` as another path to `existing`, false if `existing` is unknown
    pub fn add_alias(&mut self, existing: &str, alias: &str) -> bool {
        let Some(option) = self.options.get(existing).cloned() else {
            return false;
        };

        self.available.push(format!(
            "{:<34} | {} (Alias)",
            alias.replace(':', " "),
            option.short_description
        ));
        self.options.insert(alias.to_string(), option);
        true
    }

    /// One formatted line per registered path, in registration order
    pub fn available_options(&self) -> &[String] {
        &self.available
    }

    pub fn get(&self, path: &str) -> Option<&GuildOption> {
        self.options.get(path)
    }

    /// Join `args` with ':' one at a time until a path matches.
    ///
    /// Returns the option and the arguments after its path.
    pub fn resolve(&self, args: &[String]) -> Option<(&GuildOption, Vec<String>)> {
        let mut path = String::new();
        for (i, arg) in args.iter().enumerate() {
            if !path.is_empty() {
                path.push(':');
            }
            path.push_str(&arg.replace('\n', ""));

            if let Some(option) = self.options.get(&path) {
                return Some((option, args[i + 1..].to_vec()));
            }
        }
        None
    }

    /// Same lookup as `resolve`, for showing an option's help
    pub fn help(&self, args: &[String]) -> Option<&GuildOption> {
        self.resolve(args).map(|(option, _)| option)
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_ctx: Context<'_>, _args: Vec<String>) -> OptionFuture<'_> {
        Box::pin(async { Ok(()) })
    }

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn registry() -> OptionRegistry {
        let mut registry = OptionRegistry::new();
        registry.add_option(
            "prefix:set",
            GuildOption::new("Prefix set", "Sets the server prefix.", OptionKind::General, noop)
                .short_description("Sets the server prefix."),
        );
        registry.add_option(
            "check:data",
            GuildOption::new("Data check", "Shows settings.", OptionKind::General, noop),
        );
        registry
    }

    #[test]
    fn test_available_options_format() {
        let registry = registry();
        let lines = registry.available_options();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], format!("{:<34} | Sets the server prefix.", "prefix set"));
        assert!(lines[1].ends_with("| Not set."));
    }

    #[test]
    fn test_alias_uses_target_description() {
        let mut registry = registry();
        assert!(registry.add_alias("prefix:set", "prefix:change"));
        assert!(!registry.add_alias("missing:path", "other"));

        let last = registry.available_options().last().unwrap();
        assert!(last.starts_with("prefix change"));
        assert!(last.ends_with("Sets the server prefix. (Alias)"));
        assert_eq!(registry.get("prefix:change").unwrap().name, "Prefix set");
    }

    #[test]
    fn test_resolve_returns_remaining_args() {
        let registry = registry();
        let (option, rest) = registry.resolve(&args(&["prefix", "set", "!", "extra"])).unwrap();
        assert_eq!(option.name, "Prefix set");
        assert_eq!(rest, args(&["!", "extra"]));

        let (option, rest) = registry.resolve(&args(&["check", "data"])).unwrap();
        assert_eq!(option.name, "Data check");
        assert!(rest.is_empty());
    }

    #[test]
    fn test_resolve_unknown_path() {
        let registry = registry();
        assert!(registry.resolve(&args(&["prefix", "nope"])).is_none());
        assert!(registry.resolve(&[]).is_none());
    }

    #[test]
    fn test_help_lookup() {
        let registry = registry();
        let option = registry.help(&args(&["check", "data"])).unwrap();
        assert_eq!(option.kind, OptionKind::General);
        assert!(registry.help(&args(&["check"])).is_none());
    }

    #[test]
    fn test_option_kind_labels() {
        assert_eq!(OptionKind::General.to_string(), "GENERAL");
        assert_eq!(OptionKind::Channel.to_string(), "CHANNEL");
    }
}
