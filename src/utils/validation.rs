use poise::serenity_prelude::{ChannelId, GuildId, UserId};

/// Validation error types
#[derive(Debug, PartialEq, Eq)]
pub enum ValidationError {
    NotInGuild,
    NotInVoice,
    MissingArgument(&'static str),
    InvalidChannel(String),
    InvalidRole(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::NotInGuild => write!(f, "This command must be used in a server"),
            ValidationError::NotInVoice => write!(f, "You need to be in a voice channel"),
            ValidationError::MissingArgument(name) => write!(f, "Missing argument: {}", name),
            ValidationError::InvalidChannel(value) => {
                write!(f, "'{}' is not a channel mention or id", value)
            }
            ValidationError::InvalidRole(value) => {
                write!(f, "'{}' is not a role mention or id", value)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Extract guild ID from context, returning error if not in a guild
pub fn require_guild(guild_id: Option<GuildId>) -> Result<GuildId, ValidationError> {
    guild_id.ok_or(ValidationError::NotInGuild)
}

/// Extract the voice channel the author is connected to
pub fn require_voice(channel_id: Option<ChannelId>) -> Result<ChannelId, ValidationError> {
    channel_id.ok_or(ValidationError::NotInVoice)
}

/// Parse `<@123>`, `<@!123>`, `<#123>` or `<@&123>` style mentions as well as raw ids
pub fn parse_snowflake(value: &str, sigil: &str) -> Option<u64> {
    let trimmed = value.trim();
    let inner = trimmed
        .strip_prefix('<')
        .and_then(|rest| rest.strip_suffix('>'))
        .and_then(|rest| rest.strip_prefix(sigil))
        .map(|rest| rest.trim_start_matches('!'))
        .unwrap_or(trimmed);

    inner.parse::<u64>().ok().filter(|id| *id != 0)
}

/// Every distinct user mentioned in `text`, in order of appearance
pub fn parse_user_mentions(text: &str) -> Vec<UserId> {
    let mut users: Vec<UserId> = Vec::new();
    for word in text.split_whitespace() {
        if !word.starts_with("<@") {
            continue;
        }
        if let Some(id) = parse_snowflake(word, "@").map(UserId::new) {
            if !users.contains(&id) {
                users.push(id);
            }
        }
    }
    users
}
