/// Reply markers put in front of bot messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emote {
    Error,
    Correct,
    Talking,
    Sad,
}

impl Emote {
    pub fn as_str(self) -> &'static str {
        match self {
            Emote::Error => "❌",
            Emote::Correct => "✅",
            Emote::Talking => "💬",
            Emote::Sad => "😦",
        }
    }

    pub fn reply(self, message: &str) -> String {
        format!("{} {}", self.as_str(), message)
    }
}

pub fn format_error(message: &str) -> String {
    Emote::Error.reply(message)
}

pub fn format_success(message: &str) -> String {
    Emote::Correct.reply(message)
}

pub fn format_info(message: &str) -> String {
    Emote::Talking.reply(message)
}

pub fn format_sad(message: &str) -> String {
    Emote::Sad.reply(message)
}

/// Shown when a query fails, the cause only goes to the logs
pub fn build_database_error() -> String {
    format_error("I couldn't reach my storage, give it another try in a bit.")
}

/// Fenced block, `language` picks the highlighting (`md`, `diff`, ...)
pub fn code_block(language: &str, body: &str) -> String {
    format!("```{}\n{}```", language, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replies_carry_their_emote() {
        assert_eq!(format_error("No pets here"), "❌ No pets here");
        assert_eq!(format_success("Renamed"), "✅ Renamed");
        assert_eq!(format_info("Queue is empty"), "💬 Queue is empty");
        assert_eq!(format_sad("No image"), "😦 No image");
    }

    #[test]
    fn test_database_error_hides_details() {
        let reply = build_database_error();
        assert!(reply.starts_with(Emote::Error.as_str()));
        assert!(!reply.to_lowercase().contains("sql"));
    }

    #[test]
    fn test_code_block() {
        assert_eq!(code_block("md", "# opts\n"), "```md\n# opts\n```");
    }
}
