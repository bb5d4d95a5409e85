//! Birthday announcement rendering.
//!
//! Templates may use `{user}`, `{mention}`, `{date}` and `{age}`. A literal
//! `\n` typed in a Discord option turns into a line break.

use crate::utils::datetime::calculate_age;
use crate::utils::string_utils::process_newlines;

const DEFAULT_HEADER: &str = "🎉 **Happy Birthday** 🎉\n\nToday we celebrate:";
const DEFAULT_FOOTER: &str = "\nEveryone wish them a happy birthday! 🎂🎈";

/// Custom texts a guild can configure for its announcements
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnouncementTemplates {
    pub message: Option<String>,
    pub message_without_age: Option<String>,
    pub header: Option<String>,
    pub footer: Option<String>,
}

impl AnnouncementTemplates {
    fn header(&self) -> String {
        custom_or(&self.header, DEFAULT_HEADER)
    }

    fn footer(&self) -> String {
        custom_or(&self.footer, DEFAULT_FOOTER)
    }
}

/// A member being announced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Celebrant {
    pub name: String,
    pub mention: String,
    pub age: Option<i32>,
}

impl Celebrant {
    fn line(&self, templates: &AnnouncementTemplates, date: &str) -> String {
        let template = match self.age {
            Some(_) => templates.message.as_deref(),
            None => templates.message_without_age.as_deref(),
        };

        match (template, self.age) {
            (Some(template), _) => self.fill(template, date),
            (None, Some(age)) => format!("• {} (turning {})!", self.mention, age),
            (None, None) => format!("• {}!", self.mention),
        }
    }

    fn fill(&self, template: &str, date: &str) -> String {
        let age = self.age.map(|age| age.to_string()).unwrap_or_default();
        process_newlines(
            &template
                .replace("{user}", &self.name)
                .replace("{mention}", &self.mention)
                .replace("{date}", date)
                .replace("{age}", &age),
        )
    }
}

fn custom_or(text: &Option<String>, fallback: &str) -> String {
    text.as_deref()
        .map(process_newlines)
        .unwrap_or_else(|| fallback.to_string())
}

/// Age a user turns this year, if their birth year is known
pub fn age_this_year(birth_year: Option<i32>, current_year: i32) -> Option<i32> {
    birth_year
        .map(|year| calculate_age(year, current_year))
        .filter(|age| *age > 0)
}

pub fn build_announcement(
    celebrants: &[Celebrant],
    templates: &AnnouncementTemplates,
    date: &str,
) -> String {
    let mut lines = Vec::with_capacity(celebrants.len() + 2);
    lines.push(templates.header());
    lines.extend(celebrants.iter().map(|c| c.line(templates, date)));
    lines.push(templates.footer());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn celebrant(name: &str, id: u64, age: Option<i32>) -> Celebrant {
        Celebrant {
            name: name.to_string(),
            mention: format!("<@{}>", id),
            age,
        }
    }

    #[test]
    fn test_template_placeholders() {
        let alice = celebrant("Alice", 123, Some(25));
        assert_eq!(
            alice.fill("Happy birthday {user} ({mention})! {age} on {date}.", "1 January"),
            "Happy birthday Alice (<@123>)! 25 on 1 January."
        );
        assert_eq!(
            celebrant("Bob", 456, None).fill("Hi {mention}!\\nAge: {age}", "2 February"),
            "Hi <@456>!\nAge: "
        );
    }

    #[test]
    fn test_age_this_year() {
        assert_eq!(age_this_year(Some(2000), 2025), Some(25));
        assert_eq!(age_this_year(None, 2025), None);
        assert_eq!(age_this_year(Some(2030), 2025), None);
    }

    #[test]
    fn test_default_lines() {
        let templates = AnnouncementTemplates::default();
        assert_eq!(
            celebrant("Bob", 456, Some(30)).line(&templates, "20 April"),
            "• <@456> (turning 30)!"
        );
        assert_eq!(celebrant("Bob", 456, None).line(&templates, "20 April"), "• <@456>!");
    }

    #[test]
    fn test_template_picked_by_known_age() {
        let templates = AnnouncementTemplates {
            message: Some("{user} ({age})".to_string()),
            message_without_age: Some("{mention} celebrates today!".to_string()),
            ..Default::default()
        };
        assert_eq!(celebrant("Alice", 123, Some(25)).line(&templates, "15 March"), "Alice (25)");
        assert_eq!(
            celebrant("Charlie", 789, None).line(&templates, "15 March"),
            "<@789> celebrates today!"
        );
    }

    #[test]
    fn test_announcement_with_custom_header_and_footer() {
        let templates = AnnouncementTemplates {
            header: Some("Party!".to_string()),
            footer: Some("Bye\\nfor now".to_string()),
            ..Default::default()
        };
        let celebrants = [celebrant("Alice", 1, None), celebrant("Bob", 2, Some(20))];
        assert_eq!(
            build_announcement(&celebrants, &templates, "1 May"),
            "Party!\n• <@1>!\n• <@2> (turning 20)!\nBye\nfor now"
        );
    }

    #[test]
    fn test_default_announcement() {
        let message = build_announcement(
            &[celebrant("Alice", 1, None)],
            &AnnouncementTemplates::default(),
            "1 May",
        );
        assert!(message.starts_with("🎉 **Happy Birthday** 🎉"));
        assert!(message.contains("• <@1>!"));
        assert!(message.ends_with("happy birthday! 🎂🎈"));
    }
}
