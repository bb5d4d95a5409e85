use chrono::{DateTime, Utc};
use poise::serenity_prelude::GuildId;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "schedule_type", rename_all = "snake_case")]
pub enum ScheduleType {
    /// Post today's birthdays in the guild's birthday channel
    Birthday,
    /// Hand out and take back the birthday role
    BirthdayRole,
}

/// A stored cron trigger for one of the birthday tasks.
///
/// `guild_id` is `None` for tasks that cover every guild the bot is in.
#[derive(Debug, Clone)]
pub struct Schedule {
    pub id: i32,
    pub guild_id: Option<GuildId>,
    pub schedule_type: ScheduleType,
    /// Six field cron in UTC, seconds first
    pub cron_expression: String,
    pub enabled: bool,
}

impl Schedule {
    /// First firing strictly after `now`
    pub fn next_run(&self, now: DateTime<Utc>) -> Result<Option<DateTime<Utc>>, cron::error::Error> {
        let cron = cron::Schedule::from_str(&self.cron_expression)?;
        Ok(cron.after(&now).next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn daily(cron_expression: &str) -> Schedule {
        Schedule {
            id: 1,
            guild_id: Some(GuildId::new(5)),
            schedule_type: ScheduleType::BirthdayRole,
            cron_expression: cron_expression.to_string(),
            enabled: true,
        }
    }

    #[test]
    fn test_next_run() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap();
        assert_eq!(
            daily("0 30 8 * * *").next_run(now).unwrap(),
            Some(Utc.with_ymd_and_hms(2025, 6, 2, 8, 30, 0).unwrap())
        );
        assert!(daily("at dawn").next_run(now).is_err());
    }
}
