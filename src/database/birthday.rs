use super::Database;
use poise::serenity_prelude::{ChannelId, GuildId, RoleId, UserId};

use crate::utils::message_formatter::AnnouncementTemplates;

/// Raw `user_birthdays` row: user id, month, day, year
pub type BirthdayRow = (i64, i32, i32, Option<i32>);

/// Announcement configuration of a guild
#[derive(Debug, Clone)]
pub struct BirthdayChannelConfig {
    pub channel_id: ChannelId,
    pub role_id: Option<RoleId>,
    pub announce_time: String,
    pub templates: AnnouncementTemplates,
}

#[derive(sqlx::FromRow)]
struct BirthdayChannelRow {
    channel_id: i64,
    birthday_role_id: Option<i64>,
    announce_time: String,
    custom_message: Option<String>,
    custom_message_without_age: Option<String>,
    custom_header: Option<String>,
    custom_footer: Option<String>,
}

impl From<BirthdayChannelRow> for BirthdayChannelConfig {
    fn from(row: BirthdayChannelRow) -> Self {
        BirthdayChannelConfig {
            channel_id: ChannelId::new(row.channel_id as u64),
            role_id: row.birthday_role_id.map(|id| RoleId::new(id as u64)),
            announce_time: row.announce_time,
            templates: AnnouncementTemplates {
                message: row.custom_message,
                message_without_age: row.custom_message_without_age,
                header: row.custom_header,
                footer: row.custom_footer,
            },
        }
    }
}

impl Database {
    /// Save or update a user's birthday
    pub async fn upsert_birthday(
        &self,
        user_id: UserId,
        month: i32,
        day: i32,
        year: Option<i32>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO user_birthdays (user_id, birth_month, birth_day, birth_year, updated_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (user_id)
            DO UPDATE SET
                birth_month = $2,
                birth_day = $3,
                birth_year = $4,
                updated_at = NOW()
            "#,
        )
        .bind(user_id.get() as i64)
        .bind(month)
        .bind(day)
        .bind(year)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Delete a user's birthday, returns whether one was stored
    pub async fn remove_birthday(&self, user_id: UserId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM user_birthdays WHERE user_id = $1")
            .bind(user_id.get() as i64)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Load every stored birthday
    pub async fn get_all_birthdays(&self) -> Result<Vec<BirthdayRow>, sqlx::Error> {
        sqlx::query_as(
            "SELECT user_id, birth_month, birth_day, birth_year FROM user_birthdays \
             ORDER BY updated_at DESC",
        )
        .fetch_all(self.pool())
        .await
    }

    /// Allow a guild to announce a user's birthday, returns false if already allowed
    pub async fn add_allowed_birthday(
        &self,
        guild_id: GuildId,
        user_id: UserId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO birthday_allowed_users (guild_id, user_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(guild_id.get() as i64)
        .bind(user_id.get() as i64)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Revoke a guild's permission to announce a user's birthday
    pub async fn remove_allowed_birthday(
        &self,
        guild_id: GuildId,
        user_id: UserId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM birthday_allowed_users WHERE guild_id = $1 AND user_id = $2",
        )
        .bind(guild_id.get() as i64)
        .bind(user_id.get() as i64)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Users that allowed this guild to announce their birthday
    pub async fn get_allowed_birthdays(&self, guild_id: GuildId) -> Result<Vec<UserId>, sqlx::Error> {
        let rows: Vec<(i64,)> =
            sqlx::query_as("SELECT user_id FROM birthday_allowed_users WHERE guild_id = $1")
                .bind(guild_id.get() as i64)
                .fetch_all(self.pool())
                .await?;

        Ok(rows
            .into_iter()
            .map(|(user_id,)| UserId::new(user_id as u64))
            .collect())
    }

    /// Set birthday announcement channel for a guild
    pub async fn set_birthday_channel(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        role_id: Option<RoleId>,
        announce_time: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO birthday_channels (guild_id, channel_id, birthday_role_id, announce_time)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (guild_id)
            DO UPDATE SET
                channel_id = $2,
                birthday_role_id = $3,
                announce_time = $4
            "#,
        )
        .bind(guild_id.get() as i64)
        .bind(channel_id.get() as i64)
        .bind(role_id.map(|id| id.get() as i64))
        .bind(announce_time)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Update the custom texts used in a guild's announcements
    pub async fn set_birthday_templates(
        &self,
        guild_id: GuildId,
        templates: &AnnouncementTemplates,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE birthday_channels SET
                custom_message = $2,
                custom_message_without_age = $3,
                custom_header = $4,
                custom_footer = $5
            WHERE guild_id = $1
            "#,
        )
        .bind(guild_id.get() as i64)
        .bind(&templates.message)
        .bind(&templates.message_without_age)
        .bind(&templates.header)
        .bind(&templates.footer)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Get birthday announcement configuration for a guild
    pub async fn get_birthday_channel(
        &self,
        guild_id: GuildId,
    ) -> Result<Option<BirthdayChannelConfig>, sqlx::Error> {
        let row: Option<BirthdayChannelRow> = sqlx::query_as(
            "SELECT channel_id, birthday_role_id, announce_time, custom_message, \
             custom_message_without_age, custom_header, custom_footer \
             FROM birthday_channels WHERE guild_id = $1",
        )
        .bind(guild_id.get() as i64)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(BirthdayChannelConfig::from))
    }

    /// Remove birthday announcement channel for a guild
    pub async fn remove_birthday_channel(&self, guild_id: GuildId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM birthday_channels WHERE guild_id = $1")
            .bind(guild_id.get() as i64)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
