use poise::serenity_prelude::GuildId;

use super::Database;

/// Guild-wide options, a guild without a row uses the defaults
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct GuildSettings {
    pub timezone: String,
    pub prefix: Option<String>,
}

impl Default for GuildSettings {
    fn default() -> Self {
        GuildSettings {
            timezone: "UTC".to_string(),
            prefix: None,
        }
    }
}

impl Database {
    pub async fn get_guild_settings(&self, guild_id: GuildId) -> Result<GuildSettings, sqlx::Error> {
        let settings: Option<GuildSettings> =
            sqlx::query_as("SELECT timezone, prefix FROM guild_settings WHERE guild_id = $1")
                .bind(guild_id.get() as i64)
                .fetch_optional(self.pool())
                .await?;

        Ok(settings.unwrap_or_default())
    }

    pub async fn get_guild_timezone(&self, guild_id: GuildId) -> Result<String, sqlx::Error> {
        self.get_guild_settings(guild_id)
            .await
            .map(|settings| settings.timezone)
    }

    pub async fn set_guild_timezone(
        &self,
        guild_id: GuildId,
        timezone: String,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO guild_settings (guild_id, timezone) VALUES ($1, $2) \
             ON CONFLICT (guild_id) DO UPDATE SET timezone = EXCLUDED.timezone, updated_at = NOW()",
        )
        .bind(guild_id.get() as i64)
        .bind(timezone)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// `None` goes back to the default prefix
    pub async fn set_guild_prefix(
        &self,
        guild_id: GuildId,
        prefix: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO guild_settings (guild_id, prefix) VALUES ($1, $2) \
             ON CONFLICT (guild_id) DO UPDATE SET prefix = EXCLUDED.prefix, updated_at = NOW()",
        )
        .bind(guild_id.get() as i64)
        .bind(prefix)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Custom prefixes, loaded once into memory at startup
    pub async fn get_all_guild_prefixes(&self) -> Result<Vec<(GuildId, String)>, sqlx::Error> {
        let rows: Vec<(i64, String)> = sqlx::query_as(
            "SELECT guild_id, prefix FROM guild_settings WHERE prefix IS NOT NULL AND prefix <> ''",
        )
        .fetch_all(self.pool())
        .await?;

        Ok(rows
            .into_iter()
            .map(|(guild_id, prefix)| (GuildId::new(guild_id as u64), prefix))
            .collect())
    }

    /// Wipe a guild's configuration. Birthday opt-ins belong to the members and stay.
    pub async fn reset_guild_settings(&self, guild_id: GuildId) -> Result<(), sqlx::Error> {
        let id = guild_id.get() as i64;
        let mut tx = self.pool().begin().await?;

        for table in ["guild_settings", "birthday_channels", "schedules"] {
            sqlx::query(&format!("DELETE FROM {} WHERE guild_id = $1", table))
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
