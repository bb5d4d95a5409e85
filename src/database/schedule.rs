use poise::serenity_prelude::GuildId;

use super::Database;
use crate::schedule::{Schedule, ScheduleType};

#[derive(sqlx::FromRow)]
struct ScheduleRow {
    id: i32,
    guild_id: Option<i64>,
    schedule_type: ScheduleType,
    cron_expression: String,
    enabled: bool,
}

impl From<ScheduleRow> for Schedule {
    fn from(row: ScheduleRow) -> Self {
        Schedule {
            id: row.id,
            guild_id: row.guild_id.map(|id| GuildId::new(id as u64)),
            schedule_type: row.schedule_type,
            cron_expression: row.cron_expression,
            enabled: row.enabled,
        }
    }
}

impl Database {
    pub async fn get_all_schedules(&self) -> Result<Vec<Schedule>, sqlx::Error> {
        let rows: Vec<ScheduleRow> = sqlx::query_as(
            "SELECT id, guild_id, schedule_type, cron_expression, enabled FROM schedules ORDER BY id",
        )
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(Schedule::from).collect())
    }

    /// A guild keeps at most one schedule per type, saving again replaces its cron
    pub async fn upsert_schedule(
        &self,
        guild_id: GuildId,
        schedule_type: ScheduleType,
        cron_expression: String,
        enabled: bool,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO schedules (guild_id, schedule_type, cron_expression, enabled)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (guild_id, schedule_type)
            DO UPDATE SET cron_expression = EXCLUDED.cron_expression,
                          enabled = EXCLUDED.enabled,
                          updated_at = NOW()
            "#,
        )
        .bind(guild_id.get() as i64)
        .bind(schedule_type)
        .bind(cron_expression)
        .bind(enabled)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    pub async fn delete_schedule(
        &self,
        guild_id: GuildId,
        schedule_type: ScheduleType,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM schedules WHERE guild_id = $1 AND schedule_type = $2")
            .bind(guild_id.get() as i64)
            .bind(schedule_type)
            .execute(self.pool())
            .await?;
        Ok(())
    }
}
