use super::Database;
use tracing::debug;

/// Applied in order on every start, each one must be idempotent
const MIGRATIONS: &[(&str, &str)] = &[
    (
        "guild settings",
        r#"
        CREATE TABLE IF NOT EXISTS guild_settings (
            guild_id BIGINT PRIMARY KEY,
            timezone TEXT NOT NULL DEFAULT 'UTC',
            prefix TEXT,
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "birthdays",
        r#"
        CREATE TABLE IF NOT EXISTS user_birthdays (
            user_id BIGINT PRIMARY KEY,
            birth_month INTEGER NOT NULL CHECK (birth_month BETWEEN 1 AND 12),
            birth_day INTEGER NOT NULL CHECK (birth_day BETWEEN 1 AND 31),
            birth_year INTEGER,
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "birthday opt-ins",
        r#"
        CREATE TABLE IF NOT EXISTS birthday_allowed_users (
            guild_id BIGINT NOT NULL,
            user_id BIGINT NOT NULL,
            PRIMARY KEY (guild_id, user_id)
        )
        "#,
    ),
    (
        "birthday channels",
        r#"
        CREATE TABLE IF NOT EXISTS birthday_channels (
            guild_id BIGINT PRIMARY KEY,
            channel_id BIGINT NOT NULL,
            birthday_role_id BIGINT,
            announce_time TEXT NOT NULL DEFAULT '08:00',
            custom_message TEXT,
            custom_message_without_age TEXT,
            custom_header TEXT,
            custom_footer TEXT
        )
        "#,
    ),
    (
        "schedule type",
        r#"
        DO $$ BEGIN
            CREATE TYPE schedule_type AS ENUM ('birthday', 'birthday_role');
        EXCEPTION
            WHEN duplicate_object THEN NULL;
        END $$
        "#,
    ),
    (
        "schedules",
        r#"
        CREATE TABLE IF NOT EXISTS schedules (
            id SERIAL PRIMARY KEY,
            guild_id BIGINT,
            schedule_type schedule_type NOT NULL,
            cron_expression TEXT NOT NULL,
            enabled BOOLEAN NOT NULL DEFAULT TRUE,
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "one schedule per guild and type",
        "CREATE UNIQUE INDEX IF NOT EXISTS schedules_guild_type ON schedules (guild_id, schedule_type)",
    ),
    (
        "players",
        r#"
        CREATE TABLE IF NOT EXISTS players (
            user_id BIGINT PRIMARY KEY,
            money BIGINT NOT NULL DEFAULT 0 CHECK (money >= 0),
            games_won INTEGER NOT NULL DEFAULT 0,
            pet_slots INTEGER NOT NULL DEFAULT 4
        )
        "#,
    ),
    (
        "inventories",
        r#"
        CREATE TABLE IF NOT EXISTS player_items (
            user_id BIGINT NOT NULL,
            item TEXT NOT NULL,
            amount INTEGER NOT NULL DEFAULT 0 CHECK (amount >= 0),
            PRIMARY KEY (user_id, item)
        )
        "#,
    ),
    (
        "pets",
        r#"
        CREATE TABLE IF NOT EXISTS pets (
            id TEXT PRIMARY KEY,
            owner_id BIGINT NOT NULL,
            name TEXT NOT NULL,
            element TEXT NOT NULL,
            hp INTEGER NOT NULL,
            current_hp INTEGER NOT NULL,
            stamina INTEGER NOT NULL,
            current_stamina INTEGER NOT NULL,
            affection BIGINT NOT NULL,
            times_petted BIGINT NOT NULL DEFAULT 0,
            fly BOOLEAN NOT NULL DEFAULT FALSE,
            venom BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            UNIQUE (owner_id, name)
        )
        "#,
    ),
];

impl Database {
    pub(super) async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        for (name, statement) in MIGRATIONS {
            debug!("Applying migration: {}", name);
            sqlx::query(statement).execute(self.pool()).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        for (name, statement) in MIGRATIONS {
            let statement = statement.to_uppercase();
            assert!(
                statement.contains("IF NOT EXISTS") || statement.contains("DUPLICATE_OBJECT"),
                "migration '{}' can't be re-run",
                name
            );
        }
    }

    #[test]
    fn test_schedule_type_created_before_schedules() {
        let position = |wanted: &str| MIGRATIONS.iter().position(|(name, _)| *name == wanted);
        assert!(position("schedule type") < position("schedules"));
    }
}
