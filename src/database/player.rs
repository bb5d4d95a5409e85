use super::Database;
use poise::serenity_prelude::UserId;
use sqlx::Error as SqlxError;

use crate::constants::DEFAULT_PET_SLOTS;

/// Currency and game progress of a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub money: i64,
    pub games_won: i32,
    pub pet_slots: i32,
}

impl Default for Player {
    fn default() -> Self {
        Self {
            money: 0,
            games_won: 0,
            pet_slots: DEFAULT_PET_SLOTS,
        }
    }
}

impl Database {
    /// Get a player, defaults when the user never played
    pub async fn get_player(&self, user_id: UserId) -> Result<Player, SqlxError> {
        let result: Option<(i64, i32, i32)> = sqlx::query_as(
            "SELECT money, games_won, pet_slots FROM players WHERE user_id = $1",
        )
        .bind(user_id.get() as i64)
        .fetch_optional(self.pool())
        .await?;

        Ok(result
            .map(|(money, games_won, pet_slots)| Player {
                money,
                games_won,
                pet_slots,
            })
            .unwrap_or_default())
    }

    /// Credit a game win to a player
    pub async fn record_game_win(&self, user_id: UserId, credits: i64) -> Result<(), SqlxError> {
        sqlx::query(
            r#"
            INSERT INTO players (user_id, money, games_won, pet_slots)
            VALUES ($1, $2, 1, $3)
            ON CONFLICT (user_id)
            DO UPDATE SET money = players.money + $2, games_won = players.games_won + 1
            "#,
        )
        .bind(user_id.get() as i64)
        .bind(credits)
        .bind(DEFAULT_PET_SLOTS)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Give items to a player
    pub async fn add_item(&self, user_id: UserId, item: &str, amount: i32) -> Result<(), SqlxError> {
        sqlx::query(
            r#"
            INSERT INTO player_items (user_id, item, amount)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, item)
            DO UPDATE SET amount = player_items.amount + $3
            "#,
        )
        .bind(user_id.get() as i64)
        .bind(item)
        .bind(amount)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// How many of an item a player owns
    pub async fn item_count(&self, user_id: UserId, item: &str) -> Result<i32, SqlxError> {
        let result: Option<(i32,)> =
            sqlx::query_as("SELECT amount FROM player_items WHERE user_id = $1 AND item = $2")
                .bind(user_id.get() as i64)
                .bind(item)
                .fetch_optional(self.pool())
                .await?;

        Ok(result.map(|(amount,)| amount).unwrap_or(0))
    }
}
