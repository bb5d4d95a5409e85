use super::Database;
use chrono::{DateTime, Utc};
use poise::serenity_prelude::UserId;
use sqlx::Error as SqlxError;

use crate::constants::INCUBATOR_EGG;
use crate::pets::{Element, Pet};

type PetRow = (
    String,
    i64,
    String,
    String,
    i32,
    i32,
    i32,
    i32,
    i64,
    i64,
    bool,
    bool,
    DateTime<Utc>,
);

const PET_COLUMNS: &str = "id, owner_id, name, element, hp, current_hp, stamina, current_stamina, \
                           affection, times_petted, fly, venom, created_at";

fn pet_from_row(row: PetRow) -> Result<Pet, SqlxError> {
    let (
        id,
        owner_id,
        name,
        element,
        hp,
        current_hp,
        stamina,
        current_stamina,
        affection,
        times_petted,
        fly,
        venom,
        created_at,
    ) = row;

    let element = element
        .parse::<Element>()
        .map_err(|e| SqlxError::Decode(e.into()))?;

    Ok(Pet {
        id,
        owner_id: UserId::new(owner_id as u64),
        name,
        element,
        hp,
        current_hp,
        stamina,
        current_stamina,
        affection,
        times_petted,
        fly,
        venom,
        created_at,
    })
}

impl Database {
    /// Find a pet by owner and name
    pub async fn get_pet(&self, owner_id: UserId, name: &str) -> Result<Option<Pet>, SqlxError> {
        let row: Option<PetRow> = sqlx::query_as(&format!(
            "SELECT {} FROM pets WHERE owner_id = $1 AND name = $2",
            PET_COLUMNS
        ))
        .bind(owner_id.get() as i64)
        .bind(name)
        .fetch_optional(self.pool())
        .await?;

        row.map(pet_from_row).transpose()
    }

    /// All pets of a player, oldest first
    pub async fn list_pets(&self, owner_id: UserId) -> Result<Vec<Pet>, SqlxError> {
        let rows: Vec<PetRow> = sqlx::query_as(&format!(
            "SELECT {} FROM pets WHERE owner_id = $1 ORDER BY created_at",
            PET_COLUMNS
        ))
        .bind(owner_id.get() as i64)
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(pet_from_row).collect()
    }

    pub async fn count_pets(&self, owner_id: UserId) -> Result<i64, SqlxError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM pets WHERE owner_id = $1")
            .bind(owner_id.get() as i64)
            .fetch_one(self.pool())
            .await?;
        Ok(count)
    }

    /// Hatch a pet: consumes one incubator egg and `cost` credits.
    ///
    /// Returns false, leaving everything untouched, when the owner lacks either.
    pub async fn incubate_pet(&self, pet: &Pet, cost: i64) -> Result<bool, SqlxError> {
        let owner = pet.owner_id.get() as i64;
        let mut tx = self.pool().begin().await?;

        let egg = sqlx::query(
            "UPDATE player_items SET amount = amount - 1 \
             WHERE user_id = $1 AND item = $2 AND amount > 0",
        )
        .bind(owner)
        .bind(INCUBATOR_EGG)
        .execute(&mut *tx)
        .await?;
        if egg.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        let paid = sqlx::query(
            "UPDATE players SET money = money - $2 WHERE user_id = $1 AND money >= $2",
        )
        .bind(owner)
        .bind(cost)
        .execute(&mut *tx)
        .await?;
        if paid.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO pets (id, owner_id, name, element, hp, current_hp, stamina,
                              current_stamina, affection, times_petted, fly, venom, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(&pet.id)
        .bind(owner)
        .bind(&pet.name)
        .bind(pet.element.as_str())
        .bind(pet.hp)
        .bind(pet.current_hp)
        .bind(pet.stamina)
        .bind(pet.current_stamina)
        .bind(pet.affection)
        .bind(pet.times_petted)
        .bind(pet.fly)
        .bind(pet.venom)
        .bind(pet.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Rename a pet and charge `cost` credits, false if the pet or the money is missing
    pub async fn rename_pet(
        &self,
        owner_id: UserId,
        old_name: &str,
        new_name: &str,
        cost: i64,
    ) -> Result<bool, SqlxError> {
        let owner = owner_id.get() as i64;
        let mut tx = self.pool().begin().await?;

        let paid = sqlx::query(
            "UPDATE players SET money = money - $2 WHERE user_id = $1 AND money >= $2",
        )
        .bind(owner)
        .bind(cost)
        .execute(&mut *tx)
        .await?;
        if paid.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        let renamed = sqlx::query("UPDATE pets SET name = $3 WHERE owner_id = $1 AND name = $2")
            .bind(owner)
            .bind(old_name)
            .bind(new_name)
            .execute(&mut *tx)
            .await?;
        if renamed.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        tx.commit().await?;
        Ok(true)
    }

    pub async fn update_pet_affection(
        &self,
        pet_id: &str,
        times_petted: i64,
        affection: i64,
    ) -> Result<(), SqlxError> {
        sqlx::query("UPDATE pets SET times_petted = $2, affection = $3 WHERE id = $1")
            .bind(pet_id)
            .bind(times_petted)
            .bind(affection)
            .execute(self.pool())
            .await?;
        Ok(())
    }
}
