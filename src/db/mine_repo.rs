// src/db/mine_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    common::error::AppError,
    db::MineStore,
    models::mine::{Mine, NewMine},
};

#[derive(Clone)]
pub struct MineRepository {
    pool: PgPool,
}

impl MineRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MineStore for MineRepository {
    async fn list_all(&self) -> Result<Vec<Mine>, AppError> {
        let mines = sqlx::query_as::<_, Mine>("SELECT * FROM mines ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(mines)
    }

    async fn list_by_owner(&self, owner_user_id: i32) -> Result<Vec<Mine>, AppError> {
        let mines = sqlx::query_as::<_, Mine>(
            "SELECT * FROM mines WHERE owner_user_id = $1 ORDER BY id ASC",
        )
        .bind(owner_user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(mines)
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Mine>, AppError> {
        let mine = sqlx::query_as::<_, Mine>("SELECT * FROM mines WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(mine)
    }

    async fn create_mine(&self, mine: NewMine) -> Result<Mine, AppError> {
        let created = sqlx::query_as::<_, Mine>(
            r#"
            INSERT INTO mines (name, type, location, license_number, owner_user_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&mine.name)
        .bind(&mine.mine_type)
        .bind(&mine.location)
        .bind(&mine.license_number)
        .bind(mine.owner_user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }
}
