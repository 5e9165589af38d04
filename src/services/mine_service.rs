// src/services/mine_service.rs

use std::sync::Arc;

use crate::{
    common::error::AppError,
    db::MineStore,
    models::{
        auth::{Principal, Role},
        mine::{CreateMinePayload, Mine, NewMine},
    },
};

#[derive(Clone)]
pub struct MineService {
    mines: Arc<dyn MineStore>,
}

impl MineService {
    pub fn new(mines: Arc<dyn MineStore>) -> Self {
        Self { mines }
    }

    // asm vê só as próprias minas; dealer e goldbod leem todas
    pub async fn list_mines(&self, caller: &Principal) -> Result<Vec<Mine>, AppError> {
        match caller.role {
            Role::Asm => self.mines.list_by_owner(caller.id).await,
            Role::Dealer | Role::Goldbod => self.mines.list_all().await,
        }
    }

    pub async fn get_mine(&self, caller: &Principal, id: i32) -> Result<Mine, AppError> {
        let mine = self
            .mines
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Mine not found."))?;

        if caller.role == Role::Asm && mine.owner_user_id != caller.id {
            return Err(AppError::forbidden("You can only view your own mines."));
        }
        Ok(mine)
    }

    /// O papel (asm) já foi verificado pelo extractor da rota.
    pub async fn create_mine(
        &self,
        owner: &Principal,
        payload: CreateMinePayload,
    ) -> Result<Mine, AppError> {
        let mine = self
            .mines
            .create_mine(NewMine {
                name: payload.name,
                mine_type: payload.mine_type,
                location: payload.location,
                license_number: payload.license_number,
                owner_user_id: owner.id,
            })
            .await?;

        tracing::info!(mine_id = mine.id, user_id = owner.id, "Mina cadastrada");
        Ok(mine)
    }
}
