// src/db.rs
//
// Contratos de persistência. Os serviços só conhecem estes traits;
// Postgres em produção, `memory::MemoryStore` nos testes.

pub mod batch_repo;
pub mod invitation_repo;
pub mod memory;
pub mod mine_repo;
pub mod user_repo;

pub use batch_repo::BatchRepository;
pub use invitation_repo::InvitationRepository;
pub use memory::MemoryStore;
pub use mine_repo::MineRepository;
pub use user_repo::UserRepository;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    common::error::AppError,
    models::{
        auth::{Role, User},
        batch::{Batch, NewBatch, StageWrite},
        invitation::{Invitation, InvitationFilter, InvitationKind, InvitationSummary},
        mine::{Mine, NewMine},
    },
};

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: i32) -> Result<Option<User>, AppError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError>;

    /// Falha com `UsernameTaken` se o nome já existir.
    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<User, AppError>;
}

#[async_trait]
pub trait MineStore: Send + Sync {
    async fn list_all(&self) -> Result<Vec<Mine>, AppError>;

    async fn list_by_owner(&self, owner_user_id: i32) -> Result<Vec<Mine>, AppError>;

    async fn find_by_id(&self, id: i32) -> Result<Option<Mine>, AppError>;

    async fn create_mine(&self, mine: NewMine) -> Result<Mine, AppError>;
}

#[async_trait]
pub trait BatchStore: Send + Sync {
    async fn find_by_id(&self, id: i32) -> Result<Option<Batch>, AppError>;

    async fn list_by_registrant(&self, user_id: i32) -> Result<Vec<Batch>, AppError>;

    /// Lotes com convite aceito para este usuário na fila indicada.
    async fn list_by_accepted_invitation(
        &self,
        kind: InvitationKind,
        username: &str,
    ) -> Result<Vec<Batch>, AppError>;

    /// Insere o lote alocando `BATCH-<n>` num contador atômico por registrante.
    async fn create_batch(&self, batch: NewBatch) -> Result<Batch, AppError>;

    /// Compare-and-swap: grava só se a versão ainda for `expected_version`.
    /// `None` significa que outra escrita venceu.
    async fn apply_stage(
        &self,
        id: i32,
        expected_version: i32,
        write: &StageWrite,
    ) -> Result<Option<Batch>, AppError>;
}

#[async_trait]
pub trait InvitationStore: Send + Sync {
    /// Falha com `Conflict` se violar a unicidade da fila.
    async fn create_invitation(
        &self,
        kind: InvitationKind,
        batch_id: i32,
        invited_by: i32,
        invitee_username: &str,
    ) -> Result<Invitation, AppError>;

    async fn find_by_id(&self, kind: InvitationKind, id: i32)
        -> Result<Option<Invitation>, AppError>;

    async fn find_for_batch_and_user(
        &self,
        kind: InvitationKind,
        batch_id: i32,
        username: &str,
    ) -> Result<Option<Invitation>, AppError>;

    async fn find_accepted_for_batch(
        &self,
        kind: InvitationKind,
        batch_id: i32,
    ) -> Result<Option<Invitation>, AppError>;

    async fn list_for_invitee(
        &self,
        kind: InvitationKind,
        username: &str,
        filter: InvitationFilter,
    ) -> Result<Vec<InvitationSummary>, AppError>;

    /// Só decide convites pendentes; `None` se já não estava pendente.
    async fn decide(
        &self,
        kind: InvitationKind,
        id: i32,
        accepted: bool,
    ) -> Result<Option<Invitation>, AppError>;

    /// Apaga só se pendente; devolve se apagou.
    async fn delete_pending(&self, kind: InvitationKind, id: i32) -> Result<bool, AppError>;
}

/// O conjunto de stores que o `AppState` distribui aos serviços.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub mines: Arc<dyn MineStore>,
    pub batches: Arc<dyn BatchStore>,
    pub invitations: Arc<dyn InvitationStore>,
}

impl Stores {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(UserRepository::new(pool.clone())),
            mines: Arc::new(MineRepository::new(pool.clone())),
            batches: Arc::new(BatchRepository::new(pool.clone())),
            invitations: Arc::new(InvitationRepository::new(pool)),
        }
    }

    pub fn memory(store: Arc<MemoryStore>) -> Self {
        Self {
            users: store.clone(),
            mines: store.clone(),
            batches: store.clone(),
            invitations: store,
        }
    }
}

/// Traduz violação de unicidade num erro de domínio; o resto vira DatabaseError.
pub(crate) fn map_unique_violation(e: sqlx::Error, on_unique: impl FnOnce() -> AppError) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return on_unique();
        }
    }
    e.into()
}
