// src/services/invitation_service.rs

use std::sync::Arc;

use crate::{
    common::error::AppError,
    db::{BatchStore, InvitationStore, UserStore},
    models::{
        auth::{Principal, Role},
        batch::Batch,
        invitation::{Invitation, InvitationFilter, InvitationKind, InvitationSummary},
    },
};

#[derive(Clone)]
pub struct InvitationService {
    users: Arc<dyn UserStore>,
    batches: Arc<dyn BatchStore>,
    invitations: Arc<dyn InvitationStore>,
}

impl InvitationService {
    pub fn new(
        users: Arc<dyn UserStore>,
        batches: Arc<dyn BatchStore>,
        invitations: Arc<dyn InvitationStore>,
    ) -> Self {
        Self {
            users,
            batches,
            invitations,
        }
    }

    /// Só o asm que registrou o lote convida o dealer; um convite por lote.
    pub async fn invite_dealer(
        &self,
        caller: &Principal,
        batch_id: i32,
        dealer_username: &str,
    ) -> Result<Invitation, AppError> {
        let batch = self.load_batch(batch_id).await?;
        if caller.role != Role::Asm || batch.user_id != caller.id {
            return Err(AppError::forbidden(
                "Only the registering ASM can invite a dealer to this batch.",
            ));
        }

        self.require_invitee(InvitationKind::Dealer, dealer_username).await?;
        self.create(InvitationKind::Dealer, caller, &batch, dealer_username).await
    }

    /// Antes do recebimento quem convida é o asm; depois, só o dealer aceito.
    pub async fn invite_goldbod(
        &self,
        caller: &Principal,
        batch_id: i32,
        goldbod_username: &str,
    ) -> Result<Invitation, AppError> {
        let batch = self.load_batch(batch_id).await?;

        match caller.role {
            Role::Asm => {
                if batch.user_id != caller.id {
                    return Err(AppError::forbidden(
                        "Only the registering ASM can invite the authority.",
                    ));
                }
                if batch.dealer_received_at.is_some() {
                    return Err(AppError::forbidden(
                        "The dealer has received this batch; only the dealer can invite the authority now.",
                    ));
                }
            }
            Role::Dealer => {
                let invitation = self
                    .invitations
                    .find_for_batch_and_user(InvitationKind::Dealer, batch.id, &caller.username)
                    .await?;
                if !invitation.is_some_and(|i| i.is_accepted()) {
                    return Err(AppError::forbidden(
                        "Only the accepted dealer can invite the authority.",
                    ));
                }
            }
            Role::Goldbod => {
                return Err(AppError::forbidden(
                    "Only ASM or dealer users can invite the authority.",
                ));
            }
        }

        self.require_invitee(InvitationKind::Goldbod, goldbod_username).await?;
        self.create(InvitationKind::Goldbod, caller, &batch, goldbod_username).await
    }

    pub async fn list_for_invitee(
        &self,
        kind: InvitationKind,
        caller: &Principal,
        filter: InvitationFilter,
    ) -> Result<Vec<InvitationSummary>, AppError> {
        self.invitations
            .list_for_invitee(kind, &caller.username, filter)
            .await
    }

    pub async fn accept(
        &self,
        kind: InvitationKind,
        caller: &Principal,
        id: i32,
    ) -> Result<Invitation, AppError> {
        self.decide(kind, caller, id, true).await
    }

    pub async fn reject(
        &self,
        kind: InvitationKind,
        caller: &Principal,
        id: i32,
    ) -> Result<Invitation, AppError> {
        self.decide(kind, caller, id, false).await
    }

    pub async fn delete(
        &self,
        kind: InvitationKind,
        caller: &Principal,
        id: i32,
    ) -> Result<(), AppError> {
        let invitation = self.load_addressed_to(kind, caller, id).await?;

        if !self.invitations.delete_pending(kind, invitation.id).await? {
            return Err(AppError::conflict("Only pending invitations can be deleted."));
        }

        tracing::info!(
            invitation_id = id,
            batch_id = invitation.batch_id,
            user_id = caller.id,
            "Convite removido"
        );
        Ok(())
    }

    // ---
    // Auxiliares
    // ---

    async fn decide(
        &self,
        kind: InvitationKind,
        caller: &Principal,
        id: i32,
        accepted: bool,
    ) -> Result<Invitation, AppError> {
        self.load_addressed_to(kind, caller, id).await?;

        // Condicional no store: se outra decisão venceu, não sobrescreve
        let decided = self
            .invitations
            .decide(kind, id, accepted)
            .await?
            .ok_or_else(|| AppError::conflict("Invitation has already been decided."))?;

        tracing::info!(
            invitation_id = id,
            batch_id = decided.batch_id,
            user_id = caller.id,
            accepted,
            "Convite decidido"
        );
        Ok(decided)
    }

    async fn load_addressed_to(
        &self,
        kind: InvitationKind,
        caller: &Principal,
        id: i32,
    ) -> Result<Invitation, AppError> {
        let invitation = self
            .invitations
            .find_by_id(kind, id)
            .await?
            .ok_or_else(|| AppError::not_found("Invitation not found."))?;

        if invitation.invitee_username != caller.username {
            tracing::debug!(invitation_id = id, user_id = caller.id, "Convite de outro usuário");
            return Err(AppError::forbidden("This invitation is not addressed to you."));
        }
        Ok(invitation)
    }

    async fn load_batch(&self, batch_id: i32) -> Result<Batch, AppError> {
        self.batches
            .find_by_id(batch_id)
            .await?
            .ok_or_else(|| AppError::not_found("Batch not found."))
    }

    async fn require_invitee(&self, kind: InvitationKind, username: &str) -> Result<(), AppError> {
        let role = kind.invitee_role();
        match self.users.find_by_username(username).await? {
            Some(user) if user.role == role => Ok(()),
            _ => Err(AppError::not_found(format!(
                "No {} user named '{}'.",
                role, username
            ))),
        }
    }

    async fn create(
        &self,
        kind: InvitationKind,
        caller: &Principal,
        batch: &Batch,
        invitee: &str,
    ) -> Result<Invitation, AppError> {
        // A unicidade fica com o store (índice único), que decide corridas
        let invitation = self
            .invitations
            .create_invitation(kind, batch.id, caller.id, invitee)
            .await?;

        tracing::info!(
            invitation_id = invitation.id,
            batch_id = batch.id,
            user_id = caller.id,
            kind = ?kind,
            "Convite criado"
        );
        Ok(invitation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{MemoryStore, MineStore},
        models::{batch::NewBatch, mine::NewMine},
    };
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;

    struct Fixture {
        service: InvitationService,
        asm: Principal,
        dealer: Principal,
        batch_id: i32,
    }

    async fn principal(store: &MemoryStore, username: &str, role: Role) -> Principal {
        let user = store.create_user(username, "hash", role).await.unwrap();
        Principal::from(&user)
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let asm = principal(&store, "miner", Role::Asm).await;
        let dealer = principal(&store, "dealer", Role::Dealer).await;
        principal(&store, "officer", Role::Goldbod).await;

        let mine = store
            .create_mine(NewMine {
                name: "Pit".into(),
                mine_type: "alluvial".into(),
                location: "Obuasi".into(),
                license_number: "L-1".into(),
                owner_user_id: asm.id,
            })
            .await
            .unwrap();
        let batch = store
            .create_batch(NewBatch {
                user_id: asm.id,
                mine_id: mine.id,
                date_collected: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                weight_kg: Decimal::new(125, 1),
                origin_cert_image_url: "memory://origin-certs/c.png".into(),
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        Fixture {
            service: InvitationService::new(store.clone(), store.clone(), store),
            asm,
            dealer,
            batch_id: batch.id,
        }
    }

    #[tokio::test]
    async fn only_the_named_dealer_decides() {
        let f = fixture().await;
        let inv = f
            .service
            .invite_dealer(&f.asm, f.batch_id, "dealer")
            .await
            .unwrap();

        let err = f
            .service
            .accept(InvitationKind::Dealer, &f.asm, inv.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let accepted = f
            .service
            .accept(InvitationKind::Dealer, &f.dealer, inv.id)
            .await
            .unwrap();
        assert!(accepted.is_accepted());

        // true -> false é proibido
        let err = f
            .service
            .reject(InvitationKind::Dealer, &f.dealer, inv.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn invitee_must_exist_with_matching_role() {
        let f = fixture().await;
        let err = f
            .service
            .invite_dealer(&f.asm, f.batch_id, "officer")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = f
            .service
            .invite_goldbod(&f.asm, f.batch_id, "ghost")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn pending_dealer_cannot_invite_authority() {
        let f = fixture().await;
        f.service
            .invite_dealer(&f.asm, f.batch_id, "dealer")
            .await
            .unwrap();

        let err = f
            .service
            .invite_goldbod(&f.dealer, f.batch_id, "officer")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        // O asm ainda pode, pois o dealer não recebeu o lote
        f.service
            .invite_goldbod(&f.asm, f.batch_id, "officer")
            .await
            .unwrap();
        let err = f
            .service
            .invite_goldbod(&f.asm, f.batch_id, "officer")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
