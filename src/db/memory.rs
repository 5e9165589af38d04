// src/db/memory.rs
//
// Implementação em memória dos quatro stores. Reproduz as restrições do
// esquema (unicidade, contador de rótulos, compare-and-swap) para que os
// testes exercitem as mesmas regras sem um Postgres.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::{
    common::error::AppError,
    db::{BatchStore, InvitationStore, MineStore, UserStore},
    models::{
        auth::{Role, User},
        batch::{batch_label, Batch, NewBatch, StageWrite},
        invitation::{Invitation, InvitationFilter, InvitationKind, InvitationSummary},
        mine::{Mine, NewMine},
    },
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    mines: Vec<Mine>,
    batches: Vec<Batch>,
    label_counters: HashMap<i32, i32>,
    invitations: HashMap<InvitationKind, Vec<Invitation>>,
    last_id: i32,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.last_id += 1;
        self.last_id
    }

    fn queue(&self, kind: InvitationKind) -> &[Invitation] {
        self.invitations.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    fn queue_mut(&mut self, kind: InvitationKind) -> &mut Vec<Invitation> {
        self.invitations.entry(kind).or_default()
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_id(&self, id: i32) -> Result<Option<User>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|u| u.username == username).cloned())
    }

    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<User, AppError> {
        let mut tables = self.tables.lock().await;
        if tables.users.iter().any(|u| u.username == username) {
            return Err(AppError::UsernameTaken);
        }

        let user = User {
            id: tables.next_id(),
            username: username.to_owned(),
            password_hash: password_hash.to_owned(),
            role,
            created_at: Utc::now(),
        };
        tables.users.push(user.clone());
        Ok(user)
    }
}

#[async_trait]
impl MineStore for MemoryStore {
    async fn list_all(&self) -> Result<Vec<Mine>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables.mines.clone())
    }

    async fn list_by_owner(&self, owner_user_id: i32) -> Result<Vec<Mine>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .mines
            .iter()
            .filter(|m| m.owner_user_id == owner_user_id)
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Mine>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables.mines.iter().find(|m| m.id == id).cloned())
    }

    async fn create_mine(&self, mine: NewMine) -> Result<Mine, AppError> {
        let mut tables = self.tables.lock().await;
        let created = Mine {
            id: tables.next_id(),
            name: mine.name,
            mine_type: mine.mine_type,
            location: mine.location,
            license_number: mine.license_number,
            owner_user_id: mine.owner_user_id,
            created_at: Utc::now(),
        };
        tables.mines.push(created.clone());
        Ok(created)
    }
}

#[async_trait]
impl BatchStore for MemoryStore {
    async fn find_by_id(&self, id: i32) -> Result<Option<Batch>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables.batches.iter().find(|b| b.id == id).cloned())
    }

    async fn list_by_registrant(&self, user_id: i32) -> Result<Vec<Batch>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .batches
            .iter()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_by_accepted_invitation(
        &self,
        kind: InvitationKind,
        username: &str,
    ) -> Result<Vec<Batch>, AppError> {
        let tables = self.tables.lock().await;
        let accepted: Vec<i32> = tables
            .queue(kind)
            .iter()
            .filter(|i| i.invitee_username == username && i.is_accepted())
            .map(|i| i.batch_id)
            .collect();

        Ok(tables
            .batches
            .iter()
            .filter(|b| accepted.contains(&b.id))
            .cloned()
            .collect())
    }

    async fn create_batch(&self, batch: NewBatch) -> Result<Batch, AppError> {
        let mut tables = self.tables.lock().await;

        let counter = tables.label_counters.entry(batch.user_id).or_insert(0);
        *counter += 1;
        let label = batch_label(*counter);

        let created = Batch {
            id: tables.next_id(),
            user_id: batch.user_id,
            label,
            mine_id: batch.mine_id,
            date_collected: batch.date_collected,
            weight_kg: batch.weight_kg,
            origin_cert_image_url: batch.origin_cert_image_url,
            created_at: batch.created_at,
            dealer_received_at: None,
            dealer_location: None,
            dealer_received_weight: None,
            dealer_receipt_id: None,
            dealer_license_image_url: None,
            transport_shipped_at: None,
            transport_leg: None,
            transport_courier: None,
            transport_tracking_number: None,
            transport_origin_location: None,
            transport_destination_location: None,
            goldbod_intake_at: None,
            goldbod_intake_officer: None,
            goldbod_intake_weight: None,
            goldbod_intake_receipt_id: None,
            assay_completed_at: None,
            purity_percent: None,
            assay_report_pdf_url: None,
            version: 0,
        };
        tables.batches.push(created.clone());
        Ok(created)
    }

    async fn apply_stage(
        &self,
        id: i32,
        expected_version: i32,
        write: &StageWrite,
    ) -> Result<Option<Batch>, AppError> {
        let mut tables = self.tables.lock().await;
        let Some(batch) = tables
            .batches
            .iter_mut()
            .find(|b| b.id == id && b.version == expected_version)
        else {
            return Ok(None);
        };

        write.apply_to(batch);
        Ok(Some(batch.clone()))
    }
}

#[async_trait]
impl InvitationStore for MemoryStore {
    async fn create_invitation(
        &self,
        kind: InvitationKind,
        batch_id: i32,
        invited_by: i32,
        invitee_username: &str,
    ) -> Result<Invitation, AppError> {
        let mut tables = self.tables.lock().await;

        // Mesmas restrições dos índices únicos do esquema
        let duplicate = tables.queue(kind).iter().any(|i| {
            i.batch_id == batch_id
                && match kind {
                    InvitationKind::Dealer => true,
                    InvitationKind::Goldbod => i.invitee_username == invitee_username,
                }
        });
        if duplicate {
            return Err(match kind {
                InvitationKind::Dealer => {
                    AppError::conflict("A dealer invitation already exists for this batch.")
                }
                InvitationKind::Goldbod => {
                    AppError::conflict("This goldbod user is already invited to this batch.")
                }
            });
        }

        let invitation = Invitation {
            id: tables.next_id(),
            kind,
            batch_id,
            invited_by,
            invitee_username: invitee_username.to_owned(),
            accepted: None,
            created_at: Utc::now(),
            decided_at: None,
        };
        tables.queue_mut(kind).push(invitation.clone());
        Ok(invitation)
    }

    async fn find_by_id(
        &self,
        kind: InvitationKind,
        id: i32,
    ) -> Result<Option<Invitation>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables.queue(kind).iter().find(|i| i.id == id).cloned())
    }

    async fn find_for_batch_and_user(
        &self,
        kind: InvitationKind,
        batch_id: i32,
        username: &str,
    ) -> Result<Option<Invitation>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .queue(kind)
            .iter()
            .find(|i| i.batch_id == batch_id && i.invitee_username == username)
            .cloned())
    }

    async fn find_accepted_for_batch(
        &self,
        kind: InvitationKind,
        batch_id: i32,
    ) -> Result<Option<Invitation>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .queue(kind)
            .iter()
            .find(|i| i.batch_id == batch_id && i.is_accepted())
            .cloned())
    }

    async fn list_for_invitee(
        &self,
        kind: InvitationKind,
        username: &str,
        filter: InvitationFilter,
    ) -> Result<Vec<InvitationSummary>, AppError> {
        let tables = self.tables.lock().await;

        let mut matching: Vec<&Invitation> = tables
            .queue(kind)
            .iter()
            .filter(|i| i.invitee_username == username && filter.matches(i.accepted))
            .collect();
        matching.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));

        // Equivalente aos JOINs: convites sem lote, mina ou convidante somem
        let summaries = matching
            .into_iter()
            .filter_map(|i| {
                let batch = tables.batches.iter().find(|b| b.id == i.batch_id)?;
                let mine = tables.mines.iter().find(|m| m.id == batch.mine_id)?;
                let inviter = tables.users.iter().find(|u| u.id == i.invited_by)?;
                Some(InvitationSummary::new(
                    i.clone(),
                    inviter.username.clone(),
                    mine.name.clone(),
                    batch.label.clone(),
                ))
            })
            .collect();

        Ok(summaries)
    }

    async fn decide(
        &self,
        kind: InvitationKind,
        id: i32,
        accepted: bool,
    ) -> Result<Option<Invitation>, AppError> {
        let mut tables = self.tables.lock().await;
        let Some(invitation) = tables
            .queue_mut(kind)
            .iter_mut()
            .find(|i| i.id == id && i.is_pending())
        else {
            return Ok(None);
        };

        invitation.accepted = Some(accepted);
        invitation.decided_at = Some(Utc::now());
        Ok(Some(invitation.clone()))
    }

    async fn delete_pending(&self, kind: InvitationKind, id: i32) -> Result<bool, AppError> {
        let mut tables = self.tables.lock().await;
        let queue = tables.queue_mut(kind);
        let before = queue.len();
        queue.retain(|i| !(i.id == id && i.is_pending()));
        Ok(queue.len() < before)
    }
}
