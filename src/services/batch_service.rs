// src/services/batch_service.rs
//
// Orquestra cada etapa: carrega o lote, resolve a posição do chamador,
// consulta a máquina de estados, envia o documento e só então grava
// (compare-and-swap na versão).

use std::sync::Arc;

use chrono::Utc;
use validator::Validate;

use crate::{
    common::{error::AppError, multipart::UploadedFile},
    db::{BatchStore, InvitationStore, MineStore},
    models::{
        auth::{Principal, Role},
        batch::{
            AssayForm, Batch, DealerReceiptForm, GoldbodIntakePayload, NewBatch,
            RegisterBatchForm, StageWrite, TransportPayload,
        },
        invitation::{BatchDealer, InvitationKind},
    },
    services::{
        document_service::DocumentService,
        lifecycle::{transition, BatchState, StageEvent, Standing},
    },
    storage::Bucket,
};

// Campos já garantidos pelo `validate()`; o erro aqui só cobre o impossível
fn required<T>(value: Option<T>, field: &str) -> Result<T, AppError> {
    value.ok_or_else(|| AppError::invalid(format!("{} is required.", field)))
}

fn batch_scope(batch_id: i32) -> String {
    format!("batch-{}", batch_id)
}

#[derive(Clone)]
pub struct BatchService {
    batches: Arc<dyn BatchStore>,
    invitations: Arc<dyn InvitationStore>,
    mines: Arc<dyn MineStore>,
    documents: DocumentService,
}

impl BatchService {
    pub fn new(
        batches: Arc<dyn BatchStore>,
        invitations: Arc<dyn InvitationStore>,
        mines: Arc<dyn MineStore>,
        documents: DocumentService,
    ) -> Self {
        Self {
            batches,
            invitations,
            mines,
            documents,
        }
    }

    // ---
    // Leitura
    // ---

    pub async fn list_batches(&self, caller: &Principal) -> Result<Vec<Batch>, AppError> {
        match caller.role {
            Role::Asm => self.batches.list_by_registrant(caller.id).await,
            Role::Dealer => {
                self.batches
                    .list_by_accepted_invitation(InvitationKind::Dealer, &caller.username)
                    .await
            }
            Role::Goldbod => {
                self.batches
                    .list_by_accepted_invitation(InvitationKind::Goldbod, &caller.username)
                    .await
            }
        }
    }

    pub async fn get_batch(&self, caller: &Principal, id: i32) -> Result<Batch, AppError> {
        let batch = self.load(id).await?;
        self.authorize_read(caller, &batch).await?;
        Ok(batch)
    }

    /// Registrante, ou convidado cujo convite não foi rejeitado.
    pub async fn authorize_read(&self, caller: &Principal, batch: &Batch) -> Result<(), AppError> {
        if batch.user_id == caller.id {
            return Ok(());
        }

        let kind = match caller.role {
            Role::Dealer => InvitationKind::Dealer,
            Role::Goldbod => InvitationKind::Goldbod,
            Role::Asm => return Err(AppError::forbidden("You can only view your own batches.")),
        };

        let invitation = self
            .invitations
            .find_for_batch_and_user(kind, batch.id, &caller.username)
            .await?;

        match invitation {
            Some(i) if !i.is_rejected() => Ok(()),
            _ => Err(AppError::forbidden("You have no access to this batch.")),
        }
    }

    pub async fn dealer_for_batch(
        &self,
        caller: &Principal,
        batch_id: i32,
    ) -> Result<BatchDealer, AppError> {
        let batch = self.get_batch(caller, batch_id).await?;
        let invitation = self
            .invitations
            .find_accepted_for_batch(InvitationKind::Dealer, batch.id)
            .await?
            .ok_or_else(|| AppError::not_found("No accepted dealer for this batch."))?;

        Ok(BatchDealer {
            dealer_username: invitation.invitee_username,
        })
    }

    // ---
    // 1. Registro
    // ---

    pub async fn register_batch(
        &self,
        caller: &Principal,
        form: RegisterBatchForm,
        origin_cert: Option<UploadedFile>,
    ) -> Result<Batch, AppError> {
        form.validate()?;
        let origin_cert =
            origin_cert.ok_or_else(|| AppError::invalid("origin_cert file is required."))?;
        let mine_id = required(form.mine_id, "mine_id")?;

        let mine = self
            .mines
            .find_by_id(mine_id)
            .await?
            .ok_or_else(|| AppError::not_found("Mine not found."))?;
        if mine.owner_user_id != caller.id {
            tracing::debug!(user_id = caller.id, mine_id, "Registro em mina de outro dono");
            return Err(AppError::forbidden("You can only register batches for your own mines."));
        }

        // O id do lote ainda não existe: agrupa pelo usuário
        let origin_cert_image_url = self
            .documents
            .store_document(Bucket::OriginCerts, &format!("user-{}", caller.id), origin_cert)
            .await?;

        let batch = self
            .batches
            .create_batch(NewBatch {
                user_id: caller.id,
                mine_id,
                date_collected: required(form.date_collected, "date_collected")?,
                weight_kg: required(form.weight_kg, "weight_kg")?,
                origin_cert_image_url,
                created_at: Utc::now(),
            })
            .await?;

        tracing::info!(
            batch_id = batch.id,
            label = %batch.label,
            user_id = caller.id,
            stage = "registration",
            "Lote registrado"
        );
        Ok(batch)
    }

    // ---
    // 2. Recebimento pelo dealer
    // ---

    pub async fn record_dealer_receipt(
        &self,
        caller: &Principal,
        id: i32,
        form: DealerReceiptForm,
        license: Option<UploadedFile>,
    ) -> Result<Batch, AppError> {
        let batch = self.load(id).await?;
        self.guard(caller, &batch, StageEvent::DealerReceipt).await?;
        form.validate()?;

        // Licença é opcional; se veio, sobe antes de qualquer escrita
        let license_image_url = match license {
            Some(file) => Some(
                self.documents
                    .store_document(Bucket::DealerLicenses, &batch_scope(batch.id), file)
                    .await?,
            ),
            None => None,
        };

        let write = StageWrite::DealerReceipt {
            at: batch.next_stamp(Utc::now()),
            location: required(form.dealer_location, "dealer_location")?,
            received_weight: required(form.dealer_received_weight, "dealer_received_weight")?,
            receipt_id: required(form.dealer_receipt_id, "dealer_receipt_id")?,
            license_image_url,
        };
        self.commit(caller, &batch, write).await
    }

    // ---
    // 3. Transporte
    // ---

    pub async fn record_transport(
        &self,
        caller: &Principal,
        id: i32,
        payload: TransportPayload,
    ) -> Result<Batch, AppError> {
        let batch = self.load(id).await?;
        self.guard(caller, &batch, StageEvent::Transport).await?;
        let payload = payload.trimmed();
        payload.validate()?;

        let write = StageWrite::Transport {
            at: batch.next_stamp(Utc::now()),
            // Trecho de quem tem a custódia no momento do registro
            leg: batch.custody().leg(),
            courier: required(payload.transport_courier, "transport_courier")?,
            tracking_number: required(
                payload.transport_tracking_number,
                "transport_tracking_number",
            )?,
            origin_location: required(
                payload.transport_origin_location,
                "transport_origin_location",
            )?,
            destination_location: required(
                payload.transport_destination_location,
                "transport_destination_location",
            )?,
        };
        self.commit(caller, &batch, write).await
    }

    // ---
    // 4. Entrada na autoridade
    // ---

    pub async fn record_goldbod_intake(
        &self,
        caller: &Principal,
        id: i32,
        payload: GoldbodIntakePayload,
    ) -> Result<Batch, AppError> {
        let batch = self.load(id).await?;
        self.guard(caller, &batch, StageEvent::AuthorityIntake).await?;
        let payload = payload.trimmed();
        payload.validate()?;

        let write = StageWrite::AuthorityIntake {
            at: batch.next_stamp(Utc::now()),
            officer: required(payload.goldbod_intake_officer, "goldbod_intake_officer")?,
            weight: required(payload.goldbod_intake_weight, "goldbod_intake_weight")?,
            receipt_id: required(payload.goldbod_intake_receipt_id, "goldbod_intake_receipt_id")?,
        };
        self.commit(caller, &batch, write).await
    }

    // ---
    // 5. Ensaio
    // ---

    pub async fn record_assay(
        &self,
        caller: &Principal,
        id: i32,
        form: AssayForm,
        report: Option<UploadedFile>,
    ) -> Result<Batch, AppError> {
        let batch = self.load(id).await?;
        self.guard(caller, &batch, StageEvent::Assay).await?;
        form.validate()?;
        let report = report.ok_or_else(|| AppError::invalid("assay_report file is required."))?;

        let report_pdf_url = self
            .documents
            .store_document(Bucket::AssayReports, &batch_scope(batch.id), report)
            .await?;

        let write = StageWrite::Assay {
            at: batch.next_stamp(Utc::now()),
            purity_percent: required(form.purity_percent, "purity_percent")?,
            report_pdf_url,
        };
        self.commit(caller, &batch, write).await
    }

    // ---
    // Auxiliares
    // ---

    async fn load(&self, id: i32) -> Result<Batch, AppError> {
        self.batches
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Batch not found."))
    }

    async fn standing(&self, caller: &Principal, batch: &Batch) -> Result<Standing, AppError> {
        let accepted_dealer = caller.role == Role::Dealer
            && self.holds_accepted(InvitationKind::Dealer, batch, caller).await?;
        let accepted_goldbod = caller.role == Role::Goldbod
            && self.holds_accepted(InvitationKind::Goldbod, batch, caller).await?;

        Ok(Standing {
            role: caller.role,
            is_registrant: batch.user_id == caller.id,
            accepted_dealer,
            accepted_goldbod,
        })
    }

    async fn holds_accepted(
        &self,
        kind: InvitationKind,
        batch: &Batch,
        caller: &Principal,
    ) -> Result<bool, AppError> {
        let invitation = self
            .invitations
            .find_for_batch_and_user(kind, batch.id, &caller.username)
            .await?;
        Ok(invitation.is_some_and(|i| i.is_accepted()))
    }

    async fn guard(
        &self,
        caller: &Principal,
        batch: &Batch,
        event: StageEvent,
    ) -> Result<BatchState, AppError> {
        let standing = self.standing(caller, batch).await?;
        transition(batch.state(), event, &standing).inspect_err(|e| {
            tracing::debug!(
                batch_id = batch.id,
                user_id = caller.id,
                stage = event.name(),
                error = %e,
                "Transição recusada"
            );
        })
    }

    async fn commit(
        &self,
        caller: &Principal,
        batch: &Batch,
        write: StageWrite,
    ) -> Result<Batch, AppError> {
        let updated = self
            .batches
            .apply_stage(batch.id, batch.version, &write)
            .await?
            .ok_or(AppError::StaleWrite)?;

        tracing::info!(
            batch_id = updated.id,
            user_id = caller.id,
            stage = write.stage_name(),
            version = updated.version,
            "Etapa registrada"
        );
        Ok(updated)
    }
}
