// src/db/batch_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    common::error::AppError,
    db::{map_unique_violation, BatchStore},
    models::{
        batch::{batch_label, Batch, NewBatch, StageWrite},
        invitation::InvitationKind,
    },
};

#[derive(Clone)]
pub struct BatchRepository {
    pool: PgPool,
}

impl BatchRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BatchStore for BatchRepository {
    async fn find_by_id(&self, id: i32) -> Result<Option<Batch>, AppError> {
        let batch = sqlx::query_as::<_, Batch>("SELECT * FROM batches WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(batch)
    }

    async fn list_by_registrant(&self, user_id: i32) -> Result<Vec<Batch>, AppError> {
        let batches =
            sqlx::query_as::<_, Batch>("SELECT * FROM batches WHERE user_id = $1 ORDER BY id ASC")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(batches)
    }

    async fn list_by_accepted_invitation(
        &self,
        kind: InvitationKind,
        username: &str,
    ) -> Result<Vec<Batch>, AppError> {
        // Tabela e coluna vêm de constantes do enum, nunca do usuário
        let sql = format!(
            r#"
            SELECT b.*
            FROM batches b
            JOIN {table} i ON i.batch_id = b.id
            WHERE i.{column} = $1 AND i.accepted = true
            ORDER BY b.id ASC
            "#,
            table = kind.table(),
            column = kind.username_column(),
        );

        let batches = sqlx::query_as::<_, Batch>(&sql)
            .bind(username)
            .fetch_all(&self.pool)
            .await?;
        Ok(batches)
    }

    async fn create_batch(&self, batch: NewBatch) -> Result<Batch, AppError> {
        let mut tx = self.pool.begin().await?;

        // 1. Incremento atômico do contador do registrante (substitui COUNT(*) + 1)
        let (next,): (i32,) = sqlx::query_as(
            r#"
            INSERT INTO batch_label_counters (user_id, last_value)
            VALUES ($1, 1)
            ON CONFLICT (user_id)
            DO UPDATE SET last_value = batch_label_counters.last_value + 1
            RETURNING last_value
            "#,
        )
        .bind(batch.user_id)
        .fetch_one(&mut *tx)
        .await?;

        // 2. Insere o lote com o rótulo alocado
        let created = sqlx::query_as::<_, Batch>(
            r#"
            INSERT INTO batches (
                user_id, batch_id, mine_id, date_collected, weight_kg,
                origin_cert_image_url, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(batch.user_id)
        .bind(batch_label(next))
        .bind(batch.mine_id)
        .bind(batch.date_collected)
        .bind(batch.weight_kg)
        .bind(&batch.origin_cert_image_url)
        .bind(batch.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            map_unique_violation(e, || AppError::conflict("Batch label already in use; retry."))
        })?;

        // 3. Commit
        tx.commit().await?;
        Ok(created)
    }

    async fn apply_stage(
        &self,
        id: i32,
        expected_version: i32,
        write: &StageWrite,
    ) -> Result<Option<Batch>, AppError> {
        // Um único UPDATE por etapa: timestamp e campos gravados juntos,
        // condicionado à versão lida pelo serviço.
        let updated = match write {
            StageWrite::DealerReceipt {
                at,
                location,
                received_weight,
                receipt_id,
                license_image_url,
            } => {
                sqlx::query_as::<_, Batch>(
                    r#"
                    UPDATE batches
                    SET dealer_received_at = $3,
                        dealer_location = $4,
                        dealer_received_weight = $5,
                        dealer_receipt_id = $6,
                        dealer_license_image_url = COALESCE($7, dealer_license_image_url),
                        version = version + 1
                    WHERE id = $1 AND version = $2
                    RETURNING *
                    "#,
                )
                .bind(id)
                .bind(expected_version)
                .bind(at)
                .bind(location)
                .bind(received_weight)
                .bind(receipt_id)
                .bind(license_image_url)
                .fetch_optional(&self.pool)
                .await?
            }
            StageWrite::Transport {
                at,
                leg,
                courier,
                tracking_number,
                origin_location,
                destination_location,
            } => {
                sqlx::query_as::<_, Batch>(
                    r#"
                    UPDATE batches
                    SET transport_shipped_at = $3,
                        transport_leg = $4,
                        transport_courier = $5,
                        transport_tracking_number = $6,
                        transport_origin_location = $7,
                        transport_destination_location = $8,
                        version = version + 1
                    WHERE id = $1 AND version = $2
                    RETURNING *
                    "#,
                )
                .bind(id)
                .bind(expected_version)
                .bind(at)
                .bind(leg)
                .bind(courier)
                .bind(tracking_number)
                .bind(origin_location)
                .bind(destination_location)
                .fetch_optional(&self.pool)
                .await?
            }
            StageWrite::AuthorityIntake {
                at,
                officer,
                weight,
                receipt_id,
            } => {
                sqlx::query_as::<_, Batch>(
                    r#"
                    UPDATE batches
                    SET goldbod_intake_at = $3,
                        goldbod_intake_officer = $4,
                        goldbod_intake_weight = $5,
                        goldbod_intake_receipt_id = $6,
                        version = version + 1
                    WHERE id = $1 AND version = $2
                    RETURNING *
                    "#,
                )
                .bind(id)
                .bind(expected_version)
                .bind(at)
                .bind(officer)
                .bind(weight)
                .bind(receipt_id)
                .fetch_optional(&self.pool)
                .await?
            }
            StageWrite::Assay {
                at,
                purity_percent,
                report_pdf_url,
            } => {
                sqlx::query_as::<_, Batch>(
                    r#"
                    UPDATE batches
                    SET assay_completed_at = $3,
                        purity_percent = $4,
                        assay_report_pdf_url = $5,
                        version = version + 1
                    WHERE id = $1 AND version = $2
                    RETURNING *
                    "#,
                )
                .bind(id)
                .bind(expected_version)
                .bind(at)
                .bind(purity_percent)
                .bind(report_pdf_url)
                .fetch_optional(&self.pool)
                .await?
            }
        };

        Ok(updated)
    }
}
