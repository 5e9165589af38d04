// src/db/invitation_repo.rs
//
// As duas tabelas de convite têm o mesmo formato; só muda o nome da tabela e
// da coluna do convidado. Ambos vêm de `InvitationKind`, nunca da requisição.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    common::error::AppError,
    db::{map_unique_violation, InvitationStore},
    models::invitation::{
        Invitation, InvitationFilter, InvitationKind, InvitationRow, InvitationSummary,
        InvitationSummaryRow,
    },
};

#[derive(Clone)]
pub struct InvitationRepository {
    pool: PgPool,
}

impl InvitationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn columns(kind: InvitationKind) -> String {
    format!(
        "id, batch_id, invited_by, {} AS invitee_username, accepted, created_at, decided_at",
        kind.username_column()
    )
}

fn duplicate_error(kind: InvitationKind) -> AppError {
    match kind {
        InvitationKind::Dealer => {
            AppError::conflict("A dealer invitation already exists for this batch.")
        }
        InvitationKind::Goldbod => {
            AppError::conflict("This goldbod user is already invited to this batch.")
        }
    }
}

fn filter_condition(filter: InvitationFilter) -> &'static str {
    match filter {
        InvitationFilter::Pending => "i.accepted IS NULL",
        InvitationFilter::Decided => "i.accepted IS NOT NULL",
    }
}

#[async_trait]
impl InvitationStore for InvitationRepository {
    async fn create_invitation(
        &self,
        kind: InvitationKind,
        batch_id: i32,
        invited_by: i32,
        invitee_username: &str,
    ) -> Result<Invitation, AppError> {
        let sql = format!(
            "INSERT INTO {} (batch_id, invited_by, {}) VALUES ($1, $2, $3) RETURNING {}",
            kind.table(),
            kind.username_column(),
            columns(kind)
        );

        let row = sqlx::query_as::<_, InvitationRow>(&sql)
            .bind(batch_id)
            .bind(invited_by)
            .bind(invitee_username)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_unique_violation(e, || duplicate_error(kind)))?;

        Ok(row.into_invitation(kind))
    }

    async fn find_by_id(
        &self,
        kind: InvitationKind,
        id: i32,
    ) -> Result<Option<Invitation>, AppError> {
        let sql = format!("SELECT {} FROM {} WHERE id = $1", columns(kind), kind.table());

        let row = sqlx::query_as::<_, InvitationRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.into_invitation(kind)))
    }

    async fn find_for_batch_and_user(
        &self,
        kind: InvitationKind,
        batch_id: i32,
        username: &str,
    ) -> Result<Option<Invitation>, AppError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE batch_id = $1 AND {} = $2",
            columns(kind),
            kind.table(),
            kind.username_column()
        );

        let row = sqlx::query_as::<_, InvitationRow>(&sql)
            .bind(batch_id)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.into_invitation(kind)))
    }

    async fn find_accepted_for_batch(
        &self,
        kind: InvitationKind,
        batch_id: i32,
    ) -> Result<Option<Invitation>, AppError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE batch_id = $1 AND accepted = true ORDER BY id ASC LIMIT 1",
            columns(kind),
            kind.table()
        );

        let row = sqlx::query_as::<_, InvitationRow>(&sql)
            .bind(batch_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.into_invitation(kind)))
    }

    async fn list_for_invitee(
        &self,
        kind: InvitationKind,
        username: &str,
        filter: InvitationFilter,
    ) -> Result<Vec<InvitationSummary>, AppError> {
        let sql = format!(
            r#"
            SELECT
                i.id, i.batch_id, i.invited_by, i.{column} AS invitee_username,
                i.accepted, i.created_at, i.decided_at,
                u.username AS inviter_username,
                m.name AS mine_name,
                b.batch_id AS batch_label
            FROM {table} i
            JOIN batches b ON b.id = i.batch_id
            JOIN mines m ON m.id = b.mine_id
            JOIN users u ON u.id = i.invited_by
            WHERE i.{column} = $1 AND {condition}
            ORDER BY i.created_at DESC, i.id DESC
            "#,
            table = kind.table(),
            column = kind.username_column(),
            condition = filter_condition(filter),
        );

        let rows = sqlx::query_as::<_, InvitationSummaryRow>(&sql)
            .bind(username)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|r| {
                InvitationSummary::new(
                    r.invitation.into_invitation(kind),
                    r.inviter_username,
                    r.mine_name,
                    r.batch_label,
                )
            })
            .collect())
    }

    async fn decide(
        &self,
        kind: InvitationKind,
        id: i32,
        accepted: bool,
    ) -> Result<Option<Invitation>, AppError> {
        // A condição `accepted IS NULL` torna a decisão atômica: só uma vence
        let sql = format!(
            "UPDATE {} SET accepted = $2, decided_at = now() \
             WHERE id = $1 AND accepted IS NULL RETURNING {}",
            kind.table(),
            columns(kind)
        );

        let row = sqlx::query_as::<_, InvitationRow>(&sql)
            .bind(id)
            .bind(accepted)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.into_invitation(kind)))
    }

    async fn delete_pending(&self, kind: InvitationKind, id: i32) -> Result<bool, AppError> {
        let sql = format!(
            "DELETE FROM {} WHERE id = $1 AND accepted IS NULL",
            kind.table()
        );

        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}
