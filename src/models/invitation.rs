// src/models/invitation.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::models::auth::Role;

/// As duas filas de convite: para dealers e para a autoridade (goldbod).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum InvitationKind {
    Dealer,
    Goldbod,
}

impl InvitationKind {
    pub fn table(&self) -> &'static str {
        match self {
            InvitationKind::Dealer => "dealer_invitations",
            InvitationKind::Goldbod => "goldbod_invitations",
        }
    }

    pub fn username_column(&self) -> &'static str {
        match self {
            InvitationKind::Dealer => "dealer_username",
            InvitationKind::Goldbod => "goldbod_username",
        }
    }

    /// Papel que o convidado precisa ter.
    pub fn invitee_role(&self) -> Role {
        match self {
            InvitationKind::Dealer => Role::Dealer,
            InvitationKind::Goldbod => Role::Goldbod,
        }
    }
}

// Linha comum às duas tabelas; o nome da coluna do convidado vem como alias
#[derive(Debug, Clone, FromRow)]
pub struct InvitationRow {
    pub id: i32,
    pub batch_id: i32,
    pub invited_by: i32,
    pub invitee_username: String,
    pub accepted: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}

impl InvitationRow {
    pub fn into_invitation(self, kind: InvitationKind) -> Invitation {
        Invitation {
            id: self.id,
            kind,
            batch_id: self.batch_id,
            invited_by: self.invited_by,
            invitee_username: self.invitee_username,
            accepted: self.accepted,
            created_at: self.created_at,
            decided_at: self.decided_at,
        }
    }
}

/// `accepted`: None = pendente, Some(true) = ativo, Some(false) = rejeitado (terminal).
#[derive(Debug, Clone, PartialEq)]
pub struct Invitation {
    pub id: i32,
    pub kind: InvitationKind,
    pub batch_id: i32,
    pub invited_by: i32,
    pub invitee_username: String,
    pub accepted: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}

impl Invitation {
    pub fn is_pending(&self) -> bool {
        self.accepted.is_none()
    }

    pub fn is_accepted(&self) -> bool {
        self.accepted == Some(true)
    }

    pub fn is_rejected(&self) -> bool {
        self.accepted == Some(false)
    }
}

// --- Formatos de resposta: cada fila mantém o nome de coluna próprio ---

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DealerInvitation {
    pub id: i32,
    pub batch_id: i32,
    pub invited_by: i32,
    #[schema(example = "ama_dealer")]
    pub dealer_username: String,
    pub accepted: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GoldbodInvitation {
    pub id: i32,
    pub batch_id: i32,
    pub invited_by: i32,
    #[schema(example = "goldbod_officer")]
    pub goldbod_username: String,
    pub accepted: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}

impl From<Invitation> for DealerInvitation {
    fn from(i: Invitation) -> Self {
        Self {
            id: i.id,
            batch_id: i.batch_id,
            invited_by: i.invited_by,
            dealer_username: i.invitee_username,
            accepted: i.accepted,
            created_at: i.created_at,
            decided_at: i.decided_at,
        }
    }
}

impl From<Invitation> for GoldbodInvitation {
    fn from(i: Invitation) -> Self {
        Self {
            id: i.id,
            batch_id: i.batch_id,
            invited_by: i.invited_by,
            goldbod_username: i.invitee_username,
            accepted: i.accepted,
            created_at: i.created_at,
            decided_at: i.decided_at,
        }
    }
}

/// Convite + contexto para as telas de listagem.
#[derive(Debug, Clone, FromRow)]
pub struct InvitationSummaryRow {
    #[sqlx(flatten)]
    pub invitation: InvitationRow,
    pub inviter_username: String,
    pub mine_name: String,
    pub batch_label: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InvitationSummary {
    pub id: i32,
    pub kind: InvitationKind,
    pub batch_id: i32,
    #[schema(example = "BATCH-3")]
    pub batch_label: String,
    pub invited_by: i32,
    pub inviter_username: String,
    pub invitee_username: String,
    pub mine_name: String,
    pub accepted: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}

impl InvitationSummary {
    pub fn new(
        invitation: Invitation,
        inviter_username: String,
        mine_name: String,
        batch_label: String,
    ) -> Self {
        Self {
            id: invitation.id,
            kind: invitation.kind,
            batch_id: invitation.batch_id,
            batch_label,
            invited_by: invitation.invited_by,
            inviter_username,
            invitee_username: invitation.invitee_username,
            mine_name,
            accepted: invitation.accepted,
            created_at: invitation.created_at,
            decided_at: invitation.decided_at,
        }
    }
}

/// Pendentes ou histórico (aceitos + rejeitados).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvitationFilter {
    Pending,
    Decided,
}

impl InvitationFilter {
    pub fn matches(&self, accepted: Option<bool>) -> bool {
        match self {
            InvitationFilter::Pending => accepted.is_none(),
            InvitationFilter::Decided => accepted.is_some(),
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct InviteDealerPayload {
    #[validate(length(min = 1, max = 64, message = "dealer_username is required."))]
    pub dealer_username: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct InviteGoldbodPayload {
    #[validate(length(min = 1, max = 64, message = "goldbod_username is required."))]
    pub goldbod_username: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DealerInvitedResponse {
    #[schema(example = "Dealer invited.")]
    pub message: String,
    pub invitation: DealerInvitation,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GoldbodInvitedResponse {
    #[schema(example = "Goldbod invited.")]
    pub message: String,
    pub invitation: GoldbodInvitation,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BatchDealer {
    pub dealer_username: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeletedResponse {
    pub success: bool,
}
