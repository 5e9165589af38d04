// src/handlers/invitations.rs
//
// As duas filas expõem as mesmas operações; só muda o tipo e o papel exigido.

use axum::{
    extract::State,
    Json,
};

use crate::{
    common::{error::AppError, extract::ApiPath},
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        rbac::{DealerOnly, GoldbodOnly, RequireRole},
    },
    models::invitation::{
        DealerInvitation, DeletedResponse, GoldbodInvitation, InvitationFilter, InvitationKind,
        InvitationSummary,
    },
};

// ---
// Dealer
// ---

#[utoipa::path(
    get,
    path = "/dealer-invitations",
    tag = "Invitations",
    responses((status = 200, description = "Convites pendentes do dealer", body = Vec<InvitationSummary>)),
    security(("api_jwt" = []))
)]
pub async fn list_dealer_invitations(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    _guard: RequireRole<DealerOnly>,
) -> Result<Json<Vec<InvitationSummary>>, AppError> {
    let invitations = app_state
        .invitation_service
        .list_for_invitee(InvitationKind::Dealer, &user, InvitationFilter::Pending)
        .await?;
    Ok(Json(invitations))
}

#[utoipa::path(
    get,
    path = "/dealer-invitations/history",
    tag = "Invitations",
    responses((status = 200, description = "Convites aceitos ou rejeitados", body = Vec<InvitationSummary>)),
    security(("api_jwt" = []))
)]
pub async fn dealer_invitation_history(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    _guard: RequireRole<DealerOnly>,
) -> Result<Json<Vec<InvitationSummary>>, AppError> {
    let invitations = app_state
        .invitation_service
        .list_for_invitee(InvitationKind::Dealer, &user, InvitationFilter::Decided)
        .await?;
    Ok(Json(invitations))
}

#[utoipa::path(
    patch,
    path = "/dealer-invitations/{id}/accept",
    tag = "Invitations",
    params(("id" = i32, Path, description = "ID do convite")),
    responses(
        (status = 200, description = "Convite aceito", body = DealerInvitation),
        (status = 403, description = "Convite de outro usuário"),
        (status = 409, description = "Convite já decidido")
    ),
    security(("api_jwt" = []))
)]
pub async fn accept_dealer_invitation(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiPath(id): ApiPath<i32>,
) -> Result<Json<DealerInvitation>, AppError> {
    let invitation = app_state
        .invitation_service
        .accept(InvitationKind::Dealer, &user, id)
        .await?;
    Ok(Json(invitation.into()))
}

#[utoipa::path(
    patch,
    path = "/dealer-invitations/{id}/reject",
    tag = "Invitations",
    params(("id" = i32, Path, description = "ID do convite")),
    responses(
        (status = 200, description = "Convite rejeitado", body = DealerInvitation),
        (status = 403, description = "Convite de outro usuário"),
        (status = 409, description = "Convite já decidido")
    ),
    security(("api_jwt" = []))
)]
pub async fn reject_dealer_invitation(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiPath(id): ApiPath<i32>,
) -> Result<Json<DealerInvitation>, AppError> {
    let invitation = app_state
        .invitation_service
        .reject(InvitationKind::Dealer, &user, id)
        .await?;
    Ok(Json(invitation.into()))
}

#[utoipa::path(
    delete,
    path = "/dealer-invitations/{id}",
    tag = "Invitations",
    params(("id" = i32, Path, description = "ID do convite")),
    responses(
        (status = 200, description = "Convite pendente removido", body = DeletedResponse),
        (status = 409, description = "Convite já decidido")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_dealer_invitation(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiPath(id): ApiPath<i32>,
) -> Result<Json<DeletedResponse>, AppError> {
    app_state
        .invitation_service
        .delete(InvitationKind::Dealer, &user, id)
        .await?;
    Ok(Json(DeletedResponse { success: true }))
}

// ---
// Goldbod
// ---

#[utoipa::path(
    get,
    path = "/goldbod-invitations",
    tag = "Invitations",
    responses((status = 200, description = "Convites pendentes da autoridade", body = Vec<InvitationSummary>)),
    security(("api_jwt" = []))
)]
pub async fn list_goldbod_invitations(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    _guard: RequireRole<GoldbodOnly>,
) -> Result<Json<Vec<InvitationSummary>>, AppError> {
    let invitations = app_state
        .invitation_service
        .list_for_invitee(InvitationKind::Goldbod, &user, InvitationFilter::Pending)
        .await?;
    Ok(Json(invitations))
}

#[utoipa::path(
    get,
    path = "/goldbod-invitations/history",
    tag = "Invitations",
    responses((status = 200, description = "Convites aceitos ou rejeitados", body = Vec<InvitationSummary>)),
    security(("api_jwt" = []))
)]
pub async fn goldbod_invitation_history(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    _guard: RequireRole<GoldbodOnly>,
) -> Result<Json<Vec<InvitationSummary>>, AppError> {
    let invitations = app_state
        .invitation_service
        .list_for_invitee(InvitationKind::Goldbod, &user, InvitationFilter::Decided)
        .await?;
    Ok(Json(invitations))
}

#[utoipa::path(
    patch,
    path = "/goldbod-invitations/{id}/accept",
    tag = "Invitations",
    params(("id" = i32, Path, description = "ID do convite")),
    responses(
        (status = 200, description = "Convite aceito", body = GoldbodInvitation),
        (status = 403, description = "Convite de outro usuário"),
        (status = 409, description = "Convite já decidido")
    ),
    security(("api_jwt" = []))
)]
pub async fn accept_goldbod_invitation(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiPath(id): ApiPath<i32>,
) -> Result<Json<GoldbodInvitation>, AppError> {
    let invitation = app_state
        .invitation_service
        .accept(InvitationKind::Goldbod, &user, id)
        .await?;
    Ok(Json(invitation.into()))
}

#[utoipa::path(
    patch,
    path = "/goldbod-invitations/{id}/reject",
    tag = "Invitations",
    params(("id" = i32, Path, description = "ID do convite")),
    responses(
        (status = 200, description = "Convite rejeitado", body = GoldbodInvitation),
        (status = 403, description = "Convite de outro usuário"),
        (status = 409, description = "Convite já decidido")
    ),
    security(("api_jwt" = []))
)]
pub async fn reject_goldbod_invitation(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiPath(id): ApiPath<i32>,
) -> Result<Json<GoldbodInvitation>, AppError> {
    let invitation = app_state
        .invitation_service
        .reject(InvitationKind::Goldbod, &user, id)
        .await?;
    Ok(Json(invitation.into()))
}

#[utoipa::path(
    delete,
    path = "/goldbod-invitations/{id}",
    tag = "Invitations",
    params(("id" = i32, Path, description = "ID do convite")),
    responses(
        (status = 200, description = "Convite pendente removido", body = DeletedResponse),
        (status = 409, description = "Convite já decidido")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_goldbod_invitation(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiPath(id): ApiPath<i32>,
) -> Result<Json<DeletedResponse>, AppError> {
    app_state
        .invitation_service
        .delete(InvitationKind::Goldbod, &user, id)
        .await?;
    Ok(Json(DeletedResponse { success: true }))
}
