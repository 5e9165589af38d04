// src/handlers/mines.rs

use axum::{
    extract::State,
    Json,
};
use validator::Validate;

use crate::{
    common::{
        error::AppError,
        extract::{ApiJson, ApiPath},
    },
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        rbac::{AsmOnly, RequireRole},
    },
    models::mine::{CreateMinePayload, Mine},
};

#[utoipa::path(
    get,
    path = "/mines",
    tag = "Mines",
    responses((status = 200, description = "Minas visíveis ao usuário", body = Vec<Mine>)),
    security(("api_jwt" = []))
)]
pub async fn list_mines(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<Vec<Mine>>, AppError> {
    Ok(Json(app_state.mine_service.list_mines(&user).await?))
}

#[utoipa::path(
    get,
    path = "/mines/{id}",
    tag = "Mines",
    params(("id" = i32, Path, description = "ID da mina")),
    responses(
        (status = 200, description = "Mina", body = Mine),
        (status = 403, description = "Mina de outro asm"),
        (status = 404, description = "Mina não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_mine(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiPath(id): ApiPath<i32>,
) -> Result<Json<Mine>, AppError> {
    Ok(Json(app_state.mine_service.get_mine(&user, id).await?))
}

#[utoipa::path(
    post,
    path = "/mines",
    tag = "Mines",
    request_body = CreateMinePayload,
    responses(
        (status = 200, description = "Mina cadastrada", body = Mine),
        (status = 403, description = "Apenas asm")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_mine(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    _guard: RequireRole<AsmOnly>,
    ApiJson(payload): ApiJson<CreateMinePayload>,
) -> Result<Json<Mine>, AppError> {
    let payload = payload.trimmed();
    payload.validate()?;

    Ok(Json(app_state.mine_service.create_mine(&user, payload).await?))
}
