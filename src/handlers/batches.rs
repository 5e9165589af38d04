// src/handlers/batches.rs

use axum::{
    extract::{Multipart, State},
    Json,
};
use validator::Validate;

use crate::{
    common::{
        error::AppError,
        extract::{ApiJson, ApiPath},
        multipart::FormData,
    },
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        rbac::{AsmOnly, RequireRole},
    },
    models::{
        batch::{
            AssayForm, Batch, DealerReceiptForm, GoldbodIntakePayload, RegisterBatchForm,
            TransportPayload,
        },
        invitation::{
            BatchDealer, DealerInvitedResponse, GoldbodInvitedResponse, InviteDealerPayload,
            InviteGoldbodPayload,
        },
    },
};

// ---
// Leitura
// ---

#[utoipa::path(
    get,
    path = "/batches",
    tag = "Batches",
    responses((status = 200, description = "Lotes visíveis ao usuário", body = Vec<Batch>)),
    security(("api_jwt" = []))
)]
pub async fn list_batches(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<Vec<Batch>>, AppError> {
    Ok(Json(app_state.batch_service.list_batches(&user).await?))
}

#[utoipa::path(
    get,
    path = "/batches/{id}",
    tag = "Batches",
    params(("id" = i32, Path, description = "ID do lote")),
    responses(
        (status = 200, description = "Lote", body = Batch),
        (status = 403, description = "Sem acesso ao lote"),
        (status = 404, description = "Lote não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_batch(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiPath(id): ApiPath<i32>,
) -> Result<Json<Batch>, AppError> {
    Ok(Json(app_state.batch_service.get_batch(&user, id).await?))
}

#[utoipa::path(
    get,
    path = "/dealer-for-batch/{batch_id}",
    tag = "Batches",
    params(("batch_id" = i32, Path, description = "ID do lote")),
    responses(
        (status = 200, description = "Dealer aceito do lote", body = BatchDealer),
        (status = 404, description = "Nenhum dealer aceito")
    ),
    security(("api_jwt" = []))
)]
pub async fn dealer_for_batch(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiPath(batch_id): ApiPath<i32>,
) -> Result<Json<BatchDealer>, AppError> {
    Ok(Json(app_state.batch_service.dealer_for_batch(&user, batch_id).await?))
}

// ---
// Etapas
// ---

#[utoipa::path(
    post,
    path = "/batches",
    tag = "Batches",
    request_body(
        content = RegisterBatchForm,
        content_type = "multipart/form-data",
        description = "Campos do lote + arquivo `origin_cert`"
    ),
    responses(
        (status = 200, description = "Lote registrado", body = Batch),
        (status = 403, description = "Apenas asm, na própria mina"),
        (status = 404, description = "Mina não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn register_batch(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    _guard: RequireRole<AsmOnly>,
    multipart: Multipart,
) -> Result<Json<Batch>, AppError> {
    let mut form = FormData::from_multipart(multipart).await?;
    let fields = RegisterBatchForm {
        mine_id: form.parse("mine_id")?,
        date_collected: form.parse("date_collected")?,
        weight_kg: form.parse("weight_kg")?,
    };
    let origin_cert = form.take_file("origin_cert");

    let batch = app_state
        .batch_service
        .register_batch(&user, fields, origin_cert)
        .await?;
    Ok(Json(batch))
}

#[utoipa::path(
    patch,
    path = "/batches/{id}/dealer-receive",
    tag = "Batches",
    params(("id" = i32, Path, description = "ID do lote")),
    request_body(
        content = DealerReceiptForm,
        content_type = "multipart/form-data",
        description = "Campos do recebimento + arquivo opcional `dealer_license`"
    ),
    responses(
        (status = 200, description = "Recebimento registrado", body = Batch),
        (status = 403, description = "Sem convite aceito de dealer"),
        (status = 409, description = "Etapa já registrada ou escrita concorrente")
    ),
    security(("api_jwt" = []))
)]
pub async fn dealer_receive(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiPath(id): ApiPath<i32>,
    multipart: Multipart,
) -> Result<Json<Batch>, AppError> {
    let mut form = FormData::from_multipart(multipart).await?;
    let fields = DealerReceiptForm {
        dealer_location: form.text("dealer_location"),
        dealer_received_weight: form.parse("dealer_received_weight")?,
        dealer_receipt_id: form.text("dealer_receipt_id"),
    };
    let license = form.take_file("dealer_license");

    let batch = app_state
        .batch_service
        .record_dealer_receipt(&user, id, fields, license)
        .await?;
    Ok(Json(batch))
}

#[utoipa::path(
    patch,
    path = "/batches/{id}/transport",
    tag = "Batches",
    params(("id" = i32, Path, description = "ID do lote")),
    request_body = TransportPayload,
    responses(
        (status = 200, description = "Transporte registrado", body = Batch),
        (status = 403, description = "Chamador não tem a custódia"),
        (status = 409, description = "Lote já entregue à autoridade")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_transport(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiPath(id): ApiPath<i32>,
    ApiJson(payload): ApiJson<TransportPayload>,
) -> Result<Json<Batch>, AppError> {
    let batch = app_state
        .batch_service
        .record_transport(&user, id, payload)
        .await?;
    Ok(Json(batch))
}

#[utoipa::path(
    patch,
    path = "/batches/{id}/goldbod-intake",
    tag = "Batches",
    params(("id" = i32, Path, description = "ID do lote")),
    request_body = GoldbodIntakePayload,
    responses(
        (status = 200, description = "Entrada registrada", body = Batch),
        (status = 403, description = "Sem convite aceito de goldbod"),
        (status = 409, description = "Fora de ordem ou já registrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn goldbod_intake(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiPath(id): ApiPath<i32>,
    ApiJson(payload): ApiJson<GoldbodIntakePayload>,
) -> Result<Json<Batch>, AppError> {
    let batch = app_state
        .batch_service
        .record_goldbod_intake(&user, id, payload)
        .await?;
    Ok(Json(batch))
}

#[utoipa::path(
    patch,
    path = "/batches/{id}/assay",
    tag = "Batches",
    params(("id" = i32, Path, description = "ID do lote")),
    request_body(
        content = AssayForm,
        content_type = "multipart/form-data",
        description = "`purity_percent` + arquivo PDF `assay_report`"
    ),
    responses(
        (status = 200, description = "Ensaio registrado", body = Batch),
        (status = 403, description = "Sem convite aceito de goldbod"),
        (status = 409, description = "Entrada ainda não registrada ou ensaio já feito")
    ),
    security(("api_jwt" = []))
)]
pub async fn record_assay(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiPath(id): ApiPath<i32>,
    multipart: Multipart,
) -> Result<Json<Batch>, AppError> {
    let mut form = FormData::from_multipart(multipart).await?;
    let fields = AssayForm {
        purity_percent: form.parse("purity_percent")?,
    };
    let report = form.take_file("assay_report");

    let batch = app_state
        .batch_service
        .record_assay(&user, id, fields, report)
        .await?;
    Ok(Json(batch))
}

// ---
// Convites a partir do lote
// ---

#[utoipa::path(
    post,
    path = "/batches/{id}/invite-dealer",
    tag = "Invitations",
    params(("id" = i32, Path, description = "ID do lote")),
    request_body = InviteDealerPayload,
    responses(
        (status = 200, description = "Dealer convidado", body = DealerInvitedResponse),
        (status = 403, description = "Apenas o asm que registrou o lote"),
        (status = 404, description = "Lote ou dealer não encontrado"),
        (status = 409, description = "O lote já tem convite de dealer")
    ),
    security(("api_jwt" = []))
)]
pub async fn invite_dealer(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiPath(id): ApiPath<i32>,
    ApiJson(payload): ApiJson<InviteDealerPayload>,
) -> Result<Json<DealerInvitedResponse>, AppError> {
    let payload = InviteDealerPayload {
        dealer_username: payload.dealer_username.trim().to_owned(),
    };
    payload.validate()?;

    let invitation = app_state
        .invitation_service
        .invite_dealer(&user, id, &payload.dealer_username)
        .await?;

    Ok(Json(DealerInvitedResponse {
        message: "Dealer invited.".into(),
        invitation: invitation.into(),
    }))
}

#[utoipa::path(
    post,
    path = "/batches/{id}/invite-goldbod",
    tag = "Invitations",
    params(("id" = i32, Path, description = "ID do lote")),
    request_body = InviteGoldbodPayload,
    responses(
        (status = 200, description = "Autoridade convidada", body = GoldbodInvitedResponse),
        (status = 403, description = "Chamador não pode convidar neste estado"),
        (status = 404, description = "Lote ou usuário goldbod não encontrado"),
        (status = 409, description = "Convite duplicado")
    ),
    security(("api_jwt" = []))
)]
pub async fn invite_goldbod(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiPath(id): ApiPath<i32>,
    ApiJson(payload): ApiJson<InviteGoldbodPayload>,
) -> Result<Json<GoldbodInvitedResponse>, AppError> {
    let payload = InviteGoldbodPayload {
        goldbod_username: payload.goldbod_username.trim().to_owned(),
    };
    payload.validate()?;

    let invitation = app_state
        .invitation_service
        .invite_goldbod(&user, id, &payload.goldbod_username)
        .await?;

    Ok(Json(GoldbodInvitedResponse {
        message: "Goldbod invited.".into(),
        invitation: invitation.into(),
    }))
}
