// src/middleware/auth.rs

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};

use crate::{common::error::AppError, config::AppState, models::auth::Principal};

// O middleware em si: resolve o principal uma vez e o deixa nos extensions
pub async fn auth_guard(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let bearer = match request.headers().typed_try_get::<Authorization<Bearer>>() {
        Ok(Some(Authorization(bearer))) => bearer,
        Ok(None) => return Err(AppError::MissingToken),
        // Header presente mas sem o esquema Bearer
        Err(_) => return Err(AppError::InvalidToken),
    };

    let principal = app_state.auth_service.validate_token(bearer.token()).await?;

    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

// Extrator para obter o usuário autenticado diretamente nos handlers
pub struct AuthenticatedUser(pub Principal);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(AuthenticatedUser)
            .ok_or(AppError::MissingToken)
    }
}
