// src/handlers/auth.rs

use axum::{
    extract::State,
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use validator::Validate;

use crate::{
    common::{
        error::AppError,
        extract::{ApiJson, ApiPath},
    },
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::auth::{AuthResponse, LoginUserPayload, Principal, RegisterResponse, RegisterUserPayload},
};

pub const REFRESH_COOKIE: &str = "refreshToken";

// Cookie do refresh token: só o caminho /auth o recebe de volta
fn refresh_cookie(token: String, max_age_secs: i64, secure: bool) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE, token))
        .http_only(true)
        .same_site(SameSite::Strict)
        .path("/auth")
        .max_age(time::Duration::seconds(max_age_secs))
        .secure(secure)
        .build()
}

// Handler de registro
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "Auth",
    request_body = RegisterUserPayload,
    responses(
        (status = 200, description = "Usuário criado", body = RegisterResponse),
        (status = 400, description = "Dados inválidos ou username em uso")
    )
)]
pub async fn register(
    State(app_state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterUserPayload>,
) -> Result<Json<RegisterResponse>, AppError> {
    let username = payload.username.trim().to_owned();
    let payload = RegisterUserPayload { username, ..payload };
    payload.validate()?;

    let user = app_state
        .auth_service
        .register_user(&payload.username, &payload.password, payload.role)
        .await?;

    Ok(Json(RegisterResponse {
        message: "User registered!".into(),
        user,
    }))
}

// Handler de login: token de acesso no corpo, refresh no cookie
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Auth",
    request_body = LoginUserPayload,
    responses(
        (status = 200, description = "Autenticado; cookie refreshToken definido", body = AuthResponse),
        (status = 400, description = "Usuário não encontrado"),
        (status = 401, description = "Senha inválida")
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    jar: CookieJar,
    ApiJson(payload): ApiJson<LoginUserPayload>,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    payload.validate()?;

    let tokens = app_state
        .auth_service
        .login_user(payload.username.trim(), &payload.password)
        .await?;

    let cookie = refresh_cookie(
        tokens.refresh_token,
        app_state.auth_service.refresh_ttl().num_seconds(),
        app_state.http.cookie_secure,
    );

    Ok((
        jar.add(cookie),
        Json(AuthResponse {
            token: tokens.access_token,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/auth/refresh",
    tag = "Auth",
    responses(
        (status = 200, description = "Novo token de acesso", body = AuthResponse),
        (status = 401, description = "Refresh token ausente ou inválido")
    )
)]
pub async fn refresh(
    State(app_state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<AuthResponse>, AppError> {
    let refresh_token = jar
        .get(REFRESH_COOKIE)
        .map(|c| c.value().to_owned())
        .ok_or(AppError::MissingToken)?;

    let token = app_state.auth_service.refresh(&refresh_token).await?;
    Ok(Json(AuthResponse { token }))
}

// ---
// Usuários (rotas protegidas)
// ---

#[utoipa::path(
    get,
    path = "/user/me",
    tag = "Users",
    responses((status = 200, description = "Usuário autenticado", body = Principal)),
    security(("api_jwt" = []))
)]
pub async fn get_me(AuthenticatedUser(user): AuthenticatedUser) -> Json<Principal> {
    Json(user)
}

#[utoipa::path(
    get,
    path = "/user/by-id/{id}",
    tag = "Users",
    params(("id" = i32, Path, description = "ID do usuário")),
    responses(
        (status = 200, description = "Usuário", body = Principal),
        (status = 404, description = "Usuário não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_user_by_id(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    ApiPath(id): ApiPath<i32>,
) -> Result<Json<Principal>, AppError> {
    Ok(Json(app_state.auth_service.find_by_id(id).await?))
}

#[utoipa::path(
    get,
    path = "/user/by-username/{username}",
    tag = "Users",
    params(("username" = String, Path, description = "Username")),
    responses(
        (status = 200, description = "Usuário", body = Principal),
        (status = 404, description = "Usuário não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_user_by_username(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    ApiPath(username): ApiPath<String>,
) -> Result<Json<Principal>, AppError> {
    Ok(Json(app_state.auth_service.find_by_username(&username).await?))
}
