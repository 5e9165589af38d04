// src/routes.rs
//
// Montagem do router, separada do main para ser usada nos testes.

use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method},
    middleware as axum_middleware,
    routing::{get, patch, post},
    Json, Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;

use crate::{config::AppState, docs::ApiDoc, handlers, middleware::auth::auth_guard};

fn cors_layer(state: &AppState) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS];

    match &state.http.cors_origin {
        // Origem explícita: o navegador pode enviar o cookie de refresh
        Some(origin) => CorsLayer::new()
            .allow_origin(origin.clone())
            .allow_methods(methods)
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true),
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any),
    }
}

pub fn router(app_state: AppState) -> Router {
    // Rotas públicas de autenticação
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/refresh", post(handlers::auth::refresh));

    // Tudo abaixo exige bearer token
    let protected_routes = Router::new()
        // --- Usuários ---
        .route("/user/me", get(handlers::auth::get_me))
        .route("/user/by-id/{id}", get(handlers::auth::get_user_by_id))
        .route(
            "/user/by-username/{username}",
            get(handlers::auth::get_user_by_username),
        )
        // --- Minas ---
        .route(
            "/mines",
            get(handlers::mines::list_mines).post(handlers::mines::create_mine),
        )
        .route("/mines/{id}", get(handlers::mines::get_mine))
        // --- Lotes ---
        .route(
            "/batches",
            get(handlers::batches::list_batches).post(handlers::batches::register_batch),
        )
        .route("/batches/{id}", get(handlers::batches::get_batch))
        .route(
            "/batches/{id}/dealer-receive",
            patch(handlers::batches::dealer_receive),
        )
        .route(
            "/batches/{id}/transport",
            patch(handlers::batches::update_transport),
        )
        .route(
            "/batches/{id}/goldbod-intake",
            patch(handlers::batches::goldbod_intake),
        )
        .route("/batches/{id}/assay", patch(handlers::batches::record_assay))
        .route(
            "/batches/{id}/invite-dealer",
            post(handlers::batches::invite_dealer),
        )
        .route(
            "/batches/{id}/invite-goldbod",
            post(handlers::batches::invite_goldbod),
        )
        .route(
            "/dealer-for-batch/{batch_id}",
            get(handlers::batches::dealer_for_batch),
        )
        // --- Convites de dealer ---
        .route(
            "/dealer-invitations",
            get(handlers::invitations::list_dealer_invitations),
        )
        .route(
            "/dealer-invitations/history",
            get(handlers::invitations::dealer_invitation_history),
        )
        .route(
            "/dealer-invitations/{id}",
            axum::routing::delete(handlers::invitations::delete_dealer_invitation),
        )
        .route(
            "/dealer-invitations/{id}/accept",
            patch(handlers::invitations::accept_dealer_invitation),
        )
        .route(
            "/dealer-invitations/{id}/reject",
            patch(handlers::invitations::reject_dealer_invitation),
        )
        // --- Convites da autoridade ---
        .route(
            "/goldbod-invitations",
            get(handlers::invitations::list_goldbod_invitations),
        )
        .route(
            "/goldbod-invitations/history",
            get(handlers::invitations::goldbod_invitation_history),
        )
        .route(
            "/goldbod-invitations/{id}",
            axum::routing::delete(handlers::invitations::delete_goldbod_invitation),
        )
        .route(
            "/goldbod-invitations/{id}/accept",
            patch(handlers::invitations::accept_goldbod_invitation),
        )
        .route(
            "/goldbod-invitations/{id}/reject",
            patch(handlers::invitations::reject_goldbod_invitation),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let cors = cors_layer(&app_state);
    let body_limit = app_state.http.max_upload_bytes;

    // Combina tudo no router principal
    Router::new()
        .route("/health", get(handlers::health::health))
        .route(
            "/api-docs/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .nest("/auth", auth_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}
