// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Health ---
        handlers::health::health,

        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::refresh,

        // --- Users ---
        handlers::auth::get_me,
        handlers::auth::get_user_by_id,
        handlers::auth::get_user_by_username,

        // --- Mines ---
        handlers::mines::list_mines,
        handlers::mines::get_mine,
        handlers::mines::create_mine,

        // --- Batches ---
        handlers::batches::list_batches,
        handlers::batches::get_batch,
        handlers::batches::dealer_for_batch,
        handlers::batches::register_batch,
        handlers::batches::dealer_receive,
        handlers::batches::update_transport,
        handlers::batches::goldbod_intake,
        handlers::batches::record_assay,

        // --- Invitations ---
        handlers::batches::invite_dealer,
        handlers::batches::invite_goldbod,
        handlers::invitations::list_dealer_invitations,
        handlers::invitations::dealer_invitation_history,
        handlers::invitations::accept_dealer_invitation,
        handlers::invitations::reject_dealer_invitation,
        handlers::invitations::delete_dealer_invitation,
        handlers::invitations::list_goldbod_invitations,
        handlers::invitations::goldbod_invitation_history,
        handlers::invitations::accept_goldbod_invitation,
        handlers::invitations::reject_goldbod_invitation,
        handlers::invitations::delete_goldbod_invitation,
    ),
    components(
        schemas(
            handlers::health::HealthResponse,

            // --- Auth ---
            models::auth::Role,
            models::auth::Principal,
            models::auth::RegisterUserPayload,
            models::auth::LoginUserPayload,
            models::auth::AuthResponse,
            models::auth::RegisterResponse,

            // --- Mines ---
            models::mine::Mine,
            models::mine::CreateMinePayload,

            // --- Batches ---
            models::batch::TransportLeg,
            models::batch::Batch,
            models::batch::RegisterBatchForm,
            models::batch::DealerReceiptForm,
            models::batch::TransportPayload,
            models::batch::GoldbodIntakePayload,
            models::batch::AssayForm,

            // --- Invitations ---
            models::invitation::InvitationKind,
            models::invitation::DealerInvitation,
            models::invitation::GoldbodInvitation,
            models::invitation::InvitationSummary,
            models::invitation::InviteDealerPayload,
            models::invitation::InviteGoldbodPayload,
            models::invitation::DealerInvitedResponse,
            models::invitation::GoldbodInvitedResponse,
            models::invitation::BatchDealer,
            models::invitation::DeletedResponse,
        )
    ),
    tags(
        (name = "Health", description = "Liveness"),
        (name = "Auth", description = "Autenticação e Registro"),
        (name = "Users", description = "Dados do Usuário"),
        (name = "Mines", description = "Cadastro de Minas"),
        (name = "Batches", description = "Ciclo de vida do lote (cadeia de custódia)"),
        (name = "Invitations", description = "Convites de dealer e da autoridade")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
