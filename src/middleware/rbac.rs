// src/middleware/rbac.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use std::marker::PhantomData;

use crate::{
    common::error::AppError,
    models::auth::{Principal, Role},
};

/// 1. O Trait que define o papel exigido por uma rota
pub trait RoleDef: Send + Sync + 'static {
    fn role() -> Role;
    fn denied() -> &'static str;
}

/// 2. O Extractor (Guardião): só o papel, o resto das regras fica nos serviços
pub struct RequireRole<T>(pub PhantomData<T>);

// 3. Implementação do FromRequestParts
impl<T, S> FromRequestParts<S> for RequireRole<T>
where
    T: RoleDef,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // A. Principal colocado pelo auth_guard
        let principal = parts
            .extensions
            .get::<Principal>()
            .ok_or(AppError::MissingToken)?;

        // B. Compara o papel
        if principal.role != T::role() {
            tracing::debug!(user_id = principal.id, role = %principal.role, "Papel recusado");
            return Err(AppError::forbidden(T::denied()));
        }

        Ok(RequireRole(PhantomData))
    }
}

// ---
// DEFINIÇÃO DOS PAPÉIS (TIPOS)
// ---

pub struct AsmOnly;
impl RoleDef for AsmOnly {
    fn role() -> Role { Role::Asm }
    fn denied() -> &'static str { "Only ASM users can perform this action." }
}

pub struct DealerOnly;
impl RoleDef for DealerOnly {
    fn role() -> Role { Role::Dealer }
    fn denied() -> &'static str { "Only dealers can access dealer invitations." }
}

pub struct GoldbodOnly;
impl RoleDef for GoldbodOnly {
    fn role() -> Role { Role::Goldbod }
    fn denied() -> &'static str { "Only goldbod users can access goldbod invitations." }
}
