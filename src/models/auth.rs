// src/models/auth.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

// --- Papéis ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")] // Banco
#[serde(rename_all = "lowercase")] // JSON
pub enum Role {
    Asm,     // mineradora (artisanal/small-scale)
    Dealer,  // comprador intermediário
    Goldbod, // autoridade reguladora
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Asm => "asm",
            Role::Dealer => "dealer",
            Role::Goldbod => "goldbod",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// Representa um usuário vindo do banco de dados
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Identidade resolvida uma única vez por requisição pelo `auth_guard`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Principal {
    #[schema(example = 1)]
    pub id: i32,
    #[schema(example = "kwame")]
    pub username: String,
    pub role: Role,
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            role: user.role,
        }
    }
}

// Dados para registro de um novo usuário
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterUserPayload {
    #[validate(length(min = 3, max = 64, message = "Username must have 3 to 64 characters."))]
    #[schema(example = "kwame")]
    pub username: String,

    #[validate(length(min = 6, message = "Password must have at least 6 characters."))]
    pub password: String,

    // Só é respeitado com OPEN_ROLE_REGISTRATION
    pub role: Option<Role>,
}

// Dados para login
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginUserPayload {
    #[validate(length(min = 1, message = "Username is required."))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required."))]
    pub password: String,
}

// Resposta de autenticação com o token de acesso
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterResponse {
    #[schema(example = "User registered!")]
    pub message: String,
    pub user: Principal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

// Estrutura de dados ("claims") dentro do JWT
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i32,       // Subject (ID do usuário)
    pub role: Role,
    pub typ: TokenType, // acesso ou refresh
    pub exp: usize,     // Expiration time
    pub iat: usize,     // Issued At
}

/// Par emitido no login: o refresh vai no cookie, o de acesso no corpo.
#[derive(Debug)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}
