// src/services/auth.rs

use std::sync::Arc;

use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use crate::{
    common::error::AppError,
    db::UserStore,
    models::auth::{Claims, Principal, Role, TokenPair, TokenType, User},
};

/// Parâmetros de autenticação carregados do ambiente.
#[derive(Clone)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub bcrypt_cost: u32,
    // Sem isso, todo novo usuário é `asm`
    pub open_role_registration: bool,
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    settings: AuthSettings,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, settings: AuthSettings) -> Self {
        Self { users, settings }
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.settings.refresh_ttl
    }

    pub async fn register_user(
        &self,
        username: &str,
        password: &str,
        requested_role: Option<Role>,
    ) -> Result<Principal, AppError> {
        let role = if self.settings.open_role_registration {
            requested_role.unwrap_or(Role::Asm)
        } else {
            Role::Asm
        };

        // Hashing em thread bloqueante, fora do executor
        let password_clone = password.to_owned();
        let cost = self.settings.bcrypt_cost;
        let hashed_password = tokio::task::spawn_blocking(move || hash(&password_clone, cost))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;

        let user = self.users.create_user(username, &hashed_password, role).await?;

        tracing::info!(user_id = user.id, role = %user.role, "Usuário registrado");
        Ok(Principal::from(&user))
    }

    pub async fn login_user(&self, username: &str, password: &str) -> Result<TokenPair, AppError> {
        let user = self
            .users
            .find_by_username(username)
            .await?
            .ok_or(AppError::UnknownUser)?;

        let password_clone = password.to_owned();
        let password_hash_clone = user.password_hash.clone();

        // Executa a verificação em um thread separado
        let is_password_valid =
            tokio::task::spawn_blocking(move || verify(&password_clone, &password_hash_clone))
                .await
                .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;

        if !is_password_valid {
            tracing::debug!(user_id = user.id, "Senha inválida no login");
            return Err(AppError::InvalidCredentials);
        }

        Ok(TokenPair {
            access_token: self.create_token(&user, TokenType::Access)?,
            refresh_token: self.create_token(&user, TokenType::Refresh)?,
        })
    }

    /// Troca um refresh token válido por um novo token de acesso.
    /// O papel vem do usuário atual, não do token antigo.
    pub async fn refresh(&self, refresh_token: &str) -> Result<String, AppError> {
        let user = self.user_for_token(refresh_token, TokenType::Refresh).await?;
        self.create_token(&user, TokenType::Access)
    }

    /// Valida o token de acesso e resolve o principal (uma vez por requisição).
    pub async fn validate_token(&self, token: &str) -> Result<Principal, AppError> {
        let user = self.user_for_token(token, TokenType::Access).await?;
        Ok(Principal::from(&user))
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Principal, AppError> {
        self.users
            .find_by_id(id)
            .await?
            .map(|u| Principal::from(&u))
            .ok_or_else(|| AppError::not_found("User not found."))
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Principal, AppError> {
        self.users
            .find_by_username(username)
            .await?
            .map(|u| Principal::from(&u))
            .ok_or_else(|| AppError::not_found("User not found."))
    }

    async fn user_for_token(&self, token: &str, expected: TokenType) -> Result<User, AppError> {
        let claims = self.decode_token(token)?;
        if claims.typ != expected {
            return Err(AppError::InvalidToken);
        }

        // Usuário removido depois da emissão: o token deixa de valer
        self.users
            .find_by_id(claims.sub)
            .await?
            .ok_or(AppError::InvalidToken)
    }

    fn decode_token(&self, token: &str) -> Result<Claims, AppError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.settings.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|_| AppError::InvalidToken)?;
        Ok(token_data.claims)
    }

    fn create_token(&self, user: &User, typ: TokenType) -> Result<String, AppError> {
        let now = Utc::now();
        let ttl = match typ {
            TokenType::Access => self.settings.access_ttl,
            TokenType::Refresh => self.settings.refresh_ttl,
        };

        let claims = Claims {
            sub: user.id,
            role: user.role,
            typ,
            exp: (now + ttl).timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.settings.jwt_secret.as_ref()),
        )?)
    }
}
