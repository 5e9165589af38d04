// src/config.rs

use std::{env, str::FromStr, sync::Arc, time::Duration, time::Instant};

use anyhow::Context;
use axum::http::HeaderValue;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::Stores,
    services::{
        auth::{AuthService, AuthSettings},
        batch_service::BatchService,
        document_service::DocumentService,
        invitation_service::InvitationService,
        mine_service::MineService,
    },
    storage::{ObjectStore, SupabaseStore},
};

const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

fn required(name: &str) -> anyhow::Result<String> {
    env::var(name).with_context(|| format!("{} deve ser definida", name))
}

fn optional<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} inválida: {}", name, e)),
        _ => Ok(default),
    }
}

/// Ajustes da camada HTTP que não pertencem a nenhum serviço.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub cookie_secure: bool,
    pub max_upload_bytes: usize,
    // Sem origem configurada: qualquer origem, sem credenciais
    pub cors_origin: Option<HeaderValue>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            cookie_secure: true,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            cors_origin: None,
        }
    }
}

pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub supabase_url: String,
    pub supabase_service_key: String,
    pub bind_addr: String,
    pub auth: AuthSettings,
    pub http: HttpSettings,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let auth = AuthSettings {
            jwt_secret: required("JWT_SECRET")?,
            access_ttl: chrono::Duration::hours(optional("ACCESS_TOKEN_TTL_HOURS", 20)?),
            refresh_ttl: chrono::Duration::days(optional("REFRESH_TOKEN_TTL_DAYS", 7)?),
            bcrypt_cost: optional("BCRYPT_COST", bcrypt::DEFAULT_COST)?,
            open_role_registration: optional("OPEN_ROLE_REGISTRATION", false)?,
        };

        let http = HttpSettings {
            cookie_secure: optional("COOKIE_SECURE", true)?,
            max_upload_bytes: optional("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            cors_origin: match env::var("CORS_ORIGIN") {
                Ok(origin) if !origin.trim().is_empty() => Some(
                    HeaderValue::from_str(origin.trim()).context("CORS_ORIGIN inválida")?,
                ),
                _ => None,
            },
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            database_max_connections: optional("DATABASE_MAX_CONNECTIONS", 5)?,
            supabase_url: required("SUPABASE_URL")?,
            supabase_service_key: required("SUPABASE_SERVICE_KEY")?,
            bind_addr: optional("BIND_ADDR", "0.0.0.0:5000".to_owned())?,
            auth,
            http,
        })
    }

    // Conecta ao banco de dados, usando '?' para propagar erros
    pub async fn connect(&self) -> anyhow::Result<PgPool> {
        let pool = PgPoolOptions::new()
            .max_connections(self.database_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&self.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");
        Ok(pool)
    }
}

#[derive(Clone)]
pub struct AppState {
    pub auth_service: AuthService,
    pub mine_service: MineService,
    pub batch_service: BatchService,
    pub invitation_service: InvitationService,
    pub http: HttpSettings,
    pub started_at: Instant,
}

impl AppState {
    /// Estado de produção: Postgres + Supabase Storage.
    pub fn postgres(config: &Config, pool: PgPool) -> Self {
        let object_store: Arc<dyn ObjectStore> = Arc::new(SupabaseStore::new(
            &config.supabase_url,
            &config.supabase_service_key,
        ));
        Self::from_parts(
            Stores::postgres(pool),
            object_store,
            config.auth.clone(),
            config.http.clone(),
        )
    }

    // --- Monta o gráfico de dependências ---
    pub fn from_parts(
        stores: Stores,
        object_store: Arc<dyn ObjectStore>,
        auth: AuthSettings,
        http: HttpSettings,
    ) -> Self {
        let documents = DocumentService::new(object_store);

        Self {
            auth_service: AuthService::new(stores.users.clone(), auth),
            mine_service: MineService::new(stores.mines.clone()),
            batch_service: BatchService::new(
                stores.batches.clone(),
                stores.invitations.clone(),
                stores.mines.clone(),
                documents,
            ),
            invitation_service: InvitationService::new(
                stores.users,
                stores.batches,
                stores.invitations,
            ),
            http,
            started_at: Instant::now(),
        }
    }
}
