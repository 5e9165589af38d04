//! Armazenamento dos documentos anexados aos lotes.
//!
//! O núcleo só precisa de "guarde estes bytes, devolva uma URL pública".
//! Backends:
//!
//! - `SupabaseStore` - Supabase Storage via API REST
//! - `MemoryObjectStore` - mapa em memória, usado nos testes

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;
use axum::body::Bytes;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("upload to bucket '{bucket}' failed: {reason}")]
    UploadFailed { bucket: &'static str, reason: String },

    #[error("storage backend unreachable: {0}")]
    Unreachable(#[from] reqwest::Error),
}

/// Os três prefixos lógicos de documentos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    OriginCerts,
    DealerLicenses,
    AssayReports,
}

impl Bucket {
    pub fn name(&self) -> &'static str {
        match self {
            Bucket::OriginCerts => "origin-certs",
            Bucket::DealerLicenses => "dealer-licenses",
            Bucket::AssayReports => "assay-reports",
        }
    }
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Grava o objeto e devolve a URL pública de leitura.
    async fn put(
        &self,
        bucket: Bucket,
        path: &str,
        content_type: &str,
        bytes: Bytes,
    ) -> Result<String, StorageError>;
}

// ============================================================================
// Supabase Storage
// ============================================================================

#[derive(Clone)]
pub struct SupabaseStore {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl SupabaseStore {
    pub fn new(base_url: &str, service_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            service_key: service_key.to_owned(),
        }
    }

    fn public_url(&self, bucket: Bucket, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url,
            bucket.name(),
            path
        )
    }
}

#[async_trait]
impl ObjectStore for SupabaseStore {
    async fn put(
        &self,
        bucket: Bucket,
        path: &str,
        content_type: &str,
        bytes: Bytes,
    ) -> Result<String, StorageError> {
        let size = bytes.len();
        let url = format!("{}/storage/v1/object/{}/{}", self.base_url, bucket.name(), path);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::UploadFailed {
                bucket: bucket.name(),
                reason: format!("{}: {}", status, body),
            });
        }

        debug!(bucket = bucket.name(), path, size, "Documento enviado ao storage");
        Ok(self.public_url(bucket, path))
    }
}

// ============================================================================
// Em memória
// ============================================================================

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub content_type: String,
    pub bytes: Bytes,
}

#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<String, StoredObject>>,
    unavailable: AtomicBool,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simula uma queda do backend: todo `put` passa a falhar.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().map(|o| o.len()).unwrap_or(0)
    }

    pub fn get(&self, url: &str) -> Option<StoredObject> {
        let key = url.strip_prefix("memory://")?;
        self.objects.lock().ok()?.get(key).cloned()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(
        &self,
        bucket: Bucket,
        path: &str,
        content_type: &str,
        bytes: Bytes,
    ) -> Result<String, StorageError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::UploadFailed {
                bucket: bucket.name(),
                reason: "backend unavailable".into(),
            });
        }

        let key = format!("{}/{}", bucket.name(), path);
        let mut objects = self.objects.lock().map_err(|_| StorageError::UploadFailed {
            bucket: bucket.name(),
            reason: "poisoned lock".into(),
        })?;
        objects.insert(
            key.clone(),
            StoredObject {
                content_type: content_type.to_owned(),
                bytes,
            },
        );
        Ok(format!("memory://{}", key))
    }
}
