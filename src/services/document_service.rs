// src/services/document_service.rs

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    common::{error::AppError, multipart::UploadedFile},
    storage::{Bucket, ObjectStore},
};

#[derive(Clone)]
pub struct DocumentService {
    store: Arc<dyn ObjectStore>,
}

impl DocumentService {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Envia o documento e devolve só a URL, que é o que o lote guarda.
    /// `scope` agrupa os objetos (id do lote ou do usuário).
    pub async fn store_document(
        &self,
        bucket: Bucket,
        scope: &str,
        file: UploadedFile,
    ) -> Result<String, AppError> {
        check_document(bucket, &file)?;

        let path = format!(
            "{}/{}-{}",
            scope,
            Uuid::new_v4().simple(),
            sanitize_file_name(&file.file_name)
        );

        let url = self
            .store
            .put(bucket, &path, &file.content_type, file.bytes)
            .await?;

        tracing::info!(bucket = bucket.name(), %path, "Documento armazenado");
        Ok(url)
    }
}

// Certificados e licenças: imagem ou PDF. Laudo de ensaio: só PDF.
fn check_document(bucket: Bucket, file: &UploadedFile) -> Result<(), AppError> {
    if file.bytes.is_empty() {
        return Err(AppError::invalid(format!(
            "Uploaded file '{}' is empty.",
            file.file_name
        )));
    }

    let content_type = file.content_type.to_ascii_lowercase();
    let is_pdf = content_type == "application/pdf";
    let is_image = content_type.starts_with("image/");

    let accepted = match bucket {
        Bucket::OriginCerts | Bucket::DealerLicenses => is_pdf || is_image,
        Bucket::AssayReports => is_pdf,
    };

    if !accepted {
        return Err(AppError::invalid(format!(
            "Unsupported file type '{}' for {}.",
            file.content_type,
            bucket.name()
        )));
    }
    Ok(())
}

fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(name)
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(100)
        .collect();

    if cleaned.trim_matches('.').is_empty() {
        "document".to_owned()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryObjectStore;
    use axum::body::Bytes;

    fn file(name: &str, content_type: &str, bytes: &'static [u8]) -> UploadedFile {
        UploadedFile {
            file_name: name.into(),
            content_type: content_type.into(),
            bytes: Bytes::from_static(bytes),
        }
    }

    #[test]
    fn file_names_are_flattened() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("laudo final (v2).pdf"), "laudo_final__v2_.pdf");
        assert_eq!(sanitize_file_name(".."), "document");
    }

    #[tokio::test]
    async fn assay_reports_must_be_pdf() {
        let service = DocumentService::new(Arc::new(MemoryObjectStore::new()));
        let err = service
            .store_document(Bucket::AssayReports, "1", file("report.png", "image/png", b"x"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Invalid(_)));

        let url = service
            .store_document(Bucket::AssayReports, "1", file("report.pdf", "application/pdf", b"%PDF"))
            .await
            .unwrap();
        assert!(url.starts_with("memory://assay-reports/1/"));
        assert!(url.ends_with("-report.pdf"));
    }

    #[tokio::test]
    async fn empty_files_are_rejected() {
        let service = DocumentService::new(Arc::new(MemoryObjectStore::new()));
        let err = service
            .store_document(Bucket::OriginCerts, "1", file("cert.png", "image/png", b""))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Invalid(_)));
    }
}
