// src/common/multipart.rs

use std::{collections::HashMap, str::FromStr};

use axum::{body::Bytes, extract::Multipart};
use validator::{ValidationError, ValidationErrors};

use crate::common::error::AppError;

/// Um arquivo recebido numa parte multipart, ainda em memória.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

// ---
// Formulário multipart já bufferizado: campos de texto + arquivos
// ---
#[derive(Debug, Default)]
pub struct FormData {
    fields: HashMap<String, String>,
    files: HashMap<String, UploadedFile>,
}

impl FormData {
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = FormData::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::invalid(format!("Malformed multipart body: {}", e)))?
        {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };

            // Parte com filename é arquivo; o resto é texto
            if let Some(file_name) = field.file_name().map(str::to_owned) {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_owned();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::invalid(format!("Could not read file '{}': {}", name, e)))?;
                form.files.insert(
                    name,
                    UploadedFile {
                        file_name,
                        content_type,
                        bytes,
                    },
                );
            } else {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::invalid(format!("Could not read field '{}': {}", name, e)))?;
                form.fields.insert(name, text);
            }
        }

        Ok(form)
    }

    /// Texto do campo, já sem espaços; vazio conta como ausente.
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_owned)
    }

    /// Converte o campo; falha de conversão vira erro de validação do campo.
    pub fn parse<T: FromStr>(&self, name: &'static str) -> Result<Option<T>, AppError> {
        match self.text(name) {
            None => Ok(None),
            Some(raw) => raw.parse::<T>().map(Some).map_err(|_| {
                let mut err = ValidationError::new("parse");
                err.message = Some(format!("'{}' is not a valid value.", raw).into());
                let mut errors = ValidationErrors::new();
                errors.add(name, err);
                AppError::ValidationError(errors)
            }),
        }
    }

    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        self.files.remove(name)
    }

    #[cfg(test)]
    pub fn with_fields(pairs: &[(&str, &str)]) -> Self {
        FormData {
            fields: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            files: HashMap::new(),
        }
    }
}
