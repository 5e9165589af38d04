// src/common/extract.rs
//
// Json e Path com a rejeição convertida em AppError, para que corpo
// malformado ou id inválido saiam no mesmo formato JSON dos demais erros.

use axum::extract::{FromRequest, FromRequestParts};

use crate::common::error::AppError;

#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);
