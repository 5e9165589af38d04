// src/services.rs

pub mod auth;
pub mod batch_service;
pub mod document_service;
pub mod invitation_service;
pub mod lifecycle;
pub mod mine_service;
