// src/handlers.rs

pub mod auth;
pub mod batches;
pub mod health;
pub mod invitations;
pub mod mines;
