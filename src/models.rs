pub mod auth;
pub mod batch;
pub mod invitation;
pub mod mine;
