//! API Routes

pub mod admin;
pub mod business;
pub mod context;
pub mod directory;
pub mod health;
