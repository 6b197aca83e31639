//! SeaORM entities for the SSO tables.

pub mod app;
pub mod user;
