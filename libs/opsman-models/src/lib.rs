//! Ops Manager API wire models

pub mod models;

pub use models::*;
