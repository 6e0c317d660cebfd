//! Installation export and import

pub mod export;
pub mod import;
pub mod upload;
