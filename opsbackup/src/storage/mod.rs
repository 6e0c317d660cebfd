//! Settings and backup layout

pub mod layout;
pub mod settings;
