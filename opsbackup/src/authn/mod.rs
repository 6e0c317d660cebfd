//! Appliance authentication

pub mod negotiator;
pub mod uaa;
