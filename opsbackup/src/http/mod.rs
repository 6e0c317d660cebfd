//! HTTP transport and API calls

pub mod client;
pub mod installation;
