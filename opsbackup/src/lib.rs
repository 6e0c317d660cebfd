//! Ops Manager backup client library
//!
//! Export and import of an appliance installation, and classification of
//! its Elastic Runtime jobs by role.

pub mod app;
pub mod authn;
pub mod backup;
pub mod errors;
pub mod filesys;
pub mod http;
pub mod logs;
pub mod models;
pub mod opsman;
pub mod remote;
pub mod storage;
pub mod utils;
