//! Application options and drivers

pub mod options;
pub mod run;
