//! Commands run on the appliance VM

pub mod executor;
