//! opsbackup unit tests

mod common;
mod test_export;
mod test_import;
