//! CLI subcommand implementations for the formscout binary.

pub mod init_cmd;
pub mod process_cmd;
pub mod suppress_cmd;
