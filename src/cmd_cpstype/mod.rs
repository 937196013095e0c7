//! Subcommand modules for the `cpstype` binary.

pub mod init;
pub mod run;
