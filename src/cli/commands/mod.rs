//! CLI command implementations

pub mod utils;

pub mod completions;
pub mod config;
pub mod init;
pub mod onboard;
pub mod pricing;
pub mod property;
pub mod tier;
