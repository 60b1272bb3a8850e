//! Subcommand implementations.

pub mod backends;
pub mod create;
pub mod ls;
pub mod mechanisms;
pub mod mounts;
pub mod rm;
pub mod show;
