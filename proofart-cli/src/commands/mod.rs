//! Subcommand implementations.

pub mod bind;
pub mod generate;
pub mod hash;
pub mod verify;
