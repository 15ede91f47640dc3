//! Subcommand implementations.

pub mod formula;
pub mod scan;
