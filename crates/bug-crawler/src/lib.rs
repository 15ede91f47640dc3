//! bug-crawler command line library.
//!
//! The binary is a thin wrapper around this crate:
//! - [`cli`] defines the flags, exit codes and error rendering
//! - [`commands`] holds `scan` and `formula`
//! - [`prompt`] and [`picker`] ask for choices that were not given as flags
//! - [`tracing`] configures structured logging on stderr

pub mod cli;
pub mod commands;
pub mod picker;
pub mod prompt;
pub mod tracing;
