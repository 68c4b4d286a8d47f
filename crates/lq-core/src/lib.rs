//! lq-core: Shared foundations for the Lacquer launcher
//!
//! This crate provides the domain types, configuration structures, error
//! taxonomy, and single-instance guard used by the launcher and the
//! desktop shell.

pub mod config;
pub mod error;
pub mod instance;
pub mod types;

pub use error::LauncherError;
pub use types::{PortBinding, ReadinessState, RunMode};
