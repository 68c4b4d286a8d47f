//! Error taxonomy for the Lacquer launcher
//!
//! Every failure the orchestration pipeline can hit maps to exactly one
//! variant. Fatal variants are surfaced to the user through a single
//! blocking dialog before the process exits; non-fatal ones (lock
//! contention, cancellation) terminate silently.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Top-level error type for the launcher pipeline
#[derive(Error, Debug)]
pub enum LauncherError {
    /// Another launcher instance already holds the single-instance lock
    #[error("another Lacquer instance is already running")]
    LockContention,

    /// Startup was cancelled from outside (e.g. the window was closed
    /// while the backend was still being probed)
    #[error("startup cancelled")]
    Cancelled,

    /// Neither the preferred port nor an ephemeral fallback could be bound
    #[error("failed to bind a loopback port (requested {requested}): {source}")]
    PortBind {
        requested: u16,
        #[source]
        source: std::io::Error,
    },

    /// No backend interpreter or entrypoint was found at any candidate path
    #[error("no backend runtime found under {searched}")]
    BinaryResolution { searched: PathBuf },

    /// The backend executable failed to launch
    #[error("failed to launch backend {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The backend never answered the health contract within the deadline
    #[error("backend did not become ready within {timeout:?}")]
    ReadinessTimeout { timeout: Duration },

    /// The backend process exited on its own before shutdown was requested
    #[error("backend exited unexpectedly (exit code {})", exit_code_label(*.code))]
    BackendExited { code: Option<i32> },

    /// The packaged frontend bundle has no index document
    #[error("static frontend bundle is missing index.html under {root}")]
    StaticAssetMissing { root: PathBuf },

    /// The UI window could not be created
    #[error("failed to open the application window: {message}")]
    Window { message: String },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn exit_code_label(code: Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "unknown".to_string(),
    }
}

impl LauncherError {
    /// Whether this failure warrants the blocking error dialog.
    ///
    /// Lock contention and cancellation are normal outcomes: the user
    /// either already has the app open or asked it to quit.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            LauncherError::LockContention | LauncherError::Cancelled
        )
    }

    /// The human-readable message shown in the startup error dialog
    pub fn user_message(&self) -> String {
        match self {
            LauncherError::LockContention => {
                "Lacquer is already running.".to_string()
            }
            LauncherError::Cancelled => "Startup was cancelled.".to_string(),
            LauncherError::PortBind { requested, .. } => format!(
                "Could not reserve a local port (tried {} and an automatic fallback). \
                 Another program may be exhausting loopback ports.",
                requested
            ),
            LauncherError::BinaryResolution { searched } => format!(
                "The analysis backend could not be found. Looked under {} and for a \
                 system Python installation.",
                searched.display()
            ),
            LauncherError::Spawn { program, source } => format!(
                "The analysis backend failed to start ({}): {}",
                program.display(),
                source
            ),
            LauncherError::ReadinessTimeout { timeout } => format!(
                "The analysis backend did not respond within {} seconds. \
                 Check the application logs for backend errors.",
                timeout.as_secs()
            ),
            LauncherError::BackendExited { code } => format!(
                "The analysis backend stopped unexpectedly (exit code {}).",
                exit_code_label(*code)
            ),
            LauncherError::StaticAssetMissing { root } => format!(
                "The application interface files are missing ({}). \
                 The installation may be corrupted.",
                root.display()
            ),
            LauncherError::Window { message } => {
                format!("The application window could not be opened: {}", message)
            }
            LauncherError::Io(e) => format!("Unexpected I/O error: {}", e),
        }
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialize error
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}
