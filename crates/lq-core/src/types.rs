//! Core domain types

use serde::{Deserialize, Serialize};
use std::fmt;

/// How the launcher was started.
///
/// Fixed for the lifetime of the process. Development runs expect an
/// external frontend dev server; packaged runs serve the exported static
/// bundle themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Running from a source checkout
    Development,
    /// Running from an installed/packaged build
    Packaged,
}

impl RunMode {
    /// Detect the run mode for this process.
    ///
    /// The `LACQUER_DEV` environment variable overrides the compile-time
    /// default (`1`/`true` forces development, anything else forces
    /// packaged). Without the override, debug builds are development and
    /// release builds are packaged.
    pub fn detect() -> Self {
        match std::env::var("LACQUER_DEV") {
            Ok(v) if v == "1" || v.eq_ignore_ascii_case("true") => RunMode::Development,
            Ok(_) => RunMode::Packaged,
            Err(_) => {
                if cfg!(debug_assertions) {
                    RunMode::Development
                } else {
                    RunMode::Packaged
                }
            }
        }
    }

    /// Whether the launcher must serve the static frontend bundle itself
    pub fn serves_static_assets(&self) -> bool {
        matches!(self, RunMode::Packaged)
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Development => write!(f, "development"),
            RunMode::Packaged => write!(f, "packaged"),
        }
    }
}

/// A negotiated loopback TCP port.
///
/// The bound port is either the requested one or an OS-assigned ephemeral
/// fallback. The probe socket used during allocation is released before the
/// port is handed to its real owner, so the port is "likely free" rather
/// than reserved; a bind failure at service start is possible and treated
/// as a one-shot error by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortBinding {
    /// The port the caller asked for
    pub requested: u16,
    /// The port actually obtained
    pub port: u16,
}

impl PortBinding {
    /// Create a new binding
    pub fn new(requested: u16, port: u16) -> Self {
        Self { requested, port }
    }

    /// Whether the preferred port was unavailable and an ephemeral port
    /// was used instead
    pub fn is_fallback(&self) -> bool {
        self.requested != self.port
    }

    /// The loopback origin for this binding, e.g. `http://127.0.0.1:8000`
    pub fn origin(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }
}

impl fmt::Display for PortBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "127.0.0.1:{}", self.port)
    }
}

/// Outcome of the backend readiness probe.
///
/// Transitions are monotonic: `Pending` resolves to exactly one of `Ready`
/// or `TimedOut` and never reverts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessState {
    /// The probe has not reached a verdict (also returned when the probe
    /// loop is cancelled from outside)
    Pending,
    /// The backend answered the health contract
    Ready,
    /// The deadline elapsed without a successful answer
    TimedOut,
}

impl ReadinessState {
    /// Whether the probe reached a verdict
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReadinessState::Pending)
    }
}

impl fmt::Display for ReadinessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadinessState::Pending => write!(f, "pending"),
            ReadinessState::Ready => write!(f, "ready"),
            ReadinessState::TimedOut => write!(f, "timed out"),
        }
    }
}
