//! Backend process supervision
//!
//! Spawns the resolved interpreter with the negotiated port and the exact
//! frontend origin, pumps its output into the log, and owns its lifetime.
//! The supervisor never restarts a crashed backend; an exit it did not ask
//! for is the coordinator's problem to surface.

use std::process::{ExitStatus, Stdio};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};

use lq_core::{LauncherError, PortBinding};

use crate::resolver::ExecutableLocation;

/// Spawn the backend bound to loopback and the allocated port.
///
/// The environment carries `PYTHONIOENCODING=utf-8` so output survives
/// non-UTF-8 consoles, and `CLIENT_ORIGIN` set to the exact UI origin so
/// the backend scopes its cross-origin policy to that one caller.
pub fn spawn(
    location: &ExecutableLocation,
    binding: &PortBinding,
    frontend_origin: &str,
) -> Result<BackendProcess, LauncherError> {
    let mut command = Command::new(&location.python);
    command
        .arg("-u")
        .arg(&location.entrypoint)
        .arg("--host")
        .arg("127.0.0.1")
        .arg("--port")
        .arg(binding.port.to_string())
        .current_dir(&location.working_dir)
        .env("PYTHONIOENCODING", "utf-8")
        .env("CLIENT_ORIGIN", frontend_origin)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        // Last line of defense against orphans; normal teardown goes
        // through `stop`
        .kill_on_drop(true);

    #[cfg(windows)]
    {
        // CREATE_NO_WINDOW: don't flash a console window
        command.creation_flags(0x0800_0000);
    }

    let mut child = command.spawn().map_err(|source| LauncherError::Spawn {
        program: location.python.clone(),
        source,
    })?;

    let pid = child.id();
    tracing::info!(
        "Backend started (pid {:?}) on {} for origin {}",
        pid,
        binding,
        frontend_origin
    );

    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(pump_output(stdout, OutputStream::Stdout));
    }
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(pump_output(stderr, OutputStream::Stderr));
    }

    Ok(BackendProcess {
        child,
        pid,
        stopped: false,
    })
}

/// Which backend stream a log line came from
enum OutputStream {
    Stdout,
    Stderr,
}

/// Forward backend output to the log, line by line.
///
/// Diagnostics only - the launcher never parses backend output for
/// control signals.
async fn pump_output(stream: impl AsyncRead + Unpin, which: OutputStream) {
    let mut lines = BufReader::new(stream).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match which {
                OutputStream::Stdout => tracing::info!(target: "lacquer::backend", "{}", line),
                OutputStream::Stderr => tracing::warn!(target: "lacquer::backend", "{}", line),
            },
            Ok(None) => break,
            Err(e) => {
                tracing::debug!("Backend output stream closed: {}", e);
                break;
            }
        }
    }
}

/// Exclusive handle to the running backend process
#[derive(Debug)]
pub struct BackendProcess {
    child: Child,
    pid: Option<u32>,
    stopped: bool,
}

impl BackendProcess {
    /// OS process id, if the process has not already been reaped
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Wait for the backend to exit on its own.
    ///
    /// Cancel-safe; the coordinator selects on this while the app runs so
    /// an unexpected exit surfaces immediately.
    pub async fn wait(&mut self) -> Option<ExitStatus> {
        match self.child.wait().await {
            Ok(status) => Some(status),
            Err(e) => {
                tracing::warn!("Failed to wait on backend process: {}", e);
                None
            }
        }
    }

    /// Stop the backend.
    ///
    /// Idempotent: signaling an already-exited process is a no-op, and a
    /// second call returns immediately.
    pub async fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;

        // A kill error just means the process is already gone
        if let Err(e) = self.child.start_kill() {
            tracing::debug!("Backend already exited before kill: {}", e);
        }

        match self.child.wait().await {
            Ok(status) => tracing::info!("Backend stopped ({})", status),
            Err(e) => tracing::warn!("Failed to reap backend process: {}", e),
        }
    }
}
