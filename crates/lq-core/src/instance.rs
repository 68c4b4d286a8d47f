//! Single-instance management
//!
//! A lock file under the config directory records the owning process id and
//! the port of its loopback activation socket. A second launch that finds a
//! live owner connects to that socket, asks it to surface its window, and
//! yields. Stale lock files left behind by a crashed process are reclaimed.
//!
//! TCP on 127.0.0.1 is used for the activation channel instead of a Unix
//! socket so the same code works on macOS, Linux, and Windows.

use std::fs;
use std::io::{self, Read, Write};
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use crate::config;

/// Default lock file name
const LOCK_FILE_NAME: &str = "launcher.lock";

/// How long a second launch waits for the owner to accept the activation
/// connection before giving up (it yields either way)
const ACTIVATE_TIMEOUT: Duration = Duration::from_secs(1);

/// Get the default lock file path
pub fn default_lock_path() -> PathBuf {
    config::default_config_dir().join(LOCK_FILE_NAME)
}

/// Result of trying to become the single running instance
pub enum InstanceLock {
    /// This process now owns the lock; keep the guard alive for the whole run
    Acquired(SingleInstanceGuard),
    /// Another live instance owns the lock and has been asked to surface
    /// its window; this process must exit without further side effects
    Yielded,
}

/// Guard owned by the single running instance.
///
/// Dropping the guard stops the activation listener and removes the lock
/// file, even on panic.
pub struct SingleInstanceGuard {
    lock_path: PathBuf,
    cancel: CancellationToken,
}

impl SingleInstanceGuard {
    /// Try to become the single running instance.
    ///
    /// `on_activate` runs in the owning process whenever a second launch is
    /// detected; it should restore and focus the main window (and no-op if
    /// no window exists yet). Acquisition never blocks beyond a short
    /// bounded handshake and never fails with an error: degraded states
    /// (unreadable lock file, unavailable activation socket) resolve in
    /// favor of acquiring.
    pub async fn acquire<F>(lock_path: PathBuf, on_activate: F) -> InstanceLock
    where
        F: Fn() + Send + Sync + 'static,
    {
        let existing = match read_lock_file(&lock_path) {
            Ok(existing) => existing,
            Err(e) => {
                tracing::warn!("Unreadable lock file {:?}, reclaiming: {}", lock_path, e);
                None
            }
        };

        if let Some((pid, port)) = existing {
            if is_process_alive(pid) {
                tracing::info!("Instance {} already running, yielding", pid);
                notify_running_instance(port).await;
                return InstanceLock::Yielded;
            }
            tracing::info!("Reclaiming stale lock from dead process {}", pid);
        }

        let (port, listener) = match TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await {
            Ok(listener) => match listener.local_addr() {
                Ok(addr) => (addr.port(), Some(listener)),
                Err(e) => {
                    tracing::warn!("No local address for activation socket: {}", e);
                    (0, None)
                }
            },
            Err(e) => {
                // Activation is best-effort; the lock itself still holds
                tracing::warn!("Could not bind activation socket: {}", e);
                (0, None)
            }
        };

        if let Err(e) = write_lock_file(&lock_path, std::process::id(), port) {
            tracing::warn!("Failed to write lock file {:?}: {}", lock_path, e);
        }

        let cancel = CancellationToken::new();
        if let Some(listener) = listener {
            tokio::spawn(activation_loop(listener, on_activate, cancel.clone()));
        }

        InstanceLock::Acquired(Self { lock_path, cancel })
    }
}

impl Drop for SingleInstanceGuard {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Err(e) = remove_lock_file(&self.lock_path) {
            tracing::warn!("Failed to remove lock file {:?}: {}", self.lock_path, e);
        }
    }
}

/// Accept activation connections until cancelled.
///
/// Any connection on the activation socket means a second launch happened;
/// the payload is read only to let the peer finish its write.
async fn activation_loop<F>(listener: TcpListener, on_activate: F, cancel: CancellationToken)
where
    F: Fn() + Send + Sync + 'static,
{
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!("Activation listener shutting down");
                break;
            }

            result = listener.accept() => match result {
                Ok((mut stream, peer)) => {
                    let mut buf = [0u8; 32];
                    let _ = tokio::time::timeout(ACTIVATE_TIMEOUT, stream.read(&mut buf)).await;
                    tracing::info!("Second launch detected from {}, surfacing window", peer);
                    on_activate();
                }
                Err(e) => {
                    tracing::warn!("Activation accept failed: {}", e);
                }
            }
        }
    }
}

/// Ask the running instance to surface its window (best effort)
async fn notify_running_instance(port: u16) {
    if port == 0 {
        return;
    }
    let connect = TcpStream::connect((Ipv4Addr::LOCALHOST, port));
    match tokio::time::timeout(ACTIVATE_TIMEOUT, connect).await {
        Ok(Ok(mut stream)) => {
            let _ = stream.write_all(b"activate\n").await;
        }
        Ok(Err(e)) => {
            tracing::debug!("Could not reach running instance on port {}: {}", port, e);
        }
        Err(_) => {
            tracing::debug!("Timed out reaching running instance on port {}", port);
        }
    }
}

/// Read the owner pid and activation port from the lock file
///
/// Returns `Ok(Some((pid, port)))` if the file exists and parses,
/// `Ok(None)` if the file doesn't exist, or an error if it is malformed.
pub fn read_lock_file(path: &Path) -> io::Result<Option<(u32, u16)>> {
    match fs::File::open(path) {
        Ok(mut file) => {
            let mut contents = String::new();
            file.read_to_string(&mut contents)?;
            let mut parts = contents.split_whitespace();
            let pid = parts
                .next()
                .and_then(|p| p.parse::<u32>().ok())
                .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "missing pid"))?;
            let port = parts
                .next()
                .and_then(|p| p.parse::<u16>().ok())
                .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "missing port"))?;
            Ok(Some((pid, port)))
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Write the current owner pid and activation port to the lock file
///
/// Creates parent directories if they don't exist.
pub fn write_lock_file(path: &Path, pid: u32, port: u16) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut file = fs::File::create(path)?;
    writeln!(file, "{} {}", pid, port)?;
    Ok(())
}

/// Remove the lock file
///
/// Returns `Ok(())` even if the file doesn't exist.
pub fn remove_lock_file(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Check if a process with the given PID is still alive
///
/// On Unix, uses kill(pid, 0) to check if the process exists.
/// On Windows, uses OpenProcess to check if the process exists.
#[cfg(unix)]
pub fn is_process_alive(pid: u32) -> bool {
    // kill(pid, 0) returns 0 if the process exists and we have permission
    // to signal it; EPERM means it exists but belongs to someone else
    unsafe {
        let result = libc::kill(pid as libc::pid_t, 0);
        if result == 0 {
            return true;
        }
        let err = std::io::Error::last_os_error();
        err.raw_os_error() == Some(libc::EPERM)
    }
}

#[cfg(windows)]
pub fn is_process_alive(pid: u32) -> bool {
    use std::ptr;
    use windows_sys::Win32::Foundation::{CloseHandle, INVALID_HANDLE_VALUE};
    use windows_sys::Win32::System::Threading::{OpenProcess, PROCESS_QUERY_LIMITED_INFORMATION};

    unsafe {
        let handle = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, 0, pid);
        if handle == INVALID_HANDLE_VALUE || handle == ptr::null_mut() {
            return false;
        }
        CloseHandle(handle);
        true
    }
}
