//! Loopback port negotiation
//!
//! Prefer a well-known port, fall back once to an OS-assigned ephemeral
//! port. The probe socket is closed before the port is handed out, so the
//! result is "likely free" rather than reserved; the eventual owner of the
//! port must treat a bind failure as a one-shot startup error.

use std::io;
use std::net::{Ipv4Addr, TcpListener};

use lq_core::{LauncherError, PortBinding};

/// Find a usable loopback port, preferring `preferred`.
///
/// Exactly one fallback is attempted; if even the ephemeral bind fails the
/// machine is out of loopback ports and the error is fatal.
pub fn allocate(preferred: u16) -> Result<PortBinding, LauncherError> {
    match probe_bind(preferred) {
        Ok(port) => Ok(PortBinding::new(preferred, port)),
        Err(e) => {
            tracing::debug!(
                "Port {} unavailable ({}), falling back to ephemeral",
                preferred,
                e
            );
            let port = probe_bind(0).map_err(|source| LauncherError::PortBind {
                requested: preferred,
                source,
            })?;
            tracing::info!("Allocated fallback port {} (wanted {})", port, preferred);
            Ok(PortBinding::new(preferred, port))
        }
    }
}

/// Bind the port on loopback, read back the assigned number, release.
fn probe_bind(port: u16) -> io::Result<u16> {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, port))?;
    let port = listener.local_addr()?.port();
    drop(listener);
    Ok(port)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_free_port_keeps_preference() {
        // Find a port that is currently free, then ask for it
        let free = probe_bind(0).unwrap();
        let binding = allocate(free).unwrap();
        assert_eq!(binding.requested, free);
        assert_eq!(binding.port, free);
        assert!(!binding.is_fallback());
    }

    #[test]
    fn test_allocate_occupied_port_falls_back() {
        // Hold a listener open so the preferred port is genuinely taken
        let holder = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let taken = holder.local_addr().unwrap().port();

        let binding = allocate(taken).unwrap();
        assert_eq!(binding.requested, taken);
        assert_ne!(binding.port, taken);
        assert!(binding.is_fallback());

        // The fallback port must itself be bindable right now
        let reuse = TcpListener::bind((Ipv4Addr::LOCALHOST, binding.port));
        assert!(reuse.is_ok());
    }

    #[test]
    fn test_allocate_is_repeatable() {
        for _ in 0..5 {
            let binding = allocate(0).unwrap();
            assert_ne!(binding.port, 0);
        }
    }
}
