//! Session bootstrap
//!
//! Drives the backend through connect, an optional pairing handshake, and a
//! bounded wait for the connection-established event. Sends are only
//! possible through the [`Session`] handle this produces, and the handle
//! disconnects the backend exactly once when it goes out of scope.

use crate::backend::{BackendEvent, MessagingBackend, Reachability};
use crate::config::CONNECT_TIMEOUT_SECS;
use crate::error::{Error, Result};
use std::sync::mpsc::RecvTimeoutError;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Bootstrap progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Connecting,
    AwaitingPairing,
    Paired,
    ConnectionWait,
    Ready,
    Failed,
}

/// Drives a backend to a ready session, or to a definitive failure
pub struct SessionAuthenticator {
    state: SessionState,
    connect_timeout: Duration,
}

impl Default for SessionAuthenticator {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionAuthenticator {
    pub fn new() -> Self {
        Self {
            state: SessionState::Unauthenticated,
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
        }
    }

    /// Override the connection-established timeout (default 10 s)
    pub fn with_timeout(connect_timeout: Duration) -> Self {
        Self {
            state: SessionState::Unauthenticated,
            connect_timeout,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Run the bootstrap to completion.
    ///
    /// Pairing codes are surfaced through `on_pairing_code` as they arrive;
    /// the pairing wait ends when the backend reports `Paired` or its event
    /// stream closes. On every failure path the backend is disconnected
    /// before the error is returned.
    pub fn authenticate(
        &mut self,
        mut backend: Box<dyn MessagingBackend>,
        mut on_pairing_code: impl FnMut(&str),
    ) -> Result<Session> {
        let needs_pairing = !backend.has_credentials();

        self.state = SessionState::Connecting;
        if let Err(e) = backend.connect() {
            return Err(self.fail(backend, e));
        }
        let events = backend.events();

        if needs_pairing {
            self.state = SessionState::AwaitingPairing;
            info!("No stored credentials, starting pairing");

            loop {
                match events.recv() {
                    Ok(BackendEvent::PairingCode(code)) => on_pairing_code(&code),
                    Ok(BackendEvent::Paired) => {
                        self.state = SessionState::Paired;
                        info!("Pairing complete, credentials stored by backend");
                        break;
                    }
                    Ok(BackendEvent::Connected) => {
                        // The transport cannot be connected unpaired, so this
                        // satisfies both waits.
                        self.state = SessionState::Ready;
                        info!("Connection established");
                        return Ok(Session::new(backend));
                    }
                    Err(_) => return Err(self.fail(backend, Error::PairingAbandoned)),
                }
            }
        } else {
            debug!("Stored credentials found, skipping pairing");
        }

        self.state = SessionState::ConnectionWait;
        let deadline = Instant::now() + self.connect_timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(self.fail(backend, Error::ConnectionTimeout));
            }

            match events.recv_timeout(remaining) {
                Ok(BackendEvent::Connected) => {
                    self.state = SessionState::Ready;
                    info!("Connection established");
                    return Ok(Session::new(backend));
                }
                // Stray pairing events after the handshake are harmless
                Ok(_) => continue,
                Err(RecvTimeoutError::Timeout) => {
                    return Err(self.fail(backend, Error::ConnectionTimeout));
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(self.fail(
                        backend,
                        Error::Backend("event stream closed before connection established".to_string()),
                    ));
                }
            }
        }
    }

    fn fail(&mut self, mut backend: Box<dyn MessagingBackend>, err: Error) -> Error {
        backend.disconnect();
        self.state = SessionState::Failed;
        err
    }
}

/// An authenticated, ready-to-send session.
///
/// Owns the backend for the rest of the run; dropping the session
/// disconnects it, on every exit path.
pub struct Session {
    backend: Box<dyn MessagingBackend>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}

impl Session {
    fn new(backend: Box<dyn MessagingBackend>) -> Self {
        Self { backend }
    }

    pub fn is_registered(&self, address: &str) -> Result<Reachability> {
        self.backend.is_registered(address)
    }

    pub fn send_text(&self, address: &str, body: &str) -> Result<()> {
        self.backend.send_text(address, body)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        debug!("Releasing session");
        self.backend.disconnect();
    }
}
