//! Messaging backend boundary
//!
//! The wire protocol, end-to-end encryption, and credential store live in an
//! external protocol client. This module defines the capability the
//! broadcaster drives, plus the production bridge that shells out to that
//! client the same way the rest of the toolchain drives its helper CLIs.

use crate::config::Config;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, Sender};

/// Events emitted by the backend while a connection is being established
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendEvent {
    /// A pairing code to present to the operator (rendered as a QR code by
    /// the presentation layer, not here).
    PairingCode(String),
    /// Pairing completed; the external store now holds credentials.
    Paired,
    /// The transport connection is fully established.
    Connected,
}

/// Reply from a reachability check for one address
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Reachability {
    pub registered: bool,
    /// Canonical address to deliver to; may differ from the queried one.
    #[serde(default)]
    pub verified_address: Option<String>,
}

/// Opaque messaging client driven by the session authenticator and the
/// broadcast loop. Implemented by the CLI bridge in production and by
/// scripted fakes in tests.
pub trait MessagingBackend {
    /// Whether the external store already holds credentials for this device
    fn has_credentials(&self) -> bool;

    /// Begin connecting. Progress arrives on the stream from [`events`].
    ///
    /// [`events`]: MessagingBackend::events
    fn connect(&mut self) -> Result<()>;

    /// Take the event stream for this connection attempt. The channel closes
    /// when the backend gives up.
    fn events(&mut self) -> Receiver<BackendEvent>;

    fn is_registered(&self, address: &str) -> Result<Reachability>;

    fn send_text(&self, address: &str, body: &str) -> Result<()>;

    fn disconnect(&mut self);
}

/// Production backend: drives the external protocol-client executable.
///
/// `<cli> connect` stays running for the session and reports progress as
/// stdout lines (`code <data>`, `paired`, `connected`); `<cli> check
/// <address>` replies with JSON; `<cli> send <address>` reads the body from
/// stdin. Every invocation gets `--data-dir` pointing at the credential
/// store.
pub struct CliBackend {
    cli: PathBuf,
    data_dir: PathBuf,
    child: Option<Child>,
}

impl CliBackend {
    pub fn new(config: &Config) -> Self {
        Self {
            cli: config.bridge_cli.clone(),
            data_dir: config.data_dir.clone(),
            child: None,
        }
    }

    fn command(&self, subcommand: &str) -> Command {
        let mut cmd = Command::new(&self.cli);
        cmd.arg(subcommand).arg("--data-dir").arg(&self.data_dir);
        cmd
    }
}

impl MessagingBackend for CliBackend {
    fn has_credentials(&self) -> bool {
        self.data_dir.join("session.db").exists()
    }

    fn connect(&mut self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;

        let child = self
            .command("connect")
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::Backend(format!("failed to start {}: {}", self.cli.display(), e)))?;

        self.child = Some(child);
        Ok(())
    }

    fn events(&mut self) -> Receiver<BackendEvent> {
        let (tx, rx) = mpsc::channel();

        if let Some(stdout) = self.child.as_mut().and_then(|c| c.stdout.take()) {
            std::thread::spawn(move || forward_events(stdout, tx));
        }
        // No child or no pipe: the returned channel is already closed, which
        // the authenticator reports as a failed bootstrap.

        rx
    }

    fn is_registered(&self, address: &str) -> Result<Reachability> {
        let output = self
            .command("check")
            .arg(address)
            .output()
            .map_err(|e| Error::Backend(format!("check: {}", e)))?;

        if !output.status.success() {
            return Err(Error::Backend(format!(
                "check failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        let reply: Reachability = serde_json::from_slice(&output.stdout)?;
        Ok(reply)
    }

    fn send_text(&self, address: &str, body: &str) -> Result<()> {
        let mut child = self
            .command("send")
            .arg(address)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::Backend(format!("send: {}", e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(body.as_bytes())
                .map_err(|e| Error::Backend(format!("send: {}", e)))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| Error::Backend(format!("send: {}", e)))?;

        if !output.status.success() {
            return Err(Error::Backend(format!(
                "send failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(())
    }

    fn disconnect(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// Map the connect subprocess's line protocol onto backend events. The
/// channel closes when the subprocess exits or the receiver is dropped.
fn forward_events(stdout: impl Read, tx: Sender<BackendEvent>) {
    let reader = BufReader::new(stdout);

    for line in reader.lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };

        let event = match line.trim() {
            "paired" => BackendEvent::Paired,
            "connected" => BackendEvent::Connected,
            other => match other.split_once(' ') {
                Some(("code", code)) => BackendEvent::PairingCode(code.to_string()),
                _ => continue, // unrecognized chatter
            },
        };

        if tx.send(event).is_err() {
            break;
        }
    }
}
