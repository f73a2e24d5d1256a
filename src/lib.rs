//! WhatsApp Broadcast - bulk message sender
//!
//! Authenticates a session against an external messaging client (pairing via
//! a scannable code on first run), verifies each recipient is reachable, and
//! delivers a personalized template sequentially with a randomized delay
//! between sends.

pub mod backend;
pub mod broadcast;
pub mod config;
pub mod contacts;
pub mod delay;
pub mod error;
pub mod session;

pub use error::{Error, Result};
