//! Broadcast loop
//!
//! Walks the working set strictly in order: render the template, verify the
//! recipient is reachable, send, then pause for a randomized interval
//! before the next recipient. A failure for one recipient never aborts the
//! run.

use crate::contacts::{normalize_number, Contact};
use crate::delay::{next_delay, DelayBound};
use crate::session::Session;
use chrono::{DateTime, Utc};
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// The only substitution token the template supports
pub const NAME_TOKEN: &str = "${name}";

/// Substitute every `${name}` in the template. Anything else is left verbatim.
pub fn render_message(template: &str, name: &str) -> String {
    template.replace(NAME_TOKEN, name)
}

/// Which slice of the contact list a run processes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// First contact only
    Test,
    /// Entire list
    Full,
}

/// Cooperative stop signal, checked between recipients and before each pause
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Result of one delivery attempt; immutable once recorded
#[derive(Debug, Clone)]
pub struct DeliveryOutcome {
    pub contact: Contact,
    pub succeeded: bool,
    pub error_detail: Option<String>,
    pub attempted_at: DateTime<Utc>,
}

/// Aggregate counts folded over the outcome sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn from_outcomes(outcomes: &[DeliveryOutcome]) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.succeeded).count();
        Self {
            attempted: outcomes.len(),
            succeeded,
            failed: outcomes.len() - succeeded,
        }
    }
}

/// Sequential delivery of one template to a contact list
pub struct BroadcastController {
    template: String,
    bound: DelayBound,
    mode: Mode,
}

impl BroadcastController {
    pub fn new(template: String, bound: DelayBound, mode: Mode) -> Self {
        Self {
            template,
            bound,
            mode,
        }
    }

    /// The subset of contacts this run processes, selected once up front
    pub fn working_set<'a>(&self, contacts: &'a [Contact]) -> &'a [Contact] {
        match self.mode {
            Mode::Full => contacts,
            Mode::Test => &contacts[..contacts.len().min(1)],
        }
    }

    /// Run the broadcast. Delivery failures are folded into the outcomes;
    /// cancellation stops the loop between recipients and the summary
    /// covers whatever was attempted.
    pub fn run<R: Rng>(
        &self,
        session: &Session,
        contacts: &[Contact],
        rng: &mut R,
        cancel: &CancelToken,
        sleep: &mut dyn FnMut(Duration),
    ) -> (RunSummary, Vec<DeliveryOutcome>) {
        let working = self.working_set(contacts);
        let mut outcomes = Vec::with_capacity(working.len());

        for (i, contact) in working.iter().enumerate() {
            if cancel.is_cancelled() {
                warn!(
                    "Broadcast cancelled after {} of {} recipients",
                    i,
                    working.len()
                );
                break;
            }

            let body = render_message(&self.template, &contact.name);
            let outcome = deliver(session, contact, &body);

            if outcome.succeeded {
                info!(
                    "[{}/{}] Sent to {} ({})",
                    i + 1,
                    working.len(),
                    contact.name,
                    contact.number
                );
            } else {
                warn!(
                    "[{}/{}] Failed for {} ({}): {}",
                    i + 1,
                    working.len(),
                    contact.name,
                    contact.number,
                    outcome.error_detail.as_deref().unwrap_or("unknown")
                );
            }
            outcomes.push(outcome);

            // No trailing delay after the last recipient
            if i + 1 < working.len() && !cancel.is_cancelled() {
                let pause = next_delay(self.bound, rng);
                info!("Waiting {}s before next message", pause.as_secs());
                sleep(pause);
            }
        }

        (RunSummary::from_outcomes(&outcomes), outcomes)
    }
}

/// One delivery attempt. Failures become the outcome, never an error.
fn deliver(session: &Session, contact: &Contact, body: &str) -> DeliveryOutcome {
    let attempted_at = Utc::now();
    let address = normalize_number(&contact.number);
    debug!("Attempting to send to {}", address);

    let result = match session.is_registered(&address) {
        Err(e) => Err(format!("reachability check failed: {}", e)),
        Ok(reply) if !reply.registered => Err("not registered".to_string()),
        Ok(reply) => {
            // Deliver to the canonical address the backend vouched for
            let verified = reply.verified_address.unwrap_or(address);
            session
                .send_text(&verified, body)
                .map_err(|e| format!("send failed: {}", e))
        }
    };

    match result {
        Ok(()) => DeliveryOutcome {
            contact: contact.clone(),
            succeeded: true,
            error_detail: None,
            attempted_at,
        },
        Err(detail) => DeliveryOutcome {
            contact: contact.clone(),
            succeeded: false,
            error_detail: Some(detail),
            attempted_at,
        },
    }
}
