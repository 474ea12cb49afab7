use thiserror::Error;
use tracing::{debug, warn};

use crate::models::message::{Destination, Envelope, EnvelopeError, Outbound};
use crate::services::delivery::{deliver, fan_out, FanOutReport};
use crate::services::metrics::metrics;
use crate::services::session_registry::SessionRegistry;

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("Invalid message format: {0}")]
    InvalidMessage(#[from] EnvelopeError),
}

/// Decides who receives each inbound chat frame.
#[derive(Clone)]
pub struct Router {
    sessions: SessionRegistry,
}

impl Router {
    pub fn new(sessions: SessionRegistry) -> Self {
        Self { sessions }
    }

    /// Decode and route one text frame from `sender`. A frame that does not
    /// decode is dropped with no deliveries.
    pub fn handle_frame(&self, sender: &str, frame: &str) -> Result<FanOutReport, RouterError> {
        metrics().increment_messages();
        let envelope = Envelope::decode(frame).inspect_err(|err| {
            metrics().increment_parse_errors();
            warn!("Error parsing message from {}: {}", sender, err);
        })?;
        Ok(self.route(sender, &envelope))
    }

    pub fn route(&self, sender: &str, envelope: &Envelope) -> FanOutReport {
        let content = envelope.content.as_str();
        match envelope.destination() {
            Destination::Broadcast => self
                .sessions
                .broadcast(&Outbound::Broadcast { sender, content }.to_string()),
            Destination::Group(group) => self.send_to_group(sender, group, content),
            Destination::Private(recipient) => self.send_private(sender, recipient, content),
        }
    }

    fn send_to_group(&self, sender: &str, group: &str, content: &str) -> FanOutReport {
        let message = Outbound::Group {
            sender,
            group,
            content,
        }
        .to_string();
        let members: Vec<_> = self
            .sessions
            .snapshot()
            .into_iter()
            .filter(|session| session.group.as_deref() == Some(group))
            .collect();

        fan_out(
            members
                .iter()
                .map(|session| (session.identity.as_str(), &session.handle)),
            &message,
        )
    }

    fn send_private(&self, sender: &str, recipient: &str, content: &str) -> FanOutReport {
        let Some(handle) = self.sessions.lookup(recipient) else {
            debug!("Dropping private message from {} to offline {}", sender, recipient);
            return FanOutReport::default();
        };

        let message = Outbound::Private { sender, content }.to_string();
        let delivered = deliver(recipient, &handle, &message).is_ok();
        FanOutReport {
            attempted: 1,
            delivered: usize::from(delivered),
            failed: usize::from(!delivered),
        }
    }
}
