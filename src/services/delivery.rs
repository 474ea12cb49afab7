use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::warn;
use uuid::Uuid;

use crate::services::metrics::metrics;

pub type OutboundFrame = String;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("session closed")]
    Closed,

    #[error("outbound queue full")]
    Backpressure,
}

/// Outbound side of one connection. Equality is by connection id, so two
/// connections for the same username never compare equal.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: Uuid,
    tx: mpsc::Sender<OutboundFrame>,
}

impl SessionHandle {
    /// Create a handle with a bounded outbound queue. The receiver is drained
    /// by the connection's writer task.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<OutboundFrame>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = Self {
            id: Uuid::new_v4(),
            tx,
        };
        (handle, rx)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Queue a frame without waiting. The socket write completes later on
    /// the writer task; a full or closed queue fails immediately.
    pub fn send(&self, message: &str) -> Result<(), DeliveryError> {
        self.tx
            .try_send(message.to_owned())
            .map_err(|err| match err {
                TrySendError::Full(_) => DeliveryError::Backpressure,
                TrySendError::Closed(_) => DeliveryError::Closed,
            })
    }
}

impl PartialEq for SessionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SessionHandle {}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanOutReport {
    pub attempted: usize,
    pub delivered: usize,
    pub failed: usize,
}

/// Best-effort send to one recipient. Failures are logged and counted, never
/// retried.
pub fn deliver(
    recipient: &str,
    handle: &SessionHandle,
    message: &str,
) -> Result<(), DeliveryError> {
    handle.send(message).inspect_err(|err| {
        metrics().increment_delivery_failures();
        warn!("Unable to send message to {}: {}", recipient, err);
    })
}

/// Deliver `message` to every recipient independently; one failure does not
/// stop the rest.
pub fn fan_out<'a, I>(recipients: I, message: &str) -> FanOutReport
where
    I: IntoIterator<Item = (&'a str, &'a SessionHandle)>,
{
    let mut report = FanOutReport::default();
    for (recipient, handle) in recipients {
        report.attempted += 1;
        match deliver(recipient, handle, message) {
            Ok(()) => report.delivered += 1,
            Err(_) => report.failed += 1,
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_queues_frame_for_writer() {
        let (handle, mut rx) = SessionHandle::channel(4);
        handle.send("hello").unwrap();
        assert_eq!(rx.recv().await.as_deref(), Some("hello"));
    }

    #[test]
    fn send_reports_closed_and_full_queues() {
        let (handle, rx) = SessionHandle::channel(1);
        handle.send("first").unwrap();
        assert_eq!(handle.send("second"), Err(DeliveryError::Backpressure));

        drop(rx);
        assert!(handle.is_closed());
        assert_eq!(handle.send("third"), Err(DeliveryError::Closed));
    }

    #[test]
    fn handles_compare_by_connection_id() {
        let (a, _rx_a) = SessionHandle::channel(1);
        let (b, _rx_b) = SessionHandle::channel(1);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn fan_out_isolates_failed_recipient() {
        let (a, mut rx_a) = SessionHandle::channel(4);
        let (b, rx_b) = SessionHandle::channel(4);
        let (c, mut rx_c) = SessionHandle::channel(4);
        drop(rx_b);

        let report = fan_out([("a", &a), ("b", &b), ("c", &c)], "x");

        assert_eq!(
            report,
            FanOutReport {
                attempted: 3,
                delivered: 2,
                failed: 1
            }
        );
        assert_eq!(rx_a.recv().await.as_deref(), Some("x"));
        assert_eq!(rx_c.recv().await.as_deref(), Some("x"));
    }
}
