use std::collections::BTreeSet;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::models::message::Outbound;
use crate::services::delivery::{fan_out, FanOutReport, OutboundFrame, SessionHandle};
use crate::services::metrics::metrics;

pub const DEFAULT_OUTBOUND_BUFFER: usize = 256;

#[derive(Debug, Clone)]
struct SessionEntry {
    handle: SessionHandle,
    group: Option<String>,
}

/// Point-in-time copy of one registry entry.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub identity: String,
    pub handle: SessionHandle,
    pub group: Option<String>,
}

/// Handle plus the receiving half the transport's writer drains.
pub struct Registration {
    pub handle: SessionHandle,
    pub receiver: mpsc::Receiver<OutboundFrame>,
}

/// Connected participants keyed by username.
///
/// Backed by a sharded map: point operations lock one shard, and snapshots
/// are cloned out before any delivery so no shard lock is held across a send.
#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<DashMap<String, SessionEntry>>,
    outbound_buffer: usize,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::with_outbound_buffer(DEFAULT_OUTBOUND_BUFFER)
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_outbound_buffer(outbound_buffer: usize) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            outbound_buffer: outbound_buffer.max(1),
        }
    }

    /// Create a handle with this registry's queue capacity and connect it.
    pub fn register(&self, identity: &str, group: Option<String>) -> Registration {
        let (handle, receiver) = SessionHandle::channel(self.outbound_buffer);
        self.connect_in_group(identity, handle.clone(), group);
        Registration { handle, receiver }
    }

    pub fn connect(&self, identity: &str, handle: SessionHandle) -> Option<SessionHandle> {
        self.connect_in_group(identity, handle, None)
    }

    /// Announce the arrival to everyone already present, then insert. Returns
    /// the superseded handle when `identity` was already connected.
    pub fn connect_in_group(
        &self,
        identity: &str,
        handle: SessionHandle,
        group: Option<String>,
    ) -> Option<SessionHandle> {
        self.broadcast(&Outbound::Joined { username: identity }.to_string());

        let previous = self
            .inner
            .insert(identity.to_string(), SessionEntry { handle, group })
            .map(|entry| entry.handle);

        match &previous {
            Some(old) => info!("{} reconnected, superseding connection {}", identity, old.id()),
            None => metrics().increment_connections(),
        }
        info!("{} connected", identity);
        previous
    }

    /// Remove `identity` only while it is still bound to `handle`, so a late
    /// close from a superseded connection leaves the newer one in place.
    pub fn disconnect(&self, identity: &str, handle: &SessionHandle) -> bool {
        let removed = self
            .inner
            .remove_if(identity, |_, entry| entry.handle == *handle)
            .is_some();

        if removed {
            metrics().decrement_connections();
            info!("{} disconnected", identity);
            self.broadcast(&Outbound::Left { username: identity }.to_string());
        }
        removed
    }

    /// Remove `identity` regardless of which connection currently holds it.
    pub fn disconnect_on_error(&self, identity: &str, cause: &str) -> bool {
        error!("Session error for {}: {}", identity, cause);

        let removed = self.inner.remove(identity).is_some();
        if removed {
            metrics().decrement_connections();
            self.broadcast(
                &Outbound::LeftOnError {
                    username: identity,
                    cause,
                }
                .to_string(),
            );
        }
        removed
    }

    pub fn lookup(&self, identity: &str) -> Option<SessionHandle> {
        self.inner.get(identity).map(|entry| entry.handle.clone())
    }

    pub fn snapshot(&self) -> Vec<SessionSnapshot> {
        self.inner
            .iter()
            .map(|entry| SessionSnapshot {
                identity: entry.key().clone(),
                handle: entry.handle.clone(),
                group: entry.group.clone(),
            })
            .collect()
    }

    /// Set or clear the group attribute out of band.
    pub fn set_group(&self, identity: &str, group: Option<String>) -> bool {
        match self.inner.get_mut(identity) {
            Some(mut entry) => {
                entry.group = group;
                true
            }
            None => false,
        }
    }

    pub fn group_of(&self, identity: &str) -> Option<String> {
        self.inner.get(identity).and_then(|entry| entry.group.clone())
    }

    pub fn broadcast(&self, message: &str) -> FanOutReport {
        let sessions = self.snapshot();
        fan_out(
            sessions
                .iter()
                .map(|session| (session.identity.as_str(), &session.handle)),
            message,
        )
    }

    pub fn active_count(&self) -> usize {
        self.inner.len()
    }

    pub fn participants(&self) -> Vec<String> {
        let mut participants: Vec<String> =
            self.inner.iter().map(|entry| entry.key().clone()).collect();
        participants.sort();
        participants
    }

    pub fn groups(&self) -> Vec<String> {
        self.inner
            .iter()
            .filter_map(|entry| entry.group.clone())
            .filter(|group| !group.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}
