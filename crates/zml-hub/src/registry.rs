//! Consumer registry: identity -> live push handle.
//!
//! At most one handle per identity. Each registration gets a fresh
//! [`RegistrationToken`]; a teardown carrying an older token is ignored so
//! a late cleanup cannot evict the handle that replaced it.

use std::collections::BTreeMap;

use tokio::sync::mpsc;
use zml_core::{ConsumerId, PositionEvent};

/// Delivery endpoint of one consumer.
///
/// `push` is fire-and-forget and must not block. A handle that reports
/// `is_live() == false` is treated as absent.
pub trait PushHandle: Send + 'static {
    fn push(&self, event: &PositionEvent);
    fn is_live(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistrationToken(u64);

struct Entry {
    token: RegistrationToken,
    handle: Box<dyn PushHandle>,
}

pub struct ConsumerRegistry {
    entries: BTreeMap<ConsumerId, Entry>,
    next_token: u64,
}

impl Default for ConsumerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsumerRegistry {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_token: 1,
        }
    }

    /// Register `handle` for `identity`, replacing any previous handle.
    pub fn register(
        &mut self,
        identity: ConsumerId,
        handle: Box<dyn PushHandle>,
    ) -> RegistrationToken {
        let token = RegistrationToken(self.next_token);
        self.next_token += 1;
        if self.entries.insert(identity, Entry { token, handle }).is_some() {
            tracing::debug!(identity = %identity, "registry: replaced consumer handle");
        } else {
            tracing::debug!(identity = %identity, "registry: registered consumer");
        }
        token
    }

    /// Remove the registration for `identity` if `token` is still the
    /// current one. Returns whether an entry was removed.
    pub fn unregister(&mut self, identity: ConsumerId, token: RegistrationToken) -> bool {
        match self.entries.get(&identity) {
            Some(entry) if entry.token == token => {
                self.entries.remove(&identity);
                tracing::debug!(identity = %identity, "registry: unregistered consumer");
                true
            }
            _ => false,
        }
    }

    /// Live handle for `identity`. A dead handle is purged and reported absent.
    pub fn lookup(&mut self, identity: ConsumerId) -> Option<&dyn PushHandle> {
        let live = self.entries.get(&identity)?.handle.is_live();
        if !live {
            self.entries.remove(&identity);
            tracing::debug!(identity = %identity, "registry: purged dead consumer");
            return None;
        }
        self.entries.get(&identity).map(|e| e.handle.as_ref())
    }

    /// All live handles in identity order. Dead handles are purged.
    pub fn list_active(&mut self) -> Vec<(ConsumerId, &dyn PushHandle)> {
        self.entries.retain(|identity, entry| {
            let live = entry.handle.is_live();
            if !live {
                tracing::debug!(identity = %identity, "registry: purged dead consumer");
            }
            live
        });
        self.entries
            .iter()
            .map(|(identity, entry)| (*identity, entry.handle.as_ref()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ─── In-process handle ────────────────────────────────────────────

/// Push handle over a bounded channel. A full queue drops the push; a
/// dropped receiver makes the handle dead.
#[derive(Debug, Clone)]
pub struct ChannelPushHandle {
    tx: mpsc::Sender<PositionEvent>,
}

impl ChannelPushHandle {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<PositionEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl PushHandle for ChannelPushHandle {
    fn push(&self, event: &PositionEvent) {
        if let Err(mpsc::error::TrySendError::Full(_)) = self.tx.try_send(event.clone()) {
            tracing::trace!(sequence = event.sequence, "push handle: queue full, dropped event");
        }
    }

    fn is_live(&self) -> bool {
        !self.tx.is_closed()
    }
}
