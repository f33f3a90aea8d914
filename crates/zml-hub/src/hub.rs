//! Control context: the only owner of the store and the registry.
//!
//! Stream notifications and consumer commands are applied one at a time
//! on a single task, so neither the store nor the registry needs a lock.

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use zml_core::{CanonicalSnapshot, ConnectionStatus, ConsumerId, PositionEvent};
use zml_stream::{StreamEvents, StreamNotification};

use crate::error::HubError;
use crate::fanout::{Fanout, RoutingMode};
use crate::registry::{ConsumerRegistry, PushHandle, RegistrationToken};
use crate::snapshot;
use crate::store::StateStore;

/// Default capacity of the command channel.
const COMMAND_CHANNEL_CAPACITY: usize = 64;

pub struct Hub {
    store: StateStore,
    registry: ConsumerRegistry,
    fanout: Fanout,
}

impl Hub {
    pub fn new(routing: RoutingMode) -> Self {
        Self {
            store: StateStore::new(),
            registry: ConsumerRegistry::new(),
            fanout: Fanout::new(routing),
        }
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn registry(&self) -> &ConsumerRegistry {
        &self.registry
    }

    pub fn on_status(&mut self, status: ConnectionStatus, error: Option<String>) {
        match &error {
            Some(e) => tracing::info!(status = %status, error = %e, "hub: agent status changed"),
            None => tracing::info!(status = %status, "hub: agent status changed"),
        }
        self.store.update_agent_status(status, error);
        self.store.set_streaming_flag(status == ConnectionStatus::Connected);
    }

    pub fn on_event(&mut self, event: &PositionEvent) -> usize {
        self.fanout.distribute(event, &mut self.store, &mut self.registry)
    }

    pub fn on_notification(&mut self, notification: StreamNotification) {
        match notification {
            StreamNotification::Status { status, error, .. } => self.on_status(status, error),
            StreamNotification::Event { event, .. } => {
                self.on_event(&event);
            }
        }
    }

    pub fn register(
        &mut self,
        identity: ConsumerId,
        handle: Box<dyn PushHandle>,
    ) -> RegistrationToken {
        self.registry.register(identity, handle)
    }

    pub fn unregister(&mut self, identity: ConsumerId, token: RegistrationToken) -> bool {
        self.registry.unregister(identity, token)
    }

    pub fn get_snapshot(&self, identity: &str) -> Result<CanonicalSnapshot, HubError> {
        snapshot::get_snapshot(&self.store, identity)
    }

    pub fn handle_command(&mut self, command: HubCommand) {
        // A dropped reply receiver means the caller gave up; nothing to do.
        match command {
            HubCommand::Register {
                identity,
                handle,
                reply,
            } => {
                let _ = reply.send(self.register(identity, handle));
            }
            HubCommand::Unregister {
                identity,
                token,
                reply,
            } => {
                let _ = reply.send(self.unregister(identity, token));
            }
            HubCommand::GetSnapshot { identity, reply } => {
                let _ = reply.send(self.get_snapshot(&identity));
            }
        }
    }

    /// Run the control loop until `cancel` fires or every input is closed.
    ///
    /// The loop keeps serving commands after the stream ends so the last
    /// known snapshot stays readable.
    pub async fn run(
        mut self,
        mut events: StreamEvents,
        mut commands: mpsc::Receiver<HubCommand>,
        cancel: CancellationToken,
    ) -> Self {
        tracing::info!(routing = %self.fanout.mode(), "hub: started");
        let mut stream_open = true;
        let mut commands_open = true;

        while stream_open || commands_open {
            if cancel.is_cancelled() {
                break;
            }
            // Unbiased so a notification burst cannot starve commands.
            tokio::select! {
                _ = cancel.cancelled() => break,
                notification = events.recv(), if stream_open => match notification {
                    Some(n) => self.on_notification(n),
                    None => {
                        tracing::debug!("hub: stream notifications ended");
                        stream_open = false;
                    }
                },
                command = commands.recv(), if commands_open => match command {
                    Some(c) => self.handle_command(c),
                    None => commands_open = false,
                },
            }
        }

        tracing::info!("hub: stopped");
        self
    }
}

// ─── Commands ─────────────────────────────────────────────────────

/// Requests marshalled onto the control task.
pub enum HubCommand {
    Register {
        identity: ConsumerId,
        handle: Box<dyn PushHandle>,
        reply: oneshot::Sender<RegistrationToken>,
    },
    Unregister {
        identity: ConsumerId,
        token: RegistrationToken,
        reply: oneshot::Sender<bool>,
    },
    GetSnapshot {
        identity: String,
        reply: oneshot::Sender<Result<CanonicalSnapshot, HubError>>,
    },
}

/// Cloneable client of a running [`Hub`].
#[derive(Clone)]
pub struct HubHandle {
    tx: mpsc::Sender<HubCommand>,
}

pub fn command_channel() -> (HubHandle, mpsc::Receiver<HubCommand>) {
    let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
    (HubHandle { tx }, rx)
}

impl HubHandle {
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> HubCommand,
    ) -> Result<T, HubError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .map_err(|_| HubError::Closed)?;
        rx.await.map_err(|_| HubError::Closed)
    }

    pub async fn register(
        &self,
        identity: ConsumerId,
        handle: impl PushHandle,
    ) -> Result<RegistrationToken, HubError> {
        let handle: Box<dyn PushHandle> = Box::new(handle);
        self.request(|reply| HubCommand::Register {
            identity,
            handle,
            reply,
        })
        .await
    }

    pub async fn unregister(
        &self,
        identity: ConsumerId,
        token: RegistrationToken,
    ) -> Result<bool, HubError> {
        self.request(|reply| HubCommand::Unregister {
            identity,
            token,
            reply,
        })
        .await
    }

    pub async fn get_snapshot(&self, identity: &str) -> Result<CanonicalSnapshot, HubError> {
        let identity = identity.to_string();
        self.request(|reply| HubCommand::GetSnapshot { identity, reply })
            .await?
    }
}
