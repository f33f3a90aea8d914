//! Fanout distributor: store first, then push.

use std::fmt;
use std::str::FromStr;

use zml_core::{ConsumerId, PositionEvent};

use crate::error::HubError;
use crate::registry::ConsumerRegistry;
use crate::store::StateStore;

/// Which consumers receive a position event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoutingMode {
    /// `map` if registered, else `primary`, else nobody.
    #[default]
    Preferred,
    /// Every live registered consumer.
    Broadcast,
}

impl RoutingMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Preferred => "preferred",
            Self::Broadcast => "broadcast",
        }
    }
}

impl fmt::Display for RoutingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoutingMode {
    type Err = HubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "preferred" => Ok(Self::Preferred),
            "broadcast" => Ok(Self::Broadcast),
            _ => Err(HubError::InvalidRouting(s.to_string())),
        }
    }
}

/// Preferred-mode targets, in priority order.
const PREFERRED_ORDER: [ConsumerId; 2] = [ConsumerId::Map, ConsumerId::Primary];

#[derive(Debug, Clone, Copy, Default)]
pub struct Fanout {
    mode: RoutingMode,
}

impl Fanout {
    pub fn new(mode: RoutingMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> RoutingMode {
        self.mode
    }

    /// Record `event` as the last position and push it to the routed
    /// consumers. Returns how many consumers it was pushed to.
    pub fn distribute(
        &self,
        event: &PositionEvent,
        store: &mut StateStore,
        registry: &mut ConsumerRegistry,
    ) -> usize {
        store.update_last_position(event.payload.clone());

        let delivered = match self.mode {
            RoutingMode::Preferred => {
                let mut delivered = 0;
                for id in PREFERRED_ORDER {
                    if let Some(handle) = registry.lookup(id) {
                        handle.push(event);
                        delivered = 1;
                        break;
                    }
                }
                delivered
            }
            RoutingMode::Broadcast => {
                let targets = registry.list_active();
                for (_, handle) in &targets {
                    handle.push(event);
                }
                targets.len()
            }
        };

        tracing::debug!(
            sequence = event.sequence,
            timestamp_ms = event.timestamp_ms,
            x = event.payload.position.x,
            y = event.payload.position.y,
            delivered,
            mode = %self.mode,
            "fanout: distributed position"
        );
        delivered
    }
}
