// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Event Bus Implementation - Pub/Sub for Domain Events
//
// Provides in-memory event streaming using tokio broadcast channels.
// Cycle, trust and install events are fanned out to the CLI and any
// observer tasks. Events are not persisted; the learning ledger and
// trust-state history are the durable record.

use crate::domain::agent::AgentId;
use crate::domain::events::{CycleEvent, InstallEvent, TrustEvent};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Unified domain event type for the event bus
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    Cycle(CycleEvent),
    Trust(TrustEvent),
    Install(InstallEvent),
}

impl DomainEvent {
    /// Agent the event concerns, if any. Install events are layer-scoped.
    pub fn agent_id(&self) -> Option<&AgentId> {
        match self {
            DomainEvent::Cycle(CycleEvent::CycleStarted { agent_id, .. })
            | DomainEvent::Cycle(CycleEvent::CycleCompleted { agent_id, .. })
            | DomainEvent::Cycle(CycleEvent::ActionFailed { agent_id, .. })
            | DomainEvent::Trust(TrustEvent::TrustPromoted { agent_id, .. })
            | DomainEvent::Trust(TrustEvent::TrustDemoted { agent_id, .. }) => Some(agent_id),
            DomainEvent::Install(_) => None,
        }
    }
}

/// Event bus for publishing and subscribing to domain events
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with specified channel capacity.
    /// Capacity determines how many events can be buffered before dropping old ones.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Create event bus with default capacity (1000)
    pub fn with_default_capacity() -> Self {
        Self::new(1000)
    }

    pub fn publish_cycle_event(&self, event: CycleEvent) {
        self.publish(DomainEvent::Cycle(event));
    }

    pub fn publish_trust_event(&self, event: TrustEvent) {
        self.publish(DomainEvent::Trust(event));
    }

    pub fn publish_install_event(&self, event: InstallEvent) {
        self.publish(DomainEvent::Install(event));
    }

    fn publish(&self, event: DomainEvent) {
        debug!("Publishing event: {:?}", event);

        // send() only fails when nobody is subscribed
        let receiver_count = self.sender.send(event).unwrap_or(0);

        if receiver_count == 0 {
            debug!("No subscribers listening to event");
        }
    }

    /// Subscribe to all domain events
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    /// Subscribe to the events of a single agent
    pub fn subscribe_agent(&self, agent_id: AgentId) -> AgentEventReceiver {
        AgentEventReceiver {
            receiver: self.sender.subscribe(),
            agent_id,
        }
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

fn map_recv_error(e: broadcast::error::RecvError) -> EventBusError {
    match e {
        broadcast::error::RecvError::Closed => EventBusError::Closed,
        broadcast::error::RecvError::Lagged(n) => {
            warn!("Event receiver lagged by {} events", n);
            EventBusError::Lagged(n)
        }
    }
}

/// Receiver for all domain events
pub struct EventReceiver {
    receiver: broadcast::Receiver<DomainEvent>,
}

impl EventReceiver {
    /// Receive the next event (waits until one is available)
    pub async fn recv(&mut self) -> Result<DomainEvent, EventBusError> {
        self.receiver.recv().await.map_err(map_recv_error)
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&mut self) -> Result<DomainEvent, EventBusError> {
        self.receiver.try_recv().map_err(|e| match e {
            broadcast::error::TryRecvError::Empty => EventBusError::Empty,
            broadcast::error::TryRecvError::Closed => EventBusError::Closed,
            broadcast::error::TryRecvError::Lagged(n) => {
                warn!("Event receiver lagged by {} events", n);
                EventBusError::Lagged(n)
            }
        })
    }
}

/// Receiver filtered to one agent's cycle and trust events
pub struct AgentEventReceiver {
    receiver: broadcast::Receiver<DomainEvent>,
    agent_id: AgentId,
}

impl AgentEventReceiver {
    pub async fn recv(&mut self) -> Result<DomainEvent, EventBusError> {
        loop {
            let event = self.receiver.recv().await.map_err(map_recv_error)?;
            if event.agent_id() == Some(&self.agent_id) {
                return Ok(event);
            }
        }
    }
}

/// Errors that can occur when receiving events
#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Event bus is closed")]
    Closed,

    #[error("No events available")]
    Empty,

    #[error("Receiver lagged by {0} events (events were dropped)")]
    Lagged(u64),
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::layer::LayerId;
    use crate::domain::trust::TrustLevel;
    use chrono::Utc;

    fn started(agent: &str) -> CycleEvent {
        CycleEvent::CycleStarted {
            agent_id: AgentId::from(agent),
            layer_id: LayerId::from("infra"),
            trust_level: TrustLevel::Recommend,
            started_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_event_bus_publish_subscribe() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe();

        event_bus.publish_cycle_event(started("infra-agent"));

        match receiver.recv().await.unwrap() {
            DomainEvent::Cycle(CycleEvent::CycleStarted { agent_id, .. }) => {
                assert_eq!(agent_id.as_str(), "infra-agent");
            }
            other => panic!("Wrong event type received: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_agent_event_filtering() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe_agent(AgentId::from("pipeline-agent"));

        event_bus.publish_cycle_event(started("infra-agent"));
        event_bus.publish_install_event(InstallEvent::TableCreated {
            layer_id: LayerId::from("core"),
            table: "config".to_string(),
            created_at: Utc::now(),
        });
        event_bus.publish_trust_event(TrustEvent::TrustPromoted {
            agent_id: AgentId::from("pipeline-agent"),
            from: TrustLevel::Observe,
            to: TrustLevel::Recommend,
            reason: "5 positive outcomes".to_string(),
            promoted_at: Utc::now(),
        });

        match receiver.recv().await.unwrap() {
            DomainEvent::Trust(TrustEvent::TrustPromoted { to, .. }) => {
                assert_eq!(to, TrustLevel::Recommend);
            }
            other => panic!("Wrong event type received: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let event_bus = EventBus::new(10);
        let mut receiver1 = event_bus.subscribe();
        let mut receiver2 = event_bus.subscribe();

        assert_eq!(event_bus.subscriber_count(), 2);

        event_bus.publish_cycle_event(started("infra-agent"));

        let _ = receiver1.recv().await.unwrap();
        let _ = receiver2.recv().await.unwrap();
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let json = serde_json::to_value(DomainEvent::Cycle(started("infra-agent"))).unwrap();
        assert_eq!(json["type"], "cycle");
    }
}
