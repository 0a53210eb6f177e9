//! In-process message bus
//!
//! One unbounded channel per destination, drained by a dedicated dispatcher
//! task that hands messages to the destination's handler one at a time. This
//! gives FIFO delivery per destination and no ordering across destinations.

use async_trait::async_trait;
use conductor_domain::{AgentId, AgentMessage};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, trace};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BusError {
    #[error("No subscriber registered for {0}")]
    NoSubscriber(AgentId),

    #[error("Channel for {0} is closed")]
    Closed(AgentId),
}

/// Receives messages addressed to one bus endpoint.
///
/// Calls for the same endpoint are sequential; a handler that needs
/// concurrency spawns its own tasks. Handlers must tolerate re-delivery.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn on_message(&self, message: AgentMessage);
}

type HandlerSlot = Arc<RwLock<Arc<dyn MessageHandler>>>;

struct Channel {
    sender: mpsc::UnboundedSender<AgentMessage>,
    handler: HandlerSlot,
}

/// Cheaply cloneable handle to the bus.
#[derive(Clone, Default)]
pub struct MessageBus {
    channels: Arc<RwLock<HashMap<AgentId, Channel>>>,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `agent_id`, replacing any previous handler.
    ///
    /// Messages already queued for the endpoint are delivered to the new
    /// handler. Must be called within a tokio runtime.
    pub async fn subscribe(&self, agent_id: AgentId, handler: Arc<dyn MessageHandler>) {
        let mut channels = self.channels.write().await;
        if let Some(channel) = channels.get(&agent_id)
            && !channel.sender.is_closed()
        {
            *channel.handler.write().await = handler;
            debug!(agent_id = %agent_id, "Replaced bus subscriber");
            return;
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        let slot: HandlerSlot = Arc::new(RwLock::new(handler));
        tokio::spawn(dispatch(agent_id.clone(), receiver, Arc::clone(&slot)));
        debug!(agent_id = %agent_id, "Subscribed to bus");
        channels.insert(
            agent_id,
            Channel {
                sender,
                handler: slot,
            },
        );
    }

    /// Removes the endpoint. Messages already queued are still delivered.
    pub async fn unsubscribe(&self, agent_id: &AgentId) -> bool {
        let removed = self.channels.write().await.remove(agent_id).is_some();
        if removed {
            debug!(agent_id = %agent_id, "Unsubscribed from bus");
        }
        removed
    }

    /// Queues `message` for `message.to()`.
    pub async fn publish(&self, message: AgentMessage) -> Result<(), BusError> {
        let channels = self.channels.read().await;
        let to = message.to().clone();
        let channel = channels
            .get(&to)
            .ok_or_else(|| BusError::NoSubscriber(to.clone()))?;
        trace!(message = %message, "Publishing");
        channel.sender.send(message).map_err(|_| BusError::Closed(to))
    }

    pub async fn is_subscribed(&self, agent_id: &AgentId) -> bool {
        self.channels.read().await.contains_key(agent_id)
    }

    /// Subscribed endpoints, sorted.
    pub async fn subscribers(&self) -> Vec<AgentId> {
        let mut ids: Vec<AgentId> = self.channels.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}

async fn dispatch(
    agent_id: AgentId,
    mut receiver: mpsc::UnboundedReceiver<AgentMessage>,
    slot: HandlerSlot,
) {
    while let Some(message) = receiver.recv().await {
        let handler = Arc::clone(&*slot.read().await);
        handler.on_message(message).await;
    }
    trace!(agent_id = %agent_id, "Dispatcher stopped");
}
