//! Notifications emitted on committed state changes.
//!
//! Events are delivered synchronously, in commit order, to every subscribed
//! observer. The engine keeps no event log of its own.

use std::sync::Arc;

use parking_lot::RwLock;
use quadvote_types::{Address, Credits, Timestamp, VotingPower};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::proposal::VoteSupport;

/// A committed governance state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GovernanceEvent {
    ProposalCreated {
        proposal_id: u64,
        creator: Address,
        expires_at: Timestamp,
    },
    VoteCast {
        proposal_id: u64,
        voter: Address,
        support: VoteSupport,
        power: VotingPower,
        credits: Credits,
    },
}

/// Receiver of governance events.
///
/// Called while the engine holds its write lock: implementations must not
/// call back into the engine.
pub trait EventObserver: Send + Sync {
    fn on_event(&self, event: &GovernanceEvent);
}

/// Forwards events into an unbounded tokio channel for async consumers.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    sender: mpsc::UnboundedSender<GovernanceEvent>,
}

impl ChannelObserver {
    pub fn new(sender: mpsc::UnboundedSender<GovernanceEvent>) -> Self {
        Self { sender }
    }

    /// Create an observer together with the receiving end of its channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<GovernanceEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(sender), receiver)
    }
}

impl EventObserver for ChannelObserver {
    fn on_event(&self, event: &GovernanceEvent) {
        // A dropped receiver only means nobody is listening any more.
        if self.sender.send(event.clone()).is_err() {
            tracing::trace!("Event receiver dropped");
        }
    }
}

/// Fan-out list of observers.
#[derive(Default)]
pub(crate) struct EventBus {
    observers: RwLock<Vec<Arc<dyn EventObserver>>>,
}

impl EventBus {
    pub(crate) fn subscribe(&self, observer: Arc<dyn EventObserver>) {
        self.observers.write().push(observer);
    }

    pub(crate) fn emit(&self, event: GovernanceEvent) {
        for observer in self.observers.read().iter() {
            observer.on_event(&event);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.observers.read().len()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("observers", &self.len())
            .finish()
    }
}
