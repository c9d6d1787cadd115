//! In-process message broker.
//!
//! Topics are created on first use. Each topic holds its consumer groups (members
//! served round-robin, skipping closed members) and its ungrouped fan-out
//! subscribers. Messages published to a topic with no live subscriber are retained
//! and handed to whoever subscribes first.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use tokio::sync::mpsc;

use crate::bus::{BusError, MessageBus, Subscription};

type Member = mpsc::UnboundedSender<Bytes>;

#[derive(Default)]
struct ConsumerGroup {
    members: Vec<Member>,
    next: usize,
}

impl ConsumerGroup {
    /// Hand `msg` to the next open member. Closed members are evicted on the way.
    fn deliver(&mut self, mut msg: Bytes) -> Result<(), Bytes> {
        while !self.members.is_empty() {
            let index = self.next % self.members.len();
            match self.members[index].send(msg) {
                Ok(()) => {
                    self.next = index + 1;
                    return Ok(());
                }
                Err(mpsc::error::SendError(returned)) => {
                    self.members.remove(index);
                    msg = returned;
                }
            }
        }
        Err(msg)
    }
}

#[derive(Default)]
struct TopicState {
    groups: HashMap<String, ConsumerGroup>,
    fanout: Vec<Member>,
    backlog: VecDeque<Bytes>,
}

impl TopicState {
    fn publish(&mut self, msg: Bytes) {
        let mut delivered = false;

        for group in self.groups.values_mut() {
            if group.deliver(msg.clone()).is_ok() {
                delivered = true;
            }
        }
        self.groups.retain(|_, g| !g.members.is_empty());

        self.fanout.retain(|tx| tx.send(msg.clone()).is_ok());
        delivered |= !self.fanout.is_empty();

        if !delivered {
            self.backlog.push_back(msg);
        }
    }
}

/// Broker living inside the process. Cloning shares the same topics.
#[derive(Clone, Default)]
pub struct MemoryBus {
    topics: Arc<DashMap<String, TopicState>>,
    offline: Arc<AtomicBool>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the broker going away (or coming back).
    pub fn set_available(&self, available: bool) {
        self.offline.store(!available, Ordering::SeqCst);
    }

    /// Messages retained on `topic` waiting for a first subscriber.
    pub fn backlog_len(&self, topic: &str) -> usize {
        self.topics.get(topic).map(|t| t.backlog.len()).unwrap_or(0)
    }

    fn check_available(&self) -> Result<(), BusError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(BusError::Unavailable("memory bus is offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl MessageBus for MemoryBus {
    async fn publish(&self, topic: &str, payload: Bytes) -> Result<(), BusError> {
        self.check_available()?;
        self.topics.entry(topic.to_string()).or_default().publish(payload);
        Ok(())
    }

    async fn subscribe(&self, topic: &str, group: Option<&str>) -> Result<Subscription, BusError> {
        self.check_available()?;
        let (tx, rx) = mpsc::unbounded_channel();

        let mut state = self.topics.entry(topic.to_string()).or_default();
        for msg in state.backlog.drain(..) {
            let _ = tx.send(msg);
        }
        match group {
            Some(name) => state.groups.entry(name.to_string()).or_default().members.push(tx),
            None => state.fanout.push(tx),
        }

        tracing::debug!(topic = %topic, group = ?group, "Subscribed");
        Ok(Subscription::new(topic, rx))
    }
}
