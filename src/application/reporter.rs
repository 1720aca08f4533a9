//! Progress reporter: ordered, multi-subscriber event stream for one job

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use tokio::sync::broadcast;

use crate::domain::job::ProgressEvent;

/// Live event channel capacity. A subscriber that falls this far behind
/// starts losing the oldest events (`RecvError::Lagged`) instead of
/// blocking publication; status is idempotent and superseded by the
/// next event anyway.
const CHANNEL_CAPACITY: usize = 64;

/// What a new subscriber receives: a bounded replay of recent events so
/// it can render current status immediately, plus the live channel.
pub struct Subscription {
    pub replay: Vec<ProgressEvent>,
    pub receiver: broadcast::Receiver<ProgressEvent>,
}

/// Ordered event distribution for a single job's lifetime.
///
/// Publication never blocks on subscribers. Events are delivered to each
/// subscriber in publication order, at most once each; the replay ring
/// and the channel cursor are handed out under one lock so a late
/// subscriber neither misses nor double-sees an event.
pub struct ProgressReporter {
    tx: broadcast::Sender<ProgressEvent>,
    replay: Mutex<VecDeque<ProgressEvent>>,
    replay_capacity: usize,
}

impl ProgressReporter {
    pub fn new(replay_capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            replay: Mutex::new(VecDeque::with_capacity(replay_capacity.max(1))),
            replay_capacity: replay_capacity.max(1),
        }
    }

    /// Append an event to the stream and fan it out to subscribers.
    pub fn publish(&self, event: ProgressEvent) {
        let mut ring = self.replay.lock().unwrap_or_else(PoisonError::into_inner);
        if ring.len() == self.replay_capacity {
            ring.pop_front();
        }
        ring.push_back(event.clone());
        // No receivers is fine; the replay ring still records the event.
        let _ = self.tx.send(event);
    }

    /// Attach a subscriber, returning recent history plus the live feed.
    pub fn subscribe(&self) -> Subscription {
        let ring = self.replay.lock().unwrap_or_else(PoisonError::into_inner);
        let receiver = self.tx.subscribe();
        Subscription {
            replay: ring.iter().cloned().collect(),
            receiver,
        }
    }
}
