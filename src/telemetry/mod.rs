//! Notification telemetry collector.
//!
//! The collector retains a bounded history of operator notifications and
//! fans them out to live subscribers over a broadcast channel. It implements
//! `Notifier`, so it can be handed straight to the calibration manager.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;

use crate::ports::{Notification, NotificationLevel, Notifier};

/// Snapshot of collector state for CLI reporting.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TelemetrySnapshot {
    pub recent: Vec<Notification>,
    pub total_events: u64,
    pub dropped_events: u64,
    pub error_events: u64,
}

/// Broadcast-based collector retaining a bounded history of notifications.
pub struct TelemetryCollector {
    tx: broadcast::Sender<Notification>,
    history: Mutex<VecDeque<Notification>>,
    history_capacity: usize,
    total_events: AtomicU64,
    dropped_history: AtomicU64,
    error_events: AtomicU64,
}

impl TelemetryCollector {
    pub fn new(buffer: usize, history_capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer.max(1));
        Self {
            tx,
            history: Mutex::new(VecDeque::with_capacity(history_capacity)),
            history_capacity,
            total_events: AtomicU64::new(0),
            dropped_history: AtomicU64::new(0),
            error_events: AtomicU64::new(0),
        }
    }

    pub fn publish(&self, notification: Notification) {
        self.total_events.fetch_add(1, Ordering::Relaxed);
        if notification.level == NotificationLevel::Error {
            self.error_events.fetch_add(1, Ordering::Relaxed);
        }
        {
            let mut history = self.lock_history();
            // Dropped counts evicted entries only
            if history.len() >= self.history_capacity && history.pop_front().is_some() {
                self.dropped_history.fetch_add(1, Ordering::Relaxed);
            }
            if self.history_capacity > 0 {
                history.push_back(notification.clone());
            }
        }

        // No subscribers is fine
        let _ = self.tx.send(notification);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        let history = self.lock_history();
        TelemetrySnapshot {
            recent: history.iter().cloned().collect(),
            total_events: self.total_events.load(Ordering::Relaxed),
            dropped_events: self.dropped_history.load(Ordering::Relaxed),
            error_events: self.error_events.load(Ordering::Relaxed),
        }
    }

    // History is append-only, a poisoned guard still holds consistent data
    fn lock_history(&self) -> MutexGuard<'_, VecDeque<Notification>> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new(64, 32)
    }
}

impl Notifier for TelemetryCollector {
    fn notify(&self, notification: Notification) {
        self.publish(notification);
    }
}
