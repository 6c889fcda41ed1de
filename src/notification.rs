//! Entry change notifications.
//!
//! Every metadata mutation is announced as an "update event" carrying the old
//! and new entry. A deletion has an old entry and no new one. Downstream
//! consumers (replication, cache invalidation in other processes) subscribe
//! to the [`BroadcastNotifier`].

use crate::types::{Entry, FullPath};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::debug;

/// Sink for entry change events. Calls never fail and never block.
pub trait EventNotifier: Send + Sync {
    fn notify_update_event(
        &self,
        old_entry: Option<&Entry>,
        new_entry: Option<&Entry>,
        delete_chunks: bool,
    );
}

/// One entry change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventNotification {
    /// Unique event ID.
    pub id: String,
    /// Parent directory of the changed entry.
    pub directory: FullPath,
    pub old_entry: Option<Entry>,
    pub new_entry: Option<Entry>,
    /// Whether the chunks of `old_entry` are being reclaimed.
    pub delete_chunks: bool,
    pub timestamp: DateTime<Utc>,
}

impl EventNotification {
    pub fn new(old_entry: Option<&Entry>, new_entry: Option<&Entry>, delete_chunks: bool) -> Self {
        let path = new_entry
            .or(old_entry)
            .map(|e| e.full_path.clone())
            .unwrap_or_else(FullPath::root);
        let directory = path.parent().unwrap_or_else(FullPath::root);

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            directory,
            old_entry: old_entry.cloned(),
            new_entry: new_entry.cloned(),
            delete_chunks,
            timestamp: Utc::now(),
        }
    }

    pub fn is_delete(&self) -> bool {
        self.old_entry.is_some() && self.new_entry.is_none()
    }

    /// Path of the changed entry.
    pub fn path(&self) -> Option<&FullPath> {
        self.new_entry
            .as_ref()
            .or(self.old_entry.as_ref())
            .map(|e| &e.full_path)
    }
}

/// Notifier configuration.
#[derive(Debug, Clone)]
pub struct NotifierConfig {
    /// Broadcast buffer per subscriber.
    pub buffer_size: usize,
    /// Number of recent events kept for inspection.
    pub history_size: usize,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            buffer_size: 10000,
            history_size: 1000,
        }
    }
}

/// Notifier publishing over a tokio broadcast channel.
pub struct BroadcastNotifier {
    config: NotifierConfig,
    broadcast: broadcast::Sender<EventNotification>,
    history: Mutex<VecDeque<EventNotification>>,
    published: AtomicU64,
}

impl BroadcastNotifier {
    pub fn new(config: NotifierConfig) -> Self {
        let (broadcast, _) = broadcast::channel(config.buffer_size.max(1));
        Self {
            config,
            broadcast,
            history: Mutex::new(VecDeque::new()),
            published: AtomicU64::new(0),
        }
    }

    /// Receive all events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<EventNotification> {
        self.broadcast.subscribe()
    }

    /// Most recent events, oldest first.
    pub fn history(&self, limit: usize) -> Vec<EventNotification> {
        let history = self.history.lock();
        let skip = history.len().saturating_sub(limit);
        history.iter().skip(skip).cloned().collect()
    }

    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    fn publish(&self, event: EventNotification) {
        self.published.fetch_add(1, Ordering::Relaxed);
        debug!(event_id = %event.id, directory = %event.directory, "Entry event published");

        {
            let mut history = self.history.lock();
            if history.len() >= self.config.history_size {
                history.pop_front();
            }
            if self.config.history_size > 0 {
                history.push_back(event.clone());
            }
        }

        // No subscribers is fine.
        let _ = self.broadcast.send(event);
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(NotifierConfig::default())
    }
}

impl EventNotifier for BroadcastNotifier {
    fn notify_update_event(
        &self,
        old_entry: Option<&Entry>,
        new_entry: Option<&Entry>,
        delete_chunks: bool,
    ) {
        self.publish(EventNotification::new(old_entry, new_entry, delete_chunks));
    }
}

/// Notifier that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl EventNotifier for NoopNotifier {
    fn notify_update_event(
        &self,
        _old_entry: Option<&Entry>,
        _new_entry: Option<&Entry>,
        _delete_chunks: bool,
    ) {
    }
}
