//! Realtime fan-out to connected viewers.
//!
//! The registry maps each viewer to one push channel. Lookups and fan-out take
//! the shared lock; connects, disconnects and evictions take the exclusive
//! one. A channel that fails a delivery is removed, unless the viewer has
//! reconnected in the meantime.

use crate::grid::GameId;
use crate::ledger::UserId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;
use tracing::{debug, warn};

/// A push message, sent as `{"type": ..., "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum PushMessage {
    /// Out-of-band notification for one user.
    NewNotification {
        /// Title.
        title: String,
        /// Body.
        message: String,
    },
    /// A board changed; viewers refetch it.
    GameUpdate {
        /// Game that changed.
        #[serde(rename = "gameId")]
        game_id: GameId,
    },
}

impl PushMessage {
    /// JSON text frame for this message.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// A failed delivery.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The receiving end is gone.
    #[error("push channel closed")]
    Closed,
    /// The transport refused the frame.
    #[error("push channel failed: {0}")]
    Transport(String),
}

/// Something that can carry text frames to one viewer.
pub trait PushChannel: Send + Sync + fmt::Debug {
    /// Deliver one frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame could not be delivered; the broadcaster
    /// then drops the channel.
    fn deliver(&self, frame: &str) -> Result<(), DeliveryError>;
}

/// Push channel backed by an in-process queue.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: Sender<String>,
}

impl ChannelSink {
    /// Create a sink and the receiver that reads its frames.
    #[must_use]
    pub fn pair() -> (Self, Receiver<String>) {
        let (sender, receiver) = mpsc::channel();
        (Self { sender }, receiver)
    }
}

impl PushChannel for ChannelSink {
    fn deliver(&self, frame: &str) -> Result<(), DeliveryError> {
        self.sender
            .send(frame.to_string())
            .map_err(|_| DeliveryError::Closed)
    }
}

#[derive(Debug)]
struct Registration {
    generation: u64,
    channel: Box<dyn PushChannel>,
}

/// Registry of connected viewers.
#[derive(Debug, Default)]
pub struct Broadcaster {
    registry: RwLock<HashMap<UserId, Registration>>,
    generations: AtomicU64,
}

impl Broadcaster {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave the map half-updated, so a
    // poisoned registry is still usable.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<UserId, Registration>> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<UserId, Registration>> {
        self.registry.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `viewer`, replacing any previous channel.
    pub fn connect(&self, viewer: UserId, channel: Box<dyn PushChannel>) {
        let generation = self.generations.fetch_add(1, Ordering::Relaxed);
        let replaced = self
            .write()
            .insert(viewer, Registration { generation, channel });
        debug!(viewer, replaced = replaced.is_some(), "viewer connected");
    }

    /// Remove `viewer`. Returns whether it was connected.
    pub fn disconnect(&self, viewer: UserId) -> bool {
        self.write().remove(&viewer).is_some()
    }

    /// Whether `viewer` has a channel.
    #[must_use]
    pub fn is_connected(&self, viewer: UserId) -> bool {
        self.read().contains_key(&viewer)
    }

    /// Number of connected viewers.
    #[must_use]
    pub fn connected_count(&self) -> usize {
        self.read().len()
    }

    /// Send `message` to one viewer. Returns whether it was delivered.
    pub fn notify(&self, viewer: UserId, message: &PushMessage) -> bool {
        let frame = match message.to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                warn!(viewer, error = %e, "could not encode push message");
                return false;
            }
        };

        let failed = {
            let registry = self.read();
            let Some(registration) = registry.get(&viewer) else {
                debug!(viewer, "viewer not connected, message dropped");
                return false;
            };
            match registration.channel.deliver(&frame) {
                Ok(()) => return true,
                Err(e) => {
                    warn!(viewer, error = %e, "push failed, dropping viewer");
                    registration.generation
                }
            }
        };
        self.evict(&[(viewer, failed)]);
        false
    }

    /// Tell every viewer that `game` changed. Returns the delivery count.
    pub fn broadcast_board(&self, game: GameId) -> usize {
        let message = PushMessage::GameUpdate { game_id: game };
        let frame = match message.to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                warn!(game, error = %e, "could not encode board update");
                return 0;
            }
        };

        let mut delivered = 0;
        let mut failed = Vec::new();
        for (&viewer, registration) in self.read().iter() {
            match registration.channel.deliver(&frame) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!(viewer, game, error = %e, "push failed, dropping viewer");
                    failed.push((viewer, registration.generation));
                }
            }
        }
        self.evict(&failed);
        debug!(game, delivered, evicted = failed.len(), "board update sent");
        delivered
    }

    fn evict(&self, failed: &[(UserId, u64)]) {
        if failed.is_empty() {
            return;
        }
        let mut registry = self.write();
        for (viewer, generation) in failed {
            if registry.get(viewer).is_some_and(|r| r.generation == *generation) {
                registry.remove(viewer);
            }
        }
    }
}
