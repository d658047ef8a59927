//! Fan-out of game messages to an entity's watchers.

use crate::event::DeliveryError;
use vigil_core::EntityId;

/// Outbound channel used by [`AoiManager::broadcast_to_watchers`].
///
/// Usually the network session layer: one call per recipient, without
/// blocking.
///
/// [`AoiManager::broadcast_to_watchers`]: crate::AoiManager::broadcast_to_watchers
pub trait WatcherTransport<M: ?Sized> {
    fn send_to(&self, recipient: EntityId, message: &M) -> Result<(), DeliveryError>;
}
