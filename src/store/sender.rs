//! Weak action-submission handle handed to effect bodies.

use std::sync::Weak;

use thiserror::Error;

/// Error returned by [`ActionSender::try_send`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SendError {
    /// The owning store has been released; the action was dropped.
    #[error("store released; action dropped")]
    StoreReleased,
}

/// Serialized action entry point of a store, object-safe so senders don't
/// carry the reducer type.
pub(crate) trait Dispatch<A>: Send + Sync {
    fn dispatch(&self, action: A);
}

/// Submits actions back into the store that spawned an effect.
///
/// Holds only a weak reference: a sender kept alive by a long-running
/// subscription does not keep its store alive, and delivery after the store
/// is released is a documented no-op.
pub struct ActionSender<A> {
    target: Weak<dyn Dispatch<A>>,
}

impl<A> Clone for ActionSender<A> {
    fn clone(&self) -> Self {
        Self {
            target: Weak::clone(&self.target),
        }
    }
}

impl<A> ActionSender<A> {
    pub(crate) fn new(target: Weak<dyn Dispatch<A>>) -> Self {
        Self { target }
    }

    /// Submit an action. Silently does nothing once the store is released.
    pub fn send(&self, action: A) {
        if self.try_send(action).is_err() {
            tracing::trace!("action dropped (store released)");
        }
    }

    /// Submit an action, reporting whether the store still exists. Long-lived
    /// bodies can use this to stop pumping once their store is gone.
    pub fn try_send(&self, action: A) -> Result<(), SendError> {
        match self.target.upgrade() {
            Some(store) => {
                store.dispatch(action);
                Ok(())
            }
            None => Err(SendError::StoreReleased),
        }
    }

    /// Whether the owning store is still alive.
    pub fn is_connected(&self) -> bool {
        self.target.strong_count() > 0
    }
}
