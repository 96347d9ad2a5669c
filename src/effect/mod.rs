//! Declarative side effects returned by reducers.
//!
//! Effects are data, not executed code. Building one performs nothing; the
//! store's runtime interprets it after the state transition that produced it
//! has committed. This keeps reducers synchronous and trivially testable:
//! given state and action, assert on the returned state and the *shape* of
//! the effect.
//!
//! Cancellation is identity-based: [`Effect::cancellable`] attaches a string
//! identity to an effect, and [`Effect::cancel`] later cancels everything
//! still in flight under that identity. Effects without an identity are only
//! cancelled when their store is released.

mod ledger;
mod runtime;

pub(crate) use ledger::CancellationLedger;
pub(crate) use runtime::EffectRuntime;

use std::fmt;
use std::future::Future;

use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::Stream;
use tokio_util::sync::CancellationToken;

use crate::store::ActionSender;

/// Boxed asynchronous body of an [`Effect::Run`] effect.
///
/// The body receives a sender for submitting follow-up actions and the
/// cancellation token guarding it, for explicit checks at points of its own
/// choosing. The runtime additionally races the token against the body, so
/// cancellation is observed at the next suspension point either way.
pub type RunBody<A> =
    Box<dyn FnOnce(ActionSender<A>, CancellationToken) -> BoxFuture<'static, ()> + Send>;

/// Boxed action source of an [`Effect::Publisher`] effect.
pub type ActionStream<A> = BoxStream<'static, A>;

/// Description of the side effects to perform after a state transition.
pub enum Effect<A> {
    /// No side effect.
    None,

    /// One-shot asynchronous work, fire-and-forget from the store's
    /// perspective but trackable for cancellation through its identity.
    Run {
        /// Cancellation identity; anonymous when absent.
        id: Option<String>,
        /// Cancel outstanding work under `id` before starting this body.
        cancel_in_flight: bool,
        /// The work itself.
        body: RunBody<A>,
    },

    /// Long-lived subscription to a stream of values, each forwarded to the
    /// store as an action. Semantically a multi-value [`Effect::Run`].
    Publisher {
        /// Cancellation identity; anonymous when absent.
        id: Option<String>,
        /// Cancel outstanding work under `id` before subscribing.
        cancel_in_flight: bool,
        /// The subscribed stream.
        source: ActionStream<A>,
    },

    /// Command: immediately cancel every outstanding effect registered under
    /// `id`. Terminal and synchronous, not an ongoing effect.
    Cancel {
        /// Identity whose in-flight effects are cancelled.
        id: String,
    },

    /// Perform every contained effect, concurrently and independently. A
    /// group `id` on the merge is handed down to children that don't carry
    /// their own, so the whole bundle shares one cancellation handle.
    Merge {
        /// Group cancellation identity, propagated to id-less children.
        id: Option<String>,
        /// Cancel the group `id` once, before any child starts.
        cancel_in_flight: bool,
        /// Child effects.
        effects: Vec<Effect<A>>,
    },
}

impl<A> Effect<A> {
    /// No side effect.
    pub fn none() -> Self {
        Effect::None
    }

    /// Asynchronous work. The body receives an [`ActionSender`] for feeding
    /// actions back into the store and a [`CancellationToken`] it may check
    /// explicitly. Failures are body-owned: translate them into an action,
    /// the runtime never observes them.
    pub fn run<F, Fut>(body: F) -> Self
    where
        F: FnOnce(ActionSender<A>, CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Effect::Run {
            id: None,
            cancel_in_flight: false,
            body: Box::new(move |sender, token| -> BoxFuture<'static, ()> {
                Box::pin(body(sender, token))
            }),
        }
    }

    /// Subscribe to `source` and forward every emitted value as an action.
    /// The subscription ends when the stream ends, its identity is
    /// cancelled, or the store is released.
    ///
    /// Forwarding runs the store's serialized transition on the pump task
    /// before the next item is polled. Reducers are pure and brief, so the
    /// stream is only ever held back for the duration of one commit; a
    /// source that must not be back-pressured at all can buffer through a
    /// channel and publish the receiving end.
    pub fn publisher<S>(source: S) -> Self
    where
        S: Stream<Item = A> + Send + 'static,
    {
        Effect::Publisher {
            id: None,
            cancel_in_flight: false,
            source: Box::pin(source),
        }
    }

    /// Cancel every outstanding effect registered under `id`. A no-op when
    /// nothing is registered there.
    pub fn cancel(id: impl Into<String>) -> Self {
        Effect::Cancel { id: id.into() }
    }

    /// Perform all of `effects` concurrently.
    pub fn merge(effects: impl IntoIterator<Item = Effect<A>>) -> Self {
        Effect::Merge {
            id: None,
            cancel_in_flight: false,
            effects: effects.into_iter().collect(),
        }
    }

    /// Attach a cancellation identity after construction.
    ///
    /// Pure rewrite: [`Effect::None`] and [`Effect::Cancel`] pass through
    /// unchanged; [`Effect::Run`] and [`Effect::Publisher`] get their
    /// identity fields overwritten; [`Effect::Merge`] records the override on
    /// the merge node, where it reaches children as a *default* at execution
    /// time (a child's own explicit identity wins).
    pub fn cancellable(self, id: impl Into<String>, cancel_in_flight: bool) -> Self {
        let id = id.into();
        match self {
            Effect::None => Effect::None,
            Effect::Cancel { id } => Effect::Cancel { id },
            Effect::Run { body, .. } => Effect::Run {
                id: Some(id),
                cancel_in_flight,
                body,
            },
            Effect::Publisher { source, .. } => Effect::Publisher {
                id: Some(id),
                cancel_in_flight,
                source,
            },
            Effect::Merge { effects, .. } => Effect::Merge {
                id: Some(id),
                cancel_in_flight,
                effects,
            },
        }
    }

    /// Fill in `id` where this effect has none. Used by the runtime to hand a
    /// merge's group identity down to its children; never touches an
    /// explicitly set identity and never enables `cancel_in_flight`, since
    /// the group pre-cancel already happened at the merge node.
    pub(crate) fn with_default_id(self, id: &str) -> Self {
        match self {
            Effect::Run {
                id: None,
                cancel_in_flight,
                body,
            } => Effect::Run {
                id: Some(id.to_owned()),
                cancel_in_flight,
                body,
            },
            Effect::Publisher {
                id: None,
                cancel_in_flight,
                source,
            } => Effect::Publisher {
                id: Some(id.to_owned()),
                cancel_in_flight,
                source,
            },
            Effect::Merge {
                id: None,
                cancel_in_flight,
                effects,
            } => Effect::Merge {
                id: Some(id.to_owned()),
                cancel_in_flight,
                effects,
            },
            other => other,
        }
    }

    /// Whether this is [`Effect::None`].
    pub fn is_none(&self) -> bool {
        matches!(self, Effect::None)
    }

    /// The cancellation identity this effect carries, if any. For
    /// [`Effect::Cancel`] this is the *target* identity.
    pub fn id(&self) -> Option<&str> {
        match self {
            Effect::None => None,
            Effect::Run { id, .. } | Effect::Publisher { id, .. } | Effect::Merge { id, .. } => {
                id.as_deref()
            }
            Effect::Cancel { id } => Some(id),
        }
    }

    /// Whether this effect pre-cancels in-flight work under its identity.
    pub fn cancels_in_flight(&self) -> bool {
        match self {
            Effect::Run {
                cancel_in_flight, ..
            }
            | Effect::Publisher {
                cancel_in_flight, ..
            }
            | Effect::Merge {
                cancel_in_flight, ..
            } => *cancel_in_flight,
            Effect::None | Effect::Cancel { .. } => false,
        }
    }
}

impl<A> fmt::Debug for Effect<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::None => f.write_str("Effect::None"),
            Effect::Run {
                id,
                cancel_in_flight,
                ..
            } => f
                .debug_struct("Effect::Run")
                .field("id", id)
                .field("cancel_in_flight", cancel_in_flight)
                .finish_non_exhaustive(),
            Effect::Publisher {
                id,
                cancel_in_flight,
                ..
            } => f
                .debug_struct("Effect::Publisher")
                .field("id", id)
                .field("cancel_in_flight", cancel_in_flight)
                .finish_non_exhaustive(),
            Effect::Cancel { id } => f.debug_struct("Effect::Cancel").field("id", id).finish(),
            Effect::Merge {
                id,
                cancel_in_flight,
                effects,
            } => f
                .debug_struct("Effect::Merge")
                .field("id", id)
                .field("cancel_in_flight", cancel_in_flight)
                .field("effects", effects)
                .finish(),
        }
    }
}
