//! Unidirectional state container with declarative, cancellable side effects.
//!
//! A [`Store`] owns a single piece of state and processes discrete actions
//! one at a time through a pure [`Reducer`]. The reducer returns the next
//! state plus an [`Effect`] — a *description* of the asynchronous work to
//! perform. The store's effect runtime interprets that description after the
//! new state has been committed, and anything the work produces flows back
//! into the same store as further actions.
//!
//! # Architecture
//!
//! ```text
//! Action ──→ Reducer ──→ (State, Effect)
//!    ↑            │            │
//!    │            ▼            ▼
//!    │       Subscribers   Effect runtime
//!    │                         │
//!    └───── ActionSender ◀─────┘
//! ```
//!
//! - **State**: immutable snapshot of the application, committed per action
//! - **Action**: one discrete event (user input, timer tick, completion of
//!   asynchronous work)
//! - **Reducer**: pure, non-suspending transition function
//! - **Effect**: data describing follow-up work, with identity-based
//!   cancellation (see [`Effect::cancellable`])
//!
//! Effect bodies run on tokio tasks and hold only a weak handle back to the
//! store; once the store is released, deliveries become silent no-ops and all
//! in-flight work is cancelled.

pub mod action;
pub mod effect;
pub mod reconcile;
pub mod reducer;
pub mod state;
pub mod store;

pub use action::Action;
pub use effect::Effect;
pub use reconcile::{reconcile, Identified};
pub use reducer::Reducer;
pub use state::{State, StateDescription};
pub use store::{ActionSender, SendError, Store, Subscription};
