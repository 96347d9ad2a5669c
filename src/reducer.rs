//! Reducer trait.

use crate::action::Action;
use crate::effect::Effect;
use crate::state::State;

/// Reducer transforms state based on actions and declares follow-up work.
///
/// The reducer is the only place where state transitions happen. It must be
/// a pure, non-suspending function: given the current state and one action it
/// returns the next state plus a description of the side effects to perform.
/// Constructing the returned [`Effect`] executes nothing; the store's effect
/// runtime interprets it after the new state has been committed, so reducer
/// tests can assert on the returned state and the effect's shape without
/// running any asynchronous code.
///
/// The reducer must be total over its action type. Rust's match
/// exhaustiveness enforces this at compile time.
///
/// Reducers are type-level: `reduce` is an associated function and the store
/// never holds a reducer value, hence the `'static` bound.
pub trait Reducer: 'static {
    /// The state type this reducer operates on.
    type State: State;

    /// The action type this reducer handles.
    type Action: Action;

    /// Process one action and return the new state and follow-up effect.
    fn reduce(state: Self::State, action: Self::Action) -> (Self::State, Effect<Self::Action>);
}
