//! Base trait for actions.

/// Marker trait for action objects.
///
/// Actions represent:
/// - User events (button presses, key input)
/// - System events (timers, subscriptions emitting)
/// - Completions of asynchronous work started by an effect
///
/// Actions are processed by reducers to produce new states and effects.
/// `Clone` lets the store hand a processed action to the delegate without
/// taking it away from the reducer; `Send + 'static` lets effect bodies carry
/// actions across suspension points.
pub trait Action: Clone + Send + 'static {}
