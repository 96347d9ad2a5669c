//! Base traits for store state.

/// Marker trait for state objects.
///
/// States should be:
/// - Immutable (Clone to create new states)
/// - Self-contained (all data needed to render a view of the store)
/// - Comparable (PartialEq for detecting changes)
///
/// Equality also keys container optimizations: two stores compare equal when
/// their *initial* states match, letting a parent skip rebuilding a child
/// whose identity hasn't structurally changed.
pub trait State: Clone + PartialEq + Default + Send + Sync + 'static {}

/// Explicit, typed snapshot of a state for debug output.
///
/// State types that want to show up in logs implement this directly instead
/// of relying on runtime introspection; the store exposes it through
/// [`Store::describe_state`](crate::store::Store::describe_state).
pub trait StateDescription {
    /// One-line human-readable description of the state.
    fn describe(&self) -> String;
}
