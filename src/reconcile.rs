//! Identity-keyed list reconciliation.
//!
//! Containers that keep one child object (typically a child store) per row
//! use this to stay identity-stable across list refreshes: a refresh yields a
//! new ordered sequence of identities, and the container reuses existing
//! children whose identity survives, builds children only for new
//! identities, and drops the rest.

use std::collections::HashMap;
use std::hash::Hash;

/// Types carrying a stable identity.
pub trait Identified {
    /// The identity key.
    type Id: Eq + Hash + Clone;

    /// This value's identity.
    fn id(&self) -> Self::Id;
}

/// Reconcile `existing` against a new ordered sequence of identities.
///
/// The result follows the order of `target`. An item whose identity appears
/// in `target` is moved out of `existing` unchanged, regardless of position;
/// identities absent from `existing` are built with `create`; items whose
/// identity is gone are dropped. A duplicate identity in `target` reuses the
/// existing item for its first occurrence only.
pub fn reconcile<T, I, F>(existing: Vec<T>, target: I, mut create: F) -> Vec<T>
where
    T: Identified,
    I: IntoIterator<Item = T::Id>,
    F: FnMut(&T::Id) -> T,
{
    let mut pool: HashMap<T::Id, T> = existing
        .into_iter()
        .map(|item| (item.id(), item))
        .collect();
    target
        .into_iter()
        .map(|id| pool.remove(&id).unwrap_or_else(|| create(&id)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Clone)]
    struct Row {
        id: u32,
        payload: Arc<String>,
    }

    impl Row {
        fn new(id: u32, payload: &str) -> Self {
            Self {
                id,
                payload: Arc::new(payload.to_owned()),
            }
        }
    }

    impl Identified for Row {
        type Id = u32;

        fn id(&self) -> u32 {
            self.id
        }
    }

    #[test]
    fn reuses_survivors_creates_new_drops_absent() {
        let old = vec![Row::new(1, "a"), Row::new(2, "b"), Row::new(4, "d")];
        let survivor_1 = Arc::clone(&old[0].payload);
        let survivor_2 = Arc::clone(&old[1].payload);

        let result = reconcile(old, [2, 3, 1], |id| Row::new(*id, "fresh"));

        assert_eq!(
            result.iter().map(|row| row.id).collect::<Vec<_>>(),
            vec![2, 3, 1]
        );
        // 1 and 2 are the same objects as before, not lookalikes
        assert!(Arc::ptr_eq(&result[2].payload, &survivor_1));
        assert!(Arc::ptr_eq(&result[0].payload, &survivor_2));
        // 3 is freshly built, 4 is gone
        assert_eq!(*result[1].payload, "fresh");
        assert!(result.iter().all(|row| row.id != 4));
    }

    #[test]
    fn empty_target_drops_everything() {
        let old = vec![Row::new(1, "a")];
        let result = reconcile(old, [], |id| Row::new(*id, "fresh"));
        assert!(result.is_empty());
    }

    #[test]
    fn duplicate_identity_reuses_first_occurrence_only() {
        let old = vec![Row::new(1, "a")];
        let original = Arc::clone(&old[0].payload);

        let result = reconcile(old, [1, 1], |id| Row::new(*id, "fresh"));

        assert_eq!(result.len(), 2);
        assert!(Arc::ptr_eq(&result[0].payload, &original));
        assert_eq!(*result[1].payload, "fresh");
    }

    #[test]
    fn preserves_target_order_under_reordering() {
        let old = vec![Row::new(1, "a"), Row::new(2, "b"), Row::new(3, "c")];
        let result = reconcile(old, [3, 1, 2], |id| Row::new(*id, "fresh"));
        assert_eq!(
            result.iter().map(|row| row.id).collect::<Vec<_>>(),
            vec![3, 1, 2]
        );
    }
}
