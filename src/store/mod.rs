//! The store: state ownership, serialized dispatch, observation.
//!
//! A store is one serialization domain. All transitions run on whichever
//! caller currently drives the action queue; a `send` arriving while another
//! is being processed (from another thread, an observer, or an effect task)
//! is queued and picked up by the active drain loop. Effect bodies run
//! concurrently on tokio tasks but re-enter the store exclusively through
//! the serialized `send` entry point, so state is never touched by two
//! transitions at once.

mod sender;

pub use sender::{ActionSender, SendError};

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::runtime::Handle;

use crate::effect::{CancellationLedger, Effect, EffectRuntime};
use crate::reducer::Reducer;
use crate::state::StateDescription;
use sender::Dispatch;

type Observer<S> = Arc<dyn Fn(&S) + Send + Sync>;
type Delegate<A> = Arc<dyn Fn(&A) + Send + Sync>;

/// Handle to a running store.
///
/// Cloning yields another handle to the same store; the store itself (state,
/// queue, ledger) is torn down when the last handle drops, cancelling every
/// in-flight effect. The transition logic is the type parameter: a store is
/// a generic engine over a user-supplied [`Reducer`], not a base class to
/// inherit from.
pub struct Store<R: Reducer> {
    core: Arc<StoreCore<R>>,
}

impl<R: Reducer> Clone for Store<R> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<R: Reducer> PartialEq for Store<R> {
    /// Stores compare by their *initial* state: a container can tell whether
    /// a child identity changed structurally without chasing live state.
    fn eq(&self, other: &Self) -> bool {
        self.core.initial_state == other.core.initial_state
    }
}

impl<R: Reducer> Store<R> {
    /// Create a store with the given initial state.
    ///
    /// A tokio runtime handle is captured here when one is current, or
    /// lazily at the first effect dispatch otherwise. Dispatching a
    /// non-trivial effect with no runtime anywhere is a programmer error and
    /// panics.
    pub fn new(initial_state: R::State) -> Self {
        let core = Arc::new_cyclic(|weak_self| StoreCore {
            weak_self: weak_self.clone(),
            initial_state: initial_state.clone(),
            state: Mutex::new(initial_state),
            queue: Mutex::new(VecDeque::new()),
            draining: AtomicBool::new(false),
            observers: Mutex::new(HashMap::new()),
            next_observer: AtomicU64::new(0),
            delegate: Mutex::new(None),
            ledger: Arc::new(CancellationLedger::default()),
            runtime: Mutex::new(Handle::try_current().ok()),
        });
        Store { core }
    }

    /// Create a store and immediately process `initial_action` as its first
    /// `send`.
    pub fn with_initial_action(initial_state: R::State, initial_action: R::Action) -> Self {
        let store = Self::new(initial_state);
        store.send(initial_action);
        store
    }

    /// Submit one action. Fire-and-forget: the transition runs before this
    /// returns unless another caller is already draining the queue, and any
    /// resulting effects resolve asynchronously.
    pub fn send(&self, action: R::Action) {
        self.core.dispatch(action);
    }

    /// Snapshot of the latest committed state.
    pub fn state(&self) -> R::State {
        self.core.state.lock().clone()
    }

    /// The state this store was created with.
    pub fn initial_state(&self) -> &R::State {
        &self.core.initial_state
    }

    /// Register an observer invoked after every committed state *change*
    /// (changes are detected with `PartialEq`). Dropping the returned
    /// [`Subscription`] stops further notifications.
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&R::State) + Send + Sync + 'static,
    {
        let id = self.core.next_observer.fetch_add(1, Ordering::Relaxed);
        self.core.observers.lock().insert(id, Arc::new(observer));

        let core = Arc::downgrade(&self.core);
        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(core) = core.upgrade() {
                    core.observers.lock().remove(&id);
                }
            })),
        }
    }

    /// Install the delegate: a secondary observer invoked with every
    /// processed action (changed state or not), used to let a parent fold a
    /// child's actions into its own transition logic. One delegate per
    /// store; setting a new one replaces the previous.
    pub fn set_delegate<F>(&self, delegate: F)
    where
        F: Fn(&R::Action) + Send + Sync + 'static,
    {
        *self.core.delegate.lock() = Some(Arc::new(delegate));
    }

    /// Weak submission handle for effect bodies and parent/child wiring.
    pub fn sender(&self) -> ActionSender<R::Action> {
        self.core.sender()
    }
}

impl<R> Store<R>
where
    R: Reducer,
    R::State: StateDescription,
{
    /// Log the state's explicit snapshot at debug level and return it.
    pub fn describe_state(&self) -> String {
        let description = self.core.state.lock().describe();
        tracing::debug!(state = %description, "state snapshot");
        description
    }
}

/// Guard for an active state observer. Dropping it stops further
/// notifications.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Detach the observer now. Equivalent to dropping the guard.
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

struct StoreCore<R: Reducer> {
    weak_self: Weak<StoreCore<R>>,
    initial_state: R::State,
    state: Mutex<R::State>,
    queue: Mutex<VecDeque<R::Action>>,
    draining: AtomicBool,
    observers: Mutex<HashMap<u64, Observer<R::State>>>,
    next_observer: AtomicU64,
    delegate: Mutex<Option<Delegate<R::Action>>>,
    ledger: Arc<CancellationLedger>,
    runtime: Mutex<Option<Handle>>,
}

impl<R: Reducer> StoreCore<R> {
    /// Drive the action queue. At most one caller drains at a time; everyone
    /// else enqueues and returns, which is what serializes transitions.
    fn drain(&self) {
        if self.draining.swap(true, Ordering::AcqRel) {
            return;
        }
        loop {
            let next = self.queue.lock().pop_front();
            match next {
                Some(action) => self.process(action),
                None => {
                    self.draining.store(false, Ordering::Release);
                    // a send may have slipped in between the pop and the
                    // flag reset; re-arm if so, otherwise we're done
                    if self.queue.lock().is_empty()
                        || self.draining.swap(true, Ordering::AcqRel)
                    {
                        return;
                    }
                }
            }
        }
    }

    fn process(&self, action: R::Action) {
        let delegated = self.delegate.lock().is_some().then(|| action.clone());

        let (changed, snapshot, effect) = {
            let mut state = self.state.lock();
            let previous = std::mem::take(&mut *state);
            let before = previous.clone();
            let (next, effect) = R::reduce(previous, action);
            let changed = next != before;
            *state = next.clone();
            (changed, next, effect)
        };

        // observers and the delegate run outside every lock, so they are
        // free to subscribe, unsubscribe, or send (sends are queued)
        if changed {
            let observers: Vec<Observer<R::State>> =
                self.observers.lock().values().cloned().collect();
            for observer in observers {
                observer(&snapshot);
            }
        }

        if let Some(action) = delegated {
            let delegate = self.delegate.lock().clone();
            if let Some(delegate) = delegate {
                delegate(&action);
            }
        }

        self.run_effect(effect);
    }

    fn run_effect(&self, effect: Effect<R::Action>) {
        match effect {
            Effect::None => {}
            // cancellation needs no task, so it works without a runtime
            Effect::Cancel { id } => self.ledger.cancel_all(&id),
            other => {
                let runtime = EffectRuntime::new(Arc::clone(&self.ledger), self.runtime_handle());
                runtime.execute(other, self.sender());
            }
        }
    }

    fn sender(&self) -> ActionSender<R::Action> {
        let target: Weak<dyn Dispatch<R::Action>> = self.weak_self.clone();
        ActionSender::new(target)
    }

    fn runtime_handle(&self) -> Handle {
        let mut slot = self.runtime.lock();
        if let Some(handle) = slot.as_ref() {
            return handle.clone();
        }
        match Handle::try_current() {
            Ok(handle) => {
                *slot = Some(handle.clone());
                handle
            }
            Err(_) => panic!(
                "asynchronous effects require a tokio runtime; \
                 create the store inside one or send from a runtime context"
            ),
        }
    }
}

impl<R: Reducer> Dispatch<R::Action> for StoreCore<R> {
    fn dispatch(&self, action: R::Action) {
        self.queue.lock().push_back(action);
        self.drain();
    }
}

impl<R: Reducer> Drop for StoreCore<R> {
    fn drop(&mut self) {
        tracing::trace!(
            outstanding = self.ledger.outstanding(),
            "store released; cancelling in-flight effects"
        );
        self.ledger.cancel_everything();
    }
}
