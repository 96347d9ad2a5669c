//! Interpreter for [`Effect`] values.
//!
//! The runtime is the only place effects execute. Each `run` body and
//! `publisher` subscription becomes an independent tokio task registered in
//! the store's cancellation ledger; the task races its cancellation token
//! against the work and unregisters itself when either side finishes.
//! Cancellation is cooperative: a body already running synchronously is never
//! interrupted mid-statement, it stops at its next suspension point.

use std::sync::Arc;

use futures::StreamExt;
use tokio::runtime::Handle;

use crate::action::Action;
use crate::effect::ledger::CancellationLedger;
use crate::effect::Effect;
use crate::store::ActionSender;

/// Executes effect descriptions against a store's cancellation ledger.
pub(crate) struct EffectRuntime {
    ledger: Arc<CancellationLedger>,
    handle: Handle,
}

impl EffectRuntime {
    pub(crate) fn new(ledger: Arc<CancellationLedger>, handle: Handle) -> Self {
        Self { ledger, handle }
    }

    /// Interpret one effect. Synchronous: cancellation commands and ledger
    /// registration happen on the caller, only the bodies themselves run on
    /// spawned tasks.
    pub(crate) fn execute<A: Action>(&self, effect: Effect<A>, sender: ActionSender<A>) {
        match effect {
            Effect::None => {}

            Effect::Cancel { id } => self.ledger.cancel_all(&id),

            Effect::Run {
                id,
                cancel_in_flight,
                body,
            } => {
                if cancel_in_flight {
                    if let Some(id) = id.as_deref() {
                        self.ledger.cancel_all(id);
                    }
                }
                let entry = self.ledger.register(id.as_deref());
                let ledger = Arc::clone(&self.ledger);
                let token = entry.token.clone();
                self.handle.spawn(async move {
                    // unregisters on every exit path, a panicking body included
                    let _unregister = scopeguard::guard(entry, move |entry| {
                        ledger.unregister(&entry.bucket, entry.handle);
                    });
                    let work = body(sender, token.clone());
                    tokio::select! {
                        biased;
                        () = token.cancelled() => {
                            tracing::trace!("run effect cancelled");
                        }
                        () = work => {}
                    }
                });
            }

            Effect::Publisher {
                id,
                cancel_in_flight,
                mut source,
            } => {
                if cancel_in_flight {
                    if let Some(id) = id.as_deref() {
                        self.ledger.cancel_all(id);
                    }
                }
                let entry = self.ledger.register(id.as_deref());
                let ledger = Arc::clone(&self.ledger);
                let token = entry.token.clone();
                self.handle.spawn(async move {
                    // unregisters on every exit path, a panicking stream included
                    let _unregister = scopeguard::guard(entry, move |entry| {
                        ledger.unregister(&entry.bucket, entry.handle);
                    });
                    loop {
                        tokio::select! {
                            biased;
                            () = token.cancelled() => {
                                tracing::trace!("publisher effect cancelled");
                                break;
                            }
                            item = source.next() => match item {
                                Some(action) => sender.send(action),
                                None => break,
                            },
                        }
                    }
                });
            }

            Effect::Merge {
                id,
                cancel_in_flight,
                effects,
            } => {
                // Pre-cancel the group exactly once, before any child starts:
                // a child must never be collaterally cancelled by its own
                // generation's startup.
                if cancel_in_flight {
                    if let Some(id) = id.as_deref() {
                        self.ledger.cancel_all(id);
                    }
                }
                for child in effects {
                    let child = match id.as_deref() {
                        Some(group) => child.with_default_id(group),
                        None => child,
                    };
                    self.execute(child, sender.clone());
                }
            }
        }
    }
}
