//! # TicketDesk Runtime
//!
//! Runtime implementation for the TicketDesk reducer architecture.
//!
//! This crate provides the [`Store`](store::Store) that coordinates reducer
//! execution and effect handling.
//!
//! ## Core Components
//!
//! - **Store**: The runtime that manages state and executes effects
//! - **Effect Executor**: Executes effect descriptions and feeds actions back to reducers
//! - **Effect Handle**: Lets callers wait until the effects of one `send` have finished
//!
//! ## Example
//!
//! ```ignore
//! use ticketdesk_runtime::Store;
//!
//! let store = Store::new(initial_state, reducer, environment);
//!
//! // Send an action
//! store.send(Action::DoSomething).await?;
//!
//! // Read state
//! let value = store.state(|s| s.some_field).await;
//! ```

use futures::future::BoxFuture;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use ticketdesk_core::{effect::Effect, reducer::Reducer};
use tokio::sync::{watch, RwLock};

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions
        ///
        /// This error is returned when `send()` is called after shutdown initiated.
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Timed out waiting for effects to complete
        #[error("Timed out waiting for effects")]
        Timeout,
    }
}

pub use error::StoreError;
pub use store::Store;

/// Handle for waiting on the effects started by one `send()`
///
/// Tracks `Future` and `Sequential` effects. `Delay` effects are scheduled
/// work (reminder polls, for example) and are not awaited by the handle.
#[derive(Clone, Debug)]
pub struct EffectHandle {
    pending: watch::Receiver<usize>,
}

impl EffectHandle {
    /// A handle with nothing to wait for
    #[must_use]
    pub fn completed() -> Self {
        let (_tx, rx) = watch::channel(0);
        Self { pending: rx }
    }

    /// Number of tracked effects still running
    #[must_use]
    pub fn pending(&self) -> usize {
        *self.pending.borrow()
    }

    /// Wait until every tracked effect has finished
    pub async fn wait(&mut self) {
        // A closed channel means every tracker was dropped, so nothing is running.
        let _ = self.pending.wait_for(|count| *count == 0).await;
    }

    /// Wait for tracked effects with an upper bound
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if effects are still running after `timeout`.
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), StoreError> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| StoreError::Timeout)
    }
}

/// Counts in-flight effects for one `send()`
#[derive(Clone)]
struct EffectTracker {
    counter: Arc<watch::Sender<usize>>,
}

impl EffectTracker {
    fn new() -> (Self, EffectHandle) {
        let (tx, rx) = watch::channel(0);
        (
            Self {
                counter: Arc::new(tx),
            },
            EffectHandle { pending: rx },
        )
    }

    fn start(&self) -> TrackerGuard {
        self.counter.send_modify(|count| *count += 1);
        TrackerGuard {
            counter: Arc::clone(&self.counter),
        }
    }
}

/// Decrements the tracker when dropped, even if the effect task panics
struct TrackerGuard {
    counter: Arc<watch::Sender<usize>>,
}

impl Drop for TrackerGuard {
    fn drop(&mut self) {
        self.counter
            .send_modify(|count| *count = count.saturating_sub(1));
    }
}

/// Store module - the runtime coordinator
pub mod store {
    use super::{
        Arc, AtomicBool, BoxFuture, Duration, Effect, EffectHandle, EffectTracker, Ordering,
        Reducer, RwLock, StoreError,
    };

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. State (behind `RwLock`, so actions never interleave mid-mutation)
    /// 2. Reducer (business logic)
    /// 3. Environment (injected dependencies)
    /// 4. Effect execution (with feedback loop)
    ///
    /// # Type Parameters
    ///
    /// - `S`: State type
    /// - `A`: Action type
    /// - `E`: Environment type
    /// - `R`: Reducer implementation
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: Arc<RwLock<S>>,
        reducer: R,
        environment: E,
        shutdown: Arc<AtomicBool>,
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Clone + Send + Sync + 'static,
        A: Send + 'static,
        S: Send + Sync + 'static,
        E: Clone + Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self {
                state: Arc::new(RwLock::new(initial_state)),
                reducer,
                environment,
                shutdown: Arc::new(AtomicBool::new(false)),
            }
        }

        /// Send an action to the store
        ///
        /// 1. Acquires write lock on state
        /// 2. Calls reducer with (state, action, environment)
        /// 3. Releases the lock and starts the returned effects
        /// 4. Effects may produce more actions (feedback loop)
        ///
        /// `send()` returns once effects are started, not finished. Use the
        /// returned [`EffectHandle`] to wait for them.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        #[tracing::instrument(skip(self, action), name = "store_send")]
        pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError> {
            if self.shutdown.load(Ordering::Acquire) {
                tracing::debug!("Rejecting action: store is shutting down");
                return Err(StoreError::ShutdownInProgress);
            }

            let effects = {
                let mut state = self.state.write().await;
                self.reducer.reduce(&mut *state, action, &self.environment)
            };
            metrics::counter!("store.actions.processed").increment(1);

            if effects.iter().all(Effect::is_none) {
                return Ok(EffectHandle::completed());
            }

            let (tracker, handle) = EffectTracker::new();
            for effect in effects {
                self.execute_effect(effect, &tracker);
            }
            Ok(handle)
        }

        /// Read state via a closure
        ///
        /// Takes a read lock for the duration of the closure.
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.state.read().await;
            f(&*state)
        }

        /// Stop accepting actions
        ///
        /// Pending delayed actions are dropped when they fire, which ends any
        /// self-rescheduling loops such as reminder polling.
        pub fn shutdown(&self) {
            tracing::info!("Store shutdown requested");
            self.shutdown.store(true, Ordering::Release);
        }

        /// Whether `shutdown()` has been called
        #[must_use]
        pub fn is_shut_down(&self) -> bool {
            self.shutdown.load(Ordering::Acquire)
        }

        /// Start one effect
        ///
        /// - `None`: no-op
        /// - `Future`: spawned and tracked; a produced action is sent back to the store
        /// - `Delay`: spawned, untracked; the action is sent after the duration
        /// - `Parallel`: each child started independently
        /// - `Sequential`: spawned and tracked; children run to completion in order
        fn execute_effect(&self, effect: Effect<A>, tracker: &EffectTracker) {
            match effect {
                Effect::None => {
                    tracing::trace!("Executing Effect::None (no-op)");
                },
                Effect::Parallel(effects) => {
                    tracing::trace!("Executing Effect::Parallel with {} effects", effects.len());
                    metrics::counter!("store.effects.executed", "type" => "parallel").increment(1);
                    for effect in effects {
                        self.execute_effect(effect, tracker);
                    }
                },
                Effect::Delay { duration, action } => {
                    tracing::trace!("Scheduling Effect::Delay (duration: {:?})", duration);
                    metrics::counter!("store.effects.executed", "type" => "delay").increment(1);
                    let store = self.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(duration).await;
                        store.feed_back(*action).await;
                    });
                },
                effect @ (Effect::Future(_) | Effect::Sequential(_)) => {
                    let guard = tracker.start();
                    let store = self.clone();
                    tokio::spawn(async move {
                        let _guard = guard;
                        store.run_to_completion(effect).await;
                    });
                },
            }
        }

        /// Run an effect inline, awaiting every part of it
        fn run_to_completion(&self, effect: Effect<A>) -> BoxFuture<'static, ()> {
            let store = self.clone();
            Box::pin(async move {
                match effect {
                    Effect::None => {},
                    Effect::Future(fut) => {
                        metrics::counter!("store.effects.executed", "type" => "future").increment(1);
                        if let Some(action) = fut.await {
                            tracing::trace!("Effect::Future produced an action, sending to store");
                            store.feed_back(action).await;
                        }
                    },
                    Effect::Delay { duration, action } => {
                        metrics::counter!("store.effects.executed", "type" => "delay").increment(1);
                        tokio::time::sleep(duration).await;
                        store.feed_back(*action).await;
                    },
                    Effect::Parallel(effects) => {
                        metrics::counter!("store.effects.executed", "type" => "parallel").increment(1);
                        let runs = effects
                            .into_iter()
                            .map(|effect| store.run_to_completion(effect));
                        futures::future::join_all(runs).await;
                    },
                    Effect::Sequential(effects) => {
                        metrics::counter!("store.effects.executed", "type" => "sequential").increment(1);
                        let count = effects.len();
                        for (idx, effect) in effects.into_iter().enumerate() {
                            tracing::trace!("Executing sequential effect {} of {}", idx + 1, count);
                            store.run_to_completion(effect).await;
                        }
                    },
                }
            })
        }

        /// Send an action produced by an effect back into the store
        async fn feed_back(&self, action: A) {
            match self.send(action).await {
                Ok(_) => {},
                Err(StoreError::ShutdownInProgress) => {
                    tracing::debug!("Dropping feedback action: store is shutting down");
                },
                Err(error) => {
                    tracing::warn!(error = %error, "Feedback action failed");
                },
            }
        }
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Clone,
        E: Clone,
    {
        fn clone(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
                reducer: self.reducer.clone(),
                environment: self.environment.clone(),
                shutdown: Arc::clone(&self.shutdown),
            }
        }
    }

    #[allow(clippy::missing_fields_in_debug)]
    impl<S, A, E, R> std::fmt::Debug for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("Store")
                .field("shutdown", &self.shutdown.load(Ordering::Acquire))
                .finish()
        }
    }
}
