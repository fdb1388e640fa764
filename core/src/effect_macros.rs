//! Declarative helpers for building effects.
//!
//! These keep reducer bodies short when they return async work or delayed
//! actions.

/// Create an `Effect::Future` from an async block
///
/// The block evaluates to `Option<Action>`; `Some` feeds the action back into
/// the store.
///
/// # Example
///
/// ```rust,ignore
/// use ticketdesk_core::async_effect;
///
/// async_effect! {
///     match snapshots.save(&snapshot).await {
///         Ok(()) => None,
///         Err(error) => Some(LedgerAction::SnapshotFailed { error: error.to_string() }),
///     }
/// }
/// ```
#[macro_export]
macro_rules! async_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(
            ::std::boxed::Box::pin(async move { $($body)* })
        )
    };
}

/// Create an `Effect::Delay` for scheduling delayed actions
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use ticketdesk_core::{delay, effect::Effect};
///
/// #[derive(Debug)]
/// enum Action {
///     Poll,
/// }
///
/// let effect: Effect<Action> = delay! {
///     duration: Duration::from_secs(60),
///     action: Action::Poll
/// };
/// assert!(matches!(effect, Effect::Delay { .. }));
/// ```
#[macro_export]
macro_rules! delay {
    (
        duration: $duration:expr,
        action: $action:expr
    ) => {
        $crate::effect::Effect::Delay {
            duration: $duration,
            action: ::std::boxed::Box::new($action),
        }
    };
}
