//! Control-flow combinators over actions: retry and memoization

use crate::console::Message;
use crate::core::{Action, Failure};
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;
use tracing::debug;

/// Run `action` up to `attempts` times
///
/// Stops at the first success or the first [`Failure::Abort`]. Recoverable
/// and unhandled failures are printed through the context, followed by a
/// retry notice, before the next attempt. The last failure is returned once
/// the attempts are used up. The first invocation counts as attempt 1.
///
/// Panics are not caught here; the step runner turns them into an
/// unhandled failure of the whole step, so a panicking action is never
/// retried.
pub fn retry<T: Send + 'static>(attempts: u32, action: Action<T>) -> Action<T> {
    let attempts = attempts.max(1);
    Action::new(move |ctx| {
        let action = action.clone();
        async move {
            let mut attempt = 1;
            loop {
                match action.run(ctx.clone()).await {
                    Ok(value) => return Ok(value),
                    Err(failure @ Failure::Abort(_)) => return Err(failure),
                    Err(failure) if attempt >= attempts => return Err(failure),
                    Err(failure) => {
                        attempt += 1;
                        debug!(
                            "step {} failed, retrying (attempt {}/{})",
                            ctx.step_name(),
                            attempt,
                            attempts
                        );
                        let mut messages = failure.to_console();
                        messages.push(Message::warn(format!("Retrying, attempt {attempt}")));
                        ctx.write(messages);
                    }
                }
            }
        }
    })
}

/// Run `action` at most once successfully and replay its value
///
/// Concurrent callers wait for the single in-flight run. Failures are not
/// cached, so a later call runs the action again.
pub fn memo<T>(action: Action<T>) -> Action<T>
where
    T: Clone + Send + Sync + 'static,
{
    let cell: Arc<OnceCell<T>> = Arc::new(OnceCell::new());
    Action::new(move |ctx| {
        let action = action.clone();
        let cell = cell.clone();
        async move {
            cell.get_or_try_init(|| action.run(ctx))
                .await
                .map(T::clone)
        }
    })
}

/// Memoize without mutual exclusion
///
/// Callers racing before the first value settles each run the action; the
/// first one to finish successfully decides the value every caller sees
/// from then on.
pub fn memo_race<T>(action: Action<T>) -> Action<T>
where
    T: Clone + Send + Sync + 'static,
{
    let settled: Arc<Mutex<Option<T>>> = Arc::new(Mutex::new(None));
    Action::new(move |ctx| {
        let action = action.clone();
        let settled = settled.clone();
        async move {
            let cached = lock(&settled).clone();
            if let Some(value) = cached {
                return Ok(value);
            }

            let value = action.run(ctx).await?;
            let mut slot = lock(&settled);
            Ok(slot.get_or_insert(value).clone())
        }
    })
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
