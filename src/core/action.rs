//! Actions - the composable unit of work behind every step

use crate::core::{control, Context, Failure};
use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Result of running an action
pub type Outcome<T> = Result<T, Failure>;

type ActionFn<T> = dyn Fn(Context) -> BoxFuture<'static, Outcome<T>> + Send + Sync;

/// A function from a [`Context`] to a value or a [`Failure`]
///
/// Actions are composed by value and never mutated. Cloning shares the
/// underlying closure.
pub struct Action<T> {
    run: Arc<ActionFn<T>>,
}

impl<T> Clone for Action<T> {
    fn clone(&self) -> Self {
        Self {
            run: self.run.clone(),
        }
    }
}

impl<T> fmt::Debug for Action<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Action")
    }
}

impl<T: Send + 'static> Action<T> {
    /// Build an action from an async closure
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Outcome<T>> + Send + 'static,
    {
        Self {
            run: Arc::new(move |ctx| -> BoxFuture<'static, Outcome<T>> { Box::pin(f(ctx)) }),
        }
    }

    /// Action that always succeeds with `value`
    pub fn ok(value: T) -> Self
    where
        T: Clone + Sync,
    {
        Self::new(move |_| {
            let value = value.clone();
            async move { Ok(value) }
        })
    }

    /// Action that always fails with a recoverable error
    pub fn fail(message: impl Into<String>) -> Self {
        Self::fail_messages(vec![message.into()])
    }

    /// Action that always fails with several recoverable messages
    pub fn fail_messages(messages: Vec<String>) -> Self {
        Self::new(move |_| {
            let messages = messages.clone();
            async move { Err(Failure::Recoverable(messages)) }
        })
    }

    /// Action that always aborts the pipeline
    pub fn abort(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(move |_| {
            let message = message.clone();
            async move { Err(Failure::Abort(vec![message])) }
        })
    }

    /// Run against `ctx`
    ///
    /// The closure is invoked inside the returned future, so a panic in user
    /// code surfaces when the future is polled.
    pub fn run(&self, ctx: Context) -> BoxFuture<'static, Outcome<T>> {
        let run = self.run.clone();
        Box::pin(async move { run(ctx).await })
    }

    /// Transform the success value
    pub fn map<U, F>(self, f: F) -> Action<U>
    where
        U: Send + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Action::new(move |ctx| {
            let action = self.clone();
            let f = f.clone();
            async move { action.run(ctx).await.map(|value| f(value)) }
        })
    }

    /// Run `binder`'s action after this one succeeds
    pub fn bind<U, F>(self, binder: F) -> Action<U>
    where
        U: Send + 'static,
        F: Fn(T) -> Action<U> + Send + Sync + 'static,
    {
        let binder = Arc::new(binder);
        Action::new(move |ctx: Context| {
            let action = self.clone();
            let binder = binder.clone();
            async move {
                let value = action.run(ctx.clone()).await?;
                binder(value).run(ctx).await
            }
        })
    }

    /// Run this action then `other` in the same context and pair the values
    ///
    /// The two run one after another; the first failure wins.
    pub fn zip<U: Send + 'static>(self, other: Action<U>) -> Action<(T, U)> {
        Action::new(move |ctx: Context| {
            let left = self.clone();
            let right = other.clone();
            async move {
                let left = left.run(ctx.clone()).await?;
                let right = right.run(ctx).await?;
                Ok((left, right))
            }
        })
    }

    /// Discard the success value
    pub fn ignore(self) -> Action<()> {
        self.map(|_| ())
    }

    /// See [`control::retry`]
    pub fn retry(self, attempts: u32) -> Action<T> {
        control::retry(attempts, self)
    }

    /// See [`control::memo`]
    pub fn memo(self) -> Action<T>
    where
        T: Clone + Sync,
    {
        control::memo(self)
    }

    /// See [`control::memo_race`]
    pub fn memo_race(self) -> Action<T>
    where
        T: Clone + Sync,
    {
        control::memo_race(self)
    }
}

/// Action returning the current context
pub fn context() -> Action<Context> {
    Action::new(|ctx| async move { Ok(ctx) })
}
