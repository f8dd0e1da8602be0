use crate::bounded::BoxFuture;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// A value that may not have been computed yet.
///
/// Handlers return `Deferred` for asynchronous work. A `Deferred` created
/// with [`ready`](Deferred::ready) is written without being polled.
pub struct Deferred<T> {
    state: State<T>,
}

// boxed, `Object` holds a `Deferred<Object>`
enum State<T> {
    Ready(Option<Box<T>>),
    Pending(BoxFuture<'static, T>),
}

impl<T> Deferred<T>
where
    T: Send + 'static,
{
    /// A deferred value that is already complete.
    pub fn ready(value: T) -> Self {
        Deferred {
            state: State::Ready(Some(Box::new(value))),
        }
    }

    /// A deferred value produced by `future`.
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        Deferred {
            state: State::Pending(Box::pin(future)),
        }
    }

    /// Whether the value is available without polling.
    pub fn is_completed(&self) -> bool {
        matches!(self.state, State::Ready(Some(_)))
    }

    /// Take the value if it is complete, otherwise return `self`.
    pub fn into_ready(self) -> Result<T, Self> {
        match self.state {
            State::Ready(Some(value)) => Ok(*value),
            state => Err(Deferred { state }),
        }
    }

    /// Transform the value once it is available.
    ///
    /// Completed values stay completed.
    pub fn map<U, F>(self, f: F) -> Deferred<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        match self.state {
            State::Ready(Some(value)) => Deferred::ready(f(*value)),
            State::Ready(None) => Deferred {
                state: State::Ready(None),
            },
            State::Pending(future) => Deferred::new(async move { f(future.await) }),
        }
    }
}

// `T` is never pinned
impl<T> Unpin for Deferred<T> {}

impl<T> Future for Deferred<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        match &mut self.get_mut().state {
            State::Ready(value) => match value.take() {
                Some(value) => Poll::Ready(*value),
                None => panic!("`Deferred` polled after completion"),
            },
            State::Pending(future) => future.as_mut().poll(cx),
        }
    }
}

impl<T> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            State::Ready(Some(_)) => "ready",
            State::Ready(None) => "taken",
            State::Pending(_) => "pending",
        };

        f.debug_tuple("Deferred").field(&state).finish()
    }
}
