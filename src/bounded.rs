use std::any::Any;
use std::error::Error;
use std::future::Future;
use std::pin::Pin;

use futures_core::Stream;

/// A dynamically typed [`Future`].
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A dynamically typed [`Stream`].
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = T> + Send + 'a>>;

/// A dynamically typed [`Error`].
pub type BoxError = Box<dyn Error + Send + Sync>;

/// A type-erased argument value.
pub type Slot = Box<dyn Any + Send>;
