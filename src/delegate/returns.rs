use super::declare::Json;
use super::deferred::Deferred;
use crate::http::{HttpContext, TEXT_PLAIN_UTF_8};
use crate::results::BoxResult;
use crate::Error;

use std::borrow::Cow;
use std::fmt;

use serde::Serialize;

/// How the value a handler returns is written to the response.
///
/// Chosen once per handler from its return type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReturnAdapter {
    /// Write nothing.
    Empty,
    /// Inspect the [`Object`] when it is produced.
    Object,
    /// Write plain text.
    Text,
    /// Serialize as JSON.
    Json,
    /// Execute the [`HttpResult`](crate::HttpResult).
    Result,
    /// Await, then complete as described.
    Deferred(Completion),
}

/// What to do with the value of a [`Deferred`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Completion {
    Empty,
    Text,
    Json,
    Result,
}

/// A value whose shape is only known when it is produced.
pub enum Object {
    /// Written as JSON `null`.
    Null,
    Text(String),
    Json(serde_json::Value),
    Result(BoxResult),
    /// Awaited once, then dispatched again.
    Deferred(Deferred<Object>),
    /// A deferred result or text, completed as if the handler returned it.
    #[doc(hidden)]
    Complete(Completion, Deferred<Returned>),
}

impl Object {
    /// Serialize `value` into an `Object::Json`.
    pub fn json<T>(value: &T) -> Result<Self, serde_json::Error>
    where
        T: Serialize + ?Sized,
    {
        serde_json::to_value(value).map(Object::Json)
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Object::Null => f.write_str("Null"),
            Object::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Object::Json(value) => f.debug_tuple("Json").field(value).finish(),
            Object::Result(_) => f.write_str("Result(..)"),
            Object::Deferred(deferred) => f.debug_tuple("Deferred").field(deferred).finish(),
            Object::Complete(completion, deferred) => f
                .debug_tuple("Complete")
                .field(completion)
                .field(deferred)
                .finish(),
        }
    }
}

impl From<String> for Object {
    fn from(text: String) -> Self {
        Object::Text(text)
    }
}

impl From<&str> for Object {
    fn from(text: &str) -> Self {
        Object::Text(text.to_owned())
    }
}

impl From<serde_json::Value> for Object {
    fn from(value: serde_json::Value) -> Self {
        Object::Json(value)
    }
}

impl From<BoxResult> for Object {
    fn from(result: BoxResult) -> Self {
        Object::Result(result)
    }
}

impl From<Deferred<Object>> for Object {
    fn from(deferred: Deferred<Object>) -> Self {
        Object::Deferred(deferred)
    }
}

macro_rules! object_from_deferred {
    ($completion:ident => $($ty:ty),*) => {
        $(impl From<Deferred<$ty>> for Object {
            fn from(deferred: Deferred<$ty>) -> Self {
                Object::Complete(Completion::$completion, deferred.map(Returns::into_returned))
            }
        })*
    };
}

object_from_deferred!(Text => String, &'static str);
object_from_deferred!(Result => BoxResult, Option<BoxResult>);

/// A handler's output with its type erased.
#[doc(hidden)]
pub enum Returned {
    Unit,
    Object(Object),
    Text(Cow<'static, str>),
    Json(Result<Vec<u8>, serde_json::Error>),
    Result(Option<BoxResult>),
    Deferred(Option<Deferred<Returned>>),
}

/// A type a handler can return.
pub trait Returns: Send + 'static {
    fn adapter() -> ReturnAdapter;

    #[doc(hidden)]
    fn into_returned(self) -> Returned;
}

impl Returns for () {
    fn adapter() -> ReturnAdapter {
        ReturnAdapter::Empty
    }

    fn into_returned(self) -> Returned {
        Returned::Unit
    }
}

impl Returns for Object {
    fn adapter() -> ReturnAdapter {
        ReturnAdapter::Object
    }

    fn into_returned(self) -> Returned {
        Returned::Object(self)
    }
}

impl Returns for String {
    fn adapter() -> ReturnAdapter {
        ReturnAdapter::Text
    }

    fn into_returned(self) -> Returned {
        Returned::Text(Cow::Owned(self))
    }
}

impl Returns for &'static str {
    fn adapter() -> ReturnAdapter {
        ReturnAdapter::Text
    }

    fn into_returned(self) -> Returned {
        Returned::Text(Cow::Borrowed(self))
    }
}

impl<T> Returns for Json<T>
where
    T: Serialize + Send + 'static,
{
    fn adapter() -> ReturnAdapter {
        ReturnAdapter::Json
    }

    fn into_returned(self) -> Returned {
        Returned::Json(serde_json::to_vec(&self.0))
    }
}

impl Returns for BoxResult {
    fn adapter() -> ReturnAdapter {
        ReturnAdapter::Result
    }

    fn into_returned(self) -> Returned {
        Returned::Result(Some(self))
    }
}

impl Returns for Option<BoxResult> {
    fn adapter() -> ReturnAdapter {
        ReturnAdapter::Result
    }

    fn into_returned(self) -> Returned {
        Returned::Result(self)
    }
}

/// A type a handler can return inside a [`Deferred`].
pub trait DeferredOutput: Send + Sized + 'static {
    fn adapter() -> ReturnAdapter;

    #[doc(hidden)]
    fn into_returned(self) -> Returned;

    #[doc(hidden)]
    fn into_deferred(deferred: Deferred<Self>) -> Returned {
        Returned::Deferred(Some(deferred.map(Self::into_returned)))
    }
}

macro_rules! deferred_output {
    ($completion:ident => $($ty:ty),*) => {
        $(impl DeferredOutput for $ty {
            fn adapter() -> ReturnAdapter {
                ReturnAdapter::Deferred(Completion::$completion)
            }

            fn into_returned(self) -> Returned {
                Returns::into_returned(self)
            }
        })*
    };
}

deferred_output!(Empty => ());
deferred_output!(Text => String, &'static str);
deferred_output!(Result => BoxResult, Option<BoxResult>);

impl<T> DeferredOutput for Json<T>
where
    T: Serialize + Send + 'static,
{
    fn adapter() -> ReturnAdapter {
        ReturnAdapter::Deferred(Completion::Json)
    }

    fn into_returned(self) -> Returned {
        Returns::into_returned(self)
    }
}

impl DeferredOutput for Object {
    fn adapter() -> ReturnAdapter {
        ReturnAdapter::Object
    }

    fn into_returned(self) -> Returned {
        Returned::Object(self)
    }

    fn into_deferred(deferred: Deferred<Self>) -> Returned {
        Returned::Object(Object::Deferred(deferred))
    }
}

impl<T: DeferredOutput> Returns for Deferred<T> {
    fn adapter() -> ReturnAdapter {
        T::adapter()
    }

    fn into_returned(self) -> Returned {
        T::into_deferred(self)
    }
}

impl<T: DeferredOutput> Returns for Option<Deferred<T>> {
    fn adapter() -> ReturnAdapter {
        T::adapter()
    }

    fn into_returned(self) -> Returned {
        match self {
            Some(deferred) => T::into_deferred(deferred),
            None => Returned::Deferred(None),
        }
    }
}

/// Write a handler's output with the adapter chosen for it.
pub(crate) async fn write(
    adapter: ReturnAdapter,
    returned: Returned,
    cx: &HttpContext,
) -> Result<(), Error> {
    match (adapter, returned) {
        (ReturnAdapter::Empty, _) => Ok(()),
        (ReturnAdapter::Object, Returned::Object(object)) => dispatch(object, cx).await,
        (ReturnAdapter::Deferred(completion), Returned::Deferred(deferred)) => {
            complete(completion, deferred, cx).await
        }
        (ReturnAdapter::Object, Returned::Deferred(None)) => Err(Error::NullDeferred),
        (ReturnAdapter::Text, returned @ Returned::Text(_))
        | (ReturnAdapter::Json, returned @ Returned::Json(_))
        | (ReturnAdapter::Result, returned @ Returned::Result(_)) => {
            write_value(returned, cx).await
        }
        (adapter, _) => Err(Error::Adapter { adapter }),
    }
}

async fn complete(
    completion: Completion,
    deferred: Option<Deferred<Returned>>,
    cx: &HttpContext,
) -> Result<(), Error> {
    let deferred = deferred.ok_or(Error::NullDeferred)?;

    let value = match deferred.into_ready() {
        Ok(value) => value,
        Err(pending) => {
            if completion == Completion::Text {
                cx.response().set_default_content_type(TEXT_PLAIN_UTF_8);
            }

            pending.await
        }
    };

    write_value(value, cx).await
}

/// Dispatch on an object, awaiting it first if it is deferred.
async fn dispatch(object: Object, cx: &HttpContext) -> Result<(), Error> {
    let object = match object {
        Object::Deferred(deferred) => match deferred.into_ready() {
            Ok(object) => object,
            Err(pending) => pending.await,
        },
        Object::Complete(completion, deferred) => {
            return complete(completion, Some(deferred), cx).await
        }
        object => object,
    };

    match object {
        Object::Null => {
            cx.response().write_json_bytes(b"null");
            Ok(())
        }
        Object::Text(text) => {
            write_text(&text, cx);
            Ok(())
        }
        Object::Json(value) => {
            cx.response().write_json(&value)?;
            Ok(())
        }
        Object::Result(result) => result.execute(cx).await,
        Object::Deferred(_) | Object::Complete(..) => Err(Error::NestedDeferred),
    }
}

async fn write_value(value: Returned, cx: &HttpContext) -> Result<(), Error> {
    match value {
        Returned::Unit => Ok(()),
        Returned::Text(text) => {
            write_text(&text, cx);
            Ok(())
        }
        Returned::Json(bytes) => {
            cx.response().write_json_bytes(&bytes?);
            Ok(())
        }
        Returned::Result(Some(result)) => result.execute(cx).await,
        Returned::Result(None) => Err(Error::NullResult),
        Returned::Object(_) | Returned::Deferred(_) => Err(Error::NestedDeferred),
    }
}

fn write_text(text: &str, cx: &HttpContext) {
    let response = cx.response();
    response.set_default_content_type(TEXT_PLAIN_UTF_8);
    response.write(text);
}
