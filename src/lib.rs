//! Compiles handler functions into uniform HTTP request delegates.
//!
//! A handler is an ordinary function or closure. Its parameters are bound
//! from the route, the query string, headers, the JSON body, services, or
//! the request context, and its return value is written to the response.
//! All of this is decided once, when the delegate is created.

mod bounded;
mod delegate;
mod diagnostics;
mod error;
mod router;
mod services;

pub mod http;
pub mod results;

pub use async_trait::async_trait;
pub use bounded::{BoxError, BoxFuture, Slot};
pub use delegate::{
    Arguments, BindingPlan, CoercionRegistry, Completion, ContextValue, Declare, DeclaredType,
    DefaultValue, Deferred, DeferredOutput, Handler, HandlerDescriptor, Json, Method, Object,
    Param, ParameterSpec, RequestDelegate, RequestDelegateOptions, ReturnAdapter, Returned,
    Returns, Source, TypeInfo,
};
pub use diagnostics::{Diagnostics, TracingDiagnostics};
pub use error::{BuildError, Error};
pub use results::{BoxResult, HttpResult};
pub use router::Router;
pub use services::{IsService, ServiceProvider, Services};
