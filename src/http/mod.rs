//! The request context handed to compiled delegates.

mod body;
mod context;
mod request;
mod response;

pub use body::{Body, BodyError};
pub use context::{CancellationToken, HttpContext, HttpContextBuilder, User};
pub use request::{HttpRequest, RouteValues};
pub use response::HttpResponse;

pub(crate) use response::TEXT_PLAIN_UTF_8;

pub use bytes::Bytes;
pub use http::{header, HeaderValue, Method, StatusCode};
