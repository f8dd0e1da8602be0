//! Values that write themselves to the response.

use crate::http::{header, Bytes, HeaderValue, HttpContext, StatusCode, TEXT_PLAIN_UTF_8};
use crate::Error;

use async_trait::async_trait;
use serde::Serialize;

/// A value that knows how to write itself to a response.
///
/// Handlers return these as [`BoxResult`], directly or deferred.
#[async_trait]
pub trait HttpResult: Send {
    async fn execute(self: Box<Self>, cx: &HttpContext) -> Result<(), Error>;
}

pub type BoxResult = Box<dyn HttpResult>;

/// Sets the response status and writes nothing else.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Status(pub StatusCode);

#[async_trait]
impl HttpResult for Status {
    async fn execute(self: Box<Self>, cx: &HttpContext) -> Result<(), Error> {
        cx.response().set_status(self.0);
        Ok(())
    }
}

/// Writes a body with an explicit content type.
#[derive(Clone, Debug)]
pub struct Content {
    status: StatusCode,
    content_type: HeaderValue,
    body: Bytes,
}

impl Content {
    pub fn new(content_type: HeaderValue, body: impl Into<Bytes>) -> Self {
        Content {
            status: StatusCode::OK,
            content_type,
            body: body.into(),
        }
    }

    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

#[async_trait]
impl HttpResult for Content {
    async fn execute(self: Box<Self>, cx: &HttpContext) -> Result<(), Error> {
        let Content {
            status,
            content_type,
            body,
        } = *self;

        let response = cx.response();
        response.set_status(status);
        response.set_content_type(content_type);
        response.write(body);
        Ok(())
    }
}

/// Serializes a value as JSON.
#[derive(Debug)]
pub struct JsonContent {
    status: StatusCode,
    body: Result<Vec<u8>, serde_json::Error>,
}

impl JsonContent {
    pub fn new<T>(value: &T) -> Self
    where
        T: Serialize + ?Sized,
    {
        JsonContent {
            status: StatusCode::OK,
            body: serde_json::to_vec(value),
        }
    }

    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

#[async_trait]
impl HttpResult for JsonContent {
    async fn execute(self: Box<Self>, cx: &HttpContext) -> Result<(), Error> {
        let JsonContent { status, body } = *self;
        let body = body?;
        cx.response().set_status(status);
        cx.response().write_json_bytes(&body);
        Ok(())
    }
}

/// Redirects to another location.
#[derive(Clone, Debug)]
pub struct Redirect {
    status: StatusCode,
    location: HeaderValue,
}

#[async_trait]
impl HttpResult for Redirect {
    async fn execute(self: Box<Self>, cx: &HttpContext) -> Result<(), Error> {
        let Redirect { status, location } = *self;
        cx.response().set_status(status);
        cx.response().insert_header(header::LOCATION, location);
        Ok(())
    }
}

/// Respond with `status` and an empty body.
pub fn status(status: StatusCode) -> BoxResult {
    Box::new(Status(status))
}

pub fn ok() -> BoxResult {
    status(StatusCode::OK)
}

pub fn no_content() -> BoxResult {
    status(StatusCode::NO_CONTENT)
}

pub fn bad_request() -> BoxResult {
    status(StatusCode::BAD_REQUEST)
}

pub fn not_found() -> BoxResult {
    status(StatusCode::NOT_FOUND)
}

/// Respond with plain text.
pub fn text(body: impl Into<String>) -> BoxResult {
    Box::new(Content::new(TEXT_PLAIN_UTF_8, body.into()))
}

/// Respond with `value` serialized as JSON.
///
/// Serialization errors surface when the result is executed.
pub fn json<T>(value: &T) -> BoxResult
where
    T: Serialize + ?Sized,
{
    Box::new(JsonContent::new(value))
}

/// Respond with a `302 Found` redirect.
///
/// Locations that are not valid header values are rejected with `None`.
pub fn redirect(location: &str) -> Option<BoxResult> {
    let location = HeaderValue::from_str(location).ok()?;

    Some(Box::new(Redirect {
        status: StatusCode::FOUND,
        location,
    }))
}
