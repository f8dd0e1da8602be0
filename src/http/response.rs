use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::{Bytes, BytesMut};
use http::header::{self, HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use serde::Serialize;

pub(crate) const TEXT_PLAIN_UTF_8: HeaderValue =
    HeaderValue::from_static("text/plain; charset=utf-8");
pub(crate) const APPLICATION_JSON_UTF_8: HeaderValue =
    HeaderValue::from_static("application/json; charset=utf-8");

/// The response half of an [`HttpContext`](super::HttpContext).
///
/// Writes are buffered in memory until the exchange completes and the
/// transport calls [`into_http`](HttpResponse::into_http). Clones refer
/// to the same response.
#[derive(Clone, Default)]
pub struct HttpResponse {
    state: Arc<Mutex<State>>,
}

#[derive(Default)]
struct State {
    status: StatusCode,
    headers: HeaderMap,
    body: BytesMut,
}

impl HttpResponse {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn status(&self) -> StatusCode {
        self.state().status
    }

    pub fn set_status(&self, status: StatusCode) {
        self.state().status = status;
    }

    pub fn header(&self, name: impl header::AsHeaderName) -> Option<HeaderValue> {
        self.state().headers.get(name).cloned()
    }

    pub fn insert_header(&self, name: HeaderName, value: HeaderValue) {
        self.state().headers.insert(name, value);
    }

    pub fn content_type(&self) -> Option<HeaderValue> {
        self.header(header::CONTENT_TYPE)
    }

    pub fn set_content_type(&self, value: HeaderValue) {
        self.insert_header(header::CONTENT_TYPE, value);
    }

    /// Sets the content type only if none has been set yet.
    pub fn set_default_content_type(&self, value: HeaderValue) {
        self.state()
            .headers
            .entry(header::CONTENT_TYPE)
            .or_insert(value);
    }

    /// Append bytes to the response body.
    pub fn write(&self, bytes: impl AsRef<[u8]>) {
        self.state().body.extend_from_slice(bytes.as_ref());
    }

    /// Serialize `value` as JSON into the response body.
    pub fn write_json<T>(&self, value: &T) -> Result<(), serde_json::Error>
    where
        T: Serialize + ?Sized,
    {
        let bytes = serde_json::to_vec(value)?;
        self.write_json_bytes(&bytes);
        Ok(())
    }

    pub(crate) fn write_json_bytes(&self, bytes: &[u8]) {
        let mut state = self.state();
        state
            .headers
            .insert(header::CONTENT_TYPE, APPLICATION_JSON_UTF_8);
        state.body.extend_from_slice(bytes);
    }

    /// The bytes written so far.
    pub fn body(&self) -> Bytes {
        Bytes::copy_from_slice(&self.state().body)
    }

    /// Convert the buffered state into an `http::Response`.
    pub fn into_http(&self) -> http::Response<Bytes> {
        let state = self.state();

        let mut response = http::Response::new(Bytes::copy_from_slice(&state.body));
        *response.status_mut() = state.status;
        *response.headers_mut() = state.headers.clone();
        response
    }
}
