#![allow(dead_code)]

use request_delegate::http::{Body, BodyError, HttpContext};
use request_delegate::{BoxError, Diagnostics, RequestDelegateOptions};

use std::sync::{Arc, Mutex};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    BodyIo,
    BodyInvalid,
    BindingFailed {
        ty: String,
        name: String,
        value: String,
    },
}

#[derive(Default)]
pub struct Recorder {
    events: Mutex<Vec<Event>>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

impl Diagnostics for Recorder {
    fn request_body_io_failure(&self, _: &HttpContext, _: &BoxError) {
        self.push(Event::BodyIo);
    }

    fn request_body_invalid(&self, _: &HttpContext, _: &BodyError) {
        self.push(Event::BodyInvalid);
    }

    fn parameter_binding_failed(&self, _: &HttpContext, ty: &str, name: &str, value: &str) {
        self.push(Event::BindingFailed {
            ty: ty.to_owned(),
            name: name.to_owned(),
            value: value.to_owned(),
        });
    }
}

pub fn options(recorder: &Arc<Recorder>) -> RequestDelegateOptions {
    RequestDelegateOptions::new().diagnostics(recorder.clone())
}

pub fn request(uri: &str) -> http::Request<Body> {
    http::Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn get(uri: &str) -> HttpContext {
    HttpContext::new(request(uri))
}

pub fn json_request(uri: &str, body: impl Into<Body>) -> http::Request<Body> {
    http::Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap()
}

/// Records the arguments a handler was called with.
#[derive(Clone, Default)]
pub struct Calls<T> {
    calls: Arc<Mutex<Vec<T>>>,
}

impl<T: Clone> Calls<T> {
    pub fn new() -> Self {
        Calls {
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn record(&self, value: T) {
        self.calls.lock().unwrap().push(value);
    }

    pub fn all(&self) -> Vec<T> {
        self.calls.lock().unwrap().clone()
    }
}

pub fn body_text(cx: &HttpContext) -> String {
    String::from_utf8(cx.response().body().to_vec()).unwrap()
}

pub fn content_type(cx: &HttpContext) -> Option<String> {
    cx.response()
        .content_type()
        .map(|value| value.to_str().unwrap().to_owned())
}
