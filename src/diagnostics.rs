//! Events reported while binding requests.

use crate::bounded::BoxError;
use crate::http::{BodyError, HttpContext};

use tracing::debug;

/// Receives binding failures.
///
/// None of these events are errors of the delegate itself, they describe
/// bad input from the client and are handled by the time they are reported.
pub trait Diagnostics: Send + Sync {
    /// The transport failed while the request body was read.
    fn request_body_io_failure(&self, cx: &HttpContext, error: &BoxError);

    /// The request body could not be accepted.
    fn request_body_invalid(&self, cx: &HttpContext, error: &BodyError);

    /// A raw value could not be coerced into a parameter's type.
    fn parameter_binding_failed(
        &self,
        cx: &HttpContext,
        type_name: &str,
        name: &str,
        value: &str,
    );
}

/// Reports binding failures as `tracing` events at the debug level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn request_body_io_failure(&self, cx: &HttpContext, error: &BoxError) {
        debug!(
            event = "RequestBodyIOException",
            method = %cx.request().method(),
            path = cx.request().path(),
            error = %error,
            "reading the request body failed with an IO error"
        );
    }

    fn request_body_invalid(&self, cx: &HttpContext, error: &BodyError) {
        debug!(
            event = "RequestBodyInvalidDataException",
            method = %cx.request().method(),
            path = cx.request().path(),
            error = %error,
            "reading the request body failed with invalid data"
        );
    }

    fn parameter_binding_failed(
        &self,
        cx: &HttpContext,
        type_name: &str,
        name: &str,
        value: &str,
    ) {
        debug!(
            event = "ParameterBindingFailed",
            method = %cx.request().method(),
            path = cx.request().path(),
            parameter_type = type_name,
            parameter_name = name,
            source_value = value,
            "failed to bind parameter \"{} {}\" from \"{}\"",
            type_name,
            name,
            value
        );
    }
}
