use super::declare::{DecodeFn, Nullable};
use crate::bounded::Slot;
use crate::diagnostics::Diagnostics;
use crate::http::{BodyError, HttpContext, HttpRequest};

/// Binds the single body parameter of a handler.
pub(crate) struct BodyPlan {
    pub(crate) index: usize,
    pub(crate) decode: DecodeFn,
    pub(crate) nullable: Option<Nullable>,
    // present when an empty body is allowed
    pub(crate) empty: Option<fn() -> Option<Slot>>,
}

impl BodyPlan {
    /// Read and decode the body.
    ///
    /// Failures are reported and answered before returning `None`: an IO
    /// error aborts the exchange, anything else sets a client error status.
    pub(crate) async fn bind(
        &self,
        cx: &HttpContext,
        limit: usize,
        diagnostics: &dyn Diagnostics,
    ) -> Option<Slot> {
        if let Some(empty) = self.empty {
            if cx.request().content_length() == Some(0) {
                if let Some(value) = empty() {
                    return Some(value);
                }
            }
        }

        match self.read(cx.request(), limit).await {
            Ok(value) => Some(value),
            Err(BodyError::Io(err)) => {
                diagnostics.request_body_io_failure(cx, &err);
                cx.abort();
                None
            }
            Err(err) => {
                diagnostics.request_body_invalid(cx, &err);
                if let Some(status) = err.status() {
                    cx.response().set_status(status);
                }
                None
            }
        }
    }

    async fn read(&self, request: &HttpRequest, limit: usize) -> Result<Slot, BodyError> {
        if let Some(mime) = request.content_type() {
            if !is_json(&mime) {
                return Err(BodyError::ContentType(mime.to_string()));
            }
        }

        let bytes = request.read_body(limit).await?;

        match self.nullable {
            // a JSON `null` binds `None`
            Some(nullable) if serde_json::from_slice::<()>(&bytes).is_ok() => {
                Ok((nullable.none)())
            }
            Some(nullable) => Ok((nullable.wrap)((self.decode)(&bytes)?)),
            None => Ok((self.decode)(&bytes)?),
        }
    }
}

fn is_json(mime: &mime::Mime) -> bool {
    mime.subtype() == mime::JSON || mime.suffix() == Some(mime::JSON)
}
