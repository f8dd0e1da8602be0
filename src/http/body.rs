use crate::bounded::{BoxError, BoxStream};

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_core::Stream;
use http::StatusCode;

/// Respresents the body of an HTTP request.
pub struct Body {
    kind: BodyKind,
}

enum BodyKind {
    Stream(BoxStream<'static, Result<Bytes, BoxError>>),
    Once(Bytes),
    Empty,
}

impl Body {
    /// Create a `Body` from a stream of bytes.
    pub fn stream<S, E>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: Into<BoxError>,
    {
        Body {
            kind: BodyKind::Stream(Box::pin(MapErr { stream })),
        }
    }

    /// Create a body directly from bytes.
    pub fn once(bytes: impl Into<Bytes>) -> Self {
        Body {
            kind: BodyKind::Once(bytes.into()),
        }
    }

    /// Create an empty `Body`.
    pub fn empty() -> Self {
        Body {
            kind: BodyKind::Empty,
        }
    }

    /// Returns the exact length of the body, if it is known
    /// without reading it.
    pub fn exact_len(&self) -> Option<u64> {
        match &self.kind {
            BodyKind::Stream(stream) => match stream.size_hint() {
                (lower, Some(upper)) if lower == upper => Some(lower as u64),
                _ => None,
            },
            BodyKind::Once(bytes) => Some(bytes.len() as u64),
            BodyKind::Empty => Some(0),
        }
    }

    /// Returns the next chunk of the body, or `None` if
    /// the body has been fully read.
    pub async fn chunk(&mut self) -> Option<Result<Bytes, BoxError>> {
        std::future::poll_fn(|cx| Pin::new(&mut *self).poll_next(cx)).await
    }
}

pin_project_lite::pin_project! {
    struct MapErr<S> {
        #[pin]
        stream: S,
    }
}

impl<S, E> Stream for MapErr<S>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<BoxError>,
{
    type Item = Result<Bytes, BoxError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.project()
            .stream
            .poll_next(cx)
            .map(|item| item.map(|chunk| chunk.map_err(Into::into)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.stream.size_hint()
    }
}

impl Stream for Body {
    type Item = Result<Bytes, BoxError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        match &mut this.kind {
            BodyKind::Stream(stream) => stream.as_mut().poll_next(cx),
            BodyKind::Once(bytes) => {
                let bytes = std::mem::take(bytes);
                this.kind = BodyKind::Empty;
                Poll::Ready(Some(Ok(bytes)))
            }
            BodyKind::Empty => Poll::Ready(None),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.kind {
            BodyKind::Stream(stream) => stream.size_hint(),
            BodyKind::Once(bytes) => (bytes.len(), Some(bytes.len())),
            BodyKind::Empty => (0, Some(0)),
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Body").finish()
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Body::once(bytes)
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::once(text)
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Body::once(text)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Body::once(bytes)
    }
}

/// An error that occurred while reading or decoding the request body.
#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    /// The body was already consumed.
    #[error("request body was already taken")]
    Taken,

    /// The body exceeded the configured limit.
    #[error("request body exceeds the {limit} byte limit")]
    TooLarge { limit: usize },

    /// The request declared a content type other than JSON.
    #[error("expected a JSON content type, found `{0}`")]
    ContentType(String),

    /// The transport failed while the body was streamed.
    #[error("failed to read request body: {0}")]
    Io(BoxError),

    /// The payload could not be deserialized.
    #[error("failed to deserialize request body: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl BodyError {
    /// The status written for this error, or `None` if the
    /// exchange should be aborted instead.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            BodyError::Io(_) => None,
            BodyError::TooLarge { .. } => Some(StatusCode::PAYLOAD_TOO_LARGE),
            BodyError::ContentType(_) => Some(StatusCode::UNSUPPORTED_MEDIA_TYPE),
            BodyError::Taken | BodyError::Malformed(_) => Some(StatusCode::BAD_REQUEST),
        }
    }
}
