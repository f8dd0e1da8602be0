use super::{Body, BodyError};

use std::borrow::Cow;
use std::sync::{Arc, Mutex, PoisonError};

use bytes::{Bytes, BytesMut};
use http::{header, HeaderMap, Method, Uri};
use once_cell::sync::OnceCell;

/// The request half of an [`HttpContext`](super::HttpContext).
///
/// `HttpRequest` is a cheaply clonable handle; clones refer to
/// the same underlying request.
#[derive(Clone)]
pub struct HttpRequest {
    shared: Arc<Shared>,
}

struct Shared {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    route_values: RouteValues,
    query: OnceCell<Vec<(String, String)>>,
    content_length: Option<u64>,
    body: Mutex<Option<Body>>,
}

impl HttpRequest {
    pub(crate) fn new(request: http::Request<Body>, route_values: RouteValues) -> Self {
        let (parts, body) = request.into_parts();

        let content_length = parts
            .headers
            .get(header::CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok())
            .or_else(|| body.exact_len());

        HttpRequest {
            shared: Arc::new(Shared {
                method: parts.method,
                uri: parts.uri,
                headers: parts.headers,
                route_values,
                query: OnceCell::new(),
                content_length,
                body: Mutex::new(Some(body)),
            }),
        }
    }

    pub fn method(&self) -> &Method {
        &self.shared.method
    }

    pub fn uri(&self) -> &Uri {
        &self.shared.uri
    }

    pub fn path(&self) -> &str {
        self.shared.uri.path()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.shared.headers
    }

    pub fn route_values(&self) -> &RouteValues {
        &self.shared.route_values
    }

    /// Returns the route value matched for `key`.
    pub fn route_value(&self, key: &str) -> Option<&str> {
        self.shared.route_values.get(key)
    }

    /// Returns the query string value for `key`.
    ///
    /// Repeated keys are joined with a comma.
    pub fn query(&self, key: &str) -> Option<Cow<'_, str>> {
        let query = self.shared.query.get_or_init(|| {
            self.shared
                .uri
                .query()
                .and_then(|query| serde_urlencoded::from_str(query).ok())
                .unwrap_or_default()
        });

        join(
            query
                .iter()
                .filter(|(name, _)| name == key)
                .map(|(_, value)| Cow::Borrowed(value.as_str())),
        )
    }

    /// Returns the value of header `name`.
    ///
    /// Headers with multiple values are joined with a comma. Bytes that
    /// are not valid UTF-8 are replaced with `U+FFFD`.
    pub fn header(&self, name: &str) -> Option<Cow<'_, str>> {
        join(
            self.shared
                .headers
                .get_all(name)
                .iter()
                .map(|value| String::from_utf8_lossy(value.as_bytes())),
        )
    }

    /// The declared length of the body.
    ///
    /// This is the `Content-Length` header if present, otherwise
    /// the exact size of the body if it is known up front.
    pub fn content_length(&self) -> Option<u64> {
        self.shared.content_length
    }

    /// The parsed `Content-Type` header.
    pub fn content_type(&self) -> Option<mime::Mime> {
        self.shared
            .headers
            .get(header::CONTENT_TYPE)?
            .to_str()
            .ok()?
            .parse()
            .ok()
    }

    /// Take ownership of the request body.
    ///
    /// Returns `None` if the body was already taken.
    pub fn take_body(&self) -> Option<Body> {
        self.shared
            .body
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Read the request body as bytes.
    ///
    /// `limit` indicates the maximum bytes that can be read
    /// before returning an error.
    pub async fn read_body(&self, limit: usize) -> Result<Bytes, BodyError> {
        if self.content_length() > Some(limit as u64) {
            return Err(BodyError::TooLarge { limit });
        }

        let mut body = self.take_body().ok_or(BodyError::Taken)?;

        let check = |chunk: Bytes, total: usize| {
            if chunk.len() + total > limit {
                Err(BodyError::TooLarge { limit })
            } else {
                Ok(chunk)
            }
        };

        let first = match body.chunk().await {
            Some(chunk) => chunk.map_err(BodyError::Io).and_then(|b| check(b, 0))?,
            None => return Ok(Bytes::new()),
        };

        let second = match body.chunk().await {
            Some(chunk) => chunk
                .map_err(BodyError::Io)
                .and_then(|b| check(b, first.len()))?,
            None => return Ok(first),
        };

        let mut bytes = BytesMut::with_capacity(first.len() + second.len());
        bytes.extend_from_slice(&first);
        bytes.extend_from_slice(&second);

        while let Some(chunk) = body.chunk().await {
            let chunk = chunk
                .map_err(BodyError::Io)
                .and_then(|b| check(b, bytes.len()))?;

            bytes.extend_from_slice(&chunk);
        }

        Ok(bytes.freeze())
    }
}

fn join<'a>(mut values: impl Iterator<Item = Cow<'a, str>>) -> Option<Cow<'a, str>> {
    let first = values.next()?;

    match values.next() {
        None => Some(first),
        Some(second) => {
            let mut joined = format!("{},{}", first, second);
            for value in values {
                joined.push(',');
                joined.push_str(&value);
            }
            Some(Cow::Owned(joined))
        }
    }
}

/// Route parameters matched for a request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RouteValues(Vec<(String, String)>);

impl RouteValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: impl AsRef<str>) -> Option<&str> {
        let name = name.as_ref();

        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();

        match self.0.iter_mut().find(|(key, _)| *key == name) {
            Some((_, existing)) => *existing = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for RouteValues
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T>(iter: T) -> Self
    where
        T: IntoIterator<Item = (K, V)>,
    {
        let mut values = RouteValues::new();
        for (key, value) in iter {
            values.insert(key, value);
        }
        values
    }
}
