use super::{Body, HttpRequest, HttpResponse, RouteValues};
use crate::services::ServiceProvider;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Everything known about a single HTTP exchange.
///
/// `HttpContext` is a handle: clones share the same request,
/// response and cancellation state.
#[derive(Clone)]
pub struct HttpContext {
    shared: Arc<Shared>,
}

struct Shared {
    request: HttpRequest,
    response: HttpResponse,
    user: User,
    services: Option<Arc<dyn ServiceProvider>>,
    aborted: CancellationToken,
}

impl HttpContext {
    /// Create a context with no route values, services or user.
    pub fn new(request: http::Request<Body>) -> Self {
        Self::builder(request).build()
    }

    pub fn builder(request: http::Request<Body>) -> HttpContextBuilder {
        HttpContextBuilder {
            request,
            route_values: RouteValues::new(),
            user: User::anonymous(),
            services: None,
        }
    }

    pub fn request(&self) -> &HttpRequest {
        &self.shared.request
    }

    pub fn response(&self) -> &HttpResponse {
        &self.shared.response
    }

    /// The caller's identity.
    pub fn user(&self) -> &User {
        &self.shared.user
    }

    /// The service resolver scoped to this request.
    pub fn services(&self) -> Option<&Arc<dyn ServiceProvider>> {
        self.shared.services.as_ref()
    }

    /// Signalled when the exchange is aborted.
    pub fn aborted(&self) -> &CancellationToken {
        &self.shared.aborted
    }

    /// Abort the exchange.
    ///
    /// Nothing written to the response will be sent.
    pub fn abort(&self) {
        self.shared.aborted.cancel();
    }

    pub fn is_aborted(&self) -> bool {
        self.shared.aborted.is_cancelled()
    }
}

/// Builds an [`HttpContext`].
pub struct HttpContextBuilder {
    request: http::Request<Body>,
    route_values: RouteValues,
    user: User,
    services: Option<Arc<dyn ServiceProvider>>,
}

impl HttpContextBuilder {
    pub fn route_value(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.route_values.insert(name, value);
        self
    }

    pub fn route_values(mut self, values: RouteValues) -> Self {
        self.route_values = values;
        self
    }

    pub fn user(mut self, user: User) -> Self {
        self.user = user;
        self
    }

    pub fn services(mut self, services: Arc<dyn ServiceProvider>) -> Self {
        self.services = Some(services);
        self
    }

    pub fn build(self) -> HttpContext {
        HttpContext {
            shared: Arc::new(Shared {
                request: HttpRequest::new(self.request, self.route_values),
                response: HttpResponse::new(),
                user: self.user,
                services: self.services,
                aborted: CancellationToken::new(),
            }),
        }
    }
}

/// The identity of the caller.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct User {
    name: Option<String>,
    claims: Vec<(String, String)>,
}

impl User {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        User {
            name: Some(name.into()),
            claims: Vec::new(),
        }
    }

    pub fn with_claim(mut self, kind: impl Into<String>, value: impl Into<String>) -> Self {
        self.claims.push((kind.into(), value.into()));
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.name.is_some()
    }

    /// Returns the first claim of the given kind.
    pub fn claim(&self, kind: &str) -> Option<&str> {
        self.claims
            .iter()
            .find(|(k, _)| k == kind)
            .map(|(_, value)| value.as_str())
    }

    pub fn claims(&self) -> impl Iterator<Item = (&str, &str)> {
        self.claims.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// A cancellation signal shared between clones.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        // synchronizes with the Acquire load in is_cancelled
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}
