use crate::delegate::{Handler, Param, RequestDelegate, RequestDelegateOptions};
use crate::http::{header, Body, Bytes, HeaderValue, HttpContext, Method, RouteValues, StatusCode};
use crate::services::{ServiceProvider, Services};
use crate::BuildError;

use std::collections::HashMap;
use std::sync::Arc;

use tracing::error;

/// A route table that compiles one delegate per route.
///
/// Route patterns use `matchit` syntax: `/widgets/:id` or `/files/*path`.
pub struct Router {
    options: RequestDelegateOptions,
    services: Option<Arc<dyn ServiceProvider>>,
    routes: HashMap<Method, matchit::Router<RequestDelegate>>,
}

impl Router {
    pub fn new() -> Self {
        Self::with_options(RequestDelegateOptions::new())
    }

    /// Create a router that compiles its delegates with `options`.
    ///
    /// Route parameter names are always taken from the route pattern.
    pub fn with_options(options: RequestDelegateOptions) -> Self {
        Router {
            options,
            services: None,
            routes: HashMap::with_capacity(6),
        }
    }

    /// Resolve services from `services`.
    ///
    /// Only routes added after this call bind parameters as services.
    pub fn services(mut self, services: Services) -> Self {
        self.options = self.options.services(Arc::new(services.clone()));
        self.services = Some(Arc::new(services));
        self
    }

    /// Compile `handler` and insert it for `method` and `path`.
    pub fn route<H, Args, P>(
        mut self,
        method: Method,
        path: &str,
        handler: H,
        params: impl IntoIterator<Item = P>,
    ) -> Result<Self, BuildError>
    where
        H: Handler<Args>,
        Args: 'static,
        P: Into<Param>,
    {
        let options = self
            .options
            .clone()
            .route_parameter_names(route_parameters(path));

        let delegate = RequestDelegate::create(handler, params, &options)?;
        self.routes
            .entry(method)
            .or_insert_with(matchit::Router::new)
            .insert(path, delegate)?;

        Ok(self)
    }

    fn allowed_methods(&self, path: &str) -> Vec<&str> {
        let mut allowed = self
            .routes
            .iter()
            .filter(|(method, _)| **method != Method::OPTIONS)
            .filter(|(_, node)| node.at(path).is_ok())
            .map(|(method, _)| method.as_str())
            .collect::<Vec<_>>();

        if !allowed.is_empty() {
            allowed.sort_unstable();
            allowed.push(Method::OPTIONS.as_str())
        }

        allowed
    }

    /// Serve a request.
    ///
    /// Returns `None` when the exchange was aborted and no response
    /// should be sent.
    pub async fn serve(&self, request: http::Request<Body>) -> Option<http::Response<Bytes>> {
        let path = request.uri().path().to_owned();

        let matched = self
            .routes
            .get(request.method())
            .and_then(|node| node.at(&path).ok());

        let matched = match matched {
            Some(matched) => matched,
            None => {
                let allowed = self.allowed_methods(&path);

                if allowed.is_empty() {
                    return Some(empty(StatusCode::NOT_FOUND));
                }

                let mut response = empty(StatusCode::METHOD_NOT_ALLOWED);
                if let Ok(allow) = HeaderValue::from_str(&allowed.join(", ")) {
                    response.headers_mut().insert(header::ALLOW, allow);
                }
                return Some(response);
            }
        };

        let values = matched.params.iter().collect::<RouteValues>();
        let mut builder = HttpContext::builder(request).route_values(values);
        if let Some(services) = &self.services {
            builder = builder.services(services.clone());
        }

        let cx = builder.build();
        let result = matched.value.invoke(&cx).await;

        if cx.is_aborted() {
            return None;
        }

        match result {
            Ok(()) => Some(cx.response().into_http()),
            Err(err) => {
                error!(
                    method = %cx.request().method(),
                    path = cx.request().path(),
                    error = %err,
                    "request delegate failed"
                );
                Some(empty(StatusCode::INTERNAL_SERVER_ERROR))
            }
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! insert_route {
    ($name:ident => Method::$method:ident) => {
        #[doc = concat!("Insert a route for the `", stringify!($method), "` method.")]
        pub fn $name<H, Args, P>(
            self,
            path: &str,
            handler: H,
            params: impl IntoIterator<Item = P>,
        ) -> Result<Self, BuildError>
        where
            H: Handler<Args>,
            Args: 'static,
            P: Into<Param>,
        {
            self.route(Method::$method, path, handler, params)
        }
    };
}

impl Router {
    insert_route!(get => Method::GET);
    insert_route!(put => Method::PUT);
    insert_route!(post => Method::POST);
    insert_route!(delete => Method::DELETE);
    insert_route!(patch => Method::PATCH);
}

/// The parameter names declared by a route pattern.
fn route_parameters(path: &str) -> Vec<String> {
    path.split('/')
        .filter_map(|segment| {
            segment
                .find(|c: char| c == ':' || c == '*')
                .map(|at| &segment[at + 1..])
        })
        .filter(|name| !name.is_empty())
        .map(str::to_owned)
        .collect()
}

fn empty(status: StatusCode) -> http::Response<Bytes> {
    let mut response = http::Response::new(Bytes::new());
    *response.status_mut() = status;
    response
}

#[cfg(test)]
mod tests {
    use super::route_parameters;

    #[test]
    fn route_parameters_from_pattern() {
        assert_eq!(route_parameters("/widgets/:id"), ["id"]);
        assert_eq!(route_parameters("/a/:x/b/:y"), ["x", "y"]);
        assert_eq!(route_parameters("/files/*path"), ["path"]);
        assert!(route_parameters("/plain").is_empty());
    }
}
