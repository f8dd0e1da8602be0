use super::coerce::CoercionRegistry;
use super::declare::TypeInfo;
use super::param::{ParameterSpec, Source};
use crate::bounded::Slot;
use crate::http::{CancellationToken, HttpContext, HttpRequest, HttpResponse, User};
use crate::services::IsService;
use crate::BuildError;

use std::any::TypeId;

/// Where a parameter's value comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BindingPlan {
    /// A route value, coerced into `target`.
    Route { key: String, target: TypeInfo },
    /// A query string value, coerced into `target`.
    Query { key: String, target: TypeInfo },
    /// A header value, coerced into `target`.
    Header { key: String, target: TypeInfo },
    /// A route value if present, the query string value otherwise.
    RouteOrQuery { key: String, target: TypeInfo },
    /// The JSON request body.
    Body { allow_empty: bool },
    /// A service resolved for the request.
    Service,
    /// Part of the request context.
    Context(ContextValue),
}

/// A value taken directly from the [`HttpContext`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContextValue {
    Context,
    Request,
    Response,
    User,
    Cancellation,
}

impl ContextValue {
    fn of(ty: TypeId) -> Option<Self> {
        if ty == TypeId::of::<HttpContext>() {
            Some(ContextValue::Context)
        } else if ty == TypeId::of::<HttpRequest>() {
            Some(ContextValue::Request)
        } else if ty == TypeId::of::<HttpResponse>() {
            Some(ContextValue::Response)
        } else if ty == TypeId::of::<User>() {
            Some(ContextValue::User)
        } else if ty == TypeId::of::<CancellationToken>() {
            Some(ContextValue::Cancellation)
        } else {
            None
        }
    }

    pub(crate) fn extract(self, cx: &HttpContext) -> Slot {
        match self {
            ContextValue::Context => Box::new(cx.clone()),
            ContextValue::Request => Box::new(cx.request().clone()),
            ContextValue::Response => Box::new(cx.response().clone()),
            ContextValue::User => Box::new(cx.user().clone()),
            ContextValue::Cancellation => Box::new(cx.aborted().clone()),
        }
    }
}

/// What the resolver consults besides the parameter.
pub(crate) struct Resolver<'a> {
    pub(crate) route_names: Option<&'a [String]>,
    pub(crate) registry: &'a CoercionRegistry,
    pub(crate) services: Option<&'a dyn IsService>,
}

impl Resolver<'_> {
    /// Decide where `param` is bound from. The first matching rule wins.
    pub(crate) fn resolve(
        &self,
        name: &str,
        param: &ParameterSpec,
    ) -> Result<BindingPlan, BuildError> {
        let key_or_name = |key: &Option<String>| key.clone().unwrap_or_else(|| name.to_owned());
        let target = param.ty.target();

        if let Some(source) = &param.source {
            return match source {
                Source::Route(route_key) => {
                    let key = key_or_name(route_key);

                    match self.route_names {
                        Some(names) if !names.contains(&key) => {
                            Err(BuildError::UnknownRouteParameter {
                                name: name.to_owned(),
                                key,
                            })
                        }
                        _ => Ok(BindingPlan::Route { key, target }),
                    }
                }
                Source::Query(query_key) => Ok(BindingPlan::Query {
                    key: key_or_name(query_key),
                    target,
                }),
                Source::Header(header_key) => Ok(BindingPlan::Header {
                    key: key_or_name(header_key),
                    target,
                }),
                Source::Body { allow_empty } => Ok(BindingPlan::Body {
                    allow_empty: *allow_empty,
                }),
                Source::Service => Ok(BindingPlan::Service),
            };
        }

        if let Some(value) = ContextValue::of(param.ty.ty().id()) {
            return Ok(BindingPlan::Context(value));
        }

        if target.is::<String>() || self.registry.contains(target.id()) {
            let key = name.to_owned();

            return match self.route_names {
                Some(names) if names.contains(&key) => Ok(BindingPlan::Route { key, target }),
                _ => Ok(BindingPlan::RouteOrQuery { key, target }),
            };
        }

        if let Some(services) = self.services {
            if services.is_service(&target) {
                return Ok(BindingPlan::Service);
            }
        }

        Ok(BindingPlan::Body { allow_empty: false })
    }
}
