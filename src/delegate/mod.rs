//! Compiling handlers into request delegates.
//!
//! A handler is planned once: each parameter is resolved to a binding
//! source and the return type to a [`ReturnAdapter`]. The resulting
//! [`RequestDelegate`] interprets that plan for every request.

mod body;
mod coerce;
mod compile;
mod declare;
mod deferred;
mod handler;
mod param;
mod resolve;
mod returns;

pub use coerce::CoercionRegistry;
pub use declare::{Declare, DeclaredType, Json, TypeInfo};
pub use deferred::Deferred;
pub use handler::{Arguments, Handler, Method};
pub use param::{DefaultValue, HandlerDescriptor, Param, ParameterSpec, Source};
pub use resolve::{BindingPlan, ContextValue};
pub use returns::{Completion, DeferredOutput, Object, ReturnAdapter, Returned, Returns};

use crate::diagnostics::{Diagnostics, TracingDiagnostics};
use crate::http::HttpContext;
use crate::services::IsService;
use crate::{BuildError, Error};

use compile::Plan;
use handler::{FnInvoker, MethodInvoker, TargetFactory};

use std::fmt;
use std::sync::Arc;

/// Configures how delegates are compiled.
#[derive(Clone)]
pub struct RequestDelegateOptions {
    pub(crate) services: Option<Arc<dyn IsService>>,
    pub(crate) route_parameter_names: Option<Vec<String>>,
    pub(crate) body_limit: usize,
    pub(crate) diagnostics: Arc<dyn Diagnostics>,
    pub(crate) registry: Option<Arc<CoercionRegistry>>,
}

impl RequestDelegateOptions {
    pub fn new() -> Self {
        RequestDelegateOptions {
            services: None,
            route_parameter_names: None,
            body_limit: 2_097_152, // (~2mb)
            diagnostics: Arc::new(TracingDiagnostics),
            registry: None,
        }
    }

    /// Decide which parameter types are services.
    pub fn services(mut self, services: Arc<dyn IsService>) -> Self {
        self.services = Some(services);
        self
    }

    /// The parameter names declared by the route pattern.
    ///
    /// When known, scalar parameters named after a route parameter bind
    /// from the route only, and explicit route bindings are checked.
    pub fn route_parameter_names<I>(mut self, names: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.route_parameter_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Set maximum number of bytes read from a request body.
    ///
    /// By default the limit is 2mb.
    pub fn body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    /// Where binding failures are reported. Defaults to [`TracingDiagnostics`].
    pub fn diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Use `registry` instead of [`CoercionRegistry::global`].
    pub fn registry(mut self, registry: Arc<CoercionRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }
}

impl Default for RequestDelegateOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RequestDelegateOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestDelegateOptions")
            .field("route_parameter_names", &self.route_parameter_names)
            .field("body_limit", &self.body_limit)
            .finish()
    }
}

/// A handler compiled into a uniform request callback.
///
/// Cloning a delegate is cheap, clones share the same plan.
#[derive(Clone)]
pub struct RequestDelegate {
    plan: Arc<Plan>,
}

impl RequestDelegate {
    /// Compile `handler`, described positionally by `params`.
    ///
    /// ```ignore
    /// let options = RequestDelegateOptions::new().route_parameter_names(["id"]);
    /// let delegate = RequestDelegate::create(
    ///     |id: i32| format!("widget {}", id),
    ///     ["id"],
    ///     &options,
    /// )?;
    /// ```
    pub fn create<H, Args, P>(
        handler: H,
        params: impl IntoIterator<Item = P>,
        options: &RequestDelegateOptions,
    ) -> Result<Self, BuildError>
    where
        H: Handler<Args>,
        Args: 'static,
        P: Into<Param>,
    {
        let descriptor = compile::describe(
            <H as Handler<Args>>::declare(),
            params.into_iter().map(Into::into).collect(),
            <H::Output as Returns>::adapter(),
            None,
        )?;

        let invoker = FnInvoker::<H, Args>::new(handler);
        let plan = compile::compile(descriptor, Box::new(invoker), options)?;

        Ok(RequestDelegate {
            plan: Arc::new(plan),
        })
    }

    /// Compile `handler`, called on a target that `target` creates for
    /// every request.
    pub fn create_method<H, T, Args, P, F>(
        handler: H,
        target: F,
        params: impl IntoIterator<Item = P>,
        options: &RequestDelegateOptions,
    ) -> Result<Self, BuildError>
    where
        H: Method<T, Args>,
        T: 'static,
        Args: 'static,
        P: Into<Param>,
        F: Fn(&HttpContext) -> T + Send + Sync + 'static,
    {
        let descriptor = compile::describe(
            <H as Method<T, Args>>::declare(),
            params.into_iter().map(Into::into).collect(),
            <H::Output as Returns>::adapter(),
            Some(TypeInfo::of::<T>()),
        )?;

        let target: TargetFactory<T> = Arc::new(target);
        let invoker = MethodInvoker::<H, T, Args>::new(handler, target);
        let plan = compile::compile(descriptor, Box::new(invoker), options)?;

        Ok(RequestDelegate {
            plan: Arc::new(plan),
        })
    }

    /// Serve a request.
    ///
    /// Bad input is answered on the response, an `Err` means the handler
    /// broke its contract.
    pub async fn invoke(&self, cx: &HttpContext) -> Result<(), Error> {
        self.plan.run(cx).await
    }

    /// Where each parameter is bound from, in parameter order.
    pub fn bindings(&self) -> &[BindingPlan] {
        &self.plan.bindings
    }

    /// The shape of the compiled handler.
    pub fn descriptor(&self) -> &HandlerDescriptor {
        &self.plan.descriptor
    }
}

impl fmt::Debug for RequestDelegate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestDelegate")
            .field("bindings", &self.plan.bindings)
            .field("returns", &self.plan.descriptor.returns)
            .finish()
    }
}
