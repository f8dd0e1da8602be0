use super::body::BodyPlan;
use super::coerce::{CoercionRegistry, CoercionUnit, Conversion, Fallback, Lookup};
use super::declare::{DeclaredType, Nullable, TypeInfo};
use super::handler::{Arguments, Invoke};
use super::param::{DefaultValue, HandlerDescriptor, Param, ParameterSpec};
use super::resolve::{BindingPlan, ContextValue, Resolver};
use super::returns::{self, ReturnAdapter};
use super::RequestDelegateOptions;
use crate::bounded::Slot;
use crate::diagnostics::Diagnostics;
use crate::http::{HttpContext, StatusCode};
use crate::{BuildError, Error};

use std::sync::Arc;

/// The compiled form of a handler, interpreted for every request.
pub(crate) struct Plan {
    pub(crate) descriptor: HandlerDescriptor,
    pub(crate) bindings: Vec<BindingPlan>,
    arguments: Vec<ArgumentPlan>,
    units: Vec<CoercionUnit>,
    body: Option<BodyPlan>,
    adapter: ReturnAdapter,
    invoker: Box<dyn Invoke>,
    diagnostics: Arc<dyn Diagnostics>,
    body_limit: usize,
}

/// How the argument at one position is produced.
enum ArgumentPlan {
    // bound by a coercion unit or the body plan
    Bound,
    Context(ContextValue),
    Service(ServicePlan),
}

struct ServicePlan {
    ty: TypeInfo,
    nullable: Option<Nullable>,
    default: Option<Fallback>,
}

impl ServicePlan {
    fn resolve(&self, cx: &HttpContext) -> Result<Slot, Error> {
        let service = cx
            .services()
            .and_then(|services| services.resolve(self.ty.id()));

        match (service, self.nullable) {
            (Some(service), Some(nullable)) => Ok((nullable.wrap)(service)),
            (Some(service), None) => Ok(service),
            (None, nullable) => match (&self.default, nullable) {
                (Some(default), _) => Ok(default()),
                (None, Some(nullable)) => Ok((nullable.none)()),
                (None, None) => Err(Error::MissingService { ty: self.ty.name() }),
            },
        }
    }
}

/// Planning state for a single handler. Dropped once the plan is built.
struct FactoryContext<'a> {
    resolver: Resolver<'a>,
    registry: &'a CoercionRegistry,
    arguments: Vec<ArgumentPlan>,
    bindings: Vec<BindingPlan>,
    units: Vec<CoercionUnit>,
    body: Option<BodyPlan>,
}

/// Merge declared parameter types with their descriptions.
pub(crate) fn describe(
    types: Vec<DeclaredType>,
    params: Vec<Param>,
    returns: ReturnAdapter,
    instance: Option<TypeInfo>,
) -> Result<HandlerDescriptor, BuildError> {
    if params.len() > types.len() {
        return Err(BuildError::ParameterCount {
            expected: types.len(),
            found: params.len(),
        });
    }

    let mut params = params.into_iter();
    let parameters = types
        .into_iter()
        .map(|ty| ParameterSpec::new(ty, params.next().unwrap_or_default()))
        .collect();

    Ok(HandlerDescriptor {
        parameters,
        returns,
        instance,
    })
}

/// Plan how every parameter of `descriptor` is bound.
pub(crate) fn compile(
    descriptor: HandlerDescriptor,
    invoker: Box<dyn Invoke>,
    options: &RequestDelegateOptions,
) -> Result<Plan, BuildError> {
    let registry = options
        .registry
        .as_deref()
        .unwrap_or_else(|| CoercionRegistry::global().as_ref());

    let mut factory = FactoryContext {
        resolver: Resolver {
            route_names: options.route_parameter_names.as_deref(),
            registry,
            services: options.services.as_deref(),
        },
        registry,
        arguments: Vec::with_capacity(descriptor.parameters.len()),
        bindings: Vec::with_capacity(descriptor.parameters.len()),
        units: Vec::new(),
        body: None,
    };

    for (index, param) in descriptor.parameters.iter().enumerate() {
        factory.add(index, param)?;
    }

    Ok(Plan {
        adapter: descriptor.returns,
        descriptor,
        bindings: factory.bindings,
        arguments: factory.arguments,
        units: factory.units,
        body: factory.body,
        invoker,
        diagnostics: options.diagnostics.clone(),
        body_limit: options.body_limit,
    })
}

impl FactoryContext<'_> {
    fn add(&mut self, index: usize, param: &ParameterSpec) -> Result<(), BuildError> {
        let name = match param.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => return Err(BuildError::UnnamedParameter { index }),
        };

        let binding = self.resolver.resolve(name, param)?;

        let argument = match &binding {
            BindingPlan::Route { key, .. } => {
                self.coerce(index, name, param, Lookup::Route(key.clone()))?
            }
            BindingPlan::Query { key, .. } => {
                self.coerce(index, name, param, Lookup::Query(key.clone()))?
            }
            BindingPlan::Header { key, .. } => {
                self.coerce(index, name, param, Lookup::Header(key.clone()))?
            }
            BindingPlan::RouteOrQuery { key, .. } => {
                self.coerce(index, name, param, Lookup::RouteOrQuery(key.clone()))?
            }
            BindingPlan::Body { allow_empty } => self.body(index, name, param, *allow_empty)?,
            BindingPlan::Service => ArgumentPlan::Service(ServicePlan {
                ty: param.ty.target(),
                nullable: param.ty.nullable(),
                default: param
                    .default
                    .as_ref()
                    .map(|default| fallback(name, &param.ty, default))
                    .transpose()?,
            }),
            BindingPlan::Context(value) => ArgumentPlan::Context(*value),
        };

        self.arguments.push(argument);
        self.bindings.push(binding);
        Ok(())
    }

    fn coerce(
        &mut self,
        index: usize,
        name: &str,
        param: &ParameterSpec,
        lookup: Lookup,
    ) -> Result<ArgumentPlan, BuildError> {
        let ty = &param.ty;
        let target = ty.target();
        let nullable = ty.nullable();

        let (conversion, zero) = if target.is::<String>() {
            let zero: Fallback = match nullable {
                Some(nullable) => Arc::new(nullable.none),
                None => Arc::new(|| Box::new(String::new()) as Slot),
            };

            (Conversion::Text, Some(zero))
        } else {
            let coercion = self
                .registry
                .get(target.id())
                .ok_or_else(|| BuildError::NoCoercion {
                    name: name.to_owned(),
                    ty: target.name(),
                })?;

            let zero: Option<Fallback> = match (nullable, coercion.zero) {
                (Some(nullable), _) => Some(Arc::new(nullable.none) as Fallback),
                (None, Some(zero)) => Some(Arc::new(zero) as Fallback),
                (None, None) => None,
            };

            (Conversion::Parse(coercion.parse), zero)
        };

        let absent = match (&param.default, zero) {
            (Some(default), _) => fallback(name, ty, default)?,
            (None, Some(zero)) => zero,
            (None, None) => {
                return Err(BuildError::NoZeroValue {
                    name: name.to_owned(),
                    ty: ty.name(),
                })
            }
        };

        self.units.push(CoercionUnit {
            index,
            name: name.to_owned(),
            type_name: ty.name(),
            lookup,
            conversion,
            wrap: nullable.map(|nullable| nullable.wrap),
            fallback: absent,
        });

        Ok(ArgumentPlan::Bound)
    }

    fn body(
        &mut self,
        index: usize,
        name: &str,
        param: &ParameterSpec,
        allow_empty: bool,
    ) -> Result<ArgumentPlan, BuildError> {
        if self.body.is_some() {
            return Err(BuildError::MultipleBodyParameters {
                name: name.to_owned(),
            });
        }

        let ty = &param.ty;
        let decode = ty.decoder().ok_or_else(|| BuildError::Unbindable {
            name: name.to_owned(),
            ty: ty.name(),
        })?;

        let empty = if allow_empty {
            match ty.empty() {
                Some(empty) if empty().is_some() => Some(empty),
                _ => {
                    return Err(BuildError::EmptyBodyUnsupported {
                        name: name.to_owned(),
                        ty: ty.name(),
                    })
                }
            }
        } else {
            None
        };

        self.body = Some(BodyPlan {
            index,
            decode,
            nullable: ty.nullable(),
            empty,
        });

        Ok(ArgumentPlan::Bound)
    }
}

/// The value used for a parameter when the request does not provide one.
fn fallback(name: &str, ty: &DeclaredType, default: &DefaultValue) -> Result<Fallback, BuildError> {
    if default.ty() == ty.ty() {
        let default = default.clone();
        return Ok(Arc::new(move || default.make()));
    }

    match ty.nullable() {
        Some(nullable) if default.ty() == nullable.inner => {
            let default = default.clone();
            Ok(Arc::new(move || (nullable.wrap)(default.make())))
        }
        _ => Err(BuildError::DefaultTypeMismatch {
            name: name.to_owned(),
            expected: ty.name(),
            found: default.ty().name(),
        }),
    }
}

impl Plan {
    /// Serve one request.
    ///
    /// Every coercion runs before the body is read, and the handler is
    /// only called once all of them succeeded.
    pub(crate) async fn run(&self, cx: &HttpContext) -> Result<(), Error> {
        let mut slots: Vec<Option<Slot>> = self.arguments.iter().map(|_| None).collect();
        let mut failed = false;

        for unit in &self.units {
            match unit.run(cx, &*self.diagnostics) {
                Some(value) => slots[unit.index] = Some(value),
                None => failed = true,
            }
        }

        if failed {
            cx.response().set_status(StatusCode::BAD_REQUEST);
            return Ok(());
        }

        if let Some(body) = &self.body {
            match body.bind(cx, self.body_limit, &*self.diagnostics).await {
                Some(value) => slots[body.index] = Some(value),
                None => return Ok(()),
            }
        }

        for (index, argument) in self.arguments.iter().enumerate() {
            match argument {
                ArgumentPlan::Bound => {}
                ArgumentPlan::Context(value) => slots[index] = Some(value.extract(cx)),
                ArgumentPlan::Service(service) => slots[index] = Some(service.resolve(cx)?),
            }
        }

        let returned = self.invoker.invoke(cx, Arguments::new(slots))?;
        returns::write(self.adapter, returned, cx).await
    }
}
