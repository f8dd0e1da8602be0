use super::declare::{DeclaredType, TypeInfo};
use super::returns::ReturnAdapter;
use crate::bounded::Slot;

use std::fmt;
use std::sync::Arc;

/// An explicit binding source for a parameter.
///
/// Keys default to the parameter name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Source {
    Route(Option<String>),
    Query(Option<String>),
    Header(Option<String>),
    Body { allow_empty: bool },
    Service,
}

/// A typed default for a parameter.
#[derive(Clone)]
pub struct DefaultValue {
    ty: TypeInfo,
    make: Arc<dyn Fn() -> Slot + Send + Sync>,
}

impl DefaultValue {
    pub fn new<T>(value: T) -> Self
    where
        T: Clone + Send + Sync + 'static,
    {
        DefaultValue {
            ty: TypeInfo::of::<T>(),
            make: Arc::new(move || Box::new(value.clone())),
        }
    }

    pub fn ty(&self) -> TypeInfo {
        self.ty
    }

    pub(crate) fn make(&self) -> Slot {
        (self.make)()
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DefaultValue").field(&self.ty).finish()
    }
}

/// Describes a handler parameter.
///
/// Rust function signatures do not carry parameter names, so every
/// parameter is described positionally by a `Param`:
///
/// ```ignore
/// RequestDelegate::create(
///     |id: i32, verbose: Option<bool>| format!("{id}"),
///     [Param::new("id").route(), Param::new("verbose")],
///     &options,
/// )?;
/// ```
#[derive(Clone, Debug, Default)]
pub struct Param {
    name: Option<String>,
    source: Option<Source>,
    default: Option<DefaultValue>,
}

impl Param {
    pub fn new(name: impl Into<String>) -> Self {
        Param {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// A parameter with no name.
    ///
    /// Every parameter needs a name, so this only helps describe
    /// a wrong handler.
    pub fn unnamed() -> Self {
        Self::default()
    }

    /// Bind from the route value with the parameter's name.
    pub fn route(self) -> Self {
        self.source(Source::Route(None))
    }

    pub fn route_key(self, key: impl Into<String>) -> Self {
        self.source(Source::Route(Some(key.into())))
    }

    /// Bind from the query string value with the parameter's name.
    pub fn query(self) -> Self {
        self.source(Source::Query(None))
    }

    pub fn query_key(self, key: impl Into<String>) -> Self {
        self.source(Source::Query(Some(key.into())))
    }

    /// Bind from the header with the parameter's name.
    pub fn header(self) -> Self {
        self.source(Source::Header(None))
    }

    pub fn header_key(self, key: impl Into<String>) -> Self {
        self.source(Source::Header(Some(key.into())))
    }

    /// Bind from the JSON request body.
    pub fn body(self) -> Self {
        self.source(Source::Body { allow_empty: false })
    }

    /// Bind from the JSON request body, accepting an empty body.
    pub fn body_allow_empty(self) -> Self {
        self.source(Source::Body { allow_empty: true })
    }

    /// Resolve from the request's services.
    pub fn service(self) -> Self {
        self.source(Source::Service)
    }

    pub fn source(mut self, source: Source) -> Self {
        self.source = Some(source);
        self
    }

    /// The value used when the request does not provide one.
    ///
    /// For an `Option<T>` parameter, the default may be a `T`.
    pub fn default_value<T>(mut self, value: T) -> Self
    where
        T: Clone + Send + Sync + 'static,
    {
        self.default = Some(DefaultValue::new(value));
        self
    }
}

impl From<&str> for Param {
    fn from(name: &str) -> Self {
        Param::new(name)
    }
}

impl From<String> for Param {
    fn from(name: String) -> Self {
        Param::new(name)
    }
}

/// A handler parameter: its description merged with its type.
#[derive(Clone, Debug)]
pub struct ParameterSpec {
    pub(crate) name: Option<String>,
    pub(crate) ty: DeclaredType,
    pub(crate) source: Option<Source>,
    pub(crate) default: Option<DefaultValue>,
}

impl ParameterSpec {
    pub(crate) fn new(ty: DeclaredType, param: Param) -> Self {
        ParameterSpec {
            name: param.name,
            ty,
            source: param.source,
            default: param.default,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn ty(&self) -> &DeclaredType {
        &self.ty
    }

    pub fn source(&self) -> Option<&Source> {
        self.source.as_ref()
    }

    pub fn default_value(&self) -> Option<&DefaultValue> {
        self.default.as_ref()
    }
}

/// The shape of a handler.
#[derive(Clone, Debug)]
pub struct HandlerDescriptor {
    pub(crate) parameters: Vec<ParameterSpec>,
    pub(crate) returns: ReturnAdapter,
    pub(crate) instance: Option<TypeInfo>,
}

impl HandlerDescriptor {
    pub fn parameters(&self) -> &[ParameterSpec] {
        &self.parameters
    }

    pub fn returns(&self) -> ReturnAdapter {
        self.returns
    }

    /// The type of the target a method handler is called on.
    pub fn instance(&self) -> Option<TypeInfo> {
        self.instance
    }
}
