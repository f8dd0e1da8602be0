use super::declare::TypeInfo;
use crate::bounded::Slot;
use crate::diagnostics::Diagnostics;
use crate::http::{HttpContext, HttpRequest};

use std::any::TypeId;
use std::borrow::Cow;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;

pub(crate) type ParseFn = Arc<dyn Fn(&str) -> Option<Slot> + Send + Sync>;

/// Converts raw strings into one type.
#[derive(Clone)]
pub(crate) struct Coercion {
    pub(crate) ty: TypeInfo,
    pub(crate) parse: ParseFn,
    pub(crate) zero: Option<fn() -> Slot>,
}

/// Maps types to the functions that parse them from strings.
///
/// Entries are only ever added. The first registration for a type wins,
/// later ones are ignored.
pub struct CoercionRegistry {
    entries: DashMap<TypeId, Coercion>,
}

static GLOBAL: Lazy<Arc<CoercionRegistry>> = Lazy::new(|| Arc::new(CoercionRegistry::new()));

impl CoercionRegistry {
    /// Create a registry holding the built-in scalar types.
    pub fn new() -> Self {
        let registry = Self::empty();

        registry
            .register::<i8>()
            .register::<i16>()
            .register::<i32>()
            .register::<i64>()
            .register::<i128>()
            .register::<isize>()
            .register::<u8>()
            .register::<u16>()
            .register::<u32>()
            .register::<u64>()
            .register::<u128>()
            .register::<usize>()
            .register::<f32>()
            .register::<f64>()
            .register::<char>()
            .register_with_zero(parse_bool)
            .register_without_zero::<IpAddr>()
            .register_without_zero::<Ipv4Addr>()
            .register_without_zero::<Ipv6Addr>()
            .register_without_zero::<SocketAddr>();

        registry
    }

    /// Create a registry with no entries.
    pub fn empty() -> Self {
        CoercionRegistry {
            entries: DashMap::new(),
        }
    }

    /// The registry used by delegates that were not given one.
    pub fn global() -> &'static Arc<CoercionRegistry> {
        &GLOBAL
    }

    /// Register `T` through its `FromStr` implementation. A missing value
    /// binds `T::default()`.
    pub fn register<T>(&self) -> &Self
    where
        T: FromStr + Default + Send + 'static,
    {
        self.insert::<T>(
            Arc::new(|raw: &str| raw.parse::<T>().ok().map(|value| Box::new(value) as Slot)),
            Some(zero::<T>),
        )
    }

    /// Register `T` through its `FromStr` implementation. `T` has no zero
    /// value, so parameters of this type need a default or an `Option`.
    pub fn register_without_zero<T>(&self) -> &Self
    where
        T: FromStr + Send + 'static,
    {
        self.insert::<T>(
            Arc::new(|raw: &str| raw.parse::<T>().ok().map(|value| Box::new(value) as Slot)),
            None,
        )
    }

    /// Register `T` with a custom parser.
    pub fn register_with<T, F>(&self, parse: F) -> &Self
    where
        T: Send + 'static,
        F: Fn(&str) -> Option<T> + Send + Sync + 'static,
    {
        self.insert::<T>(
            Arc::new(move |raw: &str| parse(raw).map(|value| Box::new(value) as Slot)),
            None,
        )
    }

    /// Register `T` with a custom parser. A missing value binds `T::default()`.
    pub fn register_with_zero<T, F>(&self, parse: F) -> &Self
    where
        T: Default + Send + 'static,
        F: Fn(&str) -> Option<T> + Send + Sync + 'static,
    {
        self.insert::<T>(
            Arc::new(move |raw: &str| parse(raw).map(|value| Box::new(value) as Slot)),
            Some(zero::<T>),
        )
    }

    fn insert<T: 'static>(&self, parse: ParseFn, zero: Option<fn() -> Slot>) -> &Self {
        let ty = TypeInfo::of::<T>();
        self.entries
            .entry(ty.id())
            .or_insert(Coercion { ty, parse, zero });
        self
    }

    /// Whether a coercion for `ty` is registered.
    pub fn contains(&self, ty: TypeId) -> bool {
        self.entries.contains_key(&ty)
    }

    pub(crate) fn get(&self, ty: TypeId) -> Option<Coercion> {
        self.entries.get(&ty).map(|entry| entry.value().clone())
    }
}

impl Default for CoercionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CoercionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|entry| entry.value().ty))
            .finish()
    }
}

fn zero<T: Default + Send + 'static>() -> Slot {
    Box::new(T::default())
}

fn parse_bool(raw: &str) -> Option<bool> {
    if raw.eq_ignore_ascii_case("true") {
        Some(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Where a coerced parameter reads its raw value.
#[derive(Clone, Debug)]
pub(crate) enum Lookup {
    Route(String),
    Query(String),
    Header(String),
    RouteOrQuery(String),
}

impl Lookup {
    fn read<'a>(&self, request: &'a HttpRequest) -> Option<Cow<'a, str>> {
        match self {
            Lookup::Route(key) => request.route_value(key).map(Cow::Borrowed),
            Lookup::Query(key) => request.query(key),
            Lookup::Header(key) => request.header(key),
            Lookup::RouteOrQuery(key) => request
                .route_value(key)
                .map(Cow::Borrowed)
                .or_else(|| request.query(key)),
        }
    }
}

pub(crate) enum Conversion {
    Text,
    Parse(ParseFn),
}

/// Produces a slot when no raw value is present.
pub(crate) type Fallback = Arc<dyn Fn() -> Slot + Send + Sync>;

/// Binds one parameter from a raw string.
pub(crate) struct CoercionUnit {
    pub(crate) index: usize,
    pub(crate) name: String,
    pub(crate) type_name: &'static str,
    pub(crate) lookup: Lookup,
    pub(crate) conversion: Conversion,
    pub(crate) wrap: Option<fn(Slot) -> Slot>,
    pub(crate) fallback: Fallback,
}

impl CoercionUnit {
    /// Bind the parameter for this request.
    ///
    /// Returns `None` if the raw value could not be parsed, after the
    /// failure was reported.
    pub(crate) fn run(&self, cx: &HttpContext, diagnostics: &dyn Diagnostics) -> Option<Slot> {
        let raw = match self.lookup.read(cx.request()) {
            Some(raw) => raw,
            None => return Some((self.fallback)()),
        };

        let value = match &self.conversion {
            Conversion::Text => Box::new(raw.into_owned()) as Slot,
            Conversion::Parse(parse) => match parse(&raw) {
                Some(value) => value,
                None => {
                    diagnostics.parameter_binding_failed(cx, self.type_name, &self.name, &raw);
                    return None;
                }
            },
        };

        Some(match self.wrap {
            Some(wrap) => wrap(value),
            None => value,
        })
    }
}
