use crate::bounded::Slot;
use crate::http::{CancellationToken, HttpContext, HttpRequest, HttpResponse, User};

use std::any::{self, TypeId};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use serde::de::value::{Error as ValueError, UnitDeserializer};
use serde::de::{DeserializeOwned, IntoDeserializer};
use serde::{Deserialize, Deserializer};

/// The identity and name of a Rust type.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeInfo {
    id: TypeId,
    name: &'static str,
}

impl TypeInfo {
    pub fn of<T: ?Sized + 'static>() -> Self {
        TypeInfo {
            id: TypeId::of::<T>(),
            name: any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

pub(crate) type DecodeFn = fn(&[u8]) -> Result<Slot, serde_json::Error>;

/// How an `Option<T>` declaration relates to its `T`.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Nullable {
    pub(crate) inner: TypeInfo,
    pub(crate) wrap: fn(Slot) -> Slot,
    pub(crate) none: fn() -> Slot,
}

/// What the delegate compiler knows about a parameter type.
///
/// Obtained through [`Declare::declare`].
#[derive(Clone)]
pub struct DeclaredType {
    ty: TypeInfo,
    nullable: Option<Nullable>,
    // decodes the non-nullable type
    decode: Option<DecodeFn>,
    empty: Option<fn() -> Option<Slot>>,
}

impl DeclaredType {
    /// A type that can only be bound from services, the request context, or
    /// from strings through the coercion registry.
    pub fn of<T: Send + 'static>() -> Self {
        DeclaredType {
            ty: TypeInfo::of::<T>(),
            nullable: None,
            decode: None,
            empty: None,
        }
    }

    /// A type that can be deserialized from a JSON request body.
    ///
    /// When an empty body is allowed, the value is whatever `T` deserializes
    /// from a unit, such as `()` or a unit struct.
    pub fn json<T: DeserializeOwned + Send + 'static>() -> Self {
        DeclaredType {
            decode: Some(decode::<T>),
            empty: Some(from_unit::<T>),
            ..Self::of::<T>()
        }
    }

    /// Like [`json`](Self::json), but an empty body produces `T::default()`.
    pub fn json_or_default<T: DeserializeOwned + Default + Send + 'static>() -> Self {
        DeclaredType {
            decode: Some(decode::<T>),
            empty: Some(default::<T>),
            ..Self::of::<T>()
        }
    }

    /// The declared type itself.
    pub fn ty(&self) -> TypeInfo {
        self.ty
    }

    pub fn name(&self) -> &'static str {
        self.ty.name
    }

    /// The declared type with any `Option` removed.
    pub fn target(&self) -> TypeInfo {
        self.nullable.map_or(self.ty, |nullable| nullable.inner)
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable.is_some()
    }

    /// Whether the type can be read from a request body.
    pub fn is_body(&self) -> bool {
        self.decode.is_some()
    }

    pub(crate) fn nullable(&self) -> Option<Nullable> {
        self.nullable
    }

    pub(crate) fn decoder(&self) -> Option<DecodeFn> {
        self.decode
    }

    pub(crate) fn empty(&self) -> Option<fn() -> Option<Slot>> {
        self.empty
    }
}

impl fmt::Debug for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeclaredType")
            .field("ty", &self.ty)
            .field("target", &self.target())
            .field("body", &self.is_body())
            .finish()
    }
}

fn decode<T: DeserializeOwned + Send + 'static>(bytes: &[u8]) -> Result<Slot, serde_json::Error> {
    serde_json::from_slice::<T>(bytes).map(|value| Box::new(value) as Slot)
}

fn from_unit<T: DeserializeOwned + Send + 'static>() -> Option<Slot> {
    let unit: UnitDeserializer<ValueError> = ().into_deserializer();
    T::deserialize(unit).ok().map(|value| Box::new(value) as Slot)
}

fn default<T: Default + Send + 'static>() -> Option<Slot> {
    Some(Box::new(T::default()))
}

fn wrap_some<T: Send + 'static>(slot: Slot) -> Slot {
    match slot.downcast::<T>() {
        Ok(value) => Box::new(Some(*value)),
        Err(slot) => slot,
    }
}

fn none<T: Send + 'static>() -> Slot {
    Box::new(None::<T>)
}

fn empty_none<T: Send + 'static>() -> Option<Slot> {
    Some(none::<T>())
}

/// A type that can appear as a handler parameter.
///
/// Most types implement this with an empty block and are bound through
/// the coercion registry or the service provider. Types read from the
/// request body override `declare` with [`DeclaredType::json`].
///
/// ```ignore
/// struct Clock;
/// impl Declare for Clock {}
///
/// #[derive(Deserialize)]
/// struct Todo { title: String }
///
/// impl Declare for Todo {
///     fn declare() -> DeclaredType {
///         DeclaredType::json::<Self>()
///     }
/// }
/// ```
pub trait Declare: Send + Sized + 'static {
    fn declare() -> DeclaredType {
        DeclaredType::of::<Self>()
    }
}

macro_rules! declare_json {
    ($ctor:ident => $($ty:ty),*) => {
        $(impl Declare for $ty {
            fn declare() -> DeclaredType {
                DeclaredType::$ctor::<Self>()
            }
        })*
    };
}

declare_json!(json_or_default =>
    i8, i16, i32, i64, i128, isize,
    u8, u16, u32, u64, u128, usize,
    f32, f64, bool, char, String
);

declare_json!(json => IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr);

impl Declare for HttpContext {}
impl Declare for HttpRequest {}
impl Declare for HttpResponse {}
impl Declare for User {}
impl Declare for CancellationToken {}

impl<T> Declare for Arc<T> where T: ?Sized + Send + Sync + 'static {}

impl<T: Declare> Declare for Option<T> {
    fn declare() -> DeclaredType {
        let inner = T::declare();

        DeclaredType {
            ty: TypeInfo::of::<Self>(),
            nullable: Some(Nullable {
                inner: inner.ty,
                wrap: wrap_some::<T>,
                none: none::<T>,
            }),
            decode: inner.decode,
            empty: Some(empty_none::<T>),
        }
    }
}

/// A request body deserialized from JSON, or a response serialized as JSON.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Json<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for Json<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

impl<'de, T> Deserialize<'de> for Json<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        T::deserialize(deserializer).map(Json)
    }
}

impl<T> Declare for Json<T>
where
    T: DeserializeOwned + Send + 'static,
{
    fn declare() -> DeclaredType {
        DeclaredType::json::<Self>()
    }
}
