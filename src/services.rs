//! Dependency injection seams.
//!
//! The delegate compiler only needs two capabilities: asking whether a type
//! is resolvable while planning, and resolving it while serving. [`Services`]
//! is a small container providing both.

use crate::bounded::Slot;
use crate::delegate::TypeInfo;

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Checks whether a declared type is resolvable as a service.
pub trait IsService: Send + Sync {
    fn is_service(&self, ty: &TypeInfo) -> bool;
}

/// Resolves services while a request is served.
pub trait ServiceProvider: Send + Sync {
    /// Returns a boxed value of the type identified by `ty`.
    fn resolve(&self, ty: TypeId) -> Option<Slot>;
}

type Factory = Arc<dyn Fn() -> Slot + Send + Sync>;

/// A map of service factories keyed by type.
#[derive(Clone, Default)]
pub struct Services {
    factories: HashMap<TypeId, Factory>,
}

impl Services {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a value that is cloned for every resolution.
    ///
    /// Shared services are usually registered as an `Arc<T>`.
    pub fn singleton<T>(self, value: T) -> Self
    where
        T: Clone + Send + Sync + 'static,
    {
        self.transient(move || value.clone())
    }

    /// Register a factory that creates a new value for every resolution.
    pub fn transient<T, F>(mut self, factory: F) -> Self
    where
        T: Send + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.factories
            .insert(TypeId::of::<T>(), Arc::new(move || Box::new(factory()) as Slot));
        self
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.factories.contains_key(&TypeId::of::<T>())
    }
}

impl IsService for Services {
    fn is_service(&self, ty: &TypeInfo) -> bool {
        self.factories.contains_key(&ty.id())
    }
}

impl ServiceProvider for Services {
    fn resolve(&self, ty: TypeId) -> Option<Slot> {
        self.factories.get(&ty).map(|factory| factory())
    }
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services")
            .field("len", &self.factories.len())
            .finish()
    }
}
