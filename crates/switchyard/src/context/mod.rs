//! Context registry of shared objects available to components at deploy time.
//!
//! The [`ContextRegistry`] stores one shared instance per concrete type.
//! Registering a second instance of the same type replaces the first.
//! Components resolve these objects through
//! [`DeployContext`](crate::DeployContext) while they are constructed; the
//! registry holds a shared reference and never manages the object's
//! lifecycle beyond that.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::sync::{read, write};

/// Tracing target for context registry operations.
pub(crate) const CONTEXT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::context");

/// Type-erased context object, used to register objects of mixed types in one
/// batch.
#[derive(Clone)]
pub struct ContextObject {
    type_id: TypeId,
    type_name: &'static str,
    object: Arc<dyn Any + Send + Sync>,
}

impl ContextObject {
    /// Wraps `object`, keyed by its concrete type `T`.
    #[must_use]
    pub fn new<T: Any + Send + Sync>(object: Arc<T>) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            object,
        }
    }

    /// Returns the type name the object is registered under.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for ContextObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextObject")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// Registry of shared objects keyed by concrete type.
///
/// # Thread Safety
///
/// Lookups and registrations may run concurrently. Components only see the
/// objects registered before they were deployed.
#[derive(Default)]
pub struct ContextRegistry {
    objects: RwLock<HashMap<TypeId, ContextObject>>,
}

impl ContextRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `object` under its concrete type `T`.
    pub fn add<T: Any + Send + Sync>(&self, object: Arc<T>) {
        self.add_object(ContextObject::new(object));
    }

    /// Registers a type-erased object.
    pub fn add_object(&self, object: ContextObject) {
        let name = object.type_name;
        let replaced = write(&self.objects)
            .insert(object.type_id, object)
            .is_some();
        debug!(
            target: CONTEXT_TARGET,
            object = name,
            replaced,
            "registered context object"
        );
    }

    /// Registers every object in `objects`, in order.
    pub fn set_objects<I>(&self, objects: I)
    where
        I: IntoIterator<Item = ContextObject>,
    {
        for object in objects {
            self.add_object(object);
        }
    }

    /// Returns the object registered for `T`.
    #[must_use]
    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        let stored = read(&self.objects)
            .get(&TypeId::of::<T>())
            .map(|entry| Arc::clone(&entry.object))?;
        stored.downcast::<T>().ok()
    }

    /// Returns `true` when an object is registered for `T`.
    #[must_use]
    pub fn contains<T: Any + Send + Sync>(&self) -> bool {
        read(&self.objects).contains_key(&TypeId::of::<T>())
    }

    /// Returns the number of registered objects.
    #[must_use]
    pub fn len(&self) -> usize {
        read(&self.objects).len()
    }

    /// Returns `true` when no objects are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        read(&self.objects).is_empty()
    }
}

impl fmt::Debug for ContextRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&'static str> = read(&self.objects)
            .values()
            .map(ContextObject::type_name)
            .collect();
        f.debug_struct("ContextRegistry")
            .field("objects", &names)
            .finish()
    }
}
