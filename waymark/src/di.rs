//! Service container with per-request scopes.
//!
//! Services are registered on a [`ServiceCollection`] at startup, frozen into
//! a [`ServiceProvider`], and resolved through a [`Scope`] that lives exactly
//! as long as one request. Scoped services are created at most once per
//! scope. Dropping the last handle to a scope releases it, whatever path the
//! request took to finish.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::error::ContainerError;

type Instance = Arc<dyn Any + Send + Sync>;
type Factory = Arc<dyn Fn(&Scope) -> Result<Instance, ContainerError> + Send + Sync>;

/// A type that builds itself from a scope. Handler types implement this,
/// usually through `#[derive(Injectable)]`.
pub trait Injectable: Sized + Send + Sync + 'static {
    fn create(scope: &Scope) -> Result<Self, ContainerError>;
}

/// A parameter or field type that can be pulled out of a scope.
pub trait Resolve: Sized {
    fn resolve(scope: &Scope) -> Result<Self, ContainerError>;
}

impl<T: Send + Sync + 'static> Resolve for Arc<T> {
    fn resolve(scope: &Scope) -> Result<Self, ContainerError> {
        scope.resolve::<T>()
    }
}

#[derive(Clone)]
enum Registration {
    Singleton(Instance),
    Scoped(Factory),
}

#[derive(Clone)]
struct ServiceEntry {
    type_name: &'static str,
    registration: Registration,
}

/// Startup-time service registrations.
#[derive(Default)]
pub struct ServiceCollection {
    services: HashMap<TypeId, ServiceEntry>,
}

impl ServiceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one shared instance for the whole process.
    pub fn add_singleton<T: Send + Sync + 'static>(&mut self, instance: T) -> &mut Self {
        self.insert::<T>(Registration::Singleton(Arc::new(instance)))
    }

    /// Registers a service created once per request scope.
    pub fn add_scoped<T: Injectable>(&mut self) -> &mut Self {
        self.add_scoped_with::<T, _>(T::create)
    }

    /// Registers a scoped service with an explicit factory.
    pub fn add_scoped_with<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Scope) -> Result<T, ContainerError> + Send + Sync + 'static,
    {
        let factory: Factory =
            Arc::new(move |scope: &Scope| factory(scope).map(|v| Arc::new(v) as Instance));
        self.insert::<T>(Registration::Scoped(factory))
    }

    fn insert<T: 'static>(&mut self, registration: Registration) -> &mut Self {
        self.services.insert(
            TypeId::of::<T>(),
            ServiceEntry {
                type_name: std::any::type_name::<T>(),
                registration,
            },
        );
        self
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.services.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    pub fn build(self) -> Arc<ServiceProvider> {
        Arc::new(ServiceProvider {
            services: self.services,
            active_scopes: AtomicUsize::new(0),
            next_scope: AtomicU64::new(1),
        })
    }
}

impl fmt::Debug for ServiceCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceCollection")
            .field("service_count", &self.services.len())
            .finish()
    }
}

/// Frozen registrations, shared by every request.
pub struct ServiceProvider {
    services: HashMap<TypeId, ServiceEntry>,
    active_scopes: AtomicUsize,
    next_scope: AtomicU64,
}

impl ServiceProvider {
    /// Opens a resolution scope. It is released when the last clone drops.
    pub fn create_scope(self: &Arc<Self>) -> Scope {
        self.active_scopes.fetch_add(1, Ordering::AcqRel);
        let id = self.next_scope.fetch_add(1, Ordering::Relaxed);
        Scope {
            inner: Arc::new(ScopeInner {
                id,
                provider: Arc::clone(self),
                instances: DashMap::new(),
                resolving: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Number of scopes that have been opened and not yet released.
    pub fn active_scopes(&self) -> usize {
        self.active_scopes.load(Ordering::Acquire)
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.services.contains_key(&TypeId::of::<T>())
    }
}

impl fmt::Debug for ServiceProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceProvider")
            .field("service_count", &self.services.len())
            .field("active_scopes", &self.active_scopes())
            .finish()
    }
}

/// Per-request resolution scope. Cheap to clone.
#[derive(Clone)]
pub struct Scope {
    inner: Arc<ScopeInner>,
}

struct ScopeInner {
    id: u64,
    provider: Arc<ServiceProvider>,
    instances: DashMap<TypeId, Instance>,
    resolving: Mutex<Vec<TypeId>>,
}

impl Drop for ScopeInner {
    fn drop(&mut self) {
        self.provider.active_scopes.fetch_sub(1, Ordering::AcqRel);
        tracing::trace!(scope = self.id, instances = self.instances.len(), "scope released");
    }
}

impl Scope {
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn provider(&self) -> &Arc<ServiceProvider> {
        &self.inner.provider
    }

    pub fn resolve<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, ContainerError> {
        let type_id = TypeId::of::<T>();
        let type_name = std::any::type_name::<T>();

        let entry = self
            .inner
            .provider
            .services
            .get(&type_id)
            .ok_or(ContainerError::NotRegistered { type_name })?;

        let instance = match &entry.registration {
            Registration::Singleton(instance) => Arc::clone(instance),
            Registration::Scoped(factory) => self.scoped_instance(type_id, entry.type_name, factory)?,
        };

        instance
            .downcast::<T>()
            .map_err(|_| ContainerError::Downcast { type_name })
    }

    fn scoped_instance(
        &self,
        type_id: TypeId,
        type_name: &'static str,
        factory: &Factory,
    ) -> Result<Instance, ContainerError> {
        if let Some(existing) = self.inner.instances.get(&type_id) {
            return Ok(Arc::clone(existing.value()));
        }

        {
            let mut resolving = self.inner.resolving.lock();
            if resolving.contains(&type_id) {
                return Err(ContainerError::CircularDependency { type_name });
            }
            resolving.push(type_id);
        }

        // No map guard is held here: the factory may resolve other services.
        let created = (**factory)(self);
        self.inner.resolving.lock().retain(|id| *id != type_id);

        let created = created?;
        let stored = self.inner.instances.entry(type_id).or_insert(created);
        Ok(Arc::clone(stored.value()))
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.inner.id)
            .field("instances", &self.inner.instances.len())
            .finish()
    }
}
