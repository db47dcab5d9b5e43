//! The [Injector] resolves requests for instances using bindings configured by [Module]s. Each
//! request is identified by a [BindingKey]; when the key is not bound in an injector, the request
//! is passed to its parent (if any).
//!
//! ```
//! use graft_di::binder::Binder;
//! use graft_di::injector::Injector;
//!
//! let injector = Injector::builder()
//!     .with_module(|binder: &mut Binder| {
//!         binder.bind::<String>().named("host").to_instance("localhost".to_string());
//!         binder.bind::<u16>().to_provider_fn(|| Ok(Some(8080u16)));
//!     })
//!     .build()
//!     .unwrap();
//!
//! let host = injector
//!     .get_instance_by_key::<String>(&graft_di::key::BindingKey::named::<String, _>("host"))
//!     .unwrap();
//! assert_eq!(*host, "localhost");
//!
//! let port = injector.get_provider::<u16>().unwrap();
//! assert_eq!(*port.get().unwrap(), 8080);
//! ```
//!
//! The injector binds itself, so it can be injected into created instances. The self-binding is
//! per-call: every request yields a new [InstancePtr] wrapping a handle to the same container, so
//! handles should be compared with [Injector::ptr_eq]. Bindings never hold a strong reference to
//! their own injector.

use crate::binder::{Binder, Module, ModulePtr};
use crate::binding::{Binding, SingleBinding};
use crate::error::{ConfigurationError, InjectionError};
use crate::injectable::{DescriptorRegistry, TypeDescriptor};
use crate::injection_point_loader::{
    create_injection_points, DefaultInjectionPointLoader, InjectionPointLoaderPtr,
};
use crate::injection_target::Dependency;
use crate::instance::{InstancePtr, Resolved};
use crate::key::{BindingKey, TypeKey};
use crate::listener::{InjectionListenerPtr, TypeMatcher};
use crate::provider::{InstanceProvider, Provided, Provider};
use crate::scope::{default_scopes, PerCallScope, ScopePtr, ScopeRegistry};
use fxhash::FxHashMap;
use itertools::Itertools;
use std::any::{type_name, Any};
use std::collections::hash_map::Entry;
use std::fmt::{Debug, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};
use tracing::{debug, info};

#[derive(Default)]
struct InjectorState {
    bindings: FxHashMap<BindingKey, Binding>,
    injection_listeners: Vec<(TypeMatcher, InjectionListenerPtr)>,
    disposed: bool,
}

pub(crate) struct InjectorInner {
    state: RwLock<InjectorState>,
    configured: AtomicBool,
    loader: InjectionPointLoaderPtr,
    descriptors: DescriptorRegistry,
    scopes: ScopeRegistry,
    parent: Option<Weak<InjectorInner>>,
    shares_parent_loader: bool,
}

impl InjectorInner {
    fn register(&self, binding: Binding) -> Result<(), ConfigurationError> {
        if self.configured.load(Ordering::Acquire) {
            return Err(ConfigurationError::ConfigurationClosed);
        }

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        match state.bindings.entry(binding.key().clone()) {
            Entry::Vacant(entry) => {
                entry.insert(binding);
            }
            Entry::Occupied(mut entry) => {
                let key = entry.key().clone();
                entry
                    .get_mut()
                    .merge(binding)
                    .map_err(|_| ConfigurationError::DuplicateBinding(key))?;
            }
        }

        Ok(())
    }

    fn check_usable(&self) -> Result<(), InjectionError> {
        if !self.configured.load(Ordering::Acquire) {
            return Err(InjectionError::NotConfigured);
        }

        if self
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .disposed
        {
            return Err(InjectionError::Disposed);
        }

        Ok(())
    }

    fn find_binding(&self, key: &BindingKey) -> Result<Option<Binding>, InjectionError> {
        self.check_usable()?;

        let binding = self
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .bindings
            .get(key)
            .cloned();

        match binding {
            Some(binding) => Ok(Some(binding)),
            None => match self.parent.as_ref().and_then(Weak::upgrade) {
                Some(parent) => parent.find_binding(key),
                None => Ok(None),
            },
        }
    }
}

/// Provides the injector itself.
struct InjectorProvider;

impl InstanceProvider for InjectorProvider {
    fn provide(&self, injector: &Injector) -> Result<Option<Provided>, InjectionError> {
        Ok(Some(Provided::new::<Injector, Injector>(InstancePtr::new(
            injector.clone(),
        ))))
    }

    fn target_type(&self) -> TypeKey {
        TypeKey::of::<Injector>()
    }
}

/// Dependency injection container. Cheap to clone - clones refer to the same container.
#[derive(Clone)]
pub struct Injector {
    inner: Arc<InjectorInner>,
}

impl Injector {
    pub fn builder() -> InjectorBuilder {
        InjectorBuilder::new()
    }

    /// Creates an injector with given modules. At least one module is required.
    pub fn create<I: IntoIterator<Item = ModulePtr>>(
        modules: I,
    ) -> Result<Self, ConfigurationError> {
        Self::builder().with_modules(modules).build()
    }

    pub(crate) fn upgrade(inner: &Weak<InjectorInner>) -> Result<Self, InjectionError> {
        inner
            .upgrade()
            .map(|inner| Self { inner })
            .ok_or(InjectionError::Disposed)
    }

    /// Gets a dependency of any supported type, e.g. `Vec<InstancePtr<T>>` or
    /// `Option<Provider<T>>`.
    pub fn get<D: Dependency>(&self) -> Result<D, InjectionError> {
        let target = D::target();
        let value = target.value(self)?;
        D::from_resolved(&target, value)
    }

    /// Gets an instance of `T`. Fails if there's no binding or the binding produced null.
    pub fn get_instance<T: ?Sized + Send + Sync + 'static>(
        &self,
    ) -> Result<InstancePtr<T>, InjectionError> {
        self.get_instance_by_key(&BindingKey::of::<T>())
    }

    pub fn get_instance_by_key<T: ?Sized + Send + Sync + 'static>(
        &self,
        key: &BindingKey,
    ) -> Result<InstancePtr<T>, InjectionError> {
        match self.resolve(key)? {
            Resolved::Instance(Some(instance)) => instance.cast::<T>(key),
            Resolved::Instance(None) => Err(InjectionError::NullNotAllowed {
                key: key.clone(),
                point: "Injector::get_instance".to_string(),
            }),
            _ => Err(incompatible::<T>(key)),
        }
    }

    /// Gets an instance of `T`, if there's a binding producing a non-null value.
    pub fn get_if_present<T: ?Sized + Send + Sync + 'static>(
        &self,
    ) -> Result<Option<InstancePtr<T>>, InjectionError> {
        self.get_if_present_by_key(&BindingKey::of::<T>())
    }

    pub fn get_if_present_by_key<T: ?Sized + Send + Sync + 'static>(
        &self,
        key: &BindingKey,
    ) -> Result<Option<InstancePtr<T>>, InjectionError> {
        match self.resolve_if_present(key)? {
            None | Some(Resolved::Instance(None)) => Ok(None),
            Some(Resolved::Instance(Some(instance))) => instance.cast::<T>(key).map(Some),
            Some(_) => Err(incompatible::<T>(key)),
        }
    }

    /// Gets a provider for `T` without creating an instance.
    pub fn get_provider<T: ?Sized + Send + Sync + 'static>(
        &self,
    ) -> Result<Provider<T>, InjectionError> {
        self.get_provider_by_key(&BindingKey::of::<T>())
    }

    pub fn get_provider_by_key<T: ?Sized + Send + Sync + 'static>(
        &self,
        key: &BindingKey,
    ) -> Result<Provider<T>, InjectionError> {
        let key = key.without_provider();
        match self.resolve(&key.as_provider())? {
            Resolved::Provider(producer) => Ok(Provider::new(key, producer)),
            _ => Err(incompatible::<Provider<T>>(&key)),
        }
    }

    /// Gets all values of the multi-binding of `T`.
    pub fn get_list<T: ?Sized + Send + Sync + 'static>(
        &self,
    ) -> Result<Vec<InstancePtr<T>>, InjectionError> {
        self.get()
    }

    /// Gets providers for all components of the multi-binding of `T`.
    pub fn get_provider_list<T: ?Sized + Send + Sync + 'static>(
        &self,
    ) -> Result<Vec<Provider<T>>, InjectionError> {
        self.get()
    }

    /// Resolves given key. Fails if there's no binding in this injector or its ancestors.
    pub fn resolve(&self, key: &BindingKey) -> Result<Resolved, InjectionError> {
        self.resolve_if_present(key)?
            .ok_or_else(|| InjectionError::NoSuchBinding(key.clone()))
    }

    /// Resolves given key, if there's a binding for it.
    pub fn resolve_if_present(&self, key: &BindingKey) -> Result<Option<Resolved>, InjectionError> {
        self.inner
            .find_binding(&key.without_provider())?
            .map(|binding| binding.resolve(key))
            .transpose()
    }

    /// Checks if there's a binding for given key in this injector or its ancestors.
    pub fn has_binding(&self, key: &BindingKey) -> bool {
        matches!(self.inner.find_binding(&key.without_provider()), Ok(Some(_)))
    }

    /// Injects members of an existing instance. The instance type needs a registered descriptor
    /// for any members to be injected, but injection listeners are always notified.
    pub fn inject_members<I: Send + Sync + 'static>(&self, instance: &I) -> Result<(), InjectionError> {
        self.inject_members_of(&BindingKey::of::<I>(), TypeKey::of::<I>(), instance)
    }

    pub(crate) fn inject_members_of(
        &self,
        key: &BindingKey,
        type_key: TypeKey,
        object: &dyn Any,
    ) -> Result<(), InjectionError> {
        self.inner.check_usable()?;

        let descriptors = &self.inner.descriptors;
        let points = self.inner.loader.injection_points(type_key, &|type_key| {
            descriptors
                .get(type_key)
                .map(create_injection_points)
                .unwrap_or_default()
        });

        for point in points.iter() {
            point.inject_to(Some(object), self)?;
        }

        let listeners = self
            .inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .injection_listeners
            .iter()
            .filter(|(matcher, _)| matcher(&type_key))
            .map(|(_, listener)| listener.clone())
            .collect_vec();

        for listener in listeners {
            listener.after_injection(key, object);
        }

        Ok(())
    }

    /// Returns the parent injector, if this is a child which parent still exists.
    pub fn parent(&self) -> Option<Injector> {
        self.inner
            .parent
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|inner| Self { inner })
    }

    /// Creates a child injector with additional bindings. Bindings of the child shadow bindings of
    /// this injector, while keys not bound in the child are resolved by this injector.
    pub fn create_child<I: IntoIterator<Item = ModulePtr>>(
        &self,
        modules: I,
    ) -> Result<Injector, ConfigurationError> {
        info!("Creating child injector.");

        InjectorBuilder {
            parent: Some(self.clone()),
            ..InjectorBuilder::new()
        }
        .with_modules(modules)
        .build()
    }

    /// Drops all bindings and listeners, rendering this injector unusable. The injection point
    /// cache is cleared, unless it's shared with the parent.
    pub fn dispose(&self) {
        let bindings = {
            let mut state = self
                .inner
                .state
                .write()
                .unwrap_or_else(PoisonError::into_inner);

            if state.disposed {
                return;
            }

            state.disposed = true;
            state.injection_listeners.clear();
            std::mem::take(&mut state.bindings)
        };

        // instances might hold injectors, so they're dropped outside the lock
        drop(bindings);

        if !self.inner.shares_parent_loader {
            self.inner.loader.invalidate_all();
        }

        info!("Injector disposed.");
    }

    /// Checks if both handles refer to the same injector.
    pub fn ptr_eq(&self, other: &Injector) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    #[cfg(test)]
    fn register(&self, binding: Binding) -> Result<(), ConfigurationError> {
        self.inner.register(binding)
    }
}

impl Debug for Injector {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let state = self
            .inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        f.debug_struct("Injector")
            .field("bindings", &state.bindings.len())
            .field("disposed", &state.disposed)
            .field("child", &self.inner.parent.is_some())
            .finish()
    }
}

fn incompatible<T: ?Sized>(key: &BindingKey) -> InjectionError {
    InjectionError::IncompatibleType {
        key: key.clone(),
        expected: type_name::<T>(),
    }
}

/// Builder for [Injector]s.
pub struct InjectorBuilder {
    modules: Vec<ModulePtr>,
    scopes: Vec<(String, ScopePtr)>,
    descriptors: Vec<TypeDescriptor>,
    loader: Option<InjectionPointLoaderPtr>,
    parent: Option<Injector>,
}

impl Default for InjectorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl InjectorBuilder {
    pub fn new() -> Self {
        Self {
            modules: vec![],
            scopes: vec![],
            descriptors: vec![],
            loader: None,
            parent: None,
        }
    }

    pub fn with_module<M: Module + 'static>(mut self, module: M) -> Self {
        self.modules.push(Box::new(module));
        self
    }

    pub fn with_modules<I: IntoIterator<Item = ModulePtr>>(mut self, modules: I) -> Self {
        self.modules.extend(modules);
        self
    }

    /// Adds a custom scope. Built-in scopes are always available.
    pub fn with_scope<S: Into<String>>(mut self, name: S, scope: ScopePtr) -> Self {
        self.scopes.push((name.into(), scope));
        self
    }

    /// Adds a type descriptor, in addition to statically registered ones.
    pub fn with_descriptor(mut self, descriptor: TypeDescriptor) -> Self {
        self.descriptors.push(descriptor);
        self
    }

    /// Sets a custom [InjectionPointLoader](crate::injection_point_loader::InjectionPointLoader).
    /// Child injectors share the loader of their parent by default, unless they register
    /// additional type descriptors.
    pub fn with_injection_point_loader(mut self, loader: InjectionPointLoaderPtr) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Builds the injector, initializing all eager singletons.
    pub fn build(self) -> Result<Injector, ConfigurationError> {
        if self.modules.is_empty() {
            return Err(ConfigurationError::NoModules);
        }

        let (mut scopes, mut descriptors, parent_loader) = match &self.parent {
            Some(parent) => (
                parent.inner.scopes.clone(),
                parent.inner.descriptors.clone(),
                Some(parent.inner.loader.clone()),
            ),
            None => (default_scopes(), DescriptorRegistry::from_inventory(), None),
        };

        for (name, scope) in self.scopes {
            if scopes.contains_key(&name) {
                return Err(ConfigurationError::DuplicateScope(name));
            }

            scopes.insert(name, scope);
        }

        for descriptor in self.descriptors {
            descriptors.register(descriptor);
        }

        let mut binder = Binder::new(scopes, descriptors);
        for module in &self.modules {
            binder.begin_module();
            module.configure(&mut binder);
        }

        let output = binder.finish()?;

        // cached points depend on descriptors, so the parent cache is reused only when a child
        // didn't register any descriptors of its own
        let parent_loader = parent_loader.filter(|_| {
            self.parent.as_ref().map_or(false, |parent| {
                parent.inner.descriptors.is_same_revision(&output.descriptors)
            })
        });
        let loader = self
            .loader
            .or_else(|| parent_loader.clone())
            .unwrap_or_else(|| Arc::new(DefaultInjectionPointLoader::default()));
        let shares_parent_loader = parent_loader
            .as_ref()
            .map_or(false, |parent_loader| Arc::ptr_eq(parent_loader, &loader));

        let inner = Arc::new(InjectorInner {
            state: RwLock::new(InjectorState {
                injection_listeners: output.injection_listeners,
                ..Default::default()
            }),
            configured: AtomicBool::new(false),
            loader,
            descriptors: output.descriptors,
            scopes: output.scopes,
            parent: self.parent.as_ref().map(|parent| Arc::downgrade(&parent.inner)),
            shares_parent_loader,
        });

        let self_binding = Binding::Single(Arc::new(SingleBinding::new(
            BindingKey::of::<Injector>(),
            Arc::new(InjectorProvider),
            Arc::new(PerCallScope),
        )));

        let bindings = [self_binding]
            .into_iter()
            .chain(output.bindings)
            .collect_vec();

        let singles = bindings
            .iter()
            .flat_map(|binding| match binding {
                Binding::Single(binding) => vec![binding.clone()],
                Binding::Multi { components, .. } => components.clone(),
            })
            .collect_vec();

        for binding in bindings {
            debug!(key = %binding.key(), "Registering binding.");
            inner.register(binding)?;
        }

        for binding in &singles {
            let target_type = binding.target_type();
            for (matcher, listener) in &output.binding_listeners {
                if matcher(&target_type) {
                    listener.after_binding(binding.key(), &target_type);
                }
            }
        }

        inner.configured.store(true, Ordering::Release);

        for binding in &singles {
            binding.post_configuration(Arc::downgrade(&inner));
        }

        let injector = Injector { inner };
        for binding in singles.iter().filter(|binding| binding.is_eager()) {
            binding.initialize()?;
        }

        info!(bindings = singles.len(), "Injector configured.");
        Ok(injector)
    }
}

#[cfg(test)]
mod tests {
    use crate::binder::{Binder, ModulePtr};
    use crate::binding::{Binding, SingleBinding};
    use crate::error::{ConfigurationError, InjectionError};
    use crate::injector::{Injector, InjectorProvider};
    use crate::key::{BindingKey, TypeKey};
    use crate::listener::{any, exactly, MockBindingListener};
    use crate::scope::PerCallScope;
    use mockall::predicate::eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn string_module(binder: &mut Binder) {
        binder.bind::<String>().to_instance("value".to_string());
    }

    #[test]
    fn should_reject_empty_module_list() {
        assert!(matches!(
            Injector::create(Vec::<ModulePtr>::new()),
            Err(ConfigurationError::NoModules)
        ));
    }

    #[test]
    fn should_bind_itself() {
        let injector = Injector::builder()
            .with_module(string_module)
            .build()
            .unwrap();

        let bound = injector.get_instance::<Injector>().unwrap();
        assert!(bound.ptr_eq(&injector));

        let again = injector.get_instance::<Injector>().unwrap();
        assert!(!Arc::ptr_eq(&bound, &again));
        assert!(again.ptr_eq(&bound));

        let provided = injector.get_provider::<Injector>().unwrap().get().unwrap();
        assert!(provided.ptr_eq(&injector));
    }

    #[test]
    fn should_reject_registration_after_configuration() {
        let injector = Injector::builder()
            .with_module(string_module)
            .build()
            .unwrap();

        let binding = Binding::Single(Arc::new(SingleBinding::new(
            BindingKey::of::<u8>(),
            Arc::new(InjectorProvider),
            Arc::new(PerCallScope),
        )));

        assert!(matches!(
            injector.register(binding),
            Err(ConfigurationError::ConfigurationClosed)
        ));
    }

    #[test]
    fn should_reject_duplicate_bindings() {
        let result = Injector::builder()
            .with_module(string_module)
            .with_module(string_module)
            .build();

        assert!(matches!(
            result,
            Err(ConfigurationError::DuplicateBinding(key)) if key == BindingKey::of::<String>()
        ));
    }

    #[test]
    fn should_serve_providers_for_all_bindings() {
        let injector = Injector::builder()
            .with_module(string_module)
            .build()
            .unwrap();

        assert!(injector.has_binding(&BindingKey::of::<String>()));
        assert!(injector.has_binding(&BindingKey::of::<String>().as_provider()));
        assert_eq!(
            *injector.get_provider::<String>().unwrap().get().unwrap(),
            "value"
        );
    }

    #[test]
    fn should_report_missing_bindings() {
        let injector = Injector::builder()
            .with_module(string_module)
            .build()
            .unwrap();

        assert!(matches!(
            injector.get_instance::<u8>(),
            Err(InjectionError::NoSuchBinding(_))
        ));
        assert!(injector.get_if_present::<u8>().unwrap().is_none());
        assert!(!injector.has_binding(&BindingKey::of::<u8>()));
    }

    #[test]
    fn should_notify_binding_listeners() {
        let mut listener = MockBindingListener::new();
        listener
            .expect_after_binding()
            .with(eq(BindingKey::of::<String>()), eq(TypeKey::of::<String>()))
            .times(1)
            .return_const(());

        let listener = Arc::new(listener);
        let injector = Injector::builder()
            .with_module(move |binder: &mut Binder| {
                binder.add_binding_listener(exactly::<String>(), listener.clone());
                string_module(binder);
            })
            .build();

        assert!(injector.is_ok());
    }

    #[test]
    fn should_notify_injection_listeners() {
        let calls = Arc::new(AtomicUsize::new(0));
        let injector = {
            let calls = calls.clone();
            Injector::builder()
                .with_module(move |binder: &mut Binder| {
                    let calls = calls.clone();
                    binder.add_injection_listener(any(), move |key: &BindingKey, _: &dyn std::any::Any| {
                        assert_eq!(key, &BindingKey::of::<u32>());
                        calls.fetch_add(1, Ordering::SeqCst);
                    });
                    binder.bind::<u32>().to_provider_fn(|| Ok(Some(1u32)));
                })
                .build()
                .unwrap()
        };

        injector.get_instance::<u32>().unwrap();
        injector.get_instance::<u32>().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn should_become_unusable_after_dispose() {
        let injector = Injector::builder()
            .with_module(string_module)
            .build()
            .unwrap();

        injector.dispose();
        injector.dispose();

        assert!(matches!(
            injector.get_instance::<String>(),
            Err(InjectionError::Disposed)
        ));
        assert!(!injector.has_binding(&BindingKey::of::<String>()));
    }
}
