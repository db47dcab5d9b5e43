//! Configuration of bindings. [Module]s describe bindings using a [Binder], which records them for
//! the [InjectorBuilder](crate::injector::InjectorBuilder):
//!
//! ```
//! use graft_di::binder::Binder;
//! use graft_di::injector::Injector;
//! use graft_di::scope::SINGLETON;
//! use graft_di::{implements, Injectable};
//!
//! trait Greeter: Send + Sync {
//!     fn greet(&self) -> String;
//! }
//!
//! #[derive(Injectable)]
//! struct EnglishGreeter;
//!
//! #[implements]
//! impl Greeter for EnglishGreeter {
//!     fn greet(&self) -> String {
//!         "Hello".to_string()
//!     }
//! }
//!
//! let injector = Injector::builder()
//!     .with_module(|binder: &mut Binder| {
//!         binder
//!             .bind::<dyn Greeter>()
//!             .to::<EnglishGreeter>()
//!             .in_scope(SINGLETON);
//!         binder
//!             .bind::<String>()
//!             .named("name")
//!             .to_instance("World".to_string());
//!     })
//!     .build()
//!     .unwrap();
//!
//! let greeter = injector.get_instance::<dyn Greeter>().unwrap();
//! assert_eq!(greeter.greet(), "Hello");
//! ```
//!
//! Every binding needs at most one target, qualifier and scope. When no target is given, the key
//! type itself is constructed, which requires it to have a registered type descriptor. When no
//! scope is given, the scope declared by the target type is used, falling back to the default scope
//! of the module. Mistakes are reported when the injector is built.

use crate::binding::{Binding, SingleBinding};
use crate::error::{BoxError, ConfigurationError};
use crate::injectable::{ConstructorDescriptor, DescriptorRegistry, FactoryMethod, Injectable};
use crate::instance::{Implements, InstanceAnyPtr, InstancePtr};
use crate::key::{BindingKey, TypeKey};
use crate::listener::{BindingListenerPtr, InjectionListener, InjectionListenerPtr, TypeMatcher};
use crate::provider::{
    ConstantProvider, ConstructorProvider, FactoryProvider, FnProvider, InstanceProviderPtr,
    Provide, ProviderTypeProvider, UserProvider,
};
use crate::qualifier::{Qualifier, QualifierAnnotation};
use crate::scope::{ScopePtr, ScopeRegistry, EAGER_SINGLETON, PER_CALL, SINGLETON};
use std::marker::PhantomData;
use std::sync::Arc;

/// A unit of binding configuration.
pub trait Module {
    fn configure(&self, binder: &mut Binder);
}

impl<F: Fn(&mut Binder)> Module for F {
    #[inline]
    fn configure(&self, binder: &mut Binder) {
        self(binder)
    }
}

pub type ModulePtr = Box<dyn Module>;

enum ScopeChoice {
    Named(String),
    Instance(ScopePtr),
}

enum RecordKind {
    Single,
    MultiDeclaration,
    MultiComponent(BindingKey),
}

struct BindingTarget {
    provider: InstanceProviderPtr,
    declared_scope: Option<String>,
}

struct BindingRecord {
    key: BindingKey,
    kind: RecordKind,
    qualified: bool,
    target: Option<BindingTarget>,
    scope: Option<ScopeChoice>,
    default_scope: Option<String>,
}

/// Everything recorded by a binder.
pub(crate) struct BinderOutput {
    pub bindings: Vec<Binding>,
    pub scopes: ScopeRegistry,
    pub descriptors: DescriptorRegistry,
    pub injection_listeners: Vec<(TypeMatcher, InjectionListenerPtr)>,
    pub binding_listeners: Vec<(TypeMatcher, BindingListenerPtr)>,
}

/// Records bindings, scopes and listeners of modules.
pub struct Binder {
    scopes: ScopeRegistry,
    descriptors: DescriptorRegistry,
    records: Vec<BindingRecord>,
    injection_listeners: Vec<(TypeMatcher, InjectionListenerPtr)>,
    binding_listeners: Vec<(TypeMatcher, BindingListenerPtr)>,
    default_scope: Option<String>,
    errors: Vec<ConfigurationError>,
}

impl Binder {
    pub(crate) fn new(scopes: ScopeRegistry, descriptors: DescriptorRegistry) -> Self {
        Self {
            scopes,
            descriptors,
            records: vec![],
            injection_listeners: vec![],
            binding_listeners: vec![],
            default_scope: None,
            errors: vec![],
        }
    }

    /// Prepares for configuring the next module.
    pub(crate) fn begin_module(&mut self) {
        self.default_scope = None;
    }

    /// Starts a binding for the type `T`.
    pub fn bind<T: ?Sized + Send + Sync + 'static>(&mut self) -> BindingBuilder<'_, T> {
        self.add_record(BindingKey::of::<T>(), RecordKind::Single)
    }

    /// Starts a multi-binding for the type `T`, which can be injected as a list of all values
    /// added to it.
    pub fn multi_bind<T: ?Sized + Send + Sync + 'static>(&mut self) -> MultiBinder<'_, T> {
        self.multi_bind_qualified(Qualifier::None)
    }

    pub fn multi_bind_qualified<T: ?Sized + Send + Sync + 'static>(
        &mut self,
        qualifier: Qualifier,
    ) -> MultiBinder<'_, T> {
        let key = BindingKey::qualified::<T>(qualifier).as_list();
        self.add_record::<T>(key.clone(), RecordKind::MultiDeclaration);

        MultiBinder {
            binder: self,
            key,
            _marker: PhantomData,
        }
    }

    /// Registers a custom scope under given name.
    pub fn bind_scope<S: Into<String>>(&mut self, name: S, scope: ScopePtr) {
        let name = name.into();
        if self.scopes.contains_key(&name) {
            self.errors.push(ConfigurationError::DuplicateScope(name));
        } else {
            self.scopes.insert(name, scope);
        }
    }

    /// Sets the scope used by bindings of the current module, which don't specify a scope and
    /// whose target doesn't declare one.
    pub fn set_default_scope<S: Into<String>>(&mut self, name: S) {
        self.default_scope = Some(name.into());
    }

    /// Restores the per-call default scope.
    pub fn clear_default_scope(&mut self) {
        self.default_scope = None;
    }

    pub fn add_injection_listener<L: InjectionListener + 'static>(
        &mut self,
        matcher: TypeMatcher,
        listener: L,
    ) {
        self.injection_listeners.push((matcher, Arc::new(listener)));
    }

    pub fn add_binding_listener(&mut self, matcher: TypeMatcher, listener: BindingListenerPtr) {
        self.binding_listeners.push((matcher, listener));
    }

    /// Registers a type descriptor, making the type constructible and enabling member injection.
    pub fn register_descriptor<I: Injectable>(&mut self) {
        if !self.descriptors.contains(TypeKey::of::<I>()) {
            self.descriptors.register(I::descriptor());
        }
    }

    fn add_record<T: ?Sized>(&mut self, key: BindingKey, kind: RecordKind) -> BindingBuilder<'_, T> {
        self.records.push(BindingRecord {
            key,
            kind,
            qualified: false,
            target: None,
            scope: None,
            default_scope: self.default_scope.clone(),
        });

        BindingBuilder {
            index: self.records.len() - 1,
            binder: self,
            _marker: PhantomData,
        }
    }

    fn misuse(&mut self, message: String) {
        self.errors
            .push(ConfigurationError::BindingBuilderMisuse(message));
    }

    /// Resolves recorded targets and scopes into bindings. Returns the first recorded mistake, if
    /// any.
    pub(crate) fn finish(mut self) -> Result<BinderOutput, ConfigurationError> {
        let records = std::mem::take(&mut self.records);
        let bindings = records
            .into_iter()
            .filter_map(|record| self.create_binding(record))
            .collect();

        if let Some(error) = self.errors.into_iter().next() {
            return Err(error);
        }

        Ok(BinderOutput {
            bindings,
            scopes: self.scopes,
            descriptors: self.descriptors,
            injection_listeners: self.injection_listeners,
            binding_listeners: self.binding_listeners,
        })
    }

    fn create_binding(&mut self, record: BindingRecord) -> Option<Binding> {
        let component_key = match record.kind {
            RecordKind::MultiDeclaration => {
                return Some(Binding::Multi {
                    key: record.key,
                    components: vec![],
                })
            }
            RecordKind::Single => None,
            RecordKind::MultiComponent(ref multi_key) => Some(multi_key.clone()),
        };

        let target = match record.target {
            Some(target) => target,
            None => self.registered_target(&record.key)?,
        };

        let scope = match record.scope {
            Some(ScopeChoice::Instance(scope)) => scope,
            Some(ScopeChoice::Named(name)) => self.named_scope(&name, &record.key)?,
            None => {
                let name = target
                    .declared_scope
                    .or(record.default_scope)
                    .unwrap_or_else(|| PER_CALL.to_string());
                self.named_scope(&name, &record.key)?
            }
        };

        let binding = Arc::new(SingleBinding::new(record.key, target.provider, scope));
        Some(match component_key {
            Some(key) => Binding::Multi {
                key,
                components: vec![binding],
            },
            None => Binding::Single(binding),
        })
    }

    fn registered_target(&mut self, key: &BindingKey) -> Option<BindingTarget> {
        let target = match self.descriptors.get(key.type_key()) {
            Some(descriptor) if descriptor.is_abstract() => Err(format!(
                "Binding for {key} has no target and its type is abstract"
            )),
            Some(descriptor) => Ok(BindingTarget {
                provider: Arc::new(ConstructorProvider::for_registered(descriptor)),
                declared_scope: descriptor.scope().map(str::to_string),
            }),
            None => Err(format!(
                "Binding for {key} has no target and its type has no registered descriptor"
            )),
        };

        target.map_err(|message| self.misuse(message)).ok()
    }

    fn named_scope(&mut self, name: &str, key: &BindingKey) -> Option<ScopePtr> {
        let scope = self.scopes.get(name).cloned();
        if scope.is_none() {
            self.misuse(format!("Unknown scope {name} for binding {key}"));
        }

        scope
    }
}

/// Builder for a single binding of type `T`.
pub struct BindingBuilder<'a, T: ?Sized> {
    binder: &'a mut Binder,
    index: usize,
    _marker: PhantomData<fn() -> InstancePtr<T>>,
}

impl<'a, T: ?Sized + Send + Sync + 'static> BindingBuilder<'a, T> {
    fn record(&mut self) -> &mut BindingRecord {
        &mut self.binder.records[self.index]
    }

    fn qualify(mut self, qualifier: Qualifier) -> Self {
        let record = self.record();
        let key = record.key.clone();

        let error = if matches!(record.kind, RecordKind::MultiComponent(_)) {
            Some(format!(
                "Components of multi-binding {key} can't be qualified separately"
            ))
        } else if record.qualified {
            Some(format!("Binding for {key} is already qualified"))
        } else {
            record.key = key.with_qualifier(qualifier);
            record.qualified = true;
            None
        };

        if let Some(error) = error {
            self.binder.misuse(error);
        }

        self
    }

    pub fn named<N: AsRef<str>>(self, name: N) -> Self {
        self.qualify(Qualifier::named(name))
    }

    pub fn annotated_with<A: QualifierAnnotation>(self, annotation: A) -> Self {
        self.qualify(Qualifier::annotated(annotation))
    }

    pub fn annotated_with_type<A: QualifierAnnotation + Default>(self) -> Self {
        self.qualify(Qualifier::annotated_with_type::<A>())
    }

    fn target(mut self, provider: InstanceProviderPtr, declared_scope: Option<String>) -> Self {
        let record = self.record();
        if record.target.is_some() {
            let key = record.key.clone();
            self.binder
                .misuse(format!("Binding for {key} already has a target"));
        } else {
            record.target = Some(BindingTarget {
                provider,
                declared_scope,
            });
        }

        self
    }

    /// Binds to the type `I`, constructed by the injector.
    pub fn to<I: Injectable + Implements<T>>(mut self) -> Self {
        let descriptor = I::descriptor();
        if descriptor.is_abstract() {
            let key = self.binder.records[self.index].key.clone();
            self.binder.misuse(format!(
                "Binding for {key} targets abstract type {}",
                descriptor.type_key()
            ));
            return self;
        }

        let declared_scope = descriptor.scope().map(str::to_string);
        self.binder.register_descriptor::<I>();
        self.target(
            Arc::new(ConstructorProvider::for_descriptor::<I, T>(I::descriptor)),
            declared_scope,
        )
    }

    /// Binds to given instance in the eager singleton scope. The scope can't be changed
    /// afterwards.
    pub fn to_instance<I: Implements<T>>(self, instance: I) -> Self {
        self.to_shared_instance(InstancePtr::new(instance))
    }

    pub fn to_shared_instance<I: Implements<T>>(self, instance: InstancePtr<I>) -> Self {
        self.target(Arc::new(ConstantProvider::new::<I, T>(instance)), None)
            .as_eager_singleton()
    }

    /// Binds to an explicit constructor of type `I`.
    pub fn to_constructor<I: Implements<T>>(self, constructor: ConstructorDescriptor) -> Self {
        self.target(
            Arc::new(ConstructorProvider::for_constructor::<I, T>(constructor)),
            None,
        )
    }

    /// Binds to a static factory method.
    pub fn to_factory<R: Implements<T>>(mut self, method: FactoryMethod<R>) -> Self {
        if let Err(error) = method.validate(false) {
            self.binder.errors.push(error);
            return self;
        }

        self.target(Arc::new(FactoryProvider::<R, T>::new(method, None)), None)
    }

    /// Binds to a factory method called on given receiver.
    pub fn to_factory_on<O, R>(mut self, receiver: InstancePtr<O>, method: FactoryMethod<R>) -> Self
    where
        O: Send + Sync + 'static,
        R: Implements<T>,
    {
        if let Err(error) = method.validate(true) {
            self.binder.errors.push(error);
            return self;
        }

        if let Some(receiver_type) = method.receiver_type() {
            if receiver_type != TypeKey::of::<O>() {
                self.binder.errors.push(ConfigurationError::InvalidFactoryMethod {
                    method: method.to_string(),
                    reason: format!("receiver must be of type {receiver_type}"),
                });
                return self;
            }
        }

        self.target(
            Arc::new(FactoryProvider::<R, T>::new(
                method,
                Some(receiver as InstanceAnyPtr),
            )),
            None,
        )
    }

    /// Binds to a provider object, which gets its members injected before first use.
    pub fn to_provider<P>(self, provider: P) -> Self
    where
        P: Provide,
        P::Output: Implements<T>,
    {
        self.target(Arc::new(UserProvider::<P, T>::new(provider)), None)
    }

    /// Binds to a function creating values. `None` represents a null value.
    pub fn to_provider_fn<I, F>(self, function: F) -> Self
    where
        I: Implements<T>,
        F: Fn() -> Result<Option<I>, BoxError> + Send + Sync + 'static,
    {
        self.target(Arc::new(FnProvider::<F, I, T>::new(function)), None)
    }

    /// Binds to a provider type, constructed by the injector on first use.
    pub fn to_provider_type<P>(mut self) -> Self
    where
        P: Provide + Injectable,
        P::Output: Implements<T>,
    {
        self.binder.register_descriptor::<P>();
        self.target(
            Arc::new(ProviderTypeProvider::<P, T>::new(P::descriptor)),
            None,
        )
    }

    fn scope(mut self, scope: ScopeChoice) -> Self {
        let record = self.record();
        if record.scope.is_some() {
            let key = record.key.clone();
            self.binder
                .misuse(format!("Binding for {key} already has a scope"));
        } else {
            record.scope = Some(scope);
        }

        self
    }

    pub fn in_scope<S: Into<String>>(self, name: S) -> Self {
        self.scope(ScopeChoice::Named(name.into()))
    }

    pub fn in_scope_instance(self, scope: ScopePtr) -> Self {
        self.scope(ScopeChoice::Instance(scope))
    }

    pub fn as_eager_singleton(self) -> Self {
        self.in_scope(EAGER_SINGLETON)
    }

    pub fn as_lazy_singleton(self) -> Self {
        self.in_scope(SINGLETON)
    }
}

/// Builder for components of a multi-binding.
pub struct MultiBinder<'a, T: ?Sized> {
    binder: &'a mut Binder,
    key: BindingKey,
    _marker: PhantomData<fn() -> InstancePtr<T>>,
}

impl<'a, T: ?Sized + Send + Sync + 'static> MultiBinder<'a, T> {
    /// Adds a new component. Components are injected in the order of addition.
    pub fn add_binding(&mut self) -> BindingBuilder<'_, T> {
        let key = self.key.without_list();
        self.binder
            .add_record(key, RecordKind::MultiComponent(self.key.clone()))
    }

    /// The key under which all components can be injected.
    pub fn key(&self) -> &BindingKey {
        &self.key
    }
}
