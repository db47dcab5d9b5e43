//! Producers and providers of instances.
//!
//! A [Producer] is the type-erased unit of instance production - scopes wrap them and bindings
//! expose them for keys with the provider flag. A [Provider] is a typed handle over a producer,
//! which can be injected to defer (or repeat) instance creation:
//!
//! ```
//! use graft_di::injector::Injector;
//! use graft_di::provider::Provider;
//!
//! fn lazy_value(injector: &Injector) {
//!     // nothing is created at this point
//!     let provider: Provider<String> = injector.get_provider::<String>().unwrap();
//!     // the value is created (or taken from its scope) now
//!     let _value = provider.get().unwrap();
//! }
//! ```
//!
//! User code can plug custom creation logic into bindings by implementing [Provide].

use crate::error::{BoxError, InjectionError};
use crate::injectable::{select_constructor, ConstructorDescriptor, FactoryMethod, TypeDescriptor};
use crate::injection_point::{resolve_arguments, ExecutableInjectionPoint, InjectionPoint};
use crate::injector::Injector;
use crate::instance::{
    cast_into, CastFunction, Implements, Instance, InstanceAnyPtr, InstancePtr,
};
use crate::key::{BindingKey, TypeKey};
use std::any::{type_name, Any};
use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

/// Type-erased producer of instances.
pub trait Producer: Send + Sync {
    /// Produces an instance, which might be absent (null).
    fn produce(&self) -> Result<Option<Instance>, InjectionError>;
}

pub type ProducerPtr = Arc<dyn Producer>;

impl<F> Producer for F
where
    F: Fn() -> Result<Option<Instance>, InjectionError> + Send + Sync,
{
    #[inline]
    fn produce(&self) -> Result<Option<Instance>, InjectionError> {
        self()
    }
}

/// Typed handle for producing instances of `T`.
pub struct Provider<T: ?Sized> {
    key: BindingKey,
    producer: ProducerPtr,
    _marker: PhantomData<fn() -> InstancePtr<T>>,
}

impl<T: ?Sized + Send + Sync + 'static> Provider<T> {
    pub fn new(key: BindingKey, producer: ProducerPtr) -> Self {
        Self {
            key,
            producer,
            _marker: PhantomData,
        }
    }

    /// Gets an instance, failing when the underlying binding produced null.
    pub fn get(&self) -> Result<InstancePtr<T>, InjectionError> {
        self.get_nullable()?
            .ok_or_else(|| InjectionError::NullNotAllowed {
                key: self.key.clone(),
                point: format!("Provider<{}>::get", type_name::<T>()),
            })
    }

    /// Gets an instance, which might be absent.
    pub fn get_nullable(&self) -> Result<Option<InstancePtr<T>>, InjectionError> {
        self.producer
            .produce()?
            .map(|instance| instance.cast::<T>(&self.key))
            .transpose()
    }

    /// Key of the binding backing this provider.
    #[inline]
    pub fn key(&self) -> &BindingKey {
        &self.key
    }

    #[inline]
    pub fn producer(&self) -> &ProducerPtr {
        &self.producer
    }
}

impl<T: ?Sized> Clone for Provider<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            producer: self.producer.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: ?Sized> Debug for Provider<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider").field("key", &self.key).finish()
    }
}

/// User-defined source of instances, which can be bound with
/// [to_provider](crate::binder::BindingBuilder::to_provider) or, when the provider itself needs
/// injected dependencies, with [to_provider_type](crate::binder::BindingBuilder::to_provider_type).
/// Members of provider objects are injected once, before first use.
pub trait Provide: Send + Sync + 'static {
    type Output: Send + Sync + 'static;

    /// Creates a new value. `None` represents a null value.
    fn provide(&self) -> Result<Option<Self::Output>, BoxError>;
}

/// Value created by an [InstanceProvider]: the concrete object (subject to member injection) and
/// its view as an instance of the binding type.
#[derive(Clone)]
pub(crate) struct Provided {
    pub object: InstanceAnyPtr,
    pub object_type: TypeKey,
    pub instance: Instance,
}

impl Provided {
    pub fn new<I, T>(object: InstancePtr<I>) -> Self
    where
        I: Implements<T>,
        T: ?Sized + Send + Sync + 'static,
    {
        Self {
            object: object.clone() as InstanceAnyPtr,
            object_type: TypeKey::of::<I>(),
            instance: Instance::new::<T>(<I as Implements<T>>::upcast(object)),
        }
    }
}

/// Internal source of instances for bindings.
pub(crate) trait InstanceProvider: Send + Sync {
    fn provide(&self, injector: &Injector) -> Result<Option<Provided>, InjectionError>;

    /// Injects members of the provider object itself. Called once before first use.
    fn inject_members(&self, _injector: &Injector) -> Result<(), InjectionError> {
        Ok(())
    }

    /// Type of produced objects.
    fn target_type(&self) -> TypeKey;
}

pub(crate) type InstanceProviderPtr = Arc<dyn InstanceProvider>;

/// Always returns the same instance.
pub(crate) struct ConstantProvider {
    provided: Provided,
}

impl ConstantProvider {
    pub fn new<I, T>(instance: InstancePtr<I>) -> Self
    where
        I: Implements<T>,
        T: ?Sized + Send + Sync + 'static,
    {
        Self {
            provided: Provided::new::<I, T>(instance),
        }
    }
}

impl InstanceProvider for ConstantProvider {
    fn provide(&self, _injector: &Injector) -> Result<Option<Provided>, InjectionError> {
        Ok(Some(self.provided.clone()))
    }

    fn target_type(&self) -> TypeKey {
        self.provided.object_type
    }
}

enum ConstructorSource {
    Descriptor(fn() -> TypeDescriptor),
    Explicit(ConstructorDescriptor),
    Unusable(InjectionError),
}

/// Creates instances by invoking a constructor with injected arguments. The constructor is either
/// selected from the type descriptor or given explicitly.
pub(crate) struct ConstructorProvider {
    target: TypeKey,
    source: ConstructorSource,
    cast: CastFunction,
    point: OnceLock<Result<Arc<ExecutableInjectionPoint>, InjectionError>>,
}

impl ConstructorProvider {
    pub fn for_descriptor<I, T>(descriptor: fn() -> TypeDescriptor) -> Self
    where
        I: Implements<T>,
        T: ?Sized + Send + Sync + 'static,
    {
        Self::with_source(
            TypeKey::of::<I>(),
            ConstructorSource::Descriptor(descriptor),
            cast_into::<I, T>,
        )
    }

    pub fn for_constructor<I, T>(constructor: ConstructorDescriptor) -> Self
    where
        I: Implements<T>,
        T: ?Sized + Send + Sync + 'static,
    {
        Self::with_source(
            TypeKey::of::<I>(),
            ConstructorSource::Explicit(constructor),
            cast_into::<I, T>,
        )
    }

    /// Creates a provider for a type known only by its registered descriptor. The descriptor cast
    /// yields instances of the described type itself.
    pub fn for_registered(descriptor: &TypeDescriptor) -> Self {
        let source = match select_constructor(descriptor) {
            Ok(constructor) => ConstructorSource::Explicit(constructor),
            Err(error) => ConstructorSource::Unusable(error),
        };

        Self::with_source(descriptor.type_key(), source, descriptor.cast())
    }

    fn with_source(target: TypeKey, source: ConstructorSource, cast: CastFunction) -> Self {
        Self {
            target,
            source,
            cast,
            point: OnceLock::new(),
        }
    }

    fn create_point(&self) -> Result<Arc<ExecutableInjectionPoint>, InjectionError> {
        let constructor = match &self.source {
            ConstructorSource::Descriptor(descriptor) => select_constructor(&descriptor())?,
            ConstructorSource::Explicit(constructor) => constructor.clone(),
            ConstructorSource::Unusable(error) => return Err(error.clone()),
        };

        Ok(Arc::new(ExecutableInjectionPoint::constructor(
            self.target,
            constructor,
        )))
    }
}

impl InstanceProvider for ConstructorProvider {
    fn provide(&self, injector: &Injector) -> Result<Option<Provided>, InjectionError> {
        let point = self
            .point
            .get_or_init(|| self.create_point())
            .clone()?;

        let object = point
            .inject_to(None, injector)?
            .ok_or(InjectionError::NoUsableConstructor(self.target.name()))?;

        let instance =
            (self.cast)(object.clone()).map_err(|_| InjectionError::IncompatibleType {
                key: BindingKey::from_type_key(self.target, Default::default()),
                expected: self.target.name(),
            })?;

        Ok(Some(Provided {
            object,
            object_type: self.target,
            instance,
        }))
    }

    fn target_type(&self) -> TypeKey {
        self.target
    }
}

/// Creates instances by calling a factory method, optionally on a receiver object.
pub(crate) struct FactoryProvider<R, T: ?Sized> {
    method: FactoryMethod<R>,
    receiver: Option<InstanceAnyPtr>,
    _marker: PhantomData<fn() -> InstancePtr<T>>,
}

impl<R, T> FactoryProvider<R, T>
where
    R: Implements<T>,
    T: ?Sized + Send + Sync + 'static,
{
    pub fn new(method: FactoryMethod<R>, receiver: Option<InstanceAnyPtr>) -> Self {
        Self {
            method,
            receiver,
            _marker: PhantomData,
        }
    }
}

impl<R, T> InstanceProvider for FactoryProvider<R, T>
where
    R: Implements<T>,
    T: ?Sized + Send + Sync + 'static,
{
    fn provide(&self, injector: &Injector) -> Result<Option<Provided>, InjectionError> {
        let mut arguments = resolve_arguments(self.method.targets(), injector, &self.method)?;
        let receiver = self
            .receiver
            .as_deref()
            .map(|receiver| receiver as &dyn Any);

        let value = self
            .method
            .invoke(receiver, &mut arguments)
            .map_err(|error| InjectionError::construction(&self.method, error))?;

        Ok(Some(Provided::new::<R, T>(InstancePtr::new(value))))
    }

    fn target_type(&self) -> TypeKey {
        TypeKey::of::<R>()
    }
}

/// Delegates to a user provider object, which gets its members injected before first use.
pub(crate) struct UserProvider<P, T: ?Sized> {
    provider: InstancePtr<P>,
    _marker: PhantomData<fn() -> InstancePtr<T>>,
}

impl<P, T> UserProvider<P, T>
where
    P: Provide,
    P::Output: Implements<T>,
    T: ?Sized + Send + Sync + 'static,
{
    pub fn new(provider: P) -> Self {
        Self {
            provider: InstancePtr::new(provider),
            _marker: PhantomData,
        }
    }
}

impl<P, T> InstanceProvider for UserProvider<P, T>
where
    P: Provide,
    P::Output: Implements<T>,
    T: ?Sized + Send + Sync + 'static,
{
    fn provide(&self, _injector: &Injector) -> Result<Option<Provided>, InjectionError> {
        provide_from::<P, T>(self.provider.as_ref())
    }

    fn inject_members(&self, injector: &Injector) -> Result<(), InjectionError> {
        injector.inject_members_of(
            &BindingKey::of::<P>(),
            TypeKey::of::<P>(),
            self.provider.as_ref() as &dyn Any,
        )
    }

    fn target_type(&self) -> TypeKey {
        TypeKey::of::<P::Output>()
    }
}

/// Resolves a provider type through the injector on first use, then delegates to the cached
/// provider object.
pub(crate) struct ProviderTypeProvider<P, T: ?Sized> {
    constructor: ConstructorProvider,
    provider: Mutex<Option<InstancePtr<P>>>,
    _marker: PhantomData<fn() -> InstancePtr<T>>,
}

impl<P, T> ProviderTypeProvider<P, T>
where
    P: Provide,
    P::Output: Implements<T>,
    T: ?Sized + Send + Sync + 'static,
{
    pub fn new(descriptor: fn() -> TypeDescriptor) -> Self {
        Self {
            constructor: ConstructorProvider::for_descriptor::<P, P>(descriptor),
            provider: Mutex::new(None),
            _marker: PhantomData,
        }
    }

    fn provider(&self, injector: &Injector) -> Result<InstancePtr<P>, InjectionError> {
        let mut provider = self.provider.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(provider) = provider.as_ref() {
            return Ok(provider.clone());
        }

        let key = BindingKey::of::<P>();
        let provided = self
            .constructor
            .provide(injector)?
            .ok_or_else(|| InjectionError::NullNotAllowed {
                key: key.clone(),
                point: format!("provider type {}", type_name::<P>()),
            })?;

        injector.inject_members_of(&key, provided.object_type, provided.object.as_ref())?;

        let instance = provided.instance.cast::<P>(&key)?;
        *provider = Some(instance.clone());

        Ok(instance)
    }
}

impl<P, T> InstanceProvider for ProviderTypeProvider<P, T>
where
    P: Provide,
    P::Output: Implements<T>,
    T: ?Sized + Send + Sync + 'static,
{
    fn provide(&self, injector: &Injector) -> Result<Option<Provided>, InjectionError> {
        let provider = self.provider(injector)?;
        provide_from::<P, T>(provider.as_ref())
    }

    fn target_type(&self) -> TypeKey {
        TypeKey::of::<P::Output>()
    }
}

fn provide_from<P, T>(provider: &P) -> Result<Option<Provided>, InjectionError>
where
    P: Provide,
    P::Output: Implements<T>,
    T: ?Sized + Send + Sync + 'static,
{
    provider
        .provide()
        .map(|value| {
            value.map(|value| Provided::new::<P::Output, T>(InstancePtr::new(value)))
        })
        .map_err(|error| InjectionError::construction(&format!("provider {}", type_name::<P>()), error))
}

/// Delegates to a user function.
pub(crate) struct FnProvider<F, I, T: ?Sized> {
    function: F,
    _marker: PhantomData<fn() -> (InstancePtr<I>, InstancePtr<T>)>,
}

impl<F, I, T> FnProvider<F, I, T>
where
    F: Fn() -> Result<Option<I>, BoxError> + Send + Sync + 'static,
    I: Implements<T>,
    T: ?Sized + Send + Sync + 'static,
{
    pub fn new(function: F) -> Self {
        Self {
            function,
            _marker: PhantomData,
        }
    }
}

impl<F, I, T> InstanceProvider for FnProvider<F, I, T>
where
    F: Fn() -> Result<Option<I>, BoxError> + Send + Sync + 'static,
    I: Implements<T>,
    T: ?Sized + Send + Sync + 'static,
{
    fn provide(&self, _injector: &Injector) -> Result<Option<Provided>, InjectionError> {
        (self.function)()
            .map(|value| value.map(|value| Provided::new::<I, T>(InstancePtr::new(value))))
            .map_err(|error| {
                InjectionError::construction(&format!("provider fn {}", type_name::<F>()), error)
            })
    }

    fn target_type(&self) -> TypeKey {
        TypeKey::of::<I>()
    }
}

#[cfg(test)]
mod tests {
    use crate::error::InjectionError;
    use crate::instance::{Instance, InstancePtr};
    use crate::key::BindingKey;
    use crate::provider::{Producer, ProducerPtr, Provider};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn should_produce_typed_values() {
        let calls = Arc::new(AtomicUsize::new(0));
        let producer = {
            let calls = calls.clone();
            Arc::new(move || -> Result<Option<Instance>, InjectionError> {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Some(Instance::new(InstancePtr::new(7u16))))
            }) as ProducerPtr
        };

        let provider = Provider::<u16>::new(BindingKey::of::<u16>(), producer);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(*provider.get().unwrap(), 7);
        assert_eq!(*provider.clone().get().unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn should_reject_null_values() {
        let producer =
            Arc::new(|| -> Result<Option<Instance>, InjectionError> { Ok(None) }) as ProducerPtr;
        assert!(producer.produce().unwrap().is_none());

        let provider = Provider::<u16>::new(BindingKey::of::<u16>(), producer);
        assert!(provider.get_nullable().unwrap().is_none());
        assert!(matches!(
            provider.get().unwrap_err(),
            InjectionError::NullNotAllowed { .. }
        ));
    }

    #[test]
    fn should_reject_incompatible_values() {
        let producer = Arc::new(|| -> Result<Option<Instance>, InjectionError> {
            Ok(Some(Instance::new(InstancePtr::new(7u8))))
        }) as ProducerPtr;

        let provider = Provider::<u16>::new(BindingKey::of::<u16>(), producer);
        assert!(matches!(
            provider.get().unwrap_err(),
            InjectionError::IncompatibleType { .. }
        ));
    }
}
