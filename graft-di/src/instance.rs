//! Type-erased instances flowing through the injector.
//!
//! Every value produced by a binding is stored as an [Instance] of the binding key type. The key
//! type can be a concrete type or a `dyn Trait` - in the latter case, concrete types need to
//! implement [Implements] for the trait object type, which is usually done with the
//! `#[implements]` attribute when the `derive` feature is enabled.

use crate::error::InjectionError;
use crate::key::{BindingKey, TypeKey};
use crate::provider::ProducerPtr;
use std::any::{type_name, Any};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Pointer to injected instances.
pub type InstancePtr<T> = Arc<T>;

/// Pointer to a concrete object behind an instance, used for member injection.
pub type InstanceAnyPtr = Arc<dyn Any + Send + Sync>;

/// Casts a concrete object into an instance of a key type. Returns the object back, if it has an
/// unexpected type.
pub type CastFunction = fn(InstanceAnyPtr) -> Result<Instance, InstanceAnyPtr>;

/// Conversion of concrete instances into instances of a type they can be injected as. Every type
/// implements it for itself, while `dyn Trait` conversions are usually generated:
///
/// ```
/// use graft_di::instance::{Implements, InstancePtr};
///
/// trait Greeter: Send + Sync {}
///
/// struct EnglishGreeter;
///
/// impl Greeter for EnglishGreeter {}
///
/// impl Implements<dyn Greeter> for EnglishGreeter {
///     fn upcast(self: InstancePtr<Self>) -> InstancePtr<dyn Greeter> {
///         self
///     }
/// }
/// ```
pub trait Implements<T: ?Sized + Send + Sync + 'static>: Send + Sync + 'static {
    fn upcast(self: InstancePtr<Self>) -> InstancePtr<T>;
}

impl<T: Send + Sync + 'static> Implements<T> for T {
    #[inline]
    fn upcast(self: InstancePtr<Self>) -> InstancePtr<T> {
        self
    }
}

/// Generic [CastFunction] from `I` to `T`.
pub fn cast_into<I, T>(object: InstanceAnyPtr) -> Result<Instance, InstanceAnyPtr>
where
    I: Implements<T>,
    T: ?Sized + Send + Sync + 'static,
{
    object
        .downcast::<I>()
        .map(|object| Instance::new::<T>(<I as Implements<T>>::upcast(object)))
}

/// Type-erased, cheaply clonable value of some key type.
#[derive(Clone)]
pub struct Instance {
    // holds an InstancePtr<T> for the key type
    value: Arc<dyn Any + Send + Sync>,
    type_key: TypeKey,
}

impl Instance {
    pub fn new<T: ?Sized + Send + Sync + 'static>(value: InstancePtr<T>) -> Self {
        Self {
            value: Arc::new(value),
            type_key: TypeKey::of::<T>(),
        }
    }

    /// Returns the contained pointer, if the instance holds a value of type `T`.
    pub fn downcast<T: ?Sized + Send + Sync + 'static>(&self) -> Option<InstancePtr<T>> {
        self.value.downcast_ref::<InstancePtr<T>>().cloned()
    }

    /// Like [Instance::downcast], but reports a type mismatch for given key.
    pub fn cast<T: ?Sized + Send + Sync + 'static>(
        &self,
        key: &BindingKey,
    ) -> Result<InstancePtr<T>, InjectionError> {
        self.downcast::<T>().ok_or_else(|| InjectionError::IncompatibleType {
            key: key.clone(),
            expected: type_name::<T>(),
        })
    }

    #[inline]
    pub fn type_key(&self) -> TypeKey {
        self.type_key
    }
}

impl Debug for Instance {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("type", &self.type_key)
            .finish()
    }
}

/// Result of resolving a key, shaped by the key flags.
#[derive(Clone)]
pub enum Resolved {
    /// A value, which might be absent (null).
    Instance(Option<Instance>),
    /// A producer for keys with the provider flag.
    Provider(ProducerPtr),
    /// Values of all components of a multi-binding, in registration order.
    List(Vec<Resolved>),
}

impl Resolved {
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Instance(None))
    }
}

impl Debug for Resolved {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Instance(instance) => f.debug_tuple("Instance").field(instance).finish(),
            Self::Provider(_) => f.write_str("Provider"),
            Self::List(values) => f.debug_tuple("List").field(values).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::instance::{cast_into, Implements, Instance, InstanceAnyPtr, InstancePtr};
    use crate::key::BindingKey;

    trait Named: Send + Sync {
        fn name(&self) -> &str;
    }

    struct Component;

    impl Named for Component {
        fn name(&self) -> &str {
            "component"
        }
    }

    impl Implements<dyn Named> for Component {
        fn upcast(self: InstancePtr<Self>) -> InstancePtr<dyn Named> {
            self
        }
    }

    #[test]
    fn should_downcast_to_key_type() {
        let instance = Instance::new(InstancePtr::new(5i8));
        assert_eq!(*instance.downcast::<i8>().unwrap(), 5);
        assert!(instance.downcast::<u8>().is_none());
        assert!(instance.cast::<u8>(&BindingKey::of::<u8>()).is_err());
    }

    #[test]
    fn should_cast_into_trait_objects() {
        let object = InstancePtr::new(Component) as InstanceAnyPtr;
        let instance = cast_into::<Component, dyn Named>(object).unwrap();

        assert_eq!(instance.downcast::<dyn Named>().unwrap().name(), "component");
        assert!(instance.downcast::<Component>().is_none());
    }

    #[test]
    fn should_return_object_on_cast_mismatch() {
        let object = InstancePtr::new(1u8) as InstanceAnyPtr;
        assert!(cast_into::<Component, dyn Named>(object).is_err());
    }
}
