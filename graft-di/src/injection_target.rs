//! Injection targets describe a single injected slot: a constructor or method parameter, or a field.
//! Each target carries the key it needs along with flags derived from the declared dependency type:
//!
//! | Declared type | Key | Flags |
//! |---|---|---|
//! | `InstancePtr<T>` | `T` | - |
//! | `Option<D>` | as for `D` | optional |
//! | `Provider<T>` | `T` | provider |
//! | `Vec<InstancePtr<T>>` | `T` | list |
//! | `Vec<Provider<T>>` | `T` | list, provider |
//!
//! Optional targets resolve to `None` when there's no binding or the binding produced null.
//! Nullable targets allow a null value from an existing binding.

use crate::error::InjectionError;
use crate::injector::Injector;
use crate::instance::{InstancePtr, Resolved};
use crate::key::BindingKey;
use crate::provider::Provider;
use crate::qualifier::{Qualifier, QualifierAnnotation};
use std::any::type_name;
use std::collections::VecDeque;
use std::fmt::{Display, Formatter};

/// A single injected slot.
#[derive(Clone, Debug)]
pub struct InjectionTarget {
    key: BindingKey,
    optional: bool,
    nullable: bool,
    declared_type: &'static str,
}

impl InjectionTarget {
    pub fn new(key: BindingKey, declared_type: &'static str) -> Self {
        Self {
            key,
            optional: false,
            nullable: false,
            declared_type,
        }
    }

    /// Creates a target for the declared dependency type `D`.
    #[inline]
    pub fn of<D: Dependency>() -> Self {
        D::target()
    }

    /// Qualifies the key of this target with given name.
    pub fn named<N: AsRef<str>>(self, name: N) -> Self {
        self.qualified(Qualifier::named(name))
    }

    pub fn annotated<A: QualifierAnnotation>(self, annotation: A) -> Self {
        self.qualified(Qualifier::annotated(annotation))
    }

    pub fn qualified(mut self, qualifier: Qualifier) -> Self {
        self.key = self.key.with_qualifier(qualifier);
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Allows null values. A nullable target is not optional: an existing binding is always
    /// resolved, while a missing one yields null.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self.optional = false;
        self
    }

    #[inline]
    pub fn key(&self) -> &BindingKey {
        &self.key
    }

    #[inline]
    pub fn is_optional(&self) -> bool {
        self.optional
    }

    #[inline]
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    #[inline]
    pub fn declared_type(&self) -> &'static str {
        self.declared_type
    }

    /// Acquires the value for this target. `None` represents an absent binding for optional and
    /// nullable targets.
    pub fn value(&self, injector: &Injector) -> Result<Option<Resolved>, InjectionError> {
        if self.optional || self.nullable {
            injector.resolve_if_present(&self.key)
        } else {
            injector.resolve(&self.key).map(Some)
        }
    }

    fn null_error(&self) -> InjectionError {
        InjectionError::NullNotAllowed {
            key: self.key.clone(),
            point: self.to_string(),
        }
    }

    fn incompatible_error<T: ?Sized>(&self) -> InjectionError {
        InjectionError::IncompatibleType {
            key: self.key.clone(),
            expected: type_name::<T>(),
        }
    }
}

impl Display for InjectionTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (key={}", self.declared_type, self.key)?;
        if self.optional {
            f.write_str(", optional")?;
        }
        if self.nullable {
            f.write_str(", nullable")?;
        }
        f.write_str(")")
    }
}

/// Types which can be injected, e.g. constructor parameters or fields.
pub trait Dependency: Sized + 'static {
    /// The target describing how to acquire values of this type.
    fn target() -> InjectionTarget;

    /// Converts an acquired value.
    fn from_resolved(
        target: &InjectionTarget,
        value: Option<Resolved>,
    ) -> Result<Self, InjectionError>;
}

impl<T: ?Sized + Send + Sync + 'static> Dependency for InstancePtr<T> {
    fn target() -> InjectionTarget {
        InjectionTarget::new(BindingKey::of::<T>(), type_name::<Self>())
    }

    fn from_resolved(
        target: &InjectionTarget,
        value: Option<Resolved>,
    ) -> Result<Self, InjectionError> {
        match value {
            Some(Resolved::Instance(Some(instance))) => instance.cast::<T>(target.key()),
            Some(Resolved::Instance(None)) | None => Err(target.null_error()),
            Some(_) => Err(target.incompatible_error::<T>()),
        }
    }
}

impl<D: Dependency> Dependency for Option<D> {
    fn target() -> InjectionTarget {
        let target = D::target();
        InjectionTarget {
            declared_type: type_name::<Self>(),
            ..target
        }
        .optional()
    }

    fn from_resolved(
        target: &InjectionTarget,
        value: Option<Resolved>,
    ) -> Result<Self, InjectionError> {
        match value {
            None | Some(Resolved::Instance(None)) => Ok(None),
            value => D::from_resolved(target, value).map(Some),
        }
    }
}

impl<T: ?Sized + Send + Sync + 'static> Dependency for Vec<InstancePtr<T>> {
    fn target() -> InjectionTarget {
        InjectionTarget::new(BindingKey::of::<T>().as_list(), type_name::<Self>())
    }

    fn from_resolved(
        target: &InjectionTarget,
        value: Option<Resolved>,
    ) -> Result<Self, InjectionError> {
        match value {
            Some(Resolved::List(values)) => values
                .into_iter()
                .map(|value| match value {
                    Resolved::Instance(Some(instance)) => instance.cast::<T>(target.key()),
                    Resolved::Instance(None) => Err(target.null_error()),
                    Resolved::Provider(_) | Resolved::List(_) => {
                        Err(target.incompatible_error::<T>())
                    }
                })
                .collect(),
            None => Err(target.null_error()),
            Some(_) => Err(target.incompatible_error::<Self>()),
        }
    }
}

impl<T: ?Sized + Send + Sync + 'static> Dependency for Provider<T> {
    fn target() -> InjectionTarget {
        InjectionTarget::new(BindingKey::of::<T>().as_provider(), type_name::<Self>())
    }

    fn from_resolved(
        target: &InjectionTarget,
        value: Option<Resolved>,
    ) -> Result<Self, InjectionError> {
        match value {
            Some(Resolved::Provider(producer)) => {
                Ok(Provider::new(target.key().without_provider(), producer))
            }
            None => Err(target.null_error()),
            Some(_) => Err(target.incompatible_error::<Self>()),
        }
    }
}

impl<T: ?Sized + Send + Sync + 'static> Dependency for Vec<Provider<T>> {
    fn target() -> InjectionTarget {
        InjectionTarget::new(
            BindingKey::of::<T>().as_list().as_provider(),
            type_name::<Self>(),
        )
    }

    fn from_resolved(
        target: &InjectionTarget,
        value: Option<Resolved>,
    ) -> Result<Self, InjectionError> {
        let key = target.key().without_provider().without_list();
        match value {
            Some(Resolved::List(values)) => values
                .into_iter()
                .map(|value| match value {
                    Resolved::Provider(producer) => Ok(Provider::new(key.clone(), producer)),
                    _ => Err(target.incompatible_error::<Provider<T>>()),
                })
                .collect(),
            None => Err(target.null_error()),
            Some(_) => Err(target.incompatible_error::<Self>()),
        }
    }
}

/// Resolved values for a constructor or a method, consumed in declaration order.
#[derive(Debug, Default)]
pub struct Arguments {
    values: VecDeque<(InjectionTarget, Option<Resolved>)>,
}

impl Arguments {
    pub(crate) fn new(values: VecDeque<(InjectionTarget, Option<Resolved>)>) -> Self {
        Self { values }
    }

    /// Takes the next argument value.
    pub fn next<D: Dependency>(&mut self) -> Result<D, InjectionError> {
        let (target, value) = self
            .values
            .pop_front()
            .ok_or(InjectionError::MissingArgument(type_name::<D>()))?;

        D::from_resolved(&target, value)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use crate::error::InjectionError;
    use crate::injection_target::{Arguments, Dependency, InjectionTarget};
    use crate::instance::{Instance, InstancePtr, Resolved};
    use crate::key::BindingKey;
    use crate::provider::{ProducerPtr, Provider};
    use std::collections::VecDeque;
    use std::sync::Arc;

    trait Shape: Send + Sync {}

    #[test]
    fn should_derive_flags_from_declared_types() {
        let target = InjectionTarget::of::<InstancePtr<dyn Shape>>();
        assert_eq!(target.key(), &BindingKey::of::<dyn Shape>());
        assert!(!target.is_optional());

        let target = InjectionTarget::of::<Option<InstancePtr<String>>>();
        assert_eq!(target.key(), &BindingKey::of::<String>());
        assert!(target.is_optional());

        let target = InjectionTarget::of::<Vec<InstancePtr<String>>>();
        assert_eq!(target.key(), &BindingKey::of::<String>().as_list());

        let target = InjectionTarget::of::<Provider<String>>();
        assert_eq!(target.key(), &BindingKey::of::<String>().as_provider());

        let target = InjectionTarget::of::<Option<Vec<Provider<String>>>>().named("x");
        assert_eq!(
            target.key(),
            &BindingKey::named::<String, _>("x").as_list().as_provider()
        );
        assert!(target.is_optional());
    }

    #[test]
    fn should_replace_optional_with_nullable() {
        let target = InjectionTarget::of::<Option<InstancePtr<String>>>().nullable();
        assert!(target.is_nullable());
        assert!(!target.is_optional());
    }

    #[test]
    fn should_convert_optional_values() {
        let target = InjectionTarget::of::<Option<InstancePtr<i32>>>();

        let value = Option::<InstancePtr<i32>>::from_resolved(&target, None).unwrap();
        assert!(value.is_none());

        let value =
            Option::<InstancePtr<i32>>::from_resolved(&target, Some(Resolved::Instance(None)))
                .unwrap();
        assert!(value.is_none());

        let value = Option::<InstancePtr<i32>>::from_resolved(
            &target,
            Some(Resolved::Instance(Some(Instance::new(InstancePtr::new(3))))),
        )
        .unwrap();
        assert_eq!(*value.unwrap(), 3);
    }

    #[test]
    fn should_reject_null_for_required_values() {
        let target = InjectionTarget::of::<InstancePtr<i32>>();
        assert!(matches!(
            InstancePtr::<i32>::from_resolved(&target, Some(Resolved::Instance(None))),
            Err(InjectionError::NullNotAllowed { .. })
        ));
    }

    #[test]
    fn should_convert_lists() {
        let target = InjectionTarget::of::<Vec<InstancePtr<i32>>>();
        let values = Vec::<InstancePtr<i32>>::from_resolved(
            &target,
            Some(Resolved::List(vec![
                Resolved::Instance(Some(Instance::new(InstancePtr::new(1)))),
                Resolved::Instance(Some(Instance::new(InstancePtr::new(2)))),
            ])),
        )
        .unwrap();

        assert_eq!(values.iter().map(|value| **value).collect::<Vec<_>>(), [1, 2]);
    }

    #[test]
    fn should_convert_providers() {
        let producer = Arc::new(|| -> Result<Option<Instance>, InjectionError> {
            Ok(Some(Instance::new(InstancePtr::new(9i32))))
        }) as ProducerPtr;

        let target = InjectionTarget::of::<Provider<i32>>();
        let provider =
            Provider::<i32>::from_resolved(&target, Some(Resolved::Provider(producer))).unwrap();

        assert_eq!(provider.key(), &BindingKey::of::<i32>());
        assert_eq!(*provider.get().unwrap(), 9);
    }

    #[test]
    fn should_consume_arguments_in_order() {
        let mut arguments = Arguments::new(VecDeque::from([
            (
                InjectionTarget::of::<InstancePtr<i32>>(),
                Some(Resolved::Instance(Some(Instance::new(InstancePtr::new(1))))),
            ),
            (InjectionTarget::of::<Option<InstancePtr<u8>>>(), None),
        ]));

        assert_eq!(arguments.len(), 2);
        assert_eq!(*arguments.next::<InstancePtr<i32>>().unwrap(), 1);
        assert!(arguments.next::<Option<InstancePtr<u8>>>().unwrap().is_none());
        assert!(matches!(
            arguments.next::<InstancePtr<i32>>(),
            Err(InjectionError::MissingArgument(_))
        ));
    }
}
