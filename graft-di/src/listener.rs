//! Listeners observe the injector. [InjectionListener]s are notified after members of an instance
//! are injected, while [BindingListener]s are notified once for every registered binding, when the
//! injector is being configured. Both are registered along with a [TypeMatcher] selecting the
//! types they're interested in.

use crate::key::{BindingKey, TypeKey};
#[cfg(test)]
use mockall::automock;
use std::any::Any;
use std::sync::Arc;

/// Predicate selecting types for listeners.
pub type TypeMatcher = Arc<dyn Fn(&TypeKey) -> bool + Send + Sync>;

/// Matches all types.
pub fn any() -> TypeMatcher {
    Arc::new(|_| true)
}

/// Matches only the type `T`.
pub fn exactly<T: ?Sized + 'static>() -> TypeMatcher {
    Arc::new(|type_key| type_key.is::<T>())
}

/// Called after an instance had its members injected.
pub trait InjectionListener: Send + Sync {
    /// `key` is the key of the binding creating the instance, or the instance type key for
    /// explicit member injection.
    fn after_injection(&self, key: &BindingKey, instance: &dyn Any);
}

impl<F> InjectionListener for F
where
    F: Fn(&BindingKey, &dyn Any) + Send + Sync,
{
    #[inline]
    fn after_injection(&self, key: &BindingKey, instance: &dyn Any) {
        self(key, instance)
    }
}

pub type InjectionListenerPtr = Arc<dyn InjectionListener>;

/// Called for every registered binding with the type of objects its provider creates.
#[cfg_attr(test, automock)]
pub trait BindingListener: Send + Sync {
    fn after_binding(&self, key: &BindingKey, target_type: &TypeKey);
}

pub type BindingListenerPtr = Arc<dyn BindingListener>;

#[cfg(test)]
mod tests {
    use crate::key::TypeKey;
    use crate::listener::{any, exactly};

    #[test]
    fn should_match_types() {
        assert!(any()(&TypeKey::of::<String>()));
        assert!(exactly::<String>()(&TypeKey::of::<String>()));
        assert!(!exactly::<String>()(&TypeKey::of::<str>()));
    }
}
