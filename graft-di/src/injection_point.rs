//! Injection points are the places where dependencies are injected: constructors, fields and
//! methods. Points of static members are executed at most once per process, no matter how many
//! instances get their members injected.

use crate::error::InjectionError;
use crate::injectable::{ConstructorDescriptor, FieldDescriptor, MethodDescriptor, ProjectionPtr};
use crate::injection_target::{Arguments, Dependency, InjectionTarget};
use crate::injector::Injector;
use crate::instance::InstanceAnyPtr;
use crate::key::{BindingKey, TypeKey};
use derivative::Derivative;
use fxhash::FxHashSet;
use itertools::Itertools;
use std::any::{Any, TypeId};
use std::fmt::{Debug, Display, Formatter};
use std::sync::{Arc, Mutex, OnceLock, PoisonError, RwLock};
use tracing::trace;

/// A place for injecting dependencies into.
pub trait InjectionPoint: Display + Send + Sync {
    /// Injects dependencies into given object (ignored for constructors and static members).
    /// Constructors return the created object.
    fn inject_to(
        &self,
        object: Option<&dyn Any>,
        injector: &Injector,
    ) -> Result<Option<InstanceAnyPtr>, InjectionError>;
}

pub type InjectionPointPtr = Arc<dyn InjectionPoint>;

fn injected_statics() -> &'static Mutex<FxHashSet<(TypeId, String)>> {
    static INJECTED: OnceLock<Mutex<FxHashSet<(TypeId, String)>>> = OnceLock::new();
    INJECTED.get_or_init(Default::default)
}

/// Marks a static slot as injected. Returns `false` if it already was.
fn mark_static_injected(declaring: TypeKey, slot: String) -> bool {
    injected_statics()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .insert((declaring.id(), slot))
}

fn is_static_injected(declaring: TypeKey, slot: &str) -> bool {
    injected_statics()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .contains(&(declaring.id(), slot.to_string()))
}

/// Acquires values for all targets, rejecting null values for slots which don't allow them.
pub(crate) fn resolve_arguments<P: Display + ?Sized>(
    targets: &[InjectionTarget],
    injector: &Injector,
    point: &P,
) -> Result<Arguments, InjectionError> {
    targets
        .iter()
        .map(|target| {
            let value = target.value(injector).map_err(|error| error.within(point))?;
            let allows_null = target.is_optional() || target.is_nullable();
            if !allows_null && value.as_ref().map_or(true, |value| value.is_null()) {
                return Err(InjectionError::NullNotAllowed {
                    key: target.key().clone(),
                    point: point.to_string(),
                });
            }

            Ok((target.clone(), value))
        })
        .try_collect()
        .map(Arguments::new)
}

/// Follows the projection chain from an object to the embedded value of the declaring type.
fn project<'a>(
    declaring: TypeKey,
    projections: &[ProjectionPtr],
    object: Option<&'a dyn Any>,
) -> Result<&'a dyn Any, InjectionError> {
    projections
        .iter()
        .try_fold(object, |object, projection| {
            object.and_then(|object| projection.project(object)).map(Some)
        })
        .flatten()
        .ok_or_else(|| InjectionError::IncompatibleType {
            key: BindingKey::from_type_key(declaring, Default::default()),
            expected: declaring.name(),
        })
}

/// Injection point for a field.
pub struct FieldInjectionPoint {
    declaring: TypeKey,
    field: FieldDescriptor,
    projections: Vec<ProjectionPtr>,
}

impl FieldInjectionPoint {
    pub fn new(declaring: TypeKey, field: FieldDescriptor, projections: Vec<ProjectionPtr>) -> Self {
        Self {
            declaring,
            field,
            projections,
        }
    }
}

impl InjectionPoint for FieldInjectionPoint {
    fn inject_to(
        &self,
        object: Option<&dyn Any>,
        injector: &Injector,
    ) -> Result<Option<InstanceAnyPtr>, InjectionError> {
        let object = if self.field.is_static() {
            if !mark_static_injected(self.declaring, format!("field:{}", self.field.name())) {
                return Ok(None);
            }

            trace!(field = %self, "Injecting static field.");
            None
        } else {
            Some(project(self.declaring, &self.projections, object)?)
        };

        let mut arguments =
            resolve_arguments(std::slice::from_ref(self.field.target()), injector, self)?;

        self.field
            .set(object, &mut arguments)
            .map_err(|error| InjectionError::construction(self, error))?;

        Ok(None)
    }
}

impl Display for FieldInjectionPoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "field {}::{}", self.declaring, self.field.name())
    }
}

#[derive(Debug)]
enum Executable {
    Constructor(ConstructorDescriptor),
    Method(MethodDescriptor),
}

/// Injection point for a constructor or a method.
pub struct ExecutableInjectionPoint {
    declaring: TypeKey,
    executable: Executable,
    projections: Vec<ProjectionPtr>,
}

impl ExecutableInjectionPoint {
    pub fn constructor(declaring: TypeKey, constructor: ConstructorDescriptor) -> Self {
        Self {
            declaring,
            executable: Executable::Constructor(constructor),
            projections: vec![],
        }
    }

    pub fn method(
        declaring: TypeKey,
        method: MethodDescriptor,
        projections: Vec<ProjectionPtr>,
    ) -> Self {
        Self {
            declaring,
            executable: Executable::Method(method),
            projections,
        }
    }

    fn targets(&self) -> &[InjectionTarget] {
        match &self.executable {
            Executable::Constructor(constructor) => constructor.targets(),
            Executable::Method(method) => method.targets(),
        }
    }

    fn inject_method(
        &self,
        method: &MethodDescriptor,
        object: Option<&dyn Any>,
        injector: &Injector,
    ) -> Result<(), InjectionError> {
        if method.is_static() {
            let slot = format!("method:{method}");
            if is_static_injected(self.declaring, &slot) {
                return Ok(());
            }

            let mut arguments = resolve_arguments(self.targets(), injector, self)?;
            if !mark_static_injected(self.declaring, slot) {
                return Ok(());
            }

            trace!(method = %self, "Injecting static method.");
            return method
                .invoke(None, &mut arguments)
                .map_err(|error| InjectionError::construction(self, error));
        }

        let object = project(self.declaring, &self.projections, object)?;
        let mut arguments = resolve_arguments(self.targets(), injector, self)?;
        method
            .invoke(Some(object), &mut arguments)
            .map_err(|error| InjectionError::construction(self, error))
    }
}

impl InjectionPoint for ExecutableInjectionPoint {
    fn inject_to(
        &self,
        object: Option<&dyn Any>,
        injector: &Injector,
    ) -> Result<Option<InstanceAnyPtr>, InjectionError> {
        match &self.executable {
            Executable::Constructor(constructor) => {
                let mut arguments = resolve_arguments(constructor.targets(), injector, self)?;
                constructor
                    .construct(&mut arguments)
                    .map(Some)
                    .map_err(|error| InjectionError::construction(self, error))
            }
            Executable::Method(method) => self.inject_method(method, object, injector).map(|_| None),
        }
    }
}

impl Display for ExecutableInjectionPoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.executable {
            Executable::Constructor(constructor) => write!(
                f,
                "constructor {}({})",
                self.declaring,
                constructor.parameter_types().join(", ")
            ),
            Executable::Method(method) => write!(f, "method {}::{method}", self.declaring),
        }
    }
}

/// Slot for a dependency injected after construction, usually marked with `#[inject(member)]`.
#[derive(Derivative)]
#[derivative(Default(bound = ""))]
pub struct Injected<V> {
    value: RwLock<Option<V>>,
}

impl<V: Clone> Injected<V> {
    /// Returns the injected value, if already injected.
    pub fn get(&self) -> Option<V> {
        self.value
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set(&self, value: V) {
        *self.value.write().unwrap_or_else(PoisonError::into_inner) = Some(value);
    }

    pub fn is_injected(&self) -> bool {
        self.value
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl<V> Debug for Injected<V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let injected = self
            .value
            .read()
            .map_or(false, |value| value.is_some());
        f.debug_struct("Injected").field("injected", &injected).finish()
    }
}

/// Member slots, which can be injected after construction.
pub trait Member {
    type Value: Dependency;

    fn inject(&self, value: Self::Value);
}

impl<V: Dependency + Clone> Member for Injected<V> {
    type Value = V;

    #[inline]
    fn inject(&self, value: Self::Value) {
        self.set(value);
    }
}

#[cfg(test)]
mod tests {
    use crate::injection_point::{mark_static_injected, Injected, Member};
    use crate::instance::InstancePtr;
    use crate::key::TypeKey;

    struct Marker;

    #[test]
    fn should_mark_static_slots_once() {
        assert!(mark_static_injected(TypeKey::of::<Marker>(), "field:a".to_string()));
        assert!(!mark_static_injected(TypeKey::of::<Marker>(), "field:a".to_string()));
        assert!(mark_static_injected(TypeKey::of::<Marker>(), "field:b".to_string()));
    }

    #[test]
    fn should_hold_injected_member() {
        let slot = Injected::<InstancePtr<i32>>::default();
        assert!(!slot.is_injected());
        assert!(slot.get().is_none());

        slot.inject(InstancePtr::new(4));
        assert!(slot.is_injected());
        assert_eq!(*slot.get().unwrap(), 4);
    }
}
