//! Discovery and caching of member injection points.
//!
//! Points of a type are ordered by walking its supertype chain from the root-most supertype down to
//! the type itself. For each type in the chain, static points come before instance points, while
//! fields come before methods. Fields are sorted by name and declared type, and methods by name and
//! parameter types. Methods overridden further down the chain are skipped.

use crate::injectable::{MethodDescriptor, ProjectionPtr, TypeDescriptor, Visibility};
use crate::injection_point::{ExecutableInjectionPoint, FieldInjectionPoint, InjectionPointPtr};
use crate::key::TypeKey;
use fxhash::{FxHashMap, FxHashSet};
use itertools::Itertools;
use std::any::TypeId;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use tracing::debug;

pub type InjectionPoints = Arc<[InjectionPointPtr]>;

/// Cache of injection points for types.
pub trait InjectionPointLoader: Send + Sync {
    /// Returns points for given type, calling the creator if they're not cached yet. The creator
    /// is called at most once per type, even with concurrent callers.
    fn injection_points(
        &self,
        type_key: TypeKey,
        creator: &dyn Fn(TypeKey) -> Vec<InjectionPointPtr>,
    ) -> InjectionPoints;

    /// Drops all cached points.
    fn invalidate_all(&self);
}

pub type InjectionPointLoaderPtr = Arc<dyn InjectionPointLoader>;

#[derive(Default)]
pub struct DefaultInjectionPointLoader {
    cache: RwLock<FxHashMap<TypeId, Arc<OnceLock<InjectionPoints>>>>,
}

impl DefaultInjectionPointLoader {
    fn cell(&self, type_key: TypeKey) -> Arc<OnceLock<InjectionPoints>> {
        if let Some(cell) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&type_key.id())
        {
            return cell.clone();
        }

        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(type_key.id())
            .or_default()
            .clone()
    }
}

impl InjectionPointLoader for DefaultInjectionPointLoader {
    fn injection_points(
        &self,
        type_key: TypeKey,
        creator: &dyn Fn(TypeKey) -> Vec<InjectionPointPtr>,
    ) -> InjectionPoints {
        self.cell(type_key)
            .get_or_init(|| {
                let points = creator(type_key);
                debug!(%type_key, count = points.len(), "Loaded injection points.");
                points.into()
            })
            .clone()
    }

    fn invalidate_all(&self) {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[derive(Eq, PartialEq, Hash)]
enum OverrideScope {
    Public,
    Package(&'static str),
    Private(TypeKey),
}

#[derive(Eq, PartialEq, Hash)]
struct MethodSignature {
    name: &'static str,
    parameter_types: Vec<&'static str>,
    scope: OverrideScope,
}

impl MethodSignature {
    fn new(declaring: TypeKey, method: &MethodDescriptor) -> Self {
        Self {
            name: method.name(),
            parameter_types: method.parameter_types().to_vec(),
            scope: match method.visibility() {
                Visibility::Public => OverrideScope::Public,
                Visibility::Package(module_path) => OverrideScope::Package(module_path),
                Visibility::Private => OverrideScope::Private(declaring),
            },
        }
    }
}

/// Creates ordered injection points for the described type and its supertypes.
pub fn create_injection_points(descriptor: &TypeDescriptor) -> Vec<InjectionPointPtr> {
    let mut visited = FxHashSet::default();
    let mut blocks = vec![];
    let mut current = Some((descriptor.clone(), vec![]));

    while let Some((descriptor, projections)) = current {
        blocks.push(type_points(&descriptor, &projections, &mut visited));

        current = descriptor.supertype().map(|link| {
            let mut projections = projections.clone();
            projections.push(link.projection().clone());
            (link.descriptor(), projections)
        });
    }

    blocks.into_iter().rev().flatten().collect()
}

fn type_points(
    descriptor: &TypeDescriptor,
    projections: &[ProjectionPtr],
    visited: &mut FxHashSet<MethodSignature>,
) -> Vec<InjectionPointPtr> {
    let declaring = descriptor.type_key();

    let fields = descriptor
        .fields()
        .iter()
        .sorted_by_key(|field| (field.name(), field.declared_type()))
        .collect_vec();

    // signatures are recorded for every method, so non-injected overrides hide supertype methods
    let methods = descriptor
        .methods()
        .iter()
        .sorted_by_key(|method| (method.name(), method.parameter_types()))
        .filter(|method| visited.insert(MethodSignature::new(declaring, method)))
        .filter(|method| method.is_inject())
        .collect_vec();

    let mut points: Vec<InjectionPointPtr> = vec![];
    for is_static in [true, false] {
        points.extend(
            fields
                .iter()
                .filter(|field| field.is_static() == is_static)
                .map(|field| {
                    Arc::new(FieldInjectionPoint::new(
                        declaring,
                        (*field).clone(),
                        projections.to_vec(),
                    )) as InjectionPointPtr
                }),
        );
        points.extend(
            methods
                .iter()
                .filter(|method| method.is_static() == is_static)
                .map(|method| {
                    Arc::new(ExecutableInjectionPoint::method(
                        declaring,
                        (*method).clone(),
                        projections.to_vec(),
                    )) as InjectionPointPtr
                }),
        );
    }

    points
}

#[cfg(test)]
mod tests {
    use crate::injectable::{Injectable, MethodDescriptor, TypeDescriptor};
    use crate::injection_point_loader::{
        create_injection_points, DefaultInjectionPointLoader, InjectionPointLoader,
    };
    use crate::injection_target::InjectionTarget;
    use crate::instance::InstancePtr;
    use crate::key::TypeKey;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Base;

    impl Injectable for Base {
        fn descriptor() -> TypeDescriptor {
            TypeDescriptor::builder::<Base>()
                .constructor(vec![], |_| Ok(Base))
                .field::<InstancePtr<u8>, _>(
                    "value",
                    InjectionTarget::of::<InstancePtr<u8>>(),
                    |_, _| {},
                )
                .method(MethodDescriptor::new::<Base, _>("init", vec![], |_, _| Ok(())))
                .method(MethodDescriptor::new::<Base, _>("start", vec![], |_, _| Ok(())))
                .method(
                    MethodDescriptor::new::<Base, _>("secret", vec![], |_, _| Ok(())).private(),
                )
                .build()
        }
    }

    struct Derived {
        base: Base,
    }

    impl Injectable for Derived {
        fn descriptor() -> TypeDescriptor {
            TypeDescriptor::builder::<Derived>()
                .constructor(vec![], |_| Ok(Derived { base: Base }))
                .supertype::<Base>(|derived| &derived.base)
                .static_field::<InstancePtr<u8>, _>(
                    "shared",
                    InjectionTarget::of::<InstancePtr<u8>>(),
                    |_| {},
                )
                .field::<InstancePtr<u8>, _>(
                    "count",
                    InjectionTarget::of::<InstancePtr<u8>>(),
                    |_, _| {},
                )
                .field::<InstancePtr<u8>, _>(
                    "another",
                    InjectionTarget::of::<InstancePtr<u8>>(),
                    |_, _| {},
                )
                // overrides without injection
                .method(MethodDescriptor::declared("start", vec![]))
                .method(
                    MethodDescriptor::new::<Derived, _>("secret", vec![], |_, _| Ok(())).private(),
                )
                .build()
        }
    }

    #[test]
    fn should_order_points_from_supertypes_down() {
        let points = create_injection_points(&Derived::descriptor())
            .iter()
            .map(|point| point.to_string())
            .collect::<Vec<_>>();

        let base = TypeKey::of::<Base>();
        let derived = TypeKey::of::<Derived>();
        assert_eq!(
            points,
            [
                format!("field {base}::value"),
                format!("method {base}::init()"),
                format!("method {base}::secret()"),
                format!("field {derived}::shared"),
                format!("field {derived}::another"),
                format!("field {derived}::count"),
                format!("method {derived}::secret()"),
            ]
        );
    }

    #[test]
    fn should_create_points_once() {
        let loader = DefaultInjectionPointLoader::default();
        let calls = AtomicUsize::new(0);
        let creator = |type_key: TypeKey| {
            calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(type_key, TypeKey::of::<Derived>());
            create_injection_points(&Derived::descriptor())
        };

        let first = loader.injection_points(TypeKey::of::<Derived>(), &creator);
        let second = loader.injection_points(TypeKey::of::<Derived>(), &creator);
        assert_eq!(first.len(), second.len());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        loader.invalidate_all();
        loader.injection_points(TypeKey::of::<Derived>(), &creator);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
