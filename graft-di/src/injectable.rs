//! Type descriptors are the source of truth for constructing types and injecting their members.
//! Every type, which can be created by the injector (rather than bound to an instance or a custom
//! provider), needs a [TypeDescriptor], usually provided by implementing [Injectable].
//!
//! ## Deriving descriptors
//!
//! With the `derive` feature enabled, descriptors can be generated and registered automatically:
//!
//! ```
//! use graft_di::injection_point::Injected;
//! use graft_di::instance::InstancePtr;
//! use graft_di::Injectable;
//!
//! #[derive(Injectable)]
//! struct Database;
//!
//! #[derive(Injectable)]
//! #[injectable(scope = "SINGLETON")]
//! struct Repository {
//!     // constructor dependency
//!     database: InstancePtr<Database>,
//!     // named dependency
//!     #[inject(named = "table")]
//!     table: InstancePtr<String>,
//!     // optional dependency - `None` when there's no binding
//!     cache: Option<InstancePtr<Database>>,
//!     // field injected after construction
//!     #[inject(member)]
//!     backup: Injected<InstancePtr<Database>>,
//!     #[inject(default)]
//!     retries: u8,
//! }
//! ```
//!
//! ### Supported `#[injectable]` struct configuration
//!
//! * `scope = "name"` - declared scope of the type, used when a binding doesn't specify one
//! * `constructor = "path"` - call `path(dependencies...)` instead of using struct construction;
//! parameters must be in the same order as injected fields in the struct and the function must
//! return `Result<Self, BoxError>`
//!
//! ### Supported `#[inject]` field configuration
//!
//! * `named = "name"` - inject the dependency qualified with given name
//! * `nullable` - allow a `None` value for an `Option` dependency, even when a binding exists
//! * `default` - use `Default::default()` initialization
//! * `default = "path"` - call `path()` for initialization
//! * `member` - inject an [Injected](crate::injection_point::Injected) slot after construction
//! * `supertype` - the field holds an embedded supertype value, whose members are injected before
//! members of this type
//!
//! ## Manual descriptors
//!
//! Descriptors can be written by hand with [TypeDescriptor::builder] and registered on the
//! [InjectorBuilder](crate::injector::InjectorBuilder) or provided by [Injectable] implementations.

use crate::error::{BoxError, ConfigurationError, InjectionError};
use crate::injection_target::{Arguments, Dependency, InjectionTarget};
use crate::instance::{cast_into, CastFunction, InstanceAnyPtr, InstancePtr};
use crate::key::{BindingKey, TypeKey};
use derivative::Derivative;
use fxhash::FxHashMap;
use itertools::Itertools;
use std::any::{type_name, Any, TypeId};
use std::fmt::{Display, Formatter};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::trace;

/// Types which can be constructed by the injector.
pub trait Injectable: Send + Sync + Sized + 'static {
    fn descriptor() -> TypeDescriptor;
}

type ConstructFn = dyn Fn(&mut Arguments) -> Result<InstanceAnyPtr, BoxError> + Send + Sync;
type MemberFn = dyn Fn(Option<&dyn Any>, &mut Arguments) -> Result<(), BoxError> + Send + Sync;

/// Extracts a typed receiver for instance members.
fn receiver<I: 'static>(object: Option<&dyn Any>) -> Result<&I, BoxError> {
    object
        .and_then(|object| object.downcast_ref::<I>())
        .ok_or_else(|| {
            InjectionError::IncompatibleType {
                key: BindingKey::of::<I>(),
                expected: type_name::<I>(),
            }
            .into()
        })
}

/// Projection from an object to an embedded supertype value.
pub trait Projection: Send + Sync {
    fn project<'a>(&self, object: &'a dyn Any) -> Option<&'a dyn Any>;
}

pub type ProjectionPtr = Arc<dyn Projection>;

struct TypedProjection<I, S> {
    project: fn(&I) -> &S,
}

impl<I: Send + Sync + 'static, S: Send + Sync + 'static> Projection for TypedProjection<I, S> {
    fn project<'a>(&self, object: &'a dyn Any) -> Option<&'a dyn Any> {
        object
            .downcast_ref::<I>()
            .map(|object| (self.project)(object) as &dyn Any)
    }
}

/// Link to the supertype of a type: its descriptor and the projection to its embedded value.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct SupertypeLink {
    #[derivative(Debug = "ignore")]
    descriptor: fn() -> TypeDescriptor,
    #[derivative(Debug = "ignore")]
    projection: ProjectionPtr,
}

impl SupertypeLink {
    #[inline]
    pub fn descriptor(&self) -> TypeDescriptor {
        (self.descriptor)()
    }

    #[inline]
    pub fn projection(&self) -> &ProjectionPtr {
        &self.projection
    }
}

/// A constructor along with its injected parameters.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct ConstructorDescriptor {
    inject: bool,
    targets: Vec<InjectionTarget>,
    #[derivative(Debug = "ignore")]
    construct: Arc<ConstructFn>,
}

impl ConstructorDescriptor {
    /// Creates a constructor, which is selected only when it's the sole no-argument constructor.
    /// Use [ConstructorDescriptor::inject] to mark it explicitly for injection.
    pub fn new<I, F>(targets: Vec<InjectionTarget>, construct: F) -> Self
    where
        I: Send + Sync + 'static,
        F: Fn(&mut Arguments) -> Result<I, BoxError> + Send + Sync + 'static,
    {
        Self {
            inject: false,
            targets,
            construct: Arc::new(move |arguments: &mut Arguments| {
                construct(arguments).map(|object| InstancePtr::new(object) as InstanceAnyPtr)
            }),
        }
    }

    pub fn inject(mut self) -> Self {
        self.inject = true;
        self
    }

    #[inline]
    pub fn is_inject(&self) -> bool {
        self.inject
    }

    #[inline]
    pub fn targets(&self) -> &[InjectionTarget] {
        &self.targets
    }

    pub fn parameter_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.targets.iter().map(InjectionTarget::declared_type)
    }

    pub(crate) fn construct(&self, arguments: &mut Arguments) -> Result<InstanceAnyPtr, BoxError> {
        (self.construct)(arguments)
    }
}

/// An injected field. Fields are set through their setters, since instances are shared.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct FieldDescriptor {
    name: &'static str,
    is_static: bool,
    target: InjectionTarget,
    #[derivative(Debug = "ignore")]
    setter: Arc<MemberFn>,
}

impl FieldDescriptor {
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn declared_type(&self) -> &'static str {
        self.target.declared_type()
    }

    #[inline]
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    #[inline]
    pub fn target(&self) -> &InjectionTarget {
        &self.target
    }

    pub(crate) fn set(
        &self,
        object: Option<&dyn Any>,
        arguments: &mut Arguments,
    ) -> Result<(), BoxError> {
        (self.setter)(object, arguments)
    }
}

/// Method visibility, which determines when a method overrides a method of a supertype.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug, Default)]
pub enum Visibility {
    /// Overridden by any method with the same signature.
    #[default]
    Public,
    /// Overridden only by methods declared in the same module.
    Package(&'static str),
    /// Never overridden.
    Private,
}

/// A method, which is either injected after construction or only declared, to hide an injected
/// supertype method with the same signature.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct MethodDescriptor {
    name: &'static str,
    parameter_types: Vec<&'static str>,
    visibility: Visibility,
    is_static: bool,
    targets: Vec<InjectionTarget>,
    #[derivative(Debug = "ignore")]
    invoke: Option<Arc<MemberFn>>,
}

impl MethodDescriptor {
    /// Creates an injected instance method.
    pub fn new<I, F>(name: &'static str, targets: Vec<InjectionTarget>, invoke: F) -> Self
    where
        I: 'static,
        F: Fn(&I, &mut Arguments) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        Self::with_invoke(
            name,
            false,
            targets,
            Arc::new(
                move |object: Option<&dyn Any>, arguments: &mut Arguments| {
                    invoke(receiver::<I>(object)?, arguments)
                },
            ),
        )
    }

    /// Creates an injected static method.
    pub fn new_static<F>(name: &'static str, targets: Vec<InjectionTarget>, invoke: F) -> Self
    where
        F: Fn(&mut Arguments) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        Self::with_invoke(
            name,
            true,
            targets,
            Arc::new(move |_: Option<&dyn Any>, arguments: &mut Arguments| invoke(arguments)),
        )
    }

    /// Declares a non-injected method with given signature.
    pub fn declared(name: &'static str, parameter_types: Vec<&'static str>) -> Self {
        Self {
            name,
            parameter_types,
            visibility: Visibility::Public,
            is_static: false,
            targets: vec![],
            invoke: None,
        }
    }

    fn with_invoke(
        name: &'static str,
        is_static: bool,
        targets: Vec<InjectionTarget>,
        invoke: Arc<MemberFn>,
    ) -> Self {
        Self {
            name,
            parameter_types: targets.iter().map(InjectionTarget::declared_type).collect(),
            visibility: Visibility::Public,
            is_static,
            targets,
            invoke: Some(invoke),
        }
    }

    pub fn private(mut self) -> Self {
        self.visibility = Visibility::Private;
        self
    }

    pub fn package(mut self, module_path: &'static str) -> Self {
        self.visibility = Visibility::Package(module_path);
        self
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn parameter_types(&self) -> &[&'static str] {
        &self.parameter_types
    }

    #[inline]
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    #[inline]
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    #[inline]
    pub fn is_inject(&self) -> bool {
        self.invoke.is_some()
    }

    #[inline]
    pub fn targets(&self) -> &[InjectionTarget] {
        &self.targets
    }

    pub(crate) fn invoke(
        &self,
        object: Option<&dyn Any>,
        arguments: &mut Arguments,
    ) -> Result<(), BoxError> {
        match &self.invoke {
            Some(invoke) => invoke(object, arguments),
            None => Ok(()),
        }
    }
}

impl Display for MethodDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.parameter_types.iter().join(", "))
    }
}

type FactoryFn<R> = dyn Fn(Option<&dyn Any>, &mut Arguments) -> Result<R, BoxError> + Send + Sync;

/// Method creating instances of `R`, used with
/// [to_factory](crate::binder::BindingBuilder::to_factory).
#[derive(Derivative)]
#[derivative(Debug(bound = ""), Clone(bound = ""))]
pub struct FactoryMethod<R> {
    name: &'static str,
    receiver_type: Option<TypeKey>,
    targets: Vec<InjectionTarget>,
    #[derivative(Debug = "ignore")]
    invoke: Arc<FactoryFn<R>>,
}

impl<R: 'static> FactoryMethod<R> {
    pub fn new_static<F>(name: &'static str, targets: Vec<InjectionTarget>, invoke: F) -> Self
    where
        F: Fn(&mut Arguments) -> Result<R, BoxError> + Send + Sync + 'static,
    {
        Self {
            name,
            receiver_type: None,
            targets,
            invoke: Arc::new(move |_: Option<&dyn Any>, arguments: &mut Arguments| {
                invoke(arguments)
            }),
        }
    }

    /// Creates an instance method, which needs a receiver of type `I` when bound.
    pub fn new<I, F>(name: &'static str, targets: Vec<InjectionTarget>, invoke: F) -> Self
    where
        I: 'static,
        F: Fn(&I, &mut Arguments) -> Result<R, BoxError> + Send + Sync + 'static,
    {
        Self {
            name,
            receiver_type: Some(TypeKey::of::<I>()),
            targets,
            invoke: Arc::new(move |object: Option<&dyn Any>, arguments: &mut Arguments| {
                invoke(receiver::<I>(object)?, arguments)
            }),
        }
    }

    #[inline]
    pub fn is_static(&self) -> bool {
        self.receiver_type.is_none()
    }

    #[inline]
    pub fn receiver_type(&self) -> Option<TypeKey> {
        self.receiver_type
    }

    #[inline]
    pub fn targets(&self) -> &[InjectionTarget] {
        &self.targets
    }

    pub(crate) fn invoke(
        &self,
        receiver: Option<&dyn Any>,
        arguments: &mut Arguments,
    ) -> Result<R, BoxError> {
        (self.invoke)(receiver, arguments)
    }

    /// Checks if this method can be used to create instances, given a receiver is available or
    /// not.
    pub fn validate(&self, has_receiver: bool) -> Result<(), ConfigurationError> {
        let reason = if !self.is_static() && !has_receiver {
            Some("instance method bound without a receiver")
        } else {
            match ReturnKind::of::<R>() {
                ReturnKind::Unit => Some("method returns unit"),
                ReturnKind::Primitive => Some("method returns a primitive type"),
                ReturnKind::Array => Some("method returns an array"),
                ReturnKind::Object => None,
            }
        };

        match reason {
            Some(reason) => Err(ConfigurationError::InvalidFactoryMethod {
                method: self.to_string(),
                reason: reason.to_string(),
            }),
            None => Ok(()),
        }
    }
}

impl<R> Display for FactoryMethod<R> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "method={}({})",
            self.name,
            self.targets
                .iter()
                .map(InjectionTarget::declared_type)
                .join(", ")
        )
    }
}

#[derive(Clone, Copy, Eq, PartialEq, Debug)]
enum ReturnKind {
    Unit,
    Primitive,
    Array,
    Object,
}

impl ReturnKind {
    const PRIMITIVES: [&'static str; 17] = [
        "bool", "char", "str", "i8", "i16", "i32", "i64", "i128", "isize", "u8", "u16", "u32",
        "u64", "u128", "usize", "f32", "f64",
    ];

    fn of<R>() -> Self {
        let name = type_name::<R>();
        if name == "()" {
            Self::Unit
        } else if Self::PRIMITIVES.contains(&name) {
            Self::Primitive
        } else if name.starts_with('[') {
            Self::Array
        } else {
            Self::Object
        }
    }
}

/// Metadata of an injectable type.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct TypeDescriptor {
    type_key: TypeKey,
    is_abstract: bool,
    scope: Option<String>,
    constructors: Vec<ConstructorDescriptor>,
    fields: Vec<FieldDescriptor>,
    methods: Vec<MethodDescriptor>,
    supertype: Option<SupertypeLink>,
    #[derivative(Debug = "ignore")]
    cast: CastFunction,
}

impl TypeDescriptor {
    pub fn builder<I: Send + Sync + 'static>() -> TypeDescriptorBuilder<I> {
        TypeDescriptorBuilder {
            descriptor: Self {
                type_key: TypeKey::of::<I>(),
                is_abstract: false,
                scope: None,
                constructors: vec![],
                fields: vec![],
                methods: vec![],
                supertype: None,
                cast: cast_into::<I, I>,
            },
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn type_key(&self) -> TypeKey {
        self.type_key
    }

    #[inline]
    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    /// Declared scope name, if any.
    #[inline]
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    #[inline]
    pub fn constructors(&self) -> &[ConstructorDescriptor] {
        &self.constructors
    }

    #[inline]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    #[inline]
    pub fn methods(&self) -> &[MethodDescriptor] {
        &self.methods
    }

    #[inline]
    pub fn supertype(&self) -> Option<&SupertypeLink> {
        self.supertype.as_ref()
    }

    /// Cast of constructed objects into instances of the described type.
    #[inline]
    pub fn cast(&self) -> CastFunction {
        self.cast
    }
}

/// Builder for [TypeDescriptor]s of type `I`.
pub struct TypeDescriptorBuilder<I> {
    descriptor: TypeDescriptor,
    _marker: PhantomData<fn() -> I>,
}

impl<I: Send + Sync + 'static> TypeDescriptorBuilder<I> {
    pub fn constructor<F>(mut self, targets: Vec<InjectionTarget>, construct: F) -> Self
    where
        F: Fn(&mut Arguments) -> Result<I, BoxError> + Send + Sync + 'static,
    {
        self.descriptor
            .constructors
            .push(ConstructorDescriptor::new(targets, construct));
        self
    }

    pub fn inject_constructor<F>(mut self, targets: Vec<InjectionTarget>, construct: F) -> Self
    where
        F: Fn(&mut Arguments) -> Result<I, BoxError> + Send + Sync + 'static,
    {
        self.descriptor
            .constructors
            .push(ConstructorDescriptor::new(targets, construct).inject());
        self
    }

    pub fn field<D, F>(mut self, name: &'static str, target: InjectionTarget, setter: F) -> Self
    where
        D: Dependency,
        F: Fn(&I, D) + Send + Sync + 'static,
    {
        self.descriptor.fields.push(FieldDescriptor {
            name,
            is_static: false,
            target,
            setter: Arc::new(move |object: Option<&dyn Any>, arguments: &mut Arguments| {
                let object = receiver::<I>(object)?;
                setter(object, arguments.next::<D>()?);
                Ok(())
            }),
        });
        self
    }

    pub fn static_field<D, F>(
        mut self,
        name: &'static str,
        target: InjectionTarget,
        setter: F,
    ) -> Self
    where
        D: Dependency,
        F: Fn(D) + Send + Sync + 'static,
    {
        self.descriptor.fields.push(FieldDescriptor {
            name,
            is_static: true,
            target,
            setter: Arc::new(move |_: Option<&dyn Any>, arguments: &mut Arguments| {
                setter(arguments.next::<D>()?);
                Ok(())
            }),
        });
        self
    }

    pub fn method(mut self, method: MethodDescriptor) -> Self {
        self.descriptor.methods.push(method);
        self
    }

    /// Links the supertype `S`, embedded in `I` and accessible by the given projection.
    pub fn supertype<S: Injectable>(mut self, project: fn(&I) -> &S) -> Self {
        self.descriptor.supertype = Some(SupertypeLink {
            descriptor: S::descriptor,
            projection: Arc::new(TypedProjection { project }),
        });
        self
    }

    pub fn scope<S: Into<String>>(mut self, name: S) -> Self {
        self.descriptor.scope = Some(name.into());
        self
    }

    /// Marks the type as not constructible.
    pub fn abstract_type(mut self) -> Self {
        self.descriptor.is_abstract = true;
        self
    }

    pub fn build(self) -> TypeDescriptor {
        self.descriptor
    }
}

/// Selects the constructor used to create instances of the described type: the one marked for
/// injection, or the no-argument one.
pub fn select_constructor(
    descriptor: &TypeDescriptor,
) -> Result<ConstructorDescriptor, InjectionError> {
    if descriptor.is_abstract() {
        return Err(InjectionError::NoUsableConstructor(descriptor.type_key().name()));
    }

    descriptor
        .constructors()
        .iter()
        .find(|constructor| constructor.is_inject())
        .or_else(|| {
            descriptor
                .constructors()
                .iter()
                .find(|constructor| constructor.targets().is_empty())
        })
        .cloned()
        .ok_or_else(|| InjectionError::NoUsableConstructor(descriptor.type_key().name()))
}

static NEXT_REVISION: AtomicU64 = AtomicU64::new(1);

/// Registry of known type descriptors. Derived descriptors are registered automatically.
#[derive(Clone, Debug, Default)]
pub struct DescriptorRegistry {
    descriptors: FxHashMap<TypeId, TypeDescriptor>,
    // unique per modification, shared by unmodified clones
    revision: u64,
}

impl DescriptorRegistry {
    /// Creates a registry with all statically submitted descriptors.
    pub fn from_inventory() -> Self {
        let mut registry = Self::default();
        for registerer in inventory::iter::<internal::DescriptorRegisterer> {
            registry.register((registerer.register)());
        }

        trace!(count = registry.descriptors.len(), "Collected type descriptors.");
        registry
    }

    /// Adds a descriptor, replacing any previous one for the same type.
    pub fn register(&mut self, descriptor: TypeDescriptor) {
        self.descriptors
            .insert(descriptor.type_key().id(), descriptor);
        self.revision = NEXT_REVISION.fetch_add(1, Ordering::Relaxed);
    }

    /// Checks if both registries hold the same descriptors, i.e. one is an unmodified clone of the
    /// other.
    pub fn is_same_revision(&self, other: &DescriptorRegistry) -> bool {
        self.revision == other.revision
    }

    pub fn get(&self, type_key: TypeKey) -> Option<&TypeDescriptor> {
        self.descriptors.get(&type_key.id())
    }

    pub fn contains(&self, type_key: TypeKey) -> bool {
        self.descriptors.contains_key(&type_key.id())
    }
}

pub mod internal {
    use crate::injectable::TypeDescriptor;
    use inventory::collect;
    pub use inventory::submit;

    pub struct DescriptorRegisterer {
        pub register: fn() -> TypeDescriptor,
    }

    collect!(DescriptorRegisterer);
}

#[cfg(test)]
mod tests {
    use crate::error::{BoxError, ConfigurationError, InjectionError};
    use crate::injectable::{
        select_constructor, DescriptorRegistry, FactoryMethod, MethodDescriptor, TypeDescriptor,
        Visibility,
    };
    use crate::injection_target::InjectionTarget;
    use crate::instance::InstancePtr;
    use crate::key::TypeKey;

    struct Engine;

    struct Car {
        _engine: InstancePtr<Engine>,
    }

    fn car_descriptor() -> TypeDescriptor {
        TypeDescriptor::builder::<Car>()
            .constructor(vec![], |_| Err::<Car, BoxError>("unused".into()))
            .inject_constructor(
                vec![InjectionTarget::of::<InstancePtr<Engine>>()],
                |arguments| {
                    Ok(Car {
                        _engine: arguments.next()?,
                    })
                },
            )
            .build()
    }

    #[test]
    fn should_select_inject_constructor() {
        let constructor = select_constructor(&car_descriptor()).unwrap();
        assert!(constructor.is_inject());
        assert_eq!(constructor.targets().len(), 1);
    }

    #[test]
    fn should_select_no_argument_constructor() {
        let descriptor = TypeDescriptor::builder::<Engine>()
            .constructor(
                vec![InjectionTarget::of::<InstancePtr<Car>>()],
                |_| Ok(Engine),
            )
            .constructor(vec![], |_| Ok(Engine))
            .build();

        let constructor = select_constructor(&descriptor).unwrap();
        assert!(!constructor.is_inject());
        assert!(constructor.targets().is_empty());
    }

    #[test]
    fn should_reject_unusable_constructors() {
        let descriptor = TypeDescriptor::builder::<Engine>()
            .constructor(
                vec![InjectionTarget::of::<InstancePtr<Car>>()],
                |_| Ok(Engine),
            )
            .build();
        assert!(matches!(
            select_constructor(&descriptor),
            Err(InjectionError::NoUsableConstructor(_))
        ));

        let descriptor = TypeDescriptor::builder::<Engine>()
            .constructor(vec![], |_| Ok(Engine))
            .abstract_type()
            .build();
        assert!(matches!(
            select_constructor(&descriptor),
            Err(InjectionError::NoUsableConstructor(_))
        ));
    }

    #[test]
    fn should_describe_methods() {
        let method = MethodDescriptor::new::<Car, _>(
            "set_engine",
            vec![InjectionTarget::of::<InstancePtr<Engine>>()],
            |_, _| Ok(()),
        )
        .package("cars");

        assert!(method.is_inject());
        assert!(!method.is_static());
        assert_eq!(method.visibility(), Visibility::Package("cars"));
        assert_eq!(
            method.to_string(),
            format!("set_engine({})", std::any::type_name::<InstancePtr<Engine>>())
        );

        let declared = MethodDescriptor::declared("set_engine", vec![]);
        assert!(!declared.is_inject());
    }

    #[test]
    fn should_validate_factory_methods() {
        assert!(FactoryMethod::new_static("engine", vec![], |_| Ok(Engine))
            .validate(false)
            .is_ok());

        assert!(matches!(
            FactoryMethod::new_static("count", vec![], |_| Ok(5u32)).validate(false),
            Err(ConfigurationError::InvalidFactoryMethod { .. })
        ));
        assert!(matches!(
            FactoryMethod::new_static("nothing", vec![], |_| Ok(())).validate(false),
            Err(ConfigurationError::InvalidFactoryMethod { .. })
        ));
        assert!(matches!(
            FactoryMethod::new_static("bytes", vec![], |_| Ok([0u8; 4])).validate(false),
            Err(ConfigurationError::InvalidFactoryMethod { .. })
        ));

        let method = FactoryMethod::new::<Car, _>("engine", vec![], |_, _| Ok(Engine));
        assert!(method.validate(false).is_err());
        assert!(method.validate(true).is_ok());
    }

    #[test]
    fn should_register_descriptors() {
        let mut registry = DescriptorRegistry::default();
        assert!(!registry.contains(TypeKey::of::<Car>()));

        registry.register(car_descriptor());
        assert_eq!(
            registry.get(TypeKey::of::<Car>()).unwrap().type_key(),
            TypeKey::of::<Car>()
        );
    }

    #[test]
    fn should_track_registry_revisions() {
        let mut registry = DescriptorRegistry::default();
        registry.register(car_descriptor());

        let mut clone = registry.clone();
        assert!(clone.is_same_revision(&registry));

        clone.register(car_descriptor());
        assert!(!clone.is_same_revision(&registry));
    }
}
