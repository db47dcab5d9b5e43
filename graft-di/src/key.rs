//! Binding keys identify bindings in an [Injector](crate::injector::Injector). A key is a
//! combination of the requested type, an optional [Qualifier] and two independent flags:
//!
//! * `provider` - the key denotes a producer of the type, rather than the type itself
//! * `list` - the key denotes all values registered in a multi-binding of the type
//!
//! Keys differing only in one of the flags are distinct. Key hashes are computed once on creation.

use crate::qualifier::{AnnotationType, Qualifier, QualifierAnnotation};
use fxhash::FxHasher;
use std::any::{type_name, TypeId};
use std::cmp::Ordering;
use std::fmt::{Debug, Display, Formatter};
use std::hash::{Hash, Hasher};

/// Nominal type handle. Equality uses only the [TypeId], while the name is used for diagnostics
/// and deterministic ordering.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for TypeKey {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for TypeKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TypeKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name
            .cmp(other.name)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl Debug for TypeKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)
    }
}

impl Display for TypeKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)
    }
}

/// Composite identity of a binding.
#[derive(Clone)]
pub struct BindingKey {
    type_key: TypeKey,
    qualifier: Qualifier,
    provider: bool,
    list: bool,
    hash: u64,
}

impl BindingKey {
    fn new(type_key: TypeKey, qualifier: Qualifier, provider: bool, list: bool) -> Self {
        let mut hasher = FxHasher::default();
        type_key.hash(&mut hasher);
        qualifier.hash(&mut hasher);
        provider.hash(&mut hasher);
        list.hash(&mut hasher);

        Self {
            type_key,
            qualifier,
            provider,
            list,
            hash: hasher.finish(),
        }
    }

    /// Creates an unqualified key for given type.
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::qualified::<T>(Qualifier::None)
    }

    /// Creates a key for given type qualified by name.
    #[inline]
    pub fn named<T: ?Sized + 'static, N: AsRef<str>>(name: N) -> Self {
        Self::qualified::<T>(Qualifier::named(name))
    }

    /// Creates a key for given type qualified by an annotation instance.
    #[inline]
    pub fn annotated<T: ?Sized + 'static, A: QualifierAnnotation>(annotation: A) -> Self {
        Self::qualified::<T>(Qualifier::annotated(annotation))
    }

    /// Creates a key for given type qualified by an annotation type with default attributes.
    #[inline]
    pub fn annotated_with_type<T: ?Sized + 'static, A: QualifierAnnotation + Default>() -> Self {
        Self::qualified::<T>(Qualifier::TypeOnly(AnnotationType::of::<A>()))
    }

    #[inline]
    pub fn qualified<T: ?Sized + 'static>(qualifier: Qualifier) -> Self {
        Self::from_type_key(TypeKey::of::<T>(), qualifier)
    }

    #[inline]
    pub fn from_type_key(type_key: TypeKey, qualifier: Qualifier) -> Self {
        Self::new(type_key, qualifier, false, false)
    }

    /// Returns a key for a producer of values of this key.
    pub fn as_provider(&self) -> Self {
        Self::new(self.type_key, self.qualifier.clone(), true, self.list)
    }

    /// Returns a key for all values of a multi-binding of this key.
    pub fn as_list(&self) -> Self {
        Self::new(self.type_key, self.qualifier.clone(), self.provider, true)
    }

    /// Returns this key with the provider flag cleared.
    pub fn without_provider(&self) -> Self {
        if self.provider {
            Self::new(self.type_key, self.qualifier.clone(), false, self.list)
        } else {
            self.clone()
        }
    }

    /// Returns this key with the list flag cleared.
    pub fn without_list(&self) -> Self {
        if self.list {
            Self::new(self.type_key, self.qualifier.clone(), self.provider, false)
        } else {
            self.clone()
        }
    }

    /// Returns this key with a different qualifier, keeping both flags.
    pub fn with_qualifier(&self, qualifier: Qualifier) -> Self {
        Self::new(self.type_key, qualifier, self.provider, self.list)
    }

    #[inline]
    pub fn type_key(&self) -> TypeKey {
        self.type_key
    }

    #[inline]
    pub fn qualifier(&self) -> &Qualifier {
        &self.qualifier
    }

    #[inline]
    pub fn is_provider(&self) -> bool {
        self.provider
    }

    #[inline]
    pub fn is_list(&self) -> bool {
        self.list
    }
}

impl PartialEq for BindingKey {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
            && self.type_key == other.type_key
            && self.provider == other.provider
            && self.list == other.list
            && self.qualifier == other.qualifier
    }
}

impl Eq for BindingKey {}

impl Hash for BindingKey {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl Display for BindingKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.list {
            f.write_str("List<")?;
        }
        if self.provider {
            f.write_str("Provider<")?;
        }

        write!(f, "{}{}", self.type_key, self.qualifier)?;

        if self.provider {
            f.write_str(">")?;
        }
        if self.list {
            f.write_str(">")?;
        }

        Ok(())
    }
}

impl Debug for BindingKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "BindingKey({self})")
    }
}
