//! Qualifiers distinguish otherwise identical binding keys, e.g. two `String` bindings named
//! `"user"` and `"db"`. A qualifier can be a simple name or an *annotation* - any value of a type
//! implementing [QualifierAnnotation]. Annotations are compared by value, so two separately created
//! annotations with equal attributes denote the same key.
//!
//! When only the annotation type is known, [Qualifier::TypeOnly] can be used. Such qualifier is
//! equal to (and hashes the same as) an [Qualifier::Instance] holding the default value of the
//! annotation type.
//!
//! ```
//! use graft_di::key::BindingKey;
//! use graft_di::qualifier::{AnnotationType, Qualifier, QualifierAnnotation};
//!
//! #[derive(Debug, Default, Eq, PartialEq, Hash)]
//! struct Color {
//!     name: &'static str,
//! }
//!
//! impl QualifierAnnotation for Color {}
//!
//! let by_instance = BindingKey::annotated::<String, _>(Color::default());
//! let by_type = BindingKey::qualified::<String>(Qualifier::TypeOnly(AnnotationType::of::<Color>()));
//! assert_eq!(by_instance, by_type);
//! ```

use crate::key::TypeKey;
use std::any::Any;
use std::fmt::{Debug, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

pub type AnnotationPtr = Arc<dyn DynAnnotation>;

/// Marker trait for values usable as qualifier annotations. Equality of annotations is the
/// attribute-by-attribute equality of the implementing type.
pub trait QualifierAnnotation: Debug + Eq + Hash + Send + Sync + 'static {}

/// Type-erased view of a [QualifierAnnotation]. Implemented automatically.
pub trait DynAnnotation: Debug + Send + Sync {
    fn annotation_type(&self) -> TypeKey;

    fn dyn_eq(&self, other: &dyn DynAnnotation) -> bool;

    fn dyn_hash(&self, state: &mut dyn Hasher);

    fn as_any(&self) -> &dyn Any;
}

impl<A: QualifierAnnotation> DynAnnotation for A {
    #[inline]
    fn annotation_type(&self) -> TypeKey {
        TypeKey::of::<A>()
    }

    fn dyn_eq(&self, other: &dyn DynAnnotation) -> bool {
        other
            .as_any()
            .downcast_ref::<A>()
            .map_or(false, |other| self == other)
    }

    fn dyn_hash(&self, mut state: &mut dyn Hasher) {
        self.hash(&mut state);
    }

    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Annotation type along with its default attribute values.
#[derive(Clone, Copy)]
pub struct AnnotationType {
    type_key: TypeKey,
    default: fn() -> AnnotationPtr,
}

impl AnnotationType {
    pub fn of<A: QualifierAnnotation + Default>() -> Self {
        Self {
            type_key: TypeKey::of::<A>(),
            default: default_annotation::<A>,
        }
    }

    #[inline]
    pub fn type_key(&self) -> TypeKey {
        self.type_key
    }

    /// Creates an annotation instance with default attribute values.
    #[inline]
    pub fn default_instance(&self) -> AnnotationPtr {
        (self.default)()
    }
}

impl Debug for AnnotationType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AnnotationType").field(&self.type_key).finish()
    }
}

fn default_annotation<A: QualifierAnnotation + Default>() -> AnnotationPtr {
    Arc::new(A::default())
}

/// Additional identity of a binding key.
#[derive(Clone, Debug, Default)]
pub enum Qualifier {
    #[default]
    None,
    Named(Arc<str>),
    Instance(AnnotationPtr),
    TypeOnly(AnnotationType),
}

impl Qualifier {
    pub fn named<T: AsRef<str>>(name: T) -> Self {
        Self::Named(Arc::from(name.as_ref()))
    }

    pub fn annotated<A: QualifierAnnotation>(annotation: A) -> Self {
        Self::Instance(Arc::new(annotation))
    }

    pub fn annotated_with_type<A: QualifierAnnotation + Default>() -> Self {
        Self::TypeOnly(AnnotationType::of::<A>())
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl PartialEq for Qualifier {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::None, Self::None) => true,
            (Self::Named(first), Self::Named(second)) => first == second,
            (Self::Instance(first), Self::Instance(second)) => (**first).dyn_eq(&**second),
            (Self::TypeOnly(first), Self::TypeOnly(second)) => first.type_key == second.type_key,
            (Self::Instance(instance), Self::TypeOnly(annotation_type))
            | (Self::TypeOnly(annotation_type), Self::Instance(instance)) => {
                annotation_type.type_key == (**instance).annotation_type()
                    && (*annotation_type.default_instance()).dyn_eq(&**instance)
            }
            _ => false,
        }
    }
}

impl Eq for Qualifier {}

impl Hash for Qualifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Self::None => state.write_u8(0),
            Self::Named(name) => {
                state.write_u8(1);
                name.hash(state);
            }
            Self::Instance(instance) => {
                state.write_u8(2);
                (**instance).annotation_type().hash(state);
                (**instance).dyn_hash(state);
            }
            Self::TypeOnly(annotation_type) => {
                // must match the hash of an instance with default attributes
                state.write_u8(2);
                annotation_type.type_key.hash(state);
                (*annotation_type.default_instance()).dyn_hash(state);
            }
        }
    }
}

impl Display for Qualifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => Ok(()),
            Self::Named(name) => write!(f, "@named(\"{name}\")"),
            Self::Instance(instance) => write!(f, "@{instance:?}"),
            Self::TypeOnly(annotation_type) => write!(f, "@{}", annotation_type.type_key),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::qualifier::{AnnotationType, Qualifier, QualifierAnnotation};
    use fxhash::FxHasher;
    use std::hash::{Hash, Hasher};

    #[derive(Debug, Default, Eq, PartialEq, Hash)]
    struct Region {
        code: u8,
    }

    impl QualifierAnnotation for Region {}

    #[derive(Debug, Default, Eq, PartialEq, Hash)]
    struct Other {
        code: u8,
    }

    impl QualifierAnnotation for Other {}

    fn hash(qualifier: &Qualifier) -> u64 {
        let mut hasher = FxHasher::default();
        qualifier.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn should_compare_names() {
        assert_eq!(Qualifier::named("a"), Qualifier::named("a".to_string()));
        assert_ne!(Qualifier::named("a"), Qualifier::named("b"));
        assert_ne!(Qualifier::named("a"), Qualifier::None);
    }

    #[test]
    fn should_compare_annotations_by_value() {
        assert_eq!(
            Qualifier::annotated(Region { code: 1 }),
            Qualifier::annotated(Region { code: 1 })
        );
        assert_ne!(
            Qualifier::annotated(Region { code: 1 }),
            Qualifier::annotated(Region { code: 2 })
        );
        assert_ne!(
            Qualifier::annotated(Region { code: 0 }),
            Qualifier::annotated(Other { code: 0 })
        );
    }

    #[test]
    fn should_match_type_only_with_default_instance() {
        let type_only = Qualifier::TypeOnly(AnnotationType::of::<Region>());
        let default_instance = Qualifier::annotated(Region::default());

        assert_eq!(type_only, default_instance);
        assert_eq!(default_instance, type_only);
        assert_eq!(hash(&type_only), hash(&default_instance));

        assert_ne!(type_only, Qualifier::annotated(Region { code: 5 }));
        assert_ne!(type_only, Qualifier::annotated_with_type::<Other>());
    }
}
