//! Helpers for binding named values, e.g. configuration properties.

use crate::binder::Binder;
use crate::qualifier::Qualifier;

/// Creates a [Qualifier::Named] for given name.
#[inline]
pub fn named<N: AsRef<str>>(name: N) -> Qualifier {
    Qualifier::named(name)
}

/// Binds every `(name, value)` pair as a [String] instance qualified by the name.
pub fn bind_properties<I, K, V>(binder: &mut Binder, properties: I)
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<String>,
{
    for (name, value) in properties {
        binder
            .bind::<String>()
            .named(name)
            .to_instance(value.into());
    }
}

#[cfg(test)]
mod tests {
    use crate::binder::Binder;
    use crate::injector::Injector;
    use crate::key::BindingKey;
    use crate::names::{bind_properties, named};
    use crate::qualifier::Qualifier;

    #[test]
    fn should_create_named_qualifier() {
        assert_eq!(named("name"), Qualifier::named("name"));
    }

    #[test]
    fn should_bind_properties() {
        let injector = Injector::builder()
            .with_module(|binder: &mut Binder| {
                bind_properties(binder, [("host", "localhost"), ("port", "8080")]);
            })
            .build()
            .unwrap();

        let port = injector
            .get_instance_by_key::<String>(&BindingKey::named::<String, _>("port"))
            .unwrap();
        assert_eq!(*port, "8080");
        assert!(injector
            .get_if_present::<String>()
            .unwrap()
            .is_none());
    }
}
