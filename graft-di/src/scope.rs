//! Scopes decide when to reuse or create an instance. A [Scope] wraps the creator of a binding into
//! a producer implementing its lifetime policy. There are three built-in scopes:
//!
//! * [PER_CALL] - every request creates a new instance
//! * [SINGLETON] - the first instance is created lazily and reused afterwards
//! * [EAGER_SINGLETON] - like [SINGLETON], but the instance is created as soon as the injector
//! is configured
//!
//! Custom scopes can be registered by name, e.g. scopes tied to a thread or a web session.
//!
//! Note: scope resolution happens at instance creation time, so mixing incompatible scopes can lead
//! to unexpected results, e.g. a [singleton](SINGLETON) depending on a [per-call](PER_CALL)
//! dependency will hold on to the single dependency instance created along with it.

use crate::error::InjectionError;
use crate::instance::Instance;
use crate::key::BindingKey;
use crate::provider::{Producer, ProducerPtr};
use fxhash::FxHashMap;
#[cfg(test)]
use mockall::automock;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use std::thread::{self, ThreadId};
use tracing::trace;

pub type ScopePtr = Arc<dyn Scope>;

pub type ScopeRegistry = FxHashMap<String, ScopePtr>;

/// Name of the [PerCallScope].
pub const PER_CALL: &str = "PER_CALL";

/// Name of the lazy [SingletonScope].
pub const SINGLETON: &str = "SINGLETON";

/// Name of the eager [SingletonScope].
pub const EAGER_SINGLETON: &str = "EAGER_SINGLETON";

/// Lifetime policy for instances. See module documentation for information on scopes.
#[cfg_attr(test, automock)]
pub trait Scope: Send + Sync {
    /// Wraps the creator of instances for given key into a producer implementing this scope.
    fn scope(&self, key: &BindingKey, creator: ProducerPtr) -> ProducerPtr;

    /// Should instances in this scope be created right after injector configuration.
    fn is_eager(&self) -> bool {
        false
    }
}

/// Scope returning the creator unchanged, thus creating a new instance on each request.
#[derive(Default, Copy, Clone, Eq, PartialEq, Debug)]
pub struct PerCallScope;

impl Scope for PerCallScope {
    #[inline]
    fn scope(&self, _key: &BindingKey, creator: ProducerPtr) -> ProducerPtr {
        creator
    }
}

/// Scope for instances shared between all dependents. Stateless services are good candidates to
/// be stored in the singleton scope.
#[derive(Default, Copy, Clone, Eq, PartialEq, Debug)]
pub struct SingletonScope {
    eager: bool,
}

impl SingletonScope {
    pub fn lazy() -> Self {
        Self { eager: false }
    }

    pub fn eager() -> Self {
        Self { eager: true }
    }
}

impl Scope for SingletonScope {
    fn scope(&self, key: &BindingKey, creator: ProducerPtr) -> ProducerPtr {
        Arc::new(SingletonProducer::new(key.clone(), creator))
    }

    #[inline]
    fn is_eager(&self) -> bool {
        self.eager
    }
}

/// Creates a registry with all built-in scopes.
pub fn default_scopes() -> ScopeRegistry {
    [
        (PER_CALL.to_string(), Arc::new(PerCallScope) as ScopePtr),
        (
            SINGLETON.to_string(),
            Arc::new(SingletonScope::lazy()) as ScopePtr,
        ),
        (
            EAGER_SINGLETON.to_string(),
            Arc::new(SingletonScope::eager()) as ScopePtr,
        ),
    ]
    .into_iter()
    .collect()
}

/// Memoizing producer. Initialized values are read without locking, while construction is
/// serialized by the write side of a reader/writer lock. Re-entering construction from the
/// constructing thread is reported as a circular dependency. Failures are never cached.
struct SingletonProducer {
    key: BindingKey,
    creator: ProducerPtr,
    instance: OnceLock<Option<Instance>>,
    constructing: RwLock<Option<ThreadId>>,
    lock: RwLock<()>,
}

impl SingletonProducer {
    fn new(key: BindingKey, creator: ProducerPtr) -> Self {
        Self {
            key,
            creator,
            instance: OnceLock::new(),
            constructing: RwLock::new(None),
            lock: RwLock::new(()),
        }
    }

    fn is_constructing_in(&self, thread: ThreadId) -> bool {
        *self
            .constructing
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            == Some(thread)
    }
}

impl Producer for SingletonProducer {
    fn produce(&self) -> Result<Option<Instance>, InjectionError> {
        if let Some(instance) = self.instance.get() {
            return Ok(instance.clone());
        }

        let current = thread::current().id();
        if self.is_constructing_in(current) {
            return Err(InjectionError::CircularDependency(self.key.clone()));
        }

        let _lock = self.lock.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(instance) = self.instance.get() {
            return Ok(instance.clone());
        }

        *self
            .constructing
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(current);
        let _constructing = ConstructingGuard(&self.constructing);

        trace!(key = %self.key, "Creating singleton instance.");
        let instance = self.creator.produce()?;
        Ok(self.instance.get_or_init(|| instance).clone())
    }
}

struct ConstructingGuard<'a>(&'a RwLock<Option<ThreadId>>);

impl Drop for ConstructingGuard<'_> {
    fn drop(&mut self) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

#[cfg(test)]
mod tests {
    use crate::error::InjectionError;
    use crate::instance::{Instance, InstancePtr};
    use crate::key::BindingKey;
    use crate::provider::{Producer, ProducerPtr};
    use crate::scope::{
        default_scopes, PerCallScope, Scope, SingletonScope, EAGER_SINGLETON, PER_CALL, SINGLETON,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier, OnceLock};
    use std::thread;

    fn counting_creator(calls: Arc<AtomicUsize>) -> ProducerPtr {
        Arc::new(move || -> Result<Option<Instance>, InjectionError> {
            let value = calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some(Instance::new(InstancePtr::new(value))))
        })
    }

    fn value(producer: &ProducerPtr) -> usize {
        *producer
            .produce()
            .unwrap()
            .unwrap()
            .downcast::<usize>()
            .unwrap()
    }

    #[test]
    fn should_register_built_in_scopes() {
        let scopes = default_scopes();
        assert_eq!(scopes.len(), 3);
        assert!(!scopes[PER_CALL].is_eager());
        assert!(!scopes[SINGLETON].is_eager());
        assert!(scopes[EAGER_SINGLETON].is_eager());
    }

    #[test]
    fn should_create_per_call_instances() {
        let calls = Arc::new(AtomicUsize::new(0));
        let producer = PerCallScope.scope(&BindingKey::of::<usize>(), counting_creator(calls));

        assert_eq!(value(&producer), 0);
        assert_eq!(value(&producer), 1);
    }

    #[test]
    fn should_memoize_singletons() {
        let calls = Arc::new(AtomicUsize::new(0));
        let producer =
            SingletonScope::lazy().scope(&BindingKey::of::<usize>(), counting_creator(calls.clone()));

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(value(&producer), 0);
        assert_eq!(value(&producer), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn should_memoize_null_singletons() {
        let calls = Arc::new(AtomicUsize::new(0));
        let creator = {
            let calls = calls.clone();
            Arc::new(move || -> Result<Option<Instance>, InjectionError> {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(None)
            }) as ProducerPtr
        };

        let producer = SingletonScope::lazy().scope(&BindingKey::of::<usize>(), creator);
        assert!(producer.produce().unwrap().is_none());
        assert!(producer.produce().unwrap().is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn should_not_cache_failures() {
        let calls = Arc::new(AtomicUsize::new(0));
        let creator = {
            let calls = calls.clone();
            Arc::new(move || -> Result<Option<Instance>, InjectionError> {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(InjectionError::NoSuchBinding(BindingKey::of::<u8>()))
                } else {
                    Ok(Some(Instance::new(InstancePtr::new(1usize))))
                }
            }) as ProducerPtr
        };

        let producer = SingletonScope::lazy().scope(&BindingKey::of::<usize>(), creator);
        assert!(producer.produce().is_err());
        assert_eq!(value(&producer), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn should_detect_reentrant_construction() {
        let key = BindingKey::of::<usize>();
        let producer_cell: Arc<OnceLock<ProducerPtr>> = Arc::new(OnceLock::new());

        let creator = {
            let producer_cell = producer_cell.clone();
            Arc::new(move || -> Result<Option<Instance>, InjectionError> {
                producer_cell
                    .get()
                    .expect("producer should be set")
                    .produce()
            }) as ProducerPtr
        };

        let producer = SingletonScope::lazy().scope(&key, creator);
        assert!(producer_cell.set(producer.clone()).is_ok());

        assert!(matches!(
            producer.produce().unwrap_err(),
            InjectionError::CircularDependency(error_key) if error_key == key
        ));

        // state is reset after the failure
        assert!(matches!(
            producer.produce().unwrap_err(),
            InjectionError::CircularDependency(_)
        ));
    }

    #[test]
    fn should_create_single_instance_across_threads() {
        let calls = Arc::new(AtomicUsize::new(0));
        let producer =
            SingletonScope::lazy().scope(&BindingKey::of::<usize>(), counting_creator(calls.clone()));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let producer = producer.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    value(&producer)
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 0);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
