//! Bindings connect keys with providers and scopes. A single binding composes a *creator*, which
//! gets an object from its provider and injects its members, with a scope. Multi-bindings aggregate
//! component bindings in registration order.

use crate::error::InjectionError;
use crate::injector::{Injector, InjectorInner};
use crate::instance::{Instance, Resolved};
use crate::key::{BindingKey, TypeKey};
use crate::provider::{InstanceProviderPtr, Producer, ProducerPtr};
use crate::scope::ScopePtr;
use itertools::Itertools;
use std::cell::RefCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError, Weak};
use tracing::trace;

/// A binding of a key to a provider in some scope.
pub(crate) struct SingleBinding {
    key: BindingKey,
    provider: InstanceProviderPtr,
    scope: ScopePtr,
    scoped: OnceLock<ProducerPtr>,
}

impl SingleBinding {
    pub fn new(key: BindingKey, provider: InstanceProviderPtr, scope: ScopePtr) -> Self {
        Self {
            key,
            provider,
            scope,
            scoped: OnceLock::new(),
        }
    }

    #[inline]
    pub fn key(&self) -> &BindingKey {
        &self.key
    }

    #[inline]
    pub fn target_type(&self) -> TypeKey {
        self.provider.target_type()
    }

    #[inline]
    pub fn is_eager(&self) -> bool {
        self.scope.is_eager()
    }

    /// Wires the scoped producer. Called once, after the injector is configured.
    pub fn post_configuration(&self, injector: Weak<InjectorInner>) {
        self.scoped.get_or_init(|| {
            let creator = Arc::new(Creator::new(
                self.key.clone(),
                self.provider.clone(),
                injector,
            ));
            self.scope.scope(&self.key, creator)
        });
    }

    fn producer(&self) -> Result<ProducerPtr, InjectionError> {
        self.scoped
            .get()
            .cloned()
            .ok_or(InjectionError::NotConfigured)
    }

    /// Resolves the requested key: a producer for provider keys, a value otherwise.
    pub fn resolve(&self, requested: &BindingKey) -> Result<Resolved, InjectionError> {
        let producer = self.producer()?;
        if requested.is_provider() {
            Ok(Resolved::Provider(producer))
        } else {
            producer.produce().map(Resolved::Instance)
        }
    }

    /// Creates the instance of an eager binding.
    pub fn initialize(&self) -> Result<(), InjectionError> {
        trace!(key = %self.key, "Initializing eager binding.");
        self.producer()?.produce().map(|_| ())
    }
}

#[derive(Clone)]
pub(crate) enum Binding {
    Single(Arc<SingleBinding>),
    Multi {
        key: BindingKey,
        components: Vec<Arc<SingleBinding>>,
    },
}

impl Binding {
    pub fn key(&self) -> &BindingKey {
        match self {
            Self::Single(binding) => binding.key(),
            Self::Multi { key, .. } => key,
        }
    }

    /// Appends components of another multi-binding. Returns the other binding back, if any of
    /// the bindings is not a multi-binding.
    pub fn merge(&mut self, other: Binding) -> Result<(), Binding> {
        match (self, other) {
            (
                Self::Multi { components, .. },
                Self::Multi {
                    components: other, ..
                },
            ) => {
                components.extend(other);
                Ok(())
            }
            (_, other) => Err(other),
        }
    }

    pub fn resolve(&self, requested: &BindingKey) -> Result<Resolved, InjectionError> {
        match self {
            Self::Single(binding) => binding.resolve(requested),
            Self::Multi { components, .. } => components
                .iter()
                .map(|component| component.resolve(requested))
                .try_collect()
                .map(Resolved::List),
        }
    }
}

static NEXT_CREATOR_ID: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    static CONSTRUCTING: RefCell<Vec<usize>> = RefCell::new(vec![]);
}

struct ConstructionGuard {
    id: usize,
}

impl ConstructionGuard {
    fn enter(id: usize, key: &BindingKey) -> Result<Self, InjectionError> {
        CONSTRUCTING.with(|constructing| {
            let mut constructing = constructing.borrow_mut();
            if constructing.contains(&id) {
                return Err(InjectionError::CircularDependency(key.clone()));
            }

            constructing.push(id);
            Ok(Self { id })
        })
    }
}

impl Drop for ConstructionGuard {
    fn drop(&mut self) {
        CONSTRUCTING.with(|constructing| {
            let mut constructing = constructing.borrow_mut();
            if let Some(position) = constructing.iter().rposition(|id| *id == self.id) {
                constructing.remove(position);
            }
        });
    }
}

/// Creates instances for a binding: gets an object from the provider and injects its members.
struct Creator {
    id: usize,
    key: BindingKey,
    provider: InstanceProviderPtr,
    injector: Weak<InjectorInner>,
    provider_injected: Mutex<bool>,
}

impl Creator {
    fn new(key: BindingKey, provider: InstanceProviderPtr, injector: Weak<InjectorInner>) -> Self {
        Self {
            id: NEXT_CREATOR_ID.fetch_add(1, Ordering::Relaxed),
            key,
            provider,
            injector,
            provider_injected: Mutex::new(false),
        }
    }

    fn inject_provider_members(&self, injector: &Injector) -> Result<(), InjectionError> {
        let mut injected = self
            .provider_injected
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if !*injected {
            self.provider.inject_members(injector)?;
            *injected = true;
        }

        Ok(())
    }
}

impl Producer for Creator {
    fn produce(&self) -> Result<Option<Instance>, InjectionError> {
        let _guard = ConstructionGuard::enter(self.id, &self.key)?;
        let injector = Injector::upgrade(&self.injector)?;

        self.inject_provider_members(&injector)?;

        match self.provider.provide(&injector)? {
            Some(provided) => {
                injector.inject_members_of(
                    &self.key,
                    provided.object_type,
                    provided.object.as_ref(),
                )?;
                Ok(Some(provided.instance))
            }
            None => Ok(None),
        }
    }
}
