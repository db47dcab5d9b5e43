//! Dependency injection container with typed binding keys, scopes, providers and multi-bindings.
//!
//! An [Injector](injector::Injector) is configured by [Module](binder::Module)s, which bind
//! [keys](key::BindingKey) to targets using a [Binder](binder::Binder). Types constructed by the
//! injector describe themselves with a [TypeDescriptor](injectable::TypeDescriptor), usually
//! generated by `#[derive(Injectable)]`. Trait objects can be bound to concrete types marked with
//! `#[implements]`.
//!
//! ```
//! use graft_di::binder::Binder;
//! use graft_di::injector::Injector;
//! use graft_di::instance::InstancePtr;
//! use graft_di::{implements, Injectable};
//!
//! trait Storage: Send + Sync {
//!     fn load(&self) -> String;
//! }
//!
//! #[derive(Injectable)]
//! struct MemoryStorage;
//!
//! #[implements]
//! impl Storage for MemoryStorage {
//!     fn load(&self) -> String {
//!         "data".to_string()
//!     }
//! }
//!
//! #[derive(Injectable)]
//! struct Service {
//!     storage: InstancePtr<dyn Storage>,
//! }
//!
//! let injector = Injector::builder()
//!     .with_module(|binder: &mut Binder| {
//!         binder.bind::<dyn Storage>().to::<MemoryStorage>();
//!         binder.bind::<Service>();
//!     })
//!     .build()
//!     .unwrap();
//!
//! let service = injector.get_instance::<Service>().unwrap();
//! assert_eq!(service.storage.load(), "data");
//! ```
//!
//! ### Features
//!
//! * `derive` - automatically derive type descriptors and trait implementations (default)

extern crate self as graft_di;

pub mod binder;
pub(crate) mod binding;
pub mod error;
pub mod injectable;
pub mod injection_point;
pub mod injection_point_loader;
pub mod injection_target;
pub mod injector;
pub mod instance;
pub mod key;
pub mod listener;
pub mod names;
pub mod provider;
pub mod qualifier;
pub mod scope;

#[cfg(feature = "derive")]
pub use graft_di_derive::{implements, Injectable};
