use crate::key::BindingKey;
use std::error::Error;
use std::fmt::Display;
use std::sync::Arc;
use thiserror::Error;

/// Shared error, usually coming from user code (constructors, providers, factory methods).
pub type ErrorPtr = Arc<dyn Error + Send + Sync>;

/// Owned error type returned by user-supplied construction code.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// Errors related to resolving bindings and creating instances.
#[derive(Error, Clone, Debug)]
pub enum InjectionError {
    #[error("No binding registered for key: {0}")]
    NoSuchBinding(BindingKey),
    #[error("Circular dependency detected while creating: {0}")]
    CircularDependency(BindingKey),
    #[error("Key {key} resolved to null, which is not allowed in: {point}")]
    NullNotAllowed { key: BindingKey, point: String },
    #[error("Error when injecting dependency into {}: {cause}", .path.join(" <- "))]
    ConstructionFailure { path: Vec<String>, cause: ErrorPtr },
    #[error("Cannot find a usable constructor for type: {0}")]
    NoUsableConstructor(&'static str),
    #[error("Instance bound to {key} is not compatible with requested type: {expected}")]
    IncompatibleType {
        key: BindingKey,
        expected: &'static str,
    },
    #[error("Missing injected argument of type: {0}")]
    MissingArgument(&'static str),
    #[error("The injector is not configured yet")]
    NotConfigured,
    #[error("The injector has been disposed")]
    Disposed,
}

impl InjectionError {
    /// Wraps an error returned from user code, which failed while executing the given injection
    /// point. Injection errors raised by nested resolutions are passed through, only gaining the
    /// point in their path if they already are construction failures.
    pub fn construction<P: Display + ?Sized>(point: &P, error: BoxError) -> Self {
        match error.downcast::<InjectionError>() {
            Ok(error) => (*error).within(point),
            Err(error) => Self::ConstructionFailure {
                path: vec![point.to_string()],
                cause: Arc::from(error),
            },
        }
    }

    /// Prepends given point to the path of a construction failure. Other errors are returned
    /// unchanged.
    pub fn within<P: Display + ?Sized>(self, point: &P) -> Self {
        match self {
            Self::ConstructionFailure { mut path, cause } => {
                path.insert(0, point.to_string());
                Self::ConstructionFailure { path, cause }
            }
            error => error,
        }
    }
}

/// Errors related to configuring an injector: registering bindings, scopes and listeners.
#[derive(Error, Clone, Debug)]
pub enum ConfigurationError {
    #[error("Attempted to register a duplicate binding for key: {0}")]
    DuplicateBinding(BindingKey),
    #[error("Invalid binding configuration: {0}")]
    BindingBuilderMisuse(String),
    #[error("Bindings can not be registered after the injector is configured")]
    ConfigurationClosed,
    #[error("Invalid factory method {method}: {reason}")]
    InvalidFactoryMethod { method: String, reason: String },
    #[error("Scope is already bound to name: {0}")]
    DuplicateScope(String),
    #[error("The module list must not be empty")]
    NoModules,
    #[error("Error initializing eager singletons: {0}")]
    EagerInitialization(#[from] InjectionError),
}
