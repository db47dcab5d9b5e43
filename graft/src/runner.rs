//! Runners executing actual application logic.

use graft_di::binder::Binder;
pub use graft_di::error::ErrorPtr;
use graft_di::injectable::Injectable;
use graft_di::instance::Implements;
#[cfg(test)]
use mockall::automock;

/// Runs application logic. Runners are run by the [Application](crate::application::Application)
/// and are discovered as components of the `dyn ApplicationRunner` multi-binding.
#[cfg_attr(test, automock)]
pub trait ApplicationRunner: Send + Sync {
    /// Runs any application code.
    fn run(&self) -> Result<(), ErrorPtr>;

    /// Returns the priority for this runner. Higher priorities get run first. Default 0.
    fn priority(&self) -> i8 {
        0
    }
}

/// Adds a runner type to the runner multi-binding.
pub fn bind_runner<R: Injectable + Implements<dyn ApplicationRunner>>(binder: &mut Binder) {
    binder
        .multi_bind::<dyn ApplicationRunner>()
        .add_binding()
        .to::<R>();
}
