//! Core application framework functionality.

use crate::config::{ApplicationConfig, ConfigModule};
use crate::runner::{ApplicationRunner, ErrorPtr};
use config::ConfigError;
use derive_more::Constructor;
use graft_di::binder::ModulePtr;
use graft_di::error::{ConfigurationError, InjectionError};
use graft_di::injector::Injector;
use graft_di::instance::InstancePtr;
use std::cmp::Reverse;
use thiserror::Error;
use tracing::info;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::EnvFilter;

#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("Error reading configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Error configuring injector: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("Error retrieving runners: {0}")]
    Injection(#[from] InjectionError),
    #[error("Runner error: {0}")]
    Runner(ErrorPtr),
}

/// Main entrypoint for the application. Bootstraps the application and runs
/// [ApplicationRunners](ApplicationRunner).
#[derive(Constructor)]
pub struct Application {
    injector: Injector,
}

impl Application {
    pub fn injector(&self) -> &Injector {
        &self.injector
    }

    /// Runs all bound runners by descending priority. Runners with equal priorities run in
    /// binding order.
    pub fn run(&self) -> Result<(), ApplicationError> {
        let _logger = self
            .injector
            .get_if_present::<ApplicationConfig>()?
            .filter(|config| config.install_tracing_logger)
            .map(|_| install_tracing_logger());

        info!("Searching for application runners...");

        let mut runners = self
            .injector
            .get::<Option<Vec<InstancePtr<dyn ApplicationRunner>>>>()?
            .unwrap_or_default();

        runners.sort_by_key(|runner| Reverse(runner.priority()));

        info!(count = runners.len(), "Running application runners...");

        for runner in &runners {
            runner.run().map_err(ApplicationError::Runner)?;
        }

        Ok(())
    }
}

fn install_tracing_logger() -> DefaultGuard {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).finish();
    tracing::subscriber::set_default(subscriber)
}

/// Creates an application with config read from the environment (see [crate::config]) and given
/// modules.
pub fn create_default<I: IntoIterator<Item = ModulePtr>>(
    modules: I,
) -> Result<Application, ApplicationError> {
    let config = ApplicationConfig::init_from_environment()?;
    create_with_config(config, modules)
}

/// Creates an application with explicit config and given modules.
pub fn create_with_config<I: IntoIterator<Item = ModulePtr>>(
    config: ApplicationConfig,
    modules: I,
) -> Result<Application, ApplicationError> {
    let injector = Injector::builder()
        .with_module(ConfigModule::new(config))
        .with_modules(modules)
        .build()?;

    Ok(Application::new(injector))
}

#[cfg(test)]
mod tests {
    use crate::application::{create_with_config, ApplicationError};
    use crate::config::ApplicationConfig;
    use crate::runner::{ApplicationRunner, ErrorPtr, MockApplicationRunner};
    use graft_di::binder::{Binder, ModulePtr};
    use graft_di::instance::{Implements, InstancePtr};
    use std::io;
    use std::sync::{Arc, Mutex};

    impl Implements<dyn ApplicationRunner> for MockApplicationRunner {
        fn upcast(self: InstancePtr<Self>) -> InstancePtr<dyn ApplicationRunner> {
            self
        }
    }

    fn quiet_config() -> ApplicationConfig {
        let mut config = ApplicationConfig::default();
        config.install_tracing_logger = false;
        config
    }

    fn runners_module(runners: Vec<InstancePtr<MockApplicationRunner>>) -> ModulePtr {
        Box::new(move |binder: &mut Binder| {
            let mut multi = binder.multi_bind::<dyn ApplicationRunner>();
            for runner in &runners {
                multi.add_binding().to_shared_instance(runner.clone());
            }
        })
    }

    fn ordered_runner(priority: i8, order: Arc<Mutex<Vec<i8>>>) -> InstancePtr<MockApplicationRunner> {
        let mut runner = MockApplicationRunner::new();
        runner.expect_priority().return_const(priority);
        runner.expect_run().times(1).returning(move || {
            order.lock().unwrap().push(priority);
            Ok(())
        });

        InstancePtr::new(runner)
    }

    #[test]
    fn should_run_without_runners() {
        let application =
            create_with_config(quiet_config(), vec![runners_module(vec![])]).unwrap();
        assert!(application.run().is_ok());
    }

    #[test]
    fn should_run_runners_by_priority() {
        let order = Arc::new(Mutex::new(vec![]));
        let runners = vec![
            ordered_runner(-128, order.clone()),
            ordered_runner(5, order.clone()),
            ordered_runner(0, order.clone()),
        ];

        let application = create_with_config(quiet_config(), vec![runners_module(runners)]).unwrap();
        application.run().unwrap();

        assert_eq!(*order.lock().unwrap(), [5, 0, -128]);
    }

    #[test]
    fn should_return_runner_error() {
        let mut runner = MockApplicationRunner::new();
        runner.expect_priority().return_const(0);
        runner
            .expect_run()
            .returning(|| Err(Arc::new(io::Error::from(io::ErrorKind::Other)) as ErrorPtr));

        let application = create_with_config(
            quiet_config(),
            vec![runners_module(vec![InstancePtr::new(runner)])],
        )
        .unwrap();

        assert!(matches!(
            application.run().unwrap_err(),
            ApplicationError::Runner(_)
        ));
    }

    #[test]
    fn should_return_configuration_error() {
        let module: ModulePtr = Box::new(|binder: &mut Binder| {
            binder.bind::<ApplicationConfig>().to_instance(ApplicationConfig::default());
        });

        assert!(matches!(
            create_with_config(quiet_config(), vec![module]),
            Err(ApplicationError::Configuration(_))
        ));
    }
}
