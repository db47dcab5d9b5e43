//! Framework configuration is represented by [ApplicationConfig], bound as an instance by the
//! [ConfigModule]. [Application](crate::application::Application) uses this config to configure
//! itself, but it can also be injected into any other type. Configuration properties are
//! additionally bound as [String]s qualified by their names.
//!
//! By default, the config is created with opinionated default values, which can then be overwritten
//! by environment variables prefixed with `GRAFT_` or `graft.json` file. Nested values in
//! environment variables are separated by `__`, e.g. `GRAFT_PROPERTIES__HOST=localhost`.

use config::{Config, ConfigError, Environment, File};
use derive_more::Constructor;
use graft_di::binder::{Binder, Module};
use graft_di::names::bind_properties;
use serde::Deserialize;
use std::collections::BTreeMap;

const CONFIG_ENV_PREFIX: &str = "GRAFT";
const CONFIG_ENV_SEPARATOR: &str = "__";

/// Name of the default config file.
pub const CONFIG_FILE: &str = "graft.json";

/// Framework configuration.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq)]
pub struct ApplicationConfig {
    /// Should a default tracing logger be installed in the scope of the application.
    pub install_tracing_logger: bool,
    /// Named values bound as qualified [String]s.
    pub properties: BTreeMap<String, String>,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            install_tracing_logger: true,
            properties: Default::default(),
        }
    }
}

impl From<OptionalApplicationConfig> for ApplicationConfig {
    fn from(value: OptionalApplicationConfig) -> Self {
        let default = Self::default();
        Self {
            install_tracing_logger: value
                .install_tracing_logger
                .unwrap_or(default.install_tracing_logger),
            properties: value.properties.unwrap_or(default.properties),
        }
    }
}

impl ApplicationConfig {
    /// Reads the config from the default config file and the environment.
    pub fn init_from_environment() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX).separator(CONFIG_ENV_SEPARATOR),
            )
            .build()
            .and_then(|config| config.try_deserialize::<OptionalApplicationConfig>())
            .map(|config| config.into())
    }

    /// Sets a property, returning the updated config.
    pub fn with_property<K: Into<String>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }
}

/// Binds the [ApplicationConfig] instance and all its properties.
#[derive(Constructor, Clone, Debug)]
pub struct ConfigModule {
    config: ApplicationConfig,
}

impl Module for ConfigModule {
    fn configure(&self, binder: &mut Binder) {
        binder
            .bind::<ApplicationConfig>()
            .to_instance(self.config.clone());
        bind_properties(binder, self.config.properties.clone());
    }
}

#[derive(Deserialize)]
struct OptionalApplicationConfig {
    install_tracing_logger: Option<bool>,
    properties: Option<BTreeMap<String, String>>,
}

#[cfg(test)]
mod tests {
    use crate::config::{ApplicationConfig, ConfigModule, OptionalApplicationConfig};
    use graft_di::injector::Injector;
    use graft_di::key::BindingKey;

    #[test]
    fn should_fill_missing_values_with_defaults() {
        let config = ApplicationConfig::from(OptionalApplicationConfig {
            install_tracing_logger: None,
            properties: None,
        });

        assert_eq!(config, ApplicationConfig::default());

        let config = ApplicationConfig::from(OptionalApplicationConfig {
            install_tracing_logger: Some(false),
            properties: None,
        });

        assert!(!config.install_tracing_logger);
    }

    #[test]
    fn should_bind_config_and_properties() {
        let config = ApplicationConfig::default().with_property("greeting", "hello");
        let injector = Injector::builder()
            .with_module(ConfigModule::new(config.clone()))
            .build()
            .unwrap();

        assert_eq!(
            *injector.get_instance::<ApplicationConfig>().unwrap(),
            config
        );
        assert_eq!(
            *injector
                .get_instance_by_key::<String>(&BindingKey::named::<String, _>("greeting"))
                .unwrap(),
            "hello"
        );
    }
}
