// note: this example assumes you've analyzed the previous one

use graft::application;
use graft::config::ApplicationConfig;
use graft::runner::{bind_runner, ApplicationRunner, ErrorPtr};
use graft_di::binder::{Binder, ModulePtr};
use graft_di::instance::InstancePtr;
use graft_di::{implements, Injectable};

// application config is bound as an instance, so it can be injected into any type; its properties
// are additionally bound as strings qualified by their names
#[derive(Injectable)]
struct ConfigPrinterRunner {
    config: InstancePtr<ApplicationConfig>,
    #[inject(named = "greeting")]
    greeting: InstancePtr<String>,
}

#[implements]
impl ApplicationRunner for ConfigPrinterRunner {
    fn run(&self) -> Result<(), ErrorPtr> {
        println!("Using built-in logger: {}", self.config.install_tracing_logger);
        println!("Greeting: {}", self.greeting);
        Ok(())
    }
}

fn main() {
    // start with a default config and override what's needed; create_default() would read the
    // config from graft.json and GRAFT_ environment variables instead
    let mut config = ApplicationConfig::default().with_property("greeting", "Hi there");
    config.install_tracing_logger = false;

    let module: ModulePtr =
        Box::new(|binder: &mut Binder| bind_runner::<ConfigPrinterRunner>(binder));

    let application = application::create_with_config(config, vec![module])
        .expect("unable to create application");

    // prints "Using built-in logger: false" and "Greeting: Hi there"
    application.run().expect("error running application");
}
