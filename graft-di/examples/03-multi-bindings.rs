// note: this example assumes you've analyzed the previous ones

use graft_di::binder::Binder;
use graft_di::injector::Injector;
use graft_di::instance::InstancePtr;
use graft_di::{implements, Injectable};

trait Plugin: Send + Sync {
    fn name(&self) -> &str;
}

#[derive(Injectable)]
struct Compression;

#[implements]
impl Plugin for Compression {
    fn name(&self) -> &str {
        "compression"
    }
}

#[derive(Injectable)]
struct Encryption;

#[implements]
impl Plugin for Encryption {
    fn name(&self) -> &str {
        "encryption"
    }
}

struct Logging {
    name: String,
}

#[implements]
impl Plugin for Logging {
    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Injectable)]
struct Pipeline {
    // a list of all elements added to the multi-binding, in order of addition
    plugins: Vec<InstancePtr<dyn Plugin>>,
}

fn main() {
    let injector = Injector::builder()
        .with_module(|binder: &mut Binder| {
            let mut plugins = binder.multi_bind::<dyn Plugin>();
            plugins.add_binding().to::<Compression>();
            plugins.add_binding().to::<Encryption>();
        })
        // other modules can contribute to the same multi-binding
        .with_module(|binder: &mut Binder| {
            binder
                .multi_bind::<dyn Plugin>()
                .add_binding()
                .to_instance(Logging {
                    name: "logging".to_string(),
                });
            binder.bind::<Pipeline>();
        })
        .build()
        .expect("error building injector");

    let pipeline = injector.get_instance::<Pipeline>().unwrap();

    // prints "compression", "encryption" and "logging"
    for plugin in &pipeline.plugins {
        println!("{}", plugin.name());
    }

    // lists can be retrieved directly as well
    println!("{}", injector.get_list::<dyn Plugin>().unwrap().len());
}
