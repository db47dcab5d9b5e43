use graft::application;
use graft::runner::{bind_runner, ApplicationRunner, ErrorPtr};
use graft_di::binder::{Binder, ModulePtr};
use graft_di::{implements, Injectable};

// this is an application runner, which will run when the application starts; runners are added to
// a multi-binding, which the application resolves
#[derive(Injectable)]
struct HelloWorldRunner;

#[implements]
impl ApplicationRunner for HelloWorldRunner {
    fn run(&self) -> Result<(), ErrorPtr> {
        println!("Hello world!");
        Ok(())
    }
}

// note: for the sake of simplicity, errors are unwrapped, rather than gracefully handled
fn main() {
    let module: ModulePtr = Box::new(|binder: &mut Binder| bind_runner::<HelloWorldRunner>(binder));

    // create our application with the configuration read from the environment
    let application =
        application::create_default(vec![module]).expect("unable to create default application");

    // prints "Hello world!"
    application.run().expect("error running application");
}
