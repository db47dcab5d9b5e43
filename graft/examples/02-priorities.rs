// note: this example assumes you've analyzed the previous one

use graft::application;
use graft::runner::{bind_runner, ApplicationRunner, ErrorPtr};
use graft_di::binder::{Binder, ModulePtr};
use graft_di::{implements, Injectable};

#[derive(Injectable)]
struct PrintHelloRunner;

#[implements]
impl ApplicationRunner for PrintHelloRunner {
    fn run(&self) -> Result<(), ErrorPtr> {
        print!("Hello ");
        Ok(())
    }

    // for ordered execution of application runners, priorities can be used
    fn priority(&self) -> i8 {
        3
    }
}

#[derive(Injectable)]
struct PrintWorldRunner;

#[implements]
impl ApplicationRunner for PrintWorldRunner {
    fn run(&self) -> Result<(), ErrorPtr> {
        print!("world");
        Ok(())
    }

    fn priority(&self) -> i8 {
        2
    }
}

#[derive(Injectable)]
struct PrintExclamationRunner;

#[implements]
impl ApplicationRunner for PrintExclamationRunner {
    fn run(&self) -> Result<(), ErrorPtr> {
        println!("!");
        Ok(())
    }

    fn priority(&self) -> i8 {
        1
    }
}

fn main() {
    // runners are bound in reverse order, but priorities decide the execution order
    let module: ModulePtr = Box::new(|binder: &mut Binder| {
        bind_runner::<PrintExclamationRunner>(binder);
        bind_runner::<PrintWorldRunner>(binder);
        bind_runner::<PrintHelloRunner>(binder);
    });

    let application =
        application::create_default(vec![module]).expect("unable to create default application");

    // prints "Hello world!"
    application.run().expect("error running application");
}
