use graft_di::binder::Binder;
use graft_di::injector::Injector;
use graft_di::instance::InstancePtr;
use graft_di::{implements, Injectable};

// this is a trait we would like to use in our type; bound traits need to be Send + Sync
trait Greeter: Send + Sync {
    fn greet(&self);
}

// this is a dependency which implements the above trait and can be constructed by the injector
#[derive(Injectable)]
struct HelloGreeter;

// we're telling the injector HelloGreeter can be bound as dyn Greeter
#[implements]
impl Greeter for HelloGreeter {
    fn greet(&self) {
        println!("Hello world!");
    }
}

// this is another type, but with a dependency
#[derive(Injectable)]
struct Application {
    // the injector will resolve the binding for dyn Greeter, when asked for Application
    greeter: InstancePtr<dyn Greeter>,
}

impl Application {
    fn run(&self) {
        self.greeter.greet();
    }
}

// note: for the sake of simplicity, errors are unwrapped, rather than gracefully handled
fn main() {
    // bindings are configured by modules - any closure taking a Binder is a module
    let injector = Injector::builder()
        .with_module(|binder: &mut Binder| {
            binder.bind::<dyn Greeter>().to::<HelloGreeter>();
            // with no target, the type itself is constructed
            binder.bind::<Application>();
        })
        .build()
        .expect("error building injector");

    let application = injector
        .get_instance::<Application>()
        .expect("error creating Application");

    // prints "Hello world!"
    application.run();
}
