// note: this example assumes you've analyzed the previous ones

use graft_di::binder::{Binder, ModulePtr};
use graft_di::injector::Injector;
use graft_di::instance::InstancePtr;
use graft_di::Injectable;

#[derive(Injectable)]
struct Greeting {
    #[inject(named = "greeting")]
    text: InstancePtr<String>,
    #[inject(named = "name")]
    name: InstancePtr<String>,
}

fn main() {
    let parent = Injector::builder()
        .with_module(|binder: &mut Binder| {
            binder
                .bind::<String>()
                .named("greeting")
                .to_instance("Hello".to_string());
            binder
                .bind::<String>()
                .named("name")
                .to_instance("world".to_string());
            binder.bind::<Greeting>();
        })
        .build()
        .expect("error building injector");

    // a child injector sees all bindings of its parent, but its own bindings take precedence
    let child_module: ModulePtr = Box::new(|binder: &mut Binder| {
        binder
            .bind::<String>()
            .named("name")
            .to_instance("child".to_string());
        binder.bind::<Greeting>();
    });
    let child = parent
        .create_child(vec![child_module])
        .expect("error building child injector");

    // prints "Hello world!"
    let greeting = parent.get_instance::<Greeting>().unwrap();
    println!("{} {}!", greeting.text, greeting.name);

    // prints "Hello child!"
    let greeting = child.get_instance::<Greeting>().unwrap();
    println!("{} {}!", greeting.text, greeting.name);

    // disposed injectors can no longer be used; prints "true"
    child.dispose();
    println!("{}", child.get_instance::<Greeting>().is_err());
}
