// note: this example assumes you've analyzed the previous one

use graft_di::binder::Binder;
use graft_di::injector::Injector;
use graft_di::instance::InstancePtr;
use graft_di::key::BindingKey;
use graft_di::names::bind_properties;
use graft_di::qualifier::QualifierAnnotation;
use graft_di::Injectable;

// qualifiers distinguish bindings of the same type; annotations are user types with equality
#[derive(Debug, Default, Eq, PartialEq, Hash)]
struct Primary;

impl QualifierAnnotation for Primary {}

#[derive(Injectable)]
struct Team {
    // named dependencies are resolved by a name qualifier
    #[inject(named = "SanJose")]
    name: InstancePtr<String>,
}

fn main() {
    let injector = Injector::builder()
        .with_module(|binder: &mut Binder| {
            // every pair is bound as a String qualified by the name
            bind_properties(binder, [("SanJose", "Sharks"), ("Edmonton", "Oilers")]);

            binder
                .bind::<String>()
                .annotated_with(Primary)
                .to_instance("Primary".to_string());

            binder.bind::<Team>();
        })
        .build()
        .expect("error building injector");

    // prints "Sharks"
    println!("{}", injector.get_instance::<Team>().unwrap().name);

    // prints "Oilers"
    let edmonton = injector
        .get_instance_by_key::<String>(&BindingKey::named::<String, _>("Edmonton"))
        .unwrap();
    println!("{edmonton}");

    // annotation type keys are equal to keys with default annotation instances; prints "Primary"
    let primary = injector
        .get_instance_by_key::<String>(&BindingKey::annotated_with_type::<String, Primary>())
        .unwrap();
    println!("{primary}");

    // prints "true"
    let calgary = injector.get_instance_by_key::<String>(&BindingKey::named::<String, _>("Calgary"));
    println!("{}", calgary.is_err());
}
