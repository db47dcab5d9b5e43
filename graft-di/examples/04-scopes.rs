// note: this example assumes you've analyzed the previous ones

use fxhash::FxHashMap;
use graft_di::binder::Binder;
use graft_di::error::InjectionError;
use graft_di::injector::Injector;
use graft_di::instance::{Instance, InstancePtr};
use graft_di::key::BindingKey;
use graft_di::provider::ProducerPtr;
use graft_di::scope::Scope;
use graft_di::Injectable;
use std::cell::RefCell;
use std::sync::Arc;

// scopes decide when new instances are created; by default, every request creates a new one
// (PER_CALL), while SINGLETON and EAGER_SINGLETON share a single instance

// a type declaring its own scope - every binding to it will be a singleton, unless overridden
#[derive(Injectable)]
#[injectable(scope = "SINGLETON")]
struct ConnectionPool;

#[derive(Injectable)]
struct Request;

#[derive(Injectable)]
struct Session;

thread_local! {
    static SESSIONS: RefCell<FxHashMap<BindingKey, Option<Instance>>> = Default::default();
}

// custom scopes wrap the creator of instances; this one keeps instances per thread
struct ThreadScope;

impl Scope for ThreadScope {
    fn scope(&self, key: &BindingKey, creator: ProducerPtr) -> ProducerPtr {
        let key = key.clone();
        Arc::new(move || -> Result<Option<Instance>, InjectionError> {
            if let Some(instance) = SESSIONS.with(|sessions| sessions.borrow().get(&key).cloned()) {
                return Ok(instance);
            }

            let instance = creator.produce()?;
            SESSIONS.with(|sessions| sessions.borrow_mut().insert(key.clone(), instance.clone()));
            Ok(instance)
        })
    }
}

fn main() {
    let injector = Injector::builder()
        .with_module(|binder: &mut Binder| {
            binder.bind::<ConnectionPool>();
            binder.bind::<Request>();

            // scopes need to be bound before use
            binder.bind_scope("THREAD", Arc::new(ThreadScope));
            binder.bind::<Session>().in_scope("THREAD");
        })
        .build()
        .expect("error building injector");

    // prints "true"
    let first = injector.get_instance::<ConnectionPool>().unwrap();
    let second = injector.get_instance::<ConnectionPool>().unwrap();
    println!("{}", InstancePtr::ptr_eq(&first, &second));

    // prints "false"
    let first = injector.get_instance::<Request>().unwrap();
    let second = injector.get_instance::<Request>().unwrap();
    println!("{}", InstancePtr::ptr_eq(&first, &second));

    // prints "true", then "false"
    let first = injector.get_instance::<Session>().unwrap();
    let second = injector.get_instance::<Session>().unwrap();
    println!("{}", InstancePtr::ptr_eq(&first, &second));

    let other = {
        let injector = injector.clone();
        std::thread::spawn(move || injector.get_instance::<Session>().unwrap())
            .join()
            .unwrap()
    };
    println!("{}", InstancePtr::ptr_eq(&first, &other));
}
