// note: this example assumes you've analyzed the previous ones

use graft_di::binder::Binder;
use graft_di::error::BoxError;
use graft_di::injector::Injector;
use graft_di::instance::InstancePtr;
use graft_di::provider::{Provide, Provider};
use graft_di::Injectable;
use std::sync::atomic::{AtomicU32, Ordering};

#[derive(Debug)]
struct Ticket {
    number: u32,
}

// providers are user types creating values; this one needs a dependency itself, so it's
// constructed by the injector
#[derive(Injectable)]
struct TicketMachine {
    #[inject(named = "prefix")]
    prefix: InstancePtr<String>,
    #[inject(default)]
    next: AtomicU32,
}

impl Provide for TicketMachine {
    type Output = Ticket;

    // returning None would represent a null value
    fn provide(&self) -> Result<Option<Ticket>, BoxError> {
        let number = self.next.fetch_add(1, Ordering::SeqCst);
        println!("{} issuing ticket {number}", self.prefix);
        Ok(Some(Ticket { number }))
    }
}

#[derive(Injectable)]
struct Queue {
    // providers delay creation until get() is called; every call asks the binding again
    tickets: Provider<Ticket>,
}

fn main() {
    let injector = Injector::builder()
        .with_module(|binder: &mut Binder| {
            binder
                .bind::<String>()
                .named("prefix")
                .to_instance("Machine".to_string());

            // the machine is created once, on first use, and then shared by all calls
            binder.bind::<Ticket>().to_provider_type::<TicketMachine>();

            // plain functions can be providers too
            binder
                .bind::<u32>()
                .to_provider_fn(|| Ok(Some(42_u32)));

            binder.bind::<Queue>();
        })
        .build()
        .expect("error building injector");

    // nothing is issued yet
    let queue = injector.get_instance::<Queue>().unwrap();

    // prints 0, then 1
    for _ in 0..2 {
        println!("Got ticket {}", queue.tickets.get().unwrap().number);
    }

    // providers can also be retrieved directly; prints 42
    let answer = injector.get_provider::<u32>().unwrap();
    println!("{}", answer.get().unwrap());
}
