#[cfg(feature = "derive")]
mod injectable_derive_test {
    use graft_di::binder::Binder;
    use graft_di::error::BoxError;
    use graft_di::injectable::{DescriptorRegistry, Injectable};
    use graft_di::injection_point::Injected;
    use graft_di::injector::Injector;
    use graft_di::instance::InstancePtr;
    use graft_di::key::TypeKey;
    use graft_di::provider::Provider;
    use graft_di::{implements, Injectable};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    trait Repository: Send + Sync {
        fn table(&self) -> &str;
    }

    #[derive(Injectable)]
    struct Database;

    #[derive(Injectable)]
    #[injectable(scope = "SINGLETON")]
    struct SqlRepository {
        _database: InstancePtr<Database>,
        #[inject(named = "table")]
        table: InstancePtr<String>,
    }

    #[implements]
    impl Repository for SqlRepository {
        fn table(&self) -> &str {
            &self.table
        }
    }

    fn default_retries() -> u8 {
        3
    }

    #[derive(Injectable)]
    struct UserService {
        repository: InstancePtr<dyn Repository>,
        cache: Option<InstancePtr<Database>>,
        missing: Option<InstancePtr<u64>>,
        #[inject(nullable)]
        nullable: Option<InstancePtr<u32>>,
        all_repositories: Vec<InstancePtr<dyn Repository>>,
        repository_provider: Provider<dyn Repository>,
        #[inject(member)]
        audit: Injected<InstancePtr<Database>>,
        #[inject(member, named = "table")]
        audit_table: Injected<InstancePtr<String>>,
        #[inject(default)]
        counter: u8,
        #[inject(default = "default_retries")]
        retries: u8,
    }

    #[derive(Injectable)]
    struct Pair(InstancePtr<Database>, #[inject(default)] u8);

    #[derive(Default, Injectable)]
    struct BaseComponent {
        #[inject(member)]
        database: Injected<InstancePtr<Database>>,
    }

    #[derive(Injectable)]
    struct DerivedComponent {
        #[inject(supertype)]
        base: BaseComponent,
        #[inject(member)]
        table: Injected<InstancePtr<String>>,
    }

    static CUSTOM_CONSTRUCTIONS: AtomicUsize = AtomicUsize::new(0);

    #[derive(Injectable)]
    #[injectable(constructor = "Counted::new")]
    struct Counted {
        database: InstancePtr<Database>,
        #[inject(default)]
        sequence: usize,
    }

    impl Counted {
        fn new(database: InstancePtr<Database>) -> Result<Self, BoxError> {
            Ok(Self {
                database,
                sequence: CUSTOM_CONSTRUCTIONS.fetch_add(1, Ordering::SeqCst),
            })
        }
    }

    static SESSIONS: AtomicUsize = AtomicUsize::new(0);

    #[derive(Injectable)]
    #[injectable(scope = "SINGLETON", constructor = "Session::open")]
    struct Session;

    impl Session {
        fn open() -> Result<Self, BoxError> {
            SESSIONS.fetch_add(1, Ordering::SeqCst);
            Ok(Self)
        }
    }

    #[derive(Injectable)]
    struct SessionHolder {
        sessions: Provider<Session>,
    }

    fn create_injector() -> Injector {
        Injector::builder()
            .with_module(|binder: &mut Binder| {
                binder.bind::<Database>().as_lazy_singleton();
                binder
                    .bind::<String>()
                    .named("table")
                    .to_instance("users".to_string());
                binder.bind::<dyn Repository>().to::<SqlRepository>();
                binder
                    .multi_bind::<dyn Repository>()
                    .add_binding()
                    .to::<SqlRepository>();
                binder.bind::<u32>().to_provider_fn(|| Ok(None::<u32>));
                binder.bind::<UserService>();
                binder.bind::<Pair>();
                binder.bind::<DerivedComponent>();
                binder.bind::<Counted>();
            })
            .build()
            .unwrap()
    }

    #[test]
    fn should_register_derived_descriptors() {
        let registry = DescriptorRegistry::from_inventory();
        assert!(registry.contains(TypeKey::of::<Database>()));
        assert!(registry.contains(TypeKey::of::<UserService>()));
        assert_eq!(
            registry.get(TypeKey::of::<SqlRepository>()).unwrap().scope(),
            Some("SINGLETON")
        );
    }

    #[test]
    fn should_inject_derived_fields() {
        let injector = create_injector();
        let service = injector.get_instance::<UserService>().unwrap();

        assert_eq!(service.repository.table(), "users");
        assert!(service.cache.is_some());
        assert!(service.missing.is_none());
        assert!(service.nullable.is_none());
        assert_eq!(service.all_repositories.len(), 1);
        assert_eq!(service.repository_provider.get().unwrap().table(), "users");
        assert!(service.audit.is_injected());
        assert_eq!(*service.audit_table.get().unwrap(), "users");
        assert_eq!(service.counter, 0);
        assert_eq!(service.retries, 3);
    }

    #[test]
    fn should_use_declared_scope() {
        let injector = create_injector();
        let first = injector.get_instance::<dyn Repository>().unwrap();
        let second = injector.get_instance::<dyn Repository>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn should_construct_tuple_structs() {
        let injector = create_injector();
        let pair = injector.get_instance::<Pair>().unwrap();
        let database = injector.get_instance::<Database>().unwrap();
        assert!(Arc::ptr_eq(&pair.0, &database));
        assert_eq!(pair.1, 0);
    }

    #[test]
    fn should_inject_supertype_members() {
        let injector = create_injector();
        let component = injector.get_instance::<DerivedComponent>().unwrap();
        assert!(component.base.database.is_injected());
        assert!(component.table.is_injected());
    }

    #[test]
    fn should_inject_members_of_existing_instances() {
        let injector = create_injector();
        let component = BaseComponent::default();
        assert!(!component.database.is_injected());

        injector.inject_members(&component).unwrap();
        assert!(component.database.is_injected());
    }

    #[test]
    fn should_call_custom_constructor() {
        let injector = create_injector();
        let first = injector.get_instance::<Counted>().unwrap();
        let second = injector.get_instance::<Counted>().unwrap();

        assert_ne!(first.sequence, second.sequence);
        assert!(Arc::ptr_eq(&first.database, &second.database));
    }

    #[test]
    fn should_construct_provided_singletons_once_on_demand() {
        let injector = Injector::builder()
            .with_module(|binder: &mut Binder| {
                binder.bind::<Session>();
                binder.bind::<SessionHolder>();
            })
            .build()
            .unwrap();

        let holder = injector.get_instance::<SessionHolder>().unwrap();
        assert_eq!(SESSIONS.load(Ordering::SeqCst), 0);

        let first = holder.sessions.get().unwrap();
        let second = holder.sessions.get().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(SESSIONS.load(Ordering::SeqCst), 1);

        let direct = injector.get_instance::<Session>().unwrap();
        assert!(Arc::ptr_eq(&first, &direct));
        assert_eq!(SESSIONS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn should_generate_constructor_targets() {
        let descriptor = UserService::descriptor();
        let constructor = descriptor.constructors().first().unwrap();
        assert!(constructor.is_inject());
        assert_eq!(constructor.targets().len(), 6);
        assert_eq!(descriptor.fields().len(), 2);
    }
}
