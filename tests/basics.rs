use callsite_di::{
    All, DiError, Lifetime, Parameter, ResolveLevel, ResolveRequest, Resolver, ResolverCore, ServiceCollection,
    ServiceDescriptor, ServiceType,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn test_concrete_singleton() {
    let mut sc = ServiceCollection::new();
    sc.add_singleton(42usize);
    sc.add_singleton("hello".to_string());

    let sp = sc.build();

    let num1 = sp.get_required::<usize>();
    let num2 = sp.get_required::<usize>();
    let str1 = sp.get_required::<String>();
    let str2 = sp.get_required::<String>();

    assert_eq!(*num1, 42);
    assert_eq!(*str1, "hello");
    assert!(Arc::ptr_eq(&num1, &num2));
    assert!(Arc::ptr_eq(&str1, &str2));
}

#[test]
fn test_factory_with_dependencies() {
    struct Config {
        port: u16,
    }

    struct Server {
        config: Arc<Config>,
        name: String,
    }

    let mut sc = ServiceCollection::new();
    sc.add_singleton(Config { port: 8080 });
    sc.add_singleton_factory::<Server, _>(|r| Server {
        config: r.get_required::<Config>(),
        name: "MyServer".to_string(),
    });

    let sp = sc.build();
    let server = sp.get_required::<Server>();

    assert_eq!(server.config.port, 8080);
    assert_eq!(server.name, "MyServer");
}

#[test]
fn test_transient_creates_new_instances() {
    let counter = Arc::new(AtomicUsize::new(0));
    let counter_clone = counter.clone();

    let mut sc = ServiceCollection::new();
    sc.add_transient_factory::<String, _>(move |_| {
        format!("instance-{}", counter_clone.fetch_add(1, Ordering::SeqCst))
    });

    let sp = sc.build();
    let a = sp.get_required::<String>();
    let b = sp.get_required::<String>();

    assert_eq!(*a, "instance-0");
    assert_eq!(*b, "instance-1");
    assert!(!Arc::ptr_eq(&a, &b));
}

#[test]
fn test_last_registration_wins() {
    let mut sc = ServiceCollection::new();
    sc.add_singleton(1u32);
    sc.add_named_singleton("a", 10u32);
    sc.add_singleton(2u32);
    sc.add_named_singleton("a", 11u32);

    let sp = sc.build();

    // Unnamed requests take the last registration of the type, named or not.
    assert_eq!(*sp.get_required::<u32>(), 11);
    assert_eq!(*sp.get_named_required::<u32>("a"), 11);

    let empty_name = sp.resolve(&ResolveRequest::new(ServiceType::of::<u32>(), Some(""))).unwrap();
    assert_eq!(*empty_name.downcast::<u32>().unwrap().unwrap(), 11);
}

#[test]
fn test_resolve_at_single_levels() {
    let mut sc = ServiceCollection::new();
    sc.add_singleton(1u32);
    sc.add_named_singleton("port", 8080u32);
    sc.add_singleton(3u32);
    sc.add_named_singleton("port", "eighty".to_string());

    let sp = sc.build();
    let port = ResolveRequest::named::<u32>("port");
    let unknown = ResolveRequest::named::<u32>("admin");

    let at = |level, request: &ResolveRequest| sp.resolve_at(level, request).unwrap();

    assert_eq!(*at(ResolveLevel::TypeAndName, &port).downcast::<u32>().unwrap().unwrap(), 8080);
    assert_eq!(*at(ResolveLevel::Type, &port).downcast::<u32>().unwrap().unwrap(), 3);
    assert!(!at(ResolveLevel::TypeAndName, &unknown).has_value());
    assert!(!at(ResolveLevel::NameAndType, &unknown).has_value());
    assert!(!at(ResolveLevel::NameAndType, &ResolveRequest::of::<u32>()).has_value());

    // Purely by name: the last service named "port" is a String.
    let by_name = at(ResolveLevel::NameAndType, &port);
    assert!(by_name.has_value());
    assert!(matches!(by_name.downcast::<u32>(), Err(DiError::TypeMismatch(_))));
}

#[test]
fn test_missing_service() {
    let sp = ServiceCollection::new().build();

    assert!(sp.try_get::<u64>().unwrap().is_none());
    assert!(sp.try_get_named::<u64>("x").unwrap().is_none());
    match sp.get_named::<u64>("x") {
        Err(DiError::NotFound { service, name }) => {
            assert_eq!(service, "u64");
            assert_eq!(name, "x");
        }
        other => panic!("expected NotFound, got {:?}", other.map(|_| ())),
    }
}

#[test]
#[should_panic(expected = "Failed to resolve")]
fn test_get_required_panics_when_missing() {
    let sp = ServiceCollection::new().build();
    sp.get_required::<u64>();
}

#[test]
fn test_constructor_parameters_resolve_by_type_and_name() {
    struct Endpoint {
        host: Arc<String>,
        port: Arc<u16>,
        timeout: Option<Arc<u64>>,
    }

    let mut sc = ServiceCollection::new();
    sc.add_named_singleton("host", "db.internal".to_string());
    sc.add_named_singleton("port", 5432u16);
    sc.add_named_singleton("backup_port", 5433u16);
    sc.add_transient_constructor::<Endpoint, _>(
        vec![
            Parameter::new::<String>("host"),
            Parameter::new::<u16>("port"),
            Parameter::optional::<u64>("timeout"),
        ],
        |args| {
            Ok(Endpoint {
                host: args.get(0)?,
                port: args.get(1)?,
                timeout: args.optional(2)?,
            })
        },
    );

    let sp = sc.build();
    let endpoint = sp.get_required::<Endpoint>();
    assert_eq!(endpoint.host.as_str(), "db.internal");
    assert_eq!(*endpoint.port, 5432);
    assert!(endpoint.timeout.is_none());
}

#[test]
fn test_missing_required_parameter() {
    struct NeedsPool;
    struct Pool;

    let mut sc = ServiceCollection::new();
    sc.add_transient_constructor::<NeedsPool, _>(vec![Parameter::new::<Pool>("pool")], |_| Ok(NeedsPool));

    let sp = sc.build();
    match sp.get::<NeedsPool>() {
        Err(DiError::MissingParameter { parameter, .. }) => assert_eq!(parameter, "pool"),
        other => panic!("expected MissingParameter, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_trait_resolution() {
    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct English;
    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".into()
        }
    }

    struct French;
    impl Greeter for French {
        fn greet(&self) -> String {
            "bonjour".into()
        }
    }

    let mut sc = ServiceCollection::new();
    sc.add_singleton_trait::<dyn Greeter>(Arc::new(English));
    sc.add_scoped_trait_factory::<dyn Greeter, _>(|_| Arc::new(French));

    let sp = sc.build();
    assert_eq!(sp.get_trait::<dyn Greeter>().unwrap().greet(), "bonjour");

    let all: Vec<String> = sp
        .get_all_trait::<dyn Greeter>()
        .unwrap()
        .iter()
        .map(|g| g.greet())
        .collect();
    assert_eq!(all, vec!["hello", "bonjour"]);
}

#[test]
fn test_enumerable_keeps_element_lifetimes() {
    let created = Arc::new(AtomicUsize::new(0));
    let counter = created.clone();

    let mut sc = ServiceCollection::new();
    sc.add_singleton(1u8);
    sc.add_transient_factory::<u8, _>(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        2
    });
    sc.add_enumerable::<u8>(Lifetime::Transient);

    let sp = sc.build();
    let first = sp.get_required::<All<u8>>();
    let second = sp.get_required::<All<u8>>();

    assert_eq!(first.iter().map(|v| **v).collect::<Vec<_>>(), vec![1, 2]);
    assert!(Arc::ptr_eq(&first[0], &second[0]));
    assert!(!Arc::ptr_eq(&first[1], &second[1]));
    assert_eq!(created.load(Ordering::SeqCst), 2);
}

#[test]
fn test_factory_error_is_not_masked() {
    #[derive(Debug)]
    struct Refused(&'static str);
    impl std::fmt::Display for Refused {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "refused: {}", self.0)
        }
    }
    impl std::error::Error for Refused {}

    #[derive(Debug)]
    struct Socket;

    let mut sc = ServiceCollection::new();
    sc.add_try_factory::<Socket, _>(Lifetime::Singleton, |_| Err(Box::new(Refused("port 25"))));

    let sp = sc.build();
    let err = sp.get::<Socket>().unwrap_err();
    assert_eq!(err.to_string(), "refused: port 25");
    assert_eq!(err.downcast_recipe::<Refused>().map(|r| r.0), Some("port 25"));

    // A failed singleton is not cached.
    assert!(sp.get::<Socket>().is_err());
}

#[test]
fn test_descriptor_registration_and_assign_name() {
    let mut sc = ServiceCollection::new();
    sc.add(ServiceDescriptor::value(Lifetime::Singleton, 7i64).with_name("seven"));
    sc.add_transient_factory::<i64, _>(|_| 8);
    sc.assign_name_to_last("eight");

    let sp = sc.build();
    assert_eq!(*sp.get_named_required::<i64>("seven"), 7);
    assert_eq!(*sp.get_named_required::<i64>("eight"), 8);
    assert_eq!(*sp.get_required::<i64>(), 8);
}

#[test]
fn test_static_registry_is_sealed() {
    let sp = ServiceCollection::new().build();
    let err = sp.add(ServiceDescriptor::value(Lifetime::Singleton, 1u8)).unwrap_err();
    assert!(matches!(err, DiError::RegistrySealed));
}
