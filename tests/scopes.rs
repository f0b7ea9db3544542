use callsite_di::{Parameter, ResolveRequest, Resolver, ServiceCollection};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct RequestId(usize);

struct Handler {
    request: Arc<RequestId>,
    config: Arc<String>,
}

fn services(counter: Arc<AtomicUsize>) -> ServiceCollection {
    let mut sc = ServiceCollection::new();
    sc.add_singleton("config".to_string());
    sc.add_scoped_factory::<RequestId, _>(move |_| RequestId(counter.fetch_add(1, Ordering::SeqCst)));
    sc.add_transient_constructor::<Handler, _>(
        vec![Parameter::new::<RequestId>("request"), Parameter::new::<String>("config")],
        |args| {
            Ok(Handler {
                request: args.get(0)?,
                config: args.get(1)?,
            })
        },
    );
    sc
}

#[test]
fn test_scoped_instance_per_scope() {
    let sp = services(Arc::new(AtomicUsize::new(0))).build();

    let scope1 = sp.create_scope();
    let scope2 = sp.create_scope();

    let a1 = scope1.get_required::<RequestId>();
    let a2 = scope1.get_required::<RequestId>();
    let b = scope2.get_required::<RequestId>();

    assert!(Arc::ptr_eq(&a1, &a2));
    assert!(!Arc::ptr_eq(&a1, &b));
    assert_ne!(a1.0, b.0);
}

#[test]
fn test_singleton_shared_across_scopes() {
    let sp = services(Arc::new(AtomicUsize::new(0))).build();

    let from_root = sp.get_required::<String>();
    let from_scope = sp.create_scope().get_required::<String>();
    assert!(Arc::ptr_eq(&from_root, &from_scope));
}

#[test]
fn test_dependencies_keep_their_lifetimes() {
    let sp = services(Arc::new(AtomicUsize::new(0))).build();
    let scope = sp.create_scope();

    // Enough calls to cross the compile threshold; the compiled accessor
    // must keep the same lifetime semantics.
    let handlers: Vec<_> = (0..6).map(|_| scope.get_required::<Handler>()).collect();
    for pair in handlers.windows(2) {
        assert!(!Arc::ptr_eq(&pair[0], &pair[1]));
        assert!(Arc::ptr_eq(&pair[0].request, &pair[1].request));
        assert!(Arc::ptr_eq(&pair[0].config, &pair[1].config));
    }

    let other = sp.create_scope().get_required::<Handler>();
    assert!(!Arc::ptr_eq(&other.request, &handlers[0].request));
    assert!(Arc::ptr_eq(&other.config, &handlers[0].config));
}

#[test]
fn test_root_acts_as_its_own_scope() {
    let counter = Arc::new(AtomicUsize::new(0));
    let sp = services(counter.clone()).build();

    let a = sp.get_required::<RequestId>();
    let b = sp.get_required::<RequestId>();
    assert!(Arc::ptr_eq(&a, &b));

    let scoped = sp.create_scope().get_required::<RequestId>();
    assert!(!Arc::ptr_eq(&a, &scoped));
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[test]
fn test_scope_service_state_reports_scope_cache() {
    let sp = services(Arc::new(AtomicUsize::new(0))).build();
    let request = ResolveRequest::of::<RequestId>();

    let scope = sp.create_scope();
    assert!(!scope.service_state(&request).unwrap().unwrap().has_cached_value);

    scope.get_required::<RequestId>();
    assert!(scope.service_state(&request).unwrap().unwrap().has_cached_value);
    assert!(!sp.service_state(&request).unwrap().unwrap().has_cached_value);
    assert!(!sp.create_scope().service_state(&request).unwrap().unwrap().has_cached_value);
}

#[test]
fn test_factory_context_resolves_in_acting_scope() {
    struct Unit {
        request: Arc<RequestId>,
    }

    let mut sc = services(Arc::new(AtomicUsize::new(0)));
    sc.add_transient_factory::<Unit, _>(|ctx| Unit {
        request: ctx.get_required::<RequestId>(),
    });
    let sp = sc.build();

    let scope = sp.create_scope();
    let unit = scope.get_required::<Unit>();
    assert!(Arc::ptr_eq(&unit.request, &scope.get_required::<RequestId>()));
    assert!(!Arc::ptr_eq(&unit.request, &sp.get_required::<RequestId>()));
}

#[test]
fn test_scope_provider_is_root() {
    let sp = services(Arc::new(AtomicUsize::new(0))).build();
    let scope = sp.create_scope();
    let nested = scope.provider().create_scope();

    assert!(Arc::ptr_eq(
        &scope.get_required::<String>(),
        &nested.get_required::<String>()
    ));
    assert!(!Arc::ptr_eq(
        &scope.get_required::<RequestId>(),
        &nested.get_required::<RequestId>()
    ));
}
