use callsite_di::{
    DiObserver, Lifetime, Parameter, ProviderSettings, ResolveRequest, Resolver, ServiceCollection, ServiceProvider,
    ServiceState,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

struct Clock(u64);

struct Report {
    clock: Arc<Clock>,
    serial: usize,
}

fn services(serial: Arc<AtomicUsize>) -> ServiceCollection {
    let mut sc = ServiceCollection::new();
    sc.add_singleton(Clock(42));
    sc.add_constructor::<Report, _>(Lifetime::Transient, vec![Parameter::new::<Clock>("clock")], move |args| {
        Ok(Report {
            clock: args.get(0)?,
            serial: serial.fetch_add(1, Ordering::SeqCst),
        })
    });
    sc
}

fn wait_until_compiled(provider: &ServiceProvider, request: &ResolveRequest) -> ServiceState {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let state = provider.service_state(request).unwrap().unwrap();
        if state.compiled || Instant::now() > deadline {
            return state;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn test_compiles_after_threshold() {
    let sp = services(Arc::default())
        .build_with(ProviderSettings::default().with_compile_after(Some(3)))
        .unwrap();
    let request = ResolveRequest::of::<Report>();

    let state = sp.service_state(&request).unwrap().unwrap();
    assert_eq!(state.call_count, 0);
    assert!(!state.compiled);

    sp.get_required::<Report>();
    sp.get_required::<Report>();
    let state = sp.service_state(&request).unwrap().unwrap();
    assert_eq!(state.call_count, 2);
    assert!(!state.compiled);

    sp.get_required::<Report>();
    let state = wait_until_compiled(&sp, &request);
    assert!(state.compiled);
    assert_eq!(state.lifetime, Lifetime::Transient);
    assert!(!state.has_cached_value);
}

#[test]
fn test_compiled_and_interpreted_agree() {
    let serial = Arc::new(AtomicUsize::new(0));
    let sp = services(serial.clone()).build();
    let request = ResolveRequest::of::<Report>();

    let before: Vec<_> = (0..2).map(|_| sp.get_required::<Report>()).collect();
    wait_until_compiled(&sp, &request);
    let after: Vec<_> = (0..3).map(|_| sp.get_required::<Report>()).collect();

    let serials: Vec<usize> = before.iter().chain(after.iter()).map(|r| r.serial).collect();
    assert_eq!(serials, vec![0, 1, 2, 3, 4]);
    for report in before.iter().chain(after.iter()) {
        assert_eq!(report.clock.0, 42);
        assert!(Arc::ptr_eq(&report.clock, &before[0].clock));
    }

    // Calls made through the compiled accessor are not counted.
    assert_eq!(sp.service_state(&request).unwrap().unwrap().call_count, 2);
}

#[test]
fn test_compilation_disabled() {
    for threshold in [None, Some(0)] {
        let sp = services(Arc::default())
            .build_with(ProviderSettings::default().with_compile_after(threshold))
            .unwrap();
        for _ in 0..10 {
            sp.get_required::<Report>();
        }
        std::thread::sleep(Duration::from_millis(50));
        let state = sp.service_state(&ResolveRequest::of::<Report>()).unwrap().unwrap();
        assert_eq!(state.call_count, 10);
        assert!(!state.compiled);
    }
}

#[test]
fn test_constant_services_never_count() {
    let sp = services(Arc::default()).build();
    for _ in 0..5 {
        sp.get_required::<Clock>();
    }
    let state = sp.service_state(&ResolveRequest::of::<Clock>()).unwrap().unwrap();
    assert_eq!(state.call_count, 0);
    assert!(!state.compiled);
    assert!(state.has_cached_value);
    assert!(sp.service_state(&ResolveRequest::of::<String>()).unwrap().is_none());
}

#[derive(Default)]
struct CompiledNames(Mutex<Vec<String>>);

impl DiObserver for CompiledNames {
    fn resolving(&self, _request: &ResolveRequest) {}

    fn resolved(&self, _request: &ResolveRequest, _duration: Duration, _found: bool) {}

    fn compiled(&self, service: &str) {
        self.0.lock().unwrap().push(service.to_string());
    }
}

#[test]
fn test_observers_notified_once_per_compilation() {
    let names = Arc::new(CompiledNames::default());
    let mut sc = services(Arc::default());
    sc.add_observer(names.clone());
    let sp = sc.build();
    let request = ResolveRequest::of::<Report>();

    for _ in 0..4 {
        sp.get_required::<Report>();
    }
    assert!(wait_until_compiled(&sp, &request).compiled);

    let deadline = Instant::now() + Duration::from_secs(10);
    while names.0.lock().unwrap().is_empty() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    let names = names.0.lock().unwrap();
    assert_eq!(names.len(), 1);
    assert!(names[0].ends_with("Report"));
}

#[test]
fn test_scoped_service_compiles_per_service_not_per_scope() {
    let mut sc = ServiceCollection::new();
    sc.add_singleton(Clock(7));
    sc.add_scoped_constructor::<Report, _>(vec![Parameter::new::<Clock>("clock")], |args| {
        Ok(Report {
            clock: args.get(0)?,
            serial: 0,
        })
    });
    let sp = sc.build();
    let request = ResolveRequest::of::<Report>();

    let first = sp.create_scope();
    let second = sp.create_scope();
    let a = first.get_required::<Report>();
    let b = second.get_required::<Report>();
    assert!(!Arc::ptr_eq(&a, &b));
    assert!(wait_until_compiled(&sp, &request).compiled);

    let third = sp.create_scope();
    let c = third.get_required::<Report>();
    assert!(Arc::ptr_eq(&c, &third.get_required::<Report>()));
    assert!(!Arc::ptr_eq(&c, &a));
    assert_eq!(c.clock.0, 7);
}
