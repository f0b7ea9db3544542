use callsite_di::{MetricsObserver, ProviderSettings, ResolveRequest, Resolver, ServiceCollection};
use std::io;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn capture<R>(f: impl FnOnce() -> R) -> (R, String) {
    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, captured.text())
}

#[test]
fn test_debug_setting_logs_resolutions() {
    let mut sc = ServiceCollection::new();
    sc.add_named_singleton("greeting", "hello".to_string());

    let (found, logs) = capture(|| {
        let sp = sc.build_with(ProviderSettings::default().with_debug(true)).unwrap();
        let found = sp.get_named::<String>("greeting").is_ok();
        let _ = sp.try_get::<u64>();
        found
    });

    assert!(found);
    assert!(logs.contains("resolved"));
    assert!(logs.contains("greeting"));
    assert!(logs.contains("found=false"));
}

#[test]
fn test_provider_logs_disposal() {
    let ((), logs) = capture(|| {
        let sp = ServiceCollection::new().build();
        sp.create_scope().dispose();
        sp.dispose();
    });
    assert!(logs.contains("dispos"));
}

#[test]
fn test_metrics_observer_counts() {
    let metrics = Arc::new(MetricsObserver::new());
    let mut sc = ServiceCollection::new();
    sc.add_transient_factory::<String, _>(|_| "fresh".to_string());
    sc.add_observer(metrics.clone());
    let sp = sc.build();

    for _ in 0..3 {
        sp.get_required::<String>();
    }
    assert!(sp.try_get::<u8>().unwrap().is_none());

    assert_eq!(metrics.resolution_count(), 4);
    assert_eq!(metrics.miss_count(), 1);
    assert!(metrics.average_resolution_time().is_some());

    let deadline = Instant::now() + Duration::from_secs(10);
    while metrics.compilation_count() == 0 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(metrics.compilation_count(), 1);
    assert!(sp.service_state(&ResolveRequest::of::<String>()).unwrap().unwrap().compiled);

    metrics.reset();
    assert_eq!(metrics.resolution_count(), 0);
    assert_eq!(metrics.average_resolution_time(), None);
}

#[test]
fn test_scope_resolutions_are_observed() {
    let metrics = Arc::new(MetricsObserver::new());
    let mut sc = ServiceCollection::new();
    sc.add_scoped_factory::<u32, _>(|_| 5);
    sc.add_observer(metrics.clone());
    let sp = sc.build();

    let scope = sp.create_scope();
    scope.get_required::<u32>();
    scope.get_required::<u32>();
    assert_eq!(metrics.resolution_count(), 2);
    assert_eq!(metrics.miss_count(), 0);
}
