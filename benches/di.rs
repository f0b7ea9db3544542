use callsite_di::*;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;

// ===== Micro Benchmarks =====

fn bench_singleton_hit(c: &mut Criterion) {
    let mut sc = ServiceCollection::new();
    sc.add_singleton(42u64);
    let sp = sc.build();

    // Prime the singleton
    let _ = sp.get::<u64>().unwrap();

    c.bench_function("singleton_hit_u64", |b| {
        b.iter(|| {
            let v = sp.get::<u64>().unwrap();
            black_box(v);
        })
    });
}

fn bench_singleton_cold(c: &mut Criterion) {
    struct ExpensiveToCreate {
        data: Vec<u64>,
    }

    c.bench_function("singleton_cold_expensive", |b| {
        b.iter_batched(
            || {
                let mut sc = ServiceCollection::new();
                sc.add_singleton_factory::<ExpensiveToCreate, _>(|_| ExpensiveToCreate {
                    data: (0..1000).collect(),
                });
                sc.build()
            },
            |sp| {
                let v = sp.get::<ExpensiveToCreate>().unwrap();
                black_box(v.data.len());
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

fn bench_scoped_vs_transient(c: &mut Criterion) {
    struct Service {
        data: [u8; 64],
    }

    let mut group = c.benchmark_group("scoped_vs_transient");

    let mut sc = ServiceCollection::new();
    sc.add_scoped_factory::<Service, _>(|_| Service { data: [0; 64] });
    let sp_scoped = sc.build();
    let scope = sp_scoped.create_scope();
    let _ = scope.get::<Service>().unwrap();

    group.bench_function("scoped_hit", |b| {
        b.iter(|| black_box(scope.get::<Service>().unwrap().data[0]))
    });

    let mut sc = ServiceCollection::new();
    sc.add_transient_factory::<Service, _>(|_| Service { data: [0; 64] });
    let sp_transient = sc.build();

    group.bench_function("transient_create", |b| {
        b.iter(|| black_box(sp_transient.get::<Service>().unwrap().data[0]))
    });

    group.finish();
}

// ===== Interpreted vs Compiled =====

struct Leaf(u64);
struct Middle(Arc<Leaf>, Arc<Leaf>);
struct Root(Arc<Middle>, Arc<Leaf>);

fn chain_services() -> ServiceCollection {
    let mut sc = ServiceCollection::new();
    sc.add_transient_constructor::<Leaf, _>(Vec::new(), |_| Ok(Leaf(1)));
    sc.add_transient_constructor::<Middle, _>(
        vec![Parameter::new::<Leaf>("left"), Parameter::new::<Leaf>("right")],
        |args| Ok(Middle(args.get(0)?, args.get(1)?)),
    );
    sc.add_transient_constructor::<Root, _>(
        vec![Parameter::new::<Middle>("middle"), Parameter::new::<Leaf>("leaf")],
        |args| Ok(Root(args.get(0)?, args.get(1)?)),
    );
    sc
}

fn wait_for_compilation(sp: &ServiceProvider) {
    let request = ResolveRequest::of::<Root>();
    for _ in 0..1000 {
        if matches!(sp.service_state(&request), Ok(Some(state)) if state.compiled) {
            return;
        }
        std::thread::sleep(std::time::Duration::from_millis(1));
    }
}

fn bench_interpreted_vs_compiled(c: &mut Criterion) {
    let mut group = c.benchmark_group("call_site_chain");

    let interpreted = chain_services()
        .build_with(ProviderSettings::default().with_compile_after(None))
        .unwrap();
    group.bench_function("interpreted", |b| {
        b.iter(|| black_box(interpreted.get::<Root>().unwrap().1 .0))
    });

    let compiled = chain_services().build();
    for _ in 0..4 {
        let _ = compiled.get::<Root>().unwrap();
    }
    wait_for_compilation(&compiled);
    group.bench_function("compiled", |b| {
        b.iter(|| black_box(compiled.get::<Root>().unwrap().1 .0))
    });

    group.finish();
}

// ===== Lookup Paths =====

fn bench_resolve_levels(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_levels");

    let mut sc = ServiceCollection::new();
    for i in 0..16u32 {
        sc.add_named_singleton(&format!("port-{}", i), i);
    }
    sc.add_singleton(99u32);
    let sp = sc.build();

    group.bench_function("type", |b| b.iter(|| black_box(sp.get::<u32>().unwrap())));
    group.bench_function("type_and_name", |b| {
        b.iter(|| black_box(sp.get_named::<u32>("port-7").unwrap()))
    });
    group.bench_function("name_fallback_to_type", |b| {
        b.iter(|| black_box(sp.get_named::<u32>("missing").unwrap()))
    });

    group.finish();
}

fn bench_enumerable(c: &mut Criterion) {
    let mut group = c.benchmark_group("enumerable");

    for count in [1usize, 8, 32] {
        let mut sc = ServiceCollection::new();
        for i in 0..count {
            sc.add_singleton(i as u64);
        }
        sc.add_enumerable::<u64>(Lifetime::Transient);
        let sp = sc.build();

        group.bench_with_input(BenchmarkId::new("all", count), &sp, |b, sp| {
            b.iter(|| black_box(sp.get::<All<u64>>().unwrap().len()))
        });
    }

    group.finish();
}

// ===== Concurrency =====

fn bench_contended_singleton(c: &mut Criterion) {
    let mut sc = ServiceCollection::new();
    sc.add_singleton_factory::<String, _>(|_| "shared".to_string());
    let sp = sc.build();
    let _ = sp.get::<String>().unwrap();

    c.bench_function("contended_singleton_4_threads", |b| {
        b.iter(|| {
            std::thread::scope(|s| {
                for _ in 0..4 {
                    s.spawn(|| {
                        for _ in 0..100 {
                            black_box(sp.get::<String>().unwrap());
                        }
                    });
                }
            })
        })
    });
}

fn bench_scope_lifecycle(c: &mut Criterion) {
    struct Disposable;
    impl Dispose for Disposable {
        fn dispose(&self) {}
    }

    let mut sc = ServiceCollection::new();
    sc.add_scoped_factory::<Disposable, _>(|_| Disposable)
        .dispose_last_with::<Disposable>();
    let sp = sc.build();

    c.bench_function("scope_create_resolve_dispose", |b| {
        b.iter(|| {
            let scope = sp.create_scope();
            black_box(scope.get::<Disposable>().unwrap());
            scope.dispose();
        })
    });
}

criterion_group!(
    benches,
    bench_singleton_hit,
    bench_singleton_cold,
    bench_scoped_vs_transient,
    bench_interpreted_vs_compiled,
    bench_resolve_levels,
    bench_enumerable,
    bench_contended_singleton,
    bench_scope_lifecycle,
);
criterion_main!(benches);
