#![no_main]

use callsite_di::{Lifetime, Resolver, ServiceCollection};
use libfuzzer_sys::fuzz_target;

const NAMES: [&str; 4] = ["a", "b", "c", "d"];

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    // Two bytes per registration: lifetime and name selector, then value.
    let mut services = ServiceCollection::new();
    let mut registered: Vec<(Option<usize>, u8)> = Vec::new();
    for chunk in data.chunks_exact(2) {
        let lifetime = match chunk[0] % 3 {
            0 => Lifetime::Singleton,
            1 => Lifetime::Scoped,
            _ => Lifetime::Transient,
        };
        let name = match (chunk[0] >> 2) % 5 {
            4 => None,
            n => Some(n as usize),
        };
        let value = chunk[1];
        services.add_factory::<u8, _>(lifetime, move |_| value);
        if let Some(n) = name {
            services.assign_name_to_last(NAMES[n]);
        }
        registered.push((name, value));
    }

    let provider = services.build();
    let scope = provider.create_scope();

    let last = registered.last().map(|(_, v)| *v);
    assert_eq!(scope.try_get::<u8>().unwrap().map(|v| *v), last);

    for (index, name) in NAMES.iter().enumerate() {
        let expected = registered
            .iter()
            .rev()
            .find(|(n, _)| *n == Some(index))
            .map(|(_, v)| *v)
            .or(last);
        assert_eq!(scope.try_get_named::<u8>(name).unwrap().map(|v| *v), expected);
    }

    let all: Vec<u8> = provider.get_all::<u8>().unwrap().iter().map(|v| **v).collect();
    assert_eq!(all, registered.iter().map(|(_, v)| *v).collect::<Vec<_>>());
});
