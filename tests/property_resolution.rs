use callsite_di::{Lifetime, ResolveLevel, ResolveRequest, Resolver, ResolverCore, ServiceCollection};
use proptest::prelude::*;
use std::sync::Arc;

const NAMES: [&str; 3] = ["alpha", "beta", "gamma"];

fn registrations() -> impl Strategy<Value = Vec<(Option<usize>, u64)>> {
    prop::collection::vec((prop::option::of(0..NAMES.len()), any::<u64>()), 1..12)
}

fn build(registrations: &[(Option<usize>, u64)], lifetime: Lifetime) -> callsite_di::ServiceProvider {
    let mut services = ServiceCollection::new();
    for (name, value) in registrations {
        let value = *value;
        services.add_factory::<u64, _>(lifetime, move |_| value);
        if let Some(name) = name {
            services.assign_name_to_last(NAMES[*name]);
        }
    }
    services.build()
}

proptest! {
    #[test]
    fn last_registration_wins(regs in registrations()) {
        let provider = build(&regs, Lifetime::Transient);
        let last = regs.last().map(|(_, v)| *v).unwrap();

        prop_assert_eq!(*provider.get_required::<u64>(), last);

        for (index, name) in NAMES.iter().enumerate() {
            let expected = regs
                .iter()
                .rev()
                .find(|(n, _)| *n == Some(index))
                .map(|(_, v)| *v)
                .unwrap_or(last);
            prop_assert_eq!(*provider.get_named_required::<u64>(name), expected);
        }
    }
}

proptest! {
    #[test]
    fn get_all_preserves_registration_order(regs in registrations()) {
        let provider = build(&regs, Lifetime::Scoped);
        let all: Vec<u64> = provider.get_all::<u64>().unwrap().iter().map(|v| **v).collect();
        let expected: Vec<u64> = regs.iter().map(|(_, v)| *v).collect();
        prop_assert_eq!(all, expected);
    }
}

proptest! {
    #[test]
    fn name_level_ignores_unnamed_registrations(regs in registrations()) {
        let provider = build(&regs, Lifetime::Singleton);

        for (index, name) in NAMES.iter().enumerate() {
            let expected = regs.iter().rev().find(|(n, _)| *n == Some(index)).map(|(_, v)| *v);
            let result = provider
                .resolve_at(ResolveLevel::NameAndType, &ResolveRequest::named::<u64>(name))
                .unwrap()
                .downcast::<u64>()
                .unwrap()
                .map(|v| *v);
            prop_assert_eq!(result, expected);
        }
    }
}

proptest! {
    #[test]
    fn singleton_resolution_consistency(regs in registrations(), scopes in 1usize..4) {
        let provider = build(&regs, Lifetime::Singleton);
        let root = provider.get_required::<u64>();

        for _ in 0..scopes {
            let scope = provider.create_scope();
            let from_scope = scope.get_required::<u64>();
            prop_assert!(Arc::ptr_eq(&root, &from_scope));
        }
    }
}
