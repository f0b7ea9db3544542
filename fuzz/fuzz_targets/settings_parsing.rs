#![no_main]

use callsite_di::settings::{ENV_COMPILE_AFTER, ENV_DEBUG, ENV_NAME_COMPARISON, ENV_RESOLVE_MODE};
use callsite_di::{ProviderSettings, ResolveLevel};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // Parsing never panics; a successful parse names only known levels.
    if let Ok(mode) = ResolveLevel::parse_mode(text) {
        for level in &mode {
            assert_eq!(level.as_str().parse::<ResolveLevel>().ok(), Some(*level));
        }
    }

    // Split the input across the four variables.
    let parts: Vec<&str> = text.splitn(4, '\n').collect();
    let lookup = |key: &str| {
        let index = match key {
            ENV_COMPILE_AFTER => 0,
            ENV_RESOLVE_MODE => 1,
            ENV_NAME_COMPARISON => 2,
            ENV_DEBUG => 3,
            _ => return None,
        };
        parts.get(index).map(|part| part.to_string())
    };

    if let Ok(settings) = ProviderSettings::from_lookup(lookup) {
        assert!(!settings.resolve_mode.is_empty());
        assert_ne!(settings.compile_threshold(), Some(0));
    }
});
