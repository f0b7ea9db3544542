//! Provider settings.
//!
//! Settings are fixed when a provider is built. They can be assembled with the
//! builder methods, read from `CALLSITE_DI_*` environment variables, or (with
//! the `config` feature) parsed from JSON.

use std::env;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::error::{DiError, DiResult};
use crate::request::{NameComparison, ResolveLevel};

pub const ENV_COMPILE_AFTER: &str = "CALLSITE_DI_COMPILE_AFTER";
pub const ENV_RESOLVE_MODE: &str = "CALLSITE_DI_RESOLVE_MODE";
pub const ENV_NAME_COMPARISON: &str = "CALLSITE_DI_NAME_COMPARISON";
pub const ENV_DEBUG: &str = "CALLSITE_DI_DEBUG";

/// Settings applied to a [`ServiceProvider`](crate::ServiceProvider).
///
/// # Examples
///
/// ```
/// use callsite_di::{ProviderSettings, ResolveLevel};
///
/// let settings = ProviderSettings::default()
///     .with_compile_after(Some(8))
///     .with_resolve_mode(vec![ResolveLevel::NameAndType, ResolveLevel::Type]);
///
/// assert_eq!(settings.compile_threshold(), Some(8));
/// assert_eq!(ProviderSettings::default().compile_threshold(), Some(2));
/// assert_eq!(settings.clone().with_compile_after(Some(0)).compile_threshold(), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct ProviderSettings {
    /// Calls through the interpreted accessor before compilation is
    /// scheduled; `None` or `Some(0)` never compiles.
    pub compile_after_call_count: Option<usize>,
    /// Levels tried in order for every request.
    pub resolve_mode: Vec<ResolveLevel>,
    pub name_comparison: NameComparison,
    /// Installs a [`TracingObserver`](crate::TracingObserver) at build.
    pub enable_debug: bool,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            compile_after_call_count: Some(2),
            resolve_mode: ResolveLevel::default_mode(),
            name_comparison: NameComparison::Ordinal,
            enable_debug: false,
        }
    }
}

impl ProviderSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// The effective compile threshold.
    #[inline]
    pub fn compile_threshold(&self) -> Option<usize> {
        self.compile_after_call_count.filter(|n| *n > 0)
    }

    pub fn with_compile_after(mut self, count: Option<usize>) -> Self {
        self.compile_after_call_count = count;
        self
    }

    pub fn with_resolve_mode(mut self, mode: Vec<ResolveLevel>) -> Self {
        self.resolve_mode = mode;
        self
    }

    pub fn with_name_comparison(mut self, comparison: NameComparison) -> Self {
        self.name_comparison = comparison;
        self
    }

    pub fn with_debug(mut self, enabled: bool) -> Self {
        self.enable_debug = enabled;
        self
    }

    /// Reads settings from the process environment, starting from defaults.
    ///
    /// Unset variables keep their default. `CALLSITE_DI_COMPILE_AFTER` takes a
    /// number or `off`; `CALLSITE_DI_RESOLVE_MODE` a comma separated list of
    /// level names.
    pub fn from_env() -> DiResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> DiResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        if let Some(raw) = lookup(ENV_COMPILE_AFTER) {
            settings.compile_after_call_count = parse_compile_after(&raw)?;
        }
        if let Some(raw) = lookup(ENV_RESOLVE_MODE) {
            settings.resolve_mode = ResolveLevel::parse_mode(&raw)?;
        }
        if let Some(raw) = lookup(ENV_NAME_COMPARISON) {
            settings.name_comparison = raw.parse()?;
        }
        if let Some(raw) = lookup(ENV_DEBUG) {
            settings.enable_debug = parse_bool(ENV_DEBUG, &raw)?;
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Parses settings from JSON; missing fields keep their default.
    ///
    /// ```
    /// use callsite_di::{NameComparison, ProviderSettings, ResolveLevel};
    ///
    /// let settings = ProviderSettings::from_json(
    ///     r#"{ "resolve_mode": ["type"], "name_comparison": "ignore_case" }"#,
    /// ).unwrap();
    /// assert_eq!(settings.resolve_mode, vec![ResolveLevel::Type]);
    /// assert_eq!(settings.name_comparison, NameComparison::IgnoreCase);
    /// assert_eq!(settings.compile_after_call_count, Some(2));
    /// ```
    #[cfg(feature = "config")]
    pub fn from_json(json: &str) -> DiResult<Self> {
        let settings: Self = serde_json::from_str(json).map_err(|e| DiError::InvalidSettings(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub(crate) fn validate(&self) -> DiResult<()> {
        if self.resolve_mode.is_empty() {
            return Err(DiError::InvalidSettings("resolve mode must name at least one level".into()));
        }
        Ok(())
    }
}

fn parse_compile_after(raw: &str) -> DiResult<Option<usize>> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("off") || raw.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    raw.parse::<usize>()
        .map(Some)
        .map_err(|_| DiError::InvalidSettings(format!("{}: expected a number or `off`, got {:?}", ENV_COMPILE_AFTER, raw)))
}

fn parse_bool(key: &str, raw: &str) -> DiResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(DiError::InvalidSettings(format!("{}: expected a boolean, got {:?}", key, other))),
    }
}
