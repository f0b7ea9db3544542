//! Lookup keys, matching strategies and lookup results.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::descriptors::AnyArc;
use crate::error::{DiError, DiResult};
use crate::key::ServiceType;

/// A `(service type, service name)` lookup key.
///
/// The empty name means "unnamed"; `ResolveRequest::new(ty, None)` and
/// `ResolveRequest::new(ty, Some(""))` are the same request.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ResolveRequest {
    service_type: ServiceType,
    service_name: Arc<str>,
}

impl ResolveRequest {
    pub fn new(service_type: ServiceType, service_name: Option<&str>) -> Self {
        Self {
            service_type,
            service_name: Arc::from(service_name.unwrap_or_default()),
        }
    }

    /// Unnamed request for `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::new(ServiceType::of::<T>(), None)
    }

    /// Request for `T` registered under `name`.
    pub fn named<T: ?Sized + 'static>(name: &str) -> Self {
        Self::new(ServiceType::of::<T>(), Some(name))
    }

    #[inline]
    pub fn service_type(&self) -> ServiceType {
        self.service_type
    }

    /// The requested name, `""` when unnamed.
    #[inline]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    #[inline]
    pub fn is_named(&self) -> bool {
        !self.service_name.is_empty()
    }
}

impl fmt::Debug for ResolveRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolveRequest")
            .field("service_type", &self.service_type.name())
            .field("service_name", &&*self.service_name)
            .finish()
    }
}

impl fmt::Display for ResolveRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_named() {
            write!(f, "{} ({})", self.service_type.name(), self.service_name)
        } else {
            f.write_str(self.service_type.name())
        }
    }
}

/// Matching strategy used to turn a request into a service.
///
/// A provider tries the levels of its resolve mode in order until one of them
/// yields a value.
///
/// ```rust
/// use callsite_di::ResolveLevel;
///
/// assert_eq!("type_and_name".parse::<ResolveLevel>().unwrap(), ResolveLevel::TypeAndName);
/// assert_eq!("NameAndType".parse::<ResolveLevel>().unwrap(), ResolveLevel::NameAndType);
/// assert!("by-guess".parse::<ResolveLevel>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "config", derive(serde::Serialize))]
#[cfg_attr(feature = "config", serde(rename_all = "snake_case"))]
pub enum ResolveLevel {
    /// Index by type; the name must match, or be empty to take the last registration
    TypeAndName,
    /// Index by type, ignore the name, take the last registration
    Type,
    /// Index by name only, take the last registration under that name
    NameAndType,
}

impl ResolveLevel {
    pub const ALL: [ResolveLevel; 3] = [
        ResolveLevel::TypeAndName,
        ResolveLevel::Type,
        ResolveLevel::NameAndType,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ResolveLevel::TypeAndName => "type_and_name",
            ResolveLevel::Type => "type",
            ResolveLevel::NameAndType => "name_and_type",
        }
    }

    /// Default resolve mode: exact type and name first, then any service of the type.
    pub fn default_mode() -> Vec<ResolveLevel> {
        vec![ResolveLevel::TypeAndName, ResolveLevel::Type]
    }

    /// Parses a comma separated list of level names.
    pub fn parse_mode(s: &str) -> DiResult<Vec<ResolveLevel>> {
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::parse)
            .collect()
    }
}

impl FromStr for ResolveLevel {
    type Err = DiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();
        match normalized.as_str() {
            "typeandname" => Ok(ResolveLevel::TypeAndName),
            "type" => Ok(ResolveLevel::Type),
            "nameandtype" => Ok(ResolveLevel::NameAndType),
            _ => Err(DiError::UnknownResolveLevel(s.to_string())),
        }
    }
}

// Parsed through `FromStr` so configuration files accept the same spellings
// as the environment and report unknown levels the same way.
#[cfg(feature = "config")]
impl<'de> serde::Deserialize<'de> for ResolveLevel {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for ResolveLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How service names are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "snake_case"))]
pub enum NameComparison {
    #[default]
    Ordinal,
    IgnoreCase,
}

impl NameComparison {
    /// Index key for `name` under this comparison.
    pub fn normalize<'a>(&self, name: &'a str) -> Cow<'a, str> {
        match self {
            NameComparison::Ordinal => Cow::Borrowed(name),
            NameComparison::IgnoreCase if name.chars().any(|c| c.to_lowercase().ne(std::iter::once(c))) => {
                Cow::Owned(name.to_lowercase())
            }
            NameComparison::IgnoreCase => Cow::Borrowed(name),
        }
    }
}

impl FromStr for NameComparison {
    type Err = DiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ordinal" => Ok(NameComparison::Ordinal),
            "ignore_case" | "ignorecase" | "ignore-case" => Ok(NameComparison::IgnoreCase),
            other => Err(DiError::InvalidSettings(format!("unknown name comparison {:?}", other))),
        }
    }
}

/// Outcome of one resolution attempt.
///
/// `has_value` is explicit: "no matching service" is distinct from any value
/// a service may produce.
#[derive(Clone, Default)]
pub struct ResolveResult {
    value: Option<AnyArc>,
}

impl ResolveResult {
    pub fn none() -> Self {
        Self { value: None }
    }

    pub fn some(value: AnyArc) -> Self {
        Self { value: Some(value) }
    }

    #[inline]
    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }

    pub fn value(&self) -> Option<&AnyArc> {
        self.value.as_ref()
    }

    pub fn into_value(self) -> Option<AnyArc> {
        self.value
    }

    /// Downcasts the value to `T`; absence stays `Ok(None)`.
    pub fn downcast<T: Send + Sync + 'static>(self) -> DiResult<Option<Arc<T>>> {
        match self.value {
            None => Ok(None),
            Some(any) => any
                .downcast::<T>()
                .map(Some)
                .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>())),
        }
    }
}

impl fmt::Debug for ResolveResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolveResult")
            .field("has_value", &self.has_value())
            .finish()
    }
}
