//! Error types for the resolution engine.

use std::error::Error as StdError;
use std::sync::Arc;

/// Boxed error returned by constructor and factory recipes.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Dependency resolution errors
///
/// Lookup misses are not errors: they surface as an empty
/// [`ResolveResult`](crate::ResolveResult) or `Ok(None)` from the `try_*`
/// accessors. Everything here is unrecoverable for the resolution that
/// raised it and propagates to the caller of the top-level resolve call.
///
/// # Examples
///
/// ```rust
/// use callsite_di::{DiError, Resolver, ServiceCollection};
///
/// let provider = ServiceCollection::new().build();
/// match provider.get::<String>() {
///     Err(DiError::NotFound { service, name }) => {
///         assert_eq!(service, "alloc::string::String");
///         assert!(name.is_empty());
///     }
///     _ => unreachable!(),
/// }
/// ```
///
/// ```rust
/// use callsite_di::DiError;
///
/// let circular = DiError::Circular(vec!["A".into(), "B".into(), "A".into()]);
/// assert_eq!(circular.to_string(), "Circular dependency: A -> B -> A");
/// ```
#[derive(Debug, Clone, thiserror::Error)]
pub enum DiError {
    /// A required resolution found no matching registration
    #[error("Service not found: {service}{}", display_name(.name))]
    NotFound { service: &'static str, name: String },

    /// Type downcast failed
    #[error("Type mismatch for: {0}")]
    TypeMismatch(&'static str),

    /// A service reappeared in its own resolution chain (includes path)
    #[error("Circular dependency: {}", .0.join(" -> "))]
    Circular(Vec<String>),

    /// Maximum recursion depth exceeded
    #[error("Max depth {0} exceeded")]
    DepthExceeded(usize),

    /// A resolve level name that does not map to any matching strategy
    #[error("Unknown resolve level: {0:?}")]
    UnknownResolveLevel(String),

    /// Provider settings could not be loaded
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    /// A required constructor or factory parameter could not be resolved
    #[error("Cannot resolve parameter `{parameter}` of {target}")]
    MissingParameter { target: &'static str, parameter: String },

    /// A required member injection found nothing to inject
    #[error("Cannot resolve member `{member}` ({service})")]
    MemberResolve { member: String, service: &'static str },

    /// The recipe itself failed; carries the original error untouched
    #[error(transparent)]
    Recipe(Arc<dyn StdError + Send + Sync + 'static>),

    /// The provider, scope or resolver has been disposed
    #[error("Service provider has been disposed")]
    Disposed,

    /// Additive registration attempted on a sealed registry
    #[error("Registry is sealed; build with `build_concurrent` to add services after build")]
    RegistrySealed,
}

fn display_name(name: &str) -> String {
    if name.is_empty() {
        String::new()
    } else {
        format!(" (name: {})", name)
    }
}

impl DiError {
    /// Wraps an error returned by a recipe.
    ///
    /// A `DiError` raised inside the recipe (for example by a nested
    /// resolution in a factory) is passed through as-is; anything else is kept
    /// as the original error behind [`DiError::Recipe`].
    pub fn from_recipe(err: BoxError) -> Self {
        match err.downcast::<DiError>() {
            Ok(inner) => *inner,
            Err(other) => DiError::Recipe(Arc::from(other)),
        }
    }

    /// The original error raised by a recipe, if this is a recipe failure.
    pub fn recipe_error(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        match self {
            DiError::Recipe(err) => Some(err.as_ref()),
            _ => None,
        }
    }

    /// Downcasts the original recipe error to a concrete type.
    pub fn downcast_recipe<E: StdError + 'static>(&self) -> Option<&E> {
        self.recipe_error().and_then(|err| err.downcast_ref::<E>())
    }

    /// Returns `true` for circular-dependency failures.
    pub fn is_circular(&self) -> bool {
        matches!(self, DiError::Circular(_))
    }
}

/// Result type for DI operations
///
/// ```rust
/// use callsite_di::{DiError, DiResult};
///
/// fn failing_operation() -> DiResult<()> {
///     Err(DiError::Disposed)
/// }
///
/// assert!(failing_operation().is_err());
/// ```
pub type DiResult<T> = Result<T, DiError>;
