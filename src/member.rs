//! Member injection.
//!
//! A [`MemberInjector`] resolves one value and assigns it to a field of an
//! existing target through a setter. The lookup request is the member's
//! value type plus the member name (or an explicit service name), tried
//! across the provider's resolve mode.

use std::fmt;
use std::sync::Arc;

use crate::descriptors::AnyArc;
use crate::error::{DiError, DiResult};
use crate::key::ServiceType;
use crate::request::ResolveRequest;
use crate::traits::ResolverCore;

type Setter<T> = Arc<dyn Fn(&mut T, AnyArc) -> DiResult<()> + Send + Sync>;

/// Injects a resolved value into a member of `T`.
///
/// # Examples
///
/// ```
/// use callsite_di::{DiError, MemberInjector, ServiceCollection};
/// use std::sync::Arc;
///
/// #[derive(Default)]
/// struct Handler {
///     endpoint: Option<Arc<String>>,
/// }
///
/// let endpoint = MemberInjector::<Handler>::new::<String, _>("endpoint", |handler, value| {
///     handler.endpoint = Some(value);
/// });
///
/// let mut services = ServiceCollection::new();
/// services.add_named_singleton("endpoint", "https://example.test".to_string());
/// let provider = services.build();
///
/// let mut handler = Handler::default();
/// assert!(endpoint.inject(&provider, &mut handler, true).unwrap());
/// assert_eq!(handler.endpoint.as_deref().map(String::as_str), Some("https://example.test"));
///
/// let empty = ServiceCollection::new().build();
/// let mut untouched = Handler::default();
/// let err = endpoint.inject(&empty, &mut untouched, true).unwrap_err();
/// assert!(matches!(err, DiError::MemberResolve { .. }));
/// assert!(untouched.endpoint.is_none());
/// ```
pub struct MemberInjector<T> {
    member: String,
    service_type: ServiceType,
    service_name: Option<String>,
    setter: Setter<T>,
}

impl<T> Clone for MemberInjector<T> {
    fn clone(&self) -> Self {
        Self {
            member: self.member.clone(),
            service_type: self.service_type,
            service_name: self.service_name.clone(),
            setter: self.setter.clone(),
        }
    }
}

impl<T: 'static> MemberInjector<T> {
    /// Injector for a member of value type `V`, looked up under the member name.
    pub fn new<V, F>(member: &str, setter: F) -> Self
    where
        V: Send + Sync + 'static,
        F: Fn(&mut T, Arc<V>) + Send + Sync + 'static,
    {
        Self {
            member: member.to_string(),
            service_type: ServiceType::of::<V>(),
            service_name: None,
            setter: Arc::new(move |target: &mut T, value: AnyArc| {
                let value = value
                    .downcast::<V>()
                    .map_err(|_| DiError::TypeMismatch(std::any::type_name::<V>()))?;
                setter(target, value);
                Ok(())
            }),
        }
    }

    /// Looks the value up under `name` instead of the member name.
    pub fn with_service_name(mut self, name: &str) -> Self {
        self.service_name = Some(name.to_string());
        self
    }

    pub fn member_name(&self) -> &str {
        &self.member
    }

    pub fn request(&self) -> ResolveRequest {
        let name = self.service_name.as_deref().unwrap_or(&self.member);
        ResolveRequest::new(self.service_type, Some(name))
    }

    /// Resolves the member value and assigns it.
    ///
    /// Returns `Ok(true)` when a value was assigned and `Ok(false)` when
    /// nothing matched and the member is optional. When nothing matched and
    /// `required` is set, fails with [`DiError::MemberResolve`]. The target is
    /// left untouched whenever no value is assigned.
    pub fn inject<R>(&self, resolver: &R, target: &mut T, required: bool) -> DiResult<bool>
    where
        R: ResolverCore + ?Sized,
    {
        match resolver.resolve(&self.request())?.into_value() {
            Some(value) => {
                (self.setter)(target, value)?;
                Ok(true)
            }
            None if required => Err(DiError::MemberResolve {
                member: self.member.clone(),
                service: self.service_type.name(),
            }),
            None => Ok(false),
        }
    }
}

impl<T> fmt::Debug for MemberInjector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberInjector")
            .field("member", &self.member)
            .field("service_type", &self.service_type)
            .field("service_name", &self.service_name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::ServiceCollection;

    #[derive(Default)]
    struct Target {
        retries: Option<u32>,
    }

    fn retries() -> MemberInjector<Target> {
        MemberInjector::<Target>::new::<u32, _>("retries", |target, value| target.retries = Some(*value))
    }

    #[test]
    fn optional_member_is_skipped() {
        let provider = ServiceCollection::new().build();
        let mut target = Target::default();
        assert!(!retries().inject(&provider, &mut target, false).unwrap());
        assert!(target.retries.is_none());
    }

    #[test]
    fn service_name_overrides_member_name() {
        let mut services = ServiceCollection::new();
        services.add_named_singleton("max_retries", 5u32);
        let provider = services.build();

        let injector = retries().with_service_name("max_retries");
        assert_eq!(injector.request().service_name(), "max_retries");
        assert_eq!(injector.member_name(), "retries");

        let mut target = Target::default();
        assert!(injector.inject(&provider, &mut target, true).unwrap());
        assert_eq!(target.retries, Some(5));
    }

    #[test]
    fn unnamed_registration_falls_back_by_type() {
        let mut services = ServiceCollection::new();
        services.add_singleton(3u32);
        let provider = services.build();

        let mut target = Target::default();
        assert!(retries().inject(&provider, &mut target, true).unwrap());
        assert_eq!(target.retries, Some(3));
    }
}
