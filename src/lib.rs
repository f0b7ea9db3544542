//! # callsite-di
//!
//! Dependency resolution and object-lifecycle engine with adaptive
//! call-site compilation.
//!
//! ## Features
//!
//! - **Lifetimes**: Singleton, Scoped and Transient services
//! - **Name + type lookup**: configurable resolve mode over a type index and a name index, last registration wins
//! - **Call-site graph**: dependencies are planned once per service, with cycle detection while planning
//! - **Adaptive compilation**: hot services are lowered to a specialized accessor on the rayon pool
//! - **Scopes**: per-request caches with reverse-order disposal
//! - **Concurrent registry**: optional additive registration after build
//!
//! ## Quick Start
//!
//! ```rust
//! use callsite_di::{Parameter, Resolver, ServiceCollection};
//! use std::sync::Arc;
//!
//! struct Database {
//!     connection_string: String,
//! }
//!
//! struct UserService {
//!     db: Arc<Database>,
//! }
//!
//! let mut services = ServiceCollection::new();
//! services.add_singleton(Database {
//!     connection_string: "postgres://localhost".to_string(),
//! });
//! services.add_transient_constructor::<UserService, _>(
//!     vec![Parameter::new::<Database>("db")],
//!     |args| Ok(UserService { db: args.get(0)? }),
//! );
//!
//! let provider = services.build();
//! let user_service = provider.get_required::<UserService>();
//! assert_eq!(user_service.db.connection_string, "postgres://localhost");
//! ```
//!
//! ## Service Lifetimes
//!
//! - **Singleton**: created once and shared across the provider and all its scopes
//! - **Scoped**: created once per scope; the root provider acts as its own scope
//! - **Transient**: created fresh on every resolution
//!
//! ## Resolve Mode
//!
//! A request is a service type plus an optional name. The provider tries the
//! levels of its resolve mode in order until one produces a value:
//!
//! ```rust
//! use callsite_di::{ProviderSettings, ResolveLevel, Resolver, ServiceCollection};
//!
//! let mut services = ServiceCollection::new();
//! services.add_singleton(1u16);
//! services.add_named_singleton("port", 8080u16);
//! services.add_singleton(2u16);
//!
//! let provider = services.build();
//! assert_eq!(*provider.get_required::<u16>(), 2);
//! assert_eq!(*provider.get_named_required::<u16>("port"), 8080);
//! // unknown names fall back to the type level
//! assert_eq!(*provider.get_named_required::<u16>("admin"), 2);
//!
//! let mut services = ServiceCollection::new();
//! services.add_singleton(1u16);
//! let strict = services
//!     .build_with(ProviderSettings::default().with_resolve_mode(vec![ResolveLevel::TypeAndName]))
//!     .unwrap();
//! assert!(strict.try_get_named::<u16>("admin").unwrap().is_none());
//! ```

pub mod collection;
pub mod descriptors;
pub mod error;
pub mod invoke;
pub mod key;
pub mod lifetime;
pub mod member;
pub mod observer;
pub mod provider;
pub mod request;
pub mod settings;
pub mod traits;

mod callsite;
mod entry;
mod internal;
mod resolver;
mod service;
mod store;

pub use collection::ServiceCollection;
pub use descriptors::{All, AnyArc, Disposer, Enumerable, Recipe, ServiceDescriptor};
pub use error::{BoxError, DiError, DiResult};
pub use invoke::{invoke_constructor, invoke_factory, Arguments, Constructor, Factory, OverrideArguments, Parameter};
pub use key::{service_type, ServiceType};
pub use lifetime::Lifetime;
pub use member::MemberInjector;
pub use observer::{DiObserver, MetricsObserver, TracingObserver};
pub use provider::{ResolverContext, Scope, ServiceProvider};
pub use request::{NameComparison, ResolveLevel, ResolveRequest, ResolveResult};
pub use service::ServiceState;
pub use settings::ProviderSettings;
pub use traits::{Dispose, Resolver, ResolverCore};
