//! Context providers and per-thread logging context.
//!
//! This crate provides:
//! - [`ContextProvider`], the interface for anything that contributes
//!   key/value context to log records (closures included)
//! - [`ProviderRegistry`], an explicitly owned registry of named providers
//! - [`LoggingContext`], the current thread's context with scoped guards and
//!   hand-over helpers for threads and futures
//! - [`merge_context`], combining local context with provider output
//!
//! ```
//! use lh_config::Configuration;
//! use lh_context::{context_map, LoggingContext, ProviderRegistry};
//!
//! let config = Configuration::default();
//! let registry = ProviderRegistry::new();
//! registry.register("p1", || context_map([("action", "login")])).unwrap();
//!
//! LoggingContext::scope([("user", "Alice")], || {
//!     let ctx = LoggingContext::resolve(&config, &registry).unwrap();
//!     assert_eq!(ctx, context_map([("user", "Alice"), ("action", "login")]));
//! });
//! ```

pub mod default_provider;
pub mod error;
pub mod local;
pub mod merge;
pub mod provider;
pub mod registry;

pub use default_provider::{
    generate_run_id, get_host_id, DefaultProvider, RunIdProvider, DEFAULT_PROVIDER_NAME,
};
pub use error::{ContextError, Result};
pub use local::{spawn, ContextScope, ContextSnapshot, FutureExt, LoggingContext, WithContext};
pub use merge::merge_context;
pub use provider::{context_map, provider_fn, ContextMap, ContextProvider, FnProvider, ProviderError};
pub use registry::{ProviderRegistry, Providers, TemporaryProvider};
