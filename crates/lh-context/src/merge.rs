//! Merging local context with provider output.

use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::provider::{ContextMap, ProviderError};
use crate::registry::Providers;
use crate::{ContextError, Result};

/// Merge `local` with the output of every provider, in order.
///
/// `local` is copied, never modified. A key returned by a provider that is
/// already present fails the merge with [`ContextError::DuplicateKey`]
/// unless `allow_overwrite` is set, in which case the provider wins. The
/// first provider that errors or panics aborts the merge; later providers
/// are not called.
pub fn merge_context(
    local: &ContextMap,
    providers: &Providers,
    allow_overwrite: bool,
) -> Result<ContextMap> {
    let mut context = local.clone();
    for (name, provider) in providers.iter() {
        let produced = catch_unwind(AssertUnwindSafe(|| provider.provide()))
            .unwrap_or_else(|panic| Err(panic_error(panic)))
            .map_err(|source| ContextError::ProviderExecutionFailed {
                provider: name.to_string(),
                source,
            })?;

        for (key, value) in produced {
            if !allow_overwrite && context.contains_key(&key) {
                return Err(ContextError::DuplicateKey {
                    provider: name.to_string(),
                    key,
                });
            }
            context.insert(key, value);
        }
    }
    Ok(context)
}

fn panic_error(panic: Box<dyn std::any::Any + Send>) -> ProviderError {
    let message = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("provider panicked: {message}").into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{context_map, provider_fn};
    use crate::registry::ProviderRegistry;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_local_context_only() {
        let local = context_map([("user", "Alice")]);
        let merged = merge_context(&local, &Providers::default(), false).unwrap();
        assert_eq!(merged, local);
    }

    #[test]
    fn test_provider_adds_keys() {
        let registry = ProviderRegistry::new();
        registry.register("p1", || context_map([("action", "login")])).unwrap();

        let local = context_map([("user", "Alice")]);
        let merged = merge_context(&local, &registry.gather(), false).unwrap();

        assert_eq!(merged, context_map([("user", "Alice"), ("action", "login")]));
        assert_eq!(local.len(), 1);
    }

    #[test]
    fn test_duplicate_key_between_providers() {
        let registry = ProviderRegistry::new();
        registry.register("p1", || context_map([("k", "1")])).unwrap();
        registry.register("p2", || context_map([("k", "2")])).unwrap();

        let err = merge_context(&ContextMap::new(), &registry.gather(), false).unwrap_err();
        assert!(matches!(
            err,
            ContextError::DuplicateKey { ref provider, ref key } if provider == "p2" && key == "k"
        ));

        let merged = merge_context(&ContextMap::new(), &registry.gather(), true).unwrap();
        assert_eq!(merged["k"], "2");
    }

    #[test]
    fn test_failing_provider_stops_merge() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = ProviderRegistry::new();
        registry
            .register("broken", provider_fn(|| Err::<ContextMap, _>("boom")))
            .unwrap();
        let counter = calls.clone();
        registry
            .register("after", move || {
                counter.fetch_add(1, Ordering::SeqCst);
                ContextMap::new()
            })
            .unwrap();

        let err = merge_context(&ContextMap::new(), &registry.gather(), false).unwrap_err();

        assert!(matches!(err, ContextError::ProviderExecutionFailed { ref provider, .. } if provider == "broken"));
        assert_eq!(err.to_string(), "Provider 'broken' failed: boom");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_panicking_provider_is_reported() {
        let registry = ProviderRegistry::new();
        registry
            .register("panics", || -> ContextMap { panic!("no context today") })
            .unwrap();

        let err = merge_context(&ContextMap::new(), &registry.gather(), false).unwrap_err();

        match err {
            ContextError::ProviderExecutionFailed { provider, source } => {
                assert_eq!(provider, "panics");
                assert!(source.to_string().contains("no context today"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
