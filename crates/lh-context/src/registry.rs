//! The context provider registry.
//!
//! A [`ProviderRegistry`] is an ordinary value owned by the application and
//! passed to whatever needs provider lookup. All reads and writes go through
//! one lock; provider code is never invoked while it is held.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::default_provider::{DefaultProvider, DEFAULT_PROVIDER_NAME};
use crate::provider::ContextProvider;
use crate::{ContextError, Result};

type Entry = (String, Arc<dyn ContextProvider>);

/// A live [`TemporaryProvider`] and what it displaced.
struct Temporary {
    id: u64,
    name: String,
    installed: Arc<dyn ContextProvider>,
    previous: Option<Arc<dyn ContextProvider>>,
}

#[derive(Default)]
struct State {
    entries: Vec<Entry>,
    /// Oldest first.
    temporaries: Vec<Temporary>,
    next_id: u64,
}

/// Named context providers, kept in registration order.
#[derive(Default)]
pub struct ProviderRegistry {
    state: Mutex<State>,
}

impl ProviderRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with [`DefaultProvider`] registered as `"default"`.
    pub fn with_default() -> Self {
        let registry = Self::new();
        registry
            .lock()
            .entries
            .push((DEFAULT_PROVIDER_NAME.to_string(), Arc::new(DefaultProvider::new())));
        registry
    }

    /// Register `provider` under `name`.
    pub fn register<P>(&self, name: impl Into<String>, provider: P) -> Result<()>
    where
        P: ContextProvider + 'static,
    {
        self.register_arc(name, Arc::new(provider))
    }

    /// Register a shared provider instance under `name`.
    pub fn register_arc(
        &self,
        name: impl Into<String>,
        provider: Arc<dyn ContextProvider>,
    ) -> Result<()> {
        let name = validate_name(name.into())?;
        {
            let mut state = self.lock();
            let providers = &mut state.entries;
            if providers.iter().any(|(n, _)| *n == name) {
                return Err(ContextError::DuplicateProvider(name));
            }
            providers.push((name.clone(), provider));
        }
        tracing::debug!(provider = %name, "registered context provider");
        Ok(())
    }

    /// Remove and return the provider registered under `name`.
    pub fn unregister(&self, name: &str) -> Result<Arc<dyn ContextProvider>> {
        let removed = {
            let mut state = self.lock();
            let providers = &mut state.entries;
            let idx = providers
                .iter()
                .position(|(n, _)| n == name)
                .ok_or_else(|| ContextError::NotFound(name.to_string()))?;
            providers.remove(idx).1
        };
        tracing::debug!(provider = %name, "unregistered context provider");
        Ok(removed)
    }

    /// Look up a provider.
    ///
    /// A missing name is `Ok(None)`, or [`ContextError::NotFound`] when `strict`.
    pub fn get(&self, name: &str, strict: bool) -> Result<Option<Arc<dyn ContextProvider>>> {
        let found = self
            .lock()
            .entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, p)| Arc::clone(p));
        match found {
            None if strict => Err(ContextError::NotFound(name.to_string())),
            found => Ok(found),
        }
    }

    pub fn has(&self, name: &str) -> bool {
        self.lock().entries.iter().any(|(n, _)| n == name)
    }

    /// Snapshot of every provider, in registration order.
    pub fn all(&self) -> Providers {
        Providers(self.lock().entries.clone())
    }

    /// Alias of [`all`](Self::all), used by the merge.
    pub fn gather(&self) -> Providers {
        self.all()
    }

    pub fn names(&self) -> Vec<String> {
        self.lock().entries.iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Remove every provider, including `"default"`.
    pub fn clear(&self) {
        let removed = {
            let mut state = self.lock();
            let providers = &mut state.entries;
            let n = providers.len();
            providers.clear();
            n
        };
        tracing::debug!(removed, "cleared context providers");
    }

    /// Remove every provider except `"default"`, which stays if present.
    pub fn reset(&self) {
        let removed = {
            let mut state = self.lock();
            let providers = &mut state.entries;
            let before = providers.len();
            providers.retain(|(n, _)| n == DEFAULT_PROVIDER_NAME);
            before - providers.len()
        };
        tracing::debug!(removed, "reset context providers");
    }

    /// Install `provider` under `name` until the returned guard drops.
    ///
    /// Any provider already registered under `name` is replaced and comes
    /// back when the guard drops, including during a panic. Guards for the
    /// same name may drop in any order; each restores the provider that was
    /// registered right before it.
    pub fn temporary_provider<P>(
        &self,
        name: impl Into<String>,
        provider: P,
    ) -> Result<TemporaryProvider<'_>>
    where
        P: ContextProvider + 'static,
    {
        let name = validate_name(name.into())?;
        let provider: Arc<dyn ContextProvider> = Arc::new(provider);
        let (id, replaced) = {
            let mut guard = self.lock();
            let state = &mut *guard;
            let previous = match state.entries.iter_mut().find(|(n, _)| *n == name) {
                Some(entry) => Some(std::mem::replace(&mut entry.1, Arc::clone(&provider))),
                None => {
                    state.entries.push((name.clone(), Arc::clone(&provider)));
                    None
                }
            };
            let id = state.next_id;
            state.next_id += 1;
            let replaced = previous.is_some();
            state.temporaries.push(Temporary {
                id,
                name: name.clone(),
                installed: provider,
                previous,
            });
            (id, replaced)
        };
        tracing::debug!(
            provider = %name,
            replaced,
            "installed temporary context provider"
        );
        Ok(TemporaryProvider {
            registry: self,
            name,
            id,
        })
    }

    /// Run `f` with `provider` temporarily installed under `name`.
    pub fn with_temporary_provider<P, T>(
        &self,
        name: impl Into<String>,
        provider: P,
        f: impl FnOnce() -> T,
    ) -> Result<T>
    where
        P: ContextProvider + 'static,
    {
        let _guard = self.temporary_provider(name, provider)?;
        Ok(f())
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // Entries are only pushed, replaced or removed whole.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .finish()
    }
}

fn same_provider(a: &Arc<dyn ContextProvider>, b: &Arc<dyn ContextProvider>) -> bool {
    Arc::as_ptr(a) as *const u8 == Arc::as_ptr(b) as *const u8
}

fn validate_name(name: String) -> Result<String> {
    if name.trim().is_empty() {
        return Err(ContextError::InvalidName(name));
    }
    Ok(name)
}

/// Guard returned by [`ProviderRegistry::temporary_provider`].
#[must_use = "the provider is removed as soon as the guard is dropped"]
pub struct TemporaryProvider<'a> {
    registry: &'a ProviderRegistry,
    name: String,
    id: u64,
}

impl TemporaryProvider<'_> {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for TemporaryProvider<'_> {
    fn drop(&mut self) {
        let restored = {
            let mut guard = self.registry.lock();
            let state = &mut *guard;
            match state.temporaries.iter().position(|t| t.id == self.id) {
                Some(pos) => {
                    let record = state.temporaries.remove(pos);
                    let newer = state.temporaries[pos..]
                        .iter_mut()
                        .find(|t| t.name == record.name);
                    match newer {
                        // The newer guard now owns the slot and restores our predecessor.
                        Some(newer) => {
                            newer.previous = record.previous;
                            false
                        }
                        None => restore(&mut state.entries, record),
                    }
                }
                None => false,
            }
        };
        tracing::debug!(
            provider = %self.name,
            restored,
            "removed temporary context provider"
        );
    }
}

/// Put back what `record` displaced, if its provider still holds the slot.
fn restore(entries: &mut Vec<Entry>, record: Temporary) -> bool {
    let idx = entries.iter().position(|(n, _)| *n == record.name);
    match (idx, record.previous) {
        (Some(idx), previous) if same_provider(&entries[idx].1, &record.installed) => match previous {
            Some(prev) => {
                entries[idx].1 = prev;
                true
            }
            None => {
                entries.remove(idx);
                false
            }
        },
        (None, Some(prev)) => {
            entries.push((record.name, prev));
            true
        }
        _ => false,
    }
}

/// An independent snapshot of registered providers.
#[derive(Clone, Default)]
pub struct Providers(Vec<Entry>);

impl Providers {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn ContextProvider>)> {
        self.0.iter().map(|(n, p)| (n.as_str(), p))
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn ContextProvider>> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, p)| p)
    }

    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Providers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{context_map, ContextMap};

    fn constant(key: &'static str, value: &'static str) -> impl ContextProvider {
        move || context_map([(key, value)])
    }

    fn same(a: &Arc<dyn ContextProvider>, b: &Arc<dyn ContextProvider>) -> bool {
        same_provider(a, b)
    }

    fn current(registry: &ProviderRegistry, name: &str) -> String {
        let provider = registry.get(name, true).unwrap().unwrap();
        provider.provide().unwrap()["a"].clone()
    }

    #[test]
    fn test_register_and_get_same_instance() {
        let registry = ProviderRegistry::new();
        let provider: Arc<dyn ContextProvider> = Arc::new(constant("a", "1"));
        registry.register_arc("p1", provider.clone()).unwrap();

        let found = registry.get("p1", false).unwrap().unwrap();
        assert!(same(&found, &provider));
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let registry = ProviderRegistry::new();
        registry.register("p1", constant("a", "1")).unwrap();
        let err = registry.register("p1", constant("a", "2")).unwrap_err();
        assert!(matches!(err, ContextError::DuplicateProvider(ref n) if n == "p1"));
    }

    #[test]
    fn test_invalid_names() {
        let registry = ProviderRegistry::new();
        assert!(matches!(
            registry.register("", constant("a", "1")),
            Err(ContextError::InvalidName(_))
        ));
        assert!(matches!(
            registry.register("   ", constant("a", "1")),
            Err(ContextError::InvalidName(_))
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_get_missing() {
        let registry = ProviderRegistry::new();
        assert!(registry.get("nope", false).unwrap().is_none());
        assert!(matches!(
            registry.get("nope", true),
            Err(ContextError::NotFound(ref n)) if n == "nope"
        ));
    }

    #[test]
    fn test_unregister() {
        let registry = ProviderRegistry::new();
        registry.register("p1", constant("a", "1")).unwrap();
        let removed = registry.unregister("p1").unwrap();
        assert_eq!(removed.provide().unwrap(), context_map([("a", "1")]));
        assert!(!registry.has("p1"));
        assert!(matches!(registry.unregister("p1"), Err(ContextError::NotFound(_))));
    }

    #[test]
    fn test_snapshot_keeps_order_and_is_independent() {
        let registry = ProviderRegistry::new();
        registry.register("b", constant("b", "1")).unwrap();
        registry.register("a", constant("a", "1")).unwrap();

        let snapshot = registry.all();
        registry.register("c", constant("c", "1")).unwrap();

        assert_eq!(snapshot.names(), vec!["b", "a"]);
        assert_eq!(registry.names(), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_reset_keeps_default() {
        let registry = ProviderRegistry::with_default();
        registry.register("p1", constant("a", "1")).unwrap();
        registry.reset();
        assert_eq!(registry.names(), vec![DEFAULT_PROVIDER_NAME]);

        let empty = ProviderRegistry::new();
        empty.register("p1", constant("a", "1")).unwrap();
        empty.reset();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_clear_removes_default() {
        let registry = ProviderRegistry::with_default();
        registry.clear();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_temporary_provider_new_name() {
        let registry = ProviderRegistry::new();
        {
            let guard = registry.temporary_provider("tmp", constant("a", "1")).unwrap();
            assert_eq!(guard.name(), "tmp");
            assert!(registry.has("tmp"));
        }
        assert!(!registry.has("tmp"));
    }

    #[test]
    fn test_temporary_provider_restores_prior_occupant() {
        let registry = ProviderRegistry::new();
        let original: Arc<dyn ContextProvider> = Arc::new(constant("a", "orig"));
        registry.register_arc("p", original.clone()).unwrap();
        registry.register("q", constant("q", "1")).unwrap();

        {
            let _outer = registry.temporary_provider("p", constant("a", "outer")).unwrap();
            {
                let _inner = registry.temporary_provider("p", constant("a", "inner")).unwrap();
                let current = registry.get("p", true).unwrap().unwrap();
                assert_eq!(current.provide().unwrap()["a"], "inner");
            }
            let current = registry.get("p", true).unwrap().unwrap();
            assert_eq!(current.provide().unwrap()["a"], "outer");
        }

        let restored = registry.get("p", true).unwrap().unwrap();
        assert!(same(&restored, &original));
        assert_eq!(registry.names(), vec!["p", "q"]);
    }

    #[test]
    fn test_temporary_providers_dropped_out_of_order() {
        let registry = ProviderRegistry::new();
        let original: Arc<dyn ContextProvider> = Arc::new(constant("a", "orig"));
        registry.register_arc("p", original.clone()).unwrap();

        let outer = registry.temporary_provider("p", constant("a", "outer")).unwrap();
        let inner = registry.temporary_provider("p", constant("a", "inner")).unwrap();

        drop(outer);
        assert_eq!(current(&registry, "p"), "inner");

        drop(inner);
        let restored = registry.get("p", true).unwrap().unwrap();
        assert!(same(&restored, &original));
    }

    #[test]
    fn test_temporary_providers_out_of_order_on_free_name() {
        let registry = ProviderRegistry::new();

        let first = registry.temporary_provider("p", constant("a", "first")).unwrap();
        let second = registry.temporary_provider("p", constant("a", "second")).unwrap();
        let third = registry.temporary_provider("p", constant("a", "third")).unwrap();

        drop(second);
        assert_eq!(current(&registry, "p"), "third");
        drop(third);
        assert_eq!(current(&registry, "p"), "first");
        drop(first);
        assert!(!registry.has("p"));
    }

    #[test]
    fn test_temporary_guards_leave_other_names_alone() {
        let registry = ProviderRegistry::new();
        registry.register("q", constant("a", "q")).unwrap();

        let p = registry.temporary_provider("p", constant("a", "p")).unwrap();
        let q = registry.temporary_provider("q", constant("a", "tmp-q")).unwrap();
        drop(p);
        assert!(!registry.has("p"));
        assert_eq!(current(&registry, "q"), "tmp-q");
        drop(q);
        assert_eq!(current(&registry, "q"), "q");
    }

    #[test]
    fn test_with_temporary_provider_returns_value() {
        let registry = ProviderRegistry::new();
        let seen = registry
            .with_temporary_provider("tmp", || ContextMap::new(), || registry.has("tmp"))
            .unwrap();
        assert!(seen);
        assert!(!registry.has("tmp"));
    }
}
