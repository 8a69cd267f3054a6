//! The context provider interface.

use std::collections::BTreeMap;
use std::fmt;

/// A flat string-to-string context map.
pub type ContextMap = BTreeMap<String, String>;

/// Error a provider may return instead of a map.
pub type ProviderError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Supplies context entries for every log record.
///
/// Any `Fn() -> ContextMap` closure is a provider. Wrap fallible closures
/// with [`provider_fn`].
///
/// ```
/// use lh_context::{ContextMap, ContextProvider};
///
/// let provider = || ContextMap::from([("service".to_string(), "billing".to_string())]);
/// assert_eq!(provider.provide().unwrap()["service"], "billing");
/// ```
pub trait ContextProvider: Send + Sync {
    fn provide(&self) -> Result<ContextMap, ProviderError>;
}

impl<F> ContextProvider for F
where
    F: Fn() -> ContextMap + Send + Sync,
{
    fn provide(&self) -> Result<ContextMap, ProviderError> {
        Ok(self())
    }
}

/// Adapter that turns a fallible closure into a provider.
pub struct FnProvider<F>(F);

impl<F, E> ContextProvider for FnProvider<F>
where
    F: Fn() -> Result<ContextMap, E> + Send + Sync,
    E: Into<ProviderError>,
{
    fn provide(&self) -> Result<ContextMap, ProviderError> {
        (self.0)().map_err(Into::into)
    }
}

impl<F> fmt::Debug for FnProvider<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnProvider")
    }
}

/// Wrap a closure returning `Result<ContextMap, E>`.
pub fn provider_fn<F, E>(f: F) -> FnProvider<F>
where
    F: Fn() -> Result<ContextMap, E> + Send + Sync,
    E: Into<ProviderError>,
{
    FnProvider(f)
}

/// Build a [`ContextMap`] from string pairs.
pub fn context_map<K, V, I>(entries: I) -> ContextMap
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    entries
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
