//! Per-thread logging context with scoped restoration.
//!
//! Each thread owns one [`ContextMap`]. Child threads and async tasks do not
//! see their parent's map unless it is handed over explicitly as a
//! [`ContextSnapshot`], via [`spawn`] or [`FutureExt`].

use std::cell::RefCell;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context as TaskContext, Poll};
use std::thread::JoinHandle;

use lh_config::Configuration;

use crate::merge::merge_context;
use crate::provider::ContextMap;
use crate::registry::ProviderRegistry;
use crate::Result;

/// The context of one thread or task, plus the maps its open scopes restore.
#[derive(Debug, Default)]
struct Frame {
    map: ContextMap,
    /// Oldest scope first.
    scopes: Vec<ScopeRecord>,
}

#[derive(Debug)]
struct ScopeRecord {
    id: u64,
    previous: ContextMap,
}

impl Frame {
    fn new(map: ContextMap) -> Self {
        Frame {
            map,
            scopes: Vec::new(),
        }
    }
}

thread_local! {
    static CONTEXT: RefCell<Frame> = RefCell::new(Frame::default());
}

static NEXT_SCOPE_ID: AtomicU64 = AtomicU64::new(0);

fn replace_current(map: ContextMap) -> ContextMap {
    CONTEXT
        .try_with(|c| std::mem::replace(&mut c.borrow_mut().map, map))
        .unwrap_or_default()
}

fn swap_current(slot: &mut Frame) {
    let _ = CONTEXT.try_with(|c| std::mem::swap(&mut *c.borrow_mut(), slot));
}

/// Access to the current thread's logging context.
#[derive(Debug, Clone, Copy)]
pub struct LoggingContext;

impl LoggingContext {
    /// Merge `entries` into the current context; existing keys are overwritten.
    pub fn set<K, V, I>(entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        CONTEXT.with(|c| {
            let map = &mut c.borrow_mut().map;
            for (k, v) in entries {
                map.insert(k.into(), v.into());
            }
        });
    }

    /// A copy of the current context.
    pub fn get() -> ContextMap {
        CONTEXT.with(|c| c.borrow().map.clone())
    }

    pub fn clear() {
        replace_current(ContextMap::new());
    }

    /// Add `entries` on top of the current context until the guard drops.
    ///
    /// The exact previous map is restored on drop, however the scope exits.
    pub fn scoped<K, V, I>(entries: I) -> ContextScope
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut next = Self::get();
        for (k, v) in entries {
            next.insert(k.into(), v.into());
        }
        ContextScope::install(next)
    }

    /// Run `f` with `entries` added to the context.
    pub fn scope<K, V, I, T>(entries: I, f: impl FnOnce() -> T) -> T
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let _scope = Self::scoped(entries);
        f()
    }

    /// Capture the current context for hand-over to another thread or task.
    pub fn snapshot() -> ContextSnapshot {
        ContextSnapshot(Self::get())
    }

    /// The current context merged with every provider in `registry`.
    ///
    /// Whether providers may overwrite existing keys is read from `config`
    /// on each call.
    pub fn resolve(config: &Configuration, registry: &ProviderRegistry) -> Result<ContextMap> {
        let local = Self::get();
        let providers = registry.gather();
        merge_context(&local, &providers, config.allow_provider_overwrite())
    }
}

/// Guard restoring the previous context on drop.
///
/// Scopes may drop in any order. Dropping a scope while a newer one is
/// still open leaves the current map alone; the newer scope then restores
/// the map that was current before the older one.
#[must_use = "the context is restored as soon as the guard is dropped"]
#[derive(Debug)]
pub struct ContextScope {
    id: u64,
    // Restores a thread-local, so it must drop on the thread that made it.
    _not_send: PhantomData<*const ()>,
}

impl ContextScope {
    fn install(map: ContextMap) -> Self {
        let id = NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed);
        let _ = CONTEXT.try_with(|c| {
            let mut frame = c.borrow_mut();
            let previous = std::mem::replace(&mut frame.map, map);
            frame.scopes.push(ScopeRecord { id, previous });
        });
        ContextScope {
            id,
            _not_send: PhantomData,
        }
    }
}

impl Drop for ContextScope {
    fn drop(&mut self) {
        let _ = CONTEXT.try_with(|c| {
            let mut guard = c.borrow_mut();
            let frame = &mut *guard;
            // Absent when the owning task's frame is not entered.
            let Some(pos) = frame.scopes.iter().position(|s| s.id == self.id) else {
                return;
            };
            let record = frame.scopes.remove(pos);
            match frame.scopes.get_mut(pos) {
                Some(newer) => newer.previous = record.previous,
                None => frame.map = record.previous,
            }
        });
    }
}

/// A captured context map that can cross threads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextSnapshot(ContextMap);

impl ContextSnapshot {
    pub fn new(map: ContextMap) -> Self {
        ContextSnapshot(map)
    }

    /// Make this snapshot the current thread's context until the guard drops.
    pub fn attach(&self) -> ContextScope {
        ContextScope::install(self.0.clone())
    }

    pub fn as_map(&self) -> &ContextMap {
        &self.0
    }

    pub fn into_map(self) -> ContextMap {
        self.0
    }
}

impl From<ContextMap> for ContextSnapshot {
    fn from(map: ContextMap) -> Self {
        ContextSnapshot(map)
    }
}

/// Spawn a thread that starts with a copy of the caller's context.
pub fn spawn<F, T>(f: F) -> JoinHandle<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let snapshot = LoggingContext::snapshot();
    std::thread::spawn(move || {
        let _scope = snapshot.attach();
        f()
    })
}

/// Future adapter that carries its own logging context.
///
/// The wrapped future sees its map as the thread's context during every
/// poll, on whichever thread polls it; changes it makes are kept for the
/// next poll. The poller's own context is untouched.
#[must_use = "futures do nothing unless polled"]
pub struct WithContext<F> {
    inner: Pin<Box<F>>,
    context: Frame,
}

impl<F: Future> Future for WithContext<F> {
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<F::Output> {
        let this = self.get_mut();
        let _entered = Entered::new(&mut this.context);
        this.inner.as_mut().poll(cx)
    }
}

impl<F> std::fmt::Debug for WithContext<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WithContext")
            .field("context", &self.context.map)
            .finish_non_exhaustive()
    }
}

struct Entered<'a> {
    slot: &'a mut Frame,
}

impl<'a> Entered<'a> {
    fn new(slot: &'a mut Frame) -> Self {
        swap_current(slot);
        Entered { slot }
    }
}

impl Drop for Entered<'_> {
    fn drop(&mut self) {
        swap_current(self.slot);
    }
}

/// Extension methods attaching a logging context to a future.
pub trait FutureExt: Future + Sized {
    /// Run this future with `snapshot` as its context.
    fn with_context(self, snapshot: ContextSnapshot) -> WithContext<Self> {
        WithContext {
            inner: Box::pin(self),
            context: Frame::new(snapshot.into_map()),
        }
    }

    /// Run this future with a copy of the caller's current context.
    fn in_current_context(self) -> WithContext<Self> {
        self.with_context(LoggingContext::snapshot())
    }
}

impl<F: Future> FutureExt for F {}
