//! Trailing-edge debouncing of component saves.
//!
//! Each logical target (one notebook template, one note) gets its own
//! [`Debouncer`], so editors open on different targets never cancel each
//! other's pending saves. Within a target, a new edit replaces the pending
//! one; only the last state is persisted when the window elapses.

use crate::core::settings::DebounceSettings;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// What kind of edit triggered a save; selects the debounce window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditKind {
    /// Typing into a component's content.
    Content,
    Title,
    Config,
    /// Adding, removing or reordering components.
    Structure,
}

/// The record a pending save writes to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SaveTarget {
    Notebook(String),
    Note(String),
}

type Persist<T> = Arc<dyn Fn(T) + Send + Sync>;

/// Holds at most one pending save and replaces it on every new edit.
///
/// Dropping a `Debouncer` does not cancel its pending save; call
/// [`cancel`](Self::cancel) to discard it.
pub struct Debouncer<T> {
    persist: Persist<T>,
    pending: Option<JoinHandle<()>>,
}

impl<T> std::fmt::Debug for Debouncer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debouncer").field("pending", &self.pending.is_some()).finish()
    }
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new<F>(persist: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        Self { persist: Arc::new(persist), pending: None }
    }

    /// Persists `state` once `window` has passed without another call.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn schedule(&mut self, state: T, window: Duration) {
        self.cancel();
        let persist = Arc::clone(&self.persist);
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(window).await;
            persist(state);
        }));
    }

    /// Discards the pending save, if any.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }
}

/// One [`Debouncer`] per [`SaveTarget`], with windows taken from settings.
pub struct SaveScheduler<T> {
    windows: DebounceSettings,
    persist: Arc<dyn Fn(&SaveTarget, T) + Send + Sync>,
    debouncers: HashMap<SaveTarget, Debouncer<T>>,
}

impl<T> std::fmt::Debug for SaveScheduler<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaveScheduler")
            .field("windows", &self.windows)
            .field("targets", &self.debouncers.len())
            .finish()
    }
}

impl<T: Send + 'static> SaveScheduler<T> {
    pub fn new<F>(windows: DebounceSettings, persist: F) -> Self
    where
        F: Fn(&SaveTarget, T) + Send + Sync + 'static,
    {
        Self { windows, persist: Arc::new(persist), debouncers: HashMap::new() }
    }

    /// Schedules a save of `state` for `target`, superseding any pending save
    /// for the same target. Targets whose saves have already fired are
    /// forgotten here, so the map only grows with concurrently edited targets.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn schedule(&mut self, target: SaveTarget, kind: EditKind, state: T) {
        self.debouncers.retain(|_, d| d.is_pending());
        let window = self.windows.window(kind);
        let persist = Arc::clone(&self.persist);
        let debouncer = self.debouncers.entry(target.clone()).or_insert_with(|| {
            let target = target.clone();
            Debouncer::new(move |state| persist(&target, state))
        });
        log::debug!("save of {target:?} scheduled in {window:?}");
        debouncer.schedule(state, window);
    }

    pub fn cancel(&mut self, target: &SaveTarget) {
        if let Some(mut debouncer) = self.debouncers.remove(target) {
            debouncer.cancel();
        }
    }

    pub fn is_pending(&self, target: &SaveTarget) -> bool {
        self.debouncers.get(target).is_some_and(Debouncer::is_pending)
    }

    /// Number of targets with a save still waiting to fire.
    pub fn pending_count(&self) -> usize {
        self.debouncers.values().filter(|d| d.is_pending()).count()
    }
}
