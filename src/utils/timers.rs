//! Timer ownership
//!
//! Every periodic or delayed task the engine runs lives in a `TimerArena`
//! owned by a lifecycle record. Handles are plain ids, so nothing outside the
//! arena can keep a timer alive after the record cancels it.

use std::collections::HashMap;
use std::future::Future;
use tokio::task::JoinHandle;

/// Handle to a timer owned by a `TimerArena`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

/// What a timer drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// 1 Hz elapsed-time ticker of an active recording
    ElapsedTicker,
    /// Periodic reapplication of preview effects
    EffectsTicker,
    /// Delayed hide of on-screen playback controls
    ControlsAutoHide,
}

struct TimerEntry {
    kind: TimerKind,
    handle: JoinHandle<()>,
}

/// Arena of timer tasks keyed by `TimerId`
#[derive(Default)]
pub struct TimerArena {
    next_id: u64,
    timers: HashMap<TimerId, TimerEntry>,
}

impl TimerArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a timer task onto the current Tokio runtime
    pub fn spawn<F>(&mut self, kind: TimerKind, task: F) -> TimerId
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.prune();

        let id = TimerId(self.next_id);
        self.next_id += 1;

        let handle = tokio::spawn(task);
        self.timers.insert(id, TimerEntry { kind, handle });
        tracing::debug!("Timer {:?} started ({:?})", id, kind);
        id
    }

    /// Cancel one timer. Returns false if it was unknown.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.timers.remove(&id) {
            Some(entry) => {
                entry.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Cancel every timer of the given kind
    pub fn cancel_kind(&mut self, kind: TimerKind) -> usize {
        let ids: Vec<TimerId> = self
            .timers
            .iter()
            .filter(|(_, entry)| entry.kind == kind)
            .map(|(id, _)| *id)
            .collect();

        for id in &ids {
            self.cancel(*id);
        }

        if !ids.is_empty() {
            tracing::debug!("Cancelled {} {:?} timer(s)", ids.len(), kind);
        }
        ids.len()
    }

    /// Cancel everything
    pub fn cancel_all(&mut self) -> usize {
        let count = self.timers.len();
        for (_, entry) in self.timers.drain() {
            entry.handle.abort();
        }
        count
    }

    /// Number of timers that have not finished
    pub fn pending(&self) -> usize {
        self.timers
            .values()
            .filter(|entry| !entry.handle.is_finished())
            .count()
    }

    pub fn is_active(&self, kind: TimerKind) -> bool {
        self.timers
            .values()
            .any(|entry| entry.kind == kind && !entry.handle.is_finished())
    }

    fn prune(&mut self) {
        self.timers.retain(|_, entry| !entry.handle.is_finished());
    }
}

impl Drop for TimerArena {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn counting_ticker(counter: Arc<AtomicUsize>) -> impl Future<Output = ()> + Send + 'static {
        async move {
            loop {
                tokio::time::sleep(Duration::from_secs(1)).await;
                counter.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_kind_leaves_other_timers() {
        let mut arena = TimerArena::new();
        let ticks = Arc::new(AtomicUsize::new(0));

        arena.spawn(TimerKind::ElapsedTicker, counting_ticker(Arc::clone(&ticks)));
        arena.spawn(TimerKind::EffectsTicker, std::future::pending());
        assert_eq!(arena.pending(), 2);

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 2);

        assert_eq!(arena.cancel_kind(TimerKind::ElapsedTicker), 1);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 2);
        assert!(arena.is_active(TimerKind::EffectsTicker));
        assert!(!arena.is_active(TimerKind::ElapsedTicker));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all_clears_pending() {
        let mut arena = TimerArena::new();
        let id = arena.spawn(TimerKind::ControlsAutoHide, std::future::pending());
        arena.spawn(TimerKind::EffectsTicker, std::future::pending());

        assert!(arena.cancel(id));
        assert!(!arena.cancel(id));
        assert_eq!(arena.cancel_all(), 1);
        assert_eq!(arena.pending(), 0);
    }
}
