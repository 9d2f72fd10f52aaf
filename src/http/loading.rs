//! Reference-counted loading indicator.

use std::sync::{Arc, Mutex};

use crate::ui::{LoadingIndicator, NoopIndicator};

/// Counts in-flight calls that asked for the loading indicator.
///
/// The indicator is shown on the 0→1 transition and hidden on 1→0. The count
/// floors at zero.
///
/// Transitions are serialized by an ordering lock, so show/hide calls are
/// never observed out of order. The count lock is released before the
/// indicator runs: callbacks may read [`count`](Self::count) and
/// [`is_visible`](Self::is_visible), but must not begin or end calls on the
/// same tracker.
#[derive(Clone)]
pub struct LoadingTracker {
    inner: Arc<Inner>,
}

struct Inner {
    /// Held across a transition and its indicator call.
    order: Mutex<()>,
    count: Mutex<usize>,
    indicator: Arc<dyn LoadingIndicator>,
}

impl LoadingTracker {
    pub fn new(indicator: Arc<dyn LoadingIndicator>) -> Self {
        Self {
            inner: Arc::new(Inner {
                order: Mutex::new(()),
                count: Mutex::new(0),
                indicator,
            }),
        }
    }

    /// Current number of in-flight calls holding the indicator.
    pub fn count(&self) -> usize {
        *self.lock_count()
    }

    pub fn is_visible(&self) -> bool {
        self.count() > 0
    }

    pub fn increment(&self) {
        let _order = self.inner.order.lock().unwrap_or_else(|p| p.into_inner());
        let shown = {
            let mut count = self.lock_count();
            *count += 1;
            *count == 1
        };
        if shown {
            self.inner.indicator.show();
        }
    }

    pub fn decrement(&self) {
        let _order = self.inner.order.lock().unwrap_or_else(|p| p.into_inner());
        let hidden = {
            let mut count = self.lock_count();
            match *count {
                0 => {
                    tracing::warn!("Loading count decremented below zero; ignoring");
                    false
                }
                n => {
                    *count = n - 1;
                    n == 1
                }
            }
        };
        if hidden {
            self.inner.indicator.hide();
        }
    }

    fn lock_count(&self) -> std::sync::MutexGuard<'_, usize> {
        self.inner.count.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Increment now; decrement when the returned guard is dropped.
    pub fn begin(&self) -> LoadingGuard {
        self.increment();
        LoadingGuard {
            tracker: self.clone(),
        }
    }
}

impl Default for LoadingTracker {
    fn default() -> Self {
        Self::new(Arc::new(NoopIndicator))
    }
}

impl std::fmt::Debug for LoadingTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadingTracker")
            .field("count", &self.count())
            .finish()
    }
}

/// Releases one loading reference on drop, including when the call future
/// is dropped before it settles.
#[must_use = "the loading reference is released as soon as the guard is dropped"]
pub struct LoadingGuard {
    tracker: LoadingTracker,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.tracker.decrement();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct Recorder {
        calls: StdMutex<Vec<&'static str>>,
    }

    impl LoadingIndicator for Recorder {
        fn show(&self) {
            self.calls.lock().unwrap().push("show");
        }
        fn hide(&self) {
            self.calls.lock().unwrap().push("hide");
        }
    }

    #[test]
    fn test_show_and_hide_only_on_transitions() {
        let recorder = Arc::new(Recorder::default());
        let tracker = LoadingTracker::new(recorder.clone());

        let a = tracker.begin();
        let b = tracker.begin();
        assert_eq!(tracker.count(), 2);
        drop(a);
        assert!(tracker.is_visible());
        drop(b);
        assert!(!tracker.is_visible());

        assert_eq!(*recorder.calls.lock().unwrap(), vec!["show", "hide"]);
    }

    #[test]
    fn test_count_never_negative() {
        let recorder = Arc::new(Recorder::default());
        let tracker = LoadingTracker::new(recorder.clone());
        tracker.decrement();
        tracker.decrement();
        assert_eq!(tracker.count(), 0);
        assert!(recorder.calls.lock().unwrap().is_empty());

        tracker.increment();
        assert_eq!(tracker.count(), 1);
        assert_eq!(*recorder.calls.lock().unwrap(), vec!["show"]);
    }

    #[test]
    fn test_clones_share_the_count() {
        let tracker = LoadingTracker::default();
        let other = tracker.clone();
        let _guard = tracker.begin();
        assert_eq!(other.count(), 1);
    }

    /// Indicator that inspects the tracker it belongs to.
    #[derive(Default)]
    struct Inspecting {
        tracker: std::sync::OnceLock<LoadingTracker>,
        seen: StdMutex<Vec<(&'static str, usize, bool)>>,
    }

    impl Inspecting {
        fn record(&self, call: &'static str) {
            if let Some(tracker) = self.tracker.get() {
                let entry = (call, tracker.count(), tracker.is_visible());
                self.seen.lock().unwrap().push(entry);
            }
        }
    }

    impl LoadingIndicator for Inspecting {
        fn show(&self) {
            self.record("show");
        }
        fn hide(&self) {
            self.record("hide");
        }
    }

    #[test]
    fn test_indicator_can_read_tracker_during_callback() {
        let indicator = Arc::new(Inspecting::default());
        let tracker = LoadingTracker::new(indicator.clone());
        let _ = indicator.tracker.set(tracker.clone());

        let guard = tracker.begin();
        drop(guard);

        assert_eq!(
            *indicator.seen.lock().unwrap(),
            vec![("show", 1, true), ("hide", 0, false)]
        );
    }
}
