//! Window Lifecycle Notifications
//!
//! Native surfaces report closes through a [`CloseNotifier`], which holds only
//! a `Weak` handle to the observer (normally the registry). The registry owns
//! the surfaces, so a strong handle here would form a cycle.

use std::sync::Weak;

use crate::WindowId;

/// Receives close notifications from native surfaces.
///
/// `on_close` may be called more than once for the same window (some platforms
/// report both "should close" and "will close"); implementations must be
/// idempotent.
pub trait LifecycleObserver: Send + Sync {
    fn on_close(&self, window_id: WindowId);
}

/// Observer used by detached notifiers; never receives anything
struct Detached;

impl LifecycleObserver for Detached {
    fn on_close(&self, _window_id: WindowId) {}
}

/// Per-window handle a surface uses to report that it closed
#[derive(Clone)]
pub struct CloseNotifier {
    window_id: WindowId,
    observer: Weak<dyn LifecycleObserver>,
}

impl CloseNotifier {
    pub fn new(window_id: WindowId, observer: Weak<dyn LifecycleObserver>) -> Self {
        Self {
            window_id,
            observer,
        }
    }

    /// Notifier with no observer behind it (surfaces built outside a registry)
    pub fn detached(window_id: WindowId) -> Self {
        let observer: Weak<dyn LifecycleObserver> = Weak::<Detached>::new();
        Self::new(window_id, observer)
    }

    pub fn window_id(&self) -> WindowId {
        self.window_id
    }

    /// Report the close. Returns false if the observer is already gone.
    pub fn notify(&self) -> bool {
        match self.observer.upgrade() {
            Some(observer) => {
                observer.on_close(self.window_id);
                true
            }
            None => false,
        }
    }
}

impl std::fmt::Debug for CloseNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloseNotifier")
            .field("window_id", &self.window_id)
            .field("attached", &(self.observer.strong_count() > 0))
            .finish()
    }
}
