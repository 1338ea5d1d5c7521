//! Window Identity Allocation
//!
//! Issues secondary window ids. The counter starts at 0 and is bumped before
//! every issue, so the first secondary window is 1 and 0 stays reserved for
//! the main window. Ids are never handed out twice, even after the window
//! that held one has closed.

use std::sync::atomic::{AtomicI64, Ordering};

use crate::WindowId;

/// Process-wide monotonic id counter (safe to share across threads)
#[derive(Debug, Default)]
pub struct IdAllocator {
    last: AtomicI64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self {
            last: AtomicI64::new(0),
        }
    }

    /// Issue the next id: strictly greater than every id issued before, never 0
    pub fn next_id(&self) -> WindowId {
        self.last.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Last id issued, or 0 if none has been
    pub fn peek(&self) -> WindowId {
        self.last.load(Ordering::SeqCst)
    }
}
