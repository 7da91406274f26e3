//! Height source seam.
//!
//! The engine never advances height itself; it only reads it.

use std::sync::atomic::{AtomicU64, Ordering};

use gavel_types::BlockHeight;

/// Monotonic block counter supplied by the host ledger.
pub trait HeightSource: Send + Sync {
    fn current_height(&self) -> BlockHeight;
}

/// Manually driven clock for local ledgers and tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    height: AtomicU64,
}

impl ManualClock {
    pub fn new(height: BlockHeight) -> Self {
        Self {
            height: AtomicU64::new(height),
        }
    }

    /// Advance by `blocks` and return the new height.
    pub fn advance(&self, blocks: BlockHeight) -> BlockHeight {
        let previous = self
            .height
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |h| {
                Some(h.saturating_add(blocks))
            })
            .unwrap_or_else(|h| h);
        previous.saturating_add(blocks)
    }

    /// Move forward to `height`. Never moves backwards.
    pub fn advance_to(&self, height: BlockHeight) -> BlockHeight {
        let previous = self.height.fetch_max(height, Ordering::SeqCst);
        previous.max(height)
    }
}

impl HeightSource for ManualClock {
    fn current_height(&self) -> BlockHeight {
        self.height.load(Ordering::SeqCst)
    }
}

impl<T: HeightSource + ?Sized> HeightSource for std::sync::Arc<T> {
    fn current_height(&self) -> BlockHeight {
        (**self).current_height()
    }
}
