use std::sync::atomic::{AtomicUsize, Ordering};

/// Remembers the last epoch number seen and reports each change once.
///
/// `advance` is a compare-and-swap, so concurrent callers that observe
/// the same new epoch agree on exactly one winner.
#[derive(Debug)]
pub struct EpochTracker {
    last: AtomicUsize,
}

impl EpochTracker {
    pub fn new(initial: usize) -> Self {
        Self {
            last: AtomicUsize::new(initial),
        }
    }

    pub fn last(&self) -> usize {
        self.last.load(Ordering::Acquire)
    }

    /// `true` iff `epoch_num` differs from the last value and this
    /// call is the one that recorded it
    pub fn advance(&self, epoch_num: usize) -> bool {
        let mut current = self.last.load(Ordering::Acquire);
        loop {
            if current == epoch_num {
                return false;
            }
            match self.last.compare_exchange(
                current,
                epoch_num,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }
}

impl Default for EpochTracker {
    fn default() -> Self {
        Self::new(0)
    }
}
