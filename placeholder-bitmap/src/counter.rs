use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::{Error, Result};

/// Default cap on the number of live bitmaps.
pub const DEFAULT_MAX_BITMAP_COUNT: usize = 384;
/// Default cap on the total bytes held by live bitmaps.
pub const DEFAULT_MAX_BITMAP_SIZE: usize = 256 * 1024 * 1024;

#[derive(Debug, Default)]
struct CounterState {
    count: usize,
    size: usize,
}

/// Bounds the number and total byte size of live decoded bitmaps.
///
/// Every [`Bitmap`](crate::bitmap::Bitmap) reserves its bytes here when allocated and
/// returns them when dropped.
#[derive(Debug)]
pub struct BitmapCounter {
    max_count: usize,
    max_size: usize,
    state: Mutex<CounterState>,
}

impl BitmapCounter {
    /// Creates a counter allowing `max_count` bitmaps totalling `max_size` bytes.
    pub fn new(max_count: usize, max_size: usize) -> Self {
        Self {
            max_count,
            max_size,
            state: Mutex::new(CounterState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CounterState> {
        // The state is two integers; a panic mid-update cannot leave it torn.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Tries to account for a new bitmap of `bytes` bytes. Returns false if the
    /// counter is full.
    pub fn increase(&self, bytes: usize) -> bool {
        let mut state = self.lock();
        if state.count >= self.max_count || state.size.saturating_add(bytes) > self.max_size {
            return false;
        }
        state.count += 1;
        state.size += bytes;
        true
    }

    /// Like [`increase`](Self::increase) but reports the counter state on failure.
    pub fn reserve(&self, bytes: usize) -> Result<()> {
        let mut state = self.lock();
        if state.count >= self.max_count || state.size.saturating_add(bytes) > self.max_size {
            log::warn!(
                "bitmap counter exhausted: {} of {} bitmaps, {} of {} bytes, requested {}",
                state.count,
                self.max_count,
                state.size,
                self.max_size,
                bytes
            );
            return Err(Error::TooManyBitmaps {
                requested: bytes,
                count: state.count,
                max_count: self.max_count,
                size: state.size,
                max_size: self.max_size,
            });
        }
        state.count += 1;
        state.size += bytes;
        Ok(())
    }

    /// Releases a bitmap of `bytes` bytes previously accounted for.
    pub fn decrease(&self, bytes: usize) {
        let mut state = self.lock();
        debug_assert!(state.count > 0, "no bitmaps to release");
        debug_assert!(bytes <= state.size, "released more bytes than held");
        state.count = state.count.saturating_sub(1);
        state.size = state.size.saturating_sub(bytes);
    }

    /// Live bitmaps
    pub fn count(&self) -> usize {
        self.lock().count
    }

    /// Live bytes
    pub fn size(&self) -> usize {
        self.lock().size
    }

    /// Limit on live bitmaps
    pub fn max_count(&self) -> usize {
        self.max_count
    }

    /// Limit on live bytes
    pub fn max_size(&self) -> usize {
        self.max_size
    }
}

impl Default for BitmapCounter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BITMAP_COUNT, DEFAULT_MAX_BITMAP_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn respects_count_limit() {
        let counter = BitmapCounter::new(2, 1000);
        assert!(counter.increase(10));
        assert!(counter.increase(10));
        assert!(!counter.increase(10));
        assert_eq!(counter.count(), 2);
        assert_eq!(counter.size(), 20);

        counter.decrease(10);
        assert!(counter.increase(10));
    }

    #[test]
    fn respects_size_limit() {
        let counter = BitmapCounter::new(10, 100);
        assert!(counter.increase(60));
        match counter.reserve(41) {
            Err(Error::TooManyBitmaps {
                requested,
                count,
                size,
                ..
            }) => {
                assert_eq!(requested, 41);
                assert_eq!(count, 1);
                assert_eq!(size, 60);
            }
            other => panic!("expected TooManyBitmaps, got {other:?}"),
        }
        assert!(counter.reserve(40).is_ok());
        assert_eq!(counter.size(), 100);
    }
}
