//! # Buffer Pool
//!
//! Two-tier recycling of packet [`Buffer`]s so the hot path never allocates.
//!
//! ## Tiers
//! - **Local**: one free list per thread, touched without any synchronization
//! - **Global**: one shared free list behind a mutex, used on local misses and
//!   fed by [`merge`]
//!
//! `release` always lands on the calling thread's local list, so a buffer
//! released on a thread is immediately available to the next `acquire` on that
//! same thread. Busy threads accumulate idle buffers locally; calling [`merge`]
//! once per processing tick moves them to the global tier where other threads
//! can pick them up. When a thread exits its local list is merged as well.
//!
//! ## Usage
//! ```rust
//! use gamewire::utils::buffer_pool;
//!
//! let mut buffer = buffer_pool::acquire();
//! buffer.put_u32(7);
//! buffer_pool::release(buffer);
//! buffer_pool::merge();
//! ```

use std::cell::RefCell;
use std::collections::LinkedList;
use std::sync::atomic::Ordering;
use std::sync::Mutex;

use once_cell::sync::Lazy;
use tracing::debug;

use crate::core::buffer::Buffer;
use crate::utils::metrics::global_metrics;

/// LIFO free list of idle buffers.
///
/// Buffers live in segments; pushes go to the tail segment and merging
/// splices the other list's segments on in O(1). No segment is ever empty.
#[derive(Debug, Default)]
pub struct BufferList {
    segments: LinkedList<Vec<Buffer>>,
    len: usize,
}

impl BufferList {
    pub const fn new() -> Self {
        Self {
            segments: LinkedList::new(),
            len: 0,
        }
    }

    #[inline]
    pub fn push(&mut self, buffer: Buffer) {
        match self.segments.back_mut() {
            Some(segment) => segment.push(buffer),
            None => self.segments.push_back(vec![buffer]),
        }
        self.len += 1;
    }

    #[inline]
    pub fn take(&mut self) -> Option<Buffer> {
        let segment = self.segments.back_mut()?;
        let buffer = segment.pop();
        if segment.is_empty() {
            self.segments.pop_back();
        }
        if buffer.is_some() {
            self.len -= 1;
        }
        buffer
    }

    /// Move every buffer of `other` onto this list.
    pub fn merge(&mut self, other: &mut BufferList) {
        self.segments.append(&mut other.segments);
        self.len += std::mem::take(&mut other.len);
    }

    /// Detach every buffer, leaving the list empty.
    pub fn clear(&mut self) -> Vec<Buffer> {
        self.len = 0;
        std::mem::take(&mut self.segments)
            .into_iter()
            .flatten()
            .collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[cfg(test)]
    fn segment_count(&self) -> usize {
        self.segments.len()
    }
}

/// Thread-local tier; hands its buffers to the global tier when the thread exits.
struct LocalTier(BufferList);

impl Drop for LocalTier {
    fn drop(&mut self) {
        if self.0.is_empty() {
            return;
        }
        if let Ok(mut global) = GLOBAL.lock() {
            global.merge(&mut self.0);
        }
    }
}

static GLOBAL: Lazy<Mutex<BufferList>> = Lazy::new(|| Mutex::new(BufferList::new()));

thread_local! {
    static LOCAL: RefCell<LocalTier> = const { RefCell::new(LocalTier(BufferList::new())) };
}

fn take_from_global() -> Option<Buffer> {
    GLOBAL.lock().ok().and_then(|mut global| global.take())
}

/// Get an idle buffer: local tier, then global tier, then a fresh allocation.
pub fn acquire() -> Buffer {
    let local = LOCAL
        .try_with(|local| local.borrow_mut().0.take())
        .ok()
        .flatten();

    if let Some(buffer) = local {
        global_metrics().pool_local_hit();
        return buffer;
    }

    if let Some(buffer) = take_from_global() {
        global_metrics().pool_global_hit();
        return buffer;
    }

    Buffer::new()
}

/// Reset a buffer and park it on the calling thread's local tier.
pub fn release(mut buffer: Buffer) {
    buffer.reset();

    let parked = LOCAL.try_with(|local| local.borrow_mut().0.push(buffer));
    if parked.is_err() {
        // thread teardown: the local tier is gone and the buffer is freed
        debug!("Buffer released during thread teardown was dropped");
    }
}

/// Move the calling thread's idle buffers to the global tier.
pub fn merge() {
    let _ = LOCAL.try_with(|local| {
        let mut local = local.borrow_mut();
        if local.0.is_empty() {
            return;
        }
        if let Ok(mut global) = GLOBAL.lock() {
            global.merge(&mut local.0);
        }
    });
}

/// Drop every buffer parked in the global tier, returning how many were freed.
pub fn clear() -> usize {
    match GLOBAL.lock() {
        Ok(mut global) => global.clear().len(),
        Err(_) => 0,
    }
}

/// Number of idle buffers on the calling thread's local tier.
pub fn local_available() -> usize {
    LOCAL
        .try_with(|local| local.borrow().0.len())
        .unwrap_or(0)
}

/// Number of idle buffers in the global tier.
pub fn global_available() -> usize {
    GLOBAL.lock().map(|global| global.len()).unwrap_or(0)
}

/// Point-in-time view of the pool as seen from the calling thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Buffers ever allocated, process-wide.
    pub allocated: u64,
    /// Idle buffers on the calling thread's local tier.
    pub local_idle: usize,
    /// Idle buffers in the global tier.
    pub global_idle: usize,
}

pub fn stats() -> PoolStats {
    PoolStats {
        allocated: global_metrics().buffers_allocated.load(Ordering::Relaxed),
        local_idle: local_available(),
        global_idle: global_available(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_list_lifo() {
        let mut list = BufferList::new();
        let mut first = Buffer::new();
        first.set_sequence(1);
        let mut second = Buffer::new();
        second.set_sequence(2);

        list.push(first);
        list.push(second);
        assert_eq!(list.len(), 2);
        assert_eq!(list.take().map(|b| b.sequence()), Some(2));
        assert_eq!(list.take().map(|b| b.sequence()), Some(1));
        assert!(list.take().is_none());
    }

    #[test]
    fn test_buffer_list_merge_empties_source() {
        let mut target = BufferList::new();
        let mut source = BufferList::new();
        source.push(Buffer::new());
        source.push(Buffer::new());

        target.merge(&mut source);
        assert_eq!(target.len(), 2);
        assert!(source.is_empty());

        source.push(Buffer::new());
        target.merge(&mut source);
        assert_eq!(target.len(), 3);
        assert!(source.is_empty());
    }

    #[test]
    fn test_merge_splices_segments() {
        let mut target = BufferList::new();
        target.push(Buffer::new());

        let mut source = BufferList::new();
        for sequence in 0..3 {
            let mut buffer = Buffer::new();
            buffer.set_sequence(sequence);
            source.push(buffer);
        }

        target.merge(&mut source);
        assert_eq!(target.segment_count(), 2);
        assert_eq!(source.segment_count(), 0);
        assert_eq!(target.len(), 4);

        // the spliced segment is drained first, newest buffer on top
        let order: Vec<i16> = (0..3).filter_map(|_| target.take()).map(|b| b.sequence()).collect();
        assert_eq!(order, vec![2, 1, 0]);
        assert_eq!(target.segment_count(), 1);
        assert!(target.take().is_some());
        assert!(target.take().is_none());
        assert!(target.is_empty());
    }

    #[test]
    fn test_release_then_acquire_same_thread() {
        std::thread::spawn(|| {
            let mut buffer = acquire();
            buffer.put_bytes_raw(b"marker");
            let storage = buffer.payload().as_ptr();
            release(buffer);
            assert_eq!(local_available(), 1);

            let again = acquire();
            assert_eq!(again.payload().as_ptr(), storage);
            assert_eq!(again.size(), 0);
            assert_eq!(local_available(), 0);
        })
        .join()
        .expect("pool thread panicked");
    }

    #[test]
    fn test_merge_empties_local_tier() {
        std::thread::spawn(|| {
            release(Buffer::new());
            release(Buffer::new());
            assert_eq!(local_available(), 2);
            merge();
            assert_eq!(local_available(), 0);
        })
        .join()
        .expect("pool thread panicked");
    }

    #[test]
    fn test_stats_track_local_tier() {
        std::thread::spawn(|| {
            let before = stats();
            release(Buffer::new());
            let after = stats();
            assert_eq!(after.local_idle, before.local_idle + 1);
            assert!(after.allocated > before.allocated);
        })
        .join()
        .expect("pool thread panicked");
    }
}
