//! Reusable scratch buffers for transient encoding work.
//!
//! Codecs that format values through a byte buffer would otherwise allocate
//! on every call. [`ScratchBuffer`] is a growable typed buffer with an upper
//! bound, and [`ByteScratch`] checks byte buffers out of a small
//! thread-local pool so repeated calls on one thread reuse the same
//! allocation.
#![expect(
    unsafe_code,
    reason = "Manual buffer management requires raw allocation."
)]

use alloc::alloc::{alloc, dealloc, handle_alloc_error, realloc};
use alloc::format;
use alloc::vec::Vec;
use core::alloc::Layout;
use core::cell::RefCell;
use core::mem;
use core::ops::{Deref, DerefMut};
use core::ptr::NonNull;
use core::slice;
use core::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{Error, Result};

/// Buffers never shrink below this capacity.
pub const MIN_CAPACITY: usize = 64;

/// Default upper bound on a buffer's capacity, in elements.
pub const MAX_CAPACITY: usize = 1 << 30;

/// How many buffers one thread's pool may hold at once.
const POOL_DEPTH: usize = 6;

static PRESSURE: AtomicUsize = AtomicUsize::new(0);

/// Total bytes currently held by live [`ScratchBuffer`]s, across all threads.
#[inline]
pub fn pool_pressure() -> usize {
    PRESSURE.load(Ordering::Relaxed)
}

// -----------------------------------------------------------------------------
// ScratchBuffer

/// A growable buffer of `Copy` elements with a hard capacity ceiling.
///
/// Growth multiplies the capacity and never exceeds the ceiling; filling past
/// the ceiling is a [`ResourceExhausted`](Error::ResourceExhausted) error
/// rather than an unbounded allocation.
pub struct ScratchBuffer<T: Copy> {
    data: NonNull<T>,
    capacity: usize,
    len: usize,
    max_capacity: usize,
}

impl<T: Copy> ScratchBuffer<T> {
    /// A buffer with the default capacity ceiling.
    pub fn new() -> Self {
        Self::with_ceiling(MAX_CAPACITY)
    }

    /// A buffer whose capacity may never exceed `max_capacity` elements.
    ///
    /// Ceilings outside `MIN_CAPACITY..=MAX_CAPACITY` are rejected.
    pub fn with_max(max_capacity: usize) -> Result<Self> {
        if !(MIN_CAPACITY..=MAX_CAPACITY).contains(&max_capacity) {
            return Err(Error::custom(format!(
                "scratch ceiling {max_capacity} is outside {MIN_CAPACITY}..={MAX_CAPACITY}"
            )));
        }
        Ok(Self::with_ceiling(max_capacity))
    }

    fn with_ceiling(max_capacity: usize) -> Self {
        let capacity = MIN_CAPACITY.min(max_capacity);
        let data = if mem::size_of::<T>() == 0 {
            NonNull::dangling()
        } else {
            // Layout::array only fails past isize::MAX bytes, far above any
            // permitted ceiling.
            let layout = Layout::array::<T>(capacity)
                .unwrap_or_else(|_| handle_alloc_error(Layout::new::<T>()));
            // SAFETY: the layout has non-zero size.
            let raw = unsafe { alloc(layout) };
            let Some(data) = NonNull::new(raw.cast::<T>()) else {
                handle_alloc_error(layout);
            };
            PRESSURE.fetch_add(layout.size(), Ordering::Relaxed);
            data
        };
        Self {
            data,
            capacity,
            len: 0,
            max_capacity,
        }
    }

    /// Number of elements currently in the buffer.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current capacity in elements.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Forget the contents, keeping the allocation.
    #[inline]
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Grow to `capacity * 3 + min_capacity`, capped at the ceiling.
    ///
    /// Every call reallocates, so callers check the current capacity first.
    /// Existing contents are preserved. Fails when `min_capacity` exceeds the
    /// buffer's ceiling.
    pub fn expand(&mut self, min_capacity: usize) -> Result<()> {
        if min_capacity > self.max_capacity {
            return Err(Error::resource_exhausted(
                "scratch buffer",
                self.max_capacity,
            ));
        }
        let new_capacity = self
            .capacity
            .saturating_mul(3)
            .saturating_add(min_capacity)
            .min(self.max_capacity);
        if mem::size_of::<T>() > 0 {
            let old_layout = Layout::array::<T>(self.capacity)
                .unwrap_or_else(|_| handle_alloc_error(Layout::new::<T>()));
            let new_layout = Layout::array::<T>(new_capacity)
                .unwrap_or_else(|_| handle_alloc_error(Layout::new::<T>()));
            // SAFETY: data was allocated with old_layout and the new size is
            // non-zero.
            let raw =
                unsafe { realloc(self.data.as_ptr().cast::<u8>(), old_layout, new_layout.size()) };
            let Some(data) = NonNull::new(raw.cast::<T>()) else {
                handle_alloc_error(new_layout);
            };
            self.data = data;
            PRESSURE.fetch_add(new_layout.size() - old_layout.size(), Ordering::Relaxed);
        }
        self.capacity = new_capacity;
        Ok(())
    }

    /// Append one element.
    pub fn push(&mut self, value: T) -> Result<()> {
        if self.len == self.capacity {
            self.expand(self.len + 1)?;
        }
        // SAFETY: len < capacity after the expand above.
        unsafe { self.data.as_ptr().add(self.len).write(value) };
        self.len += 1;
        Ok(())
    }

    /// Append a slice of elements.
    pub fn extend_from_slice(&mut self, values: &[T]) -> Result<()> {
        let needed = self
            .len
            .checked_add(values.len())
            .ok_or_else(|| Error::resource_exhausted("scratch buffer", self.max_capacity))?;
        if needed > self.capacity {
            self.expand(needed)?;
        }
        // SAFETY: the buffer holds at least `needed` elements and `values`
        // cannot overlap our exclusive allocation.
        unsafe {
            self.data
                .as_ptr()
                .add(self.len)
                .copy_from_nonoverlapping(values.as_ptr(), values.len());
        }
        self.len = needed;
        Ok(())
    }

    /// The filled portion of the buffer.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: 0..len is initialized.
        unsafe { slice::from_raw_parts(self.data.as_ptr(), self.len) }
    }

    /// The filled portion, mutably.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: 0..len is initialized and we hold &mut self.
        unsafe { slice::from_raw_parts_mut(self.data.as_ptr(), self.len) }
    }
}

impl<T: Copy> Default for ScratchBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy> Drop for ScratchBuffer<T> {
    fn drop(&mut self) {
        if mem::size_of::<T>() == 0 {
            return;
        }
        if let Ok(layout) = Layout::array::<T>(self.capacity) {
            PRESSURE.fetch_sub(layout.size(), Ordering::Relaxed);
            // SAFETY: data was allocated with this layout.
            unsafe { dealloc(self.data.as_ptr().cast::<u8>(), layout) };
        }
    }
}

// The buffer owns its allocation exclusively.
unsafe impl<T: Copy + Send> Send for ScratchBuffer<T> {}

// -----------------------------------------------------------------------------
// Thread-local pool

struct PoolSlot {
    buffer: Option<ScratchBuffer<u8>>,
}

std::thread_local! {
    static POOL: RefCell<Vec<PoolSlot>> = const { RefCell::new(Vec::new()) };
}

/// A byte buffer checked out of the current thread's pool.
///
/// Dropping it clears the buffer and returns it to the pool for reuse.
pub struct ByteScratch {
    buffer: Option<ScratchBuffer<u8>>,
    slot: usize,
}

impl ByteScratch {
    /// Check a buffer out of the pool.
    ///
    /// Fails once [`POOL_DEPTH`] buffers are already checked out on this
    /// thread.
    pub fn try_acquire() -> Result<Self> {
        Self::try_acquire_with(MIN_CAPACITY)
    }

    /// Check out a buffer with at least `capacity` bytes available.
    pub fn try_acquire_with(capacity: usize) -> Result<Self> {
        POOL.with(|pool| {
            let mut pool = pool.borrow_mut();
            for (slot, entry) in pool.iter_mut().enumerate() {
                if let Some(mut buffer) = entry.buffer.take() {
                    if capacity > buffer.capacity() {
                        buffer.expand(capacity)?;
                    }
                    return Ok(Self {
                        buffer: Some(buffer),
                        slot,
                    });
                }
            }
            if pool.len() < POOL_DEPTH {
                let mut buffer = ScratchBuffer::new();
                if capacity > buffer.capacity() {
                    buffer.expand(capacity)?;
                }
                let slot = pool.len();
                pool.push(PoolSlot { buffer: None });
                return Ok(Self {
                    buffer: Some(buffer),
                    slot,
                });
            }
            Err(Error::resource_exhausted("scratch pool", POOL_DEPTH))
        })
    }

    fn get(&self) -> &ScratchBuffer<u8> {
        match &self.buffer {
            Some(buffer) => buffer,
            // The option is only emptied in drop.
            None => unreachable!(),
        }
    }

    fn get_mut(&mut self) -> &mut ScratchBuffer<u8> {
        match &mut self.buffer {
            Some(buffer) => buffer,
            None => unreachable!(),
        }
    }
}

impl Deref for ByteScratch {
    type Target = ScratchBuffer<u8>;

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.get()
    }
}

impl DerefMut for ByteScratch {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.get_mut()
    }
}

impl Drop for ByteScratch {
    fn drop(&mut self) {
        let Some(mut buffer) = self.buffer.take() else {
            return;
        };
        buffer.clear();
        // If the thread's pool is already gone the buffer just drops.
        let _ = POOL.try_with(|pool| {
            if let Ok(mut pool) = pool.try_borrow_mut() {
                if let Some(entry) = pool.get_mut(self.slot) {
                    entry.buffer = Some(buffer);
                }
            }
        });
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_read_back() {
        let mut buffer = ScratchBuffer::<u32>::new();
        for i in 0..100u32 {
            buffer.push(i).unwrap();
        }
        assert_eq!(buffer.len(), 100);
        assert_eq!(buffer.as_slice()[42], 42);
    }

    #[test]
    fn growth_preserves_prefix() {
        let mut buffer = ScratchBuffer::<u8>::new();
        buffer.extend_from_slice(b"hello").unwrap();
        buffer.expand(MIN_CAPACITY * 10).unwrap();
        assert_eq!(buffer.as_slice(), b"hello");
        assert!(buffer.capacity() >= MIN_CAPACITY * 10);
    }

    #[test]
    fn out_of_range_ceilings_are_rejected() {
        assert!(ScratchBuffer::<u8>::with_max(MIN_CAPACITY - 1).is_err());
        assert!(ScratchBuffer::<u8>::with_max(usize::MAX).is_err());
        assert!(ScratchBuffer::<u8>::with_max(MIN_CAPACITY).is_ok());
        assert!(ScratchBuffer::<u8>::with_max(MAX_CAPACITY).is_ok());
    }

    #[test]
    fn ceiling_is_enforced() {
        let mut buffer = ScratchBuffer::<u8>::with_max(128).unwrap();
        assert!(buffer.expand(128).is_ok());
        match buffer.expand(129) {
            Err(Error::ResourceExhausted { resource, limit }) => {
                assert_eq!(resource, "scratch buffer");
                assert_eq!(limit, 128);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn growth_is_multiplicative() {
        let mut buffer = ScratchBuffer::<u8>::new();
        let before = buffer.capacity();
        buffer.expand(before + 1).unwrap();
        assert_eq!(buffer.capacity(), before * 3 + before + 1);
    }

    #[test]
    fn expand_grows_even_within_capacity() {
        let mut buffer = ScratchBuffer::<u8>::new();
        let before = buffer.capacity();
        buffer.expand(10).unwrap();
        assert_eq!(buffer.capacity(), before * 3 + 10);
    }

    #[test]
    fn pool_reuses_buffers() {
        let first_capacity = {
            let mut scratch = ByteScratch::try_acquire().unwrap();
            scratch.extend_from_slice(b"warm").unwrap();
            scratch.expand(MIN_CAPACITY * 4).unwrap();
            scratch.capacity()
        };
        let scratch = ByteScratch::try_acquire().unwrap();
        // The returned buffer kept its grown capacity but lost its contents.
        assert_eq!(scratch.capacity(), first_capacity);
        assert!(scratch.is_empty());
    }

    #[test]
    fn pool_depth_is_bounded() {
        let mut held = Vec::new();
        loop {
            match ByteScratch::try_acquire() {
                Ok(scratch) => held.push(scratch),
                Err(Error::ResourceExhausted { resource, .. }) => {
                    assert_eq!(resource, "scratch pool");
                    break;
                }
                Err(other) => panic!("unexpected error: {other:?}"),
            }
            assert!(held.len() <= 6, "pool never stopped handing out buffers");
        }
        drop(held);
        assert!(ByteScratch::try_acquire().is_ok());
    }

    #[test]
    fn zero_sized_elements() {
        let mut buffer = ScratchBuffer::<()>::new();
        for _ in 0..1000 {
            buffer.push(()).unwrap();
        }
        assert_eq!(buffer.len(), 1000);
    }
}
