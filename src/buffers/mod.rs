//! Tiered, reference-counted payload buffers.
//!
//! Message payloads move through three shapes:
//!
//! 1. [`BufferPool::acquire`] hands out a uniquely-owned, writable
//!    [`PooledBuffer`] whose storage comes from one of nine fixed-capacity
//!    tiers (32 B up to 8 MiB, sized so the top tier still fits a 4K video
//!    keyframe). Requests above the top tier fall back to a direct heap
//!    allocation that is never pooled.
//! 2. [`PooledBuffer::freeze`] converts the filled buffer into a [`Payload`],
//!    an immutable, atomically reference-counted view. Cloning a `Payload`
//!    is a refcount bump, which is what makes one received message fan out
//!    to many subscribers without copying.
//! 3. When the last owner drops, the storage returns to its tier's free
//!    list. Storage whose capacity does not match a tier exactly is left to
//!    the allocator.
//!
//! Pools are internally synchronized (a mutex per tier); everything else is
//! single-owner until frozen.

use std::fmt;
use std::mem;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, OnceLock};

/// Capacity of each pool tier, smallest first.
pub const TIER_CAPACITIES: [usize; 9] = [
    32,
    512,
    4 * 1024,
    16 * 1024,
    64 * 1024,
    256 * 1024,
    1024 * 1024,
    4 * 1024 * 1024,
    8 * 1024 * 1024,
];

/// A tiered free-list pool of byte storage.
pub struct BufferPool {
    tiers: Vec<Tier>,
}

struct Tier {
    capacity: usize,
    free: Mutex<Vec<Box<[u8]>>>,
}

impl BufferPool {
    /// Creates an empty pool. Tiers fill lazily as buffers are released.
    pub fn new() -> BufferPool {
        BufferPool {
            tiers: TIER_CAPACITIES
                .iter()
                .map(|&capacity| Tier {
                    capacity,
                    free: Mutex::new(Vec::new()),
                })
                .collect(),
        }
    }

    /// The process-wide pool shared by transports that are not given their
    /// own.
    pub fn global() -> Arc<BufferPool> {
        static POOL: OnceLock<Arc<BufferPool>> = OnceLock::new();
        POOL.get_or_init(|| Arc::new(BufferPool::new())).clone()
    }

    /// Acquires a writable buffer exposing exactly `len` bytes. Storage is
    /// reused from the smallest tier that fits, or heap-allocated above the
    /// top tier.
    pub fn acquire(self: &Arc<Self>, len: usize) -> PooledBuffer {
        match self.tier_index_for(len) {
            Some(index) => {
                let tier = &self.tiers[index];
                let data = match lock_ignoring_poison(&tier.free).pop() {
                    Some(data) => data,
                    None => vec![0u8; tier.capacity].into_boxed_slice(),
                };

                PooledBuffer {
                    data,
                    len,
                    pool: Some(Arc::clone(self)),
                }
            }

            None => PooledBuffer {
                data: vec![0u8; len].into_boxed_slice(),
                len,
                pool: None,
            },
        }
    }

    fn tier_index_for(&self, len: usize) -> Option<usize> {
        self.tiers.iter().position(|tier| len <= tier.capacity)
    }

    fn release(&self, data: Box<[u8]>) {
        // Only capacities that exactly match a tier re-enter the pool;
        // anything else came from the heap fallback and stays with the
        // allocator.
        if let Some(tier) = self.tiers.iter().find(|tier| tier.capacity == data.len()) {
            lock_ignoring_poison(&tier.free).push(data);
        }
    }

    #[cfg(test)]
    fn free_count(&self, capacity: usize) -> usize {
        self.tiers
            .iter()
            .find(|tier| tier.capacity == capacity)
            .map(|tier| lock_ignoring_poison(&tier.free).len())
            .unwrap_or(0)
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        BufferPool::new()
    }
}

// A panic while holding a tier lock cannot corrupt a Vec of boxed slices.
fn lock_ignoring_poison<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// A uniquely-owned writable buffer backed by pool storage.
///
/// Reused storage retains whatever bytes the previous owner wrote, so the
/// exposed `len` region must be filled before the contents are meaningful.
pub struct PooledBuffer {
    data: Box<[u8]>,
    len: usize,
    pool: Option<Arc<BufferPool>>,
}

impl PooledBuffer {
    /// Number of bytes the buffer exposes (its tier capacity may be larger).
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when the buffer exposes no bytes.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Converts the buffer into an immutable shared [`Payload`], transferring
    /// the storage (and its eventual return to the pool) to the payload.
    pub fn freeze(mut self) -> Payload {
        Payload {
            inner: Arc::new(PayloadInner {
                data: mem::take(&mut self.data),
                len: self.len,
                pool: self.pool.take(),
            }),
        }
    }
}

impl Deref for PooledBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data[..self.len]
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.data[..self.len]
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.release(mem::take(&mut self.data));
        }
    }
}

/// An immutable, reference-counted byte payload.
///
/// Clones alias the same storage; the storage returns to its pool tier
/// exactly once, when the final clone drops.
#[derive(Clone)]
pub struct Payload {
    inner: Arc<PayloadInner>,
}

struct PayloadInner {
    data: Box<[u8]>,
    len: usize,
    pool: Option<Arc<BufferPool>>,
}

impl Payload {
    /// Wraps plain heap bytes that never touch a pool. Used for small
    /// locally-built payloads such as protocol control messages.
    pub fn from_vec(data: Vec<u8>) -> Payload {
        let data = data.into_boxed_slice();
        Payload {
            inner: Arc::new(PayloadInner {
                len: data.len(),
                data,
                pool: None,
            }),
        }
    }

    /// A zero-length payload.
    pub fn empty() -> Payload {
        Payload::from_vec(Vec::new())
    }

    /// Number of payload bytes.
    pub fn len(&self) -> usize {
        self.inner.len
    }

    /// True when the payload holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.inner.len == 0
    }
}

impl Deref for Payload {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.inner.data[..self.inner.len]
    }
}

impl AsRef<[u8]> for Payload {
    fn as_ref(&self) -> &[u8] {
        self
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Payload")
            .field("len", &self.inner.len)
            .finish()
    }
}

impl Drop for PayloadInner {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.release(mem::take(&mut self.data));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_picks_the_smallest_tier_that_fits() {
        let pool = Arc::new(BufferPool::new());

        for (requested, expected_capacity) in [
            (1, 32),
            (32, 32),
            (33, 512),
            (513, 4 * 1024),
            (5000, 16 * 1024),
            (100_000, 256 * 1024),
            (2 * 1024 * 1024, 4 * 1024 * 1024),
            (8 * 1024 * 1024, 8 * 1024 * 1024),
        ] {
            let buffer = pool.acquire(requested);
            assert_eq!(buffer.len(), requested, "Incorrect exposed length");
            assert_eq!(
                buffer.data.len(),
                expected_capacity,
                "Incorrect tier capacity for a request of {} bytes",
                requested
            );
        }
    }

    #[test]
    fn dropping_a_buffer_returns_storage_to_its_tier() {
        let pool = Arc::new(BufferPool::new());

        let buffer = pool.acquire(100);
        assert_eq!(pool.free_count(512), 0, "Tier should start empty");

        drop(buffer);
        assert_eq!(pool.free_count(512), 1, "Storage was not returned");

        let reused = pool.acquire(200);
        assert_eq!(pool.free_count(512), 0, "Storage was not reused");
        drop(reused);
    }

    #[test]
    fn storage_returns_exactly_once_after_the_last_clone_drops() {
        let pool = Arc::new(BufferPool::new());

        let mut buffer = pool.acquire(10);
        buffer.copy_from_slice(&[7; 10]);

        let payload = buffer.freeze();
        let clone1 = payload.clone();
        let clone2 = payload.clone();

        drop(payload);
        drop(clone1);
        assert_eq!(
            pool.free_count(32),
            0,
            "Storage returned while a clone was still alive"
        );

        drop(clone2);
        assert_eq!(pool.free_count(32), 1, "Storage was not returned once");
    }

    #[test]
    fn clones_alias_the_same_bytes() {
        let pool = Arc::new(BufferPool::new());

        let mut buffer = pool.acquire(4);
        buffer.copy_from_slice(&[1, 2, 3, 4]);

        let payload = buffer.freeze();
        let clone = payload.clone();

        assert_eq!(&payload[..], &[1, 2, 3, 4], "Incorrect payload bytes");
        assert_eq!(&clone[..], &[1, 2, 3, 4], "Incorrect cloned bytes");
    }

    #[test]
    fn oversized_requests_bypass_the_pool() {
        let pool = Arc::new(BufferPool::new());

        let buffer = pool.acquire(9 * 1024 * 1024);
        assert_eq!(buffer.len(), 9 * 1024 * 1024, "Incorrect exposed length");

        drop(buffer);
        for capacity in TIER_CAPACITIES {
            assert_eq!(
                pool.free_count(capacity),
                0,
                "Oversized storage entered the {} byte tier",
                capacity
            );
        }
    }

    #[test]
    fn payload_from_vec_never_touches_the_pool() {
        let payload = Payload::from_vec(vec![9, 8, 7]);

        assert_eq!(payload.len(), 3, "Incorrect length");
        assert_eq!(&payload[..], &[9, 8, 7], "Incorrect bytes");
    }

    #[test]
    fn freezing_preserves_written_bytes() {
        let pool = Arc::new(BufferPool::new());

        let mut buffer = pool.acquire(3);
        buffer[0] = 10;
        buffer[1] = 20;
        buffer[2] = 30;

        let payload = buffer.freeze();
        assert_eq!(&payload[..], &[10, 20, 30], "Incorrect frozen bytes");
    }
}
