use std::fmt;
use std::sync::atomic::{fence, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam::queue::SegQueue;
use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace};

use crate::config::{ExhaustionPolicy, PoolConfig};
use crate::error::{Error, Result};
use crate::holder::BufferHolder;
use crate::order::ByteOrder;

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

// ── Pooled buffer ──────────────────────────────────────────────────────────

/// Fixed-capacity block of memory owned by a [`BufferPool`].
///
/// Cursor semantics follow a classic byte buffer: `position` is where the
/// next write lands, `limit` bounds what readers may see. A buffer is only
/// reachable through a [`BufferHolder`] while checked out, and it is not
/// `Clone`, so two live handles can never alias the same memory.
pub struct PooledBuffer {
    data: Box<[u8]>,
    order: ByteOrder,
    id: u64,
    pool_id: u64,
    position: usize,
    limit: usize,
    payload_len: usize,
}

impl PooledBuffer {
    fn new(capacity: usize, order: ByteOrder, id: u64, pool_id: u64) -> Self {
        Self {
            data: vec![0u8; capacity].into_boxed_slice(),
            order,
            id,
            pool_id,
            position: 0,
            limit: capacity,
            payload_len: 0,
        }
    }

    /// Identity of this buffer within its pool; stable across reuse.
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Byte order this buffer was allocated for.
    #[inline]
    pub fn order(&self) -> ByteOrder {
        self.order
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    #[inline]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Bytes written by the last decode, excluding padding.
    #[inline]
    pub fn payload_len(&self) -> usize {
        self.payload_len
    }

    /// Reset the write position to the start and open the whole capacity.
    #[inline]
    pub fn clear(&mut self) {
        self.position = 0;
        self.limit = self.data.len();
        self.payload_len = 0;
    }

    /// Writable region between the current position and the limit.
    #[inline]
    pub fn remaining_mut(&mut self) -> &mut [u8] {
        &mut self.data[self.position..self.limit]
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.limit - self.position
    }

    /// Move the write position forward after filling `remaining_mut()`.
    #[inline]
    pub fn advance(&mut self, n: usize) -> Result<()> {
        if n > self.remaining() {
            return Err(Error::OutOfBounds {
                offset: self.position,
                len: n,
                limit: self.limit,
            });
        }
        self.position += n;
        Ok(())
    }

    /// Copy `src` at the write position.
    pub fn put_slice(&mut self, src: &[u8]) -> Result<()> {
        if src.len() > self.remaining() {
            return Err(Error::OutOfBounds {
                offset: self.position,
                len: src.len(),
                limit: self.limit,
            });
        }
        self.remaining_mut()[..src.len()].copy_from_slice(src);
        self.position += src.len();
        Ok(())
    }

    /// Finish a decode: everything written so far becomes the payload and the
    /// readable range is widened to the full capacity, not just the payload.
    /// Fixed-width readers rely on reading a few bytes past the last value.
    pub fn seal_full_capacity(&mut self, zero_fill_padding: bool) {
        self.payload_len = self.position;
        if zero_fill_padding {
            self.data[self.payload_len..].fill(0);
        }
        self.position = 0;
        self.limit = self.data.len();
    }

    /// Readable bytes, `[0, limit)`.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.limit]
    }

    /// Decoded payload, `[0, payload_len)`.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.data[..self.payload_len]
    }

    #[inline]
    fn array_at<const N: usize>(&self, offset: usize) -> Result<[u8; N]> {
        let end = offset.checked_add(N).filter(|&end| end <= self.limit);
        match end {
            Some(end) => {
                let mut out = [0u8; N];
                out.copy_from_slice(&self.data[offset..end]);
                Ok(out)
            }
            None => Err(Error::OutOfBounds {
                offset,
                len: N,
                limit: self.limit,
            }),
        }
    }

    pub fn get_u8(&self, offset: usize) -> Result<u8> {
        Ok(self.array_at::<1>(offset)?[0])
    }

    pub fn get_u16(&self, offset: usize) -> Result<u16> {
        Ok(self.order.u16_from(self.array_at(offset)?))
    }

    pub fn get_u32(&self, offset: usize) -> Result<u32> {
        Ok(self.order.u32_from(self.array_at(offset)?))
    }

    pub fn get_i32(&self, offset: usize) -> Result<i32> {
        self.get_u32(offset).map(|v| v as i32)
    }

    pub fn get_u64(&self, offset: usize) -> Result<u64> {
        Ok(self.order.u64_from(self.array_at(offset)?))
    }

    pub fn get_i64(&self, offset: usize) -> Result<i64> {
        self.get_u64(offset).map(|v| v as i64)
    }

    pub fn get_f64(&self, offset: usize) -> Result<f64> {
        self.get_u64(offset).map(f64::from_bits)
    }
}

impl fmt::Debug for PooledBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledBuffer")
            .field("id", &self.id)
            .field("order", &self.order)
            .field("capacity", &self.data.len())
            .field("position", &self.position)
            .field("limit", &self.limit)
            .field("payload_len", &self.payload_len)
            .finish()
    }
}

// ── Pool ───────────────────────────────────────────────────────────────────

/// Point-in-time counters for one byte-order partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub order: ByteOrder,
    /// Buffers ever allocated and still owned by the pool.
    pub allocated: usize,
    /// Buffers currently checked out through a handle.
    pub outstanding: usize,
    /// Buffers sitting in the free list.
    pub free: usize,
}

/// Free list and counters for buffers of a single byte order.
struct Partition {
    order: ByteOrder,
    // Unbounded queue; `allocated` is what enforces the per-order bound.
    free: SegQueue<PooledBuffer>,
    allocated: AtomicUsize,
    outstanding: AtomicUsize,
    waiters: AtomicUsize,
    // Only taken by threads that must park on exhaustion, and by releasers
    // when someone is parked. The hot path never touches it.
    lock: Mutex<()>,
    available: Condvar,
}

impl Partition {
    fn new(order: ByteOrder) -> Self {
        Self {
            order,
            free: SegQueue::new(),
            allocated: AtomicUsize::new(0),
            outstanding: AtomicUsize::new(0),
            waiters: AtomicUsize::new(0),
            lock: Mutex::new(()),
            available: Condvar::new(),
        }
    }
}

/// Process-wide pool of decoded-block buffers, partitioned by byte order.
///
/// Every buffer has the configured `block_size` capacity. Each partition
/// grows lazily up to `max_buffers_per_order`; after that, acquisition either
/// parks or fails according to [`ExhaustionPolicy`]. Partitions are fully
/// independent, so big-endian and little-endian readers never contend.
pub struct BufferPool {
    id: u64,
    config: PoolConfig,
    partitions: [Partition; 2],
    next_buffer_id: AtomicU64,
}

impl BufferPool {
    pub fn new(config: PoolConfig) -> Result<Arc<Self>> {
        config.validate()?;
        let max = config.max_buffers_per_order;
        let pool = BufferPool {
            id: NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed),
            partitions: [
                Partition::new(ByteOrder::Big),
                Partition::new(ByteOrder::Little),
            ],
            next_buffer_id: AtomicU64::new(0),
            config,
        };
        for part in &pool.partitions {
            for _ in 0..pool.config.initial_buffers_per_order {
                part.allocated.fetch_add(1, Ordering::Relaxed);
                part.free.push(pool.allocate(part.order));
            }
        }
        debug!(
            pool_id = pool.id,
            block_size = pool.config.block_size,
            max_buffers_per_order = max,
            initial = pool.config.initial_buffers_per_order,
            policy = ?pool.config.exhaustion_policy,
            "buffer pool created"
        );
        Ok(Arc::new(pool))
    }

    #[inline]
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.config.block_size
    }

    #[inline]
    fn partition(&self, order: ByteOrder) -> &Partition {
        &self.partitions[order.index()]
    }

    fn allocate(&self, order: ByteOrder) -> PooledBuffer {
        let id = self.next_buffer_id.fetch_add(1, Ordering::Relaxed);
        PooledBuffer::new(self.config.block_size, order, id, self.id)
    }

    /// Acquire a buffer for `order`, applying the configured exhaustion policy.
    pub fn acquire(self: &Arc<Self>, order: ByteOrder) -> Result<BufferHolder> {
        let buf = match self.config.exhaustion_policy {
            ExhaustionPolicy::Fail => self.take(order).ok_or(Error::PoolExhausted {
                order,
                max: self.config.max_buffers_per_order,
            })?,
            ExhaustionPolicy::Block => self.take_blocking(order),
        };
        Ok(BufferHolder::new(Arc::clone(self), buf))
    }

    /// Acquire without ever parking, regardless of policy.
    pub fn try_acquire(self: &Arc<Self>, order: ByteOrder) -> Option<BufferHolder> {
        self.take(order)
            .map(|buf| BufferHolder::new(Arc::clone(self), buf))
    }

    /// Pop a free buffer, or grow the partition while under its bound.
    fn take(&self, order: ByteOrder) -> Option<PooledBuffer> {
        let part = self.partition(order);
        if let Some(mut buf) = part.free.pop() {
            debug_assert_eq!(buf.order, order);
            buf.clear();
            part.outstanding.fetch_add(1, Ordering::AcqRel);
            return Some(buf);
        }
        let max = self.config.max_buffers_per_order;
        let mut allocated = part.allocated.load(Ordering::Acquire);
        while allocated < max {
            match part.allocated.compare_exchange_weak(
                allocated,
                allocated + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    let buf = self.allocate(order);
                    part.outstanding.fetch_add(1, Ordering::AcqRel);
                    debug!(
                        pool_id = self.id,
                        %order,
                        buffer_id = buf.id,
                        allocated = allocated + 1,
                        "allocated pooled buffer"
                    );
                    return Some(buf);
                }
                Err(current) => allocated = current,
            }
        }
        None
    }

    fn take_blocking(&self, order: ByteOrder) -> PooledBuffer {
        if let Some(buf) = self.take(order) {
            return buf;
        }
        let part = self.partition(order);
        let mut guard = part.lock.lock();
        part.waiters.fetch_add(1, Ordering::SeqCst);
        fence(Ordering::SeqCst);
        let buf = loop {
            if let Some(buf) = self.take(order) {
                break buf;
            }
            trace!(pool_id = self.id, %order, "buffer pool exhausted, waiting");
            part.available.wait(&mut guard);
        };
        part.waiters.fetch_sub(1, Ordering::SeqCst);
        buf
    }

    /// Put a checked-out buffer back on the free list of its own order.
    pub(crate) fn recycle(&self, mut buf: PooledBuffer) {
        debug_assert_eq!(buf.pool_id, self.id);
        let part = self.partition(buf.order);
        buf.clear();
        let prev = part.outstanding.fetch_sub(1, Ordering::AcqRel);
        assert!(
            prev > 0,
            "buffer {} released to {} partition with no outstanding buffers",
            buf.id,
            part.order
        );
        part.free.push(buf);
        fence(Ordering::SeqCst);
        if part.waiters.load(Ordering::SeqCst) > 0 {
            let _guard = part.lock.lock();
            part.available.notify_one();
        }
    }

    pub fn stats(&self, order: ByteOrder) -> PoolStats {
        let part = self.partition(order);
        PoolStats {
            order,
            allocated: part.allocated.load(Ordering::Acquire),
            outstanding: part.outstanding.load(Ordering::Acquire),
            free: part.free.len(),
        }
    }

    /// Outstanding buffers summed over both byte orders.
    pub fn outstanding(&self) -> usize {
        ByteOrder::ALL
            .iter()
            .map(|&o| self.stats(o).outstanding)
            .sum()
    }
}

impl fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferPool")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("big", &self.stats(ByteOrder::Big))
            .field("little", &self.stats(ByteOrder::Little))
            .finish()
    }
}
