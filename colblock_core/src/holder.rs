use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use crate::pool::{BufferPool, PooledBuffer};

/// Exclusive, scoped ownership of one [`PooledBuffer`].
///
/// The buffer goes back to its pool exactly once: either through
/// [`release`](BufferHolder::release) or when the holder is dropped on any
/// other exit path (early `?` return, panic unwind). `release` consumes the
/// holder, so using a handle after releasing it, or releasing it twice,
/// does not compile. There is no way to take the buffer out of a holder.
pub struct BufferHolder {
    pool: Arc<BufferPool>,
    // `None` only inside `drop`.
    buf: Option<PooledBuffer>,
}

impl BufferHolder {
    #[inline]
    pub(crate) fn new(pool: Arc<BufferPool>, buf: PooledBuffer) -> Self {
        Self {
            pool,
            buf: Some(buf),
        }
    }

    #[inline]
    pub fn get(&self) -> &PooledBuffer {
        match &self.buf {
            Some(buf) => buf,
            None => unreachable!("buffer holder used during drop"),
        }
    }

    #[inline]
    pub fn get_mut(&mut self) -> &mut PooledBuffer {
        match &mut self.buf {
            Some(buf) => buf,
            None => unreachable!("buffer holder used during drop"),
        }
    }

    /// Return the buffer to the pool.
    #[inline]
    pub fn release(self) {
        drop(self)
    }

    /// Pool this buffer returns to.
    #[inline]
    pub fn pool(&self) -> &Arc<BufferPool> {
        &self.pool
    }
}

impl Deref for BufferHolder {
    type Target = PooledBuffer;

    #[inline]
    fn deref(&self) -> &PooledBuffer {
        self.get()
    }
}

impl Drop for BufferHolder {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            self.pool.recycle(buf);
        }
    }
}

impl fmt::Debug for BufferHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BufferHolder").field(self.get()).finish()
    }
}
