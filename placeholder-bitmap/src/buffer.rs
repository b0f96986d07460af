use std::{
    io::{self, Write},
    ops::Deref,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, PoisonError,
    },
};

/// Default number of released allocations kept for reuse.
pub const DEFAULT_MAX_FREE_BUFFERS: usize = 16;
/// Released allocations larger than this are freed instead of kept.
pub const MAX_RECYCLED_CAPACITY: usize = 64 * 1024;

/// Hands out byte buffers for encoded images and takes them back when they are dropped.
///
/// Released allocations are kept (up to `max_free`, each no larger than
/// [`MAX_RECYCLED_CAPACITY`]) and reused by later streams.
/// The pool tracks live buffers so callers can verify every buffer was released.
#[derive(Debug)]
pub struct ByteBufferPool {
    free: Mutex<Vec<Vec<u8>>>,
    max_free: usize,
    live_buffers: AtomicUsize,
    live_bytes: AtomicUsize,
}

impl ByteBufferPool {
    /// Creates a pool keeping at most `max_free` released allocations of up to
    /// [`MAX_RECYCLED_CAPACITY`] bytes each.
    pub fn new(max_free: usize) -> Arc<Self> {
        Arc::new(Self {
            free: Mutex::new(Vec::new()),
            max_free,
            live_buffers: AtomicUsize::new(0),
            live_bytes: AtomicUsize::new(0),
        })
    }

    /// Opens a writable stream whose contents become a [`PooledByteBuffer`].
    pub fn output_stream(self: &Arc<Self>, capacity: usize) -> PooledByteBufferOutputStream {
        let mut bytes = self.take_free().unwrap_or_default();
        bytes.reserve(capacity);
        PooledByteBufferOutputStream {
            bytes: Some(bytes),
            pool: Arc::clone(self),
        }
    }

    /// Number of [`PooledByteBuffer`]s currently alive.
    pub fn live_buffers(&self) -> usize {
        self.live_buffers.load(Ordering::Acquire)
    }

    /// Total size of the [`PooledByteBuffer`]s currently alive.
    pub fn live_bytes(&self) -> usize {
        self.live_bytes.load(Ordering::Acquire)
    }

    /// Number of allocations waiting for reuse.
    pub fn free_buffers(&self) -> usize {
        self.free.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn take_free(&self) -> Option<Vec<u8>> {
        self.free
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
    }

    fn recycle(&self, mut bytes: Vec<u8>) {
        if bytes.capacity() > MAX_RECYCLED_CAPACITY {
            log::trace!("freeing {} byte buffer instead of pooling it", bytes.capacity());
            return;
        }
        bytes.clear();
        let mut free = self.free.lock().unwrap_or_else(PoisonError::into_inner);
        if free.len() < self.max_free {
            free.push(bytes);
        }
    }
}

/// Write side of a pooled buffer.
#[derive(Debug)]
pub struct PooledByteBufferOutputStream {
    bytes: Option<Vec<u8>>,
    pool: Arc<ByteBufferPool>,
}

impl PooledByteBufferOutputStream {
    /// Bytes written so far.
    pub fn size(&self) -> usize {
        self.bytes.as_ref().map_or(0, Vec::len)
    }

    /// Freezes the written bytes into a buffer owned by the caller.
    pub fn into_byte_buffer(mut self) -> PooledByteBuffer {
        let bytes = self.bytes.take().unwrap_or_default();
        self.pool.live_buffers.fetch_add(1, Ordering::AcqRel);
        self.pool.live_bytes.fetch_add(bytes.len(), Ordering::AcqRel);
        PooledByteBuffer {
            bytes,
            pool: Arc::clone(&self.pool),
        }
    }
}

impl Write for PooledByteBufferOutputStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.bytes.as_mut() {
            Some(bytes) => {
                bytes.extend_from_slice(buf);
                Ok(buf.len())
            }
            None => Err(io::Error::new(io::ErrorKind::BrokenPipe, "stream closed")),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for PooledByteBufferOutputStream {
    fn drop(&mut self) {
        if let Some(bytes) = self.bytes.take() {
            self.pool.recycle(bytes);
        }
    }
}

/// An immutable encoded byte buffer. Dropping it releases it back to its pool.
#[derive(Debug)]
pub struct PooledByteBuffer {
    bytes: Vec<u8>,
    pool: Arc<ByteBufferPool>,
}

impl PooledByteBuffer {
    /// Length in bytes.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// The buffer contents.
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Copies bytes starting at `offset` into `out`, returning how many were copied.
    pub fn read(&self, offset: usize, out: &mut [u8]) -> usize {
        let Some(available) = self.bytes.get(offset..) else {
            return 0;
        };
        let count = available.len().min(out.len());
        out[..count].copy_from_slice(&available[..count]);
        count
    }
}

impl Deref for PooledByteBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

impl Drop for PooledByteBuffer {
    fn drop(&mut self) {
        self.pool.live_buffers.fetch_sub(1, Ordering::AcqRel);
        self.pool
            .live_bytes
            .fetch_sub(self.bytes.len(), Ordering::AcqRel);
        self.pool.recycle(std::mem::take(&mut self.bytes));
    }
}
