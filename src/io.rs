use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::mutex::Mutex;
use embedded_io_async::Write;

/// Hands several writers the same byte stream. The lock is held for one
/// write call at a time, so a chunk from one writer is never split by
/// another; whole messages from different writers may still interleave.
pub struct SharedWriter<'a, M: RawMutex, W: Write> {
    inner: &'a Mutex<M, W>,
}

impl<'a, M: RawMutex, W: Write> SharedWriter<'a, M, W> {
    pub fn new(inner: &'a Mutex<M, W>) -> Self {
        Self { inner }
    }
}

impl<'a, M: RawMutex, W: Write> Copy for SharedWriter<'a, M, W> {}
impl<'a, M: RawMutex, W: Write> Clone for SharedWriter<'a, M, W> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, M: RawMutex, W: Write> embedded_io_async::ErrorType for SharedWriter<'a, M, W> {
    type Error = W::Error;
}

impl<'a, M: RawMutex, W: Write> Write for SharedWriter<'a, M, W> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.inner.lock().await.write(buf).await
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        self.inner.lock().await.flush().await
    }

    async fn write_all(&mut self, buf: &[u8]) -> Result<(), Self::Error> {
        self.inner.lock().await.write_all(buf).await
    }
}
