use crate::{AsyncRead, AsyncWrite};
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

/// Shared cancellation flag.
///
/// Clones share the same flag. Setting it is cooperative: every chunked read or
/// write loop polls it, so a transfer stops at the next I/O boundary, typically
/// within one 4 KiB chunk. Setting it after a transfer has completed is a no-op.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal(Arc<AtomicBool>);

impl AbortSignal {
    /// A new, unset, signal.
    pub fn new() -> Self {
        AbortSignal::default()
    }

    /// Ask the transfer(s) sharing this signal to stop.
    pub fn abort(&self) {
        trace!("Abort signal set");
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether abort has been requested.
    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Sink decorator that stops forwarding once the abort signal is set.
///
/// Writes after abort are accepted and dropped, so nothing more reaches the
/// inner sink and no error is raised. Whoever drives the transfer checks the
/// signal afterwards.
#[derive(Debug)]
pub struct AbortWrite<W> {
    inner: W,
    abort: AbortSignal,
}

impl<W> AbortWrite<W> {
    pub fn new(inner: W, abort: AbortSignal) -> Self {
        AbortWrite { inner, abort }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: AsyncWrite + Unpin> AsyncWrite for AbortWrite<W> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();

        if this.abort.is_aborted() {
            trace!("AbortWrite drop {} bytes", buf.len());
            return Ok(buf.len()).into();
        }

        Pin::new(&mut this.inner).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();

        if this.abort.is_aborted() {
            return Ok(()).into();
        }

        Pin::new(&mut this.inner).poll_flush(cx)
    }

    fn poll_close(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        // Closing is always forwarded so the underlying resource is released.
        Pin::new(&mut self.get_mut().inner).poll_close(cx)
    }
}

/// Source decorator that reports end of stream once the abort signal is set.
#[derive(Debug)]
pub struct AbortRead<R> {
    inner: R,
    abort: AbortSignal,
}

impl<R> AbortRead<R> {
    pub fn new(inner: R, abort: AbortSignal) -> Self {
        AbortRead { inner, abort }
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for AbortRead<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();

        if this.abort.is_aborted() {
            trace!("AbortRead end of stream");
            return Ok(0).into();
        }

        Pin::new(&mut this.inner).poll_read(cx, buf)
    }
}
