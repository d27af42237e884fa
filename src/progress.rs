use crate::{AsyncRead, AsyncWrite};
use futures_util::ready;
use std::fmt;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// Receiver of transfer progress.
///
/// `total` is `None` when the size isn't known up front, i.e. chunked request
/// bodies, requests without body, and responses without `content-length` or
/// that are being decompressed.
///
/// Callbacks run inline on the transfer, so keep them cheap.
pub trait ProgressListener: Send + Sync {
    /// Request body bytes handed to the connection so far.
    fn on_request_progress(&self, _sent: u64, _total: Option<u64>) {}

    /// Response body bytes read so far.
    fn on_response_progress(&self, _received: u64, _total: Option<u64>) {}
}

/// Shared handle to a listener.
pub type Listener = Arc<dyn ProgressListener>;

/// Sink decorator counting bytes written and reporting request progress.
pub struct ProgressWrite<W> {
    inner: W,
    listener: Option<Listener>,
    total: Option<u64>,
    written: u64,
}

impl<W> ProgressWrite<W> {
    pub fn new(inner: W, listener: Option<Listener>, total: Option<u64>) -> Self {
        ProgressWrite {
            inner,
            listener,
            total,
            written: 0,
        }
    }

    /// Bytes passed through so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: AsyncWrite + Unpin> AsyncWrite for ProgressWrite<W> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();

        let amount = ready!(Pin::new(&mut this.inner).poll_write(cx, buf))?;

        this.written += amount as u64;

        if let Some(listener) = &this.listener {
            listener.on_request_progress(this.written, this.total);
        }

        Ok(amount).into()
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_close(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_close(cx)
    }
}

/// Source decorator counting bytes read and reporting response progress.
pub struct ProgressRead<R> {
    inner: R,
    listener: Option<Listener>,
    total: Option<u64>,
    read: u64,
}

impl<R> ProgressRead<R> {
    pub fn new(inner: R, listener: Option<Listener>, total: Option<u64>) -> Self {
        ProgressRead {
            inner,
            listener,
            total,
            read: 0,
        }
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for ProgressRead<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();

        let amount = ready!(Pin::new(&mut this.inner).poll_read(cx, buf))?;

        this.read += amount as u64;

        if let Some(listener) = &this.listener {
            listener.on_response_progress(this.read, this.total);
        }

        Ok(amount).into()
    }
}

impl<W> fmt::Debug for ProgressWrite<W> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ProgressWrite({}/{:?})", self.written, self.total)
    }
}

impl<R> fmt::Debug for ProgressRead<R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ProgressRead({}/{:?})", self.read, self.total)
    }
}
