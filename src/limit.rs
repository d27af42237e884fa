use crate::AsyncWrite;
use futures_util::ready;
use std::fmt;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Limit writing data by the length declared to the connection.
///
/// This is to ensure we don't write more data than "promised" by the
/// `content-length` handed to the connection before the body.
pub(crate) enum LimitWrite<W> {
    /// Chunked transfer, any amount goes.
    Unlimited(W),
    /// Limit the write by the declared `content-length`.
    ContentLength(ContentLengthWrite<W>),
}

impl<W> LimitWrite<W> {
    pub fn new(inner: W, limit: Option<u64>) -> Self {
        let ret = match limit {
            Some(limit) => LimitWrite::ContentLength(ContentLengthWrite {
                inner,
                limit,
                total: 0,
            }),
            None => LimitWrite::Unlimited(inner),
        };

        trace!("LimitWrite: {:?}", ret);

        ret
    }

    /// Check that exactly the declared amount was written. Called once after
    /// the body is done.
    pub fn finish(&self) -> io::Result<()> {
        if let LimitWrite::ContentLength(v) = self {
            if v.total < v.limit {
                let m = format!(
                    "Body data shorter than content-length: {} < {}",
                    v.total, v.limit
                );
                return Err(io::Error::new(io::ErrorKind::InvalidData, m));
            }
        }
        Ok(())
    }
}

/// Limit write by length.
pub(crate) struct ContentLengthWrite<W> {
    inner: W,
    limit: u64,
    total: u64,
}

impl<W: AsyncWrite + Unpin> ContentLengthWrite<W> {
    fn poll_write(&mut self, cx: &mut Context<'_>, data: &[u8]) -> Poll<io::Result<usize>> {
        if data.is_empty() {
            return Ok(0).into();
        }

        if self.total + data.len() as u64 > self.limit {
            let m = format!(
                "Body data longer than content-length: {} > {}",
                self.total + data.len() as u64,
                self.limit
            );
            return Err(io::Error::new(io::ErrorKind::InvalidData, m)).into();
        }

        let amount = ready!(Pin::new(&mut self.inner).poll_write(cx, data))?;

        self.total += amount as u64;

        Ok(amount).into()
    }
}

impl<W: AsyncWrite + Unpin> AsyncWrite for LimitWrite<W> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            LimitWrite::Unlimited(w) => Pin::new(w).poll_write(cx, buf),
            LimitWrite::ContentLength(v) => v.poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            LimitWrite::Unlimited(w) => Pin::new(w).poll_flush(cx),
            LimitWrite::ContentLength(v) => Pin::new(&mut v.inner).poll_flush(cx),
        }
    }

    fn poll_close(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            LimitWrite::Unlimited(w) => Pin::new(w).poll_close(cx),
            LimitWrite::ContentLength(v) => Pin::new(&mut v.inner).poll_close(cx),
        }
    }
}

impl<W> fmt::Debug for LimitWrite<W> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LimitWrite::Unlimited(_) => write!(f, "Unlimited")?,
            LimitWrite::ContentLength(l) => write!(f, "ContentLength({})", l.limit)?,
        }
        Ok(())
    }
}
