use crate::progress::Listener;
use crate::{send, AbortSignal, Connection, Error, Request, Response};
use futures_util::future::{BoxFuture, FutureExt};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// A whole round trip as one future: send the request, then buffer the
/// response so it stays readable after the connection is released.
///
/// Resolves once, to `Ok(None)` if cancelled. The task is runtime agnostic, run
/// it by awaiting it or by handing it to any executor.
///
/// ```no_run
/// # use hreq_transfer::{Connection, Request, TransferTask};
/// # async fn run<C: Connection>(conn: C) -> Result<(), hreq_transfer::Error> {
/// let req = Request::new(http::Method::GET, "https://example.com/")?;
///
/// let task = TransferTask::new(req, conn, None);
/// let cancel = task.abort_signal();
///
/// // from anywhere, i.e. another thread
/// cancel.abort();
///
/// assert!(task.await?.is_none());
/// # Ok(()) }
/// ```
pub struct TransferTask<C: Connection> {
    fut: BoxFuture<'static, Result<Option<Response<C>>, Error>>,
    abort: AbortSignal,
}

impl<C: Connection> TransferTask<C> {
    pub fn new(req: Request, conn: C, listener: Option<Listener>) -> Self {
        TransferTask::with_abort(req, conn, listener, AbortSignal::new())
    }

    /// Task cancelled by an existing signal, shared with other tasks or
    /// transfers.
    pub fn with_abort(
        mut req: Request,
        conn: C,
        listener: Option<Listener>,
        abort: AbortSignal,
    ) -> Self {
        let task_abort = abort.clone();

        let fut = async move {
            let res = send(&mut req, conn, listener.clone(), task_abort.clone()).await?;

            let mut res = match res {
                Some(v) => v,
                None => return Ok(None),
            };

            if let Err(e) = res.buffer(listener).await {
                if task_abort.is_aborted() {
                    debug!("Aborted while buffering response");
                    res.dispose();
                    return Ok(None);
                }
                return Err(e);
            }

            Ok(Some(res))
        }
        .boxed();

        TransferTask { fut, abort }
    }

    /// Stop the transfer at the next I/O boundary.
    pub fn cancel(&self) {
        self.abort.abort();
    }

    pub fn is_cancelled(&self) -> bool {
        self.abort.is_aborted()
    }

    /// Signal that cancels this task.
    pub fn abort_signal(&self) -> AbortSignal {
        self.abort.clone()
    }
}

impl<C: Connection> Future for TransferTask<C> {
    type Output = Result<Option<Response<C>>, Error>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.get_mut().fut.as_mut().poll(cx)
    }
}

impl<C: Connection> fmt::Debug for TransferTask<C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "TransferTask {{ cancelled: {} }}", self.is_cancelled())
    }
}
