use crate::{AsyncRead, AsyncWrite, Error};
use futures_util::future::poll_fn;
use http::{HeaderMap, Method, StatusCode, Uri};
use std::io;
use std::task::{Context, Poll};

/// The connection a transfer runs over.
///
/// Everything on the wire lives behind this trait: DNS, TCP, TLS, redirects,
/// and the HTTP/1 request line, status line and chunk framing. The transfer
/// only configures it, writes the body to the output and reads the body from
/// the input.
///
/// The calls come in this order, each at most once unless noted:
///
/// 1. `set_request_target`, `set_request_header` (repeated), `set_content_length`,
///    `enable_chunked_mode`, `enable_fixed_length_mode`
/// 2. `open_output` (only when there is a body to send), written and closed
/// 3. `poll_response_head` until ready
/// 4. `open_input`
/// 5. `disconnect`, which may also come at any earlier point on error or abort.
pub trait Connection: Send + 'static {
    /// Sink for the request body.
    type Output: AsyncWrite + Unpin + Send + 'static;

    /// Source of the response body.
    type Input: AsyncRead + Unpin + Send + 'static;

    /// Method and target of the request. For requests without body the form
    /// fields are already in the query.
    fn set_request_target(&mut self, method: &Method, uri: &Uri);

    /// Add a request header. Called in header insertion order, possibly several
    /// times with the same name.
    fn set_request_header(&mut self, name: &str, value: &str);

    /// Declare the exact body length.
    fn set_content_length(&mut self, length: u64);

    /// Send the body with chunked transfer encoding. A `chunk_size` of `0` means
    /// the connection's default.
    fn enable_chunked_mode(&mut self, chunk_size: usize);

    /// Stream a body of known length without internal buffering.
    fn enable_fixed_length_mode(&mut self, length: u64);

    /// Open the sink for the request body. Closing it ends the body.
    fn open_output(&mut self) -> io::Result<Self::Output>;

    /// Poll for the response status and headers.
    fn poll_response_head(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<ResponseHead>>;

    /// Open the source of the response body.
    fn open_input(&mut self) -> io::Result<Self::Input>;

    /// Release the connection. Must be safe to call more than once.
    fn disconnect(&mut self);
}

/// Status line and headers of a response.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    pub status: StatusCode,
    /// Reason phrase, i.e. `OK`.
    pub message: String,
    pub headers: HeaderMap,
}

impl ResponseHead {
    pub fn new(status: StatusCode, message: &str, headers: HeaderMap) -> Self {
        ResponseHead {
            status,
            message: message.to_string(),
            headers,
        }
    }
}

pub(crate) async fn response_head<C: Connection>(conn: &mut C) -> Result<ResponseHead, Error> {
    let head = poll_fn(|cx| conn.poll_response_head(cx)).await?;

    trace!("Response head: {} {}", head.status, head.message);

    Ok(head)
}
