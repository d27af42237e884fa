#![allow(dead_code)]

use futures_io::AsyncWrite;
use futures_util::io::Cursor;
use hreq_transfer::{AbortSignal, Connection, ProgressListener, ResponseHead};
use http::{HeaderMap, Method, StatusCode, Uri};
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex, Once};
use std::task::{Context, Poll};

pub fn setup_logger() {
    static START: Once = Once::new();
    START.call_once(|| {
        let test_log = std::env::var("TEST_LOG")
            .map(|x| x != "0" && x.to_lowercase() != "false")
            .unwrap_or(false);
        let level = if test_log {
            log::LevelFilter::Trace
        } else {
            log::LevelFilter::Info
        };
        pretty_env_logger::formatted_builder()
            .filter_level(log::LevelFilter::Warn)
            .filter_module("hreq_transfer", level)
            .target(env_logger::Target::Stdout)
            .init();
    });
}

/// What the transfer did to a `MockConnection`.
#[derive(Debug, Default)]
pub struct Recorded {
    pub target: Option<(Method, Uri)>,
    pub headers: Vec<(String, String)>,
    pub content_length: Option<u64>,
    pub chunked: Option<usize>,
    pub fixed_length: Option<u64>,
    pub output_opened: bool,
    pub output_closed: bool,
    pub output: Vec<u8>,
    pub input_opened: usize,
    pub disconnected: bool,
}

/// Shared view of the recording, kept by the test after the connection is
/// handed to the transfer.
#[derive(Debug, Clone, Default)]
pub struct Handle(Arc<Mutex<Recorded>>);

impl Handle {
    pub fn with<T>(&self, f: impl FnOnce(&Recorded) -> T) -> T {
        let lock = self.0.lock().unwrap();
        f(&*lock)
    }

    pub fn output(&self) -> Vec<u8> {
        self.with(|r| r.output.clone())
    }

    pub fn output_str(&self) -> String {
        String::from_utf8(self.output()).unwrap()
    }

    pub fn header(&self, name: &str) -> Option<String> {
        self.with(|r| {
            r.headers
                .iter()
                .find(|(n, _)| n.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.clone())
        })
    }

    pub fn content_length(&self) -> Option<u64> {
        self.with(|r| r.content_length)
    }

    pub fn chunked(&self) -> Option<usize> {
        self.with(|r| r.chunked)
    }

    pub fn fixed_length(&self) -> Option<u64> {
        self.with(|r| r.fixed_length)
    }

    pub fn output_opened(&self) -> bool {
        self.with(|r| r.output_opened)
    }

    pub fn output_closed(&self) -> bool {
        self.with(|r| r.output_closed)
    }

    pub fn disconnected(&self) -> bool {
        self.with(|r| r.disconnected)
    }

    pub fn target(&self) -> Option<(Method, Uri)> {
        self.with(|r| r.target.clone())
    }
}

/// In-memory connection answering with a canned response.
#[derive(Debug)]
pub struct MockConnection {
    rec: Handle,
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl MockConnection {
    pub fn new(status: u16, headers: &[(&str, &str)], body: &[u8]) -> (Self, Handle) {
        let mut map = HeaderMap::new();
        for (n, v) in headers {
            let name: http::header::HeaderName = n.parse().unwrap();
            map.append(name, v.parse().unwrap());
        }

        let rec = Handle::default();

        let conn = MockConnection {
            rec: rec.clone(),
            status: StatusCode::from_u16(status).unwrap(),
            headers: map,
            body: body.to_vec(),
        };

        (conn, rec)
    }

    /// `200 OK` with `content-length: 2` and body `OK`.
    pub fn ok() -> (Self, Handle) {
        MockConnection::new(200, &[("content-length", "2")], b"OK")
    }
}

impl Connection for MockConnection {
    type Output = MockOutput;
    type Input = Cursor<Vec<u8>>;

    fn set_request_target(&mut self, method: &Method, uri: &Uri) {
        self.rec.0.lock().unwrap().target = Some((method.clone(), uri.clone()));
    }

    fn set_request_header(&mut self, name: &str, value: &str) {
        let mut lock = self.rec.0.lock().unwrap();
        lock.headers.push((name.to_string(), value.to_string()));
    }

    fn set_content_length(&mut self, length: u64) {
        self.rec.0.lock().unwrap().content_length = Some(length);
    }

    fn enable_chunked_mode(&mut self, chunk_size: usize) {
        self.rec.0.lock().unwrap().chunked = Some(chunk_size);
    }

    fn enable_fixed_length_mode(&mut self, length: u64) {
        self.rec.0.lock().unwrap().fixed_length = Some(length);
    }

    fn open_output(&mut self) -> io::Result<Self::Output> {
        self.rec.0.lock().unwrap().output_opened = true;
        Ok(MockOutput(self.rec.clone()))
    }

    fn poll_response_head(&mut self, _cx: &mut Context<'_>) -> Poll<io::Result<ResponseHead>> {
        let head = ResponseHead::new(self.status, "OK", self.headers.clone());
        Ok(head).into()
    }

    fn open_input(&mut self) -> io::Result<Self::Input> {
        self.rec.0.lock().unwrap().input_opened += 1;
        Ok(Cursor::new(self.body.clone()))
    }

    fn disconnect(&mut self) {
        self.rec.0.lock().unwrap().disconnected = true;
    }
}

#[derive(Debug)]
pub struct MockOutput(Handle);

impl AsyncWrite for MockOutput {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let mut lock = (self.0).0.lock().unwrap();
        if lock.output_closed {
            return Err(io::Error::new(io::ErrorKind::Other, "write after close")).into();
        }
        lock.output.extend_from_slice(buf);
        Ok(buf.len()).into()
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Ok(()).into()
    }

    fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        (self.0).0.lock().unwrap().output_closed = true;
        Ok(()).into()
    }
}

/// Listener recording every callback.
#[derive(Debug, Default)]
pub struct Recording {
    pub request: Mutex<Vec<(u64, Option<u64>)>>,
    pub response: Mutex<Vec<(u64, Option<u64>)>>,
}

impl Recording {
    pub fn request(&self) -> Vec<(u64, Option<u64>)> {
        self.request.lock().unwrap().clone()
    }

    pub fn response(&self) -> Vec<(u64, Option<u64>)> {
        self.response.lock().unwrap().clone()
    }
}

impl ProgressListener for Recording {
    fn on_request_progress(&self, sent: u64, total: Option<u64>) {
        self.request.lock().unwrap().push((sent, total));
    }

    fn on_response_progress(&self, received: u64, total: Option<u64>) {
        self.response.lock().unwrap().push((received, total));
    }
}

/// Listener that sets an abort signal once `after` request bytes are sent.
#[derive(Debug)]
pub struct AbortAfter {
    pub abort: AbortSignal,
    pub after: u64,
}

impl ProgressListener for AbortAfter {
    fn on_request_progress(&self, sent: u64, _total: Option<u64>) {
        if sent >= self.after {
            self.abort.abort();
        }
    }

    fn on_response_progress(&self, received: u64, _total: Option<u64>) {
        if received >= self.after {
            self.abort.abort();
        }
    }
}

/// `len` bytes of a repeating pattern.
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}
