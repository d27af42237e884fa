use crate::charset::{parse_header_params, split_content_type};
use crate::connection::ResponseHead;
use crate::progress::{Listener, ProgressRead};
use crate::settings::{BUFFER_SIZE, RESPONSE_MEMORY_LIMIT};
use crate::{AbortRead, AbortSignal, AsyncRead, Charset, Connection, Error, TransferSettings};
use async_compression::futures::bufread::GzipDecoder;
use futures_util::io::{AllowStdIo, AsyncReadExt, AsyncWriteExt, BufReader, Cursor};
use http::header::{CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderMap, StatusCode};
use std::fmt;
use std::fs::{self, File};
use std::io;
use std::str::FromStr;
use tempfile::NamedTempFile;

/// Reader over a response body.
pub type BodyReader = Box<dyn AsyncRead + Unpin + Send>;

enum BodyState {
    /// Body is still on the connection.
    Unbuffered,
    Memory(Vec<u8>),
    Disk(NamedTempFile),
}

/// A received response.
///
/// The body starts out on the connection and can be read lazily with
/// [`reader`], or pulled off the connection with [`buffer`] into memory (small
/// bodies of known length) or a temp file. Buffering releases the connection.
///
/// Any temp file is deleted when the response is dropped or disposed.
///
/// [`reader`]: #method.reader
/// [`buffer`]: #method.buffer
pub struct Response<C: Connection> {
    head: ResponseHead,
    charset: Charset,
    original_charset: Option<String>,
    conn: Option<C>,
    state: BodyState,
    auto_decompress: bool,
    abort: AbortSignal,
}

impl<C: Connection> Response<C> {
    pub(crate) fn new(
        head: ResponseHead,
        conn: C,
        settings: &TransferSettings,
        abort: AbortSignal,
    ) -> Self {
        let original_charset = head
            .headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| split_content_type(v).1);

        let charset = match &original_charset {
            Some(label) => Charset::for_label(label).unwrap_or_else(|_| {
                warn!("Unknown response charset {:?}, fall back to UTF-8", label);
                Charset::UTF_8
            }),
            None => Charset::UTF_8,
        };

        Response {
            head,
            charset,
            original_charset,
            conn: Some(conn),
            state: BodyState::Unbuffered,
            auto_decompress: settings.auto_decompress(),
            abort,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.head.status
    }

    /// Reason phrase of the status line.
    pub fn message(&self) -> &str {
        &self.head.message
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.head.headers
    }

    /// First value of a header. Values that aren't visible ASCII are ignored.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// All values of a header, in received order.
    pub fn headers_all(&self, name: &str) -> Vec<&str> {
        self.head
            .headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect()
    }

    /// First value of a header, parsed.
    pub fn header_as<T: FromStr>(&self, name: &str) -> Option<T> {
        self.header(name).and_then(|v| v.trim().parse().ok())
    }

    /// Parameters of a header, i.e. `charset` in `text/html; charset=utf-8`.
    pub fn header_params(&self, name: &str) -> Vec<(String, String)> {
        self.header(name)
            .map(parse_header_params)
            .unwrap_or_default()
    }

    /// A single parameter of a header. Parameter names are case insensitive.
    pub fn header_param(&self, name: &str, param: &str) -> Option<String> {
        self.header_params(name)
            .into_iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(param))
            .map(|(_, v)| v)
    }

    /// Declared `content-length`, if any.
    pub fn content_length(&self) -> Option<u64> {
        self.header_as(CONTENT_LENGTH.as_str())
    }

    /// The full `content-type` header.
    pub fn content_type(&self) -> Option<&str> {
        self.header(CONTENT_TYPE.as_str())
    }

    pub fn content_encoding(&self) -> Option<&str> {
        self.header(CONTENT_ENCODING.as_str())
    }

    /// Charset used for `text()`. The declared one, or UTF-8.
    pub fn charset(&self) -> Charset {
        self.charset
    }

    /// The charset label as declared by the server, even when unknown to us.
    pub fn original_charset(&self) -> Option<&str> {
        self.original_charset.as_deref()
    }

    /// 200, 201, 203, 204, 205 or 206.
    pub fn is_successful(&self) -> bool {
        matches!(self.head.status.as_u16(), 200 | 201 | 203 | 204 | 205 | 206)
    }

    pub fn is_buffered(&self) -> bool {
        !matches!(self.state, BodyState::Unbuffered)
    }

    /// Whether the body is held on disk.
    pub fn is_on_disk(&self) -> bool {
        matches!(self.state, BodyState::Disk(_))
    }

    /// Path of the temp file holding the body, if it was spooled to disk.
    pub fn temp_path(&self) -> Option<&std::path::Path> {
        match &self.state {
            BodyState::Disk(t) => Some(t.path()),
            _ => None,
        }
    }

    fn is_gzip(&self) -> bool {
        self.auto_decompress
            && self
                .content_encoding()
                .map(|e| e.trim().eq_ignore_ascii_case("gzip"))
                .unwrap_or(false)
    }

    /// Reader over the body.
    ///
    /// When buffered this reads from memory or reopens the temp file. Otherwise it
    /// reads from the connection, gunzipping if needed, and reports progress to
    /// `listener`. A response disconnected before buffering reads as empty.
    pub fn reader(&mut self, listener: Option<Listener>) -> Result<BodyReader, Error> {
        match &self.state {
            BodyState::Memory(buf) => return Ok(Box::new(Cursor::new(buf.clone()))),
            BodyState::Disk(tmp) => {
                let file = File::open(tmp.path())?;
                return Ok(Box::new(AllowStdIo::new(file)));
            }
            BodyState::Unbuffered => {}
        }

        let gzip = self.is_gzip();
        let length = self.content_length();

        let conn = match &mut self.conn {
            Some(conn) => conn,
            None => {
                debug!("Read from disconnected response");
                return Ok(Box::new(Cursor::new(vec![])));
            }
        };

        let input = AbortRead::new(conn.open_input()?, self.abort.clone());

        let reader: BodyReader = if gzip {
            trace!("Gunzip response body");
            let decoder = GzipDecoder::new(BufReader::new(input));
            Box::new(ProgressRead::new(decoder, listener, None))
        } else {
            Box::new(ProgressRead::new(input, listener, length))
        };

        Ok(reader)
    }

    /// Pull the body off the connection and release it.
    ///
    /// Bodies with a declared length up to 8 KiB are kept in memory, anything
    /// else goes to a `response-buffer*.http` temp file. A gzip body has no
    /// known length and always goes to disk. If the temp file can't be created,
    /// a body of known length falls back to memory. Does nothing if already
    /// buffered.
    ///
    /// If the abort signal is set before the body is complete, the partial body
    /// is discarded, the connection released and an `Interrupted` I/O error
    /// returned.
    pub async fn buffer(&mut self, listener: Option<Listener>) -> Result<(), Error> {
        if self.is_buffered() {
            return Ok(());
        }

        // compressed length says nothing about the inflated size
        let length = if self.is_gzip() {
            None
        } else {
            self.content_length()
        };

        let mut reader = self.reader(listener)?;

        let in_memory = length.map(|l| l <= RESPONSE_MEMORY_LIMIT).unwrap_or(false);

        let state = if in_memory {
            BodyState::Memory(read_to_memory(&mut reader, length).await?)
        } else {
            match tempfile::Builder::new()
                .prefix("response-buffer")
                .suffix(".http")
                .tempfile()
            {
                Ok(mut tmp) => {
                    spool(&mut reader, &mut tmp).await?;
                    BodyState::Disk(tmp)
                }
                Err(e) => {
                    if length.is_none() {
                        return Err(e.into());
                    }
                    warn!("Failed to create temp file, buffer in memory: {}", e);
                    BodyState::Memory(read_to_memory(&mut reader, length).await?)
                }
            }
        };

        if self.abort.is_aborted() {
            debug!("Aborted while buffering, discard partial body");
            // drops a temp file, if any
            drop(state);
            self.disconnect();
            let e = io::Error::new(io::ErrorKind::Interrupted, "Response body aborted");
            return Err(e.into());
        }

        self.state = state;

        debug!(
            "Response buffered {}",
            if self.is_on_disk() { "on disk" } else { "in memory" }
        );

        self.disconnect();

        Ok(())
    }

    /// The whole body. Buffers first if needed.
    pub async fn bytes(&mut self) -> Result<Vec<u8>, Error> {
        self.buffer(None).await?;

        let bytes = match &self.state {
            BodyState::Memory(buf) => buf.clone(),
            BodyState::Disk(tmp) => fs::read(tmp.path())?,
            BodyState::Unbuffered => vec![],
        };

        Ok(bytes)
    }

    /// The whole body decoded with the response charset, byte order mark removed.
    pub async fn text(&mut self) -> Result<String, Error> {
        let bytes = self.bytes().await?;
        Ok(self.charset.decode(&bytes).into_owned())
    }

    /// Release the connection. A response that isn't buffered yields no more
    /// body after this.
    pub fn disconnect(&mut self) {
        if let Some(mut conn) = self.conn.take() {
            trace!("Disconnect response");
            conn.disconnect();
        }
    }

    /// Release the connection and delete any temp file.
    pub fn dispose(mut self) {
        self.disconnect();
        self.state = BodyState::Unbuffered;
    }
}

async fn read_to_memory(reader: &mut BodyReader, length: Option<u64>) -> Result<Vec<u8>, Error> {
    let cap = length.unwrap_or(0).min(RESPONSE_MEMORY_LIMIT) as usize;
    let mut buf = Vec::with_capacity(cap);
    reader.read_to_end(&mut buf).await?;
    Ok(buf)
}

async fn spool(reader: &mut BodyReader, tmp: &mut NamedTempFile) -> Result<(), Error> {
    let mut out = AllowStdIo::new(tmp.as_file_mut());
    let mut buf = vec![0; BUFFER_SIZE];

    loop {
        let amount = reader.read(&mut buf[..]).await?;

        if amount == 0 {
            break;
        }

        out.write_all(&buf[..amount]).await?;
    }

    out.flush().await?;

    Ok(())
}

impl<C: Connection> Drop for Response<C> {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl<C: Connection> fmt::Debug for Response<C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let state = match &self.state {
            BodyState::Unbuffered => "Unbuffered",
            BodyState::Memory(_) => "Memory",
            BodyState::Disk(_) => "Disk",
        };
        f.debug_struct("Response")
            .field("status", &self.head.status)
            .field("headers", &self.head.headers)
            .field("charset", &self.charset)
            .field("state", &state)
            .finish()
    }
}
