#![warn(missing_debug_implementations)]
#![warn(clippy::all)]

//! HTTP request body encoding, transfer strategy and response buffering.
//!
//! This library sits between a logical request description (method, target,
//! headers, form fields, file/binary parts or a raw body) and some unnamed
//! connection that speaks HTTP on the wire. It decides *how* the body is
//! serialized and transmitted, reports progress, allows cooperative
//! cancellation, and on the response side decides whether to hold the payload
//! in memory or spool it to disk.
//!
//! ## In scope
//!
//! * Estimating the body size over heterogeneous data sources.
//! * Choosing between in-memory, `content-length` streaming, chunked streaming,
//!   or spooling to a temp file to learn the size.
//! * `application/x-www-form-urlencoded`, `text/plain` and `multipart/form-data`
//!   encoding.
//! * `Content-Type` character sets.
//! * `Content-Encoding: gzip` for responses.
//!
//! ## Out of scope
//!
//! Everything about the connection itself. DNS, TCP, TLS, redirects, proxies
//! and the HTTP/1 wire framing are handled by the [`Connection`] implementation
//! handed to [`send`]. Every operation is performed once, there is no retry.
//!
//! # Layout and API
//!
//! A [`Request`] is assembled by the caller and passed to [`send`] together with
//! a connection. The body goes out through [`TransferPlan`], the response comes
//! back as a [`Response`] that can be read lazily or buffered.
//!
//! [`TransferTask`] wraps the whole round trip in a single future with a
//! cancel handle.
//!
//! Like the rest of the library, [`send`] is runtime agnostic. All I/O goes
//! through the `futures-io` traits.
//!
//! [`Connection`]: trait.Connection.html
//! [`send`]: fn.send.html
//! [`Request`]: struct.Request.html
//! [`TransferPlan`]: enum.TransferPlan.html
//! [`Response`]: struct.Response.html
//! [`TransferTask`]: struct.TransferTask.html

#[macro_use]
extern crate log;

mod abort;
mod charset;
mod connection;
mod encoder;
mod error;
mod estimate;
mod limit;
mod multipart;
mod part;
mod plan;
mod progress;
mod request;
mod response;
mod settings;
mod task;
mod transfer;

pub(crate) use futures_io::{AsyncRead, AsyncWrite};

pub use abort::{AbortRead, AbortSignal, AbortWrite};
pub use charset::{parse_header_params, split_content_type, Charset};
pub use connection::{Connection, ResponseHead};
pub use error::Error;
pub use estimate::estimate_content_length;
pub use multipart::MultipartEnvelope;
pub use part::{DynamicPart, ImagePart, Part, PartSource};
pub use plan::TransferPlan;
pub use progress::{Listener, ProgressListener, ProgressRead, ProgressWrite};
pub use request::{FormMap, Request};
pub use response::Response;
pub use settings::{
    TransferSettings, BUFFER_SIZE, DEFAULT_JPEG_QUALITY, MEMORY_BODY_LIMIT, RESPONSE_MEMORY_LIMIT,
};
pub use task::TransferTask;
pub use transfer::send;

/// Mime types used for defaults.
pub mod content_type {
    pub const FORM_URL_ENCODED: &str = "application/x-www-form-urlencoded";
    pub const MULTIPART_FORM_DATA: &str = "multipart/form-data";
    pub const JSON: &str = "application/json";
    pub const TEXT_PLAIN: &str = "text/plain";
    pub const OCTET_STREAM: &str = "application/octet-stream";
    pub const IMAGE_JPEG: &str = "image/jpeg";
    pub const IMAGE_PNG: &str = "image/png";
}
