use std::fmt;
use std::io;

/// Possible errors from this crate.
///
/// Cancellation is not an error. An aborted transfer resolves to `Ok(None)`.
#[derive(Debug)]
pub enum Error {
    /// A user/usage problem such as combining a raw body with form fields, or
    /// writing more bytes than a declared length.
    User(String),
    /// A wrapped std::io::Error from the sink, source or a temporary file.
    Io(io::Error),
    /// The request target could not be parsed.
    InvalidUri(http::uri::InvalidUri),
    /// A charset label that doesn't name a known encoding.
    UnsupportedCharset(String),
    /// Http errors from the `http` crate.
    Http(http::Error),
    /// Encoding an in-memory image failed.
    Image(image::ImageError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::User(v) => write!(f, "{}", v),
            Error::Io(v) => fmt::Display::fmt(v, f),
            Error::InvalidUri(v) => write!(f, "invalid uri: {}", v),
            Error::UnsupportedCharset(v) => write!(f, "unsupported charset: {}", v),
            Error::Http(v) => write!(f, "http api: {}", v),
            Error::Image(v) => write!(f, "image encoding: {}", v),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(v) => Some(v),
            Error::InvalidUri(v) => Some(v),
            Error::Http(v) => Some(v),
            Error::Image(v) => Some(v),
            Error::User(_) | Error::UnsupportedCharset(_) => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<http::uri::InvalidUri> for Error {
    fn from(e: http::uri::InvalidUri) -> Self {
        Error::InvalidUri(e)
    }
}

impl From<http::Error> for Error {
    fn from(e: http::Error) -> Self {
        Error::Http(e)
    }
}

impl From<http::header::InvalidHeaderName> for Error {
    fn from(e: http::header::InvalidHeaderName) -> Self {
        Error::Http(e.into())
    }
}

impl From<http::header::InvalidHeaderValue> for Error {
    fn from(e: http::header::InvalidHeaderValue) -> Self {
        Error::Http(e.into())
    }
}

impl From<image::ImageError> for Error {
    fn from(e: image::ImageError) -> Self {
        Error::Image(e)
    }
}
