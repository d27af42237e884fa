//! Data sources for request bodies, form fields and multipart parts.

use crate::content_type;
use crate::{AbortSignal, AsyncRead, AsyncWrite, Charset, Error};
use futures_util::future::BoxFuture;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::DynamicImage;
use std::borrow::Cow;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// A body source generated on the fly while the body is written.
///
/// Useful for large payloads that shouldn't be held in memory. If
/// `content_length()` returns a length it must be exact: it may end up as the
/// `content-length` header without being checked. Return `None` to force the
/// body to be spooled (or chunked) to learn the size.
pub trait DynamicPart: Send {
    /// Exact number of bytes `write_to` produces, if known.
    fn content_length(&self) -> Option<u64> {
        None
    }

    /// Content type for the multipart header.
    fn content_type(&self) -> Option<&str> {
        Some(content_type::OCTET_STREAM)
    }

    /// File name for the multipart header.
    fn file_name(&self) -> Option<&str> {
        None
    }

    /// Charset for this part. `None` inherits the request charset.
    fn charset(&self) -> Option<Charset> {
        None
    }

    /// Write the part data to `out`.
    ///
    /// `charset` is the effective charset for this part. When `abort` is set it is
    /// fine to stop writing at any point and return `Ok(())`.
    fn write_to<'a>(
        &'a mut self,
        out: &'a mut (dyn AsyncWrite + Unpin + Send),
        charset: Charset,
        abort: &'a AbortSignal,
    ) -> BoxFuture<'a, Result<(), Error>>;
}

/// An in-memory image, encoded to PNG (with alpha channel) or JPEG when sent.
pub struct ImagePart(Option<DynamicImage>);

impl ImagePart {
    pub fn new(image: DynamicImage) -> Self {
        ImagePart(Some(image))
    }

    /// Whether the image was dropped after a previous encode.
    pub fn is_disposed(&self) -> bool {
        self.0.is_none()
    }

    fn has_alpha(&self) -> bool {
        self.0
            .as_ref()
            .map(|i| i.color().has_alpha())
            .unwrap_or(false)
    }

    pub(crate) fn dispose(&mut self) {
        self.0 = None;
    }

    /// Encode the image. A disposed image encodes to nothing.
    pub(crate) fn encode(&self, jpeg_quality: u8) -> Result<Vec<u8>, Error> {
        let mut buf = vec![];

        let image = match &self.0 {
            Some(image) => image,
            None => return Ok(buf),
        };

        if self.has_alpha() {
            let rgba = DynamicImage::ImageRgba8(image.to_rgba8());
            rgba.write_with_encoder(PngEncoder::new(&mut buf))?;
        } else {
            let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
            rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, jpeg_quality))?;
        }

        trace!("Encoded image to {} bytes", buf.len());

        Ok(buf)
    }
}

/// The kinds of data a part can carry.
pub enum PartSource {
    /// Text form of a scalar value, encoded in the effective charset.
    Text(String),
    /// Bytes written verbatim.
    Bytes(Vec<u8>),
    /// A file, opened and streamed when the body is written.
    File(PathBuf),
    /// A live stream, read until end. Can only be sent once.
    Stream(Box<dyn AsyncRead + Unpin + Send>),
    /// An in-memory image.
    Image(ImagePart),
    /// Caller defined generator.
    Dynamic(Box<dyn DynamicPart>),
}

/// A `PartSource` with the attributes used to send it.
pub struct Part {
    source: PartSource,
    length: Option<u64>,
    content_type: Option<String>,
    file_name: Option<String>,
    charset: Option<Charset>,
}

impl Part {
    pub fn new(source: PartSource) -> Self {
        Part {
            source,
            length: None,
            content_type: None,
            file_name: None,
            charset: None,
        }
    }

    pub fn text<T: Into<String>>(text: T) -> Self {
        Part::new(PartSource::Text(text.into()))
    }

    pub fn bytes<B: Into<Vec<u8>>>(bytes: B) -> Self {
        Part::new(PartSource::Bytes(bytes.into()))
    }

    pub fn file<P: Into<PathBuf>>(path: P) -> Self {
        Part::new(PartSource::File(path.into()))
    }

    /// A live stream. Use `with_length` if the stream length is known.
    pub fn stream<R>(reader: R) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        Part::new(PartSource::Stream(Box::new(reader)))
    }

    pub fn image(image: DynamicImage) -> Self {
        Part::new(PartSource::Image(ImagePart::new(image)))
    }

    pub fn dynamic<D: DynamicPart + 'static>(part: D) -> Self {
        Part::new(PartSource::Dynamic(Box::new(part)))
    }

    /// Declare the exact length of the data. This is trusted as is.
    pub fn with_length(mut self, length: u64) -> Self {
        self.length = Some(length);
        self
    }

    pub fn with_content_type<T: Into<String>>(mut self, content_type: T) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_file_name<T: Into<String>>(mut self, file_name: T) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn with_charset(mut self, charset: Charset) -> Self {
        self.charset = Some(charset);
        self
    }

    pub fn source(&self) -> &PartSource {
        &self.source
    }

    pub(crate) fn source_mut(&mut self) -> &mut PartSource {
        &mut self.source
    }

    /// Whether this is a plain text value, which can be sent as a url-encoded
    /// form field. Everything else requires multipart.
    pub fn is_text(&self) -> bool {
        matches!(self.source, PartSource::Text(_))
    }

    /// Length of the data in bytes, if it can be known without reading it.
    ///
    /// A declared length wins. `charset` is the request charset, used for text
    /// without charset override.
    pub fn content_length(&self, charset: Charset) -> Option<u64> {
        if self.length.is_some() {
            return self.length;
        }

        match &self.source {
            PartSource::Text(t) => {
                let charset = self.charset.unwrap_or(charset);
                Some(charset.encode(t).len() as u64)
            }
            PartSource::Bytes(b) => Some(b.len() as u64),
            PartSource::File(p) => match fs::metadata(p) {
                Ok(m) => Some(m.len()),
                Err(e) => {
                    debug!("No length for file {:?}: {}", p, e);
                    None
                }
            },
            PartSource::Stream(_) => None,
            PartSource::Image(_) => None,
            PartSource::Dynamic(d) => d.content_length(),
        }
    }

    /// Content type, explicit or defaulted by kind.
    pub fn content_type(&self) -> Option<&str> {
        if let Some(c) = &self.content_type {
            return Some(c.as_str());
        }

        match &self.source {
            PartSource::Text(_) => Some(content_type::TEXT_PLAIN),
            PartSource::Bytes(_) | PartSource::File(_) | PartSource::Stream(_) => {
                Some(content_type::OCTET_STREAM)
            }
            PartSource::Image(i) if i.is_disposed() => Some(content_type::OCTET_STREAM),
            PartSource::Image(i) if i.has_alpha() => Some(content_type::IMAGE_PNG),
            PartSource::Image(_) => Some(content_type::IMAGE_JPEG),
            PartSource::Dynamic(d) => d.content_type(),
        }
    }

    /// File name, explicit or taken from the file/generator.
    pub fn file_name(&self) -> Option<Cow<'_, str>> {
        if let Some(f) = &self.file_name {
            return Some(Cow::Borrowed(f.as_str()));
        }

        match &self.source {
            PartSource::File(p) => p.file_name().map(|n| n.to_string_lossy()),
            PartSource::Dynamic(d) => d.file_name().map(Cow::Borrowed),
            _ => None,
        }
    }

    /// Charset override, if any.
    pub fn charset(&self) -> Option<Charset> {
        if self.charset.is_some() {
            return self.charset;
        }

        match &self.source {
            PartSource::Dynamic(d) => d.charset(),
            _ => None,
        }
    }
}

impl From<PartSource> for Part {
    fn from(source: PartSource) -> Self {
        Part::new(source)
    }
}

impl From<&str> for Part {
    fn from(v: &str) -> Self {
        Part::text(v)
    }
}

impl From<String> for Part {
    fn from(v: String) -> Self {
        Part::text(v)
    }
}

impl From<bool> for Part {
    fn from(v: bool) -> Self {
        Part::text(if v { "true" } else { "false" })
    }
}

macro_rules! text_part_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Part {
                fn from(v: $t) -> Self {
                    Part::text(v.to_string())
                }
            }
        )*
    };
}

text_part_from!(i8, i16, i32, i64, u8, u16, u32, u64, isize, usize, f32, f64, char);

impl From<Vec<u8>> for Part {
    fn from(v: Vec<u8>) -> Self {
        Part::bytes(v)
    }
}

impl From<&[u8]> for Part {
    fn from(v: &[u8]) -> Self {
        Part::bytes(v)
    }
}

impl From<PathBuf> for Part {
    fn from(v: PathBuf) -> Self {
        Part::file(v)
    }
}

impl From<&Path> for Part {
    fn from(v: &Path) -> Self {
        Part::file(v)
    }
}

impl From<DynamicImage> for Part {
    fn from(v: DynamicImage) -> Self {
        Part::image(v)
    }
}

impl fmt::Debug for PartSource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PartSource::Text(t) => write!(f, "Text({:?})", t),
            PartSource::Bytes(b) => write!(f, "Bytes({})", b.len()),
            PartSource::File(p) => write!(f, "File({:?})", p),
            PartSource::Stream(_) => write!(f, "Stream"),
            PartSource::Image(i) if i.is_disposed() => write!(f, "Image(disposed)"),
            PartSource::Image(_) => write!(f, "Image"),
            PartSource::Dynamic(_) => write!(f, "Dynamic"),
        }
    }
}

impl fmt::Debug for ImagePart {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.0 {
            Some(i) => write!(f, "ImagePart({}x{})", i.width(), i.height()),
            None => write!(f, "ImagePart(disposed)"),
        }
    }
}

impl fmt::Debug for Part {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Part")
            .field("source", &self.source)
            .field("length", &self.length)
            .field("content_type", &self.content_type)
            .field("file_name", &self.file_name)
            .field("charset", &self.charset)
            .finish()
    }
}
