use crate::Charset;

/// Request bodies with a known length below this are encoded in memory first.
pub const MEMORY_BODY_LIMIT: u64 = 16_384;

/// Response bodies with a known length up to this are buffered in memory.
pub const RESPONSE_MEMORY_LIMIT: u64 = 8_192;

/// Chunk size for streaming files, streams and temp files.
pub const BUFFER_SIZE: usize = 4_096;

/// JPEG quality used when encoding in-memory images without alpha channel.
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Per-request transfer configuration.
///
/// Built once from `Default` with the chained `with_*` methods, then read-only.
///
/// ```
/// use hreq_transfer::TransferSettings;
///
/// let settings = TransferSettings::default()
///     .with_chunk_size(8192)
///     .with_jpeg_quality(75);
///
/// assert_eq!(settings.chunk_size(), Some(8192));
/// ```
#[derive(Debug, Clone)]
pub struct TransferSettings {
    chunk_size: Option<usize>,
    charset: Option<Charset>,
    jpeg_quality: u8,
    dispose_images: bool,
    auto_decompress: bool,
}

impl Default for TransferSettings {
    fn default() -> Self {
        TransferSettings {
            chunk_size: None,
            charset: None,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            dispose_images: false,
            auto_decompress: true,
        }
    }
}

impl TransferSettings {
    /// Send the body with chunked transfer encoding. A size of `0` lets the
    /// connection pick its default chunk size.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = Some(chunk_size);
        self
    }

    /// Require a `content-length` for the body (the default).
    pub fn with_fixed_length(mut self) -> Self {
        self.chunk_size = None;
        self
    }

    /// Charset for text when the `content-type` header doesn't declare one.
    pub fn with_charset(mut self, charset: Charset) -> Self {
        self.charset = Some(charset);
        self
    }

    /// JPEG quality 1-100. `0` means the default.
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = match quality {
            0 => DEFAULT_JPEG_QUALITY,
            q => q.min(100),
        };
        self
    }

    /// Drop in-memory images once they've been encoded.
    pub fn with_dispose_images(mut self, dispose: bool) -> Self {
        self.dispose_images = dispose;
        self
    }

    /// Transparently gunzip responses with `content-encoding: gzip`.
    pub fn with_auto_decompress(mut self, auto: bool) -> Self {
        self.auto_decompress = auto;
        self
    }

    pub fn chunk_size(&self) -> Option<usize> {
        self.chunk_size
    }

    pub fn charset(&self) -> Option<Charset> {
        self.charset
    }

    pub fn jpeg_quality(&self) -> u8 {
        self.jpeg_quality
    }

    pub fn dispose_images(&self) -> bool {
        self.dispose_images
    }

    pub fn auto_decompress(&self) -> bool {
        self.auto_decompress
    }
}
