//! `multipart/form-data` framing.

use crate::content_type;
use crate::{Charset, Part};
use rand::Rng;

const BOUNDARY_CHARS: &[u8] = b"-_1234567890abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

pub(crate) const CRLF: &[u8] = b"\r\n";

/// The boundary and framing of one multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartEnvelope {
    boundary: String,
}

impl MultipartEnvelope {
    /// Envelope with a freshly generated random boundary.
    pub fn new() -> Self {
        MultipartEnvelope {
            boundary: generate_boundary(),
        }
    }

    /// Envelope with a fixed boundary. Mainly for tests and reproducible bodies.
    pub fn with_boundary<T: Into<String>>(boundary: T) -> Self {
        MultipartEnvelope {
            boundary: boundary.into(),
        }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// `multipart/form-data; boundary=<boundary>`
    pub fn content_type(&self) -> String {
        format!("{}; boundary={}", content_type::MULTIPART_FORM_DATA, self.boundary)
    }

    /// `--boundary` and the part headers, up to and including the empty line
    /// before the part data.
    pub(crate) fn part_header(&self, name: &str, part: &Part, charset: Charset) -> Vec<u8> {
        let mut head = String::with_capacity(128);

        head.push_str("--");
        head.push_str(&self.boundary);
        head.push_str("\r\n");

        head.push_str("Content-Disposition: form-data; name=\"");
        head.push_str(&pct_encode(name, charset));
        head.push('"');

        if let Some(file_name) = part.file_name() {
            let file_name = file_name.replace('"', "");
            if !file_name.is_empty() {
                head.push_str("; filename=\"");
                head.push_str(&pct_encode(&file_name, charset));
                head.push('"');
            }
        }

        head.push_str("\r\n");

        if let Some(ctype) = part.content_type() {
            let part_charset = part.charset().unwrap_or(charset);
            head.push_str("Content-Type: ");
            head.push_str(ctype);
            head.push_str("; charset=");
            head.push_str(part_charset.name());
            head.push_str("\r\n");
        }

        head.push_str("\r\n");

        trace!("Multipart part header: {:?}", head);

        charset.encode(&head).into_owned()
    }

    /// The closing `--boundary--`.
    pub(crate) fn close_delimiter(&self) -> Vec<u8> {
        format!("--{}--\r\n", self.boundary).into_bytes()
    }
}

impl Default for MultipartEnvelope {
    fn default() -> Self {
        MultipartEnvelope::new()
    }
}

/// A random boundary of 30 to 40 characters from `[A-Za-z0-9_-]`.
fn generate_boundary() -> String {
    let mut rng = rand::rng();

    let len = rng.random_range(30..=40);

    (0..len)
        .map(|_| BOUNDARY_CHARS[rng.random_range(0..BOUNDARY_CHARS.len())] as char)
        .collect()
}

/// Percent-encode the charset encoded bytes of `s`.
pub(crate) fn pct_encode(s: &str, charset: Charset) -> String {
    urlencoding::encode_binary(&charset.encode(s)).into_owned()
}
