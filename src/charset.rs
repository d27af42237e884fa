//! Character sets and `Content-Type` parameter parsing.

use crate::Error;
use encoding_rs::Encoding;
use std::borrow::Cow;
use std::fmt;

/// A character encoding used for text values, form fields and multipart headers.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Charset(&'static Encoding);

impl Charset {
    /// UTF-8, the fallback whenever nothing else is declared.
    pub const UTF_8: Charset = Charset(encoding_rs::UTF_8);

    /// Look up a charset by label, i.e. `"utf-8"`, `"ISO-8859-1"` or `"latin1"`.
    ///
    /// Labels that only decode, such as those mapping to the `replacement`
    /// encoding, are unsupported.
    pub fn for_label(label: &str) -> Result<Charset, Error> {
        let enc = Encoding::for_label(label.trim().as_bytes())
            .ok_or_else(|| Error::UnsupportedCharset(label.to_string()))?;

        if enc == encoding_rs::REPLACEMENT {
            return Err(Error::UnsupportedCharset(label.to_string()));
        }

        Ok(Charset(enc))
    }

    /// Canonical name, as written in `charset=` parameters.
    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    /// Encode text to bytes in this charset.
    ///
    /// Unmappable characters are replaced with numeric character references.
    pub fn encode<'a>(&self, text: &'a str) -> Cow<'a, [u8]> {
        // encoding_rs only encodes UTF-16 as UTF-8
        if self.0 == encoding_rs::UTF_16LE {
            return Cow::Owned(text.encode_utf16().flat_map(u16::to_le_bytes).collect());
        }
        if self.0 == encoding_rs::UTF_16BE {
            return Cow::Owned(text.encode_utf16().flat_map(u16::to_be_bytes).collect());
        }

        let (bytes, _, _) = self.0.encode(text);
        bytes
    }

    /// Decode bytes in this charset, stripping a leading byte order mark.
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> Cow<'a, str> {
        let (text, _, _) = self.0.decode(bytes);
        text
    }
}

impl Default for Charset {
    fn default() -> Self {
        Charset::UTF_8
    }
}

impl fmt::Debug for Charset {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Charset({})", self.name())
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Split a `Content-Type` header value into the mime type and its charset
/// parameter, if any.
///
/// `"text/plain; charset=ISO-8859-1"` gives `("text/plain", Some("ISO-8859-1"))`.
pub fn split_content_type(header: &str) -> (&str, Option<String>) {
    let mime = match header.find(';') {
        Some(idx) => &header[..idx],
        None => header,
    };

    let charset = parse_header_params(header)
        .into_iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("charset"))
        .map(|(_, value)| value);

    (mime.trim(), charset)
}

/// Parse the `name=value` parameters following the first `;` of a header value.
///
/// Order is preserved, names and values are trimmed and values wrapped in
/// double quotes are unquoted. Parameters without `=` or with an empty value
/// are skipped.
pub fn parse_header_params(header: &str) -> Vec<(String, String)> {
    let mut params = vec![];

    let rest = match header.find(';') {
        Some(idx) => &header[(idx + 1)..],
        None => return params,
    };

    for param in rest.split(';') {
        let eq = match param.find('=') {
            Some(eq) => eq,
            None => continue,
        };

        let name = param[..eq].trim();
        let value = param[(eq + 1)..].trim();

        let value = if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
            &value[1..(value.len() - 1)]
        } else {
            value
        };

        if name.is_empty() || value.is_empty() {
            continue;
        }

        params.push((name.to_string(), value.to_string()));
    }

    params
}
