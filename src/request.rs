use crate::charset::split_content_type;
use crate::content_type;
use crate::encoder::BodyEncoder;
use crate::multipart::{pct_encode, MultipartEnvelope};
use crate::{AbortSignal, AsyncWrite, Charset, Error, Part, PartSource, TransferSettings};
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, Method, Uri};
use std::fmt;
use std::str::FromStr;

/// Ordered multimap of form names to parts.
///
/// Names keep the order of first insertion, values the order they were added.
#[derive(Default)]
pub struct FormMap {
    entries: Vec<(String, Vec<Part>)>,
}

impl FormMap {
    pub fn new() -> Self {
        FormMap::default()
    }

    /// Add a value under `name`, keeping earlier values.
    pub fn add<P: Into<Part>>(&mut self, name: &str, part: P) {
        let part = part.into();
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some((_, values)) => values.push(part),
            None => self.entries.push((name.to_string(), vec![part])),
        }
    }

    /// Replace all values under `name`.
    pub fn set<P: Into<Part>>(&mut self, name: &str, part: P) {
        let part = part.into();
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some((_, values)) => *values = vec![part],
            None => self.entries.push((name.to_string(), vec![part])),
        }
    }

    /// Remove all values under `name`.
    pub fn remove(&mut self, name: &str) -> Vec<Part> {
        match self.entries.iter().position(|(n, _)| n == name) {
            Some(idx) => self.entries.remove(idx).1,
            None => vec![],
        }
    }

    /// First value under `name`.
    pub fn get(&self, name: &str) -> Option<&Part> {
        self.get_all(name).first()
    }

    pub fn get_all(&self, name: &str) -> &[Part] {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| &v[..])
            .unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(|(_, v)| v.is_empty())
    }

    /// Number of values, across all names.
    pub fn len(&self) -> usize {
        self.entries.iter().map(|(_, v)| v.len()).sum()
    }

    /// All `(name, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Part)> {
        self.entries
            .iter()
            .flat_map(|(n, v)| v.iter().map(move |p| (n.as_str(), p)))
    }

    pub(crate) fn entries_mut(&mut self) -> impl Iterator<Item = (&str, &mut Vec<Part>)> {
        self.entries.iter_mut().map(|(n, v)| (n.as_str(), v))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut Part)> {
        self.entries.iter_mut().flat_map(|(n, v)| {
            let n: &String = n;
            v.iter_mut().map(move |p| (n.as_str(), p))
        })
    }
}

/// A logical request: target, headers and the data making up the body.
///
/// The body is one of:
///
/// * nothing,
/// * form fields, sent url-encoded, as `text/plain`, or as multipart when any
///   field is binary,
/// * multipart parts (with or without fields),
/// * a raw body.
///
/// A raw body can't be combined with fields or parts.
///
/// ```
/// use hreq_transfer::Request;
///
/// let mut req = Request::new(http::Method::POST, "https://example.com/form")?;
/// req.field("a", "1").field("b", "x y");
///
/// let mut body = vec![];
/// # async_std::task::block_on(async {
/// let _ctype = req.write_body_to(&mut body).await?;
/// # Ok::<_, hreq_transfer::Error>(()) })?;
///
/// assert_eq!(body, b"a=1&b=x%20y");
/// # Ok::<_, hreq_transfer::Error>(())
/// ```
pub struct Request {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    fields: FormMap,
    parts: FormMap,
    body: Option<Part>,
    default_content_type: Option<String>,
    boundary: Option<String>,
    settings: TransferSettings,
}

/// `Content-Type` and charset resolved for one send.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedType {
    /// Mime type set by the caller, without parameters.
    pub custom_mime: Option<String>,
    /// The charset for text.
    pub charset: Charset,
    /// Envelope when the body is multipart.
    pub envelope: Option<MultipartEnvelope>,
    /// `Content-Type` header to set, when the caller set none.
    pub header: Option<String>,
}

impl ResolvedType {
    /// Whether form fields are written as `text/plain`.
    pub fn is_plain_text(&self, default_content_type: Option<&str>) -> bool {
        let mime = self.custom_mime.as_deref().or(default_content_type);
        mime.map(|m| m.eq_ignore_ascii_case(content_type::TEXT_PLAIN))
            .unwrap_or(false)
    }

    /// The content type the body is written as.
    pub fn effective(&self) -> Option<String> {
        self.header.clone().or_else(|| self.custom_mime.clone())
    }
}

impl Request {
    /// Create a request. Fails for a target that isn't a valid uri.
    pub fn new(method: Method, uri: &str) -> Result<Self, Error> {
        let uri = Uri::from_str(uri)?;

        let default_content_type = if method == Method::POST || method == Method::PUT {
            Some(content_type::FORM_URL_ENCODED.to_string())
        } else if method == Method::PATCH {
            Some(content_type::JSON.to_string())
        } else {
            None
        };

        Ok(Request {
            method,
            uri,
            headers: HeaderMap::new(),
            fields: FormMap::new(),
            parts: FormMap::new(),
            body: None,
            default_content_type,
            boundary: None,
            settings: TransferSettings::default(),
        })
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Append a header, keeping earlier values for the same name.
    pub fn header(&mut self, name: &str, value: &str) -> Result<&mut Self, Error> {
        let name = HeaderName::from_str(name)?;
        let value = HeaderValue::from_str(value)?;
        self.headers.append(name, value);
        Ok(self)
    }

    /// Set a header, replacing earlier values for the same name.
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<&mut Self, Error> {
        let name = HeaderName::from_str(name)?;
        let value = HeaderValue::from_str(value)?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Set `Content-Type`, optionally with a charset parameter.
    pub fn set_content_type(
        &mut self,
        mime: &str,
        charset: Option<Charset>,
    ) -> Result<&mut Self, Error> {
        let value = match charset {
            Some(c) => format!("{}; charset={}", mime, c.name()),
            None => mime.to_string(),
        };
        self.set_header(CONTENT_TYPE.as_str(), &value)
    }

    /// Add a form field.
    pub fn field<P: Into<Part>>(&mut self, name: &str, value: P) -> &mut Self {
        self.fields.add(name, value);
        self
    }

    /// Add an explicit multipart part.
    pub fn part<P: Into<Part>>(&mut self, name: &str, part: P) -> &mut Self {
        self.parts.add(name, part);
        self
    }

    pub fn fields(&self) -> &FormMap {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut FormMap {
        &mut self.fields
    }

    pub fn parts(&self) -> &FormMap {
        &self.parts
    }

    pub fn parts_mut(&mut self) -> &mut FormMap {
        &mut self.parts
    }

    /// Set a raw body, sent as is.
    pub fn set_body<P: Into<Part>>(&mut self, body: P) -> &mut Self {
        self.body = Some(body.into());
        self
    }

    pub fn body(&self) -> Option<&Part> {
        self.body.as_ref()
    }

    pub fn set_settings(&mut self, settings: TransferSettings) -> &mut Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &TransferSettings {
        &self.settings
    }

    /// Content type used when the caller sets none. Derived from the method.
    pub fn default_content_type(&self) -> Option<&str> {
        self.default_content_type.as_deref()
    }

    pub fn set_default_content_type(&mut self, mime: Option<&str>) -> &mut Self {
        self.default_content_type = mime.map(|m| m.to_string());
        self
    }

    /// Use a fixed multipart boundary instead of a random one per send.
    pub fn set_multipart_boundary(&mut self, boundary: Option<&str>) -> &mut Self {
        self.boundary = boundary.map(|b| b.to_string());
        self
    }

    /// Whether the body must be sent as `multipart/form-data`.
    pub fn needs_multipart(&self) -> bool {
        self.body.is_none()
            && (!self.parts.is_empty() || self.fields.iter().any(|(_, p)| !p.is_text()))
    }

    /// Whether the request carries a body at all.
    pub fn has_body(&self) -> bool {
        self.body.is_some()
            || self.needs_multipart()
            || self.method == Method::POST
            || self.method == Method::PUT
            || self.method == Method::PATCH
    }

    /// Target uri with the form fields appended to the query, for requests
    /// without body. Requests with a body get the uri unchanged.
    pub fn uri_with_fields(&self) -> Result<Uri, Error> {
        if self.has_body() || self.fields.is_empty() {
            return Ok(self.uri.clone());
        }

        let charset = self.resolve_charset()?;

        let mut query = String::new();

        for (name, part) in self.fields.iter() {
            if let PartSource::Text(value) = part.source() {
                if !query.is_empty() {
                    query.push('&');
                }
                query.push_str(&pct_encode(name, charset));
                query.push('=');
                query.push_str(&pct_encode(value, charset));
            }
        }

        let path = self.uri.path();

        let path_and_query = match self.uri.query() {
            Some(q) if !q.is_empty() => format!("{}?{}&{}", path, q, query),
            _ => format!("{}?{}", path, query),
        };

        let mut parts = self.uri.clone().into_parts();
        parts.path_and_query = Some(path_and_query.parse()?);

        Ok(Uri::from_parts(parts).map_err(http::Error::from)?)
    }

    /// Check the request can be sent at all. Runs before any I/O.
    pub(crate) fn validate(&self) -> Result<(), Error> {
        if self.body.is_some() && (!self.fields.is_empty() || !self.parts.is_empty()) {
            return Err(Error::User(
                "Raw body can't be combined with form fields or parts".into(),
            ));
        }
        Ok(())
    }

    /// First `Content-Type` set by the caller, split in mime and charset label.
    fn custom_content_type(&self) -> Option<(String, Option<String>)> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| {
                let (mime, charset) = split_content_type(v);
                (mime.to_string(), charset)
            })
    }

    fn resolve_charset(&self) -> Result<Charset, Error> {
        match self.custom_content_type().and_then(|(_, c)| c) {
            Some(label) => Charset::for_label(&label),
            None => Ok(self.settings.charset().unwrap_or_default()),
        }
    }

    /// Work out mime type, charset and multipart envelope for one send.
    ///
    /// Unless a fixed boundary is set, each call makes a new random boundary.
    pub(crate) fn resolve_type(&self) -> Result<ResolvedType, Error> {
        let custom_mime = self.custom_content_type().map(|(m, _)| m);
        let charset = self.resolve_charset()?;

        let envelope = if self.needs_multipart() {
            Some(match &self.boundary {
                Some(b) => MultipartEnvelope::with_boundary(b.as_str()),
                None => MultipartEnvelope::new(),
            })
        } else {
            None
        };

        let header = if custom_mime.is_some() {
            None
        } else if let Some(env) = &envelope {
            Some(env.content_type())
        } else {
            self.default_content_type
                .as_ref()
                .map(|d| format!("{}; charset={}", d, charset.name()))
        };

        Ok(ResolvedType {
            custom_mime,
            charset,
            envelope,
            header,
        })
    }

    /// Encode the body into `out` the same way it would be sent, without
    /// progress or transfer strategy. Returns the effective content type.
    ///
    /// Streams are consumed and images may be disposed, so the request might not
    /// be sendable again afterwards.
    pub async fn write_body_to<W>(&mut self, out: &mut W) -> Result<Option<String>, Error>
    where
        W: AsyncWrite + Unpin + Send,
    {
        self.validate()?;

        let resolved = self.resolve_type()?;

        let encoder = BodyEncoder::new(&self.settings, resolved.charset, AbortSignal::new());

        encoder.write_request(self, &resolved, out).await?;

        Ok(resolved.effective())
    }

    pub(crate) fn split_for_encode(
        &mut self,
    ) -> (&mut FormMap, &mut FormMap, Option<&mut Part>, Option<&str>) {
        (
            &mut self.fields,
            &mut self.parts,
            self.body.as_mut(),
            self.default_content_type.as_deref(),
        )
    }
}

impl fmt::Debug for FormMap {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("uri", &self.uri)
            .field("headers", &self.headers)
            .field("fields", &self.fields)
            .field("parts", &self.parts)
            .field("body", &self.body)
            .finish()
    }
}
