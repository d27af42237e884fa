use crate::multipart::{pct_encode, MultipartEnvelope, CRLF};
use crate::request::{FormMap, Request, ResolvedType};
use crate::settings::BUFFER_SIZE;
use crate::{AbortSignal, AsyncRead, AsyncWrite, Charset, Error, Part, PartSource, TransferSettings};
use futures_util::io::{AllowStdIo, AsyncReadExt, AsyncWriteExt};
use std::fs::File;

/// Writes request bodies: raw, form or multipart.
///
/// Abort is checked before every write. Once set, the encoder returns `Ok(())`
/// without writing more, and it's up to the caller to inspect the signal.
#[derive(Debug)]
pub(crate) struct BodyEncoder {
    charset: Charset,
    jpeg_quality: u8,
    dispose_images: bool,
    abort: AbortSignal,
}

impl BodyEncoder {
    pub fn new(settings: &TransferSettings, charset: Charset, abort: AbortSignal) -> Self {
        BodyEncoder {
            charset,
            jpeg_quality: settings.jpeg_quality(),
            dispose_images: settings.dispose_images(),
            abort,
        }
    }

    /// Write the body of `req` in the shape `resolved` says.
    pub async fn write_request<W>(
        &self,
        req: &mut Request,
        resolved: &ResolvedType,
        out: &mut W,
    ) -> Result<(), Error>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let (fields, parts, body, default_content_type) = req.split_for_encode();

        if let Some(body) = body {
            return self.write_raw(body, out).await;
        }

        if let Some(envelope) = &resolved.envelope {
            return self.write_multipart(envelope, fields, parts, out).await;
        }

        let plain = resolved.is_plain_text(default_content_type);

        self.write_form(fields, plain, out).await
    }

    /// A single part, verbatim.
    pub async fn write_raw<W>(&self, body: &mut Part, out: &mut W) -> Result<(), Error>
    where
        W: AsyncWrite + Unpin + Send,
    {
        trace!("Write raw body: {:?}", body.source());
        self.write_source(body, out).await
    }

    /// `key=value` pairs. Url-encoded and joined by `&`, or for `text/plain`
    /// unescaped and joined by CRLF.
    pub async fn write_form<W>(
        &self,
        fields: &mut FormMap,
        plain: bool,
        out: &mut W,
    ) -> Result<(), Error>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let mut first = true;

        for (name, part) in fields.iter_mut() {
            let value = match part.source_mut() {
                PartSource::Text(v) => &*v,
                other => {
                    debug!("Skip non-text form field {}: {:?}", name, other);
                    continue;
                }
            };

            let mut pair = vec![];

            if plain {
                if !first {
                    pair.extend_from_slice(CRLF);
                }
                pair.extend_from_slice(&self.charset.encode(name));
                pair.push(b'=');
                pair.extend_from_slice(&self.charset.encode(value));
            } else {
                if !first {
                    pair.push(b'&');
                }
                pair.extend_from_slice(pct_encode(name, self.charset).as_bytes());
                pair.push(b'=');
                pair.extend_from_slice(pct_encode(value, self.charset).as_bytes());
            }

            first = false;

            if !self.put(out, &pair).await? {
                return Ok(());
            }
        }

        Ok(())
    }

    /// Fields followed by parts, each framed by the envelope boundary.
    pub async fn write_multipart<W>(
        &self,
        envelope: &MultipartEnvelope,
        fields: &mut FormMap,
        parts: &mut FormMap,
        out: &mut W,
    ) -> Result<(), Error>
    where
        W: AsyncWrite + Unpin + Send,
    {
        for map in [fields, parts].iter_mut() {
            for (name, values) in map.entries_mut() {
                for part in values.iter_mut() {
                    let head = envelope.part_header(name, part, self.charset);

                    if !self.put(out, &head).await? {
                        return Ok(());
                    }

                    self.write_source(part, out).await?;

                    if !self.put(out, CRLF).await? {
                        return Ok(());
                    }
                }
            }
        }

        self.put(out, &envelope.close_delimiter()).await?;

        Ok(())
    }

    /// Dispatch on the kind of data.
    async fn write_source<W>(&self, part: &mut Part, out: &mut W) -> Result<(), Error>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let charset = part.charset().unwrap_or(self.charset);

        match part.source_mut() {
            PartSource::Text(t) => {
                self.put(out, &charset.encode(t)).await?;
            }
            PartSource::Bytes(b) => {
                self.put(out, b).await?;
            }
            PartSource::File(path) => {
                trace!("Stream file: {:?}", path);
                let mut file = AllowStdIo::new(File::open(path.as_path())?);
                self.copy_chunked(&mut file, out).await?;
            }
            PartSource::Stream(reader) => {
                self.copy_chunked(reader, out).await?;
            }
            PartSource::Image(image) => {
                let encoded = image.encode(self.jpeg_quality)?;
                if self.dispose_images {
                    trace!("Dispose image after encode");
                    image.dispose();
                }
                self.put(out, &encoded).await?;
            }
            PartSource::Dynamic(dynamic) => {
                if !self.abort.is_aborted() {
                    let out: &mut (dyn AsyncWrite + Unpin + Send) = out;
                    dynamic.write_to(out, charset, &self.abort).await?;
                }
            }
        }

        Ok(())
    }

    /// Copy a reader to the sink in `BUFFER_SIZE` chunks until end of stream.
    async fn copy_chunked<R, W>(&self, reader: &mut R, out: &mut W) -> Result<(), Error>
    where
        R: AsyncRead + Unpin + Send,
        W: AsyncWrite + Unpin + Send,
    {
        let mut buf = vec![0; BUFFER_SIZE];

        loop {
            let amount = reader.read(&mut buf[..]).await?;

            if amount == 0 {
                break;
            }

            if !self.put(out, &buf[..amount]).await? {
                break;
            }
        }

        Ok(())
    }

    /// Write unless aborted. Returns `false` when aborted.
    async fn put<W>(&self, out: &mut W, data: &[u8]) -> Result<bool, Error>
    where
        W: AsyncWrite + Unpin + Send,
    {
        if self.abort.is_aborted() {
            trace!("Aborted before write of {} bytes", data.len());
            return Ok(false);
        }

        out.write_all(data).await?;

        Ok(true)
    }
}
