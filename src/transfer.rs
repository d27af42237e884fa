use crate::connection::response_head;
use crate::encoder::BodyEncoder;
use crate::estimate::estimate_content_length;
use crate::limit::LimitWrite;
use crate::progress::{Listener, ProgressWrite};
use crate::request::ResolvedType;
use crate::settings::BUFFER_SIZE;
use crate::{AbortSignal, AbortWrite, AsyncWrite, Connection, Error, Request, Response, TransferPlan};
use futures_util::io::{AllowStdIo, AsyncReadExt, AsyncWriteExt};
use http::header::CONTENT_TYPE;
use std::fs::File;

/// Sink chain in front of the connection output. Abort is outermost so that
/// swallowed writes are neither counted nor length checked.
type Sink<O> = AbortWrite<ProgressWrite<LimitWrite<O>>>;

/// Send a request over `conn` and wait for the response head.
///
/// The body is sized and sent according to the [`TransferPlan`] picked for it.
/// Fields and parts are consumed the way they are written: streams are read to
/// end and images may be disposed.
///
/// Returns `Ok(None)` if `abort` was set at any point before the response head
/// arrived. On error or abort the connection is disconnected and any request
/// temp file is deleted.
///
/// [`TransferPlan`]: enum.TransferPlan.html
pub async fn send<C: Connection>(
    req: &mut Request,
    mut conn: C,
    listener: Option<Listener>,
    abort: AbortSignal,
) -> Result<Option<Response<C>>, Error> {
    // Configuration errors before any I/O.
    req.validate()?;
    let resolved = req.resolve_type()?;
    let uri = req.uri_with_fields()?;

    if abort.is_aborted() {
        debug!("Aborted before send");
        conn.disconnect();
        return Ok(None);
    }

    conn.set_request_target(req.method(), &uri);

    for (name, value) in req.headers() {
        match value.to_str() {
            Ok(v) => conn.set_request_header(name.as_str(), v),
            Err(_) => debug!("Drop header with non-ascii value: {}", name),
        }
    }

    if let Some(ctype) = &resolved.header {
        conn.set_request_header(CONTENT_TYPE.as_str(), ctype);
    }

    if let Err(e) = send_body(req, &resolved, &mut conn, listener, &abort).await {
        debug!("Send body failed: {}", e);
        conn.disconnect();
        return Err(e);
    }

    if abort.is_aborted() {
        debug!("Aborted during send");
        conn.disconnect();
        return Ok(None);
    }

    let head = match response_head(&mut conn).await {
        Ok(v) => v,
        Err(e) => {
            conn.disconnect();
            return Err(e);
        }
    };

    if abort.is_aborted() {
        debug!("Aborted awaiting response");
        conn.disconnect();
        return Ok(None);
    }

    Ok(Some(Response::new(head, conn, req.settings(), abort)))
}

async fn send_body<C: Connection>(
    req: &mut Request,
    resolved: &ResolvedType,
    conn: &mut C,
    listener: Option<Listener>,
    abort: &AbortSignal,
) -> Result<(), Error> {
    let (estimate, raw_body_len) = match req.body() {
        Some(body) => {
            let len = body.content_length(resolved.charset);
            (len, len)
        }
        None => (
            estimate_content_length(req.fields(), req.parts(), resolved.charset),
            None,
        ),
    };

    let plan = TransferPlan::select(
        req.has_body(),
        req.settings().chunk_size(),
        estimate,
        raw_body_len,
    );

    let encoder = BodyEncoder::new(req.settings(), resolved.charset, abort.clone());

    match plan {
        TransferPlan::NoBody => {
            report(&listener, 0, None);
        }

        TransferPlan::InMemory => {
            let mut buf = vec![];
            encoder.write_request(req, resolved, &mut buf).await?;

            if abort.is_aborted() {
                return Ok(());
            }

            let len = buf.len() as u64;
            conn.set_content_length(len);

            if len == 0 {
                // no output for an empty body
                report(&listener, 0, Some(0));
                return Ok(());
            }

            let mut out = open_sink(conn, listener, abort, Some(len))?;
            out.write_all(&buf).await?;
            close_sink(out, abort).await?;
        }

        TransferPlan::FixedLength(len) => {
            conn.set_content_length(len);
            conn.enable_fixed_length_mode(len);

            let mut out = open_sink(conn, listener, abort, Some(len))?;
            encoder.write_request(req, resolved, &mut out).await?;
            close_sink(out, abort).await?;
        }

        TransferPlan::Chunked(chunk_size) => {
            conn.enable_chunked_mode(chunk_size);

            let mut out = open_sink(conn, listener, abort, None)?;
            encoder.write_request(req, resolved, &mut out).await?;
            close_sink(out, abort).await?;
        }

        TransferPlan::SpillToTemp => {
            // Deleted when dropped, on every way out of this block.
            let mut tmp = tempfile::Builder::new()
                .prefix("request-buffer")
                .suffix(".http")
                .tempfile()?;

            trace!("Spool request body to: {:?}", tmp.path());

            {
                let mut spool = AllowStdIo::new(tmp.as_file_mut());
                encoder.write_request(req, resolved, &mut spool).await?;
                spool.flush().await?;
            }

            if abort.is_aborted() {
                return Ok(());
            }

            let len = tmp.as_file().metadata()?.len();

            debug!("Spooled request body is {} bytes", len);

            conn.set_content_length(len);
            conn.enable_fixed_length_mode(len);

            let mut out = open_sink(conn, listener, abort, Some(len))?;
            let mut file = AllowStdIo::new(File::open(tmp.path())?);
            let mut chunk = vec![0; BUFFER_SIZE];

            loop {
                let amount = file.read(&mut chunk[..]).await?;

                if amount == 0 || abort.is_aborted() {
                    break;
                }

                out.write_all(&chunk[..amount]).await?;
            }

            close_sink(out, abort).await?;
        }
    }

    Ok(())
}

/// Open the connection output, wrapped, and report `(0, total)`.
fn open_sink<C: Connection>(
    conn: &mut C,
    listener: Option<Listener>,
    abort: &AbortSignal,
    length: Option<u64>,
) -> Result<Sink<C::Output>, Error> {
    let output = conn.open_output()?;

    report(&listener, 0, length);

    let limit = LimitWrite::new(output, length);
    let progress = ProgressWrite::new(limit, listener, length);

    Ok(AbortWrite::new(progress, abort.clone()))
}

/// Flush and close the output. An aborted body is closed without checking the
/// declared length.
async fn close_sink<O>(out: Sink<O>, abort: &AbortSignal) -> Result<(), Error>
where
    O: AsyncWrite + Unpin,
{
    let progress = out.into_inner();

    trace!("Close request output after {} bytes", progress.written());

    let mut limit = progress.into_inner();

    if !abort.is_aborted() {
        limit.flush().await?;
        limit.finish()?;
    }

    limit.close().await?;

    Ok(())
}

fn report(listener: &Option<Listener>, sent: u64, total: Option<u64>) {
    if let Some(listener) = listener {
        listener.on_request_progress(sent, total);
    }
}
