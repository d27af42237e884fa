use hreq_transfer::{send, AbortSignal, Error, Part, Request, TransferSettings, TransferTask};
use hreq_transfer::BUFFER_SIZE;
use http::Method;
use std::sync::Arc;

mod common;
use common::{pattern, AbortAfter, MockConnection};

#[async_std::test]
async fn abort_before_send() -> Result<(), Error> {
    common::setup_logger();

    let (conn, rec) = MockConnection::ok();

    let mut req = Request::new(Method::POST, "http://example.com/upload")?;
    req.set_body(pattern(100_000));

    let abort = AbortSignal::new();
    abort.abort();

    let res = send(&mut req, conn, None, abort).await?;

    assert!(res.is_none());
    assert!(!rec.output_opened());
    assert!(rec.output().is_empty());
    assert!(rec.disconnected());

    Ok(())
}

#[async_std::test]
async fn abort_after_chunks() -> Result<(), Error> {
    const CHUNKS: u64 = 3;

    let (conn, rec) = MockConnection::ok();

    let abort = AbortSignal::new();
    let listener = Arc::new(AbortAfter {
        abort: abort.clone(),
        after: CHUNKS * BUFFER_SIZE as u64,
    });

    let mut req = Request::new(Method::POST, "http://example.com/upload")?;
    req.set_settings(TransferSettings::default().with_chunk_size(0));
    req.set_body(Part::stream(futures_util::io::Cursor::new(pattern(100_000))));

    let res = send(&mut req, conn, Some(listener), abort.clone()).await?;

    assert!(res.is_none());
    assert!(abort.is_aborted());
    assert_eq!(rec.output().len() as u64, CHUNKS * BUFFER_SIZE as u64);
    assert_eq!(rec.output(), pattern(CHUNKS as usize * BUFFER_SIZE));
    assert!(rec.output_closed());
    assert!(rec.disconnected());

    Ok(())
}

#[async_std::test]
async fn abort_while_copying_temp_file() -> Result<(), Error> {
    let (conn, rec) = MockConnection::ok();

    let abort = AbortSignal::new();
    let listener = Arc::new(AbortAfter {
        abort: abort.clone(),
        after: 2 * BUFFER_SIZE as u64,
    });

    let mut req = Request::new(Method::POST, "http://example.com/upload")?;
    req.set_body(Part::stream(futures_util::io::Cursor::new(pattern(50_000))));

    let res = send(&mut req, conn, Some(listener), abort).await?;

    assert!(res.is_none());
    assert_eq!(rec.content_length(), Some(50_000));
    assert_eq!(rec.output().len(), 2 * BUFFER_SIZE);

    Ok(())
}

#[async_std::test]
async fn abort_is_noop_after_completion() -> Result<(), Error> {
    let (conn, _rec) = MockConnection::ok();

    let mut req = Request::new(Method::GET, "http://example.com/")?;

    let abort = AbortSignal::new();
    let mut res = send(&mut req, conn, None, abort.clone()).await?.unwrap();

    res.buffer(None).await?;
    abort.abort();

    assert_eq!(res.bytes().await?, b"OK");

    Ok(())
}

#[async_std::test]
async fn cancelled_task() -> Result<(), Error> {
    let (conn, rec) = MockConnection::ok();

    let req = Request::new(Method::GET, "http://example.com/")?;

    let task = TransferTask::new(req, conn, None);
    task.cancel();

    assert!(task.is_cancelled());
    assert!(task.await?.is_none());
    assert!(rec.disconnected());

    Ok(())
}
