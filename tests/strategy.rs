use hreq_transfer::{send, AbortSignal, Error, Part, Request, TransferPlan, TransferSettings};
use hreq_transfer::MEMORY_BODY_LIMIT;
use http::Method;
use std::sync::Arc;

mod common;
use common::{pattern, MockConnection, Recording};

#[test]
fn select_order() {
    // no body wins over everything
    assert_eq!(
        TransferPlan::select(false, Some(0), Some(10), Some(10)),
        TransferPlan::NoBody
    );

    // chunking wins over a known small size
    assert_eq!(
        TransferPlan::select(true, Some(1024), Some(10), None),
        TransferPlan::Chunked(1024)
    );

    assert_eq!(
        TransferPlan::select(true, None, Some(MEMORY_BODY_LIMIT - 1), None),
        TransferPlan::InMemory
    );

    // exactly 16 KiB is not in memory
    assert_eq!(
        TransferPlan::select(true, None, Some(MEMORY_BODY_LIMIT), Some(MEMORY_BODY_LIMIT)),
        TransferPlan::FixedLength(MEMORY_BODY_LIMIT)
    );
    assert_eq!(
        TransferPlan::select(true, None, Some(MEMORY_BODY_LIMIT), None),
        TransferPlan::SpillToTemp
    );

    assert_eq!(
        TransferPlan::select(true, None, None, None),
        TransferPlan::SpillToTemp
    );
}

#[async_std::test]
async fn small_body_in_memory() -> Result<(), Error> {
    common::setup_logger();

    let body = pattern(MEMORY_BODY_LIMIT as usize - 1);

    let (conn, rec) = MockConnection::ok();
    let listener = Arc::new(Recording::default());

    let mut req = Request::new(Method::PUT, "http://example.com/blob")?;
    req.set_body(body.clone());

    send(&mut req, conn, Some(listener.clone()), AbortSignal::new()).await?;

    assert_eq!(rec.output(), body);
    assert_eq!(rec.content_length(), Some(body.len() as u64));
    assert_eq!(rec.fixed_length(), None);
    assert_eq!(rec.chunked(), None);

    // (0, total) then one write of the whole buffer
    let len = body.len() as u64;
    assert_eq!(listener.request(), vec![(0, Some(len)), (len, Some(len))]);

    Ok(())
}

#[async_std::test]
async fn body_at_limit_is_fixed_length() -> Result<(), Error> {
    let body = pattern(MEMORY_BODY_LIMIT as usize);

    let (conn, rec) = MockConnection::ok();

    let mut req = Request::new(Method::PUT, "http://example.com/blob")?;
    req.set_body(body.clone());

    send(&mut req, conn, None, AbortSignal::new()).await?;

    assert_eq!(rec.output(), body);
    assert_eq!(rec.content_length(), Some(MEMORY_BODY_LIMIT));
    assert_eq!(rec.fixed_length(), Some(MEMORY_BODY_LIMIT));

    Ok(())
}

#[async_std::test]
async fn fields_at_limit_spill_to_temp() -> Result<(), Error> {
    let big = "x".repeat(MEMORY_BODY_LIMIT as usize);

    let (conn, rec) = MockConnection::ok();

    let mut req = Request::new(Method::POST, "http://example.com/form")?;
    req.field("big", big.as_str());

    send(&mut req, conn, None, AbortSignal::new()).await?;

    let expected = format!("big={}", big);
    assert_eq!(rec.output_str(), expected);
    assert_eq!(rec.content_length(), Some(expected.len() as u64));
    assert_eq!(rec.fixed_length(), Some(expected.len() as u64));
    assert_eq!(rec.chunked(), None);

    Ok(())
}

#[async_std::test]
async fn unknown_length_spills_to_temp() -> Result<(), Error> {
    let data = pattern(10_000);

    let (conn, rec) = MockConnection::ok();
    let listener = Arc::new(Recording::default());

    let mut req = Request::new(Method::POST, "http://example.com/upload")?;
    req.set_body(Part::stream(futures_util::io::Cursor::new(data.clone())));

    send(&mut req, conn, Some(listener.clone()), AbortSignal::new()).await?;

    assert_eq!(rec.output(), data);
    assert_eq!(rec.content_length(), Some(10_000));

    // temp file copied in 4 KiB chunks
    assert_eq!(
        listener.request(),
        vec![
            (0, Some(10_000)),
            (4096, Some(10_000)),
            (8192, Some(10_000)),
            (10_000, Some(10_000)),
        ]
    );

    Ok(())
}

#[async_std::test]
async fn chunked_when_asked() -> Result<(), Error> {
    let data = pattern(10_000);

    let (conn, rec) = MockConnection::ok();
    let listener = Arc::new(Recording::default());

    let mut req = Request::new(Method::POST, "http://example.com/upload")?;
    req.set_settings(TransferSettings::default().with_chunk_size(0));
    req.set_body(Part::stream(futures_util::io::Cursor::new(data.clone())));

    send(&mut req, conn, Some(listener.clone()), AbortSignal::new()).await?;

    assert_eq!(rec.output(), data);
    assert_eq!(rec.chunked(), Some(0));
    assert_eq!(rec.content_length(), None);

    let progress = listener.request();
    assert_eq!(progress.first(), Some(&(0, None)));
    assert_eq!(progress.last(), Some(&(10_000, None)));

    Ok(())
}

#[async_std::test]
async fn declared_stream_length() -> Result<(), Error> {
    let data = pattern(20_000);

    let (conn, rec) = MockConnection::ok();

    let mut req = Request::new(Method::POST, "http://example.com/upload")?;
    req.set_body(
        Part::stream(futures_util::io::Cursor::new(data.clone())).with_length(20_000),
    );

    send(&mut req, conn, None, AbortSignal::new()).await?;

    assert_eq!(rec.output(), data);
    assert_eq!(rec.fixed_length(), Some(20_000));

    Ok(())
}

#[async_std::test]
async fn declared_length_too_short() -> Result<(), Error> {
    let (conn, rec) = MockConnection::ok();

    let mut req = Request::new(Method::POST, "http://example.com/upload")?;
    req.set_body(Part::stream(futures_util::io::Cursor::new(pattern(20_000))).with_length(16_500));

    let res = send(&mut req, conn, None, AbortSignal::new()).await;

    assert!(res.is_err());
    assert!(rec.disconnected());

    Ok(())
}

#[async_std::test]
async fn no_body_opens_no_output() -> Result<(), Error> {
    let (conn, rec) = MockConnection::ok();
    let listener = Arc::new(Recording::default());

    let mut req = Request::new(Method::GET, "http://example.com/")?;

    let res = send(&mut req, conn, Some(listener.clone()), AbortSignal::new()).await?;

    assert!(res.is_some());
    assert!(!rec.output_opened());
    assert_eq!(rec.content_length(), None);
    assert_eq!(listener.request(), vec![(0, None)]);

    Ok(())
}

#[async_std::test]
async fn empty_post_opens_no_output() -> Result<(), Error> {
    let (conn, rec) = MockConnection::ok();

    let mut req = Request::new(Method::POST, "http://example.com/")?;

    send(&mut req, conn, None, AbortSignal::new()).await?;

    assert!(!rec.output_opened());
    assert_eq!(rec.content_length(), Some(0));

    Ok(())
}

#[async_std::test]
async fn image_part_spills_to_temp() -> Result<(), Error> {
    let (conn, rec) = MockConnection::ok();

    let mut req = Request::new(Method::POST, "http://example.com/upload")?;
    req.part("img", image::DynamicImage::new_rgba8(8, 8));

    send(&mut req, conn, None, AbortSignal::new()).await?;

    let len = rec.output().len() as u64;
    assert!(len > 0);
    assert_eq!(rec.content_length(), Some(len));
    assert_eq!(rec.fixed_length(), Some(len));

    Ok(())
}
