#![no_main]
use libfuzzer_sys::fuzz_target;

use hreq_transfer::Request;

fuzz_target!(|data: &[u8]| {
    let s = String::from_utf8_lossy(data);

    let mut req = Request::new(http::Method::POST, "http://example.com/").unwrap();

    // every line is name=value
    for line in s.lines() {
        let mut split = line.splitn(2, '=');
        let name = split.next().unwrap_or("");
        let value = split.next().unwrap_or("");
        req.field(name, value);
    }

    let mut body = vec![];

    async_std::task::block_on(async {
        req.write_body_to(&mut body).await.unwrap();
    });

    let unreserved = |c: &u8| c.is_ascii_alphanumeric() || b"-._~%=&".contains(c);
    assert!(body.iter().all(unreserved));
});
