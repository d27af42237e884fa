#![no_main]
use libfuzzer_sys::fuzz_target;

use hreq_transfer::{parse_header_params, split_content_type, Charset};

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        for (name, value) in parse_header_params(s) {
            assert!(!name.is_empty());
            assert!(!value.is_empty());
        }

        let (mime, charset) = split_content_type(s);
        assert!(!mime.contains(';'));

        if let Some(label) = charset {
            let _ = Charset::for_label(&label);
        }
    }
});
