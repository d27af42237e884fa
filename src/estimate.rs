use crate::request::FormMap;
use crate::Charset;

/// Estimate the body size from the payload lengths of all fields and parts.
///
/// This is the sum of the data lengths only, multipart headers and form
/// separators are not included, so it's a lower bound of the encoded body
/// and only used to pick a transfer strategy.
///
/// The first field or part without a known length (live streams, images,
/// dynamic parts without length) makes the whole estimate `None`.
pub fn estimate_content_length(fields: &FormMap, parts: &FormMap, charset: Charset) -> Option<u64> {
    let estimate = fields
        .iter()
        .chain(parts.iter())
        .map(|(_, part)| part.content_length(charset))
        .sum::<Option<u64>>();

    trace!("Estimated content length: {:?}", estimate);

    estimate
}
