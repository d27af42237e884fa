use crate::settings::MEMORY_BODY_LIMIT;
use std::fmt;

/// How a request body is sized and sent.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum TransferPlan {
    /// No body, no output stream is opened.
    NoBody,
    /// Encode to memory, send with the exact `content-length`.
    InMemory,
    /// Declare the known length up front and stream.
    FixedLength(u64),
    /// Stream with chunked transfer encoding. The size is the chunk size asked
    /// of the connection, `0` for its default.
    Chunked(usize),
    /// Encode to a temp file to learn the exact length, then stream the file.
    SpillToTemp,
}

impl TransferPlan {
    /// Pick a plan, first match wins:
    ///
    /// 1. No body: `NoBody`.
    /// 2. Chunked mode asked for: `Chunked`.
    /// 3. Estimated length below 16 KiB: `InMemory`.
    /// 4. Raw body with known length: `FixedLength`.
    /// 5. Otherwise `SpillToTemp`.
    ///
    /// `estimate` is the estimated length of the fields and parts, or the raw
    /// body length when there is a raw body. `raw_body_len` is only `Some` for a
    /// raw body of known length.
    pub fn select(
        has_body: bool,
        chunk_size: Option<usize>,
        estimate: Option<u64>,
        raw_body_len: Option<u64>,
    ) -> TransferPlan {
        let plan = if !has_body {
            TransferPlan::NoBody
        } else if let Some(size) = chunk_size {
            TransferPlan::Chunked(size)
        } else if estimate.map(|e| e < MEMORY_BODY_LIMIT).unwrap_or(false) {
            TransferPlan::InMemory
        } else if let Some(len) = raw_body_len {
            TransferPlan::FixedLength(len)
        } else {
            TransferPlan::SpillToTemp
        };

        debug!(
            "Transfer plan {:?} (estimate: {:?}, chunk size: {:?})",
            plan, estimate, chunk_size
        );

        plan
    }
}

impl fmt::Debug for TransferPlan {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TransferPlan::NoBody => write!(f, "NoBody")?,
            TransferPlan::InMemory => write!(f, "InMemory")?,
            TransferPlan::FixedLength(l) => write!(f, "FixedLength({})", l)?,
            TransferPlan::Chunked(s) => write!(f, "Chunked({})", s)?,
            TransferPlan::SpillToTemp => write!(f, "SpillToTemp")?,
        }
        Ok(())
    }
}
