//! Stream framing — newline-terminated records out of arbitrary reads.
//!
//! DESIGN
//! ======
//! The wire carries UTF-8 text, one JSON object per line, no length prefix.
//! TCP reads split that text anywhere, including mid-record and mid-codepoint,
//! so the buffer accumulates raw bytes and yields only complete records; the
//! unterminated tail stays for the next read. A peer that never sends a
//! terminator grows the buffer until the connector's optional cap trips.

/// Accumulates raw stream bytes and yields complete newline-terminated
/// records.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one chunk and drain every record completed by it.
    ///
    /// Returned records do not include the terminator and appear in wire
    /// order. Records whose bytes are not valid UTF-8 are decoded lossily;
    /// the decode layer rejects them as malformed JSON.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let Some(last_nl) = self.buf.iter().rposition(|&b| b == b'\n') else {
            return Vec::new();
        };
        let tail = self.buf.split_off(last_nl + 1);
        let complete = std::mem::replace(&mut self.buf, tail);
        complete[..last_nl]
            .split(|&b| b == b'\n')
            .map(|line| String::from_utf8_lossy(line).into_owned())
            .collect()
    }

    /// Bytes currently held without a terminator.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.buf.len()
    }

    /// Drop any partial record, e.g. when the connection is replaced.
    pub fn reset(&mut self) {
        self.buf.clear();
    }
}

#[cfg(test)]
#[path = "framing_test.rs"]
mod tests;
