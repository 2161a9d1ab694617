//! Line framing for the `data:` event stream returned by the send endpoint.
//!
//! The body arrives as arbitrary byte chunks. [`FrameDecoder`] turns them into
//! complete newline-terminated lines, carrying both an unterminated trailing
//! line and an incomplete UTF-8 sequence over to the next chunk.

use tracing::debug;

#[derive(Debug, Default)]
pub struct FrameDecoder {
    /// Trailing text after the last newline seen. Never contains `\n`.
    buffer: String,
    /// Bytes of a UTF-8 sequence cut off at the end of the previous chunk.
    pending: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and drain every line it completes.
    ///
    /// A trailing `\r` is stripped so CRLF-framed bodies yield the same lines.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let decoded = self.decode(chunk);
        if decoded.is_empty() {
            return Vec::new();
        }

        let mut text = std::mem::take(&mut self.buffer);
        text.push_str(&decoded);

        match text.rfind('\n') {
            None => {
                self.buffer = text;
                Vec::new()
            }
            Some(pos) => {
                self.buffer = text[pos + 1..].to_string();
                text[..pos]
                    .split('\n')
                    .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
                    .collect()
            }
        }
    }

    /// The unterminated fragment currently carried over.
    pub fn buffered(&self) -> &str {
        &self.buffer
    }

    /// End of stream. A dangling partial line cannot be parsed safely, so it is
    /// discarded rather than emitted.
    pub fn finish(self) {
        if !self.buffer.is_empty() || !self.pending.is_empty() {
            debug!(
                fragment_len = self.buffer.len() + self.pending.len(),
                "dropping unterminated fragment at end of stream"
            );
        }
    }

    fn decode(&mut self, chunk: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.pending);
        bytes.extend_from_slice(chunk);

        let mut out = String::with_capacity(bytes.len());
        let mut rest = bytes.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(err) => {
                    let valid_len = err.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&rest[..valid_len]));
                    match err.error_len() {
                        Some(bad_len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &rest[valid_len + bad_len..];
                        }
                        None => {
                            // Incomplete sequence at the end: wait for more bytes.
                            self.pending = rest[valid_len..].to_vec();
                            break;
                        }
                    }
                }
            }
        }
        out
    }
}
