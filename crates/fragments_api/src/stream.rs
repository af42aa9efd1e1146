use serde_json::Value;

use crate::error::FragmentsApiError;
use crate::partial_json::parse_partial_json;

/// Incremental parser for a streamed JSON object body.
///
/// Bytes are decoded as UTF-8 across chunk boundaries, appended to the full
/// text, and re-parsed as a partial document. A snapshot is only reported when
/// it differs from the previous one.
#[derive(Debug, Default)]
pub struct ObjectStreamParser {
    pending: Vec<u8>,
    text: String,
    last: Option<Value>,
}

impl ObjectStreamParser {
    /// Feed arbitrary bytes and return the new snapshot, if it changed.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<Option<Value>, FragmentsApiError> {
        self.pending.extend_from_slice(bytes);
        self.decode_pending();

        let Some(value) = parse_partial_json(&self.text)? else {
            return Ok(None);
        };
        if self.last.as_ref() == Some(&value) {
            return Ok(None);
        }

        self.last = Some(value.clone());
        Ok(Some(value))
    }

    /// Parse the whole body once the stream has ended.
    ///
    /// Unlike [`Self::feed`], the text must now be a complete document.
    pub fn finish(&mut self) -> Result<Value, FragmentsApiError> {
        if !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            self.text.push_str(&String::from_utf8_lossy(&rest));
        }

        if self.text.trim().is_empty() {
            return Err(FragmentsApiError::EmptyObject);
        }
        Ok(serde_json::from_str(&self.text)?)
    }

    /// Text received so far.
    pub fn text(&self) -> &str {
        &self.text
    }

    fn decode_pending(&mut self) {
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(valid) => {
                    self.text.push_str(valid);
                    self.pending.clear();
                    return;
                }
                Err(error) => {
                    let valid_up_to = error.valid_up_to();
                    self.text
                        .push_str(&String::from_utf8_lossy(&self.pending[..valid_up_to]));
                    match error.error_len() {
                        // Truncated multi-byte sequence; wait for the next chunk.
                        None => {
                            self.pending.drain(..valid_up_to);
                            return;
                        }
                        Some(invalid) => {
                            self.text.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid_up_to + invalid);
                        }
                    }
                }
            }
        }
    }
}
