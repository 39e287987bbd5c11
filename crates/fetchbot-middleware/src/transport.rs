//! Directive wire format and a line-oriented transport.
//!
//! A payload is one JSON object whose `type` field names the directive and
//! whose remaining fields are its parameters:
//!
//! ```json
//! {"type": "move", "direction": "forward", "duration": "2", "speed": "50"}
//! {"type": "come"}
//! ```
//!
//! Parameter *values* are not checked here; that is the dispatcher's job.

use std::io::{self, BufRead};

use fetchbot_types::{Directive, FetchError};

/// Decode a raw payload into a [`Directive`].
///
/// # Errors
///
/// Returns [`FetchError::Decode`] for invalid UTF-8, invalid JSON, a
/// non-object payload, or a missing/unknown `type`.
pub fn decode_payload(raw: &[u8]) -> Result<Directive, FetchError> {
    let text = std::str::from_utf8(raw)
        .map_err(|e| FetchError::Decode(format!("payload is not UTF-8: {e}")))?;
    serde_json::from_str(text.trim()).map_err(|e| FetchError::Decode(e.to_string()))
}

/// What a transport hands to the directive-handling context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Connected,
    Payload(String),
    Disconnected,
}

/// Frames newline-delimited payloads from a reader.
///
/// Emits [`TransportEvent::Connected`] first, one
/// [`TransportEvent::Payload`] per non-blank line (lines starting with `#`
/// are comments), and [`TransportEvent::Disconnected`] at end of input.
pub struct LineTransport<R> {
    reader: R,
    connected: bool,
    finished: bool,
}

impl<R: BufRead> LineTransport<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            connected: false,
            finished: false,
        }
    }
}

impl<R: BufRead> Iterator for LineTransport<R> {
    type Item = io::Result<TransportEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        if !self.connected {
            self.connected = true;
            return Some(Ok(TransportEvent::Connected));
        }
        let mut line = String::new();
        loop {
            line.clear();
            match self.reader.read_line(&mut line) {
                Ok(0) => {
                    self.finished = true;
                    return Some(Ok(TransportEvent::Disconnected));
                }
                Ok(_) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() || trimmed.starts_with('#') {
                        continue;
                    }
                    return Some(Ok(TransportEvent::Payload(trimmed.to_string())));
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
