//! Incremental UTF-8 decoding for response bodies.
//!
//! Chunk boundaries can fall anywhere inside a multi-byte character. The
//! decoder emits every complete character it has seen and carries the 0-3
//! bytes of a split character over to the next call.

use std::fmt;

const MAX_PENDING: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The body contained bytes that can never form valid UTF-8.
    InvalidSequence,
    /// The body ended in the middle of a character.
    Truncated { pending: usize },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::InvalidSequence => write!(f, "invalid UTF-8 in response body"),
            DecodeError::Truncated { pending } => write!(
                f,
                "response body ended inside a character ({pending} byte(s) left undecoded)"
            ),
        }
    }
}

impl std::error::Error for DecodeError {}

#[derive(Debug, Default, Clone)]
pub struct Utf8StreamDecoder {
    pending: [u8; MAX_PENDING + 1],
    pending_len: usize,
}

impl Utf8StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending_len(&self) -> usize {
        self.pending_len
    }

    pub fn reset(&mut self) {
        self.pending_len = 0;
    }

    /// Decodes `chunk`, returning the text completed by it.
    pub fn decode(&mut self, chunk: &[u8]) -> Result<String, DecodeError> {
        let mut out = String::with_capacity(chunk.len() + self.pending_len);
        let mut input = chunk;

        if self.pending_len > 0 {
            let needed = sequence_len(self.pending[0]).ok_or(DecodeError::InvalidSequence)?;
            let take = (needed - self.pending_len).min(input.len());
            self.pending[self.pending_len..self.pending_len + take].copy_from_slice(&input[..take]);
            self.pending_len += take;
            input = &input[take..];

            match std::str::from_utf8(&self.pending[..self.pending_len]) {
                Ok(text) => {
                    out.push_str(text);
                    self.pending_len = 0;
                }
                Err(err) if err.error_len().is_none() => {
                    // Still short of a full character; wait for more bytes.
                    return Ok(out);
                }
                Err(_) => {
                    self.pending_len = 0;
                    return Err(DecodeError::InvalidSequence);
                }
            }
        }

        match std::str::from_utf8(input) {
            Ok(text) => out.push_str(text),
            Err(err) => {
                let valid = err.valid_up_to();
                out.push_str(&String::from_utf8_lossy(&input[..valid]));
                if err.error_len().is_some() {
                    return Err(DecodeError::InvalidSequence);
                }
                let rest = &input[valid..];
                self.pending[..rest.len()].copy_from_slice(rest);
                self.pending_len = rest.len();
            }
        }

        Ok(out)
    }

    /// Checks that the body did not end mid-character.
    pub fn finish(&mut self) -> Result<(), DecodeError> {
        let pending = std::mem::take(&mut self.pending_len);
        if pending == 0 {
            Ok(())
        } else {
            Err(DecodeError::Truncated { pending })
        }
    }
}

fn sequence_len(lead: u8) -> Option<usize> {
    match lead {
        0x00..=0x7F => Some(1),
        0xC2..=0xDF => Some(2),
        0xE0..=0xEF => Some(3),
        0xF0..=0xF4 => Some(4),
        _ => None,
    }
}
