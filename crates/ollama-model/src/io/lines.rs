use std::fmt::{self, Display};

use super::{Chunks, ChunksError};

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    ChunksError(ChunksError),
    InvalidPayload,
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ChunksError(ChunksError(reason)) => {
                write!(f, "failed to read response body: {reason}")
            }
            Error::InvalidPayload => write!(f, "response line is not UTF-8"),
        }
    }
}

/// A type for reading newline-delimited JSON records from a chunk stream.
///
/// Records are returned as raw text; decoding them is up to the caller.
pub struct JsonLines {
    buf: Vec<u8>,
    chunks: Chunks,
    exhausted: bool,
}

impl JsonLines {
    #[inline]
    pub fn new(chunks: Chunks) -> Self {
        Self {
            buf: Vec::new(),
            chunks,
            exhausted: false,
        }
    }

    pub async fn next_line(&mut self) -> Result<Option<String>, Error> {
        loop {
            if let Some(line) = self.try_take_line()? {
                return Ok(Some(line));
            }
            if self.exhausted {
                return self.take_remainder();
            }

            match self.chunks.next_chunk().await.map_err(Error::ChunksError)? {
                Some(bytes) => self.buf.extend_from_slice(&bytes),
                None => self.exhausted = true,
            }
        }
    }

    fn try_take_line(&mut self) -> Result<Option<String>, Error> {
        // Blank lines carry no record, skip them as they show up.
        while let Some(eol_idx) = self.buf.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=eol_idx).collect();
            let line = decode(&line)?;
            if !line.is_empty() {
                return Ok(Some(line));
            }
        }
        Ok(None)
    }

    /// The last record may not be terminated by a line feed.
    fn take_remainder(&mut self) -> Result<Option<String>, Error> {
        if self.buf.is_empty() {
            return Ok(None);
        }
        let rest = std::mem::take(&mut self.buf);
        let line = decode(&rest)?;
        Ok((!line.is_empty()).then_some(line))
    }
}

#[inline]
fn decode(raw: &[u8]) -> Result<String, Error> {
    let Ok(s) = str::from_utf8(raw) else {
        return Err(Error::InvalidPayload);
    };
    Ok(s.trim().to_owned())
}
