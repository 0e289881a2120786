//! Streaming payload extraction.
//!
//! The schedule page embeds its data as a JSON object inside a `<script>`
//! block. [`extract`] reads the page in fixed-size chunks and returns the
//! bytes strictly between a start and an end sentinel without ever holding
//! more of the page than the payload plus a short boundary tail.
//!
//! ## State Transitions
//!
//! ```text
//! SeekingStart -> Accumulating -> Done
//! ```
//!
//! While seeking, only the last `len(longer sentinel) - 1` bytes are kept
//! between chunks so a sentinel split across a chunk boundary is still
//! matched. While accumulating, the end-sentinel search resumes just before
//! the previously scanned boundary instead of rescanning the payload.

use std::io::{self, Read};

use tracing::debug;

use crate::error::ExtractError;

/// Opens the embedded schedule object (the sentinel is part of the JSON).
pub const START_SENTINEL: &[u8] = br#"{"navigation""#;
/// Closes the script block holding the schedule object.
pub const END_SENTINEL: &[u8] = b";</script>";
/// Bytes requested per read.
pub const DEFAULT_CHUNK_SIZE: usize = 2048;

#[derive(Debug)]
enum Phase {
    SeekingStart { tail: Vec<u8> },
    Accumulating { payload: Vec<u8>, scanned: usize },
    Done,
}

/// Result of feeding one chunk to an [`Extractor`].
#[derive(Debug, PartialEq, Eq)]
pub enum Step {
    /// More input is needed.
    Pending,
    /// The end sentinel was found; holds the bytes between the sentinels.
    Complete(Vec<u8>),
}

/// Sentinel-delimited payload extractor, driven one chunk at a time.
#[derive(Debug)]
pub struct Extractor<'s> {
    start: &'s [u8],
    end: &'s [u8],
    keep: usize,
    phase: Phase,
}

impl<'s> Extractor<'s> {
    pub fn new(start: &'s [u8], end: &'s [u8]) -> Self {
        Self {
            start,
            end,
            keep: start.len().max(end.len()).saturating_sub(1),
            phase: Phase::SeekingStart { tail: Vec::new() },
        }
    }

    /// Consume the next chunk of the stream.
    ///
    /// Input fed after [`Step::Complete`] has been returned is ignored.
    pub fn feed(&mut self, chunk: &[u8]) -> Step {
        match &mut self.phase {
            Phase::SeekingStart { tail } => {
                tail.extend_from_slice(chunk);
                if let Some(pos) = find(tail, self.start) {
                    let payload = tail.split_off(pos + self.start.len());
                    self.phase = Phase::Accumulating {
                        payload,
                        scanned: 0,
                    };
                    return self.scan_for_end();
                }
                let excess = tail.len().saturating_sub(self.keep);
                tail.drain(..excess);
                Step::Pending
            }
            Phase::Accumulating { payload, .. } => {
                payload.extend_from_slice(chunk);
                self.scan_for_end()
            }
            Phase::Done => Step::Pending,
        }
    }

    /// Bytes currently held: the boundary tail while seeking, the payload
    /// so far while accumulating.
    pub fn buffered(&self) -> usize {
        match &self.phase {
            Phase::SeekingStart { tail } => tail.len(),
            Phase::Accumulating { payload, .. } => payload.len(),
            Phase::Done => 0,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self.phase, Phase::Done)
    }

    /// The error to report when the stream ends in the current phase.
    pub fn end_of_stream(self) -> ExtractError {
        match self.phase {
            Phase::SeekingStart { .. } => ExtractError::StartNotFound,
            Phase::Accumulating { .. } | Phase::Done => ExtractError::EndNotFound,
        }
    }

    fn scan_for_end(&mut self) -> Step {
        let Phase::Accumulating { payload, scanned } = &mut self.phase else {
            return Step::Pending;
        };
        let from = scanned.saturating_sub(self.end.len().saturating_sub(1));
        match find(&payload[from..], self.end) {
            Some(pos) => {
                let mut payload = std::mem::take(payload);
                payload.truncate(from + pos);
                self.phase = Phase::Done;
                Step::Complete(payload)
            }
            None => {
                *scanned = payload.len();
                Step::Pending
            }
        }
    }
}

/// Extract the bytes strictly between `start` and `end` from `stream`,
/// reading [`DEFAULT_CHUNK_SIZE`] bytes at a time.
///
/// # Errors
///
/// [`ExtractError::StartNotFound`] / [`ExtractError::EndNotFound`] if the
/// stream ends before the respective sentinel, [`ExtractError::Read`] if the
/// stream itself fails.
pub fn extract<R: Read>(stream: R, start: &[u8], end: &[u8]) -> Result<Vec<u8>, ExtractError> {
    extract_with_chunk_size(stream, start, end, DEFAULT_CHUNK_SIZE)
}

/// [`extract`] with an explicit chunk size.
///
/// A chunk shorter than `chunk_size` marks the end of the stream; no read is
/// issued after it.
pub fn extract_with_chunk_size<R: Read>(
    mut stream: R,
    start: &[u8],
    end: &[u8],
    chunk_size: usize,
) -> Result<Vec<u8>, ExtractError> {
    if chunk_size == 0 {
        return Err(ExtractError::InvalidChunkSize);
    }

    let mut extractor = Extractor::new(start, end);
    let mut buf = vec![0u8; chunk_size];
    let mut chunks = 0usize;
    loop {
        let n = read_chunk(&mut stream, &mut buf)?;
        chunks += 1;
        if let Step::Complete(payload) = extractor.feed(&buf[..n]) {
            debug!(chunks, bytes = payload.len(), "extracted payload");
            return Ok(payload);
        }
        if n < chunk_size {
            break;
        }
    }
    debug!(chunks, "stream ended before payload was complete");
    Err(extractor.end_of_stream())
}

/// Fill `buf` from `reader`, stopping early only at end of input.
fn read_chunk<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
