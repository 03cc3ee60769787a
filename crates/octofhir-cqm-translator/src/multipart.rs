//! Decoding of the translator's multipart response bodies
//!
//! The translator does not honor the boundary requested by the caller, so the
//! boundary is recovered from the response itself: its first line is the
//! literal delimiter used for the rest of the body.

use crate::error::MultipartError;

const LINE_TERMINATOR: &str = "\r\n";

/// One decoded part: the raw header block and the body below it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartPart {
    pub headers: String,
    pub body: String,
}

/// Split a raw multipart body into ordered, header-stripped parts
///
/// The first split segment (empty, preceding the first boundary) and the last
/// (the terminal `--` marker) are discarded. Each remaining segment loses its
/// leading artifact line and everything up to and including the first empty
/// line, which terminates the per-part header block.
pub fn parse_multipart(body: &str) -> Result<Vec<MultipartPart>, MultipartError> {
    let boundary = body
        .split(LINE_TERMINATOR)
        .next()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .ok_or(MultipartError::MissingBoundary)?;

    let segments: Vec<&str> = body.split(boundary).collect();
    if segments.len() < 3 {
        // Nothing between the opening boundary and the terminal marker.
        return Ok(Vec::new());
    }

    segments[1..segments.len() - 1]
        .iter()
        .enumerate()
        .map(|(index, segment)| decode_part(index, segment))
        .collect()
}

fn decode_part(index: usize, segment: &str) -> Result<MultipartPart, MultipartError> {
    let mut lines: Vec<&str> = segment.split(LINE_TERMINATOR).collect();
    while lines.last() == Some(&"") {
        lines.pop();
    }
    // The first line is always an empty artifact of the boundary split.
    if !lines.is_empty() {
        lines.remove(0);
    }

    let header_end = lines
        .iter()
        .position(|line| line.is_empty())
        .ok_or(MultipartError::MissingHeaderTerminator { index })?;

    Ok(MultipartPart {
        headers: lines[..header_end].join(LINE_TERMINATOR),
        body: lines[header_end + 1..].join(LINE_TERMINATOR),
    })
}
