//! Comment-delimited text container
//!
//! Bundles are framed by marker lines in the host language's line-comment
//! syntax:
//!
//! ```text
//! <comment>  __CLANG_OFFLOAD_BUNDLE__ __START__ <id>
//! <payload bytes>
//! <comment>  __CLANG_OFFLOAD_BUNDLE__ __END__ <id>
//! ```
//!
//! There is no index; bundles are discovered by scanning forward from a
//! byte cursor. A missing end marker is tolerated for the last bundle,
//! whose payload then runs to end of input.

use fatbundle_core::{Result, OFFLOAD_BUNDLER_MAGIC};
use std::io::Write;

/// Handler for text containers, parameterized by the comment prefix.
#[derive(Debug)]
pub struct TextHandler {
    start_marker: String,
    end_marker: String,
    /// Byte cursor into the input.
    pos: usize,
}

impl TextHandler {
    pub fn new(comment: &str) -> Self {
        TextHandler {
            start_marker: format!("\n{comment}  {OFFLOAD_BUNDLER_MAGIC} __START__ "),
            end_marker: format!("\n{comment}  {OFFLOAD_BUNDLER_MAGIC} __END__ "),
            pos: 0,
        }
    }

    pub fn read_header(&mut self, _input: &[u8]) -> Result<()> {
        self.pos = 0;
        Ok(())
    }

    /// Scan for the next start marker; the id is the rest of that line.
    /// No further start marker (or an unterminated one) means end of
    /// bundles.
    pub fn read_bundle_start(&mut self, input: &[u8]) -> Result<Option<String>> {
        let Some(marker) = find(input, self.start_marker.as_bytes(), self.pos) else {
            return Ok(None);
        };
        let id_start = marker + self.start_marker.len();
        let Some(id_end) = find(input, b"\n", id_start) else {
            return Ok(None);
        };
        self.pos = id_end + 1;
        Ok(Some(
            String::from_utf8_lossy(&input[id_start..id_end]).into_owned(),
        ))
    }

    pub fn read_bundle<W: Write>(&mut self, out: &mut W, input: &[u8]) -> Result<()> {
        let end = find(input, self.end_marker.as_bytes(), self.pos).unwrap_or(input.len());
        out.write_all(&input[self.pos..end])?;
        self.pos = end;
        Ok(())
    }

    /// Advance past the end-marker line. Also safe to call without
    /// `read_bundle`, in which case it skips the current payload, so
    /// listing never mistakes payload bytes for a start marker.
    pub fn read_bundle_end(&mut self, input: &[u8]) -> Result<()> {
        let Some(marker) = find(input, self.end_marker.as_bytes(), self.pos) else {
            self.pos = input.len();
            return Ok(());
        };
        match find(input, b"\n", marker + self.end_marker.len()) {
            Some(line_end) => self.pos = line_end + 1,
            None => self.pos = input.len(),
        }
        Ok(())
    }

    pub fn write_header<W: Write>(&mut self, _out: &mut W, _inputs: &[Vec<u8>]) -> Result<()> {
        Ok(())
    }

    pub fn write_bundle_start<W: Write>(&mut self, out: &mut W, target: &str) -> Result<()> {
        writeln!(out, "{}{}", self.start_marker, target)?;
        Ok(())
    }

    pub fn write_bundle<W: Write>(&mut self, out: &mut W, input: &[u8]) -> Result<()> {
        out.write_all(input)?;
        Ok(())
    }

    pub fn write_bundle_end<W: Write>(&mut self, out: &mut W, target: &str) -> Result<()> {
        writeln!(out, "{}{}", self.end_marker, target)?;
        Ok(())
    }
}

/// First occurrence of `needle` in `haystack` at or after `from`.
fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}
