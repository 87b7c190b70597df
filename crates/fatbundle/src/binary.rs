//! Self-describing binary container
//!
//! Layout (all integers little-endian, no padding unless aligned):
//!
//! ```text
//! "__CLANG_OFFLOAD_BUNDLE__"        (24-byte ASCII magic)
//! NumberOfBundles                   (u64)
//!   OffsetOfBundle1                 (u64)   ── repeated N times ──
//!   SizeOfBundle1                   (u64)
//!   TripleLen1                      (u64)
//!   Triple1                         (TripleLen1 bytes, not NUL-terminated)
//! Bundle1 .. BundleN                (each aligned to bundle_alignment)
//! ```
//!
//! The reader is deliberately forgiving: a file without the magic, or with
//! any truncated or inconsistent header field, is treated as a plain file
//! carrying zero bundles rather than as a corrupt container. That keeps
//! "unbundle a non-bundled file" working as a host-artifact copy.

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use fatbundle_core::{BundlerConfig, Error, Result, OFFLOAD_BUNDLER_MAGIC};
use std::io::{Seek, SeekFrom, Write};

/// One entry of the bundle index, in header order.
#[derive(Debug, Clone)]
struct BinaryEntry {
    id: String,
    offset: u64,
    size: u64,
}

/// Handler for the binary container format.
#[derive(Debug)]
pub struct BinaryHandler<'a> {
    config: &'a BundlerConfig,
    /// Index parsed from the header (reading) or precomputed (writing).
    entries: Vec<BinaryEntry>,
    /// Next entry to hand out from `read_bundle_start`.
    next: usize,
    /// Entry being read or written.
    current: Option<usize>,
}

impl<'a> BinaryHandler<'a> {
    pub fn new(config: &'a BundlerConfig) -> Self {
        BinaryHandler {
            config,
            entries: Vec::new(),
            next: 0,
            current: None,
        }
    }

    pub fn read_header(&mut self, input: &[u8]) -> Result<()> {
        self.next = 0;
        self.current = None;
        self.entries = match parse_header(input)? {
            Some(entries) => entries,
            None => {
                log::debug!("no usable bundle header, treating input as a plain file");
                Vec::new()
            }
        };
        Ok(())
    }

    pub fn read_bundle_start(&mut self, _input: &[u8]) -> Result<Option<String>> {
        if self.next >= self.entries.len() {
            return Ok(None);
        }
        self.current = Some(self.next);
        self.next += 1;
        Ok(Some(self.entries[self.next - 1].id.clone()))
    }

    pub fn read_bundle<W: Write>(&mut self, out: &mut W, input: &[u8]) -> Result<()> {
        let entry = self.current_entry()?;
        let start = entry.offset as usize;
        let end = start + entry.size as usize;
        let payload = input
            .get(start..end)
            .ok_or_else(|| Error::InvalidArgument("bundle extends past end of input".into()))?;
        out.write_all(payload)?;
        Ok(())
    }

    pub fn read_bundle_end(&mut self, _input: &[u8]) -> Result<()> {
        self.current_entry()?;
        Ok(())
    }

    /// Emits the full header and records where each payload will go. The
    /// running cursor starts at the exact header size and is rounded up
    /// to the configured alignment before every entry.
    pub fn write_header<W: Write>(&mut self, out: &mut W, inputs: &[Vec<u8>]) -> Result<()> {
        let magic = OFFLOAD_BUNDLER_MAGIC.as_bytes();

        let mut header_size = magic.len() as u64 + 8;
        for target in &self.config.target_names {
            header_size += 3 * 8 + target.len() as u64;
        }

        out.write_all(magic)?;
        out.write_u64::<LittleEndian>(self.config.target_names.len() as u64)?;

        self.entries.clear();
        for (target, input) in self.config.target_names.iter().zip(inputs) {
            if self.entries.iter().any(|e| e.id == *target) {
                return Err(Error::DuplicateBundle(target.clone()));
            }
            header_size = align_to(header_size, self.config.bundle_alignment);
            out.write_u64::<LittleEndian>(header_size)?;
            out.write_u64::<LittleEndian>(input.len() as u64)?;
            self.entries.push(BinaryEntry {
                id: target.clone(),
                offset: header_size,
                size: input.len() as u64,
            });
            header_size += input.len() as u64;
            out.write_u64::<LittleEndian>(target.len() as u64)?;
            out.write_all(target.as_bytes())?;
        }
        Ok(())
    }

    pub fn write_bundle_start<W: Write>(&mut self, _out: &mut W, target: &str) -> Result<()> {
        let idx = self
            .entries
            .iter()
            .position(|e| e.id == target)
            .ok_or_else(|| {
                Error::InvalidArgument(format!("'{target}' was not declared in the header"))
            })?;
        self.current = Some(idx);
        Ok(())
    }

    /// Payloads are written through absolute seeks to the offsets the
    /// header committed, so header and payload sequencing are
    /// order-independent.
    pub fn write_bundle<W: Write + Seek>(&mut self, out: &mut W, input: &[u8]) -> Result<()> {
        let entry = self.current_entry()?;
        let offset = entry.offset;
        out.seek(SeekFrom::Start(offset))?;
        out.write_all(input)?;
        Ok(())
    }

    pub fn write_bundle_end<W: Write>(&mut self, _out: &mut W, _target: &str) -> Result<()> {
        Ok(())
    }

    fn current_entry(&self) -> Result<&BinaryEntry> {
        self.current
            .and_then(|i| self.entries.get(i))
            .ok_or_else(|| Error::InvalidArgument("no current bundle".into()))
    }
}

/// Parse the bundle index. `Ok(None)` means the input is not a usable
/// container (missing magic, truncated header, inconsistent offsets) and
/// must be treated as a plain file.
fn parse_header(input: &[u8]) -> Result<Option<Vec<BinaryEntry>>> {
    let magic = OFFLOAD_BUNDLER_MAGIC.as_bytes();
    if input.len() < magic.len() || &input[..magic.len()] != magic {
        return Ok(None);
    }
    let mut pos = magic.len();

    let Some(count) = read_u64_at(input, pos) else {
        return Ok(None);
    };
    pos += 8;

    let mut entries: Vec<BinaryEntry> = Vec::new();
    for _ in 0..count {
        let Some(offset) = read_u64_at(input, pos) else {
            return Ok(None);
        };
        pos += 8;
        let Some(size) = read_u64_at(input, pos) else {
            return Ok(None);
        };
        pos += 8;
        let Some(id_len) = read_u64_at(input, pos).and_then(|v| usize::try_from(v).ok()) else {
            return Ok(None);
        };
        pos += 8;
        let Some(id_bytes) = pos.checked_add(id_len).and_then(|end| input.get(pos..end)) else {
            return Ok(None);
        };
        pos += id_len;
        let Ok(id) = std::str::from_utf8(id_bytes) else {
            return Ok(None);
        };

        // Zero offsets and ranges past EOF mean this is not a container.
        let in_bounds = offset
            .checked_add(size)
            .is_some_and(|end| end <= input.len() as u64);
        if offset == 0 || !in_bounds {
            return Ok(None);
        }

        if entries.iter().any(|e| e.id == id) {
            return Err(Error::DuplicateBundle(id.to_string()));
        }
        entries.push(BinaryEntry {
            id: id.to_string(),
            offset,
            size,
        });
    }
    Ok(Some(entries))
}

fn read_u64_at(buf: &[u8], pos: usize) -> Option<u64> {
    buf.get(pos..pos + 8).map(LittleEndian::read_u64)
}

/// Round `offset` up to `alignment` (a power of two; 0/1 leave it as is).
fn align_to(offset: u64, alignment: u64) -> u64 {
    if alignment <= 1 {
        return offset;
    }
    (offset + alignment - 1) / alignment * alignment
}
