//! Uniform container contract and file-type dispatch
//!
//! The three physically distinct container representations share one
//! operational contract. The set is closed (bounded by the file-type
//! dispatch table), so the dispatch is a tagged union rather than an open
//! trait hierarchy.

use crate::binary::BinaryHandler;
use crate::object::{parse_object, ObjectHandler};
use crate::text::TextHandler;
use fatbundle_core::{BundlerConfig, Error, Result};
use std::io::{Seek, Write};

/// A container handler bound to one input's representation.
///
/// `read_header` must be called once before any read; writes go
/// `write_header`, then `write_bundle_start`/`write_bundle`/
/// `write_bundle_end` per entry, in the order the targets were declared.
#[derive(Debug)]
pub enum Container<'a> {
    Binary(BinaryHandler<'a>),
    Object(Box<ObjectHandler<'a>>),
    Text(TextHandler),
}

impl<'a> Container<'a> {
    /// Populate the index (indexed formats) or reset the cursor.
    pub fn read_header(&mut self, input: &[u8]) -> Result<()> {
        match self {
            Container::Binary(h) => h.read_header(input),
            Container::Object(h) => h.read_header(input),
            Container::Text(h) => h.read_header(input),
        }
    }

    /// Next bundle's id, or `None` when there are no more bundles.
    pub fn read_bundle_start(&mut self, input: &[u8]) -> Result<Option<String>> {
        match self {
            Container::Binary(h) => h.read_bundle_start(input),
            Container::Object(h) => h.read_bundle_start(input),
            Container::Text(h) => h.read_bundle_start(input),
        }
    }

    /// Copy the current bundle's payload into `out`.
    pub fn read_bundle<W: Write>(&mut self, out: &mut W, input: &[u8]) -> Result<()> {
        match self {
            Container::Binary(h) => h.read_bundle(out, input),
            Container::Object(h) => h.read_bundle(out, input),
            Container::Text(h) => h.read_bundle(out, input),
        }
    }

    /// Advance past the current bundle.
    pub fn read_bundle_end(&mut self, input: &[u8]) -> Result<()> {
        match self {
            Container::Binary(h) => h.read_bundle_end(input),
            Container::Object(h) => h.read_bundle_end(input),
            Container::Text(h) => h.read_bundle_end(input),
        }
    }

    /// Write the container preamble; indexed formats precompute offsets
    /// here from the input sizes.
    pub fn write_header<W: Write>(&mut self, out: &mut W, inputs: &[Vec<u8>]) -> Result<()> {
        match self {
            Container::Binary(h) => h.write_header(out, inputs),
            Container::Object(h) => h.write_header(out, inputs),
            Container::Text(h) => h.write_header(out, inputs),
        }
    }

    pub fn write_bundle_start<W: Write>(&mut self, out: &mut W, target: &str) -> Result<()> {
        match self {
            Container::Binary(h) => h.write_bundle_start(out, target),
            Container::Object(h) => h.write_bundle_start(out, target),
            Container::Text(h) => h.write_bundle_start(out, target),
        }
    }

    pub fn write_bundle<W: Write + Seek>(&mut self, out: &mut W, input: &[u8]) -> Result<()> {
        match self {
            Container::Binary(h) => h.write_bundle(out, input),
            Container::Object(h) => h.write_bundle(out, input),
            Container::Text(h) => h.write_bundle(out, input),
        }
    }

    pub fn write_bundle_end<W: Write>(&mut self, out: &mut W, target: &str) -> Result<()> {
        match self {
            Container::Binary(h) => h.write_bundle_end(out, target),
            Container::Object(h) => h.write_bundle_end(out, target),
            Container::Text(h) => h.write_bundle_end(out, target),
        }
    }

    /// Iterate every bundle and emit its id, one per line.
    pub fn list_bundle_ids<W: Write>(&mut self, out: &mut W, input: &[u8]) -> Result<()> {
        self.read_header(input)?;
        while let Some(id) = self.read_bundle_start(input)? {
            writeln!(out, "{id}")?;
            // Skip the payload so its bytes are never scanned for
            // markers.
            self.read_bundle_end(input)?;
        }
        Ok(())
    }
}

/// Select a container from the configured file type, probing the input
/// where the table requires it.
pub fn create_container<'a>(input: &'a [u8], config: &'a BundlerConfig) -> Result<Container<'a>> {
    match config.files_type.as_str() {
        "i" | "ii" | "cui" | "hipi" => Ok(Container::Text(TextHandler::new("//"))),
        // TODO: drop "d" once dependency files stop being bundled by the
        // offload driver.
        "d" => Ok(Container::Text(TextHandler::new("#"))),
        "ll" => Ok(Container::Text(TextHandler::new(";"))),
        "s" => Ok(Container::Text(TextHandler::new("#"))),
        "f95" => Ok(Container::Text(TextHandler::new("!"))),
        "bc" | "gch" | "ast" => Ok(Container::Binary(BinaryHandler::new(config))),
        // Objects and archives are probed: anything that does not parse
        // as a recognized object file is handled as a binary container.
        "o" | "a" => Ok(match parse_object(input) {
            Some(elf) => Container::Object(Box::new(ObjectHandler::new(elf, config))),
            None => Container::Binary(BinaryHandler::new(config)),
        }),
        other => Err(Error::InvalidFileType(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(files_type: &str) -> BundlerConfig {
        BundlerConfig {
            files_type: files_type.to_string(),
            ..BundlerConfig::default()
        }
    }

    #[test]
    fn test_text_dispatch() {
        for ty in ["i", "ii", "cui", "hipi", "d", "ll", "s", "f95"] {
            assert!(matches!(
                create_container(b"", &config(ty)),
                Ok(Container::Text(_))
            ));
        }
    }

    #[test]
    fn test_binary_dispatch() {
        for ty in ["bc", "gch", "ast"] {
            assert!(matches!(
                create_container(b"", &config(ty)),
                Ok(Container::Binary(_))
            ));
        }
    }

    #[test]
    fn test_object_falls_back_to_binary() {
        // Not a parseable object, so "o" degrades to the binary handler.
        assert!(matches!(
            create_container(b"plain bytes", &config("o")),
            Ok(Container::Binary(_))
        ));
        assert!(matches!(
            create_container(b"!<arch>\n", &config("a")),
            Ok(Container::Binary(_))
        ));
    }

    #[test]
    fn test_unknown_type_is_invalid() {
        let err = create_container(b"", &config("exe")).unwrap_err();
        assert_eq!(err.to_string(), "'exe': invalid file type specified");
    }

    #[test]
    fn test_list_bundle_ids_text() {
        let mut file = Vec::new();
        let mut writer = TextHandler::new(";");
        for (target, payload) in [("T1", b"x\n".as_slice()), ("T2", b"y\n")] {
            writer.write_bundle_start(&mut file, target).unwrap();
            writer.write_bundle(&mut file, payload).unwrap();
            writer.write_bundle_end(&mut file, target).unwrap();
        }

        let config = config("ll");
        let mut container = create_container(&file, &config).unwrap();
        let mut out = Vec::new();
        container.list_bundle_ids(&mut out, &file).unwrap();
        assert_eq!(out, b"T1\nT2\n");
    }
}
