//! Fat object container
//!
//! Bundles live in sections whose name starts with the offload magic; the
//! id is the remainder of the section name. The host entry is special: its
//! section holds a single zero byte and the real host artifact is the fat
//! object itself, so extracting the host bundle copies the whole input.
//!
//! Writing is delegated to an external objcopy-equivalent tool that
//! injects one `readonly,exclude`-flagged section per input into the host
//! object. Nothing is emitted until the last input's `write_bundle_end`,
//! which composes and runs the tool invocation.

use fatbundle_core::{BundlerConfig, Error, Result, OFFLOAD_BUNDLER_MAGIC};
use goblin::elf::Elf;
use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

/// Handler for bundles stored as sections of an ELF object.
#[derive(Debug)]
pub struct ObjectHandler<'a> {
    config: &'a BundlerConfig,
    elf: Elf<'a>,
    /// Next section to examine.
    next_section: usize,
    /// Section holding the bundle being read.
    current_section: Option<usize>,
    /// Total number of inputs declared by `write_header`.
    num_inputs: usize,
    /// Inputs already passed through `write_bundle_start`. The objcopy
    /// invocation fires when this reaches `num_inputs`, so writes must
    /// not be reordered.
    num_processed: usize,
}

impl<'a> ObjectHandler<'a> {
    pub fn new(elf: Elf<'a>, config: &'a BundlerConfig) -> Self {
        ObjectHandler {
            config,
            elf,
            next_section: 0,
            current_section: None,
            num_inputs: 0,
            num_processed: 0,
        }
    }

    pub fn read_header(&mut self, _input: &[u8]) -> Result<()> {
        self.next_section = 0;
        self.current_section = None;
        Ok(())
    }

    pub fn read_bundle_start(&mut self, _input: &[u8]) -> Result<Option<String>> {
        while self.next_section < self.elf.section_headers.len() {
            let section = self.next_section;
            self.next_section += 1;

            let header = &self.elf.section_headers[section];
            let Some(name) = self.elf.shdr_strtab.get_at(header.sh_name) else {
                continue;
            };
            if let Some(id) = name.strip_prefix(OFFLOAD_BUNDLER_MAGIC) {
                self.current_section = Some(section);
                return Ok(Some(id.to_string()));
            }
        }
        Ok(None)
    }

    pub fn read_bundle<W: Write>(&mut self, out: &mut W, input: &[u8]) -> Result<()> {
        let section = self
            .current_section
            .ok_or_else(|| Error::InvalidArgument("no current bundle".into()))?;
        let header = &self.elf.section_headers[section];
        let contents = header
            .file_range()
            .and_then(|range| input.get(range))
            .unwrap_or(&[]);

        // A single zero byte marks the host placeholder; the payload is
        // the fat object itself.
        if contents == [0u8] {
            out.write_all(input)?;
        } else {
            out.write_all(contents)?;
        }
        Ok(())
    }

    pub fn read_bundle_end(&mut self, _input: &[u8]) -> Result<()> {
        Ok(())
    }

    pub fn write_header<W: Write>(&mut self, _out: &mut W, inputs: &[Vec<u8>]) -> Result<()> {
        if self.config.host_input_index.is_none() {
            return Err(Error::InvalidArgument(
                "fat objects cannot be bundled without a host input".into(),
            ));
        }
        self.num_inputs = inputs.len();
        self.num_processed = 0;
        Ok(())
    }

    pub fn write_bundle_start<W: Write>(&mut self, _out: &mut W, _target: &str) -> Result<()> {
        if self.num_processed >= self.num_inputs {
            return Err(Error::InvalidArgument(
                "more bundle writes than declared inputs".into(),
            ));
        }
        self.num_processed += 1;
        Ok(())
    }

    pub fn write_bundle<W: Write>(&mut self, _out: &mut W, _input: &[u8]) -> Result<()> {
        Ok(())
    }

    pub fn write_bundle_end<W: Write>(&mut self, _out: &mut W, _target: &str) -> Result<()> {
        if self.num_processed != self.num_inputs {
            return Ok(());
        }
        self.run_objcopy()
    }

    /// Compose and run the section-injection command for all inputs. The
    /// host input is swapped for a one-zero-byte placeholder file that
    /// lives in `temp_files` until the tool has finished.
    fn run_objcopy(&self) -> Result<()> {
        let host_index = self
            .config
            .host_input_index
            .ok_or_else(|| Error::InvalidArgument("host input index undefined".into()))?;
        let output = self.config.output_file_names.first().ok_or_else(|| {
            Error::InvalidArgument("object bundling requires an output file".into())
        })?;

        let mut temp_files: Vec<NamedTempFile> = Vec::new();
        let mut args: Vec<String> = Vec::new();

        for (index, target) in self.config.target_names.iter().enumerate() {
            let input_file = if index == host_index {
                let placeholder = make_placeholder()?;
                let path = placeholder.path().display().to_string();
                temp_files.push(placeholder);
                path
            } else {
                self.config.input_file_names[index].display().to_string()
            };

            args.push(format!(
                "--add-section={OFFLOAD_BUNDLER_MAGIC}{target}={input_file}"
            ));
            args.push(format!(
                "--set-section-flags={OFFLOAD_BUNDLER_MAGIC}{target}=readonly,exclude"
            ));
        }
        args.push("--".to_string());
        args.push(self.config.input_file_names[host_index].display().to_string());
        args.push(output.display().to_string());

        let objcopy = &self.config.objcopy_path;
        if self.config.print_external_commands {
            let mut line = format!("\"{}\"", objcopy.display());
            for arg in &args {
                line.push_str(&format!(" \"{arg}\""));
            }
            eprintln!("{line}");
            return Ok(());
        }

        let status = Command::new(objcopy)
            .args(&args)
            .status()
            .map_err(|e| Error::file_io(objcopy.clone(), e))?;
        if !status.success() {
            return Err(Error::ExternalTool(objcopy.display().to_string()));
        }
        Ok(())
    }
}

fn make_placeholder() -> Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("fatbundle")
        .suffix(".tmp")
        .tempfile()?;
    file.write_all(&[0u8])?;
    file.flush()?;
    Ok(file)
}

/// Probe `input` as an ELF object. Non-object inputs (and non-ELF
/// objects) are handled by the binary container instead.
pub fn parse_object(input: &[u8]) -> Option<Elf<'_>> {
    match goblin::Object::parse(input) {
        Ok(goblin::Object::Elf(elf)) => Some(elf),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_object_is_rejected() {
        assert!(parse_object(b"not an object").is_none());
        assert!(parse_object(&[]).is_none());
        // A binary container is not an object file either.
        let mut bundled = OFFLOAD_BUNDLER_MAGIC.as_bytes().to_vec();
        bundled.extend_from_slice(&[0u8; 8]);
        assert!(parse_object(&bundled).is_none());
    }

    #[test]
    fn test_placeholder_is_one_zero_byte() {
        let file = make_placeholder().unwrap();
        let contents = std::fs::read(file.path()).unwrap();
        assert_eq!(contents, [0u8]);
    }
}
