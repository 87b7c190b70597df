//! Top-level bundle, unbundle and list operations
//!
//! These own all file I/O: inputs are slurped whole (containers borrow
//! them read-only), outputs are seekable files. One operation per config;
//! no state survives an operation.

use crate::container::create_container;
use fatbundle_core::{is_code_object_compatible, BundlerConfig, Error, OffloadTarget, Result};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Read an input file, with `-` meaning standard input.
pub(crate) fn read_input(path: &Path) -> Result<Vec<u8>> {
    if path == Path::new("-") {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .map_err(|e| Error::file_io(path, e))?;
        return Ok(buf);
    }
    fs::read(path).map_err(|e| Error::file_io(path, e))
}

fn create_output(path: &Path) -> Result<File> {
    File::create(path).map_err(|e| Error::file_io(path, e))
}

/// Bundle one input per requested target into a single container file.
pub fn bundle_files(config: &BundlerConfig) -> Result<()> {
    if config.target_names.is_empty() {
        return Err(Error::InvalidArgument("no targets to bundle for".into()));
    }
    if config.input_file_names.len() != config.target_names.len() {
        return Err(Error::InvalidArgument(
            "number of inputs does not match the number of targets".into(),
        ));
    }
    let output_path = config
        .output_file_names
        .first()
        .ok_or_else(|| Error::InvalidArgument("bundling requires one output file".into()))?;

    let mut output = create_output(output_path)?;

    let mut inputs: Vec<Vec<u8>> = Vec::with_capacity(config.input_file_names.len());
    for path in &config.input_file_names {
        inputs.push(read_input(path)?);
    }

    // The host input decides the container flavor for probed types.
    let reference = if config.allow_no_host {
        0
    } else {
        config
            .host_input_index
            .ok_or_else(|| Error::InvalidArgument("host input index undefined".into()))?
    };
    let mut handler = create_container(&inputs[reference], config)?;

    handler.write_header(&mut output, &inputs)?;
    for (target, input) in config.target_names.iter().zip(&inputs) {
        handler.write_bundle_start(&mut output, target)?;
        handler.write_bundle(&mut output, input)?;
        handler.write_bundle_end(&mut output, target)?;
    }
    Ok(())
}

/// Extract the bundle for each requested target into its output file.
pub fn unbundle_files(config: &BundlerConfig) -> Result<()> {
    if config.output_file_names.len() != config.target_names.len() {
        return Err(Error::InvalidArgument(
            "number of outputs does not match the number of targets".into(),
        ));
    }
    let input_path = config
        .input_file_names
        .first()
        .ok_or_else(|| Error::InvalidArgument("unbundling requires one input file".into()))?;

    let input = read_input(input_path)?;
    let mut handler = create_container(&input, config)?;
    handler.read_header(&input)?;

    // Worklist of still-unmatched (target, output) pairs, in request
    // order. Each bundle goes to the first compatible entry.
    let mut worklist: Vec<(String, PathBuf)> = config
        .target_names
        .iter()
        .cloned()
        .zip(config.output_file_names.iter().cloned())
        .collect();
    let total = worklist.len();
    let mut found_host = false;

    while !worklist.is_empty() {
        let Some(id) = handler.read_bundle_start(&input)? else {
            break;
        };
        let code_object = OffloadTarget::parse(&id);

        let matched = worklist.iter().position(|(target, _)| {
            is_code_object_compatible(&code_object, &OffloadTarget::parse(target), config)
        });
        let Some(index) = matched else {
            continue;
        };

        let (_, output_path) = worklist.remove(index);
        let mut output = create_output(&output_path)?;
        handler.read_bundle(&mut output, &input)?;
        handler.read_bundle_end(&input)?;

        if code_object.has_host_kind() {
            found_host = true;
        }
    }

    if !config.allow_missing_bundles && !worklist.is_empty() {
        let missing = worklist.into_iter().map(|(t, _)| t).collect();
        return Err(Error::MissingBundles(missing));
    }

    // Nothing matched at all: the input is a raw host artifact. Host
    // targets get a copy of it, everything else an empty file.
    if worklist.len() == total {
        for (target, output_path) in &worklist {
            if OffloadTarget::parse(target).has_host_kind() {
                fs::write(output_path, &input).map_err(|e| Error::file_io(output_path, e))?;
            } else {
                create_output(output_path)?;
            }
        }
        return Ok(());
    }

    if !(found_host || config.host_input_index.is_none() || config.allow_missing_bundles) {
        return Err(Error::MissingHostBundle);
    }

    // Whatever targets remain get empty outputs.
    for (_, output_path) in &worklist {
        create_output(output_path)?;
    }
    Ok(())
}

/// Write every bundle id found in `input_path` to `out`, one per line.
pub fn list_bundle_ids<W: Write>(
    input_path: &Path,
    config: &BundlerConfig,
    out: &mut W,
) -> Result<()> {
    let input = read_input(input_path)?;
    let mut handler = create_container(&input, config)?;
    handler.list_bundle_ids(out, &input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundle_rejects_mismatched_counts() {
        let config = BundlerConfig {
            target_names: vec!["host-x86_64-unknown-linux-gnu-".into()],
            input_file_names: vec![],
            output_file_names: vec![PathBuf::from("/dev/null")],
            files_type: "bc".into(),
            host_input_index: Some(0),
            ..BundlerConfig::default()
        };
        assert!(matches!(
            bundle_files(&config),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_bundle_requires_host_index() {
        let config = BundlerConfig {
            target_names: vec!["openmp-amdgcn-amd-amdhsa--gfx906".into()],
            input_file_names: vec![PathBuf::from("/dev/null")],
            output_file_names: vec![PathBuf::from("/dev/null")],
            files_type: "bc".into(),
            host_input_index: None,
            allow_no_host: false,
            ..BundlerConfig::default()
        };
        assert!(matches!(
            bundle_files(&config),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_unbundle_rejects_mismatched_counts() {
        let config = BundlerConfig {
            target_names: vec!["host-x86_64-unknown-linux-gnu-".into()],
            input_file_names: vec![PathBuf::from("/dev/null")],
            output_file_names: vec![],
            files_type: "bc".into(),
            ..BundlerConfig::default()
        };
        assert!(matches!(
            unbundle_files(&config),
            Err(Error::InvalidArgument(_))
        ));
    }
}
