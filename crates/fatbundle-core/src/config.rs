//! Per-operation bundler configuration

use std::path::PathBuf;

/// Immutable configuration for one bundle/unbundle/list operation.
///
/// `target_names`, `input_file_names` and `output_file_names` are aligned
/// positionally: bundling pairs target *i* with input *i*, unbundling
/// pairs target *i* with output *i*.
#[derive(Debug, Clone)]
pub struct BundlerConfig {
    /// Requested bundle entry ids, in order.
    pub target_names: Vec<String>,
    /// Input paths; `-` means standard input.
    pub input_file_names: Vec<PathBuf>,
    /// Output paths.
    pub output_file_names: Vec<PathBuf>,
    /// Index of the host entry in `target_names`, if any.
    pub host_input_index: Option<usize>,
    /// File type selecting the container flavor (`o`, `bc`, `ll`, ...).
    pub files_type: String,
    /// Power-of-two alignment applied to binary-container payloads.
    pub bundle_alignment: u64,
    /// Allow HIP bundles to satisfy OpenMP requests and vice versa.
    pub hip_openmp_compatible: bool,
    /// Missing targets yield empty outputs instead of errors.
    pub allow_missing_bundles: bool,
    /// Permit bundling without a host entry.
    pub allow_no_host: bool,
    /// Print the objcopy command instead of running it.
    pub print_external_commands: bool,
    /// Section-injection tool used by the object container.
    pub objcopy_path: PathBuf,
}

impl Default for BundlerConfig {
    fn default() -> Self {
        BundlerConfig {
            target_names: Vec::new(),
            input_file_names: Vec::new(),
            output_file_names: Vec::new(),
            host_input_index: None,
            files_type: String::new(),
            bundle_alignment: 1,
            hip_openmp_compatible: false,
            allow_missing_bundles: false,
            allow_no_host: false,
            print_external_commands: false,
            objcopy_path: PathBuf::from("llvm-objcopy"),
        }
    }
}
