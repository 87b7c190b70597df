//! fatbundle CLI - Bundle and unbundle multi-target offload artifacts
//!
//! The driver owns configuration validation; the container and matching
//! logic live in the `fatbundle` crate.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use fatbundle_core::{BundlerConfig, OffloadTarget};
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fatbundle")]
#[command(author, version, about = "Bundle and unbundle multi-target offload artifacts")]
#[command(
    long_about = "fatbundle packages compiled artifacts produced for distinct compute targets \
(host CPU, GPUs, accelerators) from one translation unit into a single container file, \
extracts them again, and splits heterogeneous archives into per-target archives."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bundle one input per target into a single container file
    Bundle {
        /// File type of the inputs (i, ii, cui, hipi, d, ll, bc, s, o, a, gch, ast, f95)
        #[arg(long = "type", value_name = "TYPE")]
        files_type: String,

        /// Bundle entry ids, comma separated, aligned with --inputs
        #[arg(long, value_delimiter = ',', required = true)]
        targets: Vec<String>,

        /// Input files ('-' reads standard input)
        #[arg(long, value_delimiter = ',', required = true)]
        inputs: Vec<PathBuf>,

        /// Output container file
        #[arg(short, long)]
        output: PathBuf,

        /// Byte alignment for binary-container payloads (power of two)
        #[arg(long, default_value = "1")]
        bundle_align: u64,

        /// Allow bundling without a host target
        #[arg(long)]
        allow_no_host: bool,

        /// Print the section-injection command instead of running it
        #[arg(long)]
        print_external_commands: bool,

        /// Path of the objcopy-equivalent tool used for fat objects
        #[arg(long, default_value = "llvm-objcopy")]
        objcopy: PathBuf,
    },

    /// Extract the bundle for each requested target from a container
    Unbundle {
        /// File type of the bundled input
        #[arg(long = "type", value_name = "TYPE")]
        files_type: String,

        /// Requested targets, comma separated, aligned with --outputs
        #[arg(long, value_delimiter = ',', required = true)]
        targets: Vec<String>,

        /// Bundled input file ('-' reads standard input)
        #[arg(short, long)]
        input: PathBuf,

        /// Output files, one per target
        #[arg(long, value_delimiter = ',', required = true)]
        outputs: Vec<PathBuf>,

        /// Create empty outputs for targets with no bundle
        #[arg(long)]
        allow_missing_bundles: bool,

        /// Let HIP bundles satisfy OpenMP requests and vice versa
        #[arg(long)]
        hip_openmp_compatible: bool,
    },

    /// List the bundle ids found in a container
    List {
        /// File type of the bundled input
        #[arg(long = "type", value_name = "TYPE")]
        files_type: String,

        /// Bundled input file ('-' reads standard input)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Split an archive of bundled objects into per-target archives
    UnbundleArchive {
        /// Requested device targets, comma separated, aligned with --outputs
        #[arg(long, value_delimiter = ',', required = true)]
        targets: Vec<String>,

        /// Input archive of bundled objects
        #[arg(short, long)]
        input: PathBuf,

        /// Output archives, one per target
        #[arg(long, value_delimiter = ',', required = true)]
        outputs: Vec<PathBuf>,

        /// Write empty archives for targets with no code objects
        #[arg(long)]
        allow_missing_bundles: bool,

        /// Let HIP bundles satisfy OpenMP requests and vice versa
        #[arg(long)]
        hip_openmp_compatible: bool,
    },
}

/// Validate the requested targets and locate the host entry. Bundling
/// requires exactly one host target unless `allow_no_host`; extraction
/// accepts any number up to one.
fn check_targets(targets: &[String], require_host: bool) -> Result<Option<usize>> {
    let mut host_index = None;
    for (index, target) in targets.iter().enumerate() {
        if targets[..index].contains(target) {
            bail!("duplicate target '{target}'");
        }
        let parsed = OffloadTarget::parse(target);
        if !parsed.is_kind_valid() {
            bail!("invalid offload kind in target '{target}'");
        }
        if !parsed.is_triple_valid() {
            bail!("invalid target triple in target '{target}'");
        }
        if parsed.has_host_kind() {
            if host_index.is_some() {
                bail!("expecting exactly one host target but got more");
            }
            host_index = Some(index);
        }
    }
    if require_host && host_index.is_none() {
        bail!("expecting exactly one host target but got none");
    }
    Ok(host_index)
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Bundle {
            files_type,
            targets,
            inputs,
            output,
            bundle_align,
            allow_no_host,
            print_external_commands,
            objcopy,
        } => {
            if inputs.len() != targets.len() {
                bail!(
                    "expected {} input files but got {}",
                    targets.len(),
                    inputs.len()
                );
            }
            if !bundle_align.is_power_of_two() {
                bail!("bundle alignment must be a power of two");
            }
            let host_input_index = check_targets(&targets, !allow_no_host)?;

            let config = BundlerConfig {
                target_names: targets,
                input_file_names: inputs,
                output_file_names: vec![output],
                host_input_index,
                files_type,
                bundle_alignment: bundle_align,
                allow_no_host,
                print_external_commands,
                objcopy_path: objcopy,
                ..BundlerConfig::default()
            };
            fatbundle::bundle_files(&config)?;
        }

        Commands::Unbundle {
            files_type,
            targets,
            input,
            outputs,
            allow_missing_bundles,
            hip_openmp_compatible,
        } => {
            if outputs.len() != targets.len() {
                bail!(
                    "expected {} output files but got {}",
                    targets.len(),
                    outputs.len()
                );
            }
            let host_input_index = check_targets(&targets, false)?;

            let config = BundlerConfig {
                target_names: targets,
                input_file_names: vec![input],
                output_file_names: outputs,
                host_input_index,
                files_type,
                allow_missing_bundles,
                hip_openmp_compatible,
                ..BundlerConfig::default()
            };
            fatbundle::unbundle_files(&config)?;
        }

        Commands::List { files_type, input } => {
            let config = BundlerConfig {
                files_type,
                input_file_names: vec![input.clone()],
                ..BundlerConfig::default()
            };
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            fatbundle::list_bundle_ids(&input, &config, &mut out)?;
            out.flush()?;
        }

        Commands::UnbundleArchive {
            targets,
            input,
            outputs,
            allow_missing_bundles,
            hip_openmp_compatible,
        } => {
            if outputs.len() != targets.len() {
                bail!(
                    "expected {} output archives but got {}",
                    targets.len(),
                    outputs.len()
                );
            }
            check_targets(&targets, false)?;

            let config = BundlerConfig {
                target_names: targets,
                input_file_names: vec![input],
                output_file_names: outputs,
                files_type: "a".to_string(),
                allow_missing_bundles,
                hip_openmp_compatible,
                ..BundlerConfig::default()
            };
            fatbundle::unbundle_archive(&config)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_targets_finds_host() {
        let targets = vec![
            "openmp-amdgcn-amd-amdhsa--gfx906".to_string(),
            "host-x86_64-unknown-linux-gnu-".to_string(),
        ];
        assert_eq!(check_targets(&targets, true).unwrap(), Some(1));
    }

    #[test]
    fn test_check_targets_rejects_duplicates() {
        let targets = vec![
            "host-x86_64-unknown-linux-gnu-".to_string(),
            "host-x86_64-unknown-linux-gnu-".to_string(),
        ];
        assert!(check_targets(&targets, true).is_err());
    }

    #[test]
    fn test_check_targets_rejects_unknown_kind() {
        let targets = vec!["cuda-nvptx64-nvidia-cuda-".to_string()];
        assert!(check_targets(&targets, false).is_err());
    }

    #[test]
    fn test_check_targets_requires_host_for_bundling() {
        let targets = vec!["openmp-amdgcn-amd-amdhsa--gfx906".to_string()];
        assert!(check_targets(&targets, true).is_err());
        assert_eq!(check_targets(&targets, false).unwrap(), None);
    }
}
