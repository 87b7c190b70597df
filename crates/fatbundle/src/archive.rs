//! Splitting a heterogeneous archive into per-target archives
//!
//! The input is an `ar`-style archive whose members are bundled objects.
//! Every device bundle found in any member is fanned out to the requested
//! targets it is compatible with, and one archive per target is written.
//! Device linkers consume archives, so fanning the bundle universe out
//! this way avoids a second pass, and the synthesized member names keep
//! the source-file provenance.

use crate::bundler::read_input;
use crate::container::create_container;
use fatbundle_core::{is_code_object_compatible, BundlerConfig, Error, OffloadTarget, Result};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Archive flavor to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Gnu,
    Bsd,
}

/// The platform-default archive flavor.
pub fn host_archive_kind() -> ArchiveKind {
    if cfg!(target_os = "macos") {
        ArchiveKind::Bsd
    } else {
        ArchiveKind::Gnu
    }
}

/// One member of an archive about to be written. The buffer stays alive
/// here until the archive writer has consumed it.
#[derive(Debug, Clone)]
pub struct NewArchiveMember {
    pub name: String,
    pub data: Vec<u8>,
}

/// Write `members` to `path` as an archive of the given flavor. No
/// symbol index is emitted. An empty member list still produces a valid
/// (bare) archive so downstream linkers don't complain about a missing
/// input.
pub fn write_archive(path: &Path, members: &[NewArchiveMember], kind: ArchiveKind) -> Result<()> {
    let mut file = File::create(path).map_err(|e| Error::file_io(path, e))?;
    if members.is_empty() {
        file.write_all(b"!<arch>\n")
            .map_err(|e| Error::file_io(path, e))?;
        return Ok(());
    }

    match kind {
        ArchiveKind::Gnu => {
            let identifiers = members
                .iter()
                .map(|m| m.name.clone().into_bytes())
                .collect();
            let mut builder = ar::GnuBuilder::new(file, identifiers);
            for member in members {
                builder
                    .append(&member_header(member), member.data.as_slice())
                    .map_err(|e| Error::file_io(path, e))?;
            }
        }
        ArchiveKind::Bsd => {
            let mut builder = ar::Builder::new(file);
            for member in members {
                builder
                    .append(&member_header(member), member.data.as_slice())
                    .map_err(|e| Error::file_io(path, e))?;
            }
        }
    }
    Ok(())
}

/// Header for a synthesized member. Timestamps and ownership stay zeroed
/// so output archives are deterministic, but the mode is set explicitly
/// since some GNU tools warn on mode-0 members.
fn member_header(member: &NewArchiveMember) -> ar::Header {
    let mut header = ar::Header::new(member.name.clone().into_bytes(), member.data.len() as u64);
    header.set_mode(0o644);
    header
}

/// Extension for a fanned-out device member: bitcode for AMD devices,
/// cubins for NVIDIA, otherwise whatever the source member used.
fn device_file_extension(device: &str, member_name: &str) -> String {
    if device.contains("gfx") {
        return ".bc".to_string();
    }
    if device.contains("sm_") {
        return ".cubin".to_string();
    }
    Path::new(member_name)
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default()
}

/// `<stem>-<bundle-id><ext>`, with `:` replaced by `_` for
/// cross-platform validity of the member file name.
fn device_member_name(member_name: &str, bundle_id: &str, device: &str) -> String {
    let stem = Path::new(member_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| member_name.to_string());
    let extension = device_file_extension(device, member_name);
    format!("{stem}-{bundle_id}{extension}").replace(':', "_")
}

/// Split an archive of bundled objects into one archive per requested
/// target. Host bundles are not extracted.
pub fn unbundle_archive(config: &BundlerConfig) -> Result<()> {
    if config.output_file_names.len() != config.target_names.len() {
        return Err(Error::InvalidArgument(
            "number of outputs does not match the number of targets".into(),
        ));
    }
    let input_path = config
        .input_file_names
        .first()
        .ok_or_else(|| Error::InvalidArgument("archive unbundling requires one input".into()))?;

    let data = read_input(input_path)?;
    let archive = goblin::archive::Archive::parse(&data).map_err(|e| Error::BadArchive {
        path: input_path.clone(),
        message: e.to_string(),
    })?;

    let requested: Vec<OffloadTarget> = config
        .target_names
        .iter()
        .map(|t| OffloadTarget::parse(t))
        .collect();
    let mut members_by_target: Vec<Vec<NewArchiveMember>> =
        config.target_names.iter().map(|_| Vec::new()).collect();

    for name in archive.members() {
        let member_name = name.to_string();
        let member_data = archive
            .extract(&member_name, &data)
            .map_err(|e| Error::BadArchive {
                path: input_path.clone(),
                message: e.to_string(),
            })?;
        let file_name = Path::new(&member_name)
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| member_name.clone());

        let mut handler = create_container(member_data, config)?;
        handler.read_header(member_data)?;

        while let Some(id) = handler.read_bundle_start(member_data)? {
            let code_object = OffloadTarget::parse(&id);
            if !code_object.has_host_kind() {
                let compatible: Vec<usize> = requested
                    .iter()
                    .enumerate()
                    .filter(|(_, target)| is_code_object_compatible(&code_object, target, config))
                    .map(|(i, _)| i)
                    .collect();

                if !compatible.is_empty() {
                    let mut payload = Vec::new();
                    handler.read_bundle(&mut payload, member_data)?;
                    let new_name = device_member_name(&file_name, &id, &code_object.target_id);
                    log::debug!("extracting '{new_name}' for {} target(s)", compatible.len());
                    for index in compatible {
                        members_by_target[index].push(NewArchiveMember {
                            name: new_name.clone(),
                            data: payload.clone(),
                        });
                    }
                }
            }
            handler.read_bundle_end(member_data)?;
        }
    }

    let kind = host_archive_kind();
    for (index, target) in config.target_names.iter().enumerate() {
        let members = &members_by_target[index];
        if members.is_empty() && !config.allow_missing_bundles {
            return Err(Error::NoCompatibleCodeObject {
                target: target.clone(),
                archive: input_path.display().to_string(),
            });
        }
        write_archive(&config.output_file_names[index], members, kind)?;
    }
    Ok(())
}
