//! fatbundle - Offload bundle containers
//!
//! Packages compiled artifacts produced for distinct compute targets
//! (host CPU, GPU, accelerator) from one translation unit into a single
//! container file, and extracts them again. Three container
//! representations share one contract: a self-describing binary layout, a
//! fat object whose bundles are magic-named sections, and a
//! comment-delimited text form. An archive of bundled objects can also be
//! split into one archive per target.

pub mod archive;
pub mod binary;
pub mod bundler;
pub mod container;
pub mod object;
pub mod text;

// Re-export main entry points
pub use archive::{host_archive_kind, unbundle_archive, write_archive, ArchiveKind, NewArchiveMember};
pub use binary::BinaryHandler;
pub use bundler::{bundle_files, list_bundle_ids, unbundle_files};
pub use container::{create_container, Container};
pub use object::ObjectHandler;
pub use text::TextHandler;

pub use fatbundle_core::{
    is_code_object_compatible, BundlerConfig, Error, OffloadTarget, Result, Triple,
    OFFLOAD_BUNDLER_MAGIC,
};
