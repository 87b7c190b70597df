//! Target triple parsing and canonicalization
//!
//! Bundle entry ids embed an `arch-vendor-os-environment` triple. The
//! environment component is optional in the textual form but is always
//! materialized here (possibly as the empty string), so ids written with
//! and without an explicit environment compare equal.

/// Architectures that may appear in a bundle triple. Anything else makes
/// the triple invalid for bundling purposes.
const KNOWN_ARCHS: &[&str] = &[
    "aarch64",
    "aarch64_be",
    "amdgcn",
    "arm",
    "armeb",
    "armv6",
    "armv7",
    "i386",
    "i486",
    "i586",
    "i686",
    "loongarch64",
    "mips",
    "mips64",
    "mips64el",
    "mipsel",
    "nvptx",
    "nvptx64",
    "powerpc",
    "powerpc64",
    "powerpc64le",
    "r600",
    "riscv32",
    "riscv64",
    "s390x",
    "sparc",
    "sparcv9",
    "spir",
    "spir64",
    "spirv32",
    "spirv64",
    "thumb",
    "thumbeb",
    "ve",
    "wasm32",
    "wasm64",
    "x86_64",
];

/// A canonical architecture-vendor-os-environment tuple.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Triple {
    pub arch: String,
    pub vendor: String,
    pub os: String,
    pub environment: String,
}

impl Triple {
    /// Parse a triple from text. Missing components become empty strings;
    /// a fifth or later dash-separated piece is folded into the
    /// environment (`x86_64-pc-windows-gnu-llvm` keeps `gnu-llvm`).
    /// Trailing dashes are not part of the environment, so the canonical
    /// rendering of an id (`...-linux-gnu-`) parses back to itself.
    pub fn parse(text: &str) -> Self {
        let mut parts = text.splitn(4, '-');
        let arch = parts.next().unwrap_or("").to_string();
        let vendor = parts.next().unwrap_or("").to_string();
        let os = parts.next().unwrap_or("").to_string();
        let environment = parts
            .next()
            .unwrap_or("")
            .trim_end_matches('-')
            .to_string();
        Triple {
            arch,
            vendor,
            os,
            environment,
        }
    }

    /// Whether the architecture component names a known architecture.
    pub fn has_known_arch(&self) -> bool {
        KNOWN_ARCHS.contains(&self.arch.as_str())
    }

    /// Triples are compatible when all four components agree. This is the
    /// relation used for bundle-id equality; it is intentionally stricter
    /// than "same architecture family".
    pub fn is_compatible_with(&self, other: &Triple) -> bool {
        self == other
    }
}

impl std::fmt::Display for Triple {
    /// Renders all four components. An empty environment yields a
    /// trailing dash (`amdgcn-amd-amdhsa-`), which is the canonical
    /// spelling inside bundle ids.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}",
            self.arch, self.vendor, self.os, self.environment
        )
    }
}
