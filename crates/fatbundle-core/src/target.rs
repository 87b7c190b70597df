//! Bundle entry identifiers and the target compatibility predicate
//!
//! A bundle entry id has the textual form
//! `kind-arch-vendor-os-env[-processor[:feature±]...]`. The processor and
//! feature suffix select a specific GPU variant; the compatibility
//! predicate decides whether a bundled code object may be handed to a
//! requested target.

use crate::config::BundlerConfig;
use crate::gpuarch::is_known_gpu_arch;
use crate::triple::Triple;

/// Offload kinds understood by the bundler.
const VALID_KINDS: &[&str] = &["host", "openmp", "hip", "hipv4"];

/// Parsed bundle entry identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffloadTarget {
    /// Compilation model: `host`, `openmp`, `hip` or `hipv4`.
    pub kind: String,
    /// Canonical triple; the environment is always materialized.
    pub triple: Triple,
    /// Processor plus feature suffix (`gfx906:xnack+`), or empty.
    pub target_id: String,
}

impl OffloadTarget {
    /// Parse a textual id. The token after the last dash is taken as a
    /// processor only when it names a known GPU architecture; everything
    /// from that token onward (including any `:feature` list) becomes the
    /// target id. Otherwise the whole head is `kind-triple` and the
    /// target id is empty.
    pub fn parse(target: &str) -> Self {
        let head = target.split(':').next().unwrap_or(target);

        let (kind_triple, target_id) = match head.rfind('-') {
            Some(pos) if is_known_gpu_arch(&head[pos + 1..]) => {
                (&head[..pos], &target[pos + 1..])
            }
            _ => (head, ""),
        };

        let (kind, triple_text) = match kind_triple.split_once('-') {
            Some((k, t)) => (k, t),
            None => (kind_triple, ""),
        };

        // Re-canonicalize through all four components so an absent
        // environment becomes a stable empty string.
        let triple = Triple::parse(triple_text);

        OffloadTarget {
            kind: kind.to_string(),
            triple,
            target_id: target_id.to_string(),
        }
    }

    pub fn has_host_kind(&self) -> bool {
        self.kind == "host"
    }

    pub fn is_kind_valid(&self) -> bool {
        VALID_KINDS.contains(&self.kind.as_str())
    }

    pub fn is_triple_valid(&self) -> bool {
        self.triple.has_known_arch()
    }

    /// Kind equality, optionally relaxed so HIP bundles serve OpenMP
    /// requests and vice versa.
    pub fn is_kind_compatible(&self, other_kind: &str, hip_openmp_compatible: bool) -> bool {
        if self.kind == other_kind {
            return true;
        }
        if hip_openmp_compatible {
            let hip_with_openmp =
                self.kind.to_ascii_lowercase().starts_with("hip") && other_kind == "openmp";
            let openmp_with_hip =
                self.kind == "openmp" && other_kind.to_ascii_lowercase().starts_with("hip");
            return hip_with_openmp || openmp_with_hip;
        }
        false
    }

    /// Exact bundle-id equality: kinds match, triples are compatible and
    /// target ids match byte-for-byte.
    pub fn matches(&self, other: &OffloadTarget) -> bool {
        self.kind == other.kind
            && self.triple.is_compatible_with(&other.triple)
            && self.target_id == other.target_id
    }
}

impl std::fmt::Display for OffloadTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}-{}", self.kind, self.triple, self.target_id)
    }
}

/// Sign carried by a feature constraint in a target id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FeatureSign {
    On,
    Off,
    /// Bare feature name: matches either sign.
    Any,
}

/// Split `proc[:feat±]...` into its processor and feature constraints.
fn parse_target_id(id: &str) -> (Option<&str>, Vec<(&str, FeatureSign)>) {
    if id.is_empty() {
        return (None, Vec::new());
    }
    let mut pieces = id.split(':');
    let processor = pieces.next().filter(|p| !p.is_empty());
    let features = pieces
        .filter(|f| !f.is_empty())
        .map(|f| {
            if let Some(name) = f.strip_suffix('+') {
                (name, FeatureSign::On)
            } else if let Some(name) = f.strip_suffix('-') {
                (name, FeatureSign::Off)
            } else {
                (f, FeatureSign::Any)
            }
        })
        .collect();
    (processor, features)
}

/// Whether a bundled code object's target id satisfies a requested one.
///
/// Processors must agree when both are present. Every feature the request
/// constrains must be reported with the same sign by the code object,
/// unless the request used the don't-care sign.
fn is_compatible_target_id(provided: &str, requested: &str) -> bool {
    let (provided_proc, provided_features) = parse_target_id(provided);
    let (requested_proc, requested_features) = parse_target_id(requested);

    if let (Some(p), Some(r)) = (provided_proc, requested_proc) {
        if p != r {
            return false;
        }
    }

    requested_features.iter().all(|(name, sign)| {
        *sign == FeatureSign::Any
            || provided_features
                .iter()
                .any(|(pname, psign)| pname == name && psign == sign)
    })
}

/// Whether the code object identified by `code_object` may be extracted
/// for the requested `target`.
pub fn is_code_object_compatible(
    code_object: &OffloadTarget,
    target: &OffloadTarget,
    config: &BundlerConfig,
) -> bool {
    if code_object.matches(target) {
        log::debug!("compatible: exact match: [{code_object}] : [{target}]");
        return true;
    }

    if !code_object.is_kind_compatible(&target.kind, config.hip_openmp_compatible)
        || !code_object.triple.is_compatible_with(&target.triple)
    {
        log::debug!("incompatible: kind/triple mismatch: [{code_object}] : [{target}]");
        return false;
    }

    if !is_compatible_target_id(&code_object.target_id, &target.target_id) {
        log::debug!("incompatible: target ids: [{code_object}] : [{target}]");
        return false;
    }

    log::debug!("compatible: [{code_object}] : [{target}]");
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(hip_openmp: bool) -> BundlerConfig {
        BundlerConfig {
            hip_openmp_compatible: hip_openmp,
            ..BundlerConfig::default()
        }
    }

    #[test]
    fn test_parse_host_target() {
        let t = OffloadTarget::parse("host-x86_64-unknown-linux-gnu-");
        assert_eq!(t.kind, "host");
        assert_eq!(t.triple.to_string(), "x86_64-unknown-linux-gnu");
        assert_eq!(t.target_id, "");
        assert!(t.has_host_kind());
        assert!(t.is_kind_valid());
        assert!(t.is_triple_valid());
    }

    #[test]
    fn test_parse_gpu_target_with_features() {
        let t = OffloadTarget::parse("hip-amdgcn-amd-amdhsa--gfx906:xnack+:sramecc-");
        assert_eq!(t.kind, "hip");
        assert_eq!(t.triple.to_string(), "amdgcn-amd-amdhsa-");
        assert_eq!(t.target_id, "gfx906:xnack+:sramecc-");
    }

    #[test]
    fn test_parse_without_processor() {
        let t = OffloadTarget::parse("openmp-nvptx64-nvidia-cuda");
        assert_eq!(t.kind, "openmp");
        assert_eq!(t.triple.to_string(), "nvptx64-nvidia-cuda-");
        assert_eq!(t.target_id, "");
    }

    #[test]
    fn test_env_is_canonicalized() {
        // With and without an explicit (empty) environment component.
        let a = OffloadTarget::parse("hip-amdgcn-amd-amdhsa--gfx906");
        let b = OffloadTarget::parse("hip-amdgcn-amd-amdhsa-gfx906");
        assert!(a.matches(&b));
    }

    #[test]
    fn test_display_round_trip() {
        let text = "hip-amdgcn-amd-amdhsa--gfx906:xnack+";
        assert_eq!(OffloadTarget::parse(text).to_string(), text);
        let host = "host-x86_64-unknown-linux-gnu-";
        assert_eq!(OffloadTarget::parse(host).to_string(), host);
    }

    #[test]
    fn test_invalid_kind_and_triple() {
        let t = OffloadTarget::parse("cuda-z80-acme-cpm-");
        assert!(!t.is_kind_valid());
        assert!(!t.is_triple_valid());
    }

    #[test]
    fn test_compatibility_reflexive() {
        for text in [
            "host-x86_64-unknown-linux-gnu-",
            "hip-amdgcn-amd-amdhsa--gfx906:xnack+",
            "openmp-nvptx64-nvidia-cuda--sm_70",
        ] {
            let t = OffloadTarget::parse(text);
            assert!(is_code_object_compatible(&t, &t, &config(false)), "{text}");
        }
    }

    #[test]
    fn test_hip_openmp_cross_kind() {
        let bundle = OffloadTarget::parse("openmp-amdgcn-amd-amdhsa-");
        let request = OffloadTarget::parse("hip-amdgcn-amd-amdhsa-");
        assert!(is_code_object_compatible(&bundle, &request, &config(true)));
        assert!(!is_code_object_compatible(&bundle, &request, &config(false)));

        let hipv4 = OffloadTarget::parse("hipv4-amdgcn-amd-amdhsa--gfx906");
        let openmp = OffloadTarget::parse("openmp-amdgcn-amd-amdhsa--gfx906");
        assert!(is_code_object_compatible(&hipv4, &openmp, &config(true)));
    }

    #[test]
    fn test_feature_subsetting() {
        let bundle = OffloadTarget::parse("hip-amdgcn-amd-amdhsa--gfx906:xnack+");
        let same = OffloadTarget::parse("hip-amdgcn-amd-amdhsa--gfx906:xnack+");
        let dont_care = OffloadTarget::parse("hip-amdgcn-amd-amdhsa--gfx906");
        let off = OffloadTarget::parse("hip-amdgcn-amd-amdhsa--gfx906:xnack-");
        let cfg = config(false);

        assert!(is_code_object_compatible(&bundle, &same, &cfg));
        assert!(is_code_object_compatible(&bundle, &dont_care, &cfg));
        assert!(!is_code_object_compatible(&bundle, &off, &cfg));
    }

    #[test]
    fn test_request_constrains_unreported_feature() {
        let bundle = OffloadTarget::parse("hip-amdgcn-amd-amdhsa--gfx906");
        let request = OffloadTarget::parse("hip-amdgcn-amd-amdhsa--gfx906:xnack+");
        assert!(!is_code_object_compatible(&bundle, &request, &config(false)));
    }

    #[test]
    fn test_processor_mismatch() {
        let bundle = OffloadTarget::parse("hip-amdgcn-amd-amdhsa--gfx906");
        let request = OffloadTarget::parse("hip-amdgcn-amd-amdhsa--gfx908");
        assert!(!is_code_object_compatible(&bundle, &request, &config(false)));
    }

    #[test]
    fn test_triple_mismatch() {
        let bundle = OffloadTarget::parse("openmp-nvptx64-nvidia-cuda--sm_70");
        let request = OffloadTarget::parse("openmp-amdgcn-amd-amdhsa--sm_70");
        assert!(!is_code_object_compatible(&bundle, &request, &config(false)));
    }
}
