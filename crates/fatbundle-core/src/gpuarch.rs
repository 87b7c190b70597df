//! Known offload GPU architectures
//!
//! Used while parsing bundle entry ids: the token after the last dash is a
//! processor name only if it appears in this table, otherwise it is part
//! of the triple.

/// NVIDIA compute capabilities and AMDGPU processors understood by the
/// offload toolchain.
const OFFLOAD_ARCHS: &[&str] = &[
    // NVIDIA
    "sm_20", "sm_21", "sm_30", "sm_32", "sm_35", "sm_37", "sm_50", "sm_52", "sm_53", "sm_60",
    "sm_61", "sm_62", "sm_70", "sm_72", "sm_75", "sm_80", "sm_86", "sm_87", "sm_89", "sm_90",
    "sm_90a",
    // AMDGPU
    "gfx600", "gfx601", "gfx602", "gfx700", "gfx701", "gfx702", "gfx703", "gfx704", "gfx705",
    "gfx801", "gfx802", "gfx803", "gfx805", "gfx810", "gfx900", "gfx902", "gfx904", "gfx906",
    "gfx908", "gfx909", "gfx90a", "gfx90c", "gfx940", "gfx941", "gfx942", "gfx1010", "gfx1011",
    "gfx1012", "gfx1013", "gfx1030", "gfx1031", "gfx1032", "gfx1033", "gfx1034", "gfx1035",
    "gfx1036", "gfx1100", "gfx1101", "gfx1102", "gfx1103", "gfx1150", "gfx1151",
];

/// Whether `name` is a known GPU offload architecture (`sm_70`, `gfx906`).
pub fn is_known_gpu_arch(name: &str) -> bool {
    OFFLOAD_ARCHS.contains(&name)
}
