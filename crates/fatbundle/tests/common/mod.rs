//! Shared test fixtures: a minimal ELF relocatable object with
//! offload-bundle sections, built by hand so tests need no toolchain.

use byteorder::{LittleEndian, WriteBytesExt};

const MAGIC: &str = "__CLANG_OFFLOAD_BUNDLE__";

/// Build a 64-bit little-endian ET_REL object whose sections are the
/// given `(bundle id, payload)` pairs, plus the null section and
/// `.shstrtab`. A payload of a single zero byte is the host placeholder,
/// as the bundler writes it.
pub fn fat_elf_object(bundles: &[(&str, &[u8])]) -> Vec<u8> {
    // Section name string table: empty name, ".shstrtab", bundle names.
    let mut shstrtab = vec![0u8];
    let shstrtab_name = shstrtab.len();
    shstrtab.extend_from_slice(b".shstrtab\0");
    let mut bundle_names = Vec::new();
    for (id, _) in bundles {
        bundle_names.push(shstrtab.len());
        shstrtab.extend_from_slice(format!("{MAGIC}{id}").as_bytes());
        shstrtab.push(0);
    }

    let ehsize = 64usize;
    let shstrtab_offset = ehsize;
    let mut cursor = shstrtab_offset + shstrtab.len();
    let mut payload_offsets = Vec::new();
    for (_, data) in bundles {
        payload_offsets.push(cursor);
        cursor += data.len();
    }
    let shoff = (cursor + 7) & !7;
    let shnum = 2 + bundles.len();

    let mut out = Vec::with_capacity(shoff + shnum * 64);
    // e_ident: ELF magic, 64-bit, little-endian, version 1, SysV ABI.
    out.extend_from_slice(&[0x7f, b'E', b'L', b'F', 2, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
    out.write_u16::<LittleEndian>(1).unwrap(); // e_type = ET_REL
    out.write_u16::<LittleEndian>(62).unwrap(); // e_machine = EM_X86_64
    out.write_u32::<LittleEndian>(1).unwrap(); // e_version
    out.write_u64::<LittleEndian>(0).unwrap(); // e_entry
    out.write_u64::<LittleEndian>(0).unwrap(); // e_phoff
    out.write_u64::<LittleEndian>(shoff as u64).unwrap(); // e_shoff
    out.write_u32::<LittleEndian>(0).unwrap(); // e_flags
    out.write_u16::<LittleEndian>(64).unwrap(); // e_ehsize
    out.write_u16::<LittleEndian>(0).unwrap(); // e_phentsize
    out.write_u16::<LittleEndian>(0).unwrap(); // e_phnum
    out.write_u16::<LittleEndian>(64).unwrap(); // e_shentsize
    out.write_u16::<LittleEndian>(shnum as u16).unwrap(); // e_shnum
    out.write_u16::<LittleEndian>(1).unwrap(); // e_shstrndx
    assert_eq!(out.len(), ehsize);

    out.extend_from_slice(&shstrtab);
    for (_, data) in bundles {
        out.extend_from_slice(data);
    }
    out.resize(shoff, 0);

    // Null section header.
    out.extend_from_slice(&[0u8; 64]);
    // .shstrtab (SHT_STRTAB).
    write_section_header(
        &mut out,
        shstrtab_name as u32,
        3,
        shstrtab_offset as u64,
        shstrtab.len() as u64,
    );
    // One SHT_PROGBITS section per bundle.
    for (index, (_, data)) in bundles.iter().enumerate() {
        write_section_header(
            &mut out,
            bundle_names[index] as u32,
            1,
            payload_offsets[index] as u64,
            data.len() as u64,
        );
    }
    out
}

fn write_section_header(out: &mut Vec<u8>, name: u32, sh_type: u32, offset: u64, size: u64) {
    out.write_u32::<LittleEndian>(name).unwrap(); // sh_name
    out.write_u32::<LittleEndian>(sh_type).unwrap(); // sh_type
    out.write_u64::<LittleEndian>(0).unwrap(); // sh_flags
    out.write_u64::<LittleEndian>(0).unwrap(); // sh_addr
    out.write_u64::<LittleEndian>(offset).unwrap(); // sh_offset
    out.write_u64::<LittleEndian>(size).unwrap(); // sh_size
    out.write_u32::<LittleEndian>(0).unwrap(); // sh_link
    out.write_u32::<LittleEndian>(0).unwrap(); // sh_info
    out.write_u64::<LittleEndian>(1).unwrap(); // sh_addralign
    out.write_u64::<LittleEndian>(0).unwrap(); // sh_entsize
}
