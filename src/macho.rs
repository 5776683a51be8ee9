//! Mach-O loading.
//!
//! Builds a `MemoryImage` from a thin Mach-O file: section contents, an index of
//! the C string literals the Objective-C compiler emits, the functions named by
//! the symbol table and the function starts table, and existing symbols.

use anyhow::{anyhow, bail, Context, Result};
use memmap2::Mmap;
use object::macho::{
    LinkeditDataCommand, MachHeader64, SegmentCommand64, LC_FUNCTION_STARTS, LC_SEGMENT_64,
};
use object::read::macho::MachHeader;
use object::{
    BinaryFormat, Endianness, FileKind, Object, ObjectSection, ObjectSymbol,
    SymbolKind as ObjSymbolKind,
};
use std::fs::File;
use std::path::Path;
use tracing::debug;

use crate::image::{BinaryView, MemoryImage, Symbol, SymbolKind};
use crate::utils::read_uleb128;

/// Sections whose contents are packed NUL-terminated strings.
const STRING_SECTIONS: &[&str] = &[
    "__objc_methname",
    "__objc_classname",
    "__objc_methtype",
    "__cstring",
];

/// Maps `path` and loads it.
pub fn open(path: &Path) -> Result<MemoryImage> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mmap = unsafe { Mmap::map(&file)? };
    load(&mmap).with_context(|| format!("failed to load {}", path.display()))
}

pub fn load(data: &[u8]) -> Result<MemoryImage> {
    match FileKind::parse(data).context("unrecognized file format")? {
        FileKind::MachOFat32 | FileKind::MachOFat64 => {
            bail!("universal binaries are not supported; extract one architecture with lipo first")
        }
        _ => {}
    }

    let file = object::File::parse(data).context("failed to parse object file")?;
    let pointer_width = if file.is_64() { 64 } else { 32 };
    let mut image = MemoryImage::new(file.format(), pointer_width);

    for section in file.sections() {
        let name = section.name()?;
        let bytes = section.data()?;
        if bytes.is_empty() {
            // Zero-fill sections have no file contents
            continue;
        }
        if STRING_SECTIONS.contains(&name) {
            image.index_string_literals(section.address(), bytes);
        }
        image.add_section(name, section.address(), bytes.to_vec());
    }

    for symbol in file.symbols() {
        if !symbol.is_definition() {
            continue;
        }
        let name = symbol.name()?;
        if name.is_empty() {
            continue;
        }
        let kind = match symbol.kind() {
            ObjSymbolKind::Text => {
                image.add_function(symbol.address(), Some(name.to_string()));
                SymbolKind::Function
            }
            ObjSymbolKind::Data => SymbolKind::Data,
            _ => continue,
        };
        image.define_user_symbol(Symbol {
            address: symbol.address(),
            name: name.to_string(),
            kind,
        });
    }

    if file.format() == BinaryFormat::MachO && file.is_64() {
        let starts = function_starts(data)?;
        debug!("{} function starts", starts.len());
        for start in starts {
            image.add_function(start, None);
        }
    }

    Ok(image)
}

/// Reads `LC_FUNCTION_STARTS`, whose offsets count from the `__TEXT` segment.
fn function_starts(data: &[u8]) -> Result<Vec<u64>> {
    let header = MachHeader64::<Endianness>::parse(data, 0)
        .map_err(|e| anyhow!("failed to parse Mach-O header: {}", e))?;
    let endian = header.endian()?;
    let mut commands = header.load_commands(endian, data, 0)?;

    let mut text_base = None;
    let mut table = None;
    while let Some(command) = commands.next()? {
        match command.cmd() {
            LC_SEGMENT_64 => {
                let segment = command.data::<SegmentCommand64<Endianness>>()?;
                if segment_name(&segment.segname) == b"__TEXT" {
                    text_base = Some(segment.vmaddr.get(endian));
                }
            }
            LC_FUNCTION_STARTS => {
                let linkedit = command.data::<LinkeditDataCommand<Endianness>>()?;
                table = Some((
                    linkedit.dataoff.get(endian) as usize,
                    linkedit.datasize.get(endian) as usize,
                ));
            }
            _ => {}
        }
    }

    let (Some(text_base), Some((offset, size))) = (text_base, table) else {
        return Ok(Vec::new());
    };
    let encoded = offset
        .checked_add(size)
        .and_then(|end| data.get(offset..end))
        .context("function starts table is outside the file")?;
    Ok(decode_function_starts(encoded, text_base))
}

fn segment_name(raw: &[u8; 16]) -> &[u8] {
    let len = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    &raw[..len]
}

/// Decodes a function starts table: ULEB128 deltas, the first from `base`,
/// terminated by a zero delta.
pub fn decode_function_starts(encoded: &[u8], base: u64) -> Vec<u64> {
    let mut starts = Vec::new();
    let mut address = base;
    let mut offset = 0;
    while let Some(delta) = read_uleb128(encoded, &mut offset) {
        if delta == 0 {
            break;
        }
        address = address.wrapping_add(delta);
        starts.push(address);
    }
    starts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_starts_accumulate_deltas() {
        // 0x4f8, 0x20, 0x100 then terminator and padding
        let encoded = [0xf8, 0x09, 0x20, 0x80, 0x02, 0x00, 0x00, 0x00];
        assert_eq!(
            decode_function_starts(&encoded, 0x1_0000_0000),
            vec![0x1_0000_04f8, 0x1_0000_0518, 0x1_0000_0618]
        );
    }

    #[test]
    fn empty_function_starts_table() {
        assert!(decode_function_starts(&[], 0x1000).is_empty());
        assert!(decode_function_starts(&[0x00, 0x10], 0x1000).is_empty());
    }

    #[test]
    fn segment_names_are_nul_padded() {
        assert_eq!(segment_name(b"__TEXT\0\0\0\0\0\0\0\0\0\0"), b"__TEXT");
        assert_eq!(segment_name(b"0123456789abcdef"), b"0123456789abcdef");
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(load(b"definitely not a binary").is_err());
    }
}
