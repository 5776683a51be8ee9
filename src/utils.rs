//! Utility functions.

/// Decodes one unsigned LEB128 value starting at `*offset`, advancing it.
///
/// Returns `None` if the input ends mid-value or the value overflows 64 bits.
pub fn read_uleb128(data: &[u8], offset: &mut usize) -> Option<u64> {
    let mut value = 0u64;
    let mut shift = 0u32;
    loop {
        let byte = *data.get(*offset)?;
        *offset += 1;
        if shift >= 64 {
            return None;
        }
        value |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            return Some(value);
        }
        shift += 7;
    }
}
