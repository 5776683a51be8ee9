//! Method list walking.
//!
//! A method list in `__objc_const` is an 8-byte header (`entsize`, `count`)
//! followed by `count` records of three pointers: selector name, type encoding
//! and implementation.

use byteorder::{ByteOrder, LittleEndian};

use super::class::{ClassReadOnly, Fields};
use crate::error::{Error, Result};
use crate::image::BinaryView;
use crate::reader::{MemoryReader, RegionData};

pub const METHOD_LIST_HEADER_SIZE: usize = 8;
pub const METHOD_RECORD_SIZE: usize = 24;

/// `struct method_t` in its pointer-based form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MethodRecord {
    pub name: u64,
    pub types: u64,
    pub imp: u64,
}

impl MethodRecord {
    pub fn decode(bytes: &[u8], offset: usize) -> Result<Self> {
        let mut fields = Fields::new(bytes, offset, METHOD_RECORD_SIZE)?;
        Ok(Self {
            name: fields.u64(),
            types: fields.u64(),
            imp: fields.u64(),
        })
    }

    pub fn encode(&self) -> [u8; METHOD_RECORD_SIZE] {
        let mut out = [0u8; METHOD_RECORD_SIZE];
        for (chunk, value) in out.chunks_exact_mut(8).zip([self.name, self.types, self.imp]) {
            LittleEndian::write_u64(chunk, value);
        }
        out
    }
}

/// A declared method with its selector resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Method {
    pub selector: String,
    pub imp: u64,
}

/// Lazily decodes the records of one method list.
///
/// A clone continues from the same position. Call [`methods_of`] again to walk
/// the list from the start.
pub struct Methods<'a, V: BinaryView + ?Sized> {
    reader: MemoryReader<'a, V>,
    bytes: &'a [u8],
    next: usize,
    remaining: usize,
}

impl<V: BinaryView + ?Sized> Clone for Methods<'_, V> {
    fn clone(&self) -> Self {
        Self {
            reader: self.reader,
            bytes: self.bytes,
            next: self.next,
            remaining: self.remaining,
        }
    }
}

impl<'a, V: BinaryView + ?Sized> Methods<'a, V> {
    fn empty(reader: MemoryReader<'a, V>) -> Self {
        Self {
            reader,
            bytes: &[],
            next: 0,
            remaining: 0,
        }
    }

    fn decode_at(&self, offset: usize) -> Result<Method> {
        let record = MethodRecord::decode(self.bytes, offset)?;
        let selector = self.reader.read_cstring_or_known(record.name)?;
        Ok(Method {
            selector: String::from_utf8_lossy(&selector).into_owned(),
            imp: record.imp,
        })
    }
}

impl<V: BinaryView + ?Sized> Iterator for Methods<'_, V> {
    type Item = Result<Method>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let offset = self.next;
        self.next += METHOD_RECORD_SIZE;
        self.remaining -= 1;
        Some(self.decode_at(offset))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V: BinaryView + ?Sized> ExactSizeIterator for Methods<'_, V> {}

/// Walks the base method list of `class_ro`, which lives in `region`.
///
/// A zero method list pointer yields no methods without touching memory.
pub fn methods_of<'a, V: BinaryView + ?Sized>(
    class_ro: &ClassReadOnly,
    region: &'a RegionData,
    reader: MemoryReader<'a, V>,
) -> Result<Methods<'a, V>> {
    if class_ro.base_methods == 0 {
        return Ok(Methods::empty(reader));
    }

    let first = region.offset_of(class_ro.base_methods)? + METHOD_LIST_HEADER_SIZE;
    let bytes = region.bytes.as_slice();
    let count_bytes = bytes.get(first - 4..first).ok_or(Error::TruncatedRecord {
        offset: first - METHOD_LIST_HEADER_SIZE,
        size: METHOD_LIST_HEADER_SIZE,
        len: bytes.len(),
    })?;
    let count = LittleEndian::read_u32(count_bytes) as usize;

    let table_size = count.saturating_mul(METHOD_RECORD_SIZE);
    if first.saturating_add(table_size) > bytes.len() {
        return Err(Error::TruncatedRecord {
            offset: first,
            size: table_size,
            len: bytes.len(),
        });
    }

    Ok(Methods {
        reader,
        bytes,
        next: first,
        remaining: count,
    })
}
