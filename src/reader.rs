//! Typed memory reads.
//!
//! `MemoryReader` borrows a view and extracts scalars, pointers, pointer tables
//! and C strings from it. It keeps no state of its own.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use object::Endianness;

use crate::error::{Error, Result};
use crate::image::{BinaryView, Region};

/// Upper bound when scanning memory for a string terminator.
pub const MAX_STRING_SCAN: usize = 200;

/// The contents of one region, read up front so records can be decoded by
/// offset.
#[derive(Debug, Clone)]
pub struct RegionData {
    pub region: Region,
    pub bytes: Vec<u8>,
}

impl RegionData {
    pub fn offset_of(&self, addr: u64) -> Result<usize> {
        self.region.offset_of(addr)
    }
}

pub struct MemoryReader<'v, V: BinaryView + ?Sized> {
    view: &'v V,
}

impl<V: BinaryView + ?Sized> Clone for MemoryReader<'_, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V: BinaryView + ?Sized> Copy for MemoryReader<'_, V> {}

impl<'v, V: BinaryView + ?Sized> MemoryReader<'v, V> {
    pub fn new(view: &'v V) -> Self {
        Self { view }
    }

    pub fn read_bytes(&self, addr: u64, len: usize) -> Result<Vec<u8>> {
        let bytes = self.view.read(addr, len)?;
        if bytes.len() < len {
            return Err(Error::OutOfBounds { addr, len });
        }
        Ok(bytes)
    }

    /// Reads an unsigned integer of `width` bytes (1, 2, 4 or 8).
    pub fn read_scalar(&self, addr: u64, width: usize, endian: Endianness) -> Result<u64> {
        if !matches!(width, 1 | 2 | 4 | 8) {
            return Err(Error::InvalidWidth(width));
        }
        let bytes = self.read_bytes(addr, width)?;
        Ok(match endian {
            Endianness::Little => scalar::<LittleEndian>(&bytes),
            Endianness::Big => scalar::<BigEndian>(&bytes),
        })
    }

    /// Reads a little-endian pointer of the image's width.
    pub fn read_pointer(&self, addr: u64) -> Result<u64> {
        let width = (self.view.pointer_width() / 8) as usize;
        self.read_scalar(addr, width, Endianness::Little)
    }

    pub fn read_region(&self, region: &Region) -> Result<RegionData> {
        let bytes = self.read_bytes(region.start, region.length as usize)?;
        Ok(RegionData {
            region: region.clone(),
            bytes,
        })
    }

    /// Reads a region as a packed array of little-endian 64-bit pointers.
    /// Trailing bytes that do not form a whole pointer are ignored.
    pub fn read_pointer_table(&self, region: &Region) -> Result<Vec<u64>> {
        let count = region.length as usize / 8;
        let bytes = self.read_bytes(region.start, count * 8)?;
        Ok(bytes.chunks_exact(8).map(LittleEndian::read_u64).collect())
    }

    /// Reads the C string at `addr`, without its terminator.
    ///
    /// A literal the host has indexed is returned with its exact length.
    /// Otherwise up to [`MAX_STRING_SCAN`] bytes are scanned for a NUL.
    pub fn read_cstring_or_known(&self, addr: u64) -> Result<Vec<u8>> {
        if let Some(literal) = self.view.string_literal_at(addr) {
            return Ok(literal);
        }

        let data = match self.read_bytes(addr, MAX_STRING_SCAN) {
            Ok(data) => data,
            Err(err) => {
                // Strings close to the end of a section
                let region = self.view.region_containing(addr).ok_or(err)?;
                let remaining = (region.end() - addr).min(MAX_STRING_SCAN as u64);
                self.read_bytes(addr, remaining as usize)?
            }
        };

        let end = data
            .iter()
            .position(|&b| b == 0)
            .ok_or(Error::StringNotTerminated {
                addr,
                max: data.len(),
            })?;
        Ok(data[..end].to_vec())
    }
}

fn scalar<B: ByteOrder>(bytes: &[u8]) -> u64 {
    match bytes.len() {
        1 => u64::from(bytes[0]),
        2 => u64::from(B::read_u16(bytes)),
        4 => u64::from(B::read_u32(bytes)),
        _ => B::read_u64(bytes),
    }
}
