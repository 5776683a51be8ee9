//! Class records.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Error, Result};

/// Size of `struct objc_class` on 64-bit targets.
pub const CLASS_OBJECT_SIZE: usize = 40;
/// Size of `struct class_ro_t` on 64-bit targets.
pub const CLASS_RO_SIZE: usize = 72;

/// The flag bits the runtime keeps in the low bits of `info`.
pub const CLASS_INFO_FLAGS_MASK: u64 = 0x7;

/// `struct objc_class`, as stored in `__objc_data`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassObject {
    /// The metaclass.
    pub isa: u64,
    pub superclass: u64,
    pub cache: u64,
    pub vtable: u64,
    /// The class's read-only data, with runtime flag bits in the low bits.
    pub info: u64,
}

impl ClassObject {
    pub fn decode(bytes: &[u8], offset: usize) -> Result<Self> {
        let mut fields = Fields::new(bytes, offset, CLASS_OBJECT_SIZE)?;
        Ok(Self {
            isa: fields.u64(),
            superclass: fields.u64(),
            cache: fields.u64(),
            vtable: fields.u64(),
            info: fields.u64(),
        })
    }

    pub fn encode(&self) -> [u8; CLASS_OBJECT_SIZE] {
        let mut out = [0u8; CLASS_OBJECT_SIZE];
        for (chunk, value) in out
            .chunks_exact_mut(8)
            .zip([self.isa, self.superclass, self.cache, self.vtable, self.info])
        {
            LittleEndian::write_u64(chunk, value);
        }
        out
    }

    /// Address of the read-only data with the flag bits cleared.
    pub fn ro_pointer(&self) -> u64 {
        self.info & !CLASS_INFO_FLAGS_MASK
    }
}

/// `struct class_ro_t`, as stored in `__objc_const`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassReadOnly {
    pub flags: u32,
    pub instance_start: u32,
    pub instance_size: u32,
    pub reserved: u32,
    pub ivar_layout: u64,
    pub name: u64,
    pub base_methods: u64,
    pub base_protocols: u64,
    pub ivars: u64,
    pub weak_ivar_layout: u64,
    pub base_properties: u64,
}

impl ClassReadOnly {
    pub fn decode(bytes: &[u8], offset: usize) -> Result<Self> {
        let mut fields = Fields::new(bytes, offset, CLASS_RO_SIZE)?;
        Ok(Self {
            flags: fields.u32(),
            instance_start: fields.u32(),
            instance_size: fields.u32(),
            reserved: fields.u32(),
            ivar_layout: fields.u64(),
            name: fields.u64(),
            base_methods: fields.u64(),
            base_protocols: fields.u64(),
            ivars: fields.u64(),
            weak_ivar_layout: fields.u64(),
            base_properties: fields.u64(),
        })
    }

    pub fn encode(&self) -> [u8; CLASS_RO_SIZE] {
        let mut out = [0u8; CLASS_RO_SIZE];
        let (words, pointers) = out.split_at_mut(16);
        for (chunk, value) in words
            .chunks_exact_mut(4)
            .zip([self.flags, self.instance_start, self.instance_size, self.reserved])
        {
            LittleEndian::write_u32(chunk, value);
        }
        for (chunk, value) in pointers.chunks_exact_mut(8).zip([
            self.ivar_layout,
            self.name,
            self.base_methods,
            self.base_protocols,
            self.ivars,
            self.weak_ivar_layout,
            self.base_properties,
        ]) {
            LittleEndian::write_u64(chunk, value);
        }
        out
    }
}

/// Sequential little-endian field reader over one bounds-checked record.
pub(crate) struct Fields<'a> {
    record: &'a [u8],
    pos: usize,
}

impl<'a> Fields<'a> {
    pub(crate) fn new(bytes: &'a [u8], offset: usize, size: usize) -> Result<Self> {
        let record = offset
            .checked_add(size)
            .and_then(|end| bytes.get(offset..end))
            .ok_or(Error::TruncatedRecord {
                offset,
                size,
                len: bytes.len(),
            })?;
        Ok(Self { record, pos: 0 })
    }

    pub(crate) fn u32(&mut self) -> u32 {
        let value = LittleEndian::read_u32(&self.record[self.pos..]);
        self.pos += 4;
        value
    }

    pub(crate) fn u64(&mut self) -> u64 {
        let value = LittleEndian::read_u64(&self.record[self.pos..]);
        self.pos += 8;
        value
    }
}
