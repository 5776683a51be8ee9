//! Host image abstraction.
//!
//! This module defines the `BinaryView` trait, which encapsulates everything the
//! analysis passes need from the program hosting a loaded binary: named regions,
//! raw memory reads, discovered functions and the symbol table. The passes stay
//! independent of any particular loader and can be driven by synthetic images in
//! tests.

use object::BinaryFormat;
use std::ops::{Deref, DerefMut};

use crate::error::{Error, Result};

pub mod memory;

pub use memory::MemoryImage;

/// A named, contiguous range of the loaded image (a Mach-O section).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub name: String,
    pub start: u64,
    pub length: u64,
}

impl Region {
    pub fn new(name: impl Into<String>, start: u64, length: u64) -> Self {
        Self {
            name: name.into(),
            start,
            length,
        }
    }

    /// First address past the end of the region.
    pub fn end(&self) -> u64 {
        self.start.saturating_add(self.length)
    }

    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.start && addr - self.start < self.length
    }

    /// Translates an absolute address into an offset from the region start.
    pub fn offset_of(&self, addr: u64) -> Result<usize> {
        if !self.contains(addr) {
            return Err(Error::UnresolvedReference {
                addr,
                region: self.name.clone(),
            });
        }
        Ok((addr - self.start) as usize)
    }
}

/// A function the host has already discovered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub start: u64,
    pub name: Option<String>,
}

impl Function {
    pub fn new(start: u64) -> Self {
        Self { start, name: None }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Function,
    ImportedFunction,
    Data,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub address: u64,
    pub name: String,
    pub kind: SymbolKind,
}

/// A loaded binary as seen by the analysis passes.
pub trait BinaryView {
    /// The container format of the image.
    fn kind(&self) -> BinaryFormat;

    /// Pointer width of the image in bits.
    fn pointer_width(&self) -> u32;

    /// All readable regions, in load order.
    fn regions(&self) -> Vec<Region>;

    /// Reads exactly `len` bytes at `addr`.
    ///
    /// Fails with [`Error::OutOfBounds`] if any part of the range is unmapped.
    fn read(&self, addr: u64, len: usize) -> Result<Vec<u8>>;

    /// The bytes of a string literal the host has indexed at `addr`, without
    /// the terminator.
    fn string_literal_at(&self, addr: u64) -> Option<Vec<u8>>;

    fn function_at(&mut self, addr: u64) -> Option<&mut Function>;

    fn symbol_at(&self, addr: u64) -> Option<&Symbol>;

    fn define_user_symbol(&mut self, symbol: Symbol);

    /// Starts staging edits. Nested calls join the open group.
    fn begin_edit_group(&mut self);

    /// Keeps every edit made since the group was opened.
    fn commit_edit_group(&mut self);

    /// Reverts every edit made since the group was opened.
    fn discard_edit_group(&mut self);

    /// Looks up a region by name. The first match wins.
    fn region(&self, name: &str) -> Option<Region> {
        self.regions().into_iter().find(|region| region.name == name)
    }

    fn region_containing(&self, addr: u64) -> Option<Region> {
        self.regions().into_iter().find(|region| region.contains(addr))
    }

    /// Renames the function starting at `addr`.
    fn rename_function(&mut self, addr: u64, name: &str) -> Result<()> {
        let function = self.function_at(addr).ok_or(Error::MissingFunction(addr))?;
        function.set_name(name);
        Ok(())
    }
}

/// An open edit group on a view.
///
/// Edits made through the guard are kept only if [`EditGroup::commit`] is
/// called; dropping the guard otherwise discards them.
pub struct EditGroup<'v, V: BinaryView + ?Sized> {
    view: &'v mut V,
    committed: bool,
}

impl<'v, V: BinaryView + ?Sized> EditGroup<'v, V> {
    pub fn begin(view: &'v mut V) -> Self {
        view.begin_edit_group();
        Self {
            view,
            committed: false,
        }
    }

    pub fn commit(mut self) {
        self.view.commit_edit_group();
        self.committed = true;
    }
}

impl<V: BinaryView + ?Sized> Deref for EditGroup<'_, V> {
    type Target = V;

    fn deref(&self) -> &V {
        &*self.view
    }
}

impl<V: BinaryView + ?Sized> DerefMut for EditGroup<'_, V> {
    fn deref_mut(&mut self) -> &mut V {
        &mut *self.view
    }
}

impl<V: BinaryView + ?Sized> Drop for EditGroup<'_, V> {
    fn drop(&mut self) {
        if !self.committed {
            self.view.discard_edit_group();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_are_relative_to_the_region_start() {
        let region = Region::new("__objc_data", 0x1000, 0x100);
        assert_eq!(region.offset_of(0x1000), Ok(0));
        assert_eq!(region.offset_of(0x10ff), Ok(0xff));
        assert_eq!(region.end(), 0x1100);
    }

    #[test]
    fn addresses_outside_the_region_do_not_resolve() {
        let region = Region::new("__objc_data", 0x1000, 0x100);
        for addr in [0, 0xfff, 0x1100, u64::MAX] {
            assert_eq!(
                region.offset_of(addr),
                Err(Error::UnresolvedReference {
                    addr,
                    region: "__objc_data".to_string()
                })
            );
        }
    }

    #[test]
    fn dropped_group_discards_renames() {
        let mut image = MemoryImage::new(BinaryFormat::MachO, 64);
        image.add_function(0x4000, None);
        {
            let mut group = EditGroup::begin(&mut image);
            group.rename_function(0x4000, "-[Foo bar]").unwrap();
        }
        assert_eq!(image.function(0x4000).unwrap().name, None);
    }

    #[test]
    fn committed_group_keeps_renames() {
        let mut image = MemoryImage::new(BinaryFormat::MachO, 64);
        image.add_function(0x4000, None);
        let mut group = EditGroup::begin(&mut image);
        group.rename_function(0x4000, "-[Foo bar]").unwrap();
        group.commit();
        assert_eq!(
            image.function(0x4000).unwrap().name.as_deref(),
            Some("-[Foo bar]")
        );
    }

    #[test]
    fn renaming_a_missing_function_fails() {
        let mut image = MemoryImage::new(BinaryFormat::MachO, 64);
        assert_eq!(
            image.rename_function(0x4000, "-[Foo bar]"),
            Err(Error::MissingFunction(0x4000))
        );
    }
}
