//! In-memory image.
//!
//! `MemoryImage` implements `BinaryView` over section contents copied out of a
//! binary. It is what the Mach-O loader produces and what the tests synthesize.

use object::BinaryFormat;
use std::collections::BTreeMap;
use std::io::{self, Write};

use super::{BinaryView, Function, Region, Symbol};
use crate::error::{Error, Result};

/// Section contents mapped at their load address.
#[derive(Debug, Clone)]
pub struct MemorySection {
    pub name: String,
    pub start: u64,
    pub data: Vec<u8>,
}

impl MemorySection {
    fn region(&self) -> Region {
        Region::new(self.name.clone(), self.start, self.data.len() as u64)
    }
}

#[derive(Debug, Clone)]
struct Snapshot {
    functions: BTreeMap<u64, Function>,
    symbols: BTreeMap<u64, Symbol>,
}

#[derive(Debug, Clone)]
pub struct MemoryImage {
    format: BinaryFormat,
    pointer_width: u32,
    sections: Vec<MemorySection>,
    /// Known string literals: start address to length without terminator.
    literals: BTreeMap<u64, usize>,
    functions: BTreeMap<u64, Function>,
    symbols: BTreeMap<u64, Symbol>,
    /// State to restore if the open edit group is discarded.
    snapshot: Option<Snapshot>,
}

impl MemoryImage {
    pub fn new(format: BinaryFormat, pointer_width: u32) -> Self {
        Self {
            format,
            pointer_width,
            sections: Vec::new(),
            literals: BTreeMap::new(),
            functions: BTreeMap::new(),
            symbols: BTreeMap::new(),
            snapshot: None,
        }
    }

    pub fn add_section(&mut self, name: impl Into<String>, start: u64, data: Vec<u8>) {
        self.sections.push(MemorySection {
            name: name.into(),
            start,
            data,
        });
    }

    pub fn add_string_literal(&mut self, addr: u64, len: usize) {
        self.literals.insert(addr, len);
    }

    /// Indexes every NUL-terminated string in `data`, which is mapped at `start`.
    pub fn index_string_literals(&mut self, start: u64, data: &[u8]) {
        let mut offset = 0;
        while offset < data.len() {
            let Some(len) = data[offset..].iter().position(|&b| b == 0) else {
                break;
            };
            if len > 0 {
                self.add_string_literal(start + offset as u64, len);
            }
            offset += len + 1;
        }
    }

    /// Records a discovered function. An existing entry keeps its name unless
    /// it had none.
    pub fn add_function(&mut self, start: u64, name: Option<String>) {
        let function = self.functions.entry(start).or_insert_with(|| Function::new(start));
        if function.name.is_none() {
            function.name = name;
        }
    }

    pub fn function(&self, addr: u64) -> Option<&Function> {
        self.functions.get(&addr)
    }

    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.functions.values()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }

    /// Every named address, sorted. A function name wins over a symbol at the
    /// same address.
    pub fn names(&self) -> BTreeMap<u64, &str> {
        let mut names: BTreeMap<u64, &str> = self
            .symbols
            .values()
            .map(|symbol| (symbol.address, symbol.name.as_str()))
            .collect();
        for function in self.functions.values() {
            if let Some(name) = &function.name {
                names.insert(function.start, name.as_str());
            }
        }
        names
    }

    /// Writes one `0x<address> <name>` line per named address.
    pub fn write_names<W: Write>(&self, mut out: W) -> io::Result<()> {
        for (addr, name) in self.names() {
            writeln!(out, "{:#018x} {}", addr, name)?;
        }
        Ok(())
    }

    fn section_containing(&self, addr: u64, len: usize) -> Option<&MemorySection> {
        self.sections.iter().find(|section| {
            addr >= section.start
                && (addr - section.start)
                    .checked_add(len as u64)
                    .is_some_and(|end| end <= section.data.len() as u64)
        })
    }
}

impl BinaryView for MemoryImage {
    fn kind(&self) -> BinaryFormat {
        self.format
    }

    fn pointer_width(&self) -> u32 {
        self.pointer_width
    }

    fn regions(&self) -> Vec<Region> {
        self.sections.iter().map(MemorySection::region).collect()
    }

    fn read(&self, addr: u64, len: usize) -> Result<Vec<u8>> {
        let section = self
            .section_containing(addr, len)
            .ok_or(Error::OutOfBounds { addr, len })?;
        let offset = (addr - section.start) as usize;
        Ok(section.data[offset..offset + len].to_vec())
    }

    fn string_literal_at(&self, addr: u64) -> Option<Vec<u8>> {
        let len = *self.literals.get(&addr)?;
        self.read(addr, len).ok()
    }

    fn function_at(&mut self, addr: u64) -> Option<&mut Function> {
        self.functions.get_mut(&addr)
    }

    fn symbol_at(&self, addr: u64) -> Option<&Symbol> {
        self.symbols.get(&addr)
    }

    fn define_user_symbol(&mut self, symbol: Symbol) {
        self.symbols.insert(symbol.address, symbol);
    }

    fn begin_edit_group(&mut self) {
        if self.snapshot.is_none() {
            self.snapshot = Some(Snapshot {
                functions: self.functions.clone(),
                symbols: self.symbols.clone(),
            });
        }
    }

    fn commit_edit_group(&mut self) {
        self.snapshot = None;
    }

    fn discard_edit_group(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            self.functions = snapshot.functions;
            self.symbols = snapshot.symbols;
        }
    }
}
