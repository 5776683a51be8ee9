//! Synthetic Objective-C images for integration tests.

#![allow(dead_code)]

use machsym::image::MemoryImage;
use machsym::objc::class::{ClassObject, ClassReadOnly};
use machsym::objc::methods::{MethodRecord, METHOD_RECORD_SIZE};
use object::BinaryFormat;

pub const METHNAME_BASE: u64 = 0x1_0000_3000;
pub const CONST_BASE: u64 = 0x1_0000_4000;
pub const CLASSLIST_BASE: u64 = 0x1_0000_8000;
pub const SELREFS_BASE: u64 = 0x1_0000_8800;
pub const DATA_BASE: u64 = 0x1_0000_9000;

/// Lays out class lists, class objects, read-only data, method lists and
/// selector strings the way the static linker does.
pub struct ObjcImageBuilder {
    format: BinaryFormat,
    pointer_width: u32,
    class_list: Vec<u64>,
    selrefs: Vec<u64>,
    data: Vec<u8>,
    konst: Vec<u8>,
    methnames: Vec<u8>,
    functions: Vec<u64>,
    index_literals: bool,
}

impl Default for ObjcImageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjcImageBuilder {
    pub fn new() -> Self {
        Self {
            format: BinaryFormat::MachO,
            pointer_width: 64,
            class_list: Vec::new(),
            selrefs: Vec::new(),
            data: Vec::new(),
            konst: Vec::new(),
            methnames: Vec::new(),
            functions: Vec::new(),
            index_literals: false,
        }
    }

    pub fn format(mut self, format: BinaryFormat) -> Self {
        self.format = format;
        self
    }

    pub fn pointer_width(mut self, bits: u32) -> Self {
        self.pointer_width = bits;
        self
    }

    /// Registers strings as host-known literals instead of leaving them to scans.
    pub fn index_literals(mut self) -> Self {
        self.index_literals = true;
        self
    }

    pub fn string(&mut self, s: &str) -> u64 {
        let addr = METHNAME_BASE + self.methnames.len() as u64;
        self.methnames.extend_from_slice(s.as_bytes());
        self.methnames.push(0);
        addr
    }

    pub fn method_list(&mut self, methods: &[(&str, u64)]) -> u64 {
        if methods.is_empty() {
            return 0;
        }
        let records: Vec<MethodRecord> = methods
            .iter()
            .map(|&(selector, imp)| MethodRecord {
                name: self.string(selector),
                types: 0,
                imp,
            })
            .collect();

        let addr = CONST_BASE + self.konst.len() as u64;
        self.konst.extend_from_slice(&(METHOD_RECORD_SIZE as u32).to_le_bytes());
        self.konst.extend_from_slice(&(records.len() as u32).to_le_bytes());
        for record in records {
            self.konst.extend_from_slice(&record.encode());
        }
        addr
    }

    pub fn class_ro(&mut self, ro: ClassReadOnly) -> u64 {
        let addr = CONST_BASE + self.konst.len() as u64;
        self.konst.extend_from_slice(&ro.encode());
        addr
    }

    pub fn class_object(&mut self, class: ClassObject) -> u64 {
        let addr = DATA_BASE + self.data.len() as u64;
        self.data.extend_from_slice(&class.encode());
        addr
    }

    /// Adds a class and its metaclass to the class list, with a discovered
    /// function at every implementation address. Returns the class pointer.
    pub fn add_class(
        &mut self,
        name: &str,
        instance: &[(&str, u64)],
        class: &[(&str, u64)],
    ) -> u64 {
        let name_ptr = self.string(name);
        let instance_list = self.method_list(instance);
        let meta_list = self.method_list(class);
        let instance_ro = self.class_ro(ClassReadOnly {
            name: name_ptr,
            base_methods: instance_list,
            ..Default::default()
        });
        let meta_ro = self.class_ro(ClassReadOnly {
            flags: 1,
            name: name_ptr,
            base_methods: meta_list,
            ..Default::default()
        });
        let metaclass = self.class_object(ClassObject {
            info: meta_ro,
            ..Default::default()
        });
        let pointer = self.class_object(ClassObject {
            isa: metaclass,
            info: instance_ro,
            ..Default::default()
        });
        self.functions
            .extend(instance.iter().chain(class).map(|&(_, imp)| imp));
        self.class_list.push(pointer);
        pointer
    }

    /// Appends an arbitrary pointer to the class list.
    pub fn add_class_pointer(&mut self, pointer: u64) {
        self.class_list.push(pointer);
    }

    pub fn add_selref(&mut self, selector: &str) -> u64 {
        let pointer = self.string(selector);
        self.add_selref_pointer(pointer)
    }

    pub fn add_selref_pointer(&mut self, pointer: u64) -> u64 {
        let slot = SELREFS_BASE + self.selrefs.len() as u64 * 8;
        self.selrefs.push(pointer);
        slot
    }

    pub fn add_function(&mut self, addr: u64) {
        self.functions.push(addr);
    }

    pub fn remove_function(&mut self, addr: u64) {
        self.functions.retain(|&f| f != addr);
    }

    pub fn build(&self) -> MemoryImage {
        let mut image = MemoryImage::new(self.format, self.pointer_width);
        image.add_section("__objc_methname", METHNAME_BASE, self.methnames.clone());
        image.add_section("__objc_const", CONST_BASE, self.konst.clone());
        image.add_section("__objc_classlist", CLASSLIST_BASE, pointers(&self.class_list));
        if !self.selrefs.is_empty() {
            image.add_section("__objc_selrefs", SELREFS_BASE, pointers(&self.selrefs));
        }
        image.add_section("__objc_data", DATA_BASE, self.data.clone());
        if self.index_literals {
            image.index_string_literals(METHNAME_BASE, &self.methnames);
        }
        for &function in &self.functions {
            image.add_function(function, None);
        }
        image
    }
}

fn pointers(values: &[u64]) -> Vec<u8> {
    values.iter().flat_map(|value| value.to_le_bytes()).collect()
}

/// The name of the function at `addr`, if it has one.
pub fn function_name(image: &MemoryImage, addr: u64) -> Option<&str> {
    image.function(addr)?.name.as_deref()
}
