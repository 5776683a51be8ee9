use machsym::image::{BinaryView, Region};
use machsym::macho;
use object::write::{Mangling, Object, StandardSection, Symbol, SymbolSection};
use object::{
    Architecture, BinaryFormat, Endianness, SectionKind, SymbolFlags, SymbolKind, SymbolScope,
};

/// An arm64 object file with a 16 byte `__text` holding `_main` and a selector
/// name section.
fn object_file() -> Vec<u8> {
    let mut obj = Object::new(BinaryFormat::MachO, Architecture::Aarch64, Endianness::Little);
    obj.set_mangling(Mangling::None);

    let text = obj.section_id(StandardSection::Text);
    obj.append_section_data(text, &[0; 16], 4);
    let methname = obj.add_section(
        b"__TEXT".to_vec(),
        b"__objc_methname".to_vec(),
        SectionKind::ReadOnlyString,
    );
    obj.append_section_data(methname, b"init\0dealloc\0", 1);

    obj.add_symbol(Symbol {
        name: b"_main".to_vec(),
        value: 0,
        size: 16,
        kind: SymbolKind::Text,
        scope: SymbolScope::Linkage,
        weak: false,
        section: SymbolSection::Section(text),
        flags: SymbolFlags::None,
    });
    obj.write().unwrap()
}

#[test]
fn sections_become_regions() {
    let image = macho::load(&object_file()).unwrap();
    assert_eq!(image.kind(), BinaryFormat::MachO);
    assert_eq!(image.pointer_width(), 64);
    assert_eq!(
        image.regions(),
        vec![
            Region::new("__text", 0, 16),
            Region::new("__objc_methname", 16, 13),
        ]
    );
    assert_eq!(image.read(16, 4).unwrap(), b"init");
}

#[test]
fn selector_names_are_indexed_as_literals() {
    let image = macho::load(&object_file()).unwrap();
    assert_eq!(image.string_literal_at(16).as_deref(), Some(&b"init"[..]));
    assert_eq!(image.string_literal_at(21).as_deref(), Some(&b"dealloc"[..]));
    assert_eq!(image.string_literal_at(0), None);
}

#[test]
fn text_symbols_become_named_functions() {
    let image = macho::load(&object_file()).unwrap();
    let functions: Vec<_> = image.functions().collect();
    assert_eq!(functions.len(), 1);
    assert_eq!(functions[0].start, 0);
    assert_eq!(functions[0].name.as_deref(), Some("_main"));
    assert_eq!(image.symbol_at(0).map(|symbol| symbol.name.as_str()), Some("_main"));
}

#[test]
fn universal_binaries_are_rejected() {
    let mut fat = vec![0xca, 0xfe, 0xba, 0xbe, 0, 0, 0, 1];
    fat.resize(64, 0);
    let err = macho::load(&fat).unwrap_err();
    assert!(err.to_string().contains("lipo"), "{}", err);
}
