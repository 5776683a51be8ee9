//! The Objective-C naming pass.
//!
//! Walks `__objc_classlist` and renames every method implementation it can
//! resolve to `-[Class selector]` (instance methods) or `+[Class selector]`
//! (class methods, which are the metaclass's instance methods). Existing
//! function names are overwritten.

use tracing::{debug, info, warn};

use super::class::{ClassObject, ClassReadOnly};
use super::methods::{methods_of, Method};
use crate::error::Result;
use crate::image::{BinaryView, EditGroup, Region};
use crate::pass::{require_macho, PassOutcome, SkipReason};
use crate::reader::{MemoryReader, RegionData};

pub const CLASS_LIST_SECTION: &str = "__objc_classlist";
pub const CLASS_DATA_SECTION: &str = "__objc_data";
pub const CLASS_CONST_SECTION: &str = "__objc_const";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Instance,
    Class,
}

impl MethodKind {
    pub fn sigil(self) -> char {
        match self {
            MethodKind::Instance => '-',
            MethodKind::Class => '+',
        }
    }
}

/// Formats the conventional display name of a method.
pub fn method_name(kind: MethodKind, class_name: &str, selector: &str) -> String {
    format!("{}[{} {}]", kind.sigil(), class_name, selector)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveReport {
    /// Entries in the class list.
    pub classes: usize,
    /// Classes whose metadata did not resolve.
    pub skipped_classes: usize,
    /// Method tables that did not resolve. The class's other side still runs.
    pub skipped_method_lists: usize,
    pub renamed: usize,
    /// Methods that did not decode or have no function at their implementation.
    pub skipped_methods: usize,
}

struct ObjcRegions {
    class_list: Region,
    data: Region,
    konst: Region,
}

/// A class with each method list decoded on its own, ready to be applied.
struct ResolvedClass {
    name: String,
    instance_methods: Result<Vec<Result<Method>>>,
    class_methods: Result<Vec<Result<Method>>>,
}

fn check_preconditions<V: BinaryView + ?Sized>(
    view: &V,
) -> std::result::Result<ObjcRegions, SkipReason> {
    require_macho(view)?;
    let width = view.pointer_width();
    if width != 64 {
        return Err(SkipReason::UnsupportedPointerWidth(width));
    }
    let region = |name: &'static str| view.region(name).ok_or(SkipReason::MissingRegion(name));
    Ok(ObjcRegions {
        class_list: region(CLASS_LIST_SECTION)?,
        data: region(CLASS_DATA_SECTION)?,
        konst: region(CLASS_CONST_SECTION)?,
    })
}

/// Renames the Objective-C methods of every class in the image.
///
/// Returns `Skipped` without touching the image if it is not a 64-bit Mach-O
/// with Objective-C class metadata. Errors are returned only when one of the
/// metadata sections themselves cannot be read, before anything is renamed.
/// Classes and methods that fail to resolve are skipped and counted.
pub fn run<V: BinaryView + ?Sized>(view: &mut V) -> Result<PassOutcome<ResolveReport>> {
    let regions = match check_preconditions(&*view) {
        Ok(regions) => regions,
        Err(reason) => {
            debug!("objc method naming skipped: {}", reason);
            return Ok(PassOutcome::Skipped(reason));
        }
    };

    let (class_pointers, data, konst) = {
        let reader = MemoryReader::new(&*view);
        (
            reader.read_pointer_table(&regions.class_list)?,
            reader.read_region(&regions.data)?,
            reader.read_region(&regions.konst)?,
        )
    };

    let mut report = ResolveReport::default();
    let mut group = EditGroup::begin(view);

    for (index, &class_pointer) in class_pointers.iter().enumerate() {
        report.classes += 1;
        let class = match resolve_class(&*group, &data, &konst, class_pointer) {
            Ok(class) => class,
            Err(err) => {
                warn!("skipping class #{} at {:#x}: {}", index, class_pointer, err);
                report.skipped_classes += 1;
                continue;
            }
        };
        debug!("class {} at {:#x}", class.name, class_pointer);

        let sides = [
            (MethodKind::Instance, class.instance_methods),
            (MethodKind::Class, class.class_methods),
        ];
        for (kind, methods) in sides {
            let methods = match methods {
                Ok(methods) => methods,
                Err(err) => {
                    warn!("skipping {:?} methods of {}: {}", kind, class.name, err);
                    report.skipped_method_lists += 1;
                    continue;
                }
            };
            for method in methods {
                let applied = method.and_then(|method| {
                    let name = method_name(kind, &class.name, &method.selector);
                    group.rename_function(method.imp, &name)
                });
                match applied {
                    Ok(()) => report.renamed += 1,
                    Err(err) => {
                        debug!("skipping {:?} method of {}: {}", kind, class.name, err);
                        report.skipped_methods += 1;
                    }
                }
            }
        }
    }

    group.commit();
    info!(
        "objc method naming: {} functions renamed across {} classes \
         ({} classes, {} method lists, {} methods skipped)",
        report.renamed,
        report.classes,
        report.skipped_classes,
        report.skipped_method_lists,
        report.skipped_methods
    );
    Ok(PassOutcome::Completed(report))
}

fn resolve_class<V: BinaryView + ?Sized>(
    view: &V,
    data: &RegionData,
    konst: &RegionData,
    class_pointer: u64,
) -> Result<ResolvedClass> {
    let class = ClassObject::decode(&data.bytes, data.offset_of(class_pointer)?)?;
    let metaclass = ClassObject::decode(&data.bytes, data.offset_of(class.isa)?)?;
    let class_ro = ClassReadOnly::decode(&konst.bytes, konst.offset_of(class.ro_pointer())?)?;
    let metaclass_ro =
        ClassReadOnly::decode(&konst.bytes, konst.offset_of(metaclass.ro_pointer())?)?;

    let reader = MemoryReader::new(view);
    let name = reader.read_cstring_or_known(metaclass_ro.name)?;

    Ok(ResolvedClass {
        name: String::from_utf8_lossy(&name).into_owned(),
        instance_methods: methods_of(&class_ro, konst, reader).map(|methods| methods.collect()),
        class_methods: methods_of(&metaclass_ro, konst, reader).map(|methods| methods.collect()),
    })
}
