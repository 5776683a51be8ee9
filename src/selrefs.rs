//! Selector reference symbols.
//!
//! Each slot of `__objc_selrefs` holds a pointer to a selector string. This pass
//! gives every slot without a symbol a data symbol named after its selector, so
//! loads through the table read as `selRef_InitWithFrame:` in a disassembly.

use tracing::{debug, info};

use crate::image::{BinaryView, EditGroup, Symbol, SymbolKind};
use crate::pass::{require_macho, PassOutcome, SkipReason};
use crate::reader::MemoryReader;

pub const SELREFS_SECTION: &str = "__objc_selrefs";
pub const SYMBOL_PREFIX: &str = "selRef_";
/// Longest name produced by [`make_name`], in characters.
pub const MAX_NAME_LEN: usize = 100;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelrefReport {
    pub defined: usize,
    /// Slots that already had a symbol.
    pub existing: usize,
    /// Slots whose pointer or selector could not be read.
    pub unreadable: usize,
}

/// Capitalizes every whitespace-separated word of `string` and joins them,
/// keeping at most `max_len` characters.
pub fn make_name(string: &str, max_len: usize) -> String {
    string
        .split_whitespace()
        .flat_map(|word| {
            let mut chars = word.chars();
            let first = chars.next().into_iter().flat_map(char::to_uppercase);
            first.chain(chars)
        })
        .take(max_len)
        .collect()
}

pub fn symbol_name(selector: &str) -> String {
    format!("{}{}", SYMBOL_PREFIX, make_name(selector, MAX_NAME_LEN))
}

/// Defines a `selRef_` symbol for every selector reference slot.
pub fn run<V: BinaryView + ?Sized>(view: &mut V) -> PassOutcome<SelrefReport> {
    if let Err(reason) = require_macho(&*view) {
        return PassOutcome::Skipped(reason);
    }
    let Some(region) = view.region(SELREFS_SECTION) else {
        return PassOutcome::Skipped(SkipReason::MissingRegion(SELREFS_SECTION));
    };
    let step = u64::from(view.pointer_width() / 8);
    if step == 0 {
        return PassOutcome::Skipped(SkipReason::UnsupportedPointerWidth(view.pointer_width()));
    }

    let mut report = SelrefReport::default();
    let mut group = EditGroup::begin(view);

    let mut slot = region.start;
    while slot.saturating_add(step) <= region.end() {
        let address = slot;
        slot += step;

        if group.symbol_at(address).is_some() {
            report.existing += 1;
            continue;
        }

        let selector = {
            let reader = MemoryReader::new(&*group);
            reader
                .read_pointer(address)
                .and_then(|pointer| reader.read_cstring_or_known(pointer))
        };
        let selector = match selector {
            Ok(selector) => String::from_utf8_lossy(&selector).into_owned(),
            Err(err) => {
                debug!("skipping selector reference at {:#x}: {}", address, err);
                report.unreadable += 1;
                continue;
            }
        };

        group.define_user_symbol(Symbol {
            address,
            name: symbol_name(&selector),
            kind: SymbolKind::Data,
        });
        report.defined += 1;
    }

    group.commit();
    info!(
        "selector references: {} symbols defined ({} already named, {} unreadable)",
        report.defined, report.existing, report.unreadable
    );
    PassOutcome::Completed(report)
}
