//! Dyld bind symbol import.
//!
//! Symbols bound by dyld at load time (imported functions in `__got`, imported
//! data elsewhere) are listed by `dyldinfo -bind`. This module captures or
//! accepts that listing, parses it, and defines a symbol for every bound address
//! that does not have one yet.

use anyhow::{bail, Context};
use std::path::Path;
use std::process::Command;
use tracing::{debug, info};

use crate::image::{BinaryView, EditGroup, Symbol, SymbolKind};
use crate::pass::{require_macho, PassOutcome};

/// Leading lines of `dyldinfo -bind` output before the first entry.
const HEADER_LINES: usize = 2;

/// The section holding imported function pointers.
pub const GOT_SECTION: &str = "__got";

/// One line of `dyldinfo -bind` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindEntry {
    pub segment: String,
    pub section: String,
    pub address: u64,
    pub dylib: String,
    pub symbol: String,
}

impl BindEntry {
    pub fn symbol_kind(&self) -> SymbolKind {
        if self.section == GOT_SECTION {
            SymbolKind::ImportedFunction
        } else {
            SymbolKind::Data
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindReport {
    pub defined: usize,
    /// Entries whose address already had a symbol.
    pub existing: usize,
}

/// Runs `xcrun dyldinfo -bind` on `path` and returns its output.
pub fn capture(path: &Path) -> anyhow::Result<String> {
    if !cfg!(target_os = "macos") {
        bail!(
            "dyldinfo is only available on macOS; \
             capture its output there and pass --bind-listing"
        );
    }
    let output = Command::new("xcrun")
        .arg("dyldinfo")
        .arg("-bind")
        .arg(path)
        .output()
        .context("failed to run xcrun dyldinfo")?;
    if !output.status.success() {
        bail!(
            "dyldinfo failed on {}: {}",
            path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    String::from_utf8(output.stdout).context("dyldinfo output is not UTF-8")
}

/// Parses a `dyldinfo -bind` listing.
///
/// Each entry line reads `segment section address type addend dylib symbol`.
/// Lines that do not parse are ignored.
pub fn parse(listing: &str) -> Vec<BindEntry> {
    listing
        .lines()
        .skip(HEADER_LINES)
        .filter_map(|line| {
            let entry = parse_line(line);
            if entry.is_none() && !line.trim().is_empty() {
                debug!("ignoring bind line: {}", line);
            }
            entry
        })
        .collect()
}

fn parse_line(line: &str) -> Option<BindEntry> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let [segment, section, address, _kind, _addend, dylib, symbol, ..] = fields.as_slice() else {
        return None;
    };
    Some(BindEntry {
        segment: segment.to_string(),
        section: section.to_string(),
        address: parse_address(address)?,
        dylib: dylib.to_string(),
        symbol: symbol.to_string(),
    })
}

fn parse_address(text: &str) -> Option<u64> {
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}

/// Defines a symbol for every bind entry whose address has none.
pub fn run<V: BinaryView + ?Sized>(view: &mut V, entries: &[BindEntry]) -> PassOutcome<BindReport> {
    if let Err(reason) = require_macho(&*view) {
        return PassOutcome::Skipped(reason);
    }

    let mut report = BindReport::default();
    let mut group = EditGroup::begin(view);
    for entry in entries {
        if group.symbol_at(entry.address).is_some() {
            report.existing += 1;
            continue;
        }
        group.define_user_symbol(Symbol {
            address: entry.address,
            name: entry.symbol.clone(),
            kind: entry.symbol_kind(),
        });
        report.defined += 1;
    }
    group.commit();

    info!(
        "bind symbols: {} defined ({} already named)",
        report.defined, report.existing
    );
    PassOutcome::Completed(report)
}
