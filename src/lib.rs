//! Mach-O Symbol Recovery Library.
//!
//! This library recovers symbol names for a loaded Mach-O image from the
//! metadata the Objective-C compiler and the static linker leave behind.
//! It is organized into several modules:
//! - `config`: CLI configuration.
//! - `image`: The host contract (`BinaryView`) and an in-memory host.
//! - `macho`: Loads a Mach-O file into an in-memory host.
//! - `reader`: Typed memory reads over a view.
//! - `objc`: Objective-C class metadata decoding and method naming.
//! - `selrefs`: Selector reference table symbols.
//! - `bind`: Dyld bind symbol import.
//! - `pass`: Outcomes shared by the analysis passes.

pub mod bind;
pub mod config;
pub mod error;
pub mod image;
pub mod macho;
pub mod objc;
pub mod pass;
pub mod reader;
pub mod selrefs;
pub mod utils;

pub use error::{Error, Result};
