//! Outcomes shared by the analysis passes.
//!
//! Every pass is an optional enrichment: when the image is not something the
//! pass understands it reports why and leaves the image untouched.

use object::BinaryFormat;
use std::fmt;

use crate::image::BinaryView;

/// Why a pass declined to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The image is not a Mach-O binary.
    UnsupportedFormat(BinaryFormat),
    /// The pass does not handle pointers of this many bits.
    UnsupportedPointerWidth(u32),
    /// A section the pass needs is absent.
    MissingRegion(&'static str),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UnsupportedFormat(format) => {
                write!(f, "unsupported binary format {:?}", format)
            }
            SkipReason::UnsupportedPointerWidth(bits) => {
                write!(f, "unsupported pointer width {} bits", bits)
            }
            SkipReason::MissingRegion(name) => write!(f, "missing section {}", name),
        }
    }
}

/// The result of running one pass over an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome<R> {
    Completed(R),
    Skipped(SkipReason),
}

impl<R> PassOutcome<R> {
    pub fn report(&self) -> Option<&R> {
        match self {
            PassOutcome::Completed(report) => Some(report),
            PassOutcome::Skipped(_) => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, PassOutcome::Skipped(_))
    }
}

/// Checks that `view` holds a Mach-O image.
pub fn require_macho<V: BinaryView + ?Sized>(view: &V) -> Result<(), SkipReason> {
    match view.kind() {
        BinaryFormat::MachO => Ok(()),
        other => Err(SkipReason::UnsupportedFormat(other)),
    }
}
