//! Forcing freshly committed pages to become physically resident.
//!
//! Linux only charges memory to the system once a page is first faulted in, so a commit that is
//! never touched does not show up in the counters the admission check reads. Faulting the pages
//! in right after the commit keeps those counters honest.

use std::ptr::{self, NonNull};

use crate::{
    protection::Protection,
    sys::{self, PopulateMode},
};

/// How pages are faulted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResidencyStrategy {
    /// A single `madvise` population request over the whole range, falling back to
    /// [`Touch`](Self::Touch) if the kernel refuses it.
    Populate,
    /// Access one byte of every page by hand.
    Touch,
}

impl ResidencyStrategy {
    pub(crate) fn from_use_madvise(use_madvise: bool) -> Self {
        if use_madvise {
            Self::Populate
        } else {
            Self::Touch
        }
    }
}

/// Faults in `[base, base + size)` according to `protect`.
///
/// Ranges that are not readable, and guard ranges, are left completely untouched. Writable ranges
/// are faulted in for writing so that copy-on-write pages get their private copy. Failures are
/// never reported: the worst outcome is pages staying non-resident.
///
/// ## Safety
///
/// The range must be mapped with host permissions at least as permissive as `protect` (readable,
/// and writable if `protect` grants write access). No other thread may write to the range while
/// this runs, since the manual walk writes bytes back.
pub unsafe fn force_resident_with(
    strategy: ResidencyStrategy,
    base: NonNull<u8>,
    size: usize,
    protect: Protection,
) {
    if !protect.wants_residency() {
        return;
    }

    let writable = protect.grants_write();

    if strategy == ResidencyStrategy::Populate {
        let mode = if writable {
            PopulateMode::Write
        } else {
            PopulateMode::Read
        };

        match sys::populate(base, size, mode) {
            Ok(()) => return,
            Err(err) => {
                tracing::debug!(
                    target: "overcommit",
                    error = %err,
                    size,
                    ?mode,
                    "populate advice failed; touching pages by hand"
                );
            }
        }
    }

    touch_pages(base, size, writable);
}

/// Reads one byte from every page and, if `writable`, stores the very same byte back.
///
/// The stores do not change memory contents; their only purpose is the write fault, which gives
/// copy-on-write pages their private copy. The volatile accesses keep the compiler from dropping
/// what looks like a no-op.
unsafe fn touch_pages(base: NonNull<u8>, size: usize, writable: bool) {
    let base = base.as_ptr();

    for offset in (0..size).step_by(sys::page_size()) {
        let byte = base.add(offset);
        let value = ptr::read_volatile(byte);

        if writable {
            ptr::write_volatile(byte, value);
        }
    }
}
