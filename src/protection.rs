//! Classification of guest page protections.
//!
//! Guests describe protections with the Win32 `PAGE_*` encoding. Rather than testing raw bits at
//! every call site, each known constant is translated once into a set of [`Capabilities`], and all
//! predicates are phrased in terms of those.

use bitflags::bitflags;
use windows_sys::Win32::System::Memory::{
    PAGE_EXECUTE, PAGE_EXECUTE_READ, PAGE_EXECUTE_READWRITE, PAGE_EXECUTE_WRITECOPY, PAGE_GUARD,
    PAGE_NOACCESS, PAGE_NOCACHE, PAGE_PROTECTION_FLAGS, PAGE_READONLY, PAGE_READWRITE,
    PAGE_WRITECOMBINE, PAGE_WRITECOPY,
};

bitflags! {
    /// What a protection allows an access to do.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u8 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
        /// Writes land in a private copy of the page.
        const WRITECOPY = 1 << 2;
        const EXECUTE = 1 << 3;
        /// The first access traps.
        const GUARD = 1 << 4;
    }
}

/// Guest protection constants and the capabilities each one grants.
const TRANSLATION: &[(PAGE_PROTECTION_FLAGS, Capabilities)] = &[
    (PAGE_NOACCESS, Capabilities::empty()),
    (PAGE_READONLY, Capabilities::READ),
    (
        PAGE_READWRITE,
        Capabilities::READ.union(Capabilities::WRITE),
    ),
    (
        PAGE_WRITECOPY,
        Capabilities::READ
            .union(Capabilities::WRITE)
            .union(Capabilities::WRITECOPY),
    ),
    (PAGE_EXECUTE, Capabilities::EXECUTE),
    (
        PAGE_EXECUTE_READ,
        Capabilities::EXECUTE.union(Capabilities::READ),
    ),
    (
        PAGE_EXECUTE_READWRITE,
        Capabilities::EXECUTE
            .union(Capabilities::READ)
            .union(Capabilities::WRITE),
    ),
    (
        PAGE_EXECUTE_WRITECOPY,
        Capabilities::EXECUTE
            .union(Capabilities::READ)
            .union(Capabilities::WRITE)
            .union(Capabilities::WRITECOPY),
    ),
    (PAGE_GUARD, Capabilities::GUARD),
    (PAGE_NOCACHE, Capabilities::empty()),
    (PAGE_WRITECOMBINE, Capabilities::empty()),
];

/// A guest page protection mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Protection(u32);

impl Protection {
    pub const fn new(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Unknown bits contribute nothing.
    pub fn capabilities(self) -> Capabilities {
        TRANSLATION
            .iter()
            .filter(|(bits, _)| self.0 & bits != 0)
            .fold(Capabilities::empty(), |acc, (_, caps)| acc | *caps)
    }

    pub fn grants_write(self) -> bool {
        self.capabilities().contains(Capabilities::WRITE)
    }

    pub fn grants_writecopy(self) -> bool {
        self.capabilities().contains(Capabilities::WRITECOPY)
    }

    pub fn is_guard(self) -> bool {
        self.capabilities().contains(Capabilities::GUARD)
    }

    pub fn is_readable(self) -> bool {
        self.capabilities().contains(Capabilities::READ)
    }

    /// Whether pages with this protection should be faulted in after a commit. Guard pages never
    /// are, whatever else they allow.
    pub fn wants_residency(self) -> bool {
        let caps = self.capabilities();
        caps.contains(Capabilities::READ) && !caps.contains(Capabilities::GUARD)
    }
}

impl From<u32> for Protection {
    fn from(bits: u32) -> Self {
        Self(bits)
    }
}

/// Whether the raw guest protection mask grants write access.
pub fn has_write_flags(protect: u32) -> bool {
    Protection(protect).grants_write()
}

/// Whether the raw guest protection mask grants writecopy access.
pub fn has_writecopy_flags(protect: u32) -> bool {
    Protection(protect).grants_writecopy()
}
