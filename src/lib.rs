//! Overcommit exposes the commit accounting a virtual memory emulation layer needs on a host that
//! overcommits: whether a commit should be [admitted](is_memory_available_for_commit) at all, and
//! how to [make committed pages resident](force_resident) so that later checks see them.
//!
//! ## Terminology
//!
//! - A **committed** region of memory is one the guest was promised it can access without
//!   running out of memory. Guests expect commits to fail up front once RAM plus swap is used up.
//!
//! - An **overcommitting** host hands out commits freely and only backs pages on first access.
//!   When memory runs out, the failure surfaces much later as the host's OOM handling rather than
//!   as a failed commit in the guest.
//!
//! - A **resident** page has actual RAM or swap behind it. Only resident pages show up in the
//!   system's free-memory counters.
//!
//! ## Flow
//!
//! Before a commit, callers ask [`is_overcommit_prevention_enabled`]. If it says yes, they ask
//! [`is_memory_available_for_commit`] and fail the commit when it says no. After a successful
//! commit, [`force_resident`] faults the pages in. [`may_commit`] combines the first two steps.
//!
//! The admission check is a heuristic, not a reservation: nothing stops another thread or process
//! from using up the headroom between the check and the commit.
//!
//! ## Configuration
//!
//! Behavior is controlled through environment variables, each read once per process:
//!
//! - `WINE_PREVENT_OVERCOMMIT`: non-zero enables prevention.
//! - `WINE_PREVENT_OVERCOMMIT_EXEMPT`: a case-insensitive substring; processes with a command line
//!   argument containing it are exempt.
//! - `WINE_PREVENT_OVERCOMMIT_EXEMPT_DEBUG`: non-zero logs every argument considered.
//! - `WINE_OVERCOMMIT_USE_MADVISE`: non-zero populates pages with `madvise` instead of touching
//!   them.

use std::ptr::NonNull;

use lazy_static::lazy_static;

mod admission;
mod config;
mod flag;
mod policy;
mod protection;
mod residency;
mod sys;


pub use admission::MemorySnapshot;
pub use config::{
    Host, HostContext, EXEMPT_DEBUG_VAR, EXEMPT_VAR, PREVENT_OVERCOMMIT_VAR, USE_MADVISE_VAR,
};
pub use flag::LazyFlag;
pub use policy::{cmdline_contains, ARGUMENT_BUFFER_LEN};
pub use protection::{has_write_flags, has_writecopy_flags, Capabilities, Protection};
pub use residency::{force_resident_with, ResidencyStrategy};
pub use sys::{page_size, PopulateMode, SystemError};

#[cfg(unix)]
pub use sys::is_memory_backed_file;

/// Commit accounting decisions for one host.
///
/// Both process-wide decisions are resolved on first use and never revisited, even if the
/// environment changes afterwards.
#[derive(Debug)]
pub struct CommitGuard<C> {
    context: C,
    prevent_overcommit: LazyFlag,
    use_madvise: LazyFlag,
}

impl<C: HostContext> CommitGuard<C> {
    pub const fn new(context: C) -> Self {
        Self {
            context,
            prevent_overcommit: LazyFlag::new(),
            use_madvise: LazyFlag::new(),
        }
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn is_overcommit_prevention_enabled(&self) -> bool {
        self.prevent_overcommit
            .get_or_init(|| policy::resolve_prevention(&self.context))
    }

    pub fn use_madvise(&self) -> bool {
        self.use_madvise
            .get_or_init(|| config::toggle(&self.context, USE_MADVISE_VAR))
    }

    pub fn residency_strategy(&self) -> ResidencyStrategy {
        ResidencyStrategy::from_use_madvise(self.use_madvise())
    }

    /// Checks a fresh memory snapshot, regardless of whether prevention is enabled.
    pub fn is_memory_available_for_commit(&self, size: usize) -> bool {
        admission::memory_available_for_commit(&self.context, size as u64)
    }

    /// Whether a commit of `size` bytes may go ahead under the configured policy.
    pub fn may_commit(&self, size: usize) -> bool {
        !self.is_overcommit_prevention_enabled() || self.is_memory_available_for_commit(size)
    }

    /// ## Safety
    ///
    /// See [`force_resident_with`].
    pub unsafe fn force_resident(&self, base: NonNull<u8>, size: usize, protect: Protection) {
        force_resident_with(self.residency_strategy(), base, size, protect);
    }
}

lazy_static! {
    static ref PROCESS_GUARD: CommitGuard<Host> = CommitGuard::new(Host);
}

/// The guard backed by this process' environment and the running system.
pub fn process_guard() -> &'static CommitGuard<Host> {
    &PROCESS_GUARD
}

/// Whether commits in this process should be checked against available memory.
pub fn is_overcommit_prevention_enabled() -> bool {
    PROCESS_GUARD.is_overcommit_prevention_enabled()
}

/// Whether [`force_resident`] populates pages with `madvise` rather than touching them.
pub fn overcommit_use_madvise() -> bool {
    PROCESS_GUARD.use_madvise()
}

/// Whether enough memory is available right now to commit `size` more bytes.
pub fn is_memory_available_for_commit(size: usize) -> bool {
    PROCESS_GUARD.is_memory_available_for_commit(size)
}

/// Whether a commit of `size` bytes may go ahead: always when prevention is off for this process,
/// otherwise only if [`is_memory_available_for_commit`] agrees.
pub fn may_commit(size: usize) -> bool {
    PROCESS_GUARD.may_commit(size)
}

/// Faults in freshly committed pages using the process-wide strategy.
///
/// ## Safety
///
/// See [`force_resident_with`].
pub unsafe fn force_resident(base: NonNull<u8>, size: usize, protect: Protection) {
    PROCESS_GUARD.force_resident(base, size, protect);
}
