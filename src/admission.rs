use std::sync::OnceLock;

use crate::config::HostContext;

/// A point-in-time read of the system memory counters, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemorySnapshot {
    pub total_ram: u64,
    pub total_swap: u64,
    pub free_ram: u64,
    pub free_swap: u64,
}

impl MemorySnapshot {
    /// The most memory that can be committed at once: RAM plus swap.
    pub fn commit_limit(&self) -> u64 {
        self.total_ram.saturating_add(self.total_swap)
    }

    pub fn committed(&self) -> u64 {
        self.commit_limit()
            .saturating_sub(self.free_ram.saturating_add(self.free_swap))
    }

    /// Memory still available for commits. Never wraps: a snapshot whose counters disagree reads
    /// as zero headroom.
    pub fn headroom(&self) -> u64 {
        self.commit_limit().saturating_sub(self.committed())
    }

    /// Whether `size` more bytes fit strictly below the commit limit.
    pub fn admits(&self, size: u64) -> bool {
        self.headroom() > size
    }
}

/// Takes a fresh snapshot and decides whether a commit of `size` bytes may proceed.
///
/// The answer is only a hint: nothing reserves the headroom between this check and the commit
/// that follows, so another thread or process may consume it first.
pub(crate) fn memory_available_for_commit<C: HostContext + ?Sized>(
    context: &C,
    size: u64,
) -> bool {
    match context.memory_snapshot() {
        Ok(snapshot) => snapshot.admits(size),
        Err(err) => {
            static REPORTED: OnceLock<()> = OnceLock::new();
            if REPORTED.set(()).is_ok() {
                tracing::warn!(
                    target: "overcommit",
                    error = %err,
                    "failed to read system memory counters; commits will not be limited"
                );
            }
            true
        }
    }
}
