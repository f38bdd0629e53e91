use std::sync::atomic::{AtomicU8, Ordering};

const UNKNOWN: u8 = 0;
const OFF: u8 = 1;
const ON: u8 = 2;

/// A boolean that is computed at most once and never changes afterwards.
///
/// Racing initializers may each run their closure, but only the first one to publish wins and
/// every caller observes that value.
#[derive(Debug, Default)]
pub struct LazyFlag(AtomicU8);

impl LazyFlag {
    pub const fn new() -> Self {
        Self(AtomicU8::new(UNKNOWN))
    }

    pub fn get(&self) -> Option<bool> {
        decode(self.0.load(Ordering::Acquire))
    }

    pub fn get_or_init(&self, init: impl FnOnce() -> bool) -> bool {
        if let Some(value) = self.get() {
            return value;
        }

        let computed = if init() { ON } else { OFF };
        let stored = match self
            .0
            .compare_exchange(UNKNOWN, computed, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => computed,
            Err(existing) => existing,
        };

        stored == ON
    }
}

fn decode(raw: u8) -> Option<bool> {
    match raw {
        OFF => Some(false),
        ON => Some(true),
        _ => None,
    }
}
