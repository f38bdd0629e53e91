use std::io::Read;

use crate::{admission::MemorySnapshot, sys};

/// Non-zero turns on overcommit prevention.
pub const PREVENT_OVERCOMMIT_VAR: &str = "WINE_PREVENT_OVERCOMMIT";

/// Substring which, found in any argument of the process' command line, exempts it from
/// overcommit prevention.
pub const EXEMPT_VAR: &str = "WINE_PREVENT_OVERCOMMIT_EXEMPT";

/// Non-zero echoes every lower-cased command line argument while matching exemptions.
pub const EXEMPT_DEBUG_VAR: &str = "WINE_PREVENT_OVERCOMMIT_EXEMPT_DEBUG";

/// Non-zero selects `madvise`-based population over touching every page by hand.
pub const USE_MADVISE_VAR: &str = "WINE_OVERCOMMIT_USE_MADVISE";

/// Everything the commit guard needs to learn about its host.
pub trait HostContext {
    fn var(&self, key: &str) -> Option<String>;

    /// Opens the raw, NUL-separated command line of the current process.
    fn open_cmdline(&self) -> std::io::Result<Box<dyn Read + '_>>;

    fn memory_snapshot(&self) -> Result<MemorySnapshot, sys::SystemError>;
}

/// The real process environment and operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct Host;

impl HostContext for Host {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var_os(key).map(|value| value.to_string_lossy().into_owned())
    }

    fn open_cmdline(&self) -> std::io::Result<Box<dyn Read + '_>> {
        Ok(Box::new(sys::open_cmdline()?))
    }

    fn memory_snapshot(&self) -> Result<MemorySnapshot, sys::SystemError> {
        sys::memory_snapshot()
    }
}

pub fn toggle<C: HostContext + ?Sized>(context: &C, key: &str) -> bool {
    context
        .var(key)
        .map_or(false, |value| is_enabled_value(&value))
}

/// The lower-cased exemption pattern, if set. An empty pattern is kept: it is contained in every
/// argument and so exempts any process with a non-empty command line.
pub fn exempt_pattern<C: HostContext + ?Sized>(context: &C) -> Option<Vec<u8>> {
    let pattern = context.var(EXEMPT_VAR)?;
    Some(pattern.into_bytes().to_ascii_lowercase())
}

/// Reads a toggle the way glibc's `atoi` would and reports whether the result is non-zero.
pub fn is_enabled_value(raw: &str) -> bool {
    atoi(raw) != 0
}

/// `(int) strtol(raw, NULL, 10)` on an LP64 host.
///
/// C-locale whitespace and a single sign are skipped, then decimal digits are consumed up to the
/// first non-digit, saturating at the `long` bounds. The result is truncated to `int`, so
/// `"4294967296"` reads as zero. Anything that yields no digits reads as zero.
fn atoi(raw: &str) -> i32 {
    let raw = raw.trim_start_matches(|c| matches!(c, ' ' | '\t' | '\n' | '\x0b' | '\x0c' | '\r'));
    let (negative, digits) = match raw.as_bytes().first() {
        Some(b'-') => (true, &raw[1..]),
        Some(b'+') => (false, &raw[1..]),
        _ => (false, raw),
    };

    let mut value: i64 = 0;
    for digit in digits.bytes().take_while(u8::is_ascii_digit) {
        let digit = i64::from(digit - b'0');
        value = if negative {
            value
                .checked_mul(10)
                .and_then(|v| v.checked_sub(digit))
                .unwrap_or(i64::MIN)
        } else {
            value
                .checked_mul(10)
                .and_then(|v| v.checked_add(digit))
                .unwrap_or(i64::MAX)
        };
    }

    value as i32
}
