//! Decides whether overcommit prevention applies to this process.

use std::io::{ErrorKind, Read};

use crate::config::{self, HostContext};

/// Size of both the read chunk and the argument buffer used while scanning the command line.
///
/// An argument keeps at most `ARGUMENT_BUFFER_LEN - 1` bytes; the rest is dropped.
pub const ARGUMENT_BUFFER_LEN: usize = 1024;

pub(crate) fn resolve_prevention<C: HostContext + ?Sized>(context: &C) -> bool {
    let echo = config::toggle(context, config::EXEMPT_DEBUG_VAR);

    if let Some(pattern) = config::exempt_pattern(context) {
        match context.open_cmdline() {
            Ok(cmdline) => {
                if echo {
                    tracing::info!(target: "overcommit", "scanning lower-cased command line");
                }

                if cmdline_contains(cmdline, &pattern, echo) {
                    if echo {
                        tracing::info!(
                            target: "overcommit",
                            pattern = %String::from_utf8_lossy(&pattern),
                            "process is exempt; overcommit prevention is off for this process"
                        );
                    }
                    return false;
                }
            }
            Err(err) => {
                tracing::debug!(
                    target: "overcommit",
                    error = %err,
                    "failed to open command line while matching exemptions"
                );
            }
        }
    }

    config::toggle(context, config::PREVENT_OVERCOMMIT_VAR)
}

/// Scans a NUL-separated command line and reports whether any non-empty, lower-cased argument
/// contains `pattern`.
///
/// Arguments longer than the scan buffer are truncated rather than skipped, so a match within
/// their first `ARGUMENT_BUFFER_LEN - 1` bytes still counts. Bytes after the last NUL do not form
/// an argument.
pub fn cmdline_contains(mut cmdline: impl Read, pattern: &[u8], echo: bool) -> bool {
    let mut chunk = [0u8; ARGUMENT_BUFFER_LEN];
    let mut argument = [0u8; ARGUMENT_BUFFER_LEN];
    let mut len = 0;
    let mut matched = false;

    loop {
        let read = match cmdline.read(&mut chunk) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => {
                tracing::debug!(
                    target: "overcommit",
                    error = %err,
                    "failed to read command line while matching exemptions"
                );
                break;
            }
        };

        for &byte in &chunk[..read] {
            if byte != 0 {
                if len < ARGUMENT_BUFFER_LEN - 1 {
                    argument[len] = byte.to_ascii_lowercase();
                    len += 1;
                }
                continue;
            }

            let token = &argument[..len];
            len = 0;

            if token.is_empty() {
                continue;
            }

            if echo {
                tracing::info!(
                    target: "overcommit",
                    argument = %String::from_utf8_lossy(token),
                    "command line argument"
                );
            }

            if contains(token, pattern) {
                if !echo {
                    return true;
                }

                tracing::info!(
                    target: "overcommit",
                    pattern = %String::from_utf8_lossy(pattern),
                    argument = %String::from_utf8_lossy(token),
                    "exemption pattern found in command line argument"
                );
                matched = true;
            }
        }
    }

    matched
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|window| window == needle)
}
