//! Hosts without the primitives commit accounting relies on. Every operation fails, which the
//! callers turn into their documented defaults.

use std::{
    error::Error,
    fmt,
    fs::File,
    io,
    ptr::NonNull,
    sync::atomic::{AtomicUsize, Ordering},
};

use super::PopulateMode;
use crate::admission::MemorySnapshot;

#[derive(Debug, Clone)]
pub struct SystemError(&'static str);

impl Error for SystemError {}

impl fmt::Display for SystemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} is not supported on this host", self.0)
    }
}

pub fn page_size() -> usize {
    static PAGE_SIZE: AtomicUsize = AtomicUsize::new(0);

    let mut size = PAGE_SIZE.load(Ordering::Relaxed);
    if size == 0 {
        size = query_page_size();
        PAGE_SIZE.store(size, Ordering::Relaxed);
    }
    size
}

cfgenius::cond! {
    if cfg(unix) {
        fn query_page_size() -> usize {
            unsafe { libc::sysconf(libc::_SC_PAGESIZE) as usize }
        }
    } else if cfg(windows) {
        fn query_page_size() -> usize {
            use std::mem::MaybeUninit;
            use windows_sys::Win32::System::SystemInformation::{GetSystemInfo, SYSTEM_INFO};

            let sys_info = unsafe {
                let mut sys_info = MaybeUninit::<SYSTEM_INFO>::uninit();
                GetSystemInfo(sys_info.as_mut_ptr());
                sys_info.assume_init()
            };
            sys_info.dwPageSize as usize
        }
    } else {
        // No way to ask the host; the smallest page size of the targets above.
        fn query_page_size() -> usize {
            4096
        }
    }
}

pub fn memory_snapshot() -> Result<MemorySnapshot, SystemError> {
    Err(SystemError("reading system memory counters"))
}

/// ## Safety
///
/// Always fails without touching memory; `unsafe` only to match the supported hosts.
pub unsafe fn populate(_base: NonNull<u8>, _size: usize, _mode: PopulateMode) -> Result<(), SystemError> {
    Err(SystemError("populating pages"))
}

pub fn open_cmdline() -> io::Result<File> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "process command line is not available on this host",
    ))
}

#[cfg(unix)]
pub fn is_memory_backed_file(_fd: std::os::fd::BorrowedFd<'_>) -> bool {
    false
}
