use std::{
    error::Error,
    ffi::CStr,
    fmt,
    fs::File,
    mem::MaybeUninit,
    os::fd::{AsRawFd, BorrowedFd},
    ptr::NonNull,
    sync::atomic::{AtomicUsize, Ordering},
};

use super::PopulateMode;
use crate::admission::MemorySnapshot;

// From `include/uapi/asm-generic/mman-common.h` (Linux 5.14+).
const MADV_POPULATE_READ: libc::c_int = 22;
const MADV_POPULATE_WRITE: libc::c_int = 23;

// From `include/uapi/linux/magic.h`.
const RAMFS_MAGIC: u32 = 0x8584_58f6;
const TMPFS_MAGIC: u32 = 0x0102_1994;

const CMDLINE_PATH: &str = "/proc/self/cmdline";

#[derive(Debug, Clone)]
pub struct SystemError(i32);

impl Error for SystemError {}

impl fmt::Display for SystemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let str = unsafe {
            // Safety: this string will stay alive on this thread until the next call to `strerror`.
            CStr::from_ptr(libc::strerror(self.0))
        };
        write!(f, "system error {:?}: {str:?}", self.0)
    }
}

impl SystemError {
    fn from_errno() -> Self {
        Self(unsafe {
            // Safety: `errno` lives in thread-local storage.
            *libc::__errno_location()
        })
    }

    pub fn from_raw(code: i32) -> Self {
        Self(code)
    }

    pub fn code(&self) -> i32 {
        self.0
    }
}

pub fn page_size() -> usize {
    static PAGE_SIZE: AtomicUsize = AtomicUsize::new(0);

    let mut size = PAGE_SIZE.load(Ordering::Relaxed);
    if size == 0 {
        size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) } as usize;
        PAGE_SIZE.store(size, Ordering::Relaxed);
    }
    size
}

pub fn memory_snapshot() -> Result<MemorySnapshot, SystemError> {
    let info = unsafe {
        let mut info = MaybeUninit::<libc::sysinfo>::uninit();
        if libc::sysinfo(info.as_mut_ptr()) != 0 {
            return Err(SystemError::from_errno());
        }
        info.assume_init()
    };

    // `sysinfo(2)` reports sizes in multiples of `mem_unit` bytes.
    let unit = u64::from(info.mem_unit.max(1));
    let bytes = |count: libc::c_ulong| (count as u64).saturating_mul(unit);

    Ok(MemorySnapshot {
        total_ram: bytes(info.totalram),
        total_swap: bytes(info.totalswap),
        free_ram: bytes(info.freeram),
        free_swap: bytes(info.freeswap),
    })
}

/// Asks the kernel to fault in `[base, base + size)` without touching it ourselves.
///
/// ## Safety
///
/// The range must be mapped by the caller and, for [`PopulateMode::Write`], mapped writable.
pub unsafe fn populate(base: NonNull<u8>, size: usize, mode: PopulateMode) -> Result<(), SystemError> {
    let advice = match mode {
        PopulateMode::Read => MADV_POPULATE_READ,
        PopulateMode::Write => MADV_POPULATE_WRITE,
    };

    if libc::madvise(base.as_ptr().cast(), size, advice) == 0 {
        Ok(())
    } else {
        Err(SystemError::from_errno())
    }
}

pub fn open_cmdline() -> std::io::Result<File> {
    File::open(CMDLINE_PATH)
}

/// Whether the file behind `fd` lives in memory rather than on a block device.
///
/// This holds for `memfd_create(2)` files (which support seals) and for files on `ramfs` or
/// `tmpfs`.
pub fn is_memory_backed_file(fd: BorrowedFd<'_>) -> bool {
    let fd = fd.as_raw_fd();

    if unsafe { libc::fcntl(fd, libc::F_GET_SEALS) } != -1 {
        return true;
    }

    let stats = unsafe {
        let mut stats = MaybeUninit::<libc::statfs>::uninit();
        if libc::fstatfs(fd, stats.as_mut_ptr()) != 0 {
            return false;
        }
        stats.assume_init()
    };

    // N.B. `f_type` is signed on some targets; the magic numbers are compared by bit pattern.
    let fs_type = stats.f_type as u32;
    fs_type == RAMFS_MAGIC || fs_type == TMPFS_MAGIC
}
