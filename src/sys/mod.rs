cfgenius::cond! {
    if cfg(target_os = "linux") {
        mod linux;
        pub use linux::*;
    } else {
        mod unsupported;
        pub use unsupported::*;
    }
}

/// How pages should be faulted in by [`populate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopulateMode {
    Read,
    Write,
}
