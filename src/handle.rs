// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! OS handles exported from Vulkan memory and semaphores.
//!
//! An [`ExportedHandle`] is the one place an exported file descriptor or Windows `HANDLE` is
//! stored, and its `Drop` is the one place it is closed.  The ownership rule differs by platform
//! and is a driver contract, not something we get to choose:
//!
//! - POSIX: a *successful* import into any backend consumes the fd.  The backend closes it when
//!   the imported object is destroyed, so after [`ExportedHandle::release_after_import`] our copy
//!   reads as the sentinel `-1` and is never closed here.
//! - Windows: importing does not take ownership of the `HANDLE`; we keep it and close it when the
//!   wrapper is dropped.
//!
//! A failed import leaves the handle owned by us, so it is closed on drop and never leaks.

use std::ffi::c_void;
#[cfg(unix)]
use std::os::fd::{AsRawFd, IntoRawFd, OwnedFd};
#[cfg(windows)]
use std::os::windows::io::{AsRawHandle, OwnedHandle};

/// The fd value meaning "no descriptor held".
pub const INVALID_FD: i32 = -1;

/// A borrowed view of an exported handle, as handed to a backend import call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawExternalHandle {
    Fd(i32),
    Win32(*mut c_void),
}

#[derive(Debug)]
enum OwnedOsHandle {
    #[cfg(unix)]
    Fd(OwnedFd),
    #[cfg(windows)]
    Win32(OwnedHandle),
}

/// An OS handle exported from Vulkan device memory or a Vulkan semaphore.
#[derive(Debug)]
pub struct ExportedHandle {
    inner: Option<OwnedOsHandle>,
}

impl ExportedHandle {
    #[cfg(unix)]
    pub fn from_fd(fd: OwnedFd) -> Self {
        ExportedHandle {
            inner: Some(OwnedOsHandle::Fd(fd)),
        }
    }

    #[cfg(windows)]
    pub fn from_win32(handle: OwnedHandle) -> Self {
        ExportedHandle {
            inner: Some(OwnedOsHandle::Win32(handle)),
        }
    }

    /// The raw value to pass to an import call.
    ///
    /// Reads as `Fd(-1)` once the descriptor has been handed to a backend.
    pub fn raw(&self) -> RawExternalHandle {
        match &self.inner {
            #[cfg(unix)]
            Some(OwnedOsHandle::Fd(fd)) => RawExternalHandle::Fd(fd.as_raw_fd()),
            #[cfg(windows)]
            Some(OwnedOsHandle::Win32(handle)) => RawExternalHandle::Win32(handle.as_raw_handle()),
            None => RawExternalHandle::Fd(INVALID_FD),
        }
    }

    /// The stored fd, or `-1` when none is held (transferred, or a Windows handle).
    pub fn raw_fd(&self) -> i32 {
        match self.raw() {
            RawExternalHandle::Fd(fd) => fd,
            RawExternalHandle::Win32(_) => INVALID_FD,
        }
    }

    /// Whether this wrapper still closes the handle on drop.
    pub fn is_owned(&self) -> bool {
        self.inner.is_some()
    }

    /// Applies the ownership transfer that follows a successful import.
    ///
    /// On POSIX the backend now owns the fd; on Windows nothing changes.
    pub(crate) fn release_after_import(&mut self) {
        match self.inner.take() {
            #[cfg(unix)]
            Some(OwnedOsHandle::Fd(fd)) => {
                let _ = fd.into_raw_fd();
            }
            #[cfg(windows)]
            Some(handle @ OwnedOsHandle::Win32(_)) => {
                self.inner = Some(handle);
            }
            None => {}
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs::File;

    fn open_fd() -> OwnedFd {
        File::open(std::env::current_exe().unwrap()).unwrap().into()
    }

    #[test]
    fn transfer_resets_to_sentinel() {
        let fd = open_fd();
        let raw = fd.as_raw_fd();
        let mut handle = ExportedHandle::from_fd(fd);
        assert_eq!(handle.raw(), RawExternalHandle::Fd(raw));
        assert!(handle.is_owned());
        handle.release_after_import();
        assert_eq!(handle.raw_fd(), INVALID_FD);
        assert!(!handle.is_owned());
        //the fd now belongs to "the backend"; close it ourselves so the test does not leak
        drop(unsafe { <OwnedFd as std::os::fd::FromRawFd>::from_raw_fd(raw) });
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn untransferred_fd_is_closed_on_drop() {
        let path = std::env::temp_dir().join(format!(
            "sgl_compute_interop_handle_{}_{:?}",
            std::process::id(),
            std::thread::current().id()
        ));
        let fd: OwnedFd = File::create(&path).unwrap().into();
        let raw = fd.as_raw_fd();
        let link = format!("/proc/self/fd/{raw}");
        assert_eq!(std::fs::read_link(&link).unwrap(), path);
        drop(ExportedHandle::from_fd(fd));
        //the number may be reused by a parallel test, but not for our file
        assert_ne!(std::fs::read_link(&link).ok(), Some(path.clone()));
        let _ = std::fs::remove_file(&path);
    }
}
