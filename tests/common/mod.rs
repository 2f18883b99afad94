//! Mock backends and fake Vulkan objects shared by the integration tests.
//!
//! Mock entry points are plain `extern "C"` functions handed to the real loaders through a
//! `HashMap` resolver.  Every call is appended to a thread-local log, so tests running in
//! parallel do not see each other's calls.
#![allow(dead_code)]

pub mod cuda;
pub mod hip;
pub mod level_zero;
pub mod opencl;
pub mod sycl;
pub mod vulkan;

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::ffi::c_void;

/// One recorded native call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub name: &'static str,
    pub args: Vec<u64>,
}

thread_local! {
    static CALLS: RefCell<Vec<Call>> = const { RefCell::new(Vec::new()) };
    static FAILING: RefCell<HashSet<&'static str>> = RefCell::new(HashSet::new());
}

pub fn record(name: &'static str, args: &[u64]) {
    CALLS.with(|c| {
        c.borrow_mut().push(Call {
            name,
            args: args.to_vec(),
        })
    });
}

/// Every call recorded on this thread, oldest first, clearing the log.
pub fn take_calls() -> Vec<Call> {
    CALLS.with(|c| std::mem::take(&mut *c.borrow_mut()))
}

pub fn calls_named(calls: &[Call], name: &str) -> Vec<Call> {
    calls.iter().filter(|c| c.name == name).cloned().collect()
}

/// Makes the mock `name` fail on this thread until [`reset`].
pub fn fail(name: &'static str) {
    FAILING.with(|f| f.borrow_mut().insert(name));
}

pub fn should_fail(name: &'static str) -> bool {
    FAILING.with(|f| f.borrow().contains(name))
}

/// Clears the log and every per-thread mock setting.  Tests may share a thread.
pub fn reset() {
    take_calls();
    FAILING.with(|f| f.borrow_mut().clear());
    cuda::set_driver_version(cuda::DEFAULT_DRIVER_VERSION);
    hip::set_runtime_version(hip::DEFAULT_RUNTIME_VERSION);
    opencl::reset();
}

/// Stands in for entry points a test never reaches.
pub unsafe extern "C" fn unexpected() -> i32 {
    record("unexpected", &[]);
    999
}

/// A resolver with `implemented` and the stub for every other name in `required`.
pub fn resolver(
    required: &[&'static str],
    implemented: &[(&'static str, *const c_void)],
) -> HashMap<&'static str, *const c_void> {
    let mut map: HashMap<&'static str, *const c_void> =
        required.iter().map(|name| (*name, unexpected as *const c_void)).collect();
    map.extend(implemented.iter().copied());
    map
}

/// Takes ownership of an fd handed to a mock import and closes it, as a driver would.
#[cfg(unix)]
pub fn consume_fd(fd: i32) {
    use std::os::fd::{FromRawFd, OwnedFd};
    if fd >= 0 {
        drop(unsafe { OwnedFd::from_raw_fd(fd) });
    }
}
