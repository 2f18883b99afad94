//! A mock Level Zero loader exporting the external semaphore extension.

use std::collections::HashMap;
use std::ffi::c_void;
use std::sync::Arc;

use sgl_compute_interop::level_zero::ffi::*;
use sgl_compute_interop::level_zero::{LevelZeroDriver, LevelZeroInteropContext};

use super::{consume_fd, record, resolver};

pub const DEVICE: usize = 0xDE;
pub const CONTEXT: usize = 0xC7;
pub const SEMAPHORE: usize = 0x5E;
pub const COMMAND_LIST: usize = 0xCC;

unsafe extern "C" fn ze_init(flags: u32) -> ze_result_t {
    record("zeInit", &[flags as u64]);
    ZE_RESULT_SUCCESS
}

unsafe extern "C" fn ze_device_import_external_semaphore_ext(
    device: ze_device_handle_t,
    desc: *const ze_external_semaphore_ext_desc_t,
    semaphore: *mut ze_external_semaphore_ext_handle_t,
) -> ze_result_t {
    let desc = unsafe { &*desc };
    let fd = unsafe { (*(desc.pNext as *const ze_external_semaphore_fd_ext_desc_t)).fd };
    record(
        "zeDeviceImportExternalSemaphoreExt",
        &[device as u64, fd as u64, desc.flags as u64],
    );
    consume_fd(fd);
    unsafe { *semaphore = SEMAPHORE as ze_external_semaphore_ext_handle_t };
    ZE_RESULT_SUCCESS
}

unsafe extern "C" fn ze_device_release_external_semaphore_ext(semaphore: ze_external_semaphore_ext_handle_t) -> ze_result_t {
    record("zeDeviceReleaseExternalSemaphoreExt", &[semaphore as u64]);
    ZE_RESULT_SUCCESS
}

unsafe extern "C" fn ze_command_list_append_signal_external_semaphore_ext(
    list: ze_command_list_handle_t,
    count: u32,
    semaphores: *mut ze_external_semaphore_ext_handle_t,
    params: *mut ze_external_semaphore_signal_params_ext_t,
    _signal: ze_event_handle_t,
    _wait_count: u32,
    _waits: *mut ze_event_handle_t,
) -> ze_result_t {
    let (semaphore, value) = unsafe { (*semaphores, (*params).value) };
    record(
        "zeCommandListAppendSignalExternalSemaphoreExt",
        &[list as u64, count as u64, semaphore as u64, value],
    );
    ZE_RESULT_SUCCESS
}

unsafe extern "C" fn ze_command_list_append_wait_external_semaphore_ext(
    list: ze_command_list_handle_t,
    count: u32,
    semaphores: *mut ze_external_semaphore_ext_handle_t,
    params: *mut ze_external_semaphore_wait_params_ext_t,
    _signal: ze_event_handle_t,
    _wait_count: u32,
    _waits: *mut ze_event_handle_t,
) -> ze_result_t {
    let (semaphore, value) = unsafe { (*semaphores, (*params).value) };
    record(
        "zeCommandListAppendWaitExternalSemaphoreExt",
        &[list as u64, count as u64, semaphore as u64, value],
    );
    ZE_RESULT_SUCCESS
}

unsafe extern "C" fn ze_command_list_host_synchronize(list: ze_command_list_handle_t, timeout: u64) -> ze_result_t {
    record("zeCommandListHostSynchronize", &[list as u64, timeout]);
    ZE_RESULT_SUCCESS
}

pub fn symbols() -> HashMap<&'static str, *const c_void> {
    resolver(
        LevelZeroFunctionTable::REQUIRED_SYMBOLS,
        &[
            ("zeInit", ze_init as *const c_void),
            (
                "zeDeviceImportExternalSemaphoreExt",
                ze_device_import_external_semaphore_ext as *const c_void,
            ),
            (
                "zeDeviceReleaseExternalSemaphoreExt",
                ze_device_release_external_semaphore_ext as *const c_void,
            ),
            (
                "zeCommandListAppendSignalExternalSemaphoreExt",
                ze_command_list_append_signal_external_semaphore_ext as *const c_void,
            ),
            (
                "zeCommandListAppendWaitExternalSemaphoreExt",
                ze_command_list_append_wait_external_semaphore_ext as *const c_void,
            ),
            ("zeCommandListHostSynchronize", ze_command_list_host_synchronize as *const c_void),
        ],
    )
}

pub fn driver() -> Arc<LevelZeroDriver> {
    Arc::new(unsafe { LevelZeroDriver::from_resolver(&symbols()) }.expect("mock Level Zero loader loads"))
}

/// A context on the mock device, with immediate command lists or without.
pub fn context(immediate: bool) -> Arc<LevelZeroInteropContext> {
    LevelZeroInteropContext::builder(driver(), DEVICE as ze_device_handle_t, CONTEXT as ze_context_handle_t)
        .immediate_command_lists(immediate)
        .build()
        .expect("mock Level Zero context")
}
