//! A mock OpenCL platform with one device.
//!
//! The device reports UUID `[0x10; 16]`, the same as the first mock CUDA device, and exposes
//! `cl_khr_semaphore` unless [`hide_semaphore_extension`] was called on this thread.

use std::cell::Cell;
use std::collections::HashMap;
use std::ffi::{CStr, c_char, c_void};
use std::sync::Arc;

use sgl_compute_interop::opencl::ffi::*;
use sgl_compute_interop::opencl::{OpenClDriver, OpenClInteropContext};

use super::{consume_fd, record, resolver};

pub const PLATFORM: usize = 0x9A;
pub const DEVICE: usize = 0xDE;
pub const CONTEXT: usize = 0xC7;
pub const SEMAPHORE: usize = 0x5E;
pub const EVENT: usize = 0xEE;
pub const DEVICE_UUID: [u8; 16] = [0x10; 16];
const DEVICE_NAME: &CStr = c"Fake GPU 4096";
const EXTENSIONS: &CStr = c"cl_khr_device_uuid cl_khr_semaphore cl_khr_external_semaphore";

thread_local! {
    static SEMAPHORES_HIDDEN: Cell<bool> = const { Cell::new(false) };
}

pub fn hide_semaphore_extension() {
    SEMAPHORES_HIDDEN.with(|h| h.set(true));
}

pub(super) fn reset() {
    SEMAPHORES_HIDDEN.with(|h| h.set(false));
}

unsafe fn write_info(bytes: &[u8], size: usize, value: *mut c_void, size_ret: *mut usize) -> cl_int {
    if !size_ret.is_null() {
        unsafe { *size_ret = bytes.len() };
    }
    if !value.is_null() {
        if size < bytes.len() {
            return CL_INVALID_VALUE;
        }
        unsafe { std::ptr::copy_nonoverlapping(bytes.as_ptr(), value as *mut u8, bytes.len()) };
    }
    CL_SUCCESS
}

unsafe extern "C" fn cl_get_platform_ids(count: cl_uint, platforms: *mut cl_platform_id, available: *mut cl_uint) -> cl_int {
    if !available.is_null() {
        unsafe { *available = 1 };
    }
    if count > 0 && !platforms.is_null() {
        unsafe { *platforms = PLATFORM as cl_platform_id };
    }
    CL_SUCCESS
}

unsafe extern "C" fn cl_get_device_ids(
    _platform: cl_platform_id,
    _type: cl_bitfield,
    count: cl_uint,
    devices: *mut cl_device_id,
    available: *mut cl_uint,
) -> cl_int {
    if !available.is_null() {
        unsafe { *available = 1 };
    }
    if count > 0 && !devices.is_null() {
        unsafe { *devices = DEVICE as cl_device_id };
    }
    CL_SUCCESS
}

unsafe extern "C" fn cl_get_device_info(
    _device: cl_device_id,
    param: cl_uint,
    size: usize,
    value: *mut c_void,
    size_ret: *mut usize,
) -> cl_int {
    record("clGetDeviceInfo", &[param as u64]);
    let platform = (PLATFORM as u64).to_ne_bytes();
    let vendor = 0x10de_u32.to_ne_bytes();
    let bytes: &[u8] = match param {
        CL_DEVICE_PLATFORM => &platform[..size_of::<cl_platform_id>()],
        CL_DEVICE_VENDOR_ID => &vendor,
        CL_DEVICE_UUID_KHR => &DEVICE_UUID,
        CL_DEVICE_NAME => DEVICE_NAME.to_bytes_with_nul(),
        CL_DEVICE_EXTENSIONS => EXTENSIONS.to_bytes_with_nul(),
        _ => return CL_INVALID_VALUE,
    };
    unsafe { write_info(bytes, size, value, size_ret) }
}

unsafe extern "C" fn cl_create_semaphore_with_properties_khr(
    _context: cl_context,
    properties: *const cl_semaphore_properties_khr,
    status: *mut cl_int,
) -> cl_semaphore_khr {
    let (kind, fd) = unsafe { (*properties.add(1), *properties.add(3)) };
    record("clCreateSemaphoreWithPropertiesKHR", &[kind, fd]);
    consume_fd(fd as i32);
    unsafe { *status = CL_SUCCESS };
    SEMAPHORE as cl_semaphore_khr
}

unsafe extern "C" fn cl_enqueue_signal_semaphores_khr(
    queue: cl_command_queue,
    count: cl_uint,
    semaphores: *const cl_semaphore_khr,
    _payloads: *const cl_semaphore_payload_khr,
    _wait_count: cl_uint,
    _wait_list: *const cl_event,
    event: *mut cl_event,
) -> cl_int {
    record(
        "clEnqueueSignalSemaphoresKHR",
        &[queue as u64, count as u64, unsafe { *semaphores } as u64],
    );
    if !event.is_null() {
        unsafe { *event = EVENT as cl_event };
    }
    CL_SUCCESS
}

unsafe extern "C" fn cl_enqueue_wait_semaphores_khr(
    queue: cl_command_queue,
    count: cl_uint,
    semaphores: *const cl_semaphore_khr,
    _payloads: *const cl_semaphore_payload_khr,
    _wait_count: cl_uint,
    _wait_list: *const cl_event,
    event: *mut cl_event,
) -> cl_int {
    record(
        "clEnqueueWaitSemaphoresKHR",
        &[queue as u64, count as u64, unsafe { *semaphores } as u64],
    );
    if !event.is_null() {
        unsafe { *event = EVENT as cl_event };
    }
    CL_SUCCESS
}

unsafe extern "C" fn cl_release_semaphore_khr(semaphore: cl_semaphore_khr) -> cl_int {
    record("clReleaseSemaphoreKHR", &[semaphore as u64]);
    CL_SUCCESS
}

unsafe extern "C" fn cl_get_extension_function_address_for_platform(
    _platform: cl_platform_id,
    name: *const c_char,
) -> *mut c_void {
    if SEMAPHORES_HIDDEN.with(|h| h.get()) {
        return std::ptr::null_mut();
    }
    match unsafe { CStr::from_ptr(name) }.to_bytes() {
        b"clCreateSemaphoreWithPropertiesKHR" => cl_create_semaphore_with_properties_khr as *mut c_void,
        b"clEnqueueSignalSemaphoresKHR" => cl_enqueue_signal_semaphores_khr as *mut c_void,
        b"clEnqueueWaitSemaphoresKHR" => cl_enqueue_wait_semaphores_khr as *mut c_void,
        b"clReleaseSemaphoreKHR" => cl_release_semaphore_khr as *mut c_void,
        _ => std::ptr::null_mut(),
    }
}

unsafe extern "C" fn cl_finish(queue: cl_command_queue) -> cl_int {
    record("clFinish", &[queue as u64]);
    CL_SUCCESS
}

unsafe extern "C" fn cl_wait_for_events(count: cl_uint, events: *const cl_event) -> cl_int {
    record("clWaitForEvents", &[count as u64, unsafe { *events } as u64]);
    CL_SUCCESS
}

unsafe extern "C" fn cl_release_event(event: cl_event) -> cl_int {
    record("clReleaseEvent", &[event as u64]);
    CL_SUCCESS
}

pub fn symbols() -> HashMap<&'static str, *const c_void> {
    resolver(
        OpenClFunctionTable::REQUIRED_SYMBOLS,
        &[
            ("clGetPlatformIDs", cl_get_platform_ids as *const c_void),
            ("clGetDeviceIDs", cl_get_device_ids as *const c_void),
            ("clGetDeviceInfo", cl_get_device_info as *const c_void),
            (
                "clGetExtensionFunctionAddressForPlatform",
                cl_get_extension_function_address_for_platform as *const c_void,
            ),
            ("clFinish", cl_finish as *const c_void),
            ("clWaitForEvents", cl_wait_for_events as *const c_void),
            ("clReleaseEvent", cl_release_event as *const c_void),
        ],
    )
}

/// An interop context on the mock device.
pub fn context() -> Arc<OpenClInteropContext> {
    let driver = Arc::new(unsafe { OpenClDriver::from_resolver(&symbols()) }.expect("mock OpenCL driver loads"));
    OpenClInteropContext::new(driver, CONTEXT as cl_context, DEVICE as cl_device_id).expect("mock OpenCL context")
}
