//! A mock HIP runtime with two devices, UUIDs `[0x20; 16]` and `[0x21; 16]`, and a mock hiprtc
//! whose compile step fails on request.

use std::cell::Cell;
use std::collections::HashMap;
use std::ffi::{c_char, c_void};
use std::sync::Arc;

use sgl_compute_interop::hip::ffi::*;
use sgl_compute_interop::hip::{HipDriver, HiprtcDriver};

use super::{consume_fd, record, resolver, should_fail};

pub const DEVICE_COUNT: i32 = 2;
pub const MAPPED_BASE: usize = 0xB000_0000;
pub const EXTERNAL_MEMORY: usize = 0xE1;
pub const EXTERNAL_SEMAPHORE: usize = 0x5A;
/// 6.2.0
pub const DEFAULT_RUNTIME_VERSION: i32 = 60200000;

pub const PROGRAM: usize = 0x9A;
pub const HIPRTC_ERROR_COMPILATION: hiprtcResult = 6;
pub const BUILD_LOG: &str = "kernel.hip:3:12: error: expected ';' after expression";
pub const CODE_OBJECT: &[u8] = b"\x7fELF amdgcn code object";

thread_local! {
    static RUNTIME_VERSION: Cell<i32> = const { Cell::new(DEFAULT_RUNTIME_VERSION) };
}

pub fn device_uuid(ordinal: i32) -> [u8; 16] {
    [0x20 + ordinal as u8; 16]
}

/// Takes effect for drivers built afterwards; the version is read once at load.
pub fn set_runtime_version(version: i32) {
    RUNTIME_VERSION.with(|v| v.set(version));
}

fn status(name: &'static str) -> hipError_t {
    if should_fail(name) { hipErrorInvalidValue } else { hipSuccess }
}

unsafe extern "C" fn hip_init(flags: u32) -> hipError_t {
    record("hipInit", &[flags as u64]);
    status("hipInit")
}

unsafe extern "C" fn hip_runtime_get_version(version: *mut i32) -> hipError_t {
    unsafe { *version = RUNTIME_VERSION.with(|v| v.get()) };
    hipSuccess
}

unsafe extern "C" fn hip_get_device_count(count: *mut i32) -> hipError_t {
    record("hipGetDeviceCount", &[]);
    unsafe { *count = DEVICE_COUNT };
    hipSuccess
}

unsafe extern "C" fn hip_device_get(device: *mut hipDevice_t, ordinal: i32) -> hipError_t {
    unsafe { *device = ordinal };
    hipSuccess
}

unsafe extern "C" fn hip_device_get_uuid(uuid: *mut hipUUID, device: hipDevice_t) -> hipError_t {
    unsafe { (*uuid).bytes = device_uuid(device) };
    hipSuccess
}

unsafe extern "C" fn hip_set_device(device: i32) -> hipError_t {
    record("hipSetDevice", &[device as u64]);
    status("hipSetDevice")
}

unsafe extern "C" fn hip_get_error_string(_error: hipError_t) -> *const c_char {
    c"mock hip error".as_ptr()
}

unsafe extern "C" fn hip_get_error_name(_error: hipError_t) -> *const c_char {
    c"hipErrorInvalidValue".as_ptr()
}

unsafe extern "C" fn hip_import_external_memory(
    memory: *mut hipExternalMemory_t,
    desc: *const hipExternalMemoryHandleDesc,
) -> hipError_t {
    let desc = unsafe { &*desc };
    let fd = unsafe { desc.handle.fd };
    record(
        "hipImportExternalMemory",
        &[fd as u64, desc.size, desc.flags as u64, desc.type_ as u64],
    );
    if should_fail("hipImportExternalMemory") {
        return hipErrorInvalidValue;
    }
    consume_fd(fd);
    unsafe { *memory = EXTERNAL_MEMORY as hipExternalMemory_t };
    hipSuccess
}

unsafe extern "C" fn hip_destroy_external_memory(memory: hipExternalMemory_t) -> hipError_t {
    record("hipDestroyExternalMemory", &[memory as u64]);
    hipSuccess
}

unsafe extern "C" fn hip_external_memory_get_mapped_buffer(
    ptr: *mut *mut c_void,
    memory: hipExternalMemory_t,
    desc: *const hipExternalMemoryBufferDesc,
) -> hipError_t {
    let desc = unsafe { &*desc };
    record(
        "hipExternalMemoryGetMappedBuffer",
        &[memory as u64, desc.offset, desc.size],
    );
    unsafe { *ptr = (MAPPED_BASE + desc.offset as usize) as *mut c_void };
    status("hipExternalMemoryGetMappedBuffer")
}

unsafe extern "C" fn hip_free(ptr: *mut c_void) -> hipError_t {
    record("hipFree", &[ptr as u64]);
    hipSuccess
}

unsafe extern "C" fn hip_import_external_semaphore(
    semaphore: *mut hipExternalSemaphore_t,
    desc: *const hipExternalSemaphoreHandleDesc,
) -> hipError_t {
    let desc = unsafe { &*desc };
    let fd = unsafe { desc.handle.fd };
    record("hipImportExternalSemaphore", &[fd as u64, desc.type_ as u64]);
    if should_fail("hipImportExternalSemaphore") {
        return hipErrorInvalidValue;
    }
    consume_fd(fd);
    unsafe { *semaphore = EXTERNAL_SEMAPHORE as hipExternalSemaphore_t };
    hipSuccess
}

unsafe extern "C" fn hip_destroy_external_semaphore(semaphore: hipExternalSemaphore_t) -> hipError_t {
    record("hipDestroyExternalSemaphore", &[semaphore as u64]);
    hipSuccess
}

unsafe extern "C" fn hip_signal_external_semaphores_async(
    semaphores: *const hipExternalSemaphore_t,
    params: *const hipExternalSemaphoreSignalParams,
    count: u32,
    stream: hipStream_t,
) -> hipError_t {
    let (semaphore, value) = unsafe { (*semaphores, (*params).params.fence_value) };
    record(
        "hipSignalExternalSemaphoresAsync",
        &[semaphore as u64, value, count as u64, stream as u64],
    );
    hipSuccess
}

unsafe extern "C" fn hip_wait_external_semaphores_async(
    semaphores: *const hipExternalSemaphore_t,
    params: *const hipExternalSemaphoreWaitParams,
    count: u32,
    stream: hipStream_t,
) -> hipError_t {
    let (semaphore, value) = unsafe { (*semaphores, (*params).params.fence_value) };
    record(
        "hipWaitExternalSemaphoresAsync",
        &[semaphore as u64, value, count as u64, stream as u64],
    );
    hipSuccess
}

unsafe extern "C" fn hip_memcpy_async(
    dst: *mut c_void,
    src: *const c_void,
    size: usize,
    kind: hipMemcpyKind,
    stream: hipStream_t,
) -> hipError_t {
    record(
        "hipMemcpyAsync",
        &[dst as u64, src as u64, size as u64, kind as u64, stream as u64],
    );
    hipSuccess
}

unsafe extern "C" fn hip_event_record(event: hipEvent_t, stream: hipStream_t) -> hipError_t {
    record("hipEventRecord", &[event as u64, stream as u64]);
    hipSuccess
}

unsafe extern "C" fn hip_event_synchronize(event: hipEvent_t) -> hipError_t {
    record("hipEventSynchronize", &[event as u64]);
    hipSuccess
}

unsafe extern "C" fn hip_stream_synchronize(stream: hipStream_t) -> hipError_t {
    record("hipStreamSynchronize", &[stream as u64]);
    hipSuccess
}

/// Every mocked HIP runtime entry point; the rest of the table resolves to the stub.
pub fn symbols() -> HashMap<&'static str, *const c_void> {
    resolver(
        HipFunctionTable::REQUIRED_SYMBOLS,
        &[
            ("hipInit", hip_init as *const c_void),
            ("hipRuntimeGetVersion", hip_runtime_get_version as *const c_void),
            ("hipGetDeviceCount", hip_get_device_count as *const c_void),
            ("hipDeviceGet", hip_device_get as *const c_void),
            ("hipDeviceGetUuid", hip_device_get_uuid as *const c_void),
            ("hipSetDevice", hip_set_device as *const c_void),
            ("hipGetErrorString", hip_get_error_string as *const c_void),
            ("hipGetErrorName", hip_get_error_name as *const c_void),
            ("hipImportExternalMemory", hip_import_external_memory as *const c_void),
            ("hipDestroyExternalMemory", hip_destroy_external_memory as *const c_void),
            ("hipExternalMemoryGetMappedBuffer", hip_external_memory_get_mapped_buffer as *const c_void),
            ("hipFree", hip_free as *const c_void),
            ("hipImportExternalSemaphore", hip_import_external_semaphore as *const c_void),
            ("hipDestroyExternalSemaphore", hip_destroy_external_semaphore as *const c_void),
            ("hipSignalExternalSemaphoresAsync", hip_signal_external_semaphores_async as *const c_void),
            ("hipWaitExternalSemaphoresAsync", hip_wait_external_semaphores_async as *const c_void),
            ("hipMemcpyAsync", hip_memcpy_async as *const c_void),
            ("hipEventRecord", hip_event_record as *const c_void),
            ("hipEventSynchronize", hip_event_synchronize as *const c_void),
            ("hipStreamSynchronize", hip_stream_synchronize as *const c_void),
        ],
    )
}

/// A runtime built on the mock, at the version set for this thread.
pub fn driver() -> Arc<HipDriver> {
    Arc::new(unsafe { HipDriver::from_resolver(&symbols()) }.expect("mock HIP runtime loads"))
}

unsafe extern "C" fn hiprtc_get_error_string(_result: hiprtcResult) -> *const c_char {
    c"mock hiprtc error".as_ptr()
}

unsafe extern "C" fn hiprtc_create_program(
    program: *mut hiprtcProgram,
    _source: *const c_char,
    _name: *const c_char,
    headers: i32,
    _sources: *const *const c_char,
    _names: *const *const c_char,
) -> hiprtcResult {
    record("hiprtcCreateProgram", &[headers as u64]);
    unsafe { *program = PROGRAM as hiprtcProgram };
    HIPRTC_SUCCESS
}

unsafe extern "C" fn hiprtc_destroy_program(program: *mut hiprtcProgram) -> hiprtcResult {
    record("hiprtcDestroyProgram", &[unsafe { *program } as u64]);
    HIPRTC_SUCCESS
}

unsafe extern "C" fn hiprtc_compile_program(
    program: hiprtcProgram,
    option_count: i32,
    _options: *const *const c_char,
) -> hiprtcResult {
    record("hiprtcCompileProgram", &[program as u64, option_count as u64]);
    if should_fail("hiprtcCompileProgram") {
        return HIPRTC_ERROR_COMPILATION;
    }
    HIPRTC_SUCCESS
}

unsafe extern "C" fn hiprtc_get_program_log_size(_program: hiprtcProgram, size: *mut usize) -> hiprtcResult {
    unsafe { *size = BUILD_LOG.len() + 1 };
    HIPRTC_SUCCESS
}

unsafe extern "C" fn hiprtc_get_program_log(_program: hiprtcProgram, log: *mut c_char) -> hiprtcResult {
    unsafe {
        std::ptr::copy_nonoverlapping(BUILD_LOG.as_ptr(), log as *mut u8, BUILD_LOG.len());
        *log.add(BUILD_LOG.len()) = 0;
    }
    HIPRTC_SUCCESS
}

unsafe extern "C" fn hiprtc_get_code_size(_program: hiprtcProgram, size: *mut usize) -> hiprtcResult {
    unsafe { *size = CODE_OBJECT.len() };
    HIPRTC_SUCCESS
}

unsafe extern "C" fn hiprtc_get_code(_program: hiprtcProgram, code: *mut c_char) -> hiprtcResult {
    record("hiprtcGetCode", &[]);
    unsafe { std::ptr::copy_nonoverlapping(CODE_OBJECT.as_ptr(), code as *mut u8, CODE_OBJECT.len()) };
    HIPRTC_SUCCESS
}

pub fn rtc_symbols() -> HashMap<&'static str, *const c_void> {
    resolver(
        HiprtcFunctionTable::REQUIRED_SYMBOLS,
        &[
            ("hiprtcGetErrorString", hiprtc_get_error_string as *const c_void),
            ("hiprtcCreateProgram", hiprtc_create_program as *const c_void),
            ("hiprtcDestroyProgram", hiprtc_destroy_program as *const c_void),
            ("hiprtcCompileProgram", hiprtc_compile_program as *const c_void),
            ("hiprtcGetProgramLogSize", hiprtc_get_program_log_size as *const c_void),
            ("hiprtcGetProgramLog", hiprtc_get_program_log as *const c_void),
            ("hiprtcGetCodeSize", hiprtc_get_code_size as *const c_void),
            ("hiprtcGetCode", hiprtc_get_code as *const c_void),
        ],
    )
}

pub fn rtc() -> HiprtcDriver {
    unsafe { HiprtcDriver::from_resolver(&rtc_symbols()) }.expect("mock hiprtc loads")
}
