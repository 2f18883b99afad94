//! A mock CUDA driver with two devices, UUIDs `[0x10; 16]` and `[0x11; 16]`.

use std::cell::Cell;
use std::collections::HashMap;
use std::ffi::{c_char, c_void};
use std::sync::Arc;

use sgl_compute_interop::cuda::CudaDriver;
use sgl_compute_interop::cuda::ffi::*;

use super::{consume_fd, record, resolver, should_fail};

pub const DEVICE_COUNT: i32 = 2;
pub const MAPPED_BASE: CUdeviceptr = 0xD000_0000;
pub const EXTERNAL_MEMORY: usize = 0xE0;
pub const EXTERNAL_SEMAPHORE: usize = 0x5E;
pub const DEFAULT_DRIVER_VERSION: i32 = 12040;
pub const MIPMAPPED_ARRAY: usize = 0xA0;
pub const ARRAY_LEVEL0: usize = 0xA1;
pub const TEXTURE: CUtexObject = 0x7E;
pub const SURFACE: CUsurfObject = 0x5F;

thread_local! {
    static DRIVER_VERSION: Cell<i32> = const { Cell::new(DEFAULT_DRIVER_VERSION) };
}

pub fn device_uuid(ordinal: i32) -> [u8; 16] {
    [0x10 + ordinal as u8; 16]
}

pub fn set_driver_version(version: i32) {
    DRIVER_VERSION.with(|v| v.set(version));
}

fn status(name: &'static str) -> CUresult {
    if should_fail(name) { CUDA_ERROR_INVALID_VALUE } else { CUDA_SUCCESS }
}

unsafe extern "C" fn cu_init(flags: u32) -> CUresult {
    record("cuInit", &[flags as u64]);
    status("cuInit")
}

unsafe extern "C" fn cu_driver_get_version(version: *mut i32) -> CUresult {
    unsafe { *version = DRIVER_VERSION.with(|v| v.get()) };
    CUDA_SUCCESS
}

unsafe extern "C" fn cu_device_get_count(count: *mut i32) -> CUresult {
    record("cuDeviceGetCount", &[]);
    unsafe { *count = DEVICE_COUNT };
    CUDA_SUCCESS
}

unsafe extern "C" fn cu_device_get(device: *mut CUdevice, ordinal: i32) -> CUresult {
    unsafe { *device = ordinal };
    CUDA_SUCCESS
}

unsafe extern "C" fn cu_device_get_uuid(uuid: *mut CUuuid, device: CUdevice) -> CUresult {
    unsafe { (*uuid).bytes = device_uuid(device) };
    CUDA_SUCCESS
}

unsafe extern "C" fn cu_get_error_string(_result: CUresult, text: *mut *const c_char) -> CUresult {
    unsafe { *text = c"mock cuda error".as_ptr() };
    CUDA_SUCCESS
}

unsafe extern "C" fn cu_device_primary_ctx_retain(context: *mut CUcontext, device: CUdevice) -> CUresult {
    record("cuDevicePrimaryCtxRetain", &[device as u64]);
    unsafe { *context = (0xC0 + device as usize) as CUcontext };
    CUDA_SUCCESS
}

unsafe extern "C" fn cu_device_primary_ctx_release(device: CUdevice) -> CUresult {
    record("cuDevicePrimaryCtxRelease", &[device as u64]);
    CUDA_SUCCESS
}

unsafe extern "C" fn cu_ctx_set_current(context: CUcontext) -> CUresult {
    record("cuCtxSetCurrent", &[context as u64]);
    CUDA_SUCCESS
}

unsafe extern "C" fn cu_import_external_memory(
    memory: *mut CUexternalMemory,
    desc: *const CUDA_EXTERNAL_MEMORY_HANDLE_DESC,
) -> CUresult {
    let desc = unsafe { &*desc };
    let fd = unsafe { desc.handle.fd };
    record(
        "cuImportExternalMemory",
        &[fd as u64, desc.size, desc.flags as u64, desc.type_ as u64],
    );
    if should_fail("cuImportExternalMemory") {
        return CUDA_ERROR_INVALID_VALUE;
    }
    consume_fd(fd);
    unsafe { *memory = EXTERNAL_MEMORY as CUexternalMemory };
    CUDA_SUCCESS
}

unsafe extern "C" fn cu_destroy_external_memory(memory: CUexternalMemory) -> CUresult {
    record("cuDestroyExternalMemory", &[memory as u64]);
    CUDA_SUCCESS
}

unsafe extern "C" fn cu_external_memory_get_mapped_buffer(
    ptr: *mut CUdeviceptr,
    memory: CUexternalMemory,
    desc: *const CUDA_EXTERNAL_MEMORY_BUFFER_DESC,
) -> CUresult {
    let desc = unsafe { &*desc };
    record(
        "cuExternalMemoryGetMappedBuffer",
        &[memory as u64, desc.offset, desc.size],
    );
    unsafe { *ptr = MAPPED_BASE + desc.offset };
    status("cuExternalMemoryGetMappedBuffer")
}

unsafe extern "C" fn cu_mem_free(ptr: CUdeviceptr) -> CUresult {
    record("cuMemFree", &[ptr]);
    CUDA_SUCCESS
}

unsafe extern "C" fn cu_import_external_semaphore(
    semaphore: *mut CUexternalSemaphore,
    desc: *const CUDA_EXTERNAL_SEMAPHORE_HANDLE_DESC,
) -> CUresult {
    let desc = unsafe { &*desc };
    let fd = unsafe { desc.handle.fd };
    record("cuImportExternalSemaphore", &[fd as u64, desc.type_ as u64]);
    if should_fail("cuImportExternalSemaphore") {
        return CUDA_ERROR_INVALID_VALUE;
    }
    consume_fd(fd);
    unsafe { *semaphore = EXTERNAL_SEMAPHORE as CUexternalSemaphore };
    CUDA_SUCCESS
}

unsafe extern "C" fn cu_destroy_external_semaphore(semaphore: CUexternalSemaphore) -> CUresult {
    record("cuDestroyExternalSemaphore", &[semaphore as u64]);
    CUDA_SUCCESS
}

unsafe extern "C" fn cu_signal_external_semaphores_async(
    semaphores: *const CUexternalSemaphore,
    params: *const CUDA_EXTERNAL_SEMAPHORE_SIGNAL_PARAMS,
    count: u32,
    stream: CUstream,
) -> CUresult {
    let (semaphore, value) = unsafe { (*semaphores, (*params).params.fence_value) };
    record(
        "cuSignalExternalSemaphoresAsync",
        &[semaphore as u64, value, count as u64, stream as u64],
    );
    CUDA_SUCCESS
}

unsafe extern "C" fn cu_wait_external_semaphores_async(
    semaphores: *const CUexternalSemaphore,
    params: *const CUDA_EXTERNAL_SEMAPHORE_WAIT_PARAMS,
    count: u32,
    stream: CUstream,
) -> CUresult {
    let (semaphore, value) = unsafe { (*semaphores, (*params).params.fence_value) };
    record(
        "cuWaitExternalSemaphoresAsync",
        &[semaphore as u64, value, count as u64, stream as u64],
    );
    CUDA_SUCCESS
}

unsafe extern "C" fn cu_memcpy_dtod_async(dst: CUdeviceptr, src: CUdeviceptr, size: usize, stream: CUstream) -> CUresult {
    record("cuMemcpyDtoDAsync", &[dst, src, size as u64, stream as u64]);
    CUDA_SUCCESS
}

unsafe extern "C" fn cu_memcpy_htod_async(dst: CUdeviceptr, src: *const c_void, size: usize, stream: CUstream) -> CUresult {
    record("cuMemcpyHtoDAsync", &[dst, src as u64, size as u64, stream as u64]);
    CUDA_SUCCESS
}

unsafe extern "C" fn cu_memcpy_dtoh_async(dst: *mut c_void, src: CUdeviceptr, size: usize, stream: CUstream) -> CUresult {
    record("cuMemcpyDtoHAsync", &[dst as u64, src, size as u64, stream as u64]);
    CUDA_SUCCESS
}

unsafe extern "C" fn cu_event_record(event: CUevent, stream: CUstream) -> CUresult {
    record("cuEventRecord", &[event as u64, stream as u64]);
    CUDA_SUCCESS
}

unsafe extern "C" fn cu_event_synchronize(event: CUevent) -> CUresult {
    record("cuEventSynchronize", &[event as u64]);
    CUDA_SUCCESS
}

unsafe extern "C" fn cu_stream_synchronize(stream: CUstream) -> CUresult {
    record("cuStreamSynchronize", &[stream as u64]);
    CUDA_SUCCESS
}

unsafe extern "C" fn cu_external_memory_get_mapped_mipmapped_array(
    array: *mut CUmipmappedArray,
    memory: CUexternalMemory,
    desc: *const CUDA_EXTERNAL_MEMORY_MIPMAPPED_ARRAY_DESC,
) -> CUresult {
    let desc = unsafe { &*desc };
    let a = &desc.arrayDesc;
    record(
        "cuExternalMemoryGetMappedMipmappedArray",
        &[
            memory as u64,
            desc.offset,
            desc.numLevels as u64,
            a.Width as u64,
            a.Height as u64,
            a.Depth as u64,
            a.Flags as u64,
        ],
    );
    if should_fail("cuExternalMemoryGetMappedMipmappedArray") {
        return CUDA_ERROR_INVALID_VALUE;
    }
    unsafe { *array = MIPMAPPED_ARRAY as CUmipmappedArray };
    CUDA_SUCCESS
}

unsafe extern "C" fn cu_mipmapped_array_get_level(level_array: *mut CUarray, array: CUmipmappedArray, level: u32) -> CUresult {
    record("cuMipmappedArrayGetLevel", &[array as u64, level as u64]);
    unsafe { *level_array = ARRAY_LEVEL0 as CUarray };
    CUDA_SUCCESS
}

unsafe extern "C" fn cu_mipmapped_array_destroy(array: CUmipmappedArray) -> CUresult {
    record("cuMipmappedArrayDestroy", &[array as u64]);
    CUDA_SUCCESS
}

/// Records `[srcMemoryType, dstMemoryType, array, WidthInBytes, Height, stream]`.
unsafe extern "C" fn cu_memcpy_2d_async(copy: *const CUDA_MEMCPY2D, stream: CUstream) -> CUresult {
    let c = unsafe { &*copy };
    let array = if c.dstArray.is_null() { c.srcArray } else { c.dstArray };
    record(
        "cuMemcpy2DAsync",
        &[
            c.srcMemoryType as u64,
            c.dstMemoryType as u64,
            array as u64,
            c.WidthInBytes as u64,
            c.Height as u64,
            stream as u64,
        ],
    );
    CUDA_SUCCESS
}

/// Records `[srcMemoryType, dstMemoryType, array, WidthInBytes, Height, Depth, stream]`.
unsafe extern "C" fn cu_memcpy_3d_async(copy: *const CUDA_MEMCPY3D, stream: CUstream) -> CUresult {
    let c = unsafe { &*copy };
    let array = if c.dstArray.is_null() { c.srcArray } else { c.dstArray };
    record(
        "cuMemcpy3DAsync",
        &[
            c.srcMemoryType as u64,
            c.dstMemoryType as u64,
            array as u64,
            c.WidthInBytes as u64,
            c.Height as u64,
            c.Depth as u64,
            stream as u64,
        ],
    );
    CUDA_SUCCESS
}

/// Records `[resType, resource, firstMipmapLevel, lastMipmapLevel, firstLayer, lastLayer]`.
unsafe extern "C" fn cu_tex_object_create(
    texture: *mut CUtexObject,
    resource: *const CUDA_RESOURCE_DESC,
    _texture_desc: *const CUDA_TEXTURE_DESC,
    view: *const CUDA_RESOURCE_VIEW_DESC,
) -> CUresult {
    let (resource, view) = unsafe { (&*resource, &*view) };
    let raw = unsafe { resource.res.array };
    record(
        "cuTexObjectCreate",
        &[
            resource.resType as u64,
            raw as u64,
            view.firstMipmapLevel as u64,
            view.lastMipmapLevel as u64,
            view.firstLayer as u64,
            view.lastLayer as u64,
        ],
    );
    unsafe { *texture = TEXTURE };
    CUDA_SUCCESS
}

unsafe extern "C" fn cu_tex_object_destroy(texture: CUtexObject) -> CUresult {
    record("cuTexObjectDestroy", &[texture]);
    CUDA_SUCCESS
}

unsafe extern "C" fn cu_surf_object_create(surface: *mut CUsurfObject, resource: *const CUDA_RESOURCE_DESC) -> CUresult {
    let resource = unsafe { &*resource };
    let raw = unsafe { resource.res.array };
    record("cuSurfObjectCreate", &[resource.resType as u64, raw as u64]);
    unsafe { *surface = SURFACE };
    CUDA_SUCCESS
}

unsafe extern "C" fn cu_surf_object_destroy(surface: CUsurfObject) -> CUresult {
    record("cuSurfObjectDestroy", &[surface]);
    CUDA_SUCCESS
}

/// Every mocked CUDA entry point; the rest of the table resolves to the stub.
pub fn symbols() -> HashMap<&'static str, *const c_void> {
    resolver(
        CudaFunctionTable::REQUIRED_SYMBOLS,
        &[
            ("cuInit", cu_init as *const c_void),
            ("cuDriverGetVersion", cu_driver_get_version as *const c_void),
            ("cuDeviceGetCount", cu_device_get_count as *const c_void),
            ("cuDeviceGet", cu_device_get as *const c_void),
            ("cuDeviceGetUuid", cu_device_get_uuid as *const c_void),
            ("cuGetErrorString", cu_get_error_string as *const c_void),
            ("cuDevicePrimaryCtxRetain", cu_device_primary_ctx_retain as *const c_void),
            ("cuDevicePrimaryCtxRelease_v2", cu_device_primary_ctx_release as *const c_void),
            ("cuCtxSetCurrent", cu_ctx_set_current as *const c_void),
            ("cuImportExternalMemory", cu_import_external_memory as *const c_void),
            ("cuDestroyExternalMemory", cu_destroy_external_memory as *const c_void),
            ("cuExternalMemoryGetMappedBuffer", cu_external_memory_get_mapped_buffer as *const c_void),
            ("cuMemFree_v2", cu_mem_free as *const c_void),
            ("cuImportExternalSemaphore", cu_import_external_semaphore as *const c_void),
            ("cuDestroyExternalSemaphore", cu_destroy_external_semaphore as *const c_void),
            ("cuSignalExternalSemaphoresAsync", cu_signal_external_semaphores_async as *const c_void),
            ("cuWaitExternalSemaphoresAsync", cu_wait_external_semaphores_async as *const c_void),
            ("cuMemcpyDtoDAsync_v2", cu_memcpy_dtod_async as *const c_void),
            ("cuMemcpyHtoDAsync_v2", cu_memcpy_htod_async as *const c_void),
            ("cuMemcpyDtoHAsync_v2", cu_memcpy_dtoh_async as *const c_void),
            ("cuEventRecord", cu_event_record as *const c_void),
            ("cuEventSynchronize", cu_event_synchronize as *const c_void),
            ("cuStreamSynchronize", cu_stream_synchronize as *const c_void),
            (
                "cuExternalMemoryGetMappedMipmappedArray",
                cu_external_memory_get_mapped_mipmapped_array as *const c_void,
            ),
            ("cuMipmappedArrayGetLevel", cu_mipmapped_array_get_level as *const c_void),
            ("cuMipmappedArrayDestroy", cu_mipmapped_array_destroy as *const c_void),
            ("cuMemcpy2DAsync_v2", cu_memcpy_2d_async as *const c_void),
            ("cuMemcpy3DAsync_v2", cu_memcpy_3d_async as *const c_void),
            ("cuTexObjectCreate", cu_tex_object_create as *const c_void),
            ("cuTexObjectDestroy", cu_tex_object_destroy as *const c_void),
            ("cuSurfObjectCreate", cu_surf_object_create as *const c_void),
            ("cuSurfObjectDestroy", cu_surf_object_destroy as *const c_void),
        ],
    )
}

/// A driver built on the mock.
pub fn driver() -> Arc<CudaDriver> {
    Arc::new(unsafe { CudaDriver::from_resolver(&symbols()) }.expect("mock CUDA driver loads"))
}
