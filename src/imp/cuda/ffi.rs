// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! CUDA driver API declarations used by interop.
#![allow(non_camel_case_types, non_snake_case)]

use std::ffi::{c_char, c_void};

use crate::loader::function_table;

pub type CUresult = i32;
pub type CUdevice = i32;
pub type CUdeviceptr = u64;
pub type CUcontext = *mut c_void;
pub type CUstream = *mut c_void;
pub type CUevent = *mut c_void;
pub type CUexternalMemory = *mut c_void;
pub type CUexternalSemaphore = *mut c_void;
pub type CUmipmappedArray = *mut c_void;
pub type CUarray = *mut c_void;
pub type CUtexObject = u64;
pub type CUsurfObject = u64;
pub type CUarray_format = u32;
pub type CUresourceViewFormat = u32;
pub type CUaddress_mode = u32;
pub type CUfilter_mode = u32;
pub type CUmemorytype = u32;

pub const CUDA_SUCCESS: CUresult = 0;
pub const CUDA_ERROR_INVALID_VALUE: CUresult = 1;

pub const CU_AD_FORMAT_UNSIGNED_INT8: CUarray_format = 0x01;
pub const CU_AD_FORMAT_UNSIGNED_INT16: CUarray_format = 0x02;
pub const CU_AD_FORMAT_UNSIGNED_INT32: CUarray_format = 0x03;
pub const CU_AD_FORMAT_SIGNED_INT8: CUarray_format = 0x08;
pub const CU_AD_FORMAT_SIGNED_INT16: CUarray_format = 0x09;
pub const CU_AD_FORMAT_SIGNED_INT32: CUarray_format = 0x0a;
pub const CU_AD_FORMAT_HALF: CUarray_format = 0x10;
pub const CU_AD_FORMAT_FLOAT: CUarray_format = 0x20;

pub const CU_RES_VIEW_FORMAT_UINT_1X8: CUresourceViewFormat = 0x01;
pub const CU_RES_VIEW_FORMAT_UINT_2X8: CUresourceViewFormat = 0x02;
pub const CU_RES_VIEW_FORMAT_UINT_4X8: CUresourceViewFormat = 0x03;
pub const CU_RES_VIEW_FORMAT_SINT_1X8: CUresourceViewFormat = 0x04;
pub const CU_RES_VIEW_FORMAT_SINT_2X8: CUresourceViewFormat = 0x05;
pub const CU_RES_VIEW_FORMAT_SINT_4X8: CUresourceViewFormat = 0x06;
pub const CU_RES_VIEW_FORMAT_UINT_1X16: CUresourceViewFormat = 0x07;
pub const CU_RES_VIEW_FORMAT_UINT_2X16: CUresourceViewFormat = 0x08;
pub const CU_RES_VIEW_FORMAT_UINT_4X16: CUresourceViewFormat = 0x09;
pub const CU_RES_VIEW_FORMAT_SINT_1X16: CUresourceViewFormat = 0x0a;
pub const CU_RES_VIEW_FORMAT_SINT_2X16: CUresourceViewFormat = 0x0b;
pub const CU_RES_VIEW_FORMAT_SINT_4X16: CUresourceViewFormat = 0x0c;
pub const CU_RES_VIEW_FORMAT_UINT_1X32: CUresourceViewFormat = 0x0d;
pub const CU_RES_VIEW_FORMAT_UINT_2X32: CUresourceViewFormat = 0x0e;
pub const CU_RES_VIEW_FORMAT_UINT_4X32: CUresourceViewFormat = 0x0f;
pub const CU_RES_VIEW_FORMAT_SINT_1X32: CUresourceViewFormat = 0x10;
pub const CU_RES_VIEW_FORMAT_SINT_2X32: CUresourceViewFormat = 0x11;
pub const CU_RES_VIEW_FORMAT_SINT_4X32: CUresourceViewFormat = 0x12;
pub const CU_RES_VIEW_FORMAT_FLOAT_1X16: CUresourceViewFormat = 0x13;
pub const CU_RES_VIEW_FORMAT_FLOAT_2X16: CUresourceViewFormat = 0x14;
pub const CU_RES_VIEW_FORMAT_FLOAT_4X16: CUresourceViewFormat = 0x15;
pub const CU_RES_VIEW_FORMAT_FLOAT_1X32: CUresourceViewFormat = 0x16;
pub const CU_RES_VIEW_FORMAT_FLOAT_2X32: CUresourceViewFormat = 0x17;
pub const CU_RES_VIEW_FORMAT_FLOAT_4X32: CUresourceViewFormat = 0x18;

pub const CU_TR_ADDRESS_MODE_WRAP: CUaddress_mode = 0;
pub const CU_TR_ADDRESS_MODE_CLAMP: CUaddress_mode = 1;
pub const CU_TR_ADDRESS_MODE_MIRROR: CUaddress_mode = 2;
pub const CU_TR_ADDRESS_MODE_BORDER: CUaddress_mode = 3;
pub const CU_TR_FILTER_MODE_POINT: CUfilter_mode = 0;
pub const CU_TR_FILTER_MODE_LINEAR: CUfilter_mode = 1;

pub const CU_TRSF_READ_AS_INTEGER: u32 = 0x01;
pub const CU_TRSF_NORMALIZED_COORDINATES: u32 = 0x02;
pub const CU_TRSF_SRGB: u32 = 0x10;

pub const CU_EXTERNAL_MEMORY_HANDLE_TYPE_OPAQUE_FD: u32 = 1;
pub const CU_EXTERNAL_MEMORY_HANDLE_TYPE_OPAQUE_WIN32: u32 = 2;
pub const CUDA_EXTERNAL_MEMORY_DEDICATED: u32 = 0x1;

pub const CU_EXTERNAL_SEMAPHORE_HANDLE_TYPE_OPAQUE_FD: u32 = 1;
pub const CU_EXTERNAL_SEMAPHORE_HANDLE_TYPE_OPAQUE_WIN32: u32 = 2;
pub const CU_EXTERNAL_SEMAPHORE_HANDLE_TYPE_TIMELINE_SEMAPHORE_FD: u32 = 9;
pub const CU_EXTERNAL_SEMAPHORE_HANDLE_TYPE_TIMELINE_SEMAPHORE_WIN32: u32 = 10;

pub const CUDA_ARRAY3D_LAYERED: u32 = 0x01;
pub const CUDA_ARRAY3D_SURFACE_LDST: u32 = 0x02;
pub const CUDA_ARRAY3D_CUBEMAP: u32 = 0x04;

pub const CU_MEMORYTYPE_HOST: CUmemorytype = 1;
pub const CU_MEMORYTYPE_DEVICE: CUmemorytype = 2;
pub const CU_MEMORYTYPE_ARRAY: CUmemorytype = 3;

pub const CU_RESOURCE_TYPE_ARRAY: u32 = 0;
pub const CU_RESOURCE_TYPE_MIPMAPPED_ARRAY: u32 = 1;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct CUuuid {
    pub bytes: [u8; 16],
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct CudaWin32Handle {
    pub handle: *mut c_void,
    pub name: *const c_void,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub union CudaExternalHandle {
    pub fd: i32,
    pub win32: CudaWin32Handle,
    pub nv_sci_object: *const c_void,
}

#[repr(C)]
pub struct CUDA_EXTERNAL_MEMORY_HANDLE_DESC {
    pub type_: u32,
    pub handle: CudaExternalHandle,
    pub size: u64,
    pub flags: u32,
    pub reserved: [u32; 16],
}

#[repr(C)]
#[derive(Default)]
pub struct CUDA_EXTERNAL_MEMORY_BUFFER_DESC {
    pub offset: u64,
    pub size: u64,
    pub flags: u32,
    pub reserved: [u32; 16],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CUDA_ARRAY3D_DESCRIPTOR {
    pub Width: usize,
    pub Height: usize,
    pub Depth: usize,
    pub Format: CUarray_format,
    pub NumChannels: u32,
    pub Flags: u32,
}

#[repr(C)]
#[derive(Default)]
pub struct CUDA_EXTERNAL_MEMORY_MIPMAPPED_ARRAY_DESC {
    pub offset: u64,
    pub arrayDesc: CUDA_ARRAY3D_DESCRIPTOR,
    pub numLevels: u32,
    pub reserved: [u32; 16],
}

#[repr(C)]
pub struct CUDA_EXTERNAL_SEMAPHORE_HANDLE_DESC {
    pub type_: u32,
    pub handle: CudaExternalHandle,
    pub flags: u32,
    pub reserved: [u32; 16],
}

#[repr(C)]
#[derive(Default)]
pub struct CudaSignalParams {
    pub fence_value: u64,
    pub nv_sci_sync: u64,
    pub keyed_mutex_key: u64,
    pub reserved: [u32; 12],
}

#[repr(C)]
#[derive(Default)]
pub struct CUDA_EXTERNAL_SEMAPHORE_SIGNAL_PARAMS {
    pub params: CudaSignalParams,
    pub flags: u32,
    pub reserved: [u32; 16],
}

#[repr(C)]
#[derive(Default)]
pub struct CudaWaitParams {
    pub fence_value: u64,
    pub nv_sci_sync: u64,
    pub keyed_mutex_key: u64,
    pub keyed_mutex_timeout_ms: u32,
    pub reserved: [u32; 10],
}

#[repr(C)]
#[derive(Default)]
pub struct CUDA_EXTERNAL_SEMAPHORE_WAIT_PARAMS {
    pub params: CudaWaitParams,
    pub flags: u32,
    pub reserved: [u32; 16],
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CUDA_MEMCPY2D {
    pub srcXInBytes: usize,
    pub srcY: usize,
    pub srcMemoryType: CUmemorytype,
    pub srcHost: *const c_void,
    pub srcDevice: CUdeviceptr,
    pub srcArray: CUarray,
    pub srcPitch: usize,
    pub dstXInBytes: usize,
    pub dstY: usize,
    pub dstMemoryType: CUmemorytype,
    pub dstHost: *mut c_void,
    pub dstDevice: CUdeviceptr,
    pub dstArray: CUarray,
    pub dstPitch: usize,
    pub WidthInBytes: usize,
    pub Height: usize,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CUDA_MEMCPY3D {
    pub srcXInBytes: usize,
    pub srcY: usize,
    pub srcZ: usize,
    pub srcLOD: usize,
    pub srcMemoryType: CUmemorytype,
    pub srcHost: *const c_void,
    pub srcDevice: CUdeviceptr,
    pub srcArray: CUarray,
    pub reserved0: *mut c_void,
    pub srcPitch: usize,
    pub srcHeight: usize,
    pub dstXInBytes: usize,
    pub dstY: usize,
    pub dstZ: usize,
    pub dstLOD: usize,
    pub dstMemoryType: CUmemorytype,
    pub dstHost: *mut c_void,
    pub dstDevice: CUdeviceptr,
    pub dstArray: CUarray,
    pub reserved1: *mut c_void,
    pub dstPitch: usize,
    pub dstHeight: usize,
    pub WidthInBytes: usize,
    pub Height: usize,
    pub Depth: usize,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub union CudaResource {
    pub array: CUarray,
    pub mipmap: CUmipmappedArray,
    pub reserved: [i32; 32],
}

#[repr(C)]
pub struct CUDA_RESOURCE_DESC {
    pub resType: u32,
    pub res: CudaResource,
    pub flags: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CUDA_TEXTURE_DESC {
    pub addressMode: [CUaddress_mode; 3],
    pub filterMode: CUfilter_mode,
    pub flags: u32,
    pub maxAnisotropy: u32,
    pub mipmapFilterMode: CUfilter_mode,
    pub mipmapLevelBias: f32,
    pub minMipmapLevelClamp: f32,
    pub maxMipmapLevelClamp: f32,
    pub borderColor: [f32; 4],
    pub reserved: [i32; 12],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct CUDA_RESOURCE_VIEW_DESC {
    pub format: CUresourceViewFormat,
    pub width: usize,
    pub height: usize,
    pub depth: usize,
    pub firstMipmapLevel: u32,
    pub lastMipmapLevel: u32,
    pub firstLayer: u32,
    pub lastLayer: u32,
    pub reserved: [u32; 16],
}

function_table! {
    /// Entry points resolved from `libcuda.so` / `nvcuda.dll`.
    pub struct CudaFunctionTable for "CUDA driver" {
        required {
            cu_init: "cuInit" => unsafe extern "C" fn(u32) -> CUresult,
            cu_driver_get_version: "cuDriverGetVersion" => unsafe extern "C" fn(*mut i32) -> CUresult,
            cu_device_get_count: "cuDeviceGetCount" => unsafe extern "C" fn(*mut i32) -> CUresult,
            cu_device_get: "cuDeviceGet" => unsafe extern "C" fn(*mut CUdevice, i32) -> CUresult,
            cu_device_get_uuid: "cuDeviceGetUuid" => unsafe extern "C" fn(*mut CUuuid, CUdevice) -> CUresult,
            cu_get_error_string: "cuGetErrorString" => unsafe extern "C" fn(CUresult, *mut *const c_char) -> CUresult,
            cu_device_primary_ctx_retain: "cuDevicePrimaryCtxRetain" => unsafe extern "C" fn(*mut CUcontext, CUdevice) -> CUresult,
            cu_device_primary_ctx_release: "cuDevicePrimaryCtxRelease_v2" => unsafe extern "C" fn(CUdevice) -> CUresult,
            cu_ctx_set_current: "cuCtxSetCurrent" => unsafe extern "C" fn(CUcontext) -> CUresult,
            cu_import_external_memory: "cuImportExternalMemory" => unsafe extern "C" fn(*mut CUexternalMemory, *const CUDA_EXTERNAL_MEMORY_HANDLE_DESC) -> CUresult,
            cu_destroy_external_memory: "cuDestroyExternalMemory" => unsafe extern "C" fn(CUexternalMemory) -> CUresult,
            cu_external_memory_get_mapped_buffer: "cuExternalMemoryGetMappedBuffer" => unsafe extern "C" fn(*mut CUdeviceptr, CUexternalMemory, *const CUDA_EXTERNAL_MEMORY_BUFFER_DESC) -> CUresult,
            cu_external_memory_get_mapped_mipmapped_array: "cuExternalMemoryGetMappedMipmappedArray" => unsafe extern "C" fn(*mut CUmipmappedArray, CUexternalMemory, *const CUDA_EXTERNAL_MEMORY_MIPMAPPED_ARRAY_DESC) -> CUresult,
            cu_mipmapped_array_get_level: "cuMipmappedArrayGetLevel" => unsafe extern "C" fn(*mut CUarray, CUmipmappedArray, u32) -> CUresult,
            cu_mipmapped_array_destroy: "cuMipmappedArrayDestroy" => unsafe extern "C" fn(CUmipmappedArray) -> CUresult,
            cu_mem_free: "cuMemFree_v2" => unsafe extern "C" fn(CUdeviceptr) -> CUresult,
            cu_import_external_semaphore: "cuImportExternalSemaphore" => unsafe extern "C" fn(*mut CUexternalSemaphore, *const CUDA_EXTERNAL_SEMAPHORE_HANDLE_DESC) -> CUresult,
            cu_destroy_external_semaphore: "cuDestroyExternalSemaphore" => unsafe extern "C" fn(CUexternalSemaphore) -> CUresult,
            cu_signal_external_semaphores_async: "cuSignalExternalSemaphoresAsync" => unsafe extern "C" fn(*const CUexternalSemaphore, *const CUDA_EXTERNAL_SEMAPHORE_SIGNAL_PARAMS, u32, CUstream) -> CUresult,
            cu_wait_external_semaphores_async: "cuWaitExternalSemaphoresAsync" => unsafe extern "C" fn(*const CUexternalSemaphore, *const CUDA_EXTERNAL_SEMAPHORE_WAIT_PARAMS, u32, CUstream) -> CUresult,
            cu_tex_object_create: "cuTexObjectCreate" => unsafe extern "C" fn(*mut CUtexObject, *const CUDA_RESOURCE_DESC, *const CUDA_TEXTURE_DESC, *const CUDA_RESOURCE_VIEW_DESC) -> CUresult,
            cu_tex_object_destroy: "cuTexObjectDestroy" => unsafe extern "C" fn(CUtexObject) -> CUresult,
            cu_surf_object_create: "cuSurfObjectCreate" => unsafe extern "C" fn(*mut CUsurfObject, *const CUDA_RESOURCE_DESC) -> CUresult,
            cu_surf_object_destroy: "cuSurfObjectDestroy" => unsafe extern "C" fn(CUsurfObject) -> CUresult,
            cu_memcpy_dtod_async: "cuMemcpyDtoDAsync_v2" => unsafe extern "C" fn(CUdeviceptr, CUdeviceptr, usize, CUstream) -> CUresult,
            cu_memcpy_htod_async: "cuMemcpyHtoDAsync_v2" => unsafe extern "C" fn(CUdeviceptr, *const c_void, usize, CUstream) -> CUresult,
            cu_memcpy_dtoh_async: "cuMemcpyDtoHAsync_v2" => unsafe extern "C" fn(*mut c_void, CUdeviceptr, usize, CUstream) -> CUresult,
            cu_memcpy_2d_async: "cuMemcpy2DAsync_v2" => unsafe extern "C" fn(*const CUDA_MEMCPY2D, CUstream) -> CUresult,
            cu_memcpy_3d_async: "cuMemcpy3DAsync_v2" => unsafe extern "C" fn(*const CUDA_MEMCPY3D, CUstream) -> CUresult,
            cu_event_record: "cuEventRecord" => unsafe extern "C" fn(CUevent, CUstream) -> CUresult,
            cu_event_synchronize: "cuEventSynchronize" => unsafe extern "C" fn(CUevent) -> CUresult,
            cu_stream_synchronize: "cuStreamSynchronize" => unsafe extern "C" fn(CUstream) -> CUresult,
        }
        optional {
            cu_get_error_name: "cuGetErrorName" => unsafe extern "C" fn(CUresult, *mut *const c_char) -> CUresult,
        }
    }
}

impl CUDA_EXTERNAL_MEMORY_HANDLE_DESC {
    pub fn zeroed() -> Self {
        //safe: every field is an integer, a pointer or a union of those
        unsafe { std::mem::zeroed() }
    }
}

impl CUDA_EXTERNAL_SEMAPHORE_HANDLE_DESC {
    pub fn zeroed() -> Self {
        unsafe { std::mem::zeroed() }
    }
}

impl CUDA_MEMCPY2D {
    pub fn zeroed() -> Self {
        unsafe { std::mem::zeroed() }
    }
}

impl CUDA_MEMCPY3D {
    pub fn zeroed() -> Self {
        unsafe { std::mem::zeroed() }
    }
}

impl CUDA_RESOURCE_DESC {
    pub fn zeroed() -> Self {
        unsafe { std::mem::zeroed() }
    }
}
