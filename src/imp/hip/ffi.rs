// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! HIP runtime and hiprtc declarations used by interop.
#![allow(non_camel_case_types, non_snake_case)]

use std::ffi::{c_char, c_void};

use crate::loader::function_table;

pub type hipError_t = i32;
pub type hipDevice_t = i32;
pub type hipStream_t = *mut c_void;
pub type hipEvent_t = *mut c_void;
pub type hipExternalMemory_t = *mut c_void;
pub type hipExternalSemaphore_t = *mut c_void;
pub type hipMipmappedArray_t = *mut c_void;
pub type hipArray_t = *mut c_void;
pub type hipTextureObject_t = u64;
pub type hipSurfaceObject_t = u64;
pub type hipMemcpyKind = u32;
pub type hipChannelFormatKind = u32;
pub type hipTextureAddressMode = u32;
pub type hipTextureFilterMode = u32;
pub type hiprtcResult = i32;
pub type hiprtcProgram = *mut c_void;

pub const hipSuccess: hipError_t = 0;
pub const hipErrorInvalidValue: hipError_t = 1;
pub const HIPRTC_SUCCESS: hiprtcResult = 0;

pub const hipMemcpyHostToDevice: hipMemcpyKind = 1;
pub const hipMemcpyDeviceToHost: hipMemcpyKind = 2;
pub const hipMemcpyDeviceToDevice: hipMemcpyKind = 3;

pub const hipChannelFormatKindSigned: hipChannelFormatKind = 0;
pub const hipChannelFormatKindUnsigned: hipChannelFormatKind = 1;
pub const hipChannelFormatKindFloat: hipChannelFormatKind = 2;

pub const hipExternalMemoryHandleTypeOpaqueFd: u32 = 1;
pub const hipExternalMemoryHandleTypeOpaqueWin32: u32 = 2;
pub const hipExternalMemoryDedicated: u32 = 0x1;

pub const hipExternalSemaphoreHandleTypeOpaqueFd: u32 = 1;
pub const hipExternalSemaphoreHandleTypeOpaqueWin32: u32 = 2;
pub const hipExternalSemaphoreHandleTypeTimelineSemaphoreFd: u32 = 9;
pub const hipExternalSemaphoreHandleTypeTimelineSemaphoreWin32: u32 = 10;

pub const hipArrayLayered: u32 = 0x01;
pub const hipArraySurfaceLoadStore: u32 = 0x02;
pub const hipArrayCubemap: u32 = 0x04;

pub const hipResourceTypeArray: u32 = 0;
pub const hipResourceTypeMipmappedArray: u32 = 1;

pub const hipAddressModeWrap: hipTextureAddressMode = 0;
pub const hipAddressModeClamp: hipTextureAddressMode = 1;
pub const hipAddressModeMirror: hipTextureAddressMode = 2;
pub const hipAddressModeBorder: hipTextureAddressMode = 3;
pub const hipFilterModePoint: hipTextureFilterMode = 0;
pub const hipFilterModeLinear: hipTextureFilterMode = 1;
pub const hipReadModeElementType: u32 = 0;
pub const hipReadModeNormalizedFloat: u32 = 1;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct hipUUID {
    pub bytes: [u8; 16],
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct HipWin32Handle {
    pub handle: *mut c_void,
    pub name: *const c_void,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub union HipExternalHandle {
    pub fd: i32,
    pub win32: HipWin32Handle,
    pub nv_sci_object: *const c_void,
}

#[repr(C)]
pub struct hipExternalMemoryHandleDesc {
    pub type_: u32,
    pub handle: HipExternalHandle,
    pub size: u64,
    pub flags: u32,
    pub reserved: [u32; 16],
}

#[repr(C)]
#[derive(Default)]
pub struct hipExternalMemoryBufferDesc {
    pub offset: u64,
    pub size: u64,
    pub flags: u32,
    pub reserved: [u32; 16],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct hipChannelFormatDesc {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub w: i32,
    pub f: hipChannelFormatKind,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct hipExtent {
    pub width: usize,
    pub height: usize,
    pub depth: usize,
}

#[repr(C)]
#[derive(Default)]
pub struct hipExternalMemoryMipmappedArrayDesc {
    pub offset: u64,
    pub formatDesc: hipChannelFormatDesc,
    pub extent: hipExtent,
    pub flags: u32,
    pub numLevels: u32,
}

#[repr(C)]
pub struct hipExternalSemaphoreHandleDesc {
    pub type_: u32,
    pub handle: HipExternalHandle,
    pub flags: u32,
    pub reserved: [u32; 16],
}

#[repr(C)]
#[derive(Default)]
pub struct HipSignalParams {
    pub fence_value: u64,
    pub nv_sci_sync: u64,
    pub keyed_mutex_key: u64,
    pub reserved: [u32; 12],
}

#[repr(C)]
#[derive(Default)]
pub struct hipExternalSemaphoreSignalParams {
    pub params: HipSignalParams,
    pub flags: u32,
    pub reserved: [u32; 16],
}

#[repr(C)]
#[derive(Default)]
pub struct HipWaitParams {
    pub fence_value: u64,
    pub nv_sci_sync: u64,
    pub keyed_mutex_key: u64,
    pub keyed_mutex_timeout_ms: u32,
    pub reserved: [u32; 10],
}

#[repr(C)]
#[derive(Default)]
pub struct hipExternalSemaphoreWaitParams {
    pub params: HipWaitParams,
    pub flags: u32,
    pub reserved: [u32; 16],
}

#[repr(C)]
#[derive(Clone, Copy)]
pub union HipResource {
    pub array: hipArray_t,
    pub mipmap: hipMipmappedArray_t,
    pub pitch2d: [usize; 7],
}

#[repr(C)]
pub struct hipResourceDesc {
    pub resType: u32,
    pub res: HipResource,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct hipTextureDesc {
    pub addressMode: [hipTextureAddressMode; 3],
    pub filterMode: hipTextureFilterMode,
    pub readMode: u32,
    pub sRGB: i32,
    pub borderColor: [f32; 4],
    pub normalizedCoords: i32,
    pub maxAnisotropy: u32,
    pub mipmapFilterMode: hipTextureFilterMode,
    pub mipmapLevelBias: f32,
    pub minMipmapLevelClamp: f32,
    pub maxMipmapLevelClamp: f32,
}

function_table! {
    /// Entry points resolved from `libamdhip64.so` / `amdhip64.dll`.
    pub struct HipFunctionTable for "HIP runtime" {
        required {
            hip_init: "hipInit" => unsafe extern "C" fn(u32) -> hipError_t,
            hip_runtime_get_version: "hipRuntimeGetVersion" => unsafe extern "C" fn(*mut i32) -> hipError_t,
            hip_get_device_count: "hipGetDeviceCount" => unsafe extern "C" fn(*mut i32) -> hipError_t,
            hip_device_get: "hipDeviceGet" => unsafe extern "C" fn(*mut hipDevice_t, i32) -> hipError_t,
            hip_device_get_uuid: "hipDeviceGetUuid" => unsafe extern "C" fn(*mut hipUUID, hipDevice_t) -> hipError_t,
            hip_set_device: "hipSetDevice" => unsafe extern "C" fn(i32) -> hipError_t,
            hip_get_error_string: "hipGetErrorString" => unsafe extern "C" fn(hipError_t) -> *const c_char,
            hip_import_external_memory: "hipImportExternalMemory" => unsafe extern "C" fn(*mut hipExternalMemory_t, *const hipExternalMemoryHandleDesc) -> hipError_t,
            hip_destroy_external_memory: "hipDestroyExternalMemory" => unsafe extern "C" fn(hipExternalMemory_t) -> hipError_t,
            hip_external_memory_get_mapped_buffer: "hipExternalMemoryGetMappedBuffer" => unsafe extern "C" fn(*mut *mut c_void, hipExternalMemory_t, *const hipExternalMemoryBufferDesc) -> hipError_t,
            hip_external_memory_get_mapped_mipmapped_array: "hipExternalMemoryGetMappedMipmappedArray" => unsafe extern "C" fn(*mut hipMipmappedArray_t, hipExternalMemory_t, *const hipExternalMemoryMipmappedArrayDesc) -> hipError_t,
            hip_get_mipmapped_array_level: "hipGetMipmappedArrayLevel" => unsafe extern "C" fn(*mut hipArray_t, hipMipmappedArray_t, u32) -> hipError_t,
            hip_free_mipmapped_array: "hipFreeMipmappedArray" => unsafe extern "C" fn(hipMipmappedArray_t) -> hipError_t,
            hip_free: "hipFree" => unsafe extern "C" fn(*mut c_void) -> hipError_t,
            hip_import_external_semaphore: "hipImportExternalSemaphore" => unsafe extern "C" fn(*mut hipExternalSemaphore_t, *const hipExternalSemaphoreHandleDesc) -> hipError_t,
            hip_destroy_external_semaphore: "hipDestroyExternalSemaphore" => unsafe extern "C" fn(hipExternalSemaphore_t) -> hipError_t,
            hip_signal_external_semaphores_async: "hipSignalExternalSemaphoresAsync" => unsafe extern "C" fn(*const hipExternalSemaphore_t, *const hipExternalSemaphoreSignalParams, u32, hipStream_t) -> hipError_t,
            hip_wait_external_semaphores_async: "hipWaitExternalSemaphoresAsync" => unsafe extern "C" fn(*const hipExternalSemaphore_t, *const hipExternalSemaphoreWaitParams, u32, hipStream_t) -> hipError_t,
            hip_create_texture_object: "hipCreateTextureObject" => unsafe extern "C" fn(*mut hipTextureObject_t, *const hipResourceDesc, *const hipTextureDesc, *const c_void) -> hipError_t,
            hip_destroy_texture_object: "hipDestroyTextureObject" => unsafe extern "C" fn(hipTextureObject_t) -> hipError_t,
            hip_create_surface_object: "hipCreateSurfaceObject" => unsafe extern "C" fn(*mut hipSurfaceObject_t, *const hipResourceDesc) -> hipError_t,
            hip_destroy_surface_object: "hipDestroySurfaceObject" => unsafe extern "C" fn(hipSurfaceObject_t) -> hipError_t,
            hip_memcpy_async: "hipMemcpyAsync" => unsafe extern "C" fn(*mut c_void, *const c_void, usize, hipMemcpyKind, hipStream_t) -> hipError_t,
            hip_memcpy_2d_to_array_async: "hipMemcpy2DToArrayAsync" => unsafe extern "C" fn(hipArray_t, usize, usize, *const c_void, usize, usize, usize, hipMemcpyKind, hipStream_t) -> hipError_t,
            hip_memcpy_2d_from_array_async: "hipMemcpy2DFromArrayAsync" => unsafe extern "C" fn(*mut c_void, usize, hipArray_t, usize, usize, usize, usize, hipMemcpyKind, hipStream_t) -> hipError_t,
            hip_event_record: "hipEventRecord" => unsafe extern "C" fn(hipEvent_t, hipStream_t) -> hipError_t,
            hip_event_synchronize: "hipEventSynchronize" => unsafe extern "C" fn(hipEvent_t) -> hipError_t,
            hip_stream_synchronize: "hipStreamSynchronize" => unsafe extern "C" fn(hipStream_t) -> hipError_t,
        }
        optional {
            hip_get_error_name: "hipGetErrorName" => unsafe extern "C" fn(hipError_t) -> *const c_char,
        }
    }
}

function_table! {
    /// Entry points resolved from the hiprtc library.
    pub struct HiprtcFunctionTable for "hiprtc" {
        required {
            hiprtc_get_error_string: "hiprtcGetErrorString" => unsafe extern "C" fn(hiprtcResult) -> *const c_char,
            hiprtc_create_program: "hiprtcCreateProgram" => unsafe extern "C" fn(*mut hiprtcProgram, *const c_char, *const c_char, i32, *const *const c_char, *const *const c_char) -> hiprtcResult,
            hiprtc_destroy_program: "hiprtcDestroyProgram" => unsafe extern "C" fn(*mut hiprtcProgram) -> hiprtcResult,
            hiprtc_compile_program: "hiprtcCompileProgram" => unsafe extern "C" fn(hiprtcProgram, i32, *const *const c_char) -> hiprtcResult,
            hiprtc_get_program_log_size: "hiprtcGetProgramLogSize" => unsafe extern "C" fn(hiprtcProgram, *mut usize) -> hiprtcResult,
            hiprtc_get_program_log: "hiprtcGetProgramLog" => unsafe extern "C" fn(hiprtcProgram, *mut c_char) -> hiprtcResult,
            hiprtc_get_code_size: "hiprtcGetCodeSize" => unsafe extern "C" fn(hiprtcProgram, *mut usize) -> hiprtcResult,
            hiprtc_get_code: "hiprtcGetCode" => unsafe extern "C" fn(hiprtcProgram, *mut c_char) -> hiprtcResult,
        }
        optional {
        }
    }
}

impl hipExternalMemoryHandleDesc {
    pub fn zeroed() -> Self {
        //safe: integers, pointers and unions of those
        unsafe { std::mem::zeroed() }
    }
}

impl hipExternalSemaphoreHandleDesc {
    pub fn zeroed() -> Self {
        unsafe { std::mem::zeroed() }
    }
}

impl hipResourceDesc {
    pub fn zeroed() -> Self {
        unsafe { std::mem::zeroed() }
    }
}
