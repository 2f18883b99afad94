// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Level Zero declarations used by interop.
#![allow(non_camel_case_types, non_snake_case)]

use std::ffi::{c_char, c_void};

use crate::loader::function_table;

pub type ze_result_t = u32;
pub type ze_bool_t = u8;
pub type ze_structure_type_t = u32;
pub type ze_driver_handle_t = *mut c_void;
pub type ze_device_handle_t = *mut c_void;
pub type ze_context_handle_t = *mut c_void;
pub type ze_command_queue_handle_t = *mut c_void;
pub type ze_command_list_handle_t = *mut c_void;
pub type ze_fence_handle_t = *mut c_void;
pub type ze_event_handle_t = *mut c_void;
pub type ze_image_handle_t = *mut c_void;
pub type ze_sampler_handle_t = *mut c_void;
pub type ze_external_semaphore_ext_handle_t = *mut c_void;

pub const ZE_RESULT_SUCCESS: ze_result_t = 0;
pub const ZE_RESULT_NOT_READY: ze_result_t = 1;
pub const ZE_RESULT_ERROR_DEVICE_LOST: ze_result_t = 0x70000001;
pub const ZE_RESULT_ERROR_OUT_OF_HOST_MEMORY: ze_result_t = 0x70000002;
pub const ZE_RESULT_ERROR_OUT_OF_DEVICE_MEMORY: ze_result_t = 0x70000003;
pub const ZE_RESULT_ERROR_MODULE_BUILD_FAILURE: ze_result_t = 0x70000004;
pub const ZE_RESULT_ERROR_MODULE_LINK_FAILURE: ze_result_t = 0x70000005;
pub const ZE_RESULT_ERROR_DEVICE_REQUIRES_RESET: ze_result_t = 0x70000006;
pub const ZE_RESULT_ERROR_DEVICE_IN_LOW_POWER_STATE: ze_result_t = 0x70000007;
pub const ZE_RESULT_ERROR_INSUFFICIENT_PERMISSIONS: ze_result_t = 0x70010000;
pub const ZE_RESULT_ERROR_NOT_AVAILABLE: ze_result_t = 0x70010001;
pub const ZE_RESULT_ERROR_DEPENDENCY_UNAVAILABLE: ze_result_t = 0x70020000;
pub const ZE_RESULT_ERROR_UNINITIALIZED: ze_result_t = 0x78000001;
pub const ZE_RESULT_ERROR_UNSUPPORTED_VERSION: ze_result_t = 0x78000002;
pub const ZE_RESULT_ERROR_UNSUPPORTED_FEATURE: ze_result_t = 0x78000003;
pub const ZE_RESULT_ERROR_INVALID_ARGUMENT: ze_result_t = 0x78000004;
pub const ZE_RESULT_ERROR_INVALID_NULL_HANDLE: ze_result_t = 0x78000005;
pub const ZE_RESULT_ERROR_HANDLE_OBJECT_IN_USE: ze_result_t = 0x78000006;
pub const ZE_RESULT_ERROR_INVALID_NULL_POINTER: ze_result_t = 0x78000007;
pub const ZE_RESULT_ERROR_INVALID_SIZE: ze_result_t = 0x78000008;
pub const ZE_RESULT_ERROR_UNSUPPORTED_SIZE: ze_result_t = 0x78000009;
pub const ZE_RESULT_ERROR_UNSUPPORTED_ALIGNMENT: ze_result_t = 0x7800000a;
pub const ZE_RESULT_ERROR_INVALID_SYNCHRONIZATION_OBJECT: ze_result_t = 0x7800000b;
pub const ZE_RESULT_ERROR_INVALID_ENUMERATION: ze_result_t = 0x7800000c;
pub const ZE_RESULT_ERROR_UNSUPPORTED_ENUMERATION: ze_result_t = 0x7800000d;
pub const ZE_RESULT_ERROR_UNSUPPORTED_IMAGE_FORMAT: ze_result_t = 0x7800000e;
pub const ZE_RESULT_ERROR_UNKNOWN: ze_result_t = 0x7ffffffe;

pub const ZE_STRUCTURE_TYPE_DEVICE_MEM_ALLOC_DESC: ze_structure_type_t = 0x15;
pub const ZE_STRUCTURE_TYPE_EXTERNAL_MEMORY_IMPORT_FD: ze_structure_type_t = 0x19;
pub const ZE_STRUCTURE_TYPE_IMAGE_DESC: ze_structure_type_t = 0x13;
pub const ZE_STRUCTURE_TYPE_FENCE_DESC: ze_structure_type_t = 0x12;
pub const ZE_STRUCTURE_TYPE_SAMPLER_DESC: ze_structure_type_t = 0x1f;
pub const ZE_STRUCTURE_TYPE_EXTERNAL_MEMORY_IMPORT_WIN32: ze_structure_type_t = 0x00020003;
pub const ZE_STRUCTURE_TYPE_BINDLESS_IMAGE_EXP_DESC: ze_structure_type_t = 0x00020025;
pub const ZE_STRUCTURE_TYPE_PITCHED_IMAGE_EXP_DESC: ze_structure_type_t = 0x00020026;
pub const ZE_STRUCTURE_TYPE_EXTERNAL_SEMAPHORE_EXT_DESC: ze_structure_type_t = 0x00020029;
pub const ZE_STRUCTURE_TYPE_EXTERNAL_SEMAPHORE_WIN32_EXT_DESC: ze_structure_type_t = 0x0002002a;
pub const ZE_STRUCTURE_TYPE_EXTERNAL_SEMAPHORE_FD_EXT_DESC: ze_structure_type_t = 0x0002002b;
pub const ZE_STRUCTURE_TYPE_EXTERNAL_SEMAPHORE_SIGNAL_PARAMS_EXT: ze_structure_type_t = 0x0002002c;
pub const ZE_STRUCTURE_TYPE_EXTERNAL_SEMAPHORE_WAIT_PARAMS_EXT: ze_structure_type_t = 0x0002002d;

pub const ZE_EXTERNAL_MEMORY_TYPE_FLAG_OPAQUE_FD: u32 = 1 << 0;
pub const ZE_EXTERNAL_MEMORY_TYPE_FLAG_OPAQUE_WIN32: u32 = 1 << 2;

pub const ZE_EXTERNAL_SEMAPHORE_EXT_FLAG_OPAQUE_FD: u32 = 1 << 0;
pub const ZE_EXTERNAL_SEMAPHORE_EXT_FLAG_OPAQUE_WIN32: u32 = 1 << 1;
pub const ZE_EXTERNAL_SEMAPHORE_EXT_FLAG_VK_TIMELINE_SEMAPHORE_FD: u32 = 1 << 7;
pub const ZE_EXTERNAL_SEMAPHORE_EXT_FLAG_VK_TIMELINE_SEMAPHORE_WIN32: u32 = 1 << 8;

pub const ZE_IMAGE_FLAG_KERNEL_WRITE: u32 = 1 << 0;
pub const ZE_IMAGE_BINDLESS_EXP_FLAG_BINDLESS: u32 = 1 << 0;

pub const ZE_IMAGE_TYPE_1D: u32 = 0;
pub const ZE_IMAGE_TYPE_1DARRAY: u32 = 1;
pub const ZE_IMAGE_TYPE_2D: u32 = 2;
pub const ZE_IMAGE_TYPE_2DARRAY: u32 = 3;
pub const ZE_IMAGE_TYPE_3D: u32 = 4;

pub const ZE_IMAGE_FORMAT_LAYOUT_8: u32 = 0;
pub const ZE_IMAGE_FORMAT_LAYOUT_16: u32 = 1;
pub const ZE_IMAGE_FORMAT_LAYOUT_32: u32 = 2;
pub const ZE_IMAGE_FORMAT_LAYOUT_8_8: u32 = 3;
pub const ZE_IMAGE_FORMAT_LAYOUT_8_8_8_8: u32 = 4;
pub const ZE_IMAGE_FORMAT_LAYOUT_16_16: u32 = 5;
pub const ZE_IMAGE_FORMAT_LAYOUT_16_16_16_16: u32 = 6;
pub const ZE_IMAGE_FORMAT_LAYOUT_32_32: u32 = 7;
pub const ZE_IMAGE_FORMAT_LAYOUT_32_32_32_32: u32 = 8;
pub const ZE_IMAGE_FORMAT_LAYOUT_10_10_10_2: u32 = 9;

pub const ZE_IMAGE_FORMAT_TYPE_UINT: u32 = 0;
pub const ZE_IMAGE_FORMAT_TYPE_SINT: u32 = 1;
pub const ZE_IMAGE_FORMAT_TYPE_UNORM: u32 = 2;
pub const ZE_IMAGE_FORMAT_TYPE_SNORM: u32 = 3;
pub const ZE_IMAGE_FORMAT_TYPE_FLOAT: u32 = 4;

pub const ZE_IMAGE_FORMAT_SWIZZLE_R: u32 = 0;
pub const ZE_IMAGE_FORMAT_SWIZZLE_G: u32 = 1;
pub const ZE_IMAGE_FORMAT_SWIZZLE_B: u32 = 2;
pub const ZE_IMAGE_FORMAT_SWIZZLE_A: u32 = 3;
pub const ZE_IMAGE_FORMAT_SWIZZLE_0: u32 = 4;
pub const ZE_IMAGE_FORMAT_SWIZZLE_1: u32 = 5;

pub const ZE_SAMPLER_ADDRESS_MODE_NONE: u32 = 0;
pub const ZE_SAMPLER_ADDRESS_MODE_REPEAT: u32 = 1;
pub const ZE_SAMPLER_ADDRESS_MODE_CLAMP: u32 = 2;
pub const ZE_SAMPLER_ADDRESS_MODE_CLAMP_TO_BORDER: u32 = 3;
pub const ZE_SAMPLER_ADDRESS_MODE_MIRROR: u32 = 4;
pub const ZE_SAMPLER_FILTER_MODE_NEAREST: u32 = 0;
pub const ZE_SAMPLER_FILTER_MODE_LINEAR: u32 = 1;

/// Names of the status codes, for drivers that do not describe their errors.
pub static ZE_RESULT_NAMES: &[(ze_result_t, &str)] = &[
    (ZE_RESULT_SUCCESS, "ZE_RESULT_SUCCESS"),
    (ZE_RESULT_NOT_READY, "ZE_RESULT_NOT_READY"),
    (ZE_RESULT_ERROR_DEVICE_LOST, "ZE_RESULT_ERROR_DEVICE_LOST"),
    (ZE_RESULT_ERROR_OUT_OF_HOST_MEMORY, "ZE_RESULT_ERROR_OUT_OF_HOST_MEMORY"),
    (ZE_RESULT_ERROR_OUT_OF_DEVICE_MEMORY, "ZE_RESULT_ERROR_OUT_OF_DEVICE_MEMORY"),
    (ZE_RESULT_ERROR_MODULE_BUILD_FAILURE, "ZE_RESULT_ERROR_MODULE_BUILD_FAILURE"),
    (ZE_RESULT_ERROR_MODULE_LINK_FAILURE, "ZE_RESULT_ERROR_MODULE_LINK_FAILURE"),
    (ZE_RESULT_ERROR_DEVICE_REQUIRES_RESET, "ZE_RESULT_ERROR_DEVICE_REQUIRES_RESET"),
    (ZE_RESULT_ERROR_DEVICE_IN_LOW_POWER_STATE, "ZE_RESULT_ERROR_DEVICE_IN_LOW_POWER_STATE"),
    (ZE_RESULT_ERROR_INSUFFICIENT_PERMISSIONS, "ZE_RESULT_ERROR_INSUFFICIENT_PERMISSIONS"),
    (ZE_RESULT_ERROR_NOT_AVAILABLE, "ZE_RESULT_ERROR_NOT_AVAILABLE"),
    (ZE_RESULT_ERROR_DEPENDENCY_UNAVAILABLE, "ZE_RESULT_ERROR_DEPENDENCY_UNAVAILABLE"),
    (ZE_RESULT_ERROR_UNINITIALIZED, "ZE_RESULT_ERROR_UNINITIALIZED"),
    (ZE_RESULT_ERROR_UNSUPPORTED_VERSION, "ZE_RESULT_ERROR_UNSUPPORTED_VERSION"),
    (ZE_RESULT_ERROR_UNSUPPORTED_FEATURE, "ZE_RESULT_ERROR_UNSUPPORTED_FEATURE"),
    (ZE_RESULT_ERROR_INVALID_ARGUMENT, "ZE_RESULT_ERROR_INVALID_ARGUMENT"),
    (ZE_RESULT_ERROR_INVALID_NULL_HANDLE, "ZE_RESULT_ERROR_INVALID_NULL_HANDLE"),
    (ZE_RESULT_ERROR_HANDLE_OBJECT_IN_USE, "ZE_RESULT_ERROR_HANDLE_OBJECT_IN_USE"),
    (ZE_RESULT_ERROR_INVALID_NULL_POINTER, "ZE_RESULT_ERROR_INVALID_NULL_POINTER"),
    (ZE_RESULT_ERROR_INVALID_SIZE, "ZE_RESULT_ERROR_INVALID_SIZE"),
    (ZE_RESULT_ERROR_UNSUPPORTED_SIZE, "ZE_RESULT_ERROR_UNSUPPORTED_SIZE"),
    (ZE_RESULT_ERROR_UNSUPPORTED_ALIGNMENT, "ZE_RESULT_ERROR_UNSUPPORTED_ALIGNMENT"),
    (ZE_RESULT_ERROR_INVALID_SYNCHRONIZATION_OBJECT, "ZE_RESULT_ERROR_INVALID_SYNCHRONIZATION_OBJECT"),
    (ZE_RESULT_ERROR_INVALID_ENUMERATION, "ZE_RESULT_ERROR_INVALID_ENUMERATION"),
    (ZE_RESULT_ERROR_UNSUPPORTED_ENUMERATION, "ZE_RESULT_ERROR_UNSUPPORTED_ENUMERATION"),
    (ZE_RESULT_ERROR_UNSUPPORTED_IMAGE_FORMAT, "ZE_RESULT_ERROR_UNSUPPORTED_IMAGE_FORMAT"),
    (ZE_RESULT_ERROR_UNKNOWN, "ZE_RESULT_ERROR_UNKNOWN"),
];

#[repr(C)]
pub struct ze_device_mem_alloc_desc_t {
    pub stype: ze_structure_type_t,
    pub pNext: *const c_void,
    pub flags: u32,
    pub ordinal: u32,
}

#[repr(C)]
pub struct ze_external_memory_import_fd_t {
    pub stype: ze_structure_type_t,
    pub pNext: *const c_void,
    pub flags: u32,
    pub fd: i32,
}

#[repr(C)]
pub struct ze_external_memory_import_win32_handle_t {
    pub stype: ze_structure_type_t,
    pub pNext: *const c_void,
    pub flags: u32,
    pub handle: *mut c_void,
    pub name: *const c_void,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ze_image_format_t {
    pub layout: u32,
    pub type_: u32,
    pub x: u32,
    pub y: u32,
    pub z: u32,
    pub w: u32,
}

#[repr(C)]
pub struct ze_image_desc_t {
    pub stype: ze_structure_type_t,
    pub pNext: *const c_void,
    pub flags: u32,
    pub type_: u32,
    pub format: ze_image_format_t,
    pub width: u64,
    pub height: u32,
    pub depth: u32,
    pub arraylevels: u32,
    pub miplevels: u32,
}

#[repr(C)]
pub struct ze_image_bindless_exp_desc_t {
    pub stype: ze_structure_type_t,
    pub pNext: *const c_void,
    pub flags: u32,
}

#[repr(C)]
pub struct ze_image_pitched_exp_desc_t {
    pub stype: ze_structure_type_t,
    pub pNext: *const c_void,
    pub ptr: *mut c_void,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ze_sampler_desc_t {
    pub stype: ze_structure_type_t,
    pub pNext: *const c_void,
    pub addressMode: u32,
    pub filterMode: u32,
    pub isNormalized: ze_bool_t,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ze_image_region_t {
    pub originX: u32,
    pub originY: u32,
    pub originZ: u32,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

#[repr(C)]
pub struct ze_fence_desc_t {
    pub stype: ze_structure_type_t,
    pub pNext: *const c_void,
    pub flags: u32,
}

#[repr(C)]
pub struct ze_external_semaphore_ext_desc_t {
    pub stype: ze_structure_type_t,
    pub pNext: *const c_void,
    pub flags: u32,
}

#[repr(C)]
pub struct ze_external_semaphore_fd_ext_desc_t {
    pub stype: ze_structure_type_t,
    pub pNext: *const c_void,
    pub fd: i32,
}

#[repr(C)]
pub struct ze_external_semaphore_win32_ext_desc_t {
    pub stype: ze_structure_type_t,
    pub pNext: *const c_void,
    pub handle: *mut c_void,
    pub name: *const c_char,
}

#[repr(C)]
pub struct ze_external_semaphore_signal_params_ext_t {
    pub stype: ze_structure_type_t,
    pub pNext: *const c_void,
    pub value: u64,
}

#[repr(C)]
pub struct ze_external_semaphore_wait_params_ext_t {
    pub stype: ze_structure_type_t,
    pub pNext: *const c_void,
    pub value: u64,
}

function_table! {
    /// Entry points resolved from `libze_loader.so.1` / `ze_loader.dll`.
    pub struct LevelZeroFunctionTable for "Level Zero loader" {
        required {
            ze_init: "zeInit" => unsafe extern "C" fn(u32) -> ze_result_t,
            ze_mem_alloc_device: "zeMemAllocDevice" => unsafe extern "C" fn(ze_context_handle_t, *const ze_device_mem_alloc_desc_t, usize, usize, ze_device_handle_t, *mut *mut c_void) -> ze_result_t,
            ze_mem_free: "zeMemFree" => unsafe extern "C" fn(ze_context_handle_t, *mut c_void) -> ze_result_t,
            ze_image_create: "zeImageCreate" => unsafe extern "C" fn(ze_context_handle_t, ze_device_handle_t, *const ze_image_desc_t, *mut ze_image_handle_t) -> ze_result_t,
            ze_image_destroy: "zeImageDestroy" => unsafe extern "C" fn(ze_image_handle_t) -> ze_result_t,
            ze_sampler_create: "zeSamplerCreate" => unsafe extern "C" fn(ze_context_handle_t, ze_device_handle_t, *const ze_sampler_desc_t, *mut ze_sampler_handle_t) -> ze_result_t,
            ze_sampler_destroy: "zeSamplerDestroy" => unsafe extern "C" fn(ze_sampler_handle_t) -> ze_result_t,
            ze_command_list_append_memory_copy: "zeCommandListAppendMemoryCopy" => unsafe extern "C" fn(ze_command_list_handle_t, *mut c_void, *const c_void, usize, ze_event_handle_t, u32, *mut ze_event_handle_t) -> ze_result_t,
            ze_command_list_append_image_copy_from_memory: "zeCommandListAppendImageCopyFromMemory" => unsafe extern "C" fn(ze_command_list_handle_t, ze_image_handle_t, *const c_void, *const ze_image_region_t, ze_event_handle_t, u32, *mut ze_event_handle_t) -> ze_result_t,
            ze_command_list_append_image_copy_to_memory: "zeCommandListAppendImageCopyToMemory" => unsafe extern "C" fn(ze_command_list_handle_t, *mut c_void, ze_image_handle_t, *const ze_image_region_t, ze_event_handle_t, u32, *mut ze_event_handle_t) -> ze_result_t,
            ze_command_list_close: "zeCommandListClose" => unsafe extern "C" fn(ze_command_list_handle_t) -> ze_result_t,
            ze_command_list_reset: "zeCommandListReset" => unsafe extern "C" fn(ze_command_list_handle_t) -> ze_result_t,
            ze_command_queue_execute_command_lists: "zeCommandQueueExecuteCommandLists" => unsafe extern "C" fn(ze_command_queue_handle_t, u32, *mut ze_command_list_handle_t, ze_fence_handle_t) -> ze_result_t,
            ze_fence_create: "zeFenceCreate" => unsafe extern "C" fn(ze_command_queue_handle_t, *const ze_fence_desc_t, *mut ze_fence_handle_t) -> ze_result_t,
            ze_fence_destroy: "zeFenceDestroy" => unsafe extern "C" fn(ze_fence_handle_t) -> ze_result_t,
            ze_fence_host_synchronize: "zeFenceHostSynchronize" => unsafe extern "C" fn(ze_fence_handle_t, u64) -> ze_result_t,
            ze_fence_reset: "zeFenceReset" => unsafe extern "C" fn(ze_fence_handle_t) -> ze_result_t,
            ze_event_host_synchronize: "zeEventHostSynchronize" => unsafe extern "C" fn(ze_event_handle_t, u64) -> ze_result_t,
        }
        optional {
            ze_command_list_host_synchronize: "zeCommandListHostSynchronize" => unsafe extern "C" fn(ze_command_list_handle_t, u64) -> ze_result_t,
            ze_mem_get_pitch_for_2d_image: "zeMemGetPitchFor2dImage" => unsafe extern "C" fn(ze_context_handle_t, ze_device_handle_t, usize, usize, u32, *mut usize) -> ze_result_t,
            ze_device_import_external_semaphore_ext: "zeDeviceImportExternalSemaphoreExt" => unsafe extern "C" fn(ze_device_handle_t, *const ze_external_semaphore_ext_desc_t, *mut ze_external_semaphore_ext_handle_t) -> ze_result_t,
            ze_device_release_external_semaphore_ext: "zeDeviceReleaseExternalSemaphoreExt" => unsafe extern "C" fn(ze_external_semaphore_ext_handle_t) -> ze_result_t,
            ze_command_list_append_signal_external_semaphore_ext: "zeCommandListAppendSignalExternalSemaphoreExt" => unsafe extern "C" fn(ze_command_list_handle_t, u32, *mut ze_external_semaphore_ext_handle_t, *mut ze_external_semaphore_signal_params_ext_t, ze_event_handle_t, u32, *mut ze_event_handle_t) -> ze_result_t,
            ze_command_list_append_wait_external_semaphore_ext: "zeCommandListAppendWaitExternalSemaphoreExt" => unsafe extern "C" fn(ze_command_list_handle_t, u32, *mut ze_external_semaphore_ext_handle_t, *mut ze_external_semaphore_wait_params_ext_t, ze_event_handle_t, u32, *mut ze_event_handle_t) -> ze_result_t,
        }
    }
}
