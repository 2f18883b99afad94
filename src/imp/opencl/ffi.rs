// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! OpenCL declarations used by interop.
#![allow(non_camel_case_types, non_upper_case_globals)]

use std::ffi::{c_char, c_void};

use crate::loader::function_table;

pub type cl_int = i32;
pub type cl_uint = u32;
pub type cl_ulong = u64;
pub type cl_bool = u32;
pub type cl_bitfield = u64;
pub type cl_mem_flags = cl_bitfield;
pub type cl_properties = u64;
pub type cl_mem_properties = cl_properties;
pub type cl_sampler_properties = cl_properties;
pub type cl_semaphore_properties_khr = cl_properties;
pub type cl_semaphore_payload_khr = u64;
pub type cl_platform_id = *mut c_void;
pub type cl_device_id = *mut c_void;
pub type cl_context = *mut c_void;
pub type cl_command_queue = *mut c_void;
pub type cl_mem = *mut c_void;
pub type cl_event = *mut c_void;
pub type cl_sampler = *mut c_void;
pub type cl_semaphore_khr = *mut c_void;

pub const CL_FALSE: cl_bool = 0;
pub const CL_TRUE: cl_bool = 1;

pub const CL_SUCCESS: cl_int = 0;
pub const CL_DEVICE_NOT_FOUND: cl_int = -1;
pub const CL_DEVICE_NOT_AVAILABLE: cl_int = -2;
pub const CL_MEM_OBJECT_ALLOCATION_FAILURE: cl_int = -4;
pub const CL_OUT_OF_RESOURCES: cl_int = -5;
pub const CL_OUT_OF_HOST_MEMORY: cl_int = -6;
pub const CL_IMAGE_FORMAT_NOT_SUPPORTED: cl_int = -10;
pub const CL_INVALID_VALUE: cl_int = -30;
pub const CL_INVALID_PLATFORM: cl_int = -32;
pub const CL_INVALID_DEVICE: cl_int = -33;
pub const CL_INVALID_CONTEXT: cl_int = -34;
pub const CL_INVALID_COMMAND_QUEUE: cl_int = -36;
pub const CL_INVALID_MEM_OBJECT: cl_int = -38;
pub const CL_INVALID_IMAGE_FORMAT_DESCRIPTOR: cl_int = -39;
pub const CL_INVALID_IMAGE_SIZE: cl_int = -40;
pub const CL_INVALID_SAMPLER: cl_int = -41;
pub const CL_INVALID_EVENT_WAIT_LIST: cl_int = -57;
pub const CL_INVALID_EVENT: cl_int = -58;
pub const CL_INVALID_OPERATION: cl_int = -59;
pub const CL_INVALID_BUFFER_SIZE: cl_int = -61;
pub const CL_INVALID_PROPERTY: cl_int = -64;
pub const CL_INVALID_IMAGE_DESCRIPTOR: cl_int = -65;
pub const CL_PLATFORM_NOT_FOUND_KHR: cl_int = -1001;
pub const CL_INVALID_SEMAPHORE_KHR: cl_int = -1142;

pub const CL_PLATFORM_NAME: cl_uint = 0x0902;
pub const CL_DEVICE_TYPE_ALL: cl_bitfield = 0xFFFF_FFFF;
pub const CL_DEVICE_VENDOR_ID: cl_uint = 0x1001;
pub const CL_DEVICE_NAME: cl_uint = 0x102B;
pub const CL_DEVICE_EXTENSIONS: cl_uint = 0x1030;
pub const CL_DEVICE_PLATFORM: cl_uint = 0x1031;
pub const CL_DEVICE_UUID_KHR: cl_uint = 0x106A;
pub const CL_DEVICE_BOARD_NAME_AMD: cl_uint = 0x4038;

pub const CL_MEM_READ_WRITE: cl_mem_flags = 1 << 0;
pub const CL_BUFFER_CREATE_TYPE_REGION: cl_uint = 0x1220;
pub const CL_MEM_DEVICE_HANDLE_LIST_KHR: cl_properties = 0x2051;
pub const CL_MEM_DEVICE_HANDLE_LIST_END_KHR: cl_properties = 0;
pub const CL_EXTERNAL_MEMORY_HANDLE_OPAQUE_FD_KHR: cl_properties = 0x2060;
pub const CL_EXTERNAL_MEMORY_HANDLE_OPAQUE_WIN32_KHR: cl_properties = 0x2061;

pub const CL_MEM_OBJECT_IMAGE2D: cl_uint = 0x10F1;
pub const CL_MEM_OBJECT_IMAGE3D: cl_uint = 0x10F2;
pub const CL_MEM_OBJECT_IMAGE2D_ARRAY: cl_uint = 0x10F3;
pub const CL_MEM_OBJECT_IMAGE1D: cl_uint = 0x10F4;
pub const CL_MEM_OBJECT_IMAGE1D_ARRAY: cl_uint = 0x10F5;

pub const CL_R: cl_uint = 0x10B0;
pub const CL_RG: cl_uint = 0x10B2;
pub const CL_RGBA: cl_uint = 0x10B5;
pub const CL_BGRA: cl_uint = 0x10B6;
pub const CL_DEPTH: cl_uint = 0x10BD;
pub const CL_DEPTH_STENCIL: cl_uint = 0x10BE;
pub const CL_sRGBA: cl_uint = 0x10C1;
pub const CL_sBGRA: cl_uint = 0x10C2;

pub const CL_SNORM_INT8: cl_uint = 0x10D0;
pub const CL_SNORM_INT16: cl_uint = 0x10D1;
pub const CL_UNORM_INT8: cl_uint = 0x10D2;
pub const CL_UNORM_INT16: cl_uint = 0x10D3;
pub const CL_SIGNED_INT8: cl_uint = 0x10D7;
pub const CL_SIGNED_INT16: cl_uint = 0x10D8;
pub const CL_SIGNED_INT32: cl_uint = 0x10D9;
pub const CL_UNSIGNED_INT8: cl_uint = 0x10DA;
pub const CL_UNSIGNED_INT16: cl_uint = 0x10DB;
pub const CL_UNSIGNED_INT32: cl_uint = 0x10DC;
pub const CL_HALF_FLOAT: cl_uint = 0x10DD;
pub const CL_FLOAT: cl_uint = 0x10DE;
pub const CL_UNORM_INT24: cl_uint = 0x10DF;

pub const CL_ADDRESS_NONE: cl_uint = 0x1130;
pub const CL_ADDRESS_CLAMP_TO_EDGE: cl_uint = 0x1131;
pub const CL_ADDRESS_CLAMP: cl_uint = 0x1132;
pub const CL_ADDRESS_REPEAT: cl_uint = 0x1133;
pub const CL_ADDRESS_MIRRORED_REPEAT: cl_uint = 0x1134;
pub const CL_FILTER_NEAREST: cl_uint = 0x1140;
pub const CL_FILTER_LINEAR: cl_uint = 0x1141;
pub const CL_SAMPLER_NORMALIZED_COORDS: cl_sampler_properties = 0x1152;
pub const CL_SAMPLER_ADDRESSING_MODE: cl_sampler_properties = 0x1153;
pub const CL_SAMPLER_FILTER_MODE: cl_sampler_properties = 0x1154;

pub const CL_SEMAPHORE_TYPE_KHR: cl_semaphore_properties_khr = 0x203D;
pub const CL_SEMAPHORE_TYPE_BINARY_KHR: cl_semaphore_properties_khr = 1;
pub const CL_SEMAPHORE_HANDLE_OPAQUE_FD_KHR: cl_semaphore_properties_khr = 0x2055;
pub const CL_SEMAPHORE_HANDLE_OPAQUE_WIN32_KHR: cl_semaphore_properties_khr = 0x2056;
pub const CL_SEMAPHORE_DEVICE_HANDLE_LIST_KHR: cl_semaphore_properties_khr = 0x2051;
pub const CL_SEMAPHORE_DEVICE_HANDLE_LIST_END_KHR: cl_semaphore_properties_khr = 0;

/// Names of the status codes; OpenCL has no error-string query.
pub static CL_ERROR_NAMES: &[(cl_int, &str)] = &[
    (CL_SUCCESS, "CL_SUCCESS"),
    (CL_DEVICE_NOT_FOUND, "CL_DEVICE_NOT_FOUND"),
    (CL_DEVICE_NOT_AVAILABLE, "CL_DEVICE_NOT_AVAILABLE"),
    (CL_MEM_OBJECT_ALLOCATION_FAILURE, "CL_MEM_OBJECT_ALLOCATION_FAILURE"),
    (CL_OUT_OF_RESOURCES, "CL_OUT_OF_RESOURCES"),
    (CL_OUT_OF_HOST_MEMORY, "CL_OUT_OF_HOST_MEMORY"),
    (CL_IMAGE_FORMAT_NOT_SUPPORTED, "CL_IMAGE_FORMAT_NOT_SUPPORTED"),
    (CL_INVALID_VALUE, "CL_INVALID_VALUE"),
    (CL_INVALID_PLATFORM, "CL_INVALID_PLATFORM"),
    (CL_INVALID_DEVICE, "CL_INVALID_DEVICE"),
    (CL_INVALID_CONTEXT, "CL_INVALID_CONTEXT"),
    (CL_INVALID_COMMAND_QUEUE, "CL_INVALID_COMMAND_QUEUE"),
    (CL_INVALID_MEM_OBJECT, "CL_INVALID_MEM_OBJECT"),
    (CL_INVALID_IMAGE_FORMAT_DESCRIPTOR, "CL_INVALID_IMAGE_FORMAT_DESCRIPTOR"),
    (CL_INVALID_IMAGE_SIZE, "CL_INVALID_IMAGE_SIZE"),
    (CL_INVALID_SAMPLER, "CL_INVALID_SAMPLER"),
    (CL_INVALID_EVENT_WAIT_LIST, "CL_INVALID_EVENT_WAIT_LIST"),
    (CL_INVALID_EVENT, "CL_INVALID_EVENT"),
    (CL_INVALID_OPERATION, "CL_INVALID_OPERATION"),
    (CL_INVALID_BUFFER_SIZE, "CL_INVALID_BUFFER_SIZE"),
    (CL_INVALID_PROPERTY, "CL_INVALID_PROPERTY"),
    (CL_INVALID_IMAGE_DESCRIPTOR, "CL_INVALID_IMAGE_DESCRIPTOR"),
    (CL_PLATFORM_NOT_FOUND_KHR, "CL_PLATFORM_NOT_FOUND_KHR"),
    (CL_INVALID_SEMAPHORE_KHR, "CL_INVALID_SEMAPHORE_KHR"),
];

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct cl_image_format {
    pub image_channel_order: cl_uint,
    pub image_channel_data_type: cl_uint,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct cl_image_desc {
    pub image_type: cl_uint,
    pub image_width: usize,
    pub image_height: usize,
    pub image_depth: usize,
    pub image_array_size: usize,
    pub image_row_pitch: usize,
    pub image_slice_pitch: usize,
    pub num_mip_levels: cl_uint,
    pub num_samples: cl_uint,
    pub mem_object: cl_mem,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct cl_buffer_region {
    pub origin: usize,
    pub size: usize,
}

function_table! {
    /// Entry points resolved from the OpenCL ICD loader.
    pub struct OpenClFunctionTable for "OpenCL ICD loader" {
        required {
            cl_get_platform_ids: "clGetPlatformIDs" => unsafe extern "C" fn(cl_uint, *mut cl_platform_id, *mut cl_uint) -> cl_int,
            cl_get_platform_info: "clGetPlatformInfo" => unsafe extern "C" fn(cl_platform_id, cl_uint, usize, *mut c_void, *mut usize) -> cl_int,
            cl_get_device_ids: "clGetDeviceIDs" => unsafe extern "C" fn(cl_platform_id, cl_bitfield, cl_uint, *mut cl_device_id, *mut cl_uint) -> cl_int,
            cl_get_device_info: "clGetDeviceInfo" => unsafe extern "C" fn(cl_device_id, cl_uint, usize, *mut c_void, *mut usize) -> cl_int,
            cl_get_extension_function_address_for_platform: "clGetExtensionFunctionAddressForPlatform" => unsafe extern "C" fn(cl_platform_id, *const c_char) -> *mut c_void,
            cl_create_buffer_with_properties: "clCreateBufferWithProperties" => unsafe extern "C" fn(cl_context, *const cl_mem_properties, cl_mem_flags, usize, *mut c_void, *mut cl_int) -> cl_mem,
            cl_create_image_with_properties: "clCreateImageWithProperties" => unsafe extern "C" fn(cl_context, *const cl_mem_properties, cl_mem_flags, *const cl_image_format, *const cl_image_desc, *mut c_void, *mut cl_int) -> cl_mem,
            cl_create_sub_buffer: "clCreateSubBuffer" => unsafe extern "C" fn(cl_mem, cl_mem_flags, cl_uint, *const c_void, *mut cl_int) -> cl_mem,
            cl_release_mem_object: "clReleaseMemObject" => unsafe extern "C" fn(cl_mem) -> cl_int,
            cl_create_sampler_with_properties: "clCreateSamplerWithProperties" => unsafe extern "C" fn(cl_context, *const cl_sampler_properties, *mut cl_int) -> cl_sampler,
            cl_release_sampler: "clReleaseSampler" => unsafe extern "C" fn(cl_sampler) -> cl_int,
            cl_enqueue_read_buffer: "clEnqueueReadBuffer" => unsafe extern "C" fn(cl_command_queue, cl_mem, cl_bool, usize, usize, *mut c_void, cl_uint, *const cl_event, *mut cl_event) -> cl_int,
            cl_enqueue_write_buffer: "clEnqueueWriteBuffer" => unsafe extern "C" fn(cl_command_queue, cl_mem, cl_bool, usize, usize, *const c_void, cl_uint, *const cl_event, *mut cl_event) -> cl_int,
            cl_enqueue_copy_buffer: "clEnqueueCopyBuffer" => unsafe extern "C" fn(cl_command_queue, cl_mem, cl_mem, usize, usize, usize, cl_uint, *const cl_event, *mut cl_event) -> cl_int,
            cl_enqueue_read_image: "clEnqueueReadImage" => unsafe extern "C" fn(cl_command_queue, cl_mem, cl_bool, *const usize, *const usize, usize, usize, *mut c_void, cl_uint, *const cl_event, *mut cl_event) -> cl_int,
            cl_enqueue_write_image: "clEnqueueWriteImage" => unsafe extern "C" fn(cl_command_queue, cl_mem, cl_bool, *const usize, *const usize, usize, usize, *const c_void, cl_uint, *const cl_event, *mut cl_event) -> cl_int,
            cl_enqueue_copy_buffer_to_image: "clEnqueueCopyBufferToImage" => unsafe extern "C" fn(cl_command_queue, cl_mem, cl_mem, usize, *const usize, *const usize, cl_uint, *const cl_event, *mut cl_event) -> cl_int,
            cl_enqueue_copy_image_to_buffer: "clEnqueueCopyImageToBuffer" => unsafe extern "C" fn(cl_command_queue, cl_mem, cl_mem, *const usize, *const usize, usize, cl_uint, *const cl_event, *mut cl_event) -> cl_int,
            cl_finish: "clFinish" => unsafe extern "C" fn(cl_command_queue) -> cl_int,
            cl_wait_for_events: "clWaitForEvents" => unsafe extern "C" fn(cl_uint, *const cl_event) -> cl_int,
            cl_release_event: "clReleaseEvent" => unsafe extern "C" fn(cl_event) -> cl_int,
        }
        optional {
        }
    }
}

function_table! {
    /// `cl_khr_semaphore` entry points, resolved per platform.
    pub struct OpenClSemaphoreFunctionTable for "cl_khr_semaphore" {
        required {
            cl_create_semaphore_with_properties_khr: "clCreateSemaphoreWithPropertiesKHR" => unsafe extern "C" fn(cl_context, *const cl_semaphore_properties_khr, *mut cl_int) -> cl_semaphore_khr,
            cl_enqueue_wait_semaphores_khr: "clEnqueueWaitSemaphoresKHR" => unsafe extern "C" fn(cl_command_queue, cl_uint, *const cl_semaphore_khr, *const cl_semaphore_payload_khr, cl_uint, *const cl_event, *mut cl_event) -> cl_int,
            cl_enqueue_signal_semaphores_khr: "clEnqueueSignalSemaphoresKHR" => unsafe extern "C" fn(cl_command_queue, cl_uint, *const cl_semaphore_khr, *const cl_semaphore_payload_khr, cl_uint, *const cl_event, *mut cl_event) -> cl_int,
            cl_release_semaphore_khr: "clReleaseSemaphoreKHR" => unsafe extern "C" fn(cl_semaphore_khr) -> cl_int,
        }
        optional {
        }
    }
}
