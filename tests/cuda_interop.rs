// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Buffer and semaphore interop against the mock CUDA driver.
#![cfg(target_os = "linux")]

mod common;

use std::collections::HashMap;
use std::ffi::c_void;

use ash::vk;
use common::cuda::{self, MAPPED_BASE};
use common::vulkan::{FakeBuffer, FakeDevice, FakeSemaphore};
use common::{calls_named, take_calls};
use sgl_compute_interop::cuda::CudaDriver;
use sgl_compute_interop::cuda::ffi::{CUDA_EXTERNAL_MEMORY_DEDICATED, CudaFunctionTable};
use sgl_compute_interop::{CompletionEvent, ComputeApi, Error, ErrorKind, InteropSession, StreamWrapper};

const STREAM: usize = 0x57;
const EVENT: usize = 0xEE;

fn nvidia_device() -> std::sync::Arc<FakeDevice> {
    FakeDevice::new(vk::DriverId::NVIDIA_PROPRIETARY, cuda::device_uuid(1))
}

fn stream() -> StreamWrapper {
    StreamWrapper::Cuda(STREAM as *mut c_void)
}

#[test]
fn host_upload_into_shared_buffer() {
    common::reset();
    let session = InteropSession::new().with_cuda(cuda::driver());
    let device = nvidia_device();
    let buffer = FakeBuffer::dedicated(device.clone(), 4096);

    let shared = session.create_buffer_vk_compute_api_external_memory(buffer).unwrap();
    assert_eq!(shared.compute_api(), ComputeApi::Cuda);
    assert_eq!(shared.device_ptr() as u64, MAPPED_BASE);
    assert_eq!(shared.vulkan_buffer().size_in_bytes(), 4096);
    assert_eq!(shared.exported_handle().raw_fd(), -1);
    assert!(!shared.exported_handle().is_owned());

    let calls = take_calls();
    let retain = calls_named(&calls, "cuDevicePrimaryCtxRetain");
    assert_eq!(retain.len(), 1);
    assert_eq!(retain[0].args[0], 1, "the device with the Vulkan UUID is used");
    let import = calls_named(&calls, "cuImportExternalMemory");
    assert_eq!(import.len(), 1);
    assert_eq!(import[0].args[0], device.last_export().unwrap().fd as u64);
    assert_eq!(import[0].args[1], 4096);
    assert_eq!(import[0].args[2], CUDA_EXTERNAL_MEMORY_DEDICATED as u64);

    let data = vec![0xAB_u8; 4096];
    unsafe {
        shared
            .copy_from_host_ptr_async(data.as_ptr() as *const c_void, &stream(), None)
            .unwrap();
    }
    session.wait_for_completion(&stream(), None).unwrap();

    let calls = take_calls();
    let copies = calls_named(&calls, "cuMemcpyHtoDAsync");
    assert_eq!(copies.len(), 1);
    assert_eq!(copies[0].args, vec![MAPPED_BASE, data.as_ptr() as u64, 4096, STREAM as u64]);
    assert_eq!(calls_named(&calls, "cuStreamSynchronize").len(), 1);
    assert!(calls_named(&calls, "cuEventRecord").is_empty());
    assert!(calls_named(&calls, "unexpected").is_empty());
}

#[test]
fn sub_allocated_buffer_maps_its_own_range() {
    common::reset();
    let session = InteropSession::new().with_cuda(cuda::driver());
    let device = nvidia_device();
    let buffer = std::sync::Arc::new(FakeBuffer {
        device: device.clone(),
        size: 1024,
        offset: 256,
        memory_size: 8192,
    });

    let shared = session.create_buffer_vk_compute_api_external_memory(buffer).unwrap();
    assert_eq!(shared.device_ptr() as u64, MAPPED_BASE + 256);

    let calls = take_calls();
    let import = calls_named(&calls, "cuImportExternalMemory");
    assert_eq!(import[0].args[1], 8192, "the whole allocation is imported");
    assert_eq!(import[0].args[2], 0, "not a dedicated allocation");
    let mapped = calls_named(&calls, "cuExternalMemoryGetMappedBuffer");
    assert_eq!(mapped[0].args[1..], [256, 1024]);
}

#[test]
fn copies_on_one_stream_keep_their_order() {
    common::reset();
    let session = InteropSession::new().with_cuda(cuda::driver());
    let device = nvidia_device();
    let shared = session
        .create_buffer_vk_compute_api_external_memory(FakeBuffer::dedicated(device, 64))
        .unwrap();
    take_calls();

    let upload = [1u8; 64];
    let mut download = [0u8; 64];
    let mut done = CompletionEvent::Cuda(EVENT as *mut c_void);
    unsafe {
        shared
            .copy_from_host_ptr_async(upload.as_ptr() as *const c_void, &stream(), None)
            .unwrap();
        shared
            .copy_to_host_ptr_async(download.as_mut_ptr() as *mut c_void, &stream(), Some(&mut done))
            .unwrap();
    }
    session.wait_for_completion(&stream(), Some(&done)).unwrap();

    let names: Vec<&str> = take_calls().iter().map(|c| c.name).collect();
    assert_eq!(
        names,
        vec!["cuMemcpyHtoDAsync", "cuMemcpyDtoHAsync", "cuEventRecord", "cuEventSynchronize"]
    );
}

#[test]
fn stream_of_another_backend_is_rejected_before_enqueue() {
    common::reset();
    let session = InteropSession::new().with_cuda(cuda::driver());
    let shared = session
        .create_buffer_vk_compute_api_external_memory(FakeBuffer::dedicated(nvidia_device(), 64))
        .unwrap();
    take_calls();

    let data = [0u8; 64];
    let hip_stream = StreamWrapper::Hip(STREAM as *mut c_void);
    let err = unsafe { shared.copy_from_host_ptr_async(data.as_ptr() as *const c_void, &hip_stream, None) }.unwrap_err();
    assert!(matches!(err, Error::StreamMismatch { expected: ComputeApi::Cuda }));
    assert!(take_calls().is_empty());
}

#[test]
fn teardown_frees_mapping_then_memory_then_context() {
    common::reset();
    let session = InteropSession::new().with_cuda(cuda::driver());
    let shared = session
        .create_buffer_vk_compute_api_external_memory(FakeBuffer::dedicated(nvidia_device(), 64))
        .unwrap();
    take_calls();

    drop(shared);
    let names: Vec<&str> = take_calls().iter().map(|c| c.name).collect();
    assert_eq!(
        names,
        vec!["cuMemFree", "cuDestroyExternalMemory", "cuDevicePrimaryCtxRelease"]
    );
}

#[test]
fn failed_import_closes_the_exported_fd() {
    common::reset();
    let session = InteropSession::new().with_cuda(cuda::driver());
    let device = nvidia_device();
    common::fail("cuImportExternalMemory");

    let err = session
        .create_buffer_vk_compute_api_external_memory(FakeBuffer::dedicated(device.clone(), 4096))
        .unwrap_err();
    assert_eq!(err.native_code(), Some(1));
    assert_eq!(err.kind(), ErrorKind::Fatal);
    assert!(err.to_string().contains("mock cuda error"));

    let export = device.last_export().unwrap();
    assert!(!export.is_open(), "the fd is ours after a failed import and must be closed");
    assert!(take_calls().iter().all(|c| c.name != "cuExternalMemoryGetMappedBuffer"));
}

#[test]
fn unknown_uuid_is_not_found_before_export() {
    common::reset();
    let session = InteropSession::new().with_cuda(cuda::driver());
    let device = FakeDevice::new(vk::DriverId::NVIDIA_PROPRIETARY, [0x77; 16]);

    let err = session
        .create_buffer_vk_compute_api_external_memory(FakeBuffer::dedicated(device.clone(), 64))
        .unwrap_err();
    assert!(matches!(err, Error::DeviceNotFound { backend: ComputeApi::Cuda }));
    assert_eq!(err.kind(), ErrorKind::Recoverable);
    assert_eq!(device.export_count(), 0);
}

#[test]
fn partially_exported_driver_is_refused() {
    common::reset();
    let all = cuda::symbols();
    let keep = CudaFunctionTable::REQUIRED_SYMBOLS.len() * 9 / 10;
    let partial: HashMap<&'static str, *const c_void> = CudaFunctionTable::REQUIRED_SYMBOLS[..keep]
        .iter()
        .map(|name| (*name, all[name]))
        .collect();

    let err = unsafe { CudaDriver::from_resolver(&partial) }.unwrap_err();
    match err {
        Error::MissingSymbols { missing, .. } => {
            assert_eq!(missing, CudaFunctionTable::REQUIRED_SYMBOLS[keep..].to_vec());
        }
        other => panic!("expected MissingSymbols, got {other:?}"),
    }
    assert!(take_calls().is_empty(), "nothing is called through a partial table");
}

#[test]
fn timeline_semaphore_carries_its_value() {
    common::reset();
    let session = InteropSession::new().with_cuda(cuda::driver());
    let device = nvidia_device();
    let semaphore = FakeSemaphore::new(device.clone(), vk::SemaphoreType::TIMELINE);

    let shared = session.create_semaphore_vk_compute_api_interop(semaphore).unwrap();
    assert_eq!(shared.semaphore_type(), vk::SemaphoreType::TIMELINE);
    assert_eq!(shared.exported_handle().raw_fd(), -1);
    take_calls();

    shared.wait_semaphore_compute_api(&stream(), 6, None).unwrap();
    shared.signal_semaphore_compute_api(&stream(), 7, None).unwrap();
    let calls = take_calls();
    assert_eq!(calls_named(&calls, "cuWaitExternalSemaphoresAsync")[0].args[1], 6);
    assert_eq!(calls_named(&calls, "cuSignalExternalSemaphoresAsync")[0].args[1], 7);
}

#[test]
fn binary_semaphore_ignores_the_value() {
    common::reset();
    let session = InteropSession::new().with_cuda(cuda::driver());
    let semaphore = FakeSemaphore::new(nvidia_device(), vk::SemaphoreType::BINARY);
    let shared = session.create_semaphore_vk_compute_api_interop(semaphore).unwrap();
    take_calls();

    shared.signal_semaphore_compute_api(&stream(), 42, None).unwrap();
    assert_eq!(calls_named(&take_calls(), "cuSignalExternalSemaphoresAsync")[0].args[1], 0);
}

#[test]
fn old_driver_refuses_timeline_semaphores_without_exporting() {
    common::reset();
    cuda::set_driver_version(11000);
    let session = InteropSession::new().with_cuda(cuda::driver());
    let device = nvidia_device();
    let semaphore = FakeSemaphore::new(device.clone(), vk::SemaphoreType::TIMELINE);

    let err = session.create_semaphore_vk_compute_api_interop(semaphore).unwrap_err();
    assert!(matches!(err, Error::TimelineSemaphoresUnsupported { backend: ComputeApi::Cuda, .. }));
    assert!(err.is_unsupported());
    assert_eq!(device.export_count(), 0);
}
