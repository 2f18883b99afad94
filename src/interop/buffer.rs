// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Vulkan buffers shared with a compute backend.

use std::ffi::c_void;
use std::sync::Arc;

use super::{Attached, Backend, ComputeApi, Transfer};
use crate::error::Result;
use crate::handle::ExportedHandle;
use crate::imp::cuda::CudaPrimaryContext;
use crate::imp::cuda::memory::CudaBuffer;
use crate::imp::hip::memory::HipBuffer;
use crate::imp::level_zero::memory::LevelZeroBuffer;
use crate::imp::opencl::memory::OpenClBuffer;
use crate::imp::sycl::SyclBuffer;
use crate::stream::{self, CompletionEvent, StreamWrapper};
use crate::vulkan::VulkanBuffer;

#[derive(Debug)]
enum ImportedBuffer {
    Cuda { buffer: CudaBuffer, _context: CudaPrimaryContext },
    Hip(HipBuffer),
    LevelZero(LevelZeroBuffer),
    OpenCl(OpenClBuffer),
    Sycl(SyclBuffer),
}

/// A Vulkan buffer mapped into a compute backend's address space.
///
/// Fields drop in order: the backend mapping, then the exported handle, then the Vulkan buffer.
#[derive(Debug)]
pub struct BufferVkComputeApiExternalMemory {
    imported: ImportedBuffer,
    handle: ExportedHandle,
    buffer: Arc<dyn VulkanBuffer>,
}

impl BufferVkComputeApiExternalMemory {
    pub(crate) fn create(backend: Backend<'_>, buffer: Arc<dyn VulkanBuffer>) -> Result<Self> {
        let device = buffer.device();
        let attached = backend.attach(device.identity())?;
        let mut handle = device.export_memory_handle(buffer.device_memory())?;
        let imported = match attached {
            Attached::Cuda(driver, context) => ImportedBuffer::Cuda {
                buffer: CudaBuffer::import(driver, buffer.as_ref(), &mut handle)?,
                _context: context,
            },
            Attached::Hip(driver) => ImportedBuffer::Hip(HipBuffer::import(driver, buffer.as_ref(), &mut handle)?),
            Attached::LevelZero(context) => {
                ImportedBuffer::LevelZero(LevelZeroBuffer::import(context, buffer.as_ref(), &mut handle)?)
            }
            Attached::OpenCl(context) => ImportedBuffer::OpenCl(OpenClBuffer::import(context, buffer.as_ref(), &mut handle)?),
            Attached::Sycl(queue) => ImportedBuffer::Sycl(SyclBuffer::import(queue, buffer.as_ref(), &mut handle)?),
        };
        logwise::info_sync!(
            "buffer of {size} bytes shared with {api}",
            size = buffer.size_in_bytes(),
            api = logwise::privacy::LogIt(&imported.compute_api())
        );
        Ok(BufferVkComputeApiExternalMemory { imported, handle, buffer })
    }

    pub fn compute_api(&self) -> ComputeApi {
        self.imported.compute_api()
    }

    pub fn vulkan_buffer(&self) -> &Arc<dyn VulkanBuffer> {
        &self.buffer
    }

    pub fn size_in_bytes(&self) -> u64 {
        self.buffer.size_in_bytes()
    }

    /// The handle exported from Vulkan.  After a successful POSIX import it reads as `-1`.
    pub fn exported_handle(&self) -> &ExportedHandle {
        &self.handle
    }

    /// The buffer in the backend: a device pointer, or the `cl_mem` for OpenCL.
    pub fn device_ptr(&self) -> *mut c_void {
        match &self.imported {
            ImportedBuffer::Cuda { buffer, .. } => buffer.device_ptr() as *mut c_void,
            ImportedBuffer::Hip(buffer) => buffer.device_ptr(),
            ImportedBuffer::LevelZero(buffer) => buffer.device_ptr(),
            ImportedBuffer::OpenCl(buffer) => buffer.mem() as *mut c_void,
            ImportedBuffer::Sycl(buffer) => buffer.device_ptr(),
        }
    }

    unsafe fn copy(&self, transfer: Transfer, stream: &StreamWrapper, event: Option<&mut CompletionEvent>) -> Result<()> {
        match &self.imported {
            ImportedBuffer::Cuda { buffer, .. } => {
                let (s, e) = (stream.cuda()?, stream::cuda_event(event.as_deref())?);
                unsafe { buffer.copy(transfer, s, e) }
            }
            ImportedBuffer::Hip(buffer) => {
                let (s, e) = (stream.hip()?, stream::hip_event(event.as_deref())?);
                unsafe { buffer.copy(transfer, s, e) }
            }
            ImportedBuffer::LevelZero(buffer) => {
                let (s, e) = (stream.level_zero()?, stream::level_zero_event(event.as_deref())?);
                unsafe { buffer.copy(transfer, s, e) }
            }
            ImportedBuffer::OpenCl(buffer) => {
                let (s, e) = (stream.opencl()?, stream::opencl_event_slot(event)?);
                unsafe { buffer.copy(transfer, s, e) }
            }
            ImportedBuffer::Sycl(buffer) => {
                let (s, e) = (stream.sycl()?, stream::sycl_event_slot(event)?);
                unsafe { buffer.copy(transfer, s.as_ref(), e) }
            }
        }
    }

    /// Enqueues a copy of [`Self::size_in_bytes`] bytes from backend memory into the buffer.
    ///
    /// Nothing is enqueued if `stream` or `event` belongs to another backend.
    ///
    /// # Safety
    /// `src` must be backend memory (a `cl_mem` for OpenCL) at least as large as the buffer,
    /// valid until the copy completes.
    pub unsafe fn copy_from_device_ptr_async(
        &self,
        src: *const c_void,
        stream: &StreamWrapper,
        event: Option<&mut CompletionEvent>,
    ) -> Result<()> {
        unsafe { self.copy(Transfer::FromDevice(src), stream, event) }
    }

    /// # Safety
    /// `dst` must be backend memory at least as large as the buffer, valid until the copy
    /// completes.
    pub unsafe fn copy_to_device_ptr_async(
        &self,
        dst: *mut c_void,
        stream: &StreamWrapper,
        event: Option<&mut CompletionEvent>,
    ) -> Result<()> {
        unsafe { self.copy(Transfer::ToDevice(dst), stream, event) }
    }

    /// # Safety
    /// `src` must be readable for the buffer size until the copy completes.
    pub unsafe fn copy_from_host_ptr_async(
        &self,
        src: *const c_void,
        stream: &StreamWrapper,
        event: Option<&mut CompletionEvent>,
    ) -> Result<()> {
        unsafe { self.copy(Transfer::FromHost(src), stream, event) }
    }

    /// # Safety
    /// `dst` must be writable for the buffer size until the copy completes.
    pub unsafe fn copy_to_host_ptr_async(
        &self,
        dst: *mut c_void,
        stream: &StreamWrapper,
        event: Option<&mut CompletionEvent>,
    ) -> Result<()> {
        unsafe { self.copy(Transfer::ToHost(dst), stream, event) }
    }
}

impl ImportedBuffer {
    fn compute_api(&self) -> ComputeApi {
        match self {
            ImportedBuffer::Cuda { .. } => ComputeApi::Cuda,
            ImportedBuffer::Hip(_) => ComputeApi::Hip,
            ImportedBuffer::LevelZero(_) => ComputeApi::LevelZero,
            ImportedBuffer::OpenCl(_) => ComputeApi::OpenCl,
            ImportedBuffer::Sycl(_) => ComputeApi::Sycl,
        }
    }
}
