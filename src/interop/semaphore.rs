// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Vulkan semaphores shared with a compute backend.
//!
//! Signal and wait are enqueued on a stream and never block.  For binary semaphores the
//! timeline value is ignored.

use std::sync::Arc;

use ash::vk;

use super::{Attached, Backend, ComputeApi};
use crate::error::Result;
use crate::handle::ExportedHandle;
use crate::imp::cuda::CudaPrimaryContext;
use crate::imp::cuda::semaphore::CudaSemaphore;
use crate::imp::hip::semaphore::HipSemaphore;
use crate::imp::level_zero::semaphore::LevelZeroSemaphore;
use crate::imp::opencl::semaphore::OpenClSemaphore;
use crate::imp::sycl::SyclSemaphore;
use crate::stream::{self, CompletionEvent, StreamWrapper};
use crate::vulkan::VulkanSemaphore;

#[derive(Debug)]
enum ImportedSemaphore {
    Cuda { semaphore: CudaSemaphore, _context: CudaPrimaryContext },
    Hip(HipSemaphore),
    LevelZero(LevelZeroSemaphore),
    OpenCl(OpenClSemaphore),
    Sycl(SyclSemaphore),
}

#[derive(Clone, Copy)]
enum Operation {
    Signal,
    Wait,
}

/// A Vulkan semaphore imported into a compute backend.
#[derive(Debug)]
pub struct SemaphoreVkComputeApiInterop {
    imported: ImportedSemaphore,
    handle: ExportedHandle,
    semaphore: Arc<dyn VulkanSemaphore>,
}

impl SemaphoreVkComputeApiInterop {
    pub(crate) fn create(backend: Backend<'_>, semaphore: Arc<dyn VulkanSemaphore>) -> Result<Self> {
        let semaphore_type = semaphore.semaphore_type();
        match backend {
            Backend::Cuda(driver) => CudaSemaphore::precheck(driver, semaphore_type)?,
            Backend::Hip(driver) => HipSemaphore::precheck(driver, semaphore_type)?,
            Backend::LevelZero(context) => LevelZeroSemaphore::precheck(context)?,
            Backend::OpenCl(context) => OpenClSemaphore::precheck(context, semaphore_type)?,
            Backend::Sycl(_) => {}
        }
        let device = semaphore.device();
        let attached = backend.attach(device.identity())?;
        let mut handle = device.export_semaphore_handle(semaphore.vk_semaphore())?;
        let imported = match attached {
            Attached::Cuda(driver, context) => ImportedSemaphore::Cuda {
                semaphore: CudaSemaphore::import(driver, semaphore_type, &mut handle)?,
                _context: context,
            },
            Attached::Hip(driver) => ImportedSemaphore::Hip(HipSemaphore::import(driver, semaphore_type, &mut handle)?),
            Attached::LevelZero(context) => {
                ImportedSemaphore::LevelZero(LevelZeroSemaphore::import(context, semaphore_type, &mut handle)?)
            }
            Attached::OpenCl(context) => {
                ImportedSemaphore::OpenCl(OpenClSemaphore::import(context, semaphore_type, &mut handle)?)
            }
            Attached::Sycl(queue) => ImportedSemaphore::Sycl(SyclSemaphore::import(queue, semaphore_type, &mut handle)?),
        };
        logwise::info_sync!(
            "semaphore ({kind}) shared with {api}",
            kind = logwise::privacy::LogIt(&semaphore_type),
            api = logwise::privacy::LogIt(&imported.compute_api())
        );
        Ok(SemaphoreVkComputeApiInterop {
            imported,
            handle,
            semaphore,
        })
    }

    pub fn compute_api(&self) -> ComputeApi {
        self.imported.compute_api()
    }

    pub fn semaphore_type(&self) -> vk::SemaphoreType {
        self.semaphore.semaphore_type()
    }

    pub fn vulkan_semaphore(&self) -> &Arc<dyn VulkanSemaphore> {
        &self.semaphore
    }

    pub fn exported_handle(&self) -> &ExportedHandle {
        &self.handle
    }

    fn enqueue(
        &self,
        operation: Operation,
        stream: &StreamWrapper,
        timeline_value: u64,
        event: Option<&mut CompletionEvent>,
    ) -> Result<()> {
        match &self.imported {
            ImportedSemaphore::Cuda { semaphore, .. } => {
                let (s, e) = (stream.cuda()?, stream::cuda_event(event.as_deref())?);
                match operation {
                    Operation::Signal => semaphore.signal(s, timeline_value, e),
                    Operation::Wait => semaphore.wait(s, timeline_value, e),
                }
            }
            ImportedSemaphore::Hip(semaphore) => {
                let (s, e) = (stream.hip()?, stream::hip_event(event.as_deref())?);
                match operation {
                    Operation::Signal => semaphore.signal(s, timeline_value, e),
                    Operation::Wait => semaphore.wait(s, timeline_value, e),
                }
            }
            ImportedSemaphore::LevelZero(semaphore) => {
                let (s, e) = (stream.level_zero()?, stream::level_zero_event(event.as_deref())?);
                match operation {
                    Operation::Signal => semaphore.signal(s, timeline_value, e),
                    Operation::Wait => semaphore.wait(s, timeline_value, e),
                }
            }
            //binary only; the value has no meaning
            ImportedSemaphore::OpenCl(semaphore) => {
                let (s, e) = (stream.opencl()?, stream::opencl_event_slot(event)?);
                match operation {
                    Operation::Signal => semaphore.signal(s, e),
                    Operation::Wait => semaphore.wait(s, e),
                }
            }
            ImportedSemaphore::Sycl(semaphore) => {
                let (s, e) = (stream.sycl()?, stream::sycl_event_slot(event)?);
                match operation {
                    Operation::Signal => semaphore.signal(s.as_ref(), timeline_value, e),
                    Operation::Wait => semaphore.wait(s.as_ref(), timeline_value, e),
                }
            }
        }
    }

    /// Enqueues a signal of the semaphore (to `timeline_value` for timeline semaphores).
    pub fn signal_semaphore_compute_api(
        &self,
        stream: &StreamWrapper,
        timeline_value: u64,
        event: Option<&mut CompletionEvent>,
    ) -> Result<()> {
        self.enqueue(Operation::Signal, stream, timeline_value, event)
    }

    /// Enqueues a wait until the semaphore is signaled (reaches `timeline_value` for timeline
    /// semaphores).  Work enqueued on `stream` afterwards runs after the wait.
    pub fn wait_semaphore_compute_api(
        &self,
        stream: &StreamWrapper,
        timeline_value: u64,
        event: Option<&mut CompletionEvent>,
    ) -> Result<()> {
        self.enqueue(Operation::Wait, stream, timeline_value, event)
    }
}

impl ImportedSemaphore {
    fn compute_api(&self) -> ComputeApi {
        match self {
            ImportedSemaphore::Cuda { .. } => ComputeApi::Cuda,
            ImportedSemaphore::Hip(_) => ComputeApi::Hip,
            ImportedSemaphore::LevelZero(_) => ComputeApi::LevelZero,
            ImportedSemaphore::OpenCl(_) => ComputeApi::OpenCl,
            ImportedSemaphore::Sycl(_) => ComputeApi::Sycl,
        }
    }
}
