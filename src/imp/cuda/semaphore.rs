// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Vulkan semaphores imported into CUDA.

use std::sync::Arc;

use ash::vk;

use super::CudaDriver;
use super::ffi::*;
use crate::error::{Error, Result};
use crate::handle::{ExportedHandle, RawExternalHandle};
use crate::interop::ComputeApi;

#[derive(Debug)]
pub struct CudaSemaphore {
    driver: Arc<CudaDriver>,
    semaphore: CUexternalSemaphore,
    timeline: bool,
}

fn handle_type(handle: RawExternalHandle, timeline: bool) -> u32 {
    match (handle, timeline) {
        (RawExternalHandle::Fd(_), false) => CU_EXTERNAL_SEMAPHORE_HANDLE_TYPE_OPAQUE_FD,
        (RawExternalHandle::Fd(_), true) => CU_EXTERNAL_SEMAPHORE_HANDLE_TYPE_TIMELINE_SEMAPHORE_FD,
        (RawExternalHandle::Win32(_), false) => CU_EXTERNAL_SEMAPHORE_HANDLE_TYPE_OPAQUE_WIN32,
        (RawExternalHandle::Win32(_), true) => CU_EXTERNAL_SEMAPHORE_HANDLE_TYPE_TIMELINE_SEMAPHORE_WIN32,
    }
}

impl CudaSemaphore {
    /// Rejects semaphore types this driver cannot import.
    pub(crate) fn precheck(driver: &CudaDriver, semaphore_type: vk::SemaphoreType) -> Result<()> {
        if semaphore_type == vk::SemaphoreType::TIMELINE && !driver.supports_timeline_semaphores() {
            logwise::warn_sync!(
                "CUDA driver {version} predates timeline semaphore import",
                version = driver.driver_version()
            );
            return Err(Error::TimelineSemaphoresUnsupported {
                backend: ComputeApi::Cuda,
                reason: format!(
                    "driver version {} is older than 11.2",
                    driver.driver_version()
                ),
            });
        }
        Ok(())
    }

    pub(crate) fn import(
        driver: &Arc<CudaDriver>,
        semaphore_type: vk::SemaphoreType,
        handle: &mut ExportedHandle,
    ) -> Result<Self> {
        Self::precheck(driver, semaphore_type)?;
        let timeline = semaphore_type == vk::SemaphoreType::TIMELINE;
        let raw = handle.raw();
        let mut desc = CUDA_EXTERNAL_SEMAPHORE_HANDLE_DESC::zeroed();
        desc.type_ = handle_type(raw, timeline);
        match raw {
            RawExternalHandle::Fd(fd) => desc.handle.fd = fd,
            RawExternalHandle::Win32(handle) => {
                desc.handle.win32 = CudaWin32Handle {
                    handle,
                    name: std::ptr::null(),
                }
            }
        }
        let mut semaphore: CUexternalSemaphore = std::ptr::null_mut();
        driver.check("cuImportExternalSemaphore", unsafe {
            (driver.table.cu_import_external_semaphore)(&mut semaphore, &desc)
        })?;
        handle.release_after_import();
        logwise::trace_sync!("CUDA imported external semaphore, timeline: {timeline}", timeline = timeline);
        Ok(CudaSemaphore {
            driver: driver.clone(),
            semaphore,
            timeline,
        })
    }

    pub fn raw(&self) -> CUexternalSemaphore {
        self.semaphore
    }

    pub(crate) fn signal(&self, stream: CUstream, timeline_value: u64, event: Option<CUevent>) -> Result<()> {
        let mut params = CUDA_EXTERNAL_SEMAPHORE_SIGNAL_PARAMS::default();
        if self.timeline {
            params.params.fence_value = timeline_value;
        }
        self.driver.check("cuSignalExternalSemaphoresAsync", unsafe {
            (self.driver.table.cu_signal_external_semaphores_async)(&self.semaphore, &params, 1, stream)
        })?;
        self.driver.record_event(event, stream)
    }

    pub(crate) fn wait(&self, stream: CUstream, timeline_value: u64, event: Option<CUevent>) -> Result<()> {
        let mut params = CUDA_EXTERNAL_SEMAPHORE_WAIT_PARAMS::default();
        if self.timeline {
            params.params.fence_value = timeline_value;
        }
        self.driver.check("cuWaitExternalSemaphoresAsync", unsafe {
            (self.driver.table.cu_wait_external_semaphores_async)(&self.semaphore, &params, 1, stream)
        })?;
        self.driver.record_event(event, stream)
    }
}

impl Drop for CudaSemaphore {
    fn drop(&mut self) {
        //logged by check
        let _ = self.driver.check("cuDestroyExternalSemaphore", unsafe {
            (self.driver.table.cu_destroy_external_semaphore)(self.semaphore)
        });
    }
}
