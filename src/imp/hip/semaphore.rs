// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Vulkan semaphores imported into HIP.

use std::sync::Arc;

use ash::vk;

use super::HipDriver;
use super::ffi::*;
use crate::error::{Error, Result};
use crate::handle::{ExportedHandle, RawExternalHandle};
use crate::interop::ComputeApi;

#[derive(Debug)]
pub struct HipSemaphore {
    driver: Arc<HipDriver>,
    semaphore: hipExternalSemaphore_t,
    timeline: bool,
}

fn handle_type(handle: RawExternalHandle, timeline: bool) -> u32 {
    match (handle, timeline) {
        (RawExternalHandle::Fd(_), false) => hipExternalSemaphoreHandleTypeOpaqueFd,
        (RawExternalHandle::Fd(_), true) => hipExternalSemaphoreHandleTypeTimelineSemaphoreFd,
        (RawExternalHandle::Win32(_), false) => hipExternalSemaphoreHandleTypeOpaqueWin32,
        (RawExternalHandle::Win32(_), true) => hipExternalSemaphoreHandleTypeTimelineSemaphoreWin32,
    }
}

impl HipSemaphore {
    pub(crate) fn precheck(driver: &HipDriver, semaphore_type: vk::SemaphoreType) -> Result<()> {
        if semaphore_type == vk::SemaphoreType::TIMELINE && !driver.supports_timeline_semaphores() {
            logwise::warn_sync!(
                "HIP runtime {version} predates timeline semaphore import",
                version = driver.runtime_version()
            );
            return Err(Error::TimelineSemaphoresUnsupported {
                backend: ComputeApi::Hip,
                reason: format!("runtime version {} is older than 6.0", driver.runtime_version()),
            });
        }
        Ok(())
    }

    pub(crate) fn import(
        driver: &Arc<HipDriver>,
        semaphore_type: vk::SemaphoreType,
        handle: &mut ExportedHandle,
    ) -> Result<Self> {
        Self::precheck(driver, semaphore_type)?;
        let timeline = semaphore_type == vk::SemaphoreType::TIMELINE;
        let raw = handle.raw();
        let mut desc = hipExternalSemaphoreHandleDesc::zeroed();
        desc.type_ = handle_type(raw, timeline);
        match raw {
            RawExternalHandle::Fd(fd) => desc.handle.fd = fd,
            RawExternalHandle::Win32(handle) => {
                desc.handle.win32 = HipWin32Handle {
                    handle,
                    name: std::ptr::null(),
                }
            }
        }
        let mut semaphore: hipExternalSemaphore_t = std::ptr::null_mut();
        driver.check("hipImportExternalSemaphore", unsafe {
            (driver.table.hip_import_external_semaphore)(&mut semaphore, &desc)
        })?;
        handle.release_after_import();
        logwise::trace_sync!("HIP imported external semaphore, timeline: {timeline}", timeline = timeline);
        Ok(HipSemaphore {
            driver: driver.clone(),
            semaphore,
            timeline,
        })
    }

    pub fn raw(&self) -> hipExternalSemaphore_t {
        self.semaphore
    }

    pub(crate) fn signal(&self, stream: hipStream_t, timeline_value: u64, event: Option<hipEvent_t>) -> Result<()> {
        let mut params = hipExternalSemaphoreSignalParams::default();
        if self.timeline {
            params.params.fence_value = timeline_value;
        }
        self.driver.check("hipSignalExternalSemaphoresAsync", unsafe {
            (self.driver.table.hip_signal_external_semaphores_async)(&self.semaphore, &params, 1, stream)
        })?;
        self.driver.record_event(event, stream)
    }

    pub(crate) fn wait(&self, stream: hipStream_t, timeline_value: u64, event: Option<hipEvent_t>) -> Result<()> {
        let mut params = hipExternalSemaphoreWaitParams::default();
        if self.timeline {
            params.params.fence_value = timeline_value;
        }
        self.driver.check("hipWaitExternalSemaphoresAsync", unsafe {
            (self.driver.table.hip_wait_external_semaphores_async)(&self.semaphore, &params, 1, stream)
        })?;
        self.driver.record_event(event, stream)
    }
}

impl Drop for HipSemaphore {
    fn drop(&mut self) {
        //logged by check
        let _ = self.driver.check("hipDestroyExternalSemaphore", unsafe {
            (self.driver.table.hip_destroy_external_semaphore)(self.semaphore)
        });
    }
}
