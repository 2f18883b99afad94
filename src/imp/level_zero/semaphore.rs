// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Vulkan semaphores imported through the Level Zero external semaphore extension.
//!
//! Signal and wait are only appended to immediate command lists; on a deferred list they fail
//! with [`Error::UnsupportedCommandListType`] before any Level Zero call is made.

use std::ffi::c_void;
use std::sync::Arc;

use ash::vk;

use super::LevelZeroInteropContext;
use super::ffi::*;
use crate::error::{Error, Result};
use crate::handle::{ExportedHandle, RawExternalHandle};
use crate::interop::ComputeApi;

fn semaphore_flags(handle: RawExternalHandle, timeline: bool) -> u32 {
    match (handle, timeline) {
        (RawExternalHandle::Fd(_), false) => ZE_EXTERNAL_SEMAPHORE_EXT_FLAG_OPAQUE_FD,
        (RawExternalHandle::Fd(_), true) => ZE_EXTERNAL_SEMAPHORE_EXT_FLAG_VK_TIMELINE_SEMAPHORE_FD,
        (RawExternalHandle::Win32(_), false) => ZE_EXTERNAL_SEMAPHORE_EXT_FLAG_OPAQUE_WIN32,
        (RawExternalHandle::Win32(_), true) => ZE_EXTERNAL_SEMAPHORE_EXT_FLAG_VK_TIMELINE_SEMAPHORE_WIN32,
    }
}

fn extension_missing() -> Error {
    logwise::warn_sync!("Level Zero loader lacks the external semaphore extension");
    Error::UnsupportedOperation {
        backend: ComputeApi::LevelZero,
        operation: "external semaphores (ZE_extension_external_semaphores)",
    }
}

#[derive(Debug)]
pub struct LevelZeroSemaphore {
    context: Arc<LevelZeroInteropContext>,
    semaphore: ze_external_semaphore_ext_handle_t,
    timeline: bool,
}

impl LevelZeroSemaphore {
    pub(crate) fn precheck(context: &LevelZeroInteropContext) -> Result<()> {
        if context.driver().supports_external_semaphores() {
            Ok(())
        } else {
            Err(extension_missing())
        }
    }

    pub(crate) fn import(
        context: &Arc<LevelZeroInteropContext>,
        semaphore_type: vk::SemaphoreType,
        handle: &mut ExportedHandle,
    ) -> Result<Self> {
        Self::precheck(context)?;
        let driver = context.driver();
        let import = driver.table.ze_device_import_external_semaphore_ext.ok_or_else(extension_missing)?;
        let timeline = semaphore_type == vk::SemaphoreType::TIMELINE;
        let raw = handle.raw();
        let fd_desc;
        let win32_desc;
        let next: *const c_void = match raw {
            RawExternalHandle::Fd(fd) => {
                fd_desc = ze_external_semaphore_fd_ext_desc_t {
                    stype: ZE_STRUCTURE_TYPE_EXTERNAL_SEMAPHORE_FD_EXT_DESC,
                    pNext: std::ptr::null(),
                    fd,
                };
                &fd_desc as *const _ as *const c_void
            }
            RawExternalHandle::Win32(handle) => {
                win32_desc = ze_external_semaphore_win32_ext_desc_t {
                    stype: ZE_STRUCTURE_TYPE_EXTERNAL_SEMAPHORE_WIN32_EXT_DESC,
                    pNext: std::ptr::null(),
                    handle,
                    name: std::ptr::null(),
                };
                &win32_desc as *const _ as *const c_void
            }
        };
        let desc = ze_external_semaphore_ext_desc_t {
            stype: ZE_STRUCTURE_TYPE_EXTERNAL_SEMAPHORE_EXT_DESC,
            pNext: next,
            flags: semaphore_flags(raw, timeline),
        };
        let mut semaphore: ze_external_semaphore_ext_handle_t = std::ptr::null_mut();
        driver.check("zeDeviceImportExternalSemaphoreExt", unsafe {
            import(context.device(), &desc, &mut semaphore)
        })?;
        handle.release_after_import();
        logwise::trace_sync!("Level Zero imported external semaphore, timeline: {timeline}", timeline = timeline);
        Ok(LevelZeroSemaphore {
            context: context.clone(),
            semaphore,
            timeline,
        })
    }

    pub fn raw(&self) -> ze_external_semaphore_ext_handle_t {
        self.semaphore
    }

    pub(crate) fn signal(
        &self,
        list: ze_command_list_handle_t,
        timeline_value: u64,
        event: Option<ze_event_handle_t>,
    ) -> Result<()> {
        self.context.require_immediate_command_lists()?;
        let driver = self.context.driver();
        let append = driver
            .table
            .ze_command_list_append_signal_external_semaphore_ext
            .ok_or_else(extension_missing)?;
        let mut params = ze_external_semaphore_signal_params_ext_t {
            stype: ZE_STRUCTURE_TYPE_EXTERNAL_SEMAPHORE_SIGNAL_PARAMS_EXT,
            pNext: std::ptr::null(),
            value: if self.timeline { timeline_value } else { 0 },
        };
        let mut semaphore = self.semaphore;
        let (signal, wait_count, waits) = self.context.append_events(event);
        driver.check("zeCommandListAppendSignalExternalSemaphoreExt", unsafe {
            append(list, 1, &mut semaphore, &mut params, signal, wait_count, waits)
        })
    }

    pub(crate) fn wait(
        &self,
        list: ze_command_list_handle_t,
        timeline_value: u64,
        event: Option<ze_event_handle_t>,
    ) -> Result<()> {
        self.context.require_immediate_command_lists()?;
        let driver = self.context.driver();
        let append = driver
            .table
            .ze_command_list_append_wait_external_semaphore_ext
            .ok_or_else(extension_missing)?;
        let mut params = ze_external_semaphore_wait_params_ext_t {
            stype: ZE_STRUCTURE_TYPE_EXTERNAL_SEMAPHORE_WAIT_PARAMS_EXT,
            pNext: std::ptr::null(),
            value: if self.timeline { timeline_value } else { 0 },
        };
        let mut semaphore = self.semaphore;
        let (signal, wait_count, waits) = self.context.append_events(event);
        driver.check("zeCommandListAppendWaitExternalSemaphoreExt", unsafe {
            append(list, 1, &mut semaphore, &mut params, signal, wait_count, waits)
        })
    }
}

impl Drop for LevelZeroSemaphore {
    fn drop(&mut self) {
        let driver = self.context.driver();
        if let Some(release) = driver.table.ze_device_release_external_semaphore_ext {
            //logged by check
            let _ = driver.check("zeDeviceReleaseExternalSemaphoreExt", unsafe { release(self.semaphore) });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_follow_platform_and_kind() {
        assert_eq!(semaphore_flags(RawExternalHandle::Fd(3), false), ZE_EXTERNAL_SEMAPHORE_EXT_FLAG_OPAQUE_FD);
        assert_eq!(
            semaphore_flags(RawExternalHandle::Fd(3), true),
            ZE_EXTERNAL_SEMAPHORE_EXT_FLAG_VK_TIMELINE_SEMAPHORE_FD
        );
        assert_eq!(
            semaphore_flags(RawExternalHandle::Win32(std::ptr::null_mut()), true),
            ZE_EXTERNAL_SEMAPHORE_EXT_FLAG_VK_TIMELINE_SEMAPHORE_WIN32
        );
    }
}
