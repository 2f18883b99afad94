// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Vulkan semaphores imported through `cl_khr_external_semaphore`.
//!
//! `cl_khr_semaphore` only has binary semaphores.  Timeline semaphores are refused in the
//! precheck, before the handle is exported or any OpenCL function is called.

use std::sync::Arc;

use ash::vk;

use super::ffi::*;
use super::{OpenClEvent, OpenClInteropContext, enqueue_with_event};
use crate::error::{Error, Result};
use crate::handle::{ExportedHandle, RawExternalHandle};
use crate::interop::ComputeApi;

fn extension_missing() -> Error {
    logwise::warn_sync!("OpenCL platform lacks cl_khr_semaphore");
    Error::UnsupportedOperation {
        backend: ComputeApi::OpenCl,
        operation: "external semaphores (cl_khr_external_semaphore)",
    }
}

fn import_properties(handle: RawExternalHandle, device: cl_device_id) -> [cl_semaphore_properties_khr; 8] {
    let (key, value) = match handle {
        RawExternalHandle::Fd(fd) => (CL_SEMAPHORE_HANDLE_OPAQUE_FD_KHR, fd as u32 as cl_semaphore_properties_khr),
        RawExternalHandle::Win32(h) => (CL_SEMAPHORE_HANDLE_OPAQUE_WIN32_KHR, h as usize as cl_semaphore_properties_khr),
    };
    [
        CL_SEMAPHORE_TYPE_KHR,
        CL_SEMAPHORE_TYPE_BINARY_KHR,
        key,
        value,
        CL_SEMAPHORE_DEVICE_HANDLE_LIST_KHR,
        device as usize as cl_semaphore_properties_khr,
        CL_SEMAPHORE_DEVICE_HANDLE_LIST_END_KHR,
        0,
    ]
}

#[derive(Debug)]
pub struct OpenClSemaphore {
    context: Arc<OpenClInteropContext>,
    semaphore: cl_semaphore_khr,
}

impl OpenClSemaphore {
    pub(crate) fn precheck(context: &OpenClInteropContext, semaphore_type: vk::SemaphoreType) -> Result<()> {
        if semaphore_type == vk::SemaphoreType::TIMELINE {
            logwise::warn_sync!("OpenCL cannot import timeline semaphores");
            return Err(Error::TimelineSemaphoresUnsupported {
                backend: ComputeApi::OpenCl,
                reason: "cl_khr_semaphore only defines binary semaphores".to_string(),
            });
        }
        context.semaphore_functions().map(|_| ()).ok_or_else(extension_missing)
    }

    pub(crate) fn import(
        context: &Arc<OpenClInteropContext>,
        semaphore_type: vk::SemaphoreType,
        handle: &mut ExportedHandle,
    ) -> Result<Self> {
        Self::precheck(context, semaphore_type)?;
        let functions = context.semaphore_functions().ok_or_else(extension_missing)?;
        let properties = import_properties(handle.raw(), context.device());
        let mut status = CL_SUCCESS;
        let semaphore = unsafe {
            (functions.cl_create_semaphore_with_properties_khr)(context.context(), properties.as_ptr(), &mut status)
        };
        context.driver().check("clCreateSemaphoreWithPropertiesKHR", status)?;
        handle.release_after_import();
        logwise::trace_sync!("OpenCL imported external semaphore");
        Ok(OpenClSemaphore {
            context: context.clone(),
            semaphore,
        })
    }

    pub fn raw(&self) -> cl_semaphore_khr {
        self.semaphore
    }

    pub(crate) fn signal(&self, queue: cl_command_queue, event: Option<&mut Option<OpenClEvent>>) -> Result<()> {
        let functions = self.context.semaphore_functions().ok_or_else(extension_missing)?;
        let semaphore = self.semaphore;
        enqueue_with_event(self.context.driver(), "clEnqueueSignalSemaphoresKHR", event, |e| unsafe {
            (functions.cl_enqueue_signal_semaphores_khr)(queue, 1, &semaphore, std::ptr::null(), 0, std::ptr::null(), e)
        })
    }

    pub(crate) fn wait(&self, queue: cl_command_queue, event: Option<&mut Option<OpenClEvent>>) -> Result<()> {
        let functions = self.context.semaphore_functions().ok_or_else(extension_missing)?;
        let semaphore = self.semaphore;
        enqueue_with_event(self.context.driver(), "clEnqueueWaitSemaphoresKHR", event, |e| unsafe {
            (functions.cl_enqueue_wait_semaphores_khr)(queue, 1, &semaphore, std::ptr::null(), 0, std::ptr::null(), e)
        })
    }
}

impl Drop for OpenClSemaphore {
    fn drop(&mut self) {
        if let Some(functions) = self.context.semaphore_functions() {
            //logged by check
            let _ = self.context.driver().check("clReleaseSemaphoreKHR", unsafe {
                (functions.cl_release_semaphore_khr)(self.semaphore)
            });
        }
    }
}
