// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
use std::ffi::CStr;
use std::fmt::{Debug, Formatter};

use ash::vk;

use crate::error::{Error, Result};
use crate::handle::ExportedHandle;
use crate::vulkan::{PhysicalDeviceIdentity, VulkanDevice};

/// [`VulkanDevice`] over an `ash` instance/device pair.
///
/// The handle-export functions belong to device extensions, so they are looked up with
/// `vkGetDeviceProcAddr` rather than linked.  A missing entry point only fails the export call
/// that needs it, with [`Error::MissingVulkanEntryPoint`].
pub struct AshVulkanDevice {
    device: ash::Device,
    identity: PhysicalDeviceIdentity,
    #[cfg_attr(not(unix), allow(dead_code))]
    get_memory_fd: Option<vk::PFN_vkGetMemoryFdKHR>,
    #[cfg_attr(not(unix), allow(dead_code))]
    get_semaphore_fd: Option<vk::PFN_vkGetSemaphoreFdKHR>,
    #[cfg_attr(not(windows), allow(dead_code))]
    get_memory_win32_handle: Option<vk::PFN_vkGetMemoryWin32HandleKHR>,
    #[cfg_attr(not(windows), allow(dead_code))]
    get_semaphore_win32_handle: Option<vk::PFN_vkGetSemaphoreWin32HandleKHR>,
}

impl Debug for AshVulkanDevice {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AshVulkanDevice")
            .field("device", &self.device.handle())
            .field("identity", &self.identity)
            .finish()
    }
}

/// Looks up a device-level entry point and reinterprets it as `T`.
///
/// # Safety
/// `T` must be the PFN type of `name`.
unsafe fn device_proc_addr<T: Copy>(instance: &ash::Instance, device: vk::Device, name: &CStr) -> Option<T> {
    let raw = unsafe { (instance.fp_v1_0().get_device_proc_addr)(device, name.as_ptr()) };
    unsafe { cast_proc_addr(raw) }
}

/// # Safety
/// `raw` must point to a function of type `T`.
unsafe fn cast_proc_addr<T: Copy>(raw: vk::PFN_vkVoidFunction) -> Option<T> {
    //a wrong-sized T fails to build
    const { assert!(size_of::<T>() == size_of::<unsafe extern "system" fn()>()) };
    raw.map(|f| unsafe { std::mem::transmute_copy::<unsafe extern "system" fn(), T>(&f) })
}

impl AshVulkanDevice {
    /// Wraps `device`, reading the physical device identity from `physical_device`.
    ///
    /// # Safety
    /// `device` must have been created from `physical_device` on `instance`, and all three must
    /// outlive the returned value.
    pub unsafe fn new(instance: &ash::Instance, physical_device: vk::PhysicalDevice, device: &ash::Device) -> Self {
        let mut id_properties = vk::PhysicalDeviceIDProperties::default();
        let mut driver_properties = vk::PhysicalDeviceDriverProperties::default();
        let (vendor_id, device_name) = {
            let mut properties2 = vk::PhysicalDeviceProperties2::default()
                .push_next(&mut id_properties)
                .push_next(&mut driver_properties);
            unsafe { instance.get_physical_device_properties2(physical_device, &mut properties2) };
            let name = properties2
                .properties
                .device_name_as_c_str()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            (properties2.properties.vendor_id, name)
        };
        let identity = PhysicalDeviceIdentity {
            device_uuid: id_properties.device_uuid,
            driver_id: driver_properties.driver_id,
            vendor_id,
            device_name,
        };
        let handle = device.handle();
        unsafe {
            AshVulkanDevice {
                device: device.clone(),
                identity,
                get_memory_fd: device_proc_addr(instance, handle, c"vkGetMemoryFdKHR"),
                get_semaphore_fd: device_proc_addr(instance, handle, c"vkGetSemaphoreFdKHR"),
                get_memory_win32_handle: device_proc_addr(instance, handle, c"vkGetMemoryWin32HandleKHR"),
                get_semaphore_win32_handle: device_proc_addr(instance, handle, c"vkGetSemaphoreWin32HandleKHR"),
            }
        }
    }

    pub fn ash_device(&self) -> &ash::Device {
        &self.device
    }
}

impl VulkanDevice for AshVulkanDevice {
    fn identity(&self) -> &PhysicalDeviceIdentity {
        &self.identity
    }

    #[cfg(unix)]
    fn export_memory_handle(&self, memory: vk::DeviceMemory) -> Result<ExportedHandle> {
        use std::os::fd::{FromRawFd, OwnedFd};
        let get_memory_fd = self
            .get_memory_fd
            .ok_or(Error::MissingVulkanEntryPoint("vkGetMemoryFdKHR"))?;
        let info = vk::MemoryGetFdInfoKHR::default()
            .memory(memory)
            .handle_type(vk::ExternalMemoryHandleTypeFlags::OPAQUE_FD);
        let mut fd = -1;
        let result = unsafe { get_memory_fd(self.device.handle(), &info, &mut fd) };
        if result != vk::Result::SUCCESS {
            return Err(Error::vulkan("vkGetMemoryFdKHR", result));
        }
        //safe: a successful export hands us a fresh descriptor
        Ok(ExportedHandle::from_fd(unsafe { OwnedFd::from_raw_fd(fd) }))
    }

    #[cfg(windows)]
    fn export_memory_handle(&self, memory: vk::DeviceMemory) -> Result<ExportedHandle> {
        use std::os::windows::io::{FromRawHandle, OwnedHandle};
        let get_memory_win32_handle = self
            .get_memory_win32_handle
            .ok_or(Error::MissingVulkanEntryPoint("vkGetMemoryWin32HandleKHR"))?;
        let info = vk::MemoryGetWin32HandleInfoKHR::default()
            .memory(memory)
            .handle_type(vk::ExternalMemoryHandleTypeFlags::OPAQUE_WIN32);
        let mut handle: vk::HANDLE = std::ptr::null_mut();
        let result = unsafe { get_memory_win32_handle(self.device.handle(), &info, &mut handle) };
        if result != vk::Result::SUCCESS {
            return Err(Error::vulkan("vkGetMemoryWin32HandleKHR", result));
        }
        Ok(ExportedHandle::from_win32(unsafe { OwnedHandle::from_raw_handle(handle) }))
    }

    #[cfg(unix)]
    fn export_semaphore_handle(&self, semaphore: vk::Semaphore) -> Result<ExportedHandle> {
        use std::os::fd::{FromRawFd, OwnedFd};
        let get_semaphore_fd = self
            .get_semaphore_fd
            .ok_or(Error::MissingVulkanEntryPoint("vkGetSemaphoreFdKHR"))?;
        let info = vk::SemaphoreGetFdInfoKHR::default()
            .semaphore(semaphore)
            .handle_type(vk::ExternalSemaphoreHandleTypeFlags::OPAQUE_FD);
        let mut fd = -1;
        let result = unsafe { get_semaphore_fd(self.device.handle(), &info, &mut fd) };
        if result != vk::Result::SUCCESS {
            return Err(Error::vulkan("vkGetSemaphoreFdKHR", result));
        }
        Ok(ExportedHandle::from_fd(unsafe { OwnedFd::from_raw_fd(fd) }))
    }

    #[cfg(windows)]
    fn export_semaphore_handle(&self, semaphore: vk::Semaphore) -> Result<ExportedHandle> {
        use std::os::windows::io::{FromRawHandle, OwnedHandle};
        let get_semaphore_win32_handle = self
            .get_semaphore_win32_handle
            .ok_or(Error::MissingVulkanEntryPoint("vkGetSemaphoreWin32HandleKHR"))?;
        let info = vk::SemaphoreGetWin32HandleInfoKHR::default()
            .semaphore(semaphore)
            .handle_type(vk::ExternalSemaphoreHandleTypeFlags::OPAQUE_WIN32);
        let mut handle: vk::HANDLE = std::ptr::null_mut();
        let result = unsafe { get_semaphore_win32_handle(self.device.handle(), &info, &mut handle) };
        if result != vk::Result::SUCCESS {
            return Err(Error::vulkan("vkGetSemaphoreWin32HandleKHR", result));
        }
        Ok(ExportedHandle::from_win32(unsafe { OwnedHandle::from_raw_handle(handle) }))
    }
}
