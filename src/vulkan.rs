//! The Vulkan side of interop.
//!
//! Vulkan buffers, images and semaphores are created elsewhere (with export-capable memory and
//! semaphore flags) and reach this crate through the traits in this module.  Only the pieces
//! interop needs are exposed: sizes, the backing `VkDeviceMemory` with its offset, image settings,
//! and the ability to export OS handles.
//!
//! [`AshVulkanDevice`] implements [`VulkanDevice`] for an `ash` device.

mod ash_device;

use std::fmt::Debug;
use std::sync::Arc;

use ash::vk;

use crate::error::Result;
use crate::handle::ExportedHandle;

pub use ash_device::AshVulkanDevice;

/// Identity of the physical GPU behind a Vulkan device.
///
/// Backends are matched against this: by UUID where the backend exposes one, by name and vendor
/// otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalDeviceIdentity {
    /// `VkPhysicalDeviceIDProperties::deviceUUID`
    pub device_uuid: [u8; vk::UUID_SIZE],
    pub driver_id: vk::DriverId,
    pub vendor_id: u32,
    pub device_name: String,
}

/// A Vulkan device able to export memory and semaphore handles.
pub trait VulkanDevice: Debug {
    fn identity(&self) -> &PhysicalDeviceIdentity;

    /// Exports an OS handle for `memory` (`vkGetMemoryFdKHR` / `vkGetMemoryWin32HandleKHR`).
    fn export_memory_handle(&self, memory: vk::DeviceMemory) -> Result<ExportedHandle>;

    /// Exports an OS handle for `semaphore` (`vkGetSemaphoreFdKHR` / `vkGetSemaphoreWin32HandleKHR`).
    fn export_semaphore_handle(&self, semaphore: vk::Semaphore) -> Result<ExportedHandle>;
}

/// A Vulkan buffer whose memory was allocated with an exportable handle type.
pub trait VulkanBuffer: Debug {
    fn device(&self) -> &Arc<dyn VulkanDevice>;
    fn size_in_bytes(&self) -> vk::DeviceSize;
    fn vk_buffer(&self) -> vk::Buffer;
    fn device_memory(&self) -> vk::DeviceMemory;
    /// Offset of the buffer inside [`VulkanBuffer::device_memory`].
    fn device_memory_offset(&self) -> vk::DeviceSize;
    /// Size of the whole `VkDeviceMemory` block.
    fn device_memory_size(&self) -> vk::DeviceSize;
    /// True if the memory block was allocated for this buffer alone.
    fn is_dedicated_allocation(&self) -> bool;
}

/// Creation settings of a Vulkan image, as interop needs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSettings {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub mip_levels: u32,
    pub array_layers: u32,
    pub format: vk::Format,
    pub image_type: vk::ImageType,
    pub usage: vk::ImageUsageFlags,
}

impl Default for ImageSettings {
    fn default() -> Self {
        ImageSettings {
            width: 1,
            height: 1,
            depth: 1,
            mip_levels: 1,
            array_layers: 1,
            format: vk::Format::R8G8B8A8_UNORM,
            image_type: vk::ImageType::TYPE_2D,
            usage: vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::STORAGE,
        }
    }
}

/// A Vulkan image whose memory was allocated with an exportable handle type.
pub trait VulkanImage: Debug {
    fn device(&self) -> &Arc<dyn VulkanDevice>;
    fn vk_image(&self) -> vk::Image;
    fn image_settings(&self) -> &ImageSettings;
    fn device_memory(&self) -> vk::DeviceMemory;
    fn device_memory_offset(&self) -> vk::DeviceSize;
    fn device_memory_size(&self) -> vk::DeviceSize;
    fn is_dedicated_allocation(&self) -> bool;
}

/// A Vulkan semaphore created with an exportable handle type.
pub trait VulkanSemaphore: Debug {
    fn device(&self) -> &Arc<dyn VulkanDevice>;
    fn vk_semaphore(&self) -> vk::Semaphore;
    /// `BINARY` or `TIMELINE`.
    fn semaphore_type(&self) -> vk::SemaphoreType;
}

/// The memory handle type matching the current platform.
pub fn platform_memory_handle_type() -> vk::ExternalMemoryHandleTypeFlags {
    if cfg!(windows) {
        vk::ExternalMemoryHandleTypeFlags::OPAQUE_WIN32
    } else {
        vk::ExternalMemoryHandleTypeFlags::OPAQUE_FD
    }
}

/// The semaphore handle type matching the current platform.
pub fn platform_semaphore_handle_type() -> vk::ExternalSemaphoreHandleTypeFlags {
    if cfg!(windows) {
        vk::ExternalSemaphoreHandleTypeFlags::OPAQUE_WIN32
    } else {
        vk::ExternalSemaphoreHandleTypeFlags::OPAQUE_FD
    }
}
