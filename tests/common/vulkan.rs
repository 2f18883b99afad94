//! Fake Vulkan collaborators.
//!
//! Exports hand out fds of fresh temporary files, so a test can tell from `/proc/self/fd`
//! whether a particular export was closed.

use std::cell::{Cell, RefCell};
use std::fs::File;
use std::os::fd::{AsRawFd, OwnedFd};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use ash::vk;
use sgl_compute_interop::Result;
use sgl_compute_interop::handle::ExportedHandle;
use sgl_compute_interop::vulkan::{
    ImageSettings, PhysicalDeviceIdentity, VulkanBuffer, VulkanDevice, VulkanImage, VulkanSemaphore,
};

static EXPORT_COUNTER: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    pub fd: i32,
    pub path: PathBuf,
}

impl Export {
    /// Whether `fd` still refers to the exported file.
    pub fn is_open(&self) -> bool {
        std::fs::read_link(format!("/proc/self/fd/{}", self.fd)).ok().as_ref() == Some(&self.path)
    }
}

#[derive(Debug)]
pub struct FakeDevice {
    identity: PhysicalDeviceIdentity,
    exports: RefCell<Vec<Export>>,
    export_count: Cell<usize>,
}

impl FakeDevice {
    pub fn new(driver_id: vk::DriverId, device_uuid: [u8; 16]) -> Arc<Self> {
        Arc::new(FakeDevice {
            identity: PhysicalDeviceIdentity {
                device_uuid,
                driver_id,
                vendor_id: 0x10de,
                device_name: "Fake GPU 4096".to_string(),
            },
            exports: RefCell::new(Vec::new()),
            export_count: Cell::new(0),
        })
    }

    pub fn export_count(&self) -> usize {
        self.export_count.get()
    }

    pub fn last_export(&self) -> Option<Export> {
        self.exports.borrow().last().cloned()
    }

    fn export(&self) -> Result<ExportedHandle> {
        let path = std::env::temp_dir().join(format!(
            "sgl_compute_interop_export_{}_{}",
            std::process::id(),
            EXPORT_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        let file = File::create(&path).map_err(|e| sgl_compute_interop::Error::Sycl(e.to_string()))?;
        let fd: OwnedFd = file.into();
        self.exports.borrow_mut().push(Export {
            fd: fd.as_raw_fd(),
            path,
        });
        self.export_count.set(self.export_count.get() + 1);
        Ok(ExportedHandle::from_fd(fd))
    }
}

impl Drop for FakeDevice {
    fn drop(&mut self) {
        for export in self.exports.borrow().iter() {
            let _ = std::fs::remove_file(&export.path);
        }
    }
}

impl VulkanDevice for FakeDevice {
    fn identity(&self) -> &PhysicalDeviceIdentity {
        &self.identity
    }

    fn export_memory_handle(&self, _memory: vk::DeviceMemory) -> Result<ExportedHandle> {
        self.export()
    }

    fn export_semaphore_handle(&self, _semaphore: vk::Semaphore) -> Result<ExportedHandle> {
        self.export()
    }
}

#[derive(Debug)]
pub struct FakeBuffer {
    pub device: Arc<dyn VulkanDevice>,
    pub size: u64,
    pub offset: u64,
    pub memory_size: u64,
}

impl FakeBuffer {
    /// A buffer alone in its own allocation.
    pub fn dedicated(device: Arc<dyn VulkanDevice>, size: u64) -> Arc<Self> {
        Arc::new(FakeBuffer {
            device,
            size,
            offset: 0,
            memory_size: size,
        })
    }
}

impl VulkanBuffer for FakeBuffer {
    fn device(&self) -> &Arc<dyn VulkanDevice> {
        &self.device
    }
    fn size_in_bytes(&self) -> vk::DeviceSize {
        self.size
    }
    fn vk_buffer(&self) -> vk::Buffer {
        vk::Buffer::null()
    }
    fn device_memory(&self) -> vk::DeviceMemory {
        vk::DeviceMemory::null()
    }
    fn device_memory_offset(&self) -> vk::DeviceSize {
        self.offset
    }
    fn device_memory_size(&self) -> vk::DeviceSize {
        self.memory_size
    }
    fn is_dedicated_allocation(&self) -> bool {
        self.offset == 0 && self.size == self.memory_size
    }
}

#[derive(Debug)]
pub struct FakeImage {
    pub device: Arc<dyn VulkanDevice>,
    pub settings: ImageSettings,
}

impl FakeImage {
    pub fn new(device: Arc<dyn VulkanDevice>, settings: ImageSettings) -> Arc<Self> {
        Arc::new(FakeImage { device, settings })
    }
}

impl VulkanImage for FakeImage {
    fn device(&self) -> &Arc<dyn VulkanDevice> {
        &self.device
    }
    fn vk_image(&self) -> vk::Image {
        vk::Image::null()
    }
    fn image_settings(&self) -> &ImageSettings {
        &self.settings
    }
    fn device_memory(&self) -> vk::DeviceMemory {
        vk::DeviceMemory::null()
    }
    fn device_memory_offset(&self) -> vk::DeviceSize {
        0
    }
    fn device_memory_size(&self) -> vk::DeviceSize {
        let s = &self.settings;
        s.width as u64 * s.height as u64 * s.array_layers as u64 * 4
    }
    fn is_dedicated_allocation(&self) -> bool {
        true
    }
}

#[derive(Debug)]
pub struct FakeSemaphore {
    pub device: Arc<dyn VulkanDevice>,
    pub semaphore_type: vk::SemaphoreType,
}

impl FakeSemaphore {
    pub fn new(device: Arc<dyn VulkanDevice>, semaphore_type: vk::SemaphoreType) -> Arc<Self> {
        Arc::new(FakeSemaphore { device, semaphore_type })
    }
}

impl VulkanSemaphore for FakeSemaphore {
    fn device(&self) -> &Arc<dyn VulkanDevice> {
        &self.device
    }
    fn vk_semaphore(&self) -> vk::Semaphore {
        vk::Semaphore::null()
    }
    fn semaphore_type(&self) -> vk::SemaphoreType {
        self.semaphore_type
    }
}
