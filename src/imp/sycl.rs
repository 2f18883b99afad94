// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! SYCL backend.
//!
//! SYCL is a C++ API with no stable C ABI, so there is no library to `dlopen`.  The application
//! registers a queue implementing [`SyclQueue`], normally a thin shim over
//! `sycl::ext::oneapi::experimental` (bindless images and external interop).  Everything else,
//! ownership transfer, format translation and the wrapper contract, is handled here exactly as
//! for the other backends.

use std::ffi::c_void;
use std::sync::Arc;

use ash::vk;

use crate::error::{Error, Result};
use crate::format::{ChannelKind, ChannelOrder, DepthStencil, format_info};
use crate::handle::{ExportedHandle, RawExternalHandle};
use crate::imp::level_zero::LevelZeroNativeHandles;
use crate::interop::image::{ImageGeometry, ImageVkComputeApiInfo, is_cube, is_layered};
use crate::interop::{ComputeApi, Transfer};
use crate::vulkan::{VulkanBuffer, VulkanImage};

/// `external_mem` returned by `import_external_memory`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyclExternalMemory(pub *mut c_void);

/// `image_mem_handle` returned by `map_external_image_memory`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyclImageMemory(pub *mut c_void);

/// `external_semaphore` returned by `import_external_semaphore`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyclExternalSemaphore(pub *mut c_void);

/// `sycl::image_channel_type` values the interop layer produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyclChannelType {
    Unorm8,
    Unorm16,
    Snorm8,
    Snorm16,
    Uint8,
    Uint16,
    Uint32,
    Sint8,
    Sint16,
    Sint32,
    Fp16,
    Fp32,
}

/// `image_type` of a bindless image descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyclImageType {
    Standard,
    Mipmap,
    Array,
    Cubemap,
}

/// `image_descriptor` for an external image.
///
/// `height` is 0 for 1D images and `depth` is 0 for everything but 3D, as SYCL expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyclImageDescriptor {
    pub width: usize,
    pub height: usize,
    pub depth: usize,
    pub array_size: u32,
    pub num_channels: u32,
    pub channel_type: SyclChannelType,
    pub image_type: SyclImageType,
    pub num_levels: u32,
}

/// An event returned by a SYCL enqueue.
pub trait SyclEvent: std::fmt::Debug {
    /// `event::wait_and_throw`; asynchronous exceptions become [`Error::Sycl`].
    fn wait_and_throw(&self) -> Result<()>;
}

/// The application's SYCL queue.
///
/// Implementations report SYCL exceptions as [`Error::Sycl`].  Pointers are USM pointers of
/// the queue's context.
pub trait SyclQueue: std::fmt::Debug {
    /// Native handles when the queue runs on the Level Zero backend (`sycl::get_native`).
    fn level_zero_handles(&self) -> Option<LevelZeroNativeHandles>;

    /// Imports `size` bytes of external memory.  On success the implementation owns the fd.
    fn import_external_memory(&self, handle: RawExternalHandle, size: u64) -> Result<SyclExternalMemory>;
    fn map_external_linear_memory(&self, memory: SyclExternalMemory, offset: u64, size: u64) -> Result<*mut c_void>;
    fn map_external_image_memory(
        &self,
        memory: SyclExternalMemory,
        descriptor: &SyclImageDescriptor,
    ) -> Result<SyclImageMemory>;
    fn unmap_external_linear_memory(&self, ptr: *mut c_void) -> Result<()>;
    fn unmap_external_image_memory(&self, image: SyclImageMemory, descriptor: &SyclImageDescriptor) -> Result<()>;
    fn release_external_memory(&self, memory: SyclExternalMemory) -> Result<()>;

    fn import_external_semaphore(&self, handle: RawExternalHandle, timeline: bool) -> Result<SyclExternalSemaphore>;
    fn release_external_semaphore(&self, semaphore: SyclExternalSemaphore) -> Result<()>;
    /// `value` is `Some` for timeline semaphores.
    fn signal_external_semaphore(&self, semaphore: SyclExternalSemaphore, value: Option<u64>)
    -> Result<Box<dyn SyclEvent>>;
    fn wait_external_semaphore(&self, semaphore: SyclExternalSemaphore, value: Option<u64>) -> Result<Box<dyn SyclEvent>>;

    fn memcpy(&self, dst: *mut c_void, src: *const c_void, size: usize) -> Result<Box<dyn SyclEvent>>;
    fn copy_to_image(
        &self,
        src: *const c_void,
        image: SyclImageMemory,
        descriptor: &SyclImageDescriptor,
    ) -> Result<Box<dyn SyclEvent>>;
    fn copy_from_image(
        &self,
        image: SyclImageMemory,
        dst: *mut c_void,
        descriptor: &SyclImageDescriptor,
    ) -> Result<Box<dyn SyclEvent>>;

    /// `queue::wait_and_throw`.
    fn wait_and_throw(&self) -> Result<()>;
}

fn unsupported(format: vk::Format) -> Error {
    logwise::warn_sync!(
        "SYCL has no image channel type for {format}",
        format = logwise::privacy::LogIt(&format)
    );
    Error::UnsupportedFormat {
        backend: ComputeApi::Sycl,
        format,
    }
}

/// Channel type and channel count for `format`.
///
/// Bindless images describe a format by these two values only, so formats needing a component
/// order (BGRA), a transfer function (sRGB) or packing have no translation.
pub fn channel_format(format: vk::Format) -> Result<(SyclChannelType, u32)> {
    use SyclChannelType::*;
    let info = format_info(format).ok_or_else(|| unsupported(format))?;
    if info.order != ChannelOrder::Rgba || info.depth_stencil == DepthStencil::DepthStencil {
        return Err(unsupported(format));
    }
    let channels = info.channel_count();
    if channels == 3 {
        return Err(unsupported(format));
    }
    let channel_type = match (info.kind, info.uniform_channel_bits()) {
        (ChannelKind::Unorm, Some(8)) => Unorm8,
        (ChannelKind::Unorm, Some(16)) => Unorm16,
        (ChannelKind::Snorm, Some(8)) => Snorm8,
        (ChannelKind::Snorm, Some(16)) => Snorm16,
        (ChannelKind::Uint, Some(8)) => Uint8,
        (ChannelKind::Uint, Some(16)) => Uint16,
        (ChannelKind::Uint, Some(32)) => Uint32,
        (ChannelKind::Sint, Some(8)) => Sint8,
        (ChannelKind::Sint, Some(16)) => Sint16,
        (ChannelKind::Sint, Some(32)) => Sint32,
        (ChannelKind::Float, Some(16)) => Fp16,
        (ChannelKind::Float, Some(32)) => Fp32,
        _ => return Err(unsupported(format)),
    };
    Ok((channel_type, channels))
}

pub(crate) fn image_descriptor(
    geometry: &ImageGeometry,
    format: vk::Format,
    info: &ImageVkComputeApiInfo,
    mip_levels: u32,
) -> Result<SyclImageDescriptor> {
    let (channel_type, num_channels) = channel_format(format)?;
    let layered = is_layered(info.view_type) || is_cube(info.view_type);
    let image_type = match (is_cube(info.view_type), layered, mip_levels > 1) {
        (true, _, false) => SyclImageType::Cubemap,
        (false, true, false) => SyclImageType::Array,
        (false, false, true) => SyclImageType::Mipmap,
        (false, false, false) => SyclImageType::Standard,
        (_, _, true) => {
            return Err(Error::UnsupportedImageType {
                backend: ComputeApi::Sycl,
                view_type: info.view_type,
            });
        }
    };
    let one_dimensional = matches!(info.view_type, vk::ImageViewType::TYPE_1D | vk::ImageViewType::TYPE_1D_ARRAY);
    Ok(SyclImageDescriptor {
        width: geometry.width as usize,
        height: if one_dimensional { 0 } else { geometry.height as usize },
        depth: if info.view_type == vk::ImageViewType::TYPE_3D {
            geometry.slices as usize
        } else {
            0
        },
        array_size: if layered { geometry.slices } else { 1 },
        num_channels,
        channel_type,
        image_type,
        num_levels: mip_levels,
    })
}

fn store_event(slot: Option<&mut Option<Box<dyn SyclEvent>>>, event: Box<dyn SyclEvent>) {
    if let Some(slot) = slot {
        *slot = Some(event);
    }
}

fn import_memory(queue: &dyn SyclQueue, handle: &mut ExportedHandle, size: u64) -> Result<SyclExternalMemory> {
    let memory = queue.import_external_memory(handle.raw(), size)?;
    handle.release_after_import();
    logwise::trace_sync!("SYCL imported external memory of {size} bytes", size = size);
    Ok(memory)
}

fn release_memory(queue: &dyn SyclQueue, memory: SyclExternalMemory) {
    if let Err(e) = queue.release_external_memory(memory) {
        logwise::error_sync!("could not release SYCL external memory: {e}", e = logwise::privacy::LogIt(&e));
    }
}

/// A Vulkan buffer mapped as SYCL USM.
#[derive(Debug)]
pub struct SyclBuffer {
    queue: Arc<dyn SyclQueue>,
    memory: SyclExternalMemory,
    device_ptr: *mut c_void,
    size: u64,
}

impl SyclBuffer {
    pub(crate) fn import(queue: &Arc<dyn SyclQueue>, buffer: &dyn VulkanBuffer, handle: &mut ExportedHandle) -> Result<Self> {
        let memory = import_memory(queue.as_ref(), handle, buffer.device_memory_size())?;
        let device_ptr = match queue.map_external_linear_memory(memory, buffer.device_memory_offset(), buffer.size_in_bytes()) {
            Ok(ptr) => ptr,
            Err(e) => {
                release_memory(queue.as_ref(), memory);
                return Err(e);
            }
        };
        Ok(SyclBuffer {
            queue: queue.clone(),
            memory,
            device_ptr,
            size: buffer.size_in_bytes(),
        })
    }

    pub fn device_ptr(&self) -> *mut c_void {
        self.device_ptr
    }

    /// # Safety
    /// The pointer in `transfer` must be valid for the whole buffer size until the copy completes.
    pub(crate) unsafe fn copy(
        &self,
        transfer: Transfer,
        queue: &dyn SyclQueue,
        event: Option<&mut Option<Box<dyn SyclEvent>>>,
    ) -> Result<()> {
        let (dst, src) = match transfer {
            Transfer::FromDevice(src) | Transfer::FromHost(src) => (self.device_ptr, src),
            Transfer::ToDevice(dst) | Transfer::ToHost(dst) => (dst, self.device_ptr as *const c_void),
        };
        store_event(event, queue.memcpy(dst, src, self.size as usize)?);
        Ok(())
    }
}

impl Drop for SyclBuffer {
    fn drop(&mut self) {
        if let Err(e) = self.queue.unmap_external_linear_memory(self.device_ptr) {
            logwise::error_sync!("could not unmap SYCL external buffer: {e}", e = logwise::privacy::LogIt(&e));
        }
        release_memory(self.queue.as_ref(), self.memory);
        logwise::trace_sync!("SYCL external buffer freed");
    }
}

/// A Vulkan image mapped as a SYCL bindless image.
#[derive(Debug)]
pub struct SyclImage {
    queue: Arc<dyn SyclQueue>,
    memory: SyclExternalMemory,
    image: SyclImageMemory,
    descriptor: SyclImageDescriptor,
}

impl SyclImage {
    pub(crate) fn precheck(image: &dyn VulkanImage, info: &ImageVkComputeApiInfo) -> Result<()> {
        let settings = image.image_settings();
        let geometry = ImageGeometry::new(settings, info.view_type);
        image_descriptor(&geometry, settings.format, info, settings.mip_levels).map(|_| ())
    }

    pub(crate) fn import(
        queue: &Arc<dyn SyclQueue>,
        image: &dyn VulkanImage,
        info: &ImageVkComputeApiInfo,
        handle: &mut ExportedHandle,
    ) -> Result<Self> {
        let settings = image.image_settings();
        let geometry = ImageGeometry::new(settings, info.view_type);
        let descriptor = image_descriptor(&geometry, settings.format, info, settings.mip_levels)?;
        let memory = import_memory(queue.as_ref(), handle, image.device_memory_size())?;
        let mapped = match queue.map_external_image_memory(memory, &descriptor) {
            Ok(mapped) => mapped,
            Err(e) => {
                release_memory(queue.as_ref(), memory);
                return Err(e);
            }
        };
        Ok(SyclImage {
            queue: queue.clone(),
            memory,
            image: mapped,
            descriptor,
        })
    }

    pub fn image_memory(&self) -> SyclImageMemory {
        self.image
    }

    pub fn descriptor(&self) -> &SyclImageDescriptor {
        &self.descriptor
    }

    /// # Safety
    /// The pointer in `transfer` must cover the tightly packed level 0 image until the copy
    /// completes.
    pub(crate) unsafe fn copy(
        &self,
        transfer: Transfer,
        queue: &dyn SyclQueue,
        event: Option<&mut Option<Box<dyn SyclEvent>>>,
    ) -> Result<()> {
        let enqueued = match transfer {
            Transfer::FromDevice(src) | Transfer::FromHost(src) => queue.copy_to_image(src, self.image, &self.descriptor)?,
            Transfer::ToDevice(dst) | Transfer::ToHost(dst) => queue.copy_from_image(self.image, dst, &self.descriptor)?,
        };
        store_event(event, enqueued);
        Ok(())
    }
}

impl Drop for SyclImage {
    fn drop(&mut self) {
        if let Err(e) = self.queue.unmap_external_image_memory(self.image, &self.descriptor) {
            logwise::error_sync!("could not unmap SYCL external image: {e}", e = logwise::privacy::LogIt(&e));
        }
        release_memory(self.queue.as_ref(), self.memory);
        logwise::trace_sync!("SYCL external image freed");
    }
}

#[derive(Debug)]
pub struct SyclSemaphore {
    queue: Arc<dyn SyclQueue>,
    semaphore: SyclExternalSemaphore,
    timeline: bool,
}

impl SyclSemaphore {
    pub(crate) fn import(
        queue: &Arc<dyn SyclQueue>,
        semaphore_type: vk::SemaphoreType,
        handle: &mut ExportedHandle,
    ) -> Result<Self> {
        let timeline = semaphore_type == vk::SemaphoreType::TIMELINE;
        let semaphore = queue.import_external_semaphore(handle.raw(), timeline)?;
        handle.release_after_import();
        logwise::trace_sync!("SYCL imported external semaphore, timeline: {timeline}", timeline = timeline);
        Ok(SyclSemaphore {
            queue: queue.clone(),
            semaphore,
            timeline,
        })
    }

    pub fn raw(&self) -> SyclExternalSemaphore {
        self.semaphore
    }

    fn value(&self, timeline_value: u64) -> Option<u64> {
        self.timeline.then_some(timeline_value)
    }

    pub(crate) fn signal(
        &self,
        queue: &dyn SyclQueue,
        timeline_value: u64,
        event: Option<&mut Option<Box<dyn SyclEvent>>>,
    ) -> Result<()> {
        store_event(event, queue.signal_external_semaphore(self.semaphore, self.value(timeline_value))?);
        Ok(())
    }

    pub(crate) fn wait(
        &self,
        queue: &dyn SyclQueue,
        timeline_value: u64,
        event: Option<&mut Option<Box<dyn SyclEvent>>>,
    ) -> Result<()> {
        store_event(event, queue.wait_external_semaphore(self.semaphore, self.value(timeline_value))?);
        Ok(())
    }
}

impl Drop for SyclSemaphore {
    fn drop(&mut self) {
        if let Err(e) = self.queue.release_external_semaphore(self.semaphore) {
            logwise::error_sync!("could not release SYCL external semaphore: {e}", e = logwise::privacy::LogIt(&e));
        }
    }
}

/// Blocks on `event` if given, otherwise on the whole queue.
pub(crate) fn wait_for_completion(queue: &dyn SyclQueue, event: Option<&dyn SyclEvent>) -> Result<()> {
    match event {
        Some(event) => event.wait_and_throw(),
        None => queue.wait_and_throw(),
    }
}
