// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Vulkan memory imported into Level Zero.

use std::ffi::c_void;
use std::sync::Arc;

use ash::vk;

use super::LevelZeroInteropContext;
use super::ffi::*;
use super::format;
use crate::error::{Error, Result};
use crate::handle::{ExportedHandle, RawExternalHandle};
use crate::interop::image::{ImageGeometry, ImageVkComputeApiInfo};
use crate::interop::{ComputeApi, TextureSettings, Transfer};
use crate::vulkan::{VulkanBuffer, VulkanImage};

/// The external-memory import struct chained into an allocation or image.
pub(crate) enum ImportDesc {
    Fd(ze_external_memory_import_fd_t),
    Win32(ze_external_memory_import_win32_handle_t),
}

impl ImportDesc {
    pub(crate) fn new(handle: RawExternalHandle) -> Self {
        match handle {
            RawExternalHandle::Fd(fd) => ImportDesc::Fd(ze_external_memory_import_fd_t {
                stype: ZE_STRUCTURE_TYPE_EXTERNAL_MEMORY_IMPORT_FD,
                pNext: std::ptr::null(),
                flags: ZE_EXTERNAL_MEMORY_TYPE_FLAG_OPAQUE_FD,
                fd,
            }),
            RawExternalHandle::Win32(handle) => ImportDesc::Win32(ze_external_memory_import_win32_handle_t {
                stype: ZE_STRUCTURE_TYPE_EXTERNAL_MEMORY_IMPORT_WIN32,
                pNext: std::ptr::null(),
                flags: ZE_EXTERNAL_MEMORY_TYPE_FLAG_OPAQUE_WIN32,
                handle,
                name: std::ptr::null(),
            }),
        }
    }

    pub(crate) fn as_ptr(&self) -> *const c_void {
        match self {
            ImportDesc::Fd(desc) => desc as *const _ as *const c_void,
            ImportDesc::Win32(desc) => desc as *const _ as *const c_void,
        }
    }
}

/// Allocates device memory backed by the exported handle.  Returns the base of the allocation.
fn import_allocation(context: &LevelZeroInteropContext, handle: &mut ExportedHandle, size: u64) -> Result<*mut c_void> {
    let import = ImportDesc::new(handle.raw());
    let desc = ze_device_mem_alloc_desc_t {
        stype: ZE_STRUCTURE_TYPE_DEVICE_MEM_ALLOC_DESC,
        pNext: import.as_ptr(),
        flags: 0,
        ordinal: 0,
    };
    let driver = context.driver();
    let mut base: *mut c_void = std::ptr::null_mut();
    driver.check("zeMemAllocDevice", unsafe {
        (driver.table.ze_mem_alloc_device)(context.context(), &desc, size as usize, 0, context.device(), &mut base)
    })?;
    handle.release_after_import();
    logwise::trace_sync!("Level Zero imported external memory of {size} bytes", size = size);
    Ok(base)
}

fn free_allocation(context: &LevelZeroInteropContext, base: *mut c_void) {
    let driver = context.driver();
    //logged by check
    let _ = driver.check("zeMemFree", unsafe { (driver.table.ze_mem_free)(context.context(), base) });
}

/// A Vulkan buffer imported as Level Zero device memory.
///
/// The whole `VkDeviceMemory` block is imported; the buffer starts at its Vulkan offset inside it.
#[derive(Debug)]
pub struct LevelZeroBuffer {
    context: Arc<LevelZeroInteropContext>,
    base: *mut c_void,
    device_ptr: *mut c_void,
    size: u64,
}

impl LevelZeroBuffer {
    pub(crate) fn import(
        context: &Arc<LevelZeroInteropContext>,
        buffer: &dyn VulkanBuffer,
        handle: &mut ExportedHandle,
    ) -> Result<Self> {
        let base = import_allocation(context, handle, buffer.device_memory_size())?;
        Ok(LevelZeroBuffer {
            context: context.clone(),
            base,
            device_ptr: base.wrapping_add(buffer.device_memory_offset() as usize),
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
        list: ze_command_list_handle_t,
        event: Option<ze_event_handle_t>,
    ) -> Result<()> {
        let (dst, src) = match transfer {
            Transfer::FromDevice(src) | Transfer::FromHost(src) => (self.device_ptr, src),
            Transfer::ToDevice(dst) | Transfer::ToHost(dst) => (dst, self.device_ptr as *const c_void),
        };
        let (signal, wait_count, waits) = self.context.append_events(event);
        let driver = self.context.driver();
        driver.check("zeCommandListAppendMemoryCopy", unsafe {
            (driver.table.ze_command_list_append_memory_copy)(list, dst, src, self.size as usize, signal, wait_count, waits)
        })
    }
}

impl Drop for LevelZeroBuffer {
    fn drop(&mut self) {
        free_allocation(&self.context, self.base);
        logwise::trace_sync!("Level Zero external buffer freed");
    }
}

pub(crate) fn image_desc(
    geometry: &ImageGeometry,
    vk_format: vk::Format,
    info: &ImageVkComputeApiInfo,
    mip_levels: u32,
) -> Result<ze_image_desc_t> {
    let format = format::image_format(vk_format)?;
    let type_ = format::image_type(info.view_type)?;
    let (height, depth, arraylevels) = match type_ {
        ZE_IMAGE_TYPE_1D => (1, 1, 0),
        ZE_IMAGE_TYPE_1DARRAY => (1, 1, geometry.slices),
        ZE_IMAGE_TYPE_2DARRAY => (geometry.height, 1, geometry.slices),
        ZE_IMAGE_TYPE_3D => (geometry.height, geometry.slices, 0),
        _ => (geometry.height, 1, 0),
    };
    Ok(ze_image_desc_t {
        stype: ZE_STRUCTURE_TYPE_IMAGE_DESC,
        pNext: std::ptr::null(),
        flags: if info.surface_load_store { ZE_IMAGE_FLAG_KERNEL_WRITE } else { 0 },
        type_,
        format,
        width: geometry.width as u64,
        height,
        depth,
        arraylevels,
        //0 and 1 both mean a single level
        miplevels: mip_levels.saturating_sub(1),
    })
}

/// A Vulkan image imported as a Level Zero image.
///
/// Without bindless images the image is created straight from the exported memory.  With them,
/// the memory is imported as a device allocation and the image is a pitched view over it.
#[derive(Debug)]
pub struct LevelZeroImage {
    context: Arc<LevelZeroInteropContext>,
    image: ze_image_handle_t,
    bindless_base: Option<*mut c_void>,
    geometry: ImageGeometry,
}

impl LevelZeroImage {
    pub(crate) fn precheck(
        context: &LevelZeroInteropContext,
        image: &dyn VulkanImage,
        info: &ImageVkComputeApiInfo,
    ) -> Result<()> {
        let settings = image.image_settings();
        image_desc(&ImageGeometry::new(settings, info.view_type), settings.format, info, settings.mip_levels)?;
        if context.uses_bindless_images() {
            if info.view_type != vk::ImageViewType::TYPE_2D {
                return Err(Error::UnsupportedImageType {
                    backend: ComputeApi::LevelZero,
                    view_type: info.view_type,
                });
            }
            if context.driver().table.ze_mem_get_pitch_for_2d_image.is_none() {
                return Err(Error::UnsupportedOperation {
                    backend: ComputeApi::LevelZero,
                    operation: "bindless images (zeMemGetPitchFor2dImage)",
                });
            }
        } else if image.device_memory_offset() != 0 {
            return Err(Error::UnsupportedOperation {
                backend: ComputeApi::LevelZero,
                operation: "importing an image at a non-zero memory offset without bindless images",
            });
        }
        Ok(())
    }

    pub(crate) fn import(
        context: &Arc<LevelZeroInteropContext>,
        image: &dyn VulkanImage,
        info: &ImageVkComputeApiInfo,
        handle: &mut ExportedHandle,
    ) -> Result<Self> {
        Self::precheck(context, image, info)?;
        let settings = image.image_settings();
        let geometry = ImageGeometry::new(settings, info.view_type);
        let mut desc = image_desc(&geometry, settings.format, info, settings.mip_levels)?;
        let mut imported = LevelZeroImage {
            context: context.clone(),
            image: std::ptr::null_mut(),
            bindless_base: None,
            geometry,
        };
        let driver = context.driver();
        if context.uses_bindless_images() {
            let base = import_allocation(context, handle, image.device_memory_size())?;
            imported.bindless_base = Some(base);
            let get_pitch = driver.table.ze_mem_get_pitch_for_2d_image.ok_or(Error::UnsupportedOperation {
                backend: ComputeApi::LevelZero,
                operation: "bindless images (zeMemGetPitchFor2dImage)",
            })?;
            let mut pitch = 0usize;
            driver.check("zeMemGetPitchFor2dImage", unsafe {
                get_pitch(
                    context.context(),
                    context.device(),
                    geometry.width as usize,
                    geometry.height as usize,
                    geometry.bytes_per_pixel,
                    &mut pitch,
                )
            })?;
            logwise::trace_sync!("Level Zero pitch for bindless image: {pitch}", pitch = pitch);
            let pitched = ze_image_pitched_exp_desc_t {
                stype: ZE_STRUCTURE_TYPE_PITCHED_IMAGE_EXP_DESC,
                pNext: std::ptr::null(),
                ptr: base.wrapping_add(image.device_memory_offset() as usize),
            };
            let bindless = ze_image_bindless_exp_desc_t {
                stype: ZE_STRUCTURE_TYPE_BINDLESS_IMAGE_EXP_DESC,
                pNext: &pitched as *const _ as *const c_void,
                flags: ZE_IMAGE_BINDLESS_EXP_FLAG_BINDLESS,
            };
            desc.pNext = &bindless as *const _ as *const c_void;
            imported.create_image(&desc, info)?;
        } else {
            let import = ImportDesc::new(handle.raw());
            desc.pNext = import.as_ptr();
            imported.create_image(&desc, info)?;
            handle.release_after_import();
        }
        logwise::trace_sync!(
            "Level Zero imported image {width}x{height}",
            width = geometry.width,
            height = geometry.height
        );
        Ok(imported)
    }

    fn create_image(&mut self, desc: &ze_image_desc_t, info: &ImageVkComputeApiInfo) -> Result<()> {
        let driver = self.context.driver();
        let result =
            unsafe { (driver.table.ze_image_create)(self.context.context(), self.context.device(), desc, &mut self.image) };
        if result == ZE_RESULT_ERROR_UNSUPPORTED_FEATURE {
            logwise::warn_sync!(
                "Level Zero rejected the image for view type {view_type}",
                view_type = logwise::privacy::LogIt(&info.view_type)
            );
            return Err(Error::UnsupportedImageType {
                backend: ComputeApi::LevelZero,
                view_type: info.view_type,
            });
        }
        driver.check("zeImageCreate", result)
    }

    pub fn raw(&self) -> ze_image_handle_t {
        self.image
    }

    fn region(&self) -> ze_image_region_t {
        ze_image_region_t {
            originX: 0,
            originY: 0,
            originZ: 0,
            width: self.geometry.width,
            height: self.geometry.height,
            depth: self.geometry.slices,
        }
    }

    /// # Safety
    /// The pointer in `transfer` must cover the whole level 0 image, tightly packed, until the
    /// copy completes.
    pub(crate) unsafe fn copy(
        &self,
        transfer: Transfer,
        list: ze_command_list_handle_t,
        event: Option<ze_event_handle_t>,
    ) -> Result<()> {
        let region = self.region();
        let (signal, wait_count, waits) = self.context.append_events(event);
        let driver = self.context.driver();
        match transfer {
            Transfer::FromDevice(src) | Transfer::FromHost(src) => {
                driver.check("zeCommandListAppendImageCopyFromMemory", unsafe {
                    (driver.table.ze_command_list_append_image_copy_from_memory)(
                        list, self.image, src, &region, signal, wait_count, waits,
                    )
                })
            }
            Transfer::ToDevice(dst) | Transfer::ToHost(dst) => driver.check("zeCommandListAppendImageCopyToMemory", unsafe {
                (driver.table.ze_command_list_append_image_copy_to_memory)(
                    list, dst, self.image, &region, signal, wait_count, waits,
                )
            }),
        }
    }

    pub(crate) fn create_sampler(&self, settings: &TextureSettings) -> Result<LevelZeroSampler> {
        let desc = format::sampler_desc(settings)?;
        let driver = self.context.driver();
        let mut sampler: ze_sampler_handle_t = std::ptr::null_mut();
        driver.check("zeSamplerCreate", unsafe {
            (driver.table.ze_sampler_create)(self.context.context(), self.context.device(), &desc, &mut sampler)
        })?;
        Ok(LevelZeroSampler {
            context: self.context.clone(),
            sampler,
        })
    }
}

impl Drop for LevelZeroImage {
    fn drop(&mut self) {
        let driver = self.context.driver();
        if !self.image.is_null() {
            //logged by check
            let _ = driver.check("zeImageDestroy", unsafe { (driver.table.ze_image_destroy)(self.image) });
        }
        if let Some(base) = self.bindless_base {
            free_allocation(&self.context, base);
        }
        logwise::trace_sync!("Level Zero external image freed");
    }
}

#[derive(Debug)]
pub struct LevelZeroSampler {
    context: Arc<LevelZeroInteropContext>,
    sampler: ze_sampler_handle_t,
}

impl LevelZeroSampler {
    pub fn raw(&self) -> ze_sampler_handle_t {
        self.sampler
    }
}

impl Drop for LevelZeroSampler {
    fn drop(&mut self) {
        let driver = self.context.driver();
        let _ = driver.check("zeSamplerDestroy", unsafe { (driver.table.ze_sampler_destroy)(self.sampler) });
    }
}
