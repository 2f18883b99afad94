// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Vulkan memory imported into HIP.

use std::cell::OnceCell;
use std::ffi::c_void;
use std::sync::Arc;

use ash::vk;

use super::HipDriver;
use super::ffi::*;
use super::format;
use crate::error::{Error, Result};
use crate::handle::{ExportedHandle, RawExternalHandle};
use crate::interop::image::{ImageGeometry, ImageVkComputeApiInfo, is_cube, is_layered};
use crate::interop::{ComputeApi, TextureSettings, Transfer};
use crate::vulkan::{VulkanBuffer, VulkanImage};

fn import_external_memory(
    driver: &HipDriver,
    handle: &mut ExportedHandle,
    size: u64,
    dedicated: bool,
) -> Result<hipExternalMemory_t> {
    let mut desc = hipExternalMemoryHandleDesc::zeroed();
    match handle.raw() {
        RawExternalHandle::Fd(fd) => {
            desc.type_ = hipExternalMemoryHandleTypeOpaqueFd;
            desc.handle.fd = fd;
        }
        RawExternalHandle::Win32(h) => {
            desc.type_ = hipExternalMemoryHandleTypeOpaqueWin32;
            desc.handle.win32 = HipWin32Handle {
                handle: h,
                name: std::ptr::null(),
            };
        }
    }
    desc.size = size;
    if dedicated {
        desc.flags = hipExternalMemoryDedicated;
    }
    let mut external_memory: hipExternalMemory_t = std::ptr::null_mut();
    driver.check("hipImportExternalMemory", unsafe {
        (driver.table.hip_import_external_memory)(&mut external_memory, &desc)
    })?;
    handle.release_after_import();
    logwise::trace_sync!("HIP imported external memory of {size} bytes", size = size);
    Ok(external_memory)
}

/// A Vulkan buffer mapped into the HIP address space.
#[derive(Debug)]
pub struct HipBuffer {
    driver: Arc<HipDriver>,
    external_memory: hipExternalMemory_t,
    device_ptr: *mut c_void,
    size: u64,
}

impl HipBuffer {
    pub(crate) fn import(driver: &Arc<HipDriver>, buffer: &dyn VulkanBuffer, handle: &mut ExportedHandle) -> Result<Self> {
        let external_memory = import_external_memory(
            driver,
            handle,
            buffer.device_memory_size(),
            buffer.is_dedicated_allocation(),
        )?;
        let mut imported = HipBuffer {
            driver: driver.clone(),
            external_memory,
            device_ptr: std::ptr::null_mut(),
            size: buffer.size_in_bytes(),
        };
        let desc = hipExternalMemoryBufferDesc {
            offset: buffer.device_memory_offset(),
            size: buffer.size_in_bytes(),
            ..Default::default()
        };
        driver.check("hipExternalMemoryGetMappedBuffer", unsafe {
            (driver.table.hip_external_memory_get_mapped_buffer)(&mut imported.device_ptr, external_memory, &desc)
        })?;
        Ok(imported)
    }

    pub fn device_ptr(&self) -> *mut c_void {
        self.device_ptr
    }

    /// # Safety
    /// The pointer in `transfer` must be valid for the whole buffer size until the copy completes.
    pub(crate) unsafe fn copy(&self, transfer: Transfer, stream: hipStream_t, event: Option<hipEvent_t>) -> Result<()> {
        let (dst, src, kind) = match transfer {
            Transfer::FromDevice(src) => (self.device_ptr, src, hipMemcpyDeviceToDevice),
            Transfer::ToDevice(dst) => (dst, self.device_ptr as *const c_void, hipMemcpyDeviceToDevice),
            Transfer::FromHost(src) => (self.device_ptr, src, hipMemcpyHostToDevice),
            Transfer::ToHost(dst) => (dst, self.device_ptr as *const c_void, hipMemcpyDeviceToHost),
        };
        self.driver.check("hipMemcpyAsync", unsafe {
            (self.driver.table.hip_memcpy_async)(dst, src, self.size as usize, kind, stream)
        })?;
        self.driver.record_event(event, stream)
    }
}

impl Drop for HipBuffer {
    fn drop(&mut self) {
        let table = &self.driver.table;
        //logged by check
        if !self.device_ptr.is_null() {
            let _ = self.driver.check("hipFree", unsafe { (table.hip_free)(self.device_ptr) });
        }
        let _ = self
            .driver
            .check("hipDestroyExternalMemory", unsafe { (table.hip_destroy_external_memory)(self.external_memory) });
        logwise::trace_sync!("HIP external buffer freed");
    }
}

pub(crate) fn mipmapped_array_desc(
    geometry: &ImageGeometry,
    vk_format: vk::Format,
    info: &ImageVkComputeApiInfo,
    offset: u64,
    mip_levels: u32,
) -> Result<hipExternalMemoryMipmappedArrayDesc> {
    let format_desc = format::channel_format_desc(vk_format)?;
    let mut flags = 0;
    if is_layered(info.view_type) {
        flags |= hipArrayLayered;
    }
    if is_cube(info.view_type) {
        flags |= hipArrayCubemap;
    }
    if info.surface_load_store {
        flags |= hipArraySurfaceLoadStore;
    }
    let one_dimensional = matches!(info.view_type, vk::ImageViewType::TYPE_1D | vk::ImageViewType::TYPE_1D_ARRAY);
    let depth = if info.view_type == vk::ImageViewType::TYPE_3D || flags & (hipArrayLayered | hipArrayCubemap) != 0 {
        geometry.slices as usize
    } else {
        0
    };
    Ok(hipExternalMemoryMipmappedArrayDesc {
        offset,
        formatDesc: format_desc,
        extent: hipExtent {
            width: geometry.width as usize,
            height: if one_dimensional { 0 } else { geometry.height as usize },
            depth,
        },
        flags,
        numLevels: mip_levels,
    })
}

/// A Vulkan image mapped as a HIP mipmapped array.
#[derive(Debug)]
pub struct HipImage {
    driver: Arc<HipDriver>,
    external_memory: hipExternalMemory_t,
    mipmapped_array: hipMipmappedArray_t,
    array_level0: OnceCell<hipArray_t>,
    geometry: ImageGeometry,
    format: vk::Format,
    mip_levels: u32,
}

impl HipImage {
    pub(crate) fn precheck(image: &dyn VulkanImage, info: &ImageVkComputeApiInfo) -> Result<()> {
        let settings = image.image_settings();
        let geometry = ImageGeometry::new(settings, info.view_type);
        mipmapped_array_desc(&geometry, settings.format, info, 0, settings.mip_levels).map(|_| ())
    }

    pub(crate) fn import(
        driver: &Arc<HipDriver>,
        image: &dyn VulkanImage,
        info: &ImageVkComputeApiInfo,
        handle: &mut ExportedHandle,
    ) -> Result<Self> {
        let settings = image.image_settings();
        let geometry = ImageGeometry::new(settings, info.view_type);
        let desc = mipmapped_array_desc(
            &geometry,
            settings.format,
            info,
            image.device_memory_offset(),
            settings.mip_levels,
        )?;
        let external_memory = import_external_memory(
            driver,
            handle,
            image.device_memory_size(),
            image.is_dedicated_allocation(),
        )?;
        let mut imported = HipImage {
            driver: driver.clone(),
            external_memory,
            mipmapped_array: std::ptr::null_mut(),
            array_level0: OnceCell::new(),
            geometry,
            format: settings.format,
            mip_levels: settings.mip_levels,
        };
        let result = unsafe {
            (driver.table.hip_external_memory_get_mapped_mipmapped_array)(&mut imported.mipmapped_array, external_memory, &desc)
        };
        if result == hipErrorInvalidValue {
            logwise::warn_sync!(
                "HIP rejected the mipmapped array for view type {view_type}",
                view_type = logwise::privacy::LogIt(&info.view_type)
            );
            return Err(Error::UnsupportedImageType {
                backend: ComputeApi::Hip,
                view_type: info.view_type,
            });
        }
        driver.check("hipExternalMemoryGetMappedMipmappedArray", result)?;
        Ok(imported)
    }

    pub fn mipmapped_array(&self) -> hipMipmappedArray_t {
        self.mipmapped_array
    }

    /// Mip level 0, queried once and cached for the life of the image.
    pub fn array_level0(&self) -> Result<hipArray_t> {
        if let Some(array) = self.array_level0.get() {
            return Ok(*array);
        }
        let mut array: hipArray_t = std::ptr::null_mut();
        self.driver.check("hipGetMipmappedArrayLevel", unsafe {
            (self.driver.table.hip_get_mipmapped_array_level)(&mut array, self.mipmapped_array, 0)
        })?;
        Ok(*self.array_level0.get_or_init(|| array))
    }

    /// # Safety
    /// The pointer in `transfer` must cover the whole level 0 image, tightly packed, until the
    /// copy completes.
    pub(crate) unsafe fn copy(&self, transfer: Transfer, stream: hipStream_t, event: Option<hipEvent_t>) -> Result<()> {
        if self.geometry.slices != 1 {
            return Err(Error::UnsupportedOperation {
                backend: ComputeApi::Hip,
                operation: "3D or layered image copy",
            });
        }
        let array = self.array_level0()?;
        let row_bytes = self.geometry.row_bytes() as usize;
        let height = self.geometry.height as usize;
        let table = &self.driver.table;
        match transfer {
            Transfer::FromDevice(src) | Transfer::FromHost(src) => {
                let kind = if matches!(transfer, Transfer::FromHost(_)) {
                    hipMemcpyHostToDevice
                } else {
                    hipMemcpyDeviceToDevice
                };
                self.driver.check("hipMemcpy2DToArrayAsync", unsafe {
                    (table.hip_memcpy_2d_to_array_async)(array, 0, 0, src, row_bytes, row_bytes, height, kind, stream)
                })?;
            }
            Transfer::ToDevice(dst) | Transfer::ToHost(dst) => {
                let kind = if matches!(transfer, Transfer::ToHost(_)) {
                    hipMemcpyDeviceToHost
                } else {
                    hipMemcpyDeviceToDevice
                };
                self.driver.check("hipMemcpy2DFromArrayAsync", unsafe {
                    (table.hip_memcpy_2d_from_array_async)(dst, row_bytes, array, 0, 0, row_bytes, height, kind, stream)
                })?;
            }
        }
        self.driver.record_event(event, stream)
    }

    pub(crate) fn create_texture_object(&self, settings: &TextureSettings) -> Result<HipTextureObject> {
        let texture_desc = format::texture_desc(settings, self.format)?;
        let mut resource_desc = hipResourceDesc::zeroed();
        if self.mip_levels > 1 {
            resource_desc.resType = hipResourceTypeMipmappedArray;
            resource_desc.res.mipmap = self.mipmapped_array;
        } else {
            resource_desc.resType = hipResourceTypeArray;
            resource_desc.res.array = self.array_level0()?;
        }
        let mut texture: hipTextureObject_t = 0;
        self.driver.check("hipCreateTextureObject", unsafe {
            (self.driver.table.hip_create_texture_object)(&mut texture, &resource_desc, &texture_desc, std::ptr::null())
        })?;
        Ok(HipTextureObject {
            driver: self.driver.clone(),
            texture,
        })
    }

    pub(crate) fn create_surface_object(&self) -> Result<HipSurfaceObject> {
        let mut resource_desc = hipResourceDesc::zeroed();
        resource_desc.resType = hipResourceTypeArray;
        resource_desc.res.array = self.array_level0()?;
        let mut surface: hipSurfaceObject_t = 0;
        self.driver.check("hipCreateSurfaceObject", unsafe {
            (self.driver.table.hip_create_surface_object)(&mut surface, &resource_desc)
        })?;
        Ok(HipSurfaceObject {
            driver: self.driver.clone(),
            surface,
        })
    }
}

impl Drop for HipImage {
    fn drop(&mut self) {
        let table = &self.driver.table;
        if !self.mipmapped_array.is_null() {
            let _ = self.driver.check("hipFreeMipmappedArray", unsafe {
                (table.hip_free_mipmapped_array)(self.mipmapped_array)
            });
        }
        let _ = self
            .driver
            .check("hipDestroyExternalMemory", unsafe { (table.hip_destroy_external_memory)(self.external_memory) });
        logwise::trace_sync!("HIP external image freed");
    }
}

#[derive(Debug)]
pub struct HipTextureObject {
    driver: Arc<HipDriver>,
    texture: hipTextureObject_t,
}

impl HipTextureObject {
    pub fn raw(&self) -> hipTextureObject_t {
        self.texture
    }
}

impl Drop for HipTextureObject {
    fn drop(&mut self) {
        let _ = self.driver.check("hipDestroyTextureObject", unsafe {
            (self.driver.table.hip_destroy_texture_object)(self.texture)
        });
    }
}

#[derive(Debug)]
pub struct HipSurfaceObject {
    driver: Arc<HipDriver>,
    surface: hipSurfaceObject_t,
}

impl HipSurfaceObject {
    pub fn raw(&self) -> hipSurfaceObject_t {
        self.surface
    }
}

impl Drop for HipSurfaceObject {
    fn drop(&mut self) {
        let _ = self.driver.check("hipDestroySurfaceObject", unsafe {
            (self.driver.table.hip_destroy_surface_object)(self.surface)
        });
    }
}
