// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Vulkan memory imported into CUDA.

use std::cell::OnceCell;
use std::sync::Arc;

use ash::vk;

use super::CudaDriver;
use super::ffi::*;
use super::format;
use crate::error::{Error, Result};
use crate::handle::{ExportedHandle, RawExternalHandle};
use crate::interop::image::{ImageGeometry, ImageVkComputeApiInfo, is_cube, is_layered, subresource_span};
use crate::interop::{ComputeApi, TextureSettings, Transfer};
use crate::vulkan::{VulkanBuffer, VulkanImage};

fn memory_handle_desc(handle: RawExternalHandle, size: u64, dedicated: bool) -> CUDA_EXTERNAL_MEMORY_HANDLE_DESC {
    let mut desc = CUDA_EXTERNAL_MEMORY_HANDLE_DESC::zeroed();
    match handle {
        RawExternalHandle::Fd(fd) => {
            desc.type_ = CU_EXTERNAL_MEMORY_HANDLE_TYPE_OPAQUE_FD;
            desc.handle.fd = fd;
        }
        RawExternalHandle::Win32(handle) => {
            desc.type_ = CU_EXTERNAL_MEMORY_HANDLE_TYPE_OPAQUE_WIN32;
            desc.handle.win32 = CudaWin32Handle {
                handle,
                name: std::ptr::null(),
            };
        }
    }
    desc.size = size;
    if dedicated {
        desc.flags |= CUDA_EXTERNAL_MEMORY_DEDICATED;
    }
    desc
}

/// Imports the exported memory, applying the ownership transfer on success.
fn import_external_memory(
    driver: &CudaDriver,
    handle: &mut ExportedHandle,
    size: u64,
    dedicated: bool,
) -> Result<CUexternalMemory> {
    let desc = memory_handle_desc(handle.raw(), size, dedicated);
    let mut external_memory: CUexternalMemory = std::ptr::null_mut();
    driver.check("cuImportExternalMemory", unsafe {
        (driver.table.cu_import_external_memory)(&mut external_memory, &desc)
    })?;
    handle.release_after_import();
    logwise::trace_sync!("CUDA imported external memory of {size} bytes", size = size);
    Ok(external_memory)
}

/// A Vulkan buffer mapped into the CUDA address space.
#[derive(Debug)]
pub struct CudaBuffer {
    driver: Arc<CudaDriver>,
    external_memory: CUexternalMemory,
    device_ptr: CUdeviceptr,
    size: u64,
}

impl CudaBuffer {
    pub(crate) fn import(driver: &Arc<CudaDriver>, buffer: &dyn VulkanBuffer, handle: &mut ExportedHandle) -> Result<Self> {
        let external_memory = import_external_memory(
            driver,
            handle,
            buffer.device_memory_size(),
            buffer.is_dedicated_allocation(),
        )?;
        let mut imported = CudaBuffer {
            driver: driver.clone(),
            external_memory,
            device_ptr: 0,
            size: buffer.size_in_bytes(),
        };
        let buffer_desc = CUDA_EXTERNAL_MEMORY_BUFFER_DESC {
            offset: buffer.device_memory_offset(),
            size: buffer.size_in_bytes(),
            ..Default::default()
        };
        driver.check("cuExternalMemoryGetMappedBuffer", unsafe {
            (driver.table.cu_external_memory_get_mapped_buffer)(&mut imported.device_ptr, external_memory, &buffer_desc)
        })?;
        Ok(imported)
    }

    pub fn device_ptr(&self) -> CUdeviceptr {
        self.device_ptr
    }

    /// # Safety
    /// The pointer in `transfer` must be valid for the whole buffer size until the copy completes.
    pub(crate) unsafe fn copy(&self, transfer: Transfer, stream: CUstream, event: Option<CUevent>) -> Result<()> {
        let size = self.size as usize;
        let table = &self.driver.table;
        match transfer {
            Transfer::FromDevice(src) => self.driver.check("cuMemcpyDtoDAsync", unsafe {
                (table.cu_memcpy_dtod_async)(self.device_ptr, src as CUdeviceptr, size, stream)
            })?,
            Transfer::ToDevice(dst) => self.driver.check("cuMemcpyDtoDAsync", unsafe {
                (table.cu_memcpy_dtod_async)(dst as CUdeviceptr, self.device_ptr, size, stream)
            })?,
            Transfer::FromHost(src) => self.driver.check("cuMemcpyHtoDAsync", unsafe {
                (table.cu_memcpy_htod_async)(self.device_ptr, src, size, stream)
            })?,
            Transfer::ToHost(dst) => self.driver.check("cuMemcpyDtoHAsync", unsafe {
                (table.cu_memcpy_dtoh_async)(dst, self.device_ptr, size, stream)
            })?,
        }
        self.driver.record_event(event, stream)
    }
}

impl Drop for CudaBuffer {
    fn drop(&mut self) {
        let table = &self.driver.table;
        //failures are logged by check
        if self.device_ptr != 0 {
            let _ = self.driver.check("cuMemFree", unsafe { (table.cu_mem_free)(self.device_ptr) });
        }
        let _ = self
            .driver
            .check("cuDestroyExternalMemory", unsafe { (table.cu_destroy_external_memory)(self.external_memory) });
        logwise::trace_sync!("CUDA external buffer freed");
    }
}

/// The CUDA array descriptor for an image with `info`'s view.
pub(crate) fn array_descriptor(
    geometry: &ImageGeometry,
    vk_format: vk::Format,
    info: &ImageVkComputeApiInfo,
) -> Result<CUDA_ARRAY3D_DESCRIPTOR> {
    let (array_format, channels) = format::array_format(vk_format)?;
    let mut flags = 0;
    if is_layered(info.view_type) {
        flags |= CUDA_ARRAY3D_LAYERED;
    }
    if is_cube(info.view_type) {
        flags |= CUDA_ARRAY3D_CUBEMAP;
    }
    if info.surface_load_store {
        flags |= CUDA_ARRAY3D_SURFACE_LDST;
    }
    let one_dimensional = matches!(info.view_type, vk::ImageViewType::TYPE_1D | vk::ImageViewType::TYPE_1D_ARRAY);
    let depth = if info.view_type == vk::ImageViewType::TYPE_3D || flags & (CUDA_ARRAY3D_LAYERED | CUDA_ARRAY3D_CUBEMAP) != 0 {
        geometry.slices as usize
    } else {
        0
    };
    Ok(CUDA_ARRAY3D_DESCRIPTOR {
        Width: geometry.width as usize,
        Height: if one_dimensional { 0 } else { geometry.height as usize },
        Depth: depth,
        Format: array_format,
        NumChannels: channels,
        Flags: flags,
    })
}

/// A Vulkan image mapped as a CUDA mipmapped array.
#[derive(Debug)]
pub struct CudaImage {
    driver: Arc<CudaDriver>,
    external_memory: CUexternalMemory,
    mipmapped_array: CUmipmappedArray,
    array_level0: OnceCell<CUarray>,
    geometry: ImageGeometry,
    format: vk::Format,
    mip_levels: u32,
}

impl CudaImage {
    /// Checks what can be checked before a handle is exported.
    pub(crate) fn precheck(image: &dyn VulkanImage, info: &ImageVkComputeApiInfo) -> Result<()> {
        let settings = image.image_settings();
        array_descriptor(&ImageGeometry::new(settings, info.view_type), settings.format, info).map(|_| ())
    }

    pub(crate) fn import(
        driver: &Arc<CudaDriver>,
        image: &dyn VulkanImage,
        info: &ImageVkComputeApiInfo,
        handle: &mut ExportedHandle,
    ) -> Result<Self> {
        let settings = image.image_settings();
        let geometry = ImageGeometry::new(settings, info.view_type);
        let array_desc = array_descriptor(&geometry, settings.format, info)?;
        let external_memory = import_external_memory(
            driver,
            handle,
            image.device_memory_size(),
            image.is_dedicated_allocation(),
        )?;
        let mut imported = CudaImage {
            driver: driver.clone(),
            external_memory,
            mipmapped_array: std::ptr::null_mut(),
            array_level0: OnceCell::new(),
            geometry,
            format: settings.format,
            mip_levels: settings.mip_levels,
        };
        let desc = CUDA_EXTERNAL_MEMORY_MIPMAPPED_ARRAY_DESC {
            offset: image.device_memory_offset(),
            arrayDesc: array_desc,
            numLevels: settings.mip_levels,
            ..Default::default()
        };
        let result = unsafe {
            (driver.table.cu_external_memory_get_mapped_mipmapped_array)(&mut imported.mipmapped_array, external_memory, &desc)
        };
        if result == CUDA_ERROR_INVALID_VALUE {
            logwise::warn_sync!(
                "CUDA rejected the mipmapped array for view type {view_type}",
                view_type = logwise::privacy::LogIt(&info.view_type),
                desc = logwise::privacy::LogIt(&array_desc)
            );
            return Err(Error::UnsupportedImageType {
                backend: ComputeApi::Cuda,
                view_type: info.view_type,
            });
        }
        driver.check("cuExternalMemoryGetMappedMipmappedArray", result)?;
        Ok(imported)
    }

    pub fn mipmapped_array(&self) -> CUmipmappedArray {
        self.mipmapped_array
    }

    /// Mip level 0 of the mipmapped array; queried once, then cached for the life of the image.
    pub fn array_level0(&self) -> Result<CUarray> {
        if let Some(array) = self.array_level0.get() {
            return Ok(*array);
        }
        let mut array: CUarray = std::ptr::null_mut();
        self.driver.check("cuMipmappedArrayGetLevel", unsafe {
            (self.driver.table.cu_mipmapped_array_get_level)(&mut array, self.mipmapped_array, 0)
        })?;
        Ok(*self.array_level0.get_or_init(|| array))
    }

    /// # Safety
    /// The pointer in `transfer` must cover the whole level 0 image, tightly packed, until the
    /// copy completes.
    pub(crate) unsafe fn copy(&self, transfer: Transfer, stream: CUstream, event: Option<CUevent>) -> Result<()> {
        let array = self.array_level0()?;
        let row_bytes = self.geometry.row_bytes() as usize;
        let height = self.geometry.height as usize;
        if self.geometry.slices == 1 {
            let mut copy = CUDA_MEMCPY2D::zeroed();
            copy.WidthInBytes = row_bytes;
            copy.Height = height;
            match transfer {
                Transfer::FromDevice(src) => {
                    copy.srcMemoryType = CU_MEMORYTYPE_DEVICE;
                    copy.srcDevice = src as CUdeviceptr;
                    copy.srcPitch = row_bytes;
                    copy.dstMemoryType = CU_MEMORYTYPE_ARRAY;
                    copy.dstArray = array;
                }
                Transfer::FromHost(src) => {
                    copy.srcMemoryType = CU_MEMORYTYPE_HOST;
                    copy.srcHost = src;
                    copy.srcPitch = row_bytes;
                    copy.dstMemoryType = CU_MEMORYTYPE_ARRAY;
                    copy.dstArray = array;
                }
                Transfer::ToDevice(dst) => {
                    copy.srcMemoryType = CU_MEMORYTYPE_ARRAY;
                    copy.srcArray = array;
                    copy.dstMemoryType = CU_MEMORYTYPE_DEVICE;
                    copy.dstDevice = dst as CUdeviceptr;
                    copy.dstPitch = row_bytes;
                }
                Transfer::ToHost(dst) => {
                    copy.srcMemoryType = CU_MEMORYTYPE_ARRAY;
                    copy.srcArray = array;
                    copy.dstMemoryType = CU_MEMORYTYPE_HOST;
                    copy.dstHost = dst;
                    copy.dstPitch = row_bytes;
                }
            }
            self.driver.check("cuMemcpy2DAsync", unsafe {
                (self.driver.table.cu_memcpy_2d_async)(&copy, stream)
            })?;
        } else {
            let mut copy = CUDA_MEMCPY3D::zeroed();
            copy.WidthInBytes = row_bytes;
            copy.Height = height;
            copy.Depth = self.geometry.slices as usize;
            match transfer {
                Transfer::FromDevice(src) => {
                    copy.srcMemoryType = CU_MEMORYTYPE_DEVICE;
                    copy.srcDevice = src as CUdeviceptr;
                    copy.srcPitch = row_bytes;
                    copy.srcHeight = height;
                    copy.dstMemoryType = CU_MEMORYTYPE_ARRAY;
                    copy.dstArray = array;
                }
                Transfer::FromHost(src) => {
                    copy.srcMemoryType = CU_MEMORYTYPE_HOST;
                    copy.srcHost = src;
                    copy.srcPitch = row_bytes;
                    copy.srcHeight = height;
                    copy.dstMemoryType = CU_MEMORYTYPE_ARRAY;
                    copy.dstArray = array;
                }
                Transfer::ToDevice(dst) => {
                    copy.srcMemoryType = CU_MEMORYTYPE_ARRAY;
                    copy.srcArray = array;
                    copy.dstMemoryType = CU_MEMORYTYPE_DEVICE;
                    copy.dstDevice = dst as CUdeviceptr;
                    copy.dstPitch = row_bytes;
                    copy.dstHeight = height;
                }
                Transfer::ToHost(dst) => {
                    copy.srcMemoryType = CU_MEMORYTYPE_ARRAY;
                    copy.srcArray = array;
                    copy.dstMemoryType = CU_MEMORYTYPE_HOST;
                    copy.dstHost = dst;
                    copy.dstPitch = row_bytes;
                    copy.dstHeight = height;
                }
            }
            self.driver.check("cuMemcpy3DAsync", unsafe {
                (self.driver.table.cu_memcpy_3d_async)(&copy, stream)
            })?;
        }
        self.driver.record_event(event, stream)
    }

    /// A texture object sampling this image.
    pub(crate) fn create_texture_object(
        &self,
        settings: &TextureSettings,
        info: &ImageVkComputeApiInfo,
    ) -> Result<CudaTextureObject> {
        let texture_desc = format::texture_desc(settings, self.format)?;
        let mut resource_desc = CUDA_RESOURCE_DESC::zeroed();
        if self.mip_levels > 1 {
            resource_desc.resType = CU_RESOURCE_TYPE_MIPMAPPED_ARRAY;
            resource_desc.res.mipmap = self.mipmapped_array;
        } else {
            resource_desc.resType = CU_RESOURCE_TYPE_ARRAY;
            resource_desc.res.array = self.array_level0()?;
        }
        let range = info.subresource_range;
        let (first_level, last_level) = subresource_span(range.base_mip_level, range.level_count, self.mip_levels.max(1))?;
        let (first_layer, last_layer) = subresource_span(range.base_array_layer, range.layer_count, self.geometry.slices)?;
        let view_desc = CUDA_RESOURCE_VIEW_DESC {
            format: format::resource_view_format(self.format)?,
            width: self.geometry.width as usize,
            height: self.geometry.height as usize,
            depth: if self.geometry.slices > 1 { self.geometry.slices as usize } else { 0 },
            firstMipmapLevel: first_level,
            lastMipmapLevel: last_level,
            firstLayer: first_layer,
            lastLayer: last_layer,
            reserved: [0; 16],
        };
        let mut texture: CUtexObject = 0;
        self.driver.check("cuTexObjectCreate", unsafe {
            (self.driver.table.cu_tex_object_create)(&mut texture, &resource_desc, &texture_desc, &view_desc)
        })?;
        Ok(CudaTextureObject {
            driver: self.driver.clone(),
            texture,
        })
    }

    /// A surface object over mip level 0.  The array must have been imported with surface
    /// load/store enabled.
    pub(crate) fn create_surface_object(&self) -> Result<CudaSurfaceObject> {
        let mut resource_desc = CUDA_RESOURCE_DESC::zeroed();
        resource_desc.resType = CU_RESOURCE_TYPE_ARRAY;
        resource_desc.res.array = self.array_level0()?;
        let mut surface: CUsurfObject = 0;
        self.driver.check("cuSurfObjectCreate", unsafe {
            (self.driver.table.cu_surf_object_create)(&mut surface, &resource_desc)
        })?;
        Ok(CudaSurfaceObject {
            driver: self.driver.clone(),
            surface,
        })
    }
}

impl Drop for CudaImage {
    fn drop(&mut self) {
        let table = &self.driver.table;
        if !self.mipmapped_array.is_null() {
            let _ = self.driver.check("cuMipmappedArrayDestroy", unsafe {
                (table.cu_mipmapped_array_destroy)(self.mipmapped_array)
            });
        }
        let _ = self
            .driver
            .check("cuDestroyExternalMemory", unsafe { (table.cu_destroy_external_memory)(self.external_memory) });
        logwise::trace_sync!("CUDA external image freed");
    }
}

#[derive(Debug)]
pub struct CudaTextureObject {
    driver: Arc<CudaDriver>,
    texture: CUtexObject,
}

impl CudaTextureObject {
    pub fn raw(&self) -> CUtexObject {
        self.texture
    }
}

impl Drop for CudaTextureObject {
    fn drop(&mut self) {
        let _ = self
            .driver
            .check("cuTexObjectDestroy", unsafe { (self.driver.table.cu_tex_object_destroy)(self.texture) });
    }
}

#[derive(Debug)]
pub struct CudaSurfaceObject {
    driver: Arc<CudaDriver>,
    surface: CUsurfObject,
}

impl CudaSurfaceObject {
    pub fn raw(&self) -> CUsurfObject {
        self.surface
    }
}

impl Drop for CudaSurfaceObject {
    fn drop(&mut self) {
        let _ = self
            .driver
            .check("cuSurfObjectDestroy", unsafe { (self.driver.table.cu_surf_object_destroy)(self.surface) });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vulkan::ImageSettings;

    fn info(view_type: vk::ImageViewType, surface_load_store: bool) -> ImageVkComputeApiInfo {
        ImageVkComputeApiInfo {
            view_type,
            surface_load_store,
            ..ImageVkComputeApiInfo::default()
        }
    }

    #[test]
    fn plain_2d_array_has_no_depth() {
        let settings = ImageSettings {
            width: 64,
            height: 32,
            ..ImageSettings::default()
        };
        let geometry = ImageGeometry::new(&settings, vk::ImageViewType::TYPE_2D);
        let desc = array_descriptor(&geometry, settings.format, &info(vk::ImageViewType::TYPE_2D, false)).unwrap();
        assert_eq!((desc.Width, desc.Height, desc.Depth), (64, 32, 0));
        assert_eq!(desc.Flags, 0);
        assert_eq!(desc.NumChannels, 4);
    }

    #[test]
    fn cube_and_layered_flags() {
        let settings = ImageSettings {
            width: 16,
            height: 16,
            array_layers: 6,
            ..ImageSettings::default()
        };
        let geometry = ImageGeometry::new(&settings, vk::ImageViewType::CUBE);
        let desc = array_descriptor(&geometry, settings.format, &info(vk::ImageViewType::CUBE, true)).unwrap();
        assert_eq!(desc.Depth, 6);
        assert_eq!(desc.Flags, CUDA_ARRAY3D_CUBEMAP | CUDA_ARRAY3D_SURFACE_LDST);

        let geometry = ImageGeometry::new(&settings, vk::ImageViewType::TYPE_2D_ARRAY);
        let desc = array_descriptor(&geometry, settings.format, &info(vk::ImageViewType::TYPE_2D_ARRAY, false)).unwrap();
        assert_eq!(desc.Flags, CUDA_ARRAY3D_LAYERED);
        assert_eq!(desc.Depth, 6);
    }

    #[test]
    fn one_dimensional_has_no_height() {
        let settings = ImageSettings {
            width: 128,
            image_type: vk::ImageType::TYPE_1D,
            ..ImageSettings::default()
        };
        let geometry = ImageGeometry::new(&settings, vk::ImageViewType::TYPE_1D);
        let desc = array_descriptor(&geometry, settings.format, &info(vk::ImageViewType::TYPE_1D, false)).unwrap();
        assert_eq!((desc.Width, desc.Height, desc.Depth), (128, 0, 0));
    }

    #[test]
    fn dedicated_flag_and_offsetless_handle() {
        let desc = memory_handle_desc(RawExternalHandle::Fd(7), 4096, true);
        assert_eq!(desc.type_, CU_EXTERNAL_MEMORY_HANDLE_TYPE_OPAQUE_FD);
        assert_eq!(unsafe { desc.handle.fd }, 7);
        assert_eq!(desc.size, 4096);
        assert_eq!(desc.flags, CUDA_EXTERNAL_MEMORY_DEDICATED);
        let shared = memory_handle_desc(RawExternalHandle::Fd(7), 4096, false);
        assert_eq!(shared.flags, 0);
    }
}
