// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Vulkan memory imported into OpenCL through `cl_khr_external_memory`.
//!
//! OpenCL has no device pointers; the "device" side of a copy is always another `cl_mem`.

use std::ffi::c_void;
use std::sync::Arc;

use ash::vk;

use super::ffi::*;
use super::format;
use super::{OpenClEvent, OpenClInteropContext, enqueue_with_event};
use crate::error::{Error, Result};
use crate::handle::{ExportedHandle, RawExternalHandle};
use crate::interop::image::{ImageGeometry, ImageVkComputeApiInfo};
use crate::interop::{ComputeApi, TextureSettings, Transfer};
use crate::vulkan::{VulkanBuffer, VulkanImage};

/// Property list importing `handle` for the context's device.
fn import_properties(handle: RawExternalHandle, device: cl_device_id) -> [cl_mem_properties; 6] {
    let (key, value) = match handle {
        RawExternalHandle::Fd(fd) => (CL_EXTERNAL_MEMORY_HANDLE_OPAQUE_FD_KHR, fd as u32 as cl_mem_properties),
        RawExternalHandle::Win32(h) => (CL_EXTERNAL_MEMORY_HANDLE_OPAQUE_WIN32_KHR, h as usize as cl_mem_properties),
    };
    [
        key,
        value,
        CL_MEM_DEVICE_HANDLE_LIST_KHR,
        device as usize as cl_mem_properties,
        CL_MEM_DEVICE_HANDLE_LIST_END_KHR,
        0,
    ]
}

fn release_mem(context: &OpenClInteropContext, mem: cl_mem) {
    let driver = context.driver();
    //logged by check
    let _ = driver.check("clReleaseMemObject", unsafe { (driver.table.cl_release_mem_object)(mem) });
}

/// A Vulkan buffer imported as a `cl_mem` buffer.
#[derive(Debug)]
pub struct OpenClBuffer {
    context: Arc<OpenClInteropContext>,
    /// The whole imported allocation.
    memory: cl_mem,
    /// The buffer's range of `memory`, when it does not cover all of it.
    sub_buffer: Option<cl_mem>,
    size: u64,
}

impl OpenClBuffer {
    pub(crate) fn import(
        context: &Arc<OpenClInteropContext>,
        buffer: &dyn VulkanBuffer,
        handle: &mut ExportedHandle,
    ) -> Result<Self> {
        let driver = context.driver();
        let properties = import_properties(handle.raw(), context.device());
        let memory_size = buffer.device_memory_size();
        let mut status = CL_SUCCESS;
        let memory = unsafe {
            (driver.table.cl_create_buffer_with_properties)(
                context.context(),
                properties.as_ptr(),
                CL_MEM_READ_WRITE,
                memory_size as usize,
                std::ptr::null_mut(),
                &mut status,
            )
        };
        driver.check("clCreateBufferWithProperties", status)?;
        handle.release_after_import();
        logwise::trace_sync!("OpenCL imported external memory of {size} bytes", size = memory_size);
        let mut imported = OpenClBuffer {
            context: context.clone(),
            memory,
            sub_buffer: None,
            size: buffer.size_in_bytes(),
        };
        let offset = buffer.device_memory_offset();
        if offset != 0 || imported.size != memory_size {
            let region = cl_buffer_region {
                origin: offset as usize,
                size: imported.size as usize,
            };
            let sub = unsafe {
                (driver.table.cl_create_sub_buffer)(
                    memory,
                    CL_MEM_READ_WRITE,
                    CL_BUFFER_CREATE_TYPE_REGION,
                    &region as *const cl_buffer_region as *const c_void,
                    &mut status,
                )
            };
            driver.check("clCreateSubBuffer", status)?;
            imported.sub_buffer = Some(sub);
        }
        Ok(imported)
    }

    /// The `cl_mem` covering exactly the Vulkan buffer.
    pub fn mem(&self) -> cl_mem {
        self.sub_buffer.unwrap_or(self.memory)
    }

    /// # Safety
    /// Host pointers in `transfer` must be valid for the buffer size until the copy completes;
    /// device pointers must be `cl_mem` buffers at least that large.
    pub(crate) unsafe fn copy(
        &self,
        transfer: Transfer,
        queue: cl_command_queue,
        event: Option<&mut Option<OpenClEvent>>,
    ) -> Result<()> {
        let driver = self.context.driver();
        let table = &driver.table;
        let size = self.size as usize;
        let mem = self.mem();
        match transfer {
            Transfer::FromDevice(src) => enqueue_with_event(driver, "clEnqueueCopyBuffer", event, |e| unsafe {
                (table.cl_enqueue_copy_buffer)(queue, src as cl_mem, mem, 0, 0, size, 0, std::ptr::null(), e)
            }),
            Transfer::ToDevice(dst) => enqueue_with_event(driver, "clEnqueueCopyBuffer", event, |e| unsafe {
                (table.cl_enqueue_copy_buffer)(queue, mem, dst as cl_mem, 0, 0, size, 0, std::ptr::null(), e)
            }),
            Transfer::FromHost(src) => enqueue_with_event(driver, "clEnqueueWriteBuffer", event, |e| unsafe {
                (table.cl_enqueue_write_buffer)(queue, mem, CL_FALSE, 0, size, src, 0, std::ptr::null(), e)
            }),
            Transfer::ToHost(dst) => enqueue_with_event(driver, "clEnqueueReadBuffer", event, |e| unsafe {
                (table.cl_enqueue_read_buffer)(queue, mem, CL_FALSE, 0, size, dst, 0, std::ptr::null(), e)
            }),
        }
    }
}

impl Drop for OpenClBuffer {
    fn drop(&mut self) {
        if let Some(sub) = self.sub_buffer {
            release_mem(&self.context, sub);
        }
        release_mem(&self.context, self.memory);
        logwise::trace_sync!("OpenCL external buffer released");
    }
}

pub(crate) fn image_desc(geometry: &ImageGeometry, view_type: vk::ImageViewType) -> Result<cl_image_desc> {
    let image_type = format::image_type(view_type)?;
    let mut desc = cl_image_desc {
        image_type,
        image_width: geometry.width as usize,
        image_height: 1,
        image_depth: 1,
        image_array_size: 1,
        image_row_pitch: 0,
        image_slice_pitch: 0,
        num_mip_levels: 0,
        num_samples: 0,
        mem_object: std::ptr::null_mut(),
    };
    match image_type {
        CL_MEM_OBJECT_IMAGE1D_ARRAY => desc.image_array_size = geometry.slices as usize,
        CL_MEM_OBJECT_IMAGE2D => desc.image_height = geometry.height as usize,
        CL_MEM_OBJECT_IMAGE2D_ARRAY => {
            desc.image_height = geometry.height as usize;
            desc.image_array_size = geometry.slices as usize;
        }
        CL_MEM_OBJECT_IMAGE3D => {
            desc.image_height = geometry.height as usize;
            desc.image_depth = geometry.slices as usize;
        }
        _ => {}
    }
    Ok(desc)
}

/// The copy region of level 0, in OpenCL's `(width, height|layers, depth|layers)` convention.
pub(crate) fn image_region(geometry: &ImageGeometry, view_type: vk::ImageViewType) -> [usize; 3] {
    let width = geometry.width as usize;
    let height = geometry.height as usize;
    let slices = geometry.slices as usize;
    match view_type {
        vk::ImageViewType::TYPE_1D => [width, 1, 1],
        vk::ImageViewType::TYPE_1D_ARRAY => [width, slices, 1],
        vk::ImageViewType::TYPE_2D_ARRAY | vk::ImageViewType::TYPE_3D => [width, height, slices],
        _ => [width, height, 1],
    }
}

/// A Vulkan image imported as a `cl_mem` image.
#[derive(Debug)]
pub struct OpenClImage {
    context: Arc<OpenClInteropContext>,
    image: cl_mem,
    region: [usize; 3],
    bytes_per_pixel: u32,
}

impl OpenClImage {
    pub(crate) fn precheck(image: &dyn VulkanImage, info: &ImageVkComputeApiInfo) -> Result<()> {
        let settings = image.image_settings();
        format::image_format(settings.format)?;
        image_desc(&ImageGeometry::new(settings, info.view_type), info.view_type)?;
        if image.device_memory_offset() != 0 {
            return Err(Error::UnsupportedOperation {
                backend: ComputeApi::OpenCl,
                operation: "image import at a non-zero memory offset",
            });
        }
        Ok(())
    }

    pub(crate) fn import(
        context: &Arc<OpenClInteropContext>,
        image: &dyn VulkanImage,
        info: &ImageVkComputeApiInfo,
        handle: &mut ExportedHandle,
    ) -> Result<Self> {
        Self::precheck(image, info)?;
        let settings = image.image_settings();
        let geometry = ImageGeometry::new(settings, info.view_type);
        let image_format = format::image_format(settings.format)?;
        let desc = image_desc(&geometry, info.view_type)?;
        let properties = import_properties(handle.raw(), context.device());
        let driver = context.driver();
        let mut status = CL_SUCCESS;
        let mem = unsafe {
            (driver.table.cl_create_image_with_properties)(
                context.context(),
                properties.as_ptr(),
                CL_MEM_READ_WRITE,
                &image_format,
                &desc,
                std::ptr::null_mut(),
                &mut status,
            )
        };
        if status == CL_IMAGE_FORMAT_NOT_SUPPORTED {
            logwise::warn_sync!(
                "OpenCL device rejected image format {format}",
                format = logwise::privacy::LogIt(&settings.format)
            );
            return Err(Error::UnsupportedFormat {
                backend: ComputeApi::OpenCl,
                format: settings.format,
            });
        }
        driver.check("clCreateImageWithProperties", status)?;
        handle.release_after_import();
        logwise::trace_sync!(
            "OpenCL imported external image {width}x{height}",
            width = geometry.width,
            height = geometry.height
        );
        Ok(OpenClImage {
            context: context.clone(),
            image: mem,
            region: image_region(&geometry, info.view_type),
            bytes_per_pixel: geometry.bytes_per_pixel,
        })
    }

    pub fn mem(&self) -> cl_mem {
        self.image
    }

    /// Size in bytes of a tightly packed copy of level 0.
    pub fn packed_size(&self) -> usize {
        self.region.iter().product::<usize>() * self.bytes_per_pixel as usize
    }

    /// # Safety
    /// Host pointers in `transfer` must cover the tightly packed level 0 image until the copy
    /// completes; device pointers must be `cl_mem` buffers at least that large.
    pub(crate) unsafe fn copy(
        &self,
        transfer: Transfer,
        queue: cl_command_queue,
        event: Option<&mut Option<OpenClEvent>>,
    ) -> Result<()> {
        let driver = self.context.driver();
        let table = &driver.table;
        let origin = [0usize; 3];
        let region = self.region;
        let image = self.image;
        match transfer {
            Transfer::FromDevice(src) => enqueue_with_event(driver, "clEnqueueCopyBufferToImage", event, |e| unsafe {
                (table.cl_enqueue_copy_buffer_to_image)(
                    queue,
                    src as cl_mem,
                    image,
                    0,
                    origin.as_ptr(),
                    region.as_ptr(),
                    0,
                    std::ptr::null(),
                    e,
                )
            }),
            Transfer::ToDevice(dst) => enqueue_with_event(driver, "clEnqueueCopyImageToBuffer", event, |e| unsafe {
                (table.cl_enqueue_copy_image_to_buffer)(
                    queue,
                    image,
                    dst as cl_mem,
                    origin.as_ptr(),
                    region.as_ptr(),
                    0,
                    0,
                    std::ptr::null(),
                    e,
                )
            }),
            Transfer::FromHost(src) => enqueue_with_event(driver, "clEnqueueWriteImage", event, |e| unsafe {
                (table.cl_enqueue_write_image)(
                    queue,
                    image,
                    CL_FALSE,
                    origin.as_ptr(),
                    region.as_ptr(),
                    0,
                    0,
                    src,
                    0,
                    std::ptr::null(),
                    e,
                )
            }),
            Transfer::ToHost(dst) => enqueue_with_event(driver, "clEnqueueReadImage", event, |e| unsafe {
                (table.cl_enqueue_read_image)(
                    queue,
                    image,
                    CL_FALSE,
                    origin.as_ptr(),
                    region.as_ptr(),
                    0,
                    0,
                    dst,
                    0,
                    std::ptr::null(),
                    e,
                )
            }),
        }
    }

    pub(crate) fn create_sampler(&self, settings: &TextureSettings) -> Result<OpenClSampler> {
        let properties = format::sampler_properties(settings)?;
        let driver = self.context.driver();
        let mut status = CL_SUCCESS;
        let sampler = unsafe {
            (driver.table.cl_create_sampler_with_properties)(self.context.context(), properties.as_ptr(), &mut status)
        };
        driver.check("clCreateSamplerWithProperties", status)?;
        Ok(OpenClSampler {
            context: self.context.clone(),
            sampler,
        })
    }
}

impl Drop for OpenClImage {
    fn drop(&mut self) {
        release_mem(&self.context, self.image);
        logwise::trace_sync!("OpenCL external image released");
    }
}

#[derive(Debug)]
pub struct OpenClSampler {
    context: Arc<OpenClInteropContext>,
    sampler: cl_sampler,
}

impl OpenClSampler {
    pub fn raw(&self) -> cl_sampler {
        self.sampler
    }
}

impl Drop for OpenClSampler {
    fn drop(&mut self) {
        let driver = self.context.driver();
        let _ = driver.check("clReleaseSampler", unsafe { (driver.table.cl_release_sampler)(self.sampler) });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vulkan::ImageSettings;

    fn geometry(view_type: vk::ImageViewType, depth: u32, layers: u32) -> ImageGeometry {
        let settings = ImageSettings {
            width: 64,
            height: 32,
            depth,
            array_layers: layers,
            image_type: if depth > 1 { vk::ImageType::TYPE_3D } else { vk::ImageType::TYPE_2D },
            ..ImageSettings::default()
        };
        ImageGeometry::new(&settings, view_type)
    }

    #[test]
    fn regions_follow_view_type() {
        let layered = geometry(vk::ImageViewType::TYPE_2D_ARRAY, 1, 6);
        assert_eq!(image_region(&layered, vk::ImageViewType::TYPE_2D_ARRAY), [64, 32, 6]);
        let volume = geometry(vk::ImageViewType::TYPE_3D, 8, 1);
        assert_eq!(image_region(&volume, vk::ImageViewType::TYPE_3D), [64, 32, 8]);
        let flat = geometry(vk::ImageViewType::TYPE_2D, 1, 1);
        assert_eq!(image_region(&flat, vk::ImageViewType::TYPE_2D), [64, 32, 1]);
        assert_eq!(image_region(&flat, vk::ImageViewType::TYPE_1D), [64, 1, 1]);
    }

    #[test]
    fn descs_put_layers_in_array_size() {
        let layered = geometry(vk::ImageViewType::TYPE_2D_ARRAY, 1, 6);
        let desc = image_desc(&layered, vk::ImageViewType::TYPE_2D_ARRAY).unwrap();
        assert_eq!(desc.image_type, CL_MEM_OBJECT_IMAGE2D_ARRAY);
        assert_eq!((desc.image_height, desc.image_depth, desc.image_array_size), (32, 1, 6));
        let volume = geometry(vk::ImageViewType::TYPE_3D, 8, 1);
        let desc = image_desc(&volume, vk::ImageViewType::TYPE_3D).unwrap();
        assert_eq!((desc.image_depth, desc.image_array_size), (8, 1));
        assert!(image_desc(&layered, vk::ImageViewType::CUBE).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn import_properties_are_terminated() {
        let device = 0x1234usize as cl_device_id;
        let props = import_properties(RawExternalHandle::Fd(9), device);
        assert_eq!(props[0], CL_EXTERNAL_MEMORY_HANDLE_OPAQUE_FD_KHR);
        assert_eq!(props[1], 9);
        assert_eq!(props[3], 0x1234);
        assert_eq!(&props[4..], &[CL_MEM_DEVICE_HANDLE_LIST_END_KHR, 0]);
    }
}
