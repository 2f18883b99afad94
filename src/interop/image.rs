// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Vulkan images shared with a compute backend.

use std::ffi::c_void;
use std::sync::Arc;

use ash::vk;

use super::{Attached, Backend, ComputeApi, Transfer};
use crate::error::{Error, Result};
use crate::format::{DepthStencil, format_info};
use crate::handle::ExportedHandle;
use crate::imp::cuda::CudaPrimaryContext;
use crate::imp::cuda::ffi::{CUmipmappedArray, CUsurfObject, CUtexObject};
use crate::imp::cuda::memory::{CudaImage, CudaSurfaceObject, CudaTextureObject};
use crate::imp::hip::ffi::{hipMipmappedArray_t, hipSurfaceObject_t, hipTextureObject_t};
use crate::imp::hip::memory::{HipImage, HipSurfaceObject, HipTextureObject};
use crate::imp::level_zero::ffi::{ze_image_handle_t, ze_sampler_handle_t};
use crate::imp::level_zero::memory::{LevelZeroImage, LevelZeroSampler};
use crate::imp::opencl::ffi::{cl_mem, cl_sampler};
use crate::imp::opencl::memory::{OpenClImage, OpenClSampler};
use crate::imp::sycl::{SyclImage, SyclImageDescriptor, SyclImageMemory};
use crate::stream::{self, CompletionEvent, StreamWrapper};
use crate::vulkan::{ImageSettings, VulkanImage};

/// Level 0 extent of an image as seen through one view type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageGeometry {
    pub width: u32,
    pub height: u32,
    /// Depth for 3D views, layer count (faces included) otherwise.
    pub slices: u32,
    /// 0 when the format is not one we know.
    pub bytes_per_pixel: u32,
}

impl ImageGeometry {
    pub fn new(settings: &ImageSettings, view_type: vk::ImageViewType) -> Self {
        let slices = if view_type == vk::ImageViewType::TYPE_3D {
            settings.depth
        } else {
            settings.array_layers
        };
        ImageGeometry {
            width: settings.width.max(1),
            height: settings.height.max(1),
            slices: slices.max(1),
            bytes_per_pixel: format_info(settings.format).map(|f| f.bytes_per_pixel()).unwrap_or(0),
        }
    }

    pub fn row_bytes(&self) -> u64 {
        self.width as u64 * self.bytes_per_pixel as u64
    }

    /// Bytes of a tightly packed copy of level 0.
    pub fn packed_size(&self) -> u64 {
        self.row_bytes() * self.height as u64 * self.slices as u64
    }
}

pub(crate) fn is_layered(view_type: vk::ImageViewType) -> bool {
    matches!(
        view_type,
        vk::ImageViewType::TYPE_1D_ARRAY | vk::ImageViewType::TYPE_2D_ARRAY | vk::ImageViewType::CUBE_ARRAY
    )
}

pub(crate) fn is_cube(view_type: vk::ImageViewType) -> bool {
    matches!(view_type, vk::ImageViewType::CUBE | vk::ImageViewType::CUBE_ARRAY)
}

/// First and last index of a mip or layer range out of `available`.
///
/// `count` may be the Vulkan "remaining" sentinel (`vk::REMAINING_MIP_LEVELS`,
/// `vk::REMAINING_ARRAY_LAYERS`), meaning everything from `base` on.
pub(crate) fn subresource_span(base: u32, count: u32, available: u32) -> Result<(u32, u32)> {
    let resolved = if count == vk::REMAINING_MIP_LEVELS || count == vk::REMAINING_ARRAY_LAYERS {
        available.saturating_sub(base)
    } else {
        count
    };
    match base.checked_add(resolved) {
        Some(end) if resolved > 0 && end <= available => Ok((base, end - 1)),
        _ => Err(Error::InvalidSubresourceRange {
            base,
            count,
            available,
        }),
    }
}

/// Sampler state for a sampled image.  Vulkan enums are translated per backend; modes a
/// backend cannot express fail with an unsupported error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureSettings {
    pub min_filter: vk::Filter,
    pub mag_filter: vk::Filter,
    pub mipmap_mode: vk::SamplerMipmapMode,
    pub address_mode_u: vk::SamplerAddressMode,
    pub address_mode_v: vk::SamplerAddressMode,
    pub address_mode_w: vk::SamplerAddressMode,
    pub border_color: [f32; 4],
    pub max_anisotropy: u32,
    pub mip_lod_bias: f32,
    pub min_lod: f32,
    pub max_lod: f32,
    pub use_normalized_coordinates: bool,
    /// Return raw integer texels instead of normalized floats.
    pub read_as_integer: bool,
}

impl Default for TextureSettings {
    fn default() -> Self {
        TextureSettings {
            min_filter: vk::Filter::LINEAR,
            mag_filter: vk::Filter::LINEAR,
            mipmap_mode: vk::SamplerMipmapMode::LINEAR,
            address_mode_u: vk::SamplerAddressMode::CLAMP_TO_EDGE,
            address_mode_v: vk::SamplerAddressMode::CLAMP_TO_EDGE,
            address_mode_w: vk::SamplerAddressMode::CLAMP_TO_EDGE,
            border_color: [0.0; 4],
            max_anisotropy: 1,
            mip_lod_bias: 0.0,
            min_lod: 0.0,
            max_lod: vk::LOD_CLAMP_NONE,
            use_normalized_coordinates: true,
            read_as_integer: false,
        }
    }
}

impl TextureSettings {
    /// Set the minification and magnification filter.
    pub fn with_filter(mut self, filter: vk::Filter) -> Self {
        self.min_filter = filter;
        self.mag_filter = filter;
        self
    }

    /// Set the address mode on all three axes.
    pub fn with_address_mode(mut self, mode: vk::SamplerAddressMode) -> Self {
        self.address_mode_u = mode;
        self.address_mode_v = mode;
        self.address_mode_w = mode;
        self
    }

    /// Set whether coordinates are normalized to `[0, 1)`.
    pub fn with_normalized_coordinates(mut self, normalized: bool) -> Self {
        self.use_normalized_coordinates = normalized;
        self
    }
}

/// How an image is viewed by the compute backend.
#[derive(Debug, Clone, Copy)]
pub struct ImageVkComputeApiInfo {
    pub view_type: vk::ImageViewType,
    pub subresource_range: vk::ImageSubresourceRange,
    /// Import with kernel write (surface) access.
    pub surface_load_store: bool,
    /// Sampler state for sampled images; defaults are used when absent.
    pub texture_settings: Option<TextureSettings>,
}

impl Default for ImageVkComputeApiInfo {
    fn default() -> Self {
        ImageVkComputeApiInfo {
            view_type: vk::ImageViewType::TYPE_2D,
            subresource_range: vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            },
            surface_load_store: false,
            texture_settings: None,
        }
    }
}

impl ImageVkComputeApiInfo {
    /// The info describing every level and layer of an image created with `settings`.
    pub fn for_image(settings: &ImageSettings) -> Self {
        let layered = settings.array_layers > 1;
        let view_type = match settings.image_type {
            vk::ImageType::TYPE_1D if layered => vk::ImageViewType::TYPE_1D_ARRAY,
            vk::ImageType::TYPE_1D => vk::ImageViewType::TYPE_1D,
            vk::ImageType::TYPE_3D => vk::ImageViewType::TYPE_3D,
            _ if layered => vk::ImageViewType::TYPE_2D_ARRAY,
            _ => vk::ImageViewType::TYPE_2D,
        };
        let aspect_mask = match format_info(settings.format).map(|f| f.depth_stencil) {
            Some(DepthStencil::Depth) | Some(DepthStencil::DepthStencil) => vk::ImageAspectFlags::DEPTH,
            _ => vk::ImageAspectFlags::COLOR,
        };
        ImageVkComputeApiInfo {
            view_type,
            subresource_range: vk::ImageSubresourceRange {
                aspect_mask,
                base_mip_level: 0,
                level_count: settings.mip_levels.max(1),
                base_array_layer: 0,
                layer_count: settings.array_layers.max(1),
            },
            surface_load_store: settings.usage.contains(vk::ImageUsageFlags::STORAGE),
            texture_settings: settings
                .usage
                .contains(vk::ImageUsageFlags::SAMPLED)
                .then(TextureSettings::default),
        }
    }

    /// Set the view type.
    pub fn with_view_type(mut self, view_type: vk::ImageViewType) -> Self {
        self.view_type = view_type;
        self
    }

    /// Set the sampler state used by sampled images.
    pub fn with_texture_settings(mut self, settings: TextureSettings) -> Self {
        self.texture_settings = Some(settings);
        self
    }
}

#[derive(Debug)]
enum ImportedImage {
    Cuda { image: CudaImage, _context: CudaPrimaryContext },
    Hip(HipImage),
    LevelZero(LevelZeroImage),
    OpenCl(OpenClImage),
    Sycl(SyclImage),
}

/// The backend object an imported image became.
#[derive(Debug, Clone, Copy)]
pub enum NativeImage {
    Cuda(CUmipmappedArray),
    Hip(hipMipmappedArray_t),
    LevelZero(ze_image_handle_t),
    OpenCl(cl_mem),
    Sycl(SyclImageMemory),
}

/// A Vulkan image imported into a compute backend.
///
/// Fields drop in order: the backend object, then the exported handle, then the Vulkan image.
#[derive(Debug)]
pub struct ImageVkComputeApiExternalMemory {
    imported: ImportedImage,
    handle: ExportedHandle,
    image: Arc<dyn VulkanImage>,
}

impl ImageVkComputeApiExternalMemory {
    pub(crate) fn create(backend: Backend<'_>, image: Arc<dyn VulkanImage>, info: ImageVkComputeApiInfo) -> Result<Self> {
        match backend {
            Backend::Cuda(_) => CudaImage::precheck(image.as_ref(), &info)?,
            Backend::Hip(_) => HipImage::precheck(image.as_ref(), &info)?,
            Backend::LevelZero(context) => LevelZeroImage::precheck(context, image.as_ref(), &info)?,
            Backend::OpenCl(_) => OpenClImage::precheck(image.as_ref(), &info)?,
            Backend::Sycl(_) => SyclImage::precheck(image.as_ref(), &info)?,
        }
        let attached = backend.attach(image.device().identity())?;
        let mut handle = image.device().export_memory_handle(image.device_memory())?;
        let imported = match attached {
            Attached::Cuda(driver, context) => ImportedImage::Cuda {
                image: CudaImage::import(driver, image.as_ref(), &info, &mut handle)?,
                _context: context,
            },
            Attached::Hip(driver) => ImportedImage::Hip(HipImage::import(driver, image.as_ref(), &info, &mut handle)?),
            Attached::LevelZero(context) => {
                ImportedImage::LevelZero(LevelZeroImage::import(context, image.as_ref(), &info, &mut handle)?)
            }
            Attached::OpenCl(context) => {
                ImportedImage::OpenCl(OpenClImage::import(context, image.as_ref(), &info, &mut handle)?)
            }
            Attached::Sycl(queue) => ImportedImage::Sycl(SyclImage::import(queue, image.as_ref(), &info, &mut handle)?),
        };
        let settings = image.image_settings();
        logwise::info_sync!(
            "image {width}x{height} shared with {api}",
            width = settings.width,
            height = settings.height,
            api = logwise::privacy::LogIt(&imported.compute_api())
        );
        Ok(ImageVkComputeApiExternalMemory { imported, handle, image })
    }

    pub fn compute_api(&self) -> ComputeApi {
        self.imported.compute_api()
    }

    pub fn vulkan_image(&self) -> &Arc<dyn VulkanImage> {
        &self.image
    }

    pub fn exported_handle(&self) -> &ExportedHandle {
        &self.handle
    }

    pub fn native(&self) -> NativeImage {
        match &self.imported {
            ImportedImage::Cuda { image, .. } => NativeImage::Cuda(image.mipmapped_array()),
            ImportedImage::Hip(image) => NativeImage::Hip(image.mipmapped_array()),
            ImportedImage::LevelZero(image) => NativeImage::LevelZero(image.raw()),
            ImportedImage::OpenCl(image) => NativeImage::OpenCl(image.mem()),
            ImportedImage::Sycl(image) => NativeImage::Sycl(image.image_memory()),
        }
    }

    /// The SYCL image descriptor, for images imported into SYCL.
    pub fn sycl_descriptor(&self) -> Option<&SyclImageDescriptor> {
        match &self.imported {
            ImportedImage::Sycl(image) => Some(image.descriptor()),
            _ => None,
        }
    }

    unsafe fn copy(&self, transfer: Transfer, stream: &StreamWrapper, event: Option<&mut CompletionEvent>) -> Result<()> {
        match &self.imported {
            ImportedImage::Cuda { image, .. } => {
                let (s, e) = (stream.cuda()?, stream::cuda_event(event.as_deref())?);
                unsafe { image.copy(transfer, s, e) }
            }
            ImportedImage::Hip(image) => {
                let (s, e) = (stream.hip()?, stream::hip_event(event.as_deref())?);
                unsafe { image.copy(transfer, s, e) }
            }
            ImportedImage::LevelZero(image) => {
                let (s, e) = (stream.level_zero()?, stream::level_zero_event(event.as_deref())?);
                unsafe { image.copy(transfer, s, e) }
            }
            ImportedImage::OpenCl(image) => {
                let (s, e) = (stream.opencl()?, stream::opencl_event_slot(event)?);
                unsafe { image.copy(transfer, s, e) }
            }
            ImportedImage::Sycl(image) => {
                let (s, e) = (stream.sycl()?, stream::sycl_event_slot(event)?);
                unsafe { image.copy(transfer, s.as_ref(), e) }
            }
        }
    }

    /// Enqueues a copy of level 0 from backend memory into the image.
    ///
    /// # Safety
    /// `src` must be backend memory (a `cl_mem` buffer for OpenCL) holding the tightly packed
    /// level 0 image, valid until the copy completes.
    pub unsafe fn copy_from_device_ptr_async(
        &self,
        src: *const c_void,
        stream: &StreamWrapper,
        event: Option<&mut CompletionEvent>,
    ) -> Result<()> {
        unsafe { self.copy(Transfer::FromDevice(src), stream, event) }
    }

    /// # Safety
    /// `dst` must be backend memory large enough for the tightly packed level 0 image, valid
    /// until the copy completes.
    pub unsafe fn copy_to_device_ptr_async(
        &self,
        dst: *mut c_void,
        stream: &StreamWrapper,
        event: Option<&mut CompletionEvent>,
    ) -> Result<()> {
        unsafe { self.copy(Transfer::ToDevice(dst), stream, event) }
    }

    /// # Safety
    /// `src` must hold the tightly packed level 0 image and stay valid until the copy completes.
    pub unsafe fn copy_from_host_ptr_async(
        &self,
        src: *const c_void,
        stream: &StreamWrapper,
        event: Option<&mut CompletionEvent>,
    ) -> Result<()> {
        unsafe { self.copy(Transfer::FromHost(src), stream, event) }
    }

    /// # Safety
    /// `dst` must have room for the tightly packed level 0 image and stay valid until the copy
    /// completes.
    pub unsafe fn copy_to_host_ptr_async(
        &self,
        dst: *mut c_void,
        stream: &StreamWrapper,
        event: Option<&mut CompletionEvent>,
    ) -> Result<()> {
        unsafe { self.copy(Transfer::ToHost(dst), stream, event) }
    }
}

impl ImportedImage {
    fn compute_api(&self) -> ComputeApi {
        match self {
            ImportedImage::Cuda { .. } => ComputeApi::Cuda,
            ImportedImage::Hip(_) => ComputeApi::Hip,
            ImportedImage::LevelZero(_) => ComputeApi::LevelZero,
            ImportedImage::OpenCl(_) => ComputeApi::OpenCl,
            ImportedImage::Sycl(_) => ComputeApi::Sycl,
        }
    }
}

#[derive(Debug)]
enum SamplerObject {
    Cuda(CudaTextureObject),
    Hip(HipTextureObject),
    LevelZero(LevelZeroSampler),
    OpenCl(OpenClSampler),
    /// SYCL samplers are built in-kernel from these settings.
    Sycl(TextureSettings),
}

/// The sampler paired with a sampled image.
#[derive(Debug, Clone, Copy)]
pub enum NativeSampler {
    Cuda(CUtexObject),
    Hip(hipTextureObject_t),
    LevelZero(ze_sampler_handle_t),
    OpenCl(cl_sampler),
    Sycl(TextureSettings),
}

/// An imported image plus a sampler for reading it in kernels.
#[derive(Debug)]
pub struct SampledImageVkComputeApiExternalMemory {
    //dropped before the image it samples
    sampler: SamplerObject,
    image: ImageVkComputeApiExternalMemory,
}

impl SampledImageVkComputeApiExternalMemory {
    pub(crate) fn create(backend: Backend<'_>, image: Arc<dyn VulkanImage>, info: ImageVkComputeApiInfo) -> Result<Self> {
        let settings = info.texture_settings.unwrap_or_default();
        let image = ImageVkComputeApiExternalMemory::create(backend, image, info)?;
        let sampler = match &image.imported {
            ImportedImage::Cuda { image, .. } => SamplerObject::Cuda(image.create_texture_object(&settings, &info)?),
            ImportedImage::Hip(image) => SamplerObject::Hip(image.create_texture_object(&settings)?),
            ImportedImage::LevelZero(image) => SamplerObject::LevelZero(image.create_sampler(&settings)?),
            ImportedImage::OpenCl(image) => SamplerObject::OpenCl(image.create_sampler(&settings)?),
            ImportedImage::Sycl(_) => SamplerObject::Sycl(settings),
        };
        Ok(SampledImageVkComputeApiExternalMemory { sampler, image })
    }

    pub fn image(&self) -> &ImageVkComputeApiExternalMemory {
        &self.image
    }

    pub fn sampler(&self) -> NativeSampler {
        match &self.sampler {
            SamplerObject::Cuda(t) => NativeSampler::Cuda(t.raw()),
            SamplerObject::Hip(t) => NativeSampler::Hip(t.raw()),
            SamplerObject::LevelZero(s) => NativeSampler::LevelZero(s.raw()),
            SamplerObject::OpenCl(s) => NativeSampler::OpenCl(s.raw()),
            SamplerObject::Sycl(settings) => NativeSampler::Sycl(*settings),
        }
    }
}

#[derive(Debug)]
enum SurfaceObject {
    Cuda(CudaSurfaceObject),
    Hip(HipSurfaceObject),
    /// Backends whose image handle is written to directly.
    Direct(NativeSurface),
}

/// What a kernel writes through for an unsampled image.
#[derive(Debug, Clone, Copy)]
pub enum NativeSurface {
    Cuda(CUsurfObject),
    Hip(hipSurfaceObject_t),
    LevelZero(ze_image_handle_t),
    OpenCl(cl_mem),
    Sycl(SyclImageMemory),
}

/// An imported image with kernel load/store access.
#[derive(Debug)]
pub struct UnsampledImageVkComputeApiExternalMemory {
    surface: SurfaceObject,
    image: ImageVkComputeApiExternalMemory,
}

impl UnsampledImageVkComputeApiExternalMemory {
    pub(crate) fn create(backend: Backend<'_>, image: Arc<dyn VulkanImage>, info: ImageVkComputeApiInfo) -> Result<Self> {
        let info = ImageVkComputeApiInfo {
            surface_load_store: true,
            ..info
        };
        let image = ImageVkComputeApiExternalMemory::create(backend, image, info)?;
        let surface = match &image.imported {
            ImportedImage::Cuda { image, .. } => SurfaceObject::Cuda(image.create_surface_object()?),
            ImportedImage::Hip(image) => SurfaceObject::Hip(image.create_surface_object()?),
            ImportedImage::LevelZero(image) => SurfaceObject::Direct(NativeSurface::LevelZero(image.raw())),
            ImportedImage::OpenCl(image) => SurfaceObject::Direct(NativeSurface::OpenCl(image.mem())),
            ImportedImage::Sycl(image) => SurfaceObject::Direct(NativeSurface::Sycl(image.image_memory())),
        };
        Ok(UnsampledImageVkComputeApiExternalMemory { surface, image })
    }

    pub fn image(&self) -> &ImageVkComputeApiExternalMemory {
        &self.image
    }

    pub fn surface(&self) -> NativeSurface {
        match &self.surface {
            SurfaceObject::Cuda(s) => NativeSurface::Cuda(s.raw()),
            SurfaceObject::Hip(s) => NativeSurface::Hip(s.raw()),
            SurfaceObject::Direct(surface) => *surface,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(image_type: vk::ImageType, layers: u32) -> ImageSettings {
        ImageSettings {
            width: 64,
            height: 32,
            depth: 4,
            array_layers: layers,
            image_type,
            ..ImageSettings::default()
        }
    }

    #[test]
    fn geometry_uses_depth_only_for_3d() {
        let s = settings(vk::ImageType::TYPE_3D, 1);
        assert_eq!(ImageGeometry::new(&s, vk::ImageViewType::TYPE_3D).slices, 4);
        let s = settings(vk::ImageType::TYPE_2D, 6);
        let g = ImageGeometry::new(&s, vk::ImageViewType::CUBE);
        assert_eq!(g.slices, 6);
        assert_eq!(g.bytes_per_pixel, 4);
        assert_eq!(g.row_bytes(), 256);
        assert_eq!(g.packed_size(), 256 * 32 * 6);
    }

    #[test]
    fn view_type_follows_image_shape() {
        assert_eq!(
            ImageVkComputeApiInfo::for_image(&settings(vk::ImageType::TYPE_2D, 1)).view_type,
            vk::ImageViewType::TYPE_2D
        );
        assert_eq!(
            ImageVkComputeApiInfo::for_image(&settings(vk::ImageType::TYPE_2D, 3)).view_type,
            vk::ImageViewType::TYPE_2D_ARRAY
        );
        assert_eq!(
            ImageVkComputeApiInfo::for_image(&settings(vk::ImageType::TYPE_1D, 2)).view_type,
            vk::ImageViewType::TYPE_1D_ARRAY
        );
        assert_eq!(
            ImageVkComputeApiInfo::for_image(&settings(vk::ImageType::TYPE_3D, 1)).view_type,
            vk::ImageViewType::TYPE_3D
        );
    }

    #[test]
    fn usage_drives_surface_and_sampler() {
        let storage_only = ImageSettings {
            usage: vk::ImageUsageFlags::STORAGE,
            ..ImageSettings::default()
        };
        let info = ImageVkComputeApiInfo::for_image(&storage_only);
        assert!(info.surface_load_store);
        assert!(info.texture_settings.is_none());
        let depth = ImageSettings {
            format: vk::Format::D32_SFLOAT,
            usage: vk::ImageUsageFlags::SAMPLED,
            ..ImageSettings::default()
        };
        let info = ImageVkComputeApiInfo::for_image(&depth);
        assert_eq!(info.subresource_range.aspect_mask, vk::ImageAspectFlags::DEPTH);
        assert_eq!(info.texture_settings, Some(TextureSettings::default()));
    }

    #[test]
    fn remaining_spans_resolve_against_the_image() {
        assert_eq!(subresource_span(0, vk::REMAINING_MIP_LEVELS, 5).unwrap(), (0, 4));
        assert_eq!(subresource_span(2, vk::REMAINING_ARRAY_LAYERS, 6).unwrap(), (2, 5));
        assert_eq!(subresource_span(1, 2, 6).unwrap(), (1, 2));
    }

    #[test]
    fn spans_outside_the_image_are_refused() {
        for (base, count, available) in [
            (6, vk::REMAINING_ARRAY_LAYERS, 6),
            (4, 3, 6),
            (0, 0, 6),
            (u32::MAX, 2, 6),
        ] {
            let err = subresource_span(base, count, available).unwrap_err();
            assert!(matches!(err, Error::InvalidSubresourceRange { .. }));
        }
    }

    #[test]
    fn layered_and_cube_views() {
        assert!(is_layered(vk::ImageViewType::CUBE_ARRAY));
        assert!(is_cube(vk::ImageViewType::CUBE_ARRAY));
        assert!(!is_layered(vk::ImageViewType::CUBE));
        assert!(!is_cube(vk::ImageViewType::TYPE_2D_ARRAY));
    }
}
