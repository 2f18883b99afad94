//! The backend-agnostic interop surface.
//!
//! An [`InteropSession`] holds the backends the application configured.  Its factories pick a
//! backend for the Vulkan device with [`InteropSession::decide_interop_compute_api`] (or take one
//! explicitly through the `_with` variants) and build one of the wrappers:
//!
//! - [`BufferVkComputeApiExternalMemory`]
//! - [`ImageVkComputeApiExternalMemory`], [`SampledImageVkComputeApiExternalMemory`],
//!   [`UnsampledImageVkComputeApiExternalMemory`]
//! - [`SemaphoreVkComputeApiInterop`]
//!
//! Every factory runs the same sequence: check what can be checked without touching the OS
//! handle, resolve the backend device, export the handle from Vulkan, import it.

pub mod buffer;
pub mod image;
pub mod semaphore;

use std::ffi::c_void;
use std::fmt::Display;
use std::sync::Arc;

use ash::vk;
use logwise::privacy::LogIt;

use crate::error::{Error, Result};
use crate::imp::cuda::{CudaDriver, CudaPrimaryContext, loaded_cuda_driver};
use crate::imp::hip::{HipDriver, loaded_hip_driver};
use crate::imp::level_zero::LevelZeroInteropContext;
use crate::imp::opencl::OpenClInteropContext;
use crate::imp::sycl::{self, SyclQueue};
use crate::stream::{self, CompletionEvent, StreamWrapper};
use crate::vulkan::{PhysicalDeviceIdentity, VulkanBuffer, VulkanDevice, VulkanImage, VulkanSemaphore};

pub use buffer::BufferVkComputeApiExternalMemory;
pub use image::{
    ImageVkComputeApiExternalMemory, ImageVkComputeApiInfo, NativeImage, NativeSampler, NativeSurface,
    SampledImageVkComputeApiExternalMemory, TextureSettings, UnsampledImageVkComputeApiExternalMemory,
};
pub use semaphore::SemaphoreVkComputeApiInterop;

/// A foreign compute API Vulkan resources can be shared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComputeApi {
    Cuda,
    Hip,
    LevelZero,
    OpenCl,
    Sycl,
}

impl Display for ComputeApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ComputeApi::Cuda => "CUDA",
            ComputeApi::Hip => "HIP",
            ComputeApi::LevelZero => "Level Zero",
            ComputeApi::OpenCl => "OpenCL",
            ComputeApi::Sycl => "SYCL",
        };
        f.write_str(name)
    }
}

/// Direction and peer of a copy.  "Device" pointers are backend memory: device pointers, or
/// `cl_mem` buffers for OpenCL.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Transfer {
    FromDevice(*const c_void),
    ToDevice(*mut c_void),
    FromHost(*const c_void),
    ToHost(*mut c_void),
}

/// The backend a Vulkan driver is naturally paired with.
fn native_compute_api(driver_id: vk::DriverId) -> Option<ComputeApi> {
    match driver_id {
        vk::DriverId::NVIDIA_PROPRIETARY => Some(ComputeApi::Cuda),
        vk::DriverId::AMD_PROPRIETARY | vk::DriverId::AMD_OPEN_SOURCE | vk::DriverId::MESA_RADV => Some(ComputeApi::Hip),
        vk::DriverId::INTEL_PROPRIETARY_WINDOWS | vk::DriverId::INTEL_OPEN_SOURCE_MESA => Some(ComputeApi::LevelZero),
        _ => None,
    }
}

/// Picks the backend for a device with `driver_id`.
///
/// A registered SYCL queue wins over everything: SYCL may itself run on Level Zero, and the
/// device must not be claimed twice.  Otherwise the driver's own vendor API is used if it is
/// configured.  OpenCL is never picked here.
pub(crate) fn select_compute_api(driver_id: vk::DriverId, configured: impl Fn(ComputeApi) -> bool) -> Option<ComputeApi> {
    if configured(ComputeApi::Sycl) {
        return Some(ComputeApi::Sycl);
    }
    native_compute_api(driver_id).filter(|api| configured(*api))
}

/// A configured backend, before it is bound to a device.
#[derive(Clone, Copy)]
pub(crate) enum Backend<'a> {
    Cuda(&'a Arc<CudaDriver>),
    Hip(&'a Arc<HipDriver>),
    LevelZero(&'a Arc<LevelZeroInteropContext>),
    OpenCl(&'a Arc<OpenClInteropContext>),
    Sycl(&'a Arc<dyn SyclQueue>),
}

/// A backend bound to the GPU behind the Vulkan device.
pub(crate) enum Attached<'a> {
    /// Imports happen in the retained primary context, which lives as long as the wrapper.
    Cuda(&'a Arc<CudaDriver>, CudaPrimaryContext),
    Hip(&'a Arc<HipDriver>),
    LevelZero(&'a Arc<LevelZeroInteropContext>),
    OpenCl(&'a Arc<OpenClInteropContext>),
    Sycl(&'a Arc<dyn SyclQueue>),
}

fn device_not_found(backend: ComputeApi) -> Error {
    Error::DeviceNotFound { backend }
}

impl<'a> Backend<'a> {
    /// Resolves the backend device matching `identity` and makes it current where the API has
    /// a notion of a current device.
    pub(crate) fn attach(self, identity: &PhysicalDeviceIdentity) -> Result<Attached<'a>> {
        match self {
            Backend::Cuda(driver) => {
                let device = driver.matching_device(identity)?.ok_or_else(|| device_not_found(ComputeApi::Cuda))?;
                Ok(Attached::Cuda(driver, driver.retain_primary_context(device)?))
            }
            Backend::Hip(driver) => {
                let device = driver.matching_device(identity)?.ok_or_else(|| device_not_found(ComputeApi::Hip))?;
                driver.set_device(device)?;
                Ok(Attached::Hip(driver))
            }
            //the context was built from the queue's own handles
            Backend::LevelZero(context) => Ok(Attached::LevelZero(context)),
            Backend::OpenCl(context) => {
                let found = context.driver().matching_device(identity)?;
                match found {
                    Some((_, device)) if device == context.device() => Ok(Attached::OpenCl(context)),
                    _ => Err(device_not_found(ComputeApi::OpenCl)),
                }
            }
            Backend::Sycl(queue) => Ok(Attached::Sycl(queue)),
        }
    }
}

/// The backends available to interop, configured once before any wrapper is created.
#[derive(Default)]
pub struct InteropSession {
    cuda: Option<Arc<CudaDriver>>,
    hip: Option<Arc<HipDriver>>,
    level_zero: Option<Arc<LevelZeroInteropContext>>,
    opencl: Option<Arc<OpenClInteropContext>>,
    sycl: Option<Arc<dyn SyclQueue>>,
}

impl std::fmt::Debug for InteropSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteropSession")
            .field("cuda", &self.cuda.is_some())
            .field("hip", &self.hip.is_some())
            .field("level_zero", &self.level_zero.is_some())
            .field("opencl", &self.opencl.is_some())
            .field("sycl", &self.sycl.is_some())
            .finish()
    }
}

impl InteropSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// A session using whatever [`crate::cuda::initialize_cuda_function_table`] and
    /// [`crate::hip::initialize_hip_function_table`] loaded.
    pub fn from_loaded_function_tables() -> Self {
        InteropSession {
            cuda: loaded_cuda_driver(),
            hip: loaded_hip_driver(),
            ..Self::default()
        }
    }

    pub fn with_cuda(mut self, driver: Arc<CudaDriver>) -> Self {
        self.cuda = Some(driver);
        self
    }

    pub fn with_hip(mut self, driver: Arc<HipDriver>) -> Self {
        self.hip = Some(driver);
        self
    }

    pub fn with_level_zero(mut self, context: Arc<LevelZeroInteropContext>) -> Self {
        self.level_zero = Some(context);
        self
    }

    pub fn with_opencl(mut self, context: Arc<OpenClInteropContext>) -> Self {
        self.opencl = Some(context);
        self
    }

    /// Registers the SYCL queue; from now on the dispatcher selects SYCL for every device.
    pub fn register_sycl_queue(mut self, queue: Arc<dyn SyclQueue>) -> Self {
        self.sycl = Some(queue);
        self
    }

    pub fn is_configured(&self, api: ComputeApi) -> bool {
        match api {
            ComputeApi::Cuda => self.cuda.is_some(),
            ComputeApi::Hip => self.hip.is_some(),
            ComputeApi::LevelZero => self.level_zero.is_some(),
            ComputeApi::OpenCl => self.opencl.is_some(),
            ComputeApi::Sycl => self.sycl.is_some(),
        }
    }

    pub(crate) fn backend(&self, api: ComputeApi) -> Result<Backend<'_>> {
        let backend = match api {
            ComputeApi::Cuda => self.cuda.as_ref().map(Backend::Cuda),
            ComputeApi::Hip => self.hip.as_ref().map(Backend::Hip),
            ComputeApi::LevelZero => self.level_zero.as_ref().map(Backend::LevelZero),
            ComputeApi::OpenCl => self.opencl.as_ref().map(Backend::OpenCl),
            ComputeApi::Sycl => self.sycl.as_ref().map(Backend::Sycl),
        };
        backend.ok_or_else(|| {
            logwise::warn_sync!("{api} requested but not configured", api = LogIt(&api));
            Error::BackendNotConfigured(api)
        })
    }

    /// The backend the factories use for `device`, or `None` when there is none.
    pub fn decide_interop_compute_api(&self, device: &dyn VulkanDevice) -> Option<ComputeApi> {
        let identity = device.identity();
        let api = select_compute_api(identity.driver_id, |api| self.is_configured(api));
        match api {
            Some(api) => {
                logwise::info_sync!(
                    "{api} selected for {device}",
                    api = LogIt(&api),
                    device = LogIt(&identity.device_name)
                );
            }
            None => {
                logwise::warn_sync!(
                    "no compute API for {device} (driver {driver})",
                    device = LogIt(&identity.device_name),
                    driver = LogIt(&identity.driver_id)
                );
            }
        }
        api
    }

    fn required_compute_api(&self, device: &dyn VulkanDevice) -> Result<ComputeApi> {
        self.decide_interop_compute_api(device).ok_or(Error::NoComputeApi)
    }

    pub fn create_buffer_vk_compute_api_external_memory(
        &self,
        buffer: Arc<dyn VulkanBuffer>,
    ) -> Result<BufferVkComputeApiExternalMemory> {
        let api = self.required_compute_api(buffer.device().as_ref())?;
        self.create_buffer_vk_compute_api_external_memory_with(api, buffer)
    }

    pub fn create_buffer_vk_compute_api_external_memory_with(
        &self,
        api: ComputeApi,
        buffer: Arc<dyn VulkanBuffer>,
    ) -> Result<BufferVkComputeApiExternalMemory> {
        BufferVkComputeApiExternalMemory::create(self.backend(api)?, buffer)
    }

    pub fn create_image_vk_compute_api_external_memory(
        &self,
        image: Arc<dyn VulkanImage>,
        info: ImageVkComputeApiInfo,
    ) -> Result<ImageVkComputeApiExternalMemory> {
        let api = self.required_compute_api(image.device().as_ref())?;
        self.create_image_vk_compute_api_external_memory_with(api, image, info)
    }

    pub fn create_image_vk_compute_api_external_memory_with(
        &self,
        api: ComputeApi,
        image: Arc<dyn VulkanImage>,
        info: ImageVkComputeApiInfo,
    ) -> Result<ImageVkComputeApiExternalMemory> {
        ImageVkComputeApiExternalMemory::create(self.backend(api)?, image, info)
    }

    /// An image plus a sampler built from `info.texture_settings` (defaults when absent).
    pub fn create_sampled_image_vk_compute_api_external_memory(
        &self,
        image: Arc<dyn VulkanImage>,
        info: ImageVkComputeApiInfo,
    ) -> Result<SampledImageVkComputeApiExternalMemory> {
        let api = self.required_compute_api(image.device().as_ref())?;
        self.create_sampled_image_vk_compute_api_external_memory_with(api, image, info)
    }

    pub fn create_sampled_image_vk_compute_api_external_memory_with(
        &self,
        api: ComputeApi,
        image: Arc<dyn VulkanImage>,
        info: ImageVkComputeApiInfo,
    ) -> Result<SampledImageVkComputeApiExternalMemory> {
        SampledImageVkComputeApiExternalMemory::create(self.backend(api)?, image, info)
    }

    /// An image imported for load/store access from kernels.
    pub fn create_unsampled_image_vk_compute_api_external_memory(
        &self,
        image: Arc<dyn VulkanImage>,
        info: ImageVkComputeApiInfo,
    ) -> Result<UnsampledImageVkComputeApiExternalMemory> {
        let api = self.required_compute_api(image.device().as_ref())?;
        self.create_unsampled_image_vk_compute_api_external_memory_with(api, image, info)
    }

    pub fn create_unsampled_image_vk_compute_api_external_memory_with(
        &self,
        api: ComputeApi,
        image: Arc<dyn VulkanImage>,
        info: ImageVkComputeApiInfo,
    ) -> Result<UnsampledImageVkComputeApiExternalMemory> {
        UnsampledImageVkComputeApiExternalMemory::create(self.backend(api)?, image, info)
    }

    pub fn create_semaphore_vk_compute_api_interop(
        &self,
        semaphore: Arc<dyn VulkanSemaphore>,
    ) -> Result<SemaphoreVkComputeApiInterop> {
        let api = self.required_compute_api(semaphore.device().as_ref())?;
        self.create_semaphore_vk_compute_api_interop_with(api, semaphore)
    }

    pub fn create_semaphore_vk_compute_api_interop_with(
        &self,
        api: ComputeApi,
        semaphore: Arc<dyn VulkanSemaphore>,
    ) -> Result<SemaphoreVkComputeApiInterop> {
        SemaphoreVkComputeApiInterop::create(self.backend(api)?, semaphore)
    }

    /// Blocks until `event` has completed, or everything enqueued on `stream` when there is no
    /// event.  The only blocking call of the interop layer.
    pub fn wait_for_completion(&self, stream: &StreamWrapper, event: Option<&CompletionEvent>) -> Result<()> {
        match self.backend(stream.compute_api())? {
            Backend::Cuda(driver) => driver.wait_for_completion(stream.cuda()?, stream::cuda_event(event)?),
            Backend::Hip(driver) => driver.wait_for_completion(stream.hip()?, stream::hip_event(event)?),
            Backend::LevelZero(context) => {
                context.wait_for_completion(stream.level_zero()?, stream::level_zero_event(event)?)
            }
            Backend::OpenCl(context) => {
                context.wait_for_completion(stream.opencl()?, stream::recorded_opencl_event(event)?)
            }
            Backend::Sycl(_) => sycl::wait_for_completion(stream.sycl()?.as_ref(), stream::recorded_sycl_event(event)?),
        }
    }
}
