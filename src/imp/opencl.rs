//! OpenCL backend.
//!
//! Needs OpenCL 3.0 (`clCreateBufferWithProperties`) with `cl_khr_external_memory_opaque_fd`
//! (or the Win32 variant); semaphores additionally need `cl_khr_semaphore`.  The dispatcher never
//! picks OpenCL on its own, it is used through the explicit-backend factories.

pub(crate) mod device;
pub mod ffi;
pub(crate) mod format;
pub(crate) mod memory;
pub(crate) mod semaphore;

use std::ffi::{CString, c_void};
use std::sync::Arc;

use logwise::privacy::LogIt;

use crate::error::{Error, Result};
use crate::interop::ComputeApi;
use crate::loader::{LibraryHandle, LibrarySlot, SymbolResolver, candidates, load_driver};
use crate::vulkan::PhysicalDeviceIdentity;
pub use device::{OpenClDeviceIdentity, match_device, token_majority};
use ffi::*;

/// Name of an OpenCL status code.
pub fn error_name(code: cl_int) -> &'static str {
    CL_ERROR_NAMES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
        .unwrap_or("unknown cl_int status")
}

/// A loaded OpenCL ICD loader.
pub struct OpenClDriver {
    pub(crate) table: OpenClFunctionTable,
    _library: LibraryHandle,
}

impl std::fmt::Debug for OpenClDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenClDriver").finish_non_exhaustive()
    }
}

impl OpenClDriver {
    /// # Safety
    /// Every symbol `resolver` returns must have the OpenCL signature of its name.
    pub unsafe fn from_resolver(resolver: &dyn SymbolResolver) -> Result<Self> {
        Ok(OpenClDriver {
            table: unsafe { OpenClFunctionTable::from_resolver(resolver)? },
            _library: None,
        })
    }

    #[track_caller]
    pub(crate) fn check(&self, call: &'static str, code: cl_int) -> Result<()> {
        if code == CL_SUCCESS {
            Ok(())
        } else {
            Err(Error::native(ComputeApi::OpenCl, call, code as i64, error_name(code).to_string()))
        }
    }

    fn device_info_bytes(&self, device: cl_device_id, param: cl_uint) -> Result<Vec<u8>> {
        let mut size = 0usize;
        self.check("clGetDeviceInfo", unsafe {
            (self.table.cl_get_device_info)(device, param, 0, std::ptr::null_mut(), &mut size)
        })?;
        let mut bytes = vec![0u8; size];
        self.check("clGetDeviceInfo", unsafe {
            (self.table.cl_get_device_info)(device, param, size, bytes.as_mut_ptr() as *mut c_void, std::ptr::null_mut())
        })?;
        Ok(bytes)
    }

    fn device_info_string(&self, device: cl_device_id, param: cl_uint) -> Result<String> {
        let bytes = self.device_info_bytes(device, param)?;
        let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
        Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
    }

    /// What `device` reports about its identity.
    pub fn device_identity(&self, device: cl_device_id) -> Result<OpenClDeviceIdentity> {
        let extensions = self.device_info_string(device, CL_DEVICE_EXTENSIONS)?;
        let has = |name: &str| extensions.split_whitespace().any(|e| e == name);
        let mut vendor_id: cl_uint = 0;
        self.check("clGetDeviceInfo", unsafe {
            (self.table.cl_get_device_info)(
                device,
                CL_DEVICE_VENDOR_ID,
                size_of::<cl_uint>(),
                &mut vendor_id as *mut cl_uint as *mut c_void,
                std::ptr::null_mut(),
            )
        })?;
        let uuid = if has("cl_khr_device_uuid") {
            let mut uuid = [0u8; 16];
            self.check("clGetDeviceInfo", unsafe {
                (self.table.cl_get_device_info)(
                    device,
                    CL_DEVICE_UUID_KHR,
                    uuid.len(),
                    uuid.as_mut_ptr() as *mut c_void,
                    std::ptr::null_mut(),
                )
            })?;
            Some(uuid)
        } else {
            None
        };
        let board_name = if has("cl_amd_device_attribute_query") {
            Some(self.device_info_string(device, CL_DEVICE_BOARD_NAME_AMD)?)
        } else {
            None
        };
        Ok(OpenClDeviceIdentity {
            device_name: self.device_info_string(device, CL_DEVICE_NAME)?,
            vendor_id,
            uuid,
            board_name,
        })
    }

    /// Every device of every platform.
    pub fn devices(&self) -> Result<Vec<(cl_platform_id, cl_device_id)>> {
        let mut count: cl_uint = 0;
        let status = unsafe { (self.table.cl_get_platform_ids)(0, std::ptr::null_mut(), &mut count) };
        if status == CL_PLATFORM_NOT_FOUND_KHR {
            return Ok(Vec::new());
        }
        self.check("clGetPlatformIDs", status)?;
        let mut platforms: Vec<cl_platform_id> = vec![std::ptr::null_mut(); count as usize];
        self.check("clGetPlatformIDs", unsafe {
            (self.table.cl_get_platform_ids)(count, platforms.as_mut_ptr(), std::ptr::null_mut())
        })?;
        let mut devices = Vec::new();
        for platform in platforms {
            let mut n: cl_uint = 0;
            let status = unsafe {
                (self.table.cl_get_device_ids)(platform, CL_DEVICE_TYPE_ALL, 0, std::ptr::null_mut(), &mut n)
            };
            if status == CL_DEVICE_NOT_FOUND {
                continue;
            }
            self.check("clGetDeviceIDs", status)?;
            let mut ids: Vec<cl_device_id> = vec![std::ptr::null_mut(); n as usize];
            self.check("clGetDeviceIDs", unsafe {
                (self.table.cl_get_device_ids)(platform, CL_DEVICE_TYPE_ALL, n, ids.as_mut_ptr(), std::ptr::null_mut())
            })?;
            devices.extend(ids.into_iter().map(|d| (platform, d)));
        }
        Ok(devices)
    }

    /// The OpenCL device representing the Vulkan physical device, if any.
    pub fn matching_device(&self, identity: &PhysicalDeviceIdentity) -> Result<Option<(cl_platform_id, cl_device_id)>> {
        let mut found = Vec::new();
        for (platform, device) in self.devices()? {
            found.push(((platform, device), self.device_identity(device)?));
        }
        let found = match_device(identity, &found);
        if found.is_none() {
            logwise::warn_sync!(
                "no OpenCL device matches Vulkan device {name}",
                name = LogIt(&identity.device_name)
            );
        }
        Ok(found)
    }
}

fn library_names() -> &'static [&'static str] {
    if cfg!(windows) {
        &["OpenCL.dll"]
    } else if cfg!(target_os = "macos") {
        &["libOpenCL.dylib", "/System/Library/Frameworks/OpenCL.framework/OpenCL"]
    } else {
        &["libOpenCL.so.1", "libOpenCL.so"]
    }
}

static OPENCL: LibrarySlot<OpenClDriver> = LibrarySlot::new();

/// Loads the OpenCL ICD loader into the process-wide slot.  `Ok(false)` when it is not installed.
pub fn initialize_opencl_function_table() -> Result<bool> {
    OPENCL.initialize(|| {
        load_driver("OpenCL", &candidates(library_names()), |library| {
            Ok(OpenClDriver {
                table: unsafe { OpenClFunctionTable::from_resolver(&library)? },
                _library: Some(library),
            })
        })
    })
}

pub fn is_opencl_function_table_initialized() -> bool {
    OPENCL.is_initialized()
}

pub fn free_opencl_function_table() {
    OPENCL.free()
}

pub fn loaded_opencl_driver() -> Option<Arc<OpenClDriver>> {
    OPENCL.get()
}

/// Resolves extension entry points through `clGetExtensionFunctionAddressForPlatform`.
struct PlatformExtensionResolver<'a> {
    driver: &'a OpenClDriver,
    platform: cl_platform_id,
}

impl SymbolResolver for PlatformExtensionResolver<'_> {
    fn resolve(&self, name: &str) -> *const c_void {
        let Ok(name) = CString::new(name) else {
            return std::ptr::null();
        };
        unsafe { (self.driver.table.cl_get_extension_function_address_for_platform)(self.platform, name.as_ptr()) }
    }
}

/// The OpenCL context and device interop objects are created in.
pub struct OpenClInteropContext {
    driver: Arc<OpenClDriver>,
    platform: cl_platform_id,
    device: cl_device_id,
    context: cl_context,
    semaphores: Option<OpenClSemaphoreFunctionTable>,
}

impl std::fmt::Debug for OpenClInteropContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenClInteropContext")
            .field("device", &self.device)
            .field("context", &self.context)
            .field("semaphores", &self.semaphores.is_some())
            .finish_non_exhaustive()
    }
}

impl OpenClInteropContext {
    /// Wraps an application-owned `context` containing `device`.
    ///
    /// The `cl_khr_semaphore` entry points are looked up on the device's platform; without them
    /// semaphore import reports [`Error::UnsupportedOperation`].
    pub fn new(driver: Arc<OpenClDriver>, context: cl_context, device: cl_device_id) -> Result<Arc<Self>> {
        let mut platform: cl_platform_id = std::ptr::null_mut();
        driver.check("clGetDeviceInfo", unsafe {
            (driver.table.cl_get_device_info)(
                device,
                CL_DEVICE_PLATFORM,
                size_of::<cl_platform_id>(),
                &mut platform as *mut cl_platform_id as *mut c_void,
                std::ptr::null_mut(),
            )
        })?;
        let resolver = PlatformExtensionResolver {
            driver: &driver,
            platform,
        };
        let complete = OpenClSemaphoreFunctionTable::REQUIRED_SYMBOLS
            .iter()
            .all(|name| !resolver.resolve(name).is_null());
        let semaphores = if complete {
            Some(unsafe { OpenClSemaphoreFunctionTable::from_resolver(&resolver)? })
        } else {
            logwise::info_sync!("OpenCL platform has no cl_khr_semaphore entry points");
            None
        };
        Ok(Arc::new(OpenClInteropContext {
            driver,
            platform,
            device,
            context,
            semaphores,
        }))
    }

    pub fn driver(&self) -> &Arc<OpenClDriver> {
        &self.driver
    }

    pub fn platform(&self) -> cl_platform_id {
        self.platform
    }

    pub fn device(&self) -> cl_device_id {
        self.device
    }

    pub fn context(&self) -> cl_context {
        self.context
    }

    pub(crate) fn semaphore_functions(&self) -> Option<&OpenClSemaphoreFunctionTable> {
        self.semaphores.as_ref()
    }

    /// Blocks until `event` has completed, or everything on `queue` when there is no event.
    pub fn wait_for_completion(&self, queue: cl_command_queue, event: Option<&OpenClEvent>) -> Result<()> {
        match event {
            Some(event) => {
                let raw = event.raw();
                self.driver
                    .check("clWaitForEvents", unsafe { (self.driver.table.cl_wait_for_events)(1, &raw) })
            }
            None => self.driver.check("clFinish", unsafe { (self.driver.table.cl_finish)(queue) }),
        }
    }
}

/// An event returned by an OpenCL enqueue, released on drop.
pub struct OpenClEvent {
    driver: Arc<OpenClDriver>,
    event: cl_event,
}

impl std::fmt::Debug for OpenClEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("OpenClEvent").field(&self.event).finish()
    }
}

impl OpenClEvent {
    pub(crate) fn new(driver: &Arc<OpenClDriver>, event: cl_event) -> Self {
        OpenClEvent {
            driver: driver.clone(),
            event,
        }
    }

    pub fn raw(&self) -> cl_event {
        self.event
    }
}

impl Drop for OpenClEvent {
    fn drop(&mut self) {
        //logged by check
        let _ = self
            .driver
            .check("clReleaseEvent", unsafe { (self.driver.table.cl_release_event)(self.event) });
    }
}

/// Runs an enqueue that may return an event, storing the event in `slot` if one was asked for.
pub(crate) fn enqueue_with_event(
    driver: &Arc<OpenClDriver>,
    call: &'static str,
    slot: Option<&mut Option<OpenClEvent>>,
    enqueue: impl FnOnce(*mut cl_event) -> cl_int,
) -> Result<()> {
    match slot {
        Some(slot) => {
            let mut event: cl_event = std::ptr::null_mut();
            driver.check(call, enqueue(&mut event))?;
            *slot = Some(OpenClEvent::new(driver, event));
            Ok(())
        }
        None => driver.check(call, enqueue(std::ptr::null_mut())),
    }
}
