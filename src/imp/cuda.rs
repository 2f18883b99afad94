//! CUDA driver API backend.
//!
//! The driver library is opened at run time; nothing links against CUDA.  The loaded table is
//! kept process-wide (see [`initialize_cuda_function_table`]) and every interop object holds its
//! own `Arc<CudaDriver>`.

pub mod ffi;
pub(crate) mod format;
pub(crate) mod memory;
pub(crate) mod semaphore;

use std::ffi::{CStr, c_char};
use std::sync::{Arc, OnceLock};

use logwise::privacy::LogIt;

use crate::error::{Error, Result};
use crate::interop::ComputeApi;
use crate::loader::{LibraryHandle, LibrarySlot, SymbolResolver, candidates, load_driver};
use crate::vulkan::PhysicalDeviceIdentity;
use ffi::*;

/// First driver version (`major * 1000 + minor * 10`, so 11.2) with timeline semaphore import.
pub const MIN_TIMELINE_DRIVER_VERSION: i32 = 11020;

/// A loaded CUDA driver.
pub struct CudaDriver {
    pub(crate) table: CudaFunctionTable,
    driver_version: i32,
    device_uuids: OnceLock<Vec<(CUdevice, [u8; 16])>>,
    _library: LibraryHandle,
}

impl std::fmt::Debug for CudaDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CudaDriver")
            .field("driver_version", &self.driver_version)
            .finish_non_exhaustive()
    }
}

impl CudaDriver {
    /// Builds a driver from `resolver`, then runs `cuInit` and reads the driver version.
    ///
    /// # Safety
    /// Every symbol `resolver` returns must have the CUDA driver API signature of its name.
    pub unsafe fn from_resolver(resolver: &dyn SymbolResolver) -> Result<Self> {
        let table = unsafe { CudaFunctionTable::from_resolver(resolver)? };
        unsafe { Self::from_table(table, None) }
    }

    unsafe fn from_table(table: CudaFunctionTable, library: LibraryHandle) -> Result<Self> {
        let mut driver = CudaDriver {
            table,
            driver_version: 0,
            device_uuids: OnceLock::new(),
            _library: library,
        };
        driver.check("cuInit", unsafe { (driver.table.cu_init)(0) })?;
        let mut version = 0;
        driver.check("cuDriverGetVersion", unsafe {
            (driver.table.cu_driver_get_version)(&mut version)
        })?;
        driver.driver_version = version;
        logwise::info_sync!("CUDA driver version {version}", version = version);
        Ok(driver)
    }

    /// `cuDriverGetVersion`, e.g. `12040` for 12.4.
    pub fn driver_version(&self) -> i32 {
        self.driver_version
    }

    pub fn supports_timeline_semaphores(&self) -> bool {
        self.driver_version >= MIN_TIMELINE_DRIVER_VERSION
    }

    /// The driver's description of `result`.
    pub fn error_string(&self, result: CUresult) -> String {
        let mut text: *const c_char = std::ptr::null();
        let status = unsafe { (self.table.cu_get_error_string)(result, &mut text) };
        if status != CUDA_SUCCESS || text.is_null() {
            return format!("unknown CUresult {result}");
        }
        let mut message = unsafe { CStr::from_ptr(text) }.to_string_lossy().into_owned();
        if let Some(get_name) = self.table.cu_get_error_name {
            let mut name: *const c_char = std::ptr::null();
            if unsafe { get_name(result, &mut name) } == CUDA_SUCCESS && !name.is_null() {
                message = format!("{}: {message}", unsafe { CStr::from_ptr(name) }.to_string_lossy());
            }
        }
        message
    }

    /// Turns a status code into a `Result`, tagged with the caller's location.
    #[track_caller]
    pub(crate) fn check(&self, call: &'static str, result: CUresult) -> Result<()> {
        if result == CUDA_SUCCESS {
            Ok(())
        } else {
            Err(Error::native(ComputeApi::Cuda, call, result as i64, self.error_string(result)))
        }
    }

    /// Records `event` on `stream` when the caller asked for one.
    pub(crate) fn record_event(&self, event: Option<CUevent>, stream: CUstream) -> Result<()> {
        match event {
            Some(event) => self.check("cuEventRecord", unsafe { (self.table.cu_event_record)(event, stream) }),
            None => Ok(()),
        }
    }

    /// Blocks until `event` (if given) or everything on `stream` has completed.
    pub(crate) fn wait_for_completion(&self, stream: CUstream, event: Option<CUevent>) -> Result<()> {
        match event {
            Some(event) => self.check("cuEventSynchronize", unsafe { (self.table.cu_event_synchronize)(event) }),
            None => self.check("cuStreamSynchronize", unsafe { (self.table.cu_stream_synchronize)(stream) }),
        }
    }

    /// UUID of every CUDA device, queried once per driver.
    pub fn device_uuids(&self) -> Result<&[(CUdevice, [u8; 16])]> {
        if let Some(uuids) = self.device_uuids.get() {
            return Ok(uuids);
        }
        let mut count = 0;
        self.check("cuDeviceGetCount", unsafe { (self.table.cu_device_get_count)(&mut count) })?;
        let mut uuids = Vec::with_capacity(count.max(0) as usize);
        for ordinal in 0..count {
            let mut device: CUdevice = 0;
            self.check("cuDeviceGet", unsafe { (self.table.cu_device_get)(&mut device, ordinal) })?;
            let mut uuid = CUuuid::default();
            self.check("cuDeviceGetUuid", unsafe {
                (self.table.cu_device_get_uuid)(&mut uuid, device)
            })?;
            uuids.push((device, uuid.bytes));
        }
        Ok(self.device_uuids.get_or_init(|| uuids))
    }

    /// The CUDA device with the same UUID as the Vulkan physical device, if any.
    pub fn matching_device(&self, identity: &PhysicalDeviceIdentity) -> Result<Option<CUdevice>> {
        let found = super::find_device_by_uuid(self.device_uuids()?.iter().copied(), &identity.device_uuid);
        if found.is_none() {
            super::log_device_not_found(ComputeApi::Cuda, &identity.device_uuid);
        }
        Ok(found)
    }

    /// Retains `device`'s primary context and makes it current on this thread.
    pub fn retain_primary_context(self: &Arc<Self>, device: CUdevice) -> Result<CudaPrimaryContext> {
        let mut context: CUcontext = std::ptr::null_mut();
        self.check("cuDevicePrimaryCtxRetain", unsafe {
            (self.table.cu_device_primary_ctx_retain)(&mut context, device)
        })?;
        let retained = CudaPrimaryContext {
            driver: self.clone(),
            device,
            context,
        };
        self.check("cuCtxSetCurrent", unsafe { (self.table.cu_ctx_set_current)(context) })?;
        Ok(retained)
    }
}

/// A retained primary context, released on drop.
#[derive(Debug)]
pub struct CudaPrimaryContext {
    driver: Arc<CudaDriver>,
    device: CUdevice,
    context: CUcontext,
}

impl CudaPrimaryContext {
    pub fn device(&self) -> CUdevice {
        self.device
    }

    pub fn raw(&self) -> CUcontext {
        self.context
    }
}

impl Drop for CudaPrimaryContext {
    fn drop(&mut self) {
        let result = unsafe { (self.driver.table.cu_device_primary_ctx_release)(self.device) };
        if let Err(e) = self.driver.check("cuDevicePrimaryCtxRelease", result) {
            logwise::warn_sync!("could not release CUDA primary context: {e}", e = LogIt(&e));
        }
    }
}

fn library_names() -> &'static [&'static str] {
    if cfg!(windows) {
        &["nvcuda.dll"]
    } else {
        &["libcuda.so", "libcuda.so.1"]
    }
}

static CUDA: LibrarySlot<CudaDriver> = LibrarySlot::new();

/// Loads the CUDA driver library into the process-wide slot.
///
/// `Ok(false)` when no CUDA driver is installed.  A library missing required entry points is
/// [`Error::MissingSymbols`].  Calling this again after success does nothing.
pub fn initialize_cuda_function_table() -> Result<bool> {
    CUDA.initialize(|| {
        load_driver("CUDA", &candidates(library_names()), |library| {
            let table = unsafe { CudaFunctionTable::from_resolver(&library)? };
            unsafe { CudaDriver::from_table(table, Some(library)) }
        })
    })
}

pub fn is_cuda_function_table_initialized() -> bool {
    CUDA.is_initialized()
}

/// Drops the process-wide table.  Interop objects keep the library mapped until they are dropped.
pub fn free_cuda_function_table() {
    CUDA.free()
}

/// The process-wide driver, if [`initialize_cuda_function_table`] found one.
pub fn loaded_cuda_driver() -> Option<Arc<CudaDriver>> {
    CUDA.get()
}
