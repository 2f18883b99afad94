//! HIP (ROCm) backend.
//!
//! Mirrors the CUDA backend through the HIP runtime API.  hiprtc, the HIP runtime compiler, is
//! loaded separately since it ships as its own library.

pub mod ffi;
pub(crate) mod format;
pub(crate) mod memory;
pub(crate) mod semaphore;

use std::ffi::{CStr, CString, c_char};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use logwise::privacy::LogIt;

use crate::error::{Error, Result};
use crate::interop::ComputeApi;
use crate::loader::{LibraryHandle, LibrarySlot, SymbolResolver, candidates, load_driver};
use crate::vulkan::PhysicalDeviceIdentity;
use ffi::*;

/// First runtime version (`major * 10000000 + minor * 100000 + patch`, so 6.0) with timeline
/// semaphore import.
pub const MIN_TIMELINE_RUNTIME_VERSION: i32 = 60000000;

/// A loaded HIP runtime.
pub struct HipDriver {
    pub(crate) table: HipFunctionTable,
    runtime_version: i32,
    device_uuids: OnceLock<Vec<(hipDevice_t, [u8; 16])>>,
    _library: LibraryHandle,
}

impl std::fmt::Debug for HipDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HipDriver")
            .field("runtime_version", &self.runtime_version)
            .finish_non_exhaustive()
    }
}

impl HipDriver {
    /// # Safety
    /// Every symbol `resolver` returns must have the HIP runtime signature of its name.
    pub unsafe fn from_resolver(resolver: &dyn SymbolResolver) -> Result<Self> {
        let table = unsafe { HipFunctionTable::from_resolver(resolver)? };
        Self::from_table(table, None)
    }

    fn from_table(table: HipFunctionTable, library: LibraryHandle) -> Result<Self> {
        let mut driver = HipDriver {
            table,
            runtime_version: 0,
            device_uuids: OnceLock::new(),
            _library: library,
        };
        driver.check("hipInit", unsafe { (driver.table.hip_init)(0) })?;
        let mut version = 0;
        driver.check("hipRuntimeGetVersion", unsafe {
            (driver.table.hip_runtime_get_version)(&mut version)
        })?;
        driver.runtime_version = version;
        logwise::info_sync!("HIP runtime version {version}", version = version);
        Ok(driver)
    }

    pub fn runtime_version(&self) -> i32 {
        self.runtime_version
    }

    pub fn supports_timeline_semaphores(&self) -> bool {
        self.runtime_version >= MIN_TIMELINE_RUNTIME_VERSION
    }

    pub fn error_string(&self, error: hipError_t) -> String {
        let text = unsafe { (self.table.hip_get_error_string)(error) };
        let mut message = if text.is_null() {
            format!("unknown hipError_t {error}")
        } else {
            unsafe { CStr::from_ptr(text) }.to_string_lossy().into_owned()
        };
        if let Some(get_name) = self.table.hip_get_error_name {
            let name = unsafe { get_name(error) };
            if !name.is_null() {
                message = format!("{}: {message}", unsafe { CStr::from_ptr(name) }.to_string_lossy());
            }
        }
        message
    }

    #[track_caller]
    pub(crate) fn check(&self, call: &'static str, error: hipError_t) -> Result<()> {
        if error == hipSuccess {
            Ok(())
        } else {
            Err(Error::native(ComputeApi::Hip, call, error as i64, self.error_string(error)))
        }
    }

    pub(crate) fn record_event(&self, event: Option<hipEvent_t>, stream: hipStream_t) -> Result<()> {
        match event {
            Some(event) => self.check("hipEventRecord", unsafe { (self.table.hip_event_record)(event, stream) }),
            None => Ok(()),
        }
    }

    pub(crate) fn wait_for_completion(&self, stream: hipStream_t, event: Option<hipEvent_t>) -> Result<()> {
        match event {
            Some(event) => self.check("hipEventSynchronize", unsafe { (self.table.hip_event_synchronize)(event) }),
            None => self.check("hipStreamSynchronize", unsafe { (self.table.hip_stream_synchronize)(stream) }),
        }
    }

    /// UUID of every HIP device, queried once per driver.
    pub fn device_uuids(&self) -> Result<&[(hipDevice_t, [u8; 16])]> {
        if let Some(uuids) = self.device_uuids.get() {
            return Ok(uuids);
        }
        let mut count = 0;
        self.check("hipGetDeviceCount", unsafe { (self.table.hip_get_device_count)(&mut count) })?;
        let mut uuids = Vec::with_capacity(count.max(0) as usize);
        for ordinal in 0..count {
            let mut device: hipDevice_t = 0;
            self.check("hipDeviceGet", unsafe { (self.table.hip_device_get)(&mut device, ordinal) })?;
            let mut uuid = hipUUID::default();
            self.check("hipDeviceGetUuid", unsafe { (self.table.hip_device_get_uuid)(&mut uuid, device) })?;
            uuids.push((device, uuid.bytes));
        }
        Ok(self.device_uuids.get_or_init(|| uuids))
    }

    /// The HIP device with the same UUID as the Vulkan physical device, if any.
    pub fn matching_device(&self, identity: &PhysicalDeviceIdentity) -> Result<Option<hipDevice_t>> {
        let found = super::find_device_by_uuid(self.device_uuids()?.iter().copied(), &identity.device_uuid);
        if found.is_none() {
            super::log_device_not_found(ComputeApi::Hip, &identity.device_uuid);
        }
        Ok(found)
    }

    /// Makes `device` current on the calling thread.
    pub fn set_device(&self, device: hipDevice_t) -> Result<()> {
        self.check("hipSetDevice", unsafe { (self.table.hip_set_device)(device) })
    }
}

fn library_names() -> &'static [&'static str] {
    if cfg!(windows) {
        &["amdhip64.dll", "amdhip64_6.dll"]
    } else {
        &["libamdhip64.so", "libamdhip64.so.6"]
    }
}

static HIP: LibrarySlot<HipDriver> = LibrarySlot::new();

/// Loads the HIP runtime into the process-wide slot.  `Ok(false)` when HIP is not installed.
pub fn initialize_hip_function_table() -> Result<bool> {
    HIP.initialize(|| {
        load_driver("HIP", &candidates(library_names()), |library| {
            let table = unsafe { HipFunctionTable::from_resolver(&library)? };
            HipDriver::from_table(table, Some(library))
        })
    })
}

pub fn is_hip_function_table_initialized() -> bool {
    HIP.is_initialized()
}

pub fn free_hip_function_table() {
    HIP.free()
}

pub fn loaded_hip_driver() -> Option<Arc<HipDriver>> {
    HIP.get()
}

/// The HIP runtime compiler.
pub struct HiprtcDriver {
    table: HiprtcFunctionTable,
    _library: LibraryHandle,
}

impl std::fmt::Debug for HiprtcDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HiprtcDriver").finish_non_exhaustive()
    }
}

/// Output of a failed [`HiprtcDriver::compile_program`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileFailure {
    pub code: hiprtcResult,
    pub log: String,
}

impl HiprtcDriver {
    /// # Safety
    /// Every symbol `resolver` returns must have the hiprtc signature of its name.
    pub unsafe fn from_resolver(resolver: &dyn SymbolResolver) -> Result<Self> {
        Ok(HiprtcDriver {
            table: unsafe { HiprtcFunctionTable::from_resolver(resolver)? },
            _library: None,
        })
    }

    fn error_string(&self, result: hiprtcResult) -> String {
        let text = unsafe { (self.table.hiprtc_get_error_string)(result) };
        if text.is_null() {
            format!("unknown hiprtcResult {result}")
        } else {
            unsafe { CStr::from_ptr(text) }.to_string_lossy().into_owned()
        }
    }

    #[track_caller]
    fn check(&self, call: &'static str, result: hiprtcResult) -> Result<()> {
        if result == HIPRTC_SUCCESS {
            Ok(())
        } else {
            Err(Error::native(ComputeApi::Hip, call, result as i64, self.error_string(result)))
        }
    }

    fn program_log(&self, program: hiprtcProgram) -> Result<String> {
        let mut size = 0usize;
        self.check("hiprtcGetProgramLogSize", unsafe {
            (self.table.hiprtc_get_program_log_size)(program, &mut size)
        })?;
        let mut log = vec![0u8; size.max(1)];
        self.check("hiprtcGetProgramLog", unsafe {
            (self.table.hiprtc_get_program_log)(program, log.as_mut_ptr() as *mut c_char)
        })?;
        let end = log.iter().position(|b| *b == 0).unwrap_or(log.len());
        Ok(String::from_utf8_lossy(&log[..end]).into_owned())
    }

    /// Compiles `source` into a code object.
    ///
    /// The outer error is a failure of hiprtc itself; the inner one carries the build log of a
    /// program that did not compile.
    pub fn compile_program(
        &self,
        source: &str,
        name: &str,
        options: &[&str],
    ) -> Result<std::result::Result<Vec<u8>, CompileFailure>> {
        let to_c = |s: &str| {
            CString::new(s).map_err(|_| Error::UnsupportedOperation {
                backend: ComputeApi::Hip,
                operation: "compiling a program containing NUL bytes",
            })
        };
        let source = to_c(source)?;
        let name = to_c(name)?;
        let options = options.iter().map(|o| to_c(o)).collect::<Result<Vec<_>>>()?;
        let option_ptrs: Vec<*const c_char> = options.iter().map(|o| o.as_ptr()).collect();

        let mut program: hiprtcProgram = std::ptr::null_mut();
        self.check("hiprtcCreateProgram", unsafe {
            (self.table.hiprtc_create_program)(
                &mut program,
                source.as_ptr(),
                name.as_ptr(),
                0,
                std::ptr::null(),
                std::ptr::null(),
            )
        })?;
        let program = ProgramGuard { rtc: self, program };

        let compiled = unsafe {
            (self.table.hiprtc_compile_program)(program.program, option_ptrs.len() as i32, option_ptrs.as_ptr())
        };
        if compiled != HIPRTC_SUCCESS {
            let log = self.program_log(program.program)?;
            logwise::warn_sync!(
                "hiprtc could not compile {name}: {log}",
                name = LogIt(&name),
                log = LogIt(&log)
            );
            return Ok(Err(CompileFailure { code: compiled, log }));
        }

        let mut size = 0usize;
        self.check("hiprtcGetCodeSize", unsafe {
            (self.table.hiprtc_get_code_size)(program.program, &mut size)
        })?;
        let mut code = vec![0u8; size];
        self.check("hiprtcGetCode", unsafe {
            (self.table.hiprtc_get_code)(program.program, code.as_mut_ptr() as *mut c_char)
        })?;
        Ok(Ok(code))
    }
}

struct ProgramGuard<'a> {
    rtc: &'a HiprtcDriver,
    program: hiprtcProgram,
}

impl Drop for ProgramGuard<'_> {
    fn drop(&mut self) {
        let _ = self.rtc.check("hiprtcDestroyProgram", unsafe {
            (self.rtc.table.hiprtc_destroy_program)(&mut self.program)
        });
    }
}

/// Picks the hiprtc DLLs out of a directory listing, newest version first.
///
/// ROCm on Windows installs e.g. `hiprtc0605.dll` next to `hiprtc-builtins0605.dll`; only the
/// former is the compiler.
pub fn select_hiprtc_dlls<'a>(file_names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut dlls: Vec<String> = file_names
        .into_iter()
        .filter(|name| {
            let lower = name.to_ascii_lowercase();
            lower.starts_with("hiprtc") && lower.ends_with(".dll") && !lower.starts_with("hiprtc-builtins")
        })
        .map(str::to_owned)
        .collect();
    dlls.sort_by(|a, b| b.cmp(a));
    dlls
}

/// Search list for the hiprtc library.
///
/// On Windows the `bin` directory of `hip_path` (normally `%HIP_PATH%`) is scanned for
/// `hiprtc*.dll`, falling back to the plain name on the loader path.
pub fn hiprtc_library_candidates(hip_path: Option<&Path>) -> Vec<PathBuf> {
    if cfg!(windows) {
        let mut found = Vec::new();
        if let Some(bin) = hip_path.map(|p| p.join("bin")) {
            match std::fs::read_dir(&bin) {
                Ok(entries) => {
                    let names: Vec<String> = entries
                        .filter_map(|e| e.ok())
                        .map(|e| e.file_name().to_string_lossy().into_owned())
                        .collect();
                    found.extend(select_hiprtc_dlls(names.iter().map(String::as_str)).into_iter().map(|n| bin.join(n)));
                }
                Err(e) => {
                    logwise::info_sync!(
                        "could not list {bin}: {e}",
                        bin = LogIt(&bin),
                        e = LogIt(&e)
                    );
                }
            }
        }
        found.push(PathBuf::from("hiprtc.dll"));
        found
    } else {
        candidates(&["libhiprtc.so", "libhiprtc.so.6", "libhiprtc.so.5"])
    }
}

static HIPRTC: LibrarySlot<HiprtcDriver> = LibrarySlot::new();

/// Loads hiprtc into the process-wide slot.  `Ok(false)` when it is not installed.
pub fn initialize_hiprtc_function_table() -> Result<bool> {
    HIPRTC.initialize(|| {
        let hip_path = std::env::var_os("HIP_PATH").map(PathBuf::from);
        load_driver("hiprtc", &hiprtc_library_candidates(hip_path.as_deref()), |library| {
            Ok(HiprtcDriver {
                table: unsafe { HiprtcFunctionTable::from_resolver(&library)? },
                _library: Some(library),
            })
        })
    })
}

pub fn is_hiprtc_function_table_initialized() -> bool {
    HIPRTC.is_initialized()
}

pub fn free_hiprtc_function_table() {
    HIPRTC.free()
}

pub fn loaded_hiprtc_driver() -> Option<Arc<HiprtcDriver>> {
    HIPRTC.get()
}
