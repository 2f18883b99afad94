//! Level Zero backend.
//!
//! Level Zero has no device-UUID search here: the device, context and queue come from the
//! application (usually extracted from a SYCL queue) and are carried by a
//! [`LevelZeroInteropContext`] that every Level Zero resource holds.

pub mod ffi;
pub(crate) mod format;
pub(crate) mod memory;
pub(crate) mod semaphore;

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::imp::sycl::SyclQueue;
use crate::interop::ComputeApi;
use crate::loader::{LibraryHandle, LibrarySlot, SymbolResolver, candidates, load_driver};
use ffi::*;

/// A loaded Level Zero loader library.
pub struct LevelZeroDriver {
    pub(crate) table: LevelZeroFunctionTable,
    _library: LibraryHandle,
}

impl std::fmt::Debug for LevelZeroDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LevelZeroDriver")
            .field("external_semaphores", &self.supports_external_semaphores())
            .finish_non_exhaustive()
    }
}

/// Name of a Level Zero status code.
///
/// Level Zero has no error-string query, so this is a static table.
pub fn result_name(result: ze_result_t) -> &'static str {
    ZE_RESULT_NAMES
        .iter()
        .find(|(code, _)| *code == result)
        .map(|(_, name)| *name)
        .unwrap_or("unknown ze_result_t")
}

impl LevelZeroDriver {
    /// # Safety
    /// Every symbol `resolver` returns must have the Level Zero signature of its name.
    pub unsafe fn from_resolver(resolver: &dyn SymbolResolver) -> Result<Self> {
        let table = unsafe { LevelZeroFunctionTable::from_resolver(resolver)? };
        Self::from_table(table, None)
    }

    fn from_table(table: LevelZeroFunctionTable, library: LibraryHandle) -> Result<Self> {
        let driver = LevelZeroDriver {
            table,
            _library: library,
        };
        driver.check("zeInit", unsafe { (driver.table.ze_init)(0) })?;
        logwise::info_sync!(
            "Level Zero initialized, external semaphores: {semaphores}",
            semaphores = driver.supports_external_semaphores()
        );
        Ok(driver)
    }

    #[track_caller]
    pub(crate) fn check(&self, call: &'static str, result: ze_result_t) -> Result<()> {
        if result == ZE_RESULT_SUCCESS {
            Ok(())
        } else {
            Err(Error::native(ComputeApi::LevelZero, call, result as i64, result_name(result).to_string()))
        }
    }

    /// Whether the loader exports the external semaphore extension.
    pub fn supports_external_semaphores(&self) -> bool {
        self.table.ze_device_import_external_semaphore_ext.is_some()
            && self.table.ze_device_release_external_semaphore_ext.is_some()
            && self.table.ze_command_list_append_signal_external_semaphore_ext.is_some()
            && self.table.ze_command_list_append_wait_external_semaphore_ext.is_some()
    }
}

fn library_names() -> &'static [&'static str] {
    if cfg!(windows) {
        &["ze_loader.dll"]
    } else {
        &["libze_loader.so.1", "libze_loader.so"]
    }
}

static LEVEL_ZERO: LibrarySlot<LevelZeroDriver> = LibrarySlot::new();

/// Loads the Level Zero loader into the process-wide slot.  `Ok(false)` when it is not installed.
pub fn initialize_level_zero_function_table() -> Result<bool> {
    LEVEL_ZERO.initialize(|| {
        load_driver("Level Zero", &candidates(library_names()), |library| {
            let table = unsafe { LevelZeroFunctionTable::from_resolver(&library)? };
            LevelZeroDriver::from_table(table, Some(library))
        })
    })
}

pub fn is_level_zero_function_table_initialized() -> bool {
    LEVEL_ZERO.is_initialized()
}

pub fn free_level_zero_function_table() {
    LEVEL_ZERO.free()
}

pub fn loaded_level_zero_driver() -> Option<Arc<LevelZeroDriver>> {
    LEVEL_ZERO.get()
}

/// Native handles behind a Level Zero backed SYCL queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelZeroNativeHandles {
    pub device: ze_device_handle_t,
    pub context: ze_context_handle_t,
    /// Set for queues that submit through a command queue.
    pub command_queue: Option<ze_command_queue_handle_t>,
    /// Set for queues backed by an immediate command list.
    pub immediate_command_list: Option<ze_command_list_handle_t>,
}

/// The device, context and submission state shared by every Level Zero interop object.
///
/// Built once before any interop object is created and immutable afterwards; resources hold it
/// through an `Arc`.
pub struct LevelZeroInteropContext {
    driver: Arc<LevelZeroDriver>,
    device: ze_device_handle_t,
    context: ze_context_handle_t,
    command_queue: Option<ze_command_queue_handle_t>,
    fence: Option<ze_fence_handle_t>,
    signal_event: Option<ze_event_handle_t>,
    wait_events: Vec<ze_event_handle_t>,
    immediate_command_lists: bool,
    use_bindless_images: bool,
}

impl std::fmt::Debug for LevelZeroInteropContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LevelZeroInteropContext")
            .field("device", &self.device)
            .field("context", &self.context)
            .field("command_queue", &self.command_queue)
            .field("immediate_command_lists", &self.immediate_command_lists)
            .field("use_bindless_images", &self.use_bindless_images)
            .finish_non_exhaustive()
    }
}

/// Builder for [`LevelZeroInteropContext`].
#[derive(Debug)]
pub struct LevelZeroInteropContextBuilder {
    driver: Arc<LevelZeroDriver>,
    device: ze_device_handle_t,
    context: ze_context_handle_t,
    command_queue: Option<ze_command_queue_handle_t>,
    signal_event: Option<ze_event_handle_t>,
    wait_events: Vec<ze_event_handle_t>,
    immediate_command_lists: bool,
    use_bindless_images: bool,
}

impl LevelZeroInteropContextBuilder {
    /// Queue used to execute deferred command lists in
    /// [`LevelZeroInteropContext::wait_for_completion`].  A fence is created on it.
    pub fn command_queue(mut self, queue: ze_command_queue_handle_t) -> Self {
        self.command_queue = Some(queue);
        self
    }

    /// Event signaled by every append that the caller gives no event for.
    pub fn signal_event(mut self, event: ze_event_handle_t) -> Self {
        self.signal_event = Some(event);
        self
    }

    /// Events every append waits on.
    pub fn wait_events(mut self, events: Vec<ze_event_handle_t>) -> Self {
        self.wait_events = events;
        self
    }

    /// Whether the command lists passed to operations are immediate.
    pub fn immediate_command_lists(mut self, immediate: bool) -> Self {
        self.immediate_command_lists = immediate;
        self
    }

    /// Imports 2D images through a pitched allocation and the bindless image extension.
    pub fn use_bindless_images(mut self, bindless: bool) -> Self {
        self.use_bindless_images = bindless;
        self
    }

    pub fn build(self) -> Result<Arc<LevelZeroInteropContext>> {
        let mut fence = None;
        if let Some(queue) = self.command_queue {
            let desc = ze_fence_desc_t {
                stype: ZE_STRUCTURE_TYPE_FENCE_DESC,
                pNext: std::ptr::null(),
                flags: 0,
            };
            let mut handle: ze_fence_handle_t = std::ptr::null_mut();
            self.driver
                .check("zeFenceCreate", unsafe { (self.driver.table.ze_fence_create)(queue, &desc, &mut handle) })?;
            fence = Some(handle);
        }
        logwise::info_sync!(
            "Level Zero interop context ready, immediate lists: {immediate}, bindless images: {bindless}",
            immediate = self.immediate_command_lists,
            bindless = self.use_bindless_images
        );
        Ok(Arc::new(LevelZeroInteropContext {
            driver: self.driver,
            device: self.device,
            context: self.context,
            command_queue: self.command_queue,
            fence,
            signal_event: self.signal_event,
            wait_events: self.wait_events,
            immediate_command_lists: self.immediate_command_lists,
            use_bindless_images: self.use_bindless_images,
        }))
    }
}

impl LevelZeroInteropContext {
    pub fn builder(
        driver: Arc<LevelZeroDriver>,
        device: ze_device_handle_t,
        context: ze_context_handle_t,
    ) -> LevelZeroInteropContextBuilder {
        LevelZeroInteropContextBuilder {
            driver,
            device,
            context,
            command_queue: None,
            signal_event: None,
            wait_events: Vec::new(),
            immediate_command_lists: false,
            use_bindless_images: false,
        }
    }

    /// A builder preset from the native handles of a Level Zero backed SYCL queue.
    pub fn from_sycl_queue(driver: Arc<LevelZeroDriver>, queue: &dyn SyclQueue) -> Result<LevelZeroInteropContextBuilder> {
        let handles = queue.level_zero_handles().ok_or_else(|| {
            logwise::warn_sync!("SYCL queue is not backed by Level Zero");
            Error::UnsupportedOperation {
                backend: ComputeApi::LevelZero,
                operation: "native handle extraction from a non Level Zero SYCL queue",
            }
        })?;
        let mut builder = Self::builder(driver, handles.device, handles.context);
        builder.command_queue = handles.command_queue;
        builder.immediate_command_lists = handles.immediate_command_list.is_some();
        Ok(builder)
    }

    pub fn driver(&self) -> &Arc<LevelZeroDriver> {
        &self.driver
    }

    pub fn device(&self) -> ze_device_handle_t {
        self.device
    }

    pub fn context(&self) -> ze_context_handle_t {
        self.context
    }

    pub fn uses_immediate_command_lists(&self) -> bool {
        self.immediate_command_lists
    }

    pub fn uses_bindless_images(&self) -> bool {
        self.use_bindless_images
    }

    /// Signal event and wait list for one append.
    pub(crate) fn append_events(&self, event: Option<ze_event_handle_t>) -> (ze_event_handle_t, u32, *mut ze_event_handle_t) {
        let signal = event.or(self.signal_event).unwrap_or(std::ptr::null_mut());
        let waits = if self.wait_events.is_empty() {
            std::ptr::null_mut()
        } else {
            //Level Zero does not write through the wait list
            self.wait_events.as_ptr() as *mut ze_event_handle_t
        };
        (signal, self.wait_events.len() as u32, waits)
    }

    /// Fails unless operations run on immediate command lists.
    pub(crate) fn require_immediate_command_lists(&self) -> Result<()> {
        if self.immediate_command_lists {
            Ok(())
        } else {
            logwise::warn_sync!("Level Zero external semaphore operation on a deferred command list");
            Err(Error::UnsupportedCommandListType)
        }
    }

    /// Blocks until the work appended to `list` has finished.
    ///
    /// With an event, waits on the event.  An immediate list is synchronized directly; a
    /// deferred one is closed, executed on the context's command queue with its fence, waited
    /// for, and reset so it can be recorded again.
    pub fn wait_for_completion(&self, list: ze_command_list_handle_t, event: Option<ze_event_handle_t>) -> Result<()> {
        let table = &self.driver.table;
        if let Some(event) = event {
            return self
                .driver
                .check("zeEventHostSynchronize", unsafe { (table.ze_event_host_synchronize)(event, u64::MAX) });
        }
        if self.immediate_command_lists {
            let synchronize = table.ze_command_list_host_synchronize.ok_or(Error::UnsupportedOperation {
                backend: ComputeApi::LevelZero,
                operation: "zeCommandListHostSynchronize",
            })?;
            return self
                .driver
                .check("zeCommandListHostSynchronize", unsafe { synchronize(list, u64::MAX) });
        }
        let (Some(queue), Some(fence)) = (self.command_queue, self.fence) else {
            return Err(Error::UnsupportedOperation {
                backend: ComputeApi::LevelZero,
                operation: "waiting on a deferred command list without a command queue",
            });
        };
        let mut list = list;
        self.driver.check("zeCommandListClose", unsafe { (table.ze_command_list_close)(list) })?;
        self.driver.check("zeCommandQueueExecuteCommandLists", unsafe {
            (table.ze_command_queue_execute_command_lists)(queue, 1, &mut list, fence)
        })?;
        self.driver
            .check("zeFenceHostSynchronize", unsafe { (table.ze_fence_host_synchronize)(fence, u64::MAX) })?;
        self.driver.check("zeFenceReset", unsafe { (table.ze_fence_reset)(fence) })?;
        self.driver.check("zeCommandListReset", unsafe { (table.ze_command_list_reset)(list) })
    }
}

impl Drop for LevelZeroInteropContext {
    fn drop(&mut self) {
        if let Some(fence) = self.fence {
            //logged by check
            let _ = self
                .driver
                .check("zeFenceDestroy", unsafe { (self.driver.table.ze_fence_destroy)(fence) });
        }
    }
}
