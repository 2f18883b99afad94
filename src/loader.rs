// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Dynamic loading of backend function tables.
//!
//! Every backend ships as a shared library we `dlopen`/`LoadLibrary` at run time.  A backend's
//! table is declared with [`function_table!`], which expands to a struct of function pointers
//! plus a constructor that resolves every symbol by name through a [`SymbolResolver`].
//!
//! Two failure modes are kept apart on purpose:
//!
//! - the library is not there at all: the backend is not installed, [`LibrarySlot::initialize`]
//!   returns `Ok(false)` and logs at info level;
//! - the library is there but a *required* symbol is missing: [`crate::Error::MissingSymbols`].  A
//!   partially filled table is never handed out.

use std::collections::HashMap;
use std::ffi::c_void;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use logwise::privacy::LogIt;

use crate::error::Result;

/// Something that maps a symbol name to an address.
///
/// [`libloading::Library`] is the production implementation; tests resolve against a
/// `HashMap` of mock functions.
pub trait SymbolResolver {
    /// Address of `name`, or null if the symbol does not exist.
    fn resolve(&self, name: &str) -> *const c_void;
}

impl SymbolResolver for libloading::Library {
    fn resolve(&self, name: &str) -> *const c_void {
        //safe: we only read the address, the caller transmutes it to the declared signature
        match unsafe { self.get::<unsafe extern "C" fn()>(name.as_bytes()) } {
            Ok(symbol) => *symbol as *const c_void,
            Err(_) => std::ptr::null(),
        }
    }
}

impl SymbolResolver for HashMap<&'static str, *const c_void> {
    fn resolve(&self, name: &str) -> *const c_void {
        self.get(name).copied().unwrap_or(std::ptr::null())
    }
}

/// Declares a function table resolved by symbol name.
///
/// ```ignore
/// function_table! {
///     pub struct CudaFunctionTable for "CUDA driver" {
///         required {
///             cu_init: "cuInit" => unsafe extern "C" fn(u32) -> i32,
///         }
///         optional {
///             cu_device_get_uuid_v2: "cuDeviceGetUuid_v2" => unsafe extern "C" fn(*mut Uuid, i32) -> i32,
///         }
///     }
/// }
/// ```
///
/// Optional entries become `Option<fn>` fields and never fail the load.
macro_rules! function_table {
    (
        $(#[$meta:meta])*
        pub struct $name:ident for $library:literal {
            required {
                $( $field:ident : $symbol:literal => $ty:ty, )*
            }
            optional {
                $( $opt_field:ident : $opt_symbol:literal => $opt_ty:ty, )*
            }
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy)]
        pub struct $name {
            $( pub $field: $ty, )*
            $( pub $opt_field: Option<$opt_ty>, )*
        }

        impl $name {
            /// Names of every required symbol, in declaration order.
            pub const REQUIRED_SYMBOLS: &'static [&'static str] = &[$($symbol),*];

            /// Resolves every entry point through `resolver`.
            ///
            /// # Safety
            ///
            /// Each resolved address must really point at a function with the declared signature.
            pub unsafe fn from_resolver(
                resolver: &dyn $crate::loader::SymbolResolver,
            ) -> $crate::error::Result<Self> {
                let mut missing: Vec<&'static str> = Vec::new();
                $(
                    let $field = resolver.resolve($symbol);
                    if $field.is_null() {
                        missing.push($symbol);
                    }
                )*
                if !missing.is_empty() {
                    logwise::error_sync!(
                        "{library}: at least one function pointer could not be loaded",
                        library = logwise::privacy::LogIt(&$library),
                        missing = logwise::privacy::LogIt(&missing)
                    );
                    return Err($crate::error::Error::MissingSymbols {
                        library: $library,
                        missing,
                    });
                }
                unsafe {
                    Ok(Self {
                        $( $field: std::mem::transmute::<*const std::ffi::c_void, $ty>($field), )*
                        $( $opt_field: std::mem::transmute::<*const std::ffi::c_void, Option<$opt_ty>>(
                            resolver.resolve($opt_symbol),
                        ), )*
                    })
                }
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("library", &$library)
                    .finish_non_exhaustive()
            }
        }
    };
}
pub(crate) use function_table;

/// A library opened from disk, or nothing when the table came from another resolver.
pub(crate) type LibraryHandle = Option<libloading::Library>;

/// Opens the first loadable library from `candidates`.
///
/// `None` means the backend is not installed, which callers treat as a soft condition.
pub(crate) fn open_first(candidates: &[PathBuf]) -> Option<(libloading::Library, PathBuf)> {
    for candidate in candidates {
        //safe as far as we can be: loading a vendor library runs its initializers
        match unsafe { libloading::Library::new(candidate) } {
            Ok(library) => return Some((library, candidate.clone())),
            Err(e) => {
                logwise::trace_sync!(
                    "could not open {candidate}: {e}",
                    candidate = LogIt(&candidate),
                    e = LogIt(&e)
                );
            }
        }
    }
    None
}

/// Converts fixed library file names into search candidates.
pub(crate) fn candidates(names: &[&str]) -> Vec<PathBuf> {
    names.iter().map(PathBuf::from).collect()
}

/// Process-wide storage for one backend's loaded driver.
///
/// Written once during setup and torn down at shutdown; everything in between only reads.
/// Wrappers hold their own `Arc` to the driver, so the library stays mapped until the last
/// wrapper using it is dropped even if [`LibrarySlot::free`] ran earlier.
pub(crate) struct LibrarySlot<T> {
    slot: RwLock<Option<Arc<T>>>,
}

impl<T> LibrarySlot<T> {
    pub(crate) const fn new() -> Self {
        LibrarySlot {
            slot: RwLock::new(None),
        }
    }

    /// Loads the driver with `load` unless it is already present.
    ///
    /// `load` returns `Ok(None)` when the library is absent.
    pub(crate) fn initialize(&self, load: impl FnOnce() -> Result<Option<T>>) -> Result<bool> {
        let mut guard = self.slot.write().unwrap_or_else(|e| e.into_inner());
        if guard.is_some() {
            return Ok(true);
        }
        match load()? {
            Some(driver) => {
                *guard = Some(Arc::new(driver));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub(crate) fn get(&self) -> Option<Arc<T>> {
        self.slot.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub(crate) fn is_initialized(&self) -> bool {
        self.slot.read().unwrap_or_else(|e| e.into_inner()).is_some()
    }

    pub(crate) fn free(&self) {
        self.slot.write().unwrap_or_else(|e| e.into_inner()).take();
    }
}

/// Loads a driver from the first library in `candidates`.
///
/// Absent library: `Ok(None)` with an info log.  Present but incomplete: the resolver error.
pub(crate) fn load_driver<T>(
    backend_name: &'static str,
    candidates: &[PathBuf],
    build: impl FnOnce(libloading::Library) -> Result<T>,
) -> Result<Option<T>> {
    match open_first(candidates) {
        Some((library, path)) => {
            logwise::info_sync!(
                "{backend} library loaded from {path}",
                backend = LogIt(&backend_name),
                path = LogIt(&path)
            );
            build(library).map(Some)
        }
        None => {
            logwise::info_sync!(
                "{backend} library not found; interop through it is unavailable",
                backend = LogIt(&backend_name),
                candidates = LogIt(&candidates)
            );
            Ok(None)
        }
    }
}
