//! Error taxonomy for the interop layer.
//!
//! Errors fall into two families:
//!
//! - [`ErrorKind::Recoverable`]: the operation cannot be done *here*, but the caller can try
//!   something else (another backend, another resource shape, rendering without interop).
//!   Device-not-found and every `Unsupported*` variant belong to this family.
//! - [`ErrorKind::Fatal`]: a backend or Vulkan driver misbehaved, or a library was present
//!   but incomplete.  Continuing on this path would mean calling through a broken table.
//!
//! A backend library that simply is not installed is not an error at all; the loaders
//! report it as `Ok(false)`.

use std::panic::Location;

use ash::vk;
use logwise::privacy::LogIt;

use crate::interop::ComputeApi;

/// Whether the caller can reasonably fall back from an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Recoverable,
    Fatal,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The shared library was found, but it lacks entry points we need.
    #[error("{library}: at least one function pointer could not be loaded (missing: {missing:?})")]
    MissingSymbols {
        library: &'static str,
        missing: Vec<&'static str>,
    },

    #[error("Vulkan entry point {0} could not be resolved with vkGetDeviceProcAddr")]
    MissingVulkanEntryPoint(&'static str),

    #[error("Vulkan call {call} failed: {result}")]
    Vulkan {
        call: &'static str,
        result: vk::Result,
    },

    #[error("no {backend} device matches the Vulkan physical device")]
    DeviceNotFound { backend: ComputeApi },

    #[error("unsupported format {format:?} for {backend}")]
    UnsupportedFormat {
        backend: ComputeApi,
        format: vk::Format,
    },

    #[error("timeline semaphores are not supported by {backend}: {reason}")]
    TimelineSemaphoresUnsupported {
        backend: ComputeApi,
        reason: String,
    },

    #[error("{backend} cannot import images of view type {view_type:?}")]
    UnsupportedImageType {
        backend: ComputeApi,
        view_type: vk::ImageViewType,
    },

    #[error("subresource range of {count} from {base} does not fit the {available} available")]
    InvalidSubresourceRange { base: u32, count: u32, available: u32 },

    #[error("Level Zero external semaphore operations need an immediate command list")]
    UnsupportedCommandListType,

    #[error("{operation} is not supported for {backend}")]
    UnsupportedOperation {
        backend: ComputeApi,
        operation: &'static str,
    },

    #[error("no compute API is available for interop with this Vulkan device")]
    NoComputeApi,

    #[error("{0} was selected but the session has no state for it")]
    BackendNotConfigured(ComputeApi),

    #[error("the stream or event passed in does not belong to {expected}")]
    StreamMismatch { expected: ComputeApi },

    #[error("SYCL: {0}")]
    Sycl(String),

    #[error("{backend} call {call} failed with code {code} ({message}) at {location}")]
    Native {
        backend: ComputeApi,
        call: &'static str,
        code: i64,
        message: String,
        location: &'static Location<'static>,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Builds a native-call failure tagged with the caller's source location and logs it.
    #[track_caller]
    pub(crate) fn native(backend: ComputeApi, call: &'static str, code: i64, message: String) -> Self {
        let location = Location::caller();
        logwise::error_sync!(
            "{backend} call {call} failed with {code} ({message}) at {location}",
            backend = LogIt(&backend),
            call = LogIt(&call),
            code = code,
            message = LogIt(&message),
            location = LogIt(&location)
        );
        Error::Native {
            backend,
            call,
            code,
            message,
            location,
        }
    }

    pub(crate) fn vulkan(call: &'static str, result: vk::Result) -> Self {
        logwise::error_sync!(
            "Vulkan call {call} failed: {result}",
            call = LogIt(&call),
            result = LogIt(&result)
        );
        Error::Vulkan { call, result }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::DeviceNotFound { .. }
            | Error::UnsupportedFormat { .. }
            | Error::TimelineSemaphoresUnsupported { .. }
            | Error::UnsupportedImageType { .. }
            | Error::UnsupportedCommandListType
            | Error::UnsupportedOperation { .. } => ErrorKind::Recoverable,
            Error::NoComputeApi
            | Error::MissingSymbols { .. }
            | Error::MissingVulkanEntryPoint(_)
            | Error::Vulkan { .. }
            | Error::InvalidSubresourceRange { .. }
            | Error::BackendNotConfigured(_)
            | Error::StreamMismatch { .. }
            | Error::Sycl(_)
            | Error::Native { .. } => ErrorKind::Fatal,
        }
    }

    /// True for the unsupported-capability family a caller may fall back from.
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedFormat { .. }
                | Error::TimelineSemaphoresUnsupported { .. }
                | Error::UnsupportedImageType { .. }
                | Error::UnsupportedCommandListType
                | Error::UnsupportedOperation { .. }
        )
    }

    /// The raw backend status code, for native-call failures.
    pub fn native_code(&self) -> Option<i64> {
        match self {
            Error::Native { code, .. } => Some(*code),
            _ => None,
        }
    }
}
