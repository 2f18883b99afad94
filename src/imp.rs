// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Backend implementations.
//!
//! Each backend is a dynamically loaded C API with its own handle types, status codes and
//! format enums.  Everything backend-specific lives under its module here; the wrappers in
//! [`crate::interop`] only dispatch on the backend tag.

pub mod cuda;
pub mod hip;
pub mod level_zero;
pub mod opencl;
pub mod sycl;

use logwise::privacy::LogIt;

/// Returns the first device whose UUID equals `uuid` byte for byte.
///
/// Used by backends that enumerate devices with a UUID query (CUDA, HIP).  No match is `None`;
/// we never fall back to a "closest" device.
pub(crate) fn find_device_by_uuid<D: Copy>(
    devices: impl IntoIterator<Item = (D, [u8; 16])>,
    uuid: &[u8; 16],
) -> Option<D> {
    devices
        .into_iter()
        .find(|(_, device_uuid)| device_uuid == uuid)
        .map(|(device, _)| device)
}

/// Logs a device-matching miss, which callers treat as "backend unusable for this device".
pub(crate) fn log_device_not_found(backend: crate::interop::ComputeApi, uuid: &[u8; 16]) {
    logwise::warn_sync!(
        "no {backend} device matches Vulkan device UUID {uuid}",
        backend = LogIt(&backend),
        uuid = LogIt(&uuid)
    );
}
