// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Matching an OpenCL device to the Vulkan physical device.
//!
//! OpenCL drivers often expose neither a UUID nor the marketing name Vulkan reports (ROCm
//! reports the chip codename, POCL its own CPU naming).  The UUID from `cl_khr_device_uuid`
//! decides when available; otherwise these stages run in order and the first hit wins:
//!
//! 1. the device names are equal;
//! 2. the vendor IDs are equal and at least half the words of the Vulkan name occur in the
//!    OpenCL name (case-insensitive substring search);
//! 3. as 2, against the AMD board name (`cl_amd_device_attribute_query`).
//!
//! No hit is "not found"; the matcher never picks a closest device.

use crate::vulkan::PhysicalDeviceIdentity;

/// What an OpenCL device says about itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpenClDeviceIdentity {
    pub device_name: String,
    pub vendor_id: u32,
    /// `CL_DEVICE_UUID_KHR`, when `cl_khr_device_uuid` is supported.
    pub uuid: Option<[u8; 16]>,
    /// `CL_DEVICE_BOARD_NAME_AMD`, when `cl_amd_device_attribute_query` is supported.
    pub board_name: Option<String>,
}

/// True if at least half of the words of `vulkan_name` occur in `opencl_name`.
pub fn token_majority(vulkan_name: &str, opencl_name: &str) -> bool {
    let haystack = opencl_name.to_lowercase();
    let tokens: Vec<String> = vulkan_name.split_whitespace().map(str::to_lowercase).collect();
    if tokens.is_empty() {
        return false;
    }
    let found = tokens.iter().filter(|t| haystack.contains(t.as_str())).count();
    found * 2 >= tokens.len()
}

/// The candidate representing the same GPU as `vulkan`, if any.
pub fn match_device<D: Copy>(vulkan: &PhysicalDeviceIdentity, candidates: &[(D, OpenClDeviceIdentity)]) -> Option<D> {
    if let Some((device, _)) = candidates
        .iter()
        .find(|(_, identity)| identity.uuid.as_ref() == Some(&vulkan.device_uuid))
    {
        return Some(*device);
    }
    //a device that reports a different UUID is not a candidate for name heuristics
    let heuristic: Vec<&(D, OpenClDeviceIdentity)> = candidates.iter().filter(|(_, identity)| identity.uuid.is_none()).collect();
    if let Some((device, _)) = heuristic.iter().find(|(_, identity)| identity.device_name == vulkan.device_name) {
        return Some(*device);
    }
    if let Some((device, _)) = heuristic.iter().find(|(_, identity)| {
        identity.vendor_id == vulkan.vendor_id && token_majority(&vulkan.device_name, &identity.device_name)
    }) {
        return Some(*device);
    }
    heuristic
        .iter()
        .find(|(_, identity)| {
            identity.vendor_id == vulkan.vendor_id
                && identity
                    .board_name
                    .as_deref()
                    .is_some_and(|board| token_majority(&vulkan.device_name, board))
        })
        .map(|(device, _)| *device)
}
