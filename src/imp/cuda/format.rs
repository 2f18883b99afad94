//! Vulkan to CUDA format and sampler translation.

use ash::vk;

use super::ffi::*;
use crate::error::{Error, Result};
use crate::format::{ChannelKind, DepthStencil, FormatInfo, format_info};
use crate::interop::{ComputeApi, TextureSettings};

fn unsupported(format: vk::Format) -> Error {
    logwise::warn_sync!(
        "CUDA has no array format for {format}",
        format = logwise::privacy::LogIt(&format)
    );
    Error::UnsupportedFormat {
        backend: ComputeApi::Cuda,
        format,
    }
}

/// Channel count and uniform width, restricted to what CUDA arrays can hold.
fn cuda_layout(format: vk::Format) -> Result<(FormatInfo, u32, u8)> {
    let info = format_info(format).ok_or_else(|| unsupported(format))?;
    if info.depth_stencil == DepthStencil::DepthStencil {
        return Err(unsupported(format));
    }
    let channels = info.channel_count();
    let bits = info.uniform_channel_bits().ok_or_else(|| unsupported(format))?;
    if !matches!(channels, 1 | 2 | 4) {
        return Err(unsupported(format));
    }
    Ok((info, channels, bits))
}

/// `CUarray_format` and channel count for `format`.
///
/// Normalization is not part of the array format: UNORM and sRGB data is stored as unsigned
/// integers, SNORM as signed, and the texture read mode decides how it is read.
pub(crate) fn array_format(format: vk::Format) -> Result<(CUarray_format, u32)> {
    let (info, channels, bits) = cuda_layout(format)?;
    let array_format = match (info.kind, bits) {
        (ChannelKind::Unorm | ChannelKind::Uint | ChannelKind::Srgb, 8) => CU_AD_FORMAT_UNSIGNED_INT8,
        (ChannelKind::Unorm | ChannelKind::Uint | ChannelKind::Srgb, 16) => CU_AD_FORMAT_UNSIGNED_INT16,
        (ChannelKind::Uint, 32) => CU_AD_FORMAT_UNSIGNED_INT32,
        (ChannelKind::Snorm | ChannelKind::Sint, 8) => CU_AD_FORMAT_SIGNED_INT8,
        (ChannelKind::Snorm | ChannelKind::Sint, 16) => CU_AD_FORMAT_SIGNED_INT16,
        (ChannelKind::Sint, 32) => CU_AD_FORMAT_SIGNED_INT32,
        (ChannelKind::Float, 16) => CU_AD_FORMAT_HALF,
        (ChannelKind::Float, 32) => CU_AD_FORMAT_FLOAT,
        _ => return Err(unsupported(format)),
    };
    Ok((array_format, channels))
}

/// Width in bits of one channel of `array_format`.
pub(crate) fn array_format_bits(array_format: CUarray_format) -> Option<u8> {
    match array_format {
        CU_AD_FORMAT_UNSIGNED_INT8 | CU_AD_FORMAT_SIGNED_INT8 => Some(8),
        CU_AD_FORMAT_UNSIGNED_INT16 | CU_AD_FORMAT_SIGNED_INT16 | CU_AD_FORMAT_HALF => Some(16),
        CU_AD_FORMAT_UNSIGNED_INT32 | CU_AD_FORMAT_SIGNED_INT32 | CU_AD_FORMAT_FLOAT => Some(32),
        _ => None,
    }
}

/// Resource view format for a texture over `format`.
///
/// The view enum has no normalized 8/16-bit entries, so UNORM, SNORM and sRGB formats of those
/// widths use the 32-bit float view with the same channel count.  CUDA's documentation does not
/// settle whether this is the right view for normalized reads; it matches what existing Vulkan
/// interop code does and is pinned by a test.
pub(crate) fn resource_view_format(format: vk::Format) -> Result<CUresourceViewFormat> {
    let (info, channels, bits) = cuda_layout(format)?;
    let index = match channels {
        1 => 0,
        2 => 1,
        _ => 2,
    };
    let table: [CUresourceViewFormat; 3] = match (info.kind, bits) {
        (ChannelKind::Uint, 8) => [CU_RES_VIEW_FORMAT_UINT_1X8, CU_RES_VIEW_FORMAT_UINT_2X8, CU_RES_VIEW_FORMAT_UINT_4X8],
        (ChannelKind::Sint, 8) => [CU_RES_VIEW_FORMAT_SINT_1X8, CU_RES_VIEW_FORMAT_SINT_2X8, CU_RES_VIEW_FORMAT_SINT_4X8],
        (ChannelKind::Uint, 16) => [CU_RES_VIEW_FORMAT_UINT_1X16, CU_RES_VIEW_FORMAT_UINT_2X16, CU_RES_VIEW_FORMAT_UINT_4X16],
        (ChannelKind::Sint, 16) => [CU_RES_VIEW_FORMAT_SINT_1X16, CU_RES_VIEW_FORMAT_SINT_2X16, CU_RES_VIEW_FORMAT_SINT_4X16],
        (ChannelKind::Uint, 32) => [CU_RES_VIEW_FORMAT_UINT_1X32, CU_RES_VIEW_FORMAT_UINT_2X32, CU_RES_VIEW_FORMAT_UINT_4X32],
        (ChannelKind::Sint, 32) => [CU_RES_VIEW_FORMAT_SINT_1X32, CU_RES_VIEW_FORMAT_SINT_2X32, CU_RES_VIEW_FORMAT_SINT_4X32],
        (ChannelKind::Float, 16) => [
            CU_RES_VIEW_FORMAT_FLOAT_1X16,
            CU_RES_VIEW_FORMAT_FLOAT_2X16,
            CU_RES_VIEW_FORMAT_FLOAT_4X16,
        ],
        (ChannelKind::Float, 32) | (ChannelKind::Unorm | ChannelKind::Snorm | ChannelKind::Srgb, 8 | 16) => [
            CU_RES_VIEW_FORMAT_FLOAT_1X32,
            CU_RES_VIEW_FORMAT_FLOAT_2X32,
            CU_RES_VIEW_FORMAT_FLOAT_4X32,
        ],
        _ => return Err(unsupported(format)),
    };
    Ok(table[index])
}

fn address_mode(mode: vk::SamplerAddressMode) -> Result<CUaddress_mode> {
    match mode {
        vk::SamplerAddressMode::REPEAT => Ok(CU_TR_ADDRESS_MODE_WRAP),
        vk::SamplerAddressMode::MIRRORED_REPEAT => Ok(CU_TR_ADDRESS_MODE_MIRROR),
        vk::SamplerAddressMode::CLAMP_TO_EDGE => Ok(CU_TR_ADDRESS_MODE_CLAMP),
        vk::SamplerAddressMode::CLAMP_TO_BORDER => Ok(CU_TR_ADDRESS_MODE_BORDER),
        _ => Err(Error::UnsupportedOperation {
            backend: ComputeApi::Cuda,
            operation: "sampler address mode MIRROR_CLAMP_TO_EDGE",
        }),
    }
}

fn filter_mode(filter: vk::Filter) -> CUfilter_mode {
    if filter == vk::Filter::NEAREST {
        CU_TR_FILTER_MODE_POINT
    } else {
        CU_TR_FILTER_MODE_LINEAR
    }
}

/// Texture descriptor for sampling an image of `format` with `settings`.
pub(crate) fn texture_desc(settings: &TextureSettings, format: vk::Format) -> Result<CUDA_TEXTURE_DESC> {
    let (info, _, _) = cuda_layout(format)?;
    let mut flags = 0;
    if settings.use_normalized_coordinates {
        flags |= CU_TRSF_NORMALIZED_COORDINATES;
    }
    if settings.read_as_integer || !(info.kind.is_normalized() || info.kind == ChannelKind::Float) {
        flags |= CU_TRSF_READ_AS_INTEGER;
    }
    if info.kind == ChannelKind::Srgb {
        flags |= CU_TRSF_SRGB;
    }
    Ok(CUDA_TEXTURE_DESC {
        addressMode: [
            address_mode(settings.address_mode_u)?,
            address_mode(settings.address_mode_v)?,
            address_mode(settings.address_mode_w)?,
        ],
        filterMode: filter_mode(settings.min_filter),
        flags,
        maxAnisotropy: settings.max_anisotropy,
        mipmapFilterMode: if settings.mipmap_mode == vk::SamplerMipmapMode::NEAREST {
            CU_TR_FILTER_MODE_POINT
        } else {
            CU_TR_FILTER_MODE_LINEAR
        },
        mipmapLevelBias: settings.mip_lod_bias,
        minMipmapLevelClamp: settings.min_lod,
        maxMipmapLevelClamp: settings.max_lod,
        borderColor: settings.border_color,
        reserved: [0; 12],
    })
}
