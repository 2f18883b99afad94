//! Vulkan to HIP format and sampler translation.

use ash::vk;

use super::ffi::*;
use crate::error::{Error, Result};
use crate::format::{ChannelKind, DepthStencil, format_info};
use crate::interop::{ComputeApi, TextureSettings};

fn unsupported(format: vk::Format) -> Error {
    logwise::warn_sync!(
        "HIP has no channel format for {format}",
        format = logwise::privacy::LogIt(&format)
    );
    Error::UnsupportedFormat {
        backend: ComputeApi::Hip,
        format,
    }
}

/// Channel description for `format`: bits per present channel and the numeric kind.
pub(crate) fn channel_format_desc(format: vk::Format) -> Result<hipChannelFormatDesc> {
    let info = format_info(format).ok_or_else(|| unsupported(format))?;
    if info.depth_stencil == DepthStencil::DepthStencil {
        return Err(unsupported(format));
    }
    let bits = info.uniform_channel_bits().ok_or_else(|| unsupported(format))?;
    let channels = info.channel_count();
    if !matches!(channels, 1 | 2 | 4) {
        return Err(unsupported(format));
    }
    let f = match (info.kind, bits) {
        (ChannelKind::Float, 16 | 32) => hipChannelFormatKindFloat,
        (ChannelKind::Float, _) => return Err(unsupported(format)),
        (ChannelKind::Snorm | ChannelKind::Sint, _) => hipChannelFormatKindSigned,
        (ChannelKind::Unorm | ChannelKind::Uint | ChannelKind::Srgb, _) => hipChannelFormatKindUnsigned,
    };
    let bits = bits as i32;
    let present = |i: u32| if i < channels { bits } else { 0 };
    Ok(hipChannelFormatDesc {
        x: present(0),
        y: present(1),
        z: present(2),
        w: present(3),
        f,
    })
}

fn address_mode(mode: vk::SamplerAddressMode) -> Result<hipTextureAddressMode> {
    match mode {
        vk::SamplerAddressMode::REPEAT => Ok(hipAddressModeWrap),
        vk::SamplerAddressMode::MIRRORED_REPEAT => Ok(hipAddressModeMirror),
        vk::SamplerAddressMode::CLAMP_TO_EDGE => Ok(hipAddressModeClamp),
        vk::SamplerAddressMode::CLAMP_TO_BORDER => Ok(hipAddressModeBorder),
        _ => Err(Error::UnsupportedOperation {
            backend: ComputeApi::Hip,
            operation: "sampler address mode MIRROR_CLAMP_TO_EDGE",
        }),
    }
}

pub(crate) fn texture_desc(settings: &TextureSettings, format: vk::Format) -> Result<hipTextureDesc> {
    let info = format_info(format).ok_or_else(|| unsupported(format))?;
    let filter = |f: vk::Filter| {
        if f == vk::Filter::NEAREST {
            hipFilterModePoint
        } else {
            hipFilterModeLinear
        }
    };
    let normalized_read = info.kind.is_normalized() && !settings.read_as_integer;
    Ok(hipTextureDesc {
        addressMode: [
            address_mode(settings.address_mode_u)?,
            address_mode(settings.address_mode_v)?,
            address_mode(settings.address_mode_w)?,
        ],
        filterMode: filter(settings.min_filter),
        readMode: if normalized_read {
            hipReadModeNormalizedFloat
        } else {
            hipReadModeElementType
        },
        sRGB: (info.kind == ChannelKind::Srgb) as i32,
        borderColor: settings.border_color,
        normalizedCoords: settings.use_normalized_coordinates as i32,
        maxAnisotropy: settings.max_anisotropy,
        mipmapFilterMode: if settings.mipmap_mode == vk::SamplerMipmapMode::NEAREST {
            hipFilterModePoint
        } else {
            hipFilterModeLinear
        },
        mipmapLevelBias: settings.mip_lod_bias,
        minMipmapLevelClamp: settings.min_lod,
        maxMipmapLevelClamp: settings.max_lod,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::SUPPORTED_FORMATS;

    #[test]
    fn channel_desc_round_trip_keeps_layout() {
        for format in SUPPORTED_FORMATS {
            let info = format_info(*format).unwrap();
            match channel_format_desc(*format) {
                Ok(desc) => {
                    let bits = [desc.x, desc.y, desc.z, desc.w];
                    let channels = bits.iter().filter(|b| **b != 0).count() as u32;
                    assert_eq!(channels, info.channel_count(), "{format:?}");
                    assert_eq!(Some(bits[0] as u8), info.uniform_channel_bits(), "{format:?}");
                }
                Err(e) => assert!(matches!(e, Error::UnsupportedFormat { backend: ComputeApi::Hip, .. })),
            }
        }
    }

    #[test]
    fn specific_channel_descs() {
        assert_eq!(
            channel_format_desc(vk::Format::R8G8_SNORM).unwrap(),
            hipChannelFormatDesc {
                x: 8,
                y: 8,
                z: 0,
                w: 0,
                f: hipChannelFormatKindSigned
            }
        );
        assert_eq!(channel_format_desc(vk::Format::R32G32B32A32_SFLOAT).unwrap().f, hipChannelFormatKindFloat);
        assert!(channel_format_desc(vk::Format::R32G32B32_SFLOAT).is_err());
    }

    #[test]
    fn normalized_formats_read_as_float() {
        let settings = TextureSettings::default();
        assert_eq!(
            texture_desc(&settings, vk::Format::R8G8B8A8_UNORM).unwrap().readMode,
            hipReadModeNormalizedFloat
        );
        assert_eq!(texture_desc(&settings, vk::Format::R32_SFLOAT).unwrap().readMode, hipReadModeElementType);
        assert_eq!(texture_desc(&settings, vk::Format::R8G8B8A8_SRGB).unwrap().sRGB, 1);
    }
}
