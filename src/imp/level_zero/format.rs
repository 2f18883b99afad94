//! Vulkan to Level Zero format, image type and sampler translation.

use ash::vk;

use super::ffi::*;
use crate::error::{Error, Result};
use crate::format::{ChannelKind, ChannelOrder, DepthStencil, Swizzle, format_info, swizzle_for_channels};
use crate::interop::{ComputeApi, TextureSettings};

fn unsupported(format: vk::Format) -> Error {
    logwise::warn_sync!(
        "Level Zero has no image format for {format}",
        format = logwise::privacy::LogIt(&format)
    );
    Error::UnsupportedFormat {
        backend: ComputeApi::LevelZero,
        format,
    }
}

fn swizzle(s: Swizzle) -> u32 {
    match s {
        Swizzle::R => ZE_IMAGE_FORMAT_SWIZZLE_R,
        Swizzle::G => ZE_IMAGE_FORMAT_SWIZZLE_G,
        Swizzle::B => ZE_IMAGE_FORMAT_SWIZZLE_B,
        Swizzle::A => ZE_IMAGE_FORMAT_SWIZZLE_A,
        Swizzle::Zero => ZE_IMAGE_FORMAT_SWIZZLE_0,
        Swizzle::One => ZE_IMAGE_FORMAT_SWIZZLE_1,
    }
}

pub(crate) fn image_format(format: vk::Format) -> Result<ze_image_format_t> {
    let info = format_info(format).ok_or_else(|| unsupported(format))?;
    if info.depth_stencil == DepthStencil::DepthStencil {
        return Err(unsupported(format));
    }
    let channels = info.channel_count();
    let layout = match (info.order, info.uniform_channel_bits(), channels) {
        (ChannelOrder::AbgrPacked, _, _) => ZE_IMAGE_FORMAT_LAYOUT_10_10_10_2,
        (_, Some(8), 1) => ZE_IMAGE_FORMAT_LAYOUT_8,
        (_, Some(8), 2) => ZE_IMAGE_FORMAT_LAYOUT_8_8,
        (_, Some(8), 4) => ZE_IMAGE_FORMAT_LAYOUT_8_8_8_8,
        (_, Some(16), 1) => ZE_IMAGE_FORMAT_LAYOUT_16,
        (_, Some(16), 2) => ZE_IMAGE_FORMAT_LAYOUT_16_16,
        (_, Some(16), 4) => ZE_IMAGE_FORMAT_LAYOUT_16_16_16_16,
        (_, Some(32), 1) => ZE_IMAGE_FORMAT_LAYOUT_32,
        (_, Some(32), 2) => ZE_IMAGE_FORMAT_LAYOUT_32_32,
        (_, Some(32), 4) => ZE_IMAGE_FORMAT_LAYOUT_32_32_32_32,
        _ => return Err(unsupported(format)),
    };
    let type_ = match info.kind {
        ChannelKind::Unorm => ZE_IMAGE_FORMAT_TYPE_UNORM,
        ChannelKind::Snorm => ZE_IMAGE_FORMAT_TYPE_SNORM,
        ChannelKind::Uint => ZE_IMAGE_FORMAT_TYPE_UINT,
        ChannelKind::Sint => ZE_IMAGE_FORMAT_TYPE_SINT,
        ChannelKind::Float => ZE_IMAGE_FORMAT_TYPE_FLOAT,
        //no sRGB decode in Level Zero
        ChannelKind::Srgb => return Err(unsupported(format)),
    };
    let [x, y, z, w] = match info.order {
        ChannelOrder::Bgra => [Swizzle::B, Swizzle::G, Swizzle::R, Swizzle::A],
        ChannelOrder::Rgba | ChannelOrder::AbgrPacked => swizzle_for_channels(channels),
    };
    Ok(ze_image_format_t {
        layout,
        type_,
        x: swizzle(x),
        y: swizzle(y),
        z: swizzle(z),
        w: swizzle(w),
    })
}

pub(crate) fn image_type(view_type: vk::ImageViewType) -> Result<u32> {
    match view_type {
        vk::ImageViewType::TYPE_1D => Ok(ZE_IMAGE_TYPE_1D),
        vk::ImageViewType::TYPE_1D_ARRAY => Ok(ZE_IMAGE_TYPE_1DARRAY),
        vk::ImageViewType::TYPE_2D => Ok(ZE_IMAGE_TYPE_2D),
        vk::ImageViewType::TYPE_2D_ARRAY => Ok(ZE_IMAGE_TYPE_2DARRAY),
        vk::ImageViewType::TYPE_3D => Ok(ZE_IMAGE_TYPE_3D),
        _ => {
            logwise::warn_sync!(
                "Level Zero has no image type for {view_type}",
                view_type = logwise::privacy::LogIt(&view_type)
            );
            Err(Error::UnsupportedImageType {
                backend: ComputeApi::LevelZero,
                view_type,
            })
        }
    }
}

/// Level Zero samplers take one address mode for every axis; `address_mode_u` is used.
pub(crate) fn sampler_desc(settings: &TextureSettings) -> Result<ze_sampler_desc_t> {
    let address_mode = match settings.address_mode_u {
        vk::SamplerAddressMode::REPEAT => ZE_SAMPLER_ADDRESS_MODE_REPEAT,
        vk::SamplerAddressMode::MIRRORED_REPEAT => ZE_SAMPLER_ADDRESS_MODE_MIRROR,
        vk::SamplerAddressMode::CLAMP_TO_EDGE => ZE_SAMPLER_ADDRESS_MODE_CLAMP,
        vk::SamplerAddressMode::CLAMP_TO_BORDER => ZE_SAMPLER_ADDRESS_MODE_CLAMP_TO_BORDER,
        _ => {
            return Err(Error::UnsupportedOperation {
                backend: ComputeApi::LevelZero,
                operation: "sampler address mode MIRROR_CLAMP_TO_EDGE",
            });
        }
    };
    Ok(ze_sampler_desc_t {
        stype: ZE_STRUCTURE_TYPE_SAMPLER_DESC,
        pNext: std::ptr::null(),
        addressMode: address_mode,
        filterMode: if settings.min_filter == vk::Filter::NEAREST {
            ZE_SAMPLER_FILTER_MODE_NEAREST
        } else {
            ZE_SAMPLER_FILTER_MODE_LINEAR
        },
        isNormalized: settings.use_normalized_coordinates as ze_bool_t,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::SUPPORTED_FORMATS;

    #[test]
    fn every_format_translates_or_is_named_unsupported() {
        for format in SUPPORTED_FORMATS {
            match image_format(*format) {
                Ok(ze) => assert!(ze.layout <= ZE_IMAGE_FORMAT_LAYOUT_10_10_10_2, "{format:?}"),
                Err(e) => assert!(
                    matches!(e, Error::UnsupportedFormat { backend: ComputeApi::LevelZero, format: f } if f == *format)
                ),
            }
        }
    }

    #[test]
    fn narrow_formats_pad_swizzle() {
        let r8 = image_format(vk::Format::R8_UNORM).unwrap();
        assert_eq!(r8.layout, ZE_IMAGE_FORMAT_LAYOUT_8);
        assert_eq!(r8.type_, ZE_IMAGE_FORMAT_TYPE_UNORM);
        assert_eq!(
            [r8.x, r8.y, r8.z, r8.w],
            [ZE_IMAGE_FORMAT_SWIZZLE_R, ZE_IMAGE_FORMAT_SWIZZLE_0, ZE_IMAGE_FORMAT_SWIZZLE_0, ZE_IMAGE_FORMAT_SWIZZLE_1]
        );
        let rg = image_format(vk::Format::R32G32_SFLOAT).unwrap();
        assert_eq!(rg.layout, ZE_IMAGE_FORMAT_LAYOUT_32_32);
        assert_eq!([rg.z, rg.w], [ZE_IMAGE_FORMAT_SWIZZLE_0, ZE_IMAGE_FORMAT_SWIZZLE_1]);
    }

    #[test]
    fn bgra_and_packed_formats() {
        let bgra = image_format(vk::Format::B8G8R8A8_UNORM).unwrap();
        assert_eq!(bgra.x, ZE_IMAGE_FORMAT_SWIZZLE_B);
        assert_eq!(bgra.z, ZE_IMAGE_FORMAT_SWIZZLE_R);
        let packed = image_format(vk::Format::A2B10G10R10_UNORM_PACK32).unwrap();
        assert_eq!(packed.layout, ZE_IMAGE_FORMAT_LAYOUT_10_10_10_2);
        assert!(image_format(vk::Format::R32G32B32_SFLOAT).is_err());
        assert!(image_format(vk::Format::R8G8B8A8_SRGB).is_err());
        assert!(image_format(vk::Format::D24_UNORM_S8_UINT).is_err());
    }

    #[test]
    fn cube_views_are_not_images() {
        assert_eq!(image_type(vk::ImageViewType::TYPE_2D_ARRAY).unwrap(), ZE_IMAGE_TYPE_2DARRAY);
        assert!(matches!(
            image_type(vk::ImageViewType::CUBE),
            Err(Error::UnsupportedImageType { backend: ComputeApi::LevelZero, .. })
        ));
    }

    #[test]
    fn sampler_follows_settings() {
        let settings = TextureSettings {
            address_mode_u: vk::SamplerAddressMode::REPEAT,
            min_filter: vk::Filter::NEAREST,
            use_normalized_coordinates: false,
            ..TextureSettings::default()
        };
        let desc = sampler_desc(&settings).unwrap();
        assert_eq!(desc.addressMode, ZE_SAMPLER_ADDRESS_MODE_REPEAT);
        assert_eq!(desc.filterMode, ZE_SAMPLER_FILTER_MODE_NEAREST);
        assert_eq!(desc.isNormalized, 0);
    }
}
