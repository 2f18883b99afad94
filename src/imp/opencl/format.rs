//! Vulkan to OpenCL image format, image type and sampler translation.

use ash::vk;

use super::ffi::*;
use crate::error::{Error, Result};
use crate::format::{ChannelKind, ChannelOrder, DepthStencil, format_info};
use crate::interop::{ComputeApi, TextureSettings};

fn unsupported(format: vk::Format) -> Error {
    logwise::warn_sync!(
        "OpenCL has no image format for {format}",
        format = logwise::privacy::LogIt(&format)
    );
    Error::UnsupportedFormat {
        backend: ComputeApi::OpenCl,
        format,
    }
}

pub(crate) fn image_format(format: vk::Format) -> Result<cl_image_format> {
    let info = format_info(format).ok_or_else(|| unsupported(format))?;
    match info.depth_stencil {
        DepthStencil::DepthStencil => {
            return Ok(cl_image_format {
                image_channel_order: CL_DEPTH_STENCIL,
                image_channel_data_type: CL_UNORM_INT24,
            });
        }
        DepthStencil::Depth => {
            let data_type = match info.kind {
                ChannelKind::Float => CL_FLOAT,
                _ => CL_UNORM_INT16,
            };
            return Ok(cl_image_format {
                image_channel_order: CL_DEPTH,
                image_channel_data_type: data_type,
            });
        }
        DepthStencil::None => {}
    }
    let srgb = info.kind == ChannelKind::Srgb;
    let order = match (info.order, info.channel_count(), srgb) {
        (ChannelOrder::Rgba, 1, false) => CL_R,
        (ChannelOrder::Rgba, 2, false) => CL_RG,
        (ChannelOrder::Rgba, 4, false) => CL_RGBA,
        (ChannelOrder::Rgba, 4, true) => CL_sRGBA,
        (ChannelOrder::Bgra, 4, false) => CL_BGRA,
        (ChannelOrder::Bgra, 4, true) => CL_sBGRA,
        _ => return Err(unsupported(format)),
    };
    let data_type = match (info.kind, info.uniform_channel_bits()) {
        (ChannelKind::Unorm | ChannelKind::Srgb, Some(8)) => CL_UNORM_INT8,
        (ChannelKind::Unorm, Some(16)) => CL_UNORM_INT16,
        (ChannelKind::Snorm, Some(8)) => CL_SNORM_INT8,
        (ChannelKind::Snorm, Some(16)) => CL_SNORM_INT16,
        (ChannelKind::Uint, Some(8)) => CL_UNSIGNED_INT8,
        (ChannelKind::Uint, Some(16)) => CL_UNSIGNED_INT16,
        (ChannelKind::Uint, Some(32)) => CL_UNSIGNED_INT32,
        (ChannelKind::Sint, Some(8)) => CL_SIGNED_INT8,
        (ChannelKind::Sint, Some(16)) => CL_SIGNED_INT16,
        (ChannelKind::Sint, Some(32)) => CL_SIGNED_INT32,
        (ChannelKind::Float, Some(16)) => CL_HALF_FLOAT,
        (ChannelKind::Float, Some(32)) => CL_FLOAT,
        _ => return Err(unsupported(format)),
    };
    Ok(cl_image_format {
        image_channel_order: order,
        image_channel_data_type: data_type,
    })
}

pub(crate) fn image_type(view_type: vk::ImageViewType) -> Result<cl_uint> {
    match view_type {
        vk::ImageViewType::TYPE_1D => Ok(CL_MEM_OBJECT_IMAGE1D),
        vk::ImageViewType::TYPE_1D_ARRAY => Ok(CL_MEM_OBJECT_IMAGE1D_ARRAY),
        vk::ImageViewType::TYPE_2D => Ok(CL_MEM_OBJECT_IMAGE2D),
        vk::ImageViewType::TYPE_2D_ARRAY => Ok(CL_MEM_OBJECT_IMAGE2D_ARRAY),
        vk::ImageViewType::TYPE_3D => Ok(CL_MEM_OBJECT_IMAGE3D),
        _ => Err(Error::UnsupportedImageType {
            backend: ComputeApi::OpenCl,
            view_type,
        }),
    }
}

/// Zero-terminated property list for `clCreateSamplerWithProperties`.
///
/// OpenCL has one addressing mode for all axes; `address_mode_u` is used.  The repeat modes
/// need normalized coordinates.
pub(crate) fn sampler_properties(settings: &TextureSettings) -> Result<[cl_sampler_properties; 7]> {
    let addressing = match settings.address_mode_u {
        vk::SamplerAddressMode::REPEAT => CL_ADDRESS_REPEAT,
        vk::SamplerAddressMode::MIRRORED_REPEAT => CL_ADDRESS_MIRRORED_REPEAT,
        vk::SamplerAddressMode::CLAMP_TO_EDGE => CL_ADDRESS_CLAMP_TO_EDGE,
        vk::SamplerAddressMode::CLAMP_TO_BORDER => CL_ADDRESS_CLAMP,
        _ => {
            return Err(Error::UnsupportedOperation {
                backend: ComputeApi::OpenCl,
                operation: "sampler address mode MIRROR_CLAMP_TO_EDGE",
            });
        }
    };
    if !settings.use_normalized_coordinates
        && matches!(addressing, CL_ADDRESS_REPEAT | CL_ADDRESS_MIRRORED_REPEAT)
    {
        return Err(Error::UnsupportedOperation {
            backend: ComputeApi::OpenCl,
            operation: "repeat addressing with unnormalized coordinates",
        });
    }
    let filter = if settings.min_filter == vk::Filter::NEAREST {
        CL_FILTER_NEAREST
    } else {
        CL_FILTER_LINEAR
    };
    Ok([
        CL_SAMPLER_NORMALIZED_COORDS,
        settings.use_normalized_coordinates as cl_sampler_properties,
        CL_SAMPLER_ADDRESSING_MODE,
        addressing as cl_sampler_properties,
        CL_SAMPLER_FILTER_MODE,
        filter as cl_sampler_properties,
        0,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::SUPPORTED_FORMATS;

    #[test]
    fn every_format_translates_or_is_named_unsupported() {
        for format in SUPPORTED_FORMATS {
            if let Err(e) = image_format(*format) {
                assert!(matches!(e, Error::UnsupportedFormat { backend: ComputeApi::OpenCl, .. }), "{format:?}");
            }
        }
    }

    #[test]
    fn depth_stencil_is_opencl_only() {
        assert_eq!(
            image_format(vk::Format::D24_UNORM_S8_UINT).unwrap(),
            cl_image_format {
                image_channel_order: CL_DEPTH_STENCIL,
                image_channel_data_type: CL_UNORM_INT24,
            }
        );
        assert_eq!(image_format(vk::Format::D32_SFLOAT).unwrap().image_channel_data_type, CL_FLOAT);
    }

    #[test]
    fn srgb_and_bgra_orders() {
        assert_eq!(image_format(vk::Format::B8G8R8A8_SRGB).unwrap().image_channel_order, CL_sBGRA);
        assert_eq!(image_format(vk::Format::R8G8B8A8_SRGB).unwrap().image_channel_order, CL_sRGBA);
        assert!(image_format(vk::Format::R8_SRGB).is_err());
        assert!(image_format(vk::Format::R32G32B32_SFLOAT).is_err());
        assert!(image_format(vk::Format::A2B10G10R10_UNORM_PACK32).is_err());
    }

    #[test]
    fn sampler_list_is_terminated() {
        let props = sampler_properties(&TextureSettings::default()).unwrap();
        assert_eq!(props[3], CL_ADDRESS_CLAMP_TO_EDGE as cl_sampler_properties);
        assert_eq!(props[5], CL_FILTER_LINEAR as cl_sampler_properties);
        assert_eq!(props[6], 0);
        let unnormalized_repeat = TextureSettings {
            use_normalized_coordinates: false,
            address_mode_u: vk::SamplerAddressMode::REPEAT,
            ..TextureSettings::default()
        };
        assert!(sampler_properties(&unnormalized_repeat).unwrap_err().is_unsupported());
    }
}
