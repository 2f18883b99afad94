//! Backend-neutral description of the Vulkan formats interop understands.
//!
//! Each backend's translator (`imp::<backend>::format`) starts from a [`FormatInfo`] rather than
//! from the raw `VkFormat`, so channel count, per-channel width, numeric interpretation and
//! component order are decided once, here.  Formats not listed in [`SUPPORTED_FORMATS`] have no
//! description, and every backend reports them as unsupported.

use ash::vk;

/// How the bits of one channel are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    Unorm,
    Snorm,
    Uint,
    Sint,
    Float,
    /// UNORM with sRGB transfer on the color channels.
    Srgb,
}

impl ChannelKind {
    pub fn is_normalized(self) -> bool {
        matches!(self, ChannelKind::Unorm | ChannelKind::Snorm | ChannelKind::Srgb)
    }

    pub fn is_signed(self) -> bool {
        matches!(self, ChannelKind::Snorm | ChannelKind::Sint | ChannelKind::Float)
    }
}

/// Order of the components in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelOrder {
    Rgba,
    Bgra,
    /// Packed 32-bit word with A in the high bits, then B, G, R.
    AbgrPacked,
}

/// Depth/stencil aspect of a format, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DepthStencil {
    None,
    Depth,
    DepthStencil,
}

/// Layout of one Vulkan format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FormatInfo {
    /// Bits of each channel in component order (R, G, B, A for RGBA formats); 0 means absent.
    pub channel_bits: [u8; 4],
    pub kind: ChannelKind,
    pub order: ChannelOrder,
    pub depth_stencil: DepthStencil,
}

impl FormatInfo {
    const fn uniform(channels: u8, bits: u8, kind: ChannelKind, order: ChannelOrder) -> Self {
        let mut channel_bits = [0u8; 4];
        let mut i = 0;
        while i < channels as usize {
            channel_bits[i] = bits;
            i += 1;
        }
        FormatInfo {
            channel_bits,
            kind,
            order,
            depth_stencil: DepthStencil::None,
        }
    }

    pub fn channel_count(&self) -> u32 {
        self.channel_bits.iter().filter(|b| **b != 0).count() as u32
    }

    /// Width of every channel if they all agree, `None` for packed mixed-width formats.
    pub fn uniform_channel_bits(&self) -> Option<u8> {
        let first = self.channel_bits[0];
        self.channel_bits
            .iter()
            .filter(|b| **b != 0)
            .all(|b| *b == first)
            .then_some(first)
    }

    pub fn bytes_per_pixel(&self) -> u32 {
        self.channel_bits.iter().map(|b| *b as u32).sum::<u32>() / 8
    }
}

use ChannelKind::*;
use ChannelOrder::*;

/// Every format with a [`FormatInfo`].
pub const SUPPORTED_FORMATS: &[vk::Format] = &[
    vk::Format::R8_UNORM,
    vk::Format::R8_SNORM,
    vk::Format::R8_UINT,
    vk::Format::R8_SINT,
    vk::Format::R8_SRGB,
    vk::Format::R8G8_UNORM,
    vk::Format::R8G8_SNORM,
    vk::Format::R8G8_UINT,
    vk::Format::R8G8_SINT,
    vk::Format::R8G8_SRGB,
    vk::Format::R8G8B8A8_UNORM,
    vk::Format::R8G8B8A8_SNORM,
    vk::Format::R8G8B8A8_UINT,
    vk::Format::R8G8B8A8_SINT,
    vk::Format::R8G8B8A8_SRGB,
    vk::Format::B8G8R8A8_UNORM,
    vk::Format::B8G8R8A8_SNORM,
    vk::Format::B8G8R8A8_UINT,
    vk::Format::B8G8R8A8_SINT,
    vk::Format::B8G8R8A8_SRGB,
    vk::Format::R16_UNORM,
    vk::Format::R16_SNORM,
    vk::Format::R16_UINT,
    vk::Format::R16_SINT,
    vk::Format::R16_SFLOAT,
    vk::Format::R16G16_UNORM,
    vk::Format::R16G16_SNORM,
    vk::Format::R16G16_UINT,
    vk::Format::R16G16_SINT,
    vk::Format::R16G16_SFLOAT,
    vk::Format::R16G16B16A16_UNORM,
    vk::Format::R16G16B16A16_SNORM,
    vk::Format::R16G16B16A16_UINT,
    vk::Format::R16G16B16A16_SINT,
    vk::Format::R16G16B16A16_SFLOAT,
    vk::Format::R32_UINT,
    vk::Format::R32_SINT,
    vk::Format::R32_SFLOAT,
    vk::Format::R32G32_UINT,
    vk::Format::R32G32_SINT,
    vk::Format::R32G32_SFLOAT,
    vk::Format::R32G32B32_UINT,
    vk::Format::R32G32B32_SINT,
    vk::Format::R32G32B32_SFLOAT,
    vk::Format::R32G32B32A32_UINT,
    vk::Format::R32G32B32A32_SINT,
    vk::Format::R32G32B32A32_SFLOAT,
    vk::Format::A2B10G10R10_UNORM_PACK32,
    vk::Format::D16_UNORM,
    vk::Format::D32_SFLOAT,
    vk::Format::D24_UNORM_S8_UINT,
];

/// Describes `format`, or `None` if interop does not know it.
pub fn format_info(format: vk::Format) -> Option<FormatInfo> {
    let info = match format {
        vk::Format::R8_UNORM => FormatInfo::uniform(1, 8, Unorm, Rgba),
        vk::Format::R8_SNORM => FormatInfo::uniform(1, 8, Snorm, Rgba),
        vk::Format::R8_UINT => FormatInfo::uniform(1, 8, Uint, Rgba),
        vk::Format::R8_SINT => FormatInfo::uniform(1, 8, Sint, Rgba),
        vk::Format::R8_SRGB => FormatInfo::uniform(1, 8, Srgb, Rgba),
        vk::Format::R8G8_UNORM => FormatInfo::uniform(2, 8, Unorm, Rgba),
        vk::Format::R8G8_SNORM => FormatInfo::uniform(2, 8, Snorm, Rgba),
        vk::Format::R8G8_UINT => FormatInfo::uniform(2, 8, Uint, Rgba),
        vk::Format::R8G8_SINT => FormatInfo::uniform(2, 8, Sint, Rgba),
        vk::Format::R8G8_SRGB => FormatInfo::uniform(2, 8, Srgb, Rgba),
        vk::Format::R8G8B8A8_UNORM => FormatInfo::uniform(4, 8, Unorm, Rgba),
        vk::Format::R8G8B8A8_SNORM => FormatInfo::uniform(4, 8, Snorm, Rgba),
        vk::Format::R8G8B8A8_UINT => FormatInfo::uniform(4, 8, Uint, Rgba),
        vk::Format::R8G8B8A8_SINT => FormatInfo::uniform(4, 8, Sint, Rgba),
        vk::Format::R8G8B8A8_SRGB => FormatInfo::uniform(4, 8, Srgb, Rgba),
        vk::Format::B8G8R8A8_UNORM => FormatInfo::uniform(4, 8, Unorm, Bgra),
        vk::Format::B8G8R8A8_SNORM => FormatInfo::uniform(4, 8, Snorm, Bgra),
        vk::Format::B8G8R8A8_UINT => FormatInfo::uniform(4, 8, Uint, Bgra),
        vk::Format::B8G8R8A8_SINT => FormatInfo::uniform(4, 8, Sint, Bgra),
        vk::Format::B8G8R8A8_SRGB => FormatInfo::uniform(4, 8, Srgb, Bgra),
        vk::Format::R16_UNORM => FormatInfo::uniform(1, 16, Unorm, Rgba),
        vk::Format::R16_SNORM => FormatInfo::uniform(1, 16, Snorm, Rgba),
        vk::Format::R16_UINT => FormatInfo::uniform(1, 16, Uint, Rgba),
        vk::Format::R16_SINT => FormatInfo::uniform(1, 16, Sint, Rgba),
        vk::Format::R16_SFLOAT => FormatInfo::uniform(1, 16, Float, Rgba),
        vk::Format::R16G16_UNORM => FormatInfo::uniform(2, 16, Unorm, Rgba),
        vk::Format::R16G16_SNORM => FormatInfo::uniform(2, 16, Snorm, Rgba),
        vk::Format::R16G16_UINT => FormatInfo::uniform(2, 16, Uint, Rgba),
        vk::Format::R16G16_SINT => FormatInfo::uniform(2, 16, Sint, Rgba),
        vk::Format::R16G16_SFLOAT => FormatInfo::uniform(2, 16, Float, Rgba),
        vk::Format::R16G16B16A16_UNORM => FormatInfo::uniform(4, 16, Unorm, Rgba),
        vk::Format::R16G16B16A16_SNORM => FormatInfo::uniform(4, 16, Snorm, Rgba),
        vk::Format::R16G16B16A16_UINT => FormatInfo::uniform(4, 16, Uint, Rgba),
        vk::Format::R16G16B16A16_SINT => FormatInfo::uniform(4, 16, Sint, Rgba),
        vk::Format::R16G16B16A16_SFLOAT => FormatInfo::uniform(4, 16, Float, Rgba),
        vk::Format::R32_UINT => FormatInfo::uniform(1, 32, Uint, Rgba),
        vk::Format::R32_SINT => FormatInfo::uniform(1, 32, Sint, Rgba),
        vk::Format::R32_SFLOAT => FormatInfo::uniform(1, 32, Float, Rgba),
        vk::Format::R32G32_UINT => FormatInfo::uniform(2, 32, Uint, Rgba),
        vk::Format::R32G32_SINT => FormatInfo::uniform(2, 32, Sint, Rgba),
        vk::Format::R32G32_SFLOAT => FormatInfo::uniform(2, 32, Float, Rgba),
        vk::Format::R32G32B32_UINT => FormatInfo::uniform(3, 32, Uint, Rgba),
        vk::Format::R32G32B32_SINT => FormatInfo::uniform(3, 32, Sint, Rgba),
        vk::Format::R32G32B32_SFLOAT => FormatInfo::uniform(3, 32, Float, Rgba),
        vk::Format::R32G32B32A32_UINT => FormatInfo::uniform(4, 32, Uint, Rgba),
        vk::Format::R32G32B32A32_SINT => FormatInfo::uniform(4, 32, Sint, Rgba),
        vk::Format::R32G32B32A32_SFLOAT => FormatInfo::uniform(4, 32, Float, Rgba),
        vk::Format::A2B10G10R10_UNORM_PACK32 => FormatInfo {
            channel_bits: [10, 10, 10, 2],
            kind: Unorm,
            order: AbgrPacked,
            depth_stencil: DepthStencil::None,
        },
        vk::Format::D16_UNORM => FormatInfo {
            depth_stencil: DepthStencil::Depth,
            ..FormatInfo::uniform(1, 16, Unorm, Rgba)
        },
        vk::Format::D32_SFLOAT => FormatInfo {
            depth_stencil: DepthStencil::Depth,
            ..FormatInfo::uniform(1, 32, Float, Rgba)
        },
        vk::Format::D24_UNORM_S8_UINT => FormatInfo {
            channel_bits: [24, 8, 0, 0],
            kind: Unorm,
            order: Rgba,
            depth_stencil: DepthStencil::DepthStencil,
        },
        _ => return None,
    };
    Some(info)
}

/// Constant fill for one swizzle slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Swizzle {
    R,
    G,
    B,
    A,
    Zero,
    One,
}

/// Swizzle for a format with `channels` components in RGBA order.
///
/// Slots without a source channel are padded: missing color channels read 0, missing alpha
/// reads 1.
pub fn swizzle_for_channels(channels: u32) -> [Swizzle; 4] {
    use Swizzle::*;
    match channels {
        1 => [R, Zero, Zero, One],
        2 => [R, G, Zero, One],
        3 => [R, G, B, One],
        _ => [R, G, B, A],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_supported_format_is_described() {
        for format in SUPPORTED_FORMATS {
            let info = format_info(*format).unwrap_or_else(|| panic!("{format:?} missing"));
            assert!(info.channel_count() >= 1 && info.channel_count() <= 4);
            assert_eq!(info.bytes_per_pixel() * 8, info.channel_bits.iter().map(|b| *b as u32).sum::<u32>());
        }
    }

    #[test]
    fn unknown_format_has_no_description() {
        assert_eq!(format_info(vk::Format::BC1_RGB_UNORM_BLOCK), None);
        assert_eq!(format_info(vk::Format::UNDEFINED), None);
    }

    #[test]
    fn packed_formats_are_not_uniform() {
        let info = format_info(vk::Format::A2B10G10R10_UNORM_PACK32).unwrap();
        assert_eq!(info.uniform_channel_bits(), None);
        assert_eq!(info.bytes_per_pixel(), 4);
        let info = format_info(vk::Format::R16G16_SFLOAT).unwrap();
        assert_eq!(info.uniform_channel_bits(), Some(16));
        assert_eq!(info.bytes_per_pixel(), 4);
    }

    #[test]
    fn swizzle_pads_color_with_zero_and_alpha_with_one() {
        use Swizzle::*;
        assert_eq!(swizzle_for_channels(1), [R, Zero, Zero, One]);
        assert_eq!(swizzle_for_channels(2), [R, G, Zero, One]);
        assert_eq!(swizzle_for_channels(3), [R, G, B, One]);
        assert_eq!(swizzle_for_channels(4), [R, G, B, A]);
    }
}
