// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pixel, vertex and index formats plus their capability tables.
//!
//! A [`Format`] is one opaque enumerant used for texture contents, vertex
//! attributes and index buffers alike. The tables here are deliberately
//! *total*: every variant has a byte size, a sampler kind, and a block size.
//! Backend translation tables live in the backend modules and panic on any
//! format they cannot express, because substituting a different layout
//! corrupts GPU memory without any observable error.

use crate::api::whoops;

/// Every format the public API accepts.
///
/// Naming is `<component type><channels><interpretation>`: `U8RgbaNorm` is
/// four unsigned bytes read as normalized floats, `F32Rg` is two 32-bit
/// floats, `S16Rg` is two signed 16-bit integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Format {
    // 8-bit per channel
    U8R,
    U8RNorm,
    S8RNorm,
    U8Rg,
    U8RgNorm,
    S8RgNorm,
    U8Rgba,
    U8RgbaNorm,
    U8RgbaNormSrgb,
    S8RgbaNorm,
    Bgra8Norm,
    Bgra8NormSrgb,
    // 16-bit per channel
    U16R,
    U16RNorm,
    S16R,
    S16RgNorm,
    U16Rg,
    U16Rgba,
    U16RgbaNorm,
    F16R,
    F16Rg,
    F16Rgba,
    // 32-bit per channel
    U32R,
    U32Rg,
    U32Rgba,
    S32R,
    F32R,
    F32Rg,
    F32Rgb,
    F32Rgba,
    // depth/stencil
    D16,
    D24S8,
    D32F,
    D32FS8,
    // block-compressed
    Bc1,
    Bc1Srgb,
    Bc2,
    Bc2Srgb,
    Bc3,
    Bc3Srgb,
}

/// How a shader samples a texture of a given format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerFormatKind {
    Float,
    Uint,
    Sint,
    Depth,
}

impl Format {
    /// Bytes per pixel for uncompressed formats, bytes per block for
    /// compressed ones.
    pub fn bytes_per_pixel(self) -> u32 {
        use Format::*;
        match self {
            U8R | U8RNorm | S8RNorm => 1,
            U8Rg | U8RgNorm | S8RgNorm | U16R | U16RNorm | S16R | F16R | D16 => 2,
            U8Rgba | U8RgbaNorm | U8RgbaNormSrgb | S8RgbaNorm | Bgra8Norm | Bgra8NormSrgb
            | U16Rg | S16RgNorm | F16Rg | U32R | S32R | F32R | D24S8 | D32F => 4,
            U16Rgba | U16RgbaNorm | F16Rgba | U32Rg | F32Rg | D32FS8 => 8,
            F32Rgb => 12,
            U32Rgba | F32Rgba => 16,
            Bc1 | Bc1Srgb => 8,
            Bc2 | Bc2Srgb | Bc3 | Bc3Srgb => 16,
        }
    }

    /// Compressed-format block dimensions; `(1, 1)` for uncompressed formats.
    pub fn block_dims(self) -> (u32, u32) {
        if self.is_compressed() { (4, 4) } else { (1, 1) }
    }

    pub fn is_compressed(self) -> bool {
        matches!(
            self,
            Format::Bc1
                | Format::Bc1Srgb
                | Format::Bc2
                | Format::Bc2Srgb
                | Format::Bc3
                | Format::Bc3Srgb
        )
    }

    pub fn has_depth(self) -> bool {
        matches!(
            self,
            Format::D16 | Format::D24S8 | Format::D32F | Format::D32FS8
        )
    }

    pub fn has_stencil(self) -> bool {
        matches!(self, Format::D24S8 | Format::D32FS8)
    }

    pub fn is_srgb(self) -> bool {
        matches!(
            self,
            Format::U8RgbaNormSrgb
                | Format::Bgra8NormSrgb
                | Format::Bc1Srgb
                | Format::Bc2Srgb
                | Format::Bc3Srgb
        )
    }

    /// Sampler kind observed by shaders.
    pub fn sampler_kind(self) -> SamplerFormatKind {
        use Format::*;
        match self {
            U8R | U8Rg | U8Rgba | U16R | S16R | U16Rg | U16Rgba | U32R | U32Rg | U32Rgba
            | S32R => {
                if matches!(self, S16R | S32R) {
                    SamplerFormatKind::Sint
                } else {
                    SamplerFormatKind::Uint
                }
            }
            D16 | D24S8 | D32F | D32FS8 => SamplerFormatKind::Depth,
            _ => SamplerFormatKind::Float,
        }
    }

    /// Number of components a vertex attribute of this format carries.
    ///
    /// Only meaningful for formats usable as vertex attributes; depth and
    /// compressed formats fail fast.
    pub fn vertex_component_count(self) -> u32 {
        use Format::*;
        match self {
            U8R | U8RNorm | S8RNorm | U16R | U16RNorm | S16R | F16R | U32R | S32R | F32R => 1,
            U8Rg | U8RgNorm | S8RgNorm | U16Rg | S16RgNorm | F16Rg | U32Rg | F32Rg => 2,
            F32Rgb => 3,
            U8Rgba | U8RgbaNorm | S8RgbaNorm | U16Rgba | U16RgbaNorm | F16Rgba | U32Rgba
            | F32Rgba => 4,
            _ => whoops("format is not usable as a vertex attribute"),
        }
    }

    /// Byte size of one mip level of a texture in this format.
    pub fn image_byte_size(self, width: u32, height: u32, depth: u32) -> usize {
        let (bw, bh) = self.block_dims();
        let blocks_w = width.div_ceil(bw) as usize;
        let blocks_h = height.div_ceil(bh) as usize;
        blocks_w * blocks_h * depth as usize * self.bytes_per_pixel() as usize
    }
}

/// All variants, for totality tests and table audits.
pub(crate) const ALL_FORMATS: &[Format] = &[
    Format::U8R,
    Format::U8RNorm,
    Format::S8RNorm,
    Format::U8Rg,
    Format::U8RgNorm,
    Format::S8RgNorm,
    Format::U8Rgba,
    Format::U8RgbaNorm,
    Format::U8RgbaNormSrgb,
    Format::S8RgbaNorm,
    Format::Bgra8Norm,
    Format::Bgra8NormSrgb,
    Format::U16R,
    Format::U16RNorm,
    Format::S16R,
    Format::S16RgNorm,
    Format::U16Rg,
    Format::U16Rgba,
    Format::U16RgbaNorm,
    Format::F16R,
    Format::F16Rg,
    Format::F16Rgba,
    Format::U32R,
    Format::U32Rg,
    Format::U32Rgba,
    Format::S32R,
    Format::F32R,
    Format::F32Rg,
    Format::F32Rgb,
    Format::F32Rgba,
    Format::D16,
    Format::D24S8,
    Format::D32F,
    Format::D32FS8,
    Format::Bc1,
    Format::Bc1Srgb,
    Format::Bc2,
    Format::Bc2Srgb,
    Format::Bc3,
    Format::Bc3Srgb,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_format_has_a_size_and_kind() {
        for &format in ALL_FORMATS {
            assert!(format.bytes_per_pixel() > 0, "{format:?}");
            let _ = format.sampler_kind();
            let (bw, bh) = format.block_dims();
            assert!(bw >= 1 && bh >= 1);
            if format.is_compressed() {
                assert_eq!((bw, bh), (4, 4), "{format:?}");
            }
        }
    }

    #[test]
    fn depth_formats_sample_as_depth() {
        for &format in ALL_FORMATS {
            if format.has_depth() {
                assert_eq!(format.sampler_kind(), SamplerFormatKind::Depth, "{format:?}");
            }
        }
    }

    #[test]
    fn image_byte_size_rounds_compressed_blocks() {
        // A 5x5 BC1 image occupies 2x2 blocks of 8 bytes.
        assert_eq!(Format::Bc1.image_byte_size(5, 5, 1), 4 * 8);
        assert_eq!(Format::U8RgbaNorm.image_byte_size(5, 5, 1), 100);
        assert_eq!(Format::U8RgbaNorm.image_byte_size(1, 1, 1), 4);
    }

    #[test]
    #[should_panic(expected = "whoops")]
    fn depth_format_rejects_vertex_use() {
        let _ = Format::D24S8.vertex_component_count();
    }
}
