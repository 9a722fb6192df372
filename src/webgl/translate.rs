// SPDX-License-Identifier: MIT OR Apache-2.0
//! Translation tables from API enums to GL enumerants.
//!
//! Like the other backend's tables these are total-or-fatal; a format the
//! active profile cannot express panics rather than substituting a layout.

use crate::api::descriptors::{
    AddressMode, BlendFactor, BlendMode, CompareFunction, CullMode, FilterMode, FrontFace,
    MipmapFilterMode, PrimitiveTopology, StencilOp,
};
use crate::api::format::Format;
use crate::api::whoops;
use crate::webgl::caps::GlProfile;

/// The (internal format, format, type) triple GL uploads want.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct TexFormat {
    pub internal: u32,
    pub format: u32,
    pub ty: u32,
    pub compressed: bool,
}

const fn plain(internal: u32, format: u32, ty: u32) -> TexFormat {
    TexFormat {
        internal,
        format,
        ty,
        compressed: false,
    }
}

const fn compressed(internal: u32) -> TexFormat {
    TexFormat {
        internal,
        format: 0,
        ty: 0,
        compressed: true,
    }
}

pub(super) fn texture_format(format: Format, profile: GlProfile) -> TexFormat {
    use Format::*;
    if profile == GlProfile::WebGl1 {
        // The legacy profile has unsized internal formats and a far smaller
        // format set.
        return match format {
            U8RNorm => plain(glow::LUMINANCE, glow::LUMINANCE, glow::UNSIGNED_BYTE),
            U8RgbaNorm | U8RgbaNormSrgb => plain(glow::RGBA, glow::RGBA, glow::UNSIGNED_BYTE),
            F32Rgba => plain(glow::RGBA, glow::RGBA, glow::FLOAT),
            D16 => plain(
                glow::DEPTH_COMPONENT,
                glow::DEPTH_COMPONENT,
                glow::UNSIGNED_SHORT,
            ),
            D24S8 => plain(
                glow::DEPTH_STENCIL,
                glow::DEPTH_STENCIL,
                glow::UNSIGNED_INT_24_8,
            ),
            Bc1 => compressed(glow::COMPRESSED_RGBA_S3TC_DXT1_EXT),
            Bc2 => compressed(glow::COMPRESSED_RGBA_S3TC_DXT3_EXT),
            Bc3 => compressed(glow::COMPRESSED_RGBA_S3TC_DXT5_EXT),
            _ => whoops(&format!("no legacy-profile texture format for {format:?}")),
        };
    }
    match format {
        U8R => plain(glow::R8UI, glow::RED_INTEGER, glow::UNSIGNED_BYTE),
        U8RNorm => plain(glow::R8, glow::RED, glow::UNSIGNED_BYTE),
        S8RNorm => plain(glow::R8_SNORM, glow::RED, glow::BYTE),
        U8Rg => plain(glow::RG8UI, glow::RG_INTEGER, glow::UNSIGNED_BYTE),
        U8RgNorm => plain(glow::RG8, glow::RG, glow::UNSIGNED_BYTE),
        S8RgNorm => plain(glow::RG8_SNORM, glow::RG, glow::BYTE),
        U8Rgba => plain(glow::RGBA8UI, glow::RGBA_INTEGER, glow::UNSIGNED_BYTE),
        U8RgbaNorm => plain(glow::RGBA8, glow::RGBA, glow::UNSIGNED_BYTE),
        U8RgbaNormSrgb => plain(glow::SRGB8_ALPHA8, glow::RGBA, glow::UNSIGNED_BYTE),
        S8RgbaNorm => plain(glow::RGBA8_SNORM, glow::RGBA, glow::BYTE),
        U16R => plain(glow::R16UI, glow::RED_INTEGER, glow::UNSIGNED_SHORT),
        S16R => plain(glow::R16I, glow::RED_INTEGER, glow::SHORT),
        U16Rg => plain(glow::RG16UI, glow::RG_INTEGER, glow::UNSIGNED_SHORT),
        U16Rgba => plain(glow::RGBA16UI, glow::RGBA_INTEGER, glow::UNSIGNED_SHORT),
        F16R => plain(glow::R16F, glow::RED, glow::HALF_FLOAT),
        F16Rg => plain(glow::RG16F, glow::RG, glow::HALF_FLOAT),
        F16Rgba => plain(glow::RGBA16F, glow::RGBA, glow::HALF_FLOAT),
        U32R => plain(glow::R32UI, glow::RED_INTEGER, glow::UNSIGNED_INT),
        U32Rg => plain(glow::RG32UI, glow::RG_INTEGER, glow::UNSIGNED_INT),
        U32Rgba => plain(glow::RGBA32UI, glow::RGBA_INTEGER, glow::UNSIGNED_INT),
        S32R => plain(glow::R32I, glow::RED_INTEGER, glow::INT),
        F32R => plain(glow::R32F, glow::RED, glow::FLOAT),
        F32Rg => plain(glow::RG32F, glow::RG, glow::FLOAT),
        F32Rgb => plain(glow::RGB32F, glow::RGB, glow::FLOAT),
        F32Rgba => plain(glow::RGBA32F, glow::RGBA, glow::FLOAT),
        D16 => plain(
            glow::DEPTH_COMPONENT16,
            glow::DEPTH_COMPONENT,
            glow::UNSIGNED_SHORT,
        ),
        D24S8 => plain(
            glow::DEPTH24_STENCIL8,
            glow::DEPTH_STENCIL,
            glow::UNSIGNED_INT_24_8,
        ),
        D32F => plain(glow::DEPTH_COMPONENT32F, glow::DEPTH_COMPONENT, glow::FLOAT),
        D32FS8 => plain(
            glow::DEPTH32F_STENCIL8,
            glow::DEPTH_STENCIL,
            glow::FLOAT_32_UNSIGNED_INT_24_8_REV,
        ),
        Bc1 => compressed(glow::COMPRESSED_RGBA_S3TC_DXT1_EXT),
        Bc1Srgb => compressed(glow::COMPRESSED_SRGB_ALPHA_S3TC_DXT1_EXT),
        Bc2 => compressed(glow::COMPRESSED_RGBA_S3TC_DXT3_EXT),
        Bc2Srgb => compressed(glow::COMPRESSED_SRGB_ALPHA_S3TC_DXT3_EXT),
        Bc3 => compressed(glow::COMPRESSED_RGBA_S3TC_DXT5_EXT),
        Bc3Srgb => compressed(glow::COMPRESSED_SRGB_ALPHA_S3TC_DXT5_EXT),
        _ => whoops(&format!("no GL texture format for {format:?}")),
    }
}

pub(super) fn compare_function(func: CompareFunction) -> u32 {
    match func {
        CompareFunction::Never => glow::NEVER,
        CompareFunction::Less => glow::LESS,
        CompareFunction::Equal => glow::EQUAL,
        CompareFunction::LessEqual => glow::LEQUAL,
        CompareFunction::Greater => glow::GREATER,
        CompareFunction::NotEqual => glow::NOTEQUAL,
        CompareFunction::GreaterEqual => glow::GEQUAL,
        CompareFunction::Always => glow::ALWAYS,
    }
}

pub(super) fn blend_equation(mode: BlendMode) -> u32 {
    match mode {
        BlendMode::Add => glow::FUNC_ADD,
        BlendMode::Subtract => glow::FUNC_SUBTRACT,
        BlendMode::ReverseSubtract => glow::FUNC_REVERSE_SUBTRACT,
        BlendMode::Min => glow::MIN,
        BlendMode::Max => glow::MAX,
    }
}

pub(super) fn blend_factor(factor: BlendFactor) -> u32 {
    match factor {
        BlendFactor::Zero => glow::ZERO,
        BlendFactor::One => glow::ONE,
        BlendFactor::Src => glow::SRC_COLOR,
        BlendFactor::OneMinusSrc => glow::ONE_MINUS_SRC_COLOR,
        BlendFactor::SrcAlpha => glow::SRC_ALPHA,
        BlendFactor::OneMinusSrcAlpha => glow::ONE_MINUS_SRC_ALPHA,
        BlendFactor::Dst => glow::DST_COLOR,
        BlendFactor::OneMinusDst => glow::ONE_MINUS_DST_COLOR,
        BlendFactor::DstAlpha => glow::DST_ALPHA,
        BlendFactor::OneMinusDstAlpha => glow::ONE_MINUS_DST_ALPHA,
        BlendFactor::Constant => glow::CONSTANT_COLOR,
        BlendFactor::OneMinusConstant => glow::ONE_MINUS_CONSTANT_COLOR,
        BlendFactor::SrcAlphaSaturated => glow::SRC_ALPHA_SATURATE,
    }
}

pub(super) fn stencil_op(op: StencilOp) -> u32 {
    match op {
        StencilOp::Keep => glow::KEEP,
        StencilOp::Zero => glow::ZERO,
        StencilOp::Replace => glow::REPLACE,
        StencilOp::Invert => glow::INVERT,
        StencilOp::IncrementClamp => glow::INCR,
        StencilOp::DecrementClamp => glow::DECR,
        StencilOp::IncrementWrap => glow::INCR_WRAP,
        StencilOp::DecrementWrap => glow::DECR_WRAP,
    }
}

pub(super) fn cull_face(mode: CullMode) -> Option<u32> {
    match mode {
        CullMode::None => None,
        CullMode::Front => Some(glow::FRONT),
        CullMode::Back => Some(glow::BACK),
    }
}

pub(super) fn front_face(face: FrontFace) -> u32 {
    match face {
        FrontFace::Ccw => glow::CCW,
        FrontFace::Cw => glow::CW,
    }
}

pub(super) fn primitive_topology(topology: PrimitiveTopology) -> u32 {
    match topology {
        PrimitiveTopology::Points => glow::POINTS,
        PrimitiveTopology::Lines => glow::LINES,
        PrimitiveTopology::LineStrip => glow::LINE_STRIP,
        PrimitiveTopology::Triangles => glow::TRIANGLES,
        PrimitiveTopology::TriangleStrip => glow::TRIANGLE_STRIP,
    }
}

pub(super) fn address_mode(mode: AddressMode) -> u32 {
    match mode {
        AddressMode::ClampToEdge => glow::CLAMP_TO_EDGE,
        AddressMode::Repeat => glow::REPEAT,
        AddressMode::MirrorRepeat => glow::MIRRORED_REPEAT,
    }
}

pub(super) fn mag_filter(filter: FilterMode) -> u32 {
    match filter {
        FilterMode::Nearest => glow::NEAREST,
        FilterMode::Linear => glow::LINEAR,
    }
}

pub(super) fn min_filter(filter: FilterMode, mip: MipmapFilterMode) -> u32 {
    match (filter, mip) {
        (FilterMode::Nearest, MipmapFilterMode::NoMip) => glow::NEAREST,
        (FilterMode::Linear, MipmapFilterMode::NoMip) => glow::LINEAR,
        (FilterMode::Nearest, MipmapFilterMode::Nearest) => glow::NEAREST_MIPMAP_NEAREST,
        (FilterMode::Linear, MipmapFilterMode::Nearest) => glow::LINEAR_MIPMAP_NEAREST,
        (FilterMode::Nearest, MipmapFilterMode::Linear) => glow::NEAREST_MIPMAP_LINEAR,
        (FilterMode::Linear, MipmapFilterMode::Linear) => glow::LINEAR_MIPMAP_LINEAR,
    }
}

pub(super) fn index_type(format: Format) -> (u32, u64) {
    match format {
        Format::U16R => (glow::UNSIGNED_SHORT, 2),
        Format::U32R => (glow::UNSIGNED_INT, 4),
        _ => whoops(&format!("format {format:?} is not usable as an index buffer")),
    }
}

/// Vertex attribute pointer parameters: (component count, type, normalized,
/// integer).
pub(super) fn vertex_attribute(format: Format) -> (i32, u32, bool, bool) {
    use Format::*;
    let count = format.vertex_component_count() as i32;
    match format {
        U8R | U8Rg | U8Rgba => (count, glow::UNSIGNED_BYTE, false, true),
        U8RNorm | U8RgNorm | U8RgbaNorm => (count, glow::UNSIGNED_BYTE, true, false),
        S8RNorm | S8RgNorm | S8RgbaNorm => (count, glow::BYTE, true, false),
        U16R | U16Rg | U16Rgba => (count, glow::UNSIGNED_SHORT, false, true),
        U16RNorm | U16RgbaNorm => (count, glow::UNSIGNED_SHORT, true, false),
        S16R => (count, glow::SHORT, false, true),
        S16RgNorm => (count, glow::SHORT, true, false),
        F16R | F16Rg | F16Rgba => (count, glow::HALF_FLOAT, false, false),
        U32R | U32Rg | U32Rgba => (count, glow::UNSIGNED_INT, false, true),
        S32R => (count, glow::INT, false, true),
        F32R | F32Rg | F32Rgb | F32Rgba => (count, glow::FLOAT, false, false),
        _ => whoops(&format!("format {format:?} is not usable as a vertex attribute")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::format::ALL_FORMATS;

    #[test]
    fn gl2_table_covers_the_norm16_free_subset() {
        for &format in ALL_FORMATS {
            // ES has no 16-bit-normalized or BGRA internal formats.
            if matches!(
                format,
                Format::U16RNorm
                    | Format::S16RgNorm
                    | Format::U16RgbaNorm
                    | Format::Bgra8Norm
                    | Format::Bgra8NormSrgb
            ) {
                continue;
            }
            let _ = texture_format(format, GlProfile::WebGl2);
        }
    }

    #[test]
    #[should_panic(expected = "whoops")]
    fn legacy_profile_rejects_integer_formats() {
        let _ = texture_format(Format::U32R, GlProfile::WebGl1);
    }

    #[test]
    fn compressed_formats_have_no_upload_triple() {
        let bc1 = texture_format(Format::Bc1, GlProfile::WebGl2);
        assert!(bc1.compressed);
        assert_eq!(bc1.internal, glow::COMPRESSED_RGBA_S3TC_DXT1_EXT);
    }
}
