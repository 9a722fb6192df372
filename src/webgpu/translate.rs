// SPDX-License-Identifier: MIT OR Apache-2.0
//! Translation tables from API enums to wgpu state.
//!
//! Every function here is total-or-fatal: a format with no wgpu equivalent
//! panics instead of mapping to a close-enough layout.

use crate::api::depth::reverse_depth_for_compare_function;
use crate::api::descriptors::{
    AddressMode, BlendFactor, BlendMode, ChannelWriteMask, CompareFunction, CullMode, FilterMode,
    FrontFace, MipmapFilterMode, PrimitiveTopology, StencilOp,
};
use crate::api::format::Format;
use crate::api::megastate::{AttachmentState, MegaStateDescriptor};
use crate::api::resource::{BufferUsage, TextureDimension, TextureUsage};
use crate::api::whoops;

pub(super) fn texture_format(format: Format) -> wgpu::TextureFormat {
    use Format::*;
    match format {
        U8R => wgpu::TextureFormat::R8Uint,
        U8RNorm => wgpu::TextureFormat::R8Unorm,
        S8RNorm => wgpu::TextureFormat::R8Snorm,
        U8Rg => wgpu::TextureFormat::Rg8Uint,
        U8RgNorm => wgpu::TextureFormat::Rg8Unorm,
        S8RgNorm => wgpu::TextureFormat::Rg8Snorm,
        U8Rgba => wgpu::TextureFormat::Rgba8Uint,
        U8RgbaNorm => wgpu::TextureFormat::Rgba8Unorm,
        U8RgbaNormSrgb => wgpu::TextureFormat::Rgba8UnormSrgb,
        S8RgbaNorm => wgpu::TextureFormat::Rgba8Snorm,
        Bgra8Norm => wgpu::TextureFormat::Bgra8Unorm,
        Bgra8NormSrgb => wgpu::TextureFormat::Bgra8UnormSrgb,
        U16R => wgpu::TextureFormat::R16Uint,
        U16RNorm => wgpu::TextureFormat::R16Unorm,
        S16R => wgpu::TextureFormat::R16Sint,
        S16RgNorm => wgpu::TextureFormat::Rg16Snorm,
        U16Rg => wgpu::TextureFormat::Rg16Uint,
        U16Rgba => wgpu::TextureFormat::Rgba16Uint,
        U16RgbaNorm => wgpu::TextureFormat::Rgba16Unorm,
        F16R => wgpu::TextureFormat::R16Float,
        F16Rg => wgpu::TextureFormat::Rg16Float,
        F16Rgba => wgpu::TextureFormat::Rgba16Float,
        U32R => wgpu::TextureFormat::R32Uint,
        U32Rg => wgpu::TextureFormat::Rg32Uint,
        U32Rgba => wgpu::TextureFormat::Rgba32Uint,
        S32R => wgpu::TextureFormat::R32Sint,
        F32R => wgpu::TextureFormat::R32Float,
        F32Rg => wgpu::TextureFormat::Rg32Float,
        F32Rgba => wgpu::TextureFormat::Rgba32Float,
        D16 => wgpu::TextureFormat::Depth16Unorm,
        D24S8 => wgpu::TextureFormat::Depth24PlusStencil8,
        D32F => wgpu::TextureFormat::Depth32Float,
        D32FS8 => wgpu::TextureFormat::Depth32FloatStencil8,
        Bc1 => wgpu::TextureFormat::Bc1RgbaUnorm,
        Bc1Srgb => wgpu::TextureFormat::Bc1RgbaUnormSrgb,
        Bc2 => wgpu::TextureFormat::Bc2RgbaUnorm,
        Bc2Srgb => wgpu::TextureFormat::Bc2RgbaUnormSrgb,
        Bc3 => wgpu::TextureFormat::Bc3RgbaUnorm,
        Bc3Srgb => wgpu::TextureFormat::Bc3RgbaUnormSrgb,
        // Three-channel float textures do not exist on this platform.
        _ => whoops(&format!("no wgpu texture format for {format:?}")),
    }
}

pub(super) fn vertex_format(format: Format) -> wgpu::VertexFormat {
    use Format::*;
    match format {
        U8R => wgpu::VertexFormat::Uint8,
        U8RNorm => wgpu::VertexFormat::Unorm8,
        S8RNorm => wgpu::VertexFormat::Snorm8,
        U8Rg => wgpu::VertexFormat::Uint8x2,
        U8RgNorm => wgpu::VertexFormat::Unorm8x2,
        S8RgNorm => wgpu::VertexFormat::Snorm8x2,
        U8Rgba => wgpu::VertexFormat::Uint8x4,
        U8RgbaNorm => wgpu::VertexFormat::Unorm8x4,
        S8RgbaNorm => wgpu::VertexFormat::Snorm8x4,
        U16R => wgpu::VertexFormat::Uint16,
        U16RNorm => wgpu::VertexFormat::Unorm16,
        S16R => wgpu::VertexFormat::Sint16,
        S16RgNorm => wgpu::VertexFormat::Snorm16x2,
        U16Rg => wgpu::VertexFormat::Uint16x2,
        U16Rgba => wgpu::VertexFormat::Uint16x4,
        U16RgbaNorm => wgpu::VertexFormat::Unorm16x4,
        F16R => wgpu::VertexFormat::Float16,
        F16Rg => wgpu::VertexFormat::Float16x2,
        F16Rgba => wgpu::VertexFormat::Float16x4,
        U32R => wgpu::VertexFormat::Uint32,
        U32Rg => wgpu::VertexFormat::Uint32x2,
        U32Rgba => wgpu::VertexFormat::Uint32x4,
        S32R => wgpu::VertexFormat::Sint32,
        F32R => wgpu::VertexFormat::Float32,
        F32Rg => wgpu::VertexFormat::Float32x2,
        F32Rgb => wgpu::VertexFormat::Float32x3,
        F32Rgba => wgpu::VertexFormat::Float32x4,
        _ => whoops(&format!("format {format:?} is not usable as a vertex attribute")),
    }
}

pub(super) fn index_format(format: Format) -> wgpu::IndexFormat {
    match format {
        Format::U16R => wgpu::IndexFormat::Uint16,
        Format::U32R => wgpu::IndexFormat::Uint32,
        _ => whoops(&format!("format {format:?} is not usable as an index buffer")),
    }
}

pub(super) fn buffer_usages(usage: BufferUsage) -> wgpu::BufferUsages {
    let mut out = wgpu::BufferUsages::empty();
    if usage.contains(BufferUsage::MAP_READ) {
        out |= wgpu::BufferUsages::MAP_READ;
    }
    if usage.contains(BufferUsage::COPY_SRC) {
        out |= wgpu::BufferUsages::COPY_SRC;
    }
    if usage.contains(BufferUsage::COPY_DST) {
        out |= wgpu::BufferUsages::COPY_DST;
    }
    if usage.contains(BufferUsage::INDEX) {
        out |= wgpu::BufferUsages::INDEX;
    }
    if usage.contains(BufferUsage::VERTEX) {
        out |= wgpu::BufferUsages::VERTEX;
    }
    if usage.contains(BufferUsage::UNIFORM) {
        out |= wgpu::BufferUsages::UNIFORM;
    }
    if usage.contains(BufferUsage::STORAGE) {
        out |= wgpu::BufferUsages::STORAGE;
    }
    if usage.contains(BufferUsage::INDIRECT) {
        out |= wgpu::BufferUsages::INDIRECT;
    }
    out
}

pub(super) fn texture_usages(usage: TextureUsage) -> wgpu::TextureUsages {
    let mut out = wgpu::TextureUsages::empty();
    if usage.contains(TextureUsage::SAMPLED) {
        out |= wgpu::TextureUsages::TEXTURE_BINDING;
    }
    if usage.contains(TextureUsage::RENDER_TARGET) {
        out |= wgpu::TextureUsages::RENDER_ATTACHMENT;
    }
    if usage.contains(TextureUsage::STORAGE) {
        out |= wgpu::TextureUsages::STORAGE_BINDING;
    }
    if usage.contains(TextureUsage::COPY_SRC) {
        out |= wgpu::TextureUsages::COPY_SRC;
    }
    if usage.contains(TextureUsage::COPY_DST) {
        out |= wgpu::TextureUsages::COPY_DST;
    }
    out
}

pub(super) fn texture_dimension(dimension: TextureDimension) -> wgpu::TextureDimension {
    match dimension {
        TextureDimension::D2 | TextureDimension::D2Array | TextureDimension::Cube => {
            wgpu::TextureDimension::D2
        }
        TextureDimension::D3 => wgpu::TextureDimension::D3,
    }
}

pub(super) fn texture_view_dimension(dimension: TextureDimension) -> wgpu::TextureViewDimension {
    match dimension {
        TextureDimension::D2 => wgpu::TextureViewDimension::D2,
        TextureDimension::D2Array => wgpu::TextureViewDimension::D2Array,
        TextureDimension::D3 => wgpu::TextureViewDimension::D3,
        TextureDimension::Cube => wgpu::TextureViewDimension::Cube,
    }
}

pub(super) fn compare_function(func: CompareFunction) -> wgpu::CompareFunction {
    match func {
        CompareFunction::Never => wgpu::CompareFunction::Never,
        CompareFunction::Less => wgpu::CompareFunction::Less,
        CompareFunction::Equal => wgpu::CompareFunction::Equal,
        CompareFunction::LessEqual => wgpu::CompareFunction::LessEqual,
        CompareFunction::Greater => wgpu::CompareFunction::Greater,
        CompareFunction::NotEqual => wgpu::CompareFunction::NotEqual,
        CompareFunction::GreaterEqual => wgpu::CompareFunction::GreaterEqual,
        CompareFunction::Always => wgpu::CompareFunction::Always,
    }
}

pub(super) fn blend_operation(mode: BlendMode) -> wgpu::BlendOperation {
    match mode {
        BlendMode::Add => wgpu::BlendOperation::Add,
        BlendMode::Subtract => wgpu::BlendOperation::Subtract,
        BlendMode::ReverseSubtract => wgpu::BlendOperation::ReverseSubtract,
        BlendMode::Min => wgpu::BlendOperation::Min,
        BlendMode::Max => wgpu::BlendOperation::Max,
    }
}

pub(super) fn blend_factor(factor: BlendFactor) -> wgpu::BlendFactor {
    match factor {
        BlendFactor::Zero => wgpu::BlendFactor::Zero,
        BlendFactor::One => wgpu::BlendFactor::One,
        BlendFactor::Src => wgpu::BlendFactor::Src,
        BlendFactor::OneMinusSrc => wgpu::BlendFactor::OneMinusSrc,
        BlendFactor::SrcAlpha => wgpu::BlendFactor::SrcAlpha,
        BlendFactor::OneMinusSrcAlpha => wgpu::BlendFactor::OneMinusSrcAlpha,
        BlendFactor::Dst => wgpu::BlendFactor::Dst,
        BlendFactor::OneMinusDst => wgpu::BlendFactor::OneMinusDst,
        BlendFactor::DstAlpha => wgpu::BlendFactor::DstAlpha,
        BlendFactor::OneMinusDstAlpha => wgpu::BlendFactor::OneMinusDstAlpha,
        BlendFactor::Constant => wgpu::BlendFactor::Constant,
        BlendFactor::OneMinusConstant => wgpu::BlendFactor::OneMinusConstant,
        BlendFactor::SrcAlphaSaturated => wgpu::BlendFactor::SrcAlphaSaturated,
    }
}

pub(super) fn stencil_operation(op: StencilOp) -> wgpu::StencilOperation {
    match op {
        StencilOp::Keep => wgpu::StencilOperation::Keep,
        StencilOp::Zero => wgpu::StencilOperation::Zero,
        StencilOp::Replace => wgpu::StencilOperation::Replace,
        StencilOp::Invert => wgpu::StencilOperation::Invert,
        StencilOp::IncrementClamp => wgpu::StencilOperation::IncrementClamp,
        StencilOp::DecrementClamp => wgpu::StencilOperation::DecrementClamp,
        StencilOp::IncrementWrap => wgpu::StencilOperation::IncrementWrap,
        StencilOp::DecrementWrap => wgpu::StencilOperation::DecrementWrap,
    }
}

pub(super) fn cull_mode(mode: CullMode) -> Option<wgpu::Face> {
    match mode {
        CullMode::None => None,
        CullMode::Front => Some(wgpu::Face::Front),
        CullMode::Back => Some(wgpu::Face::Back),
    }
}

pub(super) fn front_face(face: FrontFace) -> wgpu::FrontFace {
    match face {
        FrontFace::Ccw => wgpu::FrontFace::Ccw,
        FrontFace::Cw => wgpu::FrontFace::Cw,
    }
}

pub(super) fn primitive_topology(topology: PrimitiveTopology) -> wgpu::PrimitiveTopology {
    match topology {
        PrimitiveTopology::Points => wgpu::PrimitiveTopology::PointList,
        PrimitiveTopology::Lines => wgpu::PrimitiveTopology::LineList,
        PrimitiveTopology::LineStrip => wgpu::PrimitiveTopology::LineStrip,
        PrimitiveTopology::Triangles => wgpu::PrimitiveTopology::TriangleList,
        PrimitiveTopology::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
    }
}

pub(super) fn address_mode(mode: AddressMode) -> wgpu::AddressMode {
    match mode {
        AddressMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
        AddressMode::Repeat => wgpu::AddressMode::Repeat,
        AddressMode::MirrorRepeat => wgpu::AddressMode::MirrorRepeat,
    }
}

pub(super) fn filter_mode(mode: FilterMode) -> wgpu::FilterMode {
    match mode {
        FilterMode::Nearest => wgpu::FilterMode::Nearest,
        FilterMode::Linear => wgpu::FilterMode::Linear,
    }
}

pub(super) fn mipmap_filter_mode(mode: MipmapFilterMode) -> wgpu::FilterMode {
    match mode {
        MipmapFilterMode::NoMip | MipmapFilterMode::Nearest => wgpu::FilterMode::Nearest,
        MipmapFilterMode::Linear => wgpu::FilterMode::Linear,
    }
}

pub(super) fn color_writes(mask: ChannelWriteMask) -> wgpu::ColorWrites {
    let mut out = wgpu::ColorWrites::empty();
    if mask.contains(ChannelWriteMask::RED) {
        out |= wgpu::ColorWrites::RED;
    }
    if mask.contains(ChannelWriteMask::GREEN) {
        out |= wgpu::ColorWrites::GREEN;
    }
    if mask.contains(ChannelWriteMask::BLUE) {
        out |= wgpu::ColorWrites::BLUE;
    }
    if mask.contains(ChannelWriteMask::ALPHA) {
        out |= wgpu::ColorWrites::ALPHA;
    }
    out
}

/// Per-attachment blend state; `None` when blending is an observable no-op.
pub(super) fn blend_state(attachment: &AttachmentState) -> Option<wgpu::BlendState> {
    if attachment.rgb_blend.is_opaque() && attachment.alpha_blend.is_opaque() {
        return None;
    }
    Some(wgpu::BlendState {
        color: wgpu::BlendComponent {
            operation: blend_operation(attachment.rgb_blend.mode),
            src_factor: blend_factor(attachment.rgb_blend.src_factor),
            dst_factor: blend_factor(attachment.rgb_blend.dst_factor),
        },
        alpha: wgpu::BlendComponent {
            operation: blend_operation(attachment.alpha_blend.mode),
            src_factor: blend_factor(attachment.alpha_blend.src_factor),
            dst_factor: blend_factor(attachment.alpha_blend.dst_factor),
        },
    })
}

fn stencil_face(state: &crate::api::megastate::StencilFaceState) -> wgpu::StencilFaceState {
    wgpu::StencilFaceState {
        compare: compare_function(state.compare),
        fail_op: stencil_operation(state.fail_op),
        depth_fail_op: stencil_operation(state.depth_fail_op),
        pass_op: stencil_operation(state.pass_op),
    }
}

/// Builds the depth/stencil state for a pipeline. This is the single place
/// the depth-compare reversal is applied on this backend.
pub(super) fn depth_stencil_state(
    mega: &MegaStateDescriptor,
    format: Format,
) -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format: texture_format(format),
        depth_write_enabled: mega.depth_write,
        depth_compare: compare_function(reverse_depth_for_compare_function(mega.depth_compare)),
        stencil: wgpu::StencilState {
            front: stencil_face(&mega.stencil_front),
            back: stencil_face(&mega.stencil_back),
            read_mask: mega.stencil_front.mask,
            write_mask: if mega.stencil_write { 0xFF } else { 0 },
        },
        bias: if mega.polygon_offset {
            wgpu::DepthBiasState {
                constant: 1,
                slope_scale: 1.0,
                clamp: 0.0,
            }
        } else {
            wgpu::DepthBiasState::default()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::format::ALL_FORMATS;

    #[test]
    fn texture_format_table_covers_everything_but_rgb32() {
        for &format in ALL_FORMATS {
            if format == Format::F32Rgb {
                continue;
            }
            let _ = texture_format(format);
        }
    }

    #[test]
    #[should_panic(expected = "whoops")]
    fn rgb32_texture_format_fails_fast() {
        let _ = texture_format(Format::F32Rgb);
    }

    #[test]
    fn depth_compare_is_reversed_exactly_once() {
        let mega = MegaStateDescriptor::default();
        // LessEqual under reversed-Z becomes GreaterEqual at the wgpu boundary.
        let state = depth_stencil_state(&mega, Format::D32F);
        assert_eq!(state.depth_compare, wgpu::CompareFunction::GreaterEqual);
    }

    #[test]
    fn opaque_blend_disables_blending() {
        assert!(blend_state(&AttachmentState::default()).is_none());
    }
}
