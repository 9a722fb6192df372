// SPDX-License-Identifier: MIT OR Apache-2.0
//! Descriptor value types shared by both backends.
//!
//! Descriptors are plain values owned by the caller. The device copies them
//! into the objects it creates (callers often mutate a shared descriptor
//! template between creations), identity-copying only the resource handles,
//! which stay externally owned.

use std::rc::Rc;

use crate::api::format::{Format, SamplerFormatKind};
use crate::api::resource::{
    Buffer, BufferUsage, ComputePipeline, InputLayout, Program, QueryPool, RenderPipeline,
    RenderTarget, Sampler, Texture, TextureDimension, TextureUsage,
};

// ---------------------------------------------------------------------------
// fixed-function enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareFunction {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendMode {
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    Src,
    OneMinusSrc,
    SrcAlpha,
    OneMinusSrcAlpha,
    Dst,
    OneMinusDst,
    DstAlpha,
    OneMinusDstAlpha,
    Constant,
    OneMinusConstant,
    SrcAlphaSaturated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StencilOp {
    Keep,
    Zero,
    Replace,
    Invert,
    IncrementClamp,
    DecrementClamp,
    IncrementWrap,
    DecrementWrap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullMode {
    None,
    Front,
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrontFace {
    Ccw,
    Cw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveTopology {
    Points,
    Lines,
    LineStrip,
    Triangles,
    TriangleStrip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressMode {
    ClampToEdge,
    Repeat,
    MirrorRepeat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterMode {
    Nearest,
    Linear,
}

/// Mipmap filtering; `NoMip` clamps sampling to the base level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MipmapFilterMode {
    NoMip,
    Nearest,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexStepMode {
    Vertex,
    Instance,
}

bitflags::bitflags! {
    /// Per-attachment color write mask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ChannelWriteMask: u8 {
        const RED   = 1 << 0;
        const GREEN = 1 << 1;
        const BLUE  = 1 << 2;
        const ALPHA = 1 << 3;
        const COLOR = Self::RED.bits() | Self::GREEN.bits() | Self::BLUE.bits();
        const ALL   = Self::COLOR.bits() | Self::ALPHA.bits();
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const TRANSPARENT_BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 0.0,
    };
    pub const OPAQUE_BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };
}

// ---------------------------------------------------------------------------
// resource descriptors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct BufferDescriptor {
    pub size: u64,
    pub usage: BufferUsage,
    pub debug_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TextureDescriptor {
    pub dimension: TextureDimension,
    pub format: Format,
    pub width: u32,
    pub height: u32,
    pub depth_or_array_layers: u32,
    pub mip_level_count: u32,
    pub usage: TextureUsage,
    /// Pixel-store vertical flip applied to uploads, fixed at creation.
    pub flip_y: bool,
    pub debug_name: Option<String>,
}

impl TextureDescriptor {
    pub fn d2(format: Format, width: u32, height: u32, usage: TextureUsage) -> Self {
        TextureDescriptor {
            dimension: TextureDimension::D2,
            format,
            width,
            height,
            depth_or_array_layers: 1,
            mip_level_count: 1,
            usage,
            flip_y: false,
            debug_name: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SamplerDescriptor {
    pub address_mode_u: AddressMode,
    pub address_mode_v: AddressMode,
    pub address_mode_w: AddressMode,
    pub mag_filter: FilterMode,
    pub min_filter: FilterMode,
    pub mipmap_filter: MipmapFilterMode,
    pub lod_min_clamp: f32,
    pub lod_max_clamp: f32,
    /// Values above 1 require bilinear min/mag and linear mip filtering;
    /// asserted at creation rather than silently corrected.
    pub max_anisotropy: u16,
    pub compare: Option<CompareFunction>,
}

impl Default for SamplerDescriptor {
    fn default() -> Self {
        SamplerDescriptor {
            address_mode_u: AddressMode::ClampToEdge,
            address_mode_v: AddressMode::ClampToEdge,
            address_mode_w: AddressMode::ClampToEdge,
            mag_filter: FilterMode::Nearest,
            min_filter: FilterMode::Nearest,
            mipmap_filter: MipmapFilterMode::NoMip,
            lod_min_clamp: 0.0,
            lod_max_clamp: 32.0,
            max_anisotropy: 1,
            compare: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderTargetDescriptor {
    pub format: Format,
    pub width: u32,
    pub height: u32,
    pub sample_count: u32,
    pub debug_name: Option<String>,
}

// ---------------------------------------------------------------------------
// bindings
// ---------------------------------------------------------------------------

/// One uniform- or storage-buffer binding.
#[derive(Clone)]
pub struct BufferBinding {
    /// Explicit slot; `None` auto-increments within the resource class.
    pub binding: Option<u32>,
    pub buffer: Rc<dyn Buffer>,
    pub offset: u64,
    /// Bound range size; `0` means "to the end of the buffer".
    pub size: u64,
}

impl std::fmt::Debug for BufferBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferBinding")
            .field("binding", &self.binding)
            .field("buffer", &self.buffer.id())
            .field("offset", &self.offset)
            .field("size", &self.size)
            .finish()
    }
}

/// A texture+sampler pair binding.
///
/// `texture`/`sampler` may individually be `None`; the resolver substitutes
/// backend fallback resources matching `dimension` and `format_kind`, since
/// an unset entry is a hard pipeline-creation error on WebGPU.
#[derive(Clone)]
pub struct SamplerBinding {
    pub binding: Option<u32>,
    pub texture: Option<Rc<dyn Texture>>,
    pub sampler: Option<Rc<dyn Sampler>>,
    pub dimension: TextureDimension,
    pub format_kind: SamplerFormatKind,
    /// Shadow-comparison sampling.
    pub comparison: bool,
}

impl std::fmt::Debug for SamplerBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SamplerBinding")
            .field("binding", &self.binding)
            .field("texture", &self.texture.as_ref().map(|t| t.id()))
            .field("sampler", &self.sampler.as_ref().map(|s| s.id()))
            .field("dimension", &self.dimension)
            .field("format_kind", &self.format_kind)
            .field("comparison", &self.comparison)
            .finish()
    }
}

#[derive(Clone)]
pub struct StorageTextureBinding {
    pub binding: Option<u32>,
    pub texture: Rc<dyn Texture>,
}

impl std::fmt::Debug for StorageTextureBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageTextureBinding")
            .field("binding", &self.binding)
            .field("texture", &self.texture.id())
            .finish()
    }
}

/// The pipeline whose layout a [`BindingsDescriptor`] is resolved against.
#[derive(Clone)]
pub enum PipelineRef {
    Render(Rc<dyn RenderPipeline>),
    Compute(Rc<dyn ComputePipeline>),
}

impl std::fmt::Debug for PipelineRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineRef::Render(p) => write!(f, "PipelineRef::Render({})", p.id()),
            PipelineRef::Compute(p) => write!(f, "PipelineRef::Compute({})", p.id()),
        }
    }
}

/// An unordered collection of resource bindings, keyed by slot within each
/// resource class.
#[derive(Debug, Clone)]
pub struct BindingsDescriptor {
    pub pipeline: PipelineRef,
    pub uniform_buffer_bindings: Vec<BufferBinding>,
    pub sampler_bindings: Vec<SamplerBinding>,
    pub storage_buffer_bindings: Vec<BufferBinding>,
    pub storage_texture_bindings: Vec<StorageTextureBinding>,
}

/// Resource classes in their fixed cross-backend bind-group order.
///
/// WebGPU bind-group indices are assigned by class, not declaration order;
/// this ordering is part of the public contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceClass {
    UniformBuffers = 0,
    Samplers = 1,
    StorageBuffers = 2,
    StorageTextures = 3,
}

pub const RESOURCE_CLASS_ORDER: [ResourceClass; 4] = [
    ResourceClass::UniformBuffers,
    ResourceClass::Samplers,
    ResourceClass::StorageBuffers,
    ResourceClass::StorageTextures,
];

/// Summary of one binding set, as inferred from a [`BindingsDescriptor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BindingLayoutTable {
    pub num_uniform_buffers: u32,
    pub num_samplers: u32,
    pub num_storage_buffers: u32,
    pub num_storage_textures: u32,
}

impl BindingLayoutTable {
    pub fn is_empty(&self) -> bool {
        self.num_uniform_buffers == 0
            && self.num_samplers == 0
            && self.num_storage_buffers == 0
            && self.num_storage_textures == 0
    }
}

/// Slot assignments for every binding, grouped by resource class.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolvedBindingSlots {
    /// Assigned slot per binding, in descriptor order, one `Vec` per class in
    /// [`RESOURCE_CLASS_ORDER`].
    pub slots: [Vec<u32>; 4],
    /// Index of the last non-empty class; trailing empty classes never
    /// produce bind groups.
    pub last_group_index: Option<usize>,
}

/// Infers the binding-layout tables for a descriptor.
///
/// All bindings currently live in one set; the result is empty when the
/// descriptor binds nothing at all.
pub fn infer_binding_layout(descriptor: &BindingsDescriptor) -> Vec<BindingLayoutTable> {
    let table = BindingLayoutTable {
        num_uniform_buffers: descriptor.uniform_buffer_bindings.len() as u32,
        num_samplers: descriptor.sampler_bindings.len() as u32,
        num_storage_buffers: descriptor.storage_buffer_bindings.len() as u32,
        num_storage_textures: descriptor.storage_texture_bindings.len() as u32,
    };
    if table.is_empty() { Vec::new() } else { vec![table] }
}

/// Assigns a slot to every binding: explicit `binding` wins, otherwise slots
/// auto-increment within the class starting at 0.
pub fn resolve_binding_slots(descriptor: &BindingsDescriptor) -> ResolvedBindingSlots {
    fn assign(explicit: impl Iterator<Item = Option<u32>>) -> Vec<u32> {
        let mut next = 0u32;
        explicit
            .map(|slot| match slot {
                Some(slot) => slot,
                None => {
                    let slot = next;
                    next += 1;
                    slot
                }
            })
            .collect()
    }

    let slots = [
        assign(descriptor.uniform_buffer_bindings.iter().map(|b| b.binding)),
        assign(descriptor.sampler_bindings.iter().map(|b| b.binding)),
        assign(descriptor.storage_buffer_bindings.iter().map(|b| b.binding)),
        assign(descriptor.storage_texture_bindings.iter().map(|b| b.binding)),
    ];
    let last_group_index = slots.iter().rposition(|class| !class.is_empty());
    ResolvedBindingSlots {
        slots,
        last_group_index,
    }
}

// ---------------------------------------------------------------------------
// input layout
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttributeDescriptor {
    pub format: Format,
    pub offset: u64,
    pub shader_location: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexBufferDescriptor {
    pub array_stride: u64,
    pub step_mode: VertexStepMode,
    pub attributes: Vec<VertexAttributeDescriptor>,
}

#[derive(Clone)]
pub struct InputLayoutDescriptor {
    pub vertex_buffer_descriptors: Vec<VertexBufferDescriptor>,
    pub index_buffer_format: Option<Format>,
    /// Needed on GL to look attribute locations up against the linked
    /// program.
    pub program: Rc<dyn Program>,
}

impl std::fmt::Debug for InputLayoutDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputLayoutDescriptor")
            .field("vertex_buffer_descriptors", &self.vertex_buffer_descriptors)
            .field("index_buffer_format", &self.index_buffer_format)
            .field("program", &self.program.id())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// pipelines
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct RenderPipelineDescriptor {
    pub program: Rc<dyn Program>,
    pub topology: PrimitiveTopology,
    pub mega_state: crate::api::megastate::MegaStateDescriptor,
    pub color_attachment_formats: Vec<Format>,
    pub depth_stencil_attachment_format: Option<Format>,
    pub sample_count: u32,
    pub input_layout: Option<Rc<dyn InputLayout>>,
}

impl std::fmt::Debug for RenderPipelineDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderPipelineDescriptor")
            .field("program", &self.program.id())
            .field("topology", &self.topology)
            .field("mega_state", &self.mega_state)
            .field("color_attachment_formats", &self.color_attachment_formats)
            .field(
                "depth_stencil_attachment_format",
                &self.depth_stencil_attachment_format,
            )
            .field("sample_count", &self.sample_count)
            .field("input_layout", &self.input_layout.as_ref().map(|l| l.id()))
            .finish()
    }
}

#[derive(Clone)]
pub struct ComputePipelineDescriptor {
    pub program: Rc<dyn Program>,
}

impl std::fmt::Debug for ComputePipelineDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComputePipelineDescriptor")
            .field("program", &self.program.id())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// passes
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct ColorAttachment {
    pub render_target: Rc<dyn RenderTarget>,
    /// Multisample resolve destination.
    pub resolve_to: Option<Rc<dyn Texture>>,
    /// `None` loads the previous contents instead of clearing.
    pub clear_color: Option<Color>,
}

#[derive(Clone)]
pub struct DepthStencilAttachment {
    pub render_target: Rc<dyn RenderTarget>,
    pub clear_depth: Option<f32>,
    pub clear_stencil: Option<u32>,
}

#[derive(Clone, Default)]
pub struct RenderPassDescriptor {
    pub color_attachments: Vec<ColorAttachment>,
    pub depth_stencil_attachment: Option<DepthStencilAttachment>,
    pub occlusion_query_pool: Option<Rc<dyn QueryPool>>,
}

/// A vertex- or index-buffer slice bound through `set_vertex_input`.
#[derive(Clone)]
pub struct BufferSlice {
    pub buffer: Rc<dyn Buffer>,
    pub offset: u64,
}

impl std::fmt::Debug for BufferSlice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferSlice")
            .field("buffer", &self.buffer.id())
            .field("offset", &self.offset)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryPoolKind {
    Occlusion,
}
