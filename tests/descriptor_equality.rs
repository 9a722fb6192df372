// SPDX-License-Identifier: MIT OR Apache-2.0
//! Structural descriptor equality: identity for resources, value comparison
//! for everything else.

mod common;

use std::rc::Rc;

use common::{StubBuffer, StubProgram, StubRenderPipeline, StubSampler, StubTexture};
use mica::api::equality::{
    bindings_descriptor_equals, buffer_binding_equals, copy_bindings_descriptor,
    render_pipeline_descriptor_equals, sampler_binding_equals, sampler_descriptor_equals,
};
use mica::api::{
    AddressMode, BindingsDescriptor, Buffer, BufferBinding, CompareFunction, CullMode, Format,
    MegaStateDescriptor, PartialMegaState, PipelineRef, PrimitiveTopology,
    RenderPipelineDescriptor, SamplerBinding, SamplerDescriptor, SamplerFormatKind, Texture,
    TextureDimension,
};

fn buffer_binding(buffer: Rc<dyn Buffer>, offset: u64) -> BufferBinding {
    BufferBinding {
        binding: None,
        buffer,
        offset,
        size: 0,
    }
}

fn sampler_binding(texture: Option<Rc<dyn Texture>>) -> SamplerBinding {
    SamplerBinding {
        binding: None,
        texture,
        sampler: None,
        dimension: TextureDimension::D2,
        format_kind: SamplerFormatKind::Float,
        comparison: false,
    }
}

fn bindings_descriptor(
    pipeline: &Rc<StubRenderPipeline>,
    uniforms: Vec<BufferBinding>,
    samplers: Vec<SamplerBinding>,
) -> BindingsDescriptor {
    BindingsDescriptor {
        pipeline: PipelineRef::Render(pipeline.clone()),
        uniform_buffer_bindings: uniforms,
        sampler_bindings: samplers,
        storage_buffer_bindings: Vec::new(),
        storage_texture_bindings: Vec::new(),
    }
}

#[test]
fn buffer_bindings_compare_by_resource_identity() {
    let buffer = StubBuffer::new();
    let a = buffer_binding(buffer.clone(), 0);
    let b = buffer_binding(buffer.clone(), 0);
    assert!(buffer_binding_equals(&a, &b));

    // A distinct buffer with identical contents is a different binding.
    let other = buffer_binding(StubBuffer::new(), 0);
    assert!(!buffer_binding_equals(&a, &other));
}

#[test]
fn buffer_bindings_compare_range_and_slot() {
    let buffer = StubBuffer::new();
    let base = buffer_binding(buffer.clone(), 0);

    let shifted = buffer_binding(buffer.clone(), 64);
    assert!(!buffer_binding_equals(&base, &shifted));

    let mut explicit = buffer_binding(buffer.clone(), 0);
    explicit.binding = Some(2);
    assert!(!buffer_binding_equals(&base, &explicit));

    let mut sized = buffer_binding(buffer, 0);
    sized.size = 128;
    assert!(!buffer_binding_equals(&base, &sized));
}

#[test]
fn sampler_bindings_distinguish_unset_from_set() {
    let texture = StubTexture::new();
    let set = sampler_binding(Some(texture.clone()));
    let unset = sampler_binding(None);
    assert!(sampler_binding_equals(&set, &set.clone()));
    assert!(!sampler_binding_equals(&set, &unset));

    let sampler = StubSampler::new();
    let mut with_sampler = sampler_binding(Some(texture));
    with_sampler.sampler = Some(sampler);
    assert!(!sampler_binding_equals(&set, &with_sampler));
}

#[test]
fn bindings_descriptors_compare_elementwise() {
    let pipeline = StubRenderPipeline::new();
    let buffer = StubBuffer::new();
    let texture = StubTexture::new();

    let a = bindings_descriptor(
        &pipeline,
        vec![buffer_binding(buffer.clone(), 0)],
        vec![sampler_binding(Some(texture.clone()))],
    );
    let b = bindings_descriptor(
        &pipeline,
        vec![buffer_binding(buffer.clone(), 0)],
        vec![sampler_binding(Some(texture.clone()))],
    );
    assert!(bindings_descriptor_equals(&a, &b));

    // Extra binding.
    let longer = bindings_descriptor(
        &pipeline,
        vec![
            buffer_binding(buffer.clone(), 0),
            buffer_binding(buffer.clone(), 64),
        ],
        vec![sampler_binding(Some(texture.clone()))],
    );
    assert!(!bindings_descriptor_equals(&a, &longer));

    // Same bindings against a different pipeline.
    let other_pipeline = StubRenderPipeline::new();
    let reparented = bindings_descriptor(
        &other_pipeline,
        vec![buffer_binding(buffer, 0)],
        vec![sampler_binding(Some(texture))],
    );
    assert!(!bindings_descriptor_equals(&a, &reparented));
}

#[test]
fn copied_bindings_share_resources_but_compare_equal() {
    let pipeline = StubRenderPipeline::new();
    let buffer = StubBuffer::new();
    let descriptor = bindings_descriptor(
        &pipeline,
        vec![buffer_binding(buffer.clone(), 0)],
        Vec::new(),
    );
    let copy = copy_bindings_descriptor(&descriptor);
    assert!(bindings_descriptor_equals(&descriptor, &copy));
    // Identity copy of the handle, not a duplicate resource.
    assert_eq!(copy.uniform_buffer_bindings[0].buffer.id(), buffer.id());
}

#[test]
fn sampler_descriptors_compare_by_value() {
    let a = SamplerDescriptor::default();
    assert!(sampler_descriptor_equals(&a, &SamplerDescriptor::default()));

    let b = SamplerDescriptor {
        address_mode_u: AddressMode::Repeat,
        ..SamplerDescriptor::default()
    };
    assert!(!sampler_descriptor_equals(&a, &b));
}

#[test]
fn render_pipeline_descriptors_compare_program_and_state() {
    let program = StubProgram::new();
    let make = |mega: MegaStateDescriptor| RenderPipelineDescriptor {
        program: program.clone(),
        topology: PrimitiveTopology::Triangles,
        mega_state: mega,
        color_attachment_formats: vec![Format::U8RgbaNorm],
        depth_stencil_attachment_format: None,
        sample_count: 1,
        input_layout: None,
    };

    let a = make(MegaStateDescriptor::default());
    assert!(render_pipeline_descriptor_equals(&a, &make(MegaStateDescriptor::default())));

    // One megastate field apart.
    let partial = PartialMegaState {
        depth_compare: Some(CompareFunction::Greater),
        cull_mode: Some(CullMode::Back),
        ..Default::default()
    };
    let b = make(MegaStateDescriptor::from_partial(&partial));
    assert!(!render_pipeline_descriptor_equals(&a, &b));

    // Same state, different program.
    let other_program = StubProgram::new();
    let mut c = make(MegaStateDescriptor::default());
    c.program = other_program;
    assert!(!render_pipeline_descriptor_equals(&a, &c));
}
