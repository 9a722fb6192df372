// SPDX-License-Identifier: MIT OR Apache-2.0
//! Slot resolution and layout inference for binding descriptors.

mod common;

use common::{StubBuffer, StubRenderPipeline, StubSampler, StubTexture};
use mica::api::{
    infer_binding_layout, resolve_binding_slots, BindingsDescriptor, BufferBinding, PipelineRef,
    ResourceClass, SamplerBinding, SamplerFormatKind, StorageTextureBinding, TextureDimension,
    RESOURCE_CLASS_ORDER,
};

fn empty_descriptor() -> BindingsDescriptor {
    BindingsDescriptor {
        pipeline: PipelineRef::Render(StubRenderPipeline::new()),
        uniform_buffer_bindings: Vec::new(),
        sampler_bindings: Vec::new(),
        storage_buffer_bindings: Vec::new(),
        storage_texture_bindings: Vec::new(),
    }
}

fn uniform(binding: Option<u32>) -> BufferBinding {
    BufferBinding {
        binding,
        buffer: StubBuffer::new(),
        offset: 0,
        size: 0,
    }
}

fn sampler(binding: Option<u32>) -> SamplerBinding {
    SamplerBinding {
        binding,
        texture: Some(StubTexture::new()),
        sampler: Some(StubSampler::new()),
        dimension: TextureDimension::D2,
        format_kind: SamplerFormatKind::Float,
        comparison: false,
    }
}

#[test]
fn class_order_is_fixed() {
    // Bind-group indices follow the class, not declaration order; this
    // ordering is part of the public contract.
    assert_eq!(ResourceClass::UniformBuffers as usize, 0);
    assert_eq!(ResourceClass::Samplers as usize, 1);
    assert_eq!(ResourceClass::StorageBuffers as usize, 2);
    assert_eq!(ResourceClass::StorageTextures as usize, 3);
    assert_eq!(RESOURCE_CLASS_ORDER[0], ResourceClass::UniformBuffers);
    assert_eq!(RESOURCE_CLASS_ORDER[3], ResourceClass::StorageTextures);
}

#[test]
fn slots_auto_increment_within_each_class() {
    let mut descriptor = empty_descriptor();
    descriptor.uniform_buffer_bindings = vec![uniform(None), uniform(None), uniform(None)];
    descriptor.sampler_bindings = vec![sampler(None), sampler(None)];

    let resolved = resolve_binding_slots(&descriptor);
    assert_eq!(resolved.slots[0], vec![0, 1, 2]);
    // Each class counts from zero independently.
    assert_eq!(resolved.slots[1], vec![0, 1]);
}

#[test]
fn explicit_slots_win_over_the_counter() {
    let mut descriptor = empty_descriptor();
    descriptor.uniform_buffer_bindings =
        vec![uniform(Some(3)), uniform(None), uniform(Some(7)), uniform(None)];

    let resolved = resolve_binding_slots(&descriptor);
    // Explicit slots pass through untouched; the counter only advances for
    // auto-assigned entries.
    assert_eq!(resolved.slots[0], vec![3, 0, 7, 1]);
}

#[test]
fn trailing_empty_classes_are_truncated() {
    let mut descriptor = empty_descriptor();
    descriptor.uniform_buffer_bindings = vec![uniform(None)];

    let resolved = resolve_binding_slots(&descriptor);
    assert_eq!(resolved.last_group_index, Some(0));
}

#[test]
fn sparse_middle_classes_survive_truncation() {
    // Uniforms and storage textures, nothing in between: the empty middle
    // classes keep their group indices so the last class stays at index 3.
    let mut descriptor = empty_descriptor();
    descriptor.uniform_buffer_bindings = vec![uniform(None)];
    descriptor.storage_texture_bindings = vec![StorageTextureBinding {
        binding: None,
        texture: StubTexture::new(),
    }];

    let resolved = resolve_binding_slots(&descriptor);
    assert_eq!(resolved.last_group_index, Some(3));
    assert!(resolved.slots[1].is_empty());
    assert!(resolved.slots[2].is_empty());
    assert_eq!(resolved.slots[3], vec![0]);
}

#[test]
fn empty_descriptor_resolves_to_no_groups() {
    let descriptor = empty_descriptor();
    let resolved = resolve_binding_slots(&descriptor);
    assert_eq!(resolved.last_group_index, None);
    assert!(infer_binding_layout(&descriptor).is_empty());
}

#[test]
fn layout_inference_counts_per_class() {
    let mut descriptor = empty_descriptor();
    descriptor.uniform_buffer_bindings = vec![uniform(None), uniform(None)];
    descriptor.sampler_bindings = vec![sampler(None)];

    let tables = infer_binding_layout(&descriptor);
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].num_uniform_buffers, 2);
    assert_eq!(tables[0].num_samplers, 1);
    assert_eq!(tables[0].num_storage_buffers, 0);
    assert_eq!(tables[0].num_storage_textures, 0);
}
