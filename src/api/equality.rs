// SPDX-License-Identifier: MIT OR Apache-2.0
//! Structural equality and copy helpers for composite descriptors.
//!
//! Pipeline and bindings caches need to know whether a caller-supplied
//! descriptor describes the same object as a cached one. Equality here is
//! structural: arrays compare element-wise with the most specific
//! per-element comparator, and resource references compare by identity
//! (resource id), because resources are externally owned.
//!
//! Copies are the mirror image: mutable composite fields (attachment-state
//! arrays, stencil faces, blend constants) are duplicated, resource handles
//! are identity-copied (`Rc` clone).

use std::rc::Rc;

use crate::api::descriptors::{
    BindingsDescriptor, BufferBinding, InputLayoutDescriptor, PipelineRef,
    RenderPipelineDescriptor, SamplerBinding, SamplerDescriptor, StorageTextureBinding,
};
use crate::api::megastate::MegaStateDescriptor;
use crate::api::resource::Resource;

fn resource_eq(a: &dyn Resource, b: &dyn Resource) -> bool {
    a.id() == b.id()
}

fn opt_resource_eq<T: Resource + ?Sized>(a: &Option<Rc<T>>, b: &Option<Rc<T>>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.id() == b.id(),
        _ => false,
    }
}

/// Buffer identity plus the bound range and slot, not just identity.
pub fn buffer_binding_equals(a: &BufferBinding, b: &BufferBinding) -> bool {
    a.binding == b.binding
        && resource_eq(a.buffer.as_ref(), b.buffer.as_ref())
        && a.offset == b.offset
        && a.size == b.size
}

pub fn sampler_binding_equals(a: &SamplerBinding, b: &SamplerBinding) -> bool {
    a.binding == b.binding
        && opt_resource_eq(&a.texture, &b.texture)
        && opt_resource_eq(&a.sampler, &b.sampler)
        && a.dimension == b.dimension
        && a.format_kind == b.format_kind
        && a.comparison == b.comparison
}

pub fn storage_texture_binding_equals(a: &StorageTextureBinding, b: &StorageTextureBinding) -> bool {
    a.binding == b.binding && resource_eq(a.texture.as_ref(), b.texture.as_ref())
}

fn pipeline_ref_equals(a: &PipelineRef, b: &PipelineRef) -> bool {
    match (a, b) {
        (PipelineRef::Render(a), PipelineRef::Render(b)) => a.id() == b.id(),
        (PipelineRef::Compute(a), PipelineRef::Compute(b)) => a.id() == b.id(),
        _ => false,
    }
}

fn slice_equals<T>(a: &[T], b: &[T], eq: impl Fn(&T, &T) -> bool) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(a, b)| eq(a, b))
}

/// Structural equality over every binding list. Used to decide whether
/// cached bindings can be reused or must be rebuilt.
pub fn bindings_descriptor_equals(a: &BindingsDescriptor, b: &BindingsDescriptor) -> bool {
    pipeline_ref_equals(&a.pipeline, &b.pipeline)
        && slice_equals(
            &a.uniform_buffer_bindings,
            &b.uniform_buffer_bindings,
            buffer_binding_equals,
        )
        && slice_equals(&a.sampler_bindings, &b.sampler_bindings, sampler_binding_equals)
        && slice_equals(
            &a.storage_buffer_bindings,
            &b.storage_buffer_bindings,
            buffer_binding_equals,
        )
        && slice_equals(
            &a.storage_texture_bindings,
            &b.storage_texture_bindings,
            storage_texture_binding_equals,
        )
}

pub fn sampler_descriptor_equals(a: &SamplerDescriptor, b: &SamplerDescriptor) -> bool {
    a == b
}

pub fn mega_state_descriptor_equals(a: &MegaStateDescriptor, b: &MegaStateDescriptor) -> bool {
    a == b
}

pub fn input_layout_descriptor_equals(a: &InputLayoutDescriptor, b: &InputLayoutDescriptor) -> bool {
    resource_eq(a.program.as_ref(), b.program.as_ref())
        && a.index_buffer_format == b.index_buffer_format
        && slice_equals(
            &a.vertex_buffer_descriptors,
            &b.vertex_buffer_descriptors,
            |a, b| a == b,
        )
}

pub fn render_pipeline_descriptor_equals(
    a: &RenderPipelineDescriptor,
    b: &RenderPipelineDescriptor,
) -> bool {
    resource_eq(a.program.as_ref(), b.program.as_ref())
        && a.topology == b.topology
        && mega_state_descriptor_equals(&a.mega_state, &b.mega_state)
        && a.color_attachment_formats == b.color_attachment_formats
        && a.depth_stencil_attachment_format == b.depth_stencil_attachment_format
        && a.sample_count == b.sample_count
        && opt_resource_eq(&a.input_layout, &b.input_layout)
}

/// Deep-copies the mutable composite fields, identity-copies resources.
pub fn copy_bindings_descriptor(descriptor: &BindingsDescriptor) -> BindingsDescriptor {
    descriptor.clone()
}

pub fn copy_render_pipeline_descriptor(
    descriptor: &RenderPipelineDescriptor,
) -> RenderPipelineDescriptor {
    descriptor.clone()
}

pub fn copy_mega_state_descriptor(descriptor: &MegaStateDescriptor) -> MegaStateDescriptor {
    descriptor.clone()
}

pub fn copy_input_layout_descriptor(descriptor: &InputLayoutDescriptor) -> InputLayoutDescriptor {
    descriptor.clone()
}
