// SPDX-License-Identifier: MIT OR Apache-2.0
//! Bind-group construction.
//!
//! Bind-group indices are assigned by resource class in the fixed order
//! {uniform buffers, samplers, storage buffers, storage textures}; shaders
//! must declare their `@group` indices accordingly. Within the sampler class,
//! a binding at slot `n` occupies `@binding(2n)` for the texture and
//! `@binding(2n + 1)` for the sampler. Trailing empty classes produce no bind
//! group at all; empty classes *before* the last non-empty one get an empty
//! bind group so group indices stay aligned with the pipeline layout.
//!
//! Layouts are built explicitly rather than auto-derived from the shader:
//! every uniform-buffer entry is declared with a dynamic offset so
//! `set_bindings` offsets work, which an auto layout never grants. The
//! derived pipeline layout is handed to the (lazily compiled) pipeline here,
//! so bindings must be created before the pipeline is first bound.

use std::any::Any;
use std::num::NonZeroU64;
use std::rc::Rc;

use crate::api::descriptors::{
    resolve_binding_slots, BindingsDescriptor, PipelineRef, ResolvedBindingSlots,
};
use crate::api::device::{Error, SharedResourceRegistry};
use crate::api::format::SamplerFormatKind;
use crate::api::resource::{alloc_resource_id, Bindings, Resource, ResourceKind, Texture};
use crate::webgpu::buffer::WebGpuBuffer;
use crate::webgpu::device::{Fallbacks, Gpu};
use crate::webgpu::pipeline::{WebGpuComputePipeline, WebGpuRenderPipeline};
use crate::webgpu::sampler::WebGpuSampler;
use crate::webgpu::texture::WebGpuTexture;
use crate::webgpu::translate;

/// Owned handle per entry; wgpu handles are cheap reference clones, and
/// owning them here sidesteps borrowing fallback resources out of caches.
enum Entry {
    Buffer {
        buffer: wgpu::Buffer,
        offset: u64,
        size: Option<NonZeroU64>,
    },
    View(wgpu::TextureView),
    Sampler(wgpu::Sampler),
}

pub(super) struct WebGpuBindings {
    id: u64,
    /// One bind group per class index, up to the last non-empty class.
    groups: Vec<wgpu::BindGroup>,
    /// Number of dynamic-offset entries in group 0; `set_bind_group` demands
    /// exactly this many offsets.
    dynamic_offset_count: usize,
    /// Retains the bound resources for the bindings' lifetime.
    #[allow(dead_code)]
    descriptor: BindingsDescriptor,
    registry: SharedResourceRegistry,
}

impl WebGpuBindings {
    pub(super) fn new(
        gpu: &Gpu,
        registry: SharedResourceRegistry,
        fallbacks: &Fallbacks,
        descriptor: BindingsDescriptor,
    ) -> Result<Rc<WebGpuBindings>, Error> {
        let resolved = resolve_binding_slots(&descriptor);
        let groups = match resolved.last_group_index {
            None => Vec::new(),
            Some(last) => {
                let group_layouts = group_layouts(gpu, &descriptor, &resolved, last);
                let layout_refs: Vec<&wgpu::BindGroupLayout> = group_layouts.iter().collect();
                let pipeline_layout =
                    gpu.device
                        .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                            label: None,
                            bind_group_layouts: &layout_refs,
                            push_constant_ranges: &[],
                        });
                compile_pipeline(gpu, &descriptor.pipeline, &pipeline_layout);
                (0..=last)
                    .map(|group| {
                        let entries = class_entries(gpu, fallbacks, &descriptor, &resolved, group);
                        let wgpu_entries: Vec<wgpu::BindGroupEntry> = entries
                            .iter()
                            .map(|(binding, entry)| wgpu::BindGroupEntry {
                                binding: *binding,
                                resource: match entry {
                                    Entry::Buffer {
                                        buffer,
                                        offset,
                                        size,
                                    } => wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                                        buffer,
                                        offset: *offset,
                                        size: *size,
                                    }),
                                    Entry::View(view) => wgpu::BindingResource::TextureView(view),
                                    Entry::Sampler(sampler) => {
                                        wgpu::BindingResource::Sampler(sampler)
                                    }
                                },
                            })
                            .collect();
                        gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
                            label: None,
                            layout: &group_layouts[group],
                            entries: &wgpu_entries,
                        })
                    })
                    .collect()
            }
        };
        let id = alloc_resource_id();
        registry
            .borrow_mut()
            .register(id, ResourceKind::Bindings, None);
        Ok(Rc::new(WebGpuBindings {
            id,
            groups,
            dynamic_offset_count: descriptor.uniform_buffer_bindings.len(),
            descriptor,
            registry,
        }))
    }

    pub(super) fn groups(&self) -> &[wgpu::BindGroup] {
        &self.groups
    }

    /// Pads the caller's dynamic offsets to the count the uniform-buffer
    /// group's layout declares; missing trailing offsets mean zero.
    pub(super) fn padded_dynamic_offsets(&self, dynamic_byte_offsets: &[u32]) -> Vec<u32> {
        assert!(
            dynamic_byte_offsets.len() <= self.dynamic_offset_count,
            "{} dynamic offsets for {} uniform-buffer bindings",
            dynamic_byte_offsets.len(),
            self.dynamic_offset_count
        );
        let mut offsets = dynamic_byte_offsets.to_vec();
        offsets.resize(self.dynamic_offset_count, 0);
        offsets
    }
}

/// Compiles the pipeline with the layout derived from the bindings, making
/// the bind groups created here compatible with it.
fn compile_pipeline(gpu: &Gpu, pipeline: &PipelineRef, layout: &wgpu::PipelineLayout) {
    match pipeline {
        PipelineRef::Render(pipeline) => {
            pipeline
                .as_any()
                .downcast_ref::<WebGpuRenderPipeline>()
                .expect("pipeline from another backend")
                .ensure_compiled_with(gpu, Some(layout));
        }
        PipelineRef::Compute(pipeline) => {
            pipeline
                .as_any()
                .downcast_ref::<WebGpuComputePipeline>()
                .expect("pipeline from another backend")
                .ensure_compiled_with(gpu, Some(layout));
        }
    }
}

/// Builds one explicit layout per bind group, including empty layouts for
/// gap classes before the last non-empty one.
fn group_layouts(
    gpu: &Gpu,
    descriptor: &BindingsDescriptor,
    resolved: &ResolvedBindingSlots,
    last: usize,
) -> Vec<wgpu::BindGroupLayout> {
    let render = matches!(descriptor.pipeline, PipelineRef::Render(_));
    let visibility = if render {
        wgpu::ShaderStages::VERTEX_FRAGMENT
    } else {
        wgpu::ShaderStages::COMPUTE
    };
    // Writable storage in the vertex stage is gated behind a native-only
    // feature, so storage classes stay fragment-only on render pipelines.
    let storage_visibility = if render {
        wgpu::ShaderStages::FRAGMENT
    } else {
        wgpu::ShaderStages::COMPUTE
    };
    (0..=last)
        .map(|class| {
            let slots = &resolved.slots[class];
            let entries: Vec<wgpu::BindGroupLayoutEntry> = match class {
                0 => slots
                    .iter()
                    .map(|&slot| wgpu::BindGroupLayoutEntry {
                        binding: slot,
                        visibility,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: true,
                            min_binding_size: None,
                        },
                        count: None,
                    })
                    .collect(),
                1 => descriptor
                    .sampler_bindings
                    .iter()
                    .zip(slots)
                    .flat_map(|(binding, &slot)| {
                        let sample_type = match binding.format_kind {
                            SamplerFormatKind::Float => {
                                wgpu::TextureSampleType::Float { filterable: true }
                            }
                            SamplerFormatKind::Uint => wgpu::TextureSampleType::Uint,
                            SamplerFormatKind::Sint => wgpu::TextureSampleType::Sint,
                            SamplerFormatKind::Depth => wgpu::TextureSampleType::Depth,
                        };
                        let sampler_type = if binding.comparison {
                            wgpu::SamplerBindingType::Comparison
                        } else if binding.format_kind == SamplerFormatKind::Float {
                            wgpu::SamplerBindingType::Filtering
                        } else {
                            wgpu::SamplerBindingType::NonFiltering
                        };
                        [
                            wgpu::BindGroupLayoutEntry {
                                binding: 2 * slot,
                                visibility,
                                ty: wgpu::BindingType::Texture {
                                    sample_type,
                                    view_dimension: translate::texture_view_dimension(
                                        binding.dimension,
                                    ),
                                    multisampled: false,
                                },
                                count: None,
                            },
                            wgpu::BindGroupLayoutEntry {
                                binding: 2 * slot + 1,
                                visibility,
                                ty: wgpu::BindingType::Sampler(sampler_type),
                                count: None,
                            },
                        ]
                    })
                    .collect(),
                2 => slots
                    .iter()
                    .map(|&slot| wgpu::BindGroupLayoutEntry {
                        binding: slot,
                        visibility: storage_visibility,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Storage { read_only: false },
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    })
                    .collect(),
                3 => descriptor
                    .storage_texture_bindings
                    .iter()
                    .zip(slots)
                    .map(|(binding, &slot)| wgpu::BindGroupLayoutEntry {
                        binding: slot,
                        visibility: storage_visibility,
                        ty: wgpu::BindingType::StorageTexture {
                            access: wgpu::StorageTextureAccess::WriteOnly,
                            format: translate::texture_format(binding.texture.format()),
                            view_dimension: translate::texture_view_dimension(
                                binding.texture.dimension(),
                            ),
                        },
                        count: None,
                    })
                    .collect(),
                _ => unreachable!(),
            };
            gpu.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: None,
                    entries: &entries,
                })
        })
        .collect()
}

fn class_entries(
    gpu: &Gpu,
    fallbacks: &Fallbacks,
    descriptor: &BindingsDescriptor,
    resolved: &ResolvedBindingSlots,
    class: usize,
) -> Vec<(u32, Entry)> {
    let slots = &resolved.slots[class];
    match class {
        0 => buffer_entries(&descriptor.uniform_buffer_bindings, slots),
        1 => descriptor
            .sampler_bindings
            .iter()
            .zip(slots)
            .flat_map(|(binding, &slot)| {
                let view = match &binding.texture {
                    Some(texture) => texture
                        .as_any()
                        .downcast_ref::<WebGpuTexture>()
                        .expect("texture from another backend")
                        .view()
                        .clone(),
                    None => fallbacks.view(gpu, binding.dimension, binding.format_kind),
                };
                let sampler = match &binding.sampler {
                    Some(sampler) => sampler
                        .as_any()
                        .downcast_ref::<WebGpuSampler>()
                        .expect("sampler from another backend")
                        .raw()
                        .clone(),
                    None => fallbacks.sampler(gpu, binding.comparison),
                };
                [
                    (2 * slot, Entry::View(view)),
                    (2 * slot + 1, Entry::Sampler(sampler)),
                ]
            })
            .collect(),
        2 => buffer_entries(&descriptor.storage_buffer_bindings, slots),
        3 => descriptor
            .storage_texture_bindings
            .iter()
            .zip(slots)
            .map(|(binding, &slot)| {
                let view = binding
                    .texture
                    .as_any()
                    .downcast_ref::<WebGpuTexture>()
                    .expect("texture from another backend")
                    .view()
                    .clone();
                (slot, Entry::View(view))
            })
            .collect(),
        _ => unreachable!(),
    }
}

fn buffer_entries(
    bindings: &[crate::api::descriptors::BufferBinding],
    slots: &[u32],
) -> Vec<(u32, Entry)> {
    bindings
        .iter()
        .zip(slots)
        .map(|(binding, &slot)| {
            let buffer = binding
                .buffer
                .as_any()
                .downcast_ref::<WebGpuBuffer>()
                .expect("buffer from another backend");
            (
                slot,
                Entry::Buffer {
                    buffer: buffer.raw().clone(),
                    offset: binding.offset,
                    size: NonZeroU64::new(binding.size),
                },
            )
        })
        .collect()
}

impl Resource for WebGpuBindings {
    fn id(&self) -> u64 {
        self.id
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::Bindings
    }

    fn debug_name(&self) -> Option<String> {
        None
    }

    fn destroy(&self) {
        self.registry.borrow_mut().unregister(self.id);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Bindings for WebGpuBindings {}
