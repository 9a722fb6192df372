// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pipeline objects.
//!
//! Pipelines compile lazily: creation only snapshots the descriptor, and the
//! native object is built on first bind or on an explicit ready-query/force.
//! The pipeline layout comes from the first bindings object created against
//! the pipeline, which is why bindings creation forces compilation; a
//! pipeline that never gets bindings compiles with an auto layout instead.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use crate::api::descriptors::{
    ComputePipelineDescriptor, InputLayoutDescriptor, PrimitiveTopology, RenderPipelineDescriptor,
};
use crate::api::device::{Error, SharedResourceRegistry};
use crate::api::resource::{
    alloc_resource_id, ComputePipeline, InputLayout, RenderPipeline, Resource, ResourceKind,
};
use crate::webgpu::device::Gpu;
use crate::webgpu::program::WebGpuProgram;
use crate::webgpu::translate;

pub(super) struct WebGpuInputLayout {
    id: u64,
    pub(super) descriptor: InputLayoutDescriptor,
    pub(super) index_format: Option<wgpu::IndexFormat>,
    registry: SharedResourceRegistry,
}

impl WebGpuInputLayout {
    pub(super) fn new(
        registry: SharedResourceRegistry,
        descriptor: InputLayoutDescriptor,
    ) -> Result<Rc<WebGpuInputLayout>, Error> {
        let index_format = descriptor.index_buffer_format.map(translate::index_format);
        let id = alloc_resource_id();
        registry
            .borrow_mut()
            .register(id, ResourceKind::InputLayout, None);
        Ok(Rc::new(WebGpuInputLayout {
            id,
            descriptor,
            index_format,
            registry,
        }))
    }
}

impl Resource for WebGpuInputLayout {
    fn id(&self) -> u64 {
        self.id
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::InputLayout
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

impl InputLayout for WebGpuInputLayout {}

pub(super) struct WebGpuRenderPipeline {
    id: u64,
    descriptor: RenderPipelineDescriptor,
    compiled: RefCell<Option<wgpu::RenderPipeline>>,
    registry: SharedResourceRegistry,
}

impl WebGpuRenderPipeline {
    pub(super) fn new(
        registry: SharedResourceRegistry,
        descriptor: RenderPipelineDescriptor,
    ) -> Result<Rc<WebGpuRenderPipeline>, Error> {
        let id = alloc_resource_id();
        registry
            .borrow_mut()
            .register(id, ResourceKind::RenderPipeline, None);
        Ok(Rc::new(WebGpuRenderPipeline {
            id,
            descriptor,
            compiled: RefCell::new(None),
            registry,
        }))
    }

    pub(super) fn is_compiled(&self) -> bool {
        self.compiled.borrow().is_some()
    }

    /// Compiles on first demand. Native compilation is synchronous, so after
    /// this returns the pipeline is always ready.
    pub(super) fn ensure_compiled(&self, gpu: &Gpu) -> wgpu::RenderPipeline {
        self.ensure_compiled_with(gpu, None)
    }

    /// Compiles with an explicit pipeline layout, normally the one derived
    /// from the bindings created against this pipeline. A later call cannot
    /// change the layout of an already-compiled pipeline.
    pub(super) fn ensure_compiled_with(
        &self,
        gpu: &Gpu,
        layout: Option<&wgpu::PipelineLayout>,
    ) -> wgpu::RenderPipeline {
        if let Some(pipeline) = self.compiled.borrow().as_ref() {
            return pipeline.clone();
        }
        let pipeline = self.compile(gpu, layout);
        *self.compiled.borrow_mut() = Some(pipeline.clone());
        pipeline
    }

    fn compile(&self, gpu: &Gpu, layout: Option<&wgpu::PipelineLayout>) -> wgpu::RenderPipeline {
        let descriptor = &self.descriptor;
        let program = descriptor
            .program
            .as_any()
            .downcast_ref::<WebGpuProgram>()
            .expect("program from another backend");

        let mega = descriptor
            .mega_state
            .resized_attachments(descriptor.color_attachment_formats.len());

        let targets: Vec<Option<wgpu::ColorTargetState>> = descriptor
            .color_attachment_formats
            .iter()
            .zip(&mega.attachments_state)
            .map(|(&format, attachment)| {
                Some(wgpu::ColorTargetState {
                    format: translate::texture_format(format),
                    blend: translate::blend_state(attachment),
                    write_mask: translate::color_writes(attachment.channel_write_mask),
                })
            })
            .collect();

        // Vertex buffer layouts need owned attribute arrays to borrow from.
        let attribute_arrays: Vec<Vec<wgpu::VertexAttribute>>;
        let mut vertex_buffers: Vec<wgpu::VertexBufferLayout> = Vec::new();
        let mut index_format = None;
        if let Some(input_layout) = &descriptor.input_layout {
            let input_layout = input_layout
                .as_any()
                .downcast_ref::<WebGpuInputLayout>()
                .expect("input layout from another backend");
            index_format = input_layout.index_format;
            attribute_arrays = input_layout
                .descriptor
                .vertex_buffer_descriptors
                .iter()
                .map(|buffer| {
                    buffer
                        .attributes
                        .iter()
                        .map(|attribute| wgpu::VertexAttribute {
                            format: translate::vertex_format(attribute.format),
                            offset: attribute.offset,
                            shader_location: attribute.shader_location,
                        })
                        .collect()
                })
                .collect();
            for (buffer, attributes) in input_layout
                .descriptor
                .vertex_buffer_descriptors
                .iter()
                .zip(&attribute_arrays)
            {
                vertex_buffers.push(wgpu::VertexBufferLayout {
                    array_stride: buffer.array_stride,
                    step_mode: match buffer.step_mode {
                        crate::api::descriptors::VertexStepMode::Vertex => {
                            wgpu::VertexStepMode::Vertex
                        }
                        crate::api::descriptors::VertexStepMode::Instance => {
                            wgpu::VertexStepMode::Instance
                        }
                    },
                    attributes,
                });
            }
        }

        let is_strip = matches!(
            descriptor.topology,
            PrimitiveTopology::LineStrip | PrimitiveTopology::TriangleStrip
        );

        let vertex_stage = program.vertex.as_ref().expect("render program lacks a vertex stage");

        gpu.device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: None,
                layout,
                vertex: wgpu::VertexState {
                    module: &vertex_stage.module,
                    entry_point: vertex_stage.entry_point.as_deref(),
                    compilation_options: Default::default(),
                    buffers: &vertex_buffers,
                },
                fragment: program.fragment.as_ref().map(|stage| wgpu::FragmentState {
                    module: &stage.module,
                    entry_point: stage.entry_point.as_deref(),
                    compilation_options: Default::default(),
                    targets: &targets,
                }),
                primitive: wgpu::PrimitiveState {
                    topology: translate::primitive_topology(descriptor.topology),
                    strip_index_format: if is_strip { index_format } else { None },
                    front_face: translate::front_face(mega.front_face),
                    cull_mode: translate::cull_mode(mega.cull_mode),
                    unclipped_depth: false,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    conservative: false,
                },
                depth_stencil: descriptor
                    .depth_stencil_attachment_format
                    .map(|format| translate::depth_stencil_state(&mega, format)),
                multisample: wgpu::MultisampleState {
                    count: descriptor.sample_count,
                    mask: !0,
                    alpha_to_coverage_enabled: false,
                },
                multiview: None,
                cache: None,
            })
    }
}

impl Resource for WebGpuRenderPipeline {
    fn id(&self) -> u64 {
        self.id
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::RenderPipeline
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

impl RenderPipeline for WebGpuRenderPipeline {}

pub(super) struct WebGpuComputePipeline {
    id: u64,
    descriptor: ComputePipelineDescriptor,
    compiled: RefCell<Option<wgpu::ComputePipeline>>,
    registry: SharedResourceRegistry,
}

impl WebGpuComputePipeline {
    pub(super) fn new(
        registry: SharedResourceRegistry,
        descriptor: ComputePipelineDescriptor,
    ) -> Result<Rc<WebGpuComputePipeline>, Error> {
        let program = descriptor
            .program
            .as_any()
            .downcast_ref::<WebGpuProgram>()
            .expect("program from another backend");
        assert!(
            program.compute.is_some(),
            "compute pipeline needs a compute stage"
        );
        let id = alloc_resource_id();
        registry
            .borrow_mut()
            .register(id, ResourceKind::ComputePipeline, None);
        Ok(Rc::new(WebGpuComputePipeline {
            id,
            descriptor,
            compiled: RefCell::new(None),
            registry,
        }))
    }

    pub(super) fn ensure_compiled(&self, gpu: &Gpu) -> wgpu::ComputePipeline {
        self.ensure_compiled_with(gpu, None)
    }

    pub(super) fn ensure_compiled_with(
        &self,
        gpu: &Gpu,
        layout: Option<&wgpu::PipelineLayout>,
    ) -> wgpu::ComputePipeline {
        if let Some(pipeline) = self.compiled.borrow().as_ref() {
            return pipeline.clone();
        }
        let program = self
            .descriptor
            .program
            .as_any()
            .downcast_ref::<WebGpuProgram>()
            .expect("program from another backend");
        let stage = program
            .compute
            .as_ref()
            .expect("compute pipeline needs a compute stage");
        let pipeline = gpu
            .device
            .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: None,
                layout,
                module: &stage.module,
                entry_point: stage.entry_point.as_deref(),
                compilation_options: Default::default(),
                cache: None,
            });
        *self.compiled.borrow_mut() = Some(pipeline.clone());
        pipeline
    }
}

impl Resource for WebGpuComputePipeline {
    fn id(&self) -> u64 {
        self.id
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::ComputePipeline
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

impl ComputePipeline for WebGpuComputePipeline {}
