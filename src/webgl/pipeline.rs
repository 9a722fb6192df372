// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pipelines on GL are plain descriptor holders.
//!
//! There is no native pipeline object; binding one replays the megastate and
//! program through the state cache. Compilation happened eagerly at program
//! creation, so readiness queries are trivially true.

use std::any::Any;
use std::rc::Rc;

use crate::api::descriptors::{InputLayoutDescriptor, RenderPipelineDescriptor};
use crate::api::device::{Error, SharedResourceRegistry};
use crate::api::megastate::MegaStateDescriptor;
use crate::api::resource::{alloc_resource_id, InputLayout, RenderPipeline, Resource, ResourceKind};
use crate::webgl::translate;

pub(super) struct WebGlInputLayout {
    id: u64,
    descriptor: InputLayoutDescriptor,
    /// `(gl type, byte size)` of one index, when the layout carries indices.
    index_format: Option<(u32, u64)>,
    registry: SharedResourceRegistry,
}

impl WebGlInputLayout {
    pub(super) fn new(
        registry: SharedResourceRegistry,
        descriptor: InputLayoutDescriptor,
    ) -> Result<Rc<WebGlInputLayout>, Error> {
        // Audit the attribute formats up front so a bad layout fails at
        // creation, not mid-pass.
        for buffer in &descriptor.vertex_buffer_descriptors {
            for attribute in &buffer.attributes {
                let _ = translate::vertex_attribute(attribute.format);
            }
        }
        let index_format = descriptor.index_buffer_format.map(translate::index_type);
        let id = alloc_resource_id();
        registry
            .borrow_mut()
            .register(id, ResourceKind::InputLayout, None);
        Ok(Rc::new(WebGlInputLayout {
            id,
            descriptor,
            index_format,
            registry,
        }))
    }

    pub(super) fn descriptor(&self) -> &InputLayoutDescriptor {
        &self.descriptor
    }

    pub(super) fn index_format(&self) -> Option<(u32, u64)> {
        self.index_format
    }
}

impl Resource for WebGlInputLayout {
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

impl InputLayout for WebGlInputLayout {}

pub(super) struct WebGlRenderPipeline {
    id: u64,
    descriptor: RenderPipelineDescriptor,
    /// Megastate resized to the pipeline's attachment count.
    mega: MegaStateDescriptor,
    topology: u32,
    registry: SharedResourceRegistry,
}

impl WebGlRenderPipeline {
    pub(super) fn new(
        registry: SharedResourceRegistry,
        descriptor: RenderPipelineDescriptor,
    ) -> Result<Rc<WebGlRenderPipeline>, Error> {
        let mega = descriptor
            .mega_state
            .resized_attachments(descriptor.color_attachment_formats.len().max(1));
        let topology = translate::primitive_topology(descriptor.topology);
        let id = alloc_resource_id();
        registry
            .borrow_mut()
            .register(id, ResourceKind::RenderPipeline, None);
        Ok(Rc::new(WebGlRenderPipeline {
            id,
            descriptor,
            mega,
            topology,
            registry,
        }))
    }

    pub(super) fn descriptor(&self) -> &RenderPipelineDescriptor {
        &self.descriptor
    }

    pub(super) fn mega(&self) -> &MegaStateDescriptor {
        &self.mega
    }

    pub(super) fn topology(&self) -> u32 {
        self.topology
    }
}

impl Resource for WebGlRenderPipeline {
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

impl RenderPipeline for WebGlRenderPipeline {}
