// SPDX-License-Identifier: MIT OR Apache-2.0
//! Render pass recording.
//!
//! GL has no command buffers: recording *is* execution, so every pass method
//! issues native calls immediately and `submit_pass` only finalizes (resolve
//! blits, balance checks) and recycles the pass object. Bundles are replayed
//! command lists rather than native objects; replay costs the same as
//! recording, which is exactly what the native platform offers.

use std::any::Any;
use std::rc::Rc;

use glow::HasContext;

use crate::api::depth::reverse_depth_for_clear_value;
use crate::api::descriptors::{
    BufferSlice, Color, ColorAttachment, RenderPassDescriptor, VertexStepMode,
};
use crate::api::pass::{Pass, RenderBundle, RenderPass};
use crate::api::resource::{
    Bindings, Buffer, InputLayout, QueryPool, RenderPipeline, RenderTarget, Texture,
};
use crate::api::whoops;
use crate::webgl::bindings::WebGlBindings;
use crate::webgl::buffer::WebGlBuffer;
use crate::webgl::caps::GlProfile;
use crate::webgl::device::Ctx;
use crate::webgl::pipeline::{WebGlInputLayout, WebGlRenderPipeline};
use crate::webgl::program::WebGlProgram;
use crate::webgl::query::WebGlQueryPool;
use crate::webgl::render_target::WebGlRenderTarget;
use crate::webgl::sampler::{resolve_texture_parameters, WebGlSampler};
use crate::webgl::state::StateCache;
use crate::webgl::texture::WebGlTexture;

enum BundleCommand {
    SetPipeline(Rc<dyn RenderPipeline>),
    SetBindings(Rc<dyn Bindings>, Vec<u32>),
    SetVertexInput {
        input_layout: Option<Rc<dyn InputLayout>>,
        vertex_buffers: Vec<BufferSlice>,
        index_buffer: Option<BufferSlice>,
    },
    Draw {
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    },
    DrawIndexed {
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        base_vertex: i32,
        first_instance: u32,
    },
    PushDebugGroup(String),
    PopDebugGroup,
    InsertDebugMarker(String),
}

pub(super) struct WebGlRenderBundle {
    commands: Vec<BundleCommand>,
}

impl RenderBundle for WebGlRenderBundle {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Bound index-buffer state, captured at `set_vertex_input`.
struct IndexState {
    base_offset: u64,
    gl_type: u32,
    byte_size: u64,
}

#[derive(Default)]
pub(super) struct WebGlRenderPass {
    ctx: Option<Rc<Ctx>>,
    state: Option<Rc<std::cell::RefCell<StateCache>>>,
    /// Created once per pooled pass object and reused every recording.
    framebuffer: Option<glow::Framebuffer>,
    resolve_framebuffer: Option<glow::Framebuffer>,
    color_attachments: Vec<ColorAttachment>,
    occlusion_query_pool: Option<Rc<dyn QueryPool>>,
    default_framebuffer: bool,
    pipeline: Option<Rc<dyn RenderPipeline>>,
    index_state: Option<IndexState>,
    instanced_layout: bool,
    bundling: bool,
    bundle_commands: Vec<BundleCommand>,
    debug_group_depth: u32,
    query_active: bool,
    pub(super) generation: u64,
}

impl WebGlRenderPass {
    fn ctx(&self) -> &Rc<Ctx> {
        self.ctx.as_ref().expect("pass not begun")
    }

    fn with_state<R>(&self, f: impl FnOnce(&glow::Context, &mut StateCache) -> R) -> R {
        let ctx = self.ctx.as_ref().expect("pass not begun");
        let state = self.state.as_ref().expect("pass not begun");
        f(&ctx.gl, &mut state.borrow_mut())
    }

    pub(super) fn begin(
        &mut self,
        ctx: Rc<Ctx>,
        state: Rc<std::cell::RefCell<StateCache>>,
        descriptor: &RenderPassDescriptor,
        generation: u64,
    ) {
        self.color_attachments = descriptor.color_attachments.clone();
        self.occlusion_query_pool = descriptor.occlusion_query_pool.clone();
        self.pipeline = None;
        self.index_state = None;
        self.instanced_layout = false;
        self.bundling = false;
        self.bundle_commands.clear();
        self.debug_group_depth = 0;
        self.query_active = false;
        self.generation = generation;

        self.default_framebuffer = descriptor.color_attachments.first().is_some_and(|a| {
            a.render_target
                .texture()
                .and_then(|t| {
                    t.as_any()
                        .downcast_ref::<WebGlTexture>()
                        .map(|t| t.raw().is_none())
                })
                .unwrap_or(false)
        });

        let gl = &ctx.gl;
        if self.default_framebuffer {
            assert_eq!(
                descriptor.color_attachments.len(),
                1,
                "the default framebuffer cannot take extra color attachments"
            );
            unsafe { gl.bind_framebuffer(glow::FRAMEBUFFER, None) };
        } else {
            if self.framebuffer.is_none() {
                self.framebuffer =
                    Some(unsafe { gl.create_framebuffer() }.expect("framebuffer creation failed"));
            }
            unsafe { gl.bind_framebuffer(glow::FRAMEBUFFER, self.framebuffer) };
            let mut draw_buffers = Vec::new();
            for (i, attachment) in descriptor.color_attachments.iter().enumerate() {
                let target = attachment
                    .render_target
                    .as_any()
                    .downcast_ref::<WebGlRenderTarget>()
                    .expect("render target from another backend");
                target.attach(glow::COLOR_ATTACHMENT0 + i as u32);
                draw_buffers.push(glow::COLOR_ATTACHMENT0 + i as u32);
            }
            if let Some(depth) = &descriptor.depth_stencil_attachment {
                let target = depth
                    .render_target
                    .as_any()
                    .downcast_ref::<WebGlRenderTarget>()
                    .expect("render target from another backend");
                let point = if target.format().has_stencil() {
                    glow::DEPTH_STENCIL_ATTACHMENT
                } else {
                    glow::DEPTH_ATTACHMENT
                };
                target.attach(point);
            }
            if ctx.caps.profile == GlProfile::WebGl2 && draw_buffers.len() > 1 {
                unsafe { gl.draw_buffers(&draw_buffers) };
            }
        }

        // Clears ignore the megastate but obey GL write masks and scissor;
        // reset those, then invalidate so the next pipeline bind replays all.
        unsafe {
            gl.disable(glow::SCISSOR_TEST);
            gl.color_mask(true, true, true, true);
            gl.depth_mask(true);
            gl.stencil_mask(0xFF);
        }
        match ctx.caps.profile {
            GlProfile::WebGl2 => unsafe {
                for (i, attachment) in descriptor.color_attachments.iter().enumerate() {
                    if let Some(c) = attachment.clear_color {
                        gl.clear_buffer_f32_slice(
                            glow::COLOR,
                            i as u32,
                            &[c.r, c.g, c.b, c.a],
                        );
                    }
                }
                if let Some(depth) = &descriptor.depth_stencil_attachment {
                    // The one depth-reversal point for clear values on this
                    // backend.
                    let depth_value = depth.clear_depth.map(reverse_depth_for_clear_value);
                    match (depth_value, depth.clear_stencil) {
                        (Some(d), Some(s)) => {
                            gl.clear_buffer_depth_stencil(glow::DEPTH_STENCIL, 0, d, s as i32)
                        }
                        (Some(d), None) => gl.clear_buffer_f32_slice(glow::DEPTH, 0, &[d]),
                        (None, Some(s)) => {
                            gl.clear_buffer_i32_slice(glow::STENCIL, 0, &[s as i32])
                        }
                        (None, None) => {}
                    }
                }
            },
            GlProfile::WebGl1 => unsafe {
                let mut bits = 0;
                if let Some(c) = descriptor
                    .color_attachments
                    .first()
                    .and_then(|a| a.clear_color)
                {
                    gl.clear_color(c.r, c.g, c.b, c.a);
                    bits |= glow::COLOR_BUFFER_BIT;
                }
                if let Some(depth) = &descriptor.depth_stencil_attachment {
                    if let Some(d) = depth.clear_depth {
                        gl.clear_depth_f32(reverse_depth_for_clear_value(d));
                        bits |= glow::DEPTH_BUFFER_BIT;
                    }
                    if let Some(s) = depth.clear_stencil {
                        gl.clear_stencil(s as i32);
                        bits |= glow::STENCIL_BUFFER_BIT;
                    }
                }
                if bits != 0 {
                    gl.clear(bits);
                }
            },
        }

        if let Some(attachment) = descriptor.color_attachments.first() {
            let target = &attachment.render_target;
            unsafe { gl.viewport(0, 0, target.width() as i32, target.height() as i32) };
        } else if let Some(depth) = &descriptor.depth_stencil_attachment {
            let target = &depth.render_target;
            unsafe { gl.viewport(0, 0, target.width() as i32, target.height() as i32) };
        }

        state.borrow_mut().invalidate();
        self.ctx = Some(ctx);
        self.state = Some(state);
    }

    /// Finalizes execution: multisample resolves, balance checks, unbind.
    pub(super) fn finish(&mut self) {
        assert_eq!(self.debug_group_depth, 0, "unbalanced debug groups in pass");
        assert!(!self.bundling, "pass submitted with an open bundle");
        assert!(!self.query_active, "pass submitted with an open occlusion query");
        let ctx = self.ctx.take().expect("pass not begun");
        let gl = &ctx.gl;
        for (i, attachment) in self.color_attachments.iter().enumerate() {
            let Some(resolve_to) = &attachment.resolve_to else {
                continue;
            };
            let raw = resolve_to
                .as_any()
                .downcast_ref::<WebGlTexture>()
                .expect("texture from another backend")
                .raw();
            if self.resolve_framebuffer.is_none() {
                self.resolve_framebuffer =
                    Some(unsafe { gl.create_framebuffer() }.expect("framebuffer creation failed"));
            }
            let width = attachment.render_target.width() as i32;
            let height = attachment.render_target.height() as i32;
            unsafe {
                gl.bind_framebuffer(glow::READ_FRAMEBUFFER, self.framebuffer);
                gl.read_buffer(glow::COLOR_ATTACHMENT0 + i as u32);
                gl.bind_framebuffer(glow::DRAW_FRAMEBUFFER, self.resolve_framebuffer);
                gl.framebuffer_texture_2d(
                    glow::DRAW_FRAMEBUFFER,
                    glow::COLOR_ATTACHMENT0,
                    glow::TEXTURE_2D,
                    raw,
                    0,
                );
                gl.blit_framebuffer(
                    0,
                    0,
                    width,
                    height,
                    0,
                    0,
                    width,
                    height,
                    glow::COLOR_BUFFER_BIT,
                    glow::NEAREST,
                );
            }
        }
        unsafe { gl.bind_framebuffer(glow::FRAMEBUFFER, None) };
        self.state = None;
        self.color_attachments.clear();
        self.occlusion_query_pool = None;
        self.pipeline = None;
        self.index_state = None;
    }

    fn apply_pipeline(&mut self, pipeline: &Rc<dyn RenderPipeline>) {
        let native = pipeline
            .as_any()
            .downcast_ref::<WebGlRenderPipeline>()
            .expect("pipeline from another backend");
        let program = native
            .descriptor()
            .program
            .as_any()
            .downcast_ref::<WebGlProgram>()
            .expect("program from another backend");
        let depth_format = native.descriptor().depth_stencil_attachment_format;
        let depth_test = depth_format.is_some();
        let stencil_test = depth_format.is_some_and(|f| f.has_stencil());
        self.with_state(|gl, state| {
            unsafe { gl.use_program(Some(program.raw())) };
            state.bind_mega(gl, native.mega(), depth_test, stencil_test);
        });
        self.pipeline = Some(pipeline.clone());
    }

    fn apply_bindings(&mut self, bindings: &Rc<dyn Bindings>, dynamic_byte_offsets: &[u32]) {
        let native = bindings
            .as_any()
            .downcast_ref::<WebGlBindings>()
            .expect("bindings from another backend");
        let ctx = self.ctx().clone();
        let gl = &ctx.gl;
        let descriptor = native.descriptor();
        let slots = native.slots();

        for (i, binding) in descriptor.uniform_buffer_bindings.iter().enumerate() {
            let slot = slots.slots[0][i];
            let dynamic = dynamic_byte_offsets.get(i).copied().unwrap_or(0);
            let (offset, size) = uniform_binding_range(
                binding.offset,
                binding.size,
                binding.buffer.size(),
                dynamic,
            );
            let buffer = binding
                .buffer
                .as_any()
                .downcast_ref::<WebGlBuffer>()
                .expect("buffer from another backend");
            if ctx.caps.uniform_buffers {
                unsafe {
                    gl.bind_buffer_range(
                        glow::UNIFORM_BUFFER,
                        slot,
                        buffer.raw(),
                        offset as i32,
                        size as i32,
                    );
                }
            } else {
                self.upload_legacy_uniforms(gl, slot, buffer, offset, size);
            }
        }

        for (i, binding) in descriptor.sampler_bindings.iter().enumerate() {
            let slot = slots.slots[1][i];
            unsafe { gl.active_texture(glow::TEXTURE0 + slot) };
            let sampler = binding
                .sampler
                .as_ref()
                .map(|s| {
                    s.as_any()
                        .downcast_ref::<WebGlSampler>()
                        .expect("sampler from another backend")
                        as &WebGlSampler
                });
            match &binding.texture {
                Some(texture) => {
                    let texture = texture
                        .as_any()
                        .downcast_ref::<WebGlTexture>()
                        .expect("texture from another backend");
                    let raw = match texture.raw() {
                        Some(raw) => raw,
                        None => whoops("the onscreen texture cannot be sampled"),
                    };
                    unsafe { gl.bind_texture(texture.target(), Some(raw)) };
                    if ctx.caps.sampler_objects {
                        unsafe {
                            gl.bind_sampler(slot, sampler.map(|s| s.raw()).unwrap_or_else(|| {
                                Some(ctx.fallback_sampler())
                            }));
                        }
                    } else {
                        let default = Default::default();
                        let descriptor =
                            sampler.map(|s| s.descriptor()).unwrap_or(&default);
                        let resolved = resolve_texture_parameters(
                            descriptor,
                            texture.width(),
                            texture.height(),
                            ctx.caps.npot_textures,
                        );
                        unsafe {
                            gl.tex_parameter_i32(
                                texture.target(),
                                glow::TEXTURE_MIN_FILTER,
                                resolved.min_filter as i32,
                            );
                            gl.tex_parameter_i32(
                                texture.target(),
                                glow::TEXTURE_MAG_FILTER,
                                resolved.mag_filter as i32,
                            );
                            gl.tex_parameter_i32(
                                texture.target(),
                                glow::TEXTURE_WRAP_S,
                                resolved.wrap_s as i32,
                            );
                            gl.tex_parameter_i32(
                                texture.target(),
                                glow::TEXTURE_WRAP_T,
                                resolved.wrap_t as i32,
                            );
                        }
                    }
                }
                None => {
                    let (target, raw) = ctx.fallback_texture(binding.dimension);
                    unsafe { gl.bind_texture(target, Some(raw)) };
                    if ctx.caps.sampler_objects {
                        unsafe { gl.bind_sampler(slot, Some(ctx.fallback_sampler())) };
                    }
                }
            }
        }
    }

    /// Legacy uniform path: the buffer's shadow bytes feed a `ub_<slot>`
    /// vec4-array uniform on the current program.
    fn upload_legacy_uniforms(
        &self,
        gl: &glow::Context,
        slot: u32,
        buffer: &WebGlBuffer,
        offset: u64,
        size: u64,
    ) {
        let Some(pipeline) = &self.pipeline else {
            whoops("set_bindings before set_pipeline on the legacy uniform path");
        };
        let program = pipeline
            .as_any()
            .downcast_ref::<WebGlRenderPipeline>()
            .expect("pipeline from another backend")
            .descriptor()
            .program
            .clone();
        let program = program
            .as_any()
            .downcast_ref::<WebGlProgram>()
            .expect("program from another backend");
        let Some((location, declared_vec4s)) = program.legacy_uniform(slot as usize) else {
            return;
        };
        let Some(shadow) = buffer.shadow() else {
            whoops("uniform buffer without a shadow copy on the legacy profile");
        };
        let start = offset as usize;
        let end = (offset + size).min(shadow.len() as u64) as usize;
        let bytes = &shadow[start..end];
        let vec4_count = (bytes.len() / 16).min(*declared_vec4s as usize);
        let floats: Vec<f32> = bytes[..vec4_count * 16]
            .chunks_exact(4)
            .map(|c| f32::from_ne_bytes(c.try_into().expect("chunk is 4 bytes")))
            .collect();
        unsafe { gl.uniform_4_f32_slice(Some(location), &floats) };
    }

    fn apply_vertex_input(
        &mut self,
        input_layout: Option<&Rc<dyn InputLayout>>,
        vertex_buffers: &[BufferSlice],
        index_buffer: Option<&BufferSlice>,
    ) {
        let ctx = self.ctx().clone();
        let gl = &ctx.gl;
        self.index_state = None;
        self.instanced_layout = false;
        let Some(layout) = input_layout else {
            self.with_state(|gl, state| state.set_enabled_attribs(gl, 0));
            unsafe { gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, None) };
            return;
        };
        let layout = layout
            .as_any()
            .downcast_ref::<WebGlInputLayout>()
            .expect("input layout from another backend");
        let mut mask = 0u64;
        for (buffer_desc, slice) in layout
            .descriptor()
            .vertex_buffer_descriptors
            .iter()
            .zip(vertex_buffers)
        {
            let buffer = slice
                .buffer
                .as_any()
                .downcast_ref::<WebGlBuffer>()
                .expect("buffer from another backend");
            unsafe { gl.bind_buffer(glow::ARRAY_BUFFER, buffer.raw()) };
            let divisor = match buffer_desc.step_mode {
                VertexStepMode::Vertex => 0,
                VertexStepMode::Instance => {
                    assert!(
                        ctx.caps.instanced_drawing,
                        "instanced vertex input without instancing support"
                    );
                    self.instanced_layout = true;
                    1
                }
            };
            for attribute in &buffer_desc.attributes {
                let (size, ty, normalized, integer) =
                    crate::webgl::translate::vertex_attribute(attribute.format);
                let location = attribute.shader_location;
                let stride = buffer_desc.array_stride as i32;
                let offset = (slice.offset + attribute.offset) as i32;
                unsafe {
                    if integer {
                        if ctx.caps.profile != GlProfile::WebGl2 {
                            whoops("integer vertex attributes need the modern profile");
                        }
                        gl.vertex_attrib_pointer_i32(location, size, ty, stride, offset);
                    } else {
                        gl.vertex_attrib_pointer_f32(
                            location, size, ty, normalized, stride, offset,
                        );
                    }
                    if ctx.caps.instanced_drawing {
                        gl.vertex_attrib_divisor(location, divisor);
                    }
                }
                mask |= 1u64 << location;
            }
        }
        self.with_state(|gl, state| state.set_enabled_attribs(gl, mask));

        if let Some(slice) = index_buffer {
            let Some((gl_type, byte_size)) = layout.index_format() else {
                whoops("index buffer bound but the input layout declares no index format");
            };
            let buffer = slice
                .buffer
                .as_any()
                .downcast_ref::<WebGlBuffer>()
                .expect("buffer from another backend");
            unsafe { gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, buffer.raw()) };
            self.index_state = Some(IndexState {
                base_offset: slice.offset,
                gl_type,
                byte_size,
            });
        } else {
            unsafe { gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, None) };
        }
    }

    fn topology(&self) -> u32 {
        self.pipeline
            .as_ref()
            .expect("draw before set_pipeline")
            .as_any()
            .downcast_ref::<WebGlRenderPipeline>()
            .expect("pipeline from another backend")
            .topology()
    }

    fn apply_draw(
        &mut self,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) {
        assert_eq!(first_instance, 0, "first_instance must be 0 on this backend");
        let topology = self.topology();
        let ctx = self.ctx();
        let gl = &ctx.gl;
        if instance_count != 1 || self.instanced_layout {
            assert!(
                ctx.caps.instanced_drawing,
                "instanced draw without instancing support"
            );
            unsafe {
                gl.draw_arrays_instanced(
                    topology,
                    first_vertex as i32,
                    vertex_count as i32,
                    instance_count as i32,
                );
            }
        } else {
            unsafe { gl.draw_arrays(topology, first_vertex as i32, vertex_count as i32) };
        }
    }

    fn apply_draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        base_vertex: i32,
        first_instance: u32,
    ) {
        assert_eq!(first_instance, 0, "first_instance must be 0 on this backend");
        assert_eq!(base_vertex, 0, "base_vertex must be 0 on this backend");
        let topology = self.topology();
        let index = self
            .index_state
            .as_ref()
            .unwrap_or_else(|| whoops("draw_indexed without a bound index buffer"));
        let offset = (index.base_offset + first_index as u64 * index.byte_size) as i32;
        let gl_type = index.gl_type;
        let ctx = self.ctx();
        let gl = &ctx.gl;
        if instance_count != 1 || self.instanced_layout {
            assert!(
                ctx.caps.instanced_drawing,
                "instanced draw without instancing support"
            );
            unsafe {
                gl.draw_elements_instanced(
                    topology,
                    index_count as i32,
                    gl_type,
                    offset,
                    instance_count as i32,
                );
            }
        } else {
            unsafe { gl.draw_elements(topology, index_count as i32, gl_type, offset) };
        }
    }

    fn apply_command(&mut self, command: &BundleCommand) {
        match command {
            BundleCommand::SetPipeline(pipeline) => self.apply_pipeline(pipeline),
            BundleCommand::SetBindings(bindings, offsets) => {
                self.apply_bindings(bindings, offsets)
            }
            BundleCommand::SetVertexInput {
                input_layout,
                vertex_buffers,
                index_buffer,
            } => self.apply_vertex_input(
                input_layout.as_ref(),
                vertex_buffers,
                index_buffer.as_ref(),
            ),
            BundleCommand::Draw {
                vertex_count,
                instance_count,
                first_vertex,
                first_instance,
            } => self.apply_draw(*vertex_count, *instance_count, *first_vertex, *first_instance),
            BundleCommand::DrawIndexed {
                index_count,
                instance_count,
                first_index,
                base_vertex,
                first_instance,
            } => self.apply_draw_indexed(
                *index_count,
                *instance_count,
                *first_index,
                *base_vertex,
                *first_instance,
            ),
            BundleCommand::PushDebugGroup(name) => self.push_group(name),
            BundleCommand::PopDebugGroup => self.pop_group(),
            BundleCommand::InsertDebugMarker(name) => self.insert_marker(name),
        }
    }

    fn push_group(&mut self, name: &str) {
        self.debug_group_depth += 1;
        let ctx = self.ctx();
        if ctx.caps.debug_markers {
            unsafe {
                ctx.gl
                    .push_debug_group(glow::DEBUG_SOURCE_APPLICATION, 0, name)
            };
        }
    }

    fn pop_group(&mut self) {
        assert!(self.debug_group_depth > 0, "pop_debug_group without a group");
        self.debug_group_depth -= 1;
        let ctx = self.ctx();
        if ctx.caps.debug_markers {
            unsafe { ctx.gl.pop_debug_group() };
        }
    }

    fn insert_marker(&mut self, name: &str) {
        let ctx = self.ctx();
        if ctx.caps.debug_markers {
            unsafe {
                ctx.gl.debug_message_insert(
                    glow::DEBUG_SOURCE_APPLICATION,
                    glow::DEBUG_TYPE_MARKER,
                    0,
                    glow::DEBUG_SEVERITY_NOTIFICATION,
                    name,
                );
            }
        }
    }
}

impl Pass for WebGlRenderPass {
    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

impl RenderPass for WebGlRenderPass {
    fn set_viewport(&mut self, x: f32, y: f32, width: f32, height: f32) {
        if self.bundling {
            whoops("viewport changes cannot be recorded into a bundle");
        }
        let ctx = self.ctx();
        unsafe {
            ctx.gl
                .viewport(x as i32, y as i32, width as i32, height as i32)
        };
    }

    fn set_scissor_rect(&mut self, x: u32, y: u32, width: u32, height: u32) {
        if self.bundling {
            whoops("scissor changes cannot be recorded into a bundle");
        }
        let ctx = self.ctx();
        unsafe {
            ctx.gl.enable(glow::SCISSOR_TEST);
            ctx.gl
                .scissor(x as i32, y as i32, width as i32, height as i32);
        }
    }

    fn set_pipeline(&mut self, pipeline: &Rc<dyn RenderPipeline>) {
        if self.bundling {
            self.bundle_commands
                .push(BundleCommand::SetPipeline(pipeline.clone()));
            return;
        }
        self.apply_pipeline(pipeline);
    }

    fn set_bindings(&mut self, bindings: &Rc<dyn Bindings>, dynamic_byte_offsets: &[u32]) {
        if self.bundling {
            self.bundle_commands.push(BundleCommand::SetBindings(
                bindings.clone(),
                dynamic_byte_offsets.to_vec(),
            ));
            return;
        }
        self.apply_bindings(bindings, dynamic_byte_offsets);
    }

    fn set_vertex_input(
        &mut self,
        input_layout: Option<&Rc<dyn InputLayout>>,
        vertex_buffers: &[BufferSlice],
        index_buffer: Option<&BufferSlice>,
    ) {
        if self.bundling {
            self.bundle_commands.push(BundleCommand::SetVertexInput {
                input_layout: input_layout.cloned(),
                vertex_buffers: vertex_buffers.to_vec(),
                index_buffer: index_buffer.cloned(),
            });
            return;
        }
        self.apply_vertex_input(input_layout, vertex_buffers, index_buffer);
    }

    fn set_stencil_reference(&mut self, reference: u32) {
        if self.bundling {
            whoops("stencil reference changes cannot be recorded into a bundle");
        }
        self.with_state(|gl, state| state.set_stencil_reference(gl, reference));
    }

    fn set_blend_constant(&mut self, color: Color) {
        if self.bundling {
            whoops("blend constant changes cannot be recorded into a bundle");
        }
        self.with_state(|gl, state| state.set_blend_constant(gl, color));
    }

    fn draw(
        &mut self,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) {
        if self.bundling {
            self.bundle_commands.push(BundleCommand::Draw {
                vertex_count,
                instance_count,
                first_vertex,
                first_instance,
            });
            return;
        }
        self.apply_draw(vertex_count, instance_count, first_vertex, first_instance);
    }

    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        base_vertex: i32,
        first_instance: u32,
    ) {
        if self.bundling {
            self.bundle_commands.push(BundleCommand::DrawIndexed {
                index_count,
                instance_count,
                first_index,
                base_vertex,
                first_instance,
            });
            return;
        }
        self.apply_draw_indexed(
            index_count,
            instance_count,
            first_index,
            base_vertex,
            first_instance,
        );
    }

    fn draw_indirect(&mut self, _buffer: &Rc<dyn Buffer>, _indirect_offset: u64) {
        whoops("indirect drawing is not available on this backend");
    }

    fn draw_indexed_indirect(&mut self, _buffer: &Rc<dyn Buffer>, _indirect_offset: u64) {
        whoops("indirect drawing is not available on this backend");
    }

    fn begin_occlusion_query(&mut self, query_index: u32) {
        assert!(!self.query_active, "occlusion queries cannot nest");
        let pool = self
            .occlusion_query_pool
            .as_ref()
            .unwrap_or_else(|| whoops("pass has no occlusion query pool"));
        let pool = pool
            .as_any()
            .downcast_ref::<WebGlQueryPool>()
            .expect("query pool from another backend");
        pool.reset(query_index);
        let ctx = self.ctx();
        unsafe {
            ctx.gl
                .begin_query(glow::ANY_SAMPLES_PASSED, pool.query(query_index))
        };
        self.query_active = true;
    }

    fn end_occlusion_query(&mut self) {
        assert!(self.query_active, "end_occlusion_query without begin");
        let ctx = self.ctx();
        unsafe { ctx.gl.end_query(glow::ANY_SAMPLES_PASSED) };
        self.query_active = false;
    }

    fn push_debug_group(&mut self, name: &str) {
        if self.bundling {
            self.bundle_commands
                .push(BundleCommand::PushDebugGroup(name.to_string()));
            return;
        }
        self.push_group(name);
    }

    fn pop_debug_group(&mut self) {
        if self.bundling {
            self.bundle_commands.push(BundleCommand::PopDebugGroup);
            return;
        }
        self.pop_group();
    }

    fn insert_debug_marker(&mut self, name: &str) {
        if self.bundling {
            self.bundle_commands
                .push(BundleCommand::InsertDebugMarker(name.to_string()));
            return;
        }
        self.insert_marker(name);
    }

    fn begin_bundle(&mut self) {
        assert!(!self.bundling, "bundles cannot nest");
        self.bundling = true;
        self.bundle_commands.clear();
    }

    fn end_bundle(&mut self) -> Rc<dyn RenderBundle> {
        assert!(self.bundling, "end_bundle without begin_bundle");
        self.bundling = false;
        let bundle = Rc::new(WebGlRenderBundle {
            commands: std::mem::take(&mut self.bundle_commands),
        });
        // Recording a bundle also plays it once into this pass.
        for command in &bundle.commands {
            self.apply_command(command);
        }
        bundle
    }

    fn execute_bundles(&mut self, bundles: &[Rc<dyn RenderBundle>]) {
        assert!(!self.bundling, "execute_bundles inside bundle recording");
        for bundle in bundles {
            let bundle = bundle
                .as_any()
                .downcast_ref::<WebGlRenderBundle>()
                .expect("bundle from another backend");
            for command in &bundle.commands {
                self.apply_command(command);
            }
        }
    }
}

/// Byte window a uniform-buffer binding covers. The dynamic offset shifts
/// the window; a zero size means everything past the static offset.
fn uniform_binding_range(offset: u64, size: u64, buffer_size: u64, dynamic: u32) -> (u64, u64) {
    let start = offset + dynamic as u64;
    let len = if size == 0 { buffer_size - offset } else { size };
    (start, len)
}

#[cfg(test)]
mod tests {
    use super::uniform_binding_range;

    #[test]
    fn uniform_range_applies_dynamic_offset() {
        assert_eq!(uniform_binding_range(0, 16, 512, 0), (0, 16));
        assert_eq!(uniform_binding_range(0, 16, 512, 256), (256, 16));
        assert_eq!(uniform_binding_range(64, 16, 512, 256), (320, 16));
    }

    #[test]
    fn uniform_range_zero_size_runs_to_the_end() {
        assert_eq!(uniform_binding_range(0, 0, 512, 0), (0, 512));
        assert_eq!(uniform_binding_range(64, 0, 512, 0), (64, 448));
        // The window length tracks the static offset even when a dynamic
        // offset shifts the start.
        assert_eq!(uniform_binding_range(64, 0, 512, 128), (192, 448));
    }
}
