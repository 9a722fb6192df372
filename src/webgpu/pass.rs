// SPDX-License-Identifier: MIT OR Apache-2.0
//! Render and compute pass recording.
//!
//! Pass objects are pooled by the device; `begin_*` re-arms a recycled
//! object with a fresh command encoder, and submit finishes the encoder and
//! returns the object to the pool. Render bundles are captured as
//! backend-neutral commands while recording and replayed into a native
//! bundle encoder when the bundle is finished.

use std::any::Any;
use std::rc::Rc;

use crate::api::depth::reverse_depth_for_clear_value;
use crate::api::descriptors::{BufferSlice, Color, RenderPassDescriptor};
use crate::api::pass::{ComputePass, Pass, RenderBundle, RenderPass};
use crate::api::resource::{Bindings, Buffer, ComputePipeline, InputLayout, QueryPool, RenderPipeline};
use crate::api::whoops;
use crate::webgpu::bindings::WebGpuBindings;
use crate::webgpu::buffer::WebGpuBuffer;
use crate::webgpu::device::Gpu;
use crate::webgpu::pipeline::{WebGpuComputePipeline, WebGpuInputLayout, WebGpuRenderPipeline};
use crate::webgpu::query::WebGpuQueryPool;
use crate::webgpu::render_target::WebGpuRenderTarget;
use crate::webgpu::texture::WebGpuTexture;

/// One captured command inside a bundle recording.
enum BundleCommand {
    SetPipeline(Rc<dyn RenderPipeline>),
    SetBindings {
        bindings: Rc<dyn Bindings>,
        dynamic_offsets: Vec<u32>,
    },
    SetVertexInput {
        input_layout: Option<Rc<dyn InputLayout>>,
        vertex_buffers: Vec<BufferSlice>,
        index_buffer: Option<BufferSlice>,
    },
    Draw(u32, u32, u32, u32),
    DrawIndexed(u32, u32, u32, i32, u32),
    DrawIndirect(Rc<dyn Buffer>, u64),
    DrawIndexedIndirect(Rc<dyn Buffer>, u64),
    PushDebugGroup(String),
    PopDebugGroup,
    InsertDebugMarker(String),
}

/// Owned native resources for one bundle command, materialized before the
/// bundle encoder exists so the encoder can borrow from them.
enum NativeCommand {
    Pipeline(wgpu::RenderPipeline),
    Bindings(Vec<wgpu::BindGroup>, Vec<u32>),
    VertexInput {
        buffers: Vec<(wgpu::Buffer, u64)>,
        index: Option<(wgpu::Buffer, u64, wgpu::IndexFormat)>,
    },
    Draw(u32, u32, u32, u32),
    DrawIndexed(u32, u32, u32, i32, u32),
    DrawIndirect(wgpu::Buffer, u64),
    DrawIndexedIndirect(wgpu::Buffer, u64),
    PushDebugGroup(String),
    PopDebugGroup,
    InsertDebugMarker(String),
}

pub(super) struct WebGpuRenderBundle {
    bundle: wgpu::RenderBundle,
}

impl RenderBundle for WebGpuRenderBundle {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub(super) struct WebGpuRenderPass {
    gpu: Option<Rc<Gpu>>,
    encoder: Option<wgpu::CommandEncoder>,
    raw: Option<wgpu::RenderPass<'static>>,
    color_formats: Vec<wgpu::TextureFormat>,
    depth_format: Option<wgpu::TextureFormat>,
    sample_count: u32,
    occlusion_query_pool: Option<Rc<dyn QueryPool>>,
    bundling: bool,
    bundle_commands: Vec<BundleCommand>,
    debug_group_depth: u32,
    pub(super) generation: u64,
}

impl Default for WebGpuRenderPass {
    fn default() -> Self {
        WebGpuRenderPass {
            gpu: None,
            encoder: None,
            raw: None,
            color_formats: Vec::new(),
            depth_format: None,
            sample_count: 1,
            occlusion_query_pool: None,
            bundling: false,
            bundle_commands: Vec::new(),
            debug_group_depth: 0,
            generation: 0,
        }
    }
}

fn target_view(target: &Rc<dyn crate::api::resource::RenderTarget>) -> &wgpu::TextureView {
    target
        .as_any()
        .downcast_ref::<WebGpuRenderTarget>()
        .expect("render target from another backend")
        .view()
}

impl WebGpuRenderPass {
    pub(super) fn begin(
        &mut self,
        gpu: Rc<Gpu>,
        descriptor: &RenderPassDescriptor,
        generation: u64,
    ) {
        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });

        self.color_formats.clear();
        self.sample_count = 1;
        for attachment in &descriptor.color_attachments {
            self.color_formats
                .push(super::translate::texture_format(attachment.render_target.format()));
            self.sample_count = attachment.render_target.sample_count();
        }
        self.depth_format = descriptor
            .depth_stencil_attachment
            .as_ref()
            .map(|a| super::translate::texture_format(a.render_target.format()));

        let color_attachments: Vec<Option<wgpu::RenderPassColorAttachment>> = descriptor
            .color_attachments
            .iter()
            .map(|attachment| {
                Some(wgpu::RenderPassColorAttachment {
                    view: target_view(&attachment.render_target),
                    resolve_target: attachment.resolve_to.as_ref().map(|texture| {
                        texture
                            .as_any()
                            .downcast_ref::<WebGpuTexture>()
                            .expect("texture from another backend")
                            .view()
                    }),
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: match attachment.clear_color {
                            Some(color) => wgpu::LoadOp::Clear(wgpu::Color {
                                r: color.r as f64,
                                g: color.g as f64,
                                b: color.b as f64,
                                a: color.a as f64,
                            }),
                            None => wgpu::LoadOp::Load,
                        },
                        store: wgpu::StoreOp::Store,
                    },
                })
            })
            .collect();

        let depth_stencil_attachment =
            descriptor
                .depth_stencil_attachment
                .as_ref()
                .map(|attachment| {
                    let has_stencil = attachment.render_target.format().has_stencil();
                    wgpu::RenderPassDepthStencilAttachment {
                        view: target_view(&attachment.render_target),
                        depth_ops: Some(wgpu::Operations {
                            load: match attachment.clear_depth {
                                // The one depth-reversal point for clear values.
                                Some(depth) => {
                                    wgpu::LoadOp::Clear(reverse_depth_for_clear_value(depth))
                                }
                                None => wgpu::LoadOp::Load,
                            },
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: has_stencil.then(|| wgpu::Operations {
                            load: match attachment.clear_stencil {
                                Some(stencil) => wgpu::LoadOp::Clear(stencil),
                                None => wgpu::LoadOp::Load,
                            },
                            store: wgpu::StoreOp::Store,
                        }),
                    }
                });

        let occlusion_query_pool = descriptor.occlusion_query_pool.clone();
        let raw = encoder
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: None,
                color_attachments: &color_attachments,
                depth_stencil_attachment,
                timestamp_writes: None,
                occlusion_query_set: occlusion_query_pool.as_ref().map(|pool| {
                    pool.as_any()
                        .downcast_ref::<WebGpuQueryPool>()
                        .expect("query pool from another backend")
                        .query_set()
                }),
            })
            .forget_lifetime();

        self.gpu = Some(gpu);
        self.encoder = Some(encoder);
        self.raw = Some(raw);
        self.occlusion_query_pool = occlusion_query_pool;
        self.bundling = false;
        self.bundle_commands.clear();
        self.debug_group_depth = 0;
        self.generation = generation;
    }

    /// Ends recording: drops the native pass, records any pending occlusion
    /// resolve, and finishes the command buffer. Returns the query pool that
    /// needs its results collected after submission, if any.
    pub(super) fn finish(&mut self) -> (wgpu::CommandBuffer, Option<Rc<dyn QueryPool>>) {
        assert_eq!(
            self.debug_group_depth, 0,
            "unbalanced debug groups in render pass"
        );
        assert!(!self.bundling, "pass submitted while recording a bundle");
        drop(self.raw.take());
        let mut encoder = self.encoder.take().expect("pass already submitted");
        let pool = self.occlusion_query_pool.take();
        if let Some(pool) = &pool {
            pool.as_any()
                .downcast_ref::<WebGpuQueryPool>()
                .expect("query pool from another backend")
                .record_resolve(&mut encoder);
        }
        self.gpu = None;
        (encoder.finish(), pool)
    }

    fn raw(&mut self) -> &mut wgpu::RenderPass<'static> {
        self.raw.as_mut().expect("pass is not recording")
    }

    fn apply_bindings(&mut self, bindings: &Rc<dyn Bindings>, dynamic_byte_offsets: &[u32]) {
        let native = bindings
            .as_any()
            .downcast_ref::<WebGpuBindings>()
            .expect("bindings from another backend");
        let groups = native.groups().to_vec();
        let offsets = native.padded_dynamic_offsets(dynamic_byte_offsets);
        let raw = self.raw();
        for (group, bind_group) in groups.iter().enumerate() {
            let offsets: &[u32] = if group == 0 { &offsets } else { &[] };
            raw.set_bind_group(group as u32, bind_group, offsets);
        }
    }

    fn apply_vertex_input(
        &mut self,
        input_layout: Option<&Rc<dyn InputLayout>>,
        vertex_buffers: &[BufferSlice],
        index_buffer: Option<&BufferSlice>,
    ) {
        let index_format = input_layout.and_then(|layout| {
            layout
                .as_any()
                .downcast_ref::<WebGpuInputLayout>()
                .expect("input layout from another backend")
                .index_format
        });
        let raw = self.raw.as_mut().expect("pass is not recording");
        for (slot, slice) in vertex_buffers.iter().enumerate() {
            let buffer = slice
                .buffer
                .as_any()
                .downcast_ref::<WebGpuBuffer>()
                .expect("buffer from another backend");
            raw.set_vertex_buffer(slot as u32, buffer.raw().slice(slice.offset..));
        }
        if let Some(slice) = index_buffer {
            let Some(format) = index_format else {
                whoops("index buffer bound without an input layout declaring its format");
            };
            let buffer = slice
                .buffer
                .as_any()
                .downcast_ref::<WebGpuBuffer>()
                .expect("buffer from another backend");
            raw.set_index_buffer(buffer.raw().slice(slice.offset..), format);
        }
    }
}

impl Pass for WebGpuRenderPass {
    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

impl RenderPass for WebGpuRenderPass {
    fn set_viewport(&mut self, x: f32, y: f32, width: f32, height: f32) {
        if self.bundling {
            whoops("viewport state is not available inside a render bundle");
        }
        self.raw().set_viewport(x, y, width, height, 0.0, 1.0);
    }

    fn set_scissor_rect(&mut self, x: u32, y: u32, width: u32, height: u32) {
        if self.bundling {
            whoops("scissor state is not available inside a render bundle");
        }
        self.raw().set_scissor_rect(x, y, width, height);
    }

    fn set_pipeline(&mut self, pipeline: &Rc<dyn RenderPipeline>) {
        if self.bundling {
            self.bundle_commands
                .push(BundleCommand::SetPipeline(pipeline.clone()));
            return;
        }
        let gpu = self.gpu.clone().expect("pass is not recording");
        let compiled = pipeline
            .as_any()
            .downcast_ref::<WebGpuRenderPipeline>()
            .expect("pipeline from another backend")
            .ensure_compiled(&gpu);
        self.raw().set_pipeline(&compiled);
    }

    fn set_bindings(&mut self, bindings: &Rc<dyn Bindings>, dynamic_byte_offsets: &[u32]) {
        if self.bundling {
            self.bundle_commands.push(BundleCommand::SetBindings {
                bindings: bindings.clone(),
                dynamic_offsets: dynamic_byte_offsets.to_vec(),
            });
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
            whoops("stencil reference is not available inside a render bundle");
        }
        self.raw().set_stencil_reference(reference);
    }

    fn set_blend_constant(&mut self, color: Color) {
        if self.bundling {
            whoops("blend constant is not available inside a render bundle");
        }
        self.raw().set_blend_constant(wgpu::Color {
            r: color.r as f64,
            g: color.g as f64,
            b: color.b as f64,
            a: color.a as f64,
        });
    }

    fn draw(
        &mut self,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) {
        if self.bundling {
            self.bundle_commands.push(BundleCommand::Draw(
                vertex_count,
                instance_count,
                first_vertex,
                first_instance,
            ));
            return;
        }
        self.raw().draw(
            first_vertex..first_vertex + vertex_count,
            first_instance..first_instance + instance_count,
        );
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
            self.bundle_commands.push(BundleCommand::DrawIndexed(
                index_count,
                instance_count,
                first_index,
                base_vertex,
                first_instance,
            ));
            return;
        }
        self.raw().draw_indexed(
            first_index..first_index + index_count,
            base_vertex,
            first_instance..first_instance + instance_count,
        );
    }

    fn draw_indirect(&mut self, buffer: &Rc<dyn Buffer>, indirect_offset: u64) {
        if self.bundling {
            self.bundle_commands
                .push(BundleCommand::DrawIndirect(buffer.clone(), indirect_offset));
            return;
        }
        let raw_buffer = buffer
            .as_any()
            .downcast_ref::<WebGpuBuffer>()
            .expect("buffer from another backend")
            .raw()
            .clone();
        self.raw().draw_indirect(&raw_buffer, indirect_offset);
    }

    fn draw_indexed_indirect(&mut self, buffer: &Rc<dyn Buffer>, indirect_offset: u64) {
        if self.bundling {
            self.bundle_commands.push(BundleCommand::DrawIndexedIndirect(
                buffer.clone(),
                indirect_offset,
            ));
            return;
        }
        let raw_buffer = buffer
            .as_any()
            .downcast_ref::<WebGpuBuffer>()
            .expect("buffer from another backend")
            .raw()
            .clone();
        self.raw().draw_indexed_indirect(&raw_buffer, indirect_offset);
    }

    fn begin_occlusion_query(&mut self, query_index: u32) {
        assert!(
            self.occlusion_query_pool.is_some(),
            "pass has no occlusion query pool"
        );
        self.raw().begin_occlusion_query(query_index);
    }

    fn end_occlusion_query(&mut self) {
        self.raw().end_occlusion_query();
    }

    fn push_debug_group(&mut self, name: &str) {
        if self.bundling {
            self.bundle_commands
                .push(BundleCommand::PushDebugGroup(name.to_string()));
            return;
        }
        self.debug_group_depth += 1;
        self.raw().push_debug_group(name);
    }

    fn pop_debug_group(&mut self) {
        if self.bundling {
            self.bundle_commands.push(BundleCommand::PopDebugGroup);
            return;
        }
        assert!(self.debug_group_depth > 0, "pop without a matching push");
        self.debug_group_depth -= 1;
        self.raw().pop_debug_group();
    }

    fn insert_debug_marker(&mut self, name: &str) {
        if self.bundling {
            self.bundle_commands
                .push(BundleCommand::InsertDebugMarker(name.to_string()));
            return;
        }
        self.raw().insert_debug_marker(name);
    }

    fn begin_bundle(&mut self) {
        assert!(!self.bundling, "bundle recording is not reentrant");
        self.bundling = true;
        self.bundle_commands.clear();
    }

    fn end_bundle(&mut self) -> Rc<dyn RenderBundle> {
        assert!(self.bundling, "end_bundle without begin_bundle");
        self.bundling = false;
        let commands = std::mem::take(&mut self.bundle_commands);
        let gpu = self.gpu.clone().expect("pass is not recording");

        // Resolve every command to owned native handles first; the bundle
        // encoder borrows from this vector until finish.
        let native: Vec<NativeCommand> = commands
            .iter()
            .map(|command| materialize(&gpu, command))
            .collect();

        let color_formats: Vec<Option<wgpu::TextureFormat>> =
            self.color_formats.iter().map(|&f| Some(f)).collect();
        let mut encoder =
            gpu.device
                .create_render_bundle_encoder(&wgpu::RenderBundleEncoderDescriptor {
                    label: None,
                    color_formats: &color_formats,
                    depth_stencil: self.depth_format.map(|format| {
                        wgpu::RenderBundleDepthStencil {
                            format,
                            depth_read_only: false,
                            stencil_read_only: false,
                        }
                    }),
                    sample_count: self.sample_count,
                    multiview: None,
                });
        for command in &native {
            replay(&mut encoder, command);
        }
        let bundle = Rc::new(WebGpuRenderBundle {
            bundle: encoder.finish(&wgpu::RenderBundleDescriptor { label: None }),
        });

        // A finished bundle also plays once into the live pass.
        self.raw().execute_bundles([&bundle.bundle]);
        bundle
    }

    fn execute_bundles(&mut self, bundles: &[Rc<dyn RenderBundle>]) {
        let natives: Vec<&wgpu::RenderBundle> = bundles
            .iter()
            .map(|bundle| {
                &bundle
                    .as_any()
                    .downcast_ref::<WebGpuRenderBundle>()
                    .expect("bundle from another backend")
                    .bundle
            })
            .collect();
        self.raw().execute_bundles(natives);
    }
}

fn materialize(gpu: &Rc<Gpu>, command: &BundleCommand) -> NativeCommand {
    match command {
        BundleCommand::SetPipeline(pipeline) => NativeCommand::Pipeline(
            pipeline
                .as_any()
                .downcast_ref::<WebGpuRenderPipeline>()
                .expect("pipeline from another backend")
                .ensure_compiled(gpu),
        ),
        BundleCommand::SetBindings {
            bindings,
            dynamic_offsets,
        } => {
            let native = bindings
                .as_any()
                .downcast_ref::<WebGpuBindings>()
                .expect("bindings from another backend");
            NativeCommand::Bindings(
                native.groups().to_vec(),
                native.padded_dynamic_offsets(dynamic_offsets),
            )
        }
        BundleCommand::SetVertexInput {
            input_layout,
            vertex_buffers,
            index_buffer,
        } => {
            let index_format = input_layout.as_ref().and_then(|layout| {
                layout
                    .as_any()
                    .downcast_ref::<WebGpuInputLayout>()
                    .expect("input layout from another backend")
                    .index_format
            });
            NativeCommand::VertexInput {
                buffers: vertex_buffers
                    .iter()
                    .map(|slice| {
                        let buffer = slice
                            .buffer
                            .as_any()
                            .downcast_ref::<WebGpuBuffer>()
                            .expect("buffer from another backend");
                        (buffer.raw().clone(), slice.offset)
                    })
                    .collect(),
                index: index_buffer.as_ref().map(|slice| {
                    let Some(format) = index_format else {
                        whoops("index buffer bound without an input layout declaring its format");
                    };
                    let buffer = slice
                        .buffer
                        .as_any()
                        .downcast_ref::<WebGpuBuffer>()
                        .expect("buffer from another backend");
                    (buffer.raw().clone(), slice.offset, format)
                }),
            }
        }
        BundleCommand::Draw(a, b, c, d) => NativeCommand::Draw(*a, *b, *c, *d),
        BundleCommand::DrawIndexed(a, b, c, d, e) => NativeCommand::DrawIndexed(*a, *b, *c, *d, *e),
        BundleCommand::DrawIndirect(buffer, offset) => NativeCommand::DrawIndirect(
            buffer
                .as_any()
                .downcast_ref::<WebGpuBuffer>()
                .expect("buffer from another backend")
                .raw()
                .clone(),
            *offset,
        ),
        BundleCommand::DrawIndexedIndirect(buffer, offset) => NativeCommand::DrawIndexedIndirect(
            buffer
                .as_any()
                .downcast_ref::<WebGpuBuffer>()
                .expect("buffer from another backend")
                .raw()
                .clone(),
            *offset,
        ),
        BundleCommand::PushDebugGroup(name) => NativeCommand::PushDebugGroup(name.clone()),
        BundleCommand::PopDebugGroup => NativeCommand::PopDebugGroup,
        BundleCommand::InsertDebugMarker(name) => NativeCommand::InsertDebugMarker(name.clone()),
    }
}

fn replay<'a>(encoder: &mut wgpu::RenderBundleEncoder<'a>, command: &'a NativeCommand) {
    match command {
        NativeCommand::Pipeline(pipeline) => encoder.set_pipeline(pipeline),
        NativeCommand::Bindings(groups, dynamic_offsets) => {
            for (group, bind_group) in groups.iter().enumerate() {
                let offsets: &[u32] = if group == 0 { dynamic_offsets } else { &[] };
                encoder.set_bind_group(group as u32, bind_group, offsets);
            }
        }
        NativeCommand::VertexInput { buffers, index } => {
            for (slot, (buffer, offset)) in buffers.iter().enumerate() {
                encoder.set_vertex_buffer(slot as u32, buffer.slice(*offset..));
            }
            if let Some((buffer, offset, format)) = index {
                encoder.set_index_buffer(buffer.slice(*offset..), *format);
            }
        }
        NativeCommand::Draw(vertex_count, instance_count, first_vertex, first_instance) => encoder
            .draw(
                *first_vertex..*first_vertex + *vertex_count,
                *first_instance..*first_instance + *instance_count,
            ),
        NativeCommand::DrawIndexed(
            index_count,
            instance_count,
            first_index,
            base_vertex,
            first_instance,
        ) => encoder.draw_indexed(
            *first_index..*first_index + *index_count,
            *base_vertex,
            *first_instance..*first_instance + *instance_count,
        ),
        NativeCommand::DrawIndirect(buffer, offset) => encoder.draw_indirect(buffer, *offset),
        NativeCommand::DrawIndexedIndirect(buffer, offset) => {
            encoder.draw_indexed_indirect(buffer, *offset)
        }
        NativeCommand::PushDebugGroup(name) => encoder.push_debug_group(name),
        NativeCommand::PopDebugGroup => encoder.pop_debug_group(),
        NativeCommand::InsertDebugMarker(name) => encoder.insert_debug_marker(name),
    }
}

pub(super) struct WebGpuComputePass {
    gpu: Option<Rc<Gpu>>,
    encoder: Option<wgpu::CommandEncoder>,
    raw: Option<wgpu::ComputePass<'static>>,
    debug_group_depth: u32,
    pub(super) generation: u64,
}

impl Default for WebGpuComputePass {
    fn default() -> Self {
        WebGpuComputePass {
            gpu: None,
            encoder: None,
            raw: None,
            debug_group_depth: 0,
            generation: 0,
        }
    }
}

impl WebGpuComputePass {
    pub(super) fn begin(&mut self, gpu: Rc<Gpu>, generation: u64) {
        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
        let raw = encoder
            .begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: None,
                timestamp_writes: None,
            })
            .forget_lifetime();
        self.gpu = Some(gpu);
        self.encoder = Some(encoder);
        self.raw = Some(raw);
        self.debug_group_depth = 0;
        self.generation = generation;
    }

    pub(super) fn finish(&mut self) -> wgpu::CommandBuffer {
        assert_eq!(
            self.debug_group_depth, 0,
            "unbalanced debug groups in compute pass"
        );
        drop(self.raw.take());
        self.gpu = None;
        self.encoder.take().expect("pass already submitted").finish()
    }

    fn raw(&mut self) -> &mut wgpu::ComputePass<'static> {
        self.raw.as_mut().expect("pass is not recording")
    }
}

impl Pass for WebGpuComputePass {
    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

impl ComputePass for WebGpuComputePass {
    fn set_pipeline(&mut self, pipeline: &Rc<dyn ComputePipeline>) {
        let gpu = self.gpu.clone().expect("pass is not recording");
        let compiled = pipeline
            .as_any()
            .downcast_ref::<WebGpuComputePipeline>()
            .expect("pipeline from another backend")
            .ensure_compiled(&gpu);
        self.raw().set_pipeline(&compiled);
    }

    fn set_bindings(&mut self, bindings: &Rc<dyn Bindings>, dynamic_byte_offsets: &[u32]) {
        let native = bindings
            .as_any()
            .downcast_ref::<WebGpuBindings>()
            .expect("bindings from another backend");
        let groups = native.groups().to_vec();
        let offsets = native.padded_dynamic_offsets(dynamic_byte_offsets);
        let raw = self.raw();
        for (group, bind_group) in groups.iter().enumerate() {
            let offsets: &[u32] = if group == 0 { &offsets } else { &[] };
            raw.set_bind_group(group as u32, bind_group, offsets);
        }
    }

    fn dispatch_workgroups(&mut self, x: u32, y: u32, z: u32) {
        self.raw().dispatch_workgroups(x, y, z);
    }

    fn dispatch_workgroups_indirect(&mut self, buffer: &Rc<dyn Buffer>, indirect_offset: u64) {
        let raw_buffer = buffer
            .as_any()
            .downcast_ref::<WebGpuBuffer>()
            .expect("buffer from another backend")
            .raw()
            .clone();
        self.raw()
            .dispatch_workgroups_indirect(&raw_buffer, indirect_offset);
    }

    fn push_debug_group(&mut self, name: &str) {
        self.debug_group_depth += 1;
        self.raw().push_debug_group(name);
    }

    fn pop_debug_group(&mut self) {
        assert!(self.debug_group_depth > 0, "pop without a matching push");
        self.debug_group_depth -= 1;
        self.raw().pop_debug_group();
    }

    fn insert_debug_marker(&mut self, name: &str) {
        self.raw().insert_debug_marker(name);
    }
}
