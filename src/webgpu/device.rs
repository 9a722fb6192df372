// SPDX-License-Identifier: MIT OR Apache-2.0
//! The wgpu device: resource factories, frame lifecycle and pass submission.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::api::descriptors::{
    BindingsDescriptor, BufferDescriptor, ComputePipelineDescriptor, InputLayoutDescriptor,
    QueryPoolKind, RenderPassDescriptor, RenderPipelineDescriptor, RenderTargetDescriptor,
    SamplerDescriptor, TextureDescriptor,
};
use crate::api::device::{
    Device, DeviceLimits, Error, ResourceRegistry, SharedResourceRegistry, VendorInfo,
};
use crate::api::format::SamplerFormatKind;
use crate::api::pass::{ComputePass, Pass, RenderPass};
use crate::api::resource::{
    Bindings, Buffer, ComputePipeline, InputLayout, Program, QueryPool, Readback, RenderPipeline,
    RenderTarget, ResourceKind, Sampler, Texture, TextureDimension, TextureUsage,
};
use crate::api::shader::{ProgramDescriptor, ShaderCompiler};
use crate::pool::Pool;
use crate::webgpu::bindings::WebGpuBindings;
use crate::webgpu::buffer::WebGpuBuffer;
use crate::webgpu::pass::{WebGpuComputePass, WebGpuRenderPass};
use crate::webgpu::pipeline::{WebGpuComputePipeline, WebGpuInputLayout, WebGpuRenderPipeline};
use crate::webgpu::program::WebGpuProgram;
use crate::webgpu::query::WebGpuQueryPool;
use crate::webgpu::readback::WebGpuReadback;
use crate::webgpu::render_target::WebGpuRenderTarget;
use crate::webgpu::sampler::WebGpuSampler;
use crate::webgpu::texture::WebGpuTexture;

/// The native device/queue pair, shared by every resource.
pub(super) struct Gpu {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

/// Cache of 1×1 dummy resources substituted for unset texture/sampler
/// bindings; an unset bind-group entry is a hard error on this platform.
pub(super) struct Fallbacks {
    views: RefCell<HashMap<(TextureDimension, SamplerFormatKind), wgpu::TextureView>>,
    samplers: RefCell<HashMap<bool, wgpu::Sampler>>,
}

impl Fallbacks {
    fn new() -> Fallbacks {
        Fallbacks {
            views: RefCell::new(HashMap::new()),
            samplers: RefCell::new(HashMap::new()),
        }
    }

    pub(super) fn view(
        &self,
        gpu: &Gpu,
        dimension: TextureDimension,
        kind: SamplerFormatKind,
    ) -> wgpu::TextureView {
        if let Some(view) = self.views.borrow().get(&(dimension, kind)) {
            return view.clone();
        }
        let format = match kind {
            SamplerFormatKind::Float => wgpu::TextureFormat::Rgba8Unorm,
            SamplerFormatKind::Uint => wgpu::TextureFormat::Rgba8Uint,
            SamplerFormatKind::Sint => wgpu::TextureFormat::Rgba8Sint,
            SamplerFormatKind::Depth => wgpu::TextureFormat::Depth32Float,
        };
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("fallback texture"),
            size: wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: match dimension {
                    TextureDimension::Cube => 6,
                    _ => 1,
                },
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: super::translate::texture_dimension(dimension),
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            dimension: Some(super::translate::texture_view_dimension(dimension)),
            ..Default::default()
        });
        self.views
            .borrow_mut()
            .insert((dimension, kind), view.clone());
        view
    }

    pub(super) fn sampler(&self, gpu: &Gpu, comparison: bool) -> wgpu::Sampler {
        if let Some(sampler) = self.samplers.borrow().get(&comparison) {
            return sampler.clone();
        }
        let sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("fallback sampler"),
            compare: comparison.then_some(wgpu::CompareFunction::Always),
            ..Default::default()
        });
        self.samplers
            .borrow_mut()
            .insert(comparison, sampler.clone());
        sampler
    }
}

struct FrameState {
    active: bool,
    pending: Vec<wgpu::CommandBuffer>,
    used_query_pools: Vec<Rc<dyn QueryPool>>,
}

pub struct WebGpuDevice {
    pub(super) gpu: Rc<Gpu>,
    adapter_info: wgpu::AdapterInfo,
    native_limits: wgpu::Limits,
    registry: SharedResourceRegistry,
    shader_compiler: Option<Rc<dyn ShaderCompiler>>,
    fallbacks: Fallbacks,
    frame: RefCell<FrameState>,
    render_pass_pool: Pool<Box<WebGpuRenderPass>>,
    compute_pass_pool: Pool<Box<WebGpuComputePass>>,
}

impl WebGpuDevice {
    pub(super) fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        adapter_info: wgpu::AdapterInfo,
        shader_compiler: Option<Rc<dyn ShaderCompiler>>,
    ) -> Rc<WebGpuDevice> {
        let native_limits = device.limits();
        logwise::info_sync!(
            "device ready on adapter {adapter}",
            adapter = logwise::privacy::LogIt(&adapter_info.name)
        );
        Rc::new(WebGpuDevice {
            gpu: Rc::new(Gpu { device, queue }),
            adapter_info,
            native_limits,
            registry: Rc::new(RefCell::new(ResourceRegistry::default())),
            shader_compiler,
            fallbacks: Fallbacks::new(),
            frame: RefCell::new(FrameState {
                active: false,
                pending: Vec::new(),
                used_query_pools: Vec::new(),
            }),
            render_pass_pool: Pool::new(),
            compute_pass_pool: Pool::new(),
        })
    }

    /// Queues a command buffer into the current frame, or submits directly
    /// when used outside `begin_frame`/`end_frame`.
    fn enqueue(&self, command: wgpu::CommandBuffer) {
        let mut frame = self.frame.borrow_mut();
        if frame.active {
            frame.pending.push(command);
        } else {
            drop(frame);
            self.gpu.queue.submit(std::iter::once(command));
        }
    }
}

impl Device for WebGpuDevice {
    fn create_buffer(&self, descriptor: BufferDescriptor) -> Result<Rc<dyn Buffer>, Error> {
        Ok(WebGpuBuffer::new(self.gpu.clone(), self.registry.clone(), descriptor)?)
    }

    fn create_texture(&self, descriptor: TextureDescriptor) -> Result<Rc<dyn Texture>, Error> {
        Ok(WebGpuTexture::new(self.gpu.clone(), self.registry.clone(), descriptor, 1)?)
    }

    fn create_sampler(&self, descriptor: SamplerDescriptor) -> Result<Rc<dyn Sampler>, Error> {
        Ok(WebGpuSampler::new(&self.gpu, self.registry.clone(), descriptor)?)
    }

    fn create_render_target(
        &self,
        descriptor: RenderTargetDescriptor,
    ) -> Result<Rc<dyn RenderTarget>, Error> {
        Ok(WebGpuRenderTarget::new(
            self.gpu.clone(),
            self.registry.clone(),
            descriptor,
        )?)
    }

    fn create_render_target_from_texture(
        &self,
        texture: Rc<dyn Texture>,
    ) -> Result<Rc<dyn RenderTarget>, Error> {
        Ok(WebGpuRenderTarget::from_texture_with_samples(
            self.registry.clone(),
            texture,
            1,
        )?)
    }

    fn create_program(&self, descriptor: ProgramDescriptor) -> Result<Rc<dyn Program>, Error> {
        Ok(WebGpuProgram::new(
            &self.gpu,
            self.registry.clone(),
            descriptor,
            self.shader_compiler.as_ref(),
        )?)
    }

    fn create_input_layout(
        &self,
        descriptor: InputLayoutDescriptor,
    ) -> Result<Rc<dyn InputLayout>, Error> {
        Ok(WebGpuInputLayout::new(self.registry.clone(), descriptor)?)
    }

    fn create_render_pipeline(
        &self,
        descriptor: RenderPipelineDescriptor,
    ) -> Result<Rc<dyn RenderPipeline>, Error> {
        Ok(WebGpuRenderPipeline::new(self.registry.clone(), descriptor)?)
    }

    fn create_compute_pipeline(
        &self,
        descriptor: ComputePipelineDescriptor,
    ) -> Result<Rc<dyn ComputePipeline>, Error> {
        Ok(WebGpuComputePipeline::new(self.registry.clone(), descriptor)?)
    }

    fn create_bindings(&self, descriptor: BindingsDescriptor) -> Result<Rc<dyn Bindings>, Error> {
        Ok(WebGpuBindings::new(
            &self.gpu,
            self.registry.clone(),
            &self.fallbacks,
            descriptor,
        )?)
    }

    fn create_query_pool(
        &self,
        kind: QueryPoolKind,
        count: u32,
    ) -> Result<Rc<dyn QueryPool>, Error> {
        match kind {
            QueryPoolKind::Occlusion => {
                Ok(WebGpuQueryPool::new(&self.gpu, self.registry.clone(), count)?)
            }
        }
    }

    fn create_readback(&self) -> Result<Rc<dyn Readback>, Error> {
        Ok(WebGpuReadback::new(self.gpu.clone(), self.registry.clone())?)
    }

    fn create_render_pass(&self, descriptor: RenderPassDescriptor) -> Box<dyn RenderPass> {
        let (mut pass, generation) = self
            .render_pass_pool
            .acquire(|| Box::new(WebGpuRenderPass::default()));
        pass.begin(self.gpu.clone(), &descriptor, generation);
        pass
    }

    fn create_compute_pass(&self) -> Box<dyn ComputePass> {
        let (mut pass, generation) = self
            .compute_pass_pool
            .acquire(|| Box::new(WebGpuComputePass::default()));
        pass.begin(self.gpu.clone(), generation);
        pass
    }

    fn submit_pass(&self, pass: Box<dyn Pass>) {
        let any = pass.into_any();
        match any.downcast::<WebGpuRenderPass>() {
            Ok(mut render) => {
                let (command, query_pool) = render.finish();
                let generation = render.generation;
                self.enqueue(command);
                if let Some(pool) = query_pool {
                    let mut frame = self.frame.borrow_mut();
                    if frame.active {
                        frame.used_query_pools.push(pool);
                    } else {
                        drop(frame);
                        pool.as_any()
                            .downcast_ref::<WebGpuQueryPool>()
                            .expect("query pool from another backend")
                            .collect_results(&self.gpu);
                    }
                }
                self.render_pass_pool.release(render, generation);
            }
            Err(any) => {
                let mut compute = any
                    .downcast::<WebGpuComputePass>()
                    .expect("pass from another backend");
                let command = compute.finish();
                let generation = compute.generation;
                self.enqueue(command);
                self.compute_pass_pool.release(compute, generation);
            }
        }
    }

    fn begin_frame(&self) {
        let mut frame = self.frame.borrow_mut();
        assert!(!frame.active, "begin_frame inside an active frame");
        frame.active = true;
    }

    fn end_frame(&self) {
        let (pending, used_query_pools) = {
            let mut frame = self.frame.borrow_mut();
            assert!(frame.active, "end_frame without begin_frame");
            frame.active = false;
            (
                std::mem::take(&mut frame.pending),
                std::mem::take(&mut frame.used_query_pools),
            )
        };
        self.gpu.queue.submit(pending);
        for pool in used_query_pools {
            pool.as_any()
                .downcast_ref::<WebGpuQueryPool>()
                .expect("query pool from another backend")
                .collect_results(&self.gpu);
        }
    }

    fn copy_sub_texture_2d(
        &self,
        dst: &Rc<dyn Texture>,
        dst_x: u32,
        dst_y: u32,
        src: &Rc<dyn Texture>,
        src_x: u32,
        src_y: u32,
        width: u32,
        height: u32,
    ) {
        assert!(
            src.usage().contains(TextureUsage::COPY_SRC),
            "copy source lacks COPY_SRC"
        );
        assert!(
            dst.usage().contains(TextureUsage::COPY_DST),
            "copy destination lacks COPY_DST"
        );
        let src_native = src
            .as_any()
            .downcast_ref::<WebGpuTexture>()
            .expect("texture from another backend");
        let dst_native = dst
            .as_any()
            .downcast_ref::<WebGpuTexture>()
            .expect("texture from another backend");
        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
        encoder.copy_texture_to_texture(
            wgpu::TexelCopyTextureInfo {
                texture: src_native.raw(),
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: src_x,
                    y: src_y,
                    z: 0,
                },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyTextureInfo {
                texture: dst_native.raw(),
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: dst_x,
                    y: dst_y,
                    z: 0,
                },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.enqueue(encoder.finish());
    }

    fn query_limits(&self) -> DeviceLimits {
        DeviceLimits {
            uniform_buffer_word_alignment: self.native_limits.min_uniform_buffer_offset_alignment
                / 4,
            uniform_buffer_max_page_word_size: self.native_limits.max_uniform_buffer_binding_size
                / 4,
            supported_sample_counts: vec![1, 4],
            occlusion_queries_recommended: true,
            compute_shaders_supported: true,
            storage_buffers_supported: true,
            depth_texture_supported: true,
            anisotropy_supported: true,
            render_bundles_native: true,
        }
    }

    fn query_vendor_info(&self) -> VendorInfo {
        VendorInfo {
            platform: "WebGPU".to_string(),
            vendor: format!("0x{:04x}", self.adapter_info.vendor),
            renderer: self.adapter_info.name.clone(),
            glsl_version: "#version 440".to_string(),
            explicit_binding_locations: true,
            separate_sampler_textures: true,
        }
    }

    fn pipeline_query_ready(&self, pipeline: &Rc<dyn RenderPipeline>) -> bool {
        let pipeline = pipeline
            .as_any()
            .downcast_ref::<WebGpuRenderPipeline>()
            .expect("pipeline from another backend");
        // Compilation is deferred until queried or first bound; it completes
        // synchronously once started.
        pipeline.ensure_compiled(&self.gpu);
        true
    }

    fn pipeline_force_ready(&self, pipeline: &Rc<dyn RenderPipeline>) {
        let pipeline = pipeline
            .as_any()
            .downcast_ref::<WebGpuRenderPipeline>()
            .expect("pipeline from another backend");
        pipeline.ensure_compiled(&self.gpu);
    }

    fn set_resource_leak_check(&self, enabled: bool) {
        self.registry.borrow_mut().set_enabled(enabled);
    }

    fn check_for_leaks(&self) -> Vec<(u64, ResourceKind, Option<String>)> {
        let leaks = self.registry.borrow().leaks();
        for (id, kind, name) in &leaks {
            logwise::warn_sync!(
                "leaked resource id {id} kind {kind} name {name}",
                id = *id,
                kind = logwise::privacy::LogIt(kind),
                name = logwise::privacy::LogIt(name)
            );
        }
        leaks
    }
}
