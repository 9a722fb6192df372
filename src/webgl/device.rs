// SPDX-License-Identifier: MIT OR Apache-2.0
//! The GL device: resource factories, frame lifecycle and pass submission.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use glow::HasContext;

use crate::api::descriptors::{
    BindingsDescriptor, BufferDescriptor, ComputePipelineDescriptor, InputLayoutDescriptor,
    QueryPoolKind, RenderPassDescriptor, RenderPipelineDescriptor, RenderTargetDescriptor,
    SamplerDescriptor, TextureDescriptor,
};
use crate::api::device::{
    ensure_resource_exists, Device, DeviceLimits, Error, ResourceRegistry, SharedResourceRegistry,
    VendorInfo,
};
use crate::api::pass::{ComputePass, Pass, RenderPass};
use crate::api::resource::{
    Bindings, Buffer, ComputePipeline, InputLayout, Program, QueryPool, Readback, RenderPipeline,
    RenderTarget, ResourceKind, Sampler, Texture, TextureDimension, TextureUsage,
};
use crate::api::shader::{ProgramDescriptor, ShaderCompiler};
use crate::api::whoops;
use crate::pool::Pool;
use crate::webgl::bindings::WebGlBindings;
use crate::webgl::buffer::WebGlBuffer;
use crate::webgl::caps::{Caps, GlProfile};
use crate::webgl::pass::WebGlRenderPass;
use crate::webgl::pipeline::{WebGlInputLayout, WebGlRenderPipeline};
use crate::webgl::program::WebGlProgram;
use crate::webgl::query::WebGlQueryPool;
use crate::webgl::readback::WebGlReadback;
use crate::webgl::render_target::WebGlRenderTarget;
use crate::webgl::sampler::WebGlSampler;
use crate::webgl::state::StateCache;
use crate::webgl::texture::WebGlTexture;

/// The native context plus its capability snapshot, shared by every resource.
pub(super) struct Ctx {
    pub gl: glow::Context,
    pub caps: Caps,
    /// 1×1 black textures substituted for unset sampler bindings, keyed by
    /// dimension.
    fallback_textures: RefCell<HashMap<TextureDimension, (u32, glow::Texture)>>,
    fallback_sampler: Cell<Option<glow::Sampler>>,
}

impl Ctx {
    pub(super) fn fallback_texture(&self, dimension: TextureDimension) -> (u32, glow::Texture) {
        if let Some(&entry) = self.fallback_textures.borrow().get(&dimension) {
            return entry;
        }
        let gl = &self.gl;
        let target = match dimension {
            TextureDimension::D2 => glow::TEXTURE_2D,
            TextureDimension::Cube => glow::TEXTURE_CUBE_MAP,
            TextureDimension::D2Array => glow::TEXTURE_2D_ARRAY,
            TextureDimension::D3 => glow::TEXTURE_3D,
        };
        let internal = match self.caps.profile {
            GlProfile::WebGl2 => glow::RGBA8,
            GlProfile::WebGl1 => glow::RGBA,
        };
        let raw = unsafe { gl.create_texture() }.expect("fallback texture creation failed");
        let black = [0u8, 0, 0, 255];
        unsafe {
            gl.bind_texture(target, Some(raw));
            match dimension {
                TextureDimension::D2 => gl.tex_image_2d(
                    target,
                    0,
                    internal as i32,
                    1,
                    1,
                    0,
                    glow::RGBA,
                    glow::UNSIGNED_BYTE,
                    glow::PixelUnpackData::Slice(Some(&black)),
                ),
                TextureDimension::Cube => {
                    for face in 0..6 {
                        gl.tex_image_2d(
                            glow::TEXTURE_CUBE_MAP_POSITIVE_X + face,
                            0,
                            internal as i32,
                            1,
                            1,
                            0,
                            glow::RGBA,
                            glow::UNSIGNED_BYTE,
                            glow::PixelUnpackData::Slice(Some(&black)),
                        );
                    }
                }
                TextureDimension::D2Array | TextureDimension::D3 => gl.tex_image_3d(
                    target,
                    0,
                    internal as i32,
                    1,
                    1,
                    1,
                    0,
                    glow::RGBA,
                    glow::UNSIGNED_BYTE,
                    glow::PixelUnpackData::Slice(Some(&black)),
                ),
            }
            gl.tex_parameter_i32(target, glow::TEXTURE_MIN_FILTER, glow::NEAREST as i32);
            gl.tex_parameter_i32(target, glow::TEXTURE_MAG_FILTER, glow::NEAREST as i32);
            gl.tex_parameter_i32(target, glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE as i32);
            gl.tex_parameter_i32(target, glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE as i32);
            gl.bind_texture(target, None);
        }
        self.fallback_textures
            .borrow_mut()
            .insert(dimension, (target, raw));
        (target, raw)
    }

    /// Clamped nearest sampler for unset sampler bindings; modern profile
    /// only.
    pub(super) fn fallback_sampler(&self) -> glow::Sampler {
        if let Some(sampler) = self.fallback_sampler.get() {
            return sampler;
        }
        let gl = &self.gl;
        let sampler = unsafe { gl.create_sampler() }.expect("fallback sampler creation failed");
        unsafe {
            gl.sampler_parameter_i32(sampler, glow::TEXTURE_MIN_FILTER, glow::NEAREST as i32);
            gl.sampler_parameter_i32(sampler, glow::TEXTURE_MAG_FILTER, glow::NEAREST as i32);
            gl.sampler_parameter_i32(sampler, glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE as i32);
            gl.sampler_parameter_i32(sampler, glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE as i32);
        }
        self.fallback_sampler.set(Some(sampler));
        sampler
    }
}

pub struct WebGlDevice {
    pub(super) ctx: Rc<Ctx>,
    state: Rc<RefCell<StateCache>>,
    registry: SharedResourceRegistry,
    shader_compiler: Option<Rc<dyn ShaderCompiler>>,
    vendor: String,
    renderer: String,
    uniform_buffer_word_alignment: u32,
    uniform_buffer_max_page_word_size: u32,
    frame_active: Cell<bool>,
    copy_framebuffer: Cell<Option<glow::Framebuffer>>,
    render_pass_pool: Pool<Box<WebGlRenderPass>>,
}

impl WebGlDevice {
    pub(super) fn new(
        gl: glow::Context,
        profile: GlProfile,
        shader_compiler: Option<Rc<dyn ShaderCompiler>>,
    ) -> Result<Rc<WebGlDevice>, Error> {
        let caps = Caps::probe(&gl, profile);
        let vendor = unsafe { gl.get_parameter_string(glow::VENDOR) };
        let renderer = unsafe { gl.get_parameter_string(glow::RENDERER) };
        let (alignment, max_block) = if caps.uniform_buffers {
            unsafe {
                (
                    gl.get_parameter_i32(glow::UNIFORM_BUFFER_OFFSET_ALIGNMENT) as u32,
                    gl.get_parameter_i32(glow::MAX_UNIFORM_BLOCK_SIZE) as u32,
                )
            }
        } else {
            // The legacy path packs vec4 arrays; one vec4 is the granule.
            (16, 16 * 1024)
        };
        unsafe {
            gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            gl.pixel_store_i32(glow::PACK_ALIGNMENT, 1);
        }
        // Attribute state needs a live VAO on core contexts; one default
        // array serves the whole device.
        if profile == GlProfile::WebGl2 {
            let vao = ensure_resource_exists(unsafe { gl.create_vertex_array() }, "vertex array")?;
            unsafe { gl.bind_vertex_array(Some(vao)) };
        }
        logwise::info_sync!(
            "device ready on {renderer}",
            renderer = logwise::privacy::LogIt(&renderer)
        );
        Ok(Rc::new(WebGlDevice {
            ctx: Rc::new(Ctx {
                gl,
                caps,
                fallback_textures: RefCell::new(HashMap::new()),
                fallback_sampler: Cell::new(None),
            }),
            state: Rc::new(RefCell::new(StateCache::new())),
            registry: Rc::new(RefCell::new(ResourceRegistry::default())),
            shader_compiler,
            vendor,
            renderer,
            uniform_buffer_word_alignment: alignment / 4,
            uniform_buffer_max_page_word_size: max_block / 4,
            frame_active: Cell::new(false),
            copy_framebuffer: Cell::new(None),
            render_pass_pool: Pool::new(),
        }))
    }
}

impl Device for WebGlDevice {
    fn create_buffer(&self, descriptor: BufferDescriptor) -> Result<Rc<dyn Buffer>, Error> {
        Ok(WebGlBuffer::new(self.ctx.clone(), self.registry.clone(), descriptor)?)
    }

    fn create_texture(&self, descriptor: TextureDescriptor) -> Result<Rc<dyn Texture>, Error> {
        Ok(WebGlTexture::new(self.ctx.clone(), self.registry.clone(), descriptor)?)
    }

    fn create_sampler(&self, descriptor: SamplerDescriptor) -> Result<Rc<dyn Sampler>, Error> {
        Ok(WebGlSampler::new(self.ctx.clone(), self.registry.clone(), descriptor)?)
    }

    fn create_render_target(
        &self,
        descriptor: RenderTargetDescriptor,
    ) -> Result<Rc<dyn RenderTarget>, Error> {
        Ok(WebGlRenderTarget::new(
            self.ctx.clone(),
            self.registry.clone(),
            descriptor,
        )?)
    }

    fn create_render_target_from_texture(
        &self,
        texture: Rc<dyn Texture>,
    ) -> Result<Rc<dyn RenderTarget>, Error> {
        Ok(WebGlRenderTarget::from_texture(
            self.ctx.clone(),
            self.registry.clone(),
            texture,
        )?)
    }

    fn create_program(&self, descriptor: ProgramDescriptor) -> Result<Rc<dyn Program>, Error> {
        Ok(WebGlProgram::new(
            self.ctx.clone(),
            self.registry.clone(),
            descriptor,
            self.shader_compiler.as_ref(),
        )?)
    }

    fn create_input_layout(
        &self,
        descriptor: InputLayoutDescriptor,
    ) -> Result<Rc<dyn InputLayout>, Error> {
        Ok(WebGlInputLayout::new(self.registry.clone(), descriptor)?)
    }

    fn create_render_pipeline(
        &self,
        descriptor: RenderPipelineDescriptor,
    ) -> Result<Rc<dyn RenderPipeline>, Error> {
        Ok(WebGlRenderPipeline::new(self.registry.clone(), descriptor)?)
    }

    fn create_compute_pipeline(
        &self,
        _descriptor: ComputePipelineDescriptor,
    ) -> Result<Rc<dyn ComputePipeline>, Error> {
        Err(Error::Unsupported("compute pipelines"))
    }

    fn create_bindings(&self, descriptor: BindingsDescriptor) -> Result<Rc<dyn Bindings>, Error> {
        Ok(WebGlBindings::new(self.registry.clone(), descriptor)?)
    }

    fn create_query_pool(
        &self,
        kind: QueryPoolKind,
        count: u32,
    ) -> Result<Rc<dyn QueryPool>, Error> {
        match kind {
            QueryPoolKind::Occlusion => Ok(WebGlQueryPool::new(
                self.ctx.clone(),
                self.registry.clone(),
                count,
            )?),
        }
    }

    fn create_readback(&self) -> Result<Rc<dyn Readback>, Error> {
        Ok(WebGlReadback::new(self.ctx.clone(), self.registry.clone())?)
    }

    fn create_render_pass(&self, descriptor: RenderPassDescriptor) -> Box<dyn RenderPass> {
        let (mut pass, generation) = self
            .render_pass_pool
            .acquire(|| Box::new(WebGlRenderPass::default()));
        pass.begin(self.ctx.clone(), self.state.clone(), &descriptor, generation);
        pass
    }

    fn create_compute_pass(&self) -> Box<dyn ComputePass> {
        whoops("compute passes are not available on this backend");
    }

    fn submit_pass(&self, pass: Box<dyn Pass>) {
        // Recording already executed; finalize and recycle.
        let mut render = pass
            .into_any()
            .downcast::<WebGlRenderPass>()
            .expect("pass from another backend");
        render.finish();
        let generation = render.generation;
        self.render_pass_pool.release(render, generation);
    }

    fn begin_frame(&self) {
        assert!(!self.frame_active.get(), "begin_frame inside an active frame");
        self.frame_active.set(true);
    }

    fn end_frame(&self) {
        assert!(self.frame_active.get(), "end_frame without begin_frame");
        self.frame_active.set(false);
        unsafe { self.ctx.gl.flush() };
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
            .downcast_ref::<WebGlTexture>()
            .expect("texture from another backend");
        let dst_native = dst
            .as_any()
            .downcast_ref::<WebGlTexture>()
            .expect("texture from another backend");
        let dst_raw = match dst_native.raw() {
            Some(raw) => raw,
            None => whoops("the onscreen texture cannot be a copy destination"),
        };
        let gl = &self.ctx.gl;
        unsafe {
            match src_native.raw() {
                Some(src_raw) => {
                    if self.copy_framebuffer.get().is_none() {
                        self.copy_framebuffer.set(Some(
                            gl.create_framebuffer().expect("framebuffer creation failed"),
                        ));
                    }
                    gl.bind_framebuffer(glow::FRAMEBUFFER, self.copy_framebuffer.get());
                    gl.framebuffer_texture_2d(
                        glow::FRAMEBUFFER,
                        glow::COLOR_ATTACHMENT0,
                        glow::TEXTURE_2D,
                        Some(src_raw),
                        0,
                    );
                }
                // Copies from the onscreen texture read the default
                // framebuffer.
                None => gl.bind_framebuffer(glow::FRAMEBUFFER, None),
            }
            gl.bind_texture(dst_native.target(), Some(dst_raw));
            gl.copy_tex_sub_image_2d(
                dst_native.target(),
                0,
                dst_x as i32,
                dst_y as i32,
                src_x as i32,
                src_y as i32,
                width as i32,
                height as i32,
            );
            gl.bind_texture(dst_native.target(), None);
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);
        }
    }

    fn query_limits(&self) -> DeviceLimits {
        DeviceLimits {
            uniform_buffer_word_alignment: self.uniform_buffer_word_alignment,
            uniform_buffer_max_page_word_size: self.uniform_buffer_max_page_word_size,
            supported_sample_counts: match self.ctx.caps.profile {
                GlProfile::WebGl2 => vec![1, 4],
                GlProfile::WebGl1 => vec![1],
            },
            occlusion_queries_recommended: self.ctx.caps.occlusion_queries,
            compute_shaders_supported: false,
            storage_buffers_supported: false,
            depth_texture_supported: self.ctx.caps.depth_texture,
            anisotropy_supported: self.ctx.caps.max_anisotropy > 1,
            render_bundles_native: false,
        }
    }

    fn query_vendor_info(&self) -> VendorInfo {
        let (platform, glsl_version) = match self.ctx.caps.profile {
            GlProfile::WebGl2 => ("WebGL2", "#version 300 es"),
            GlProfile::WebGl1 => ("WebGL1", "#version 100"),
        };
        VendorInfo {
            platform: platform.to_string(),
            vendor: self.vendor.clone(),
            renderer: self.renderer.clone(),
            glsl_version: glsl_version.to_string(),
            explicit_binding_locations: false,
            separate_sampler_textures: false,
        }
    }

    fn pipeline_query_ready(&self, _pipeline: &Rc<dyn RenderPipeline>) -> bool {
        // Programs compile eagerly at creation.
        true
    }

    fn pipeline_force_ready(&self, _pipeline: &Rc<dyn RenderPipeline>) {}

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
