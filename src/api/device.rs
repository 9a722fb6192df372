// SPDX-License-Identifier: MIT OR Apache-2.0
//! The `Device` trait: top-level factory and frame-lifecycle manager.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::api::descriptors::{
    BindingsDescriptor, BufferDescriptor, ComputePipelineDescriptor, InputLayoutDescriptor,
    QueryPoolKind, RenderPassDescriptor, RenderPipelineDescriptor, RenderTargetDescriptor,
    SamplerDescriptor, TextureDescriptor,
};
use crate::api::pass::{ComputePass, Pass, RenderPass};
use crate::api::resource::{
    Bindings, Buffer, ComputePipeline, InputLayout, Program, QueryPool, Readback, RenderPipeline,
    RenderTarget, ResourceKind, Sampler, Texture,
};
use crate::api::shader::ProgramDescriptor;

/// Errors surfaced for fallible native operations.
///
/// Programmer errors (descriptor misconfiguration) never appear here; those
/// panic, see [`crate::api::whoops`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("native resource creation failed: {0}")]
    ResourceCreation(String),
    #[error("not implemented on this backend: {0}")]
    Unsupported(&'static str),
    #[error("shader compilation failed: {0}")]
    ShaderCompilation(String),
    #[error("readback failed: {0}")]
    Readback(String),
    #[error("device lost: {0}")]
    DeviceLost(String),
}

/// Guard mapping a nullable native handle into [`Error::ResourceCreation`].
pub(crate) fn ensure_resource_exists<T>(
    handle: Result<T, String>,
    what: &str,
) -> Result<T, Error> {
    handle.map_err(|e| Error::ResourceCreation(format!("{what}: {e}")))
}

/// Backend identification for vendor-info queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorInfo {
    /// `"WebGPU"`, `"WebGL1"` or `"WebGL2"`.
    pub platform: String,
    pub vendor: String,
    pub renderer: String,
    /// GLSL version string the platform consumes, e.g. `"#version 300 es"`.
    pub glsl_version: String,
    pub explicit_binding_locations: bool,
    pub separate_sampler_textures: bool,
}

/// Capability/limit snapshot, probed once at device construction and handed
/// to every resource constructor instead of re-detecting per resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceLimits {
    pub uniform_buffer_word_alignment: u32,
    pub uniform_buffer_max_page_word_size: u32,
    pub supported_sample_counts: Vec<u32>,
    pub occlusion_queries_recommended: bool,
    pub compute_shaders_supported: bool,
    pub storage_buffers_supported: bool,
    pub depth_texture_supported: bool,
    pub anisotropy_supported: bool,
    pub render_bundles_native: bool,
}

/// Advisory leak instrumentation shared by both backends.
///
/// Tracks live resource ids while enabled; `destroy` unregisters. Not
/// enforced automatically; callers opt in around the code they audit.
#[derive(Debug, Default)]
pub(crate) struct ResourceRegistry {
    enabled: bool,
    live: HashMap<u64, (ResourceKind, Option<String>)>,
}

impl ResourceRegistry {
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.live.clear();
        }
    }

    pub fn register(&mut self, id: u64, kind: ResourceKind, name: Option<String>) {
        if self.enabled {
            self.live.insert(id, (kind, name));
        }
    }

    pub fn unregister(&mut self, id: u64) {
        self.live.remove(&id);
    }

    pub fn leaks(&self) -> Vec<(u64, ResourceKind, Option<String>)> {
        let mut leaks: Vec<_> = self
            .live
            .iter()
            .map(|(&id, (kind, name))| (id, *kind, name.clone()))
            .collect();
        leaks.sort_by_key(|(id, ..)| *id);
        leaks
    }
}

pub(crate) type SharedResourceRegistry = Rc<RefCell<ResourceRegistry>>;

/// Top-level factory and frame-lifecycle manager.
///
/// `begin_frame`/`end_frame` bracket exactly one frame; passes created within
/// it are finalized by `submit_pass` in call order, and that order is the
/// cross-pass execution order. There is no reordering contract.
pub trait Device {
    fn create_buffer(&self, descriptor: BufferDescriptor) -> Result<Rc<dyn Buffer>, Error>;
    fn create_texture(&self, descriptor: TextureDescriptor) -> Result<Rc<dyn Texture>, Error>;
    fn create_sampler(&self, descriptor: SamplerDescriptor) -> Result<Rc<dyn Sampler>, Error>;
    fn create_render_target(
        &self,
        descriptor: RenderTargetDescriptor,
    ) -> Result<Rc<dyn RenderTarget>, Error>;
    fn create_render_target_from_texture(
        &self,
        texture: Rc<dyn Texture>,
    ) -> Result<Rc<dyn RenderTarget>, Error>;
    fn create_program(&self, descriptor: ProgramDescriptor) -> Result<Rc<dyn Program>, Error>;
    fn create_input_layout(
        &self,
        descriptor: InputLayoutDescriptor,
    ) -> Result<Rc<dyn InputLayout>, Error>;
    fn create_render_pipeline(
        &self,
        descriptor: RenderPipelineDescriptor,
    ) -> Result<Rc<dyn RenderPipeline>, Error>;
    fn create_compute_pipeline(
        &self,
        descriptor: ComputePipelineDescriptor,
    ) -> Result<Rc<dyn ComputePipeline>, Error>;
    fn create_bindings(&self, descriptor: BindingsDescriptor) -> Result<Rc<dyn Bindings>, Error>;
    fn create_query_pool(
        &self,
        kind: QueryPoolKind,
        count: u32,
    ) -> Result<Rc<dyn QueryPool>, Error>;
    fn create_readback(&self) -> Result<Rc<dyn Readback>, Error>;

    /// Checks out a pooled pass object and begins recording.
    fn create_render_pass(&self, descriptor: RenderPassDescriptor) -> Box<dyn RenderPass>;
    fn create_compute_pass(&self) -> Box<dyn ComputePass>;
    /// Finalizes the pass and recycles the backing object.
    fn submit_pass(&self, pass: Box<dyn Pass>);

    fn begin_frame(&self);
    fn end_frame(&self);

    /// GPU-side texture-to-texture blit of matching-sized regions. Asserts
    /// `COPY_SRC` on the source and `COPY_DST` on the destination; a
    /// missing flag indicates a resource-creation bug and is fatal.
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
    );

    fn query_limits(&self) -> DeviceLimits;
    fn query_vendor_info(&self) -> VendorInfo;

    /// Whether the pipeline's native object has finished (possibly
    /// deferred) compilation. Always true on GL, which compiles eagerly.
    fn pipeline_query_ready(&self, pipeline: &Rc<dyn RenderPipeline>) -> bool;
    /// Forces compilation to completion before the next use.
    fn pipeline_force_ready(&self, pipeline: &Rc<dyn RenderPipeline>);

    fn set_resource_leak_check(&self, enabled: bool);
    /// Returns the currently tracked live resources; also logs them.
    fn check_for_leaks(&self) -> Vec<(u64, ResourceKind, Option<String>)>;
}
