// SPDX-License-Identifier: MIT OR Apache-2.0

use std::any::Any;
use std::rc::Rc;

use crate::api::descriptors::{RenderTargetDescriptor, TextureDescriptor};
use crate::api::device::{Error, SharedResourceRegistry};
use crate::api::format::Format;
use crate::api::resource::{
    alloc_resource_id, RenderTarget, Resource, ResourceKind, Texture, TextureDimension,
    TextureUsage,
};
use crate::webgpu::device::Gpu;
use crate::webgpu::texture::WebGpuTexture;

/// Always texture-backed on this platform; [`RenderTarget::texture`] never
/// returns `None` here.
pub(super) struct WebGpuRenderTarget {
    id: u64,
    sample_count: u32,
    texture: Rc<dyn Texture>,
    view: wgpu::TextureView,
    debug_name: Option<String>,
    registry: SharedResourceRegistry,
}

impl WebGpuRenderTarget {
    pub(super) fn new(
        gpu: Rc<Gpu>,
        registry: SharedResourceRegistry,
        descriptor: RenderTargetDescriptor,
    ) -> Result<Rc<WebGpuRenderTarget>, Error> {
        let texture = WebGpuTexture::new(
            gpu,
            registry.clone(),
            TextureDescriptor {
                dimension: TextureDimension::D2,
                format: descriptor.format,
                width: descriptor.width,
                height: descriptor.height,
                depth_or_array_layers: 1,
                mip_level_count: 1,
                usage: TextureUsage::RENDER_TARGET,
                flip_y: false,
                debug_name: descriptor.debug_name.clone(),
            },
            descriptor.sample_count,
        )?;
        Self::from_texture_with_samples(registry, texture, descriptor.sample_count)
    }

    pub(super) fn from_texture_with_samples(
        registry: SharedResourceRegistry,
        texture: Rc<dyn Texture>,
        sample_count: u32,
    ) -> Result<Rc<WebGpuRenderTarget>, Error> {
        let view = texture
            .as_any()
            .downcast_ref::<WebGpuTexture>()
            .expect("texture from another backend")
            .view()
            .clone();
        let debug_name = texture.debug_name();
        let id = alloc_resource_id();
        registry
            .borrow_mut()
            .register(id, ResourceKind::RenderTarget, debug_name.clone());
        Ok(Rc::new(WebGpuRenderTarget {
            id,
            sample_count,
            texture,
            view,
            debug_name,
            registry,
        }))
    }

    pub(super) fn view(&self) -> &wgpu::TextureView {
        &self.view
    }
}

impl Resource for WebGpuRenderTarget {
    fn id(&self) -> u64 {
        self.id
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::RenderTarget
    }

    fn debug_name(&self) -> Option<String> {
        self.debug_name.clone()
    }

    fn destroy(&self) {
        self.registry.borrow_mut().unregister(self.id);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl RenderTarget for WebGpuRenderTarget {
    fn format(&self) -> Format {
        self.texture.format()
    }

    fn width(&self) -> u32 {
        self.texture.width()
    }

    fn height(&self) -> u32 {
        self.texture.height()
    }

    fn sample_count(&self) -> u32 {
        self.sample_count
    }

    fn texture(&self) -> Option<Rc<dyn Texture>> {
        Some(self.texture.clone())
    }
}
