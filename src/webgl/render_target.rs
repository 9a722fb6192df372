// SPDX-License-Identifier: MIT OR Apache-2.0

use std::any::Any;
use std::rc::Rc;

use glow::HasContext;

use crate::api::descriptors::RenderTargetDescriptor;
use crate::api::device::{ensure_resource_exists, Error, SharedResourceRegistry};
use crate::api::format::Format;
use crate::api::resource::{alloc_resource_id, RenderTarget, Resource, ResourceKind, Texture};
use crate::api::whoops;
use crate::webgl::caps::GlProfile;
use crate::webgl::device::Ctx;
use crate::webgl::texture::WebGlTexture;
use crate::webgl::translate;

enum Backing {
    /// Externally owned; `destroy` leaves it alone.
    Texture(Rc<dyn Texture>),
    Renderbuffer(glow::Renderbuffer),
}

pub(super) struct WebGlRenderTarget {
    id: u64,
    ctx: Rc<Ctx>,
    backing: Backing,
    format: Format,
    width: u32,
    height: u32,
    sample_count: u32,
    debug_name: Option<String>,
    registry: SharedResourceRegistry,
}

impl WebGlRenderTarget {
    /// Freshly created targets are renderbuffers: not samplable, but they
    /// support multisampling and cost no sampler state.
    pub(super) fn new(
        ctx: Rc<Ctx>,
        registry: SharedResourceRegistry,
        descriptor: RenderTargetDescriptor,
    ) -> Result<Rc<WebGlRenderTarget>, Error> {
        let gl = &ctx.gl;
        let internal = renderbuffer_internal_format(descriptor.format, ctx.caps.profile);
        let raw = ensure_resource_exists(unsafe { gl.create_renderbuffer() }, "renderbuffer")?;
        unsafe {
            gl.bind_renderbuffer(glow::RENDERBUFFER, Some(raw));
            if descriptor.sample_count > 1 {
                if ctx.caps.profile != GlProfile::WebGl2 {
                    whoops("multisampled targets need the modern profile");
                }
                gl.renderbuffer_storage_multisample(
                    glow::RENDERBUFFER,
                    descriptor.sample_count as i32,
                    internal,
                    descriptor.width as i32,
                    descriptor.height as i32,
                );
            } else {
                gl.renderbuffer_storage(
                    glow::RENDERBUFFER,
                    internal,
                    descriptor.width as i32,
                    descriptor.height as i32,
                );
            }
            gl.bind_renderbuffer(glow::RENDERBUFFER, None);
        }
        let id = alloc_resource_id();
        registry.borrow_mut().register(
            id,
            ResourceKind::RenderTarget,
            descriptor.debug_name.clone(),
        );
        Ok(Rc::new(WebGlRenderTarget {
            id,
            ctx,
            backing: Backing::Renderbuffer(raw),
            format: descriptor.format,
            width: descriptor.width,
            height: descriptor.height,
            sample_count: descriptor.sample_count,
            debug_name: descriptor.debug_name,
            registry,
        }))
    }

    pub(super) fn from_texture(
        ctx: Rc<Ctx>,
        registry: SharedResourceRegistry,
        texture: Rc<dyn Texture>,
    ) -> Result<Rc<WebGlRenderTarget>, Error> {
        let id = alloc_resource_id();
        registry
            .borrow_mut()
            .register(id, ResourceKind::RenderTarget, texture.debug_name());
        Ok(Rc::new(WebGlRenderTarget {
            id,
            ctx,
            format: texture.format(),
            width: texture.width(),
            height: texture.height(),
            sample_count: 1,
            debug_name: texture.debug_name(),
            backing: Backing::Texture(texture),
            registry,
        }))
    }

    /// Attaches to the currently bound framebuffer.
    pub(super) fn attach(&self, attachment: u32) {
        let gl = &self.ctx.gl;
        match &self.backing {
            Backing::Renderbuffer(raw) => unsafe {
                gl.framebuffer_renderbuffer(
                    glow::FRAMEBUFFER,
                    attachment,
                    glow::RENDERBUFFER,
                    Some(*raw),
                );
            },
            Backing::Texture(texture) => {
                let native = texture
                    .as_any()
                    .downcast_ref::<WebGlTexture>()
                    .expect("texture from another backend");
                let raw = match native.raw() {
                    Some(raw) => raw,
                    None => whoops("the onscreen texture attaches as the default framebuffer"),
                };
                unsafe {
                    gl.framebuffer_texture_2d(
                        glow::FRAMEBUFFER,
                        attachment,
                        glow::TEXTURE_2D,
                        Some(raw),
                        0,
                    );
                }
            }
        }
    }
}

/// Renderbuffer internal formats are a separate, smaller set on the legacy
/// profile; color falls back to RGBA4 there.
fn renderbuffer_internal_format(format: Format, profile: GlProfile) -> u32 {
    if profile == GlProfile::WebGl1 {
        return match format {
            Format::D16 => glow::DEPTH_COMPONENT16,
            Format::D24S8 => glow::DEPTH_STENCIL,
            f if f.has_depth() => {
                logwise::warn_sync!(
                    "legacy profile narrows {format} to a 16-bit depth renderbuffer",
                    format = logwise::privacy::LogIt(&format)
                );
                glow::DEPTH_COMPONENT16
            }
            _ => {
                logwise::warn_sync!(
                    "legacy profile renders {format} into an RGBA4 renderbuffer",
                    format = logwise::privacy::LogIt(&format)
                );
                glow::RGBA4
            }
        };
    }
    translate::texture_format(format, profile).internal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_profile_narrows_renderbuffer_formats() {
        let legacy = |format| renderbuffer_internal_format(format, GlProfile::WebGl1);
        assert_eq!(legacy(Format::D16), glow::DEPTH_COMPONENT16);
        assert_eq!(legacy(Format::D24S8), glow::DEPTH_STENCIL);
        assert_eq!(legacy(Format::D32F), glow::DEPTH_COMPONENT16);
        assert_eq!(legacy(Format::D32FS8), glow::DEPTH_COMPONENT16);
        assert_eq!(legacy(Format::U8RgbaNorm), glow::RGBA4);
    }
}

impl Resource for WebGlRenderTarget {
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
        if let Backing::Renderbuffer(raw) = &self.backing {
            unsafe { self.ctx.gl.delete_renderbuffer(*raw) };
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl RenderTarget for WebGlRenderTarget {
    fn format(&self) -> Format {
        self.format
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn sample_count(&self) -> u32 {
        self.sample_count
    }

    fn texture(&self) -> Option<Rc<dyn Texture>> {
        match &self.backing {
            Backing::Texture(texture) => Some(texture.clone()),
            Backing::Renderbuffer(_) => None,
        }
    }
}
