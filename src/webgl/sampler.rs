// SPDX-License-Identifier: MIT OR Apache-2.0
//! Sampling state.
//!
//! On the modern profile this is a native sampler object. The legacy profile
//! has no sampler objects, so the descriptor is kept and applied to whatever
//! texture is bound at draw time, after the non-power-of-two fixup.

use std::any::Any;
use std::rc::Rc;

use glow::HasContext;

use crate::api::descriptors::{FilterMode, MipmapFilterMode, SamplerDescriptor};
use crate::api::device::{ensure_resource_exists, Error, SharedResourceRegistry};
use crate::api::resource::{alloc_resource_id, Resource, ResourceKind, Sampler};
use crate::api::whoops;
use crate::webgl::caps::GlProfile;
use crate::webgl::device::Ctx;
use crate::webgl::translate;

/// Texture-parameter form of a sampler, for the legacy per-texture path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct LegacyTextureParameters {
    pub min_filter: u32,
    pub mag_filter: u32,
    pub wrap_s: u32,
    pub wrap_t: u32,
}

/// Resolves sampler state against a texture's dimensions.
///
/// Without full non-power-of-two support, NPOT textures are only complete
/// with clamped wrapping and no mipmaps; sampling falls back to LINEAR +
/// CLAMP_TO_EDGE rather than rendering black.
pub(super) fn resolve_texture_parameters(
    descriptor: &SamplerDescriptor,
    width: u32,
    height: u32,
    npot_supported: bool,
) -> LegacyTextureParameters {
    let npot = !width.is_power_of_two() || !height.is_power_of_two();
    if npot && !npot_supported {
        return LegacyTextureParameters {
            min_filter: glow::LINEAR,
            mag_filter: glow::LINEAR,
            wrap_s: glow::CLAMP_TO_EDGE,
            wrap_t: glow::CLAMP_TO_EDGE,
        };
    }
    LegacyTextureParameters {
        min_filter: translate::min_filter(descriptor.min_filter, descriptor.mipmap_filter),
        mag_filter: translate::mag_filter(descriptor.mag_filter),
        wrap_s: translate::address_mode(descriptor.address_mode_u),
        wrap_t: translate::address_mode(descriptor.address_mode_v),
    }
}

pub(super) struct WebGlSampler {
    id: u64,
    ctx: Rc<Ctx>,
    raw: Option<glow::Sampler>,
    descriptor: SamplerDescriptor,
    registry: SharedResourceRegistry,
}

impl WebGlSampler {
    pub(super) fn new(
        ctx: Rc<Ctx>,
        registry: SharedResourceRegistry,
        descriptor: SamplerDescriptor,
    ) -> Result<Rc<WebGlSampler>, Error> {
        if descriptor.max_anisotropy > 1
            && (descriptor.min_filter != FilterMode::Linear
                || descriptor.mag_filter != FilterMode::Linear
                || descriptor.mipmap_filter != MipmapFilterMode::Linear)
        {
            whoops("anisotropic filtering requires trilinear sampling");
        }
        let raw = if ctx.caps.sampler_objects {
            let gl = &ctx.gl;
            let raw = ensure_resource_exists(unsafe { gl.create_sampler() }, "sampler")?;
            unsafe {
                gl.sampler_parameter_i32(
                    raw,
                    glow::TEXTURE_WRAP_S,
                    translate::address_mode(descriptor.address_mode_u) as i32,
                );
                gl.sampler_parameter_i32(
                    raw,
                    glow::TEXTURE_WRAP_T,
                    translate::address_mode(descriptor.address_mode_v) as i32,
                );
                gl.sampler_parameter_i32(
                    raw,
                    glow::TEXTURE_WRAP_R,
                    translate::address_mode(descriptor.address_mode_w) as i32,
                );
                gl.sampler_parameter_i32(
                    raw,
                    glow::TEXTURE_MIN_FILTER,
                    translate::min_filter(descriptor.min_filter, descriptor.mipmap_filter) as i32,
                );
                gl.sampler_parameter_i32(
                    raw,
                    glow::TEXTURE_MAG_FILTER,
                    translate::mag_filter(descriptor.mag_filter) as i32,
                );
                gl.sampler_parameter_f32(raw, glow::TEXTURE_MIN_LOD, descriptor.lod_min_clamp);
                let max_lod = match descriptor.mipmap_filter {
                    MipmapFilterMode::NoMip => 0.0,
                    _ => descriptor.lod_max_clamp,
                };
                gl.sampler_parameter_f32(raw, glow::TEXTURE_MAX_LOD, max_lod);
                if let Some(compare) = descriptor.compare {
                    gl.sampler_parameter_i32(
                        raw,
                        glow::TEXTURE_COMPARE_MODE,
                        glow::COMPARE_REF_TO_TEXTURE as i32,
                    );
                    gl.sampler_parameter_i32(
                        raw,
                        glow::TEXTURE_COMPARE_FUNC,
                        translate::compare_function(compare) as i32,
                    );
                }
                if descriptor.max_anisotropy > 1 && ctx.caps.max_anisotropy > 1 {
                    gl.sampler_parameter_f32(
                        raw,
                        glow::TEXTURE_MAX_ANISOTROPY_EXT,
                        descriptor.max_anisotropy.min(ctx.caps.max_anisotropy) as f32,
                    );
                }
            }
            Some(raw)
        } else {
            None
        };
        let id = alloc_resource_id();
        registry
            .borrow_mut()
            .register(id, ResourceKind::Sampler, None);
        Ok(Rc::new(WebGlSampler {
            id,
            ctx,
            raw,
            descriptor,
            registry,
        }))
    }

    pub(super) fn raw(&self) -> Option<glow::Sampler> {
        self.raw
    }

    pub(super) fn descriptor(&self) -> &SamplerDescriptor {
        &self.descriptor
    }
}

impl Resource for WebGlSampler {
    fn id(&self) -> u64 {
        self.id
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::Sampler
    }

    fn debug_name(&self) -> Option<String> {
        None
    }

    fn destroy(&self) {
        self.registry.borrow_mut().unregister(self.id);
        if let Some(raw) = self.raw {
            unsafe { self.ctx.gl.delete_sampler(raw) };
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Sampler for WebGlSampler {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::descriptors::AddressMode;

    fn repeat_mipmapped() -> SamplerDescriptor {
        SamplerDescriptor {
            address_mode_u: AddressMode::Repeat,
            address_mode_v: AddressMode::Repeat,
            min_filter: FilterMode::Nearest,
            mag_filter: FilterMode::Nearest,
            mipmap_filter: MipmapFilterMode::Linear,
            ..Default::default()
        }
    }

    #[test]
    fn npot_without_support_falls_back_to_clamped_linear() {
        let resolved = resolve_texture_parameters(&repeat_mipmapped(), 100, 64, false);
        assert_eq!(
            resolved,
            LegacyTextureParameters {
                min_filter: glow::LINEAR,
                mag_filter: glow::LINEAR,
                wrap_s: glow::CLAMP_TO_EDGE,
                wrap_t: glow::CLAMP_TO_EDGE,
            }
        );
    }

    #[test]
    fn pot_textures_keep_requested_state() {
        let resolved = resolve_texture_parameters(&repeat_mipmapped(), 128, 64, false);
        assert_eq!(resolved.min_filter, glow::NEAREST_MIPMAP_LINEAR);
        assert_eq!(resolved.wrap_s, glow::REPEAT);
    }

    #[test]
    fn npot_with_support_keeps_requested_state() {
        let resolved = resolve_texture_parameters(&repeat_mipmapped(), 100, 64, true);
        assert_eq!(resolved.wrap_s, glow::REPEAT);
        assert_eq!(resolved.min_filter, glow::NEAREST_MIPMAP_LINEAR);
    }
}
