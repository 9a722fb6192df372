// SPDX-License-Identifier: MIT OR Apache-2.0
//! One-time capability probe.
//!
//! Capabilities are detected once at device construction and threaded into
//! every resource constructor; nothing re-queries the context per resource.

use glow::HasContext;

/// Which GL profile the supplied context speaks. The crate cannot detect
/// this reliably, so the embedder declares it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlProfile {
    WebGl1,
    WebGl2,
}

#[derive(Debug, Clone)]
pub(super) struct Caps {
    pub profile: GlProfile,
    /// Sampler objects decouple sampling state from texture objects.
    pub sampler_objects: bool,
    pub uniform_buffers: bool,
    pub instanced_drawing: bool,
    pub occlusion_queries: bool,
    pub depth_texture: bool,
    /// Full non-power-of-two support (mipmaps, repeat wrapping).
    pub npot_textures: bool,
    pub compressed_bc: bool,
    pub debug_markers: bool,
    pub max_anisotropy: u16,
}

impl Caps {
    pub fn probe(gl: &glow::Context, profile: GlProfile) -> Caps {
        let extensions = gl.supported_extensions();
        let has = |name: &str| {
            extensions.contains(name) || extensions.contains(&format!("GL_{name}"))
        };
        let gl2 = profile == GlProfile::WebGl2;
        let max_anisotropy = if has("EXT_texture_filter_anisotropic") {
            unsafe { gl.get_parameter_i32(glow::MAX_TEXTURE_MAX_ANISOTROPY_EXT) as u16 }
        } else {
            1
        };
        Caps {
            profile,
            sampler_objects: gl2,
            uniform_buffers: gl2,
            instanced_drawing: gl2 || has("ANGLE_instanced_arrays"),
            occlusion_queries: gl2,
            depth_texture: gl2 || has("WEBGL_depth_texture") || has("OES_depth_texture"),
            npot_textures: gl2,
            compressed_bc: has("WEBGL_compressed_texture_s3tc")
                || has("EXT_texture_compression_s3tc"),
            debug_markers: has("KHR_debug"),
            max_anisotropy,
        }
    }
}
