// SPDX-License-Identifier: MIT OR Apache-2.0

use std::any::Any;
use std::rc::Rc;

use glow::HasContext;

use crate::api::descriptors::TextureDescriptor;
use crate::api::device::{ensure_resource_exists, Error, SharedResourceRegistry};
use crate::api::format::Format;
use crate::api::resource::{
    alloc_resource_id, Resource, ResourceKind, Texture, TextureDimension, TextureUsage,
};
use crate::api::whoops;
use crate::webgl::caps::GlProfile;
use crate::webgl::device::Ctx;
use crate::webgl::translate;

fn bind_target(dimension: TextureDimension, profile: GlProfile) -> u32 {
    match dimension {
        TextureDimension::D2 => glow::TEXTURE_2D,
        TextureDimension::Cube => glow::TEXTURE_CUBE_MAP,
        TextureDimension::D2Array if profile == GlProfile::WebGl2 => glow::TEXTURE_2D_ARRAY,
        TextureDimension::D3 if profile == GlProfile::WebGl2 => glow::TEXTURE_3D,
        other => whoops(&format!(
            "texture dimension {other:?} needs the modern profile"
        )),
    }
}

pub(super) struct WebGlTexture {
    id: u64,
    ctx: Rc<Ctx>,
    /// `None` stands for the default framebuffer's color surface, which has
    /// no texture object to bind.
    raw: Option<glow::Texture>,
    target: u32,
    descriptor: TextureDescriptor,
    registry: SharedResourceRegistry,
}

impl WebGlTexture {
    pub(super) fn new(
        ctx: Rc<Ctx>,
        registry: SharedResourceRegistry,
        descriptor: TextureDescriptor,
    ) -> Result<Rc<WebGlTexture>, Error> {
        let profile = ctx.caps.profile;
        let target = bind_target(descriptor.dimension, profile);
        let tex = translate::texture_format(descriptor.format, profile);
        let gl = &ctx.gl;
        let raw = ensure_resource_exists(unsafe { gl.create_texture() }, "texture")?;
        unsafe {
            gl.bind_texture(target, Some(raw));
            match profile {
                GlProfile::WebGl2 => match descriptor.dimension {
                    TextureDimension::D2 | TextureDimension::Cube => gl.tex_storage_2d(
                        target,
                        descriptor.mip_level_count as i32,
                        tex.internal,
                        descriptor.width as i32,
                        descriptor.height as i32,
                    ),
                    TextureDimension::D2Array | TextureDimension::D3 => gl.tex_storage_3d(
                        target,
                        descriptor.mip_level_count as i32,
                        tex.internal,
                        descriptor.width as i32,
                        descriptor.height as i32,
                        descriptor.depth_or_array_layers as i32,
                    ),
                },
                GlProfile::WebGl1 => {
                    // No immutable storage here; levels are defined up front
                    // with null data so attachments and uploads agree on the
                    // full mip chain. Compressed levels are defined at upload.
                    if !tex.compressed {
                        for lod in 0..descriptor.mip_level_count {
                            let w = (descriptor.width >> lod).max(1) as i32;
                            let h = (descriptor.height >> lod).max(1) as i32;
                            let faces = match descriptor.dimension {
                                TextureDimension::Cube => 6,
                                _ => 1,
                            };
                            for face in 0..faces {
                                let face_target = if target == glow::TEXTURE_CUBE_MAP {
                                    glow::TEXTURE_CUBE_MAP_POSITIVE_X + face
                                } else {
                                    target
                                };
                                gl.tex_image_2d(
                                    face_target,
                                    lod as i32,
                                    tex.internal as i32,
                                    w,
                                    h,
                                    0,
                                    tex.format,
                                    tex.ty,
                                    glow::PixelUnpackData::Slice(None),
                                );
                            }
                        }
                    }
                }
            }
            gl.bind_texture(target, None);
        }
        let id = alloc_resource_id();
        registry
            .borrow_mut()
            .register(id, ResourceKind::Texture, descriptor.debug_name.clone());
        Ok(Rc::new(WebGlTexture {
            id,
            ctx,
            raw: Some(raw),
            target,
            descriptor,
            registry,
        }))
    }

    /// The default framebuffer's color surface, as handed out by the swap
    /// chain. It cannot be sampled or bound; passes recognize it by the
    /// missing texture object.
    pub(super) fn default_framebuffer(
        ctx: Rc<Ctx>,
        registry: SharedResourceRegistry,
        format: Format,
        width: u32,
        height: u32,
    ) -> Rc<WebGlTexture> {
        let id = alloc_resource_id();
        registry
            .borrow_mut()
            .register(id, ResourceKind::Texture, Some("onscreen".to_string()));
        Rc::new(WebGlTexture {
            id,
            ctx,
            raw: None,
            target: glow::TEXTURE_2D,
            descriptor: TextureDescriptor {
                usage: TextureUsage::RENDER_TARGET | TextureUsage::COPY_SRC,
                ..TextureDescriptor::d2(format, width, height, TextureUsage::RENDER_TARGET)
            },
            registry,
        })
    }

    pub(super) fn raw(&self) -> Option<glow::Texture> {
        self.raw
    }

    pub(super) fn target(&self) -> u32 {
        self.target
    }

    fn flip_rows(data: &[u8], height: u32, bytes_per_row: usize) -> Vec<u8> {
        let mut flipped = Vec::with_capacity(data.len());
        for row in (0..height as usize).rev() {
            flipped.extend_from_slice(&data[row * bytes_per_row..(row + 1) * bytes_per_row]);
        }
        flipped
    }
}

impl Resource for WebGlTexture {
    fn id(&self) -> u64 {
        self.id
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::Texture
    }

    fn debug_name(&self) -> Option<String> {
        self.descriptor.debug_name.clone()
    }

    fn destroy(&self) {
        self.registry.borrow_mut().unregister(self.id);
        if let Some(raw) = self.raw {
            unsafe { self.ctx.gl.delete_texture(raw) };
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Texture for WebGlTexture {
    fn format(&self) -> Format {
        self.descriptor.format
    }

    fn dimension(&self) -> TextureDimension {
        self.descriptor.dimension
    }

    fn width(&self) -> u32 {
        self.descriptor.width
    }

    fn height(&self) -> u32 {
        self.descriptor.height
    }

    fn depth_or_array_layers(&self) -> u32 {
        self.descriptor.depth_or_array_layers
    }

    fn mip_level_count(&self) -> u32 {
        self.descriptor.mip_level_count
    }

    fn usage(&self) -> TextureUsage {
        self.descriptor.usage
    }

    fn set_image_data(&self, layers: &[&[u8]], lod: u32) {
        let raw = match self.raw {
            Some(raw) => raw,
            None => whoops("the onscreen texture cannot be written"),
        };
        assert!(lod < self.descriptor.mip_level_count, "lod out of range");
        let format = self.descriptor.format;
        let tex = translate::texture_format(format, self.ctx.caps.profile);
        let width = (self.descriptor.width >> lod).max(1);
        let height = (self.descriptor.height >> lod).max(1);
        let expected = format.image_byte_size(width, height, 1);
        let bytes_per_row = expected / (height.div_ceil(format.block_dims().1)) as usize;

        let gl = &self.ctx.gl;
        unsafe { gl.bind_texture(self.target, Some(raw)) };
        for (layer, data) in layers.iter().enumerate() {
            if self.descriptor.dimension == TextureDimension::D3 {
                // One volume per call; the slice covers the whole level.
                let depth = (self.descriptor.depth_or_array_layers >> lod).max(1);
                assert_eq!(
                    data.len(),
                    format.image_byte_size(width, height, depth),
                    "mip {lod} volume data size mismatch"
                );
                unsafe {
                    gl.tex_sub_image_3d(
                        self.target,
                        lod as i32,
                        0,
                        0,
                        0,
                        width as i32,
                        height as i32,
                        depth as i32,
                        tex.format,
                        tex.ty,
                        glow::PixelUnpackData::Slice(Some(data)),
                    );
                }
                continue;
            }
            assert_eq!(data.len(), expected, "mip {lod} layer {layer} data size mismatch");
            let flipped;
            let data: &[u8] = if self.descriptor.flip_y && !tex.compressed {
                flipped = Self::flip_rows(data, height, bytes_per_row);
                &flipped
            } else {
                data
            };
            let face_target = if self.target == glow::TEXTURE_CUBE_MAP {
                glow::TEXTURE_CUBE_MAP_POSITIVE_X + layer as u32
            } else {
                self.target
            };
            unsafe {
                match (self.descriptor.dimension, tex.compressed) {
                    (TextureDimension::D2Array, false) => gl.tex_sub_image_3d(
                        self.target,
                        lod as i32,
                        0,
                        0,
                        layer as i32,
                        width as i32,
                        height as i32,
                        1,
                        tex.format,
                        tex.ty,
                        glow::PixelUnpackData::Slice(Some(data)),
                    ),
                    (_, false) => gl.tex_sub_image_2d(
                        face_target,
                        lod as i32,
                        0,
                        0,
                        width as i32,
                        height as i32,
                        tex.format,
                        tex.ty,
                        glow::PixelUnpackData::Slice(Some(data)),
                    ),
                    (_, true) => match self.ctx.caps.profile {
                        GlProfile::WebGl2 => gl.compressed_tex_sub_image_2d(
                            face_target,
                            lod as i32,
                            0,
                            0,
                            width as i32,
                            height as i32,
                            tex.internal,
                            glow::CompressedPixelUnpackData::Slice(data),
                        ),
                        GlProfile::WebGl1 => gl.compressed_tex_image_2d(
                            face_target,
                            lod as i32,
                            tex.internal as i32,
                            width as i32,
                            height as i32,
                            0,
                            data.len() as i32,
                            data,
                        ),
                    },
                }
            }
        }
        unsafe { gl.bind_texture(self.target, None) };
    }
}
