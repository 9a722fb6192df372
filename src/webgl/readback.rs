// SPDX-License-Identifier: MIT OR Apache-2.0
//! GPU→CPU transfers.
//!
//! GL reads are synchronous; the async entry points complete immediately.
//! This is the one backend where `read_texture_sync` works.

use std::any::Any;
use std::pin::Pin;
use std::rc::Rc;

use glow::HasContext;

use crate::api::device::{ensure_resource_exists, Error, SharedResourceRegistry};
use crate::api::resource::{alloc_resource_id, Buffer, Readback, Resource, ResourceKind, Texture};
use crate::webgl::buffer::WebGlBuffer;
use crate::webgl::device::Ctx;
use crate::webgl::texture::WebGlTexture;
use crate::webgl::translate;

pub(super) struct WebGlReadback {
    id: u64,
    ctx: Rc<Ctx>,
    framebuffer: glow::Framebuffer,
    registry: SharedResourceRegistry,
}

impl WebGlReadback {
    pub(super) fn new(
        ctx: Rc<Ctx>,
        registry: SharedResourceRegistry,
    ) -> Result<Rc<WebGlReadback>, Error> {
        let framebuffer =
            ensure_resource_exists(unsafe { ctx.gl.create_framebuffer() }, "framebuffer")?;
        let id = alloc_resource_id();
        registry
            .borrow_mut()
            .register(id, ResourceKind::Readback, None);
        Ok(Rc::new(WebGlReadback {
            id,
            ctx,
            framebuffer,
            registry,
        }))
    }

    fn read_buffer_now(
        &self,
        buffer: &Rc<dyn Buffer>,
        src_offset: u64,
        length: u64,
    ) -> Result<Vec<u8>, Error> {
        if src_offset + length > buffer.size() {
            return Err(Error::Readback(format!(
                "read past the end of the buffer: {src_offset}+{length} > {}",
                buffer.size()
            )));
        }
        let native = buffer
            .as_any()
            .downcast_ref::<WebGlBuffer>()
            .expect("buffer from another backend");
        // Shadowed buffers answer from the CPU copy without a GL round trip.
        if let Some(shadow) = native.shadow() {
            let start = src_offset as usize;
            return Ok(shadow[start..start + length as usize].to_vec());
        }
        if !self.ctx.caps.uniform_buffers {
            // get_buffer_sub_data arrived with the modern profile.
            return Err(Error::Unsupported("buffer readback on the legacy profile"));
        }
        let raw = native.raw().expect("unshadowed buffer has a native object");
        let gl = &self.ctx.gl;
        let mut out = vec![0u8; length as usize];
        unsafe {
            gl.bind_buffer(native.target(), Some(raw));
            gl.get_buffer_sub_data(native.target(), src_offset as i32, &mut out);
            gl.bind_buffer(native.target(), None);
        }
        Ok(out)
    }

    fn read_texture_now(
        &self,
        texture: &Rc<dyn Texture>,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> Result<Vec<u8>, Error> {
        let format = texture.format();
        if format.is_compressed() {
            return Err(Error::Readback(
                "compressed formats are not readable".to_string(),
            ));
        }
        if format.has_depth() {
            return Err(Error::Readback("depth formats are not readable".to_string()));
        }
        let native = texture
            .as_any()
            .downcast_ref::<WebGlTexture>()
            .expect("texture from another backend");
        let gl = &self.ctx.gl;
        match native.raw() {
            Some(raw) => unsafe {
                gl.bind_framebuffer(glow::FRAMEBUFFER, Some(self.framebuffer));
                gl.framebuffer_texture_2d(
                    glow::FRAMEBUFFER,
                    glow::COLOR_ATTACHMENT0,
                    glow::TEXTURE_2D,
                    Some(raw),
                    0,
                );
            },
            // The onscreen texture reads from the default framebuffer.
            None => unsafe { gl.bind_framebuffer(glow::FRAMEBUFFER, None) },
        }

        let bytes_per_pixel = format.bytes_per_pixel() as usize;
        let mut out = vec![0u8; width as usize * height as usize * bytes_per_pixel];
        // Clamp to the texture; out-of-bounds texels stay zero.
        let clamped_w = width.min(texture.width().saturating_sub(x)) as usize;
        let clamped_h = height.min(texture.height().saturating_sub(y)) as usize;
        if clamped_w > 0 && clamped_h > 0 {
            let tex = translate::texture_format(format, self.ctx.caps.profile);
            let mut tight = vec![0u8; clamped_w * clamped_h * bytes_per_pixel];
            unsafe {
                gl.read_pixels(
                    x as i32,
                    y as i32,
                    clamped_w as i32,
                    clamped_h as i32,
                    tex.format,
                    tex.ty,
                    glow::PixelPackData::Slice(Some(&mut tight)),
                );
            }
            let out_row = width as usize * bytes_per_pixel;
            let tight_row = clamped_w * bytes_per_pixel;
            for row in 0..clamped_h {
                out[row * out_row..row * out_row + tight_row]
                    .copy_from_slice(&tight[row * tight_row..(row + 1) * tight_row]);
            }
        }
        unsafe { gl.bind_framebuffer(glow::FRAMEBUFFER, None) };
        Ok(out)
    }
}

impl Resource for WebGlReadback {
    fn id(&self) -> u64 {
        self.id
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::Readback
    }

    fn debug_name(&self) -> Option<String> {
        None
    }

    fn destroy(&self) {
        self.registry.borrow_mut().unregister(self.id);
        unsafe { self.ctx.gl.delete_framebuffer(self.framebuffer) };
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Readback for WebGlReadback {
    fn read_buffer(
        &self,
        buffer: Rc<dyn Buffer>,
        src_offset: u64,
        length: u64,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, Error>>>> {
        let result = self.read_buffer_now(&buffer, src_offset, length);
        Box::pin(async move { result })
    }

    fn read_texture(
        &self,
        texture: Rc<dyn Texture>,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, Error>>>> {
        let result = self.read_texture_now(&texture, x, y, width, height);
        Box::pin(async move { result })
    }

    fn read_texture_sync(
        &self,
        texture: Rc<dyn Texture>,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> Result<Vec<u8>, Error> {
        self.read_texture_now(&texture, x, y, width, height)
    }
}
