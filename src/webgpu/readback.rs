// SPDX-License-Identifier: MIT OR Apache-2.0
//! GPU→CPU transfers, the only genuinely asynchronous operations on this
//! backend.

use std::any::Any;
use std::pin::Pin;
use std::rc::Rc;

use crate::api::device::{Error, SharedResourceRegistry};
use crate::api::resource::{
    alloc_resource_id, Buffer, Readback, Resource, ResourceKind, Texture,
};
use crate::webgpu::buffer::WebGpuBuffer;
use crate::webgpu::device::Gpu;
use crate::webgpu::texture::WebGpuTexture;

pub(super) struct WebGpuReadback {
    id: u64,
    gpu: Rc<Gpu>,
    registry: SharedResourceRegistry,
}

impl WebGpuReadback {
    pub(super) fn new(
        gpu: Rc<Gpu>,
        registry: SharedResourceRegistry,
    ) -> Result<Rc<WebGpuReadback>, Error> {
        let id = alloc_resource_id();
        registry
            .borrow_mut()
            .register(id, ResourceKind::Readback, None);
        Ok(Rc::new(WebGpuReadback { id, gpu, registry }))
    }
}

/// Submits `staging` as a copy destination, maps it, and returns the first
/// `take` bytes.
async fn map_and_read(gpu: Rc<Gpu>, staging: wgpu::Buffer, take: usize) -> Result<Vec<u8>, Error> {
    let (s, r) = r#continue::continuation();
    staging.slice(..).map_async(wgpu::MapMode::Read, move |result| {
        s.send(result);
    });
    let _ = gpu.device.poll(wgpu::PollType::Wait);
    r.await
        .map_err(|e| Error::Readback(format!("map_async: {e:?}")))?;
    let data = {
        let mapped = staging.slice(..).get_mapped_range();
        mapped[..take].to_vec()
    };
    staging.unmap();
    Ok(data)
}

impl Resource for WebGpuReadback {
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
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Readback for WebGpuReadback {
    fn read_buffer(
        &self,
        buffer: Rc<dyn Buffer>,
        src_offset: u64,
        length: u64,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, Error>>>> {
        let gpu = self.gpu.clone();
        Box::pin(async move {
            let source = buffer
                .as_any()
                .downcast_ref::<WebGpuBuffer>()
                .expect("buffer from another backend");
            assert!(
                src_offset + length <= buffer.size(),
                "buffer read out of bounds: offset {src_offset} + {length} > size {}",
                buffer.size()
            );
            // Copy offsets and sizes must be 4-aligned; widen the window to
            // aligned bounds and trim after mapping. The widened range stays
            // inside the allocation, which is rounded up the same way.
            let align = wgpu::COPY_BUFFER_ALIGNMENT;
            let aligned_offset = src_offset - src_offset % align;
            let lead = (src_offset - aligned_offset) as usize;
            let copy_len = (src_offset + length).next_multiple_of(align) - aligned_offset;
            let staging = gpu.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("readback staging"),
                size: copy_len,
                usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
                mapped_at_creation: false,
            });
            let mut encoder = gpu
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
            encoder.copy_buffer_to_buffer(source.raw(), aligned_offset, &staging, 0, copy_len);
            gpu.queue.submit(std::iter::once(encoder.finish()));
            let widened = map_and_read(gpu, staging, copy_len as usize).await?;
            Ok(widened[lead..lead + length as usize].to_vec())
        })
    }

    fn read_texture(
        &self,
        texture: Rc<dyn Texture>,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, Error>>>> {
        let gpu = self.gpu.clone();
        Box::pin(async move {
            let format = texture.format();
            if format.is_compressed() {
                return Err(Error::Readback(
                    "compressed formats are not readable".to_string(),
                ));
            }
            let source = texture
                .as_any()
                .downcast_ref::<WebGpuTexture>()
                .expect("texture from another backend");
            let bpp = format.bytes_per_pixel();

            // Clamp the copy to the texture; texels outside read back as zero.
            let copy_w = width.min(texture.width().saturating_sub(x));
            let copy_h = height.min(texture.height().saturating_sub(y));
            let mut out = vec![0u8; (width * height * bpp) as usize];
            if copy_w == 0 || copy_h == 0 {
                return Ok(out);
            }

            let bytes_per_row =
                (copy_w * bpp).next_multiple_of(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);
            let staging_size = bytes_per_row as u64 * copy_h as u64;
            let staging = gpu.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("readback staging"),
                size: staging_size,
                usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
                mapped_at_creation: false,
            });
            let mut encoder = gpu
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
            encoder.copy_texture_to_buffer(
                wgpu::TexelCopyTextureInfo {
                    texture: source.raw(),
                    mip_level: 0,
                    origin: wgpu::Origin3d { x, y, z: 0 },
                    aspect: wgpu::TextureAspect::All,
                },
                wgpu::TexelCopyBufferInfo {
                    buffer: &staging,
                    layout: wgpu::TexelCopyBufferLayout {
                        offset: 0,
                        bytes_per_row: Some(bytes_per_row),
                        rows_per_image: Some(copy_h),
                    },
                },
                wgpu::Extent3d {
                    width: copy_w,
                    height: copy_h,
                    depth_or_array_layers: 1,
                },
            );
            gpu.queue.submit(std::iter::once(encoder.finish()));
            let padded = map_and_read(gpu, staging, staging_size as usize).await?;
            for row in 0..copy_h as usize {
                let src = row * bytes_per_row as usize;
                let dst = row * (width * bpp) as usize;
                let len = (copy_w * bpp) as usize;
                out[dst..dst + len].copy_from_slice(&padded[src..src + len]);
            }
            Ok(out)
        })
    }

    fn read_texture_sync(
        &self,
        _texture: Rc<dyn Texture>,
        _x: u32,
        _y: u32,
        _width: u32,
        _height: u32,
    ) -> Result<Vec<u8>, Error> {
        Err(Error::Unsupported("read_texture_sync"))
    }
}
