// SPDX-License-Identifier: MIT OR Apache-2.0

use std::any::Any;
use std::rc::Rc;

use crate::api::descriptors::TextureDescriptor;
use crate::api::device::{Error, SharedResourceRegistry};
use crate::api::format::Format;
use crate::api::resource::{
    alloc_resource_id, Resource, ResourceKind, Texture, TextureDimension, TextureUsage,
};
use crate::api::whoops;
use crate::webgpu::device::Gpu;
use crate::webgpu::translate;

pub(super) struct WebGpuTexture {
    id: u64,
    gpu: Rc<Gpu>,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    descriptor: TextureDescriptor,
    registry: SharedResourceRegistry,
}

impl WebGpuTexture {
    pub(super) fn new(
        gpu: Rc<Gpu>,
        registry: SharedResourceRegistry,
        descriptor: TextureDescriptor,
        sample_count: u32,
    ) -> Result<Rc<WebGpuTexture>, Error> {
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: descriptor.debug_name.as_deref(),
            size: wgpu::Extent3d {
                width: descriptor.width,
                height: descriptor.height,
                depth_or_array_layers: match descriptor.dimension {
                    TextureDimension::Cube => 6 * descriptor.depth_or_array_layers,
                    _ => descriptor.depth_or_array_layers,
                },
            },
            mip_level_count: descriptor.mip_level_count,
            sample_count,
            dimension: translate::texture_dimension(descriptor.dimension),
            format: translate::texture_format(descriptor.format),
            usage: translate::texture_usages(descriptor.usage),
            view_formats: &[],
        });
        Ok(Self::wrap(gpu, registry, texture, descriptor))
    }

    /// Wraps an existing native texture, e.g. the swap chain's.
    pub(super) fn wrap(
        gpu: Rc<Gpu>,
        registry: SharedResourceRegistry,
        texture: wgpu::Texture,
        descriptor: TextureDescriptor,
    ) -> Rc<WebGpuTexture> {
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            dimension: Some(translate::texture_view_dimension(descriptor.dimension)),
            ..Default::default()
        });
        let id = alloc_resource_id();
        registry
            .borrow_mut()
            .register(id, ResourceKind::Texture, descriptor.debug_name.clone());
        Rc::new(WebGpuTexture {
            id,
            gpu,
            texture,
            view,
            descriptor,
            registry,
        })
    }

    pub(super) fn raw(&self) -> &wgpu::Texture {
        &self.texture
    }

    pub(super) fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    fn write_layer(&self, data: &[u8], lod: u32, layer: u32, width: u32, height: u32, depth: u32) {
        let format = self.descriptor.format;
        let (bw, bh) = format.block_dims();
        let bytes_per_row = width.div_ceil(bw) * format.bytes_per_pixel();
        let rows = height.div_ceil(bh);

        let flipped;
        let data = if self.descriptor.flip_y {
            flipped = flip_rows(data, bytes_per_row as usize, (rows * depth) as usize);
            flipped.as_slice()
        } else {
            data
        };

        self.gpu.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: lod,
                origin: wgpu::Origin3d {
                    x: 0,
                    y: 0,
                    z: layer,
                },
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(rows),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: depth,
            },
        );
    }
}

fn flip_rows(data: &[u8], bytes_per_row: usize, rows: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    for row in (0..rows).rev() {
        out.extend_from_slice(&data[row * bytes_per_row..(row + 1) * bytes_per_row]);
    }
    out
}

impl Resource for WebGpuTexture {
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
        self.texture.destroy();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Texture for WebGpuTexture {
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
        let width = (self.descriptor.width >> lod).max(1);
        let height = (self.descriptor.height >> lod).max(1);
        match self.descriptor.dimension {
            TextureDimension::D3 => {
                // One slice carrying the whole volume.
                let Some(volume) = layers.first() else {
                    whoops("3d texture upload needs one layer holding the whole volume");
                };
                let depth = (self.descriptor.depth_or_array_layers >> lod).max(1);
                self.write_layer(volume, lod, 0, width, height, depth);
            }
            _ => {
                for (layer, data) in layers.iter().enumerate() {
                    self.write_layer(data, lod, layer as u32, width, height, 1);
                }
            }
        }
    }
}
