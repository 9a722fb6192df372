// SPDX-License-Identifier: MIT OR Apache-2.0

use std::any::Any;
use std::rc::Rc;

use crate::api::descriptors::BufferDescriptor;
use crate::api::device::{Error, SharedResourceRegistry};
use crate::api::resource::{alloc_resource_id, Buffer, BufferUsage, Resource, ResourceKind};
use crate::webgpu::device::Gpu;
use crate::webgpu::translate;

pub(super) struct WebGpuBuffer {
    id: u64,
    gpu: Rc<Gpu>,
    buffer: wgpu::Buffer,
    size: u64,
    usage: BufferUsage,
    debug_name: Option<String>,
    registry: SharedResourceRegistry,
}

impl WebGpuBuffer {
    pub(super) fn new(
        gpu: Rc<Gpu>,
        registry: SharedResourceRegistry,
        descriptor: BufferDescriptor,
    ) -> Result<Rc<WebGpuBuffer>, Error> {
        // wgpu requires copy-aligned sizes; the logical size stays as asked.
        let allocated_size = descriptor
            .size
            .next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT);
        let buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: descriptor.debug_name.as_deref(),
            size: allocated_size,
            usage: translate::buffer_usages(descriptor.usage) | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let id = alloc_resource_id();
        registry
            .borrow_mut()
            .register(id, ResourceKind::Buffer, descriptor.debug_name.clone());
        Ok(Rc::new(WebGpuBuffer {
            id,
            gpu,
            buffer,
            size: descriptor.size,
            usage: descriptor.usage,
            debug_name: descriptor.debug_name,
            registry,
        }))
    }

    pub(super) fn raw(&self) -> &wgpu::Buffer {
        &self.buffer
    }
}

impl Resource for WebGpuBuffer {
    fn id(&self) -> u64 {
        self.id
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::Buffer
    }

    fn debug_name(&self) -> Option<String> {
        self.debug_name.clone()
    }

    fn destroy(&self) {
        self.registry.borrow_mut().unregister(self.id);
        self.buffer.destroy();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Buffer for WebGpuBuffer {
    fn size(&self) -> u64 {
        self.size
    }

    fn usage(&self) -> BufferUsage {
        self.usage
    }

    fn set_sub_data(&self, dst_offset: u64, data: &[u8]) {
        assert!(
            dst_offset + data.len() as u64 <= self.size,
            "buffer upload out of bounds: offset {dst_offset} + {} > size {}",
            data.len(),
            self.size
        );
        self.gpu.queue.write_buffer(&self.buffer, dst_offset, data);
    }
}
