// SPDX-License-Identifier: MIT OR Apache-2.0

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use crate::api::device::{Error, SharedResourceRegistry};
use crate::api::resource::{alloc_resource_id, QueryPool, Resource, ResourceKind};
use crate::webgpu::device::Gpu;

/// Occlusion query storage: a native query set plus resolve/readback buffers.
/// Results are pulled at end-of-frame and cached.
pub(super) struct WebGpuQueryPool {
    id: u64,
    query_set: wgpu::QuerySet,
    count: u32,
    resolve_buffer: wgpu::Buffer,
    read_buffer: wgpu::Buffer,
    results: RefCell<Vec<Option<u64>>>,
    registry: SharedResourceRegistry,
}

impl WebGpuQueryPool {
    pub(super) fn new(
        gpu: &Gpu,
        registry: SharedResourceRegistry,
        count: u32,
    ) -> Result<Rc<WebGpuQueryPool>, Error> {
        let query_set = gpu.device.create_query_set(&wgpu::QuerySetDescriptor {
            label: None,
            ty: wgpu::QueryType::Occlusion,
            count,
        });
        let size = count as u64 * 8;
        let resolve_buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: None,
            size,
            usage: wgpu::BufferUsages::QUERY_RESOLVE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let read_buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: None,
            size,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        let id = alloc_resource_id();
        registry
            .borrow_mut()
            .register(id, ResourceKind::QueryPool, None);
        Ok(Rc::new(WebGpuQueryPool {
            id,
            query_set,
            count,
            resolve_buffer,
            read_buffer,
            results: RefCell::new(vec![None; count as usize]),
            registry,
        }))
    }

    pub(super) fn query_set(&self) -> &wgpu::QuerySet {
        &self.query_set
    }

    /// Records the resolve + copy into `encoder`; call before finishing the
    /// pass's command buffer.
    pub(super) fn record_resolve(&self, encoder: &mut wgpu::CommandEncoder) {
        encoder.resolve_query_set(&self.query_set, 0..self.count, &self.resolve_buffer, 0);
        encoder.copy_buffer_to_buffer(
            &self.resolve_buffer,
            0,
            &self.read_buffer,
            0,
            self.count as u64 * 8,
        );
    }

    /// Maps the readback buffer and caches all results. Blocks on the GPU.
    pub(super) fn collect_results(&self, gpu: &Gpu) {
        use std::future::Future;
        use std::task::{Context, Poll, Waker};

        let slice = self.read_buffer.slice(..);
        let (s, r) = r#continue::continuation();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            s.send(result);
        });
        let _ = gpu.device.poll(wgpu::PollType::Wait);
        // The wait poll runs the map callback inline, so a single poll of
        // the continuation observes the sent value.
        let mut receiver = std::pin::pin!(r);
        let mut context = Context::from_waker(Waker::noop());
        match receiver.as_mut().poll(&mut context) {
            Poll::Ready(Ok(())) => {}
            _ => {
                logwise::warn_sync!("occlusion query readback map failed");
                return;
            }
        }
        {
            let mapped = slice.get_mapped_range();
            let mut results = self.results.borrow_mut();
            for (i, chunk) in mapped.chunks_exact(8).enumerate() {
                results[i] = Some(u64::from_le_bytes(chunk.try_into().unwrap()));
            }
        }
        self.read_buffer.unmap();
    }
}

impl Resource for WebGpuQueryPool {
    fn id(&self) -> u64 {
        self.id
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::QueryPool
    }

    fn debug_name(&self) -> Option<String> {
        None
    }

    fn destroy(&self) {
        self.registry.borrow_mut().unregister(self.id);
        self.resolve_buffer.destroy();
        self.read_buffer.destroy();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl QueryPool for WebGpuQueryPool {
    fn count(&self) -> u32 {
        self.count
    }

    fn result(&self, index: u32) -> Option<u64> {
        self.results.borrow().get(index as usize).copied().flatten()
    }
}
