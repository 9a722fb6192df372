// SPDX-License-Identifier: MIT OR Apache-2.0

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use glow::HasContext;

use crate::api::device::{ensure_resource_exists, Error, SharedResourceRegistry};
use crate::api::resource::{alloc_resource_id, QueryPool, Resource, ResourceKind};

use crate::webgl::device::Ctx;

/// Occlusion queries via `ANY_SAMPLES_PASSED`: results are boolean
/// passed/not-passed, reported as 0/1 sample counts.
pub(super) struct WebGlQueryPool {
    id: u64,
    ctx: Rc<Ctx>,
    queries: Vec<glow::Query>,
    results: RefCell<Vec<Option<u64>>>,
    registry: SharedResourceRegistry,
}

impl WebGlQueryPool {
    pub(super) fn new(
        ctx: Rc<Ctx>,
        registry: SharedResourceRegistry,
        count: u32,
    ) -> Result<Rc<WebGlQueryPool>, Error> {
        if !ctx.caps.occlusion_queries {
            return Err(Error::Unsupported("occlusion queries"));
        }
        let mut queries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            queries.push(ensure_resource_exists(
                unsafe { ctx.gl.create_query() },
                "query",
            )?);
        }
        let id = alloc_resource_id();
        registry
            .borrow_mut()
            .register(id, ResourceKind::QueryPool, None);
        Ok(Rc::new(WebGlQueryPool {
            id,
            ctx,
            queries,
            results: RefCell::new(vec![None; count as usize]),
            registry,
        }))
    }

    pub(super) fn query(&self, index: u32) -> glow::Query {
        self.queries[index as usize]
    }

    /// Begin/end reset the cached result so stale values never leak into the
    /// next frame's polling.
    pub(super) fn reset(&self, index: u32) {
        self.results.borrow_mut()[index as usize] = None;
    }
}

impl Resource for WebGlQueryPool {
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
        for query in &self.queries {
            unsafe { self.ctx.gl.delete_query(*query) };
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl QueryPool for WebGlQueryPool {
    fn count(&self) -> u32 {
        self.queries.len() as u32
    }

    fn result(&self, index: u32) -> Option<u64> {
        let mut results = self.results.borrow_mut();
        if let Some(cached) = results[index as usize] {
            return Some(cached);
        }
        // Poll lazily; the driver resolves queries in its own time.
        let query = self.queries[index as usize];
        let gl = &self.ctx.gl;
        let available =
            unsafe { gl.get_query_parameter_u32(query, glow::QUERY_RESULT_AVAILABLE) } != 0;
        if !available {
            return None;
        }
        let value = unsafe { gl.get_query_parameter_u32(query, glow::QUERY_RESULT) } as u64;
        results[index as usize] = Some(value);
        Some(value)
    }
}
