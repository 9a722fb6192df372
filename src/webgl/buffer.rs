// SPDX-License-Identifier: MIT OR Apache-2.0

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use glow::HasContext;

use crate::api::descriptors::BufferDescriptor;
use crate::api::device::{ensure_resource_exists, Error, SharedResourceRegistry};
use crate::api::resource::{alloc_resource_id, Buffer, BufferUsage, Resource, ResourceKind};
use crate::webgl::caps::GlProfile;
use crate::webgl::device::Ctx;

pub(super) struct WebGlBuffer {
    id: u64,
    ctx: Rc<Ctx>,
    /// `None` on the legacy profile for uniform-only buffers, which have no
    /// bindable GL target there and live entirely in the shadow copy.
    raw: Option<glow::Buffer>,
    target: u32,
    size: u64,
    usage: BufferUsage,
    /// CPU copy of the contents, kept for the legacy uniform upload path.
    shadow: Option<RefCell<Vec<u8>>>,
    debug_name: Option<String>,
    registry: SharedResourceRegistry,
}

impl WebGlBuffer {
    pub(super) fn new(
        ctx: Rc<Ctx>,
        registry: SharedResourceRegistry,
        descriptor: BufferDescriptor,
    ) -> Result<Rc<WebGlBuffer>, Error> {
        let gl = &ctx.gl;
        let legacy = ctx.caps.profile == GlProfile::WebGl1;
        let target = if descriptor.usage.contains(BufferUsage::INDEX) {
            glow::ELEMENT_ARRAY_BUFFER
        } else if descriptor.usage.contains(BufferUsage::UNIFORM) && !legacy {
            glow::UNIFORM_BUFFER
        } else {
            glow::ARRAY_BUFFER
        };
        let needs_native =
            !legacy || descriptor.usage.intersects(BufferUsage::VERTEX | BufferUsage::INDEX);
        let raw = if needs_native {
            let raw = ensure_resource_exists(unsafe { gl.create_buffer() }, "buffer")?;
            unsafe {
                gl.bind_buffer(target, Some(raw));
                gl.buffer_data_size(target, descriptor.size as i32, glow::DYNAMIC_DRAW);
                gl.bind_buffer(target, None);
            }
            Some(raw)
        } else {
            None
        };
        let shadow = (legacy && descriptor.usage.contains(BufferUsage::UNIFORM))
            .then(|| RefCell::new(vec![0u8; descriptor.size as usize]));
        let id = alloc_resource_id();
        registry
            .borrow_mut()
            .register(id, ResourceKind::Buffer, descriptor.debug_name.clone());
        Ok(Rc::new(WebGlBuffer {
            id,
            ctx,
            raw,
            target,
            size: descriptor.size,
            usage: descriptor.usage,
            shadow,
            debug_name: descriptor.debug_name,
            registry,
        }))
    }

    pub(super) fn raw(&self) -> Option<glow::Buffer> {
        self.raw
    }

    pub(super) fn target(&self) -> u32 {
        self.target
    }

    /// Shadowed contents, present only on the legacy uniform path.
    pub(super) fn shadow(&self) -> Option<std::cell::Ref<'_, Vec<u8>>> {
        self.shadow.as_ref().map(|s| s.borrow())
    }
}

impl Resource for WebGlBuffer {
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
        if let Some(raw) = self.raw {
            unsafe { self.ctx.gl.delete_buffer(raw) };
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Buffer for WebGlBuffer {
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
        if let Some(shadow) = &self.shadow {
            let start = dst_offset as usize;
            shadow.borrow_mut()[start..start + data.len()].copy_from_slice(data);
        }
        if let Some(raw) = self.raw {
            let gl = &self.ctx.gl;
            unsafe {
                gl.bind_buffer(self.target, Some(raw));
                gl.buffer_sub_data_u8_slice(self.target, dst_offset as i32, data);
                gl.bind_buffer(self.target, None);
            }
        }
    }
}
