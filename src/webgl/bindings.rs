// SPDX-License-Identifier: MIT OR Apache-2.0
//! Bindings on GL resolve to global slot assignments.
//!
//! Uniform buffer slot `s` maps to uniform-buffer binding point `s` (or the
//! legacy `ub_<s>` uniform array); sampler slot `s` maps to texture unit `s`.
//! Storage resources have no GL expression and are rejected at creation.

use std::any::Any;
use std::rc::Rc;

use crate::api::descriptors::{resolve_binding_slots, BindingsDescriptor, ResolvedBindingSlots};
use crate::api::device::{Error, SharedResourceRegistry};
use crate::api::resource::{alloc_resource_id, Bindings, Resource, ResourceKind};
use crate::api::whoops;

pub(super) struct WebGlBindings {
    id: u64,
    descriptor: BindingsDescriptor,
    slots: ResolvedBindingSlots,
    registry: SharedResourceRegistry,
}

impl WebGlBindings {
    pub(super) fn new(
        registry: SharedResourceRegistry,
        descriptor: BindingsDescriptor,
    ) -> Result<Rc<WebGlBindings>, Error> {
        if !descriptor.storage_buffer_bindings.is_empty()
            || !descriptor.storage_texture_bindings.is_empty()
        {
            whoops("storage resources are not available on this backend");
        }
        let slots = resolve_binding_slots(&descriptor);
        let id = alloc_resource_id();
        registry
            .borrow_mut()
            .register(id, ResourceKind::Bindings, None);
        Ok(Rc::new(WebGlBindings {
            id,
            descriptor,
            slots,
            registry,
        }))
    }

    pub(super) fn descriptor(&self) -> &BindingsDescriptor {
        &self.descriptor
    }

    pub(super) fn slots(&self) -> &ResolvedBindingSlots {
        &self.slots
    }
}

impl Resource for WebGlBindings {
    fn id(&self) -> u64 {
        self.id
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::Bindings
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

impl Bindings for WebGlBindings {}
